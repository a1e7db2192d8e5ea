//! Reverse-Z depth buffer: near maps to 1.0, far to 0.0.

use crate::target::TargetSize;

/// Depth attachment shared by the lit passes.
pub struct DepthBuffer {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    size: TargetSize,
}

impl DepthBuffer {
    /// 32-bit float depth.
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// 0.0 is the far plane.
    pub const CLEAR_VALUE: f32 = 0.0;

    /// Closer fragments have greater depth.
    pub const COMPARE_FUNCTION: wgpu::CompareFunction = wgpu::CompareFunction::GreaterEqual;

    /// Depth texture matching the viewport.
    pub fn new(device: &wgpu::Device, size: TargetSize) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-buffer"),
            size: size.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
        }
    }

    /// Size of the depth texture.
    pub fn size(&self) -> TargetSize {
        self.size
    }

    /// Attachment that clears to the far plane and keeps the result.
    pub fn clear_attachment(&self) -> wgpu::RenderPassDepthStencilAttachment<'_> {
        depth_clear_attachment(&self.view)
    }
}

/// Clear to the far plane and store.
pub fn depth_clear_attachment(
    view: &wgpu::TextureView,
) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(DepthBuffer::CLEAR_VALUE),
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}

/// Depth state for reverse-Z pipelines.
pub fn depth_stencil_state(bias: wgpu::DepthBiasState) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DepthBuffer::FORMAT,
        depth_write_enabled: true,
        depth_compare: DepthBuffer::COMPARE_FUNCTION,
        stencil: wgpu::StencilState::default(),
        bias,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device;

    #[test]
    fn test_reverse_z_constants() {
        assert_eq!(DepthBuffer::FORMAT, wgpu::TextureFormat::Depth32Float);
        assert_eq!(DepthBuffer::CLEAR_VALUE, 0.0);
        assert_eq!(
            DepthBuffer::COMPARE_FUNCTION,
            wgpu::CompareFunction::GreaterEqual
        );
    }

    #[test]
    fn test_depth_state_writes_with_greater_equal() {
        let state = depth_stencil_state(wgpu::DepthBiasState::default());
        assert!(state.depth_write_enabled);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::GreaterEqual);
    }

    #[test]
    fn test_depth_buffer_matches_requested_size() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let size = TargetSize::new(320, 200);
        let depth = DepthBuffer::new(&device, size);
        assert_eq!(depth.size(), size);
        assert_eq!(depth.texture.width(), 320);
        assert_eq!(depth.texture.height(), 200);
        assert!(depth.texture.usage().contains(wgpu::TextureUsages::RENDER_ATTACHMENT));
    }
}
