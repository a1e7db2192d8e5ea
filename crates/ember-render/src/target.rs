//! Offscreen render targets and their sizes.
//!
//! [`TargetLayout`] is the single source of every target size in a frame.
//! GPU targets and the CPU reference images are both built from it, so after
//! a resize every buffer agrees on its dimensions.

use crate::depth::DepthBuffer;
use crate::frame::FrameError;

/// Color format of every intermediate target.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Extent with a depth of one layer.
    pub fn extent(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    /// Width times height.
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// `1 / size`, per axis.
    pub fn texel(self) -> [f32; 2] {
        [1.0 / self.width as f32, 1.0 / self.height as f32]
    }
}

/// Sizes of all targets for one viewport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetLayout {
    pub viewport: TargetSize,
    /// Blur level `i` is `viewport >> (i + 1)`, at least 1x1.
    pub levels: Vec<TargetSize>,
}

impl TargetLayout {
    /// Viewport plus `levels` halved sizes, each at least 1x1.
    pub fn for_viewport(width: u32, height: u32, levels: u32) -> Self {
        let viewport = TargetSize::new(width.max(1), height.max(1));
        let levels = (0..levels)
            .map(|i| {
                TargetSize::new(
                    downsample(viewport.width, i + 1),
                    downsample(viewport.height, i + 1),
                )
            })
            .collect();
        Self { viewport, levels }
    }

    /// Number of blur levels.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Size of blur level `index`.
    pub fn level(&self, index: usize) -> Option<TargetSize> {
        self.levels.get(index).copied()
    }

    /// Fail if a buffer does not have the size this layout expects.
    pub fn expect(
        &self,
        target: &'static str,
        expected: TargetSize,
        actual: TargetSize,
    ) -> Result<(), FrameError> {
        if expected == actual {
            Ok(())
        } else {
            Err(FrameError::DimensionMismatch {
                target,
                expected: (expected.width, expected.height),
                actual: (actual.width, actual.height),
            })
        }
    }
}

fn downsample(value: u32, shift: u32) -> u32 {
    value.checked_shr(shift).unwrap_or(0).max(1)
}

/// A color texture the frame renders into and samples from.
pub struct RenderTarget {
    pub label: &'static str,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: TargetSize,
}

impl RenderTarget {
    /// HDR texture usable as attachment and sampled input.
    pub fn new(device: &wgpu::Device, label: &'static str, size: TargetSize) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: size.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HDR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            label,
            texture,
            view,
            size,
        }
    }

    /// Color attachment with the given load operation.
    pub fn attachment(
        &self,
        load: wgpu::LoadOp<wgpu::Color>,
    ) -> wgpu::RenderPassColorAttachment<'_> {
        wgpu::RenderPassColorAttachment {
            view: &self.view,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        }
    }
}

/// Horizontal and vertical blur targets per level. Owned by the bloom stage.
pub struct MipChain {
    pub horizontal: Vec<RenderTarget>,
    pub vertical: Vec<RenderTarget>,
}

impl MipChain {
    /// One horizontal and one vertical target per level.
    pub fn new(device: &wgpu::Device, layout: &TargetLayout) -> Self {
        let mut horizontal = Vec::with_capacity(layout.level_count());
        let mut vertical = Vec::with_capacity(layout.level_count());
        for (i, size) in layout.levels.iter().enumerate() {
            log::trace!("Bloom level {i}: {}x{}", size.width, size.height);
            horizontal.push(RenderTarget::new(device, "bloom-blur-h", *size));
            vertical.push(RenderTarget::new(device, "bloom-blur-v", *size));
        }
        Self {
            horizontal,
            vertical,
        }
    }

    /// Number of blur levels.
    pub fn len(&self) -> usize {
        self.vertical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertical.is_empty()
    }
}

/// Full-resolution buffers of a frame.
pub struct FrameTargets {
    pub layout: TargetLayout,
    /// Lit scene, all default-layer objects.
    pub base: RenderTarget,
    /// Lit scene, bloom-layer objects only.
    pub bloom_scene: RenderTarget,
    /// High-passed bloom scene.
    pub bright: RenderTarget,
    /// Accumulated glow.
    pub glow: RenderTarget,
    pub depth: DepthBuffer,
}

impl FrameTargets {
    /// Allocate every full-resolution target for `layout`.
    pub fn new(device: &wgpu::Device, layout: &TargetLayout) -> Self {
        let size = layout.viewport;
        log::info!("Creating frame targets at {}x{}", size.width, size.height);
        Self {
            layout: layout.clone(),
            base: RenderTarget::new(device, "base-buffer", size),
            bloom_scene: RenderTarget::new(device, "bloom-scene", size),
            bright: RenderTarget::new(device, "bloom-bright", size),
            glow: RenderTarget::new(device, "glow-buffer", size),
            depth: DepthBuffer::new(device, size),
        }
    }

    /// Every full-resolution buffer matches the layout.
    pub fn verify(&self) -> Result<(), FrameError> {
        let expected = self.layout.viewport;
        for target in [&self.base, &self.bloom_scene, &self.bright, &self.glow] {
            self.layout.expect(target.label, expected, target.size)?;
        }
        self.layout.expect("depth-buffer", expected, self.depth.size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device;

    #[test]
    fn test_layout_halves_per_level() {
        let layout = TargetLayout::for_viewport(1280, 720, 5);
        let sizes: Vec<_> = layout.levels.iter().map(|s| (s.width, s.height)).collect();
        assert_eq!(sizes, vec![(640, 360), (320, 180), (160, 90), (80, 45), (40, 22)]);
    }

    #[test]
    fn test_layout_never_reaches_zero() {
        let layout = TargetLayout::for_viewport(3, 1, 6);
        assert!(layout.levels.iter().all(|s| s.width >= 1 && s.height >= 1));
        let deep = TargetLayout::for_viewport(100, 100, 40);
        assert_eq!(deep.level(39), Some(TargetSize::new(1, 1)));
    }

    #[test]
    fn test_zero_viewport_clamped() {
        let layout = TargetLayout::for_viewport(0, 0, 5);
        assert_eq!(layout.viewport, TargetSize::new(1, 1));
        assert_eq!(layout.level_count(), 5);
    }

    #[test]
    fn test_expect_reports_mismatch() {
        let layout = TargetLayout::for_viewport(64, 64, 2);
        assert!(layout.expect("base", layout.viewport, TargetSize::new(64, 64)).is_ok());
        let err = layout
            .expect("base", layout.viewport, TargetSize::new(32, 64))
            .unwrap_err();
        assert!(matches!(
            err,
            FrameError::DimensionMismatch {
                target: "base",
                expected: (64, 64),
                actual: (32, 64)
            }
        ));
    }

    #[test]
    fn test_gpu_targets_follow_layout() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let layout = TargetLayout::for_viewport(200, 100, 3);
        let targets = FrameTargets::new(&device, &layout);
        targets.verify().unwrap();
        let mips = MipChain::new(&device, &layout);
        assert_eq!(mips.len(), 3);
        assert_eq!(mips.vertical[2].size, TargetSize::new(25, 12));
        assert_eq!(mips.horizontal[0].texture.width(), 100);
    }
}
