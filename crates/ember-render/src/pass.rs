//! Scene passes: begin a lit or depth-only pass and draw a snapshotted list
//! of objects into it.

use std::collections::HashMap;

use ember_materials::wgsl::{COLOR_MESH_GROUP, DEPTH_MESH_GROUP};
use glam::Vec3;

use crate::depth::depth_clear_attachment;
use crate::scene::ObjectId;
use crate::surface_pipeline::{GpuObject, SurfacePipelines};
use crate::target::RenderTarget;

/// Opaque clear color for an HDR target.
pub fn clear_color(color: Vec3) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(color.x),
        g: f64::from(color.y),
        b: f64::from(color.z),
        a: 1.0,
    }
}

/// Lit pass into `target` with a freshly cleared depth buffer.
pub fn begin_lit_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    target: &RenderTarget,
    clear: wgpu::Color,
    depth: &wgpu::TextureView,
) -> wgpu::RenderPass<'e> {
    encoder
        .begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(target.attachment(wgpu::LoadOp::Clear(clear)))],
            depth_stencil_attachment: Some(depth_clear_attachment(depth)),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
}

/// Depth-only pass into `depth`.
pub fn begin_depth_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    depth: &wgpu::TextureView,
) -> wgpu::RenderPass<'e> {
    encoder
        .begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[],
            depth_stencil_attachment: Some(depth_clear_attachment(depth)),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
}

/// Frame-wide bind groups of the lit pipelines, groups 0 to 2.
pub struct LitBindings<'a> {
    pub camera: &'a wgpu::BindGroup,
    pub lighting: &'a wgpu::BindGroup,
    pub shadow: &'a wgpu::BindGroup,
}

/// Draw `ids` with the lit pipelines. Objects without GPU state are skipped.
pub fn draw_lit(
    pass: &mut wgpu::RenderPass<'_>,
    ids: &[ObjectId],
    objects: &HashMap<ObjectId, GpuObject>,
    pipelines: &SurfacePipelines,
    bindings: &LitBindings<'_>,
) -> usize {
    pass.set_bind_group(0, bindings.camera, &[]);
    pass.set_bind_group(1, bindings.lighting, &[]);
    pass.set_bind_group(2, bindings.shadow, &[]);
    let mut drawn = 0;
    for object in ids.iter().filter_map(|id| objects.get(id)) {
        pass.set_pipeline(pipelines.color(object.variant, object.double_sided));
        pass.set_bind_group(COLOR_MESH_GROUP, &object.bind_group, &[]);
        object.mesh.draw(pass);
        drawn += 1;
    }
    drawn
}

/// Draw `ids` with the depth-only pipelines from the camera in `camera`.
pub fn draw_depth(
    pass: &mut wgpu::RenderPass<'_>,
    ids: &[ObjectId],
    objects: &HashMap<ObjectId, GpuObject>,
    pipelines: &SurfacePipelines,
    camera: &wgpu::BindGroup,
) -> usize {
    pass.set_bind_group(0, camera, &[]);
    let mut drawn = 0;
    for object in ids.iter().filter_map(|id| objects.get(id)) {
        pass.set_pipeline(pipelines.depth(object.variant, object.double_sided));
        pass.set_bind_group(DEPTH_MESH_GROUP, &object.bind_group, &[]);
        object.mesh.draw(pass);
        drawn += 1;
    }
    drawn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_color_is_opaque() {
        let c = clear_color(Vec3::new(0.25, 0.5, 1.0));
        assert_eq!((c.r, c.g, c.b, c.a), (0.25, 0.5, 1.0, 1.0));
    }
}
