//! CPU reference renderer.
//!
//! Runs the same [`FrameSchedule`] as the GPU pipeline on float images with
//! a small rasterizer and the CPU variants of every material. Used for
//! end-to-end checks and headless snapshots. Reflections use the flat
//! environment color; the skybox samples the cube faces nearest-texel.

pub mod bloom;
pub mod image;
pub mod raster;

use std::collections::HashMap;

use ember_lighting::{ShadowDepthMap, light_view_projection};
use ember_materials::{
    DepthProgram, DepthVariant, DissolveHooks, ExtendedMaterial, Fragment, LightingContext,
    NoHooks, SurfaceProgram,
};
use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::composite::composite_pixel;
use crate::frame::{FrameClock, FrameError, FrameSchedule, PassKind, PipelineState};
use crate::layers::{BLOOM_LAYER, Layers};
use crate::orbit::OrbitController;
use crate::scene::{ObjectId, Scene, SceneObject};
use crate::settings::RenderSettings;
use crate::skybox::view_direction;
use crate::surface::ResizeQueue;
use crate::target::{TargetLayout, TargetSize};

pub use self::bloom::BloomImages;
pub use self::image::HdrImage;
pub use self::raster::{ClipVertex, Cull, DepthImage, RasterFragment, rasterize_triangle};

/// Fragment counts of one object in one pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RasterStats {
    /// Fragments that passed the depth test and reached the material.
    pub fragments: usize,
    /// Of those, fragments the material discarded.
    pub discarded: usize,
}

impl RasterStats {
    /// Discarded over rasterized fragments; 0 for an empty object.
    pub fn discard_ratio(&self) -> f32 {
        if self.fragments == 0 {
            0.0
        } else {
            self.discarded as f32 / self.fragments as f32
        }
    }
}

/// Every image a reference frame produced.
#[derive(Clone, Debug)]
pub struct FrameOutput {
    pub base: HdrImage,
    pub bloom_scene: HdrImage,
    pub bloom: BloomImages,
    /// Tone mapped and sRGB encoded.
    pub display: HdrImage,
    pub shadow: ShadowDepthMap,
    /// Base pass statistics per object.
    pub base_stats: HashMap<ObjectId, RasterStats>,
    pub passes: Vec<PassKind>,
}

impl FrameOutput {
    /// Accumulated bloom added by the composite.
    pub fn glow(&self) -> &HdrImage {
        &self.bloom.glow
    }
}

/// Per-frame transforms of the viewer.
struct View {
    view_proj: Mat4,
    inv_view_proj: Mat4,
    position: Vec3,
}

fn surface_program(object: &SceneObject) -> Box<dyn SurfaceProgram> {
    match object.shading_snapshot() {
        Some(params) => Box::new(ExtendedMaterial::new(
            object.material.clone(),
            DissolveHooks::new(params),
        )),
        None => Box::new(ExtendedMaterial::new(object.material.clone(), NoHooks)),
    }
}

fn depth_program(object: &SceneObject) -> Box<dyn DepthProgram> {
    match object.shading_snapshot() {
        Some(params) => Box::new(DepthVariant::new(DissolveHooks::new(params))),
        None => Box::new(DepthVariant::new(NoHooks)),
    }
}

fn lit_cull(object: &SceneObject) -> Cull {
    if object.double_sided { Cull::None } else { Cull::Back }
}

fn shadow_cull(object: &SceneObject) -> Cull {
    if object.double_sided { Cull::None } else { Cull::Front }
}

/// Run the vertex stage of `object` and hand every triangle to `visit`.
fn for_each_triangle(
    object: &SceneObject,
    view_proj: Mat4,
    displace: impl Fn(Vec3, Vec3) -> Vec3,
    mut visit: impl FnMut(&[ClipVertex; 3]),
) {
    let normal_matrix = object.normal_matrix();
    let vertices: Vec<ClipVertex> = object
        .mesh
        .vertices
        .iter()
        .map(|v| {
            let position = Vec3::from(v.position);
            let normal = Vec3::from(v.normal);
            let displaced = displace(position, normal);
            let world = object.transform * displaced.extend(1.0);
            ClipVertex {
                clip: view_proj * world,
                object_position: position,
                world_position: world.truncate(),
                world_normal: (normal_matrix * normal.extend(0.0)).truncate(),
            }
        })
        .collect();
    for tri in object.mesh.indices.chunks_exact(3) {
        visit(&[
            vertices[tri[0] as usize],
            vertices[tri[1] as usize],
            vertices[tri[2] as usize],
        ]);
    }
}

/// Reference implementation of the frame pipeline.
pub struct ReferenceRenderer {
    pub settings: RenderSettings,
    layout: TargetLayout,
    resize: ResizeQueue,
    schedule: FrameSchedule,
    state: PipelineState,
    clock: FrameClock,
}

impl ReferenceRenderer {
    /// Renderer for a `width` x `height` viewport.
    pub fn new(width: u32, height: u32, settings: RenderSettings) -> Self {
        let layout = TargetLayout::for_viewport(width, height, settings.bloom.levels);
        Self {
            resize: ResizeQueue::new(layout.viewport.width, layout.viewport.height),
            schedule: FrameSchedule::standard(layout.level_count()),
            layout,
            settings,
            state: PipelineState::Idle,
            clock: FrameClock::new(),
        }
    }

    /// Target sizes of the current viewport.
    pub fn layout(&self) -> &TargetLayout {
        &self.layout
    }

    /// Passes run by each frame.
    pub fn schedule(&self) -> &FrameSchedule {
        &self.schedule
    }

    /// Lifecycle state after the last frame.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Frames rendered so far.
    pub fn frame_count(&self) -> u64 {
        self.clock.frame()
    }

    /// Queue a viewport change; applied at the start of the next frame.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.resize.request(width, height);
    }

    fn apply_resize(&mut self, orbit: &mut OrbitController) {
        if let Some(size) = self.resize.take() {
            self.layout =
                TargetLayout::for_viewport(size.width, size.height, self.settings.bloom.levels);
            self.schedule = FrameSchedule::standard(self.layout.level_count());
            orbit.set_aspect_ratio(size.width, size.height);
            log::info!("Applied resize to {}x{}", size.width, size.height);
        }
    }

    /// Render one frame and advance the orbit controller.
    pub fn render_frame(
        &mut self,
        scene: &Scene,
        orbit: &mut OrbitController,
        time: f32,
    ) -> Result<FrameOutput, FrameError> {
        if self.state == PipelineState::Idle {
            self.state = PipelineState::Running;
        }
        self.clock.tick(time);
        self.apply_resize(orbit);

        let layout = self.layout.clone();
        let viewport = layout.viewport;
        let config = self.settings.bloom.clone();
        let view_proj = orbit.camera.view_projection_matrix();
        let view = View {
            view_proj,
            inv_view_proj: view_proj.inverse(),
            position: orbit.camera.position,
        };
        let casters: Vec<ObjectId> = scene
            .objects()
            .filter(|(_, object)| object.casts_shadow)
            .map(|(id, _)| id)
            .collect();
        let bloom_mask = Layers::layer(BLOOM_LAYER);
        let base_mask = Layers::default();

        let mut shadow = ShadowDepthMap::new(
            light_view_projection(&scene.light, &self.settings.shadow),
            &self.settings.shadow,
        );
        let mut bloom_scene = HdrImage::new(viewport, Vec4::ZERO);
        let mut bloom = BloomImages::new(&layout, HdrImage::new(viewport, Vec4::ZERO));
        let mut base = HdrImage::new(viewport, scene.clear_color.extend(1.0));
        let mut base_stats = HashMap::new();
        let mut display = HdrImage::new(viewport, Vec4::ZERO);
        let mut passes = Vec::with_capacity(self.schedule.len());

        for pass in self.schedule.iter() {
            match pass {
                PassKind::ShadowDepth => {
                    for id in &casters {
                        if let Some(object) = scene.get(*id) {
                            render_depth(object, &mut shadow);
                        }
                    }
                }
                PassKind::BloomScene => {
                    render_lit(scene, bloom_mask, &view, &shadow, &mut bloom_scene);
                }
                PassKind::BloomHighPass => {
                    layout.expect("bloom-scene", viewport, bloom_scene.size())?;
                    bloom.bright = bloom::high_pass_image(&bloom_scene, &config);
                }
                PassKind::BloomBlur { level } => bloom.blur_level(&layout, level, &config),
                PassKind::BloomAccumulate => bloom.accumulate(&config),
                PassKind::Base => {
                    base_stats = render_lit(scene, base_mask, &view, &shadow, &mut base);
                }
                PassKind::Composite => {
                    layout.expect("base-buffer", viewport, base.size())?;
                    layout.expect("glow-buffer", viewport, bloom.glow.size())?;
                    display = composite(&base, &bloom.glow, &self.settings);
                }
                PassKind::Present => {}
                PassKind::CameraUpdate => {
                    orbit.update(time);
                }
            }
            passes.push(pass);
        }

        Ok(FrameOutput {
            base,
            bloom_scene,
            bloom,
            display,
            shadow,
            base_stats,
            passes,
        })
    }
}

fn render_depth(object: &SceneObject, shadow: &mut ShadowDepthMap) {
    let program = depth_program(object);
    let size = TargetSize::new(shadow.size, shadow.size);
    let cull = shadow_cull(object);
    for_each_triangle(
        object,
        shadow.light_matrix,
        |p, n| program.vertex(p, n),
        |tri| {
            rasterize_triangle(tri, size, cull, |f| {
                if program.keeps(f.object_position) {
                    shadow.write(f.x, f.y, f.depth);
                }
            });
        },
    );
}

/// Fill `target` with the skybox as seen through every pixel center.
fn draw_sky(faces: &crate::texture::CubeFaces, view: &View, target: &mut HdrImage) {
    let size = target.size();
    for y in 0..size.height {
        for x in 0..size.width {
            let uv = pixel_uv(x, y, size);
            let ndc = Vec2::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
            let dir = view_direction(view.inv_view_proj, view.position, ndc);
            target.set(x, y, faces.sample(dir).extend(1.0));
        }
    }
}

/// Draw everything `mask` selects, lit and shadowed, into `target` with a
/// fresh depth buffer. The skybox goes first when the mask includes it.
fn render_lit(
    scene: &Scene,
    mask: Layers,
    view: &View,
    shadow: &ShadowDepthMap,
    target: &mut HdrImage,
) -> HashMap<ObjectId, RasterStats> {
    let size = target.size();
    if let Some(sky) = scene.skybox.as_ref().filter(|sky| sky.is_visible(mask)) {
        draw_sky(&sky.faces, view, target);
    }
    let mut depth = DepthImage::new(size);
    let mut stats = HashMap::new();
    for id in &scene.visible(mask) {
        let Some(object) = scene.get(*id) else {
            continue;
        };
        let program = surface_program(object);
        let cull = lit_cull(object);
        let mut object_stats = RasterStats::default();
        for_each_triangle(
            object,
            view.view_proj,
            |p, n| program.vertex(p, n),
            |tri| {
                rasterize_triangle(tri, size, cull, |f| {
                    if !depth.passes(f.x, f.y, f.depth) {
                        return;
                    }
                    object_stats.fragments += 1;
                    let ctx = LightingContext {
                        view_position: view.position,
                        light: &scene.light,
                        environment: &scene.environment,
                        shadow: shadow.shadow_factor(f.world_position),
                    };
                    let fragment = Fragment {
                        object_position: f.object_position,
                        world_position: f.world_position,
                        world_normal: f.world_normal,
                    };
                    match program.fragment(&fragment, &ctx) {
                        Some(color) => {
                            depth.write(f.x, f.y, f.depth);
                            target.set(f.x, f.y, color.extend(1.0));
                        }
                        None => object_stats.discarded += 1,
                    }
                });
            },
        );
        stats.insert(*id, object_stats);
    }
    stats
}

fn composite(base: &HdrImage, glow: &HdrImage, settings: &RenderSettings) -> HdrImage {
    let size = base.size();
    let mut out = HdrImage::new(size, Vec4::ZERO);
    for y in 0..size.height {
        for x in 0..size.width {
            let color = composite_pixel(
                base.get(x, y).truncate(),
                glow.get(x, y).truncate(),
                settings.exposure,
                settings.tone_mapping,
                true,
            );
            out.set(x, y, color.extend(1.0));
        }
    }
    out
}

/// Texels where the color variant of `object` keeps at least one fragment,
/// rasterized with `view_proj` and the culling of the shadow pass.
pub fn color_coverage(object: &SceneObject, view_proj: Mat4, size: TargetSize) -> Vec<bool> {
    let program = surface_program(object);
    let mut mask = vec![false; size.pixel_count()];
    for_each_triangle(
        object,
        view_proj,
        |p, n| program.vertex(p, n),
        |tri| {
            rasterize_triangle(tri, size, shadow_cull(object), |f| {
                if program.keeps(f.object_position) {
                    mask[(f.y * size.width + f.x) as usize] = true;
                }
            });
        },
    );
    mask
}

/// Texels of a shadow map that received depth.
pub fn shadow_coverage(shadow: &ShadowDepthMap) -> Vec<bool> {
    shadow.depths.iter().map(|&d| d > 0.0).collect()
}

/// Pixels covered by bloom-layer geometry, dilated by `radius` pixels per
/// axis (a square neighbourhood).
pub fn dilate(mask: &[bool], size: TargetSize, radius: u32) -> Vec<bool> {
    let (w, h) = (size.width as usize, size.height as usize);
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let r = radius as usize;
    let mut rows = vec![false; mask.len()];
    for y in 0..h {
        for x in 0..w {
            let lo = x.saturating_sub(r);
            let hi = (x + r).min(w - 1);
            rows[y * w + x] = (lo..=hi).any(|sx| mask[y * w + sx]);
        }
    }
    let mut out = vec![false; mask.len()];
    for y in 0..h {
        for x in 0..w {
            let lo = y.saturating_sub(r);
            let hi = (y + r).min(h - 1);
            out[y * w + x] = (lo..=hi).any(|sy| rows[sy * w + x]);
        }
    }
    out
}

/// Uv of a pixel center.
pub fn pixel_uv(x: u32, y: u32, size: TargetSize) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) / size.width as f32,
        (y as f32 + 0.5) / size.height as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dilate_square() {
        let size = TargetSize::new(5, 5);
        let mut mask = vec![false; 25];
        mask[12] = true;
        let out = dilate(&mask, size, 1);
        assert_eq!(out.iter().filter(|&&b| b).count(), 9);
        assert!(out[6] && out[18] && !out[0]);
    }

    #[test]
    fn test_dilate_empty_target() {
        assert!(dilate(&[], TargetSize::new(0, 4), 2).is_empty());
        assert!(dilate(&[], TargetSize::new(4, 0), 2).is_empty());
    }

    #[test]
    fn test_discard_ratio_of_empty_stats() {
        assert_eq!(RasterStats::default().discard_ratio(), 0.0);
    }

    #[test]
    fn test_pixel_uv_center() {
        assert_eq!(pixel_uv(0, 1, TargetSize::new(2, 4)), Vec2::new(0.25, 0.375));
    }
}
