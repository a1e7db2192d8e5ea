//! End-to-end checks of the reference frame pipeline.

use std::sync::Arc;

use ember_config::Config;
use ember_lighting::PbrMaterial;
use ember_materials::{PROCESS_MAX, PROCESS_MIN, SharedShadingParams};
use ember_mesh::icosphere;
use ember_render::reference::{color_coverage, dilate, pixel_uv, shadow_coverage};
use ember_render::skybox::view_direction;
use ember_render::scene::{dissolve_object, shading_params};
use ember_render::{
    BLOOM_LAYER, CubeFaces, FrameOutput, Layers, ObjectId, OrbitController, PipelineState,
    ReferenceRenderer, RenderSettings, Scene, SceneObject, TargetSize, base_scene,
};
use glam::{Vec2, Vec3};

const SIZE: u32 = 256;

fn test_config() -> Config {
    let mut config = Config::default();
    config.bloom.levels = 2;
    config.render.shadow_map_size = 256;
    config.scene.plane_segments = 4;
    config
}

fn renderer(config: &Config) -> ReferenceRenderer {
    ReferenceRenderer::new(SIZE, SIZE, RenderSettings::from_config(config))
}

fn orbit(config: &Config) -> OrbitController {
    OrbitController::from_config(&config.scene, SIZE, SIZE)
}

fn emissive_sphere(layers: Layers) -> SceneObject {
    SceneObject::new(
        "sphere",
        Arc::new(icosphere(2.0, 4)),
        PbrMaterial::emissive(Vec3::ONE, 2.0),
    )
    .with_layers(layers)
}

fn bloom_layers() -> Layers {
    let mut layers = Layers::default();
    layers.enable(BLOOM_LAYER);
    layers
}

fn render(config: &Config, scene: &Scene) -> FrameOutput {
    renderer(config)
        .render_frame(scene, &mut orbit(config), 0.0)
        .expect("reference frame")
}

fn scene_without_plane(config: &Config) -> Scene {
    let mut scene = base_scene(config);
    for id in scene.ids() {
        scene.remove(id);
    }
    scene
}

fn dissolve_scene(config: &Config, process: f32) -> (Scene, ObjectId) {
    dissolve_scene_with_edge(config, process, config.material.edge_width)
}

fn dissolve_scene_with_edge(config: &Config, process: f32, edge_width: f32) -> (Scene, ObjectId) {
    let mut params = shading_params(&config.material);
    params.set_process(process);
    params.edge_width = edge_width;
    let mut scene = base_scene(config);
    let id = scene.add(dissolve_object(
        Arc::new(icosphere(2.0, 4)),
        &config.material,
        SharedShadingParams::new(params),
    ));
    (scene, id)
}

#[test]
fn test_glow_stays_near_bloom_silhouette() {
    let config = test_config();
    let mut scene = base_scene(&config);
    scene.add(emissive_sphere(bloom_layers()));
    let out = render(&config, &scene);

    let size = out.bloom_scene.size();
    let mask: Vec<bool> = out.bloom_scene.pixels().iter().map(|p| p.w > 0.0).collect();
    assert!(mask.iter().any(|&covered| covered));
    assert!(out.glow().max_rgb() > 0.0);

    let footprint = RenderSettings::from_config(&config).bloom.footprint().ceil() as u32;
    let reach = dilate(&mask, size, footprint);
    for (x, y) in out.glow().nonzero_pixels() {
        assert!(
            reach[(y * size.width + x) as usize],
            "glow at ({x}, {y}) is beyond {footprint} px of the bloom silhouette"
        );
    }
}

#[test]
fn test_default_layer_objects_do_not_glow() {
    let config = test_config();
    let mut scene = base_scene(&config);
    scene.add(emissive_sphere(Layers::default()));
    let out = render(&config, &scene);

    assert_eq!(out.bloom_scene.max_rgb(), 0.0);
    assert_eq!(out.glow().max_rgb(), 0.0);
    // Still drawn in the base pass.
    assert!(out.base.max_rgb() > 1.0);
}

#[test]
fn test_default_layer_objects_never_glow_for_any_bloom_setting() {
    for (strength, radius, threshold) in [
        (0.5, 0.25, 0.2),
        (0.5, 0.0, 0.0),
        (3.0, 0.25, 0.2),
        (3.0, 1.0, 0.0),
        (10.0, 0.5, 0.2),
        (10.0, 1.0, 0.0),
    ] {
        let mut config = test_config();
        config.bloom.strength = strength;
        config.bloom.radius = radius;
        config.bloom.threshold = threshold;
        let mut scene = base_scene(&config);
        scene.add(emissive_sphere(Layers::default()));
        let out = render(&config, &scene);
        assert_eq!(
            out.glow().max_rgb(),
            0.0,
            "glow with strength {strength:?}, radius {radius:?}, threshold {threshold:?}"
        );
        assert!(out.base.max_rgb() > 1.0);
    }
}

#[test]
fn test_white_sphere_over_black_plane_glows_only_near_sphere() {
    // Five levels reach several hundred pixels, so the viewport is wide
    // enough to leave pixels the glow can never touch.
    let (width, height) = (1536, 128);
    let mut config = test_config();
    config.bloom.levels = 5;
    config.bloom.strength = 0.5;
    config.bloom.radius = 0.25;
    config.bloom.threshold = 0.2;

    let mut scene = base_scene(&config);
    for id in scene.ids() {
        if let Some(plane) = scene.get_mut(id) {
            plane.material = PbrMaterial::matte(Vec3::ZERO);
            assert!(!plane.layers.contains(BLOOM_LAYER));
        }
    }
    scene.add(
        SceneObject::new(
            "sphere",
            Arc::new(icosphere(2.0, 4)),
            PbrMaterial::emissive(Vec3::ONE, 1.0),
        )
        .with_layers(bloom_layers()),
    );

    let settings = RenderSettings::from_config(&config);
    let footprint = settings.bloom.footprint().ceil() as u32;
    let mut renderer = ReferenceRenderer::new(width, height, settings);
    let mut orbit = OrbitController::from_config(&config.scene, width, height);
    let out = renderer.render_frame(&scene, &mut orbit, 0.0).expect("frame");
    assert_eq!(renderer.layout().level_count(), 5);

    let size = out.bloom_scene.size();
    let mask: Vec<bool> = out.bloom_scene.pixels().iter().map(|p| p.w > 0.0).collect();
    let reach = dilate(&mask, size, footprint);
    assert!(out.glow().max_rgb() > 0.0);
    assert!(reach.iter().any(|&r| !r), "footprint {footprint} covers the whole viewport");
    for (i, pixel) in out.glow().pixels().iter().enumerate() {
        if !reach[i] {
            assert_eq!(pixel.truncate(), Vec3::ZERO, "glow at pixel {i}");
        }
    }
    // Glow is non-zero on the silhouette itself.
    for (i, &covered) in mask.iter().enumerate() {
        if covered {
            assert!(out.glow().pixels()[i].truncate().max_element() > 0.0, "pixel {i}");
        }
    }
}

#[test]
fn test_plane_does_not_change_glow() {
    let config = test_config();

    let mut with_plane = base_scene(&config);
    with_plane.add(emissive_sphere(bloom_layers()));
    let mut without_plane = scene_without_plane(&config);
    without_plane.add(emissive_sphere(bloom_layers()));

    let a = render(&config, &with_plane);
    let b = render(&config, &without_plane);
    assert_eq!(a.glow(), b.glow());
    assert_ne!(a.base, b.base);
}

#[test]
fn test_sphere_shadows_the_plane() {
    let config = test_config();
    let mut scene = base_scene(&config);
    scene.add(emissive_sphere(bloom_layers()));
    let out = render(&config, &scene);

    let plane_z = config.scene.plane_offset;
    assert_eq!(out.shadow.shadow_factor(Vec3::new(0.0, 0.0, plane_z)), 0.0);
    assert_eq!(out.shadow.shadow_factor(Vec3::new(4.5, 4.5, plane_z)), 1.0);
}

#[test]
fn test_frame_runs_full_schedule() {
    let config = test_config();
    let scene = base_scene(&config);
    let mut renderer = renderer(&config);
    assert_eq!(renderer.state(), PipelineState::Idle);

    let out = renderer
        .render_frame(&scene, &mut orbit(&config), 0.0)
        .expect("frame");
    assert_eq!(renderer.state(), PipelineState::Running);
    assert_eq!(out.passes, renderer.schedule().passes().to_vec());
    assert_eq!(renderer.frame_count(), 1);
}

#[test]
fn test_resize_applies_on_next_frame() {
    let config = test_config();
    let scene = base_scene(&config);
    let mut renderer = renderer(&config);
    let mut orbit = orbit(&config);
    renderer.render_frame(&scene, &mut orbit, 0.0).expect("first frame");

    renderer.on_resize(128, 64);
    assert_eq!(renderer.layout().viewport, TargetSize::new(SIZE, SIZE));
    let out = renderer.render_frame(&scene, &mut orbit, 0.1).expect("resized frame");

    let layout = renderer.layout();
    assert_eq!(layout.viewport, TargetSize::new(128, 64));
    assert_eq!(layout.level_count(), 2);
    assert_eq!(layout.level(0), Some(TargetSize::new(64, 32)));
    assert_eq!(layout.level(1), Some(TargetSize::new(32, 16)));
    assert_eq!(out.base.size(), layout.viewport);
    assert_eq!(out.glow().size(), layout.viewport);
    assert_eq!(out.display.size(), layout.viewport);
    assert!((orbit.camera.aspect - 2.0).abs() < 1e-6);
}

#[test]
fn test_zero_size_resize_is_ignored() {
    let config = test_config();
    let scene = base_scene(&config);
    let mut renderer = renderer(&config);
    renderer.on_resize(0, 0);
    let out = renderer
        .render_frame(&scene, &mut orbit(&config), 0.0)
        .expect("frame");
    assert_eq!(out.base.size(), TargetSize::new(SIZE, SIZE));
}

#[test]
fn test_minimum_process_keeps_every_fragment() {
    let config = test_config();
    let (scene, id) = dissolve_scene(&config, PROCESS_MIN);
    let out = render(&config, &scene);
    let stats = out.base_stats[&id];
    assert!(stats.fragments > 0);
    assert_eq!(stats.discarded, 0);
}

#[test]
fn test_maximum_process_discards_nearly_everything() {
    let config = test_config();
    let (scene, id) = dissolve_scene(&config, PROCESS_MAX);
    let out = render(&config, &scene);
    let stats = out.base_stats[&id];
    assert!(stats.fragments > 0);
    assert!(stats.discard_ratio() > 0.95, "ratio {}", stats.discard_ratio());
    // Discarded fragments cast no shadow either.
    let plane_z = config.scene.plane_offset;
    assert_eq!(out.shadow.shadow_factor(Vec3::new(0.0, 0.0, plane_z)), 1.0);
}

#[test]
fn test_color_and_shadow_discard_masks_match_per_texel() {
    let config = test_config();
    for process in [-6.0, 0.0, 6.0] {
        let (scene, id) = dissolve_scene(&config, process);
        let out = render(&config, &scene);
        let object = scene.get(id).expect("dissolve object");

        let size = TargetSize::new(out.shadow.size, out.shadow.size);
        let color = color_coverage(object, out.shadow.light_matrix, size);
        let depth = shadow_coverage(&out.shadow);
        let covered = depth.iter().filter(|&&d| d).count();
        assert!(covered > 0, "process {process:?} left no shadow");
        let mismatched = color.iter().zip(&depth).filter(|(c, d)| c != d).count();
        assert_eq!(mismatched, 0, "process {process:?}: {mismatched} of {covered} texels differ");
    }
}

#[test]
fn test_dissolve_holes_show_in_shadow() {
    let config = test_config();
    let (solid, _) = dissolve_scene(&config, PROCESS_MIN);
    let (holed, _) = dissolve_scene(&config, 0.0);
    let full = shadow_coverage(&render(&config, &solid).shadow);
    let partial = shadow_coverage(&render(&config, &holed).shadow);
    let full_count = full.iter().filter(|&&c| c).count();
    let partial_count = partial.iter().filter(|&&c| c).count();
    assert!(partial_count < full_count, "{partial_count} vs {full_count}");
    assert!(partial.iter().zip(&full).all(|(p, f)| !p || *f));
}

#[test]
fn test_dissolve_edge_feeds_bloom() {
    let config = test_config();
    let (scene, _) = dissolve_scene_with_edge(&config, 0.0, 6.0);
    let out = render(&config, &scene);
    assert!(out.bloom_scene.max_rgb() > 0.0);
    assert!(out.glow().max_rgb() > 0.0);
}

#[test]
fn test_identical_inputs_render_identically() {
    let config = test_config();
    let (scene, _) = dissolve_scene(&config, -4.0);
    let a = render(&config, &scene);
    let b = render(&config, &scene);
    assert_eq!(a.base, b.base);
    assert_eq!(a.display, b.display);
}

fn labelled_sky() -> CubeFaces {
    CubeFaces {
        size: 2,
        faces: std::array::from_fn(|i| {
            let shade = 30 + 35 * i as u8;
            [shade, 255 - shade, 90, 255].repeat(4)
        }),
    }
}

#[test]
fn test_skybox_fills_base_background_only() {
    let config = test_config();
    let mut scene = scene_without_plane(&config);
    scene.add(emissive_sphere(Layers::default()));
    scene.set_environment(Arc::new(labelled_sky())).expect("faces");

    let mut orbit = orbit(&config);
    let inv_view_proj = orbit.camera.view_projection_matrix().inverse();
    let eye = orbit.camera.position;
    let out = renderer(&config)
        .render_frame(&scene, &mut orbit, 0.0)
        .expect("frame");
    let faces = scene.skybox.as_ref().map(|sky| sky.faces.clone()).expect("skybox");

    let size = out.base.size();
    for (x, y) in [(0, 0), (SIZE - 1, 0), (0, SIZE - 1), (SIZE - 1, SIZE - 1)] {
        let uv = pixel_uv(x, y, size);
        let ndc = Vec2::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
        let expected = faces.sample(view_direction(inv_view_proj, eye, ndc));
        assert_eq!(out.base.get(x, y).truncate(), expected, "sky at ({x}, {y})");
        assert_ne!(expected, scene.clear_color);
    }
    // The sphere covers the sky at the center.
    let center = out.base.get(SIZE / 2, SIZE / 2).truncate();
    assert!(center.max_element() > 1.0, "{center:?}");

    assert_eq!(out.bloom_scene.max_rgb(), 0.0);
    assert_eq!(out.glow().max_rgb(), 0.0);
}

#[test]
fn test_skybox_never_blooms_beside_bloom_objects() {
    let config = test_config();
    let mut with_sky = scene_without_plane(&config);
    with_sky.add(emissive_sphere(bloom_layers()));
    with_sky.set_environment(Arc::new(labelled_sky())).expect("faces");
    let mut without_sky = scene_without_plane(&config);
    without_sky.add(emissive_sphere(bloom_layers()));
    // Same flat lighting so only the background differs.
    without_sky.environment = with_sky.environment.clone();

    let a = render(&config, &with_sky);
    let b = render(&config, &without_sky);
    assert_eq!(a.bloom_scene, b.bloom_scene);
    assert_eq!(a.glow(), b.glow());
    assert_ne!(a.base, b.base);
}
