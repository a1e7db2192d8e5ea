//! Headless rendering on the CPU reference path.

use std::path::Path;
use std::sync::Arc;

use ember_config::Config;
use ember_materials::SharedShadingParams;
use ember_render::scene::{dissolve_object, shading_params};
use ember_render::{FrameError, OrbitController, ReferenceRenderer, RenderSettings, base_scene};
use tracing::{info, warn};

use crate::loader::{AssetLoader, LoadRequest, LoadedAsset};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to start asset loader: {0}")]
    Loader(#[from] std::io::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("rendered {actual} bytes for a {width}x{height} image")]
    BufferSize { width: u32, height: u32, actual: usize },

    #[error("failed to write snapshot: {0}")]
    Image(#[from] image::ImageError),
}

/// Render one frame of the configured scene and return it as RGBA8.
pub fn render_snapshot(config: &Config) -> Result<image::RgbaImage, SnapshotError> {
    let mut scene = base_scene(config);
    let params = SharedShadingParams::new(shading_params(&config.material));
    for asset in AssetLoader::spawn(LoadRequest::from_config(config))?.wait() {
        match asset {
            LoadedAsset::DissolveMesh(mesh) => {
                scene.add(dissolve_object(Arc::new(mesh), &config.material, params.clone()));
            }
            LoadedAsset::Environment(faces) => {
                if let Err(e) = scene.set_environment(Arc::new(faces)) {
                    warn!("Environment map rejected: {e}");
                }
            }
            LoadedAsset::Failed(e) => warn!("Asset failed to load: {e}"),
        }
    }

    let (width, height) = (config.window.width, config.window.height);
    let mut renderer = ReferenceRenderer::new(width, height, RenderSettings::from_config(config));
    let mut orbit = OrbitController::from_config(&config.scene, width, height);
    let frame = renderer.render_frame(&scene, &mut orbit, 0.0)?;

    let size = frame.display.size();
    let bytes = frame.display.to_rgba8();
    let actual = bytes.len();
    image::RgbaImage::from_raw(size.width, size.height, bytes).ok_or(SnapshotError::BufferSize {
        width: size.width,
        height: size.height,
        actual,
    })
}

/// Render a snapshot and write it to `path` (format from the extension).
pub fn write_snapshot(config: &Config, path: &Path) -> Result<(), SnapshotError> {
    let image = render_snapshot(config)?;
    image.save(path)?;
    info!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "Snapshot written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.window.width = 64;
        config.window.height = 48;
        config.render.shadow_map_size = 64;
        config.scene.sphere_detail = 2;
        config.scene.plane_segments = 2;
        config
    }

    #[test]
    fn test_snapshot_has_window_size_and_content() {
        let image = render_snapshot(&small_config()).expect("snapshot");
        assert_eq!(image.dimensions(), (64, 48));
        assert!(image.pixels().any(|p| p.0[..3] != [0, 0, 0]));
        assert!(image.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn test_snapshot_writes_png() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("frame.png");
        write_snapshot(&small_config(), &path).expect("write");
        let decoded = image::open(&path).expect("decode").to_rgba8();
        assert_eq!(decoded.dimensions(), (64, 48));
    }
}
