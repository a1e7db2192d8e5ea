//! Background asset loading.
//!
//! A worker thread builds the dissolve mesh (a glTF model when one is
//! configured, the icosphere otherwise) and decodes the environment faces,
//! sending each result over a channel. The frame loop drains the
//! channel at the frame boundary, so the renderer never blocks on assets.

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use ember_config::Config;
use ember_mesh::{MeshData, MeshError, MeshVertex, icosphere};
use ember_render::texture::CUBE_FACE_NAMES;
use ember_render::{CubeFaces, TextureError};
use tracing::{info, warn};

/// Image extensions tried for each face, in order.
pub const FACE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("no {face} face in {dir}")]
    MissingFace { face: &'static str, dir: PathBuf },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("face {face} is {width}x{height}, expected {size}x{size}")]
    FaceSize {
        face: &'static str,
        width: u32,
        height: u32,
        size: u32,
    },

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error("failed to import {path}: {source}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("{0} has no triangle primitive with positions")]
    NoPrimitive(PathBuf),

    #[error("{path}: {source}")]
    Mesh {
        path: PathBuf,
        #[source]
        source: MeshError,
    },
}

/// A finished load.
#[derive(Debug)]
pub enum LoadedAsset {
    DissolveMesh(MeshData),
    Environment(CubeFaces),
    Failed(AssetError),
}

/// What the worker should produce.
#[derive(Clone, Debug)]
pub struct LoadRequest {
    pub sphere_radius: f32,
    pub sphere_detail: u32,
    pub environment_dir: Option<PathBuf>,
    pub mesh_path: Option<PathBuf>,
}

impl LoadRequest {
    /// Mesh, environment and model settings from the scene config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            sphere_radius: config.scene.sphere_radius,
            sphere_detail: config.scene.sphere_detail,
            environment_dir: config.scene.environment_dir.clone(),
            mesh_path: config.scene.mesh_path.clone(),
        }
    }
}

/// Handle to the loader thread and its result channel.
pub struct AssetLoader {
    receiver: Receiver<LoadedAsset>,
    worker: Option<JoinHandle<()>>,
}

impl AssetLoader {
    /// Start loading on a worker thread.
    pub fn spawn(request: LoadRequest) -> std::io::Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let worker = std::thread::Builder::new()
            .name("ember-loader".into())
            .spawn(move || load_all(&request, &sender))?;
        Ok(Self {
            receiver,
            worker: Some(worker),
        })
    }

    /// Everything that arrived since the last call.
    pub fn drain(&mut self) -> Vec<LoadedAsset> {
        let mut out = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(asset) => out.push(asset),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if let Some(worker) = self.worker.take()
                        && worker.join().is_err()
                    {
                        warn!("Asset loader thread panicked");
                    }
                    break;
                }
            }
        }
        out
    }

    /// Whether the worker has finished and every result was drained.
    pub fn is_finished(&self) -> bool {
        self.worker.is_none()
    }

    /// Block until the worker is done and return every result.
    pub fn wait(mut self) -> Vec<LoadedAsset> {
        let out: Vec<LoadedAsset> = self.receiver.iter().collect();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("Asset loader thread panicked");
        }
        out
    }
}

fn load_all(request: &LoadRequest, sender: &Sender<LoadedAsset>) {
    let loaded = request.mesh_path.as_deref().and_then(|path| match load_gltf_mesh(path) {
        Ok(mesh) => Some(mesh),
        Err(e) => {
            let _ = sender.send(LoadedAsset::Failed(e));
            None
        }
    });
    let mesh = loaded.unwrap_or_else(|| icosphere(request.sphere_radius, request.sphere_detail));
    info!(
        vertices = mesh.vertices.len(),
        triangles = mesh.indices.len() / 3,
        "Dissolve mesh ready"
    );
    if sender.send(LoadedAsset::DissolveMesh(mesh)).is_err() {
        return;
    }

    if let Some(dir) = &request.environment_dir {
        let asset = match load_environment(dir) {
            Ok(faces) => {
                info!(size = faces.size, dir = %dir.display(), "Environment map decoded");
                LoadedAsset::Environment(faces)
            }
            Err(e) => LoadedAsset::Failed(e),
        };
        let _ = sender.send(asset);
    }
}

/// Read the first triangle primitive of a glTF file.
///
/// Missing normals are rebuilt from the faces. Missing UVs are zero. A
/// primitive without indices is read as a plain triangle list.
pub fn load_gltf_mesh(path: &Path) -> Result<MeshData, AssetError> {
    let (document, buffers, _images) = gltf::import(path).map_err(|source| AssetError::Gltf {
        path: path.to_path_buf(),
        source,
    })?;

    let primitive = document
        .meshes()
        .flat_map(|mesh| mesh.primitives())
        .find(|prim| {
            prim.mode() == gltf::mesh::Mode::Triangles
                && prim.get(&gltf::Semantic::Positions).is_some()
        })
        .ok_or_else(|| AssetError::NoPrimitive(path.to_path_buf()))?;
    let reader =
        primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| AssetError::NoPrimitive(path.to_path_buf()))?
        .collect();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|n| n.collect());
    let uvs: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|uv| uv.into_f32().collect())
        .unwrap_or_default();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let has_normals = normals.as_ref().is_some_and(|n| n.len() == positions.len());
    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let normal = normals
                .as_ref()
                .and_then(|n| n.get(i).copied())
                .unwrap_or([0.0, 1.0, 0.0]);
            let uv = uvs.get(i).copied().unwrap_or([0.0, 0.0]);
            MeshVertex::new(position, normal, uv)
        })
        .collect();

    let mut mesh = MeshData::new(vertices, indices);
    mesh.validate().map_err(|source| AssetError::Mesh {
        path: path.to_path_buf(),
        source,
    })?;
    if !has_normals {
        mesh.recompute_normals();
    }
    info!(path = %path.display(), vertices = mesh.vertex_count(), "glTF mesh imported");
    Ok(mesh)
}

/// First existing `<dir>/<face>.<ext>` for one face.
pub fn find_face(dir: &Path, face: &'static str) -> Result<PathBuf, AssetError> {
    FACE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{face}.{ext}")))
        .find(|path| path.is_file())
        .ok_or_else(|| AssetError::MissingFace {
            face,
            dir: dir.to_path_buf(),
        })
}

/// Decode the six faces in `px, nx, py, ny, pz, nz` order.
pub fn load_environment(dir: &Path) -> Result<CubeFaces, AssetError> {
    let mut size = None;
    let mut faces: [Vec<u8>; 6] = Default::default();
    for (slot, face) in faces.iter_mut().zip(CUBE_FACE_NAMES) {
        let path = find_face(dir, face)?;
        let rgba = image::open(&path)
            .map_err(|source| AssetError::Decode { path, source })?
            .to_rgba8();
        let (width, height) = rgba.dimensions();
        let expected = *size.get_or_insert(width);
        if width != expected || height != expected {
            return Err(AssetError::FaceSize {
                face,
                width,
                height,
                size: expected,
            });
        }
        *slot = rgba.into_raw();
    }
    let faces = CubeFaces {
        size: size.unwrap_or(0),
        faces,
    };
    faces.validate()?;
    Ok(faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_faces(dir: &Path, size: u32, ext: &str) {
        for (i, face) in CUBE_FACE_NAMES.iter().enumerate() {
            let pixel = image::Rgba([i as u8 * 40, 0, 0, 255]);
            let img = image::RgbaImage::from_pixel(size, size, pixel);
            img.save(dir.join(format!("{face}.{ext}"))).expect("write face");
        }
    }

    #[test]
    fn test_load_environment_png_faces() {
        let tmp = TempDir::new().unwrap();
        write_faces(tmp.path(), 4, "png");
        let faces = load_environment(tmp.path()).expect("faces");
        assert_eq!(faces.size, 4);
        assert_eq!(faces.faces[2][0], 80);
        assert_eq!(faces.faces[5].len(), 4 * 4 * 4);
    }

    #[test]
    fn test_missing_face_is_reported() {
        let tmp = TempDir::new().unwrap();
        write_faces(tmp.path(), 2, "png");
        std::fs::remove_file(tmp.path().join("pz.png")).unwrap();
        match load_environment(tmp.path()) {
            Err(AssetError::MissingFace { face, .. }) => assert_eq!(face, "pz"),
            other => panic!("expected missing face, got {other:?}"),
        }
    }

    #[test]
    fn test_non_square_faces_rejected() {
        let tmp = TempDir::new().unwrap();
        write_faces(tmp.path(), 4, "png");
        image::RgbaImage::new(4, 2)
            .save(tmp.path().join("ny.png"))
            .unwrap();
        assert!(matches!(
            load_environment(tmp.path()),
            Err(AssetError::FaceSize { face: "ny", .. })
        ));
    }

    #[test]
    fn test_worker_delivers_mesh_then_failure() {
        let tmp = TempDir::new().unwrap();
        let loader = AssetLoader::spawn(LoadRequest {
            sphere_radius: 2.0,
            sphere_detail: 1,
            environment_dir: Some(tmp.path().to_path_buf()),
            mesh_path: None,
        })
        .unwrap();
        let assets = loader.wait();
        assert_eq!(assets.len(), 2);
        assert!(matches!(assets[0], LoadedAsset::DissolveMesh(_)));
        assert!(matches!(
            assets[1],
            LoadedAsset::Failed(AssetError::MissingFace { .. })
        ));
    }

    /// One triangle in the XY plane, counter-clockwise, no normals.
    const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "buffers": [{
            "byteLength": 44,
            "uri": "data:application/octet-stream;base64,AAABAAIAAAAAAAAAAAAAAAAAAAAAAIA/AAAAAAAAAAAAAAAAAACAPwAAAAA="
        }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 6, "target": 34963 },
            { "buffer": 0, "byteOffset": 8, "byteLength": 36, "target": 34962 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5123, "count": 3, "type": "SCALAR" },
            {
                "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            }
        ],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 1 }, "indices": 0 }] }],
        "nodes": [{ "mesh": 0 }],
        "scenes": [{ "nodes": [0] }],
        "scene": 0
    }"#;

    fn write_triangle(dir: &Path) -> PathBuf {
        let path = dir.join("triangle.gltf");
        std::fs::write(&path, TRIANGLE_GLTF).unwrap();
        path
    }

    #[test]
    fn test_gltf_triangle_imports_with_rebuilt_normals() {
        let tmp = TempDir::new().unwrap();
        let mesh = load_gltf_mesh(&write_triangle(tmp.path())).expect("mesh");
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[2].position, [0.0, 1.0, 0.0]);
        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
            assert_eq!(v.uv, [0.0, 0.0]);
        }
    }

    #[test]
    fn test_worker_delivers_configured_gltf() {
        let tmp = TempDir::new().unwrap();
        let assets = AssetLoader::spawn(LoadRequest {
            sphere_radius: 2.0,
            sphere_detail: 1,
            environment_dir: None,
            mesh_path: Some(write_triangle(tmp.path())),
        })
        .unwrap()
        .wait();
        assert_eq!(assets.len(), 1);
        match &assets[0] {
            LoadedAsset::DissolveMesh(mesh) => assert_eq!(mesh.triangle_count(), 1),
            other => panic!("expected mesh, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_gltf_falls_back_to_icosphere() {
        let tmp = TempDir::new().unwrap();
        let assets = AssetLoader::spawn(LoadRequest {
            sphere_radius: 2.0,
            sphere_detail: 1,
            environment_dir: None,
            mesh_path: Some(tmp.path().join("missing.glb")),
        })
        .unwrap()
        .wait();
        assert_eq!(assets.len(), 2);
        assert!(matches!(
            assets[0],
            LoadedAsset::Failed(AssetError::Gltf { .. })
        ));
        match &assets[1] {
            LoadedAsset::DissolveMesh(mesh) => {
                assert_eq!(mesh, &icosphere(2.0, 1));
            }
            other => panic!("expected icosphere, got {other:?}"),
        }
    }

    #[test]
    fn test_gltf_without_meshes_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.gltf");
        std::fs::write(&path, r#"{ "asset": { "version": "2.0" } }"#).unwrap();
        assert!(matches!(
            load_gltf_mesh(&path),
            Err(AssetError::NoPrimitive(_))
        ));
    }

    #[test]
    fn test_drain_eventually_finishes() {
        let mut loader = AssetLoader::spawn(LoadRequest {
            sphere_radius: 1.0,
            sphere_detail: 0,
            environment_dir: None,
            mesh_path: None,
        })
        .unwrap();
        let mut assets = Vec::new();
        while !loader.is_finished() {
            assets.extend(loader.drain());
            std::thread::yield_now();
        }
        assert_eq!(assets.len(), 1);
    }
}
