//! Environment cube map: CPU face set and GPU upload.
//!
//! Faces arrive from the loader as six RGBA8 sRGB images in `px, nx, py,
//! ny, pz, nz` order, matching the layer order wgpu expects for cube views.

use glam::{Vec2, Vec3};

/// Face file stems, in cube layer order.
pub const CUBE_FACE_NAMES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];
/// sRGB faces, decoded to linear when sampled.
pub const ENVIRONMENT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextureError {
    #[error("cube face size must be non-zero")]
    ZeroDimensions,

    #[error("cube face '{face}' has {actual} bytes, expected {expected}")]
    DataSizeMismatch {
        face: &'static str,
        actual: usize,
        expected: usize,
    },
}

/// Six square RGBA8 faces of an environment cube.
#[derive(Clone, Debug, PartialEq)]
pub struct CubeFaces {
    pub size: u32,
    pub faces: [Vec<u8>; 6],
}

impl CubeFaces {
    /// A cube whose every texel is `rgba`.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            size: 1,
            faces: std::array::from_fn(|_| rgba.to_vec()),
        }
    }

    /// Bytes in one RGBA8 face.
    pub fn face_bytes(&self) -> usize {
        self.size as usize * self.size as usize * 4
    }

    /// Check the face count, size and byte lengths.
    pub fn validate(&self) -> Result<(), TextureError> {
        if self.size == 0 {
            return Err(TextureError::ZeroDimensions);
        }
        let expected = self.face_bytes();
        for (face, data) in CUBE_FACE_NAMES.iter().zip(&self.faces) {
            if data.len() != expected {
                return Err(TextureError::DataSizeMismatch {
                    face,
                    actual: data.len(),
                    expected,
                });
            }
        }
        Ok(())
    }

    /// Face index and face uv for a direction, following the cube sampling
    /// rules GPUs use: the major axis picks the face, `v` grows downwards.
    pub fn face_uv(dir: Vec3) -> (usize, Vec2) {
        let a = dir.abs();
        let (face, sc, tc, ma) = if a.x >= a.y && a.x >= a.z {
            if dir.x >= 0.0 {
                (0, -dir.z, -dir.y, a.x)
            } else {
                (1, dir.z, -dir.y, a.x)
            }
        } else if a.y >= a.z {
            if dir.y >= 0.0 {
                (2, dir.x, dir.z, a.y)
            } else {
                (3, dir.x, -dir.z, a.y)
            }
        } else if dir.z >= 0.0 {
            (4, dir.x, -dir.y, a.z)
        } else {
            (5, -dir.x, -dir.y, a.z)
        };
        let ma = ma.max(f32::MIN_POSITIVE);
        (face, Vec2::new(sc / ma, tc / ma) * 0.5 + Vec2::splat(0.5))
    }

    /// Nearest-texel linear radiance seen along `dir`.
    pub fn sample(&self, dir: Vec3) -> Vec3 {
        let (face, uv) = Self::face_uv(dir);
        let max = self.size.saturating_sub(1);
        let x = ((uv.x * self.size as f32) as u32).min(max);
        let y = ((uv.y * self.size as f32) as u32).min(max);
        let i = ((y * self.size + x) * 4) as usize;
        match self.faces[face].get(i..i + 3) {
            Some(texel) => ember_lighting::environment::average_linear_rgb(&[
                texel[0], texel[1], texel[2], 255,
            ]),
            None => Vec3::ZERO,
        }
    }

    /// Mean linear radiance over all six faces.
    pub fn average_color(&self) -> Vec3 {
        let sum: Vec3 = self
            .faces
            .iter()
            .map(|face| ember_lighting::environment::average_linear_rgb(face))
            .sum();
        sum / 6.0
    }
}

/// The cube map bound for reflections, with its view and sampler.
pub struct EnvironmentMap {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub size: u32,
}

impl EnvironmentMap {
    /// Upload six validated faces as a cube texture.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &CubeFaces,
    ) -> Result<Self, TextureError> {
        faces.validate()?;
        let size = faces.size;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("environment-cube"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ENVIRONMENT_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, data) in faces.faces.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(size * 4),
                    rows_per_image: Some(size),
                },
                wgpu::Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("environment-cube-view"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("environment-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        log::info!("Uploaded environment cube ({size}x{size} per face)");
        Ok(Self {
            texture,
            view,
            sampler,
            size,
        })
    }

    /// 1x1 placeholder used until real faces arrive.
    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Self, TextureError> {
        Self::new(device, queue, &CubeFaces::solid([0, 0, 0, 255]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device;

    #[test]
    fn test_solid_faces_validate() {
        let faces = CubeFaces::solid([255, 0, 0, 255]);
        assert_eq!(faces.validate(), Ok(()));
        let avg = faces.average_color();
        assert!((avg - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-6, "{avg:?}");
    }

    #[test]
    fn test_wrong_face_size_names_face() {
        let mut faces = CubeFaces::solid([0, 0, 0, 255]);
        faces.faces[3] = vec![0; 8];
        assert_eq!(
            faces.validate(),
            Err(TextureError::DataSizeMismatch {
                face: "ny",
                actual: 8,
                expected: 4,
            })
        );
    }

    #[test]
    fn test_zero_size_rejected() {
        let faces = CubeFaces {
            size: 0,
            faces: Default::default(),
        };
        assert_eq!(faces.validate(), Err(TextureError::ZeroDimensions));
    }

    fn labelled_faces() -> CubeFaces {
        // Each face is a single texel whose red channel encodes its index.
        CubeFaces {
            size: 1,
            faces: std::array::from_fn(|i| vec![(i as u8 + 1) * 40, 0, 0, 255]),
        }
    }

    #[test]
    fn test_axis_directions_pick_their_face() {
        let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for (expected, dir) in axes.into_iter().enumerate() {
            let (face, uv) = CubeFaces::face_uv(dir);
            assert_eq!(face, expected, "{dir:?}");
            assert!((uv - Vec2::splat(0.5)).length() < 1e-6, "{uv:?}");
        }
    }

    #[test]
    fn test_sample_reads_the_facing_texel() {
        let faces = labelled_faces();
        let px = faces.sample(Vec3::new(1.0, 0.2, -0.3));
        let nz = faces.sample(Vec3::new(0.1, 0.2, -1.0));
        assert!(px.x > 0.0 && px.x < nz.x, "{px:?} {nz:?}");
        assert_eq!(px.y, 0.0);
    }

    #[test]
    fn test_face_uv_v_grows_downwards() {
        let (_, up) = CubeFaces::face_uv(Vec3::new(0.0, 0.5, 1.0));
        let (_, down) = CubeFaces::face_uv(Vec3::new(0.0, -0.5, 1.0));
        assert!(up.y < down.y, "{up:?} {down:?}");
    }

    #[test]
    fn test_upload_cube() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let map = EnvironmentMap::placeholder(&device, &queue).unwrap();
        assert_eq!(map.texture.depth_or_array_layers(), 6);
        assert_eq!(map.size, 1);
    }
}
