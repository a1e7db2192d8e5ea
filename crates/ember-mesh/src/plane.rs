//! Flat, subdivided rectangle.

use crate::mesh_data::MeshData;
use crate::vertex::MeshVertex;

/// Build a `width x height` plane in the XY plane, centered on the origin,
/// facing +Z, split into `segments x segments` quads.
pub fn plane(width: f32, height: f32, segments: u32) -> MeshData {
    let segs = segments.max(1) as usize;
    let stride = segs + 1;
    let mut vertices = Vec::with_capacity(stride * stride);
    let mut indices = Vec::with_capacity(segs * segs * 6);

    for iy in 0..=segs {
        let fy = iy as f32 / segs as f32;
        let y = height * 0.5 - fy * height;
        for ix in 0..=segs {
            let fx = ix as f32 / segs as f32;
            let x = fx * width - width * 0.5;
            vertices.push(MeshVertex::new([x, y, 0.0], [0.0, 0.0, 1.0], [fx, 1.0 - fy]));
        }
    }

    for iy in 0..segs {
        for ix in 0..segs {
            let a = (ix + stride * iy) as u32;
            let b = (ix + stride * (iy + 1)) as u32;
            let c = (ix + 1 + stride * (iy + 1)) as u32;
            let d = (ix + 1 + stride * iy) as u32;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    MeshData::new(vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_plane_counts() {
        let mesh = plane(10.0, 10.0, 32);
        assert_eq!(mesh.vertex_count(), 33 * 33);
        assert_eq!(mesh.triangle_count(), 32 * 32 * 2);
        assert_eq!(mesh.validate(), Ok(()));
    }

    #[test]
    fn test_plane_area_and_extent() {
        let mesh = plane(10.0, 4.0, 8);
        assert!((mesh.surface_area() - 40.0).abs() < 1e-3);
        for v in &mesh.vertices {
            assert!(v.position[0].abs() <= 5.0 + 1e-6);
            assert!(v.position[1].abs() <= 2.0 + 1e-6);
            assert_eq!(v.position[2], 0.0);
        }
    }

    #[test]
    fn test_plane_faces_positive_z() {
        let mesh = plane(2.0, 2.0, 3);
        for [a, b, c] in mesh.triangles() {
            let n = (Vec3::from(b.position) - Vec3::from(a.position))
                .cross(Vec3::from(c.position) - Vec3::from(a.position));
            assert!(n.z > 0.0, "triangle normal {n:?}");
        }
    }

    #[test]
    fn test_zero_segments_clamped() {
        let mesh = plane(1.0, 1.0, 0);
        assert_eq!(mesh.triangle_count(), 2);
    }
}
