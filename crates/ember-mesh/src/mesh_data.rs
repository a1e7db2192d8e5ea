//! CPU-side indexed triangle mesh.

use glam::Vec3;

use crate::vertex::MeshVertex;

/// Structural problems found by [`MeshData::validate`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MeshError {
    #[error("index count {0} is not a multiple of 3")]
    IncompleteTriangle(usize),
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("mesh has no triangles")]
    Empty,
}

/// Indexed triangle list ready for GPU upload or CPU rasterization.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Mesh from vertices and a triangle index list.
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Whole triangles in the index list.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterate over the triangles as vertex triples.
    pub fn triangles(&self) -> impl Iterator<Item = [MeshVertex; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                self.vertices[tri[0] as usize],
                self.vertices[tri[1] as usize],
                self.vertices[tri[2] as usize],
            ]
        })
    }

    /// Largest distance of any vertex from the object origin.
    pub fn bounding_radius(&self) -> f32 {
        self.vertices
            .iter()
            .map(|v| Vec3::from(v.position).length())
            .fold(0.0, f32::max)
    }

    /// Total area of all triangles.
    pub fn surface_area(&self) -> f32 {
        self.triangles()
            .map(|[a, b, c]| {
                let a = Vec3::from(a.position);
                let e1 = Vec3::from(b.position) - a;
                let e2 = Vec3::from(c.position) - a;
                e1.cross(e2).length() * 0.5
            })
            .sum()
    }

    /// Replace every normal with the area-weighted average of its faces.
    ///
    /// Vertices touched only by degenerate triangles get +Y.
    pub fn recompute_normals(&mut self) {
        let mut sums = vec![Vec3::ZERO; self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize);
            let (Some(va), Some(vb), Some(vc)) =
                (self.vertices.get(a), self.vertices.get(b), self.vertices.get(c))
            else {
                continue;
            };
            let pa = Vec3::from(va.position);
            let face = (Vec3::from(vb.position) - pa).cross(Vec3::from(vc.position) - pa);
            for i in [a, b, c] {
                sums[i] += face;
            }
        }
        for (vertex, sum) in self.vertices.iter_mut().zip(sums) {
            vertex.normal = sum.try_normalize().unwrap_or(Vec3::Y).to_array();
        }
    }

    /// Vertex data as raw bytes for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index data as raw bytes for upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Check that the index list forms whole, in-range triangles.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.indices.is_empty() {
            return Err(MeshError::Empty);
        }
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::IncompleteTriangle(self.indices.len()));
        }
        let vertex_count = self.vertices.len();
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> MeshData {
        let n = [0.0, 0.0, 1.0];
        MeshData::new(
            vec![
                MeshVertex::new([0.0, 0.0, 0.0], n, [0.0, 0.0]),
                MeshVertex::new([1.0, 0.0, 0.0], n, [1.0, 0.0]),
                MeshVertex::new([0.0, 1.0, 0.0], n, [0.0, 1.0]),
            ],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_recompute_normals_faces_winding() {
        let mut mesh = unit_triangle();
        for v in &mut mesh.vertices {
            v.normal = [0.0; 3];
        }
        mesh.recompute_normals();
        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_unreferenced_vertex_gets_up_normal() {
        let mut mesh = unit_triangle();
        mesh.vertices.push(MeshVertex::new([5.0, 5.0, 5.0], [0.0; 3], [0.0; 2]));
        mesh.recompute_normals();
        assert_eq!(mesh.vertices[3].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_triangle_area() {
        let mesh = unit_triangle();
        assert!((mesh.surface_area() - 0.5).abs() < 1e-6);
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        assert_eq!(unit_triangle().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut mesh = unit_triangle();
        mesh.indices[2] = 7;
        assert_eq!(
            mesh.validate(),
            Err(MeshError::IndexOutOfRange {
                index: 7,
                vertex_count: 3
            })
        );
    }

    #[test]
    fn test_validate_rejects_partial_and_empty() {
        let mut mesh = unit_triangle();
        mesh.indices.push(0);
        assert_eq!(mesh.validate(), Err(MeshError::IncompleteTriangle(4)));
        assert_eq!(MeshData::default().validate(), Err(MeshError::Empty));
    }

    #[test]
    fn test_byte_views_cover_all_data() {
        let mesh = unit_triangle();
        assert_eq!(mesh.vertex_bytes().len(), 3 * 32);
        assert_eq!(mesh.index_bytes().len(), 3 * 4);
    }
}
