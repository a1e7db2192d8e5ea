//! Subdivided icosahedron projected onto a sphere.
//!
//! Each of the 20 base faces is split into `(detail + 1)^2` triangles on a
//! barycentric grid, then every grid point is pushed out to `radius`. Faces
//! do not share vertices, so seams carry duplicated positions.

use std::f32::consts::PI;

use glam::Vec3;

use crate::mesh_data::MeshData;
use crate::vertex::MeshVertex;

const T: f32 = 1.618_034;

/// Unnormalized icosahedron corners.
pub const ICOSAHEDRON_VERTICES: [[f32; 3]; 12] = [
    [-1.0, T, 0.0],
    [1.0, T, 0.0],
    [-1.0, -T, 0.0],
    [1.0, -T, 0.0],
    [0.0, -1.0, T],
    [0.0, 1.0, T],
    [0.0, -1.0, -T],
    [0.0, 1.0, -T],
    [T, 0.0, -1.0],
    [T, 0.0, 1.0],
    [-T, 0.0, -1.0],
    [-T, 0.0, 1.0],
];

/// Counter-clockwise (outward) faces of the icosahedron.
pub const ICOSAHEDRON_FACES: [[u32; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// Build an icosphere of the given radius.
///
/// `detail = 0` yields the plain icosahedron (20 triangles); in general the
/// mesh has `20 * (detail + 1)^2` triangles.
pub fn icosphere(radius: f32, detail: u32) -> MeshData {
    let cols = detail as usize + 1;
    let verts_per_face = (cols + 1) * (cols + 2) / 2;
    let mut vertices = Vec::with_capacity(20 * verts_per_face);
    let mut indices = Vec::with_capacity(20 * cols * cols * 3);

    for face in ICOSAHEDRON_FACES {
        let a = Vec3::from(ICOSAHEDRON_VERTICES[face[0] as usize]);
        let b = Vec3::from(ICOSAHEDRON_VERTICES[face[1] as usize]);
        let c = Vec3::from(ICOSAHEDRON_VERTICES[face[2] as usize]);

        // grid[i][j]: row i runs from edge a-b (i = 0) to apex c (i = cols).
        let mut grid: Vec<Vec<u32>> = Vec::with_capacity(cols + 1);
        for i in 0..=cols {
            let t = i as f32 / cols as f32;
            let aj = a.lerp(c, t);
            let bj = b.lerp(c, t);
            let rows = cols - i;
            let mut row = Vec::with_capacity(rows + 1);
            for j in 0..=rows {
                let p = if rows == 0 {
                    aj
                } else {
                    aj.lerp(bj, j as f32 / rows as f32)
                };
                row.push(vertices.len() as u32);
                vertices.push(sphere_vertex(p, radius));
            }
            grid.push(row);
        }

        for i in 0..cols {
            for j in 0..2 * (cols - i) - 1 {
                let k = j / 2;
                if j % 2 == 0 {
                    indices.extend_from_slice(&[grid[i][k + 1], grid[i + 1][k], grid[i][k]]);
                } else {
                    indices.extend_from_slice(&[
                        grid[i][k + 1],
                        grid[i + 1][k + 1],
                        grid[i + 1][k],
                    ]);
                }
            }
        }
    }

    MeshData::new(vertices, indices)
}

fn sphere_vertex(p: Vec3, radius: f32) -> MeshVertex {
    let n = p.normalize();
    let u = n.z.atan2(n.x) / (2.0 * PI) + 0.5;
    let v = n.y.clamp(-1.0, 1.0).asin() / PI + 0.5;
    MeshVertex::new((n * radius).to_array(), n.to_array(), [u, v])
}
