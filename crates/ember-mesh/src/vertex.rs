//! Canonical vertex format shared by every Ember mesh pipeline.
//!
//! | Location | Offset | Format    | Field    |
//! |----------|--------|-----------|----------|
//! | 0        | 0      | Float32x3 | position |
//! | 1        | 12     | Float32x3 | normal   |
//! | 2        | 24     | Float32x2 | uv       |

use std::mem;

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;
use wgpu::{VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

/// A single mesh vertex in object space.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

const_assert_eq!(mem::size_of::<MeshVertex>(), 32);

impl MeshVertex {
    /// Vertex from position, normal and uv.
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Position, normal, uv at locations 0, 1 and 2.
pub const MESH_VERTEX_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 12,
        shader_location: 1,
    },
    VertexAttribute {
        format: VertexFormat::Float32x2,
        offset: 24,
        shader_location: 2,
    },
];

/// Vertex buffer layout used by the surface, depth and shadow pipelines.
pub const MESH_VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: mem::size_of::<MeshVertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &MESH_VERTEX_ATTRIBUTES,
};
