//! Procedural geometry for the Ember renderer: the dissolving icosphere, the
//! shadow-receiving plane, and the CPU-side mesh container both share.

pub mod icosphere;
pub mod mesh_data;
pub mod plane;
pub mod vertex;

pub use icosphere::{ICOSAHEDRON_FACES, ICOSAHEDRON_VERTICES, icosphere};
pub use mesh_data::{MeshData, MeshError};
pub use plane::plane;
pub use vertex::{MESH_VERTEX_ATTRIBUTES, MESH_VERTEX_LAYOUT, MeshVertex};
