//! Mesh data structures for voxel rendering.
//!
//! - [`ChunkMesh`]: validated structure-of-arrays triangle mesh of one chunk
//! - [`MeshStreams`]: the raw streams a mesh is assembled from
//! - [`Face`]: a single visible block face and its vertex emission

mod face;
mod mesh;

pub use face::{Face, FACE_INDICES};
pub use mesh::*;
