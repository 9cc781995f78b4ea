//! Structure-of-arrays mesh storage for a single chunk.
//!
//! The streams are kept as flat `f32`/`u32` vectors so they can be handed to
//! the GPU layer without re-packing. A [`ChunkMesh`] can only be obtained
//! through a constructor that checks the streams agree with each other.

use thiserror::Error;

/// Components per position, normal, colour, tangent and bitangent vertex.
pub const VEC3_COMPONENTS: usize = 3;
/// Components per texture coordinate.
pub const UV_COMPONENTS: usize = 2;

/// Violations of the cross-stream invariants of a [`ChunkMesh`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    /// A stream's length is not a whole number of vertices.
    #[error("{stream} stream has {len} components, not a multiple of {components}")]
    PartialVertex {
        stream: &'static str,
        len: usize,
        components: usize,
    },
    /// A stream describes a different number of vertices than `positions`.
    #[error("{stream} stream describes {actual} vertices, positions describe {expected}")]
    VertexCountMismatch {
        stream: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The index stream does not describe whole triangles.
    #[error("index count {0} is not a multiple of 3")]
    IncompleteTriangle(usize),
    /// An index points past the last vertex.
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Raw, unchecked mesh streams.
///
/// Fill this in and pass it to [`ChunkMesh::new`] to get a validated mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshStreams {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub colors: Vec<f32>,
    pub texcoords: Option<Vec<f32>>,
    pub tangents: Option<Vec<f32>>,
    pub bitangents: Option<Vec<f32>>,
    pub indices: Vec<u32>,
}

impl MeshStreams {
    /// Number of whole vertices described by `positions`.
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / VEC3_COMPONENTS
    }
}

/// Validated triangle mesh of one chunk, in world-space coordinates.
///
/// Invariants:
/// - `positions.len()` is a multiple of 3, and every other present stream
///   describes the same number of vertices.
/// - `indices.len()` is a multiple of 3.
/// - every index is smaller than the vertex count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkMesh {
    streams: MeshStreams,
}

impl ChunkMesh {
    /// Validates `streams` and wraps them.
    pub fn new(streams: MeshStreams) -> Result<Self, MeshError> {
        Self::validate(&streams)?;
        Ok(Self { streams })
    }

    /// Wraps streams produced by the mesh builder, which upholds the
    /// invariants by construction.
    pub(crate) fn from_builder(streams: MeshStreams) -> Self {
        debug_assert_eq!(Self::validate(&streams), Ok(()));
        Self { streams }
    }

    fn validate(streams: &MeshStreams) -> Result<(), MeshError> {
        if streams.positions.len() % VEC3_COMPONENTS != 0 {
            return Err(MeshError::PartialVertex {
                stream: "positions",
                len: streams.positions.len(),
                components: VEC3_COMPONENTS,
            });
        }
        let vertex_count = streams.vertex_count();

        let optional = [
            ("normals", Some(&streams.normals), VEC3_COMPONENTS),
            ("colors", Some(&streams.colors), VEC3_COMPONENTS),
            ("texcoords", streams.texcoords.as_ref(), UV_COMPONENTS),
            ("tangents", streams.tangents.as_ref(), VEC3_COMPONENTS),
            ("bitangents", streams.bitangents.as_ref(), VEC3_COMPONENTS),
        ];
        for (stream, data, components) in optional {
            let Some(data) = data else { continue };
            if data.len() % components != 0 {
                return Err(MeshError::PartialVertex {
                    stream,
                    len: data.len(),
                    components,
                });
            }
            if data.len() / components != vertex_count {
                return Err(MeshError::VertexCountMismatch {
                    stream,
                    expected: vertex_count,
                    actual: data.len() / components,
                });
            }
        }

        if streams.indices.len() % 3 != 0 {
            return Err(MeshError::IncompleteTriangle(streams.indices.len()));
        }
        if let Some(&index) = streams
            .indices
            .iter()
            .find(|&&index| index as usize >= vertex_count)
        {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
        Ok(())
    }

    pub fn positions(&self) -> &[f32] {
        &self.streams.positions
    }

    pub fn normals(&self) -> &[f32] {
        &self.streams.normals
    }

    pub fn colors(&self) -> &[f32] {
        &self.streams.colors
    }

    pub fn texcoords(&self) -> Option<&[f32]> {
        self.streams.texcoords.as_deref()
    }

    pub fn tangents(&self) -> Option<&[f32]> {
        self.streams.tangents.as_deref()
    }

    pub fn bitangents(&self) -> Option<&[f32]> {
        self.streams.bitangents.as_deref()
    }

    pub fn indices(&self) -> &[u32] {
        &self.streams.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.streams.vertex_count()
    }

    pub fn index_count(&self) -> usize {
        self.streams.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.index_count() / 3
    }

    /// A mesh with no triangles, such as that of an all-air chunk.
    pub fn is_empty(&self) -> bool {
        self.streams.indices.is_empty()
    }

    /// Total size of every stream in bytes.
    pub fn byte_size(&self) -> usize {
        let floats = self.streams.positions.len()
            + self.streams.normals.len()
            + self.streams.colors.len()
            + self.streams.texcoords.as_ref().map_or(0, Vec::len)
            + self.streams.tangents.as_ref().map_or(0, Vec::len)
            + self.streams.bitangents.as_ref().map_or(0, Vec::len);
        floats * std::mem::size_of::<f32>() + self.streams.indices.len() * std::mem::size_of::<u32>()
    }
}
