use crate::engine_state::voxels::block::{block_side::BlockSide, block_type::BlockType};

use super::mesh::MeshStreams;

/// Index pattern of a quad: two counter-clockwise triangles sharing the
/// bottom-left to top-right diagonal.
pub const FACE_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// A single visible face of a block, in chunk-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub block_type: BlockType,
    pub block_side: BlockSide,
}

impl Face {
    pub fn new(x: usize, y: usize, z: usize, block_type: BlockType, block_side: BlockSide) -> Self {
        Face {
            x,
            y,
            z,
            block_type,
            block_side,
        }
    }

    /// Appends this face's four vertices and six indices to `streams`.
    ///
    /// # Arguments
    /// * `streams` - Destination streams; optional streams are written only when present
    /// * `origin` - World-space position of the chunk's local origin
    /// * `atlas_tiles` - Tiles per edge of the texture atlas
    pub fn append_to(&self, streams: &mut MeshStreams, origin: [f32; 3], atlas_tiles: u32) {
        let base = streams.vertex_count() as u32;
        let normal = self.block_side.normal();
        let color = self.block_type.color();
        let block = [
            origin[0] + self.x as f32,
            origin[1] + self.y as f32,
            origin[2] + self.z as f32,
        ];

        for corner in self.block_side.corners() {
            streams.positions.extend_from_slice(&[
                block[0] + corner[0],
                block[1] + corner[1],
                block[2] + corner[2],
            ]);
            streams.normals.extend_from_slice(&normal);
            streams.colors.extend_from_slice(&color);
        }

        if let Some(texcoords) = streams.texcoords.as_mut() {
            let tile = self.block_type.texture_index(self.block_side);
            texcoords.extend_from_slice(&atlas_uvs(tile, atlas_tiles));
        }
        if let Some(tangents) = streams.tangents.as_mut() {
            let tangent = self.block_side.tangent();
            for _ in 0..4 {
                tangents.extend_from_slice(&tangent);
            }
        }
        if let Some(bitangents) = streams.bitangents.as_mut() {
            let bitangent = self.block_side.bitangent();
            for _ in 0..4 {
                bitangents.extend_from_slice(&bitangent);
            }
        }

        streams
            .indices
            .extend(FACE_INDICES.iter().map(|index| base + index));
    }
}

/// Texture coordinates of the four face corners for atlas tile `tile`.
///
/// Tiles are laid out row-major from the top-left of the atlas, with V
/// growing downwards, so the bottom corners of a face sample the bottom of
/// the tile.
fn atlas_uvs(tile: u32, atlas_tiles: u32) -> [f32; 8] {
    let tiles = atlas_tiles.max(1);
    let tile = tile % (tiles * tiles);
    let step = 1.0 / tiles as f32;
    let u0 = (tile % tiles) as f32 * step;
    let v0 = (tile / tiles) as f32 * step;
    let (u1, v1) = (u0 + step, v0 + step);
    [u0, v1, u1, v1, u1, v0, u0, v0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atlas_tiles_are_row_major() {
        assert_eq!(atlas_uvs(0, 4), [0.0, 0.25, 0.25, 0.25, 0.25, 0.0, 0.0, 0.0]);
        let uvs = atlas_uvs(5, 4);
        assert_eq!((uvs[6], uvs[7]), (0.25, 0.25));
        assert_eq!((uvs[2], uvs[3]), (0.5, 0.5));
    }

    #[test]
    fn face_offsets_indices_by_existing_vertices() {
        let mut streams = MeshStreams::default();
        let face = Face::new(0, 0, 0, BlockType::STONE, BlockSide::TOP);
        face.append_to(&mut streams, [0.0; 3], 4);
        face.append_to(&mut streams, [0.0; 3], 4);
        assert_eq!(streams.vertex_count(), 8);
        assert_eq!(&streams.indices[6..], &[4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn positions_are_in_world_space() {
        let mut streams = MeshStreams::default();
        Face::new(2, 3, 4, BlockType::DIRT, BlockSide::RIGHT).append_to(
            &mut streams,
            [-16.0, 0.0, 32.0],
            4,
        );
        // Every corner of the +X face lies on the plane x = -16 + 2 + 1.
        assert!(streams.positions.chunks(3).all(|p| p[0] == -13.0));
        assert!(streams.positions.chunks(3).all(|p| (36.0..=37.0).contains(&p[2])));
    }
}
