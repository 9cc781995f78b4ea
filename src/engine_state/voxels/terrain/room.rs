//! Axis-aligned carve-out regions inside a single chunk.

use crate::engine_state::voxels::block::block_type::BlockType;
use crate::engine_state::voxels::chunk::{CHUNK_HEIGHT, CHUNK_SIZE};

/// A box of uniform material carved into one chunk's block array.
///
/// Coordinates are chunk-local. The box covers `x..x + width`,
/// `y..y + height` and `z..z + depth`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Room {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    /// Material written into every cell of the box.
    pub material: BlockType,
}

impl Room {
    /// Returns true if the room is non-empty and keeps a one-block shell from
    /// the horizontal chunk edges, the bedrock layer and the chunk ceiling.
    pub fn fits_in_chunk(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.depth > 0
            && self.x >= 1
            && self.z >= 1
            && self.y >= 1
            && self.x + self.width < CHUNK_SIZE
            && self.z + self.depth < CHUNK_SIZE
            && self.y + self.height < CHUNK_HEIGHT
    }

    /// Returns true if the local coordinate lies inside the room.
    pub fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        (self.x..self.x + self.width).contains(&x)
            && (self.y..self.y + self.height).contains(&y)
            && (self.z..self.z + self.depth).contains(&z)
    }

    /// Number of cells covered by the room.
    pub fn volume(&self) -> usize {
        self.width * self.height * self.depth
    }
}
