//! # Block Type Module
//!
//! This module defines the materials a voxel can hold, together with the
//! per-material render data the mesh builder needs: a palette colour and the
//! atlas tile used by each face.

use serde::{Deserialize, Serialize};

use super::block_side::BlockSide;

/// Enumerates all materials in the voxel world.
///
/// `AIR` is the designated empty material: it is never solid and never
/// produces geometry. Every other material is solid for face culling.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockType {
    /// Empty space.
    #[default]
    AIR = 0,
    /// Bulk underground material.
    STONE = 1,
    /// Sub-surface layer between grass and stone.
    DIRT = 2,
    /// Surface block of dry land.
    GRASS = 3,
    /// Surface block of shores and sea floors.
    SAND = 4,
    /// Fill between a submerged surface and the water level.
    WATER = 5,
    /// Wooden block with bark on every side.
    WOOD = 6,
    /// Indestructible floor of the world.
    BEDROCK = 7,
}

/// Every material, in discriminant order.
pub const ALL_BLOCK_TYPES: [BlockType; 8] = [
    BlockType::AIR,
    BlockType::STONE,
    BlockType::DIRT,
    BlockType::GRASS,
    BlockType::SAND,
    BlockType::WATER,
    BlockType::WOOD,
    BlockType::BEDROCK,
];

/// Linear RGB palette indexed by `BlockType as usize`.
static BLOCK_TYPE_TO_COLOR: [[f32; 3]; 8] = [
    [0.0, 0.0, 0.0],       // AIR (never meshed)
    [0.50, 0.50, 0.52],    // STONE
    [0.45, 0.32, 0.20],    // DIRT
    [0.30, 0.62, 0.22],    // GRASS
    [0.86, 0.80, 0.55],    // SAND
    [0.18, 0.40, 0.78],    // WATER
    [0.55, 0.40, 0.22],    // WOOD
    [0.16, 0.16, 0.17],    // BEDROCK
];

/// Atlas tile for each face, indexed by `BlockType as usize` and then by
/// `BlockSide as usize` in the order [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT].
static BLOCK_TYPE_TO_TEXTURE_INDICES: [[u32; 6]; 8] = [
    [0, 0, 0, 0, 0, 0],    // AIR
    [1, 1, 1, 1, 1, 1],    // STONE
    [2, 2, 2, 2, 2, 2],    // DIRT
    [3, 3, 2, 4, 3, 3],    // GRASS (top: 4, bottom: dirt, sides: 3)
    [5, 5, 5, 5, 5, 5],    // SAND
    [6, 6, 6, 6, 6, 6],    // WATER
    [7, 7, 8, 8, 7, 7],    // WOOD (rings on top and bottom)
    [9, 9, 9, 9, 9, 9],    // BEDROCK
];

impl BlockType {
    /// Returns true for every material except `AIR`.
    #[inline]
    pub fn is_solid(self) -> bool {
        self != BlockType::AIR
    }

    /// Palette colour of this material.
    #[inline]
    pub fn color(self) -> [f32; 3] {
        BLOCK_TYPE_TO_COLOR[self as usize]
    }

    /// Atlas tile used by `side` of a block of this material.
    #[inline]
    pub fn texture_index(self, side: BlockSide) -> u32 {
        BLOCK_TYPE_TO_TEXTURE_INDICES[self as usize][side as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_air_is_empty() {
        for block_type in ALL_BLOCK_TYPES {
            assert_eq!(block_type.is_solid(), block_type != BlockType::AIR);
        }
    }

    #[test]
    fn grass_has_distinct_top_and_bottom_tiles() {
        let top = BlockType::GRASS.texture_index(BlockSide::TOP);
        let bottom = BlockType::GRASS.texture_index(BlockSide::BOTTOM);
        let side = BlockType::GRASS.texture_index(BlockSide::FRONT);
        assert_ne!(top, side);
        assert_eq!(bottom, BlockType::DIRT.texture_index(BlockSide::TOP));
    }

    #[test]
    fn discriminants_match_table_order() {
        for (i, block_type) in ALL_BLOCK_TYPES.iter().enumerate() {
            assert_eq!(*block_type as usize, i);
        }
    }
}
