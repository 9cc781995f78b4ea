//! # Block Module
//!
//! This module provides the core block-related functionality for the voxel engine.
//! It includes material definitions, block face geometry, and the `Block` value
//! type that carries a process-unique identity.

use std::sync::atomic::{AtomicU64, Ordering};

use block_type::BlockType;

pub mod block_side;
pub mod block_type;

/// Source of block identities. Starts at zero and only ever increments.
static BLOCK_COUNT: AtomicU64 = AtomicU64::new(0);

/// A single voxel instance.
///
/// Chunks store only the material of each cell; a `Block` is the richer value
/// handed to and from chunk mutators. Every constructed block receives an
/// identity that is unique for the lifetime of the process, even when blocks
/// are created concurrently on several generation workers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Material of this block.
    pub block_type: BlockType,
    /// Process-unique, strictly increasing identity.
    pub block_id: u64,
    /// Inactive blocks are written into chunks as `AIR`.
    pub is_active: bool,
}

impl Block {
    /// Creates a new active block of the specified type with a fresh identity.
    pub fn new(block_type: BlockType) -> Self {
        Block {
            block_type,
            block_id: BLOCK_COUNT.fetch_add(1, Ordering::Relaxed),
            is_active: true,
        }
    }

    /// Number of blocks created so far in this process.
    pub fn block_count() -> u64 {
        BLOCK_COUNT.load(Ordering::Relaxed)
    }

    /// Material this block contributes to a chunk's block array.
    #[inline]
    pub fn stored_type(&self) -> BlockType {
        if self.is_active {
            self.block_type
        } else {
            BlockType::AIR
        }
    }
}

impl Default for Block {
    fn default() -> Self {
        Block::new(BlockType::STONE)
    }
}
