//! # Chunk Iteration Module
//!
//! Iteration over every cell of a chunk in storage order, yielding local
//! coordinates alongside the material.

use crate::engine_state::voxels::block::block_type::BlockType;

use super::{Chunk, CHUNK_HEIGHT, CHUNK_SIZE};

/// An iterator over all cells of a chunk, air included.
///
/// Cells are visited column by column (X, then Z), bottom to top within each
/// column, which matches the layout of the block array.
pub struct ChunkBlockIterator<'a> {
    /// Reference to the chunk being iterated over
    chunk_ref: &'a Chunk,
    /// Next index into the block array
    offset: usize,
}

impl<'a> ChunkBlockIterator<'a> {
    pub fn new(chunk: &'a Chunk) -> Self {
        ChunkBlockIterator {
            chunk_ref: chunk,
            offset: 0,
        }
    }
}

impl Iterator for ChunkBlockIterator<'_> {
    /// `(x, y, z, material)` in chunk-local coordinates.
    type Item = (usize, usize, usize, BlockType);

    fn next(&mut self) -> Option<Self::Item> {
        let block_type = *self.chunk_ref.blocks.get(self.offset)?;
        let y = self.offset % CHUNK_HEIGHT;
        let column = self.offset / CHUNK_HEIGHT;
        let (x, z) = (column / CHUNK_SIZE, column % CHUNK_SIZE);
        self.offset += 1;
        Some((x, y, z, block_type))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.chunk_ref.blocks.len() - self.offset;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkBlockIterator<'_> {}
