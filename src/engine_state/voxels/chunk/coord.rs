//! # Chunk Coordinates
//!
//! Chunks are addressed by integer indices on the horizontal chunk grid, not
//! by world units. Chunk `(1, -2)` covers world columns
//! `16..32` on X and `-32..-16` on Z.

use std::fmt;

use cgmath::Point3;

use super::CHUNK_SIZE;
use crate::config::MAX_VISIBLE_RADIUS;

/// Largest absolute chunk index a world position may map to.
///
/// Every chunk within [`MAX_VISIBLE_RADIUS`] of such a chunk, and every block
/// column inside those chunks plus one neighbour column, has an `i32` world
/// coordinate.
pub const MAX_CHUNK_INDEX: i32 = i32::MAX / CHUNK_SIZE as i32 - MAX_VISIBLE_RADIUS - 1;

/// Position of a chunk on the horizontal chunk grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// X index, in chunks.
    pub x: i32,
    /// Z index, in chunks.
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing the world-space block column `(block_x, block_z)`.
    #[inline]
    pub const fn from_block_column(block_x: i32, block_z: i32) -> Self {
        Self {
            x: block_x.div_euclid(CHUNK_SIZE as i32),
            z: block_z.div_euclid(CHUNK_SIZE as i32),
        }
    }

    /// Chunk containing a world-space position, using floor division so that
    /// positions just below zero map to chunk `-1`.
    ///
    /// Returns `None` for non-finite positions (for example a camera that has
    /// not been placed yet) and for positions beyond [`MAX_CHUNK_INDEX`].
    pub fn from_world_position(position: Point3<f32>) -> Option<Self> {
        let size = CHUNK_SIZE as f32;
        let index = |world: f32| {
            if !world.is_finite() {
                return None;
            }
            i32::try_from((world / size).floor() as i64)
                .ok()
                .filter(|index| (-MAX_CHUNK_INDEX..=MAX_CHUNK_INDEX).contains(index))
        };
        Some(Self {
            x: index(position.x)?,
            z: index(position.z)?,
        })
    }

    /// World X of this chunk's first block column.
    #[inline]
    pub const fn world_x(self) -> i32 {
        self.x * CHUNK_SIZE as i32
    }

    /// World Z of this chunk's first block column.
    #[inline]
    pub const fn world_z(self) -> i32 {
        self.z * CHUNK_SIZE as i32
    }

    /// Coordinate shifted by `(dx, dz)` chunks.
    #[inline]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_position_uses_floor_division() {
        let at = |x: f32, z: f32| ChunkCoord::from_world_position(Point3::new(x, 20.0, z)).unwrap();
        assert_eq!(at(0.0, 0.0), ChunkCoord::new(0, 0));
        assert_eq!(at(15.9, 15.9), ChunkCoord::new(0, 0));
        assert_eq!(at(16.0, 0.0), ChunkCoord::new(1, 0));
        assert_eq!(at(-0.1, -16.0), ChunkCoord::new(-1, -1));
        assert_eq!(at(-16.1, 40.0), ChunkCoord::new(-2, 2));
    }

    #[test]
    fn non_finite_positions_have_no_chunk() {
        assert!(ChunkCoord::from_world_position(Point3::new(f32::NAN, 0.0, 0.0)).is_none());
        assert!(ChunkCoord::from_world_position(Point3::new(0.0, 0.0, f32::INFINITY)).is_none());
    }

    #[test]
    fn far_positions_have_no_chunk() {
        let size = CHUNK_SIZE as f32;
        assert!(ChunkCoord::from_world_position(Point3::new(4.0e10, 20.0, 0.0)).is_none());
        assert!(ChunkCoord::from_world_position(Point3::new(0.0, 20.0, -4.0e10)).is_none());
        assert!(ChunkCoord::from_world_position(Point3::new(f32::MAX, 20.0, 0.0)).is_none());

        // The furthest accepted chunk still has addressable neighbours.
        let edge = ChunkCoord::from_world_position(Point3::new(-1.0e9, 20.0, 1.0e9)).unwrap();
        assert!(edge.x.abs() <= MAX_CHUNK_INDEX && edge.z.abs() <= MAX_CHUNK_INDEX);
        let far = edge.offset(-MAX_VISIBLE_RADIUS, MAX_VISIBLE_RADIUS);
        assert!(far.world_x() < 0 && far.world_z() + CHUNK_SIZE as i32 > 0);

        let limit = (MAX_CHUNK_INDEX as f32 + 64.0) * size;
        assert!(ChunkCoord::from_world_position(Point3::new(limit, 20.0, 0.0)).is_none());
    }

    #[test]
    fn block_columns_round_trip_through_origin() {
        let coord = ChunkCoord::new(-3, 5);
        assert_eq!(ChunkCoord::from_block_column(coord.world_x(), coord.world_z()), coord);
        assert_eq!(
            ChunkCoord::from_block_column(coord.world_x() - 1, coord.world_z() + 15),
            coord.offset(-1, 0)
        );
    }
}
