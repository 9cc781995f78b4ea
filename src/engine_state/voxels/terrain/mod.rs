//! # Terrain Generation
//!
//! Deterministic mapping from world block columns to materials, plus the
//! per-chunk room carving decision.
//!
//! Everything here is a pure function of the configuration and the world
//! coordinates. Two generators built from equal configs agree on every
//! column, which is what lets the mesher cull faces against neighbouring
//! chunks that have not been generated yet.
//!
//! ## Column layout
//!
//! For a column with ground height `g` and elevation `e = max(g, water_level)`:
//!
//! | y                               | material                     |
//! |---------------------------------|------------------------------|
//! | `0`                             | BEDROCK                      |
//! | `1 .. g - 1 - dirt_depth`       | STONE                        |
//! | `g - 1 - dirt_depth .. g - 1`   | DIRT (SAND on shores)        |
//! | `g - 1`                         | GRASS (SAND on shores)       |
//! | `g .. e`                        | WATER                        |
//! | `e ..`                          | AIR                          |

mod room;

use noise::{NoiseFn, Perlin};

pub use room::Room;

use super::block::block_type::BlockType;
use super::chunk::coord::ChunkCoord;
use super::chunk::{CHUNK_HEIGHT, CHUNK_SIZE};
use crate::config::{RoomConfig, TerrainConfig};

/// Height-field terrain and room generator.
#[derive(Clone, Debug)]
pub struct TerrainGenerator {
    terrain: TerrainConfig,
    rooms: RoomConfig,
    perlin: Perlin,
}

impl TerrainGenerator {
    /// Creates a generator from already validated configuration sections.
    pub fn new(terrain: TerrainConfig, rooms: RoomConfig) -> Self {
        let perlin = Perlin::new(terrain.seed);
        Self {
            terrain,
            rooms,
            perlin,
        }
    }

    pub fn terrain_config(&self) -> &TerrainConfig {
        &self.terrain
    }

    pub fn room_config(&self) -> &RoomConfig {
        &self.rooms
    }

    /// Height of the dry-land surface at world column `(x, z)`.
    ///
    /// Blocks with `y < ground_height` are ground materials. The result is
    /// clamped to `1..CHUNK_HEIGHT` so every column has a bedrock floor and
    /// at least one layer of headroom.
    pub fn ground_height(&self, x: i32, z: i32) -> i32 {
        let mut amplitude = 1.0;
        let mut frequency = self.terrain.scale;
        let mut total = 0.0;
        let mut normalizer = 0.0;

        for _ in 0..self.terrain.octaves {
            let sample = self
                .perlin
                .get([x as f64 * frequency, z as f64 * frequency]);
            total += sample * amplitude;
            normalizer += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }

        let noise = if normalizer > 0.0 {
            total / normalizer
        } else {
            0.0
        };
        let height = (self.terrain.base_height + noise * self.terrain.amplitude).round() as i32;
        height.clamp(1, CHUNK_HEIGHT as i32 - 1)
    }

    /// Elevation of world column `(x, z)`: every block below it is non-AIR
    /// and every block at or above it is AIR.
    ///
    /// This is the ground height, raised to the water level where the column
    /// is flooded.
    pub fn generate_height(&self, x: i32, z: i32) -> i32 {
        self.elevation(self.ground_height(x, z))
    }

    fn elevation(&self, ground: i32) -> i32 {
        ground.max(self.terrain.water_level.min(CHUNK_HEIGHT as i32 - 1))
    }

    /// Material of the world-space block `(x, y, z)`, ignoring rooms.
    ///
    /// Blocks below the world floor report BEDROCK and blocks above the chunk
    /// ceiling report AIR.
    pub fn block_at(&self, x: i32, y: i32, z: i32) -> BlockType {
        if y < 0 {
            return BlockType::BEDROCK;
        }
        if y >= CHUNK_HEIGHT as i32 {
            return BlockType::AIR;
        }
        let ground = self.ground_height(x, z);
        let elevation = self.elevation(ground);
        self.material_at(y, ground, elevation)
    }

    /// Writes the materials of world column `(x, z)` into `column`, which is
    /// indexed by local `y`.
    pub fn populate_column(&self, x: i32, z: i32, column: &mut [BlockType]) {
        let ground = self.ground_height(x, z);
        let elevation = self.elevation(ground);
        for (y, block) in column.iter_mut().enumerate() {
            *block = self.material_at(y as i32, ground, elevation);
        }
    }

    fn material_at(&self, y: i32, ground: i32, elevation: i32) -> BlockType {
        let shore = ground <= self.terrain.water_level + 1;
        if y >= elevation {
            BlockType::AIR
        } else if y == 0 {
            BlockType::BEDROCK
        } else if y >= ground {
            BlockType::WATER
        } else if y == ground - 1 {
            if shore {
                BlockType::SAND
            } else {
                BlockType::GRASS
            }
        } else if y >= ground - 1 - self.terrain.dirt_depth {
            if shore {
                BlockType::SAND
            } else {
                BlockType::DIRT
            }
        } else {
            BlockType::STONE
        }
    }

    /// Decides the room carved into the chunk at `coord`, if any.
    ///
    /// The decision is seeded from the terrain seed and the chunk coordinate,
    /// so regenerating a chunk reproduces its room. Extents are clamped to the
    /// chunk's interior. A room that still cannot be placed under the chunk's
    /// lowest surface is skipped.
    pub fn generate_room(&self, coord: ChunkCoord) -> Option<Room> {
        if !self.rooms.enabled {
            return None;
        }

        let mut rng = fastrand::Rng::with_seed(self.room_seed(coord));
        if rng.f64() >= self.rooms.chance {
            return None;
        }

        let min_extent = self.rooms.min_extent.max(1) as usize;
        let max_extent = (self.rooms.max_extent.max(0) as usize).max(min_extent);
        let horizontal_fit = CHUNK_SIZE - 2;
        if min_extent > horizontal_fit {
            return None;
        }

        // Rooms stay underground with one block of roof.
        let ceiling = self.lowest_ground(coord) - 1;
        let vertical_fit = (ceiling - 1).max(0) as usize;
        if vertical_fit < min_extent {
            log::trace!("No room in chunk {coord}: only {vertical_fit} blocks below ground");
            return None;
        }

        let width = rng.usize(min_extent..=max_extent).min(horizontal_fit);
        let depth = rng.usize(min_extent..=max_extent).min(horizontal_fit);
        let height = rng.usize(min_extent..=max_extent).min(vertical_fit);

        let room = Room {
            x: rng.usize(1..=CHUNK_SIZE - 1 - width),
            y: rng.usize(1..=ceiling as usize - height),
            z: rng.usize(1..=CHUNK_SIZE - 1 - depth),
            width,
            height,
            depth,
            material: self.rooms.material,
        };
        debug_assert!(room.fits_in_chunk(), "room {room:?} escapes chunk {coord}");
        Some(room)
    }

    fn lowest_ground(&self, coord: ChunkCoord) -> i32 {
        let mut lowest = CHUNK_HEIGHT as i32;
        for x in 0..CHUNK_SIZE as i32 {
            for z in 0..CHUNK_SIZE as i32 {
                lowest = lowest.min(self.ground_height(coord.world_x() + x, coord.world_z() + z));
            }
        }
        lowest
    }

    fn room_seed(&self, coord: ChunkCoord) -> u64 {
        let x = coord.x as i64 as u64;
        let z = coord.z as i64 as u64;
        (self.terrain.seed as u64)
            ^ x.wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ z.wrapping_mul(0xC2B2_AE3D_27D4_EB4F).rotate_left(31)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(seed: u32) -> TerrainGenerator {
        let terrain = TerrainConfig {
            seed,
            ..TerrainConfig::default()
        };
        TerrainGenerator::new(terrain, RoomConfig::default())
    }

    #[test]
    fn test_height_is_deterministic() {
        let a = generator(7);
        let b = generator(7);
        for x in -40..40 {
            for z in (-40..40).step_by(7) {
                assert_eq!(a.generate_height(x, z), b.generate_height(x, z));
                assert_eq!(a.block_at(x, 10, z), b.block_at(x, 10, z));
            }
        }
    }

    #[test]
    fn test_height_stays_within_chunk() {
        let terrain = TerrainConfig {
            amplitude: 500.0,
            ..TerrainConfig::default()
        };
        let generator = TerrainGenerator::new(terrain, RoomConfig::default());
        for x in (-300..300).step_by(13) {
            for z in (-300..300).step_by(17) {
                let h = generator.generate_height(x, z);
                assert!((1..CHUNK_HEIGHT as i32).contains(&h), "height {h} at ({x}, {z})");
            }
        }
    }

    #[test]
    fn test_column_is_solid_below_elevation_and_air_above() {
        let generator = generator(3);
        let mut column = [BlockType::AIR; CHUNK_HEIGHT];
        for (x, z) in [(0, 0), (-17, 5), (33, -64), (120, 7)] {
            generator.populate_column(x, z, &mut column);
            let elevation = generator.generate_height(x, z) as usize;
            assert_eq!(column[0], BlockType::BEDROCK);
            assert!(column[..elevation].iter().all(|b| b.is_solid()));
            assert!(column[elevation..].iter().all(|b| !b.is_solid()));
            for (y, block) in column.iter().enumerate() {
                assert_eq!(*block, generator.block_at(x, y as i32, z));
            }
        }
    }

    #[test]
    fn test_flooded_columns_hold_water() {
        let terrain = TerrainConfig {
            base_height: 6.0,
            amplitude: 0.0,
            water_level: 10,
            ..TerrainConfig::default()
        };
        let generator = TerrainGenerator::new(terrain, RoomConfig::default());
        assert_eq!(generator.ground_height(4, 4), 6);
        assert_eq!(generator.generate_height(4, 4), 10);
        assert_eq!(generator.block_at(4, 5, 4), BlockType::SAND);
        assert_eq!(generator.block_at(4, 6, 4), BlockType::WATER);
        assert_eq!(generator.block_at(4, 9, 4), BlockType::WATER);
        assert_eq!(generator.block_at(4, 10, 4), BlockType::AIR);
    }

    #[test]
    fn test_dry_land_layers() {
        let terrain = TerrainConfig {
            base_height: 30.0,
            amplitude: 0.0,
            water_level: 10,
            dirt_depth: 3,
            ..TerrainConfig::default()
        };
        let generator = TerrainGenerator::new(terrain, RoomConfig::default());
        assert_eq!(generator.block_at(0, 29, 0), BlockType::GRASS);
        assert_eq!(generator.block_at(0, 28, 0), BlockType::DIRT);
        assert_eq!(generator.block_at(0, 26, 0), BlockType::DIRT);
        assert_eq!(generator.block_at(0, 25, 0), BlockType::STONE);
        assert_eq!(generator.block_at(0, 0, 0), BlockType::BEDROCK);
        assert_eq!(generator.block_at(0, -1, 0), BlockType::BEDROCK);
        assert_eq!(generator.block_at(0, CHUNK_HEIGHT as i32, 0), BlockType::AIR);
    }

    #[test]
    fn test_rooms_always_fit() {
        let rooms = RoomConfig {
            chance: 1.0,
            min_extent: 1,
            max_extent: 100,
            ..RoomConfig::default()
        };
        let generator = TerrainGenerator::new(TerrainConfig::default(), rooms);
        let mut placed = 0;
        for x in -12..12 {
            for z in -12..12 {
                if let Some(room) = generator.generate_room(ChunkCoord::new(x, z)) {
                    placed += 1;
                    assert!(room.fits_in_chunk(), "{room:?}");
                    assert!(room.x + room.width <= CHUNK_SIZE - 1);
                    assert!(room.z + room.depth <= CHUNK_SIZE - 1);
                }
            }
        }
        assert!(placed > 0);
    }

    #[test]
    fn test_rooms_are_reproducible() {
        let rooms = RoomConfig {
            chance: 0.5,
            ..RoomConfig::default()
        };
        let a = TerrainGenerator::new(TerrainConfig::default(), rooms.clone());
        let b = TerrainGenerator::new(TerrainConfig::default(), rooms);
        for x in -5..5 {
            let coord = ChunkCoord::new(x, 2 * x);
            assert_eq!(a.generate_room(coord), b.generate_room(coord));
        }
    }

    #[test]
    fn test_rooms_skipped_when_disabled_or_no_space() {
        let disabled = TerrainGenerator::new(
            TerrainConfig::default(),
            RoomConfig {
                enabled: false,
                chance: 1.0,
                ..RoomConfig::default()
            },
        );
        assert!(disabled.generate_room(ChunkCoord::new(0, 0)).is_none());

        let shallow = TerrainGenerator::new(
            TerrainConfig {
                base_height: 3.0,
                amplitude: 0.0,
                ..TerrainConfig::default()
            },
            RoomConfig {
                chance: 1.0,
                min_extent: 3,
                ..RoomConfig::default()
            },
        );
        assert!(shallow.generate_room(ChunkCoord::new(0, 0)).is_none());
    }
}
