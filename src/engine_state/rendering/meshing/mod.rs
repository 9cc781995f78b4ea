//! Mesh generation for voxel chunks.
//!
//! [`MeshBuilder`] walks a chunk's block array and emits one quad for every
//! block face whose neighbour is AIR. Faces between two solid blocks are
//! culled; nothing is merged, so every visible face is exactly four vertices
//! and six indices.
//!
//! Neighbours that fall outside the chunk are answered by a
//! [`BoundarySolidity`] policy. With [`TerrainBoundary`] the deterministic
//! terrain generator stands in for the neighbouring chunk, so the shared
//! wall between two solid columns in different chunks emits nothing. With
//! [`ExposedBoundary`] every chunk edge is treated as open.

use crate::config::MeshConfig;
use crate::engine_state::voxels::{
    block::block_side::BlockSide, chunk::Chunk, terrain::TerrainGenerator,
};

mod mesh;

pub use mesh::*;

/// Answers solidity queries for world positions outside the chunk being meshed.
pub trait BoundarySolidity {
    /// Returns true if the world-space block `(x, y, z)` hides faces that touch it.
    fn is_solid_world(&self, x: i32, y: i32, z: i32) -> bool;
}

/// Treats everything outside the chunk as AIR, so edge faces are always emitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExposedBoundary;

impl BoundarySolidity for ExposedBoundary {
    fn is_solid_world(&self, _x: i32, _y: i32, _z: i32) -> bool {
        false
    }
}

/// Consults the terrain generator for blocks in neighbouring chunks.
///
/// Exact as long as rooms never touch a chunk's horizontal edge, since the
/// generator does not know about rooms.
#[derive(Debug, Clone, Copy)]
pub struct TerrainBoundary<'a>(pub &'a TerrainGenerator);

impl BoundarySolidity for TerrainBoundary<'_> {
    fn is_solid_world(&self, x: i32, y: i32, z: i32) -> bool {
        self.0.block_at(x, y, z).is_solid()
    }
}

/// Builds the [`ChunkMesh`] of a single chunk.
pub struct MeshBuilder<'a> {
    config: &'a MeshConfig,
    boundary: &'a dyn BoundarySolidity,
    streams: MeshStreams,
}

impl<'a> MeshBuilder<'a> {
    /// Creates a builder emitting the streams enabled in `config`.
    pub fn new(config: &'a MeshConfig, boundary: &'a dyn BoundarySolidity) -> Self {
        let streams = MeshStreams {
            texcoords: config.texcoords.then(Vec::new),
            tangents: config.tangents.then(Vec::new),
            bitangents: config.tangents.then(Vec::new),
            ..MeshStreams::default()
        };
        Self {
            config,
            boundary,
            streams,
        }
    }

    /// Meshes every solid block of `chunk` and returns the finished mesh.
    ///
    /// An all-air chunk yields an empty mesh.
    pub fn generate_mesh(mut self, chunk: &Chunk) -> ChunkMesh {
        for (x, y, z, block_type) in chunk.iter_blocks() {
            if block_type.is_solid() {
                self.create_cube(chunk, x, y, z);
            }
        }
        self.finish()
    }

    /// Emits the visible faces of the block at local `(x, y, z)`.
    ///
    /// # Returns
    /// The number of faces emitted, between 0 (air, or fully enclosed) and 6.
    pub fn create_cube(&mut self, chunk: &Chunk, x: usize, y: usize, z: usize) -> usize {
        let Some(block_type) = chunk.get_block(x, y, z) else {
            return 0;
        };
        if !block_type.is_solid() {
            return 0;
        }

        let origin = [
            chunk.coord.world_x() as f32,
            0.0,
            chunk.coord.world_z() as f32,
        ];
        let mut emitted = 0;
        for side in BlockSide::all() {
            if self.neighbor_is_solid(chunk, x, y, z, side) {
                continue;
            }
            Face::new(x, y, z, block_type, side).append_to(
                &mut self.streams,
                origin,
                self.config.atlas_tiles,
            );
            emitted += 1;
        }
        emitted
    }

    fn neighbor_is_solid(&self, chunk: &Chunk, x: usize, y: usize, z: usize, side: BlockSide) -> bool {
        let [dx, dy, dz] = side.neighbor_offset();
        let (nx, ny, nz) = (x as i32 + dx, y as i32 + dy, z as i32 + dz);
        match chunk.is_solid_local(nx, ny, nz) {
            Some(solid) => solid,
            None => self.boundary.is_solid_world(
                chunk.coord.world_x() + nx,
                ny,
                chunk.coord.world_z() + nz,
            ),
        }
    }

    /// Consumes the builder and returns the accumulated mesh.
    pub fn finish(self) -> ChunkMesh {
        ChunkMesh::from_builder(self.streams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RoomConfig, TerrainConfig};
    use crate::engine_state::voxels::{
        block::{block_type::BlockType, Block},
        chunk::{coord::ChunkCoord, CHUNK_SIZE},
    };

    fn mesh(chunk: &Chunk, config: &MeshConfig) -> ChunkMesh {
        MeshBuilder::new(config, &ExposedBoundary).generate_mesh(chunk)
    }

    fn place(chunk: &mut Chunk, x: usize, y: usize, z: usize) {
        assert!(chunk.set_block(x, y, z, Block::new(BlockType::STONE)));
    }

    fn sub(a: &[f32], b: &[f32]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    #[test]
    fn test_empty_chunk_has_empty_mesh() {
        let chunk = Chunk::new(ChunkCoord::new(0, 0));
        let mesh = mesh(&chunk, &MeshConfig::default());
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.texcoords(), Some(&[][..]));
    }

    #[test]
    fn test_isolated_block_emits_six_faces() {
        for (x, y, z) in [(5, 10, 7), (0, 0, 0), (CHUNK_SIZE - 1, 3, CHUNK_SIZE - 1)] {
            let mut chunk = Chunk::new(ChunkCoord::new(-1, 2));
            place(&mut chunk, x, y, z);
            let mesh = mesh(&chunk, &MeshConfig::default());
            assert_eq!(mesh.vertex_count(), 24);
            assert_eq!(mesh.index_count(), 36);
            assert_eq!(mesh.texcoords().map(<[f32]>::len), Some(48));
        }
    }

    #[test]
    fn test_enclosed_block_emits_nothing() {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0));
        for x in 4..7 {
            for y in 4..7 {
                for z in 4..7 {
                    place(&mut chunk, x, y, z);
                }
            }
        }
        let config = MeshConfig::default();
        let mut builder = MeshBuilder::new(&config, &ExposedBoundary);
        assert_eq!(builder.create_cube(&chunk, 5, 5, 5), 0);
        assert_eq!(builder.create_cube(&chunk, 4, 4, 4), 3);
        assert_eq!(builder.create_cube(&chunk, 5, 4, 5), 1);

        // A 3x3x3 cube shows 9 faces on each of its 6 sides.
        let mesh = mesh(&chunk, &config);
        assert_eq!(mesh.index_count(), 54 * 6);
    }

    #[test]
    fn test_triangles_wind_counter_clockwise_from_outside() {
        let mut chunk = Chunk::new(ChunkCoord::new(3, -4));
        place(&mut chunk, 1, 1, 1);
        place(&mut chunk, 2, 1, 1);
        place(&mut chunk, 1, 2, 1);
        let config = MeshConfig {
            tangents: true,
            ..MeshConfig::default()
        };
        let mesh = mesh(&chunk, &config);

        let positions = mesh.positions();
        let normals = mesh.normals();
        for triangle in mesh.indices().chunks(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize * 3);
            let face_normal = cross(
                sub(&positions[b..b + 3], &positions[a..a + 3]),
                sub(&positions[c..c + 3], &positions[a..a + 3]),
            );
            let n = &normals[a..a + 3];
            let dot = face_normal[0] * n[0] + face_normal[1] * n[1] + face_normal[2] * n[2];
            assert!(dot > 0.0, "triangle {triangle:?} faces inward");
        }
        assert_eq!(mesh.tangents().map(<[f32]>::len), Some(mesh.vertex_count() * 3));
        assert_eq!(mesh.bitangents().map(<[f32]>::len), Some(mesh.vertex_count() * 3));
    }

    #[test]
    fn test_mesh_is_in_world_space() {
        let mut chunk = Chunk::new(ChunkCoord::new(2, -1));
        place(&mut chunk, 0, 0, 0);
        let mesh = mesh(&chunk, &MeshConfig::default());
        for p in mesh.positions().chunks(3) {
            assert!((32.0..=33.0).contains(&p[0]));
            assert!((0.0..=1.0).contains(&p[1]));
            assert!((-16.0..=-15.0).contains(&p[2]));
        }
    }

    #[test]
    fn test_terrain_boundary_culls_chunk_seams() {
        let terrain = TerrainConfig {
            base_height: 10.0,
            amplitude: 0.0,
            water_level: 0,
            ..TerrainConfig::default()
        };
        let rooms = RoomConfig {
            enabled: false,
            ..RoomConfig::default()
        };
        let generator = TerrainGenerator::new(terrain, rooms);
        let mut chunk = Chunk::new(ChunkCoord::new(1, 1));
        chunk.generate_blocks(&generator);

        let config = MeshConfig::default();
        let culled = MeshBuilder::new(&config, &TerrainBoundary(&generator)).generate_mesh(&chunk);
        // Flat ground: only the top layer is visible.
        assert_eq!(culled.index_count(), CHUNK_SIZE * CHUNK_SIZE * 6);
        assert!(culled.normals().chunks(3).all(|n| n == [0.0, 1.0, 0.0]));

        let exposed = mesh(&chunk, &config);
        let walls = 4 * CHUNK_SIZE * 10;
        let floor = CHUNK_SIZE * CHUNK_SIZE;
        assert_eq!(exposed.index_count(), (floor * 2 + walls) * 6);
    }
}
