//! # Chunk Module
//!
//! A chunk is a `CHUNK_SIZE x CHUNK_HEIGHT x CHUNK_SIZE` column of the world.
//! It owns its block array, the mesh built from it and the GPU resources the
//! renderer uploads for that mesh.
//!
//! ## Storage
//!
//! Materials are stored densely, one [`BlockType`] per cell, column-major:
//! `index = (x * CHUNK_SIZE + z) * CHUNK_HEIGHT + y`. Each column is therefore
//! a contiguous slice, which is how the terrain generator fills it.
//!
//! ## Readiness flags
//!
//! * `blocks_generated`: terrain (and room) written
//! * `buffers_generated`: CPU mesh arrays built
//! * `buffers_initialized`: mesh uploaded to the GPU. Set once by the
//!   renderer and never cleared.

use std::sync::atomic::{AtomicU64, Ordering};

use chunk_iteration::ChunkBlockIterator;
use coord::ChunkCoord;

use super::block::{block_type::BlockType, Block};
use super::terrain::{Room, TerrainGenerator};
use crate::config::MeshConfig;
use crate::engine_state::rendering::{
    gpu::GpuResources,
    meshing::{ChunkMesh, MeshBuilder, TerrainBoundary},
};

pub mod chunk_iteration;
pub mod coord;

/// Edge length of a chunk along X and Z, in blocks.
pub const CHUNK_SIZE: usize = 16;
/// Height of a chunk along Y, in blocks.
pub const CHUNK_HEIGHT: usize = 64;
/// Number of cells in a chunk.
pub const CHUNK_VOLUME: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_HEIGHT;

/// Source of chunk identities. Starts at zero and only ever increments.
static CHUNK_COUNT: AtomicU64 = AtomicU64::new(0);

/// One column of the voxel world.
pub struct Chunk {
    /// Process-unique, strictly increasing identity.
    pub chunk_id: u64,
    /// Position of this chunk on the chunk grid.
    pub coord: ChunkCoord,
    blocks: Vec<BlockType>,
    room: Option<Room>,
    mesh: ChunkMesh,
    gpu: GpuResources,
    blocks_generated: bool,
    buffers_generated: bool,
}

impl Chunk {
    /// Creates an all-air chunk with a fresh identity.
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            chunk_id: CHUNK_COUNT.fetch_add(1, Ordering::Relaxed),
            coord,
            blocks: vec![BlockType::AIR; CHUNK_VOLUME],
            room: None,
            mesh: ChunkMesh::default(),
            gpu: GpuResources::default(),
            blocks_generated: false,
            buffers_generated: false,
        }
    }

    /// Number of chunks created so far in this process.
    pub fn chunk_count() -> u64 {
        CHUNK_COUNT.load(Ordering::Relaxed)
    }

    #[inline]
    fn index(x: usize, y: usize, z: usize) -> Option<usize> {
        (x < CHUNK_SIZE && y < CHUNK_HEIGHT && z < CHUNK_SIZE)
            .then(|| (x * CHUNK_SIZE + z) * CHUNK_HEIGHT + y)
    }

    /// Material at local `(x, y, z)`, or `None` outside the chunk.
    pub fn get_block(&self, x: usize, y: usize, z: usize) -> Option<BlockType> {
        Self::index(x, y, z).map(|index| self.blocks[index])
    }

    /// Writes `block` at local `(x, y, z)`.
    ///
    /// The mesh is not rebuilt; call [`Chunk::create_mesh`] afterwards if the
    /// change should become visible.
    ///
    /// # Returns
    /// `false` if the coordinate is outside the chunk and nothing was written.
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: Block) -> bool {
        match Self::index(x, y, z) {
            Some(index) => {
                self.blocks[index] = block.stored_type();
                true
            }
            None => false,
        }
    }

    /// Solidity at a signed local coordinate, or `None` outside the chunk.
    ///
    /// Used by the mesher, whose neighbour lookups step one cell past the
    /// chunk edges.
    pub fn is_solid_local(&self, x: i32, y: i32, z: i32) -> Option<bool> {
        if x < 0 || y < 0 || z < 0 {
            return None;
        }
        self.get_block(x as usize, y as usize, z as usize)
            .map(BlockType::is_solid)
    }

    /// Iterates over every cell as `(x, y, z, material)`.
    pub fn iter_blocks(&self) -> ChunkBlockIterator<'_> {
        ChunkBlockIterator::new(self)
    }

    /// Number of non-air cells.
    pub fn solid_count(&self) -> usize {
        self.blocks.iter().filter(|block| block.is_solid()).count()
    }

    /// Runs the whole CPU side of generation: terrain, the optional room and
    /// the mesh.
    pub fn generate(&mut self, terrain: &TerrainGenerator, mesh_config: &MeshConfig) {
        self.generate_blocks(terrain);
        if let Some(room) = terrain.generate_room(self.coord) {
            self.carve_room(room);
        }
        self.create_mesh(terrain, mesh_config);
    }

    /// Fills the block array from the terrain generator.
    pub fn generate_blocks(&mut self, terrain: &TerrainGenerator) {
        let (origin_x, origin_z) = (self.coord.world_x(), self.coord.world_z());
        for (column_index, column) in self.blocks.chunks_mut(CHUNK_HEIGHT).enumerate() {
            let x = (column_index / CHUNK_SIZE) as i32;
            let z = (column_index % CHUNK_SIZE) as i32;
            terrain.populate_column(origin_x + x, origin_z + z, column);
        }
        self.blocks_generated = true;
    }

    /// Overwrites every cell inside `room` with the room's material and
    /// remembers the room.
    ///
    /// Rooms come from [`TerrainGenerator::generate_room`], which only yields
    /// rooms that fit. Anything else is a bug: debug builds panic, release
    /// builds clip the room to the chunk.
    pub fn carve_room(&mut self, room: Room) {
        debug_assert!(
            room.fits_in_chunk(),
            "room {room:?} does not fit in chunk {}",
            self.coord
        );
        let x_end = (room.x + room.width).min(CHUNK_SIZE);
        let y_end = (room.y + room.height).min(CHUNK_HEIGHT);
        let z_end = (room.z + room.depth).min(CHUNK_SIZE);
        for x in room.x..x_end {
            for z in room.z..z_end {
                for y in room.y..y_end {
                    if let Some(index) = Self::index(x, y, z) {
                        self.blocks[index] = room.material;
                    }
                }
            }
        }
        log::trace!("Carved {room:?} into chunk {}", self.coord);
        self.room = Some(room);
    }

    /// Rebuilds the CPU mesh from the block array.
    ///
    /// Neighbouring chunks are stood in for by the terrain generator.
    pub fn create_mesh(&mut self, terrain: &TerrainGenerator, mesh_config: &MeshConfig) {
        let boundary = TerrainBoundary(terrain);
        self.mesh = MeshBuilder::new(mesh_config, &boundary).generate_mesh(self);
        self.buffers_generated = true;
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    pub fn mesh(&self) -> &ChunkMesh {
        &self.mesh
    }

    pub fn blocks_generated(&self) -> bool {
        self.blocks_generated
    }

    pub fn buffers_generated(&self) -> bool {
        self.buffers_generated
    }

    pub fn buffers_initialized(&self) -> bool {
        self.gpu.is_initialized()
    }

    pub fn gpu_resources(&self) -> &GpuResources {
        &self.gpu
    }

    /// Mutable access for the renderer, which installs and releases buffers.
    pub fn gpu_resources_mut(&mut self) -> &mut GpuResources {
        &mut self.gpu
    }
}
