//! # Voxel World
//!
//! Everything that describes the streamed world on the CPU side.
//!
//! * **block**: materials and face directions
//! * **chunk**: fixed-size block columns, their coordinates and meshes
//! * **terrain**: the deterministic height field and room placement
//! * **tasks**: background chunk generation
//! * **chunk_manager**: the streaming state machine that decides which
//!   chunks exist
//!
//! ## Data Flow
//!
//! 1. The chunk manager sees the camera enter a new chunk and dispatches
//!    generation tasks for coordinates that came into range
//! 2. Workers generate blocks, carve rooms and build meshes
//! 3. The render thread commits finished chunks into the active collection
//! 4. The renderer uploads and draws them, and releases evicted ones

pub mod block;
pub mod chunk;
pub mod chunk_manager;
pub mod tasks;
pub mod terrain;
