//! # Voxel Task System
//!
//! Background tasks that build voxel data off the render thread.

pub mod chunk_generation_task;
