//! # Core Module
//!
//! Synchronisation primitives shared by the streaming engine.
//!
//! ## Key Components
//! - `MtResource`: reference-counted value behind a read-write lock, used for
//!   state that worker threads and the render thread both touch (the pending
//!   list and the active chunk collection).

pub mod mt_resource;

pub use mt_resource::MtResource;
