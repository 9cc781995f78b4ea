//! # Camera State Management
//!
//! Owns the first-person camera and its controller. Each frame the engine
//! feeds the current [`PlayerAction`] in and reads the camera position out;
//! the chunk manager derives the visible chunk set from that position.

use cgmath::{Deg, Point3};

use super::{voxels::chunk::coord::ChunkCoord, PlayerAction};

pub mod camera;

/// Base movement speed, in blocks per second.
pub const DEFAULT_CAMERA_SPEED: f32 = 12.0;
/// Mouse look sensitivity.
pub const DEFAULT_CAMERA_SENSITIVITY: f32 = 0.4;

/// The camera plus the controller that moves it.
pub struct CameraState {
    pub camera: camera::Camera,
    pub camera_controller: camera::CameraController,
}

impl CameraState {
    /// Creates a camera at `position`, looking along +X with a level horizon.
    pub fn new(position: Point3<f32>) -> Self {
        Self {
            camera: camera::Camera::new(position, Deg(0.0), Deg(0.0)),
            camera_controller: camera::CameraController::new(
                DEFAULT_CAMERA_SPEED,
                DEFAULT_CAMERA_SENSITIVITY,
            ),
        }
    }

    /// Processes player input actions and updates the camera controller state.
    pub fn intake_actions(&mut self, actions: &PlayerAction) {
        self.camera_controller.intake_actions(actions);
    }

    /// Applies pending input over `dt`.
    ///
    /// # Returns
    /// - `Some(CameraUpdates)` if the camera moved or turned
    /// - `None` if there was no input
    pub fn update(&mut self, dt: web_time::Duration) -> Option<CameraUpdates> {
        if !self.camera_controller.has_updates() {
            return None;
        }
        self.camera
            .get_controller_updates_and_reset_controller(&mut self.camera_controller, dt);
        let position = self.camera.position;
        Some(CameraUpdates {
            position,
            chunk_coord: ChunkCoord::from_world_position(position),
        })
    }

    pub fn position(&self) -> Point3<f32> {
        self.camera.position
    }
}

/// Camera changes produced by one [`CameraState::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraUpdates {
    /// New world position of the camera.
    pub position: Point3<f32>,
    /// Chunk containing the camera, if the position is finite.
    pub chunk_coord: Option<ChunkCoord>,
}
