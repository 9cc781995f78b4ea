//! # Camera Implementation
//!
//! A first-person camera and the controller that turns player actions into
//! movement. The camera only feeds world positions to chunk streaming; view
//! and projection matrices belong to whoever owns the render pipeline.

use std::f32::consts::FRAC_PI_2;

use cgmath::{Angle, InnerSpace, Point3, Rad, Vector3};
use web_time::Duration;

use crate::engine_state::PlayerAction;

/// Safe limit for pitch to prevent gimbal lock
const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

/// Mouse deltas below this magnitude are treated as jitter.
const ROTATION_DEADZONE: f64 = 0.5;

/// Represents a first-person camera in 3D space.
#[derive(Debug, Clone)]
pub struct Camera {
    /// The camera's position in world space
    pub position: Point3<f32>,
    /// Horizontal rotation (around Y axis) in radians
    pub yaw: Rad<f32>,
    /// Vertical rotation (around X axis) in radians
    pub pitch: Rad<f32>,
}

impl Camera {
    /// Creates a new camera with the specified position and orientation.
    ///
    /// # Example
    /// ```rust
    /// use cgmath::{Deg, Point3};
    /// use voxel_streamer::engine_state::camera_state::camera::Camera;
    ///
    /// let camera = Camera::new(Point3::new(0.0, 20.0, 0.0), Deg(0.0), Deg(0.0));
    /// assert_eq!(camera.position.y, 20.0);
    /// ```
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        }
    }

    /// Normalized direction the camera is facing.
    pub fn get_view_vec(&self) -> Vector3<f32> {
        let (yaw_sin, yaw_cos) = self.yaw.sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.sin_cos();
        Vector3::new(pitch_cos * yaw_cos, pitch_sin, pitch_cos * yaw_sin).normalize()
    }

    /// Applies the controller's accumulated input over `dt` and resets it.
    ///
    /// Horizontal movement follows the yaw only, so looking down does not
    /// slow the camera. Pitch is clamped just short of straight up or down.
    pub fn get_controller_updates_and_reset_controller(
        &mut self,
        controller: &mut CameraController,
        dt: Duration,
    ) {
        let dt = dt.as_secs_f32();
        let speed = controller.current_speed();

        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        let forward = Vector3::new(yaw_cos, 0.0, yaw_sin);
        let right = Vector3::new(-yaw_sin, 0.0, yaw_cos);
        self.position +=
            forward * (controller.amount_forward - controller.amount_backward) * speed * dt;
        self.position += right * (controller.amount_right - controller.amount_left) * speed * dt;
        self.position.y += (controller.amount_up - controller.amount_down) * speed * dt;

        self.yaw += Rad(controller.rotate_horizontal) * controller.sensitivity * dt;
        self.pitch += Rad(-controller.rotate_vertical) * controller.sensitivity * dt;
        self.pitch = Rad(self.pitch.0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));

        controller.reset();
    }
}

/// Tracks the movement and rotation requested since the last update.
#[derive(Debug, Clone)]
pub struct CameraController {
    amount_left: f32,
    amount_right: f32,
    amount_forward: f32,
    amount_backward: f32,
    amount_up: f32,
    amount_down: f32,
    rotate_horizontal: f32,
    rotate_vertical: f32,
    sprinting: bool,

    /// Base movement speed in blocks per second
    speed: f32,
    /// Speed multiplier while sprinting
    sprint_multiplier: f32,
    /// Mouse look sensitivity multiplier
    sensitivity: f32,
}

impl CameraController {
    /// Creates a controller with the given base speed and look sensitivity.
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            amount_left: 0.0,
            amount_right: 0.0,
            amount_forward: 0.0,
            amount_backward: 0.0,
            amount_up: 0.0,
            amount_down: 0.0,
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
            sprinting: false,
            speed,
            sprint_multiplier: 2.0,
            sensitivity,
        }
    }

    pub fn with_sprint_multiplier(mut self, multiplier: f32) -> Self {
        self.sprint_multiplier = multiplier;
        self
    }

    /// Records the player's input for the next update.
    pub fn intake_actions(&mut self, actions: &PlayerAction) {
        let axis = |pressed: bool| if pressed { 1.0 } else { 0.0 };
        self.amount_forward = axis(actions.move_forward);
        self.amount_backward = axis(actions.move_backward);
        self.amount_left = axis(actions.move_left);
        self.amount_right = axis(actions.move_right);
        self.amount_up = axis(actions.move_up);
        self.amount_down = axis(actions.move_down);
        self.sprinting = actions.sprint;
        if let Some((delta_x, delta_y)) = actions.rotate_view {
            if delta_x.abs() > ROTATION_DEADZONE {
                self.rotate_horizontal = delta_x as f32;
            }
            if delta_y.abs() > ROTATION_DEADZONE {
                self.rotate_vertical = delta_y as f32;
            }
        }
    }

    /// `true` if an update would move or rotate the camera.
    pub fn has_updates(&self) -> bool {
        self.amount_forward > 0.0
            || self.amount_backward > 0.0
            || self.amount_left > 0.0
            || self.amount_right > 0.0
            || self.amount_up > 0.0
            || self.amount_down > 0.0
            || self.rotate_horizontal != 0.0
            || self.rotate_vertical != 0.0
    }

    fn current_speed(&self) -> f32 {
        if self.sprinting {
            self.speed * self.sprint_multiplier
        } else {
            self.speed
        }
    }

    fn reset(&mut self) {
        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;
        self.amount_up = 0.0;
        self.amount_down = 0.0;
        self.amount_left = 0.0;
        self.amount_right = 0.0;
        self.amount_forward = 0.0;
        self.amount_backward = 0.0;
        self.sprinting = false;
    }
}
