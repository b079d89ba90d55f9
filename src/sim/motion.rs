//! Speed/angle integrator for the platform's travel

use glam::Vec2;

use crate::approach;
use crate::consts::{ACCEL, STEER_SPEED};

/// Scalar speed and heading, each easing toward a target at a bounded rate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionModel {
    pub speed: f32,
    pub target_speed: f32,
    /// Heading in radians (0 = right, y down)
    pub angle: f32,
    pub target_angle: f32,
}

impl MotionModel {
    /// Stationary, facing `home_angle`
    pub fn at_rest(home_angle: f32) -> Self {
        Self {
            speed: 0.0,
            target_speed: 0.0,
            angle: home_angle,
            target_angle: home_angle,
        }
    }

    pub fn reset(&mut self, home_angle: f32) {
        *self = Self::at_rest(home_angle);
    }

    /// Advance by `dt` and return this frame's displacement
    pub fn step(&mut self, dt: f32) -> Vec2 {
        self.speed = approach(self.speed, self.target_speed, ACCEL * dt);
        self.angle = approach(self.angle, self.target_angle, STEER_SPEED * dt);
        Vec2::from_angle(self.angle) * self.speed * dt
    }
}
