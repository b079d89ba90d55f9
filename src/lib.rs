//! Breakaway - a moving platform that shatters on impact and reforms
//!
//! Core modules:
//! - `sim`: Deterministic simulation (motion, collision, debris, phase sequencer)
//! - `audio`: Sound cue interface consumed by the simulation
//! - `config`: Construction parameters and validation

pub mod audio;
pub mod config;
pub mod sim;

pub use config::{ConfigError, PlatformConfig};

use glam::Vec2;

/// Gameplay constants
pub mod consts {
    use std::f32::consts::PI;

    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Size of one level grid cell; debris is cut on this grid
    pub const GRID: i32 = 8;

    /// Platform acceleration toward target speed (units/s²)
    pub const ACCEL: f32 = 300.0;
    /// Target travel speed
    pub const MOVE_SPEED: f32 = 60.0;
    /// Target travel speed for fast platforms
    pub const FAST_MOVE_SPEED: f32 = 75.0;
    /// Steering rate toward target angle (rad/s)
    pub const STEER_SPEED: f32 = PI * 16.0;

    /// Shake before moving and before shattering
    pub const TELEGRAPH_TIME: f32 = 0.2;
    /// Sustained contact tolerated before the platform breaks
    pub const CRASH_TIME: f32 = 0.15;
    /// Clear travel required before the crash timer is forgiven
    pub const CRASH_RESET_TIME: f32 = 0.1;
    /// Debris settle time before reform is considered
    pub const SETTLE_TIME: f32 = 2.2;
    /// Debris shake before flying home
    pub const REFORM_SHAKE_TIME: f32 = 0.2;
    /// Duration handed to each fragment's return animation
    pub const RETURN_DURATION: f32 = 0.65;
    /// Time after the return starts at which the platform reappears
    pub const REAPPEAR_TIME: f32 = 0.6;

    /// Largest lateral offset tried when stepping around an obstruction
    pub const UNSTUCK_RANGE: i32 = 3;
    /// How far below the level a downward platform may fall before it counts as a hit
    pub const BOTTOM_EXIT_MARGIN: i32 = 32;

    /// Emission intervals
    pub const MOVE_PARTICLE_INTERVAL: f32 = 0.02;
    pub const SCRAPE_PARTICLE_INTERVAL: f32 = 0.03;
    /// Flash decay rate (per second)
    pub const FLASH_DECAY: f32 = 5.0;

    /// Debris physics
    pub const DEBRIS_SIZE: i32 = 4;
    pub const DEBRIS_FRICTION: f32 = 100.0;
    pub const DEBRIS_GRAVITY: f32 = 400.0;
    pub const DEBRIS_MIN_SPEED: f32 = 60.0;
    pub const DEBRIS_SPEED_RANGE: f32 = 60.0;
    pub const DEBRIS_BOUNCE_H: f32 = 0.5;
    pub const DEBRIS_BOUNCE_V: f32 = 0.25;
    /// Downward speeds below this stop dead on landing
    pub const DEBRIS_LANDING_SPEED: f32 = 40.0;
    /// Impacts faster than this always make a sound
    pub const DEBRIS_HARD_IMPACT: f32 = 50.0;
    pub const DEBRIS_SHAKE_INTERVAL: f32 = 0.05;
    /// Extra scale reached at the end of the return animation
    pub const DEBRIS_RETURN_SCALE: f32 = 0.5;
    /// Lateral bend of the return path (min, plus up to the same again)
    pub const DEBRIS_RETURN_BEND: f32 = 16.0;
    /// Returning fragments are pulled this far inside the camera view
    pub const VIEWPORT_INSET: f32 = 8.0;
}

/// Move `value` toward `target` by at most `max_delta`, never overshooting
#[inline]
pub fn approach(value: f32, target: f32, max_delta: f32) -> f32 {
    if value > target {
        (value - max_delta).max(target)
    } else {
        (value + max_delta).min(target)
    }
}

/// Map `value` from `[min, max]` into `[0, 1]`, clamped
#[inline]
pub fn clamped_map(value: f32, min: f32, max: f32) -> f32 {
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Slack for clocks that land a hair short of an interval boundary
const INTERVAL_EPSILON: f64 = 1e-6;

/// True on the frames where `time` crosses a multiple of `interval`.
///
/// Clocks are kept in f64 so long runs don't drift off the cadence.
#[inline]
pub fn on_interval(time: f64, dt: f64, interval: f64) -> bool {
    let step = |t: f64| (t / interval + INTERVAL_EPSILON).floor();
    step(time - dt) < step(time)
}

#[inline]
pub fn ease_cube_out(t: f32) -> f32 {
    let inv = 1.0 - t;
    1.0 - inv * inv * inv
}

/// Scale `v` to `length`, or zero if `v` has no direction
#[inline]
pub fn safe_normalize(v: Vec2, length: f32) -> Vec2 {
    v.normalize_or_zero() * length
}
