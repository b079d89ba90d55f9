//! Platform state and core simulation types

use std::str::FromStr;

use glam::{IVec2, Vec2};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::SolidBody;
use super::debris::DebrisSwarm;
use super::geometry::{Axis, Rect};
use super::motion::MotionModel;
use super::tick::Stage;
use crate::audio::SoundHandle;
use crate::config::{ConfigError, PlatformConfig};
use crate::consts::{CRASH_RESET_TIME, CRASH_TIME, FAST_MOVE_SPEED, MOVE_SPEED};

/// Travel direction, fixed when the platform is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// Heading for this direction (y points down)
    pub fn home_angle(&self) -> f32 {
        use std::f32::consts::{FRAC_PI_2, PI};
        match self {
            Direction::Right => 0.0,
            Direction::Left => PI,
            Direction::Up => -FRAC_PI_2,
            Direction::Down => FRAC_PI_2,
        }
    }

    /// Axis of intended travel
    pub fn axis(&self) -> Axis {
        match self {
            Direction::Left | Direction::Right => Axis::Horizontal,
            Direction::Up | Direction::Down => Axis::Vertical,
        }
    }
}

impl FromStr for Direction {
    type Err = ConfigError;

    /// Case-insensitive direction name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(ConfigError::UnknownDirection(s.to_string())),
        }
    }
}

/// Current phase of the platform's cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Resting at its start position, waiting for a rider or trigger
    Idling,
    /// Telegraphing or travelling
    Moving,
    /// Shattered; debris is out and the platform reforms when it can
    Breaking,
}

impl Phase {
    /// The only phase this one may advance to
    pub fn successor(&self) -> Phase {
        match self {
            Phase::Idling => Phase::Moving,
            Phase::Moving => Phase::Breaking,
            Phase::Breaking => Phase::Idling,
        }
    }
}

/// Particle flavours the renderer knows how to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleKind {
    Activate,
    Move,
    Scrape,
    Break,
}

/// A request to emit particles, drained by the host each frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleBurst {
    pub kind: ParticleKind,
    pub count: u32,
    pub pos: Vec2,
    /// Half-extent of the random spawn area around `pos`
    pub range: Vec2,
    /// Launch direction (radians)
    pub direction: f32,
    /// Drawn in the inactive tint
    pub pressed: bool,
}

/// A breakaway platform
#[derive(Debug, Clone)]
pub struct Platform {
    pub(crate) body: SolidBody,
    pub(crate) start_position: IVec2,
    pub(crate) direction: Direction,
    pub(crate) fast: bool,
    pub(crate) home_angle: f32,
    pub(crate) phase: Phase,
    pub(crate) motion: MotionModel,

    /// Supplied by the host's periodic collidability toggle
    pub(crate) active: bool,
    pub(crate) visible: bool,
    /// Collision enabled by the sequencer (hidden platforms are not solid)
    pub(crate) solid: bool,
    pub(crate) triggered: bool,

    // Sequencer
    pub(crate) stage: Stage,
    pub(crate) pending: Option<Stage>,
    pub(crate) sleep: f32,
    pub(crate) crash_timer: f32,
    pub(crate) crash_reset_timer: f32,
    /// Reform is waiting on an occupied footprint
    pub(crate) reform_blocked: bool,

    // Break cycle
    pub(crate) swarm: Option<DebrisSwarm>,
    pub(crate) anchor: Option<SoundHandle>,
    pub(crate) move_sfx: Option<SoundHandle>,

    // Presentation
    pub(crate) shake_timer: f32,
    pub(crate) shake: IVec2,
    pub(crate) flash: f32,
    pub(crate) particle_remainder: f32,
    pub(crate) particles: Vec<ParticleBurst>,

    pub(crate) time_active: f64,
    pub(crate) rng: Pcg32,
}

impl Platform {
    /// Build a platform from level data, rejecting malformed placement
    pub fn new(config: &PlatformConfig) -> Result<Self, ConfigError> {
        let direction = config.validate().inspect_err(|e| {
            log::warn!("rejected platform at ({}, {}): {}", config.x, config.y, e);
        })?;
        let pos = IVec2::new(config.x, config.y);
        let home_angle = direction.home_angle();

        Ok(Self {
            body: SolidBody::new(pos, IVec2::new(config.width, config.height)),
            start_position: pos,
            direction,
            fast: config.fast,
            home_angle,
            phase: Phase::Idling,
            motion: MotionModel::at_rest(home_angle),
            active: true,
            visible: true,
            solid: true,
            triggered: false,
            stage: Stage::Idle,
            pending: Some(Stage::Idle),
            sleep: 0.0,
            crash_timer: CRASH_TIME,
            crash_reset_timer: CRASH_RESET_TIME,
            reform_blocked: false,
            swarm: None,
            anchor: None,
            move_sfx: None,
            shake_timer: 0.0,
            shake: IVec2::ZERO,
            flash: 0.0,
            particle_remainder: 0.0,
            particles: Vec::new(),
            time_active: 0.0,
            rng: Pcg32::seed_from_u64(config.seed),
        })
    }

    /// Force activation (remote switches, triggered attachments)
    pub fn trigger(&mut self) {
        self.triggered = true;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Host-driven activation toggle
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Currently blocks actors
    pub fn is_collidable(&self) -> bool {
        self.solid && self.active
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn position(&self) -> IVec2 {
        self.body.pos
    }

    pub fn start_position(&self) -> IVec2 {
        self.start_position
    }

    pub fn rect(&self) -> Rect {
        self.body.rect()
    }

    /// Where the platform reforms
    pub fn footprint(&self) -> Rect {
        Rect::from_position(self.start_position, self.body.size)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn motion(&self) -> &MotionModel {
        &self.motion
    }

    /// Travel speed once under way
    pub fn cruise_speed(&self) -> f32 {
        if self.fast { FAST_MOVE_SPEED } else { MOVE_SPEED }
    }

    pub fn crash_timer(&self) -> f32 {
        self.crash_timer
    }

    pub fn swarm(&self) -> Option<&DebrisSwarm> {
        self.swarm.as_ref()
    }

    /// Render offset while shaking
    pub fn shake_offset(&self) -> IVec2 {
        self.shake
    }

    /// White flash intensity after reforming, 0..=1
    pub fn flash(&self) -> f32 {
        self.flash
    }

    /// Take the particle requests emitted since the last call
    pub fn drain_particles(&mut self) -> Vec<ParticleBurst> {
        std::mem::take(&mut self.particles)
    }

    /// Move to the next phase of the cycle; anything else is refused
    pub(crate) fn advance_phase(&mut self, to: Phase) {
        if self.phase == to {
            return;
        }
        if self.phase.successor() != to {
            log::warn!("refusing phase change {:?} -> {:?}", self.phase, to);
            debug_assert!(false, "illegal phase change {:?} -> {:?}", self.phase, to);
            return;
        }
        log::info!("platform at {:?}: {:?} -> {:?}", self.start_position, self.phase, to);
        self.phase = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PlatformConfig {
        PlatformConfig::new(16, 96, 16, 8, Direction::Right)
    }

    #[test]
    fn test_new_platform_is_idle_and_solid() {
        let platform = Platform::new(&config()).expect("valid config");
        assert_eq!(platform.phase(), Phase::Idling);
        assert!(platform.is_collidable());
        assert!(platform.is_visible());
        assert_eq!(platform.rect(), Rect::new(16, 96, 16, 8));
        assert_eq!(platform.footprint(), platform.rect());
        assert_eq!(platform.motion().angle, 0.0);
    }

    #[test]
    fn test_inactive_platform_is_not_collidable() {
        let mut platform = Platform::new(&config()).expect("valid config");
        platform.set_active(false);
        assert!(!platform.is_collidable());
        assert!(platform.is_visible());
    }

    #[test]
    fn test_rejects_bad_config() {
        let mut bad = config();
        bad.width = 0;
        assert!(Platform::new(&bad).is_err());
        bad = config();
        bad.direction = "diagonal".into();
        assert!(matches!(Platform::new(&bad), Err(ConfigError::UnknownDirection(_))));
    }

    #[test]
    fn test_cruise_speed_tiers() {
        let mut cfg = config();
        assert_eq!(Platform::new(&cfg).map(|p| p.cruise_speed()).ok(), Some(60.0));
        cfg.fast = true;
        assert_eq!(Platform::new(&cfg).map(|p| p.cruise_speed()).ok(), Some(75.0));
    }

    #[test]
    fn test_phase_cycle_order() {
        assert_eq!(Phase::Idling.successor(), Phase::Moving);
        assert_eq!(Phase::Moving.successor(), Phase::Breaking);
        assert_eq!(Phase::Breaking.successor(), Phase::Idling);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("UP".parse::<Direction>().ok(), Some(Direction::Up));
        assert!(matches!(
            "nope".parse::<Direction>(),
            Err(ConfigError::UnknownDirection(d)) if d == "nope"
        ));
        assert_eq!(Direction::Left.axis(), Axis::Horizontal);
        assert_eq!(Direction::Down.home_angle(), std::f32::consts::FRAC_PI_2);
    }
}
