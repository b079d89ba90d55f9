//! Deterministic simulation module
//!
//! All platform logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (fragments in spawn order)
//! - The level is reached only through [`Environment`]

pub mod collision;
pub mod debris;
pub mod env;
pub mod geometry;
pub mod level;
pub mod motion;
pub mod state;
pub mod tick;

pub use collision::{Resolution, SolidBody, Sweep, resolve};
pub use debris::{DebrisFragment, DebrisSwarm, FragmentMode};
pub use env::Environment;
pub use geometry::{Axis, Curve, Rect};
pub use level::{Attachment, Level};
pub use motion::MotionModel;
pub use state::{Direction, ParticleBurst, ParticleKind, Phase, Platform};
pub use tick::{Frame, tick};
