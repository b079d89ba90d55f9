//! Platform construction parameters
//!
//! Loaded from level data as JSON; validated once when the platform is built.

use serde::{Deserialize, Serialize};

use crate::sim::Direction;

/// Placement and behaviour of one platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Top-left corner
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// "left", "right", "up" or "down"
    pub direction: String,
    /// Travel at the fast speed tier
    #[serde(default)]
    pub fast: bool,
    /// Seed for debris scatter and shake jitter
    #[serde(default)]
    pub seed: u64,
}

impl PlatformConfig {
    pub fn new(x: i32, y: i32, width: i32, height: i32, direction: Direction) -> Self {
        Self {
            x,
            y,
            width,
            height,
            direction: direction.as_str().to_string(),
            fast: false,
            seed: 0,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::Parse)
    }

    /// Check the contract the simulation relies on
    pub fn validate(&self) -> Result<Direction, ConfigError> {
        if self.width <= 0 || self.height <= 0 {
            return Err(ConfigError::NonPositiveSize {
                width: self.width,
                height: self.height,
            });
        }
        self.direction.parse()
    }
}

/// Errors raised while building a platform or its level
#[derive(Debug)]
pub enum ConfigError {
    NonPositiveSize { width: i32, height: i32 },
    UnknownDirection(String),
    Parse(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NonPositiveSize { width, height } => {
                write!(f, "platform size must be positive, got {}x{}", width, height)
            }
            ConfigError::UnknownDirection(dir) => write!(f, "unknown direction '{}'", dir),
            ConfigError::Parse(e) => write!(f, "failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Parse(e) => Some(e),
            _ => None,
        }
    }
}
