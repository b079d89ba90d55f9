//! In-memory level used by the demo driver and the simulation tests

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::env::Environment;
use super::geometry::Rect;
use crate::config::ConfigError;

/// An entity rigidly attached to the platform (e.g. a spring on its side)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub rect: Rect,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

/// Static level geometry plus the actors living in it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub bounds: Rect,
    /// Camera view; defaults to the level bounds
    #[serde(default)]
    pub viewport: Option<Rect>,
    #[serde(default)]
    pub solids: Vec<Rect>,
    /// Actors other than the rider
    #[serde(default)]
    pub actors: Vec<Rect>,
    #[serde(default)]
    pub rider: Option<Rect>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Times the rider was pushed into a solid
    #[serde(skip)]
    pub squish_count: u32,
}

impl Level {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            viewport: None,
            solids: Vec::new(),
            actors: Vec::new(),
            rider: None,
            attachments: Vec::new(),
            squish_count: 0,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::Parse)
    }

    pub fn with_solid(mut self, rect: Rect) -> Self {
        self.solids.push(rect);
        self
    }

    pub fn with_rider(mut self, rect: Rect) -> Self {
        self.rider = Some(rect);
        self
    }
}

impl Environment for Level {
    fn collide_solid(&self, rect: Rect) -> bool {
        self.solids.iter().any(|s| s.overlaps(&rect))
    }

    fn collide_actor(&self, rect: Rect) -> bool {
        self.rider.is_some_and(|r| r.overlaps(&rect)) || self.actors.iter().any(|a| a.overlaps(&rect))
    }

    fn rider(&self) -> Option<Rect> {
        self.rider
    }

    fn move_static_movers(&mut self, delta: IVec2) {
        for attachment in &mut self.attachments {
            attachment.rect = attachment.rect.offset(delta);
        }
    }

    fn set_static_movers_enabled(&mut self, enabled: bool) {
        for attachment in &mut self.attachments {
            attachment.enabled = enabled;
        }
    }

    fn carry_riders(&mut self, before: Rect, delta: IVec2) {
        let Some(rider) = self.rider else { return };
        let after = before.offset(delta);
        let riding = !rider.overlaps(&before) && rider.offset(IVec2::Y).overlaps(&before);
        let pushed = rider.overlaps(&after);
        if !riding && !pushed {
            return;
        }

        let target = rider.offset(delta);
        if self.collide_solid(target) {
            if pushed || target.overlaps(&after) {
                self.squish_count += 1;
                log::debug!("rider squished at {:?}", rider);
            }
        } else {
            self.rider = Some(target);
        }
    }

    fn level_bounds(&self) -> Rect {
        self.bounds
    }

    fn viewport(&self) -> Rect {
        self.viewport.unwrap_or(self.bounds)
    }
}
