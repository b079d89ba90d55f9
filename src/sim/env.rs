//! Collaborator interface the platform consumes from its surroundings

use glam::IVec2;

use super::geometry::Rect;

/// Everything the platform needs to know about the level around it.
///
/// Static geometry queries never include the platform itself.
pub trait Environment {
    /// Does `rect` overlap any static solid?
    fn collide_solid(&self, rect: Rect) -> bool;

    /// Does `rect` overlap any actor (rider included)?
    fn collide_actor(&self, rect: Rect) -> bool;

    /// Hitbox of the tracked rider, if one is in the level
    fn rider(&self) -> Option<Rect>;

    /// Is the tracked rider standing on top of `platform`?
    fn rider_on_top(&self, platform: Rect) -> bool {
        self.rider().is_some_and(|r| {
            !r.overlaps(&platform) && r.offset(IVec2::Y).overlaps(&platform)
        })
    }

    /// Move every entity statically attached to the platform by `delta`
    fn move_static_movers(&mut self, delta: IVec2);

    /// Detach (`false`) or reattach (`true`) the static attachments
    fn set_static_movers_enabled(&mut self, enabled: bool);

    /// Called after the platform moved from `before` by `delta`, so actors
    /// riding or in the way can be carried or pushed.
    fn carry_riders(&mut self, _before: Rect, _delta: IVec2) {}

    /// Playable area of the level
    fn level_bounds(&self) -> Rect;

    /// Area currently visible to the camera
    fn viewport(&self) -> Rect;
}
