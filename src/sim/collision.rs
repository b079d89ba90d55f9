//! Swept movement of the platform against static geometry
//!
//! The platform moves in whole units; fractional motion is carried in a
//! remainder until it rounds to a step. The primary axis is swept with an
//! unstuck search; the support axis is swept without any hit response.

use glam::{IVec2, Vec2};

use super::env::Environment;
use super::geometry::{Axis, Rect};
use super::state::Direction;
use crate::consts::UNSTUCK_RANGE;

/// A solid rectangle moved in whole units with a fractional carry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidBody {
    pub pos: IVec2,
    pub size: IVec2,
    pub remainder: Vec2,
    /// Carries and pushes actors when set; a non-collidable body passes through them
    pub collidable: bool,
}

impl SolidBody {
    pub fn new(pos: IVec2, size: IVec2) -> Self {
        Self {
            pos,
            size,
            remainder: Vec2::ZERO,
            collidable: true,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_position(self.pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.rect().center()
    }
}

/// Result of sweeping one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sweep {
    /// Whole units actually moved
    pub moved: i32,
    /// Solid geometry stopped the sweep
    pub blocked: bool,
    /// Units left over when blocked
    pub remaining: i32,
}

/// Result of resolving one frame's displacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resolution {
    /// Primary-axis travel was blocked and could not step around
    pub hit: bool,
    pub primary: Sweep,
    pub support: Sweep,
}

/// Move the body by `displacement` for a platform travelling in `direction`.
///
/// The tracked rider is guarded against being crushed by support-axis
/// motion only, at wherever the primary sweep left it.
pub fn resolve(
    body: &mut SolidBody,
    direction: Direction,
    displacement: Vec2,
    env: &mut dyn Environment,
) -> Resolution {
    let primary_axis = direction.axis();
    let support_axis = primary_axis.other();

    let (hit, primary) = move_check(body, primary_axis, primary_axis.of(displacement), env);
    let rider = env.rider();
    let support = sweep(body, support_axis, support_axis.of(displacement), rider, env);

    Resolution {
        hit,
        primary,
        support,
    }
}

/// Sweep the primary axis, stepping around obstructions up to
/// `UNSTUCK_RANGE` units to either side. Returns whether travel was blocked.
fn move_check(
    body: &mut SolidBody,
    axis: Axis,
    amount: f32,
    env: &mut dyn Environment,
) -> (bool, Sweep) {
    if amount == 0.0 {
        return (false, Sweep::default());
    }

    let first = sweep(body, axis, amount, None, env);
    if !first.blocked {
        return (false, first);
    }

    let sign = if amount > 0.0 { 1 } else { -1 };
    let lateral = axis.other();
    for offset in 1..=UNSTUCK_RANGE {
        for side in [1, -1] {
            let nudge = offset * side;
            let probe = axis.unit() * sign + lateral.unit() * nudge;
            if env.collide_solid(body.rect().offset(probe)) {
                continue;
            }

            move_exact(body, lateral, nudge, None, env);
            let mut moved = first.moved + move_exact(body, axis, sign, None, env);
            let rest = first.remaining - sign;
            if rest != 0 {
                moved += sweep_exact(body, axis, rest, None, env).moved;
            }
            log::trace!("stepped around obstruction by {} on {:?}", nudge, lateral);
            return (
                false,
                Sweep {
                    moved,
                    blocked: false,
                    remaining: 0,
                },
            );
        }
    }

    (true, first)
}

/// Accumulate `amount` into the remainder and sweep the whole units it yields
pub fn sweep(
    body: &mut SolidBody,
    axis: Axis,
    amount: f32,
    guard: Option<Rect>,
    env: &mut dyn Environment,
) -> Sweep {
    let carry = axis.of_mut(&mut body.remainder);
    *carry += amount;
    let units = carry.round() as i32;
    if units == 0 {
        return Sweep::default();
    }
    *carry -= units as f32;
    sweep_exact(body, axis, units, guard, env)
}

/// Sweep exactly `units` along `axis`, stopping short of the first solid
pub fn sweep_exact(
    body: &mut SolidBody,
    axis: Axis,
    units: i32,
    guard: Option<Rect>,
    env: &mut dyn Environment,
) -> Sweep {
    let sign = units.signum();
    let start = body.rect();
    let mut free = 0;
    let mut blocked = false;
    while free != units {
        if env.collide_solid(start.offset(axis.unit() * (free + sign))) {
            blocked = true;
            break;
        }
        free += sign;
    }

    let moved = move_exact(body, axis, free, guard, env);
    Sweep {
        moved,
        blocked,
        remaining: if blocked { units - free } else { 0 },
    }
}

/// Move exactly `units` without checking solids, carrying attachments along.
///
/// With a `guard` rider on the leading side, the move is shortened so the
/// rider is never pushed into solid geometry. Returns the units moved.
pub fn move_exact(
    body: &mut SolidBody,
    axis: Axis,
    mut units: i32,
    guard: Option<Rect>,
    env: &mut dyn Environment,
) -> i32 {
    if let Some(rider) = guard {
        let feet_x = rider.center().x;
        let left = body.pos.x as f32;
        let leading = match axis {
            Axis::Horizontal => (units < 0 && feet_x < left) || (units > 0 && feet_x > left),
            Axis::Vertical => units < 0 && rider.bottom() <= body.pos.y,
        };
        if leading {
            while units != 0 && env.collide_solid(rider.offset(axis.unit() * units)) {
                units -= units.signum();
            }
        }
    }

    if units == 0 {
        return 0;
    }

    let before = body.rect();
    let delta = axis.unit() * units;
    body.pos += delta;
    env.move_static_movers(delta);
    if body.collidable {
        env.carry_riders(before, delta);
    }
    units
}
