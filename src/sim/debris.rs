//! Debris thrown out when a platform shatters
//!
//! Each fragment is a tiny actor: it tumbles under gravity, bounces off
//! solids, and later flies home along a bent path when the platform reforms.

use glam::{IVec2, Vec2};
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::env::Environment;
use super::geometry::{Curve, Rect};
use crate::audio::{AudioSink, SoundCue, SoundParam};
use crate::consts::*;
use crate::{approach, clamped_map, ease_cube_out, on_interval, safe_normalize};

/// What a fragment is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentMode {
    /// Free physics
    Falling,
    /// Physics plus positional jitter
    Shaking,
    /// Scripted flight home, physics ignored
    Returning,
}

/// One 8×8 piece of a shattered platform
#[derive(Debug, Clone)]
pub struct DebrisFragment {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Where this piece sits in the reformed platform
    pub home: Vec2,
    pub mode: FragmentMode,
    /// Normalized progress along the return path
    pub return_progress: f32,
    return_duration: f32,
    return_curve: Option<Curve>,
    remainder: Vec2,
    /// Takes part in physics and blocks the reform area
    collidable: bool,
    visible: bool,
    first_hit: bool,

    // Presentation
    /// Render offset while shaking
    pub jitter: IVec2,
    pub rotation: f32,
    spin: f32,
    pub scale: f32,
    pub flip_x: bool,
    /// Drawn in the active tint (vs. the pressed tint)
    pub lit: bool,
}

impl DebrisFragment {
    /// Fragment at `pos`, thrown away from `center`, that will return to `home`
    pub fn new(pos: Vec2, center: Vec2, home: Vec2, lit: bool, rng: &mut Pcg32) -> Self {
        let speed = DEBRIS_MIN_SPEED + rng.random::<f32>() * DEBRIS_SPEED_RANGE;
        let spin_sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
        Self {
            pos,
            vel: safe_normalize(pos - center, speed),
            home,
            mode: FragmentMode::Falling,
            return_progress: 0.0,
            return_duration: RETURN_DURATION,
            return_curve: None,
            remainder: Vec2::ZERO,
            collidable: true,
            visible: true,
            first_hit: true,
            jitter: IVec2::ZERO,
            rotation: rng.random_range(0.0..std::f32::consts::TAU),
            spin: rng.random_range(200f32.to_radians()..600f32.to_radians()) * spin_sign,
            scale: 1.0,
            flip_x: rng.random_bool(0.5),
            lit,
        }
    }

    pub fn hitbox(&self) -> Rect {
        Rect::centered(self.pos, DEBRIS_SIZE)
    }

    pub fn is_collidable(&self) -> bool {
        self.collidable
    }

    pub fn set_collidable(&mut self, collidable: bool) {
        self.collidable = collidable;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn on_ground(&self, env: &dyn Environment) -> bool {
        env.collide_solid(self.hitbox().offset(IVec2::Y))
    }

    pub fn update(
        &mut self,
        env: &dyn Environment,
        audio: &mut dyn AudioSink,
        rng: &mut Pcg32,
        time: f64,
        dt: f32,
    ) {
        if self.mode == FragmentMode::Returning {
            self.return_progress = approach(self.return_progress, 1.0, dt / self.return_duration);
            if let Some(curve) = self.return_curve {
                self.pos = curve.point(ease_cube_out(self.return_progress));
            }
            self.scale = 1.0 + self.return_progress * DEBRIS_RETURN_SCALE;
        } else {
            if self.collidable {
                self.vel.x = approach(self.vel.x, 0.0, DEBRIS_FRICTION * dt);
                if !self.on_ground(env) {
                    self.vel.y += DEBRIS_GRAVITY * dt;
                }
                self.move_h(self.vel.x * dt, env);
                self.move_v(self.vel.y * dt, env, audio);
            }
            if self.mode == FragmentMode::Shaking && on_interval(time, dt as f64, DEBRIS_SHAKE_INTERVAL as f64) {
                self.jitter = IVec2::new(rng.random_range(-1..=1), rng.random_range(-1..=1));
            }
        }
        self.rotation += self.spin * clamped_map(self.vel.y.abs(), 50.0, 150.0) * dt;
    }

    fn move_h(&mut self, amount: f32, env: &dyn Environment) {
        self.remainder.x += amount;
        let units = self.remainder.x.round() as i32;
        if units == 0 {
            return;
        }
        self.remainder.x -= units as f32;
        let sign = units.signum();
        for _ in 0..units.abs() {
            if env.collide_solid(self.hitbox().offset(IVec2::new(sign, 0))) {
                self.remainder.x = 0.0;
                self.vel.x = -self.vel.x * DEBRIS_BOUNCE_H;
                return;
            }
            self.pos.x += sign as f32;
        }
    }

    fn move_v(&mut self, amount: f32, env: &dyn Environment, audio: &mut dyn AudioSink) {
        self.remainder.y += amount;
        let units = self.remainder.y.round() as i32;
        if units == 0 {
            return;
        }
        self.remainder.y -= units as f32;
        let sign = units.signum();
        for _ in 0..units.abs() {
            if env.collide_solid(self.hitbox().offset(IVec2::new(0, sign))) {
                self.remainder.y = 0.0;
                self.land(audio);
                return;
            }
            self.pos.y += sign as f32;
        }
    }

    fn land(&mut self, audio: &mut dyn AudioSink) {
        if self.first_hit || self.vel.y > DEBRIS_HARD_IMPACT {
            let sound = audio.play(SoundCue::DebrisImpact, self.pos);
            audio.set_param(sound, SoundParam::Velocity, clamped_map(self.vel.y, 0.0, 600.0));
        }
        if self.vel.y > 0.0 && self.vel.y < DEBRIS_LANDING_SPEED {
            self.vel.y = 0.0;
        } else {
            self.vel.y = -self.vel.y * DEBRIS_BOUNCE_V;
        }
        self.first_hit = false;
    }

    /// Freeze physics; the fragment no longer blocks anything
    pub fn stop_moving(&mut self) {
        self.collidable = false;
    }

    pub fn start_shaking(&mut self) {
        if self.mode == FragmentMode::Falling {
            self.mode = FragmentMode::Shaking;
        }
    }

    /// Start flying home over `duration` seconds.
    ///
    /// Fragments outside `viewport` are first pulled back inside it so the
    /// whole flight is on screen.
    pub fn return_home(&mut self, duration: f32, viewport: Rect, rng: &mut Pcg32) {
        let min = Vec2::new(viewport.left() as f32, viewport.top() as f32) + VIEWPORT_INSET;
        let max = Vec2::new(viewport.right() as f32, viewport.bottom() as f32) - VIEWPORT_INSET;
        if !viewport.contains_point(self.pos) {
            self.pos = self.pos.clamp(min, max.max(min));
        }

        self.mode = FragmentMode::Returning;
        self.return_progress = 0.0;
        self.return_duration = duration.max(f32::EPSILON);
        self.jitter = IVec2::ZERO;

        let dir = safe_normalize(self.home - self.pos, 1.0);
        let bend = DEBRIS_RETURN_BEND + rng.random::<f32>() * DEBRIS_RETURN_BEND;
        let facing = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
        let control = (self.pos + self.home) / 2.0 + Vec2::new(dir.y, -dir.x) * bend * facing;
        self.return_curve = Some(Curve::new(self.pos, self.home, control));
    }

    pub fn is_home(&self) -> bool {
        self.mode == FragmentMode::Returning && self.return_progress >= 1.0
    }
}

/// All fragments of one break cycle
#[derive(Debug, Clone)]
pub struct DebrisSwarm {
    fragments: Vec<DebrisFragment>,
    centroid: Vec2,
    rng: Pcg32,
    time: f64,
}

impl DebrisSwarm {
    /// Cut `footprint` into 8×8 cells, one fragment per cell.
    ///
    /// Fragments are thrown away from the footprint centre and will return to
    /// the same cell of the platform placed at `home_origin`.
    pub fn spawn(footprint: Rect, home_origin: IVec2, lit: bool, rng: &mut Pcg32) -> Self {
        let center = footprint.center();
        let origin = footprint.position().as_vec2();
        let home_origin = home_origin.as_vec2();
        let mut swarm_rng = Pcg32::seed_from_u64(rng.random());

        let mut fragments = Vec::new();
        for x in (0..footprint.w).step_by(GRID as usize) {
            for y in (0..footprint.h).step_by(GRID as usize) {
                let offset = Vec2::new(x as f32, y as f32) + GRID as f32 / 2.0;
                fragments.push(DebrisFragment::new(
                    origin + offset,
                    center,
                    home_origin + offset,
                    lit,
                    &mut swarm_rng,
                ));
            }
        }
        log::debug!("spawned {} debris fragments from {:?}", fragments.len(), footprint);

        let mut swarm = Self {
            fragments,
            centroid: center,
            rng: swarm_rng,
            time: 0.0,
        };
        swarm.update_centroid();
        swarm
    }

    pub fn fragments(&self) -> &[DebrisFragment] {
        &self.fragments
    }

    pub fn fragments_mut(&mut self) -> &mut [DebrisFragment] {
        &mut self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Step every fragment; `lit` is the platform's current activation
    pub fn update(&mut self, env: &dyn Environment, audio: &mut dyn AudioSink, lit: bool, dt: f32) {
        self.time += dt as f64;
        for fragment in &mut self.fragments {
            fragment.lit = lit;
            fragment.update(env, audio, &mut self.rng, self.time, dt);
        }
    }

    /// Mean fragment position
    pub fn update_centroid(&mut self) -> Vec2 {
        if !self.fragments.is_empty() {
            let sum: Vec2 = self.fragments.iter().map(|f| f.pos).sum();
            self.centroid = sum / self.fragments.len() as f32;
        }
        self.centroid
    }

    pub fn centroid(&self) -> Vec2 {
        self.centroid
    }

    pub fn stop_moving(&mut self) {
        self.fragments.iter_mut().for_each(DebrisFragment::stop_moving);
    }

    pub fn start_shaking(&mut self) {
        self.fragments.iter_mut().for_each(DebrisFragment::start_shaking);
    }

    pub fn return_home(&mut self, duration: f32, viewport: Rect) {
        for fragment in &mut self.fragments {
            fragment.return_home(duration, viewport, &mut self.rng);
        }
    }

    /// True when neither a moving fragment, an actor nor a solid overlaps
    /// `footprint`
    pub fn area_clear(&self, footprint: Rect, env: &dyn Environment) -> bool {
        let debris_in_way = self
            .fragments
            .iter()
            .any(|f| f.collidable && f.hitbox().overlaps(&footprint));
        !debris_in_way && !env.collide_actor(footprint) && !env.collide_solid(footprint)
    }
}
