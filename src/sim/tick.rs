//! Per-frame platform sequencer
//!
//! The platform's cycle is a script with suspension points ("wait 0.2s",
//! "wait until the area is clear"). Each stretch between two suspension
//! points is a [`Stage`]. Stages live in a static table of begin/update
//! callbacks; an update returns a [`Flow`] telling the sequencer to stay,
//! move on within the same frame, or sleep before moving on.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{IVec2, Vec2};
use rand::Rng;

use super::collision;
use super::debris::DebrisSwarm;
use super::env::Environment;
use super::geometry::{Axis, Rect};
use super::state::{Direction, ParticleBurst, ParticleKind, Phase, Platform};
use crate::audio::{AudioSink, SoundCue, SoundParam};
use crate::consts::*;
use crate::{approach, on_interval};

/// Collaborators available to the platform during one frame
pub struct Frame<'a> {
    pub env: &'a mut dyn Environment,
    pub audio: &'a mut dyn AudioSink,
    pub dt: f32,
}

/// A stretch of the platform script between two suspension points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    /// Wait for a rider or trigger
    Idle,
    /// Accelerate and travel until crashing
    Travel,
    /// Break apart, then let the debris settle
    Shatter,
    /// Wait for the reform footprint to empty
    AwaitClear,
    /// Debris flies home
    Return,
    /// Platform reappears
    Reappear,
}

/// What the sequencer does after a stage update
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Flow {
    /// Run this stage again next frame
    Stay,
    /// Enter another stage now
    Next(Stage),
    /// Suspend for some seconds, then enter a stage
    Sleep(f32, Stage),
}

type BeginFn = fn(&mut Platform, &mut Frame<'_>);
type UpdateFn = fn(&mut Platform, &mut Frame<'_>) -> Flow;

struct StageDescriptor {
    stage: Stage,
    begin: Option<BeginFn>,
    update: UpdateFn,
}

/// Indexed by `Stage as usize`
static STAGES: [StageDescriptor; 6] = [
    StageDescriptor {
        stage: Stage::Idle,
        begin: Some(Platform::begin_idle),
        update: Platform::update_idle,
    },
    StageDescriptor {
        stage: Stage::Travel,
        begin: Some(Platform::begin_travel),
        update: Platform::update_travel,
    },
    StageDescriptor {
        stage: Stage::Shatter,
        begin: Some(Platform::begin_shatter),
        update: Platform::update_shatter,
    },
    StageDescriptor {
        stage: Stage::AwaitClear,
        begin: Some(Platform::begin_await_clear),
        update: Platform::update_await_clear,
    },
    StageDescriptor {
        stage: Stage::Return,
        begin: Some(Platform::begin_return),
        update: Platform::update_return,
    },
    StageDescriptor {
        stage: Stage::Reappear,
        begin: None,
        update: Platform::update_reappear,
    },
];

impl Stage {
    fn descriptor(self) -> &'static StageDescriptor {
        let desc = &STAGES[self as usize];
        debug_assert_eq!(desc.stage, self);
        desc
    }
}

/// Advance the platform by one frame
pub fn tick(
    platform: &mut Platform,
    env: &mut dyn Environment,
    audio: &mut dyn AudioSink,
    dt: f32,
) {
    let mut frame = Frame { env, audio, dt };

    platform.update_shake(dt);
    platform.body.collidable = platform.is_collidable();
    platform.run_sequence(&mut frame);
    platform.track_anchor(&mut *frame.audio);

    let lit = platform.active;
    if let Some(swarm) = platform.swarm.as_mut() {
        swarm.update(&*frame.env, &mut *frame.audio, lit, dt);
    }

    platform.update_move_sfx(&mut *frame.audio);
    platform.flash = approach(platform.flash, 0.0, FLASH_DECAY * dt);
    platform.time_active += dt as f64;
}

impl Platform {
    fn run_sequence(&mut self, frame: &mut Frame<'_>) {
        if self.sleep > 0.0 {
            self.sleep -= frame.dt;
            return;
        }
        if let Some(stage) = self.pending.take() {
            self.enter(stage, frame);
        }

        for _ in 0..STAGES.len() {
            match (self.stage.descriptor().update)(self, frame) {
                Flow::Stay => return,
                Flow::Next(stage) => self.enter(stage, frame),
                Flow::Sleep(secs, stage) => {
                    self.sleep = secs;
                    self.pending = Some(stage);
                    return;
                }
            }
        }
        log::warn!("sequencer did not settle this frame (stage {:?})", self.stage);
    }

    fn enter(&mut self, stage: Stage, frame: &mut Frame<'_>) {
        log::debug!("stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
        if let Some(begin) = stage.descriptor().begin {
            begin(self, frame);
        }
    }

    /// True on frames that cross a multiple of `interval`
    fn interval(&self, dt: f32, interval: f32) -> bool {
        let dt = dt as f64;
        on_interval(self.time_active + dt, dt, interval as f64)
    }

    // === Idle ===

    fn begin_idle(&mut self, _frame: &mut Frame<'_>) {
        self.advance_phase(Phase::Idling);
        self.motion.reset(self.home_angle);
    }

    fn update_idle(&mut self, frame: &mut Frame<'_>) -> Flow {
        let ridden = self.is_collidable() && frame.env.rider_on_top(self.rect());
        if !self.triggered && !ridden {
            return Flow::Stay;
        }

        self.triggered = false;
        frame.audio.play(SoundCue::Activate, self.body.center());
        self.advance_phase(Phase::Moving);
        self.start_shaking(TELEGRAPH_TIME);
        self.activate_particles(frame.env.rider());
        Flow::Sleep(TELEGRAPH_TIME, Stage::Travel)
    }

    // === Travel ===

    fn begin_travel(&mut self, frame: &mut Frame<'_>) {
        self.motion.target_speed = self.cruise_speed();
        let sfx = frame.audio.play(SoundCue::MoveLoop, self.body.center());
        frame.audio.set_param(sfx, SoundParam::Stop, 0.0);
        self.move_sfx = Some(sfx);
        self.crash_timer = CRASH_TIME;
        self.crash_reset_timer = CRASH_RESET_TIME;
    }

    fn update_travel(&mut self, frame: &mut Frame<'_>) -> Flow {
        let dt = frame.dt;
        if self.interval(dt, MOVE_PARTICLE_INTERVAL) {
            self.move_particles();
        }

        let displacement = self.motion.step(dt);
        let resolution =
            collision::resolve(&mut self.body, self.direction, displacement, &mut *frame.env);
        let mut hit = resolution.hit;

        if self.interval(dt, SCRAPE_PARTICLE_INTERVAL) {
            let support = self.direction.axis().other();
            let drift = support.of(displacement);
            if drift != 0.0 {
                self.scrape_particles(support, drift > 0.0, &*frame.env);
            }
        }

        let bounds = frame.env.level_bounds();
        if self.direction == Direction::Down
            && self.rect().top() > bounds.bottom() + BOTTOM_EXIT_MARGIN
        {
            hit = true;
        }

        if hit {
            self.set_move_param(&mut *frame.audio, 1.0);
            self.crash_reset_timer = CRASH_RESET_TIME;
            if self.crash_timer <= 0.0 {
                return self.crash(frame);
            }
            self.crash_timer -= dt;
        } else {
            self.set_move_param(&mut *frame.audio, 0.0);
            if self.crash_reset_timer > 0.0 {
                self.crash_reset_timer -= dt;
            } else {
                self.crash_timer = CRASH_TIME;
            }
        }

        let rect = self.rect();
        if rect.left() < bounds.left() || rect.top() < bounds.top() || rect.right() > bounds.right() {
            log::debug!("platform left the level at {:?}", rect);
            return self.crash(frame);
        }
        Flow::Stay
    }

    fn crash(&mut self, frame: &mut Frame<'_>) -> Flow {
        frame.audio.play(SoundCue::Break, self.body.center());
        if let Some(sfx) = self.move_sfx.take() {
            frame.audio.stop(sfx);
        }
        self.motion.reset(self.home_angle);
        self.start_shaking(TELEGRAPH_TIME);
        Flow::Sleep(TELEGRAPH_TIME, Stage::Shatter)
    }

    // === Shatter ===

    fn begin_shatter(&mut self, frame: &mut Frame<'_>) {
        self.break_particles();
        self.swarm = Some(DebrisSwarm::spawn(
            self.rect(),
            self.start_position,
            self.active,
            &mut self.rng,
        ));

        frame.env.move_static_movers(self.start_position - self.body.pos);
        frame.env.set_static_movers_enabled(false);
        self.body.pos = self.start_position;
        self.body.remainder = Vec2::ZERO;
        self.visible = false;
        self.solid = false;
        self.advance_phase(Phase::Breaking);
    }

    fn update_shatter(&mut self, _frame: &mut Frame<'_>) -> Flow {
        Flow::Sleep(SETTLE_TIME, Stage::AwaitClear)
    }

    // === AwaitClear ===

    fn begin_await_clear(&mut self, _frame: &mut Frame<'_>) {
        if let Some(swarm) = self.swarm.as_mut() {
            swarm.stop_moving();
        }
        self.reform_blocked = false;
    }

    fn update_await_clear(&mut self, frame: &mut Frame<'_>) -> Flow {
        let footprint = self.footprint();
        let clear = match &self.swarm {
            Some(swarm) => swarm.area_clear(footprint, &*frame.env),
            None => !frame.env.collide_actor(footprint) && !frame.env.collide_solid(footprint),
        };
        if !clear {
            if !self.reform_blocked {
                log::debug!("reform at {:?} blocked; waiting for the area to clear", footprint);
                self.reform_blocked = true;
            }
            return Flow::Stay;
        }

        self.solid = true;
        let center = self.body.center();
        if let Some(swarm) = self.swarm.as_mut() {
            let origin = swarm.fragments().first().map_or(center, |f| f.pos);
            self.anchor = Some(frame.audio.play(SoundCue::ReformBegin, origin));
            swarm.start_shaking();
        }
        Flow::Sleep(REFORM_SHAKE_TIME, Stage::Return)
    }

    // === Return / Reappear ===

    fn begin_return(&mut self, frame: &mut Frame<'_>) {
        let viewport = frame.env.viewport();
        if let Some(swarm) = self.swarm.as_mut() {
            swarm.return_home(RETURN_DURATION, viewport);
        }
    }

    fn update_return(&mut self, _frame: &mut Frame<'_>) -> Flow {
        Flow::Sleep(REAPPEAR_TIME, Stage::Reappear)
    }

    fn update_reappear(&mut self, frame: &mut Frame<'_>) -> Flow {
        // Tracking stops here even if the sound is still playing
        self.anchor = None;
        self.swarm = None;

        frame.audio.play(SoundCue::Reappear, self.body.center());
        self.visible = true;
        frame.env.set_static_movers_enabled(true);
        self.motion.reset(self.home_angle);
        self.flash = 1.0;
        // triggers received mid-cycle are dropped
        self.triggered = false;
        Flow::Next(Stage::Idle)
    }

    // === Per-frame helpers ===

    fn start_shaking(&mut self, time: f32) {
        self.shake_timer = time;
    }

    fn update_shake(&mut self, dt: f32) {
        if self.shake_timer <= 0.0 {
            return;
        }
        self.shake_timer -= dt;
        self.shake = if self.shake_timer > 0.0 {
            IVec2::new(self.rng.random_range(-1..=1), self.rng.random_range(-1..=1))
        } else {
            IVec2::ZERO
        };
    }

    /// Keep the reform sound on the debris centroid until it finishes
    fn track_anchor(&mut self, audio: &mut dyn AudioSink) {
        let Some(handle) = self.anchor else { return };
        if !audio.is_playing(handle) {
            self.anchor = None;
            return;
        }
        if let Some(swarm) = self.swarm.as_mut() {
            audio.set_position(handle, swarm.update_centroid());
        }
    }

    fn set_move_param(&self, audio: &mut dyn AudioSink, stop: f32) {
        if let Some(sfx) = self.move_sfx {
            audio.set_param(sfx, SoundParam::Stop, stop);
        }
    }

    /// Feed the travel heading (as an eighth-turn sector, 1..=8) to the move loop
    fn update_move_sfx(&self, audio: &mut dyn AudioSink) {
        let Some(sfx) = self.move_sfx else { return };
        if !audio.is_playing(sfx) {
            return;
        }
        let heading = Vec2::from_angle(self.motion.angle) * Vec2::new(-1.0, 1.0);
        let angle = heading.y.atan2(heading.x);
        let sector = (((-angle + TAU) % TAU) / TAU * 8.0 + 0.5).floor() as i32;
        audio.set_param(sfx, SoundParam::Influence, (sector.rem_euclid(8) + 1) as f32);
    }

    // === Particles ===

    fn emit(&mut self, kind: ParticleKind, count: u32, pos: Vec2, range: Vec2, direction: f32) {
        self.particles.push(ParticleBurst {
            kind,
            count,
            pos,
            range,
            direction,
            pressed: !self.active,
        });
    }

    /// Burst from every side not blocked by the rider
    fn activate_particles(&mut self, rider: Option<Rect>) {
        let r = self.rect();
        let touching = |delta: IVec2| rider.is_some_and(|p| p.overlaps(&r.offset(delta)));
        let (w, h) = (r.w as f32, r.h as f32);
        let c = r.center();

        if !touching(IVec2::NEG_X) {
            let pos = Vec2::new(r.left() as f32, c.y);
            self.emit(ParticleKind::Activate, (h / 2.0) as u32, pos, Vec2::new(0.0, (h - 4.0) * 0.5), PI);
        }
        if !touching(IVec2::X) {
            let pos = Vec2::new(r.right() as f32, c.y);
            self.emit(ParticleKind::Activate, (h / 2.0) as u32, pos, Vec2::new(0.0, (h - 4.0) * 0.5), 0.0);
        }
        if !touching(IVec2::NEG_Y) {
            let pos = Vec2::new(c.x, r.top() as f32);
            self.emit(ParticleKind::Activate, (w / 2.0) as u32, pos, Vec2::new((w - 4.0) * 0.5, 0.0), -FRAC_PI_2);
        }
        let pos = Vec2::new(c.x, r.bottom() as f32);
        self.emit(ParticleKind::Activate, (w / 2.0) as u32, pos, Vec2::new((w - 4.0) * 0.5, 0.0), FRAC_PI_2);
    }

    /// Exhaust from the trailing edge
    fn move_particles(&mut self) {
        let r = self.rect();
        let (w, h) = (r.w as f32, r.h as f32);
        let c = r.center();
        let (pos, range, direction, rate) = match self.direction {
            Direction::Right => (Vec2::new(r.left() as f32 + 1.0, c.y), Vec2::new(0.0, h - 4.0), PI, h / 32.0),
            Direction::Left => (Vec2::new(r.right() as f32, c.y), Vec2::new(0.0, h - 4.0), 0.0, h / 32.0),
            Direction::Down => (Vec2::new(c.x, r.top() as f32 + 1.0), Vec2::new(w - 4.0, 0.0), -FRAC_PI_2, w / 32.0),
            Direction::Up => (Vec2::new(c.x, r.bottom() as f32), Vec2::new(w - 4.0, 0.0), FRAC_PI_2, w / 32.0),
        };

        self.particle_remainder += rate;
        let count = self.particle_remainder.floor();
        self.particle_remainder -= count;
        if count > 0.0 {
            self.emit(ParticleKind::Move, count as u32, pos, range * 0.5, direction);
        }
    }

    /// Sparks where the support-axis edge grinds against solids
    fn scrape_particles(&mut self, axis: Axis, positive: bool, env: &dyn Environment) {
        if !self.is_collidable() {
            return;
        }
        let r = self.rect();
        let points: Vec<IVec2> = match axis {
            Axis::Horizontal => {
                let x = if positive { r.right() } else { r.left() - 1 };
                (0..r.h).step_by(GRID as usize).map(|i| IVec2::new(x, r.top() + 4 + i)).collect()
            }
            Axis::Vertical => {
                let y = if positive { r.bottom() } else { r.top() - 1 };
                (0..r.w).step_by(GRID as usize).map(|i| IVec2::new(r.left() + 4 + i, y)).collect()
            }
        };
        for p in points {
            if env.collide_solid(Rect::new(p.x, p.y, 1, 1)) {
                self.emit(ParticleKind::Scrape, 1, p.as_vec2(), Vec2::ZERO, 0.0);
            }
        }
    }

    /// One burst per 4×4 cell, flung away from the centre
    fn break_particles(&mut self) {
        let r = self.rect();
        let c = r.center();
        for i in (0..r.w).step_by(4) {
            for j in (0..r.h).step_by(4) {
                let p = Vec2::new((r.x + 2 + i) as f32, (r.y + 2 + j) as f32);
                let d = p - c;
                self.emit(ParticleKind::Break, 1, p, Vec2::splat(2.0), d.y.atan2(d.x));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SimAudio;
    use crate::config::PlatformConfig;
    use crate::sim::level::{Attachment, Level};

    const START: IVec2 = IVec2::new(16, 96);

    fn level() -> Level {
        Level::new(Rect::new(0, 0, 320, 180)).with_solid(Rect::new(0, 160, 320, 20))
    }

    fn platform(direction: Direction) -> Platform {
        let mut config = PlatformConfig::new(START.x, START.y, 16, 8, direction);
        config.seed = 42;
        Platform::new(&config).expect("valid config")
    }

    fn step(p: &mut Platform, level: &mut Level, audio: &mut SimAudio) {
        tick(p, level, audio, SIM_DT);
        audio.advance(SIM_DT);
    }

    /// Step until `done` holds; returns the number of frames taken
    fn run_until(
        p: &mut Platform,
        level: &mut Level,
        audio: &mut SimAudio,
        max_frames: usize,
        mut done: impl FnMut(&Platform, &Level) -> bool,
    ) -> Option<usize> {
        for frame in 1..=max_frames {
            step(p, level, audio);
            if done(p, level) {
                return Some(frame);
            }
        }
        None
    }

    /// Trigger, hit the wall and shatter; returns frames taken
    fn break_against_wall(p: &mut Platform, level: &mut Level, audio: &mut SimAudio) -> usize {
        level.solids.push(Rect::new(40, 0, 8, 150));
        p.trigger();
        let frames = run_until(p, level, audio, 600, |p, _| p.phase() == Phase::Breaking)
            .expect("platform should break against the wall");
        level.solids.pop();
        frames
    }

    #[test]
    fn test_idle_without_rider_stays_idle() {
        let mut p = platform(Direction::Right);
        let mut level = level();
        let mut audio = SimAudio::new();
        for _ in 0..120 {
            step(&mut p, &mut level, &mut audio);
        }
        assert_eq!(p.phase(), Phase::Idling);
        assert_eq!(p.position(), START);
        assert!(audio.history().is_empty());
    }

    #[test]
    fn test_rider_starts_platform_after_telegraph() {
        let mut p = platform(Direction::Right);
        let mut level = level().with_rider(Rect::new(20, 85, 8, 11));
        let mut audio = SimAudio::new();

        step(&mut p, &mut level, &mut audio);
        assert_eq!(p.phase(), Phase::Moving);
        assert_eq!(p.motion().target_speed, 0.0);
        assert_eq!(audio.count(SoundCue::Activate), 1);
        assert!(p.drain_particles().iter().all(|b| b.kind == ParticleKind::Activate));

        let frames = run_until(&mut p, &mut level, &mut audio, 60, |p, _| p.motion().target_speed > 0.0)
            .expect("platform should start moving");
        let elapsed = frames as f32 * SIM_DT;
        assert!(elapsed >= TELEGRAPH_TIME - 1e-4 && elapsed <= TELEGRAPH_TIME + 3.0 * SIM_DT);
        assert_eq!(p.motion().target_speed, MOVE_SPEED);
        assert_eq!(p.crash_timer(), CRASH_TIME);

        // rider is carried along
        run_until(&mut p, &mut level, &mut audio, 60, |_, _| false);
        assert!(p.position().x > START.x);
        assert_eq!(level.rider.map(|r| r.bottom()), Some(START.y));
        assert!(level.rider.is_some_and(|r| r.x > 20));
    }

    #[test]
    fn test_fast_platform_targets_fast_speed() {
        let mut config = PlatformConfig::new(START.x, START.y, 16, 8, Direction::Right);
        config.fast = true;
        let mut p = Platform::new(&config).expect("valid config");
        let mut level = level();
        let mut audio = SimAudio::new();
        p.trigger();
        run_until(&mut p, &mut level, &mut audio, 60, |p, _| p.motion().target_speed > 0.0);
        assert_eq!(p.motion().target_speed, FAST_MOVE_SPEED);
    }

    #[test]
    fn test_clear_run_forgives_earlier_hit() {
        let mut p = platform(Direction::Right);
        let mut level = level();
        level.solids.push(Rect::new(40, 0, 8, 150));
        let mut audio = SimAudio::new();
        p.trigger();

        run_until(&mut p, &mut level, &mut audio, 300, |p, _| p.crash_timer() < CRASH_TIME)
            .expect("platform should touch the wall");
        level.solids.pop();

        // Still inside the forgiveness window
        step(&mut p, &mut level, &mut audio);
        step(&mut p, &mut level, &mut audio);
        assert!(p.crash_timer() < CRASH_TIME);

        for _ in 0..((CRASH_RESET_TIME / SIM_DT) as usize + 2) {
            step(&mut p, &mut level, &mut audio);
        }
        assert_eq!(p.crash_timer(), CRASH_TIME);
        assert_eq!(p.phase(), Phase::Moving);
    }

    #[test]
    fn test_sustained_contact_breaks_platform() {
        let mut p = platform(Direction::Right);
        let mut level = level();
        level.attachments.push(Attachment {
            rect: Rect::new(32, 96, 4, 8),
            enabled: true,
        });
        level.solids.push(Rect::new(40, 0, 8, 150));
        let mut audio = SimAudio::new();
        p.trigger();

        let first_hit = run_until(&mut p, &mut level, &mut audio, 300, |p, _| p.crash_timer() < CRASH_TIME)
            .expect("platform should touch the wall");
        assert_eq!(p.rect().right(), 40);
        assert_eq!(level.attachments[0].rect.x, 40);

        let more = run_until(&mut p, &mut level, &mut audio, 120, |p, _| p.phase() == Phase::Breaking)
            .expect("platform should break");
        let contact = more as f32 * SIM_DT;
        assert!(contact >= CRASH_TIME + TELEGRAPH_TIME && contact <= 0.5, "contact {}", contact);
        assert!(first_hit > 0);

        let swarm = p.swarm().expect("debris spawned");
        assert_eq!(swarm.len(), 2);
        assert!(!p.is_collidable());
        assert!(!p.is_visible());
        assert_eq!(p.position(), START);
        assert_eq!(level.attachments[0].rect, Rect::new(32, 96, 4, 8));
        assert!(!level.attachments[0].enabled);
        assert_eq!(audio.count(SoundCue::Break), 1);
        assert!(audio.voices().iter().all(|v| v.cue != SoundCue::MoveLoop));

        let homes: Vec<Vec2> = swarm.fragments().iter().map(|f| f.home).collect();
        assert_eq!(homes, vec![Vec2::new(20.0, 100.0), Vec2::new(28.0, 100.0)]);
        let bursts = p.drain_particles();
        assert_eq!(bursts.iter().filter(|b| b.kind == ParticleKind::Break).count(), 8);
    }

    #[test]
    fn test_reform_after_settle_delay() {
        let mut p = platform(Direction::Right);
        let mut level = level();
        let mut audio = SimAudio::new();
        break_against_wall(&mut p, &mut level, &mut audio);

        let frames = run_until(&mut p, &mut level, &mut audio, 600, |p, _| p.is_collidable())
            .expect("platform should become collidable again");
        let settle = frames as f32 * SIM_DT;
        assert!(settle >= SETTLE_TIME - 1e-3 && settle <= SETTLE_TIME + 2.5 * SIM_DT, "settle {}", settle);
        assert_eq!(p.phase(), Phase::Breaking);
        assert!(!p.is_visible());
        assert_eq!(audio.count(SoundCue::ReformBegin), 1);

        run_until(&mut p, &mut level, &mut audio, 120, |p, _| p.phase() == Phase::Idling)
            .expect("platform should reform");
        assert!(p.is_visible());
        assert!(p.is_collidable());
        assert!(p.swarm().is_none());
        assert!(p.flash() > 0.9);
        assert_eq!(p.position(), START);
        assert_eq!(audio.count(SoundCue::Reappear), 1);
    }

    #[test]
    fn test_occupied_footprint_stalls_reform() {
        let mut p = platform(Direction::Right);
        let mut level = level();
        level.attachments.push(Attachment {
            rect: Rect::new(32, 96, 4, 8),
            enabled: true,
        });
        let mut audio = SimAudio::new();
        break_against_wall(&mut p, &mut level, &mut audio);

        level.actors.push(Rect::new(18, 90, 8, 11));
        for _ in 0..(10.0 / SIM_DT) as usize {
            step(&mut p, &mut level, &mut audio);
            assert!(!p.is_collidable());
        }
        assert_eq!(p.phase(), Phase::Breaking);
        assert!(p.swarm().is_some());

        level.actors.clear();
        step(&mut p, &mut level, &mut audio);
        assert!(p.is_collidable());

        run_until(&mut p, &mut level, &mut audio, 120, |p, _| p.phase() == Phase::Idling)
            .expect("platform should reform once clear");
        assert!(level.attachments[0].enabled);
    }

    #[test]
    fn test_reform_sound_follows_debris_centroid() {
        let mut p = platform(Direction::Right);
        let mut level = level();
        let mut audio = SimAudio::new();
        break_against_wall(&mut p, &mut level, &mut audio);
        run_until(&mut p, &mut level, &mut audio, 600, |p, _| p.is_collidable());

        for _ in 0..20 {
            step(&mut p, &mut level, &mut audio);
            let centroid = p.swarm().map(|s| s.centroid()).expect("swarm alive during reform");
            let voice = audio
                .voices()
                .iter()
                .find(|v| v.cue == SoundCue::ReformBegin)
                .expect("reform sound playing");
            assert_eq!(voice.pos, centroid);
        }
    }

    #[test]
    fn test_phase_cycle_never_skips() {
        let mut p = platform(Direction::Right);
        let mut level = level();
        level.solids.push(Rect::new(40, 0, 8, 150));
        let mut audio = SimAudio::new();

        let mut seen = vec![p.phase()];
        for _ in 0..(12.0 / SIM_DT) as usize {
            if p.phase() == Phase::Idling {
                p.trigger();
            }
            step(&mut p, &mut level, &mut audio);

            let phase = p.phase();
            if seen.last() != Some(&phase) {
                seen.push(phase);
            }
            if phase == Phase::Idling {
                assert!(p.is_visible());
            }
            if phase == Phase::Breaking {
                assert!(p.swarm().is_some());
            }
        }

        assert!(seen.len() >= 7, "expected two full cycles, got {:?}", seen);
        for pair in seen.windows(2) {
            assert_eq!(pair[0].successor(), pair[1]);
        }
    }

    #[test]
    fn test_leaving_level_ends_travel() {
        let mut config = PlatformConfig::new(8, 96, 16, 8, Direction::Left);
        config.seed = 1;
        let mut p = Platform::new(&config).expect("valid config");
        let mut level = level();
        let mut audio = SimAudio::new();
        p.trigger();
        run_until(&mut p, &mut level, &mut audio, 300, |p, _| p.phase() == Phase::Breaking)
            .expect("leaving the level should break the platform");
        assert_eq!(p.position(), IVec2::new(8, 96));
    }

    #[test]
    fn test_falling_below_level_counts_as_hit() {
        let mut config = PlatformConfig::new(100, 20, 8, 8, Direction::Down);
        config.seed = 3;
        let mut p = Platform::new(&config).expect("valid config");
        let mut level = Level::new(Rect::new(0, 0, 320, 180));
        let mut audio = SimAudio::new();
        p.trigger();
        run_until(&mut p, &mut level, &mut audio, 600, |p, _| p.phase() == Phase::Breaking)
            .expect("falling out of the level should break the platform");
        assert_eq!(p.swarm().map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_activation_skips_side_touching_rider() {
        let mut p = platform(Direction::Right);
        // rider pressed against the left side
        let mut level = level().with_rider(Rect::new(8, 96, 8, 11));
        let mut audio = SimAudio::new();
        p.trigger();
        step(&mut p, &mut level, &mut audio);
        let bursts = p.drain_particles();
        assert_eq!(bursts.len(), 3);
        assert!(bursts.iter().all(|b| b.direction != PI));
    }

    #[test]
    fn test_same_seed_same_debris() {
        let run = || {
            let mut p = platform(Direction::Right);
            let mut level = level();
            let mut audio = SimAudio::new();
            break_against_wall(&mut p, &mut level, &mut audio);
            for _ in 0..30 {
                step(&mut p, &mut level, &mut audio);
            }
            p.swarm()
                .map(|s| s.fragments().iter().map(|f| f.pos).collect::<Vec<_>>())
                .unwrap_or_default()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_inactive_platform_cannot_be_ridden() {
        let mut p = platform(Direction::Right);
        p.set_active(false);
        let rider = Rect::new(20, 85, 8, 11);
        let mut level = level().with_rider(rider);
        let mut audio = SimAudio::new();

        for _ in 0..60 {
            step(&mut p, &mut level, &mut audio);
        }
        assert_eq!(p.phase(), Phase::Idling);
        assert_eq!(p.position(), START);
        assert_eq!(audio.count(SoundCue::Activate), 0);

        // a switch still starts it, but it slides out from under the rider
        p.trigger();
        for _ in 0..60 {
            step(&mut p, &mut level, &mut audio);
        }
        assert_eq!(p.phase(), Phase::Moving);
        assert!(p.position().x > START.x);
        assert_eq!(level.rider, Some(rider));
        assert_eq!(level.squish_count, 0);
    }

    #[test]
    fn test_support_drift_scrapes_along_ceiling() {
        let mut p = platform(Direction::Right);
        // ceiling flush with the platform's top edge
        let mut level = level().with_solid(Rect::new(0, 80, 320, 16));
        let mut audio = SimAudio::new();
        p.trigger();
        run_until(&mut p, &mut level, &mut audio, 60, |p, _| p.motion().target_speed > 0.0)
            .expect("platform should start moving");

        p.motion.target_angle = -0.3;
        p.drain_particles();
        for _ in 0..30 {
            step(&mut p, &mut level, &mut audio);
        }

        assert_eq!(p.rect().top(), 96);
        assert!(p.position().x > START.x);
        let scrapes: Vec<ParticleBurst> = p
            .drain_particles()
            .into_iter()
            .filter(|b| b.kind == ParticleKind::Scrape)
            .collect();
        assert!(!scrapes.is_empty());
        assert!(scrapes.iter().all(|b| b.pos.y == 95.0));
    }

    #[test]
    fn test_solid_in_footprint_stalls_reform() {
        let mut p = platform(Direction::Right);
        let mut level = level();
        let mut audio = SimAudio::new();
        break_against_wall(&mut p, &mut level, &mut audio);

        level.solids.push(Rect::new(20, 98, 4, 4));
        for _ in 0..(5.0 / SIM_DT) as usize {
            step(&mut p, &mut level, &mut audio);
            assert!(!p.is_collidable());
            assert_eq!(p.phase(), Phase::Breaking);
        }

        level.solids.pop();
        step(&mut p, &mut level, &mut audio);
        assert!(p.is_collidable());
        run_until(&mut p, &mut level, &mut audio, 120, |p, _| p.phase() == Phase::Idling)
            .expect("platform should reform once the solid is gone");
    }
}
