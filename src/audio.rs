//! Sound cues emitted by the simulation
//!
//! The simulation only talks to an [`AudioSink`]; the host decides how cues
//! are actually voiced. [`SimAudio`] is a deterministic in-memory mixer that
//! keeps track of which voices are still playing.

use glam::Vec2;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    /// Platform wakes up
    Activate,
    /// Looping travel hum
    MoveLoop,
    /// Platform crashes and shatters
    Break,
    /// Debris starts gathering (follows the debris centroid)
    ReformBegin,
    /// Platform pops back into place
    Reappear,
    /// A fragment hits the ground
    DebrisImpact,
}

impl SoundCue {
    /// Playback length used by [`SimAudio`]; `None` loops until stopped
    pub fn duration(&self) -> Option<f32> {
        match self {
            SoundCue::Activate => Some(0.4),
            SoundCue::MoveLoop => None,
            SoundCue::Break => Some(0.8),
            SoundCue::ReformBegin => Some(1.0),
            SoundCue::Reappear => Some(0.5),
            SoundCue::DebrisImpact => Some(0.2),
        }
    }
}

/// Named parameters a playing cue can be steered with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundParam {
    /// 1 while the platform is grinding against something
    Stop,
    /// Travel heading sector, 1..=8
    Influence,
    /// Normalized impact speed
    Velocity,
}

/// Opaque handle to a started cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundHandle(pub u32);

/// Positioned sound playback
pub trait AudioSink {
    /// Start `cue` at `pos`
    fn play(&mut self, cue: SoundCue, pos: Vec2) -> SoundHandle;

    fn set_param(&mut self, handle: SoundHandle, param: SoundParam, value: f32);

    /// Move a playing cue
    fn set_position(&mut self, handle: SoundHandle, pos: Vec2);

    /// False once the cue has finished or was stopped
    fn is_playing(&self, handle: SoundHandle) -> bool;

    fn stop(&mut self, handle: SoundHandle);
}

/// A voice tracked by [`SimAudio`]
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub handle: SoundHandle,
    pub cue: SoundCue,
    pub pos: Vec2,
    /// Seconds left; `None` for loops
    pub remaining: Option<f32>,
    pub params: Vec<(SoundParam, f32)>,
}

/// Deterministic mixer: voices expire after their cue's duration
#[derive(Debug, Clone, Default)]
pub struct SimAudio {
    voices: Vec<Voice>,
    /// Every cue ever started, in order
    history: Vec<SoundCue>,
    next_handle: u32,
    muted: bool,
}

impl SimAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mute/unmute; muted cues are still tracked
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Advance playback clocks and drop finished voices
    pub fn advance(&mut self, dt: f32) {
        for voice in &mut self.voices {
            if let Some(remaining) = voice.remaining.as_mut() {
                *remaining -= dt;
            }
        }
        self.voices.retain(|v| v.remaining.is_none_or(|r| r > 0.0));
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn voice(&self, handle: SoundHandle) -> Option<&Voice> {
        self.voices.iter().find(|v| v.handle == handle)
    }

    pub fn history(&self) -> &[SoundCue] {
        &self.history
    }

    /// How many times `cue` was started
    pub fn count(&self, cue: SoundCue) -> usize {
        self.history.iter().filter(|c| **c == cue).count()
    }
}

impl AudioSink for SimAudio {
    fn play(&mut self, cue: SoundCue, pos: Vec2) -> SoundHandle {
        let handle = SoundHandle(self.next_handle);
        self.next_handle += 1;
        if !self.muted {
            log::trace!("play {:?} at ({:.1}, {:.1})", cue, pos.x, pos.y);
        }
        self.history.push(cue);
        self.voices.push(Voice {
            handle,
            cue,
            pos,
            remaining: cue.duration(),
            params: Vec::new(),
        });
        handle
    }

    fn set_param(&mut self, handle: SoundHandle, param: SoundParam, value: f32) {
        if let Some(voice) = self.voices.iter_mut().find(|v| v.handle == handle) {
            match voice.params.iter_mut().find(|(p, _)| *p == param) {
                Some(slot) => slot.1 = value,
                None => voice.params.push((param, value)),
            }
        }
    }

    fn set_position(&mut self, handle: SoundHandle, pos: Vec2) {
        if let Some(voice) = self.voices.iter_mut().find(|v| v.handle == handle) {
            voice.pos = pos;
        }
    }

    fn is_playing(&self, handle: SoundHandle) -> bool {
        self.voice(handle).is_some()
    }

    fn stop(&mut self, handle: SoundHandle) {
        self.voices.retain(|v| v.handle != handle);
    }
}
