//! Breakaway headless driver
//!
//! Runs one platform through its cycle in a small level and logs what it does.
//! Usage: `breakaway [level.json [platform.json]]`

use breakaway::audio::{SimAudio, SoundCue};
use breakaway::consts::SIM_DT;
use breakaway::sim::{Direction, Level, Phase, Platform, Rect, tick};
use breakaway::{ConfigError, PlatformConfig};

/// Seconds of simulated time to run
const RUN_TIME: f32 = 12.0;

fn demo_level() -> Level {
    Level::new(Rect::new(0, 0, 320, 180))
        .with_solid(Rect::new(0, 160, 320, 20))
        .with_solid(Rect::new(200, 0, 8, 150))
        .with_rider(Rect::new(52, 85, 8, 11))
}

fn demo_platform() -> PlatformConfig {
    let mut config = PlatformConfig::new(48, 96, 24, 8, Direction::Right);
    config.seed = 0x5eed;
    config
}

fn read(path: &str) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            log::error!("cannot read {}: {}", path, e);
            None
        }
    }
}

fn load() -> Result<(Level, PlatformConfig), ConfigError> {
    let mut args = std::env::args().skip(1);
    let level = match args.next().as_deref().and_then(read) {
        Some(json) => Level::from_json(&json)?,
        None => demo_level(),
    };
    let config = match args.next().as_deref().and_then(read) {
        Some(json) => PlatformConfig::from_json(&json)?,
        None => demo_platform(),
    };
    Ok((level, config))
}

fn run() -> Result<(), ConfigError> {
    let (mut level, config) = load()?;
    let mut platform = Platform::new(&config)?;
    let mut audio = SimAudio::new();
    audio.set_muted(true);

    let mut last_phase = platform.phase();
    let mut cycles = 0;
    let mut time = 0.0;
    while time < RUN_TIME {
        // the rider rides away on the first run; re-arm by switch afterwards
        if cycles > 0 && platform.phase() == Phase::Idling {
            platform.trigger();
        }
        tick(&mut platform, &mut level, &mut audio, SIM_DT);
        audio.advance(SIM_DT);
        platform.drain_particles();
        time += SIM_DT;

        let phase = platform.phase();
        if phase != last_phase {
            if phase == Phase::Idling {
                cycles += 1;
            }
            if let Some(swarm) = platform.swarm() {
                log::info!("t={:.2}s {} debris fragments out", time, swarm.len());
            }
            last_phase = phase;
        }
    }

    log::info!(
        "ran {:.1}s: {} full cycles, {} breaks, rider squished {} times",
        time,
        cycles,
        audio.count(SoundCue::Break),
        level.squish_count
    );
    Ok(())
}

fn main() {
    env_logger::init();
    log::info!("Breakaway starting...");

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
