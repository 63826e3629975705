use std::error::Error;

use laprank_core::Settings;
use laprank_sim::driver::Harness;
use laprank_sim::game::RaceSession;
use laprank_sim::map::Map;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// built-in track when no track file is configured
const OVAL_CHECKPOINTS: usize = 8;
const OVAL_RADIUS: f64 = 40.0;
const OVAL_GRID_SLOTS: usize = 4;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let settings = Settings::new()?;

    let map = match &settings.harness.track_file {
        Some(filename) => Map::load(filename)?,
        None => Map::oval(OVAL_CHECKPOINTS, OVAL_RADIUS, OVAL_GRID_SLOTS),
    };

    let session = RaceSession::new(
        map.track()?,
        map.spawn_manager(),
        &settings,
        settings.harness.phase,
        settings.harness.agent_count,
    )?;

    let rng = match settings.harness.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut harness = Harness::new(session, settings.harness.clone(), rng);

    let mut wins = vec![0; settings.harness.agent_count];
    for episode in 0..settings.harness.episodes {
        let summary = harness.run_episode(episode)?;
        if let Some(winner) = summary.winner {
            wins[winner] += 1;
        }
    }

    info!(
        "wins per agent after {} episodes: {:?}",
        settings.harness.episodes, wins
    );
    Ok(())
}
