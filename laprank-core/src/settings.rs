use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};

use crate::phase::TrainingPhase;

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

// Whether looking at the target checkpoint earns something, or only looking
// away from it costs something.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FacingPolicy {
    Symmetric,
    PenaltyOnly,
}

// What to do when the best checkpoint ahead is further along than the tracked one
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AheadPolicy {
    Reward,
    Neutral,
}

// Flat pays `lap_completed_reward` as is; LapTimeScaled pays
// `lap_completed_reward / lap_seconds`, kept inside the min/max bounds
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LapRewardPolicy {
    Flat,
    LapTimeScaled,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LosePenaltyPolicy {
    Flat,
    ProgressScaled,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HarnessSettings {
    pub tick_ms: u64,
    // sleep out the rest of each tick instead of running flat out
    pub realtime: bool,
    pub episodes: u32,
    pub max_ticks_per_episode: u32,
    pub agent_count: usize,
    pub phase: TrainingPhase,
    pub seed: Option<u64>,
    pub track_file: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct DetectionSettings {
    // checkpoints with a smaller forward dot than this are "not ahead" (~70 degree cone)
    pub forward_cone_dot: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct ProgressSettings {
    pub facing_threshold: f64,
    pub facing_policy: FacingPolicy,
    pub progress_reward: f64,
    pub checkpoint_reached_reward: f64,
    pub undercut_penalty: f64,
    pub ahead_policy: AheadPolicy,
    pub crossing_radius: f64,
    // paid on top of the checkpoint reward when a race lap closes
    pub lap_completed_reward: f64,
    pub lap_reward_policy: LapRewardPolicy,
    pub lap_time_reward_min: f64,
    pub lap_time_reward_max: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct RankingSettings {
    // must dwarf any distance on the track so checkpoint count dominates the score
    pub score_scale: f64,
    pub position_reward: f64,
    pub position_penalty: f64,
    pub better_rank_reward: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct RaceSettings {
    pub max_laps: u32,
    pub win_reward: f64,
    pub lose_penalty: f64,
    pub lose_penalty_policy: LosePenaltyPolicy,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct EpisodeSettings {
    // applied once per second of simulated time
    pub time_penalty: f64,
    pub idle_speed: f64,
    pub max_idle_seconds: f64,
    pub idle_penalty: f64,
    pub smoothing_alpha: f64,
    pub approach_multiplier: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Settings {
    pub harness: HarnessSettings,
    pub detection: DetectionSettings,
    pub progress: ProgressSettings,
    pub ranking: RankingSettings,
    pub race: RaceSettings,
    pub episode: EpisodeSettings,
}

impl Settings {
    // Defaults, overlaid with config.yaml from the working directory if there is one
    pub fn new() -> Result<Settings, ConfigError> {
        Settings::load(DEFAULT_CONFIG_FILE)
    }

    pub fn load(path: &str) -> Result<Settings, ConfigError> {
        let config = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name(path).required(false))
            .build()?;

        config.try_deserialize()
    }
}

impl Default for HarnessSettings {
    fn default() -> Self {
        HarnessSettings {
            tick_ms: 20,
            realtime: false,
            episodes: 5,
            max_ticks_per_episode: 6000,
            agent_count: 2,
            phase: TrainingPhase::Race,
            seed: None,
            track_file: None,
        }
    }
}

impl Default for DetectionSettings {
    fn default() -> Self {
        DetectionSettings {
            forward_cone_dot: 0.3,
        }
    }
}

impl Default for ProgressSettings {
    fn default() -> Self {
        ProgressSettings {
            facing_threshold: 0.5,
            facing_policy: FacingPolicy::Symmetric,
            progress_reward: 2.0,
            checkpoint_reached_reward: 3.0,
            undercut_penalty: -2.0,
            ahead_policy: AheadPolicy::Reward,
            crossing_radius: 5.0,
            lap_completed_reward: 50.0,
            lap_reward_policy: LapRewardPolicy::Flat,
            lap_time_reward_min: 10.0,
            lap_time_reward_max: 100.0,
        }
    }
}

impl Default for RankingSettings {
    fn default() -> Self {
        RankingSettings {
            score_scale: 1000.0,
            position_reward: 0.05,
            position_penalty: -0.01,
            better_rank_reward: 0.2,
        }
    }
}

impl Default for RaceSettings {
    fn default() -> Self {
        RaceSettings {
            max_laps: 1,
            win_reward: 2.0,
            lose_penalty: -1.0,
            lose_penalty_policy: LosePenaltyPolicy::Flat,
        }
    }
}

impl Default for EpisodeSettings {
    fn default() -> Self {
        EpisodeSettings {
            time_penalty: -0.1,
            idle_speed: 1.0,
            max_idle_seconds: 5.0,
            idle_penalty: -20.0,
            smoothing_alpha: 0.2,
            approach_multiplier: 1.0,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            harness: HarnessSettings::default(),
            detection: DetectionSettings::default(),
            progress: ProgressSettings::default(),
            ranking: RankingSettings::default(),
            race: RaceSettings::default(),
            episode: EpisodeSettings::default(),
        }
    }
}
