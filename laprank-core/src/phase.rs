use serde::{Deserialize, Serialize};

// Which kind of episode is running. Lap completions only count while racing;
// exploration is free-roam training from random spawns.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrainingPhase {
    Exploration,
    Race,
}

impl TrainingPhase {
    pub fn is_race(&self) -> bool {
        matches!(self, TrainingPhase::Race)
    }
}
