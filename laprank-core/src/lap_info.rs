use serde::{Deserialize, Serialize};

pub type LapNumber = u32;
pub type CheckpointIndex = usize;
pub type Rank = usize;

// Per-agent progress record. `current_checkpoint` is the last checkpoint the
// agent validly crossed, so the one it is chasing is the one after it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct AgentProgressState {
    pub current_checkpoint: CheckpointIndex,
    // where this episode started; distance before it doesn't count as progress
    pub start_checkpoint: CheckpointIndex,
    pub lap: LapNumber,
    // simulated time since the lap (or episode) began
    pub lap_seconds: f64,
    pub last_rank: Option<Rank>,
    pub pending_respawn: bool,
}

impl AgentProgressState {
    pub fn new() -> Self {
        AgentProgressState {
            current_checkpoint: 0,
            start_checkpoint: 0,
            lap: 0,
            lap_seconds: 0.0,
            last_rank: None,
            pending_respawn: false,
        }
    }

    // Wipe everything an episode accumulates. The respawn flag survives since
    // it is read at the start of the next episode.
    pub fn reset(&mut self) {
        *self = AgentProgressState {
            pending_respawn: self.pending_respawn,
            ..AgentProgressState::new()
        };
    }
}

impl Default for AgentProgressState {
    fn default() -> Self {
        Self::new()
    }
}
