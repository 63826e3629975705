use laprank_core::lap_info::LapNumber;
use laprank_core::{AgentID, LosePenaltyPolicy, RaceSettings};
use tracing::{debug, info};

use crate::progress::ProgressTracker;
use crate::rewards::RewardSink;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RacePhase {
    // Lap completions are being watched for a winner
    Racing,
    // Somebody won this episode; every further finish signal is ignored
    // until the next episode starts
    Finished { winner: AgentID },
}

#[derive(Clone, Debug, PartialEq)]
pub struct RaceResult {
    pub winner: AgentID,
    // terminal reward handed to each agent, indexed by agent id
    pub terminal_rewards: Vec<f64>,
}

pub struct RaceCoordinator {
    settings: RaceSettings,
    phase: RacePhase,
}

impl RaceCoordinator {
    pub fn new(settings: RaceSettings) -> Self {
        Self {
            settings,
            phase: RacePhase::Racing,
        }
    }

    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    pub fn max_laps(&self) -> LapNumber {
        self.settings.max_laps
    }

    // re-arm for the next race
    pub fn begin_episode(&mut self) {
        self.phase = RacePhase::Racing;
    }

    /// Handles a lap-completion signal from `agent`.
    ///
    /// Once an agent reaches the lap limit the race is decided: the winner
    /// takes the win reward, everyone else takes the losing penalty (flat, or
    /// scaled by how much of the race they still had left), and every agent's
    /// episode is ended and flagged for a recovery spawn. Anything arriving
    /// after that in the same episode, like a second car over the line in the
    /// same tick, is dropped.
    pub fn on_lap_completed(
        &mut self,
        agent: AgentID,
        lap: LapNumber,
        agent_count: usize,
        tracker: &mut ProgressTracker,
        sink: &mut dyn RewardSink,
    ) -> Option<RaceResult> {
        if lap < self.settings.max_laps {
            return None;
        }

        if let RacePhase::Finished { winner } = self.phase {
            debug!(
                "agent {} finished after agent {} already won, ignoring",
                agent, winner
            );
            return None;
        }
        self.phase = RacePhase::Finished { winner: agent };

        let mut terminal_rewards = vec![0.0; agent_count.max(agent + 1)];
        for (other, reward) in terminal_rewards.iter_mut().enumerate() {
            *reward = if other == agent {
                self.settings.win_reward
            } else {
                match self.settings.lose_penalty_policy {
                    LosePenaltyPolicy::Flat => self.settings.lose_penalty,
                    LosePenaltyPolicy::ProgressScaled => {
                        let progress = tracker.progress_fraction(other, self.settings.max_laps);
                        self.settings.lose_penalty * (1.0 - progress)
                    }
                }
            };
        }

        for (other, reward) in terminal_rewards.iter().enumerate() {
            sink.add_reward(other, *reward);
            tracker.flag_respawn(other);
            sink.end_episode(other);
        }

        info!("agent {} won the race after {} laps", agent, lap);

        Some(RaceResult {
            winner: agent,
            terminal_rewards,
        })
    }
}
