use laprank_core::{AgentID, EpisodeSettings};
use tracing::debug;

use crate::progress::ProgressTracker;
use crate::rewards::RewardSink;

#[derive(Clone, Copy, Debug, Default)]
struct ShapingState {
    // exponentially smoothed distance to the checkpoint being chased
    smoothed_distance: Option<f64>,
    idle_seconds: f64,
}

// The dense per-tick terms that sit on top of checkpoint progress: a small
// time cost, a bonus for closing in on the next checkpoint, and the idle
// timeout that sends a parked car back to a spawn point.
pub struct EpisodeShaping {
    settings: EpisodeSettings,
    states: Vec<ShapingState>,
}

impl EpisodeShaping {
    pub fn new(settings: EpisodeSettings) -> Self {
        Self {
            settings,
            states: Vec::new(),
        }
    }

    fn entry(&mut self, agent: AgentID) -> &mut ShapingState {
        if agent >= self.states.len() {
            self.states.resize(agent + 1, ShapingState::default());
        }
        &mut self.states[agent]
    }

    pub fn reset(&mut self, agent: AgentID) {
        *self.entry(agent) = ShapingState::default();
    }

    pub fn idle_seconds(&self, agent: AgentID) -> f64 {
        self.states
            .get(agent)
            .map_or(0.0, |state| state.idle_seconds)
    }

    // Returns true if the agent just timed out; its episode has been ended
    // and it is flagged for a respawn.
    pub fn apply(
        &mut self,
        agent: AgentID,
        distance_to_target: f64,
        speed: f64,
        dt: f64,
        tracker: &mut ProgressTracker,
        sink: &mut dyn RewardSink,
    ) -> bool {
        let settings = self.settings;
        let state = self.entry(agent);

        let mut reward = settings.time_penalty * dt;

        // first tick of an episode seeds the average instead of paying for it
        let previous = state.smoothed_distance.unwrap_or(distance_to_target);
        let smoothed = settings.smoothing_alpha * distance_to_target
            + (1.0 - settings.smoothing_alpha) * previous;
        state.smoothed_distance = Some(smoothed);
        reward += (smoothed - distance_to_target) * settings.approach_multiplier;

        let mut timed_out = false;
        if speed < settings.idle_speed {
            state.idle_seconds += dt;
            if state.idle_seconds > settings.max_idle_seconds {
                debug!("agent {} idled for {:.1}s", agent, state.idle_seconds);
                state.idle_seconds = 0.0;
                reward += settings.idle_penalty;
                timed_out = true;
            }
        } else {
            state.idle_seconds = 0.0;
        }

        sink.add_reward(agent, reward);
        if timed_out {
            tracker.flag_respawn(agent);
            sink.end_episode(agent);
        }

        timed_out
    }
}
