use laprank_core::lap_info::{AgentProgressState, CheckpointIndex, LapNumber, Rank};
use laprank_core::AgentID;

// Per-agent progress records, indexed directly by agent id. Records are
// created on first touch, so there is no separate registration step.
pub struct ProgressTracker {
    checkpoint_count: usize,
    states: Vec<AgentProgressState>,
}

impl ProgressTracker {
    pub fn new(checkpoint_count: usize) -> Self {
        Self {
            checkpoint_count: checkpoint_count.max(1),
            states: Vec::new(),
        }
    }

    pub fn checkpoint_count(&self) -> usize {
        self.checkpoint_count
    }

    pub fn agent_count(&self) -> usize {
        self.states.len()
    }

    fn entry(&mut self, agent: AgentID) -> &mut AgentProgressState {
        if agent >= self.states.len() {
            self.states.resize(agent + 1, AgentProgressState::new());
        }
        &mut self.states[agent]
    }

    pub fn state(&mut self, agent: AgentID) -> AgentProgressState {
        *self.entry(agent)
    }

    pub fn current_index(&mut self, agent: AgentID) -> CheckpointIndex {
        self.entry(agent).current_checkpoint
    }

    pub fn expected_next(&mut self, agent: AgentID) -> CheckpointIndex {
        (self.current_index(agent) + 1) % self.checkpoint_count
    }

    pub fn lap(&mut self, agent: AgentID) -> LapNumber {
        self.entry(agent).lap
    }

    pub fn last_rank(&mut self, agent: AgentID) -> Option<Rank> {
        self.entry(agent).last_rank
    }

    // The only way the index moves during an episode: one step forward,
    // bumping the lap counter when it wraps back to the start line
    pub fn advance(&mut self, agent: AgentID) -> CheckpointIndex {
        let checkpoint_count = self.checkpoint_count;
        let state = self.entry(agent);
        state.current_checkpoint = (state.current_checkpoint + 1) % checkpoint_count;
        if state.current_checkpoint == 0 {
            state.lap += 1;
            state.lap_seconds = 0.0;
        }
        state.current_checkpoint
    }

    pub fn lap_seconds(&mut self, agent: AgentID) -> f64 {
        self.entry(agent).lap_seconds
    }

    pub fn tick_clock(&mut self, agent: AgentID, dt: f64) {
        self.entry(agent).lap_seconds += dt;
    }

    pub fn record_rank(&mut self, agent: AgentID, rank: Rank) -> Option<Rank> {
        self.entry(agent).last_rank.replace(rank)
    }

    pub fn flag_respawn(&mut self, agent: AgentID) {
        self.entry(agent).pending_respawn = true;
    }

    pub fn take_respawn(&mut self, agent: AgentID) -> bool {
        std::mem::take(&mut self.entry(agent).pending_respawn)
    }

    // Episode start: fresh record, placed after `start_checkpoint`. Spawn
    // points are checked against the track when a session is built, so an
    // index past the end here is a bug.
    pub fn reset_at(&mut self, agent: AgentID, start_checkpoint: CheckpointIndex) {
        debug_assert!(
            start_checkpoint < self.checkpoint_count,
            "start checkpoint {} out of range for {} checkpoints",
            start_checkpoint,
            self.checkpoint_count
        );
        let state = self.entry(agent);
        state.reset();
        state.current_checkpoint = start_checkpoint;
        state.start_checkpoint = start_checkpoint;
    }

    pub fn reset(&mut self, agent: AgentID) {
        self.reset_at(agent, 0);
    }

    pub fn reset_all(&mut self) {
        self.states.iter_mut().for_each(AgentProgressState::reset);
    }

    // Share of the race distance covered since the agent's spawn, counting
    // whole checkpoints only
    pub fn progress_fraction(&mut self, agent: AgentID, max_laps: LapNumber) -> f64 {
        if max_laps == 0 {
            return 1.0;
        }
        let checkpoint_count = self.checkpoint_count;
        let state = self.entry(agent);
        let covered = (state.lap as usize * checkpoint_count + state.current_checkpoint)
            .saturating_sub(state.start_checkpoint);
        let total = max_laps as usize * checkpoint_count;
        (covered as f64 / total as f64).clamp(0.0, 1.0)
    }
}
