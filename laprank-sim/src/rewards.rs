use laprank_core::AgentID;

// The hooks the training harness exposes to us. Everything the pipeline
// decides comes out through here.
pub trait RewardSink {
    fn add_reward(&mut self, agent: AgentID, delta: f64);
    fn end_episode(&mut self, agent: AgentID);
    fn notify_lap_completed(&mut self, agent: AgentID);
}

// A sink that just writes everything down; the harness binary uses it as its
// "trainer", and it is handy for checking what a tick emitted
#[derive(Default, Debug, Clone)]
pub struct EpisodeLedger {
    pub rewards: Vec<f64>,
    pub ended: Vec<bool>,
    pub laps_completed: Vec<u32>,
}

impl EpisodeLedger {
    pub fn new(agent_count: usize) -> Self {
        let mut ledger = EpisodeLedger::default();
        if agent_count > 0 {
            ledger.grow(agent_count - 1);
        }
        ledger
    }

    fn grow(&mut self, agent: AgentID) {
        if agent >= self.rewards.len() {
            self.rewards.resize(agent + 1, 0.0);
            self.ended.resize(agent + 1, false);
            self.laps_completed.resize(agent + 1, 0);
        }
    }

    pub fn reward(&self, agent: AgentID) -> f64 {
        self.rewards.get(agent).copied().unwrap_or(0.0)
    }

    pub fn has_ended(&self, agent: AgentID) -> bool {
        self.ended.get(agent).copied().unwrap_or(false)
    }

    pub fn laps(&self, agent: AgentID) -> u32 {
        self.laps_completed.get(agent).copied().unwrap_or(0)
    }

    // start a new episode for one agent; its running reward starts over
    pub fn restart(&mut self, agent: AgentID) {
        self.grow(agent);
        self.rewards[agent] = 0.0;
        self.ended[agent] = false;
        self.laps_completed[agent] = 0;
    }

    pub fn restart_all(&mut self) {
        for agent in 0..self.rewards.len() {
            self.restart(agent);
        }
    }
}

impl RewardSink for EpisodeLedger {
    fn add_reward(&mut self, agent: AgentID, delta: f64) {
        self.grow(agent);
        self.rewards[agent] += delta;
    }

    fn end_episode(&mut self, agent: AgentID) {
        self.grow(agent);
        self.ended[agent] = true;
    }

    fn notify_lap_completed(&mut self, agent: AgentID) {
        self.grow(agent);
        self.laps_completed[agent] += 1;
    }
}
