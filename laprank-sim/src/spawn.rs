use glam::DVec3;
use laprank_core::{lap_info::CheckpointIndex, phase::TrainingPhase, pose::Pose, AgentID};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::checkpoints::{CheckpointTrack, TrackError};

// an agent closer than this to a slot is considered to be standing on it
pub const SPAWN_CLEARANCE: f64 = 1.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    #[error("need {needed} spawn points but the track only has {available}")]
    NotEnoughSpawnPoints { needed: usize, available: usize },
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct SpawnPoint {
    pub position: DVec3,
    pub forward: DVec3,
    // the checkpoint an agent placed here counts as having crossed last
    #[serde(default)]
    pub after_checkpoint: CheckpointIndex,
}

impl SpawnPoint {
    pub fn new(position: DVec3, forward: DVec3, after_checkpoint: CheckpointIndex) -> Self {
        Self {
            position,
            forward,
            after_checkpoint,
        }
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.forward)
    }
}

// Identifies a slot so a set of "taken" slots can be threaded through a batch
// of respawn requests
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotID {
    Grid(usize),
    Random(usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Respawn {
    // a free slot was found; it has already been marked as taken
    Slot(SlotID, SpawnPoint),
    // every candidate slot was taken, so the agent goes back where it started the episode
    Origin(SpawnPoint),
}

impl Respawn {
    pub fn spawn_point(&self) -> SpawnPoint {
        match self {
            Respawn::Slot(_, point) | Respawn::Origin(point) => *point,
        }
    }
}

pub struct SpawnManager {
    grid: Vec<SpawnPoint>,
    random: Vec<SpawnPoint>,
}

impl SpawnManager {
    pub fn new(grid: Vec<SpawnPoint>, random: Vec<SpawnPoint>) -> Self {
        Self { grid, random }
    }

    pub fn grid(&self) -> &[SpawnPoint] {
        &self.grid
    }

    pub fn random(&self) -> &[SpawnPoint] {
        &self.random
    }

    pub fn point(&self, slot: SlotID) -> Option<SpawnPoint> {
        match slot {
            SlotID::Grid(i) => self.grid.get(i).copied(),
            SlotID::Random(i) => self.random.get(i).copied(),
        }
    }

    // Every slot has to name a checkpoint that exists on `track`
    pub fn validate(&self, track: &CheckpointTrack) -> Result<(), TrackError> {
        for point in self.grid.iter().chain(&self.random) {
            track.checkpoint_at(point.after_checkpoint)?;
        }
        Ok(())
    }

    fn pool(&self, phase: TrainingPhase) -> &[SpawnPoint] {
        match phase {
            TrainingPhase::Race => &self.grid,
            TrainingPhase::Exploration => &self.random,
        }
    }

    // First `agent_count` slots of the phase's pool, in order. Checks up front
    // that the track can hold that many agents at all.
    pub fn default_slots(
        &self,
        phase: TrainingPhase,
        agent_count: usize,
    ) -> Result<Vec<SpawnPoint>, SpawnError> {
        let pool = self.pool(phase);
        if pool.len() < agent_count {
            return Err(SpawnError::NotEnoughSpawnPoints {
                needed: agent_count,
                available: pool.len(),
            });
        }
        Ok(pool[..agent_count].to_vec())
    }

    // Slots somebody is currently parked on
    pub fn occupied_by(&self, positions: &[DVec3]) -> Vec<SlotID> {
        let grid = (0..self.grid.len()).map(SlotID::Grid);
        let random = (0..self.random.len()).map(SlotID::Random);
        grid.chain(random)
            .filter(|slot| match self.point(*slot) {
                Some(point) => positions
                    .iter()
                    .any(|position| position.distance(point.position) < SPAWN_CLEARANCE),
                None => false,
            })
            .collect()
    }

    // Starting slots for a fresh episode: the front of the grid when racing,
    // a random draw from the scattered pool when exploring
    pub fn initial_spawns<R: Rng + ?Sized>(
        &self,
        phase: TrainingPhase,
        agent_count: usize,
        rng: &mut R,
    ) -> Result<Vec<(SlotID, SpawnPoint)>, SpawnError> {
        self.default_slots(phase, agent_count)?;

        let spawns = match phase {
            TrainingPhase::Race => (0..agent_count)
                .map(|i| (SlotID::Grid(i), self.grid[i]))
                .collect(),
            TrainingPhase::Exploration => {
                let mut order: Vec<usize> = (0..self.random.len()).collect();
                order.shuffle(rng);
                order
                    .into_iter()
                    .take(agent_count)
                    .map(|i| (SlotID::Random(i), self.random[i]))
                    .collect()
            }
        };

        Ok(spawns)
    }

    fn candidates(&self, phase: TrainingPhase, agent_count: usize) -> Vec<SlotID> {
        match phase {
            // a head-to-head race only ever uses the front row
            TrainingPhase::Race if agent_count == 2 => {
                (0..self.grid.len().min(2)).map(SlotID::Grid).collect()
            }
            TrainingPhase::Race => (0..self.grid.len()).map(SlotID::Grid).collect(),
            TrainingPhase::Exploration => (0..self.random.len()).map(SlotID::Random).collect(),
        }
    }

    // Pick a recovery slot for one agent. `occupied` is shared by every
    // request in the same tick and gets the chosen slot pushed onto it, so
    // requests have to be made one after another.
    pub fn respawn<R: Rng + ?Sized>(
        &self,
        agent: AgentID,
        phase: TrainingPhase,
        agent_count: usize,
        occupied: &mut Vec<SlotID>,
        origin: SpawnPoint,
        rng: &mut R,
    ) -> Respawn {
        let available: Vec<SlotID> = self
            .candidates(phase, agent_count)
            .into_iter()
            .filter(|slot| !occupied.contains(slot))
            .collect();

        match available.choose(rng).and_then(|slot| Some((*slot, self.point(*slot)?))) {
            Some((slot, point)) => {
                occupied.push(slot);
                Respawn::Slot(slot, point)
            }
            None => {
                warn!(
                    "no free spawn point for agent {}, sending it back to its episode origin",
                    agent
                );
                Respawn::Origin(origin)
            }
        }
    }
}
