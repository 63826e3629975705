use glam::DVec3;
use laprank_core::lap_info::LapNumber;
use laprank_core::phase::TrainingPhase;
use laprank_core::pose::Pose;
use laprank_core::{AgentID, Settings};
use rand::Rng;
use thiserror::Error;
use tracing::info;

use crate::checkpoints::{CheckpointTrack, TrackError};
use crate::evaluator::{CheckpointEvaluator, ProgressEvent, ProgressOutcome};
use crate::progress::ProgressTracker;
use crate::ranking::{RaceRanker, RaceStanding};
use crate::rewards::RewardSink;
use crate::spawn::{SpawnError, SpawnManager, SpawnPoint};

use self::phase::{RaceCoordinator, RacePhase, RaceResult};
use self::shaping::EpisodeShaping;

pub mod phase;
pub mod shaping;

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("got input for {got} agents but the session runs {expected}")]
    AgentCountMismatch { expected: usize, got: usize },

    #[error("agent {0} is not part of this session")]
    UnknownAgent(AgentID),

    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error(transparent)]
    Track(#[from] TrackError),
}

// What the simulation tells us about one agent each tick
#[derive(Clone, Copy, Debug)]
pub struct AgentInput {
    pub pose: Pose,
    pub speed: f64,
}

#[derive(Debug, Default)]
pub struct TickReport {
    // one per agent, in agent order
    pub outcomes: Vec<ProgressOutcome>,
    // empty outside of races
    pub standings: Vec<RaceStanding>,
    pub laps_completed: Vec<(AgentID, LapNumber)>,
    pub race_result: Option<RaceResult>,
    // agents whose own episode ended this tick; they need a `reset_agent`
    pub timed_out: Vec<AgentID>,
}

impl TickReport {
    // every agent's episode ended, call `begin_episode` next
    pub fn race_over(&self) -> bool {
        self.race_result.is_some()
    }
}

/// One arena: a track, a fixed set of agents, and everything that turns
/// their poses into rewards each tick.
///
/// All collaborators are built here from the settings and owned for the
/// lifetime of the session; nothing is looked up globally.
pub struct RaceSession {
    track: CheckpointTrack,
    spawns: SpawnManager,
    tracker: ProgressTracker,
    evaluator: CheckpointEvaluator,
    ranker: RaceRanker,
    coordinator: RaceCoordinator,
    shaping: EpisodeShaping,
    phase: TrainingPhase,
    agent_count: usize,
    // where each agent started its current episode
    origins: Vec<SpawnPoint>,
}

impl RaceSession {
    pub fn new(
        track: CheckpointTrack,
        spawns: SpawnManager,
        settings: &Settings,
        phase: TrainingPhase,
        agent_count: usize,
    ) -> Result<Self, SessionError> {
        spawns.validate(&track)?;
        let origins = spawns.default_slots(phase, agent_count)?;

        Ok(Self {
            tracker: ProgressTracker::new(track.count()),
            evaluator: CheckpointEvaluator::new(settings.detection, settings.progress),
            ranker: RaceRanker::new(settings.ranking),
            coordinator: RaceCoordinator::new(settings.race),
            shaping: EpisodeShaping::new(settings.episode),
            track,
            spawns,
            phase,
            agent_count,
            origins,
        })
    }

    pub fn track(&self) -> &CheckpointTrack {
        &self.track
    }

    pub fn tracker(&mut self) -> &mut ProgressTracker {
        &mut self.tracker
    }

    pub fn phase(&self) -> TrainingPhase {
        self.phase
    }

    pub fn race_phase(&self) -> RacePhase {
        self.coordinator.phase()
    }

    pub fn agent_count(&self) -> usize {
        self.agent_count
    }

    // Switch between exploration and racing; takes effect from the next episode's spawns
    pub fn set_phase(&mut self, phase: TrainingPhase) -> Result<(), SessionError> {
        self.origins = self.spawns.default_slots(phase, self.agent_count)?;
        self.phase = phase;
        Ok(())
    }

    fn place(&mut self, agent: AgentID, point: SpawnPoint) -> Pose {
        self.origins[agent] = point;
        self.tracker.reset_at(agent, point.after_checkpoint);
        self.shaping.reset(agent);
        point.pose()
    }

    /// Starts a new episode for every agent and returns where each one starts.
    ///
    /// Agents flagged for a recovery spawn (race end, idle timeout) get a
    /// randomly chosen free slot; the others take their normal slot, which is
    /// claimed first so a recovering agent can never land on top of them.
    /// Requests are resolved one agent at a time against a shared occupied set.
    pub fn begin_episode<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Vec<Pose>, SessionError> {
        self.coordinator.begin_episode();

        let defaults = self
            .spawns
            .initial_spawns(self.phase, self.agent_count, rng)?;
        let respawning: Vec<bool> = (0..self.agent_count)
            .map(|agent| self.tracker.take_respawn(agent))
            .collect();

        let mut occupied: Vec<_> = defaults
            .iter()
            .zip(&respawning)
            .filter(|(_, respawning)| !**respawning)
            .map(|((slot, _), _)| *slot)
            .collect();

        let mut poses = Vec::with_capacity(self.agent_count);
        for (agent, (_, default)) in defaults.into_iter().enumerate() {
            let point = if respawning[agent] {
                self.spawns
                    .respawn(
                        agent,
                        self.phase,
                        self.agent_count,
                        &mut occupied,
                        self.origins[agent],
                        rng,
                    )
                    .spawn_point()
            } else {
                default
            };
            poses.push(self.place(agent, point));
        }

        info!(
            "starting {:?} episode with {} agents",
            self.phase, self.agent_count
        );
        Ok(poses)
    }

    // Restart a single agent whose own episode ended, keeping clear of the
    // slots other agents are parked on
    pub fn reset_agent<R: Rng + ?Sized>(
        &mut self,
        agent: AgentID,
        positions: &[DVec3],
        rng: &mut R,
    ) -> Result<Pose, SessionError> {
        if agent >= self.agent_count {
            return Err(SessionError::UnknownAgent(agent));
        }

        let others: Vec<DVec3> = positions
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != agent)
            .map(|(_, position)| *position)
            .collect();
        let mut occupied = self.spawns.occupied_by(&others);

        self.tracker.take_respawn(agent);
        let point = self
            .spawns
            .respawn(
                agent,
                self.phase,
                self.agent_count,
                &mut occupied,
                self.origins[agent],
                rng,
            )
            .spawn_point();

        Ok(self.place(agent, point))
    }

    /// Advances the pipeline by one tick: checkpoint progress for every
    /// agent, then (racing only) the ranking, then any race finish, then the
    /// per-agent shaping terms. Once the race is decided in a tick, shaping is
    /// skipped since every episode has already ended.
    pub fn tick(
        &mut self,
        inputs: &[AgentInput],
        dt: f64,
        sink: &mut dyn RewardSink,
    ) -> Result<TickReport, SessionError> {
        if inputs.len() != self.agent_count {
            return Err(SessionError::AgentCountMismatch {
                expected: self.agent_count,
                got: inputs.len(),
            });
        }

        let mut report = TickReport::default();

        for (agent, input) in inputs.iter().enumerate() {
            self.tracker.tick_clock(agent, dt);
            let outcome = self.evaluator.evaluate_progress(
                &self.track,
                &mut self.tracker,
                agent,
                &input.pose,
                self.phase,
                sink,
            );
            if let ProgressEvent::Crossed {
                lap_completed: Some(lap),
                ..
            } = outcome.event
            {
                report.laps_completed.push((agent, lap));
            }
            report.outcomes.push(outcome);
        }

        if self.phase.is_race() {
            let entries: Vec<_> = report
                .outcomes
                .iter()
                .enumerate()
                .map(|(agent, outcome)| (agent, outcome.detection))
                .collect();
            report.standings = self.ranker.rank(&entries, &mut self.tracker, dt, sink);
        }

        for (agent, lap) in report.laps_completed.clone() {
            if let Some(result) = self.coordinator.on_lap_completed(
                agent,
                lap,
                self.agent_count,
                &mut self.tracker,
                sink,
            ) {
                report.race_result = Some(result);
            }
        }

        if report.race_over() {
            return Ok(report);
        }

        for (agent, input) in inputs.iter().enumerate() {
            let target = self.track.get(self.tracker.expected_next(agent)).position;
            let distance = input.pose.distance_to(target);
            if self
                .shaping
                .apply(agent, distance, input.speed, dt, &mut self.tracker, sink)
            {
                report.timed_out.push(agent);
            }
        }

        Ok(report)
    }
}
