use std::thread;
use std::time::{Duration, Instant};

use glam::{DQuat, DVec3};
use laprank_core::lap_info::LapNumber;
use laprank_core::pose::Pose;
use laprank_core::{AgentID, HarnessSettings};
use rand::Rng;
use tracing::info;

use crate::game::{AgentInput, RaceSession, SessionError};
use crate::rewards::{EpisodeLedger, RewardSink};

pub const TOP_SPEED: f64 = 12.0;
pub const ACCELERATION: f64 = 5.0;
// radians per second
pub const MAX_TURN_RATE: f64 = 3.0;

// A stand-in for the real simulation: points its nose at a target, turning
// no faster than MAX_TURN_RATE, and speeds up until it hits its top speed
#[derive(Clone, Copy, Debug)]
pub struct ScriptedDriver {
    pose: Pose,
    speed: f64,
    top_speed: f64,
}

impl ScriptedDriver {
    pub fn new(pose: Pose, top_speed: f64) -> Self {
        Self {
            pose,
            speed: 0.0,
            top_speed,
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    // teleport to a spawn point and come to a stop
    pub fn place(&mut self, pose: Pose) {
        self.pose = pose;
        self.speed = 0.0;
    }

    pub fn input(&self) -> AgentInput {
        AgentInput {
            pose: self.pose,
            speed: self.speed,
        }
    }

    pub fn step(&mut self, target: DVec3, dt: f64) {
        let forward = self.pose.unit_forward;
        let mut to_target = target - self.pose.position;
        to_target.y = 0.0;
        let to_target = to_target.normalize_or_zero();

        let mut new_forward = forward;
        if to_target != DVec3::ZERO {
            // signed angle about +y from where we point to where we want to go
            let angle = forward.cross(to_target).y.atan2(forward.dot(to_target));
            let max_turn = MAX_TURN_RATE * dt;
            let turn = angle.clamp(-max_turn, max_turn);
            new_forward = DQuat::from_axis_angle(DVec3::Y, turn) * forward;
        }

        self.speed = f64::min(self.top_speed, self.speed + ACCELERATION * dt);
        let position = self.pose.position + new_forward * self.speed * dt;
        self.pose = Pose::new(position, new_forward);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeSummary {
    pub episode: u32,
    pub ticks: usize,
    pub winner: Option<AgentID>,
    pub rewards: Vec<f64>,
    pub laps: Vec<LapNumber>,
    pub timeouts: usize,
}

// Drives a session headless: one scripted driver per agent, an EpisodeLedger
// standing in for the trainer
pub struct Harness<R: Rng> {
    session: RaceSession,
    drivers: Vec<ScriptedDriver>,
    ledger: EpisodeLedger,
    settings: HarnessSettings,
    rng: R,
}

impl<R: Rng> Harness<R> {
    pub fn new(session: RaceSession, settings: HarnessSettings, mut rng: R) -> Self {
        let agent_count = session.agent_count();
        // slightly different cars so races actually have an order
        let drivers = (0..agent_count)
            .map(|_| {
                let top_speed = TOP_SPEED * rng.gen_range(0.9..=1.1);
                ScriptedDriver::new(Pose::new(DVec3::ZERO, DVec3::X), top_speed)
            })
            .collect();

        Self {
            session,
            drivers,
            ledger: EpisodeLedger::new(agent_count),
            settings,
            rng,
        }
    }

    pub fn session(&mut self) -> &mut RaceSession {
        &mut self.session
    }

    pub fn ledger(&self) -> &EpisodeLedger {
        &self.ledger
    }

    fn targets(&mut self) -> Vec<DVec3> {
        (0..self.drivers.len())
            .map(|agent| {
                let next = self.session.tracker().expected_next(agent);
                self.session.track().get(next).position
            })
            .collect()
    }

    pub fn run_episode(&mut self, episode: u32) -> Result<EpisodeSummary, SessionError> {
        let poses = self.session.begin_episode(&mut self.rng)?;
        self.ledger.restart_all();
        for (driver, pose) in self.drivers.iter_mut().zip(poses) {
            driver.place(pose);
        }

        let dt = self.settings.tick_ms as f64 / 1000.0;
        let max_tick_duration = Duration::from_millis(self.settings.tick_ms);
        let mut summary = EpisodeSummary {
            episode,
            ticks: 0,
            winner: None,
            rewards: Vec::new(),
            laps: Vec::new(),
            timeouts: 0,
        };

        while summary.ticks < self.settings.max_ticks_per_episode as usize {
            let start_time = Instant::now();
            summary.ticks += 1;

            let targets = self.targets();
            for (driver, target) in self.drivers.iter_mut().zip(targets) {
                driver.step(target, dt);
            }

            let inputs: Vec<AgentInput> =
                self.drivers.iter().map(ScriptedDriver::input).collect();
            let report = self.session.tick(&inputs, dt, &mut self.ledger)?;

            if let Some(result) = report.race_result {
                summary.winner = Some(result.winner);
                break;
            }

            for agent in report.timed_out {
                let positions: Vec<DVec3> =
                    self.drivers.iter().map(|driver| driver.pose().position).collect();
                let pose = self.session.reset_agent(agent, &positions, &mut self.rng)?;
                self.drivers[agent].place(pose);
                self.ledger.restart(agent);
                summary.timeouts += 1;
            }

            if self.settings.realtime {
                // a slow tick just runs late, there's nothing to catch up on
                if let Some(remaining) = max_tick_duration.checked_sub(start_time.elapsed()) {
                    thread::sleep(remaining);
                }
            }
        }

        if summary.winner.is_none() {
            info!("episode {} ran out of ticks after {}", episode, summary.ticks);
            for agent in 0..self.drivers.len() {
                self.ledger.end_episode(agent);
            }
        }

        summary.rewards = self.ledger.rewards.clone();
        summary.laps = (0..self.drivers.len())
            .map(|agent| self.session.tracker().lap(agent))
            .collect();

        info!(
            "episode {} done in {} ticks: winner {:?}, rewards {:?}",
            episode, summary.ticks, summary.winner, summary.rewards
        );
        Ok(summary)
    }
}
