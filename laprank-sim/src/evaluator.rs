use glam::DVec3;
use laprank_core::lap_info::{CheckpointIndex, LapNumber};
use laprank_core::phase::TrainingPhase;
use laprank_core::pose::Pose;
use laprank_core::{
    AgentID, AheadPolicy, DetectionSettings, FacingPolicy, LapRewardPolicy, ProgressSettings,
};
use tracing::debug;

use crate::checkpoints::CheckpointTrack;
use crate::progress::ProgressTracker;
use crate::rewards::RewardSink;

// The checkpoint an agent appears to be heading for this tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub index: CheckpointIndex,
    pub position: DVec3,
    pub distance: f64,
    // forward · direction-to-checkpoint, in [-1, 1]
    pub facing: f64,
    // nothing was inside the forward cone, so this is just the tracked next checkpoint
    pub fallback: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    Crossed {
        checkpoint: CheckpointIndex,
        // only reported while racing
        lap_completed: Option<LapNumber>,
    },
    // looking at a checkpoint past the expected one, i.e. one got skipped
    Ahead,
    // looking back at one we already passed
    Undercut,
    // heading for the expected checkpoint, not there yet
    Holding,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressOutcome {
    pub detection: Detection,
    pub event: ProgressEvent,
    pub reward: f64,
}

pub struct CheckpointEvaluator {
    detection: DetectionSettings,
    progress: ProgressSettings,
}

impl CheckpointEvaluator {
    pub fn new(detection: DetectionSettings, progress: ProgressSettings) -> Self {
        Self {
            detection,
            progress,
        }
    }

    pub fn progress_settings(&self) -> &ProgressSettings {
        &self.progress
    }

    fn lap_reward(&self, lap_seconds: f64) -> f64 {
        let settings = &self.progress;
        match settings.lap_reward_policy {
            LapRewardPolicy::Flat => settings.lap_completed_reward,
            // a zero-length lap divides to infinity and lands on the max
            LapRewardPolicy::LapTimeScaled => (settings.lap_completed_reward / lap_seconds)
                .max(settings.lap_time_reward_min)
                .min(settings.lap_time_reward_max),
        }
    }

    /// Finds the checkpoint the agent is most plausibly driving at.
    ///
    /// Every checkpoint inside the forward cone is scored by
    /// `distance² / facing`, so near checkpoints win but one dead ahead beats
    /// one off to the side at a similar range. If nothing is inside the cone
    /// (facing backwards, or sideways between two checkpoints) we fall back to
    /// the checkpoint after the tracked one, so there is always an answer.
    pub fn detect_next_checkpoint(
        &self,
        track: &CheckpointTrack,
        tracker: &mut ProgressTracker,
        agent: AgentID,
        pose: &Pose,
    ) -> Detection {
        let mut best: Option<(f64, CheckpointIndex)> = None;

        for checkpoint in track.iter() {
            let to_checkpoint = checkpoint.position - pose.position;
            // normalize_or_zero: a checkpoint we're sitting exactly on gets
            // dot 0 and is rejected, instead of poisoning the scores with NaN
            let dot = pose.unit_forward.dot(to_checkpoint.normalize_or_zero());
            if dot < self.detection.forward_cone_dot {
                continue;
            }

            let score = to_checkpoint.length_squared() / dot;
            if best.map_or(true, |(best_score, _)| score < best_score) {
                best = Some((score, checkpoint.id));
            }
        }

        let (index, fallback) = match best {
            Some((_, index)) => (index, false),
            None => (tracker.expected_next(agent), true),
        };

        let position = track.get(index).position;
        Detection {
            index,
            position,
            distance: pose.distance_to(position),
            facing: pose.facing(position),
            fallback,
        }
    }

    /// Runs the per-tick progress rules for one agent and pushes the resulting
    /// rewards into `sink`.
    ///
    /// 1. a facing term, rewarding (or only penalizing) where the agent points
    /// 2. a crossing, if the detected checkpoint is the expected next one and
    ///    the agent is strictly inside the crossing radius; this is the only
    ///    place the tracker advances
    /// 3. otherwise, if the detected checkpoint is not the expected one, an
    ///    ahead bonus or undercut penalty depending on which side of it the
    ///    detected checkpoint sits. Less than half a lap forward counts as
    ///    ahead, anything else (including the one just crossed) as behind, so
    ///    the start line is not a special case.
    pub fn evaluate_progress(
        &self,
        track: &CheckpointTrack,
        tracker: &mut ProgressTracker,
        agent: AgentID,
        pose: &Pose,
        phase: TrainingPhase,
        sink: &mut dyn RewardSink,
    ) -> ProgressOutcome {
        let settings = &self.progress;
        let expected = tracker.expected_next(agent);
        let detection = self.detect_next_checkpoint(track, tracker, agent, pose);
        let mut reward = 0.0;

        match settings.facing_policy {
            FacingPolicy::Symmetric => {
                if detection.facing > settings.facing_threshold {
                    reward += settings.progress_reward;
                } else {
                    reward -= settings.progress_reward;
                }
            }
            FacingPolicy::PenaltyOnly => {
                if detection.facing < settings.facing_threshold {
                    reward -= settings.progress_reward;
                }
            }
        }

        // how many checkpoints past the expected one the detected one is
        let offset = (detection.index + track.count() - expected) % track.count();

        let event = if offset == 0 && detection.distance < settings.crossing_radius {
            reward += settings.checkpoint_reached_reward;
            let lap_seconds = tracker.lap_seconds(agent);
            let checkpoint = tracker.advance(agent);

            let lap_completed = if checkpoint == 0 && phase.is_race() {
                let lap = tracker.lap(agent);
                reward += self.lap_reward(lap_seconds);
                debug!(
                    "agent {} completed lap {} in {:.1}s",
                    agent, lap, lap_seconds
                );
                sink.notify_lap_completed(agent);
                Some(lap)
            } else {
                None
            };

            debug!("agent {} crossed checkpoint {}", agent, checkpoint);
            ProgressEvent::Crossed {
                checkpoint,
                lap_completed,
            }
        } else if offset == 0 {
            ProgressEvent::Holding
        } else if offset * 2 < track.count() {
            if settings.ahead_policy == AheadPolicy::Reward {
                reward += settings.progress_reward;
            }
            ProgressEvent::Ahead
        } else {
            reward += settings.undercut_penalty;
            ProgressEvent::Undercut
        };

        sink.add_reward(agent, reward);

        ProgressOutcome {
            detection,
            event,
            reward,
        }
    }
}
