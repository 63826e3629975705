use laprank_core::lap_info::Rank;
use laprank_core::{AgentID, RankingSettings};

use crate::evaluator::Detection;
use crate::progress::ProgressTracker;
use crate::rewards::RewardSink;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaceStanding {
    pub agent: AgentID,
    pub rank: Rank,
    pub score: f64,
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

pub struct RaceRanker {
    settings: RankingSettings,
}

impl RaceRanker {
    pub fn new(settings: RankingSettings) -> Self {
        Self { settings }
    }

    // whichever checkpoint an agent is heading for dominates; the remaining
    // distance to it only breaks ties within the same leg
    pub fn score(&self, detection: &Detection) -> f64 {
        detection.index as f64 * self.settings.score_scale - detection.distance
    }

    /// Orders every entry by score (best first), pays out the position
    /// rewards for this tick and records each agent's new rank.
    ///
    /// Equal scores keep agent-id order so the ranking is deterministic.
    /// With a single agent there is nobody to be ahead of: it gets rank 0 and
    /// no reward at all.
    pub fn rank(
        &self,
        entries: &[(AgentID, Detection)],
        tracker: &mut ProgressTracker,
        dt: f64,
        sink: &mut dyn RewardSink,
    ) -> Vec<RaceStanding> {
        let mut standings: Vec<RaceStanding> = entries
            .iter()
            .map(|(agent, detection)| RaceStanding {
                agent: *agent,
                rank: 0,
                score: self.score(detection),
            })
            .collect();

        standings.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.agent.cmp(&b.agent)));

        let agent_count = standings.len();
        for (rank, standing) in standings.iter_mut().enumerate() {
            standing.rank = rank;
            let previous = tracker.record_rank(standing.agent, rank);

            if agent_count < 2 {
                continue;
            }

            if matches!(previous, Some(previous) if rank < previous) {
                sink.add_reward(standing.agent, self.settings.better_rank_reward);
            }

            let t = rank as f64 / (agent_count - 1) as f64;
            let reward = lerp(
                self.settings.position_reward,
                self.settings.position_penalty,
                t,
            );
            sink.add_reward(standing.agent, reward * dt);
        }

        standings
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;
    use crate::rewards::EpisodeLedger;

    fn detection(index: usize, distance: f64) -> Detection {
        Detection {
            index,
            position: DVec3::ZERO,
            distance,
            facing: 1.0,
            fallback: false,
        }
    }

    fn ranker() -> RaceRanker {
        RaceRanker::new(RankingSettings::default())
    }

    #[test]
    fn checkpoint_count_dominates_distance() {
        let ranker = ranker();
        let mut tracker = ProgressTracker::new(4);
        let mut ledger = EpisodeLedger::new(3);

        let standings = ranker.rank(
            &[
                (0, detection(2, 1.0)),
                (1, detection(2, 3.0)),
                (2, detection(1, 0.5)),
            ],
            &mut tracker,
            1.0,
            &mut ledger,
        );

        let order: Vec<AgentID> = standings.iter().map(|s| s.agent).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(standings[0].score, 1999.0);
        assert_eq!(standings[1].score, 1997.0);
        assert_eq!(standings[2].score, 999.5);
        assert_eq!(tracker.last_rank(2), Some(2));
    }

    #[test]
    fn ranks_cover_the_field_without_gaps() {
        let ranker = ranker();
        for agent_count in 1..7 {
            let mut tracker = ProgressTracker::new(4);
            let mut ledger = EpisodeLedger::new(agent_count);
            // plenty of exact ties in here
            let entries: Vec<(AgentID, Detection)> = (0..agent_count)
                .map(|agent| (agent, detection(agent % 2, (agent % 3) as f64)))
                .collect();

            let standings = ranker.rank(&entries, &mut tracker, 0.02, &mut ledger);

            let mut ranks: Vec<Rank> = standings.iter().map(|s| s.rank).collect();
            ranks.sort_unstable();
            assert_eq!(ranks, (0..agent_count).collect::<Vec<_>>());

            let mut agents: Vec<AgentID> = standings.iter().map(|s| s.agent).collect();
            agents.sort_unstable();
            assert_eq!(agents, (0..agent_count).collect::<Vec<_>>());
        }
    }

    #[test]
    fn single_agent_gets_nothing() {
        let ranker = ranker();
        let mut tracker = ProgressTracker::new(4);
        let mut ledger = EpisodeLedger::new(1);
        tracker.record_rank(0, 3);

        let standings = ranker.rank(&[(0, detection(1, 2.0))], &mut tracker, 1.0, &mut ledger);

        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0].rank, 0);
        // improved from 3 to 0, but there's nobody to have overtaken
        assert_eq!(ledger.reward(0), 0.0);
    }

    #[test]
    fn empty_field_is_fine() {
        let mut tracker = ProgressTracker::new(4);
        let mut ledger = EpisodeLedger::new(0);
        assert!(ranker()
            .rank(&[], &mut tracker, 1.0, &mut ledger)
            .is_empty());
    }

    #[test]
    fn position_reward_is_interpolated_and_scaled() {
        let ranker = ranker();
        let mut tracker = ProgressTracker::new(4);
        let mut ledger = EpisodeLedger::new(3);

        ranker.rank(
            &[
                (0, detection(3, 0.0)),
                (1, detection(2, 0.0)),
                (2, detection(1, 0.0)),
            ],
            &mut tracker,
            0.5,
            &mut ledger,
        );

        assert!((ledger.reward(0) - 0.025).abs() < 1e-12);
        assert!((ledger.reward(1) - 0.01).abs() < 1e-12);
        assert!((ledger.reward(2) + 0.005).abs() < 1e-12);
    }

    #[test]
    fn overtaking_pays_once() {
        let ranker = ranker();
        let mut tracker = ProgressTracker::new(4);
        let mut ledger = EpisodeLedger::new(2);

        // first tick: nobody had a rank yet, so no bonus
        ranker.rank(
            &[(0, detection(2, 0.0)), (1, detection(1, 0.0))],
            &mut tracker,
            1.0,
            &mut ledger,
        );
        assert!((ledger.reward(1) + 0.01).abs() < 1e-12);

        // agent 1 gets past
        ranker.rank(
            &[(0, detection(2, 5.0)), (1, detection(2, 1.0))],
            &mut tracker,
            1.0,
            &mut ledger,
        );
        assert!((ledger.reward(1) - (-0.01 + 0.2 + 0.05)).abs() < 1e-12);
        assert!((ledger.reward(0) - (0.05 - 0.01)).abs() < 1e-12);

        // holding the lead isn't another overtake
        ranker.rank(
            &[(0, detection(2, 5.0)), (1, detection(2, 1.0))],
            &mut tracker,
            1.0,
            &mut ledger,
        );
        assert!((ledger.reward(1) - (-0.01 + 0.2 + 0.05 + 0.05)).abs() < 1e-12);
    }
}
