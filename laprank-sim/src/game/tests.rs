use glam::DVec3;
use laprank_core::phase::TrainingPhase;
use laprank_core::pose::Pose;
use laprank_core::{EpisodeSettings, Settings};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::*;
use crate::map::Map;
use crate::rewards::EpisodeLedger;
use crate::spawn::SpawnPoint;

// The square from (0,0) to (10,10), grid lined up behind the start line
fn square_map() -> Map {
    Map {
        checkpoints: vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(10.0, 0.0, 0.0),
            DVec3::new(10.0, 0.0, 10.0),
            DVec3::new(0.0, 0.0, 10.0),
        ],
        grid: vec![
            SpawnPoint::new(DVec3::new(-2.0, 0.0, 1.0), DVec3::X, 0),
            SpawnPoint::new(DVec3::new(-2.0, 0.0, -1.0), DVec3::X, 0),
            SpawnPoint::new(DVec3::new(-4.0, 0.0, 1.0), DVec3::X, 0),
            SpawnPoint::new(DVec3::new(-4.0, 0.0, -1.0), DVec3::X, 0),
        ],
        random_spawns: vec![
            SpawnPoint::new(DVec3::new(5.0, 0.0, 0.0), DVec3::X, 0),
            SpawnPoint::new(DVec3::new(10.0, 0.0, 5.0), DVec3::Z, 1),
            SpawnPoint::new(DVec3::new(5.0, 0.0, 10.0), -DVec3::X, 2),
        ],
    }
}

fn session(settings: &Settings, phase: TrainingPhase, agent_count: usize) -> RaceSession {
    let map = square_map();
    RaceSession::new(
        map.track().unwrap(),
        map.spawn_manager(),
        settings,
        phase,
        agent_count,
    )
    .unwrap()
}

fn input(x: f64, z: f64, forward: DVec3, speed: f64) -> AgentInput {
    AgentInput {
        pose: Pose::new(DVec3::new(x, 0.0, z), forward),
        speed,
    }
}

// three units short of each checkpoint in turn, ending on the start line
fn lap_poses() -> Vec<AgentInput> {
    vec![
        input(7.0, 0.0, DVec3::X, 10.0),
        input(10.0, 7.0, DVec3::Z, 10.0),
        input(3.0, 10.0, -DVec3::X, 10.0),
        input(0.0, 3.0, -DVec3::Z, 10.0),
    ]
}

fn parked() -> AgentInput {
    input(-2.0, 1.0, DVec3::X, 0.0)
}

#[test]
fn winning_a_one_lap_race() {
    let settings = Settings::default();
    let mut session = session(&settings, TrainingPhase::Race, 2);
    let mut ledger = EpisodeLedger::new(2);
    let mut rng = StdRng::seed_from_u64(11);
    session.begin_episode(&mut rng).unwrap();

    let mut last = None;
    for (tick, lap_pose) in lap_poses().into_iter().enumerate() {
        let report = session
            .tick(&[lap_pose, parked()], 0.1, &mut ledger)
            .unwrap();

        if tick == 0 {
            assert_eq!(report.standings[0].agent, 0);
            assert_eq!(report.standings[1].agent, 1);
        }
        if tick < 3 {
            assert!(!report.race_over());
            assert!(report.laps_completed.is_empty());
        }
        last = Some(report);
    }

    let report = last.unwrap();
    assert_eq!(report.laps_completed, vec![(0, 1)]);
    let result = report.race_result.unwrap();
    assert_eq!(result.winner, 0);
    assert_eq!(result.terminal_rewards, vec![2.0, -1.0]);
    assert!(ledger.has_ended(0));
    assert!(ledger.has_ended(1));
    assert_eq!(ledger.laps(0), 1);
    assert_eq!(session.race_phase(), RacePhase::Finished { winner: 0 });

    // next race: both were flagged, both land on the front row, on different slots
    let poses = session.begin_episode(&mut rng).unwrap();
    assert_eq!(session.race_phase(), RacePhase::Racing);
    let front_row: Vec<DVec3> = square_map().grid[..2].iter().map(|p| p.position).collect();
    assert!(front_row.contains(&poses[0].position));
    assert!(front_row.contains(&poses[1].position));
    assert_ne!(poses[0].position, poses[1].position);
    for agent in 0..2 {
        assert_eq!(session.tracker().current_index(agent), 0);
        assert_eq!(session.tracker().lap(agent), 0);
        assert!(!session.tracker().state(agent).pending_respawn);
    }
}

#[test]
fn exploration_laps_do_not_finish_anything() {
    let settings = Settings::default();
    let mut session = session(&settings, TrainingPhase::Exploration, 1);
    let mut ledger = EpisodeLedger::new(1);

    for lap_pose in lap_poses() {
        let report = session.tick(&[lap_pose], 0.1, &mut ledger).unwrap();
        assert!(report.standings.is_empty());
        assert!(report.laps_completed.is_empty());
        assert!(!report.race_over());
    }

    assert_eq!(session.tracker().lap(0), 1);
    assert_eq!(ledger.laps(0), 0);
    assert!(!ledger.has_ended(0));
}

#[test]
fn single_agent_race_has_no_position_rewards() {
    let settings = Settings {
        episode: EpisodeSettings {
            time_penalty: 0.0,
            approach_multiplier: 0.0,
            ..EpisodeSettings::default()
        },
        ..Settings::default()
    };
    let mut session = session(&settings, TrainingPhase::Race, 1);
    let mut ledger = EpisodeLedger::new(1);

    let report = session
        .tick(&[input(0.0, 0.0, DVec3::X, 10.0)], 0.1, &mut ledger)
        .unwrap();

    assert_eq!(report.standings.len(), 1);
    assert_eq!(report.standings[0].rank, 0);
    // heading for checkpoint 1 and out of range: the facing term is all there is
    assert_eq!(report.outcomes[0].reward, 2.0);
    assert_eq!(ledger.reward(0), report.outcomes[0].reward);
}

#[test]
fn wrong_number_of_inputs_is_rejected() {
    let settings = Settings::default();
    let mut session = session(&settings, TrainingPhase::Race, 2);
    let mut ledger = EpisodeLedger::new(2);

    match session.tick(&[parked()], 0.1, &mut ledger) {
        Err(SessionError::AgentCountMismatch { expected, got }) => {
            assert_eq!(expected, 2);
            assert_eq!(got, 1);
        }
        other => panic!("expected a count mismatch, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn too_many_agents_for_the_grid() {
    let map = square_map();
    let result = RaceSession::new(
        map.track().unwrap(),
        map.spawn_manager(),
        &Settings::default(),
        TrainingPhase::Exploration,
        4,
    );
    assert!(matches!(
        result,
        Err(SessionError::Spawn(SpawnError::NotEnoughSpawnPoints {
            needed: 4,
            available: 3
        }))
    ));
}

#[test]
fn spawn_after_a_missing_checkpoint_is_rejected() {
    let mut map = square_map();
    map.grid[0].after_checkpoint = 7;

    let result = RaceSession::new(
        map.track().unwrap(),
        map.spawn_manager(),
        &Settings::default(),
        TrainingPhase::Race,
        2,
    );
    assert!(matches!(
        result,
        Err(SessionError::Track(TrackError::CheckpointOutOfRange {
            index: 7,
            count: 4
        }))
    ));
}

#[test]
fn idle_agent_is_restarted_away_from_the_others() {
    let settings = Settings {
        episode: EpisodeSettings {
            max_idle_seconds: 0.25,
            ..EpisodeSettings::default()
        },
        ..Settings::default()
    };
    let mut session = session(&settings, TrainingPhase::Race, 2);
    let mut ledger = EpisodeLedger::new(2);
    let mut rng = StdRng::seed_from_u64(5);
    session.begin_episode(&mut rng).unwrap();

    let grid = square_map().grid;
    // agent 0 keeps creeping forward on grid slot 0, agent 1 sits still on slot 1
    let moving = input(grid[0].position.x, grid[0].position.z, DVec3::X, 5.0);
    let stuck = input(grid[1].position.x, grid[1].position.z, DVec3::X, 0.0);

    let mut timed_out = Vec::new();
    for _ in 0..3 {
        let report = session.tick(&[moving, stuck], 0.1, &mut ledger).unwrap();
        timed_out = report.timed_out;
    }
    assert_eq!(timed_out, vec![1]);
    assert!(ledger.has_ended(1));
    assert!(!ledger.has_ended(0));

    // slot 0 is taken by agent 0, so in a two car race slot 1 is all that's left
    let pose = session
        .reset_agent(1, &[moving.pose.position, stuck.pose.position], &mut rng)
        .unwrap();
    assert_eq!(pose.position, grid[1].position);
    assert!(!session.tracker().state(1).pending_respawn);
}

#[test]
fn reset_agent_rejects_strangers() {
    let settings = Settings::default();
    let mut session = session(&settings, TrainingPhase::Race, 2);
    let mut rng = StdRng::seed_from_u64(5);
    assert!(matches!(
        session.reset_agent(7, &[], &mut rng),
        Err(SessionError::UnknownAgent(7))
    ));
}

#[test]
fn exploration_spawns_place_the_tracker() {
    let settings = Settings::default();
    let mut session = session(&settings, TrainingPhase::Exploration, 3);
    let mut rng = StdRng::seed_from_u64(2);
    let poses = session.begin_episode(&mut rng).unwrap();

    let map = square_map();
    for (agent, pose) in poses.iter().enumerate() {
        let spawn = map
            .random_spawns
            .iter()
            .find(|spawn| spawn.position == pose.position)
            .unwrap();
        assert_eq!(session.tracker().current_index(agent), spawn.after_checkpoint);
    }
}
