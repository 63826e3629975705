use std::f64::consts::TAU;
use std::fs;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::checkpoints::{CheckpointTrack, TrackError};
use crate::spawn::{SpawnManager, SpawnPoint};

// Everything a track file describes: the checkpoint loop plus the two pools
// of spawn slots
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Map {
    pub checkpoints: Vec<DVec3>,
    #[serde(default)]
    pub grid: Vec<SpawnPoint>,
    #[serde(default)]
    pub random_spawns: Vec<SpawnPoint>,
}

impl Map {
    pub fn load(filename: &str) -> Result<Map, TrackError> {
        info!("loading track {}", filename);
        let contents = fs::read_to_string(filename)?;
        let map: Map = serde_json::from_str(&contents)?;
        info!(
            "track has {} checkpoints, {} grid slots and {} random spawns",
            map.checkpoints.len(),
            map.grid.len(),
            map.random_spawns.len()
        );
        Ok(map)
    }

    // A flat ring of `checkpoints` waypoints driven counterclockwise (seen
    // from +y). The grid sits just behind checkpoint 0 in pairs and there is
    // one random spawn halfway along every leg.
    pub fn oval(checkpoints: usize, radius: f64, grid_slots: usize) -> Map {
        let on_ring = |angle: f64, r: f64| DVec3::new(r * angle.cos(), 0.0, r * angle.sin());
        let tangent = |angle: f64| DVec3::new(-angle.sin(), 0.0, angle.cos());
        let leg = TAU / checkpoints.max(1) as f64;

        let positions = (0..checkpoints)
            .map(|i| on_ring(i as f64 * leg, radius))
            .collect();

        let grid = (0..grid_slots)
            .map(|slot| {
                let row = (slot / 2 + 1) as f64;
                let lane = if slot % 2 == 0 { -2.0 } else { 2.0 };
                let angle = -row * leg * 0.1;
                SpawnPoint::new(on_ring(angle, radius + lane), tangent(angle), 0)
            })
            .collect();

        let random_spawns = (0..checkpoints)
            .map(|i| {
                let angle = (i as f64 + 0.5) * leg;
                SpawnPoint::new(on_ring(angle, radius), tangent(angle), i)
            })
            .collect();

        Map {
            checkpoints: positions,
            grid,
            random_spawns,
        }
    }

    pub fn track(&self) -> Result<CheckpointTrack, TrackError> {
        CheckpointTrack::new(self.checkpoints.iter().copied())
    }

    pub fn spawn_manager(&self) -> SpawnManager {
        SpawnManager::new(self.grid.clone(), self.random_spawns.clone())
    }
}
