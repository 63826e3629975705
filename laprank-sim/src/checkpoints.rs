use glam::DVec3;
use laprank_core::lap_info::CheckpointIndex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("a track needs at least one checkpoint")]
    Empty,

    #[error("checkpoint {index} is out of range for a track of {count} checkpoints")]
    CheckpointOutOfRange { index: CheckpointIndex, count: usize },

    #[error("could not read track file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse track file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Checkpoint {
    pub id: CheckpointIndex,
    pub position: DVec3,
}

impl Checkpoint {
    pub fn new(id: CheckpointIndex, position: DVec3) -> Self {
        Self { id, position }
    }
}

// The ordered loop of waypoints every agent has to cross. Checkpoint 0 doubles
// as the start/finish line; crossing it again closes a lap.
#[derive(Clone, Debug)]
pub struct CheckpointTrack {
    checkpoints: Vec<Checkpoint>,
}

impl CheckpointTrack {
    pub fn new(positions: impl IntoIterator<Item = DVec3>) -> Result<Self, TrackError> {
        let checkpoints: Vec<Checkpoint> = positions
            .into_iter()
            .enumerate()
            .map(|(id, position)| Checkpoint::new(id, position))
            .collect();

        if checkpoints.is_empty() {
            return Err(TrackError::Empty);
        }

        Ok(Self { checkpoints })
    }

    pub fn count(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn checkpoint_at(&self, index: CheckpointIndex) -> Result<&Checkpoint, TrackError> {
        self.checkpoints
            .get(index)
            .ok_or_else(|| TrackError::CheckpointOutOfRange {
                index,
                count: self.count(),
            })
    }

    pub fn next_index(&self, index: CheckpointIndex) -> CheckpointIndex {
        (index + 1) % self.count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.iter()
    }

    // Only for indices we produced ourselves, so a miss here is a bug in this
    // crate rather than bad input. Use `checkpoint_at` for anything else.
    pub(crate) fn get(&self, index: CheckpointIndex) -> &Checkpoint {
        &self.checkpoints[index]
    }
}
