use glam::DVec3;
use serde::{Deserialize, Serialize};

// Pose is what the simulation hands us every tick: where an agent is and
// which way its nose points. Only the horizontal plane matters for the
// progress logic, but we keep the full 3d vectors around.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
pub struct Pose {
    pub position: DVec3,
    pub unit_forward: DVec3, // should be a normalized vector
}

impl Pose {
    pub fn new(position: DVec3, forward: DVec3) -> Self {
        Self {
            position,
            unit_forward: forward.normalize_or_zero(),
        }
    }

    // how strongly this pose faces `target`, in [-1, 1]; 0 if we're sitting on it
    pub fn facing(&self, target: DVec3) -> f64 {
        self.unit_forward
            .dot((target - self.position).normalize_or_zero())
    }

    pub fn distance_to(&self, target: DVec3) -> f64 {
        self.position.distance(target)
    }
}
