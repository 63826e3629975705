pub mod checkpoints;
pub mod driver;
pub mod evaluator;
pub mod game;
pub mod map;
pub mod progress;
pub mod ranking;
pub mod rewards;
pub mod spawn;
