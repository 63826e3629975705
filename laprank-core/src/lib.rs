pub mod lap_info;
pub mod phase;
pub mod pose;
mod settings;

pub use settings::*;

pub type AgentID = usize;
