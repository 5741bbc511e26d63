pub mod config;
pub mod engine_interface;
pub mod env;
pub mod infra;
pub mod scenarios;
pub mod state;

#[cfg(test)]
mod testkit;

// Re-export commonly used types for convenience
pub use config::AdapterConfig;
pub use env::{CombatEnv, EpisodeOutcome, Observation, Scenario, StepResult};
pub use infra::{GymError, Result};
pub use scenarios::{DuelScenario, OpponentPolicy, SquadScenario};
