use tracing::{debug, info};

use crate::env::EpisodeOutcome;
use crate::state::{Snapshot, UnitRegistry};

/// Trait for observing environment events during execution
pub trait EpisodeObserver {
    /// Called once the engine session(s) are connected
    fn on_connected(&mut self, sessions: usize, snapshot: &Snapshot);

    /// Called when a reset has spawned the units and assigned ordinals
    fn on_episode_start(&mut self, episode: usize, registry: &UnitRegistry);

    /// Called after every step
    fn on_step(&mut self, _step: usize, _rewards: &[f32], _registry: &UnitRegistry) {
        // Default implementation does nothing
    }

    /// Called when an episode terminates
    fn on_episode_end(&mut self, episode: usize, outcome: EpisodeOutcome, steps: usize, wins: usize);
}

/// Logs environment events; keeps no state of its own.
#[derive(Debug, Default)]
pub struct DefaultObserver;

impl DefaultObserver {
    pub fn new() -> Self {
        Self
    }
}

impl EpisodeObserver for DefaultObserver {
    fn on_connected(&mut self, sessions: usize, snapshot: &Snapshot) {
        info!("Connected {} session(s)", sessions);
        info!("- map size: {}x{}", snapshot.map_width, snapshot.map_height);
        info!("- player id: {}", snapshot.player_id);
    }

    fn on_episode_start(&mut self, episode: usize, registry: &UnitRegistry) {
        info!(
            "Episode {} started: agents {:?} vs enemies {:?}",
            episode,
            registry.agent_ids(),
            registry.enemy_ids()
        );
    }

    fn on_step(&mut self, step: usize, rewards: &[f32], _registry: &UnitRegistry) {
        debug!("step: {}, rewards: {:?}", step, rewards);
    }

    fn on_episode_end(&mut self, episode: usize, outcome: EpisodeOutcome, steps: usize, wins: usize) {
        info!(
            "Episode {} finished with {:?} after {} steps | Wins: {:4} | WinRate: {:1.3}",
            episode,
            outcome,
            steps,
            wins,
            wins as f64 / episode.max(1) as f64
        );
    }
}
