use crate::state::{Snapshot, UnitRegistry, UnitSpawnSpec};

use super::action::DecodedActions;
use super::episode::{EpisodeOutcome, EpisodeState};
use super::observation::Observation;
use super::reward::RewardContext;
use super::spaces::{ActionSpace, ObservationSpace};

/// When a freshly spawned episode counts as started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyCondition {
    /// Both teams show at least the spawned number of units.
    UnitsPresent,
    /// The engine cleared its waiting-for-restart flag and the spawned units are
    /// visible.
    RestartCleared,
}

/// Read-only view of the current tick handed to scenario hooks.
pub struct TickContext<'a> {
    pub registry: &'a UnitRegistry,
    pub snapshot: &'a Snapshot,
    pub episode: &'a EpisodeState,
    pub max_steps: usize,
}

/// The per-variant policy plugged into [`CombatEnv`](super::CombatEnv).
pub trait Scenario {
    fn name(&self) -> &'static str;

    fn agent_count(&self) -> usize;

    fn enemy_count(&self) -> usize;

    fn spawn_specs(&self) -> &[UnitSpawnSpec];

    fn ready_condition(&self) -> ReadyCondition {
        ReadyCondition::UnitsPresent
    }

    fn action_space(&self) -> ActionSpace;

    fn observation_space(&self) -> ObservationSpace;

    fn decode_actions(&self, actions: &[usize], ctx: &TickContext) -> DecodedActions;

    fn encode_observation(&self, ctx: &TickContext) -> Observation;

    /// Asked after each batch with the number of settle ticks already spent.
    fn has_step_completed(&self, _settle_ticks: usize) -> bool {
        true
    }

    fn compute_reward(&self, ctx: &RewardContext) -> Vec<f32>;

    fn check_done(&self, ctx: &TickContext) -> Option<EpisodeOutcome>;
}
