use crate::env::{
    ActionCodec, ActionSpace, AttackModePolicy, DecodedActions, DuelEncoder, DuelRewardConfig,
    EpisodeOutcome, Observation, ObservationSpace, ReadyCondition, RewardContext, Scenario,
    TickContext,
};
use crate::infra::Team;
use crate::state::{MARINE, UnitSpawnSpec};

/// Pass ticks spent after every command batch so an order can play out.
pub const DUEL_SETTLE_TICKS: usize = 10;

/// One marine against one marine on fixed spawn points.
#[derive(Debug, Clone)]
pub struct DuelScenario {
    spawns: Vec<UnitSpawnSpec>,
    codec: ActionCodec,
    encoder: DuelEncoder,
    rewards: DuelRewardConfig,
    settle_ticks: usize,
}

impl DuelScenario {
    pub fn new() -> Self {
        Self {
            spawns: vec![
                UnitSpawnSpec::fixed(Team::Own, MARINE, 1, 400, 400),
                UnitSpawnSpec::fixed(Team::Enemy, MARINE, 1, 50, 50),
            ],
            codec: ActionCodec::new(1, AttackModePolicy::AlwaysProtected),
            encoder: DuelEncoder,
            rewards: DuelRewardConfig::default(),
            settle_ticks: DUEL_SETTLE_TICKS,
        }
    }

    pub fn with_settle_ticks(mut self, settle_ticks: usize) -> Self {
        self.settle_ticks = settle_ticks;
        self
    }
}

impl Default for DuelScenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario for DuelScenario {
    fn name(&self) -> &'static str {
        "duel"
    }

    fn agent_count(&self) -> usize {
        1
    }

    fn enemy_count(&self) -> usize {
        1
    }

    fn spawn_specs(&self) -> &[UnitSpawnSpec] {
        &self.spawns
    }

    fn ready_condition(&self) -> ReadyCondition {
        ReadyCondition::RestartCleared
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::new(1, self.codec.action_count())
    }

    fn observation_space(&self) -> ObservationSpace {
        self.encoder.space()
    }

    fn decode_actions(&self, actions: &[usize], ctx: &TickContext) -> DecodedActions {
        self.codec
            .decode(actions, ctx.registry, &ctx.episode.last_actions)
    }

    fn encode_observation(&self, ctx: &TickContext) -> Observation {
        self.encoder.encode(ctx.registry, ctx.snapshot)
    }

    fn has_step_completed(&self, settle_ticks: usize) -> bool {
        settle_ticks >= self.settle_ticks
    }

    fn compute_reward(&self, ctx: &RewardContext) -> Vec<f32> {
        self.rewards.compute(ctx)
    }

    fn check_done(&self, ctx: &TickContext) -> Option<EpisodeOutcome> {
        let own_alive = ctx.registry.lookup(Team::Own, 0).is_some();
        let enemy_alive = ctx.registry.lookup(Team::Enemy, 0).is_some();

        if ctx.snapshot.battle_just_ended || ctx.snapshot.game_ended {
            // the engine's verdict still has to agree with what is on the map
            return if ctx.snapshot.battle_won && own_alive && !enemy_alive {
                Some(EpisodeOutcome::Won)
            } else {
                Some(EpisodeOutcome::Lost)
            };
        }

        if !enemy_alive && own_alive {
            Some(EpisodeOutcome::Won)
        } else if !own_alive {
            Some(EpisodeOutcome::Lost)
        } else if ctx.episode.steps >= ctx.max_steps {
            Some(EpisodeOutcome::TimedOut)
        } else {
            None
        }
    }
}
