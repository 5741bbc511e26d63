use crate::config::AdapterConfig;
use crate::env::{
    ActionCodec, ActionSpace, AttackModePolicy, DecodedActions, EpisodeOutcome, Observation,
    ObservationSpace, RewardContext, Scenario, SquadEncoder, SquadRewardConfig, TickContext,
};
use crate::infra::Team;
use crate::state::{MARINE, UnitSpawnSpec};

/// Engine units within which an enemy's relative position is observed.
pub const SQUAD_VISION: f32 = 7.0;

/// Marines against marines, every agent choosing between five moves and one
/// attack per enemy ordinal.
#[derive(Debug, Clone)]
pub struct SquadScenario {
    agents: usize,
    enemies: usize,
    spawns: Vec<UnitSpawnSpec>,
    codec: ActionCodec,
    encoder: SquadEncoder,
    rewards: SquadRewardConfig,
}

impl SquadScenario {
    /// Each unit spawns on its own random spot in `start..=end` (engine units).
    pub fn new(agents: usize, enemies: usize, start: i32, end: i32) -> Self {
        let mut spawns = Vec::with_capacity(agents + enemies);
        spawns.extend((0..agents).map(|_| UnitSpawnSpec::random_square(Team::Own, MARINE, 1, start, end)));
        spawns.extend((0..enemies).map(|_| UnitSpawnSpec::random_square(Team::Enemy, MARINE, 1, start, end)));
        Self::with_spawns(agents, enemies, spawns)
    }

    /// Each team spawns as one group on a single random spot.
    pub fn grouped(agents: usize, enemies: usize, start: i32, end: i32) -> Self {
        let spawns = vec![
            UnitSpawnSpec::random_square(Team::Own, MARINE, agents, start, end),
            UnitSpawnSpec::random_square(Team::Enemy, MARINE, enemies, start, end),
        ];
        Self::with_spawns(agents, enemies, spawns)
    }

    pub fn many_vs_one(agents: usize) -> Self {
        Self::new(agents, 1, 100, 150)
    }

    pub fn with_spawns(agents: usize, enemies: usize, spawns: Vec<UnitSpawnSpec>) -> Self {
        let codec = ActionCodec::new(enemies, AttackModePolicy::FromPreviousAction);
        Self {
            agents,
            enemies,
            spawns,
            codec,
            encoder: SquadEncoder {
                agents,
                enemies,
                vision: SQUAD_VISION,
                action_count: codec.action_count(),
            },
            rewards: SquadRewardConfig::default(),
        }
    }

    pub fn from_config(config: &AdapterConfig) -> Self {
        if config.initialize_together {
            Self::grouped(
                config.agents,
                config.enemies,
                config.init_range_start,
                config.init_range_end,
            )
        } else {
            Self::new(
                config.agents,
                config.enemies,
                config.init_range_start,
                config.init_range_end,
            )
        }
    }

    pub fn with_rewards(mut self, rewards: SquadRewardConfig) -> Self {
        self.rewards = rewards;
        self
    }
}

impl Scenario for SquadScenario {
    fn name(&self) -> &'static str {
        "squad"
    }

    fn agent_count(&self) -> usize {
        self.agents
    }

    fn enemy_count(&self) -> usize {
        self.enemies
    }

    fn spawn_specs(&self) -> &[UnitSpawnSpec] {
        &self.spawns
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::new(self.agents, self.codec.action_count())
    }

    fn observation_space(&self) -> ObservationSpace {
        self.encoder.space()
    }

    fn decode_actions(&self, actions: &[usize], ctx: &TickContext) -> DecodedActions {
        self.codec
            .decode(actions, ctx.registry, &ctx.episode.last_actions)
    }

    fn encode_observation(&self, ctx: &TickContext) -> Observation {
        self.encoder
            .encode(ctx.registry, ctx.snapshot, &ctx.episode.last_actions)
    }

    fn compute_reward(&self, ctx: &RewardContext) -> Vec<f32> {
        self.rewards.compute(ctx, self.enemies)
    }

    fn check_done(&self, ctx: &TickContext) -> Option<EpisodeOutcome> {
        let own_alive = ctx.registry.alive_mask(Team::Own).contains(&true);
        let enemies_alive = ctx.registry.alive_mask(Team::Enemy).contains(&true);

        if !enemies_alive && own_alive {
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
