mod action;
mod episode;
mod machine;
mod observation;
mod reward;
mod scenario;
mod spaces;
mod stats;

pub use action::{ActionCodec, AgentAction, AttackModePolicy, DecodedActions, MOVE_COUNT, MOVE_STEPS};
pub use episode::{EpisodeOutcome, EpisodeState};
pub use machine::{CombatEnv, EnvOptions, EnvPhase, StepInfo, StepResult};
pub use observation::{
    DUEL_ENEMY_HEALTH, DUEL_OWN_HEALTH, DUEL_WIDTH, DuelEncoder, Observation, SQUAD_ENEMY_WIDTH,
    SQUAD_OWN_HEALTH, SQUAD_SELF_WIDTH, SquadEncoder, squad_enemy_health_index,
};
pub use reward::{DuelRewardConfig, RewardContext, SquadRewardConfig};
pub use scenario::{ReadyCondition, Scenario, TickContext};
pub use spaces::{ActionSpace, ObservationSpace};
pub use stats::{EpisodeStats, RollingMean};
