//! Reward model - shaped per-tick rewards plus terminal adjustments

use crate::infra::Team;
use crate::state::UnitRegistry;

use super::episode::{EpisodeOutcome, EpisodeState};
use super::observation::{
    DUEL_ENEMY_HEALTH, DUEL_OWN_HEALTH, Observation, SQUAD_OWN_HEALTH, squad_enemy_health_index,
};

/// Everything a reward function may look at for one tick.
pub struct RewardContext<'a> {
    pub current: &'a Observation,
    pub previous: &'a Observation,
    pub episode: &'a EpisodeState,
    pub registry: &'a UnitRegistry,
    pub outcome: Option<EpisodeOutcome>,
}

#[derive(Debug, Clone)]
pub struct SquadRewardConfig {
    pub step_penalty: f32,
    /// Paid on a win to every agent that attacked at least once.
    pub win_bonus: f32,
    /// Paid on timeout when more agents than enemies are alive.
    pub advantage_bonus: f32,
}

impl Default for SquadRewardConfig {
    fn default() -> Self {
        Self {
            step_penalty: -0.01,
            win_bonus: 10.0,
            advantage_bonus: 2.0,
        }
    }
}

impl SquadRewardConfig {
    pub fn compute(&self, ctx: &RewardContext, enemies: usize) -> Vec<f32> {
        let agents = ctx.current.agents.len();
        let mut rewards = vec![self.step_penalty; agents];

        for (agent, reward) in rewards.iter_mut().enumerate() {
            *reward += ctx.current.get(agent, SQUAD_OWN_HEALTH)
                - ctx.previous.get(agent, SQUAD_OWN_HEALTH);

            // a dead agent's row is blank and must not look like damage dealt
            if ctx.registry.lookup(Team::Own, agent).is_none() {
                continue;
            }
            for enemy in 0..enemies {
                if ctx.episode.is_attributed(agent, enemy) {
                    let index = squad_enemy_health_index(enemy);
                    *reward += ctx.previous.get(agent, index) - ctx.current.get(agent, index);
                }
            }
        }

        if let Some(outcome) = ctx.outcome {
            for (agent, reward) in rewards.iter_mut().enumerate() {
                *reward += self.terminal(ctx, agent, outcome);
            }
        }
        rewards
    }

    fn terminal(&self, ctx: &RewardContext, agent: usize, outcome: EpisodeOutcome) -> f32 {
        let enemy_health: f32 = ctx
            .registry
            .alive(Team::Enemy)
            .map(|enemy| enemy.health_fraction())
            .sum();
        let own_health = ctx
            .registry
            .lookup(Team::Own, agent)
            .map_or(0.0, |unit| unit.health_fraction());

        match outcome {
            EpisodeOutcome::Won if ctx.episode.has_engaged(agent) => self.win_bonus,
            EpisodeOutcome::Won => 0.0,
            EpisodeOutcome::Lost => -enemy_health,
            EpisodeOutcome::TimedOut => {
                let advantage = ctx.registry.alive_count(Team::Own)
                    > ctx.registry.alive_count(Team::Enemy);
                let bonus = if advantage { self.advantage_bonus } else { 0.0 };
                bonus - enemy_health - own_health
            }
            EpisodeOutcome::Interrupted => 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DuelRewardConfig {
    pub step_penalty: f32,
    /// Added when ahead on health, subtracted otherwise.
    pub lead_reward: f32,
    pub win_bonus: f32,
    pub loss_penalty: f32,
    pub timeout_penalty: f32,
}

impl Default for DuelRewardConfig {
    fn default() -> Self {
        Self {
            step_penalty: -0.05,
            lead_reward: 1.0,
            win_bonus: 1000.0,
            loss_penalty: -500.0,
            timeout_penalty: -500.0,
        }
    }
}

impl DuelRewardConfig {
    pub fn compute(&self, ctx: &RewardContext) -> Vec<f32> {
        let mut reward = self.step_penalty;
        if ctx.current.get(0, DUEL_OWN_HEALTH) > ctx.current.get(0, DUEL_ENEMY_HEALTH) {
            reward += self.lead_reward;
        } else {
            reward -= self.lead_reward;
        }

        reward += match ctx.outcome {
            Some(EpisodeOutcome::Won) => self.win_bonus,
            Some(EpisodeOutcome::Lost) => self.loss_penalty,
            Some(EpisodeOutcome::TimedOut) => self.timeout_penalty,
            Some(EpisodeOutcome::Interrupted) | None => 0.0,
        };
        vec![reward]
    }
}
