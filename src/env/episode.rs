use crate::infra::Team;
use crate::state::UnitRegistry;

use super::observation::Observation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpisodeOutcome {
    /// Every opponent is gone and at least one agent survived.
    Won,
    Lost,
    TimedOut,
    /// The engine reported more units than the scenario spawns.
    Interrupted,
}

impl EpisodeOutcome {
    pub fn is_win(&self) -> bool {
        matches!(self, EpisodeOutcome::Won)
    }
}

/// Counters and cross-tick memory carried by the state machine.
///
/// `episodes` and `wins` persist across resets; everything else is per episode.
#[derive(Debug, Clone)]
pub struct EpisodeState {
    pub episodes: usize,
    pub wins: usize,
    pub steps: usize,
    /// Action each agent took on the previous step, if any.
    pub last_actions: Vec<Option<usize>>,
    pub prev_observation: Option<Observation>,
    /// Enemy ordinal each agent last issued an attack on.
    pub has_attacked: Vec<Option<usize>>,
    /// Agent ordinal last seen hitting each enemy.
    pub was_attacked: Vec<Option<usize>>,
    /// Which enemy ordinals were alive at the last engagement check.
    pub enemies_seen: Vec<bool>,
}

impl EpisodeState {
    pub fn new(agents: usize, enemies: usize) -> Self {
        Self {
            episodes: 0,
            wins: 0,
            steps: 0,
            last_actions: vec![None; agents],
            prev_observation: None,
            has_attacked: vec![None; agents],
            was_attacked: vec![None; enemies],
            enemies_seen: vec![false; enemies],
        }
    }

    pub fn begin_episode(&mut self) {
        self.episodes += 1;
        self.steps = 0;
        self.prev_observation = None;
        self.last_actions.iter_mut().for_each(|a| *a = None);
        self.has_attacked.iter_mut().for_each(|a| *a = None);
        self.was_attacked.iter_mut().for_each(|a| *a = None);
        self.enemies_seen.iter_mut().for_each(|seen| *seen = false);
    }

    pub fn record_actions(&mut self, actions: &[usize], attack_targets: &[Option<usize>]) {
        for (slot, &action) in self.last_actions.iter_mut().zip(actions) {
            *slot = Some(action);
        }
        for (slot, target) in self.has_attacked.iter_mut().zip(attack_targets) {
            if let Some(enemy) = target {
                *slot = Some(*enemy);
            }
        }
    }

    /// Credits each enemy that is under attack to the agent that is both
    /// engaging and last ordered to attack that enemy.
    ///
    /// An enemy that was alive at the previous check and is gone now died
    /// between observations, so its attacker can no longer be seen engaging.
    /// It is credited to the surviving agent last ordered to attack it unless
    /// an earlier credit still matches that agent's orders.
    pub fn track_engagements(&mut self, registry: &UnitRegistry) {
        for (enemy_idx, attacker) in self.was_attacked.iter_mut().enumerate() {
            let Some(enemy) = registry.lookup(Team::Enemy, enemy_idx) else {
                let vanished = self.enemies_seen.get(enemy_idx).copied().unwrap_or(false);
                let credited = attacker
                    .is_some_and(|agent| self.has_attacked.get(agent) == Some(&Some(enemy_idx)));
                if vanished && !credited {
                    *attacker = self
                        .has_attacked
                        .iter()
                        .enumerate()
                        .find(|(agent_idx, target)| {
                            **target == Some(enemy_idx)
                                && registry.lookup(Team::Own, *agent_idx).is_some()
                        })
                        .map(|(agent_idx, _)| agent_idx);
                }
                continue;
            };
            if !enemy.under_attack {
                continue;
            }
            for (agent_idx, target) in self.has_attacked.iter().enumerate() {
                let engaging = registry
                    .lookup(Team::Own, agent_idx)
                    .is_some_and(|agent| agent.is_engaging());
                if engaging && *target == Some(enemy_idx) {
                    *attacker = Some(agent_idx);
                }
            }
        }

        for (enemy_idx, seen) in self.enemies_seen.iter_mut().enumerate() {
            *seen = registry.lookup(Team::Enemy, enemy_idx).is_some();
        }
    }

    /// True when `agent` attacked `enemy` and `enemy` was recorded as hit by `agent`.
    pub fn is_attributed(&self, agent: usize, enemy: usize) -> bool {
        self.has_attacked.get(agent).copied().flatten() == Some(enemy)
            && self.was_attacked.get(enemy).copied().flatten() == Some(agent)
    }

    pub fn has_engaged(&self, agent: usize) -> bool {
        self.has_attacked.get(agent).copied().flatten().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::Position;
    use crate::state::{Snapshot, Unit};

    fn unit(id: i32, player_id: i32, attacking: bool, under_attack: bool) -> Unit {
        Unit {
            id,
            player_id,
            unit_type: 0,
            position: Position::new(0, 0),
            health: 40,
            max_health: 40,
            cooldown: 0,
            max_cooldown: 15,
            attack_range: 128,
            attacking,
            starting_attack: false,
            under_attack,
        }
    }

    fn registry(units: Vec<Unit>, agents: usize, enemies: usize) -> UnitRegistry {
        let mut registry = UnitRegistry::new();
        registry.refresh(&Snapshot {
            units,
            ..Default::default()
        });
        registry.assign_indices(agents, enemies);
        registry
    }

    #[test]
    fn test_begin_episode_keeps_totals() {
        let mut episode = EpisodeState::new(2, 1);
        episode.wins = 3;
        episode.steps = 17;
        episode.record_actions(&[5, 1], &[Some(0), None]);

        episode.begin_episode();

        assert_eq!(episode.episodes, 1);
        assert_eq!(episode.wins, 3);
        assert_eq!(episode.steps, 0);
        assert_eq!(episode.last_actions, vec![None, None]);
        assert!(!episode.has_engaged(0));
    }

    #[test]
    fn test_attribution_needs_both_sides() {
        // agent 0 ordered on enemy 0 but is idle, agent 1 is the one hitting
        let registry = registry(
            vec![
                unit(1, 0, false, false),
                unit(2, 0, true, false),
                unit(9, 1, false, true),
            ],
            2,
            1,
        );
        let mut episode = EpisodeState::new(2, 1);
        episode.record_actions(&[5, 5], &[Some(0), Some(0)]);
        episode.track_engagements(&registry);

        assert!(!episode.is_attributed(0, 0));
        assert!(episode.is_attributed(1, 0));
    }

    #[test]
    fn test_enemy_killed_between_checks_is_credited() {
        let before = registry(vec![unit(1, 0, false, false), unit(9, 1, false, false)], 1, 1);
        let mut episode = EpisodeState::new(1, 1);
        episode.track_engagements(&before);
        episode.record_actions(&[5], &[Some(0)]);

        // the enemy never showed up as under attack before dying
        let mut after = before.clone();
        after.refresh(&Snapshot {
            units: vec![unit(1, 0, false, false)],
            ..Default::default()
        });
        episode.track_engagements(&after);

        assert!(episode.is_attributed(0, 0));
        assert_eq!(episode.enemies_seen, vec![false]);
    }

    #[test]
    fn test_enemy_missing_from_the_start_is_not_credited() {
        let registry = registry(vec![unit(1, 0, false, false)], 1, 1);
        let mut episode = EpisodeState::new(1, 1);
        episode.record_actions(&[5], &[Some(0)]);
        episode.track_engagements(&registry);

        assert!(!episode.is_attributed(0, 0));
    }

    #[test]
    fn test_moves_keep_last_attack_target() {
        let mut episode = EpisodeState::new(1, 2);
        episode.record_actions(&[6], &[Some(1)]);
        episode.record_actions(&[0], &[None]);

        assert_eq!(episode.has_attacked[0], Some(1));
        assert_eq!(episode.last_actions[0], Some(0));
    }
}
