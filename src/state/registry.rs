use std::collections::HashMap;

use tracing::{debug, warn};

use crate::infra::Team;

use super::unit::{Snapshot, Unit};

/// Alive units of the current frame plus the per-episode ordinal tables.
///
/// Ordinal `i` of a team keeps naming the same unit id for the whole episode;
/// once that unit dies the slot reads as absent and is never handed to another.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    own: HashMap<i32, Unit>,
    enemy: HashMap<i32, Unit>,
    own_order: Vec<i32>,
    enemy_order: Vec<i32>,
    agent_ids: Vec<i32>,
    enemy_ids: Vec<i32>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[tracing::instrument(level = "trace", skip_all, fields(frame = snapshot.frame))]
    pub fn refresh(&mut self, snapshot: &Snapshot) {
        self.own.clear();
        self.enemy.clear();
        self.own_order.clear();
        self.enemy_order.clear();

        for unit in snapshot.own_units() {
            self.own_order.push(unit.id);
            self.own.insert(unit.id, unit.clone());
        }
        for unit in snapshot.enemy_units() {
            self.enemy_order.push(unit.id);
            self.enemy.insert(unit.id, unit.clone());
        }
    }

    /// Captures the current id ordering as the episode's ordinal tables.
    pub fn assign_indices(&mut self, agents: usize, enemies: usize) {
        if self.own_order.len() < agents || self.enemy_order.len() < enemies {
            warn!(
                "Assigning indices with {} own / {} enemy units for {} agents / {} enemies",
                self.own_order.len(),
                self.enemy_order.len(),
                agents,
                enemies
            );
        }

        self.agent_ids = Self::capture(&self.own_order, agents);
        self.enemy_ids = Self::capture(&self.enemy_order, enemies);
        debug!("Agent ids {:?}, enemy ids {:?}", self.agent_ids, self.enemy_ids);
    }

    /// Takes the first `count` ids; missing units get an id that never matches.
    fn capture(order: &[i32], count: usize) -> Vec<i32> {
        (0..count)
            .map(|i| order.get(i).copied().unwrap_or(i32::MIN))
            .collect()
    }

    pub fn lookup(&self, team: Team, ordinal: usize) -> Option<&Unit> {
        let (ids, alive) = match team {
            Team::Own => (&self.agent_ids, &self.own),
            Team::Enemy => (&self.enemy_ids, &self.enemy),
        };
        ids.get(ordinal).and_then(|id| alive.get(id))
    }

    pub fn agent_ids(&self) -> &[i32] {
        &self.agent_ids
    }

    pub fn enemy_ids(&self) -> &[i32] {
        &self.enemy_ids
    }

    pub fn alive(&self, team: Team) -> impl Iterator<Item = &Unit> {
        let (order, alive) = match team {
            Team::Own => (&self.own_order, &self.own),
            Team::Enemy => (&self.enemy_order, &self.enemy),
        };
        order.iter().filter_map(move |id| alive.get(id))
    }

    pub fn alive_count(&self, team: Team) -> usize {
        match team {
            Team::Own => self.own.len(),
            Team::Enemy => self.enemy.len(),
        }
    }

    pub fn total_alive(&self) -> usize {
        self.own.len() + self.enemy.len()
    }

    /// Alive ordinals among the tracked slots of `team`.
    pub fn alive_mask(&self, team: Team) -> Vec<bool> {
        let slots = match team {
            Team::Own => self.agent_ids.len(),
            Team::Enemy => self.enemy_ids.len(),
        };
        (0..slots).map(|i| self.lookup(team, i).is_some()).collect()
    }
}
