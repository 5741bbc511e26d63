//! Observation codec - converts the unit registry into fixed-width feature rows

use crate::infra::Team;
use crate::state::{Snapshot, UnitRegistry};

use super::spaces::ObservationSpace;

/// One feature row per agent ordinal.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub agents: Vec<Vec<f32>>,
}

impl Observation {
    pub fn zeros(agents: usize, width: usize) -> Self {
        Self {
            agents: vec![vec![0.0; width]; agents],
        }
    }

    pub fn agent(&self, ordinal: usize) -> &[f32] {
        &self.agents[ordinal]
    }

    /// Feature `index` of agent `ordinal`, zero when out of bounds.
    pub fn get(&self, ordinal: usize, index: usize) -> f32 {
        self.agents
            .get(ordinal)
            .and_then(|row| row.get(index))
            .copied()
            .unwrap_or(0.0)
    }
}

// Squad row: x, y, hp, cooldown, previous action, then per enemy
// dx, dy, out of vision, enemy hp, enemy cooldown.
pub const SQUAD_SELF_WIDTH: usize = 5;
pub const SQUAD_ENEMY_WIDTH: usize = 5;
pub const SQUAD_OWN_HEALTH: usize = 2;
const SQUAD_ENEMY_HEALTH: usize = 3;

pub fn squad_enemy_health_index(enemy: usize) -> usize {
    SQUAD_SELF_WIDTH + enemy * SQUAD_ENEMY_WIDTH + SQUAD_ENEMY_HEALTH
}

/// Encoder for the many-agent layouts.
#[derive(Debug, Clone)]
pub struct SquadEncoder {
    pub agents: usize,
    pub enemies: usize,
    /// Vision radius in engine units.
    pub vision: f32,
    pub action_count: usize,
}

impl SquadEncoder {
    pub fn width(&self) -> usize {
        SQUAD_SELF_WIDTH + SQUAD_ENEMY_WIDTH * self.enemies
    }

    pub fn space(&self) -> ObservationSpace {
        let mut low = vec![0.0; SQUAD_SELF_WIDTH];
        let mut high = vec![1.0; SQUAD_SELF_WIDTH];
        for _ in 0..self.enemies {
            low.extend_from_slice(&[-1.0, -1.0, 0.0, 0.0, 0.0]);
            high.extend_from_slice(&[1.0, 1.0, 1.0, 1.0, 1.0]);
        }
        ObservationSpace::new(self.agents, low, high)
    }

    pub fn encode(
        &self,
        registry: &UnitRegistry,
        snapshot: &Snapshot,
        last_actions: &[Option<usize>],
    ) -> Observation {
        let space = self.space();
        let mut observation = Observation::zeros(self.agents, self.width());
        let map_width = snapshot.map_width.max(1) as f32;
        let map_height = snapshot.map_height.max(1) as f32;

        for (ordinal, row) in observation.agents.iter_mut().enumerate() {
            let Some(myself) = registry.lookup(Team::Own, ordinal) else {
                continue;
            };

            row[0] = myself.position.x as f32 / map_width;
            row[1] = myself.position.y as f32 / map_height;
            row[2] = myself.health_fraction();
            row[3] = myself.cooldown_fraction();
            row[4] = last_actions.get(ordinal).copied().flatten().unwrap_or(0) as f32
                / self.action_count as f32;

            for enemy_idx in 0..self.enemies {
                let Some(enemy) = registry.lookup(Team::Enemy, enemy_idx) else {
                    continue;
                };

                let base = SQUAD_SELF_WIDTH + enemy_idx * SQUAD_ENEMY_WIDTH;
                if myself.position.distance(&enemy.position) <= self.vision {
                    row[base] = (myself.position.x - enemy.position.x) as f32 / self.vision;
                    row[base + 1] = (myself.position.y - enemy.position.y) as f32 / self.vision;
                    row[base + 2] = 0.0;
                } else {
                    row[base + 2] = 1.0;
                }
                row[base + 3] = enemy.health_fraction();
                row[base + 4] = enemy.cooldown_fraction();
            }

            space.clamp(row);
        }

        observation
    }
}

pub const DUEL_WIDTH: usize = 6;
pub const DUEL_OWN_HEALTH: usize = 2;
pub const DUEL_ENEMY_HEALTH: usize = 3;

/// Encoder for the single agent layout:
/// dx, dy, my hp, enemy hp, my cooldown, enemy cooldown.
#[derive(Debug, Clone, Default)]
pub struct DuelEncoder;

impl DuelEncoder {
    pub fn space(&self) -> ObservationSpace {
        ObservationSpace::new(
            1,
            vec![-1.0, -1.0, 0.0, 0.0, 0.0, 0.0],
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
        )
    }

    pub fn encode(&self, registry: &UnitRegistry, snapshot: &Snapshot) -> Observation {
        let mut observation = Observation::zeros(1, DUEL_WIDTH);
        let (Some(myself), Some(enemy)) = (
            registry.lookup(Team::Own, 0),
            registry.lookup(Team::Enemy, 0),
        ) else {
            return observation;
        };

        // both offsets are scaled by the map width
        let scale = snapshot.map_width.max(1) as f32;
        let row = &mut observation.agents[0];
        row[0] = (myself.position.x - enemy.position.x) as f32 / scale;
        row[1] = (myself.position.y - enemy.position.y) as f32 / scale;
        row[2] = myself.health_fraction();
        row[3] = enemy.health_fraction();
        row[4] = myself.cooldown_fraction();
        row[5] = enemy.cooldown_fraction();
        self.space().clamp(row);

        observation
    }
}
