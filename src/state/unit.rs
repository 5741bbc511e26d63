use crate::engine_interface;
use crate::infra::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub id: i32,
    pub player_id: i32,
    pub unit_type: i32,
    /// Engine-native coordinates.
    pub position: Position,
    pub health: i32,
    pub max_health: i32,
    pub cooldown: i32,
    pub max_cooldown: i32,
    /// Ground attack range in world units.
    pub attack_range: i32,
    pub attacking: bool,
    pub starting_attack: bool,
    pub under_attack: bool,
}

impl Unit {
    pub fn health_fraction(&self) -> f32 {
        ratio(self.health, self.max_health)
    }

    pub fn cooldown_fraction(&self) -> f32 {
        ratio(self.cooldown, self.max_cooldown)
    }

    pub fn in_attack_range(&self, target: &Unit) -> bool {
        self.position.world_distance(&target.position) <= self.attack_range as f32
    }

    pub fn is_engaging(&self) -> bool {
        self.attacking || self.starting_attack
    }
}

fn ratio(value: i32, max: i32) -> f32 {
    if max <= 0 {
        0.0
    } else {
        (value as f32 / max as f32).clamp(0.0, 1.0)
    }
}

impl From<engine_interface::Unit> for Unit {
    fn from(unit: engine_interface::Unit) -> Self {
        Unit {
            id: unit.id,
            player_id: unit.player_id,
            unit_type: unit.unit_type,
            position: Position::new(unit.x, unit.y),
            health: unit.health,
            max_health: unit.max_health,
            cooldown: unit.ground_cd,
            max_cooldown: unit.max_cd,
            attack_range: unit.ground_range,
            attacking: unit.attacking,
            starting_attack: unit.starting_attack,
            under_attack: unit.under_attack,
        }
    }
}

/// The engine's full state at one frame boundary, from the point of view of
/// the session that received it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub player_id: i32,
    pub frame: i32,
    pub map_width: i32,
    pub map_height: i32,
    /// Alive units in the order the engine reported them.
    pub units: Vec<Unit>,
    pub waiting_for_restart: bool,
    pub battle_just_ended: bool,
    pub battle_won: bool,
    pub game_ended: bool,
}

impl Snapshot {
    pub fn own_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(move |u| u.player_id == self.player_id)
    }

    pub fn enemy_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(move |u| u.player_id != self.player_id)
    }

    pub fn alive_count(&self) -> usize {
        self.units.len()
    }
}

impl From<engine_interface::State> for Snapshot {
    fn from(state: engine_interface::State) -> Self {
        Snapshot {
            player_id: state.player_id,
            frame: state.frame,
            map_width: state.map_width,
            map_height: state.map_height,
            units: state.units.into_iter().map(Unit::from).collect(),
            waiting_for_restart: state.waiting_for_restart,
            battle_just_ended: state.battle_just_ended,
            battle_won: state.battle_won,
            game_ended: state.game_ended,
        }
    }
}
