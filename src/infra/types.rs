use crate::engine_interface::{Command, CommandKind};

/// Engine positions are reported in walk tiles; world coordinates are eight
/// times larger.
pub const COORDINATE_FACTOR: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in engine units.
    pub fn distance(&self, other: &Position) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// Euclidean distance in world units, comparable with attack ranges.
    pub fn world_distance(&self, other: &Position) -> f32 {
        self.distance(other) * COORDINATE_FACTOR
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    Own,
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttackMode {
    /// Replaces whatever the unit is doing.
    Priority,
    /// Does not interrupt an attack already in progress.
    Protected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitCommand {
    Move { unit: i32, to: Position },
    Attack { unit: i32, target: i32, mode: AttackMode },
    Spawn { player: i32, unit_type: i32, x: i32, y: i32 },
    Kill { unit: i32 },
}

impl UnitCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            UnitCommand::Move { .. } => CommandKind::Move,
            UnitCommand::Attack {
                mode: AttackMode::Priority,
                ..
            } => CommandKind::AttackPriority,
            UnitCommand::Attack {
                mode: AttackMode::Protected,
                ..
            } => CommandKind::AttackProtected,
            UnitCommand::Spawn { .. } => CommandKind::Spawn,
            UnitCommand::Kill { .. } => CommandKind::Kill,
        }
    }
}

impl From<&UnitCommand> for Command {
    fn from(command: &UnitCommand) -> Self {
        let mut wire = Command {
            kind: command.kind() as i32,
            ..Default::default()
        };
        match *command {
            UnitCommand::Move { unit, to } => {
                wire.unit_id = unit;
                wire.x = to.x;
                wire.y = to.y;
            }
            UnitCommand::Attack { unit, target, .. } => {
                wire.unit_id = unit;
                wire.target_id = target;
            }
            UnitCommand::Spawn {
                player,
                unit_type,
                x,
                y,
            } => {
                wire.player_id = player;
                wire.unit_type = unit_type;
                wire.x = x;
                wire.y = y;
            }
            UnitCommand::Kill { unit } => wire.unit_id = unit,
        }
        wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_is_symmetric() {
        let a = Position::new(12, 40);
        let b = Position::new(-3, 7);
        assert_eq!(a.distance(&b), b.distance(&a));
        assert_eq!(a.world_distance(&b), b.world_distance(&a));
    }

    #[test]
    fn test_world_distance_applies_factor() {
        let a = Position::new(0, 0);
        let b = Position::new(3, 4);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
        assert!((a.world_distance(&b) - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_attack_mode_maps_to_wire_kind() {
        let protected = UnitCommand::Attack {
            unit: 1,
            target: 2,
            mode: AttackMode::Protected,
        };
        let wire = Command::from(&protected);
        assert_eq!(wire.kind(), CommandKind::AttackProtected);
        assert_eq!(wire.unit_id, 1);
        assert_eq!(wire.target_id, 2);
    }
}
