use rand::Rng;

use crate::infra::{COORDINATE_FACTOR, Team, UnitCommand};

pub const MARINE: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// World coordinates.
    Fixed { x: i32, y: i32 },
    /// Inclusive ranges in engine units, drawn independently per axis.
    Random { x: (i32, i32), y: (i32, i32) },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSpawnSpec {
    pub team: Team,
    pub unit_type: i32,
    pub quantity: usize,
    pub placement: Placement,
}

impl UnitSpawnSpec {
    pub fn fixed(team: Team, unit_type: i32, quantity: usize, x: i32, y: i32) -> Self {
        Self {
            team,
            unit_type,
            quantity,
            placement: Placement::Fixed { x, y },
        }
    }

    /// Both axes drawn from `start..=end`.
    pub fn random_square(team: Team, unit_type: i32, quantity: usize, start: i32, end: i32) -> Self {
        Self {
            team,
            unit_type,
            quantity,
            placement: Placement::Random {
                x: (start, end),
                y: (start, end),
            },
        }
    }

    /// One spawn command per unit. The whole group lands on one spot; random
    /// placements draw that spot afresh on every call.
    pub fn commands<R: Rng + ?Sized>(&self, player: i32, rng: &mut R) -> Vec<UnitCommand> {
        let (x, y) = match self.placement {
            Placement::Fixed { x, y } => (x, y),
            Placement::Random { x, y } => (
                scale(rng.random_range(x.0..=x.1)),
                scale(rng.random_range(y.0..=y.1)),
            ),
        };
        let spawn = UnitCommand::Spawn {
            player,
            unit_type: self.unit_type,
            x,
            y,
        };
        vec![spawn; self.quantity]
    }
}

fn scale(engine_units: i32) -> i32 {
    engine_units * COORDINATE_FACTOR as i32
}
