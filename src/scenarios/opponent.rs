use std::fmt;
use std::str::FromStr;

use crate::infra::{AttackMode, Team, UnitCommand};
use crate::state::{Unit, UnitRegistry};

/// Scripted behaviour for the second player's units in self-play.
///
/// The policy reads the registry built from the opponent session's point of
/// view, so `Team::Own` are the units it controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpponentPolicy {
    AttackNearest,
    AttackWeakest,
    Passive,
}

impl OpponentPolicy {
    pub fn commands(&self, view: &UnitRegistry) -> Vec<UnitCommand> {
        if *self == OpponentPolicy::Passive {
            return Vec::new();
        }

        view.alive(Team::Own)
            .filter_map(|unit| {
                let target = self.pick_target(unit, view)?;
                Some(UnitCommand::Attack {
                    unit: unit.id,
                    target: target.id,
                    mode: AttackMode::Priority,
                })
            })
            .collect()
    }

    fn pick_target<'a>(&self, unit: &Unit, view: &'a UnitRegistry) -> Option<&'a Unit> {
        let targets = view.alive(Team::Enemy);
        match self {
            OpponentPolicy::AttackNearest => targets.min_by(|a, b| {
                let da = unit.position.distance(&a.position);
                let db = unit.position.distance(&b.position);
                da.total_cmp(&db)
            }),
            OpponentPolicy::AttackWeakest => targets.min_by_key(|target| target.health),
            OpponentPolicy::Passive => None,
        }
    }
}

impl fmt::Display for OpponentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpponentPolicy::AttackNearest => "attack_nearest",
            OpponentPolicy::AttackWeakest => "attack_weakest",
            OpponentPolicy::Passive => "passive",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for OpponentPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().replace('-', "_").as_str() {
            "attack_nearest" | "nearest" => Ok(OpponentPolicy::AttackNearest),
            "attack_weakest" | "weakest" => Ok(OpponentPolicy::AttackWeakest),
            "passive" | "none" => Ok(OpponentPolicy::Passive),
            other => Err(format!("unknown opponent policy '{}'", other)),
        }
    }
}
