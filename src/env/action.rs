//! Action codec - turns per-agent discrete actions into unit commands

use crate::infra::{AttackMode, Team, UnitCommand};
use crate::state::UnitRegistry;

/// Up, down, left, right, hold.
pub const MOVE_STEPS: [(i32, i32); 5] = [(0, 1), (0, -1), (-1, 0), (1, 0), (0, 0)];
pub const MOVE_COUNT: usize = MOVE_STEPS.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentAction {
    Move { dx: i32, dy: i32 },
    Attack { enemy: usize },
}

/// How the delivery mode of an attack command is picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackModePolicy {
    /// Priority when the agent was moving, protected when it was already attacking.
    FromPreviousAction,
    AlwaysProtected,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedActions {
    pub commands: Vec<UnitCommand>,
    /// Enemy ordinal each agent was ordered to attack this step.
    pub attack_targets: Vec<Option<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionCodec {
    pub attack_slots: usize,
    pub mode_policy: AttackModePolicy,
}

impl ActionCodec {
    pub fn new(attack_slots: usize, mode_policy: AttackModePolicy) -> Self {
        Self {
            attack_slots,
            mode_policy,
        }
    }

    pub fn action_count(&self) -> usize {
        MOVE_COUNT + self.attack_slots
    }

    pub fn classify(&self, action: usize) -> Option<AgentAction> {
        if let Some(&(dx, dy)) = MOVE_STEPS.get(action) {
            return Some(AgentAction::Move { dx, dy });
        }
        let enemy = action - MOVE_COUNT;
        (enemy < self.attack_slots).then_some(AgentAction::Attack { enemy })
    }

    fn attack_mode(&self, previous: Option<usize>) -> AttackMode {
        match (self.mode_policy, previous) {
            (AttackModePolicy::AlwaysProtected, _) => AttackMode::Protected,
            (AttackModePolicy::FromPreviousAction, Some(prev)) if prev >= MOVE_COUNT => {
                AttackMode::Protected
            }
            (AttackModePolicy::FromPreviousAction, _) => AttackMode::Priority,
        }
    }

    /// Decodes one batch. Dead agents, absent targets, out-of-range targets and
    /// unknown action indices produce no command for that agent.
    pub fn decode(
        &self,
        actions: &[usize],
        registry: &UnitRegistry,
        last_actions: &[Option<usize>],
    ) -> DecodedActions {
        let mut decoded = DecodedActions {
            commands: Vec::with_capacity(actions.len()),
            attack_targets: vec![None; actions.len()],
        };

        for (ordinal, &action) in actions.iter().enumerate() {
            let Some(agent) = registry.lookup(Team::Own, ordinal) else {
                continue;
            };

            match self.classify(action) {
                Some(AgentAction::Move { dx, dy }) => decoded.commands.push(UnitCommand::Move {
                    unit: agent.id,
                    to: agent.position.offset(dx, dy),
                }),
                Some(AgentAction::Attack { enemy }) => {
                    let Some(target) = registry.lookup(Team::Enemy, enemy) else {
                        continue;
                    };
                    if !agent.in_attack_range(target) {
                        continue;
                    }
                    let previous = last_actions.get(ordinal).copied().flatten();
                    decoded.commands.push(UnitCommand::Attack {
                        unit: agent.id,
                        target: target.id,
                        mode: self.attack_mode(previous),
                    });
                    decoded.attack_targets[ordinal] = Some(enemy);
                }
                None => {}
            }
        }

        decoded
    }
}
