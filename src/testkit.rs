//! In-memory engine for exercising the environment without a game process.
//!
//! One `FakeEngine` world is shared by every session it hands out. Slot 0
//! plays as player 0 and owns the clock; slot 1 plays as player 1 and its
//! commands are applied without advancing a frame.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::infra::{
    COORDINATE_FACTOR, Connector, EngineSession, EngineSetup, GymError, Position, Result,
    UnitCommand,
};
use crate::state::{Snapshot, Unit};

pub const FAKE_MAP_SIZE: i32 = 64;

#[derive(Debug)]
pub struct FakeEngine {
    pub units: Vec<Unit>,
    pub frame: i32,
    /// Every batch received, tagged with the session slot.
    pub history: Vec<(usize, Vec<UnitCommand>)>,
    pub setups: Vec<EngineSetup>,
    /// Health removed from a target per frame by each standing attack order.
    pub damage_per_frame: i32,
    /// Most kill commands honoured per frame, all when unset.
    pub kills_per_frame: Option<usize>,
    /// Frames after a spawn during which the engine reports waiting for restart.
    pub restart_frames: usize,
    /// Frames before spawned units show up.
    pub spawn_delay: usize,
    pub closed_sessions: usize,
    next_id: i32,
    orders: HashMap<i32, i32>,
    pending: Vec<(usize, Unit)>,
    waiting: usize,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            frame: 0,
            history: Vec::new(),
            setups: Vec::new(),
            damage_per_frame: 10,
            kills_per_frame: None,
            restart_frames: 0,
            spawn_delay: 0,
            closed_sessions: 0,
            next_id: 100,
            orders: HashMap::new(),
            pending: Vec::new(),
            waiting: 0,
        }
    }

    pub fn shared(self) -> Rc<RefCell<FakeEngine>> {
        Rc::new(RefCell::new(self))
    }

    /// Places a marine directly, bypassing the spawn path.
    pub fn place(&mut self, player_id: i32, x: i32, y: i32) -> i32 {
        let unit = self.marine(player_id, x, y);
        let id = unit.id;
        self.units.push(unit);
        id
    }

    pub fn remove(&mut self, id: i32) {
        self.units.retain(|unit| unit.id != id);
    }

    /// Batches sent by `slot`, oldest first.
    pub fn batches(&self, slot: usize) -> impl Iterator<Item = &Vec<UnitCommand>> {
        self.history
            .iter()
            .filter(move |(from, _)| *from == slot)
            .map(|(_, commands)| commands)
    }

    fn marine(&mut self, player_id: i32, x: i32, y: i32) -> Unit {
        let id = self.next_id;
        self.next_id += 1;
        Unit {
            id,
            player_id,
            unit_type: 0,
            position: Position::new(x, y),
            health: 40,
            max_health: 40,
            cooldown: 0,
            max_cooldown: 15,
            attack_range: 128,
            attacking: false,
            starting_attack: false,
            under_attack: false,
        }
    }

    fn snapshot(&self, player_id: i32) -> Snapshot {
        Snapshot {
            player_id,
            frame: self.frame,
            map_width: FAKE_MAP_SIZE,
            map_height: FAKE_MAP_SIZE,
            units: self.units.clone(),
            waiting_for_restart: self.waiting > 0,
            ..Default::default()
        }
    }

    fn apply(&mut self, slot: usize, commands: &[UnitCommand]) {
        self.history.push((slot, commands.to_vec()));

        let mut kills = 0;
        for command in commands {
            match *command {
                UnitCommand::Move { unit, to } => {
                    if let Some(mover) = self.units.iter_mut().find(|u| u.id == unit) {
                        mover.position = to;
                    }
                    self.orders.remove(&unit);
                }
                UnitCommand::Attack { unit, target, .. } => {
                    self.orders.insert(unit, target);
                }
                UnitCommand::Spawn { player, x, y, .. } => {
                    let factor = COORDINATE_FACTOR as i32;
                    let unit = self.marine(player, x / factor, y / factor);
                    self.pending.push((self.spawn_delay, unit));
                    self.waiting = self.restart_frames;
                }
                UnitCommand::Kill { unit } => {
                    if self.kills_per_frame.is_none_or(|limit| kills < limit) {
                        self.remove(unit);
                        kills += 1;
                    }
                }
            }
        }
    }

    fn advance(&mut self) {
        self.frame += 1;
        self.waiting = self.waiting.saturating_sub(1);

        for unit in self.units.iter_mut() {
            unit.attacking = false;
            unit.starting_attack = false;
            unit.under_attack = false;
        }

        let mut hits = Vec::new();
        for (&attacker, &target) in &self.orders {
            let (Some(a), Some(t)) = (
                self.units.iter().find(|u| u.id == attacker),
                self.units.iter().find(|u| u.id == target),
            ) else {
                continue;
            };
            if a.in_attack_range(t) {
                hits.push((attacker, target));
            }
        }
        for (attacker, target) in hits {
            for unit in self.units.iter_mut() {
                if unit.id == attacker {
                    unit.attacking = true;
                } else if unit.id == target {
                    unit.under_attack = true;
                    unit.health -= self.damage_per_frame;
                }
            }
        }

        self.units.retain(|unit| unit.health > 0);
        let alive: Vec<i32> = self.units.iter().map(|u| u.id).collect();
        self.orders
            .retain(|attacker, target| alive.contains(attacker) && alive.contains(target));

        let (ready, waiting): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .map(|(delay, unit)| (delay.saturating_sub(1), unit))
            .partition(|(delay, _)| *delay == 0);
        self.pending = waiting;
        self.units.extend(ready.into_iter().map(|(_, unit)| unit));
    }
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

pub struct FakeSession {
    engine: Rc<RefCell<FakeEngine>>,
    slot: usize,
    open: bool,
}

impl EngineSession for FakeSession {
    async fn init(&mut self, setup: &EngineSetup) -> Result<Snapshot> {
        let mut engine = self.engine.borrow_mut();
        engine.setups.push(*setup);
        Ok(engine.snapshot(self.slot as i32))
    }

    async fn exchange(&mut self, commands: &[UnitCommand]) -> Result<Snapshot> {
        if !self.open {
            return Err(GymError::SessionClosed);
        }
        let mut engine = self.engine.borrow_mut();
        engine.apply(self.slot, commands);
        if self.slot == 0 {
            engine.advance();
        }
        Ok(engine.snapshot(self.slot as i32))
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.engine.borrow_mut().closed_sessions += 1;
        }
        Ok(())
    }
}

pub struct FakeConnector {
    engine: Rc<RefCell<FakeEngine>>,
}

impl FakeConnector {
    pub fn new(engine: &Rc<RefCell<FakeEngine>>) -> Self {
        Self {
            engine: Rc::clone(engine),
        }
    }
}

impl Connector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&mut self, slot: usize) -> Result<FakeSession> {
        Ok(FakeSession {
            engine: Rc::clone(&self.engine),
            slot,
            open: true,
        })
    }
}
