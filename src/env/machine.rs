use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::config::AdapterConfig;
use crate::infra::{
    Connector, DefaultObserver, EngineLauncher, EngineProcess, EngineSession, EngineSetup,
    EpisodeObserver, GymError, Result, TcpConnector, Team, UnitCommand,
};
use crate::scenarios::OpponentPolicy;
use crate::state::{Snapshot, UnitRegistry};

use super::episode::{EpisodeOutcome, EpisodeState};
use super::observation::Observation;
use super::reward::RewardContext;
use super::scenario::{ReadyCondition, Scenario, TickContext};
use super::spaces::{ActionSpace, ObservationSpace};

/// Kill rounds in a row without the engine advancing a frame before giving up.
const MAX_STALLED_DRAINS: usize = 50;
const DRAIN_WARN_EVERY: usize = 100;
const READY_WARN_EVERY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvPhase {
    Uninitialized,
    Connected,
    Resetting,
    Active,
    Terminal,
}

#[derive(Debug, Clone)]
pub struct EnvOptions {
    pub setup: EngineSetup,
    pub max_steps: usize,
    /// Extra pass exchanges after every command batch.
    pub skip_ticks: usize,
    pub seed: Option<u64>,
}

impl EnvOptions {
    pub fn from_config(config: &AdapterConfig) -> Self {
        Self {
            setup: config.engine_setup(),
            max_steps: config.max_steps,
            skip_ticks: config.skip_ticks,
            seed: config.seed,
        }
    }
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self::from_config(&AdapterConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// Whether each agent ordinal is still alive.
    pub alive_mask: Vec<bool>,
    pub episode: usize,
    pub wins: usize,
    pub steps: usize,
    pub outcome: Option<EpisodeOutcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub observation: Observation,
    /// One value per agent ordinal.
    pub reward: Vec<f32>,
    pub done: bool,
    pub info: StepInfo,
}

/// A multi-agent combat environment on top of one (or, in self-play, two)
/// engine sessions.
///
/// Sessions are declared before the engine handles so that they are dropped
/// first.
pub struct CombatEnv<S: Scenario, C: Connector> {
    scenario: S,
    connector: C,
    options: EnvOptions,
    opponent: Option<OpponentPolicy>,
    primary: Option<C::Session>,
    secondary: Option<C::Session>,
    engines: Vec<EngineProcess>,
    phase: EnvPhase,
    closed: bool,
    registry: UnitRegistry,
    opponent_view: UnitRegistry,
    snapshot: Snapshot,
    opponent_snapshot: Option<Snapshot>,
    episode: EpisodeState,
    observer: Box<dyn EpisodeObserver>,
    /// The step that ended the current episode, replayed until the next reset.
    terminal: Option<StepResult>,
    rng: StdRng,
}

impl<S: Scenario> CombatEnv<S, TcpConnector> {
    /// Starts the engine instance(s) the config asks for and prepares an
    /// environment that connects to them on the first reset.
    pub async fn launch(config: &AdapterConfig, scenario: S) -> Result<Self> {
        let launcher = EngineLauncher::new(
            config.engine_dir.join(&config.launcher_path),
            config.engine_dir.clone(),
            config.server_ip,
        )
        .with_overlay(config.load_overlay()?);

        let engines = launcher
            .launch(config.instance_count(), config.server_port)
            .await?;
        let addresses = engines
            .iter()
            .map(|engine| engine.address(config.server_ip))
            .collect();
        let connector = TcpConnector::new(
            addresses,
            config.exchange_timeout,
            config.exchange_log_dir.clone(),
        );

        let env = CombatEnv::new(scenario, connector, EnvOptions::from_config(config))
            .attach_engines(engines);
        Ok(if config.self_play {
            env.with_self_play(config.opponent)
        } else {
            env
        })
    }
}

impl<S: Scenario, C: Connector> CombatEnv<S, C> {
    pub fn new(scenario: S, connector: C, options: EnvOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let episode = EpisodeState::new(scenario.agent_count(), scenario.enemy_count());

        Self {
            scenario,
            connector,
            options,
            opponent: None,
            primary: None,
            secondary: None,
            engines: Vec::new(),
            phase: EnvPhase::Uninitialized,
            closed: false,
            registry: UnitRegistry::new(),
            opponent_view: UnitRegistry::new(),
            snapshot: Snapshot::default(),
            opponent_snapshot: None,
            episode,
            observer: Box::new(DefaultObserver::new()),
            terminal: None,
            rng,
        }
    }

    /// Drives the enemy units from a second session with `policy`.
    pub fn with_self_play(mut self, policy: OpponentPolicy) -> Self {
        self.opponent = Some(policy);
        self
    }

    pub fn with_observer(mut self, observer: impl EpisodeObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Hands engine processes to the environment; they are shut down by `close`.
    pub fn attach_engines(mut self, engines: Vec<EngineProcess>) -> Self {
        self.engines = engines;
        self
    }

    pub fn action_space(&self) -> ActionSpace {
        self.scenario.action_space()
    }

    pub fn observation_space(&self) -> ObservationSpace {
        self.scenario.observation_space()
    }

    pub fn phase(&self) -> EnvPhase {
        self.phase
    }

    pub fn episode(&self) -> &EpisodeState {
        &self.episode
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn scenario(&self) -> &S {
        &self.scenario
    }

    fn tick_context(&self) -> TickContext<'_> {
        TickContext {
            registry: &self.registry,
            snapshot: &self.snapshot,
            episode: &self.episode,
            max_steps: self.options.max_steps,
        }
    }

    async fn connect(&mut self) -> Result<()> {
        let mut primary = self.connector.connect(0).await?;
        self.snapshot = primary.init(&self.options.setup).await?;
        self.primary = Some(primary);

        if self.opponent.is_some() {
            let mut secondary = self.connector.connect(1).await?;
            self.opponent_snapshot = Some(secondary.init(&self.options.setup).await?);
            self.secondary = Some(secondary);
        }

        self.phase = EnvPhase::Connected;
        let sessions = if self.secondary.is_some() { 2 } else { 1 };
        self.observer.on_connected(sessions, &self.snapshot);
        Ok(())
    }

    /// Sends `commands` on the primary session and then, in self-play,
    /// `opponent_commands` on the secondary one.
    async fn exchange_lockstep(
        &mut self,
        commands: &[UnitCommand],
        opponent_commands: &[UnitCommand],
    ) -> Result<()> {
        let primary = self.primary.as_mut().ok_or(GymError::SessionClosed)?;
        self.snapshot = primary.exchange(commands).await?;

        if let Some(secondary) = self.secondary.as_mut() {
            self.opponent_snapshot = Some(secondary.exchange(opponent_commands).await?);
        }
        Ok(())
    }

    async fn pass(&mut self) -> Result<()> {
        self.exchange_lockstep(&[], &[]).await
    }

    fn refresh(&mut self) {
        self.registry.refresh(&self.snapshot);
        if let Some(snapshot) = &self.opponent_snapshot {
            self.opponent_view.refresh(snapshot);
        }
    }

    /// Starts a new episode and returns its first observation.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn reset(&mut self) -> Result<Observation> {
        if self.closed {
            return Err(GymError::SessionClosed);
        }
        if self.primary.is_none() {
            self.connect().await?;
        }
        self.phase = EnvPhase::Resetting;

        self.drain().await?;
        self.spawn().await?;
        self.await_ready().await?;

        let agents = self.scenario.agent_count();
        let enemies = self.scenario.enemy_count();
        self.refresh();
        self.registry.assign_indices(agents, enemies);
        self.opponent_view.assign_indices(enemies, agents);

        self.terminal = None;
        self.episode.begin_episode();
        self.episode.track_engagements(&self.registry);
        let observation = self.scenario.encode_observation(&self.tick_context());
        self.episode.prev_observation = Some(observation.clone());

        self.phase = EnvPhase::Active;
        self.observer
            .on_episode_start(self.episode.episodes, &self.registry);
        Ok(observation)
    }

    /// Kills every unit on the map until the engine reports none alive.
    async fn drain(&mut self) -> Result<()> {
        let mut rounds = 0;
        let mut stalled = 0;

        while self.snapshot.alive_count() > 0 {
            let kills: Vec<UnitCommand> = self
                .snapshot
                .units
                .iter()
                .map(|unit| UnitCommand::Kill { unit: unit.id })
                .collect();
            let frame = self.snapshot.frame;
            self.exchange_lockstep(&kills, &[]).await?;
            rounds += 1;

            if self.snapshot.frame == frame {
                stalled += 1;
                if stalled >= MAX_STALLED_DRAINS {
                    return Err(GymError::protocol(format!(
                        "engine stuck at frame {} with {} units left to kill",
                        frame,
                        self.snapshot.alive_count()
                    )));
                }
            } else {
                stalled = 0;
            }
            if rounds % DRAIN_WARN_EVERY == 0 {
                warn!(
                    "{} units still alive after {} kill rounds",
                    self.snapshot.alive_count(),
                    rounds
                );
            }
        }

        if rounds > 0 {
            debug!("Map drained after {} kill rounds", rounds);
        }
        Ok(())
    }

    async fn spawn(&mut self) -> Result<()> {
        let own_player = self.snapshot.player_id;
        let enemy_player = if own_player == 0 { 1 } else { 0 };

        let mut commands = Vec::new();
        for spec in self.scenario.spawn_specs() {
            let player = match spec.team {
                Team::Own => own_player,
                Team::Enemy => enemy_player,
            };
            commands.extend(spec.commands(player, &mut self.rng));
        }
        debug!("Spawning {} units", commands.len());
        self.exchange_lockstep(&commands, &[]).await
    }

    fn is_ready(&self) -> bool {
        let agents = self.scenario.agent_count();
        let enemies = self.scenario.enemy_count();
        let units_present = self.snapshot.own_units().count() >= agents
            && self.snapshot.enemy_units().count() >= enemies;

        let primary_ready = match self.scenario.ready_condition() {
            ReadyCondition::UnitsPresent => units_present,
            ReadyCondition::RestartCleared => !self.snapshot.waiting_for_restart && units_present,
        };
        let opponent_ready = match (&self.secondary, &self.opponent_snapshot) {
            (Some(_), Some(snapshot)) => snapshot.own_units().count() >= enemies,
            _ => true,
        };
        primary_ready && opponent_ready
    }

    async fn await_ready(&mut self) -> Result<()> {
        let mut polls = 0;
        while !self.is_ready() {
            self.pass().await?;
            polls += 1;
            if polls % READY_WARN_EVERY == 0 {
                warn!(
                    "Still waiting for spawned units after {} ticks (frame {})",
                    polls, self.snapshot.frame
                );
            }
        }
        Ok(())
    }

    /// Applies one action per agent ordinal and advances the engine.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn step(&mut self, actions: &[usize]) -> Result<StepResult> {
        if let (EnvPhase::Terminal, Some(terminal)) = (self.phase, &self.terminal) {
            return Ok(StepResult {
                reward: vec![0.0; terminal.reward.len()],
                ..terminal.clone()
            });
        }
        if self.phase != EnvPhase::Active {
            return Err(GymError::NotActive);
        }
        let agents = self.scenario.agent_count();
        if actions.len() != agents {
            return Err(GymError::InvalidActions {
                expected: agents,
                got: actions.len(),
            });
        }
        self.episode.steps += 1;

        let spawned = agents + self.scenario.enemy_count();
        let interrupted = self.snapshot.alive_count() > spawned;
        if interrupted {
            warn!(
                "{} units on the map but only {} were spawned, ending episode",
                self.snapshot.alive_count(),
                spawned
            );
        } else {
            self.dispatch(actions).await?;
        }

        self.refresh();
        self.episode.track_engagements(&self.registry);

        let observation = self.scenario.encode_observation(&self.tick_context());
        let outcome = if interrupted {
            Some(EpisodeOutcome::Interrupted)
        } else {
            self.scenario.check_done(&self.tick_context())
        };

        let previous = self
            .episode
            .prev_observation
            .take()
            .unwrap_or_else(|| observation.clone());
        let reward = self.scenario.compute_reward(&RewardContext {
            current: &observation,
            previous: &previous,
            episode: &self.episode,
            registry: &self.registry,
            outcome,
        });
        if outcome == Some(EpisodeOutcome::Won) {
            self.episode.wins += 1;
        }
        self.episode.prev_observation = Some(observation.clone());

        self.observer
            .on_step(self.episode.steps, &reward, &self.registry);
        if let Some(outcome) = outcome {
            self.phase = EnvPhase::Terminal;
            self.observer.on_episode_end(
                self.episode.episodes,
                outcome,
                self.episode.steps,
                self.episode.wins,
            );
        }

        let result = StepResult {
            observation,
            reward,
            done: outcome.is_some(),
            info: StepInfo {
                alive_mask: self.registry.alive_mask(Team::Own),
                episode: self.episode.episodes,
                wins: self.episode.wins,
                steps: self.episode.steps,
                outcome,
            },
        };
        if result.done {
            self.terminal = Some(result.clone());
        }
        Ok(result)
    }

    async fn dispatch(&mut self, actions: &[usize]) -> Result<()> {
        let decoded = self
            .scenario
            .decode_actions(actions, &self.tick_context());
        let opponent_commands = match (&self.opponent, &self.secondary) {
            (Some(policy), Some(_)) => policy.commands(&self.opponent_view),
            _ => Vec::new(),
        };

        self.exchange_lockstep(&decoded.commands, &opponent_commands)
            .await?;
        self.episode
            .record_actions(actions, &decoded.attack_targets);

        for _ in 0..self.options.skip_ticks {
            self.pass().await?;
        }
        let mut settle = 0;
        while !self.scenario.has_step_completed(settle) {
            self.pass().await?;
            settle += 1;
        }
        Ok(())
    }

    /// Closes the session(s), then stops any attached engines. Calling it again
    /// does nothing.
    pub async fn close(&mut self) -> Result<()> {
        let sessions = [self.primary.take(), self.secondary.take()];
        for mut session in sessions.into_iter().flatten() {
            if let Err(err) = session.close().await {
                warn!("Closing session failed: {}", err);
            }
        }
        for engine in self.engines.iter_mut() {
            engine.shutdown().await?;
        }

        if !self.closed {
            info!(
                "Environment closed after {} episodes ({} wins)",
                self.episode.episodes, self.episode.wins
            );
        }
        self.closed = true;
        self.terminal = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{AttackMode, EpisodeObserver};
    use crate::scenarios::{DUEL_SETTLE_TICKS, DuelScenario, SquadScenario};
    use crate::state::{MARINE, UnitSpawnSpec};
    use crate::testkit::{FakeConnector, FakeEngine};
    use std::cell::RefCell;
    use std::rc::Rc;

    type FakeEnv<S> = CombatEnv<S, FakeConnector>;

    struct EventLog(Rc<RefCell<Vec<String>>>);

    impl EpisodeObserver for EventLog {
        fn on_connected(&mut self, sessions: usize, _snapshot: &Snapshot) {
            self.0.borrow_mut().push(format!("connected {}", sessions));
        }

        fn on_episode_start(&mut self, episode: usize, _registry: &UnitRegistry) {
            self.0.borrow_mut().push(format!("start {}", episode));
        }

        fn on_step(&mut self, step: usize, _rewards: &[f32], _registry: &UnitRegistry) {
            self.0.borrow_mut().push(format!("step {}", step));
        }

        fn on_episode_end(&mut self, episode: usize, outcome: EpisodeOutcome, steps: usize, wins: usize) {
            self.0
                .borrow_mut()
                .push(format!("end {} {:?} {} {}", episode, outcome, steps, wins));
        }
    }

    fn approx(actual: f32, expected: f32) -> bool {
        (actual - expected).abs() < 1e-4
    }

    fn options(max_steps: usize) -> EnvOptions {
        EnvOptions {
            max_steps,
            seed: Some(1),
            ..Default::default()
        }
    }

    /// Squad env with fixed spawn points given in world coordinates.
    fn squad_env(
        engine: &Rc<RefCell<FakeEngine>>,
        own: &[(i32, i32)],
        enemies: &[(i32, i32)],
        max_steps: usize,
    ) -> FakeEnv<SquadScenario> {
        let mut spawns = Vec::new();
        spawns.extend(own.iter().map(|&(x, y)| UnitSpawnSpec::fixed(Team::Own, MARINE, 1, x, y)));
        spawns.extend(enemies.iter().map(|&(x, y)| UnitSpawnSpec::fixed(Team::Enemy, MARINE, 1, x, y)));
        let scenario = SquadScenario::with_spawns(own.len(), enemies.len(), spawns);
        CombatEnv::new(scenario, FakeConnector::new(engine), options(max_steps))
    }

    #[tokio::test]
    async fn test_reset_drains_before_spawning() {
        let engine = FakeEngine::new().shared();
        {
            let mut world = engine.borrow_mut();
            world.kills_per_frame = Some(1);
            world.place(0, 5, 5);
            world.place(1, 6, 6);
            world.place(1, 7, 7);
        }
        let mut env = squad_env(&engine, &[(80, 80), (88, 88)], &[(160, 160)], 100);

        let observation = env.reset().await.unwrap();

        let world = engine.borrow();
        let batches: Vec<_> = world.batches(0).collect();
        assert_eq!(batches.len(), 4);
        assert!(batches[..3].iter().all(|batch| batch.iter().all(|c| matches!(c, UnitCommand::Kill { .. }))));
        assert!(batches[3].iter().all(|c| matches!(c, UnitCommand::Spawn { .. })));
        assert_eq!(world.setups.len(), 1);

        assert_eq!(env.phase(), EnvPhase::Active);
        assert_eq!(env.registry().agent_ids().len(), 2);
        assert_eq!(env.registry().enemy_ids().len(), 1);
        assert!(env.registry().agent_ids().iter().all(|id| *id >= 103));
        assert_eq!(observation.agents.len(), 2);
        assert_eq!(env.episode().episodes, 1);
    }

    #[tokio::test]
    async fn test_one_vs_one_kill() {
        let engine = FakeEngine::new().shared();
        engine.borrow_mut().damage_per_frame = 20;
        let mut env = squad_env(&engine, &[(80, 80)], &[(96, 96)], 100);
        env.reset().await.unwrap();

        let first = env.step(&[5]).await.unwrap();
        assert!(!first.done);
        assert!(approx(first.reward[0], 0.49), "reward {:?}", first.reward);

        let second = env.step(&[5]).await.unwrap();
        assert!(second.done);
        assert_eq!(second.info.outcome, Some(EpisodeOutcome::Won));
        assert_eq!(second.info.wins, 1);
        assert!(approx(second.reward[0], 10.49), "reward {:?}", second.reward);
        assert_eq!(env.phase(), EnvPhase::Terminal);

        let world = engine.borrow();
        let attacks: Vec<AttackMode> = world
            .batches(0)
            .flatten()
            .filter_map(|c| match c {
                UnitCommand::Attack { mode, .. } => Some(*mode),
                _ => None,
            })
            .collect();
        assert_eq!(attacks, vec![AttackMode::Priority, AttackMode::Protected]);
    }

    #[tokio::test]
    async fn test_timeout() {
        let engine = FakeEngine::new().shared();
        let mut env = squad_env(&engine, &[(80, 80)], &[(480, 480)], 2);
        env.reset().await.unwrap();

        let first = env.step(&[4]).await.unwrap();
        assert!(!first.done);
        assert!(approx(first.reward[0], -0.01));

        let second = env.step(&[4]).await.unwrap();
        assert!(second.done);
        assert_eq!(second.info.outcome, Some(EpisodeOutcome::TimedOut));
        assert_eq!(second.info.wins, 0);
        assert!(approx(second.reward[0], -2.01), "reward {:?}", second.reward);
    }

    #[tokio::test]
    async fn test_attack_on_dead_target_emits_nothing() {
        let engine = FakeEngine::new().shared();
        let mut env = squad_env(&engine, &[(80, 80)], &[(96, 96), (104, 104)], 100);
        env.reset().await.unwrap();

        let doomed = env.registry().enemy_ids()[1];
        engine.borrow_mut().remove(doomed);
        let observed = env.step(&[4]).await.unwrap();
        assert_eq!(observed.info.alive_mask, vec![true]);
        assert!(env.registry().lookup(Team::Enemy, 1).is_none());

        let result = env.step(&[6]).await.unwrap();
        assert!(!result.done);
        let world = engine.borrow();
        assert_eq!(world.batches(0).last(), Some(&Vec::new()));
    }

    #[tokio::test]
    async fn test_extra_units_interrupt_the_episode() {
        let engine = FakeEngine::new().shared();
        let mut env = squad_env(&engine, &[(80, 80)], &[(480, 480)], 100);
        env.reset().await.unwrap();

        engine.borrow_mut().place(1, 30, 30);
        assert!(!env.step(&[4]).await.unwrap().done);

        let sent = engine.borrow().history.len();
        let result = env.step(&[4]).await.unwrap();
        assert!(result.done);
        assert_eq!(result.info.outcome, Some(EpisodeOutcome::Interrupted));
        assert!(approx(result.reward[0], -0.01));
        assert_eq!(engine.borrow().history.len(), sent);
    }

    #[tokio::test]
    async fn test_self_play_runs_in_lockstep() {
        let engine = FakeEngine::new().shared();
        let mut env = squad_env(&engine, &[(80, 80)], &[(96, 96)], 100)
            .with_self_play(OpponentPolicy::AttackNearest);
        env.reset().await.unwrap();
        env.step(&[5]).await.unwrap();

        let world = engine.borrow();
        assert_eq!(world.setups.len(), 2);
        assert_eq!(world.batches(0).count(), world.batches(1).count());

        let agent = env.registry().agent_ids()[0];
        let enemy = env.registry().enemy_ids()[0];
        let tail = &world.history[world.history.len() - 2..];
        assert_eq!(tail[0].0, 0);
        assert!(matches!(tail[0].1[..], [UnitCommand::Attack { unit, target, .. }] if unit == agent && target == enemy));
        assert_eq!(tail[1].0, 1);
        assert!(matches!(tail[1].1[..], [UnitCommand::Attack { unit, target, .. }] if unit == enemy && target == agent));
    }

    #[tokio::test]
    async fn test_one_tick_kill_from_full_health() {
        let engine = FakeEngine::new().shared();
        engine.borrow_mut().damage_per_frame = 40;
        let mut env = squad_env(&engine, &[(80, 80)], &[(96, 96)], 100);
        env.reset().await.unwrap();

        let result = env.step(&[5]).await.unwrap();
        assert!(result.done);
        assert_eq!(result.info.outcome, Some(EpisodeOutcome::Won));
        assert_eq!(result.info.wins, 1);
        // step penalty, the enemy's whole health bar and the win bonus
        assert!(approx(result.reward[0], 10.99), "reward {:?}", result.reward);
        assert!(env.episode().is_attributed(0, 0));
    }

    #[tokio::test]
    async fn test_step_requires_active_episode() {
        let engine = FakeEngine::new().shared();
        engine.borrow_mut().damage_per_frame = 40;
        let mut env = squad_env(&engine, &[(80, 80)], &[(96, 96)], 100);

        assert!(matches!(env.step(&[4]).await, Err(GymError::NotActive)));

        env.reset().await.unwrap();
        assert!(matches!(
            env.step(&[4, 4]).await,
            Err(GymError::InvalidActions { expected: 1, got: 2 })
        ));
        let last = env.step(&[5]).await.unwrap();
        assert!(last.done);
        assert!(approx(last.reward[0], 10.99), "reward {:?}", last.reward);

        // stepping past the end repeats the terminal result without a reward
        let sent = engine.borrow().history.len();
        let again = env.step(&[4]).await.unwrap();
        assert!(again.done);
        assert_eq!(again.info, last.info);
        assert_eq!(again.observation, last.observation);
        assert_eq!(again.reward, vec![0.0]);
        assert_eq!(engine.borrow().history.len(), sent);
        assert_eq!(env.episode().wins, 1);

        // totals survive the next reset
        env.reset().await.unwrap();
        assert_eq!(env.episode().episodes, 2);
        assert_eq!(env.episode().wins, 1);
        assert_eq!(env.episode().steps, 0);
        assert!(!env.step(&[4]).await.unwrap().done);
    }

    #[tokio::test]
    async fn test_observer_sees_episode_events() {
        let engine = FakeEngine::new().shared();
        engine.borrow_mut().damage_per_frame = 20;
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut env = squad_env(&engine, &[(80, 80)], &[(96, 96)], 100)
            .with_observer(EventLog(events.clone()));

        env.reset().await.unwrap();
        env.step(&[5]).await.unwrap();
        env.step(&[5]).await.unwrap();

        assert_eq!(
            *events.borrow(),
            vec!["connected 1", "start 1", "step 1", "step 2", "end 1 Won 2 1"]
        );
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let engine = FakeEngine::new().shared();
        let mut env = squad_env(&engine, &[(80, 80)], &[(96, 96)], 100);
        env.reset().await.unwrap();

        env.close().await.unwrap();
        env.close().await.unwrap();
        assert_eq!(engine.borrow().closed_sessions, 1);
        assert!(matches!(env.reset().await, Err(GymError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_random_rollout_stays_in_bounds() {
        let engine = FakeEngine::new().shared();
        let mut env = CombatEnv::new(
            SquadScenario::new(2, 2, 0, 8),
            FakeConnector::new(&engine),
            options(20),
        );
        let space = env.observation_space();
        let actions = env.action_space();
        let mut rng = rand::rng();

        let mut observation = env.reset().await.unwrap();
        for _ in 0..60 {
            assert!(space.contains(&observation));
            let batch = actions.sample(&mut rng);
            assert!(actions.contains(&batch));

            let result = env.step(&batch).await.unwrap();
            assert_eq!(result.reward.len(), 2);
            assert_eq!(result.info.alive_mask.len(), 2);
            if let Some(outcome) = result.info.outcome {
                assert!(!(outcome.is_win() && result.info.alive_mask.iter().all(|a| !a)));
            }
            observation = if result.done {
                env.reset().await.unwrap()
            } else {
                result.observation
            };
        }
    }

    #[tokio::test]
    async fn test_duel_waits_for_restart_and_settles() {
        let engine = FakeEngine::new().shared();
        engine.borrow_mut().restart_frames = 3;
        let mut env = CombatEnv::new(DuelScenario::new(), FakeConnector::new(&engine), options(100));

        let observation = env.reset().await.unwrap();
        assert_eq!(observation.agents, vec![vec![
            (50.0 - 6.0) / 64.0,
            (50.0 - 6.0) / 64.0,
            1.0,
            1.0,
            0.0,
            0.0
        ]]);
        assert!(!env.snapshot().waiting_for_restart);

        let before = engine.borrow().batches(0).count();
        let result = env.step(&[5]).await.unwrap();
        let after = engine.borrow().batches(0).count();
        assert_eq!(after - before, 1 + DUEL_SETTLE_TICKS);
        // out of range, so the attack is dropped and the enemy keeps its lead
        assert!(approx(result.reward[0], -1.05));
    }
}
