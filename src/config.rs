//! Adapter configuration, read from `GYMCRAFT_*` environment variables.
//!
//! `.env` files are honoured through `dotenv` by the binary. The engine overlay
//! is a separate dotenv-format file whose entries are merged into the engine
//! process environment.

use std::collections::BTreeMap;
use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::infra::{EngineSetup, GymError, Result};
use crate::scenarios::OpponentPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    Duel,
    Squad,
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "duel" | "m1v1" => Ok(ScenarioKind::Duel),
            "squad" | "mnv1" | "mvn" => Ok(ScenarioKind::Squad),
            other => Err(format!("unknown scenario '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub engine_dir: PathBuf,
    pub launcher_path: PathBuf,
    pub overlay_path: Option<PathBuf>,
    pub server_ip: IpAddr,
    pub server_port: u16,
    pub speed: i32,
    /// Engine-side frame skip, negotiated during the setup handshake.
    pub frame_skip: i32,
    pub set_gui: i32,
    pub self_play: bool,
    pub max_steps: usize,
    /// Pass ticks the adapter performs after every command batch.
    pub skip_ticks: usize,
    pub exchange_timeout: Option<Duration>,
    pub exchange_log_dir: Option<PathBuf>,
    pub scenario: ScenarioKind,
    pub agents: usize,
    pub enemies: usize,
    pub initialize_together: bool,
    pub init_range_start: i32,
    pub init_range_end: i32,
    pub opponent: OpponentPolicy,
    pub seed: Option<u64>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            engine_dir: expand_home("~/TorchCraft"),
            launcher_path: PathBuf::from("../bwapi/bin/BWAPILauncher"),
            overlay_path: None,
            server_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            server_port: 11111,
            speed: 0,
            frame_skip: 1,
            set_gui: 0,
            self_play: false,
            max_steps: 1000,
            skip_ticks: 0,
            exchange_timeout: None,
            exchange_log_dir: None,
            scenario: ScenarioKind::Squad,
            agents: 1,
            enemies: 1,
            initialize_together: false,
            init_range_start: 100,
            init_range_end: 150,
            opponent: OpponentPolicy::AttackNearest,
            seed: None,
        }
    }
}

impl AdapterConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults and
    /// malformed values are fatal.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            engine_dir: lookup("GYMCRAFT_ENGINE_DIR")
                .map(|dir| expand_home(&dir))
                .unwrap_or(defaults.engine_dir),
            launcher_path: lookup("GYMCRAFT_LAUNCHER")
                .map(PathBuf::from)
                .unwrap_or(defaults.launcher_path),
            overlay_path: lookup("GYMCRAFT_OVERLAY").map(|path| expand_home(&path)),
            server_ip: parse_or(&lookup, "GYMCRAFT_SERVER_IP", defaults.server_ip)?,
            server_port: parse_or(&lookup, "GYMCRAFT_SERVER_PORT", defaults.server_port)?,
            speed: parse_or(&lookup, "GYMCRAFT_SPEED", defaults.speed)?,
            frame_skip: parse_or(&lookup, "GYMCRAFT_FRAME_SKIP", defaults.frame_skip)?,
            set_gui: parse_or(&lookup, "GYMCRAFT_SET_GUI", defaults.set_gui)?,
            self_play: parse_flag(&lookup, "GYMCRAFT_SELF_PLAY", defaults.self_play)?,
            max_steps: parse_or(&lookup, "GYMCRAFT_MAX_STEPS", defaults.max_steps)?,
            skip_ticks: parse_or(&lookup, "GYMCRAFT_SKIP_TICKS", defaults.skip_ticks)?,
            exchange_timeout: lookup("GYMCRAFT_EXCHANGE_TIMEOUT_MS")
                .map(|raw| parse_value::<u64>("GYMCRAFT_EXCHANGE_TIMEOUT_MS", &raw))
                .transpose()?
                .map(Duration::from_millis),
            exchange_log_dir: lookup("GYMCRAFT_EXCHANGE_LOG_DIR").map(PathBuf::from),
            scenario: parse_or(&lookup, "GYMCRAFT_SCENARIO", defaults.scenario)?,
            agents: parse_or(&lookup, "GYMCRAFT_AGENTS", defaults.agents)?,
            enemies: parse_or(&lookup, "GYMCRAFT_ENEMIES", defaults.enemies)?,
            initialize_together: parse_flag(
                &lookup,
                "GYMCRAFT_INITIALIZE_TOGETHER",
                defaults.initialize_together,
            )?,
            init_range_start: parse_or(
                &lookup,
                "GYMCRAFT_INIT_RANGE_START",
                defaults.init_range_start,
            )?,
            init_range_end: parse_or(&lookup, "GYMCRAFT_INIT_RANGE_END", defaults.init_range_end)?,
            opponent: parse_or(&lookup, "GYMCRAFT_OPPONENT", defaults.opponent)?,
            seed: lookup("GYMCRAFT_SEED")
                .map(|raw| parse_value::<u64>("GYMCRAFT_SEED", &raw))
                .transpose()?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.agents == 0 {
            return Err(GymError::config("GYMCRAFT_AGENTS", "at least one agent is required"));
        }
        if self.enemies == 0 {
            return Err(GymError::config("GYMCRAFT_ENEMIES", "at least one enemy is required"));
        }
        if self.init_range_start > self.init_range_end {
            return Err(GymError::config(
                "GYMCRAFT_INIT_RANGE_START",
                format!(
                    "range start {} is above range end {}",
                    self.init_range_start, self.init_range_end
                ),
            ));
        }
        if self.max_steps == 0 {
            return Err(GymError::config("GYMCRAFT_MAX_STEPS", "must be positive"));
        }
        Ok(())
    }

    pub fn engine_setup(&self) -> EngineSetup {
        EngineSetup {
            speed: self.speed,
            gui: self.set_gui,
            frame_skip: self.frame_skip,
        }
    }

    /// Number of engine instances the configured mode needs.
    pub fn instance_count(&self) -> usize {
        if self.self_play { 2 } else { 1 }
    }

    /// Reads the engine overlay file, or an empty overlay when none is configured.
    pub fn load_overlay(&self) -> Result<BTreeMap<String, String>> {
        match &self.overlay_path {
            Some(path) => load_overlay(path),
            None => Ok(BTreeMap::new()),
        }
    }
}

pub fn load_overlay(path: &Path) -> Result<BTreeMap<String, String>> {
    let key = path.display().to_string();
    let entries =
        dotenv::from_path_iter(path).map_err(|err| GymError::config(&key, err.to_string()))?;

    let mut overlay = BTreeMap::new();
    for entry in entries {
        let (name, value) = entry.map_err(|err| GymError::config(&key, err.to_string()))?;
        overlay.insert(name, value);
    }
    Ok(overlay)
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), env::var_os("HOME")) {
        (Some(rest), Some(home)) => Path::new(&home).join(rest),
        _ => PathBuf::from(path),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|err| GymError::config(key, format!("'{}': {}", raw, err)))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool> {
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(default),
        Some("1") | Some("true") | Some("yes") | Some("on") => Ok(true),
        Some("0") | Some("false") | Some("no") | Some("off") => Ok(false),
        Some(other) => Err(GymError::config(key, format!("'{}' is not a flag", other))),
    }
}
