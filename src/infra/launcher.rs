use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tracing::{debug, info, trace, warn};

use super::error::{GymError, Result};
use super::port::find_available_port;

/// Startup line announcing the bound port, e.g. `TorchCraft listening on port 11111`.
pub const PORT_MARKER: &str = "listening on port";
pub const MAX_STARTUP_LINES: usize = 200;

pub fn parse_port_marker(line: &str) -> Option<u16> {
    let start = line.find(PORT_MARKER)? + PORT_MARKER.len();
    let digits: String = line[start..]
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

async fn scan_for_port<R>(lines: &mut Lines<R>) -> Result<u16>
where
    R: AsyncBufRead + Unpin,
{
    for _ in 0..MAX_STARTUP_LINES {
        match lines.next_line().await? {
            Some(line) => {
                trace!("engine: {}", line);
                if let Some(port) = parse_port_marker(&line) {
                    return Ok(port);
                }
            }
            None => {
                return Err(GymError::launch(
                    "engine exited before announcing its port",
                ));
            }
        }
    }
    Err(GymError::launch(format!(
        "no '{}' line within the first {} lines of output",
        PORT_MARKER, MAX_STARTUP_LINES
    )))
}

/// Spawns engine instances and finds out where they listen.
#[derive(Debug, Clone)]
pub struct EngineLauncher {
    executable: PathBuf,
    args: Vec<String>,
    working_dir: PathBuf,
    overlay: BTreeMap<String, String>,
    server_ip: IpAddr,
}

impl EngineLauncher {
    pub fn new(executable: PathBuf, working_dir: PathBuf, server_ip: IpAddr) -> Self {
        Self {
            executable,
            args: Vec::new(),
            working_dir,
            overlay: BTreeMap::new(),
            server_ip,
        }
    }

    pub fn with_overlay(mut self, overlay: BTreeMap<String, String>) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Variables added on top of the inherited environment for one instance.
    pub fn environment(&self, port: u16) -> BTreeMap<String, String> {
        let mut env = self.overlay.clone();
        env.insert(
            "BWAPI_CONFIG_AUTO_MENU__GAME_TYPE".to_string(),
            "USE MAP SETTINGS".to_string(),
        );
        env.insert(
            "BWAPI_CONFIG_AUTO_MENU__AUTO_RESTART".to_string(),
            "OFF".to_string(),
        );
        env.insert("TORCHCRAFT_PORT".to_string(), port.to_string());
        env
    }

    /// Launches `count` instances on consecutive free ports starting at `base_port`.
    ///
    /// If any instance fails, the ones already started are killed when the
    /// returned error drops them.
    pub async fn launch(&self, count: usize, base_port: u16) -> Result<Vec<EngineProcess>> {
        let mut engines: Vec<EngineProcess> = Vec::with_capacity(count);
        let mut next_port = base_port;

        for instance in 0..count {
            let probed = find_available_port(self.server_ip, next_port)?;
            let engine = self.spawn(instance, probed).await?;
            next_port = engine.port.max(probed).checked_add(1).ok_or_else(|| {
                GymError::launch("ran out of ports for the next engine instance")
            })?;
            engines.push(engine);
        }

        Ok(engines)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn spawn(&self, instance: usize, port: u16) -> Result<EngineProcess> {
        let mut command = Command::new(&self.executable);
        command
            .args(&self.args)
            .current_dir(&self.working_dir)
            .envs(self.environment(port))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|err| {
            GymError::launch(format!(
                "could not start {}: {}",
                self.executable.display(),
                err
            ))
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GymError::launch("engine stdout was not captured"))?;

        let mut lines = BufReader::new(stdout).lines();
        let bound = scan_for_port(&mut lines).await?;
        if bound != port {
            warn!("Engine {} bound port {} instead of probed {}", instance, bound, port);
        }
        info!("Engine {} (pid {:?}) listening on port {}", instance, child.id(), bound);

        // keep the pipe drained so the engine never blocks on a full stdout
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                trace!(instance = instance, "engine: {}", line);
            }
        });

        Ok(EngineProcess {
            child: Some(child),
            port: bound,
            instance,
        })
    }
}

/// A running engine. Dropping the handle kills the process.
#[derive(Debug)]
pub struct EngineProcess {
    child: Option<Child>,
    port: u16,
    instance: usize,
}

impl EngineProcess {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn address(&self, ip: IpAddr) -> SocketAddr {
        SocketAddr::new(ip, self.port)
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Kills the engine and waits for it. Later calls do nothing.
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill().await {
                warn!("Killing engine {} failed: {}", self.instance, err);
            }
            debug!("Engine {} on port {} stopped", self.instance, self.port);
        }
        Ok(())
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
    }
}
