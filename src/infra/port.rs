use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, TcpListener};

use tracing::debug;

use super::error::{GymError, Result};

/// Returns the first port at or above `start` that can be bound on `ip` right now.
///
/// The probe socket is released before returning, so the port is not reserved:
/// the engine may still lose a race for it, which the launcher reports.
pub fn find_available_port(ip: IpAddr, start: u16) -> Result<u16> {
    let mut port = start;
    loop {
        match TcpListener::bind(SocketAddr::new(ip, port)) {
            Ok(listener) => {
                drop(listener);
                debug!("Port {} is free on {}", port, ip);
                return Ok(port);
            }
            Err(err) if err.kind() == ErrorKind::AddrInUse => {
                debug!("Port {} in use, probing next", port);
                port = port.checked_add(1).ok_or_else(|| {
                    GymError::launch(format!("no free port at or above {} on {}", start, ip))
                })?;
            }
            Err(err) => return Err(err.into()),
        }
    }
}
