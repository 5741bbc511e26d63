mod error;
mod launcher;
mod observer;
mod port;
pub mod session;
mod types;

pub use error::{GymError, Result};
pub use launcher::{EngineLauncher, EngineProcess, MAX_STARTUP_LINES, PORT_MARKER};
pub use observer::{DefaultObserver, EpisodeObserver};
pub use port::find_available_port;
pub use session::{Connector, EngineSession, EngineSetup, ExchangeRecorder, TcpConnector, TcpSession};
pub use types::{AttackMode, COORDINATE_FACTOR, Position, Team, UnitCommand};
