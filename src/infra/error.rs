use std::error::Error;
use std::fmt;
use std::io;
use std::time::Duration;

#[derive(Debug)]
pub enum GymError {
    Config { key: String, message: String },
    Launch { message: String },
    Io(io::Error),
    Protocol { message: String },
    EngineTimeout { after: Duration },
    SessionClosed,
    NotActive,
    InvalidActions { expected: usize, got: usize },
}

impl GymError {
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        GymError::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn launch(message: impl Into<String>) -> Self {
        GymError::Launch {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        GymError::Protocol {
            message: message.into(),
        }
    }
}

impl fmt::Display for GymError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GymError::Config { key, message } => {
                write!(formatter, "Invalid configuration for {}: {}", key, message)
            }
            GymError::Launch { message } => write!(formatter, "Engine launch failed: {}", message),
            GymError::Io(err) => write!(formatter, "I/O error: {}", err),
            GymError::Protocol { message } => write!(formatter, "Protocol error: {}", message),
            GymError::EngineTimeout { after } => {
                write!(formatter, "Engine did not reply within {:?}", after)
            }
            GymError::SessionClosed => write!(formatter, "Session already closed"),
            GymError::NotActive => {
                write!(formatter, "Environment has no active episode, call reset first")
            }
            GymError::InvalidActions { expected, got } => {
                write!(formatter, "Expected {} actions, got {}", expected, got)
            }
        }
    }
}

impl Error for GymError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GymError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for GymError {
    fn from(err: io::Error) -> Self {
        GymError::Io(err)
    }
}

impl From<prost::DecodeError> for GymError {
    fn from(err: prost::DecodeError) -> Self {
        GymError::protocol(err.to_string())
    }
}

impl From<prost::EncodeError> for GymError {
    fn from(err: prost::EncodeError) -> Self {
        GymError::protocol(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GymError>;
