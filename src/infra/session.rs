use prost::{Message, bytes::BytesMut};
use std::fs::File;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::{OffsetDateTime, format_description};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::engine_interface::{Command, Request, Setup, State};
use crate::state::Snapshot;

use super::error::{GymError, Result};
use super::types::UnitCommand;

/// Upper bound for a single decoded frame; anything larger is a broken stream.
const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Engine options negotiated once per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSetup {
    pub speed: i32,
    pub gui: i32,
    pub frame_skip: i32,
}

impl From<&EngineSetup> for Setup {
    fn from(setup: &EngineSetup) -> Self {
        Setup {
            combine_frames: 1,
            speed: setup.speed,
            gui: setup.gui,
            frame_skip: setup.frame_skip,
            cmd_optim: 1,
            micro_battles: true,
        }
    }
}

/// A strictly alternating request/reply channel to one engine instance.
///
/// Every call suspends until the engine answers with its next snapshot.
#[allow(async_fn_in_trait)]
pub trait EngineSession {
    async fn init(&mut self, setup: &EngineSetup) -> Result<Snapshot>;

    async fn exchange(&mut self, commands: &[UnitCommand]) -> Result<Snapshot>;

    /// Closing an already closed session does nothing.
    async fn close(&mut self) -> Result<()>;
}

/// Opens sessions; slot 0 is the controlled side, slot 1 the self-play opponent.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Session: EngineSession;

    async fn connect(&mut self, slot: usize) -> Result<Self::Session>;
}

pub struct TcpConnector {
    addresses: Vec<SocketAddr>,
    timeout: Option<Duration>,
    log_dir: Option<PathBuf>,
}

impl TcpConnector {
    pub fn new(
        addresses: Vec<SocketAddr>,
        timeout: Option<Duration>,
        log_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            addresses,
            timeout,
            log_dir,
        }
    }
}

impl Connector for TcpConnector {
    type Session = TcpSession;

    async fn connect(&mut self, slot: usize) -> Result<TcpSession> {
        let address = *self
            .addresses
            .get(slot)
            .ok_or_else(|| GymError::launch(format!("no engine instance for session {}", slot)))?;
        let recorder = match &self.log_dir {
            Some(dir) => Some(ExchangeRecorder::new(dir, slot)?),
            None => None,
        };
        TcpSession::connect(address, self.timeout, recorder).await
    }
}

pub struct TcpSession {
    stream: Option<BufStream<TcpStream>>,
    address: SocketAddr,
    timeout: Option<Duration>,
    recorder: Option<ExchangeRecorder>,
}

impl TcpSession {
    pub async fn connect(
        address: SocketAddr,
        timeout: Option<Duration>,
        recorder: Option<ExchangeRecorder>,
    ) -> Result<Self> {
        let stream = TcpStream::connect(address).await?;
        stream.set_nodelay(true)?;
        debug!("Connected to engine at {}", address);
        Ok(TcpSession {
            stream: Some(BufStream::new(stream)),
            address,
            timeout,
            recorder,
        })
    }

    async fn round_trip(&mut self, request: Request) -> Result<State> {
        let stream = self.stream.as_mut().ok_or(GymError::SessionClosed)?;

        let reply = async {
            write_delimited(stream, &request).await?;
            read_delimited::<State, _>(stream).await
        };
        let response = match self.timeout {
            Some(after) => tokio::time::timeout(after, reply)
                .await
                .map_err(|_| GymError::EngineTimeout { after })??,
            None => reply.await?,
        };

        if let Some(ref mut recorder) = self.recorder {
            recorder.append(&request, &response)?;
        }
        Ok(response)
    }
}

impl EngineSession for TcpSession {
    async fn init(&mut self, setup: &EngineSetup) -> Result<Snapshot> {
        let request = Request {
            setup: Some(Setup::from(setup)),
            commands: Vec::new(),
        };
        let state = self.round_trip(request).await?;
        Ok(Snapshot::from(state))
    }

    async fn exchange(&mut self, commands: &[UnitCommand]) -> Result<Snapshot> {
        let request = Request {
            setup: None,
            commands: commands.iter().map(Command::from).collect(),
        };
        let state = self.round_trip(request).await?;
        Ok(Snapshot::from(state))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(err) = stream.shutdown().await {
                warn!("Closing session to {} failed: {}", self.address, err);
            }
            debug!("Session to {} closed", self.address);
        }
        Ok(())
    }
}

pub async fn write_delimited<M, W>(writer: &mut W, message: &M) -> Result<()>
where
    M: Message,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(message.encoded_len() + 10);
    message.encode_length_delimited(&mut buf)?;
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_delimited<M, R>(reader: &mut R) -> Result<M>
where
    M: Message + Default,
    R: AsyncRead + Unpin,
{
    let mut header = Vec::with_capacity(10);
    loop {
        let byte = reader.read_u8().await?;
        header.push(byte);
        if byte & 0x80 == 0 {
            break;
        }
        if header.len() >= 10 {
            return Err(GymError::protocol("length delimiter longer than ten bytes"));
        }
    }

    let len = prost::decode_length_delimiter(header.as_slice())?;
    if len > MAX_FRAME_LEN {
        return Err(GymError::protocol(format!("frame of {} bytes exceeds limit", len)));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(M::decode(body.as_slice())?)
}

/// Appends every request/response pair of one session to a file, as
/// length-delimited protobuf messages.
pub struct ExchangeRecorder {
    file: File,
}

impl ExchangeRecorder {
    pub fn new(log_dir: &Path, slot: usize) -> Result<Self> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let format = format_description::parse("[year][month][day]-[hour][minute][second]")
            .map_err(|err| GymError::protocol(err.to_string()))?;
        let date_time_str = now
            .format(&format)
            .map_err(|err| GymError::protocol(err.to_string()))?;

        let filename = log_dir.join(format!("session{} - {}.exchanges", slot, date_time_str));
        if let Some(parent) = filename.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        debug!("Recording exchanges of session {} to {}", slot, filename.display());
        let file = File::create(filename)?;
        Ok(ExchangeRecorder { file })
    }

    fn append(&mut self, request: &Request, response: &State) -> io::Result<()> {
        self.write_delimited_message(request)?;
        self.write_delimited_message(response)?;
        Ok(())
    }

    fn write_delimited_message<T: Message>(&mut self, message: &T) -> io::Result<()> {
        let mut buf = Vec::new();
        message.encode(&mut buf)?;

        let mut varint_buf = BytesMut::new();
        prost::encode_length_delimiter(buf.len(), &mut varint_buf)?;

        self.file.write_all(&varint_buf)?;
        self.file.write_all(&buf)?;
        self.file.flush()?;
        Ok(())
    }
}
