//! Session engine: owns the socket, runs the receive and process pumps,
//! and hands callers a cheaply-cloneable [`SessionHandle`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mc_protocol::{Encode, VarInt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use crate::dispatch;
use crate::error::{Result, SessionError};
use crate::event::Handlers;
use crate::framer::{self, ScanResult};
use crate::packets::{self, Handshake, LoginStart};
use crate::state::{ProtocolState, SessionInfo};

/// Protocol version this client speaks — 1.8.x.
pub const PROTOCOL_VERSION: i32 = 47;

/// Shared write half plus the framing logic for outbound packets; the
/// single lock here is what lets `send_packet` (caller threads) and the
/// Keep-Alive echo path (process pump) share one socket safely.
pub(crate) struct Writer {
    half: Mutex<OwnedWriteHalf>,
}

impl Writer {
    pub(crate) async fn write_raw(&self, bytes: &[u8]) -> Result<()> {
        let mut half = self.half.lock().await;
        half.write_all(bytes).await.map_err(SessionError::Compression)?;
        half.flush().await.map_err(SessionError::Compression)?;
        Ok(())
    }

    pub(crate) async fn send_packet(
        &self,
        packet_id: i32,
        data: &[u8],
        threshold: Option<i32>,
    ) -> Result<()> {
        let frame = framer::build_frame(packet_id, data, threshold)?;
        self.write_raw(&frame).await
    }
}

/// Mutable state the dispatch tables read and update as packets arrive.
pub(crate) struct SessionContext {
    pub state: ProtocolState,
    pub info: SessionInfo,
    pub handlers: Handlers,
}

/// A cheaply-cloneable handle to a running session. Multiple callers may
/// hold one and call `send_packet` concurrently.
#[derive(Clone)]
pub struct SessionHandle {
    writer: Arc<Writer>,
    threshold: Arc<std::sync::Mutex<Option<i32>>>,
    alive: Arc<AtomicBool>,
    pub handlers: Handlers,
}

impl SessionHandle {
    pub async fn send_packet(&self, packet_id: i32, data: &[u8]) -> Result<()> {
        if !self.alive.load(Ordering::Acquire) {
            return Err(SessionError::ConnectionClosed);
        }
        let threshold = *self.threshold.lock().unwrap();
        self.writer.send_packet(packet_id, data, threshold).await
    }

    pub fn close(&self) {
        self.alive.store(false, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

pub struct Session;

impl Session {
    /// Establishes the TCP connection. Separate from `login_as` so callers
    /// can observe connect failures distinctly from protocol failures.
    pub async fn connect(host: &str, port: u16) -> Result<TcpStream> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(SessionError::Compression)?;
        info!(%addr, "connected");
        Ok(stream)
    }

    /// Sends Handshake + Login Start over `stream`, then spawns the
    /// receive and process pumps and returns a handle to the running
    /// session.
    pub async fn login_as(stream: TcpStream, host: &str, port: u16, nickname: &str) -> Result<SessionHandle> {
        let (read_half, write_half) = stream.into_split();
        let writer = Arc::new(Writer {
            half: Mutex::new(write_half),
        });
        let threshold = Arc::new(std::sync::Mutex::new(None));
        let alive = Arc::new(AtomicBool::new(true));
        let handlers = Handlers::default();

        let mut handshake_data = Vec::new();
        Handshake {
            protocol_version: VarInt(PROTOCOL_VERSION),
            server_address: host.to_string(),
            server_port: port,
            next_state: VarInt(2),
        }
        .encode(&mut handshake_data)?;
        writer
            .send_packet(packets::handshaking::SERVERBOUND_HANDSHAKE, &handshake_data, None)
            .await?;

        let mut login_start_data = Vec::new();
        LoginStart {
            name: nickname.to_string(),
        }
        .encode(&mut login_start_data)?;
        writer
            .send_packet(packets::login::LOGIN_START, &login_start_data, None)
            .await?;
        info!(%nickname, "sent login start");

        let handle = SessionHandle {
            writer: writer.clone(),
            threshold: threshold.clone(),
            alive: alive.clone(),
            handlers: handlers.clone(),
        };

        let inbound = Arc::new(Mutex::new(Vec::<u8>::new()));
        let notify = Arc::new(Notify::new());

        tokio::spawn(receive_pump(
            read_half,
            inbound.clone(),
            notify.clone(),
            alive.clone(),
        ));

        let info = SessionInfo {
            player_name: nickname.to_string(),
            ..Default::default()
        };
        tokio::spawn(process_pump(
            inbound,
            notify,
            writer,
            threshold,
            alive,
            handlers,
            info,
        ));

        Ok(handle)
    }
}

async fn receive_pump(
    mut read_half: tokio::net::tcp::OwnedReadHalf,
    inbound: Arc<Mutex<Vec<u8>>>,
    notify: Arc<Notify>,
    alive: Arc<AtomicBool>,
) {
    let mut buf = [0u8; 4096];
    loop {
        if !alive.load(Ordering::Acquire) {
            break;
        }
        match read_half.read(&mut buf).await {
            Ok(0) => {
                debug!("peer closed the connection");
                alive.store(false, Ordering::Release);
                notify.notify_one();
                break;
            }
            Ok(n) => {
                inbound.lock().await.extend_from_slice(&buf[..n]);
                notify.notify_one();
            }
            Err(e) => {
                warn!(error = %e, "receive error");
                alive.store(false, Ordering::Release);
                notify.notify_one();
                break;
            }
        }
    }
}

async fn next_frame(
    inbound: &Mutex<Vec<u8>>,
    notify: &Notify,
    threshold: &std::sync::Mutex<Option<i32>>,
    alive: &AtomicBool,
) -> Option<std::result::Result<framer::Frame, SessionError>> {
    loop {
        if !alive.load(Ordering::Acquire) {
            return None;
        }
        let mut guard = inbound.lock().await;
        match framer::scan(&guard) {
            ScanResult::Complete { frame_len } => {
                let current_threshold = *threshold.lock().unwrap();
                return Some(framer::extract_frame(&mut guard, frame_len, current_threshold));
            }
            ScanResult::Incomplete => {
                drop(guard);
                notify.notified().await;
            }
        }
    }
}

async fn process_pump(
    inbound: Arc<Mutex<Vec<u8>>>,
    notify: Arc<Notify>,
    writer: Arc<Writer>,
    threshold: Arc<std::sync::Mutex<Option<i32>>>,
    alive: Arc<AtomicBool>,
    handlers: Handlers,
    info: SessionInfo,
) {
    let mut ctx = SessionContext {
        state: ProtocolState::Login,
        info,
        handlers,
    };

    loop {
        let Some(frame_result) = next_frame(&inbound, &notify, &threshold, &alive).await else {
            break;
        };
        let frame = match frame_result {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                continue;
            }
        };

        let outcome = match ctx.state {
            ProtocolState::Login => dispatch::login::handle(&mut ctx, &writer, &threshold, frame).await,
            ProtocolState::Play => dispatch::play::handle(&mut ctx, &writer, frame).await,
            ProtocolState::Handshaking | ProtocolState::Disconnected => Ok(()),
        };

        if let Err(e) = outcome {
            match e {
                SessionError::Disconnected { reason } => {
                    info!(%reason, "server disconnected us");
                    let from = ctx.state;
                    ctx.state = ProtocolState::Disconnected;
                    ctx.handlers.emit_state(crate::event::StateEvent {
                        from,
                        to: ctx.state,
                    });
                    alive.store(false, Ordering::Release);
                    break;
                }
                SessionError::UnknownPacket { id, state } => {
                    warn!(id, ?state, "unknown packet id, discarding");
                }
                other => {
                    // Malformed frames and unsupported packets (eg. Encryption
                    // Request) desync the decoder/state machine if we keep
                    // going — fatal for the session, same as an explicit
                    // Disconnect.
                    warn!(error = %other, "fatal session error, disconnecting");
                    let from = ctx.state;
                    ctx.state = ProtocolState::Disconnected;
                    ctx.handlers.emit_state(crate::event::StateEvent {
                        from,
                        to: ctx.state,
                    });
                    alive.store(false, Ordering::Release);
                    break;
                }
            }
        }
    }
}
