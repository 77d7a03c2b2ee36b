//! Per-connection session: handshake, input relay and broadcast pump

use futures::StreamExt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{Room, RoomRegistry, Seat};
use crate::net::protocol::{
    parse_client_line, Command, Handshake, HandshakeError, ServerMsg, MAX_LINE_LEN,
};
use crate::util::rate_limit::PlayerRateLimiter;

/// Inbound `\n`-delimited frames, capped at `MAX_LINE_LEN` bytes
type LineReader = FramedRead<OwnedReadHalf, AnyDelimiterCodec>;

fn line_reader(reader: OwnedReadHalf) -> LineReader {
    let codec = AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\n".to_vec(), MAX_LINE_LEN);
    FramedRead::new(reader, codec)
}

/// Next line, decoded lossily so stray bytes never end a session.
/// `Ok(None)` at end of stream; an oversized line is an error.
async fn next_line(lines: &mut LineReader) -> Result<Option<String>, AnyDelimiterCodecError> {
    match lines.next().await {
        Some(Ok(frame)) => Ok(Some(String::from_utf8_lossy(&frame).into_owned())),
        Some(Err(e)) => Err(e),
        None => Ok(None),
    }
}

/// Detaches the player when the session ends, whichever way it ends
struct SeatGuard {
    rooms: Arc<RoomRegistry>,
    room: Arc<Room>,
    seat_id: u64,
    username: String,
    session_id: Uuid,
}

impl Drop for SeatGuard {
    fn drop(&mut self) {
        let removed = self.rooms.leave(&self.room, self.seat_id);
        debug!(
            session_id = %self.session_id,
            room = %self.room.name(),
            room_removed = removed,
            rooms = self.rooms.room_count(),
            "Seat released"
        );
    }
}

/// Drive one client connection to completion
pub async fn handle_connection(stream: TcpStream, peer: SocketAddr, state: AppState) {
    let session_id = Uuid::new_v4();
    info!(session_id = %session_id, peer = %peer, "Client connected");

    let (reader, mut writer) = stream.into_split();
    let mut lines = line_reader(reader);
    let write_timeout = state.config.write_timeout;

    // An idle socket must not hold its connection slot forever
    let first = match timeout(state.config.handshake_timeout, next_line(&mut lines)).await {
        Ok(Ok(Some(line))) => line,
        Ok(Ok(None)) => {
            debug!(session_id = %session_id, "Closed before handshake");
            return;
        }
        Ok(Err(e)) => {
            warn!(session_id = %session_id, error = %e, "Failed to read handshake");
            return;
        }
        Err(_) => {
            info!(session_id = %session_id, peer = %peer, "Handshake timed out");
            return;
        }
    };

    match handshake(&first, &state, session_id).await {
        Ok((guard, seat)) => {
            if let Err(e) = write_line(&mut writer, &ServerMsg::Success, write_timeout).await {
                warn!(session_id = %session_id, error = %e, "Failed to send handshake reply");
                return;
            }

            info!(
                session_id = %session_id,
                room = %guard.room.name(),
                username = %guard.username,
                "Session attached"
            );

            run_attached(&guard, seat, lines, writer, &state).await;
        }
        Err(reason) => {
            info!(session_id = %session_id, peer = %peer, reason = %reason, "Handshake refused");
            let _ = write_line(&mut writer, &ServerMsg::Error(reason), write_timeout).await;
            let _ = writer.shutdown().await;
        }
    }

    info!(session_id = %session_id, "Client disconnected");
}

/// Validate the first line and seat the player in a room
async fn handshake(
    line: &str,
    state: &AppState,
    session_id: Uuid,
) -> Result<(SeatGuard, Seat), HandshakeError> {
    let hs = Handshake::parse(line)?;
    debug!(
        session_id = %session_id,
        command = ?hs.command,
        address = %hs.address,
        username = %hs.username,
        room = %hs.room,
        "Handshake received"
    );

    match state.credentials.validate(&hs.username, &hs.password).await {
        Ok(true) => {}
        Ok(false) => return Err(HandshakeError::InvalidCredentials),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Credential store failure");
            return Err(HandshakeError::Database);
        }
    }

    let (room, seat) = match hs.command {
        Command::Create => state.rooms.create(&hs.room, &hs.username)?,
        Command::Join => state.rooms.join(&hs.room, &hs.username)?,
    };

    let guard = SeatGuard {
        rooms: Arc::clone(&state.rooms),
        room,
        seat_id: seat.id,
        username: hs.username,
        session_id,
    };

    Ok((guard, seat))
}

/// Relay input lines into the room until either side of the socket stops
async fn run_attached(
    guard: &SeatGuard,
    seat: Seat,
    mut lines: LineReader,
    writer: OwnedWriteHalf,
    state: &AppState,
) {
    let session_id = guard.session_id;
    let rate_limiter = PlayerRateLimiter::new(state.config.fire_rate_limit);

    let mut writer_handle = tokio::spawn(pump_events(
        seat.events,
        writer,
        state.config.write_timeout,
        session_id,
    ));

    loop {
        tokio::select! {
            line = next_line(&mut lines) => match line {
                Ok(Some(line)) => handle_line(guard, &line, &rate_limiter),
                Ok(None) => break,
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Read failed");
                    break;
                }
            },
            _ = &mut writer_handle => {
                debug!(session_id = %session_id, "Writer stopped");
                break;
            }
        }
    }

    // Abandon any write still in flight
    writer_handle.abort();
}

fn handle_line(guard: &SeatGuard, line: &str, rate_limiter: &PlayerRateLimiter) {
    let Some(event) = parse_client_line(line) else {
        debug!(session_id = %guard.session_id, line = %line, "Ignoring line");
        return;
    };

    if event.is_fire_press() && !rate_limiter.check_fire() {
        warn!(session_id = %guard.session_id, username = %guard.username, "Rate limited fire input");
        return;
    }

    guard.room.apply_key(&guard.username, event);
}

/// Forward room broadcasts to the socket
async fn pump_events(
    mut events: broadcast::Receiver<ServerMsg>,
    mut writer: OwnedWriteHalf,
    write_timeout: Duration,
    session_id: Uuid,
) {
    loop {
        match events.recv().await {
            Ok(msg) => {
                if let Err(e) = write_line(&mut writer, &msg, write_timeout).await {
                    debug!(session_id = %session_id, error = %e, "Socket write failed");
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    session_id = %session_id,
                    lagged_count = n,
                    "Client lagged, skipping {} messages", n
                );
                // Continue - don't disconnect for lag
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(session_id = %session_id, "Room channel closed");
                break;
            }
        }
    }

    let _ = writer.shutdown().await;
}

/// Write one message as a line, bounded by `limit`
async fn write_line(
    writer: &mut OwnedWriteHalf,
    msg: &ServerMsg,
    limit: Duration,
) -> io::Result<()> {
    let line = msg.to_line();
    match timeout(limit, writer.write_all(line.as_bytes())).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out")),
    }
}
