//! TCP front end: accept loop and per-client sessions

pub mod protocol;
pub mod session;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::app::AppState;

/// Pause after a failed accept so a persistent error does not spin
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// Accept connections until `shutdown` resolves. Each connection holds a
/// slot from `AppState::connection_slots` for its whole life.
pub async fn serve(listener: TcpListener, state: AppState, shutdown: impl Future<Output = ()>) {
    tokio::pin!(shutdown);

    loop {
        let permit = tokio::select! {
            _ = &mut shutdown => break,
            permit = Arc::clone(&state.connection_slots).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            },
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %peer, error = %e, "Failed to set TCP_NODELAY");
        }

        let state = state.clone();
        tokio::spawn(async move {
            session::handle_connection(stream, peer, state).await;
            drop(permit);
        });
    }

    info!(
        rooms = state.rooms.room_count(),
        players = state.rooms.player_count(),
        "Accept loop stopped"
    );
}
