//! Application state shared across sessions

use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::game::{RoomRegistry, RoomSettings};
use crate::store::CredentialValidator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rooms: Arc<RoomRegistry>,
    pub credentials: Arc<dyn CredentialValidator>,
    /// One permit per live session
    pub connection_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: Config, credentials: Arc<dyn CredentialValidator>) -> Self {
        let rooms = Arc::new(RoomRegistry::new(RoomSettings::from_config(&config)));
        let connection_slots = Arc::new(Semaphore::new(config.max_connections));

        Self {
            config: Arc::new(config),
            rooms,
            credentials,
            connection_slots,
        }
    }
}
