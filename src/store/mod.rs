//! Credential stores

pub mod credentials;
pub mod rest;

pub use credentials::{CredentialError, CredentialValidator, FileCredentialStore};
pub use rest::RestCredentialStore;

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;

/// Build the credential store the configuration asks for
pub fn credentials_from_config(
    config: &Config,
) -> Result<Arc<dyn CredentialValidator>, CredentialError> {
    if let Some(url) = &config.credentials_url {
        let api_key = config.credentials_api_key.as_deref().unwrap_or_default();
        info!(url = %url, "Using REST credential store");
        return Ok(Arc::new(RestCredentialStore::new(url, api_key)?));
    }

    match &config.credentials_file {
        Some(path) => {
            let store = FileCredentialStore::from_path(path)?;
            info!(path = %path.display(), users = store.len(), "Loaded credentials file");
            Ok(Arc::new(store))
        }
        None => {
            warn!("No credential store configured, using the demo roster");
            Ok(Arc::new(FileCredentialStore::demo()))
        }
    }
}
