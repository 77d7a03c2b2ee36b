//! PostgREST-backed credential lookup

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::credentials::{CredentialError, CredentialValidator};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct UserRow {
    password: String,
}

/// Looks users up in a `users` table exposed over PostgREST
#[derive(Clone)]
pub struct RestCredentialStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestCredentialStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, CredentialError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(CredentialError::Request)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn users_url(&self) -> String {
        format!("{}/rest/v1/users", self.base_url)
    }

    /// Fetch the stored password for a user, `None` if there is no such row
    pub async fn stored_password(&self, username: &str) -> Result<Option<String>, CredentialError> {
        let response = self
            .client
            .get(self.users_url())
            .query(&[("username", format!("eq.{username}")), ("select", "password".to_string())])
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await
            .map_err(CredentialError::Request)?;

        if response.status() == StatusCode::NOT_ACCEPTABLE {
            // No rows found
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let row: UserRow = response.json().await.map_err(CredentialError::Parse)?;
        Ok(Some(row.password))
    }
}

impl CredentialValidator for RestCredentialStore {
    fn validate<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<bool, CredentialError>> {
        Box::pin(async move {
            let stored = self.stored_password(username).await?;
            if stored.is_none() {
                debug!(username = %username, "No such user");
            }
            Ok(stored.is_some_and(|stored| stored == password))
        })
    }
}
