//! Credential validation

use futures::future::{self, BoxFuture};
use std::collections::HashMap;
use std::path::Path;

/// Password the demo roster uses for every account
const DEMO_PASSWORD: &str = "123456";
const DEMO_USERS: [&str; 5] = ["user1", "user2", "user3", "user4", "user5"];

/// Checks a username/password pair against some backing store
pub trait CredentialValidator: Send + Sync {
    /// `Ok(false)` for an unknown user or wrong password; `Err` only when
    /// the store itself failed
    fn validate<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<bool, CredentialError>>;
}

/// Credential store errors
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Failed to read credentials file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed credentials file: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(#[source] reqwest::Error),
}

/// In-memory roster, loaded from a JSON object of `username -> password`
#[derive(Debug, Clone, Default)]
pub struct FileCredentialStore {
    users: HashMap<String, String>,
}

impl FileCredentialStore {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CredentialError> {
        let users: HashMap<String, String> = serde_json::from_str(raw)?;
        Ok(Self { users })
    }

    pub fn from_users<I, U, P>(users: I) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: Into<String>,
    {
        Self {
            users: users
                .into_iter()
                .map(|(u, p)| (u.into(), p.into()))
                .collect(),
        }
    }

    /// `user1`..`user5`, all with password `123456`
    pub fn demo() -> Self {
        Self::from_users(DEMO_USERS.iter().map(|u| (*u, DEMO_PASSWORD)))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl CredentialValidator for FileCredentialStore {
    fn validate<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<bool, CredentialError>> {
        let valid = self
            .users
            .get(username)
            .is_some_and(|stored| stored == password);
        Box::pin(future::ready(Ok(valid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_roster() {
        let store = FileCredentialStore::demo();
        assert_eq!(store.len(), 5);
        assert!(tokio_test::block_on(store.validate("user3", "123456")).unwrap());
        assert!(!tokio_test::block_on(store.validate("user3", "nope")).unwrap());
        assert!(!tokio_test::block_on(store.validate("user9", "123456")).unwrap());
    }

    #[test]
    fn test_from_json() {
        let store = FileCredentialStore::from_json(r#"{"alice":"pw","bob":"hunter2"}"#).unwrap();
        assert!(tokio_test::block_on(store.validate("bob", "hunter2")).unwrap());
        assert!(!tokio_test::block_on(store.validate("alice", "hunter2")).unwrap());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = FileCredentialStore::from_json(r#"["alice"]"#).unwrap_err();
        assert!(matches!(err, CredentialError::Format(_)));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = FileCredentialStore::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, CredentialError::Io(_)));
    }
}
