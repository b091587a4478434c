// Sign-in service - Username validation, backend liveness and the stored user
use crate::application::amper_api::{AmperApi, FetchError};
use crate::domain::username::{validate_username, UsernameError};
use crate::infrastructure::store::FileStore;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignInError {
    #[error(transparent)]
    InvalidUsername(#[from] UsernameError),

    #[error("Backend is not reachable: {0}")]
    BackendUnavailable(#[source] FetchError),

    #[error("Failed to store username: {0:#}")]
    Storage(anyhow::Error),
}

#[derive(Clone)]
pub struct SignInService {
    api: Arc<dyn AmperApi>,
    store: FileStore,
}

impl SignInService {
    pub fn new(api: Arc<dyn AmperApi>, store: FileStore) -> Self {
        Self { api, store }
    }

    /// Validate the username, check the backend is up, then remember the user.
    pub async fn sign_in(&self, raw_username: &str) -> Result<String, SignInError> {
        let username = validate_username(raw_username)?;

        self.api
            .health_check()
            .await
            .map_err(SignInError::BackendUnavailable)?;

        self.store
            .save_username(&username)
            .await
            .map_err(SignInError::Storage)?;

        Ok(username)
    }

    /// The previously signed-in user, if any.
    pub async fn restore(&self) -> Option<String> {
        self.store
            .get_username()
            .await
            .filter(|username| !username.trim().is_empty())
    }

    pub async fn sign_out(&self) -> anyhow::Result<()> {
        self.store.clear_all().await
    }
}
