//! Drive client facade.

use serde::{de::DeserializeOwned, Serialize};

use adrive_common::{Result, SecretToken};

use crate::auth::{AccessGrant, Authenticator, Credentials, TokenManager};
use crate::config::DriveConfig;
use crate::transport::Transport;

/// Client for one drive account.
///
/// All operations are async and may be called concurrently through a shared
/// reference; the only internal synchronisation is around token refresh.
/// Dropping an operation's future cancels its in-flight request.
pub struct Drive {
    pub(crate) config: DriveConfig,
    pub(crate) transport: Transport,
    tokens: TokenManager,
}

impl Drive {
    /// Create a client holding only a refresh token.
    ///
    /// No request is made until the first operation needs an access token.
    ///
    /// # Errors
    /// - Invalid configuration
    pub fn new(config: DriveConfig, refresh_token: impl Into<String>) -> Result<Self> {
        let refresh_token = SecretToken::new(refresh_token);
        Self::build(config, |auth, margin| {
            TokenManager::new(auth, refresh_token, margin)
        })
    }

    /// Create a client and exchange the refresh token immediately.
    ///
    /// # Errors
    /// - Invalid configuration
    /// - The refresh token is rejected
    pub async fn connect(config: DriveConfig, refresh_token: impl Into<String>) -> Result<Self> {
        let drive = Self::new(config, refresh_token)?;
        drive.tokens.access().await?;
        Ok(drive)
    }

    /// Create a client from credentials obtained earlier.
    pub fn with_credentials(config: DriveConfig, credentials: Credentials) -> Result<Self> {
        Self::build(config, |auth, margin| {
            TokenManager::with_credentials(auth, credentials, margin)
        })
    }

    fn build(
        config: DriveConfig,
        tokens: impl FnOnce(Authenticator, std::time::Duration) -> TokenManager,
    ) -> Result<Self> {
        config.validate()?;
        let transport = Transport::new(&config)?;
        let authenticator = Authenticator::new(transport.clone(), &config.endpoints);
        let tokens = tokens(authenticator, config.refresh_margin());

        Ok(Self {
            config,
            transport,
            tokens,
        })
    }

    /// Get the configuration this client was built with.
    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Current credentials (useful for saving the rotated refresh token).
    pub async fn credentials(&self) -> Option<Credentials> {
        self.tokens.credentials().await
    }

    /// The refresh token the next exchange will use.
    pub async fn refresh_token(&self) -> SecretToken {
        self.tokens.refresh_token().await
    }

    /// Get a valid access grant, refreshing if necessary.
    pub async fn ensure_valid_token(&self) -> Result<AccessGrant> {
        self.tokens.access().await
    }

    /// POST `body` to an API path with the grant's bearer token.
    pub(crate) async fn api_post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        grant: &AccessGrant,
        body: &B,
    ) -> Result<T> {
        let url = self.config.endpoints.api(path);
        self.transport
            .post_json(&url, Some(grant.access_token.expose()), body)
            .await
    }
}
