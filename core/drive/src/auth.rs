//! Refresh-token authentication and access-token lifecycle.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::time::Duration as StdDuration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use adrive_common::{AuthError, Error, Result, SecretToken};

use crate::config::Endpoints;
use crate::transport::Transport;

const REFRESH_PATH: &str = "/token/refresh";

/// Credentials bound to an authenticated account.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Bearer token for API requests.
    pub access_token: SecretToken,
    /// Token for the next refresh. The service rotates it on every use.
    pub refresh_token: SecretToken,
    /// Instant from which the access token must not be used any more.
    pub expires_at: DateTime<Utc>,
    /// Drive namespace of the account.
    pub drive_id: String,
}

impl Credentials {
    /// Check if the access token is expired, or will be within `margin`.
    pub fn is_expired(&self, margin: StdDuration) -> bool {
        let margin = Duration::from_std(margin).unwrap_or_else(|_| Duration::zero());
        Utc::now() + margin >= self.expires_at
    }

    fn grant(&self) -> AccessGrant {
        AccessGrant {
            access_token: self.access_token.clone(),
            drive_id: self.drive_id.clone(),
        }
    }
}

/// What an authenticated request needs: the bearer token and drive ID.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub access_token: SecretToken,
    pub drive_id: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    default_drive_id: String,
    #[serde(default)]
    refresh_token: String,
}

impl RefreshResponse {
    /// All four fields must be present; a partial answer is never applied.
    fn into_credentials(self, now: DateTime<Utc>) -> std::result::Result<Credentials, AuthError> {
        let missing = if self.access_token.is_empty() {
            Some("access_token")
        } else if self.refresh_token.is_empty() {
            Some("refresh_token")
        } else if self.default_drive_id.is_empty() {
            Some("default_drive_id")
        } else if self.expires_in <= 0 {
            Some("expires_in")
        } else {
            None
        };

        if let Some(missing) = missing {
            return Err(AuthError::RefreshRejected { missing });
        }

        Ok(Credentials {
            access_token: SecretToken::new(self.access_token),
            refresh_token: SecretToken::new(self.refresh_token),
            expires_at: now + Duration::seconds(self.expires_in),
            drive_id: self.default_drive_id,
        })
    }
}

/// Performs the refresh-token exchange.
pub struct Authenticator {
    transport: Transport,
    refresh_url: String,
}

impl Authenticator {
    pub fn new(transport: Transport, endpoints: &Endpoints) -> Self {
        Self {
            transport,
            refresh_url: endpoints.auth(REFRESH_PATH),
        }
    }

    /// Exchange a refresh token for fresh credentials.
    ///
    /// # Postconditions
    /// - Returns a new access token, its expiry, the drive ID and the
    ///   rotated refresh token
    ///
    /// # Errors
    /// - `AuthError::RefreshFailed` on a non-success status
    /// - `AuthError::RefreshRejected` if any returned field is empty or zero
    /// - Network errors
    pub async fn refresh(&self, refresh_token: &str) -> Result<Credentials> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let response = self
            .transport
            .send_json(&self.refresh_url, None, &body)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Token refresh refused");
            return Err(AuthError::RefreshFailed {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("Failed to read refresh response: {}", e)))?;
        let parsed: RefreshResponse = serde_json::from_slice(&bytes)?;

        let credentials = parsed.into_credentials(Utc::now()).map_err(|e| {
            warn!("Token refresh response rejected: {}", e);
            e
        })?;
        debug!(drive_id = %credentials.drive_id, expires_at = %credentials.expires_at, "Token refreshed");
        Ok(credentials)
    }
}

enum TokenState {
    /// Only a refresh token is known; nothing has been exchanged yet.
    Seeded(SecretToken),
    Active(Credentials),
}

impl TokenState {
    fn valid_grant(&self, margin: StdDuration) -> Option<AccessGrant> {
        match self {
            TokenState::Active(creds) if !creds.is_expired(margin) => Some(creds.grant()),
            _ => None,
        }
    }

    fn refresh_token(&self) -> &SecretToken {
        match self {
            TokenState::Seeded(token) => token,
            TokenState::Active(creds) => &creds.refresh_token,
        }
    }
}

/// Token manager that refreshes expired tokens on demand.
///
/// Callers holding a still-valid token only take a read lock. A refresh
/// holds the write lock for the whole exchange, so at most one refresh is
/// in flight and concurrent waiters reuse its result.
pub struct TokenManager {
    authenticator: Authenticator,
    state: RwLock<TokenState>,
    margin: StdDuration,
}

impl TokenManager {
    /// Create a manager that has only a refresh token.
    pub fn new(authenticator: Authenticator, refresh_token: SecretToken, margin: StdDuration) -> Self {
        Self {
            authenticator,
            state: RwLock::new(TokenState::Seeded(refresh_token)),
            margin,
        }
    }

    /// Create a manager from credentials obtained earlier.
    pub fn with_credentials(
        authenticator: Authenticator,
        credentials: Credentials,
        margin: StdDuration,
    ) -> Self {
        Self {
            authenticator,
            state: RwLock::new(TokenState::Active(credentials)),
            margin,
        }
    }

    /// Get a valid access grant, refreshing if necessary.
    ///
    /// # Postconditions
    /// - The returned token is not past its expiry
    ///
    /// # Errors
    /// - Token refresh failed; the previous state is left untouched
    pub async fn access(&self) -> Result<AccessGrant> {
        {
            let state = self.state.read().await;
            if let Some(grant) = state.valid_grant(self.margin) {
                return Ok(grant);
            }
        }

        let mut state = self.state.write().await;

        // Double-check after acquiring write lock
        if let Some(grant) = state.valid_grant(self.margin) {
            return Ok(grant);
        }

        info!("Refreshing access token");

        let credentials = self
            .authenticator
            .refresh(state.refresh_token().expose())
            .await?;
        let grant = credentials.grant();
        *state = TokenState::Active(credentials);

        Ok(grant)
    }

    /// Get the current credentials, if a refresh has happened.
    pub async fn credentials(&self) -> Option<Credentials> {
        match &*self.state.read().await {
            TokenState::Active(creds) => Some(creds.clone()),
            TokenState::Seeded(_) => None,
        }
    }

    /// The refresh token the next exchange will use.
    pub async fn refresh_token(&self) -> SecretToken {
        self.state.read().await.refresh_token().clone()
    }
}
