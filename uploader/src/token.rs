//! Access token lifecycle: expiry tracking and refresh.

use crate::config::Credentials;
use crate::error::UploadError;
use crate::oauth::OAuthManager;
use jiff::{SignedDuration, Timestamp};
use oauth2::TokenResponse;
use oauth2::basic::BasicTokenResponse;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::instrument;

/// How long before the provider's stated expiry we stop trusting a token.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
/// Assumed lifetime when the provider doesn't say.
const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// A bearer token together with the moment we stop using it.
#[derive(Clone)]
pub struct TimeBoundAccessToken {
    secret: String,
    expires_at: Timestamp,
}

impl std::fmt::Debug for TimeBoundAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeBoundAccessToken")
            .field("secret", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl TimeBoundAccessToken {
    /// Wraps a fresh token response, computing expiry as `now + expires_in - 60s`.
    pub fn issued_at(token: &BasicTokenResponse, now: Timestamp) -> Self {
        let lifetime = token
            .expires_in()
            .unwrap_or(DEFAULT_LIFETIME)
            .saturating_sub(EXPIRY_MARGIN);
        let lifetime = SignedDuration::try_from(lifetime).unwrap_or(SignedDuration::ZERO);
        Self {
            secret: token.access_token().secret().clone(),
            expires_at: now.checked_add(lifetime).unwrap_or(now),
        }
    }

    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }
}

/// Owns the one access token shared by every request a client makes.
///
/// The token sits behind an async mutex that is held for the duration of a refresh,
/// so concurrent callers that all find the token expired end up waiting on a single
/// exchange rather than each performing their own.
#[derive(Debug)]
pub struct TokenManager {
    credentials: Credentials,
    oauth: OAuthManager,
    token: Mutex<Option<TimeBoundAccessToken>>,
}

impl TokenManager {
    pub fn new(credentials: Credentials, oauth: OAuthManager) -> Self {
        Self {
            credentials,
            oauth,
            token: Mutex::new(None),
        }
    }

    /// Returns a bearer token that is valid right now, refreshing first if there is
    /// none yet or the current one has expired.
    ///
    /// Fails with [`UploadError::Configuration`] before touching the network when any
    /// credential is missing.
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    pub async fn ensure_valid_token(&self) -> Result<String, UploadError> {
        let credentials = self.credentials.require()?;
        let mut token = self.token.lock().await;
        match &*token {
            Some(current) if current.is_valid_at(Timestamp::now()) => {
                return Ok(current.secret().to_string());
            }
            Some(_) => tracing::debug!("access token expired, refreshing"),
            None => tracing::debug!("no access token yet, refreshing"),
        }
        let fresh = self.exchange(credentials).await?;
        let secret = fresh.secret().to_string();
        *token = Some(fresh);
        Ok(secret)
    }

    /// Unconditionally exchanges the refresh token for a new access token.
    ///
    /// Used after the host rejects a token we believed to be valid.
    #[instrument(skip(self))]
    pub async fn refresh_access_token(&self) -> Result<String, UploadError> {
        let credentials = self.credentials.require()?;
        let mut token = self.token.lock().await;
        let fresh = self.exchange(credentials).await?;
        let secret = fresh.secret().to_string();
        *token = Some(fresh);
        Ok(secret)
    }

    /// When the current token stops being used, if there is one.
    pub async fn expires_at(&self) -> Option<Timestamp> {
        self.token.lock().await.as_ref().map(|t| t.expires_at())
    }

    /// Forgets the current token so the next call has to refresh.
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }

    async fn exchange(
        &self,
        credentials: crate::config::CompleteCredentials<'_>,
    ) -> Result<TimeBoundAccessToken, UploadError> {
        let response = self.oauth.exchange_refresh_token(credentials).await?;
        let token = TimeBoundAccessToken::issued_at(&response, Timestamp::now());
        tracing::debug!(expires_at = %token.expires_at(), "access token refreshed");
        Ok(token)
    }
}
