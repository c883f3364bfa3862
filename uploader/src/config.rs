//! Process-wide settings, read once from the environment.

use crate::chunk::CHUNK_GRANULARITY;
use crate::error::UploadError;

/// Google OAuth2 token endpoint used for refresh token exchange.
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Media upload endpoint for `videos.insert`.
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/youtube/v3/videos";
/// Metadata endpoint for the `videos` resource (used for deletion).
const VIDEOS_URL: &str = "https://www.googleapis.com/youtube/v3/videos";

pub const CLIENT_ID_VAR: &str = "YOUTUBE_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "YOUTUBE_CLIENT_SECRET";
pub const REFRESH_TOKEN_VAR: &str = "YOUTUBE_REFRESH_TOKEN";
pub const CHUNK_SIZE_VAR: &str = "RECORDING_UPLOAD_CHUNK_SIZE";

/// OAuth client credentials plus the long-lived refresh token.
///
/// Any of the three may be missing when loaded; that only becomes an error once a
/// network call needs them (see [`Credentials::require`]).
#[derive(Clone, Default)]
pub struct Credentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print the secrets themselves
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Borrowed view of a complete set of credentials.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CompleteCredentials<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub refresh_token: &'a str,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// Reads the three credentials from `YOUTUBE_CLIENT_ID`, `YOUTUBE_CLIENT_SECRET`
    /// and `YOUTUBE_REFRESH_TOKEN`.
    ///
    /// Unset and blank variables both count as missing.
    pub fn from_env() -> Self {
        Self {
            client_id: non_empty_var(CLIENT_ID_VAR),
            client_secret: non_empty_var(CLIENT_SECRET_VAR),
            refresh_token: non_empty_var(REFRESH_TOKEN_VAR),
        }
    }

    /// Returns all three credentials, or a [`UploadError::Configuration`] naming the
    /// ones that are missing.
    pub(crate) fn require(&self) -> Result<CompleteCredentials<'_>, UploadError> {
        match (
            self.client_id.as_deref(),
            self.client_secret.as_deref(),
            self.refresh_token.as_deref(),
        ) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => {
                Ok(CompleteCredentials {
                    client_id,
                    client_secret,
                    refresh_token,
                })
            }
            _ => {
                let missing: Vec<_> = [
                    (CLIENT_ID_VAR, self.client_id.is_none()),
                    (CLIENT_SECRET_VAR, self.client_secret.is_none()),
                    (REFRESH_TOKEN_VAR, self.refresh_token.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, missing)| missing.then_some(name))
                .collect();
                Err(UploadError::Configuration(format!(
                    "missing video host credentials: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

/// The provider URLs the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub token_url: String,
    pub upload_url: String,
    pub videos_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token_url: TOKEN_URL.to_string(),
            upload_url: UPLOAD_URL.to_string(),
            videos_url: VIDEOS_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Roots every endpoint under `base`, keeping the production paths.
    ///
    /// Mostly useful for pointing the client at a mock server.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            token_url: format!("{base}/token"),
            upload_url: format!("{base}/upload/youtube/v3/videos"),
            videos_url: format!("{base}/youtube/v3/videos"),
        }
    }
}

/// Everything a [`crate::VideoHostClient`] needs to be constructed.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub endpoints: Endpoints,
    /// Bytes per chunk PUT. The client normalizes this to a non-zero multiple of
    /// [`CHUNK_GRANULARITY`] with [`normalize_chunk_size`].
    pub chunk_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            endpoints: Endpoints::default(),
            chunk_size: CHUNK_GRANULARITY,
        }
    }
}

impl Config {
    /// Loads credentials and the chunk size from the environment, with production
    /// endpoints.
    ///
    /// An unparseable `RECORDING_UPLOAD_CHUNK_SIZE` is logged and ignored rather than
    /// treated as fatal.
    pub fn from_env() -> Self {
        let chunk_size = match std::env::var(CHUNK_SIZE_VAR) {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(n) => normalize_chunk_size(n),
                Err(e) => {
                    tracing::warn!(value = raw, error = %e, "ignoring unparseable {CHUNK_SIZE_VAR}");
                    CHUNK_GRANULARITY
                }
            },
            Err(_) => CHUNK_GRANULARITY,
        };
        Self {
            credentials: Credentials::from_env(),
            endpoints: Endpoints::default(),
            chunk_size,
        }
    }
}

/// The host only accepts non-final chunks that are multiples of 256 KiB.
pub fn normalize_chunk_size(requested: u64) -> u64 {
    (requested / CHUNK_GRANULARITY).max(1) * CHUNK_GRANULARITY
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
