//! The client handle shared by upload and deletion.

use crate::config::{Config, Endpoints, normalize_chunk_size};
use crate::error::UploadError;
use crate::oauth::OAuthManager;
use crate::token::TokenManager;
use http::Method;
use std::sync::Arc;
use tracing::instrument;

/// Client for the video host's upload and `videos` endpoints.
///
/// Cloning is cheap; clones share the HTTP connection pool and, importantly, the one
/// access token, so a refresh performed by one upload is seen by all others.
#[derive(Debug, Clone)]
pub struct VideoHostClient {
    tokens: Arc<TokenManager>,
    endpoints: Arc<Endpoints>,
    chunk_size: u64,
    client: reqwest::Client,
}

impl VideoHostClient {
    /// Creates a client with its own HTTP connection pool.
    ///
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized, which is what makes building
    /// a `reqwest::Client` fail.
    pub fn new(config: Config) -> Self {
        let client = reqwest::ClientBuilder::new()
            // A 308 from a session URL means "resume incomplete", never "follow me".
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("building reqwest client should not fail");
        Self::with_http_client(config, client)
    }

    /// Like [`Self::new`], but reuses an existing HTTP client.
    ///
    /// The client must not follow redirects.
    ///
    /// `config.chunk_size` is rounded down to a multiple of
    /// [`CHUNK_GRANULARITY`](crate::chunk::CHUNK_GRANULARITY), and up to one chunk if
    /// it is smaller than that.
    pub fn with_http_client(config: Config, client: reqwest::Client) -> Self {
        let oauth = OAuthManager::new(config.endpoints.token_url.clone());
        Self {
            tokens: Arc::new(TokenManager::new(config.credentials, oauth)),
            endpoints: Arc::new(config.endpoints),
            chunk_size: normalize_chunk_size(config.chunk_size),
            client,
        }
    }

    /// The token manager shared by every clone of this client.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// The provider URLs this client talks to.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Bytes sent per chunk PUT; always a non-zero multiple of 256 KiB.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Starts an authenticated request, making sure the bearer token is fresh first.
    ///
    /// Unlike a plain `send`, this does not judge the status code; every caller in this
    /// crate needs to tell specific statuses apart.
    #[instrument(skip(self, build), level = tracing::Level::TRACE)]
    pub(crate) async fn send_authenticated(
        &self,
        method: Method,
        url: &str,
        build: impl FnOnce(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, UploadError> {
        let access_token = self.tokens.ensure_valid_token().await?;
        let request = self
            .client
            .request(method, url)
            .bearer_auth(access_token);
        build(request)
            .send()
            .await
            .map_err(|e| UploadError::http(url, e))
    }
}

/// Reads a response body for an error message, never failing.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .ok()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "no response body".to_string())
}
