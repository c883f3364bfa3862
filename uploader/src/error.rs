//! The error taxonomy shared by every part of the upload client.

use http::StatusCode;

/// Everything that can go wrong while talking to the video host.
///
/// The variants map one-to-one onto the decisions a caller (or the retry loop in
/// [`crate::retry`]) has to make: whether to give up immediately, refresh and try
/// again, or start a fresh upload session.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// A required credential or setting is missing. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The token endpoint rejected the refresh token exchange.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The host answered a chunk with 401. The token has already been refreshed; the
    /// session has to be restarted.
    #[error("access token expired during upload at byte {offset}")]
    TokenExpiredDuringUpload { offset: u64 },

    /// A deletion hit a 401. The token has already been refreshed; the caller should
    /// re-invoke.
    #[error("access token rejected while deleting {asset_id}, retry the request")]
    RetryableAuth { asset_id: String },

    /// The resumable session could not be created.
    #[error("could not initiate resumable upload: {0}")]
    Initiation(String),

    /// A chunk PUT failed with an unexpected status.
    #[error("chunk upload failed at byte {offset} with status {status}: {message}")]
    ChunkUpload {
        offset: u64,
        status: StatusCode,
        message: String,
    },

    /// The caller-supplied time budget ran out.
    #[error("upload timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The caller cancelled the upload.
    #[error("upload cancelled")]
    Cancelled,

    /// There is nothing to upload.
    #[error("refusing to upload an empty payload")]
    EmptyPayload,

    /// The host refused to delete the asset for a reason other than "not found".
    #[error("deleting video failed with status {status}: {message}")]
    Deletion { status: StatusCode, message: String },

    /// Every attempt the retry policy allowed has failed.
    #[error("All {attempts} upload attempts failed: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<UploadError>,
    },

    /// The request never produced a response.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The host answered with a body we could not make sense of.
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl UploadError {
    pub(crate) fn http(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.into(),
            source,
        }
    }

    /// Whether another attempt with a fresh session could plausibly succeed.
    ///
    /// Configuration problems, cancellation, an exhausted time budget and empty
    /// payloads will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Configuration(_)
            | Self::Cancelled
            | Self::Timeout(_)
            | Self::EmptyPayload
            | Self::RetriesExhausted { .. } => false,
            Self::Auth(_)
            | Self::TokenExpiredDuringUpload { .. }
            | Self::RetryableAuth { .. }
            | Self::Initiation(_)
            | Self::ChunkUpload { .. }
            | Self::Deletion { .. }
            | Self::Http { .. }
            | Self::Decode { .. } => true,
        }
    }
}
