//! Resumable upload client for screen recordings.
//!
//! Recordings attached to bug reports are pushed to the video host in fixed-size
//! chunks through its resumable upload protocol, with OAuth token refresh, bounded
//! retries and cancellation. Uploaded videos can later be removed again.
//!
//! ```rust,no_run
//! use recording_uploader::{Config, UploadMetadata, UploadOptions, VideoBlob, VideoHostClient};
//!
//! # async fn example(bytes: Vec<u8>) -> Result<(), recording_uploader::UploadError> {
//! let client = VideoHostClient::new(Config::from_env());
//! let blob = VideoBlob::new(bytes, "video/webm");
//! let result = client
//!     .upload_with_retry(
//!         &blob,
//!         UploadMetadata::titled("Checkout button does nothing"),
//!         UploadOptions::default().on_progress(|pct| eprintln!("{pct:.0}%")),
//!     )
//!     .await?;
//! if let Some(video) = result.data {
//!     println!("uploaded to {}", video.url);
//! }
//! # Ok(())
//! # }
//! ```

pub mod chunk;
pub mod config;
pub mod error;
pub mod host_api;
pub mod metadata;
pub mod oauth;
pub mod probe;
pub mod progress;
pub mod result;
pub mod retry;
pub mod token;

pub use config::{Config, Credentials, Endpoints};
pub use error::UploadError;
pub use host_api::{Checkpoint, UploadSession, VideoHostClient};
pub use metadata::{PrivacyStatus, UploadMetadata, VideoBlob};
pub use result::{DeleteOutcome, DeleteResult, UploadResult, UploadedVideo};
pub use retry::{RetryPolicy, UploadOptions};
pub use tokio_util::sync::CancellationToken;
