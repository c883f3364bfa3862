//! Client for the video host's REST API.
//!
//! The host is the YouTube Data API v3. Two of its surfaces are used:
//!
//! - the media upload endpoint, through the resumable protocol
//!   ([`VideoHostClient::initiate_resumable_upload`], [`VideoHostClient::transfer_chunks`]),
//! - the `videos` resource, for deletion ([`VideoHostClient::delete_asset`]).
//!
//! Every request goes through [`VideoHostClient`], which holds the one access token the
//! client shares across all of its requests.

pub mod client;
mod delete;
pub mod upload;
pub mod videos;

pub use client::VideoHostClient;
pub use upload::{Checkpoint, TransferEvent, UploadSession};
pub use videos::{Video, VideoInsert};
