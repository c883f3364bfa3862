//! Caller-facing outcome descriptors.
//!
//! These are what gets handed back to the application (and usually stored next to
//! the bug report the recording belongs to), so they serialize with camelCase keys.

use crate::error::UploadError;
use crate::host_api::videos::{Video, VideoInsert};
use crate::metadata::PrivacyStatus;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Where an uploaded video ended up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedVideo {
    pub asset_id: String,
    pub url: String,
    pub embed_url: String,
    pub thumbnail_url: String,
    pub privacy_status: PrivacyStatus,
    pub uploaded_at: Timestamp,
    pub title: String,
    pub duration_secs: Option<f64>,
}

impl UploadedVideo {
    /// Combines the resource the host created with what we asked for, preferring the
    /// host's view where it reported one.
    pub(crate) fn from_created(
        video: &Video,
        requested: &VideoInsert,
        duration_secs: Option<f64>,
    ) -> Self {
        let privacy_status = video
            .status
            .as_ref()
            .and_then(|s| s.privacy_status)
            .unwrap_or(requested.status.privacy_status);
        let title = video
            .snippet
            .as_ref()
            .and_then(|s| s.title.clone())
            .unwrap_or_else(|| requested.snippet.title.clone());
        Self {
            asset_id: video.id.clone(),
            url: video.watch_url(),
            embed_url: video.embed_url(),
            thumbnail_url: video.thumbnail_url(),
            privacy_status,
            uploaded_at: Timestamp::now(),
            title,
            duration_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Terminal outcome of [`crate::VideoHostClient::upload_with_retry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<UploadedVideo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl UploadResult {
    pub fn succeeded(video: UploadedVideo) -> Self {
        Self {
            success: true,
            data: Some(video),
            error: None,
        }
    }

    pub fn failed(error: &UploadError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorInfo::new(error.to_string())),
        }
    }
}

/// How a deletion request ended, short of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The host had no such video; it was never there or is already gone.
    NotFound,
}

pub const NOT_FOUND_MESSAGE: &str = "Video not found or already deleted";

/// Caller-facing rendering of a [`DeleteOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl From<DeleteOutcome> for DeleteResult {
    fn from(outcome: DeleteOutcome) -> Self {
        match outcome {
            DeleteOutcome::Deleted => Self {
                success: true,
                error: None,
            },
            DeleteOutcome::NotFound => Self {
                success: false,
                error: Some(ErrorInfo::new(NOT_FOUND_MESSAGE)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::UploadMetadata;
    use pretty_assertions::assert_eq;

    #[test]
    fn not_found_renders_as_soft_failure() {
        let rendered = serde_json::to_value(DeleteResult::from(DeleteOutcome::NotFound)).unwrap();
        assert_eq!(
            rendered,
            serde_json::json!({
                "success": false,
                "error": { "message": "Video not found or already deleted" }
            })
        );
        let rendered = serde_json::to_value(DeleteResult::from(DeleteOutcome::Deleted)).unwrap();
        assert_eq!(rendered, serde_json::json!({ "success": true }));
    }

    #[test]
    fn upload_result_uses_camel_case() {
        let video: Video = serde_json::from_value(serde_json::json!({
            "id": "vid1",
            "status": { "privacyStatus": "unlisted" }
        }))
        .unwrap();
        let requested = UploadMetadata::titled("Flaky search").finalize();
        let uploaded = UploadedVideo::from_created(&video, &requested, Some(4.0));
        assert_eq!(uploaded.privacy_status, PrivacyStatus::Unlisted);
        assert_eq!(uploaded.title, "Flaky search");

        let json = serde_json::to_value(UploadResult::succeeded(uploaded)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["assetId"], "vid1");
        assert_eq!(json["data"]["embedUrl"], "https://www.youtube.com/embed/vid1");
        assert_eq!(json["data"]["privacyStatus"], "unlisted");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failure_keeps_message() {
        let result = UploadResult::failed(&UploadError::Initiation("no Location header".into()));
        assert!(!result.success);
        assert_eq!(
            result.error.unwrap().message,
            "could not initiate resumable upload: no Location header"
        );
    }
}
