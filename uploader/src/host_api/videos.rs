//! Wire types for the `videos` resource.

use crate::metadata::PrivacyStatus;
use serde::{Deserialize, Serialize};

/// Request body for `videos.insert` with `part=snippet,status`.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/insert>
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInsert {
    pub snippet: VideoInsertSnippet,
    pub status: VideoInsertStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInsertSnippet {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInsertStatus {
    pub privacy_status: PrivacyStatus,
    pub self_declared_made_for_kids: bool,
}

/// The `video` resource the host returns once the final chunk lands.
///
/// Only the fields the uploader reports back are modelled.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#resource>
#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub id: String,
    pub snippet: Option<VideoSnippet>,
    pub status: Option<VideoStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    pub privacy_status: Option<PrivacyStatus>,
    pub upload_status: Option<String>,
}

/// Thumbnail renditions, keyed by size.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    pub default: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

impl Video {
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }

    pub fn embed_url(&self) -> String {
        format!("https://www.youtube.com/embed/{}", self.id)
    }

    /// The largest thumbnail the host reported, or the well-known static location
    /// when processing hasn't produced any yet.
    pub fn thumbnail_url(&self) -> String {
        self.snippet
            .as_ref()
            .and_then(|s| {
                let t = &s.thumbnails;
                t.high.as_ref().or(t.medium.as_ref()).or(t.default.as_ref())
            })
            .map(|t| t.url.clone())
            .unwrap_or_else(|| format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::UploadMetadata;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_body_shape() {
        let body = UploadMetadata {
            title: Some("Checkout crash".into()),
            description: Some("repro".into()),
            tags: vec!["checkout".into()],
            privacy_status: Some(PrivacyStatus::Unlisted),
            category_id: None,
            duration_secs: Some(3.0),
        }
        .finalize();
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "snippet": {
                    "title": "Checkout crash",
                    "description": "repro",
                    "tags": ["checkout"],
                    "categoryId": "28",
                },
                "status": {
                    "privacyStatus": "unlisted",
                    "selfDeclaredMadeForKids": false,
                },
            })
        );
    }

    #[test]
    fn thumbnail_prefers_largest() {
        let video: Video = serde_json::from_value(serde_json::json!({
            "id": "abc123",
            "snippet": {
                "title": "t",
                "thumbnails": {
                    "default": { "url": "https://i.ytimg.com/vi/abc123/default.jpg" },
                    "medium": { "url": "https://i.ytimg.com/vi/abc123/mqdefault.jpg" },
                }
            },
            "status": { "privacyStatus": "private", "uploadStatus": "uploaded" }
        }))
        .unwrap();
        assert_eq!(video.thumbnail_url(), "https://i.ytimg.com/vi/abc123/mqdefault.jpg");
        assert_eq!(video.watch_url(), "https://www.youtube.com/watch?v=abc123");
        assert_eq!(video.embed_url(), "https://www.youtube.com/embed/abc123");
    }

    #[test]
    fn thumbnail_fallback_without_snippet() {
        let video: Video = serde_json::from_str(r#"{"id":"xyz"}"#).unwrap();
        assert_eq!(video.thumbnail_url(), "https://i.ytimg.com/vi/xyz/hqdefault.jpg");
    }
}
