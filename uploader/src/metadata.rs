//! What the caller hands us: the recording bytes and how it should be described.

use crate::host_api::videos::{VideoInsert, VideoInsertSnippet, VideoInsertStatus};
use bytes::Bytes;
use jiff::Zoned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category 28 is "Science & Technology".
pub const DEFAULT_CATEGORY_ID: &str = "28";
pub const DEFAULT_TAGS: &[&str] = &["qa", "screen-recording"];

/// An in-memory recording together with its declared MIME type.
#[derive(Debug, Clone)]
pub struct VideoBlob {
    bytes: Bytes,
    content_type: String,
}

impl VideoBlob {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

/// Who can see the uploaded video.
///
/// Parsing is case-insensitive, so `"Unlisted"` and `"PRIVATE"` are accepted and
/// always serialized back in lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum PrivacyStatus {
    Public,
    Unlisted,
    #[default]
    Private,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Unlisted => "unlisted",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown privacy status {0:?} (expected public, unlisted or private)")]
pub struct UnknownPrivacyStatus(pub String);

impl FromStr for PrivacyStatus {
    type Err = UnknownPrivacyStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "unlisted" => Ok(Self::Unlisted),
            "private" => Ok(Self::Private),
            _ => Err(UnknownPrivacyStatus(s.to_string())),
        }
    }
}

impl TryFrom<String> for PrivacyStatus {
    type Error = UnknownPrivacyStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Caller-supplied description of a recording.
///
/// Anything left unset is filled in by [`UploadMetadata::finalize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub privacy_status: Option<PrivacyStatus>,
    pub category_id: Option<String>,
    /// Length of the recording in seconds, filled in by the retry orchestrator.
    pub duration_secs: Option<f64>,
}

impl UploadMetadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn privacy(&self) -> PrivacyStatus {
        self.privacy_status.unwrap_or_default()
    }

    /// Builds the `videos.insert` request body, applying defaults for every missing
    /// field.
    pub fn finalize(&self) -> VideoInsert {
        self.finalize_at(&Zoned::now())
    }

    pub(crate) fn finalize_at(&self, now: &Zoned) -> VideoInsert {
        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Recording {}", now.strftime("%Y-%m-%d %H:%M")));
        let tags = if self.tags.is_empty() {
            DEFAULT_TAGS.iter().map(|t| t.to_string()).collect()
        } else {
            self.tags.clone()
        };
        VideoInsert {
            snippet: VideoInsertSnippet {
                title,
                description: self.description.clone().unwrap_or_default(),
                tags,
                category_id: self
                    .category_id
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CATEGORY_ID.to_string()),
            },
            status: VideoInsertStatus {
                privacy_status: self.privacy(),
                self_declared_made_for_kids: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn noon() -> Zoned {
        jiff::civil::date(2026, 3, 14)
            .at(12, 30, 0, 0)
            .to_zoned(jiff::tz::TimeZone::UTC)
            .unwrap()
    }

    #[test]
    fn privacy_parses_case_insensitively() {
        assert_eq!("Unlisted".parse::<PrivacyStatus>(), Ok(PrivacyStatus::Unlisted));
        assert_eq!("PUBLIC".parse::<PrivacyStatus>(), Ok(PrivacyStatus::Public));
        assert_eq!(" private ".parse::<PrivacyStatus>(), Ok(PrivacyStatus::Private));
        assert!("friends-only".parse::<PrivacyStatus>().is_err());

        let parsed: UploadMetadata =
            serde_json::from_str(r#"{"privacyStatus":"Public"}"#).unwrap();
        assert_eq!(parsed.privacy_status, Some(PrivacyStatus::Public));
        assert_eq!(
            serde_json::to_string(&PrivacyStatus::Public).unwrap(),
            r#""public""#
        );
    }

    #[test]
    fn defaults_fill_gaps() {
        let insert = UploadMetadata::default().finalize_at(&noon());
        assert_eq!(insert.snippet.title, "Recording 2026-03-14 12:30");
        assert_eq!(insert.snippet.description, "");
        assert_eq!(insert.snippet.tags, vec!["qa", "screen-recording"]);
        assert_eq!(insert.snippet.category_id, "28");
        assert_eq!(insert.status.privacy_status, PrivacyStatus::Private);
    }

    #[test]
    fn caller_values_win() {
        let meta = UploadMetadata {
            title: Some("Login button unresponsive".into()),
            description: Some("Steps in ticket".into()),
            tags: vec!["login".into()],
            privacy_status: Some(PrivacyStatus::Unlisted),
            category_id: Some("22".into()),
            duration_secs: Some(12.5),
        };
        let insert = meta.finalize_at(&noon());
        assert_eq!(insert.snippet.title, "Login button unresponsive");
        assert_eq!(insert.snippet.tags, vec!["login"]);
        assert_eq!(insert.snippet.category_id, "22");
        assert_eq!(insert.status.privacy_status, PrivacyStatus::Unlisted);
    }

    #[test]
    fn blank_title_gets_default() {
        let insert = UploadMetadata::titled("   ").finalize_at(&noon());
        assert_eq!(insert.snippet.title, "Recording 2026-03-14 12:30");
    }
}
