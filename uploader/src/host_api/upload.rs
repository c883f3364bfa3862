//! The resumable upload protocol: session initiation and chunked transfer.
//!
//! An upload attempt is a single POST that creates a session (its URL comes back in
//! the `Location` header) followed by strictly sequential PUTs, one per chunk. The
//! host answers every chunk but the last with `308 Resume Incomplete` and the last
//! one with the created `video` resource.
//!
//! See: <https://developers.google.com/youtube/v3/guides/using_resumable_upload_protocol>

use crate::chunk::{ByteRange, ChunkPlan};
use crate::error::UploadError;
use crate::host_api::client::{VideoHostClient, error_body};
use crate::host_api::videos::{Video, VideoInsert};
use crate::metadata::{UploadMetadata, VideoBlob};
use crate::result::UploadedVideo;
use http::{Method, StatusCode};
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Provider-side state of one upload attempt.
///
/// Lives only as long as the attempt; a retry always starts a new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub upload_url: String,
    pub total_size: u64,
    pub uploaded_bytes: u64,
}

impl UploadSession {
    /// Records that the host has confirmed everything up to and including `range`.
    fn confirm(&mut self, range: &ByteRange) {
        self.uploaded_bytes = range.end + 1;
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            uploaded_bytes: self.uploaded_bytes,
            total_size: self.total_size,
        }
    }
}

/// How far a transfer has come, as confirmed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub uploaded_bytes: u64,
    pub total_size: u64,
}

impl Checkpoint {
    /// Confirmed share of the payload, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total_size == 0 {
            1.0
        } else {
            self.uploaded_bytes as f64 / self.total_size as f64
        }
    }
}

/// Something that happened during [`VideoHostClient::transfer_chunks`].
#[derive(Debug)]
pub enum TransferEvent {
    /// A chunk was accepted.
    Checkpoint(Checkpoint),
    /// The final chunk was accepted and the video resource created.
    Complete(Video),
}

enum ChunkOutcome {
    ResumeIncomplete,
    Created(Video),
}

impl VideoHostClient {
    /// Uploads `blob` as a new video described by `metadata`.
    ///
    /// Makes sure a valid token is available (failing fast on missing credentials),
    /// fills in metadata defaults, and then runs one complete resumable upload. No
    /// retries happen here; see [`VideoHostClient::upload_with_retry`] for that.
    ///
    /// `on_checkpoint` is called after every chunk the host accepts.
    #[instrument(skip_all, fields(bytes = blob.len()))]
    pub async fn upload_video(
        &self,
        blob: &VideoBlob,
        metadata: &UploadMetadata,
        cancel: &CancellationToken,
        on_checkpoint: impl FnMut(Checkpoint),
    ) -> Result<UploadedVideo, UploadError> {
        if blob.is_empty() {
            return Err(UploadError::EmptyPayload);
        }
        self.tokens().ensure_valid_token().await?;

        let insert = metadata.finalize();
        let video = self
            .perform_resumable_upload(blob, &insert, cancel, on_checkpoint)
            .await?;
        let uploaded = UploadedVideo::from_created(&video, &insert, metadata.duration_secs);
        tracing::info!(
            asset_id = uploaded.asset_id,
            url = uploaded.url,
            "video upload complete"
        );
        Ok(uploaded)
    }

    /// Creates a resumable upload session for `blob`.
    ///
    /// The metadata travels as the JSON body; the payload's size and type are declared
    /// up front through `X-Upload-Content-Length` and `X-Upload-Content-Type`.
    #[instrument(skip_all, fields(bytes = blob.len()))]
    pub async fn initiate_resumable_upload(
        &self,
        blob: &VideoBlob,
        insert: &VideoInsert,
    ) -> Result<UploadSession, UploadError> {
        let url = &self.endpoints().upload_url;
        let response = self
            .send_authenticated(Method::POST, url, |request| {
                request
                    .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
                    .header("X-Upload-Content-Length", blob.len())
                    .header("X-Upload-Content-Type", blob.content_type())
                    .json(insert)
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(UploadError::Initiation(format!(
                "host answered {status}: {body}"
            )));
        }

        let upload_url = response
            .headers()
            .get(http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                UploadError::Initiation("response carried no Location header".to_string())
            })?
            .to_string();

        tracing::debug!(upload_url, "resumable upload session created");
        Ok(UploadSession {
            upload_url,
            total_size: blob.len(),
            uploaded_bytes: 0,
        })
    }

    /// Creates a session and transfers all of `blob` through it.
    pub async fn perform_resumable_upload(
        &self,
        blob: &VideoBlob,
        insert: &VideoInsert,
        cancel: &CancellationToken,
        mut on_checkpoint: impl FnMut(Checkpoint),
    ) -> Result<Video, UploadError> {
        let session = self.initiate_resumable_upload(blob, insert).await?;
        let transfer = self.transfer_chunks(session, blob, cancel);
        let mut transfer = std::pin::pin!(transfer);
        let mut confirmed = 0;
        while let Some(event) = transfer.next().await {
            match event? {
                TransferEvent::Checkpoint(checkpoint) => {
                    confirmed = checkpoint.uploaded_bytes;
                    on_checkpoint(checkpoint);
                }
                TransferEvent::Complete(video) => return Ok(video),
            }
        }
        Err(UploadError::ChunkUpload {
            offset: confirmed,
            status: StatusCode::PERMANENT_REDIRECT,
            message: "transfer ended without the host creating a video".to_string(),
        })
    }

    /// Sends the remaining chunks of `session`, one at a time, yielding a checkpoint
    /// after each one the host accepts.
    ///
    /// The stream ends after yielding either [`TransferEvent::Complete`] or an error.
    /// Cancellation is checked before each chunk is sent.
    pub fn transfer_chunks<'a>(
        &'a self,
        mut session: UploadSession,
        blob: &'a VideoBlob,
        cancel: &'a CancellationToken,
    ) -> impl Stream<Item = Result<TransferEvent, UploadError>> + use<'a> {
        async_stream::stream! {
            let plan = ChunkPlan::new(session.total_size, self.chunk_size())
                .starting_at(session.uploaded_bytes);
            tracing::debug!(chunks = plan.len(), total = session.total_size, "transferring chunks");

            for range in plan {
                if cancel.is_cancelled() {
                    tracing::debug!(offset = range.start, "upload cancelled between chunks");
                    yield Err(UploadError::Cancelled);
                    return;
                }

                match self.put_chunk(&session.upload_url, blob, range).await {
                    Ok(ChunkOutcome::ResumeIncomplete) if range.is_last() => {
                        yield Err(UploadError::ChunkUpload {
                            offset: range.start,
                            status: StatusCode::PERMANENT_REDIRECT,
                            message: "host still expects data after the final chunk".to_string(),
                        });
                        return;
                    }
                    Ok(ChunkOutcome::ResumeIncomplete) => {
                        session.confirm(&range);
                        yield Ok(TransferEvent::Checkpoint(session.checkpoint()));
                    }
                    Ok(ChunkOutcome::Created(video)) => {
                        session.confirm(&range);
                        yield Ok(TransferEvent::Checkpoint(session.checkpoint()));
                        yield Ok(TransferEvent::Complete(video));
                        return;
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }
    }

    #[instrument(skip_all, fields(range = %range), level = tracing::Level::DEBUG)]
    async fn put_chunk(
        &self,
        upload_url: &str,
        blob: &VideoBlob,
        range: ByteRange,
    ) -> Result<ChunkOutcome, UploadError> {
        let body = blob.bytes().slice(range.as_usize_range());
        let response = self
            .send_authenticated(Method::PUT, upload_url, |request| {
                request
                    .header(http::header::CONTENT_RANGE, range.content_range())
                    .header(http::header::CONTENT_TYPE, blob.content_type())
                    .body(body)
            })
            .await?;

        match response.status() {
            StatusCode::PERMANENT_REDIRECT => {
                tracing::trace!("chunk accepted, more expected");
                Ok(ChunkOutcome::ResumeIncomplete)
            }
            StatusCode::OK | StatusCode::CREATED => {
                let video: Video = response.json().await.map_err(|e| UploadError::Decode {
                    url: upload_url.to_string(),
                    message: e.to_string(),
                })?;
                Ok(ChunkOutcome::Created(video))
            }
            StatusCode::UNAUTHORIZED => {
                tracing::warn!(offset = range.start, "access token rejected mid-upload");
                self.tokens().refresh_access_token().await?;
                Err(UploadError::TokenExpiredDuringUpload {
                    offset: range.start,
                })
            }
            status => Err(UploadError::ChunkUpload {
                offset: range.start,
                status,
                message: error_body(response).await,
            }),
        }
    }
}
