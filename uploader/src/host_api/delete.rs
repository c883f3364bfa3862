//! Removing previously uploaded videos.

use crate::error::UploadError;
use crate::host_api::client::{VideoHostClient, error_body};
use crate::result::DeleteOutcome;
use http::{Method, StatusCode};
use tracing::instrument;

impl VideoHostClient {
    /// Deletes the video with the given id.
    ///
    /// Deleting is idempotent from the caller's point of view: a video the host does not
    /// know about yields [`DeleteOutcome::NotFound`] rather than an error.
    ///
    /// This is a single request. On a 401 the token is refreshed and
    /// [`UploadError::RetryableAuth`] returned so the caller can simply call again.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/delete>
    #[instrument(skip(self))]
    pub async fn delete_asset(&self, asset_id: &str) -> Result<DeleteOutcome, UploadError> {
        let url = &self.endpoints().videos_url;
        let response = self
            .send_authenticated(Method::DELETE, url, |request| {
                request.query(&[("id", asset_id)])
            })
            .await?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!(asset_id, "video deleted");
                Ok(DeleteOutcome::Deleted)
            }
            StatusCode::NOT_FOUND => {
                tracing::info!(asset_id, "video not found, treating as already deleted");
                Ok(DeleteOutcome::NotFound)
            }
            StatusCode::UNAUTHORIZED => {
                tracing::warn!(asset_id, "access token rejected on delete, refreshing");
                self.tokens().refresh_access_token().await?;
                Err(UploadError::RetryableAuth {
                    asset_id: asset_id.to_string(),
                })
            }
            status => Err(UploadError::Deletion {
                status,
                message: error_body(response).await,
            }),
        }
    }
}
