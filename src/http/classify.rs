use async_trait::async_trait;
use tracing::debug;

use super::message::{HttpRequest, HttpResponse};
use super::pipeline::{Next, Stage};
use crate::error::HttpError;

/// Converts the final non-2xx response into a typed [`HttpError`].
///
/// The unread response body is released before the error is returned, which
/// closes the underlying connection.
pub struct Classification;

#[async_trait]
impl Stage for Classification {
  async fn handle(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse, HttpError> {
    let url = request.url.clone();
    let response = next.run(request).await?;
    if response.is_success() {
      return Ok(response);
    }

    let error = HttpError::from_status(response.status.as_u16(), response.reason());
    response.release();
    debug!(%url, %error, "request failed");
    Err(error)
  }
}
