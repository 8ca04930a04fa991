//! HTTP client wrapper for fetching image bytes.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};
use url::Url;

use super::error::DownloadError;
use crate::config::REQUEST_TIMEOUT_SECS;

/// A fully downloaded image body plus its declared content type.
#[derive(Debug, Clone)]
pub struct DownloadedImage {
    /// The raw image bytes.
    pub bytes: Vec<u8>,
    /// Value of the Content-Type response header, when present.
    pub content_type: Option<String>,
}

/// HTTP client for downloading image bodies.
///
/// Created once and reused across downloads to take advantage of
/// connection pooling. Bodies are buffered whole because the content hash
/// is computed over the full byte content.
#[derive(Debug, Clone)]
pub struct ImageClient {
    client: Client,
}

impl Default for ImageClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageClient {
    /// Creates a client with the default request timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(REQUEST_TIMEOUT_SECS)
    }

    /// Creates a client with an explicit timeout in seconds.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_timeout(timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .gzip(true)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Downloads the full body at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] if the URL is invalid, the request fails
    /// or times out, or the server returns a non-success status.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_bytes(&self, url: &str) -> Result<DownloadedImage, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        debug!(bytes = bytes.len(), ?content_type, "image downloaded");
        Ok(DownloadedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_bytes_returns_body_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "image/jpeg")
                    .set_body_bytes(b"jpegbytes"),
            )
            .mount(&server)
            .await;

        let client = ImageClient::new();
        let image = client
            .fetch_bytes(&format!("{}/a.jpg", server.uri()))
            .await
            .unwrap();
        assert_eq!(image.bytes, b"jpegbytes");
        assert_eq!(image.content_type.as_deref(), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn test_fetch_bytes_missing_content_type_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/raw"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"bytes"))
            .mount(&server)
            .await;

        let client = ImageClient::new();
        let image = client
            .fetch_bytes(&format!("{}/raw", server.uri()))
            .await
            .unwrap();
        assert!(image.content_type.is_none());
    }

    #[tokio::test]
    async fn test_fetch_bytes_404_is_http_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ImageClient::new();
        let result = client
            .fetch_bytes(&format!("{}/missing.jpg", server.uri()))
            .await;
        assert!(matches!(
            result,
            Err(DownloadError::HttpStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_bytes_invalid_url() {
        let client = ImageClient::new();
        let result = client.fetch_bytes("not-a-valid-url").await;
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }
}
