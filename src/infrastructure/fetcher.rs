use crate::infrastructure::rate_limiter::{host_for_url, HostLimiter};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Hard deadline for one request, connect and body read included.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out after {}s", HTTP_TIMEOUT.as_secs())]
    Timeout,

    #[error("network error: {0}")]
    Network(reqwest::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err)
        }
    }
}

/// Raw result of one feed request. The status is whatever the server
/// answered; callers decide what to make of non-2xx codes.
pub struct FetchedPayload {
    pub status: StatusCode,
    pub body: Bytes,
    pub headers: HeaderMap,
}

/// Issues feed requests through one shared client with connection reuse,
/// honoring the per-host rate limit.
pub struct Fetcher {
    client: Client,
    limiter: HostLimiter,
}

impl Fetcher {
    pub fn new(per_host_limit: usize) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(crate::user_agent())
            .gzip(true)
            .brotli(true)
            .timeout(HTTP_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            limiter: HostLimiter::new(per_host_limit),
        })
    }

    /// One GET for a feed URL. Transport errors, timeouts, and TLS failures
    /// surface as `FetchError`; there are no retries at this layer. The
    /// host lease is held until the body is fully read and released on
    /// every exit path.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPayload, FetchError> {
        let _lease = self.limiter.acquire(&host_for_url(url)).await;

        tracing::debug!("Fetching feed: {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        tracing::debug!("Fetched {} ({} bytes, status {})", url, body.len(), status);

        Ok(FetchedPayload {
            status,
            body,
            headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_returns_status_and_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<rss version=\"2.0\"><channel></channel></rss>")
                    .insert_header("Content-Type", "application/xml"),
            )
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new(2).unwrap();
        let payload = fetcher
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(payload.status, StatusCode::OK);
        assert!(payload.body.starts_with(b"<rss"));
        assert_eq!(
            payload.headers.get("Content-Type").unwrap(),
            "application/xml"
        );
    }

    #[tokio::test]
    async fn test_http_error_status_is_not_a_fetch_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new(2).unwrap();
        let payload = fetcher
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();

        // A 404 is an answer from the server, not a transport failure.
        assert_eq!(payload.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_connection_refused_is_a_fetch_error() {
        // Nothing listens on this port.
        let fetcher = Fetcher::new(2).unwrap();
        let result = fetcher.fetch("http://127.0.0.1:1/feed").await;

        assert!(matches!(result, Err(FetchError::Network(_))));
    }

    #[tokio::test]
    async fn test_per_host_limit_serializes_excess_requests() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("ok")
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&mock_server)
            .await;

        let fetcher = std::sync::Arc::new(Fetcher::new(2).unwrap());
        let url = format!("{}/feed", mock_server.uri());

        let start = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..3 {
            let fetcher = fetcher.clone();
            let url = url.clone();
            handles.push(tokio::spawn(async move { fetcher.fetch(&url).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Two slots per host: the third request waits out a full round trip.
        assert!(start.elapsed() >= Duration::from_millis(600));
    }
}
