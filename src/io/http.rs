use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::RangeRead;
use crate::error::{Error, Result};

/// HTTP Range reader for archives behind plain HTTP(S) or presigned object-store URLs
pub struct HttpRangeReader {
    client: Client,
    url: String,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpRangeReader {
    /// Create a reader with a default client (30 second timeout)
    pub fn new(url: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self::with_client(client, url))
    }

    /// Create a reader sharing an existing client and its connection pool
    pub fn with_client(client: Client, url: String) -> Self {
        Self {
            client,
            url,
            transferred_bytes: AtomicU64::new(0),
            max_retry: 10,
        }
    }

    /// Number of attempts for connect/timeout failures before giving up
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry.max(1);
        self
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    async fn send_with_retry(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let mut retry_count = 0;

        loop {
            let attempt = request
                .try_clone()
                .ok_or_else(|| Error::RangeRead("request cannot be retried".to_string()))?;

            match attempt.send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        return Err(Error::RangeRead(format!(
                            "max retries exceeded for {}: {}",
                            self.url, e
                        )));
                    }
                    warn!(
                        "Connection error, retry {}/{}: {}",
                        retry_count, self.max_retry, e
                    );
                    tokio::time::sleep(Duration::from_millis(500 * retry_count as u64)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl RangeRead for HttpRangeReader {
    fn identifier(&self) -> &str {
        &self.url
    }

    async fn size(&self) -> Result<u64> {
        let resp = self.send_with_retry(self.client.head(&self.url)).await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(self.url.clone()));
        }
        if !resp.status().is_success() {
            return Err(Error::RangeRead(format!(
                "HEAD {} failed with status: {}",
                self.url,
                resp.status()
            )));
        }

        // Check if server supports Range requests
        let accept_ranges = resp
            .headers()
            .get("accept-ranges")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none");

        if !accept_ranges.contains("bytes") {
            return Err(Error::RangeRead(format!(
                "{} does not support Range requests",
                self.url
            )));
        }

        // Content-Length from the raw header; HEAD responses have no body to measure
        resp.headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::RangeRead(format!("{} did not return Content-Length", self.url)))
    }

    async fn read_range(&self, start: u64, end_inclusive: u64) -> Result<Bytes> {
        if end_inclusive < start {
            return Err(Error::RangeRead(format!(
                "invalid range {}-{}",
                start, end_inclusive
            )));
        }

        let expected = end_inclusive - start + 1;
        let range = format!("bytes={}-{}", start, end_inclusive);
        debug!("GET {} Range: {}", self.url, range);

        let resp = self
            .send_with_retry(self.client.get(&self.url).header("Range", &range))
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(self.url.clone()));
        }
        if resp.status() != StatusCode::PARTIAL_CONTENT {
            return Err(Error::RangeRead(format!(
                "GET {} ({}) failed with status: {}",
                self.url,
                range,
                resp.status()
            )));
        }

        let bytes = resp.bytes().await?;
        self.transferred_bytes
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);

        if bytes.len() as u64 != expected {
            return Err(Error::RangeRead(format!(
                "short read for {}: expected {} bytes, got {}",
                range,
                expected,
                bytes.len()
            )));
        }

        Ok(bytes)
    }
}
