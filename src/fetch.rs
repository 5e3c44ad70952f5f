//! Bounded parallel range fetching.
//!
//! Small reads go out as a single ranged request. Reads larger than the
//! multipart threshold are split into fixed-size chunks that are fetched
//! concurrently (at most `max_workers` in flight) and joined back together
//! in ascending offset order. A single failed chunk fails the whole fetch.

use bytes::{Bytes, BytesMut};
use futures::{StreamExt, TryStreamExt, stream};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::io::{RangeRead, RemoteObject};

pub const KB: u64 = 1024;
pub const MB: u64 = KB * KB;

/// Inclusive byte interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRequest {
    pub start: u64,
    pub end: u64,
}

impl RangeRequest {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for an HTTP `Range` header
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Tuning for [`RangeFetcher`]
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Reads up to this many bytes are issued as one request
    pub multipart_threshold: u64,
    /// Chunk size for reads above the threshold
    pub multipart_chunk_size: u64,
    /// Maximum concurrent chunk reads per fetch
    pub max_workers: usize,
    /// Optional deadline for a whole fetch call
    pub deadline: Option<Duration>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            multipart_threshold: 8 * MB,
            multipart_chunk_size: 8 * MB,
            max_workers: 20,
            deadline: None,
        }
    }
}

impl FetchConfig {
    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.multipart_threshold = threshold;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.multipart_chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Split `[offset, offset + length)` into consecutive chunks of `chunk_size`.
///
/// The final chunk holds the remainder. Returns an empty plan for `length == 0`.
pub fn plan_ranges(offset: u64, length: u64, chunk_size: u64) -> Vec<RangeRequest> {
    let chunk_size = chunk_size.max(1);
    let num_parts = length.div_ceil(chunk_size);

    (0..num_parts)
        .map(|part_index| {
            let start = offset + part_index * chunk_size;
            let end = if part_index == num_parts - 1 {
                offset + length - 1
            } else {
                start + chunk_size - 1
            };
            RangeRequest::new(start, end)
        })
        .collect()
}

/// Issues ranged reads against a [`RemoteObject`], chunking large ones.
#[derive(Debug, Clone, Default)]
pub struct RangeFetcher {
    config: FetchConfig,
}

impl RangeFetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch exactly `length` bytes starting at `start`.
    ///
    /// # Errors
    ///
    /// `Error::RangeRead` if the range runs past the object's size, any read
    /// fails or comes back short, or the configured deadline expires.
    pub async fn fetch<R: RangeRead>(
        &self,
        object: &RemoteObject<R>,
        start: u64,
        length: u64,
    ) -> Result<Bytes> {
        let end = start.checked_add(length).ok_or_else(|| {
            Error::RangeRead(format!("range {}+{} overflows", start, length))
        })?;
        if end > object.size() {
            return Err(Error::RangeRead(format!(
                "range {}..{} exceeds size of {} ({} bytes)",
                start,
                end,
                object.identifier(),
                object.size()
            )));
        }
        if length == 0 {
            return Ok(Bytes::new());
        }

        match self.config.deadline {
            Some(deadline) => {
                let fetch = self.fetch_inner(object, start, length);
                tokio::time::timeout(deadline, fetch).await.map_err(|_| {
                    Error::RangeRead(format!(
                        "deadline of {:?} exceeded reading {} bytes at {} from {}",
                        deadline,
                        length,
                        start,
                        object.identifier()
                    ))
                })?
            }
            None => self.fetch_inner(object, start, length).await,
        }
    }

    async fn fetch_inner<R: RangeRead>(
        &self,
        object: &RemoteObject<R>,
        start: u64,
        length: u64,
    ) -> Result<Bytes> {
        if length <= self.config.multipart_threshold {
            return read_exact(object, RangeRequest::new(start, start + length - 1)).await;
        }

        let ranges = plan_ranges(start, length, self.config.multipart_chunk_size);
        debug!(
            "fetching {} bytes at {} from {} in {} chunks ({} workers)",
            length,
            start,
            object.identifier(),
            ranges.len(),
            self.config.max_workers
        );

        // `buffered` yields in submission order, so chunks arrive sorted by offset
        let mut chunks = stream::iter(ranges)
            .map(|range| read_exact(object, range))
            .buffered(self.config.max_workers.max(1));

        let mut content = BytesMut::with_capacity(length as usize);
        while let Some(chunk) = chunks.try_next().await? {
            content.extend_from_slice(&chunk);
        }

        Ok(content.freeze())
    }
}

async fn read_exact<R: RangeRead>(object: &RemoteObject<R>, range: RangeRequest) -> Result<Bytes> {
    let bytes = object.reader().read_range(range.start, range.end).await?;
    if bytes.len() as u64 != range.len() {
        return Err(Error::RangeRead(format!(
            "short read for {} on {}: expected {} bytes, got {}",
            range.header_value(),
            object.identifier(),
            range.len(),
            bytes.len()
        )));
    }
    Ok(bytes)
}
