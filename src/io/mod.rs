mod http;
mod local;
mod memory;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;
pub use memory::MemoryReader;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;

/// Byte-range access to a remote (or local) object.
///
/// Implementations must tolerate concurrent calls from many tasks; chunked
/// fetches issue several `read_range` calls at once.
#[async_trait]
pub trait RangeRead: Send + Sync {
    /// Human-readable identifier of the object (URL, bucket/key, path)
    fn identifier(&self) -> &str;

    /// Total object size in bytes. Fails with `Error::NotFound` if the object is absent.
    async fn size(&self) -> Result<u64>;

    /// Read the inclusive byte interval `[start, end_inclusive]`.
    ///
    /// Must return exactly `end_inclusive - start + 1` bytes or fail with
    /// `Error::RangeRead`.
    async fn read_range(&self, start: u64, end_inclusive: u64) -> Result<Bytes>;
}

/// A remote object with its size probed once.
pub struct RemoteObject<R: RangeRead> {
    reader: Arc<R>,
    size: u64,
}

impl<R: RangeRead> RemoteObject<R> {
    /// Probe the object size and wrap the reader.
    pub async fn open(reader: Arc<R>) -> Result<Self> {
        let size = reader.size().await?;
        debug!("opened {} ({} bytes)", reader.identifier(), size);
        Ok(Self { reader, size })
    }

    pub fn identifier(&self) -> &str {
        self.reader.identifier()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}

impl<R: RangeRead> Clone for RemoteObject<R> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
            size: self.size,
        }
    }
}
