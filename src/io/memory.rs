use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Mutex;

use super::RangeRead;
use crate::error::{Error, Result};
use crate::fetch::RangeRequest;

/// In-memory object that records every range it serves.
///
/// Useful for tests and for archives already held in memory.
pub struct MemoryReader {
    name: String,
    data: Bytes,
    requests: Mutex<Vec<RangeRequest>>,
}

impl MemoryReader {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Ranges served so far, in call order
    pub fn requests(&self) -> Vec<RangeRequest> {
        self.requests
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn clear_requests(&self) {
        if let Ok(mut log) = self.requests.lock() {
            log.clear();
        }
    }
}

#[async_trait]
impl RangeRead for MemoryReader {
    fn identifier(&self) -> &str {
        &self.name
    }

    async fn size(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    async fn read_range(&self, start: u64, end_inclusive: u64) -> Result<Bytes> {
        if end_inclusive < start || end_inclusive >= self.data.len() as u64 {
            return Err(Error::RangeRead(format!(
                "range {}-{} outside {} ({} bytes)",
                start,
                end_inclusive,
                self.name,
                self.data.len()
            )));
        }

        if let Ok(mut log) = self.requests.lock() {
            log.push(RangeRequest::new(start, end_inclusive));
        }

        Ok(self.data.slice(start as usize..=end_inclusive as usize))
    }
}
