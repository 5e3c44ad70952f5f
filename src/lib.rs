//! # rangezip
//!
//! Random-access extraction of single members from ZIP and ZIP64 archives
//! that live in a byte-range-addressable store (HTTP servers, presigned
//! object-store URLs, local files).
//!
//! Only the archive's tail, its central directory and the bytes of the
//! requested member are transferred. Large reads are split into chunks that
//! are fetched concurrently and reassembled in order.
//!
//! ## Features
//!
//! - Standard and ZIP64 end of central directory handling
//! - STORED and raw DEFLATE members, checked against their CRC-32
//! - Bounded parallel chunked range reads with an optional deadline
//! - Pluggable remote-read capability via the [`RangeRead`] trait
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rangezip::{FetchConfig, HttpRangeReader, RangeFetcher, RemoteObject};
//!
//! #[tokio::main]
//! async fn main() -> rangezip::Result<()> {
//!     let reader = Arc::new(HttpRangeReader::new("https://example.com/archive.zip".to_string())?);
//!     let object = RemoteObject::open(reader).await?;
//!     let fetcher = RangeFetcher::new(FetchConfig::default());
//!
//!     let directory = rangezip::resolve(&fetcher, &object).await?;
//!     let annotation = rangezip::extract(&fetcher, &object, &directory, "annotation.xml").await?;
//!     println!("{} bytes", annotation.len());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod fetch;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, Result};
pub use fetch::{FetchConfig, RangeFetcher, RangeRequest};
pub use io::{HttpRangeReader, LocalFileReader, MemoryReader, RangeRead, RemoteObject};
pub use crate::zip::{CentralDirectoryEntry, Directory, DirectoryLocation, EocdKind, RemoteZip};

use bytes::Bytes;

/// Resolve the central directory of `object`.
pub async fn resolve<R: RangeRead>(
    fetcher: &RangeFetcher,
    object: &RemoteObject<R>,
) -> Result<Directory> {
    crate::zip::DirectoryResolver::new(fetcher).resolve(object).await
}

/// Extract the member `name` from `object` using an already resolved `directory`.
pub async fn extract<R: RangeRead>(
    fetcher: &RangeFetcher,
    object: &RemoteObject<R>,
    directory: &Directory,
    name: &str,
) -> Result<Bytes> {
    crate::zip::EntryExtractor::new(fetcher)
        .extract(object, directory, name)
        .await
}
