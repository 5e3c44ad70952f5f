use bytes::Bytes;
use flate2::read::DeflateDecoder;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Error, Result};
use crate::fetch::RangeFetcher;
use crate::io::{RangeRead, RemoteObject};

use super::resolver::{Directory, DirectoryResolver};
use super::structures::{CentralDirectoryEntry, CompressionMethod, LFH_NAME_LEN_OFFSET, LFH_SIZE};

/// Pulls single members out of a resolved archive.
pub struct EntryExtractor<'a> {
    fetcher: &'a RangeFetcher,
}

impl<'a> EntryExtractor<'a> {
    pub fn new(fetcher: &'a RangeFetcher) -> Self {
        Self { fetcher }
    }

    /// Extract the member `name` to memory.
    ///
    /// # Errors
    ///
    /// `Error::EntryNotFound` if `name` is not in `directory`,
    /// `Error::Encrypted` for encrypted members,
    /// `Error::UnsupportedCompression` for methods other than stored/deflate,
    /// `Error::Decompression` for a corrupt deflate stream.
    pub async fn extract<R: RangeRead>(
        &self,
        object: &RemoteObject<R>,
        directory: &Directory,
        name: &str,
    ) -> Result<Bytes> {
        let entry = directory
            .get(name)
            .ok_or_else(|| Error::EntryNotFound(name.to_string()))?;
        self.extract_entry(object, entry).await
    }

    /// Extract an entry already looked up in the directory.
    pub async fn extract_entry<R: RangeRead>(
        &self,
        object: &RemoteObject<R>,
        entry: &CentralDirectoryEntry,
    ) -> Result<Bytes> {
        // Reject before touching the network
        if entry.is_encrypted() {
            return Err(Error::Encrypted(entry.file_name.clone()));
        }
        if let CompressionMethod::Unknown(method) = entry.compression_method {
            return Err(Error::UnsupportedCompression(method));
        }

        let data_offset = self.data_offset(object, entry).await?;
        debug!(
            "{}: {} bytes of {:?} data at {}",
            entry.file_name, entry.compressed_size, entry.compression_method, data_offset
        );
        let content = self
            .fetcher
            .fetch(object, data_offset, entry.compressed_size)
            .await?;

        match entry.compression_method {
            CompressionMethod::Stored => Ok(content),
            CompressionMethod::Deflate => inflate(entry, &content).map(Bytes::from),
            CompressionMethod::Unknown(method) => Err(Error::UnsupportedCompression(method)),
        }
    }

    /// Offset of the member's payload.
    ///
    /// The local header's name and extra fields may differ from the central
    /// directory's, so their lengths are read from the local header itself.
    pub async fn data_offset<R: RangeRead>(
        &self,
        object: &RemoteObject<R>,
        entry: &CentralDirectoryEntry,
    ) -> Result<u64> {
        let overflow = || {
            Error::MalformedArchive(format!(
                "{}: local header offset {} is out of range",
                entry.file_name, entry.header_offset
            ))
        };

        let lengths_offset = entry
            .header_offset
            .checked_add(LFH_NAME_LEN_OFFSET)
            .ok_or_else(overflow)?;
        let lengths = self.fetcher.fetch(object, lengths_offset, 4).await?;
        let file_name_length = u16::from_le_bytes([lengths[0], lengths[1]]) as u64;
        let extra_field_length = u16::from_le_bytes([lengths[2], lengths[3]]) as u64;

        entry
            .header_offset
            .checked_add(LFH_SIZE + file_name_length + extra_field_length)
            .ok_or_else(overflow)
    }
}

/// Inflate a raw deflate payload and check it against the directory record.
fn inflate(entry: &CentralDirectoryEntry, content: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    DeflateDecoder::new(content)
        .read_to_end(&mut output)
        .map_err(|e| Error::Decompression(format!("{}: {}", entry.file_name, e)))?;

    if output.len() as u64 != entry.uncompressed_size {
        return Err(Error::Decompression(format!(
            "{}: inflated to {} bytes, expected {}",
            entry.file_name,
            output.len(),
            entry.uncompressed_size
        )));
    }

    let mut crc = flate2::Crc::new();
    crc.update(&output);
    if crc.sum() != entry.crc32 {
        return Err(Error::Decompression(format!(
            "{}: CRC-32 mismatch (got {:#010x}, expected {:#010x})",
            entry.file_name,
            crc.sum(),
            entry.crc32
        )));
    }

    Ok(output)
}

/// An opened remote archive: object, fetch policy and resolved directory.
pub struct RemoteZip<R: RangeRead> {
    object: RemoteObject<R>,
    fetcher: RangeFetcher,
    directory: Arc<Directory>,
}

impl<R: RangeRead> RemoteZip<R> {
    /// Probe the object's size and resolve its central directory.
    pub async fn open(reader: Arc<R>, fetcher: RangeFetcher) -> Result<Self> {
        let object = RemoteObject::open(reader).await?;
        let directory = DirectoryResolver::new(&fetcher).resolve(&object).await?;
        Ok(Self {
            object,
            fetcher,
            directory: Arc::new(directory),
        })
    }

    pub fn object(&self) -> &RemoteObject<R> {
        &self.object
    }

    pub fn directory(&self) -> &Arc<Directory> {
        &self.directory
    }

    /// All central directory records in discovery order
    pub fn entries(&self) -> &[CentralDirectoryEntry] {
        self.directory.entries()
    }

    /// Extract file data to memory
    pub async fn extract(&self, name: &str) -> Result<Bytes> {
        EntryExtractor::new(&self.fetcher)
            .extract(&self.object, &self.directory, name)
            .await
    }

    /// Extract file to disk
    pub async fn extract_to_file(&self, name: &str, output_path: &Path) -> Result<()> {
        let data = self.extract(name).await?;

        // Create parent directories if needed
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = fs::File::create(output_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        Ok(())
    }
}
