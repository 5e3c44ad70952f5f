//! Central directory resolution.
//!
//! ZIP files are designed to be read from the end:
//! 1. Read the End of Central Directory (EOCD) from the object's tail
//! 2. For objects larger than 4 GiB, read the ZIP64 EOCD and its locator,
//!    which sit immediately before the EOCD
//! 3. Fetch the Central Directory in one (possibly chunked) ranged read
//! 4. Parse every Central Directory File Header into a name-keyed table
//!
//! Only the tail and the central directory are ever transferred.

use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::fetch::RangeFetcher;
use crate::io::{RangeRead, RemoteObject};

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Resolved central directory of one archive.
///
/// Immutable once built; share it behind an `Arc` (or plain references)
/// across concurrent extractions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    location: DirectoryLocation,
    entries: Vec<CentralDirectoryEntry>,
    index: HashMap<String, usize>,
}

impl Directory {
    /// Build a directory from entries in discovery order. Later duplicates shadow earlier ones.
    pub fn new(location: DirectoryLocation, entries: Vec<CentralDirectoryEntry>) -> Self {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if let Some(previous) = index.insert(entry.file_name.clone(), position) {
                warn!(
                    "duplicate entry name {:?} (records {} and {}), keeping the last",
                    entry.file_name, previous, position
                );
            }
        }
        Self {
            location,
            entries,
            index,
        }
    }

    pub fn location(&self) -> &DirectoryLocation {
        &self.location
    }

    pub fn get(&self, name: &str) -> Option<&CentralDirectoryEntry> {
        self.index.get(name).map(|&position| &self.entries[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Every central directory record in discovery order, duplicates included
    pub fn entries(&self) -> &[CentralDirectoryEntry] {
        &self.entries
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Reads the tail and central directory of a remote archive.
pub struct DirectoryResolver<'a> {
    fetcher: &'a RangeFetcher,
}

impl<'a> DirectoryResolver<'a> {
    pub fn new(fetcher: &'a RangeFetcher) -> Self {
        Self { fetcher }
    }

    /// Resolve the central directory of `object`.
    ///
    /// Objects up to [`MAX_STANDARD_ZIP_SIZE`] bytes are read through the
    /// standard EOCD; larger ones through the ZIP64 EOCD. Only the
    /// whole-object size decides which path is taken.
    ///
    /// # Errors
    ///
    /// `Error::MalformedArchive` if any record is missing, has a bad
    /// signature, or the central directory does not parse to exactly its
    /// declared size. Read failures surface as `Error::RangeRead`.
    pub async fn resolve<R: RangeRead>(&self, object: &RemoteObject<R>) -> Result<Directory> {
        let location = self.locate(object).await?;
        info!(
            "{}: {:?} central directory, {} bytes at {}",
            object.identifier(),
            location.kind,
            location.cd_size,
            location.cd_offset
        );

        let cd_data = self
            .fetcher
            .fetch(object, location.cd_offset, location.cd_size)
            .await?;
        let entries = parse_central_directory(&cd_data)?;

        check_entry_count(&location, entries.len())?;
        debug!("parsed {} central directory records", entries.len());

        Ok(Directory::new(location, entries))
    }

    /// Find the central directory from the object's tail.
    pub async fn locate<R: RangeRead>(&self, object: &RemoteObject<R>) -> Result<DirectoryLocation> {
        let size = object.size();
        let (eocd, eocd_offset) = self.find_eocd(object).await?;

        if size <= MAX_STANDARD_ZIP_SIZE {
            return Ok(DirectoryLocation {
                cd_offset: eocd.cd_offset as u64,
                cd_size: eocd.cd_size as u64,
                total_entries: eocd.total_entries as u64,
                kind: EocdKind::Standard,
            });
        }

        let eocd64 = self.read_zip64_eocd(object, eocd_offset).await?;
        Ok(DirectoryLocation {
            cd_offset: eocd64.cd_offset,
            cd_size: eocd64.cd_size,
            total_entries: eocd64.total_entries,
            kind: EocdKind::Zip64,
        })
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// The trailing 22 bytes are tried first. Only if they are not an EOCD
    /// with an empty comment is the last 64 KiB searched backwards for a
    /// record whose comment runs exactly to the end of the object.
    ///
    /// Returns the record and its absolute offset.
    async fn find_eocd<R: RangeRead>(
        &self,
        object: &RemoteObject<R>,
    ) -> Result<(EndOfCentralDirectory, u64)> {
        let size = object.size();
        let record_size = EndOfCentralDirectory::SIZE as u64;
        if size < record_size {
            return Err(Error::MalformedArchive(format!(
                "{} is {} bytes, too small for an end of central directory record",
                object.identifier(),
                size
            )));
        }

        let offset = size - record_size;
        let tail = self.fetcher.fetch(object, offset, record_size).await?;
        if EndOfCentralDirectory::is_bare_record(&tail) {
            return Ok((EndOfCentralDirectory::from_bytes(&tail)?, offset));
        }

        debug!("no bare EOCD at the tail of {}, searching for a commented one", object.identifier());
        let search_size = (MAX_COMMENT_SIZE + record_size).min(size);
        let search_start = size - search_size;
        let buf = self.fetcher.fetch(object, search_start, search_size).await?;

        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                // The comment length field should match the remaining bytes
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd =
                        EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(Error::MalformedArchive(format!(
            "no end of central directory record in {}",
            object.identifier()
        )))
    }

    /// Read the ZIP64 record and locator that precede the EOCD at `eocd_offset`.
    async fn read_zip64_eocd<R: RangeRead>(
        &self,
        object: &RemoteObject<R>,
        eocd_offset: u64,
    ) -> Result<Zip64EOCD> {
        let tail_len = (Zip64EOCD::SIZE + Zip64EOCDLocator::SIZE) as u64;
        if eocd_offset < tail_len {
            return Err(Error::MalformedArchive(
                "no room for ZIP64 end of central directory records".to_string(),
            ));
        }

        let record_offset = eocd_offset - tail_len;
        let locator_offset = eocd_offset - Zip64EOCDLocator::SIZE as u64;

        let record = self
            .fetcher
            .fetch(object, record_offset, Zip64EOCD::SIZE as u64)
            .await?;
        let locator = self
            .fetcher
            .fetch(object, locator_offset, Zip64EOCDLocator::SIZE as u64)
            .await?;

        let locator = Zip64EOCDLocator::from_bytes(&locator)?;
        if locator.eocd64_offset != record_offset {
            warn!(
                "ZIP64 locator points at {}, reading the record at {}",
                locator.eocd64_offset, record_offset
            );
        }

        Zip64EOCD::from_bytes(&record)
    }
}

/// Cross-check the parsed record count against the end of central directory.
///
/// The standard record only has 16 bits for the count, and writers that
/// exceed 65535 entries without switching to ZIP64 store it modulo 65536,
/// so only the low 16 bits are compared there. `0xFFFF` is the ZIP64
/// placeholder and accepts any count. ZIP64 counts must match exactly.
fn check_entry_count(location: &DirectoryLocation, parsed: usize) -> Result<()> {
    let parsed = parsed as u64;
    let consistent = match location.kind {
        EocdKind::Standard => {
            location.total_entries == 0xFFFF || location.total_entries == parsed & 0xFFFF
        }
        EocdKind::Zip64 => location.total_entries == parsed,
    };
    if !consistent {
        return Err(Error::MalformedArchive(format!(
            "central directory holds {} records, end of central directory declares {}",
            parsed, location.total_entries
        )));
    }
    Ok(())
}

/// Parse a complete central directory.
///
/// Records are read back to back until the buffer is exhausted; a record
/// that does not fit inside the buffer is an error.
pub fn parse_central_directory(data: &[u8]) -> Result<Vec<CentralDirectoryEntry>> {
    let mut entries = Vec::new();
    let mut cursor = Cursor::new(data);

    while (cursor.position() as usize) < data.len() {
        entries.push(parse_cdfh(&mut cursor)?);
    }

    Ok(entries)
}

/// Parse a Central Directory File Header from a cursor.
///
/// On return the cursor sits on the next record.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<CentralDirectoryEntry> {
    let record_start = cursor.position();
    let remaining = cursor.get_ref().len() as u64 - record_start;
    if remaining < CDFH_MIN_SIZE as u64 {
        return Err(Error::MalformedArchive(format!(
            "{} trailing bytes at {} do not hold a central directory header",
            remaining, record_start
        )));
    }

    let err = truncated("central directory header");

    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig).map_err(&err)?;
    if sig != CDFH_SIGNATURE {
        return Err(Error::MalformedArchive(format!(
            "invalid central directory header signature at {}",
            record_start
        )));
    }

    let _version_made_by = cursor.read_u16::<LittleEndian>().map_err(&err)?;
    let _version_needed = cursor.read_u16::<LittleEndian>().map_err(&err)?;
    let flags = cursor.read_u16::<LittleEndian>().map_err(&err)?;
    let compression_method = cursor.read_u16::<LittleEndian>().map_err(&err)?;
    let last_mod_time = cursor.read_u16::<LittleEndian>().map_err(&err)?;
    let last_mod_date = cursor.read_u16::<LittleEndian>().map_err(&err)?;
    let crc32 = cursor.read_u32::<LittleEndian>().map_err(&err)?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>().map_err(&err)? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>().map_err(&err)? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>().map_err(&err)? as u64;
    let extra_field_length = cursor.read_u16::<LittleEndian>().map_err(&err)? as u64;
    let file_comment_length = cursor.read_u16::<LittleEndian>().map_err(&err)? as u64;
    let _disk_number_start = cursor.read_u16::<LittleEndian>().map_err(&err)?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>().map_err(&err)?;
    let _external_attrs = cursor.read_u32::<LittleEndian>().map_err(&err)?;
    let mut header_offset = cursor.read_u32::<LittleEndian>().map_err(&err)? as u64;

    let record_end = record_start
        + CDFH_MIN_SIZE as u64
        + file_name_length
        + extra_field_length
        + file_comment_length;
    if record_end > cursor.get_ref().len() as u64 {
        return Err(Error::MalformedArchive(format!(
            "central directory header at {} runs past the declared directory size",
            record_start
        )));
    }

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes).map_err(&err)?;
    // Lossy conversion keeps non-UTF8 names addressable
    let file_name = String::from_utf8_lossy(&file_name_bytes).to_string();

    // ZIP64 extended information: fields present only for 0xFFFFFFFF header values
    let extra_field_end = cursor.position() + extra_field_length;
    while cursor.position() + 4 <= extra_field_end {
        let header_id = cursor.read_u16::<LittleEndian>().map_err(&err)?;
        let field_size = cursor.read_u16::<LittleEndian>().map_err(&err)? as u64;
        let field_end = (cursor.position() + field_size).min(extra_field_end);

        if header_id == ZIP64_EXTRA_ID {
            if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                uncompressed_size = cursor.read_u64::<LittleEndian>().map_err(&err)?;
            }
            if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                compressed_size = cursor.read_u64::<LittleEndian>().map_err(&err)?;
            }
            if header_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                header_offset = cursor.read_u64::<LittleEndian>().map_err(&err)?;
            }
        }
        cursor.set_position(field_end);
    }

    // Skip whatever is left of the extra field and the comment
    cursor.set_position(record_end);

    Ok(CentralDirectoryEntry {
        file_name,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        flags,
        header_offset,
        last_mod_time,
        last_mod_date,
    })
}
