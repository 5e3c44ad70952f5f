use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{Error, Result};

/// Largest object size resolved through the standard (32-bit) EOCD.
pub const MAX_STANDARD_ZIP_SIZE: u64 = 4_294_967_295;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

pub(crate) fn truncated(what: &'static str) -> impl Fn(std::io::Error) -> Error {
    move |_| Error::MalformedArchive(format!("truncated {}", what))
}

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::MalformedArchive(
                "invalid end of central directory record".to_string(),
            ));
        }

        let mut cursor = Cursor::new(&data[4..]);
        let err = truncated("end of central directory record");

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>().map_err(&err)?,
            disk_with_cd: cursor.read_u16::<LittleEndian>().map_err(&err)?,
            disk_entries: cursor.read_u16::<LittleEndian>().map_err(&err)?,
            total_entries: cursor.read_u16::<LittleEndian>().map_err(&err)?,
            cd_size: cursor.read_u32::<LittleEndian>().map_err(&err)?,
            cd_offset: cursor.read_u32::<LittleEndian>().map_err(&err)?,
            comment_len: cursor.read_u16::<LittleEndian>().map_err(&err)?,
        })
    }

    /// Whether the 22 bytes look like an EOCD with an empty comment
    pub fn is_bare_record(data: &[u8]) -> bool {
        data.len() == Self::SIZE && &data[0..4] == Self::SIGNATURE && data[20..22] == [0, 0]
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zip64EOCDLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::MalformedArchive(
                "invalid ZIP64 end of central directory locator".to_string(),
            ));
        }

        let mut cursor = Cursor::new(&data[4..]);
        let err = truncated("ZIP64 locator");

        Ok(Self {
            disk_with_eocd64: cursor.read_u32::<LittleEndian>().map_err(&err)?,
            eocd64_offset: cursor.read_u64::<LittleEndian>().map_err(&err)?,
            total_disks: cursor.read_u32::<LittleEndian>().map_err(&err)?,
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zip64EOCD {
    pub eocd64_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::MalformedArchive(
                "invalid ZIP64 end of central directory record".to_string(),
            ));
        }

        let mut cursor = Cursor::new(&data[4..]);
        let err = truncated("ZIP64 end of central directory record");

        Ok(Self {
            eocd64_size: cursor.read_u64::<LittleEndian>().map_err(&err)?,
            version_made_by: cursor.read_u16::<LittleEndian>().map_err(&err)?,
            version_needed: cursor.read_u16::<LittleEndian>().map_err(&err)?,
            disk_number: cursor.read_u32::<LittleEndian>().map_err(&err)?,
            disk_with_cd: cursor.read_u32::<LittleEndian>().map_err(&err)?,
            disk_entries: cursor.read_u64::<LittleEndian>().map_err(&err)?,
            total_entries: cursor.read_u64::<LittleEndian>().map_err(&err)?,
            cd_size: cursor.read_u64::<LittleEndian>().map_err(&err)?,
            cd_offset: cursor.read_u64::<LittleEndian>().map_err(&err)?,
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIZE: u64 = 30;
/// Offset of the name/extra length pair inside the LFH
pub const LFH_NAME_LEN_OFFSET: u64 = 26;

/// Extra field id of the ZIP64 extended information record
pub const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Which end-of-central-directory variant located the central directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EocdKind {
    Standard,
    Zip64,
}

/// Where the central directory lives inside the object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryLocation {
    pub cd_offset: u64,
    pub cd_size: u64,
    pub total_entries: u64,
    pub kind: EocdKind,
}

/// One member record from the central directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryEntry {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    /// Informational; extraction never trusts it for allocation
    pub uncompressed_size: u64,
    pub crc32: u32,
    /// General purpose bit flags
    pub flags: u16,
    /// Absolute offset of the local file header within the object
    pub header_offset: u64,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
}

impl CentralDirectoryEntry {
    pub fn is_directory(&self) -> bool {
        self.file_name.ends_with('/')
    }

    /// Traditional or strong encryption (general purpose bit 0)
    pub fn is_encrypted(&self) -> bool {
        self.flags & 0x0001 != 0
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}
