#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;

use rangezip::{Error, RangeRead, Result};

pub const MB: usize = 1024 * 1024;

/// Deterministic, poorly compressible bytes
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}

/// Highly compressible text
pub fn text(len: usize) -> Vec<u8> {
    b"<burst><azimuthTime>2020-06-16T02:22:54</azimuthTime></burst>\n"
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}

pub struct Member<'a> {
    pub name: &'a str,
    pub data: &'a [u8],
    pub deflate: bool,
}

impl<'a> Member<'a> {
    pub fn stored(name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            data,
            deflate: false,
        }
    }

    pub fn deflated(name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            data,
            deflate: true,
        }
    }
}

/// Build an archive with the `zip` crate
pub fn build_zip(members: &[Member<'_>], comment: Option<&str>) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

    for member in members {
        let method = if member.deflate {
            zip::CompressionMethod::Deflated
        } else {
            zip::CompressionMethod::Stored
        };
        let options = SimpleFileOptions::default().compression_method(method);

        if member.name.ends_with('/') {
            writer.add_directory(member.name, options).unwrap();
        } else {
            writer.start_file(member.name, options).unwrap();
            writer.write_all(member.data).unwrap();
        }
    }

    if let Some(comment) = comment {
        writer.set_comment(comment);
    }

    writer.finish().unwrap().into_inner()
}

/// Decompress a member with the `zip` crate's reader
pub fn reference_extract(archive: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).unwrap();
    buf
}

pub fn reference_names(archive: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

/// (cd_offset, cd_size, total_entries) from an archive without a comment
pub fn eocd_fields(archive: &[u8]) -> (u64, u64, u16) {
    let eocd = &archive[archive.len() - 22..];
    assert_eq!(&eocd[0..4], b"PK\x05\x06");
    let total = u16::from_le_bytes([eocd[10], eocd[11]]);
    let cd_size = u32::from_le_bytes(eocd[12..16].try_into().unwrap()) as u64;
    let cd_offset = u32::from_le_bytes(eocd[16..20].try_into().unwrap()) as u64;
    (cd_offset, cd_size, total)
}

/// Offset of a member's payload, read straight from the archive bytes
pub fn payload_offset(archive: &[u8], header_offset: usize) -> usize {
    assert_eq!(&archive[header_offset..header_offset + 4], b"PK\x03\x04");
    let name_len = u16::from_le_bytes([archive[header_offset + 26], archive[header_offset + 27]]);
    let extra_len = u16::from_le_bytes([archive[header_offset + 28], archive[header_offset + 29]]);
    header_offset + 30 + name_len as usize + extra_len as usize
}

/// Object of arbitrary size backed by a few populated segments; the rest reads as zeros.
pub struct SparseReader {
    size: u64,
    segments: Vec<(u64, Vec<u8>)>,
}

impl SparseReader {
    /// Move a small archive's central directory to the end of an object of `size` bytes.
    ///
    /// Local headers and payloads stay at their original offsets. Objects above
    /// 4 GiB get a ZIP64 end of central directory record and locator.
    pub fn relocate(archive: &[u8], size: u64) -> Self {
        let (cd_offset, cd_size, total) = eocd_fields(archive);
        let payloads = archive[..cd_offset as usize].to_vec();
        let cd = archive[cd_offset as usize..(cd_offset + cd_size) as usize].to_vec();

        let mut tail = Vec::new();
        let new_cd_offset;

        if size <= u32::MAX as u64 {
            new_cd_offset = size - 22 - cd_size;
            tail.extend_from_slice(&cd);
            tail.extend_from_slice(&eocd(total, cd_size as u32, new_cd_offset as u32));
        } else {
            new_cd_offset = size - 22 - 20 - 56 - cd_size;
            let record_offset = new_cd_offset + cd_size;

            tail.extend_from_slice(&cd);
            tail.extend_from_slice(b"PK\x06\x06");
            tail.extend_from_slice(&44u64.to_le_bytes());
            tail.extend_from_slice(&45u16.to_le_bytes());
            tail.extend_from_slice(&45u16.to_le_bytes());
            tail.extend_from_slice(&0u32.to_le_bytes());
            tail.extend_from_slice(&0u32.to_le_bytes());
            tail.extend_from_slice(&(total as u64).to_le_bytes());
            tail.extend_from_slice(&(total as u64).to_le_bytes());
            tail.extend_from_slice(&cd_size.to_le_bytes());
            tail.extend_from_slice(&new_cd_offset.to_le_bytes());

            tail.extend_from_slice(b"PK\x06\x07");
            tail.extend_from_slice(&0u32.to_le_bytes());
            tail.extend_from_slice(&record_offset.to_le_bytes());
            tail.extend_from_slice(&1u32.to_le_bytes());

            tail.extend_from_slice(&eocd(0xFFFF, 0xFFFFFFFF, 0xFFFFFFFF));
        }

        assert_eq!(new_cd_offset + tail.len() as u64, size);
        Self {
            size,
            segments: vec![(0, payloads), (new_cd_offset, tail)],
        }
    }
}

fn eocd(total: u16, cd_size: u32, cd_offset: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(22);
    buf.extend_from_slice(b"PK\x05\x06");
    buf.extend_from_slice(&[0, 0, 0, 0]);
    buf.extend_from_slice(&total.to_le_bytes());
    buf.extend_from_slice(&total.to_le_bytes());
    buf.extend_from_slice(&cd_size.to_le_bytes());
    buf.extend_from_slice(&cd_offset.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf
}

#[async_trait]
impl RangeRead for SparseReader {
    fn identifier(&self) -> &str {
        "sparse"
    }

    async fn size(&self) -> Result<u64> {
        Ok(self.size)
    }

    async fn read_range(&self, start: u64, end_inclusive: u64) -> Result<Bytes> {
        if end_inclusive >= self.size || end_inclusive < start {
            return Err(Error::RangeRead(format!("{}-{}", start, end_inclusive)));
        }

        let mut buf = vec![0u8; (end_inclusive - start + 1) as usize];
        for (offset, data) in &self.segments {
            let seg_end = offset + data.len() as u64;
            let lo = start.max(*offset);
            let hi = (end_inclusive + 1).min(seg_end);
            if lo < hi {
                buf[(lo - start) as usize..(hi - start) as usize]
                    .copy_from_slice(&data[(lo - offset) as usize..(hi - offset) as usize]);
            }
        }
        Ok(Bytes::from(buf))
    }
}
