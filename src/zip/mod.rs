//! ZIP archive resolution and extraction over ranged reads.
//!
//! ## Architecture
//!
//! - [`structures`]: ZIP format records (EOCD, ZIP64 EOCD, central directory entries)
//! - [`resolver`]: finds and parses the central directory from the object's tail
//! - [`extractor`]: fetches and inflates a single member
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! Reading the EOCD first and then the Central Directory means a member can
//! be located and pulled without reading anything else from the archive.
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - Only STORED and DEFLATE members can be extracted
//! - ZIP64 is selected by total object size alone

mod extractor;
mod resolver;
mod structures;

pub use extractor::{EntryExtractor, RemoteZip};
pub use resolver::{Directory, DirectoryResolver, parse_central_directory};
pub use structures::*;
