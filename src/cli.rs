use clap::Parser;
use std::time::Duration;

use crate::fetch::{FetchConfig, MB};

#[derive(Parser, Debug)]
#[command(name = "rangezip")]
#[command(version)]
#[command(about = "Extract members from remote ZIP archives with ranged reads", long_about = None)]
#[command(after_help = "Examples:\n  \
  rangezip -l https://example.com/scene.zip                 list members of a remote ZIP\n  \
  rangezip https://example.com/scene.zip a/b.xml -d out    extract one member into out/\n  \
  rangezip -p scene.zip manifest.safe | less               send a member to stdout")]
pub struct Cli {
    /// ZIP file path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Members to extract (exact archive paths)
    #[arg(value_name = "MEMBERS")]
    pub members: Vec<String>,

    /// List members (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract members to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract members into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Junk paths (do not make directories)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Reads above this many MiB are split into parallel chunks
    #[arg(long, value_name = "MIB", default_value_t = 8)]
    pub threshold: u64,

    /// Chunk size in MiB for split reads
    #[arg(long, value_name = "MIB", default_value_t = 8)]
    pub chunk_size: u64,

    /// Maximum concurrent chunk reads
    #[arg(long, value_name = "N", default_value_t = 20)]
    pub workers: usize,

    /// Abort any single fetch that takes longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig::default()
            .with_threshold(self.threshold * MB)
            .with_chunk_size(self.chunk_size * MB)
            .with_max_workers(self.workers)
            .with_deadline(self.timeout.map(Duration::from_secs))
    }
}
