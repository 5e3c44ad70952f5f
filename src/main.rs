//! Main entry point for the rangezip CLI application.
//!
//! Lists or extracts members of a ZIP archive behind an HTTP(S) URL or on
//! the local filesystem, reading only the bytes each operation needs.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rangezip::{
    CentralDirectoryEntry, Cli, HttpRangeReader, LocalFileReader, RangeFetcher, RangeRead,
    RemoteZip,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let fetcher = RangeFetcher::new(cli.fetch_config());

    if cli.is_http_url() {
        let reader = Arc::new(HttpRangeReader::new(cli.file.clone())?);
        process_zip(reader.clone(), fetcher, &cli).await?;

        // Display network transfer statistics for HTTP sources
        if !cli.is_quiet() {
            eprintln!(
                "\nTotal bytes transferred: {}",
                format_size(reader.transferred_bytes())
            );
        }
    } else {
        let reader = Arc::new(LocalFileReader::new(Path::new(&cli.file))?);
        process_zip(reader, fetcher, &cli).await?;
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise info, warn under `-q`, error under `-qq`.
fn init_tracing(cli: &Cli) {
    let filter_level = if cli.is_very_quiet() {
        "error"
    } else if cli.is_quiet() {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("rangezip={filter_level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// List the archive, or extract the requested members.
async fn process_zip<R: RangeRead + 'static>(
    reader: Arc<R>,
    fetcher: RangeFetcher,
    cli: &Cli,
) -> Result<()> {
    let archive = RemoteZip::open(reader, fetcher)
        .await
        .with_context(|| format!("opening {}", cli.file))?;

    if cli.list || cli.verbose {
        list_files(archive.entries(), cli.verbose);
        return Ok(());
    }

    if cli.members.is_empty() {
        bail!("no members given; use -l to list the archive");
    }

    let show_filename = cli.pipe && cli.members.len() > 1;
    for member in &cli.members {
        extract_member(&archive, member, cli, show_filename)
            .await
            .with_context(|| format!("extracting {}", member))?;
    }

    Ok(())
}

/// List members in simple (`-l`) or verbose (`-v`) format.
fn list_files(entries: &[CentralDirectoryEntry], verbose: bool) {
    if !verbose {
        for entry in entries {
            println!("{}", entry.file_name);
        }
        return;
    }

    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
        "Length", "Size", "Cmpr", "Date", "Time"
    );
    println!("{}", "-".repeat(70));

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in entries {
        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();

        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        );

        if !entry.is_directory() {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>10}  {:>10}  {}  {:>21}  {} files",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        "",
        file_count
    );
}

/// Percentage saved by compression
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}

/// Extract one member to stdout or to disk.
async fn extract_member<R: RangeRead + 'static>(
    archive: &RemoteZip<R>,
    member: &str,
    cli: &Cli,
    show_filename: bool,
) -> Result<()> {
    if cli.pipe {
        let data = archive.extract(member).await?;
        let mut stdout = tokio::io::stdout();
        if show_filename {
            stdout
                .write_all(format!("--- {} ---\n", member).as_bytes())
                .await?;
        }
        stdout.write_all(&data).await?;
        stdout.flush().await?;
        return Ok(());
    }

    let file_name = if cli.junk_paths {
        Path::new(member)
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| member.to_string())
    } else {
        member.to_string()
    };
    let output_path = match cli.extract_dir {
        Some(ref dir) => PathBuf::from(dir).join(&file_name),
        None => PathBuf::from(&file_name),
    };

    if !cli.is_quiet() {
        println!("  extracting: {}", member);
    }

    archive.extract_to_file(member, &output_path).await?;

    Ok(())
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
