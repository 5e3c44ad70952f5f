use super::RangeRead;
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Local file reader with random access support
pub struct LocalFileReader {
    file: Arc<File>,
    path: String,
}

impl LocalFileReader {
    pub fn new(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
            _ => Error::Io(e),
        })?;
        Ok(Self {
            file: Arc::new(file),
            path: path.display().to_string(),
        })
    }
}

#[async_trait]
impl RangeRead for LocalFileReader {
    fn identifier(&self) -> &str {
        &self.path
    }

    async fn size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    async fn read_range(&self, start: u64, end_inclusive: u64) -> Result<Bytes> {
        if end_inclusive < start {
            return Err(Error::RangeRead(format!(
                "invalid range {}-{}",
                start, end_inclusive
            )));
        }

        let file = Arc::clone(&self.file);
        let path = self.path.clone();
        let len = (end_inclusive - start + 1) as usize;

        // Positional reads block, keep them off the runtime's worker threads
        tokio::task::spawn_blocking(move || read_at(&file, &path, start, len))
            .await
            .map_err(|e| Error::RangeRead(format!("{} at {}: {}", self.path, start, e)))?
            .map(Bytes::from)
    }
}

fn read_at(file: &File, path: &str, start: u64, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];

    #[cfg(unix)]
    {
        use std::os::unix::fs::FileExt;
        file.read_exact_at(&mut buf, start)
            .map_err(|e| Error::RangeRead(format!("{} at {}: {}", path, start, e)))?;
    }

    #[cfg(windows)]
    {
        use std::os::windows::fs::FileExt;
        let mut filled = 0;
        while filled < buf.len() {
            let n = file
                .seek_read(&mut buf[filled..], start + filled as u64)
                .map_err(|e| Error::RangeRead(format!("{} at {}: {}", path, start, e)))?;
            if n == 0 {
                return Err(Error::RangeRead(format!(
                    "short read for {} at {}",
                    path, start
                )));
            }
            filled += n;
        }
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchConfig, RangeFetcher};
    use crate::io::RemoteObject;

    fn temp_file(name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("rangezip-{}-{}", std::process::id(), name));
        std::fs::write(&path, data).unwrap();
        path
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_chunked_reads_on_single_threaded_runtime() {
        let data: Vec<u8> = (0..5000).map(|i| (i % 253) as u8).collect();
        let path = temp_file("chunked.bin", &data);

        let reader = Arc::new(LocalFileReader::new(&path).unwrap());
        let object = RemoteObject::open(reader).await.unwrap();
        let fetcher = RangeFetcher::new(
            FetchConfig::default()
                .with_threshold(100)
                .with_chunk_size(100)
                .with_max_workers(8),
        );

        let content = fetcher.fetch(&object, 13, 4900).await.unwrap();
        assert_eq!(&content[..], &data[13..4913]);

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_read_past_end_is_range_error() {
        let path = temp_file("short.bin", b"0123456789");
        let reader = LocalFileReader::new(&path).unwrap();

        let err = reader.read_range(5, 20).await.unwrap_err();
        assert!(matches!(err, Error::RangeRead(_)));
        assert!(matches!(
            reader.read_range(4, 2).await,
            Err(Error::RangeRead(_))
        ));

        std::fs::remove_file(&path).unwrap();
    }
}
