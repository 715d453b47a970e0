//! Staging: resolves the `file` argument to a local directory of feed files.
//!
//! URLs and zip archives are extracted into a temporary directory owned by
//! the [`StagedFeed`]; a local directory is used in place and never deleted.

mod extract;

pub use extract::extract_feed_zip;

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::info;

use crate::error::{GtfsDbError, Result};
use crate::fetch::{HttpClient, fetch_bytes};

#[derive(Debug)]
pub struct StagedFeed {
    path: PathBuf,
    temp: Option<TempDir>,
}

impl StagedFeed {
    /// Wraps an existing directory; removal leaves it alone.
    pub fn borrowed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temp: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether removal deletes the directory.
    pub fn is_owned(&self) -> bool {
        self.temp.is_some()
    }

    /// Deletes the extracted files, if this feed owns them.
    pub fn remove(self) -> Result<()> {
        match self.temp {
            Some(temp) => {
                temp.close()
                    .map_err(|e| GtfsDbError::source_acquisition(&self.path.display().to_string(), e))?;
                info!(path = %self.path.display(), "Removed staged feed");
            }
            None => info!(path = %self.path.display(), "Feed directory left in place"),
        }
        Ok(())
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn extract_to_temp(source: &str, data: &[u8]) -> Result<StagedFeed> {
    let temp = tempfile::Builder::new()
        .prefix("gtfsdb-")
        .tempdir()
        .map_err(|e| GtfsDbError::source_acquisition(source, e))?;
    let files = extract_feed_zip(data, temp.path())
        .map_err(|e| GtfsDbError::source_acquisition(source, format!("{e:#}")))?;

    info!(source, files, path = %temp.path().display(), "Staged feed");
    Ok(StagedFeed {
        path: temp.path().to_path_buf(),
        temp: Some(temp),
    })
}

/// Resolves `source` (URL, zip path, or directory) to a staged feed.
///
/// # Errors
///
/// [`GtfsDbError::SourceAcquisition`] if the source is unreachable, missing,
/// or not a readable zip archive.
#[tracing::instrument(skip(client))]
pub async fn stage<C: HttpClient>(source: &str, client: &C) -> Result<StagedFeed> {
    if is_url(source) {
        let data = fetch_bytes(client, source)
            .await
            .map_err(|e| GtfsDbError::source_acquisition(source, format!("{e:#}")))?;
        return extract_to_temp(source, &data);
    }

    let path = Path::new(source);
    if path.is_dir() {
        info!(source, "Using feed directory in place");
        return Ok(StagedFeed::borrowed(path));
    }
    if !path.is_file() {
        return Err(GtfsDbError::source_acquisition(source, "no such file or directory"));
    }

    let data = std::fs::read(path).map_err(|e| GtfsDbError::source_acquisition(source, e))?;
    extract_to_temp(source, &data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::{Cursor, Write};

    /// Local sources must never reach the network.
    struct Offline;

    #[async_trait]
    impl HttpClient for Offline {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            unreachable!("local sources are not fetched")
        }
    }

    fn zip_file(dir: &Path) -> PathBuf {
        let path = dir.join("feed.zip");
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("agency.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"agency_id,agency_name\nA,Agency\n").unwrap();
        std::fs::write(&path, writer.finish().unwrap().into_inner()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_stage_zip_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let archive = zip_file(dir.path());

        let staged = stage(archive.to_str().unwrap(), &Offline).await.unwrap();
        let staged_path = staged.path().to_path_buf();
        assert!(staged.is_owned());
        assert!(staged_path.join("agency.txt").exists());

        staged.remove().unwrap();
        assert!(!staged_path.exists());
    }

    #[tokio::test]
    async fn test_directory_is_borrowed() {
        let dir = tempfile::tempdir().unwrap();

        let staged = stage(dir.path().to_str().unwrap(), &Offline).await.unwrap();
        assert!(!staged.is_owned());

        staged.remove().unwrap();
        assert!(dir.path().exists());
    }

    #[tokio::test]
    async fn test_missing_path_is_source_error() {
        let err = stage("/definitely/not/here.zip", &Offline).await.unwrap_err();
        assert!(matches!(err, GtfsDbError::SourceAcquisition { .. }));
    }
}
