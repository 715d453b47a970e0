//! Zip extraction for feed archives.

use std::fs::File;
use std::io::{self, Cursor};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::debug;

/// Extracts the `.txt` members of a zip archive directly into `dest`.
///
/// Feeds are flat, but many archives wrap them in a folder; members are
/// written by file name only. The first member with a given name wins.
pub fn extract_feed_zip(data: &[u8], dest: &Path) -> Result<usize> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).context("Failed to read zip archive")?;
    let mut extracted = 0;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .with_context(|| format!("Failed to read zip entry at index {i}"))?;

        if file.is_dir() {
            continue;
        }

        let Some(name) = file
            .enclosed_name()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        else {
            debug!(entry = file.name(), "Skipping entry with unsafe path");
            continue;
        };

        if !name.ends_with(".txt") || name.starts_with('.') {
            continue;
        }

        let target = dest.join(&name);
        if target.exists() {
            debug!(file = %name, "Duplicate member ignored");
            continue;
        }

        let mut out =
            File::create(&target).with_context(|| format!("Failed to create {}", target.display()))?;
        let bytes = io::copy(&mut file, &mut out)
            .with_context(|| format!("Failed to extract zip entry: {name}"))?;
        debug!(file = %name, bytes, "Extracted");
        extracted += 1;
    }

    if extracted == 0 {
        bail!("archive contains no feed files");
    }
    Ok(extracted)
}
