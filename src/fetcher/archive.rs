//! DLTINS archive download and extraction
//!
//! The archive is streamed to disk in fixed-size chunks so the body is never
//! held in memory, then unpacked with its entry paths preserved.

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use super::{FetcherError, FetcherResult};
use crate::pipeline::config::DOWNLOAD_CHUNK_SIZE;

/// Streaming archive downloader
pub struct ArchiveDownloader {
    client: Client,
    chunk_size: usize,
}

impl ArchiveDownloader {
    /// Create a downloader writing in [`DOWNLOAD_CHUNK_SIZE`] chunks
    pub fn new(client: Client) -> Self {
        Self {
            client,
            chunk_size: DOWNLOAD_CHUNK_SIZE,
        }
    }

    /// Override the write chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Stream `url` to `dest`, returning the number of bytes written
    ///
    /// # Errors
    /// `NetworkError` on transport failure or non-success status,
    /// `IoError` if `dest` cannot be written.
    pub async fn download(&self, url: &str, dest: &Path) -> FetcherResult<u64> {
        debug!("Downloading archive from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetcherError::NetworkError(format!(
                "Archive download failed: HTTP {}",
                response.status()
            )));
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FetcherError::IoError(format!("Failed to create directory: {e}")))?;
        }
        let file = File::create(dest)
            .map_err(|e| FetcherError::IoError(format!("Failed to create {}: {e}", dest.display())))?;
        let mut writer = BufWriter::with_capacity(self.chunk_size, file);

        let progress = create_progress_bar(response.content_length());
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(frame) = stream.next().await {
            let frame = frame.map_err(|e| FetcherError::NetworkError(e.to_string()))?;
            for chunk in frame.chunks(self.chunk_size) {
                writer
                    .write_all(chunk)
                    .map_err(|e| FetcherError::IoError(format!("Failed to write archive: {e}")))?;
                written += chunk.len() as u64;
            }
            progress.set_position(written);
        }

        writer
            .flush()
            .map_err(|e| FetcherError::IoError(format!("Failed to flush archive: {e}")))?;
        progress.finish_and_clear();

        info!("Saved {} bytes to {}", written, dest.display());
        Ok(written)
    }
}

fn create_progress_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(len) => {
            let pb = ProgressBar::new(len);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
                    .expect("hardcoded template is valid")
                    .progress_chars("#>-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {bytes} ({bytes_per_sec})")
                    .expect("hardcoded template is valid"),
            );
            pb
        }
    }
}

/// Extract every entry of the ZIP at `archive_path` into `dest_dir`
///
/// Entry names and directories are preserved; entries whose names would
/// escape `dest_dir` are skipped. Returns the paths of extracted files.
///
/// # Errors
/// `ArchiveError` if the archive is corrupt or not a ZIP, `IoError` if
/// extracted files cannot be written.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> FetcherResult<Vec<PathBuf>> {
    let file = File::open(archive_path).map_err(|e| {
        FetcherError::IoError(format!("Failed to open {}: {e}", archive_path.display()))
    })?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| FetcherError::ArchiveError(format!("Failed to open ZIP: {e}")))?;

    std::fs::create_dir_all(dest_dir)
        .map_err(|e| FetcherError::IoError(format!("Failed to create directory: {e}")))?;

    let mut extracted = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| FetcherError::ArchiveError(format!("Failed to read ZIP entry: {e}")))?;

        let out_path = match entry.enclosed_name() {
            Some(name) => dest_dir.join(name),
            None => {
                warn!("Skipping entry with unsafe path: {}", entry.name());
                continue;
            }
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)
                .map_err(|e| FetcherError::IoError(format!("Failed to create directory: {e}")))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FetcherError::IoError(format!("Failed to create directory: {e}")))?;
        }
        let mut out_file = File::create(&out_path).map_err(|e| {
            FetcherError::IoError(format!("Failed to create {}: {e}", out_path.display()))
        })?;
        let bytes = std::io::copy(&mut entry, &mut out_file)
            .map_err(|e| FetcherError::ArchiveError(format!("Failed to extract {}: {e}", entry.name())))?;

        debug!("Extracted {} ({} bytes)", out_path.display(), bytes);
        extracted.push(out_path);
    }

    info!(
        "Extracted {} file(s) from {} into {}",
        extracted.len(),
        archive_path.display(),
        dest_dir.display()
    );
    Ok(extracted)
}
