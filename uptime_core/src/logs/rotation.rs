use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use super::{check_log_id, ARCHIVE_EXTENSION, LIVE_LOG_EXTENSION};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Default, Serialize)]
pub struct RotationReport {
    pub rotated: Vec<String>,
    pub failed: Vec<String>,
}

/// Compresses live logs into write-once archives and truncates them.
///
/// An entry appended between the read and the truncate of a rotation ends up
/// only in the live log that survives the truncate; it is not in the archive.
#[derive(Clone, Debug)]
pub struct LogRotator {
    dir: PathBuf,
}

impl LogRotator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn archive_id(check_id: &str, rotated_at: DateTime<Utc>) -> String {
        format!("{}-{}", check_id, rotated_at.timestamp_millis())
    }

    fn live_path(&self, check_id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", check_id, LIVE_LOG_EXTENSION))
    }

    fn archive_path(&self, archive_id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", archive_id, ARCHIVE_EXTENSION))
    }

    async fn file_names(&self) -> Result<Vec<(String, u64)>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push((name.to_string(), metadata.len()));
            }
        }
        Ok(names)
    }

    /// Check ids whose live log currently holds data.
    pub async fn list_active(&self) -> Result<BTreeSet<String>> {
        let suffix = format!(".{}", LIVE_LOG_EXTENSION);
        Ok(self
            .file_names()
            .await?
            .into_iter()
            .filter(|(_, len)| *len > 0)
            .filter_map(|(name, _)| name.strip_suffix(suffix.as_str()).map(str::to_string))
            .collect())
    }

    /// Archive ids, optionally restricted to one check.
    pub async fn list_archives(&self, check_id: Option<&str>) -> Result<Vec<String>> {
        let suffix = format!(".{}", ARCHIVE_EXTENSION);
        let prefix = check_id.map(|id| format!("{}-", id));
        let mut archives: Vec<String> = self
            .file_names()
            .await?
            .into_iter()
            .filter_map(|(name, _)| name.strip_suffix(suffix.as_str()).map(str::to_string))
            .filter(|id| prefix.as_deref().map_or(true, |p| id.starts_with(p)))
            .collect();
        archives.sort();
        Ok(archives)
    }

    /// Rotates the live log of `check_id` into a new archive stamped with
    /// the current time. Returns the archive id, or `None` if the log was empty.
    pub async fn rotate(&self, check_id: &str) -> Result<Option<String>> {
        let archive_id = Self::archive_id(check_id, Utc::now());
        self.rotate_into(check_id, &archive_id).await
    }

    /// Rotation with an explicit archive id. The live log is truncated only
    /// after the archive has been written; any failure before that leaves it
    /// untouched.
    pub async fn rotate_into(&self, check_id: &str, archive_id: &str) -> Result<Option<String>> {
        check_log_id(check_id)?;
        check_log_id(archive_id)?;

        let live = self.live_path(check_id);
        let content = fs::read(&live).await.map_err(|e| {
            AppError::Archive(format!("error reading log file {}: {}", live.display(), e))
        })?;
        if content.is_empty() {
            debug!(check_id, "Live log is empty, nothing to rotate");
            return Ok(None);
        }

        let encoded = compress(&content)?;

        let archive = self.archive_path(archive_id);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&archive)
            .await
            .map_err(|e| {
                AppError::Archive(format!("error opening archive {}: {}", archive.display(), e))
            })?;
        file.write_all(encoded.as_bytes())
            .await
            .map_err(|e| AppError::Archive(format!("error writing to {}: {}", archive.display(), e)))?;
        file.sync_all()
            .await
            .map_err(|e| AppError::Archive(format!("error closing {}: {}", archive.display(), e)))?;

        let log = OpenOptions::new().write(true).open(&live).await?;
        log.set_len(0).await.map_err(|e| {
            AppError::Archive(format!("error truncating log file {}: {}", live.display(), e))
        })?;

        info!(check_id, archive_id, bytes = content.len(), "Rotated evaluation log");
        Ok(Some(archive_id.to_string()))
    }

    /// Rotates every active log; a failing log does not stop the others.
    pub async fn rotate_all(&self) -> Result<RotationReport> {
        let mut report = RotationReport::default();

        for check_id in self.list_active().await? {
            match self.rotate(&check_id).await {
                Ok(Some(archive_id)) => report.rotated.push(archive_id),
                Ok(None) => {}
                Err(e) => {
                    error!(check_id = %check_id, "Error rotating log: {}", e);
                    report.failed.push(check_id);
                }
            }
        }

        Ok(report)
    }

    /// Decompresses an archive back into the live log text it was made from.
    /// Bytes that are not valid UTF-8 come back as U+FFFD.
    pub async fn read_archive(&self, archive_id: &str) -> Result<String> {
        let bytes = self.read_archive_bytes(archive_id).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Decompresses an archive back into the exact bytes of the live log.
    pub async fn read_archive_bytes(&self, archive_id: &str) -> Result<Vec<u8>> {
        check_log_id(archive_id)?;
        let path = self.archive_path(archive_id);
        let encoded = fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                AppError::NotFound(format!("archive {}", archive_id))
            } else {
                AppError::Archive(format!("error reading archive {}: {}", path.display(), e))
            }
        })?;
        decompress(&encoded)
    }
}

/// Gzip followed by standard base64.
pub fn compress(content: &[u8]) -> Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(content)
        .map_err(|e| AppError::Archive(format!("compression failed: {}", e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| AppError::Archive(format!("compression failed: {}", e)))?;
    Ok(STANDARD.encode(compressed))
}

pub fn decompress(encoded: &str) -> Result<Vec<u8>> {
    let compressed = STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::Archive(format!("archive is not valid base64: {}", e)))?;
    let mut content = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut content)
        .map_err(|e| AppError::Archive(format!("decompression failed: {}", e)))?;
    Ok(content)
}
