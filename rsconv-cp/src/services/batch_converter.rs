//! Directory-wide media conversion
//!
//! Feeds every visible regular file of an input directory to the transcoder,
//! one at a time, checking for cancellation between files. The first failure
//! stops the batch.

use crate::transcoder::{TranscodeError, TranscodeOutcome, Transcoder};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

/// Batch conversion errors
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Converting {file} failed: {source}")]
    Transcode {
        file: PathBuf,
        source: TranscodeError,
    },

    #[error("Rename {from} -> {to} failed: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("Conversion cancelled")]
    Cancelled,
}

/// Which stream copy to run on each file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertMode {
    /// Keep only audio (`.m4a`)
    ExtractAudio,
    /// Keep only video (`.mov`)
    StripAudio,
}

/// Files written and skipped by a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Visible regular files directly inside `dir`, sorted by name
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::ReadDir {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| BatchError::ReadDir {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Convert every file of `in_dir` into `out_dir`
pub async fn convert_directory(
    transcoder: &dyn Transcoder,
    mode: ConvertMode,
    in_dir: &Path,
    out_dir: &Path,
    cancel: &CancellationToken,
) -> Result<BatchSummary, BatchError> {
    let files = list_files(in_dir)?;
    std::fs::create_dir_all(out_dir).map_err(|source| BatchError::CreateDir {
        path: out_dir.to_path_buf(),
        source,
    })?;

    tracing::info!(
        files = files.len(),
        mode = ?mode,
        input = %in_dir.display(),
        output = %out_dir.display(),
        "Starting batch conversion"
    );

    let mut summary = BatchSummary::default();
    for file in files {
        if cancel.is_cancelled() {
            return Err(BatchError::Cancelled);
        }

        tracing::info!(file = %file.display(), "Converting");

        let conversion = match mode {
            ConvertMode::ExtractAudio => transcoder.extract_audio(&file, out_dir),
            ConvertMode::StripAudio => transcoder.strip_audio(&file, out_dir),
        };
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BatchError::Cancelled),
            result = conversion => result.map_err(|source| BatchError::Transcode {
                file: file.clone(),
                source,
            })?,
        };

        match outcome {
            TranscodeOutcome::Written(path) => summary.written.push(path),
            TranscodeOutcome::Skipped(path) => summary.skipped.push(path),
        }
    }

    Ok(summary)
}
