//! Rename source videos after their embedded title
//!
//! Each `*.mp4` in the directory becomes `<title>.mp4`, so later audio
//! extraction and stripping produce files whose basenames pair up. A file is
//! left alone when the destination already exists with content (which also
//! covers files that already carry their title).

use super::batch_converter::{list_files, BatchError};
use crate::transcoder::{has_content, Transcoder};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Extension of the source videos handled by the renamer
pub const INPUT_EXTENSION: &str = "mp4";

/// What happened to one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed { from: PathBuf, to: PathBuf },
    Skipped { file: PathBuf, existing: PathBuf },
}

/// File name for a title; path separators would move the file elsewhere
pub fn title_file_name(title: &str, extension: &str) -> String {
    let safe: String = title
        .chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();
    format!("{}.{}", safe, extension)
}

/// Rename every input video in `dir` after its embedded title
pub async fn rename_inputs(
    transcoder: &dyn Transcoder,
    dir: &Path,
    cancel: &CancellationToken,
) -> Result<Vec<RenameOutcome>, BatchError> {
    let inputs: Vec<PathBuf> = list_files(dir)?
        .into_iter()
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(INPUT_EXTENSION))
        .collect();

    let mut outcomes = Vec::with_capacity(inputs.len());
    for file in inputs {
        if cancel.is_cancelled() {
            return Err(BatchError::Cancelled);
        }

        let title = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BatchError::Cancelled),
            result = transcoder.audio_title(&file) => result.map_err(|source| BatchError::Transcode {
                file: file.clone(),
                source,
            })?,
        };
        tracing::info!(file = %file.display(), title = %title, "Audio title");

        let target = dir.join(title_file_name(&title, INPUT_EXTENSION));
        if has_content(&target) {
            tracing::info!(file = %file.display(), "Skipping, destination exists");
            outcomes.push(RenameOutcome::Skipped {
                file,
                existing: target,
            });
            continue;
        }

        std::fs::rename(&file, &target).map_err(|source| BatchError::Rename {
            from: file.clone(),
            to: target.clone(),
            source,
        })?;
        outcomes.push(RenameOutcome::Renamed {
            from: file,
            to: target,
        });
    }

    Ok(outcomes)
}
