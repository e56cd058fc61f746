//! Audio/video asset pairing
//!
//! An asset name is ready when `<audio_dir>/<name>.<audio_ext>` and
//! `<video_dir>/<name>.<video_ext>` both exist. Matching is anchored on audio:
//! audio without video is reported back as a warning, video without audio is
//! ignored.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Asset matcher errors
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Failed to list {path}: {message}")]
    ListFailed { path: PathBuf, message: String },
}

/// Outcome of pairing two directories
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetMatch {
    /// Names present in both directories, ascending
    pub matched: Vec<String>,
    /// Audio names with no video counterpart, ascending
    pub missing_video: Vec<String>,
}

/// Pairs audio and video basenames
#[derive(Debug, Clone)]
pub struct AssetMatcher {
    audio_extension: String,
    video_extension: String,
}

impl AssetMatcher {
    pub fn new(audio_extension: impl Into<String>, video_extension: impl Into<String>) -> Self {
        Self {
            audio_extension: audio_extension.into(),
            video_extension: video_extension.into(),
        }
    }

    pub fn audio_extension(&self) -> &str {
        &self.audio_extension
    }

    pub fn video_extension(&self) -> &str {
        &self.video_extension
    }

    /// Path of the audio file for an asset name
    pub fn audio_path(&self, audio_dir: &Path, name: &str) -> PathBuf {
        audio_dir.join(format!("{}.{}", name, self.audio_extension))
    }

    /// Path of the video file for an asset name
    pub fn video_path(&self, video_dir: &Path, name: &str) -> PathBuf {
        video_dir.join(format!("{}.{}", name, self.video_extension))
    }

    /// Pair the two directories
    pub fn match_assets(&self, audio_dir: &Path, video_dir: &Path) -> Result<AssetMatch, MatchError> {
        let audio = basenames(audio_dir, &self.audio_extension)?;
        let video = basenames(video_dir, &self.video_extension)?;

        let mut result = AssetMatch::default();
        for name in audio {
            if video.contains(&name) {
                result.matched.push(name);
            } else {
                tracing::warn!(asset = %name, "Audio file has no matching video, skipping");
                result.missing_video.push(name);
            }
        }

        tracing::info!(
            matched = result.matched.len(),
            missing_video = result.missing_video.len(),
            "Asset matching complete"
        );

        Ok(result)
    }
}

/// Stems of the regular files directly inside `dir` with exactly `extension`
fn basenames(dir: &Path, extension: &str) -> Result<BTreeSet<String>, MatchError> {
    if !dir.is_dir() {
        return Err(MatchError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut names = BTreeSet::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = entry.map_err(|e| MatchError::ListFailed {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }

        match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) if !stem.is_empty() => {
                names.insert(stem.to_string());
            }
            _ => tracing::debug!(file = %path.display(), "Ignoring file without usable name"),
        }
    }

    Ok(names)
}
