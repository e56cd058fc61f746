//! ffmpeg / ffprobe subprocess wrapper
//!
//! Audio extraction, audio stripping and embedded-title lookup. Every child
//! process is spawned with `kill_on_drop`, so dropping the awaiting future
//! (e.g. on cancellation) also terminates the subprocess.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Extension written by audio extraction
pub const AUDIO_OUTPUT_EXTENSION: &str = "m4a";

/// Extension written by audio stripping
pub const VIDEO_OUTPUT_EXTENSION: &str = "mov";

/// Transcoder errors
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// Binary could not be spawned because it does not exist
    #[error("{0} not found (is it installed and in PATH?)")]
    BinaryNotFound(String),

    #[error("Failed to execute {binary}: {message}")]
    ExecutionError { binary: String, message: String },

    #[error("{binary} failed for {file}: {stderr}")]
    Failed {
        binary: String,
        file: PathBuf,
        stderr: String,
    },

    #[error("Failed to parse ffprobe output for {file}: {message}")]
    ParseError { file: PathBuf, message: String },

    /// The media file carries no title tag
    #[error("No embedded title in {0}")]
    NoTitle(PathBuf),

    #[error("Input file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a conversion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeOutcome {
    /// Output was produced
    Written(PathBuf),
    /// Output already existed with non-zero size
    Skipped(PathBuf),
}

impl TranscodeOutcome {
    pub fn path(&self) -> &Path {
        match self {
            TranscodeOutcome::Written(p) | TranscodeOutcome::Skipped(p) => p,
        }
    }
}

/// Media operations the conversion commands depend on
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Embedded title tag of a media file
    async fn audio_title(&self, file: &Path) -> Result<String, TranscodeError>;

    /// Copy the audio stream of `input` into `out_dir/<stem>.m4a`
    async fn extract_audio(
        &self,
        input: &Path,
        out_dir: &Path,
    ) -> Result<TranscodeOutcome, TranscodeError>;

    /// Copy the video stream of `input` into `out_dir/<stem>.mov`, dropping audio
    async fn strip_audio(
        &self,
        input: &Path,
        out_dir: &Path,
    ) -> Result<TranscodeOutcome, TranscodeError>;
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    tags: Option<HashMap<String, String>>,
}

/// Pull the title out of `ffprobe -output_format json` output
///
/// Tag keys differ in case between containers (`title` vs `TITLE`).
pub fn parse_probe_title(file: &Path, json: &[u8]) -> Result<String, TranscodeError> {
    let probe: ProbeOutput =
        serde_json::from_slice(json).map_err(|e| TranscodeError::ParseError {
            file: file.to_path_buf(),
            message: e.to_string(),
        })?;

    probe
        .format
        .tags
        .as_ref()
        .and_then(|tags| {
            tags.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("title"))
                .map(|(_, v)| v.trim().to_string())
        })
        .filter(|title| !title.is_empty())
        .ok_or_else(|| TranscodeError::NoTitle(file.to_path_buf()))
}

/// `out_dir/<stem of input>.<extension>`
pub fn output_path(input: &Path, out_dir: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    out_dir.join(format!("{}.{}", stem, extension))
}

/// True when `path` exists and is not empty
pub fn has_content(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.len() > 0)
        .unwrap_or(false)
}

/// Transcoder backed by the ffmpeg command-line tools
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    async fn run(
        &self,
        binary: &Path,
        args: &[OsString],
        file: &Path,
    ) -> Result<Vec<u8>, TranscodeError> {
        let binary_name = binary.display().to_string();

        let output = Command::new(binary)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::BinaryNotFound(binary_name.clone())
                } else {
                    TranscodeError::ExecutionError {
                        binary: binary_name.clone(),
                        message: e.to_string(),
                    }
                }
            })?;

        if !output.status.success() {
            return Err(TranscodeError::Failed {
                binary: binary_name,
                file: file.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    async fn copy_stream(
        &self,
        input: &Path,
        out_dir: &Path,
        extension: &str,
        stream_args: [&str; 3],
    ) -> Result<TranscodeOutcome, TranscodeError> {
        if !input.exists() {
            return Err(TranscodeError::FileNotFound(input.to_path_buf()));
        }

        let out_file = output_path(input, out_dir, extension);
        if has_content(&out_file) {
            tracing::info!(file = %input.display(), output = %out_file.display(), "Skipping, output exists");
            return Ok(TranscodeOutcome::Skipped(out_file));
        }

        tracing::debug!(file = %input.display(), output = %out_file.display(), "Running ffmpeg");

        let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), input.into()];
        args.extend(stream_args.iter().map(OsString::from));
        args.push(out_file.clone().into());

        self.run(&self.ffmpeg_path, &args, input).await?;
        Ok(TranscodeOutcome::Written(out_file))
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn audio_title(&self, file: &Path) -> Result<String, TranscodeError> {
        if !file.exists() {
            return Err(TranscodeError::FileNotFound(file.to_path_buf()));
        }

        let mut args: Vec<OsString> = [
            "-show_format",
            "-show_streams",
            "-output_format",
            "json",
            "-loglevel",
            "error",
            "-i",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(file.into());

        let stdout = self.run(&self.ffprobe_path, &args, file).await?;
        parse_probe_title(file, &stdout)
    }

    async fn extract_audio(
        &self,
        input: &Path,
        out_dir: &Path,
    ) -> Result<TranscodeOutcome, TranscodeError> {
        self.copy_stream(input, out_dir, AUDIO_OUTPUT_EXTENSION, ["-vn", "-acodec", "copy"])
            .await
    }

    async fn strip_audio(
        &self,
        input: &Path,
        out_dir: &Path,
    ) -> Result<TranscodeOutcome, TranscodeError> {
        self.copy_stream(input, out_dir, VIDEO_OUTPUT_EXTENSION, ["-an", "-vcodec", "copy"])
            .await
    }
}
