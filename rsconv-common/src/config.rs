//! Configuration loading for rsconv tools
//!
//! Settings sources priority:
//! 1. Command-line arguments (--base-url, --config)
//! 2. Environment variables (RSCONV_BASE_URL, RSCONV_CONFIG)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! A missing default config file is not fatal: a warning is logged and the
//! built-in defaults are used. An explicitly requested file must exist.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RSCONV_CONFIG";

/// Default control API root of a locally running Resolume instance
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8089/api/v1/";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Base URL of the composition control API (must end with `/`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Delay between opening a clip and patching its parameters
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Extension of audio assets (without leading dot)
    #[serde(default = "default_audio_extension")]
    pub audio_extension: String,

    /// Extension of video assets (without leading dot)
    #[serde(default = "default_video_extension")]
    pub video_extension: String,

    /// ffmpeg binary (looked up in PATH unless absolute)
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// ffprobe binary (looked up in PATH unless absolute)
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Clip parameter values written after a clip is opened
    #[serde(default)]
    pub patch: PatchConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// A choice parameter value: display value plus its index in the option list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChoiceValue {
    pub value: String,
    pub index: i64,
}

/// Transport values applied to newly provisioned clips
///
/// These describe the playback environment (an external player driving the
/// clip), so they come from configuration and never from the template clip.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PatchConfig {
    #[serde(default = "default_transport_type")]
    pub transport_type: ChoiceValue,

    #[serde(default = "default_target")]
    pub target: ChoiceValue,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_audio_extension() -> String {
    "m4a".to_string()
}

fn default_video_extension() -> String {
    "mov".to_string()
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_transport_type() -> ChoiceValue {
    ChoiceValue {
        value: "Denon DJ".to_string(),
        index: 4,
    }
}

fn default_target() -> ChoiceValue {
    ChoiceValue {
        value: "Denon Player Determined".to_string(),
        index: 4,
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            transport_type: default_transport_type(),
            target: default_target(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            audio_extension: default_audio_extension(),
            video_extension: default_video_extension(),
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            logging: LoggingConfig::default(),
            patch: PatchConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration following the priority order
    ///
    /// `cli_path` wins over `RSCONV_CONFIG`; either one must point at an
    /// existing file. Without both, the platform default location is tried and
    /// built-in defaults are used when it does not exist.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let explicit = cli_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::NotFound(format!(
                    "config file {}",
                    path.display()
                )));
            }
            info!("Loading configuration from {}", path.display());
            return Self::from_file(&path);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)
            }
            Some(path) => {
                warn!(
                    "No config file at {}, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Command-line/environment base URL wins over the file value
    pub fn with_base_url_override(mut self, base_url: Option<&str>) -> Self {
        if let Some(url) = base_url {
            self.base_url = url.to_string();
        }
        self
    }
}

/// Platform default configuration file location
///
/// `~/.config/rsconv/config.toml` on Linux, the equivalent per-user config
/// directory elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rsconv").join("config.toml"))
}
