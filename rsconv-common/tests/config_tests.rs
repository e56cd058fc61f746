//! Configuration resolution tests
//!
//! Tests that manipulate RSCONV_CONFIG are marked with #[serial] so they do
//! not race each other on the process environment.

use rsconv_common::config::{TomlConfig, CONFIG_ENV_VAR, DEFAULT_BASE_URL};
use rsconv_common::Error;
use serial_test::serial;
use std::env;
use std::fs;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing_subscriber::layer::SubscriberExt;

/// Writer collecting formatted log lines for assertions
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
#[serial]
fn test_explicit_path_is_loaded() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
        base_url = "http://192.168.1.20:8089/api/v1/"
        settle_delay_ms = 250

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.base_url, "http://192.168.1.20:8089/api/v1/");
    assert_eq!(config.settle_delay_ms, 250);
    assert_eq!(config.logging.level, "debug");
    // Unset keys keep their defaults
    assert_eq!(config.video_extension, "mov");
}

#[test]
#[serial]
fn test_explicit_missing_path_is_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.toml");

    let result = TomlConfig::load(Some(&path));
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
#[serial]
fn test_env_var_path_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("env.toml");
    fs::write(&path, "audio_extension = \"wav\"\n").unwrap();
    env::set_var(CONFIG_ENV_VAR, &path);

    let config = TomlConfig::load(None);
    env::remove_var(CONFIG_ENV_VAR);

    let config = config.unwrap();
    assert_eq!(config.audio_extension, "wav");
    assert_eq!(config.base_url, DEFAULT_BASE_URL);
}

#[test]
#[serial]
fn test_cli_path_wins_over_env_var() {
    let dir = TempDir::new().unwrap();
    let env_path = dir.path().join("env.toml");
    let cli_path = dir.path().join("cli.toml");
    fs::write(&env_path, "settle_delay_ms = 1\n").unwrap();
    fs::write(&cli_path, "settle_delay_ms = 2\n").unwrap();
    env::set_var(CONFIG_ENV_VAR, &env_path);

    let config = TomlConfig::load(Some(&cli_path));
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.unwrap().settle_delay_ms, 2);
}

#[test]
#[serial]
fn test_unreadable_config_is_io_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();

    // A directory exists but cannot be read as a file
    let result = TomlConfig::load(Some(dir.path()));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_missing_default_config_logs_warning() {
    // Given: no explicit file and an empty per-user config dir
    env::remove_var(CONFIG_ENV_VAR);
    let config_home = TempDir::new().unwrap();
    let previous = env::var_os("XDG_CONFIG_HOME");
    env::set_var("XDG_CONFIG_HOME", config_home.path());

    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(move || writer.clone()),
    );

    // When
    let config = tracing::subscriber::with_default(subscriber, || TomlConfig::load(None));

    match previous {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }

    // Then: defaults are used and the fallback is reported
    assert_eq!(config.unwrap(), TomlConfig::default());
    let output = logs.contents();
    assert!(output.contains("WARN"), "no warning in: {}", output);
    assert!(output.contains("using built-in defaults"), "unexpected log: {}", output);
}
