//! Command-line surface of rsconv-cp
//!
//! Thin dispatch from parsed arguments to the client and services. Inspection
//! commands print to stdout (JSON pretty-printed); logs go to stderr.

use crate::resolume::{CompositionService, Layer, ResolumeClient};
use crate::services::{
    convert_directory, rename_inputs, AssetMatcher, ConvertMode, LayerRange, ProvisionSettings,
    Provisioner, RenameOutcome,
};
use crate::transcoder::FfmpegTranscoder;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rsconv_common::TomlConfig;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Command-line arguments for rsconv-cp
#[derive(Parser, Debug)]
#[command(name = "rsconv-cp")]
#[command(about = "Provision Resolume clips for transcoded audio/video pairs")]
#[command(version)]
pub struct Args {
    /// Base URL of the Resolume control API
    #[arg(long, env = "RSCONV_BASE_URL")]
    pub base_url: Option<String>,

    /// Configuration file (defaults to RSCONV_CONFIG, then the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Inspect composition layers (default: list)
    Layers {
        #[command(subcommand)]
        action: Option<LayersAction>,
    },
    /// Dump the composition (default: get)
    Composition {
        #[command(subcommand)]
        action: Option<CompositionAction>,
    },
    /// Inspect clips
    Clips {
        #[command(subcommand)]
        action: ClipsAction,
    },
    /// Convert media and provision clips
    Convert {
        #[command(subcommand)]
        action: ConvertAction,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum LayersAction {
    /// One line per layer: index, name, id
    List,
    /// Layers as JSON
    Get,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum CompositionAction {
    /// Composition as JSON
    Get,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ClipsAction {
    /// Currently selected clip as JSON
    Selected,
    /// Clip by id as JSON
    Get { clip_id: i64 },
    /// Save a clip thumbnail as PNG
    Thumbnail {
        clip_id: i64,
        /// Output file (default: <clip_id>.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConvertAction {
    /// Rename *.mp4 inputs after their embedded title
    Input { dir: PathBuf },
    /// Extract audio of every input into <out_dir>
    Audio { in_dir: PathBuf, out_dir: PathBuf },
    /// Rename inputs, then extract their audio
    InputAudio { in_dir: PathBuf, out_dir: PathBuf },
    /// Strip audio from every input into <out_dir>
    Video { in_dir: PathBuf, out_dir: PathBuf },
    /// Provision clips for matched audio/video pairs into layers start..=end
    Import {
        audio_dir: PathBuf,
        video_dir: PathBuf,
        start_layer: usize,
        end_layer: usize,
    },
}

/// `<index>: <name> (<id>)` per layer
pub fn format_layer_list(layers: &[Layer]) -> Vec<String> {
    layers
        .iter()
        .enumerate()
        .map(|(index, layer)| format!("{}: {} ({})", index, layer.name.display_value(), layer.id))
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn until_cancelled<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => anyhow::bail!("Cancelled"),
        result = future => result,
    }
}

fn build_client(config: &TomlConfig) -> Result<ResolumeClient> {
    ResolumeClient::new(
        &config.base_url,
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("Failed to create control API client")
}

fn build_transcoder(config: &TomlConfig) -> FfmpegTranscoder {
    FfmpegTranscoder::new(&config.ffmpeg_path, &config.ffprobe_path)
}

/// Execute a parsed command
pub async fn run(command: Command, config: &TomlConfig, cancel: &CancellationToken) -> Result<()> {
    match command {
        Command::Layers { action } => {
            let client = build_client(config)?;
            let layers = until_cancelled(cancel, async {
                client.get_layers().await.context("Failed to read layers")
            })
            .await?;
            match action.unwrap_or(LayersAction::List) {
                LayersAction::List => {
                    for line in format_layer_list(&layers) {
                        println!("{}", line);
                    }
                    Ok(())
                }
                LayersAction::Get => print_json(&layers),
            }
        }
        Command::Composition { action } => {
            let client = build_client(config)?;
            match action.unwrap_or(CompositionAction::Get) {
                CompositionAction::Get => {
                    let composition = until_cancelled(cancel, async {
                        client
                            .get_composition()
                            .await
                            .context("Failed to read composition")
                    })
                    .await?;
                    print_json(&composition)
                }
            }
        }
        Command::Clips { action } => run_clips(action, config, cancel).await,
        Command::Convert { action } => run_convert(action, config, cancel).await,
    }
}

async fn run_clips(action: ClipsAction, config: &TomlConfig, cancel: &CancellationToken) -> Result<()> {
    let client = build_client(config)?;
    match action {
        ClipsAction::Selected => {
            let clip = until_cancelled(cancel, async {
                client
                    .get_selected_clip()
                    .await
                    .context("Failed to read selected clip")
            })
            .await?;
            print_json(&clip)
        }
        ClipsAction::Get { clip_id } => {
            let clip = until_cancelled(cancel, async {
                client
                    .get_clip(clip_id)
                    .await
                    .with_context(|| format!("Failed to read clip {}", clip_id))
            })
            .await?;
            print_json(&clip)
        }
        ClipsAction::Thumbnail { clip_id, output } => {
            let png = until_cancelled(cancel, async {
                client
                    .get_thumbnail(clip_id)
                    .await
                    .with_context(|| format!("Failed to read thumbnail of clip {}", clip_id))
            })
            .await?;
            let output = output.unwrap_or_else(|| PathBuf::from(format!("{}.png", clip_id)));
            std::fs::write(&output, png)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Thumbnail written to {}", output.display());
            Ok(())
        }
    }
}

async fn run_convert(
    action: ConvertAction,
    config: &TomlConfig,
    cancel: &CancellationToken,
) -> Result<()> {
    let transcoder = build_transcoder(config);
    match action {
        ConvertAction::Input { dir } => {
            let outcomes = rename_inputs(&transcoder, &dir, cancel).await?;
            log_renames(&outcomes);
            Ok(())
        }
        ConvertAction::Audio { in_dir, out_dir } => {
            let summary = convert_directory(
                &transcoder,
                ConvertMode::ExtractAudio,
                &in_dir,
                &out_dir,
                cancel,
            )
            .await?;
            info!(written = summary.written.len(), skipped = summary.skipped.len(), "Audio extraction complete");
            Ok(())
        }
        ConvertAction::InputAudio { in_dir, out_dir } => {
            let outcomes = rename_inputs(&transcoder, &in_dir, cancel).await?;
            log_renames(&outcomes);
            let summary = convert_directory(
                &transcoder,
                ConvertMode::ExtractAudio,
                &in_dir,
                &out_dir,
                cancel,
            )
            .await?;
            info!(written = summary.written.len(), skipped = summary.skipped.len(), "Audio extraction complete");
            Ok(())
        }
        ConvertAction::Video { in_dir, out_dir } => {
            let summary = convert_directory(
                &transcoder,
                ConvertMode::StripAudio,
                &in_dir,
                &out_dir,
                cancel,
            )
            .await?;
            info!(written = summary.written.len(), skipped = summary.skipped.len(), "Audio stripping complete");
            Ok(())
        }
        ConvertAction::Import {
            audio_dir,
            video_dir,
            start_layer,
            end_layer,
        } => {
            // Bounds are checked before anything is read from the remote side
            let layers = LayerRange::new(start_layer, end_layer)?;
            let client = build_client(config)?;

            let template = until_cancelled(cancel, async {
                client
                    .get_selected_clip()
                    .await
                    .context("Failed to read selected clip used as template")
            })
            .await?;
            info!(clip_id = template.id, "Using selected clip as template");

            let settings = ProvisionSettings {
                audio_dir,
                video_dir,
                layers,
                settle_delay: Duration::from_millis(config.settle_delay_ms),
                patch: config.patch.clone(),
            };
            let provisioner = Provisioner::new(
                Arc::new(client),
                Arc::new(transcoder),
                AssetMatcher::new(&config.audio_extension, &config.video_extension),
                settings,
            );

            let report = provisioner.run(&template, cancel).await?;
            print_json(&report)
        }
    }
}

fn log_renames(outcomes: &[RenameOutcome]) {
    for outcome in outcomes {
        match outcome {
            RenameOutcome::Renamed { from, to } => {
                info!(from = %from.display(), to = %to.display(), "Renamed")
            }
            RenameOutcome::Skipped { file, existing } => {
                info!(file = %file.display(), existing = %existing.display(), "Skipped")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_import() {
        let args = Args::try_parse_from([
            "rsconv-cp", "convert", "import", "/audio", "/video", "2", "4",
        ])
        .unwrap();
        assert_eq!(
            args.command,
            Command::Convert {
                action: ConvertAction::Import {
                    audio_dir: PathBuf::from("/audio"),
                    video_dir: PathBuf::from("/video"),
                    start_layer: 2,
                    end_layer: 4,
                }
            }
        );
    }

    #[test]
    fn test_parse_layers_without_action() {
        let args = Args::try_parse_from(["rsconv-cp", "layers"]).unwrap();
        assert_eq!(args.command, Command::Layers { action: None });
    }

    #[test]
    fn test_parse_base_url_and_thumbnail() {
        let args = Args::try_parse_from([
            "rsconv-cp",
            "--base-url",
            "http://10.0.0.5:8089/api/v1/",
            "clips",
            "thumbnail",
            "17",
            "-o",
            "thumb.png",
        ])
        .unwrap();
        assert_eq!(args.base_url.as_deref(), Some("http://10.0.0.5:8089/api/v1/"));
        assert_eq!(
            args.command,
            Command::Clips {
                action: ClipsAction::Thumbnail {
                    clip_id: 17,
                    output: Some(PathBuf::from("thumb.png")),
                }
            }
        );
    }

    #[test]
    fn test_parse_rejects_negative_layer() {
        let result = Args::try_parse_from([
            "rsconv-cp", "convert", "import", "/a", "/v", "-1", "2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_format_layer_list() {
        let layers: Vec<Layer> = serde_json::from_value(json!([
            {"id": 900, "name": {"value": "Backgrounds"}, "clips": []},
            {"id": 901, "name": {"value": "Lyrics"}, "clips": []}
        ]))
        .unwrap();

        assert_eq!(
            format_layer_list(&layers),
            vec!["0: Backgrounds (900)", "1: Lyrics (901)"]
        );
    }
}
