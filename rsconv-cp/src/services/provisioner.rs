//! Clip provisioning pipeline
//!
//! For every matched asset, in matched order:
//! 1. Skip when a clip already plays the asset's video file
//! 2. Allocate the first empty slot in the configured layer range
//! 3. Read the embedded audio title
//! 4. Derive the new clip from the sanitized template
//! 5. Open the video into the slot, let the remote side settle, then patch
//!    name and transport parameters
//!
//! Any failure stops the run; assets already provisioned stay provisioned and
//! a re-run skips them. Every remote call, the transcoder and the settle delay
//! observe the cancellation token.
//!
//! Slot allocation and the following writes are not atomic. The run assumes no
//! other actor edits the composition concurrently.

use super::asset_matcher::{AssetMatcher, MatchError};
use super::slot_finder::{find_empty_slot, LayerRange, Slot, SlotError};
use super::template_sanitizer::sanitize;
use crate::resolume::{
    Clip, ClipVideo, CompositionService, FileInfo, ParamUpdate, PatchFields, ResolumeError,
};
use crate::transcoder::{TranscodeError, Transcoder};
use rsconv_common::config::PatchConfig;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Provisioning errors
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("Could not resolve video path for '{asset}': {message}")]
    InvalidPath { asset: String, message: String },

    #[error("Composition read failed for '{asset}': {source}")]
    Lookup {
        asset: String,
        source: ResolumeError,
    },

    #[error("Slot allocation failed for '{asset}': {source}")]
    Slot { asset: String, source: SlotError },

    #[error("Audio title lookup failed for '{asset}': {source}")]
    Metadata {
        asset: String,
        source: TranscodeError,
    },

    #[error("Opening '{asset}' into clip {clip_id} failed: {source}")]
    Open {
        asset: String,
        clip_id: i64,
        source: ResolumeError,
    },

    #[error("Patching clip {clip_id} for '{asset}' failed: {source}")]
    Patch {
        asset: String,
        clip_id: i64,
        source: ResolumeError,
    },

    #[error("Provisioning cancelled")]
    Cancelled,
}

/// Fixed inputs of a provisioning run
#[derive(Debug, Clone)]
pub struct ProvisionSettings {
    pub audio_dir: PathBuf,
    pub video_dir: PathBuf,
    pub layers: LayerRange,
    pub settle_delay: Duration,
    pub patch: PatchConfig,
}

/// A clip written by this run
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedClip {
    pub asset: String,
    pub audio_title: String,
    pub layer_index: usize,
    pub layer_id: i64,
    pub clip_id: i64,
    pub video_path: PathBuf,
    /// The clip as derived from the template (remote-derived media fields cleared)
    pub draft: Clip,
}

/// An asset whose video is already loaded somewhere in the composition
#[derive(Debug, Clone, Serialize)]
pub struct SkippedAsset {
    pub asset: String,
    pub clip_id: i64,
}

/// Per-asset result
#[derive(Debug, Clone)]
pub enum AssetOutcome {
    Provisioned(ProvisionedClip),
    AlreadyProvisioned(SkippedAsset),
}

/// Summary of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProvisionReport {
    pub provisioned: Vec<ProvisionedClip>,
    pub skipped: Vec<SkippedAsset>,
    /// Audio assets without a video counterpart
    pub missing_video: Vec<String>,
}

/// Clip derived from a sanitized template for `asset`
///
/// Display name and description become the asset name, the file path points
/// at the video, and media fields the remote side derives on open are cleared.
///
/// The draft is not written back as a whole. The remote side fills the slot
/// from the opened file, [`patch_fields`] carries only the draft's name, and the
/// full draft ends up in [`ProvisionReport`].
pub fn draft_clip(template: &Clip, asset: &str, video_path: &Path) -> Clip {
    let mut clip = template.clone();
    clip.name.value = Value::String(asset.to_string());

    let video = clip.video.get_or_insert_with(ClipVideo::default);
    video.description = asset.to_string();

    let fileinfo = video.fileinfo.get_or_insert_with(FileInfo::default);
    fileinfo.path = video_path.to_string_lossy().into_owned();
    fileinfo.clear_media();

    clip
}

/// Parameter update written after the open
///
/// Parameter ids are omitted so the remote side resolves them on the target clip.
pub fn patch_fields(draft: &Clip, patch: &PatchConfig) -> PatchFields {
    let mut fields = PatchFields::new();
    fields.insert(
        "name".to_string(),
        ParamUpdate::string(draft.name.display_value()),
    );
    fields.insert(
        "transporttype".to_string(),
        ParamUpdate::choice(patch.transport_type.value.clone(), patch.transport_type.index),
    );
    fields.insert(
        "target".to_string(),
        ParamUpdate::choice(patch.target.value.clone(), patch.target.index),
    );
    fields
}

async fn cancellable<T, E, F>(
    cancel: &CancellationToken,
    future: F,
    map_err: impl FnOnce(E) -> ProvisionError,
) -> Result<T, ProvisionError>
where
    F: Future<Output = Result<T, E>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProvisionError::Cancelled),
        result = future => result.map_err(map_err),
    }
}

/// Provisioning pipeline
pub struct Provisioner {
    service: Arc<dyn CompositionService>,
    transcoder: Arc<dyn Transcoder>,
    matcher: AssetMatcher,
    settings: ProvisionSettings,
}

impl Provisioner {
    pub fn new(
        service: Arc<dyn CompositionService>,
        transcoder: Arc<dyn Transcoder>,
        matcher: AssetMatcher,
        settings: ProvisionSettings,
    ) -> Self {
        Self {
            service,
            transcoder,
            matcher,
            settings,
        }
    }

    /// Provision every matched asset using `template` as structural source
    pub async fn run(
        &self,
        template: &Clip,
        cancel: &CancellationToken,
    ) -> Result<ProvisionReport, ProvisionError> {
        let matches = self
            .matcher
            .match_assets(&self.settings.audio_dir, &self.settings.video_dir)?;
        let template = sanitize(template);

        let mut report = ProvisionReport {
            missing_video: matches.missing_video,
            ..Default::default()
        };

        tracing::info!(
            assets = matches.matched.len(),
            layers = %self.settings.layers,
            "Starting clip provisioning"
        );

        for asset in &matches.matched {
            if cancel.is_cancelled() {
                return Err(ProvisionError::Cancelled);
            }

            let span = tracing::info_span!("asset", name = %asset);
            match self
                .provision_asset(asset, &template, cancel)
                .instrument(span)
                .await?
            {
                AssetOutcome::Provisioned(clip) => report.provisioned.push(clip),
                AssetOutcome::AlreadyProvisioned(skipped) => report.skipped.push(skipped),
            }
        }

        tracing::info!(
            provisioned = report.provisioned.len(),
            skipped = report.skipped.len(),
            missing_video = report.missing_video.len(),
            "Clip provisioning complete"
        );

        Ok(report)
    }

    /// Provision one asset; `template` must already be sanitized
    pub async fn provision_asset(
        &self,
        asset: &str,
        template: &Clip,
        cancel: &CancellationToken,
    ) -> Result<AssetOutcome, ProvisionError> {
        let video_path = self.resolve_video_path(asset)?;
        let video_path_str = video_path.to_string_lossy().into_owned();

        // Idempotency guard
        let composition = cancellable(cancel, self.service.get_composition(), |source| {
            ProvisionError::Lookup {
                asset: asset.to_string(),
                source,
            }
        })
        .await?;

        if let Some((_, clip)) = composition.find_clip_by_path(&video_path_str) {
            tracing::info!(clip_id = clip.id, "Clip already exists, skipping");
            return Ok(AssetOutcome::AlreadyProvisioned(SkippedAsset {
                asset: asset.to_string(),
                clip_id: clip.id,
            }));
        }

        let layers = self.settings.layers;
        let Slot {
            layer_index,
            layer_id,
            clip: slot_clip,
        } = cancellable(
            cancel,
            find_empty_slot(self.service.as_ref(), layers.start(), layers.end()),
            |source| ProvisionError::Slot {
                asset: asset.to_string(),
                source,
            },
        )
        .await?;
        let clip_id = slot_clip.id;

        let audio_path = self.matcher.audio_path(&self.settings.audio_dir, asset);
        let audio_title = cancellable(cancel, self.transcoder.audio_title(&audio_path), |source| {
            ProvisionError::Metadata {
                asset: asset.to_string(),
                source,
            }
        })
        .await?;
        tracing::debug!(title = %audio_title, "Read audio title");

        let draft = draft_clip(template, asset, &video_path);
        let fields = patch_fields(&draft, &self.settings.patch);

        tracing::info!(layer_index, layer_id, clip_id, file = %video_path_str, "Opening clip");
        cancellable(cancel, self.service.open_clip(clip_id, &video_path), |source| {
            ProvisionError::Open {
                asset: asset.to_string(),
                clip_id,
                source,
            }
        })
        .await?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProvisionError::Cancelled),
            _ = tokio::time::sleep(self.settings.settle_delay) => {}
        }

        cancellable(cancel, self.service.patch_clip(clip_id, &fields), |source| {
            ProvisionError::Patch {
                asset: asset.to_string(),
                clip_id,
                source,
            }
        })
        .await?;

        tracing::info!(clip_id, "Clip provisioned");

        Ok(AssetOutcome::Provisioned(ProvisionedClip {
            asset: asset.to_string(),
            audio_title,
            layer_index,
            layer_id,
            clip_id,
            video_path,
            draft,
        }))
    }

    /// Canonical path of the asset's video
    ///
    /// Symlinks and `..` are resolved so the already-provisioned lookup sees the
    /// same string across runs, whichever spelling of the directory was given.
    fn resolve_video_path(&self, asset: &str) -> Result<PathBuf, ProvisionError> {
        let path = self.matcher.video_path(&self.settings.video_dir, asset);
        std::fs::canonicalize(&path).map_err(|e| ProvisionError::InvalidPath {
            asset: asset.to_string(),
            message: e.to_string(),
        })
    }
}
