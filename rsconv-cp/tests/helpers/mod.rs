//! Test doubles and fixtures shared by the integration tests
//!
//! `FakeComposition` keeps a composition in memory and applies opens and
//! patches to it the way the remote application would, recording every call.
//! `FakeTranscoder` answers title lookups from a map and writes placeholder
//! outputs for stream copies.

#![allow(dead_code)]

use async_trait::async_trait;
use rsconv_cp::resolume::{
    Clip, ClipVideo, Composition, CompositionService, FileInfo, Layer, Parameter, PatchFields,
    ResolumeError,
};
use rsconv_cp::transcoder::{has_content, output_path, TranscodeError, TranscodeOutcome, Transcoder};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// One recorded call against the fake composition
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetComposition,
    Open { clip_id: i64, path: PathBuf },
    Patch { clip_id: i64, fields: PatchFields },
}

pub struct FakeComposition {
    state: Mutex<Composition>,
    calls: Mutex<Vec<Call>>,
    cancel_on_open: Option<CancellationToken>,
}

impl FakeComposition {
    pub fn new(composition: Composition) -> Self {
        Self {
            state: Mutex::new(composition),
            calls: Mutex::new(Vec::new()),
            cancel_on_open: None,
        }
    }

    /// Cancel `token` as soon as a clip has been opened
    pub fn cancelling_on_open(mut self, token: CancellationToken) -> Self {
        self.cancel_on_open = Some(token);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn opens(&self) -> Vec<(i64, PathBuf)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Open { clip_id, path } => Some((clip_id, path)),
                _ => None,
            })
            .collect()
    }

    pub fn patches(&self) -> Vec<(i64, PatchFields)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Patch { clip_id, fields } => Some((clip_id, fields)),
                _ => None,
            })
            .collect()
    }

    pub fn clip(&self, clip_id: i64) -> Option<Clip> {
        let state = self.state.lock().unwrap();
        let clip = state
            .clips()
            .find(|(_, clip)| clip.id == clip_id)
            .map(|(_, clip)| clip.clone());
        clip
    }

    fn with_clip<T>(
        &self,
        clip_id: i64,
        call: &str,
        apply: impl FnOnce(&mut Clip) -> T,
    ) -> Result<T, ResolumeError> {
        let mut state = self.state.lock().unwrap();
        let clip = state
            .layers
            .iter_mut()
            .flat_map(|layer| layer.clips.iter_mut())
            .find(|clip| clip.id == clip_id)
            .ok_or_else(|| ResolumeError::UnexpectedStatus {
                call: call.to_string(),
                status: 404,
                body: format!("no clip {}", clip_id),
            })?;
        Ok(apply(clip))
    }
}

#[async_trait]
impl CompositionService for FakeComposition {
    async fn get_composition(&self) -> Result<Composition, ResolumeError> {
        self.calls.lock().unwrap().push(Call::GetComposition);
        Ok(self.state.lock().unwrap().clone())
    }

    async fn open_clip(&self, clip_id: i64, file_path: &Path) -> Result<(), ResolumeError> {
        self.calls.lock().unwrap().push(Call::Open {
            clip_id,
            path: file_path.to_path_buf(),
        });

        self.with_clip(clip_id, "open", |clip| {
            clip.connected.value = json!("Connected");
            let video = clip.video.get_or_insert_with(ClipVideo::default);
            video.fileinfo = Some(FileInfo {
                path: file_path.to_string_lossy().into_owned(),
                exists: Some(true),
                ..Default::default()
            });
        })?;

        if let Some(token) = &self.cancel_on_open {
            token.cancel();
        }
        Ok(())
    }

    async fn patch_clip(&self, clip_id: i64, fields: &PatchFields) -> Result<(), ResolumeError> {
        self.calls.lock().unwrap().push(Call::Patch {
            clip_id,
            fields: fields.clone(),
        });

        self.with_clip(clip_id, "patch", |clip| {
            if let Some(name) = fields.get("name") {
                clip.name.value = name.value.clone();
            }
        })
    }
}

/// Transcoder double keyed by file name
#[derive(Default)]
pub struct FakeTranscoder {
    titles: HashMap<String, String>,
    failing: Option<String>,
}

impl FakeTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, file_name: &str, title: &str) -> Self {
        self.titles.insert(file_name.to_string(), title.to_string());
        self
    }

    /// Make every stream copy of `file_name` fail
    pub fn failing_on(mut self, file_name: &str) -> Self {
        self.failing = Some(file_name.to_string());
        self
    }

    fn copy(&self, input: &Path, out_dir: &Path, ext: &str) -> Result<TranscodeOutcome, TranscodeError> {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing.as_deref() == Some(name.as_str()) {
            return Err(TranscodeError::Failed {
                binary: "ffmpeg".to_string(),
                file: input.to_path_buf(),
                stderr: "Invalid data found when processing input".to_string(),
            });
        }

        let output = output_path(input, out_dir, ext);
        if has_content(&output) {
            return Ok(TranscodeOutcome::Skipped(output));
        }
        std::fs::write(&output, b"stream")?;
        Ok(TranscodeOutcome::Written(output))
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn audio_title(&self, file: &Path) -> Result<String, TranscodeError> {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.titles
            .get(&name)
            .cloned()
            .ok_or_else(|| TranscodeError::NoTitle(file.to_path_buf()))
    }

    async fn extract_audio(
        &self,
        input: &Path,
        out_dir: &Path,
    ) -> Result<TranscodeOutcome, TranscodeError> {
        self.copy(input, out_dir, "m4a")
    }

    async fn strip_audio(
        &self,
        input: &Path,
        out_dir: &Path,
    ) -> Result<TranscodeOutcome, TranscodeError> {
        self.copy(input, out_dir, "mov")
    }
}

fn choice(id: i64, value: &str) -> Parameter {
    Parameter {
        valuetype: "ParamChoice".to_string(),
        id,
        value: Value::String(value.to_string()),
        ..Default::default()
    }
}

/// Clip slot with nothing loaded
pub fn empty_clip(id: i64) -> Clip {
    Clip {
        id,
        connected: choice(id * 10 + 1, "Empty"),
        ..Default::default()
    }
}

/// Clip slot playing `path`
pub fn loaded_clip(id: i64, path: &str) -> Clip {
    Clip {
        id,
        connected: choice(id * 10 + 1, "Connected"),
        video: Some(ClipVideo {
            fileinfo: Some(FileInfo {
                path: path.to_string(),
                exists: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn layer(id: i64, name: &str, clips: Vec<Clip>) -> Layer {
    Layer {
        id,
        name: Parameter {
            valuetype: "ParamString".to_string(),
            id: id * 10,
            value: Value::String(name.to_string()),
            ..Default::default()
        },
        clips,
        ..Default::default()
    }
}

pub fn composition(layers: Vec<Layer>) -> Composition {
    Composition {
        layers,
        ..Default::default()
    }
}

/// Template clip as the remote side returns it, ids everywhere
pub fn template_clip() -> Clip {
    serde_json::from_value(json!({
        "id": 1700000000042_i64,
        "name": {"id": 421, "valuetype": "ParamString", "value": "Template"},
        "connected": {"id": 422, "valuetype": "ParamChoice", "value": "Connected", "index": 3},
        "target": {"id": 423, "valuetype": "ParamChoice", "value": "Own Layer", "index": 0},
        "transporttype": {"id": 424, "valuetype": "ParamChoice", "value": "Timeline", "index": 0},
        "video": {
            "description": "template.mov",
            "fileinfo": {"path": "/media/template.mov", "exists": true, "duration": "00:01:00",
                         "duration_ms": 60000.0, "width": 1920, "height": 1080},
            "opacity": {"id": 425, "valuetype": "ParamRange", "value": 1.0},
            "effects": [
                {"id": 426, "name": "Transform",
                 "params": {"Scale": {"id": 427, "valuetype": "ParamRange", "value": 100.0}}}
            ]
        }
    }))
    .unwrap()
}

/// Create empty files named `names` inside `dir`
pub fn touch_all(dir: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dir.join(name), b"").unwrap();
    }
}
