//! Composition document types
//!
//! Only the fields the provisioning pipeline reads or writes are typed. Every
//! other key is kept in a [`Document`] so that unknown or undocumented remote
//! fields survive a read/modify cycle in their original order.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Connected-state value of a clip slot with nothing loaded
pub const EMPTY_CONNECTION: &str = "Empty";

/// `null` decodes as the type's default, the same as a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Ordered key-value document for opaque remote sub-objects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Remove a key, keeping the order of the remaining entries
    pub fn remove_key(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.0.values_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Typed parameter (`{"valuetype", "id", "value", ...}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default, deserialize_with = "null_as_default")]
    pub valuetype: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: Value,
    /// Options, index, min/max and whatever else the parameter carries
    #[serde(flatten)]
    pub extra: Document,
}

impl Parameter {
    /// Value rendered for display (strings unquoted)
    pub fn display_value(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Whole show state as returned by `GET composition`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    #[serde(default, deserialize_with = "null_as_default")]
    pub layers: Vec<Layer>,
    #[serde(flatten)]
    pub rest: Document,
}

impl Composition {
    /// Every clip of every layer, in scan order
    pub fn clips(&self) -> impl Iterator<Item = (&Layer, &Clip)> {
        self.layers
            .iter()
            .flat_map(|layer| layer.clips.iter().map(move |clip| (layer, clip)))
    }

    /// First clip whose loaded file is exactly `path`
    pub fn find_clip_by_path(&self, path: &str) -> Option<(&Layer, &Clip)> {
        self.clips().find(|(_, clip)| clip.video_path() == Some(path))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: Parameter,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clips: Vec<Clip>,
    #[serde(flatten)]
    pub rest: Document,
}

/// A clip slot
///
/// `params` holds the remaining parameter sub-objects (target, transporttype,
/// audio, beatsnap, ...) untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: Parameter,
    #[serde(default, deserialize_with = "null_as_default")]
    pub connected: Parameter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<ClipVideo>,
    #[serde(flatten)]
    pub params: Document,
}

impl Clip {
    pub fn is_empty_slot(&self) -> bool {
        self.connected.value.as_str() == Some(EMPTY_CONNECTION)
    }

    /// Path of the loaded video file, if any
    pub fn video_path(&self) -> Option<&str> {
        self.video
            .as_ref()
            .and_then(|v| v.fileinfo.as_ref())
            .map(|f| f.path.as_str())
            .filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipVideo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fileinfo: Option<FileInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub effects: Vec<Document>,
    /// Mixer, opacity, resize, colour channels, source params, ...
    #[serde(flatten)]
    pub extra: Document,
}

/// File descriptor of a loaded clip; the media fields are derived by the
/// remote application once it has opened the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framerate: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(flatten)]
    pub extra: Document,
}

impl FileInfo {
    /// Drop everything the remote side derives from the media itself
    pub fn clear_media(&mut self) {
        self.exists = None;
        self.duration = None;
        self.duration_ms = None;
        self.framerate = None;
        self.width = None;
        self.height = None;
    }
}

/// One entry of a clip parameter update
///
/// No `id` field: parameter ids belong to the remote application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamUpdate {
    pub valuetype: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
}

impl ParamUpdate {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            valuetype: "ParamString".to_string(),
            value: Value::String(value.into()),
            index: None,
        }
    }

    pub fn choice(value: impl Into<String>, index: i64) -> Self {
        Self {
            valuetype: "ParamChoice".to_string(),
            value: Value::String(value.into()),
            index: Some(index),
        }
    }
}

/// Body of a partial clip update, keyed by parameter name
pub type PatchFields = BTreeMap<String, ParamUpdate>;
