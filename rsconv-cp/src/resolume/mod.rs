//! Resolume control API: document types, service seam and HTTP client

pub mod client;
pub mod types;

pub use client::{ResolumeClient, ResolumeError};
pub use types::{
    Clip, ClipVideo, Composition, Document, FileInfo, Layer, ParamUpdate, Parameter, PatchFields,
    EMPTY_CONNECTION,
};

use async_trait::async_trait;
use std::path::Path;

/// Composition operations the provisioning pipeline depends on
///
/// Implemented by [`ResolumeClient`]; tests substitute an in-memory fake.
#[async_trait]
pub trait CompositionService: Send + Sync {
    /// Full read of layers and clips
    async fn get_composition(&self) -> Result<Composition, ResolumeError>;

    /// Load a local file into a clip slot
    async fn open_clip(&self, clip_id: i64, file_path: &Path) -> Result<(), ResolumeError>;

    /// Partial update of named clip parameters
    async fn patch_clip(&self, clip_id: i64, fields: &PatchFields) -> Result<(), ResolumeError>;
}
