//! Pipeline services
//!
//! - [`asset_matcher`]: audio/video basename pairing
//! - [`slot_finder`]: first empty clip in a layer range
//! - [`template_sanitizer`]: template clip id stripping
//! - [`provisioner`]: per-asset open + patch orchestration
//! - [`batch_converter`], [`input_renamer`]: transcoder-driven preprocessing

pub mod asset_matcher;
pub mod batch_converter;
pub mod input_renamer;
pub mod provisioner;
pub mod slot_finder;
pub mod template_sanitizer;

pub use asset_matcher::{AssetMatch, AssetMatcher, MatchError};
pub use batch_converter::{convert_directory, BatchError, BatchSummary, ConvertMode};
pub use input_renamer::{rename_inputs, RenameOutcome};
pub use provisioner::{
    AssetOutcome, ProvisionError, ProvisionReport, ProvisionSettings, ProvisionedClip,
    Provisioner, SkippedAsset,
};
pub use slot_finder::{find_empty_slot, find_empty_slot_in, LayerRange, Slot, SlotError};
pub use template_sanitizer::sanitize;
