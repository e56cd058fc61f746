//! Empty clip slot lookup
//!
//! Scans an inclusive, 0-based range of layers in ascending order and the
//! clips of each layer in list order, returning the first clip whose connected
//! state is "Empty".
//!
//! The lookup is a plain snapshot read. Nothing is reserved: another actor
//! editing the composition between this read and the following open/patch can
//! claim the same slot.

use crate::resolume::{Clip, Composition, CompositionService, ResolumeError};
use thiserror::Error;

/// Slot lookup errors
#[derive(Debug, Error)]
pub enum SlotError {
    #[error("Invalid layer range: start {start} is greater than end {end}")]
    InvalidRange { start: usize, end: usize },

    #[error("Layer range end {end} exceeds available layers ({available})")]
    LayerOutOfRange { end: usize, available: usize },

    #[error("No empty clip found in layers {start}..={end}")]
    NoEmptySlot { start: usize, end: usize },

    #[error(transparent)]
    Service(#[from] ResolumeError),
}

/// Inclusive layer index bounds, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerRange {
    start: usize,
    end: usize,
}

impl LayerRange {
    pub fn new(start: usize, end: usize) -> Result<Self, SlotError> {
        if start > end {
            return Err(SlotError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }
}

impl std::fmt::Display for LayerRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// An empty clip and where it lives
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub layer_index: usize,
    pub layer_id: i64,
    pub clip: Clip,
}

/// Search a composition snapshot
pub fn find_empty_slot_in(composition: &Composition, range: LayerRange) -> Result<Slot, SlotError> {
    let available = composition.layers.len();
    if range.end >= available {
        return Err(SlotError::LayerOutOfRange {
            end: range.end,
            available,
        });
    }

    for (layer_index, layer) in composition
        .layers
        .iter()
        .enumerate()
        .take(range.end + 1)
        .skip(range.start)
    {
        if let Some(clip) = layer.clips.iter().find(|clip| clip.is_empty_slot()) {
            tracing::debug!(
                layer_index,
                layer_id = layer.id,
                clip_id = clip.id,
                "Found empty clip"
            );
            return Ok(Slot {
                layer_index,
                layer_id: layer.id,
                clip: clip.clone(),
            });
        }
    }

    Err(SlotError::NoEmptySlot {
        start: range.start,
        end: range.end,
    })
}

/// Read the current composition and search it
///
/// Bounds are validated before the composition is fetched.
pub async fn find_empty_slot<S>(service: &S, start: usize, end: usize) -> Result<Slot, SlotError>
where
    S: CompositionService + ?Sized,
{
    let range = LayerRange::new(start, end)?;
    let composition = service.get_composition().await?;
    find_empty_slot_in(&composition, range)
}
