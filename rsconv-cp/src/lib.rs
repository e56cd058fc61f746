//! rsconv-cp library interface
//!
//! Provisions Resolume clips for transcoded audio/video asset pairs through
//! the Resolume HTTP control API. Exposed as a library for integration tests.

pub mod cli;
pub mod resolume;
pub mod services;
pub mod transcoder;

pub use resolume::{CompositionService, ResolumeClient, ResolumeError};
pub use transcoder::{FfmpegTranscoder, TranscodeError, Transcoder};
