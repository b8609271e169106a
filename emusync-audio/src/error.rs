//! Error types for emusync-audio
//!
//! Only setup paths return these. The audio callback itself never fails: its
//! outcomes are reported through `playback::FillOutcome`.

use thiserror::Error;

/// Main error type for emusync-audio
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shared channel open/close errors
    #[error("Transport error: {0}")]
    Transport(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the common library
    #[error(transparent)]
    Common(#[from] emusync_common::Error),
}

/// Convenience Result type using emusync-audio Error
pub type Result<T> = std::result::Result<T, Error>;
