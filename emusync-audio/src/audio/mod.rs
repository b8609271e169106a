//! Audio data types, resampling, and host device output

pub mod resampler;
pub mod types;

#[cfg(feature = "output")]
pub mod output;

pub use resampler::Resampler;
pub use types::{Sample, CHANNEL_COUNT};

#[cfg(feature = "output")]
pub use output::AudioOutput;
