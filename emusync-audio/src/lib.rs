//! # emusync Audio Library (emusync-audio)
//!
//! Keeps the audio of an externally running emulator in step with the host's
//! audio device.
//!
//! **Purpose:** Drain PCM from a named cross-process channel once per host frame,
//! buffer it in a lock-free queue, and on every host audio callback stretch just
//! enough of it to fill the requested buffer while holding buffer occupancy near
//! a fixed latency target.
//!
//! **Architecture:**
//! ```text
//! emulator -> shared channel -> TransportAdapter -> RawSampleQueue
//!                                                       |
//!             host audio callback <- Resampler <- AudioSync (rate estimate + controller)
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod simulation;
pub mod transport;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use playback::{AudioSync, FillOutcome, RawSampleQueue};
pub use transport::{SampleSource, TransportAdapter};
