//! Producer side: shared channel access and the per-frame transport pump
//!
//! The emulator writes PCM into a named channel owned by the host. Once per host
//! visual frame, `TransportAdapter::pump` polls that channel and appends whatever
//! arrived to the raw sample queue. An empty poll is the normal case whenever the
//! emulator has nothing ready and is not an error.

#[cfg(unix)]
pub mod shared_channel;

#[cfg(unix)]
pub use shared_channel::{SharedAudioChannel, SharedAudioWriter};

use crate::audio::types::{frames_in, Sample, CHANNEL_COUNT};
use crate::error::Result;
use crate::playback::sample_queue::SampleProducer;
use tracing::{debug, info, trace};

/// Non-blocking source of emulator audio.
pub trait SampleSource: Send {
    /// Open the underlying channel.
    fn open(&mut self) -> Result<()>;

    /// Whether the channel is currently open.
    fn is_open(&self) -> bool;

    /// Close the underlying channel. Closing a closed source is a no-op.
    fn close(&mut self);

    /// Return the interleaved stereo samples that arrived since the last poll,
    /// or `None` when nothing is ready. Never blocks.
    fn poll(&mut self) -> Option<Vec<Sample>>;
}

/// Moves samples from a `SampleSource` into the raw sample queue.
pub struct TransportAdapter<S: SampleSource> {
    source: S,
    producer: SampleProducer,
    running: bool,
    total_frames: u64,
}

impl<S: SampleSource> TransportAdapter<S> {
    pub fn new(source: S, producer: SampleProducer) -> Self {
        Self {
            source,
            producer,
            running: false,
            total_frames: 0,
        }
    }

    /// Open the source and reset the queue.
    ///
    /// The queue reset is the open barrier: the audio callback resets its own
    /// state on the next call and never sees samples from a previous session.
    pub fn open(&mut self) -> Result<()> {
        self.source.open()?;
        self.producer.open();
        self.total_frames = 0;
        info!("Emulator audio channel opened");
        Ok(())
    }

    /// Close the queue first so the consumer stops, then the source.
    pub fn close(&mut self) {
        self.producer.close();
        self.source.close();
        info!("Emulator audio channel closed");
    }

    pub fn is_open(&self) -> bool {
        self.source.is_open() && self.producer.is_open()
    }

    /// Publish the emulator's running state to the audio callback.
    pub fn set_running(&mut self, running: bool) {
        if running != self.running {
            debug!("Emulator running: {}", running);
        }
        self.running = running;
        self.producer.set_running(running);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Poll the source once; call once per host visual frame.
    ///
    /// Does nothing while the channel is closed or the emulator is not running.
    /// Returns the number of stereo frames appended.
    pub fn pump(&mut self) -> usize {
        if !self.source.is_open() {
            if self.producer.is_open() {
                info!("Emulator audio channel went away, closing sample queue");
                self.producer.close();
            }
            return 0;
        }
        if !self.running {
            return 0;
        }

        let Some(mut samples) = self.source.poll() else {
            trace!("No emulator audio ready this frame");
            return 0;
        };

        // Keep the queue aligned to whole stereo frames
        let stray = samples.len() % CHANNEL_COUNT;
        if stray != 0 {
            debug!("Dropping {} trailing sample(s) of a partial frame", stray);
            samples.truncate(samples.len() - stray);
        }

        let frames = frames_in(samples.len());
        if frames == 0 {
            return 0;
        }

        self.producer.enqueue(&samples);
        self.producer.record_provided(frames);
        self.total_frames += frames as u64;
        frames
    }

    /// Buffered stereo frames
    pub fn occupancy(&self) -> usize {
        self.producer.occupancy()
    }

    /// Frames received since the last open
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: SampleSource> Drop for TransportAdapter<S> {
    fn drop(&mut self) {
        if self.source.is_open() {
            self.close();
        }
    }
}
