//! Named shared audio channel over a Unix datagram socket
//!
//! The host owns the channel: `SharedAudioChannel` binds a socket at a path
//! derived from the channel name, and the emulator side (`SharedAudioWriter`)
//! sends interleaved stereo i16 PCM to it, little-endian, one or more datagrams
//! per emulated frame. Datagrams preserve boundaries, so a chunk never arrives
//! half-written.
//!
//! Reads are non-blocking: `poll` drains every pending datagram and returns
//! `None` when nothing is waiting. Each datagram is trimmed to whole frames
//! before the next is appended, so a malformed one cannot swap left and right
//! for the rest of the batch.

use super::SampleSource;
use crate::audio::types::{Sample, CHANNEL_COUNT};
use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Largest number of samples sent in one datagram (8 KiB payload)
pub const MAX_DATAGRAM_SAMPLES: usize = 4096;

const SAMPLE_BYTES: usize = std::mem::size_of::<Sample>();

/// Socket path for a channel name
pub fn channel_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("emusync-{}.sock", name))
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Transport("channel name must not be empty".to_string()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(Error::Transport(format!(
            "invalid channel name '{}' (allowed: letters, digits, '-', '_', '.')",
            name
        )));
    }
    Ok(())
}

/// Append little-endian i16 PCM to `out`.
pub fn encode_samples(samples: &[Sample], out: &mut Vec<u8>) {
    out.reserve(samples.len() * SAMPLE_BYTES);
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
}

/// Append samples decoded from little-endian i16 PCM. A trailing odd byte is ignored.
pub fn decode_samples(bytes: &[u8], out: &mut Vec<Sample>) {
    out.reserve(bytes.len() / SAMPLE_BYTES);
    for pair in bytes.chunks_exact(SAMPLE_BYTES) {
        out.push(Sample::from_le_bytes([pair[0], pair[1]]));
    }
}

/// Host (reading) end of a shared audio channel
pub struct SharedAudioChannel {
    name: String,
    path: PathBuf,
    socket: Option<UnixDatagram>,
    recv_buf: Vec<u8>,
}

impl SharedAudioChannel {
    /// Create a closed channel handle; `open` binds the socket.
    pub fn new(name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            path: channel_path(name),
            socket: None,
            recv_buf: vec![0u8; MAX_DATAGRAM_SAMPLES * SAMPLE_BYTES],
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove a socket file left behind by a host that did not shut down cleanly.
    ///
    /// Only a socket nobody is bound to refuses a connection; anything else at
    /// the path (a live host, or not a socket at all) is left alone.
    fn remove_stale_socket(&self) -> Result<()> {
        let in_use = || {
            Error::Transport(format!(
                "Channel '{}' is already in use at {}",
                self.name,
                self.path.display()
            ))
        };

        match UnixDatagram::unbound()?.connect(&self.path) {
            Ok(()) => Err(in_use()),
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                debug!("Removing stale channel socket {}", self.path.display());
                std::fs::remove_file(&self.path)?;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Transport(format!(
                "Cannot reuse channel path {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

impl SampleSource for SharedAudioChannel {
    fn open(&mut self) -> Result<()> {
        if self.socket.is_some() {
            return Ok(());
        }

        if self.path.exists() {
            self.remove_stale_socket()?;
        }

        let socket = UnixDatagram::bind(&self.path).map_err(|e| {
            Error::Transport(format!(
                "Failed to bind channel '{}' at {}: {}",
                self.name,
                self.path.display(),
                e
            ))
        })?;
        socket.set_nonblocking(true)?;

        info!("Shared audio channel '{}' listening at {}", self.name, self.path.display());
        self.socket = Some(socket);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove channel socket {}: {}", self.path.display(), e);
                }
            }
            debug!("Shared audio channel '{}' closed", self.name);
        }
    }

    fn poll(&mut self) -> Option<Vec<Sample>> {
        let socket = self.socket.as_ref()?;
        let mut samples = Vec::new();

        loop {
            match socket.recv(&mut self.recv_buf) {
                Ok(0) => continue,
                Ok(n) => {
                    let start = samples.len();
                    decode_samples(&self.recv_buf[..n], &mut samples);
                    // Keep later datagrams frame-aligned
                    let decoded = samples.len() - start;
                    if decoded % CHANNEL_COUNT != 0 {
                        debug!(
                            "Dropping partial frame from a {}-sample datagram on '{}'",
                            decoded, self.name
                        );
                        samples.truncate(start + decoded - decoded % CHANNEL_COUNT);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Shared audio channel '{}' read failed: {}", self.name, e);
                    break;
                }
            }
        }

        if samples.is_empty() {
            None
        } else {
            Some(samples)
        }
    }
}

impl Drop for SharedAudioChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Emulator (writing) end of a shared audio channel
pub struct SharedAudioWriter {
    socket: UnixDatagram,
    target: PathBuf,
    buf: Vec<u8>,
}

impl SharedAudioWriter {
    /// Prepare to write to the channel `name`. The host need not be listening yet.
    pub fn connect(name: &str) -> Result<Self> {
        validate_name(name)?;
        let socket = UnixDatagram::unbound()?;
        socket.set_nonblocking(true)?;
        Ok(Self {
            socket,
            target: channel_path(name),
            buf: Vec::with_capacity(MAX_DATAGRAM_SAMPLES * SAMPLE_BYTES),
        })
    }

    /// Send interleaved stereo samples to the host.
    ///
    /// Returns false if the host is not listening or its receive buffer is
    /// full. The emulator keeps running either way; the lost audio shows up on
    /// the host side as a short starvation.
    pub fn write(&mut self, samples: &[Sample]) -> bool {
        for chunk in samples.chunks(MAX_DATAGRAM_SAMPLES) {
            self.buf.clear();
            encode_samples(chunk, &mut self.buf);
            if let Err(e) = self.socket.send_to(&self.buf, &self.target) {
                warn!("Failed to send audio to {}: {}", self.target.display(), e);
                return false;
            }
        }
        true
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}
