//! Shared types and fixed parameters for one playback session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Sample rate of the PCM stream produced by the service (24 kHz).
pub const SOURCE_SAMPLE_RATE: u32 = 24000;

/// Sample rate requested from the output device (48 kHz - most devices support this).
pub const PLAYBACK_SAMPLE_RATE: u32 = 48000;

/// Channels opened on the output device; the mono stream is duplicated.
pub const OUTPUT_CHANNELS: u16 = 2;

/// Bytes buffered before playback starts (~0.5 s at 24 kHz/16-bit/mono).
pub const MIN_BUFFER_BYTES: usize = 24000;

/// Flush size once playback is running (~0.1 s); from here on the already
/// playing queue absorbs network jitter, not the pre-buffer.
pub const STREAM_CHUNK_BYTES: usize = 4800;

/// Poll interval while waiting for scheduled audio to finish.
pub const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Format of one playback session; constant for its whole lifetime and
/// never renegotiated mid-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// The format the service streams: 24 kHz, mono, 16-bit.
    pub const fn stream() -> Self {
        Self {
            sample_rate: SOURCE_SAMPLE_RATE,
            channels: 1,
            bits_per_sample: 16,
        }
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }
}

/// Lifecycle of one `speak` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Buffering,
    Playing,
    Draining,
    Completed,
    Failed,
}

/// Status updates surfaced to the embedding layer (CLI, UI).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    State(SessionState),
    Progress { received: u64 },
}

/// How a session ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Cancelled,
}

/// Shared flag checked at chunk receipt and scheduling decision points.
/// Cancelling tears down the output and abandons the network read promptly.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
