//! Accumulation of network chunks until enough audio is buffered to decode.

use super::types::{MIN_BUFFER_BYTES, STREAM_CHUNK_BYTES};

/// Byte accumulator sitting between the network reader and the PCM decoder.
///
/// Flushes always carry an even number of bytes: a trailing odd byte stays
/// buffered so the sample it belongs to is completed by the next chunk
/// instead of being dropped at the flush boundary.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    pending: Vec<u8>,
    total_received: u64,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received chunk. The chunk is copied; the caller may discard
    /// its own storage afterwards.
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        self.total_received += chunk.len() as u64;
    }

    /// Bytes received over the whole stream so far, flushed or not.
    pub fn total_received(&self) -> u64 {
        self.total_received
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Take a decodable slice if the active threshold has been reached.
    ///
    /// Before playback the threshold is `MIN_BUFFER_BYTES`, enough audio to
    /// absorb startup jitter before anything is heard. Once audio is running
    /// it drops to `STREAM_CHUNK_BYTES`; the playing queue covers jitter
    /// from then on. A flush hands over everything accumulated, not just
    /// the threshold amount.
    pub fn take_ready(&mut self, playback_started: bool) -> Option<Vec<u8>> {
        let threshold = if playback_started {
            STREAM_CHUNK_BYTES
        } else {
            MIN_BUFFER_BYTES
        };
        if self.pending.len() >= threshold {
            Some(self.take_even())
        } else {
            None
        }
    }

    /// Everything left at end-of-stream, regardless of threshold. The only
    /// flush that may carry an odd trailing byte, since no further data can
    /// complete it.
    pub fn drain_remaining(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    fn take_even(&mut self) -> Vec<u8> {
        let usable = self.pending.len() & !1;
        let tail = self.pending.split_off(usable);
        std::mem::replace(&mut self.pending, tail)
    }
}
