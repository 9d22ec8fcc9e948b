//! Gapless scheduling of decoded buffers against the output clock.
//!
//! The scheduler owns a `next_play_time` cursor on the sink's monotonic
//! clock. Each buffer starts exactly where the previous one ends, so
//! successive buffers abut with no gap and no overlap. If scheduling ever
//! falls behind the device (the cursor is in the past), the cursor is
//! clamped forward to "now": an audible gap is accepted rather than trying
//! to play audio in the past or speed up to catch up.

use std::collections::VecDeque;

use crate::error::TtsResult;

use super::pcm::DecodedAudioBuffer;

/// Seam between scheduling arithmetic and the audio device.
///
/// `clock` is the device's own monotonic time in seconds: it never moves
/// backwards and advances only as audio (or silence) is rendered.
pub trait AudioSink {
    fn clock(&self) -> f64;

    /// Queue `samples` to begin playing at `when` seconds on the sink clock.
    /// The scheduler never passes a `when` in the past.
    fn start_at(&mut self, when: f64, samples: &[f32]) -> TtsResult<()>;

    /// Whether submitted audio is still waiting to be rendered.
    fn has_pending(&self) -> bool;

    /// Stop rendering and release the device. Idempotent.
    fn close(&mut self);
}

/// Owns the playback queue and the `next_play_time` cursor. One instance
/// per session; nothing here is shared with any other session.
pub struct PlaybackScheduler<S: AudioSink> {
    sink: S,
    queue: VecDeque<DecodedAudioBuffer>,
    next_play_time: f64,
    scheduling: bool,
    started: bool,
}

impl<S: AudioSink> PlaybackScheduler<S> {
    pub fn new(sink: S) -> Self {
        let next_play_time = sink.clock();
        Self {
            sink,
            queue: VecDeque::new(),
            next_play_time,
            scheduling: false,
            started: false,
        }
    }

    /// Append a buffer and advance the queue.
    pub fn schedule(&mut self, buffer: DecodedAudioBuffer) -> TtsResult<()> {
        self.queue.push_back(buffer);
        self.pump()
    }

    /// Advance the queue. Invoked from both the data-arrival path and the
    /// drain loop; the flag keeps the two call sites from interleaving
    /// scheduling decisions on the same cursor.
    pub fn pump(&mut self) -> TtsResult<()> {
        if self.scheduling {
            return Ok(());
        }
        self.scheduling = true;
        let result = self.pump_queue();
        self.scheduling = false;
        result
    }

    fn pump_queue(&mut self) -> TtsResult<()> {
        while let Some(buffer) = self.queue.pop_front() {
            let now = self.sink.clock();
            if self.next_play_time < now {
                tracing::debug!(
                    "playback cursor fell {:.3}s behind the device, clamping to now",
                    now - self.next_play_time
                );
                self.next_play_time = now;
            }
            self.sink.start_at(self.next_play_time, buffer.samples())?;
            self.next_play_time += buffer.duration();
            self.started = true;
        }
        Ok(())
    }

    /// True once any buffer has been handed to the sink.
    pub fn started(&self) -> bool {
        self.started
    }

    /// True when the queue is empty and the sink has nothing left to render.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && !self.sink.has_pending()
    }

    /// Earliest time the next buffer may start, in sink-clock seconds.
    pub fn next_play_time(&self) -> f64 {
        self.next_play_time
    }

    pub fn close(&mut self) {
        self.sink.close();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MockSink;
    use super::*;
    use crate::playback::pcm::{self, DecodedAudioBuffer};
    use crate::playback::types::{AudioFormat, SOURCE_SAMPLE_RATE};

    fn buf(samples: usize) -> DecodedAudioBuffer {
        pcm::decode(&vec![0u8; samples * 2], &AudioFormat::stream()).unwrap()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn buffers_abut_exactly() {
        let (sink, state) = MockSink::manual();
        let mut scheduler = PlaybackScheduler::new(sink);
        for len in [12000, 2400, 600] {
            scheduler.schedule(buf(len)).unwrap();
        }
        let submissions = state.lock().submissions.clone();
        assert_eq!(submissions.len(), 3);
        assert_close(submissions[0].0, 0.0);
        assert_close(submissions[1].0, 0.5);
        for pair in submissions.windows(2) {
            let end = pair[0].0 + pair[0].1 as f64 / SOURCE_SAMPLE_RATE as f64;
            assert_close(end, pair[1].0);
        }
    }

    #[test]
    fn cursor_clamps_forward_after_a_stall() {
        let (sink, state) = MockSink::manual();
        let mut scheduler = PlaybackScheduler::new(sink);
        scheduler.schedule(buf(2400)).unwrap(); // ends at 0.1
        state.lock().clock = 0.25; // device ran past the cursor
        scheduler.schedule(buf(2400)).unwrap();
        let submissions = state.lock().submissions.clone();
        assert_close(submissions[1].0, 0.25);
        assert_close(scheduler.next_play_time(), 0.35);
    }

    #[test]
    fn cursor_never_moves_backwards() {
        let (sink, state) = MockSink::manual();
        let mut scheduler = PlaybackScheduler::new(sink);
        scheduler.schedule(buf(12000)).unwrap(); // cursor at 0.5
        state.lock().clock = 0.1; // device still mid-buffer
        scheduler.schedule(buf(2400)).unwrap();
        let submissions = state.lock().submissions.clone();
        assert_close(submissions[1].0, 0.5);
    }

    #[test]
    fn idle_tracks_queue_and_sink() {
        let (sink, state) = MockSink::manual();
        let mut scheduler = PlaybackScheduler::new(sink);
        assert!(scheduler.is_idle());
        assert!(!scheduler.started());
        scheduler.schedule(buf(2400)).unwrap();
        assert!(scheduler.started());
        assert!(!scheduler.is_idle()); // 0.1 s still unrendered
        state.lock().clock = 0.1;
        assert!(scheduler.is_idle());
    }

    #[test]
    fn close_releases_the_sink() {
        let (sink, state) = MockSink::manual();
        let mut scheduler = PlaybackScheduler::new(sink);
        scheduler.close();
        assert!(state.lock().closed);
    }
}
