//! Session state machine driving one streamed utterance.
//!
//! One session owns its chunk buffer, scheduler, and cancellation token
//! outright; a later session shares nothing with an earlier one.

use std::io::Read;
use std::thread;

use crate::error::{TtsError, TtsResult};

use super::buffer::ChunkBuffer;
use super::pcm;
use super::scheduler::{AudioSink, PlaybackScheduler};
use super::types::{
    AudioFormat, CancelToken, SessionEvent, SessionOutcome, SessionState, DRAIN_POLL_INTERVAL,
};

/// Network reads are pulled through a buffer of this size; the service
/// delivers chunks of arbitrary length either way.
const READ_BUF_BYTES: usize = 8192;

pub struct StreamSession<S: AudioSink> {
    format: AudioFormat,
    buffer: ChunkBuffer,
    scheduler: PlaybackScheduler<S>,
    state: SessionState,
    cancel: CancelToken,
    observer: Option<Box<dyn FnMut(SessionEvent)>>,
}

impl<S: AudioSink> StreamSession<S> {
    pub fn new(sink: S, format: AudioFormat, cancel: CancelToken) -> Self {
        Self {
            format,
            buffer: ChunkBuffer::new(),
            scheduler: PlaybackScheduler::new(sink),
            state: SessionState::Connecting,
            cancel,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn FnMut(SessionEvent)>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Consume the response body until end-of-stream, then drain playback.
    ///
    /// Blocks the calling thread; the audio timeline advances on the
    /// device's own callback thread in parallel.
    pub fn run<R: Read>(mut self, mut body: R) -> TtsResult<SessionOutcome> {
        self.set_state(SessionState::Buffering);
        let mut chunk = [0u8; READ_BUF_BYTES];
        loop {
            if self.cancel.is_cancelled() {
                return Ok(self.teardown_cancelled());
            }
            let read = match body.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) => return Err(self.fail(TtsError::Protocol(err.to_string()))),
            };
            self.buffer.push(&chunk[..read]);
            self.emit(SessionEvent::Progress {
                received: self.buffer.total_received(),
            });
            let started = self.scheduler.started();
            if let Some(bytes) = self.buffer.take_ready(started) {
                self.decode_and_schedule(&bytes)?;
            }
        }

        if self.buffer.total_received() == 0 {
            // An empty stream is a failure, not a zero-length success.
            return Err(self.fail(TtsError::EmptyStream));
        }
        // Whatever is left goes out even if it never met a threshold.
        if let Some(bytes) = self.buffer.drain_remaining() {
            self.decode_and_schedule(&bytes)?;
        }

        self.set_state(SessionState::Draining);
        // Polling is deliberate here: one short-lived session does not
        // warrant a wakeup channel from the audio callback. See DESIGN.md.
        loop {
            if self.cancel.is_cancelled() {
                return Ok(self.teardown_cancelled());
            }
            self.scheduler.pump().map_err(|err| self.fail(err))?;
            if self.scheduler.is_idle() {
                break;
            }
            thread::sleep(DRAIN_POLL_INTERVAL);
        }
        // One more interval so the device rings out the very tail.
        thread::sleep(DRAIN_POLL_INTERVAL);
        self.scheduler.close();
        self.set_state(SessionState::Completed);
        Ok(SessionOutcome::Completed)
    }

    fn decode_and_schedule(&mut self, bytes: &[u8]) -> TtsResult<()> {
        let Some(decoded) = pcm::decode(bytes, &self.format) else {
            return Ok(());
        };
        self.scheduler
            .schedule(decoded)
            .map_err(|err| self.fail(err))?;
        if self.state == SessionState::Buffering && self.scheduler.started() {
            self.set_state(SessionState::Playing);
        }
        Ok(())
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            tracing::debug!("session {:?} -> {:?}", self.state, state);
            self.state = state;
            self.emit(SessionEvent::State(state));
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(event);
        }
    }

    /// Every terminal error closes the audio device before it surfaces.
    fn fail(&mut self, err: TtsError) -> TtsError {
        self.scheduler.close();
        self.set_state(SessionState::Failed);
        err
    }

    fn teardown_cancelled(&mut self) -> SessionOutcome {
        tracing::debug!("session cancelled, tearing down output");
        self.scheduler.close();
        SessionOutcome::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::{self, Read};
    use std::rc::Rc;

    use super::*;
    use crate::error::TtsError;
    use crate::playback::scheduler::testing::MockSink;
    use crate::playback::types::SOURCE_SAMPLE_RATE;

    /// Delivers the payload in fixed-size reads, like a paced network body.
    struct ChunkedReader {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl ChunkedReader {
        fn new(data: Vec<u8>, chunk: usize) -> Self {
            Self { data, pos: 0, chunk }
        }
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos >= self.data.len() {
                return Ok(0);
            }
            let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "reset by peer",
            ))
        }
    }

    fn session_with_events(
        sink: MockSink,
    ) -> (StreamSession<MockSink>, Rc<RefCell<Vec<SessionEvent>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let recorder = events.clone();
        let session = StreamSession::new(sink, AudioFormat::stream(), CancelToken::new())
            .with_observer(Box::new(move |event| recorder.borrow_mut().push(event)));
        (session, events)
    }

    fn states(events: &[SessionEvent]) -> Vec<SessionState> {
        events
            .iter()
            .filter_map(|event| match event {
                SessionEvent::State(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_stream_fails_without_scheduling() {
        let (sink, state) = MockSink::auto();
        let (session, events) = session_with_events(sink);
        let err = session.run(ChunkedReader::new(Vec::new(), 1000)).unwrap_err();
        assert!(matches!(err, TtsError::EmptyStream));
        assert_eq!(err.to_string(), "no audio data received");
        assert!(state.lock().submissions.is_empty());
        assert!(state.lock().closed);
        assert_eq!(
            states(&events.borrow()),
            vec![SessionState::Buffering, SessionState::Failed]
        );
    }

    #[test]
    fn tiny_stream_force_flushes_and_completes() {
        let (sink, state) = MockSink::auto();
        let (session, events) = session_with_events(sink);
        let outcome = session
            .run(ChunkedReader::new(vec![0u8; 100], 100))
            .unwrap();
        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(state.lock().submissions, vec![(0.0, 50)]);
        assert_eq!(
            states(&events.borrow()),
            vec![
                SessionState::Buffering,
                SessionState::Playing,
                SessionState::Draining,
                SessionState::Completed,
            ]
        );
    }

    #[test]
    fn playback_starts_at_the_buffering_threshold() {
        let (sink, state) = MockSink::auto();
        let (session, _events) = session_with_events(sink);
        // 30 chunks of 1000 bytes: the pre-playback threshold is crossed at
        // chunk 24, one post-playback flush lands at 5000 pending bytes, and
        // the remainder drains at end-of-stream.
        let outcome = session
            .run(ChunkedReader::new(vec![0u8; 30_000], 1000))
            .unwrap();
        assert_eq!(outcome, SessionOutcome::Completed);
        let submissions = state.lock().submissions.clone();
        let sizes: Vec<usize> = submissions.iter().map(|s| s.1).collect();
        assert_eq!(sizes, vec![12_000, 2_500, 500]);
        for pair in submissions.windows(2) {
            let end = pair[0].0 + pair[0].1 as f64 / SOURCE_SAMPLE_RATE as f64;
            assert!((end - pair[1].0).abs() < 1e-9);
        }
    }

    #[test]
    fn read_failure_is_terminal_and_closes_output() {
        let (sink, state) = MockSink::auto();
        let (session, events) = session_with_events(sink);
        let err = session.run(FailingReader).unwrap_err();
        assert!(matches!(err, TtsError::Protocol(_)));
        assert!(state.lock().closed);
        assert_eq!(
            states(&events.borrow()),
            vec![SessionState::Buffering, SessionState::Failed]
        );
    }

    #[test]
    fn cancellation_stops_the_session_promptly() {
        let (sink, state) = MockSink::auto();
        let cancel = CancelToken::new();
        cancel.cancel();
        let session = StreamSession::new(sink, AudioFormat::stream(), cancel);
        let outcome = session
            .run(ChunkedReader::new(vec![0u8; 50_000], 1000))
            .unwrap();
        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert!(state.lock().submissions.is_empty());
        assert!(state.lock().closed);
    }
}
