//! High-level entry point tying configuration, the HTTP client, and the
//! playback engine together.

use std::io::Read;

use crate::api::client;
use crate::api::types::{HealthResponse, StreamRequest, VoicesResponse};
use crate::config::TtsConfig;
use crate::error::{TtsError, TtsResult};
use crate::playback::output::CpalSink;
use crate::playback::session::StreamSession;
use crate::playback::types::{
    AudioFormat, CancelToken, SessionEvent, SessionOutcome, SessionState,
};

/// Longest text the service accepts in one request.
pub const MAX_TEXT_CHARS: usize = 1000;

pub struct Speaker {
    config: TtsConfig,
}

impl Speaker {
    pub fn new(config: TtsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TtsConfig {
        &self.config
    }

    /// Speak `text`, blocking until playback finishes or fails.
    pub fn speak(&self, text: &str) -> TtsResult<SessionOutcome> {
        self.speak_with(text, CancelToken::new(), |_| {})
    }

    /// Speak with a cancellation token and a status observer. The observer
    /// sees every state transition plus received-byte progress.
    pub fn speak_with(
        &self,
        text: &str,
        cancel: CancelToken,
        mut observer: impl FnMut(SessionEvent) + 'static,
    ) -> TtsResult<SessionOutcome> {
        let text = prepare_text(text)?;
        let format = AudioFormat::stream();
        observer(SessionEvent::State(SessionState::Connecting));
        let request = StreamRequest {
            text,
            voice: &self.config.voice,
        };
        let body = match client::open_stream(&self.config.server_url, &request) {
            Ok(body) => body,
            Err(err) => {
                observer(SessionEvent::State(SessionState::Failed));
                return Err(err);
            }
        };
        // The device is opened only after the server has accepted the
        // request, so a rejected request never touches audio hardware.
        let sink = match CpalSink::open(&format) {
            Ok(sink) => sink,
            Err(err) => {
                observer(SessionEvent::State(SessionState::Failed));
                return Err(err);
            }
        };
        StreamSession::new(sink, format, cancel)
            .with_observer(Box::new(observer))
            .run(body)
    }

    /// Fetch the full PCM stream without playing it, for WAV capture.
    pub fn fetch_pcm(&self, text: &str) -> TtsResult<Vec<u8>> {
        let text = prepare_text(text)?;
        let request = StreamRequest {
            text,
            voice: &self.config.voice,
        };
        let mut body = client::open_stream(&self.config.server_url, &request)?;
        let mut pcm = Vec::new();
        body.read_to_end(&mut pcm)
            .map_err(|err| TtsError::Protocol(err.to_string()))?;
        if pcm.is_empty() {
            return Err(TtsError::EmptyStream);
        }
        Ok(pcm)
    }

    pub fn health(&self) -> TtsResult<HealthResponse> {
        client::fetch_health(&self.config.server_url)
    }

    pub fn voices(&self) -> TtsResult<VoicesResponse> {
        client::fetch_voices(&self.config.server_url)
    }
}

/// Trim and enforce the 1..=1000 character window the service accepts.
fn prepare_text(text: &str) -> TtsResult<&str> {
    let text = text.trim();
    if text.is_empty() || text.chars().count() > MAX_TEXT_CHARS {
        return Err(TtsError::InvalidText);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_trimmed() {
        assert_eq!(prepare_text("  hello  ").unwrap(), "hello");
    }

    #[test]
    fn empty_and_oversized_text_rejected() {
        assert!(matches!(prepare_text("   "), Err(TtsError::InvalidText)));
        let long = "a".repeat(MAX_TEXT_CHARS + 1);
        assert!(matches!(prepare_text(&long), Err(TtsError::InvalidText)));
    }

    #[test]
    fn limit_counts_characters_not_bytes() {
        // 1000 multi-byte characters are within the window.
        let long = "å".repeat(MAX_TEXT_CHARS);
        assert!(prepare_text(&long).is_ok());
    }
}
