//! Error taxonomy for one playback session.
//!
//! Every variant is terminal for the session that raised it: there is no
//! retry inside the engine, and the audio device is closed before any of
//! these surface to the caller.

use thiserror::Error;

/// Result type used across the crate.
pub type TtsResult<T> = Result<T, TtsError>;

#[derive(Debug, Error)]
pub enum TtsError {
    /// The request was rejected, the connection failed, or the server
    /// answered with a non-2xx status. Carries the server-supplied detail
    /// when one was present, otherwise "HTTP {status}".
    #[error("{0}")]
    Connection(String),

    /// The stream broke mid-transfer.
    #[error("stream read failed: {0}")]
    Protocol(String),

    /// The server closed the stream without sending a single byte.
    #[error("no audio data received")]
    EmptyStream,

    /// The output device could not be opened or driven.
    #[error("audio output failed: {0}")]
    AudioOutput(String),

    /// Input text outside the 1..=1000 character window the service accepts.
    #[error("text must be between 1 and 1000 characters")]
    InvalidText,
}
