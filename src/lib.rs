//! Streaming text-to-speech playback.
//!
//! Sends text to a TTS server and plays the raw PCM response while it is
//! still arriving: about half a second of audio is buffered first, then each
//! decoded chunk is scheduled back-to-back on the output device's own clock
//! so successive chunks play with no audible gap or overlap.

pub mod api;
pub mod config;
pub mod error;
pub mod playback;
pub mod speaker;

pub use config::TtsConfig;
pub use error::{TtsError, TtsResult};
pub use playback::types::{CancelToken, SessionEvent, SessionOutcome, SessionState};
pub use speaker::Speaker;
