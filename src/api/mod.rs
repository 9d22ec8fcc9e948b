//! HTTP client for the TTS service.

pub mod client;
pub mod types;

pub use client::{fetch_health, fetch_voices, open_stream};
