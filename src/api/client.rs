//! Shared HTTP agent and service endpoints.

use std::io::Read;
use std::time::Duration;

use lazy_static::lazy_static;
use ureq::Agent;
use url::Url;

use crate::error::{TtsError, TtsResult};

use super::types::{ErrorBody, HealthResponse, StreamRequest, VoicesResponse};

lazy_static! {
    /// One agent for the whole process; connection pooling lives here.
    /// Non-2xx statuses come back as responses so the JSON error body can
    /// be read, and only the connect phase is bounded: the streamed body
    /// stays open for as long as the server keeps synthesizing.
    pub static ref AGENT: Agent = Agent::new_with_config(
        Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(Duration::from_secs(10)))
            .build(),
    );
}

fn endpoint(base: &str, path: &str) -> TtsResult<String> {
    let base = base.trim_end_matches('/');
    Url::parse(base)
        .map_err(|err| TtsError::Connection(format!("invalid server URL {base:?}: {err}")))?;
    Ok(format!("{base}{path}"))
}

fn connection_error(err: ureq::Error) -> TtsError {
    TtsError::Connection(err.to_string())
}

/// POST the synthesis request and return the open PCM byte stream.
///
/// The reader yields raw little-endian 16-bit mono samples until the server
/// finishes the utterance and closes the body.
pub fn open_stream(
    base: &str,
    request: &StreamRequest<'_>,
) -> TtsResult<impl Read + 'static> {
    let url = endpoint(base, "/api/stream")?;
    tracing::debug!(
        "POST {url} ({} chars, voice {})",
        request.text.len(),
        request.voice
    );
    let response = AGENT.post(&url).send_json(request).map_err(connection_error)?;
    let status = response.status();
    if !status.is_success() {
        let mut body = response.into_body();
        let detail = body
            .read_json::<ErrorBody>()
            .ok()
            .and_then(|parsed| parsed.detail);
        return Err(TtsError::Connection(
            detail.unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
        ));
    }
    Ok(response.into_body().into_reader())
}

pub fn fetch_health(base: &str) -> TtsResult<HealthResponse> {
    let url = endpoint(base, "/api/health")?;
    let response = AGENT.get(&url).call().map_err(connection_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(TtsError::Connection(format!("HTTP {}", status.as_u16())));
    }
    response
        .into_body()
        .read_json()
        .map_err(|err| TtsError::Protocol(err.to_string()))
}

pub fn fetch_voices(base: &str) -> TtsResult<VoicesResponse> {
    let url = endpoint(base, "/api/voices")?;
    let response = AGENT.get(&url).call().map_err(connection_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(TtsError::Connection(format!("HTTP {}", status.as_u16())));
    }
    response
        .into_body()
        .read_json()
        .map_err(|err| TtsError::Protocol(err.to_string()))
}
