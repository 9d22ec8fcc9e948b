//! Request and response bodies for the service endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of `POST /api/stream`.
#[derive(Debug, Serialize)]
pub struct StreamRequest<'a> {
    pub text: &'a str,
    pub voice: &'a str,
}

/// Error payload optionally carried by a non-2xx response.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}

/// `GET /api/health` response.
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// One entry in the voice catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoiceInfo {
    pub name: String,
    pub description: String,
}

/// `GET /api/voices` response, keyed by the voice id sent in requests.
#[derive(Debug, Deserialize)]
pub struct VoicesResponse {
    pub voices: BTreeMap<String, VoiceInfo>,
}
