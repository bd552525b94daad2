// src/error.rs
//! Error taxonomy shared by adapters, cache, translation and the HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::model::Source;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CuratorError {
    /// One adapter failed; isolated by the orchestrator, never fatal to a batch.
    #[error("{origin} unavailable{}: {message}", fmt_status(.status))]
    SourceUnavailable {
        origin: Source,
        status: Option<u16>,
        message: String,
    },

    /// Cache backend failure; callers degrade to "absent" / no-op.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("translation provider error{}: {message}", fmt_status(.status))]
    TranslationProvider {
        status: Option<u16>,
        message: String,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Every requested source failed and nothing usable was cached.
    #[error("all sources failed: {}", .0.join("; "))]
    AllSourcesFailed(Vec<String>),
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl CuratorError {
    pub fn source_unavailable(origin: Source, message: impl Into<String>) -> Self {
        CuratorError::SourceUnavailable {
            origin,
            status: None,
            message: message.into(),
        }
    }

    /// Map a reqwest error (transport, decode or status) onto a source failure.
    pub fn from_reqwest(origin: Source, e: reqwest::Error) -> Self {
        CuratorError::SourceUnavailable {
            origin,
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CuratorError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CuratorError::TranslationProvider { .. } => StatusCode::BAD_GATEWAY,
            CuratorError::AllSourcesFailed(_) | CuratorError::SourceUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CuratorError::CacheUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            CuratorError::SourceUnavailable { .. } => "source_unavailable",
            CuratorError::CacheUnavailable(_) => "cache_unavailable",
            CuratorError::TranslationProvider { .. } => "translation_failed",
            CuratorError::InvalidRequest(_) => "invalid_request",
            CuratorError::AllSourcesFailed(_) => "all_sources_failed",
        }
    }
}

impl IntoResponse for CuratorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
