//! Typed failures of the acquisition pipeline.
//!
//! Fetchers and the fallback stage return these values instead of raising;
//! the presentation layer only ever sees the rendered `detail()` string.

use serde::Serialize;
use thiserror::Error;

/// Coarse failure class, used as a metrics label and in API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    Unreachable,
    ServerError,
    NoData,
    ParseError,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::Unreachable => "unreachable",
            FetchErrorKind::ServerError => "server_error",
            FetchErrorKind::NoData => "no_data",
            FetchErrorKind::ParseError => "parse_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport failure: DNS, connect, timeout, reset.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// Remote answered with a non-2xx status.
    #[error("Server Error ({status}): {body}")]
    ServerError { status: u16, body: String },

    /// Remote answered, but with an empty result set.
    #[error("no data: {0}")]
    NoData(String),

    /// Malformed JSON or a top-level shape we cannot use.
    #[error("parse error: {0}")]
    ParseError(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Unreachable(_) => FetchErrorKind::Unreachable,
            FetchError::ServerError { .. } => FetchErrorKind::ServerError,
            FetchError::NoData(_) => FetchErrorKind::NoData,
            FetchError::ParseError(_) => FetchErrorKind::ParseError,
        }
    }

    /// Human-readable text shown next to a degraded section.
    pub fn detail(&self) -> String {
        self.to_string()
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::ParseError(e.to_string())
    }
}
