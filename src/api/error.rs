// =============================================================================
// API error type
// =============================================================================
//
// Every handler returns `Result<_, ApiError>`; the response body is always
// `{ "error": "<message>" }`.
//
//   BadRequest -> 400   invalid parameters, malformed relationships
//   NotFound   -> 404   unknown pattern, no candles for a symbol
//   Upstream   -> 502   historical data backend failed
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::warn;

use crate::backtest::BacktestError;
use crate::indicators::IndicatorError;
use crate::options::OptionsError;
use crate::patterns::PatternError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("upstream error: {0}")]
    Upstream(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "request failed upstream");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

impl From<IndicatorError> for ApiError {
    fn from(e: IndicatorError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<PatternError> for ApiError {
    fn from(e: PatternError) -> Self {
        match e {
            PatternError::UnknownPattern(_) => Self::NotFound(e.to_string()),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<BacktestError> for ApiError {
    fn from(e: BacktestError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<OptionsError> for ApiError {
    fn from(e: OptionsError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

/// Anything bubbling up through `anyhow` comes from the upstream client.
impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Upstream(format!("{e:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_status() {
        let unknown: ApiError = PatternError::UnknownPattern("cup".into()).into();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
        assert_eq!(unknown.to_string(), "unknown pattern 'cup'");

        let bad: ApiError = PatternError::EmptySelection.into();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let periods: ApiError = BacktestError::InvalidPeriods { fast: 20, slow: 10 }.into();
        assert_eq!(periods.status(), StatusCode::BAD_REQUEST);

        let upstream: ApiError = anyhow::anyhow!("connection refused").into();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(upstream.to_string(), "upstream error: connection refused");
    }
}
