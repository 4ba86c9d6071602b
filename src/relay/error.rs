use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Token exchange failures.
///
/// Every variant is answered with `500 { "message": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Request carried no authorization code.
    #[error("No code provided")]
    MissingCode,

    /// Request body was not valid JSON.
    #[error("{0}")]
    InvalidBody(String),

    /// GitHub rejected the exchange.
    #[error("{0}")]
    Upstream(String),

    /// GitHub could not be reached or answered garbage.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "GitHub OAuth error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}
