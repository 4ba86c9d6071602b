use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::ACCEPT;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::config::RelayConfig;
use super::error::RelayError;
use super::state::RelayState;

/// Create the token exchange router (`POST /api/auth/github` by default).
pub fn relay_routes(config: RelayConfig) -> Router {
    let path = config.route_path.clone();
    let state = RelayState {
        config: Arc::new(config),
    };

    Router::new()
        .route(&path, post(exchange))
        .with_state(state)
}

#[derive(Deserialize)]
struct ExchangeRequest {
    #[serde(default)]
    code: Option<String>,
}

#[derive(Serialize)]
struct ExchangeResponse {
    access_token: String,
}

#[derive(Serialize)]
struct UpstreamRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

#[derive(Deserialize)]
struct UpstreamResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

async fn exchange(
    State(state): State<RelayState>,
    body: Result<Json<ExchangeRequest>, JsonRejection>,
) -> Result<Json<ExchangeResponse>, RelayError> {
    let Json(request) = body.map_err(|e| RelayError::InvalidBody(e.body_text()))?;
    let code = request
        .code
        .filter(|c| !c.is_empty())
        .ok_or(RelayError::MissingCode)?;

    let config = &state.config;
    let response = config
        .http
        .post(config.token_url.clone())
        .header(ACCEPT, "application/json")
        .json(&UpstreamRequest {
            client_id: &config.client_id,
            client_secret: &config.client_secret,
            code: &code,
        })
        .send()
        .await?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "GitHub token endpoint returned an error status");
        return Err(RelayError::Upstream(
            "Failed to exchange code for token".into(),
        ));
    }

    let data: UpstreamResponse = response.json().await?;

    if let Some(error) = data.error {
        return Err(RelayError::Upstream(
            data.error_description.unwrap_or(error),
        ));
    }

    let access_token = data
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RelayError::Upstream("Failed to authenticate with GitHub".into()))?;

    tracing::info!("GitHub code exchanged");

    Ok(Json(ExchangeResponse { access_token }))
}
