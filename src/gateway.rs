use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::IgnoredAny;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::app::AppState;

pub const CACHE_CONTROL_VALUE: &str = "public, s-maxage=3600, stale-while-revalidate=86400";
const CREDENTIAL_PARAM: &str = "api_key";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("TMDB API key is not configured")]
    MissingApiKey,
    #[error("Invalid catalog path")]
    InvalidPath,
    #[error("TMDB API error: {}", .0.as_u16())]
    Upstream(StatusCode),
    #[error("Failed to fetch from TMDB")]
    Transport(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingApiKey | GatewayError::Transport(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::InvalidPath => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(status) => *status,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// `GET /api/catalog/*path`: forward to the upstream catalog with the
/// server-side credential and relay the JSON body.
pub async fn proxy_catalog(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, GatewayError> {
    let Some(api_key) = state.gateway.api_key.as_deref() else {
        warn!("Rejecting catalog request: TMDB_API_KEY missing");
        return Err(GatewayError::MissingApiKey);
    };

    let Path(path) = path.map_err(|e| {
        warn!("Rejecting undecodable catalog path: {}", e);
        GatewayError::InvalidPath
    })?;
    let path = upstream_path(&path)?;
    let url = format!("{}/{}", state.gateway.upstream_base, path);
    let query = upstream_query(api_key, &state.gateway.language, &params);
    debug!(path = %path, params = params.len(), "Forwarding catalog request");

    let res = state.tmdb.get(&url, &query).await.map_err(|e| {
        error!("TMDB request for '{}' failed: {:#}", path, e);
        GatewayError::Transport(e.to_string())
    })?;

    if !res.status.is_success() {
        warn!("TMDB returned {} for '{}'", res.status, path);
        return Err(GatewayError::Upstream(res.status));
    }

    if let Err(e) = serde_json::from_slice::<IgnoredAny>(&res.body) {
        error!("TMDB returned a non-JSON body for '{}': {}", path, e);
        return Err(GatewayError::Transport(e.to_string()));
    }

    Ok((
        res.status,
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, CACHE_CONTROL_VALUE),
        ],
        res.body,
    )
        .into_response())
}

/// Re-encode the captured path segment by segment. Empty segments collapse;
/// dot segments are refused.
pub fn upstream_path(raw: &str) -> Result<String, GatewayError> {
    let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() || segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(GatewayError::InvalidPath);
    }
    Ok(segments
        .iter()
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Credential and locale first, then caller parameters with set semantics:
/// a repeated key replaces the earlier value in place. A caller-supplied
/// credential is dropped.
pub fn upstream_query(
    api_key: &str,
    language: &str,
    caller: &[(String, String)],
) -> Vec<(String, String)> {
    let mut out = vec![
        (CREDENTIAL_PARAM.to_string(), api_key.to_string()),
        ("language".to_string(), language.to_string()),
    ];
    for (key, value) in caller {
        if key == CREDENTIAL_PARAM {
            continue;
        }
        match out.iter_mut().find(|(existing, _)| existing == key) {
            Some(slot) => slot.1 = value.clone(),
            None => out.push((key.clone(), value.clone())),
        }
    }
    out
}
