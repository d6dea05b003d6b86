use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::router::AgendaState;

/// Ensure the inbound request carries the configured API key.
/// Accepts either:
/// - Header: `x-api-key: ...`
/// - Header: `Authorization: Bearer ...`
pub fn ensure_authorized(headers: &HeaderMap, expected: &str) -> Result<(), Response> {
    // an unset key never authorizes anything
    let matches = |candidate: &str| {
        !expected.is_empty() && bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()))
    };

    if let Some(hv) = headers.get("x-api-key").and_then(|v| v.to_str().ok())
        && matches(hv.trim())
    {
        return Ok(());
    }

    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let auth = auth.trim();
        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            && matches(token.trim())
        {
            return Ok(());
        }
    }

    Err((
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "error": {"code": "UNAUTHORIZED", "message": "invalid or missing API key"}
        })),
    )
        .into_response())
}

#[derive(Debug, Clone, Copy)]
pub struct RequireApiKey;

impl FromRequestParts<AgendaState> for RequireApiKey {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AgendaState,
    ) -> Result<Self, Self::Rejection> {
        ensure_authorized(&parts.headers, &state.api_key)?;
        Ok(Self)
    }
}
