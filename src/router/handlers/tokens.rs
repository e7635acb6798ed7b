//! `/add-token` and `/remove-token`: admin-gated mutation of the user
//! token store, the token to mutate carried in the same header the user
//! routes read for their own auth.

use axum::extract::State;
use axum::http::HeaderMap;

use super::super::error::ApiError;
use super::super::middleware::USER_TOKEN_HEADER;
use super::super::AppState;

fn target_token(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("missing X-USER-TOKEN header"))
}

pub async fn add_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<&'static str, ApiError> {
    let token = target_token(&headers)?;
    state.auth.add(&token).map_err(|e| ApiError::internal(e.to_string()))?;
    Ok("success!\n")
}

pub async fn remove_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<&'static str, ApiError> {
    let token = target_token(&headers)?;
    state.auth.remove(&token).map_err(|e| ApiError::internal(e.to_string()))?;
    Ok("success!\n")
}
