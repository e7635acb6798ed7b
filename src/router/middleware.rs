//! Auth middleware: the admin token gates token management, the user
//! token gates ingestion/query. Both read from a header first and fall
//! back to a query parameter so browser clients can hit `/logs` without
//! setting custom headers.

use axum::extract::{Query, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;

pub const USER_TOKEN_HEADER: &str = "x-user-token";
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Debug, Deserialize)]
struct TokenQuery {
    #[serde(rename = "X-USER-TOKEN")]
    x_user_token: Option<String>,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name)?.to_str().ok().map(str::to_string)
}

pub async fn require_user_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = header_value(&headers, USER_TOKEN_HEADER)
        .or(query.x_user_token)
        .unwrap_or_default();
    if !state.auth.valid(&token) {
        return Err(ApiError::unauthorized());
    }
    Ok(next.run(request).await)
}

pub async fn require_admin_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = header_value(&headers, ADMIN_TOKEN_HEADER).unwrap_or_default();
    if token.is_empty() || token != state.config.admin_token {
        return Err(ApiError::unauthorized());
    }
    Ok(next.run(request).await)
}
