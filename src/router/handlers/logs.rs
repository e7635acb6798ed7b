//! `/logs` handlers: the HTTP collector (`POST`) and the query endpoint
//! (`GET`), both user-token gated.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::collectors::http::decode_body;
use crate::message::{Message, Priority};

use super::super::error::ApiError;
use super::super::AppState;

pub async fn post_logs(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> Result<&'static str, ApiError> {
    let mut msg = decode_body(&body);
    msg.normalize(&state.config.default_type);
    state.engine.write_message(msg).await;
    Ok("success!\n")
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(rename = "type")]
    type_: Option<String>,
    #[serde(default)]
    id: String,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    start: String,
    #[serde(default)]
    end: String,
    #[serde(default)]
    limit: String,
    level: Option<String>,
}

pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let type_ = query.type_.unwrap_or_else(|| state.config.default_type.clone());

    let start: i64 = parse_or_default(&query.start, 0)
        .ok_or_else(|| ApiError::bad_request("bad start offset"))?;
    let end: i64 = parse_or_default(&query.end, 0)
        .ok_or_else(|| ApiError::bad_request("bad end offset"))?;
    let limit: usize = parse_or_default(&query.limit, 100)
        .ok_or_else(|| ApiError::bad_request("bad limit"))?;

    let min_priority = Priority::from_name(query.level.as_deref().unwrap_or("TRACE")).as_u8();

    let tag_filter: Vec<String> = if query.tag.is_empty() {
        Vec::new()
    } else {
        vec![query.tag]
    };

    let messages = state
        .archive
        .slice(&type_, &query.id, &tag_filter, start, end, limit, min_priority)?;
    Ok(Json(messages))
}

/// Empty string means "use the default"; anything else must parse.
fn parse_or_default<T: std::str::FromStr>(raw: &str, default: T) -> Option<T> {
    if raw.is_empty() {
        Some(default)
    } else {
        raw.parse().ok()
    }
}
