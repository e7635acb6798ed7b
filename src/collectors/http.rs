//! HTTP collector: turns a raw POST body into a [`Message`], independent of
//! the axum wiring (kept here so the decode-or-raw-fallback logic is unit
//! testable without spinning up a server).

use chrono::Utc;

use crate::message::Message;

/// Decode `body` as a JSON [`Message`]; on a JSON syntax error, treat the
/// whole body as raw text content (priority 2, tag `["http-raw"]`). Either
/// way, stamps `time`/`utime` and leaves `type` to be filled in by
/// [`Message::normalize`].
pub fn decode_body(body: &[u8]) -> Message {
    match serde_json::from_slice::<Message>(body) {
        Ok(mut msg) => {
            let now = Utc::now();
            msg.time = now;
            msg.utime = now.timestamp_nanos_opt().unwrap_or(0);
            msg
        }
        Err(_) => {
            let now = Utc::now();
            Message {
                time: now,
                utime: now.timestamp_nanos_opt().unwrap_or(0),
                id: String::new(),
                tag: vec!["http-raw".to_string()],
                r#type: String::new(),
                priority: 2,
                content: String::from_utf8_lossy(body).to_string(),
                raw: Some(body.to_vec()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_json_message_decodes_directly() {
        let body = br#"{"id":"log-test","type":"app","message":"test log"}"#;
        let msg = decode_body(body);
        assert_eq!(msg.id, "log-test");
        assert_eq!(msg.r#type, "app");
        assert_eq!(msg.content, "test log");
    }

    #[test]
    fn invalid_json_falls_back_to_raw_content() {
        let body = b"not json at all";
        let msg = decode_body(body);
        assert_eq!(msg.priority, 2);
        assert_eq!(msg.tag, vec!["http-raw".to_string()]);
        assert_eq!(msg.content, "not json at all");
    }
}
