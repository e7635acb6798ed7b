//! Syslog parsing pipeline: RFC3164, then RFC5424, then a raw fallback that
//! never fails.

mod rfc3164;
mod rfc5424;
mod severity;

pub use severity::syslog_to_priority;

use chrono::Utc;

use crate::message::Message;

/// The fields every successful parse extracts, before severity translation
/// and `Message` assembly.
struct ParsedFields {
    hostname: String,
    tag: String,
    severity: u8,
    content: String,
}

/// Convert a wire payload (one UDP datagram, or one newline-terminated TCP
/// line) into a [`Message`]. Always succeeds: the raw fallback assigns
/// priority 5 and uses the entire payload as content.
pub fn parse(payload: &[u8]) -> Message {
    let text = String::from_utf8_lossy(payload);

    let (fields, priority) = match rfc3164::parse(&text).or_else(|| rfc5424::parse(&text)) {
        Some(fields) => {
            let priority = syslog_to_priority(fields.severity);
            (fields, priority)
        }
        // The fallback's severity has no syslog meaning, so it must not be
        // run back through syslog_to_priority; the raw fallback's priority
        // is 5 (Fatal) by definition.
        None => (raw_fallback(&text), 5),
    };

    let now = Utc::now();
    Message {
        time: now,
        utime: now.timestamp_nanos_opt().unwrap_or(0),
        id: fields.hostname,
        tag: if fields.tag.is_empty() {
            Vec::new()
        } else {
            vec![fields.tag]
        },
        r#type: String::new(),
        priority,
        content: fields.content,
        raw: Some(payload.to_vec()),
    }
}

fn raw_fallback(text: &str) -> ParsedFields {
    ParsedFields {
        hostname: String::new(),
        tag: String::new(),
        severity: 5,
        content: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3164_payload_is_parsed() {
        let msg = parse(b"<83>Mar 11 14:13:12 web2 apache[error] ello, your app is broke");
        assert_eq!(msg.id, "web2");
        assert!(msg.tag.contains(&"apache".to_string()));
        assert_eq!(msg.priority, 4);
        assert_eq!(msg.content, "ello, your app is broke");
    }

    #[test]
    fn unparseable_payload_falls_back_to_raw_with_priority_five() {
        let payload = b"this would have the tag \"syslog-raw\"";
        let msg = parse(payload);
        assert_eq!(msg.priority, 5);
        assert_eq!(msg.content, String::from_utf8_lossy(payload));
    }

    #[test]
    fn parsing_always_terminates_and_returns_a_message() {
        for payload in [&b""[..], b"<999>garbage", b"<34>1 - - - - - - plain"] {
            let msg = parse(payload);
            assert!(msg.priority <= 5);
        }
    }
}
