//! Forwards messages to a third-party syslog-over-UDP endpoint, replaying
//! the original wire bytes verbatim when available.

use async_trait::async_trait;
use chrono::Utc;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::warn;

use crate::fanout::Sink;
use crate::message::Message;

fn priority_to_syslog_severity(priority: u8) -> u8 {
    match priority {
        5 => 2, // Fatal -> Critical
        4 => 3, // Error
        3 => 4, // Warn -> Warning
        2 => 6, // Info -> Informational
        1 => 7, // Debug
        _ => 7,
    }
}

/// Re-synthesizes a minimal RFC3164 frame when `raw` wasn't captured (e.g.
/// a message that arrived over HTTP rather than syslog).
fn synthesize_frame(msg: &Message) -> Vec<u8> {
    const FACILITY_USER: u8 = 1;
    let pri = FACILITY_USER * 8 + priority_to_syslog_severity(msg.priority);
    let tag = msg.tag.first().cloned().unwrap_or_else(|| "logdeck".to_string());
    let timestamp = msg.time.format("%b %e %H:%M:%S");
    format!("<{}>{} {} {}: {}", pri, timestamp, msg.id, tag, msg.content).into_bytes()
}

pub struct SyslogUdpForwarder {
    target: String,
    socket: Mutex<Option<UdpSocket>>,
}

impl SyslogUdpForwarder {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            socket: Mutex::new(None),
        }
    }

    async fn send(&self, frame: &[u8]) -> std::io::Result<()> {
        let mut guard = self.socket.lock().await;
        if guard.is_none() {
            let socket = UdpSocket::bind("0.0.0.0:0").await?;
            socket.connect(&self.target).await?;
            *guard = Some(socket);
        }
        let result = guard.as_ref().unwrap().send(frame).await;
        if result.is_err() {
            // Lazily reopen on the next attempt.
            *guard = None;
        }
        result.map(|_| ())
    }
}

#[async_trait]
impl Sink for SyslogUdpForwarder {
    async fn accept(&self, msg: Message) {
        let frame = msg.raw.clone().unwrap_or_else(|| synthesize_frame(&msg));
        if let Err(err) = self.send(&frame).await {
            warn!(target = %self.target, error = %err, "syslog-udp forwarder write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_frame_carries_priority_and_content() {
        let msg = Message {
            time: Utc::now(),
            utime: 1,
            id: "host1".into(),
            tag: vec!["nginx".into()],
            r#type: "app".into(),
            priority: 4,
            content: "boom".into(),
            raw: None,
        };
        let frame = String::from_utf8(synthesize_frame(&msg)).unwrap();
        assert!(frame.starts_with("<11>")); // facility 1 * 8 + severity 3
        assert!(frame.contains("host1"));
        assert!(frame.contains("nginx"));
        assert!(frame.ends_with("boom"));
    }
}
