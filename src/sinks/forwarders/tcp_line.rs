//! Forwards messages as newline-terminated lines over a TCP connection,
//! reconnecting with bounded exponential backoff on write failure.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::warn;

use crate::fanout::Sink;
use crate::message::Message;

const BACKOFF_UNIT: Duration = Duration::from_secs(2);
const BACKOFF_CAP: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;

pub struct TcpLineForwarder {
    target: String,
    conn: Mutex<Option<TcpStream>>,
}

impl TcpLineForwarder {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            conn: Mutex::new(None),
        }
    }

    async fn ensure_connected(&self) -> std::io::Result<()> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(TcpStream::connect(&self.target).await?);
        }
        Ok(())
    }

    async fn write_line(&self, line: &[u8]) -> std::io::Result<()> {
        self.ensure_connected().await?;
        let mut guard = self.conn.lock().await;
        let stream = guard.as_mut().expect("connected above");
        let result = async {
            stream.write_all(line).await?;
            stream.write_all(b"\n").await
        }
        .await;
        if result.is_err() {
            *guard = None;
        }
        result
    }

    fn backoff_for_attempt(attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        (BACKOFF_UNIT * factor).min(BACKOFF_CAP)
    }
}

#[async_trait]
impl Sink for TcpLineForwarder {
    async fn accept(&self, msg: Message) {
        let line = msg.content.into_bytes();

        for attempt in 1..=MAX_ATTEMPTS {
            match self.write_line(&line).await {
                Ok(()) => return,
                Err(err) => {
                    warn!(
                        target = %self.target,
                        attempt,
                        error = %err,
                        "line-over-tcp forwarder write failed"
                    );
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(Self::backoff_for_attempt(attempt)).await;
                    }
                }
            }
        }
        warn!(target = %self.target, "line-over-tcp forwarder dropped message after max retries");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_the_unit_and_caps_at_thirty_seconds() {
        assert_eq!(TcpLineForwarder::backoff_for_attempt(1), Duration::from_secs(2));
        assert_eq!(TcpLineForwarder::backoff_for_attempt(2), Duration::from_secs(4));
        assert_eq!(TcpLineForwarder::backoff_for_attempt(5), Duration::from_secs(30));
        assert_eq!(TcpLineForwarder::backoff_for_attempt(20), Duration::from_secs(30));
    }
}
