//! The pub/sub publisher sink: serializes each message to JSON and publishes
//! it on one Redis channel per computed tag, so subscribers on any matching
//! channel see it. Generalizes the teacher's `events::redis::RedisPublisher`
//! (same lazy-connect-behind-a-lock shape, same log-and-drop failure
//! policy) from its fixed per-event-type channels to the spec's
//! hierarchical tag set.

use async_trait::async_trait;
use parking_lot::RwLock;
use redis::aio::ConnectionManager;
use tracing::{error, warn};

use crate::fanout::Sink;
use crate::message::{Message, Priority};

fn priority_name(p: u8) -> &'static str {
    match Priority::try_from(p) {
        Ok(Priority::Trace) => "trace",
        Ok(Priority::Debug) => "debug",
        Ok(Priority::Info) => "info",
        Ok(Priority::Warn) => "warn",
        Ok(Priority::Error) => "error",
        Ok(Priority::Fatal) => "fatal",
        Err(()) => "fatal",
    }
}

/// `["log", type] ∪ nonempty(tag) ∪ severity-levels-below-or-equal-priority`.
///
/// Including every severity name at or below the message's own priority
/// (rather than just its own level) is what makes subscriptions
/// hierarchical: a subscriber listening on the `"warn"` channel sees every
/// message whose priority is warn-or-worse, because those messages are
/// also published on the `"warn"` channel alongside their own level.
fn tag_set(msg: &Message) -> Vec<String> {
    let mut tags = vec!["log".to_string(), msg.r#type.clone()];
    tags.extend(msg.tag.iter().filter(|t| !t.is_empty()).cloned());
    tags.extend((0..=msg.priority.min(5)).map(|p| priority_name(p).to_string()));
    tags
}

pub struct PublisherSink {
    connection: RwLock<Option<ConnectionManager>>,
    url: String,
    channel_prefix: String,
}

impl PublisherSink {
    pub fn new(url: impl Into<String>, channel_prefix: impl Into<String>) -> Self {
        Self {
            connection: RwLock::new(None),
            url: url.into(),
            channel_prefix: channel_prefix.into(),
        }
    }

    pub async fn connect(&self) -> Result<(), redis::RedisError> {
        let client = redis::Client::open(self.url.as_str())?;
        let manager = ConnectionManager::new(client).await?;
        *self.connection.write() = Some(manager);
        Ok(())
    }

    fn snapshot_connection(&self) -> Option<ConnectionManager> {
        self.connection.read().clone()
    }

    async fn publish_once(&self, json: &str, channels: &[String]) -> Result<(), redis::RedisError> {
        let Some(mut conn) = self.snapshot_connection() else {
            return Err(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "not connected",
            )));
        };
        for channel in channels {
            redis::cmd("PUBLISH")
                .arg(channel)
                .arg(json)
                .query_async::<_, ()>(&mut conn)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Sink for PublisherSink {
    async fn accept(&self, msg: Message) {
        let json = match serde_json::to_string(&msg) {
            Ok(j) => j,
            Err(err) => {
                error!(error = %err, "failed to serialize message for publisher sink");
                return;
            }
        };

        let channels: Vec<String> = tag_set(&msg)
            .into_iter()
            .map(|tag| format!("{}:{}", self.channel_prefix, tag))
            .collect();

        if self.publish_once(&json, &channels).await.is_ok() {
            return;
        }

        // One redial-and-retry on transient failure; log and drop on the
        // second failure.
        warn!("publisher sink publish failed, attempting one reconnect");
        if self.connect().await.is_err() {
            error!("publisher sink reconnect failed, dropping message");
            return;
        }
        if self.publish_once(&json, &channels).await.is_err() {
            error!("publisher sink publish failed after reconnect, dropping message");
        }
    }
}
