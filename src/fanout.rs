//! The in-memory broadcast mechanism that concurrently delivers each message
//! to every registered sink while preserving per-sink ordering.
//!
//! Grounded in `original_source/core/core.go`'s `Logvac` type: a map of
//! named drains, each backed by a worker goroutine reading from a
//! rendezvous channel, with `WriteMessage` fanning out via a wait-group of
//! per-sink `select { <-done; send <- msg }` attempts. The tokio translation
//! keeps the same three operations and the same blocking semantics, except
//! that here the worker awaits the sink's own future to completion before
//! pulling the next message, which is what gives per-sink FIFO its teeth
//! (the original's `go drain(msg)` would let two deliveries race).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::message::Message;

/// A registered consumer of fanned-out messages. Implementors must not
/// propagate errors; they log locally (§4.1 failure semantics). The worker
/// awaits `accept` to completion before accepting the next message, so a
/// slow sink backpressures the producer exactly as the spec requires.
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    async fn accept(&self, msg: Message);
}

/// Adapts a plain synchronous closure into a [`Sink`], for the common case
/// of a sink with no internal async I/O (e.g. tests, or a sink whose work
/// is itself just a call into another synchronous subsystem).
pub struct FnSink<F>(F);

impl<F> FnSink<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Sink for FnSink<F>
where
    F: Fn(Message) + Send + Sync + 'static,
{
    async fn accept(&self, msg: Message) {
        (self.0)(msg)
    }
}

struct DrainHandle {
    sender: mpsc::Sender<Message>,
    done: CancellationToken,
}

/// Registry of named sinks; `WriteMessage` broadcasts to every current sink
/// and blocks until each has accepted (not necessarily fully processed) the
/// message.
#[derive(Clone, Default)]
pub struct Engine {
    drains: Arc<RwLock<HashMap<String, DrainHandle>>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink. Re-adding the same name replaces the previous
    /// registration (closing the old one first); a dedicated worker task is
    /// started to serialize messages through a capacity-1 channel so the
    /// sink sees messages in submission order.
    pub fn add_drain<S: Sink>(&self, name: impl Into<String>, sink: S) {
        self.add_boxed_drain(name.into(), Box::new(sink));
    }

    /// Convenience for registering a plain synchronous callback as a sink.
    pub fn add_sync_drain<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        self.add_drain(name, FnSink::new(f));
    }

    fn add_boxed_drain(&self, name: String, sink: Box<dyn Sink>) {
        let (sender, mut receiver) = mpsc::channel::<Message>(1);
        let done = CancellationToken::new();

        let worker_done = done.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = worker_done.cancelled() => return,
                    maybe_msg = receiver.recv() => {
                        match maybe_msg {
                            Some(msg) => sink.accept(msg).await,
                            None => return,
                        }
                    }
                }
            }
        });

        let mut drains = self.drains.write();
        if let Some(old) = drains.insert(name, DrainHandle { sender, done }) {
            old.done.cancel();
        }
    }

    /// Signal the sink's worker to stop and remove the registration. A
    /// message currently being handed to the worker may still be delivered;
    /// the next send attempt aborts via `done`.
    pub fn remove_drain(&self, name: &str) {
        if let Some(handle) = self.drains.write().remove(name) {
            handle.done.cancel();
        }
    }

    /// Broadcast `msg` to every currently registered sink. Returns once
    /// every sink has accepted it (or been cancelled), preserving per-sink
    /// FIFO and providing backpressure when a sink stalls.
    pub async fn write_message(&self, msg: Message) {
        // Snapshot the current sink set so the registry lock isn't held
        // across the broadcast.
        let handles: Vec<(String, mpsc::Sender<Message>, CancellationToken)> = {
            let drains = self.drains.read();
            drains
                .iter()
                .map(|(name, handle)| (name.clone(), handle.sender.clone(), handle.done.clone()))
                .collect()
        };

        let mut deliveries = Vec::with_capacity(handles.len());
        for (name, sender, done) in handles {
            let msg = msg.clone();
            deliveries.push(async move {
                tokio::select! {
                    _ = done.cancelled() => {
                        debug!(sink = %name, "drain cancelled before accepting message");
                    }
                    result = sender.send(msg) => {
                        if result.is_err() {
                            warn!(sink = %name, "drain worker gone, message dropped");
                        }
                    }
                }
            });
        }

        for delivery in deliveries {
            delivery.await;
        }
    }

    pub fn drain_count(&self) -> usize {
        self.drains.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex as StdMutex;

    fn msg(content: &str) -> Message {
        Message {
            time: Utc::now(),
            utime: 1,
            id: "h".into(),
            tag: vec![],
            r#type: "app".into(),
            priority: 0,
            content: content.into(),
            raw: None,
        }
    }

    #[tokio::test]
    async fn two_sinks_each_receive_the_full_sequence_in_order() {
        let engine = Engine::new();
        let seen_a = Arc::new(StdMutex::new(Vec::new()));
        let seen_b = Arc::new(StdMutex::new(Vec::new()));

        let a = seen_a.clone();
        engine.add_sync_drain("a", move |m: Message| a.lock().unwrap().push(m.content));
        let b = seen_b.clone();
        engine.add_sync_drain("b", move |m: Message| b.lock().unwrap().push(m.content));

        engine.write_message(msg("m1")).await;
        engine.write_message(msg("m2")).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(*seen_a.lock().unwrap(), vec!["m1".to_string(), "m2".to_string()]);
        assert_eq!(*seen_b.lock().unwrap(), vec!["m1".to_string(), "m2".to_string()]);
    }

    #[tokio::test]
    async fn remove_drain_stops_future_delivery() {
        let engine = Engine::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let s = seen.clone();
        engine.add_sync_drain("a", move |m: Message| s.lock().unwrap().push(m.content));

        engine.remove_drain("a");
        assert_eq!(engine.drain_count(), 0);

        engine.write_message(msg("after-removal")).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn re_adding_same_name_replaces_previous_registration() {
        let engine = Engine::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));

        let s1 = seen.clone();
        engine.add_sync_drain("a", move |m: Message| s1.lock().unwrap().push(format!("old:{}", m.content)));
        let s2 = seen.clone();
        engine.add_sync_drain("a", move |m: Message| s2.lock().unwrap().push(format!("new:{}", m.content)));

        engine.write_message(msg("m")).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(*seen.lock().unwrap(), vec!["new:m".to_string()]);
    }
}
