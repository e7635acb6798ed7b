//! Sink adapters: concrete [`crate::fanout::Sink`] implementations.

mod archive_sink;
mod forwarders;
mod publisher;

pub use archive_sink::ArchiveSink;
pub use forwarders::{SyslogUdpForwarder, TcpLineForwarder};
pub use publisher::PublisherSink;
