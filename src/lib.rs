//! logdeck
//!
//! A lightweight, multi-protocol log aggregation daemon. It ingests log
//! messages over syslog (UDP/TCP) and JSON-over-HTTP, normalizes them,
//! fans them out to an archive store, a pub/sub publisher, and optional
//! third-party forwarders, and exposes an HTTP query endpoint over the
//! archive with host/tag/level filtering and pagination.
//!
//! # Architecture
//!
//! - **`message`** - the normalized internal log record
//! - **`archive`** - embedded ordered key-value store, partitioned by type
//! - **`reaper`** - background age/count retention pruning
//! - **`parser`** - RFC3164/RFC5424/raw syslog parsing
//! - **`fanout`** - the sink registry and broadcast engine
//! - **`sinks`** - archive writer, pub/sub publisher, third-party forwarders
//! - **`collectors`** - UDP, TCP, and HTTP ingestion
//! - **`auth`** - pluggable token store backing the admin routes
//! - **`router`** - the HTTP API (collector, query endpoint, token routes)
//! - **`config`** - configuration layering and retention grammar
//! - **`cli`** - command-line surface (`run`, `add-token`, `export`, `import`)
//!
//! # Error Handling
//!
//! Each module owns a `thiserror` error enum for its failure modes;
//! `anyhow` is reserved for the service-assembly layer in `main`.

pub mod archive;
pub mod auth;
pub mod cli;
pub mod collectors;
pub mod config;
pub mod fanout;
pub mod message;
pub mod parser;
pub mod reaper;
pub mod router;
pub mod sinks;

pub use config::Configuration;
pub use fanout::Engine;
pub use message::Message;
