//! Ingestion collectors: UDP and TCP syslog listeners, and the HTTP
//! decode helper used by the router's `POST /logs` handler.

pub mod http;
mod tcp;
mod udp;

pub use tcp::run as run_tcp;
pub use udp::run as run_udp;
