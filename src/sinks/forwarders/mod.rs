//! Third-party forwarder sinks. `spec.md` names the concrete endpoints only
//! to specify the interface they satisfy; these two wire protocols are the
//! ones §4.5 actually pins down.

mod syslog_udp;
mod tcp_line;

pub use syslog_udp::SyslogUdpForwarder;
pub use tcp_line::TcpLineForwarder;
