//! UDP syslog collector: one socket, one read loop, one spawned parse task
//! per datagram so the read loop never blocks on downstream fan-out.

use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{error, info};

use crate::fanout::Engine;
use crate::parser;

const MAX_DATAGRAM: usize = 65535;

pub async fn run(address: &str, default_type: Arc<str>, engine: Engine) -> std::io::Result<()> {
    let socket = UdpSocket::bind(address).await?;
    info!(address, "udp collector listening");

    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (n, _peer) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(err) => {
                error!(error = %err, "udp collector read failed");
                return Err(err);
            }
        };
        if n == 0 {
            continue;
        }

        let payload = buf[..n].to_vec();
        let default_type = default_type.clone();
        let engine = engine.clone();
        tokio::spawn(async move {
            let mut msg = parser::parse(&payload);
            msg.normalize(&default_type);
            engine.write_message(msg).await;
        });
    }
}
