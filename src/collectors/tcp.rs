//! TCP syslog collector: accepts connections, reads newline-delimited
//! frames per connection; EOF terminates only that connection's loop.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};

use crate::fanout::Engine;
use crate::parser;

pub async fn run(address: &str, default_type: Arc<str>, engine: Engine) -> std::io::Result<()> {
    let listener = TcpListener::bind(address).await?;
    info!(address, "tcp collector listening");

    loop {
        let (stream, _peer) = listener.accept().await?;
        let default_type = default_type.clone();
        let engine = engine.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, default_type, engine).await {
                error!(error = %err, "tcp collector connection ended with error");
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    default_type: Arc<str>,
    engine: Engine,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(()); // EOF
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() {
            continue;
        }
        let mut msg = parser::parse(trimmed.as_bytes());
        msg.normalize(&default_type);
        engine.write_message(msg).await;
    }
}
