//! Listener side of an MLLP exchange: accept connections, extract framed
//! messages, answer each with an application-accept acknowledgment.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use crate::codec::MllpCodec;
use crate::error::Result;
use crate::message::{ack_message, control_id};

/// An MLLP listener.
///
/// Each accepted connection is served by its own task with its own receive
/// buffer; no state is shared across connections. Every extracted message
/// is handed to the caller's handler and acknowledged with `MSA|AA|<id>`
/// before the next read. A connection's task ends when the peer closes the
/// stream or on I/O error, discarding any partially buffered frame.
pub struct MllpServer {
    listener: TcpListener,
}

impl MllpServer {
    /// Binds the listening socket. Use port 0 for an ephemeral port and
    /// [`local_addr`](Self::local_addr) to discover it.
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("MLLP listener bound on {}", listener.local_addr()?);
        Ok(MllpServer { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs the accept loop, spawning one task per inbound connection.
    ///
    /// `on_message` receives each extracted message as best-effort decoded
    /// text. Returns only if accepting fails.
    pub async fn run<F>(self, on_message: F) -> Result<()>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let on_message = Arc::new(on_message);
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let handler = Arc::clone(&on_message);

            tokio::spawn(async move {
                debug!("connection opened from {}", peer);
                if let Err(e) = process(stream, handler.as_ref()).await {
                    warn!("connection from {} failed: {}", peer, e);
                }
                debug!("connection from {} closed", peer);
            });
        }
    }
}

async fn process<F>(stream: TcpStream, on_message: &F) -> std::io::Result<()>
where
    F: Fn(&str),
{
    let mut transport = Framed::new(stream, MllpCodec::new());

    while let Some(result) = transport.next().await {
        let frame = result?;
        // Undecodable bytes are substituted rather than failing the read.
        let message = String::from_utf8_lossy(&frame);
        on_message(&message);

        // The original control id rides along in the ack; a message without
        // one still gets acknowledged.
        let ack = ack_message(control_id(&message).unwrap_or("1"));
        transport.send(BytesMut::from(ack.as_str())).await?;
    }

    Ok(())
}
