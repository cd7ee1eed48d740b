//! Publisher side of an MLLP exchange: one connection, one message at a
//! time, each optionally answered by an acknowledgment.

use std::time::Duration;

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use log::{debug, trace};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;

use crate::codec::MllpCodec;
use crate::error::{MllpError, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// The connection is a tagged state, not a nullable handle, so a half-open
// socket can't be observed by callers.
enum Link {
    Disconnected,
    Connected(Framed<TcpStream, MllpCodec>),
}

/// An MLLP publisher connection.
///
/// Created disconnected; connects lazily on the first [`send`](Self::send).
/// With keep-alive (the default) the connection stays open between sends;
/// without it, every send closes the connection before returning. Sends are
/// synchronous end-to-end (write, then one bounded read for the ack), and
/// `&mut self` keeps a single connection from being driven concurrently.
pub struct MllpClient {
    host: String,
    port: u16,
    timeout: Duration,
    keepalive: bool,
    link: Link,
}

impl MllpClient {
    /// A disconnected client for the given endpoint, with a 10 second
    /// timeout and keep-alive enabled.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        MllpClient {
            host: host.into(),
            port,
            timeout: DEFAULT_TIMEOUT,
            keepalive: true,
            link: Link::Disconnected,
        }
    }

    /// Bounds both the connection attempt and the acknowledgment read.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// When false, the connection is closed after every send.
    pub fn keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.link, Link::Connected(_))
    }

    /// Sends one message, framed, and waits up to the configured timeout
    /// for an acknowledgment.
    ///
    /// Returns `Ok(Some(text))` with the best-effort UTF-8 decoded reply,
    /// or `Ok(None)` when no acknowledgment arrived in time — a normal,
    /// recoverable outcome, not an error. Transport failures (refused
    /// connection, write failure, reset) are returned as errors without any
    /// retry, and close the connection so the next send starts clean.
    pub async fn send(&mut self, message: &str) -> Result<Option<String>> {
        let result = self.exchange(message).await;
        if result.is_err() || !self.keepalive {
            self.close();
        }
        result
    }

    /// Closes the connection if one is open and resets to disconnected.
    /// Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.is_connected() {
            debug!("closing connection to {}:{}", self.host, self.port);
        }
        self.link = Link::Disconnected;
    }

    async fn exchange(&mut self, message: &str) -> Result<Option<String>> {
        let send_timeout = self.timeout;
        let transport = self.connect().await?;

        transport.send(BytesMut::from(message)).await?;
        trace!("message written, awaiting ack");

        match timeout(send_timeout, transport.next()).await {
            Err(_elapsed) => Ok(None), // no ack within the window
            Ok(None) => Ok(None),      // peer closed without replying
            Ok(Some(Ok(reply))) => Ok(Some(String::from_utf8_lossy(&reply).into_owned())),
            Ok(Some(Err(e))) => Err(e.into()),
        }
    }

    async fn connect(&mut self) -> Result<&mut Framed<TcpStream, MllpCodec>> {
        if let Link::Disconnected = self.link {
            let addr = (self.host.as_str(), self.port);
            let stream = timeout(self.timeout, TcpStream::connect(addr))
                .await
                .map_err(|_| MllpError::ConnectTimeout(self.timeout))??;
            debug!("connected to {}:{}", self.host, self.port);
            self.link = Link::Connected(Framed::new(stream, MllpCodec::new()));
        }

        match &mut self.link {
            Link::Connected(transport) => Ok(transport),
            Link::Disconnected => unreachable!("link was just established"),
        }
    }
}
