//! WebSocket transport using tokio-tungstenite.
//!
//! The client dials a `ws://` URL; [`ServerEndpoint`] is a minimal local acceptor
//! used by tests and offline tooling to stand in for the real server.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

/// Stream type produced by [`connect`].
pub type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Stream type produced by [`ServerEndpoint::accept`].
pub type ServerStream = WebSocketStream<TcpStream>;

/// Open a WebSocket connection to `url`.
pub async fn connect(url: &str) -> Result<ClientStream> {
    info!(url, "Connecting to server");
    let (stream, response) = tokio_tungstenite::connect_async(url)
        .await
        .with_context(|| format!("Failed to connect to {url}"))?;
    debug!(status = %response.status(), "WebSocket handshake complete");
    info!(url, "Connected to server");
    Ok(stream)
}

/// Local WebSocket acceptor speaking the server side of the protocol.
pub struct ServerEndpoint {
    listener: TcpListener,
    addr: SocketAddr,
}

impl ServerEndpoint {
    /// Bind a listener to `addr` (use port 0 for an ephemeral port).
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        let addr = listener.local_addr()?;
        info!(%addr, "Server endpoint bound");
        Ok(Self { listener, addr })
    }

    /// Get the local address this endpoint is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// `ws://` URL clients should dial.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Accept one client and complete the WebSocket handshake.
    pub async fn accept(&self) -> Result<ServerStream> {
        let (tcp, peer) = self
            .listener
            .accept()
            .await
            .context("Failed to accept TCP connection")?;
        let stream = tokio_tungstenite::accept_async(tcp)
            .await
            .context("WebSocket handshake failed")?;
        debug!(%peer, "Accepted client");
        Ok(stream)
    }
}
