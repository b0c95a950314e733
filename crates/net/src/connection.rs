//! Typed message connections on top of the WebSocket transport.
//!
//! One protocol message travels per binary frame. Text, ping and pong frames are
//! not part of the protocol and are skipped.

use crate::codec::{
    decode_client_message, decode_server_message, encode_client_message, encode_server_message,
    DecodeError,
};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::transport::{self, ClientStream, ServerStream};
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, trace};

/// One inbound event on a client connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A decoded server message.
    Message(ServerMessage),
    /// A frame that failed to decode; the connection stays usable.
    Malformed(DecodeError),
    /// The server closed the connection.
    Closed {
        /// Close-frame reason, if one was given.
        reason: Option<String>,
    },
}

/// Client-side connection wrapping the WebSocket stream and the codec.
pub struct ClientConnection {
    stream: ClientStream,
    messages_sent: u64,
    messages_received: u64,
}

impl ClientConnection {
    /// Dial `url` and wrap the resulting stream.
    pub async fn connect(url: &str) -> Result<Self> {
        let stream = transport::connect(url).await?;
        Ok(Self::new(stream))
    }

    /// Wrap an established stream.
    pub fn new(stream: ClientStream) -> Self {
        Self {
            stream,
            messages_sent: 0,
            messages_received: 0,
        }
    }

    /// Encode and send a client message.
    pub async fn send(&mut self, msg: &ClientMessage) -> Result<()> {
        let data = encode_client_message(msg);
        trace!(len = data.len(), "Sending client message");
        self.stream
            .send(Message::binary(data))
            .await
            .context("Failed to send client message")?;
        self.messages_sent += 1;
        Ok(())
    }

    /// Wait for the next inbound event.
    ///
    /// Cancel-safe: dropping the future before it resolves loses no frame.
    pub async fn recv(&mut self) -> Result<Inbound> {
        loop {
            let frame = match self.stream.next().await {
                None => return Ok(Inbound::Closed { reason: None }),
                Some(Err(
                    tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed,
                )) => return Ok(Inbound::Closed { reason: None }),
                Some(frame) => frame.context("Failed to read server frame")?,
            };
            match frame {
                Message::Binary(data) => {
                    self.messages_received += 1;
                    return Ok(match decode_server_message(&data) {
                        Ok(msg) => Inbound::Message(msg),
                        Err(err) => Inbound::Malformed(err),
                    });
                }
                Message::Close(frame) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|reason| !reason.is_empty());
                    info!(?reason, "Server closed connection");
                    return Ok(Inbound::Closed { reason });
                }
                Message::Text(_) => debug!("Ignoring text frame"),
                _ => {}
            }
        }
    }

    /// Number of messages sent so far.
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent
    }

    /// Number of binary frames received so far.
    pub fn messages_received(&self) -> u64 {
        self.messages_received
    }

    /// Close the connection gracefully.
    pub async fn close(&mut self) -> Result<()> {
        info!("Closing connection");
        match self.stream.close(None).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed) => Ok(()),
            Err(err) => Err(err).context("Failed to close connection"),
        }
    }
}

/// Server side of one accepted connection (tests and local tooling).
pub struct ServerConnection {
    stream: ServerStream,
}

impl ServerConnection {
    /// Wrap an accepted stream.
    pub fn new(stream: ServerStream) -> Self {
        Self { stream }
    }

    /// Encode and send a server message.
    pub async fn send(&mut self, msg: &ServerMessage) -> Result<()> {
        self.send_raw(encode_server_message(msg)).await
    }

    /// Send arbitrary bytes as one binary frame.
    pub async fn send_raw(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.stream
            .send(Message::binary(bytes))
            .await
            .context("Failed to send server message")
    }

    /// Receive the next client message; `None` once the client has gone away.
    pub async fn recv(&mut self) -> Result<Option<Result<ClientMessage, DecodeError>>> {
        while let Some(frame) = self.stream.next().await {
            let frame = match frame {
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return Ok(None)
                }
                frame => frame.context("Failed to read client frame")?,
            };
            match frame {
                Message::Binary(data) => return Ok(Some(decode_client_message(&data))),
                Message::Close(_) => return Ok(None),
                _ => continue,
            }
        }
        Ok(None)
    }

    /// Close the connection with a normal close frame.
    pub async fn close(&mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed) => Ok(()),
            Err(err) => Err(err).context("Failed to close connection"),
        }
    }
}
