//! Socket seam used by the connection worker.
//!
//! The worker only needs to open a socket, read frames and close it. Keeping
//! that behind a trait lets tests script the server side without a network.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Error as TungsteniteError, protocol::Message},
};
use url::Url;

use crate::error::ConnectionError;

/// A frame read from an open socket, reduced to what the worker cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// Binary payload of the given length
    Binary(usize),
    /// The peer closed the socket or the stream ended
    Closed,
    /// Reading failed; the socket is unusable
    Failed(String),
}

/// Opens sockets to a progress channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, url: &Url) -> Result<Box<dyn StatusStream>, ConnectionError>;
}

/// An open socket.
#[async_trait]
pub trait StatusStream: Send {
    /// Wait for the next frame. Control frames are handled internally.
    async fn next_frame(&mut self) -> Frame;

    /// Close the socket. Errors while closing are ignored.
    async fn close(&mut self);
}

/// `Transport` backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, url: &Url) -> Result<Box<dyn StatusStream>, ConnectionError> {
        let (stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;

        tracing::debug!("Connected to {} (HTTP {})", url, response.status());

        Ok(Box::new(WebSocketStatusStream { inner: stream }))
    }
}

struct WebSocketStatusStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl StatusStream for WebSocketStatusStream {
    async fn next_frame(&mut self) -> Frame {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => return Frame::Text(text.as_str().to_string()),
                Some(Ok(Message::Binary(data))) => return Frame::Binary(data.len()),
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!("Server sent close frame: {:?}", frame);
                    return Frame::Closed;
                }
                // Ping/Pong are answered by tungstenite itself
                Some(Ok(_)) => continue,
                Some(Err(TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed))
                | None => return Frame::Closed,
                Some(Err(e)) => return Frame::Failed(e.to_string()),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.inner.close(None).await {
            tracing::debug!("Error while closing socket: {}", e);
        }
    }
}
