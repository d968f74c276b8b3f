//! WebSocket listener and connection halves, built on
//! `tokio-tungstenite`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::{ConnectionId, TransportError};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<TcpStream>;

/// Listens for room connections and serves the health fast-path.
pub struct WsListener {
    listener: TcpListener,
}

impl WsListener {
    /// Binds to `addr`.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(TransportError::Bind)?;
        tracing::info!(addr, "websocket listener up");
        Ok(Self { listener })
    }

    /// The bound local address (useful with port 0 in tests).
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts the next room connection, returning its halves and the
    /// request path (`/<GAMECODE>`).
    ///
    /// Health probes are answered inline and never surface here; a
    /// failed upgrade is logged and the loop keeps accepting.
    pub async fn accept(&self) -> Result<(WsSender, WsReceiver, String), TransportError> {
        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .map_err(TransportError::Accept)?;
            match serve_stream(stream).await {
                Ok(Some((ws, path))) => {
                    let id = ConnectionId::new(
                        NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
                    );
                    tracing::debug!(%id, %peer, %path, "connection upgraded");
                    let (sink, stream) = ws.split();
                    return Ok((
                        WsSender { id, sink },
                        WsReceiver { id, stream },
                        path,
                    ));
                }
                Ok(None) => continue, // health probe, already answered
                Err(error) => {
                    tracing::debug!(%peer, %error, "handshake failed");
                    continue;
                }
            }
        }
    }
}

/// Upgrades one TCP stream, or answers a reserved plain-HTTP path.
async fn serve_stream(stream: TcpStream) -> Result<Option<(WsStream, String)>, TransportError> {
    if let Some(path) = peek_request_path(&stream).await {
        let body = match path.as_str() {
            "/health" => Some("OK"),
            "/ping" => Some("pong"),
            _ => None,
        };
        if let Some(body) = body {
            let mut stream = stream;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len(),
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
            return Ok(None);
        }
    }

    let mut path = String::from("/");
    let ws = tokio_tungstenite::accept_hdr_async(stream, |request: &Request, response| {
        path = request.uri().path().to_string();
        Ok(response)
    })
    .await
    .map_err(TransportError::Handshake)?;
    Ok(Some((ws, path)))
}

type Request = tokio_tungstenite::tungstenite::handshake::server::Request;

/// Peeks the request line off the socket without consuming it, so the
/// health fast-path can answer before any upgrade is attempted.
///
/// Request lines practically always arrive in the first segment; after
/// a few short retries the caller falls through to the WebSocket
/// handshake, which produces its own error for anything malformed.
async fn peek_request_path(stream: &TcpStream) -> Option<String> {
    let mut buf = [0u8; 512];
    for _ in 0..10 {
        let n = stream.peek(&mut buf).await.ok()?;
        if let Some(end) = buf[..n].windows(2).position(|w| w == b"\r\n") {
            let line = std::str::from_utf8(&buf[..end]).ok()?;
            let mut parts = line.split_whitespace();
            let _method = parts.next()?;
            return parts.next().map(str::to_string);
        }
        if n == buf.len() {
            return None; // request line longer than the peek window
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    None
}

// ---------------------------------------------------------------------------
// Connection halves
// ---------------------------------------------------------------------------

/// Write half of one connection. Owned by the connection's writer task.
pub struct WsSender {
    id: ConnectionId,
    sink: SplitSink<WsStream, Message>,
}

impl WsSender {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Sends one text frame (all Ludorum frames are JSON text).
    pub async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let text = String::from_utf8_lossy(data).into_owned();
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(TransportError::Send)
    }

    /// Closes the connection with an application close code.
    pub async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError> {
        self.sink
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: reason.to_string().into(),
            })))
            .await
            .map_err(TransportError::Send)
    }
}

/// Read half of one connection. Owned by the connection's read loop.
pub struct WsReceiver {
    id: ConnectionId,
    stream: SplitStream<WsStream>,
}

impl WsReceiver {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Receives the next data frame as bytes. `Ok(None)` on clean
    /// close; control frames are skipped.
    pub async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.into())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/frame
                Some(Err(error)) => return Err(TransportError::Receive(error)),
            }
        }
    }
}
