//! WebSocket listener with join-handshake capture.
//!
//! The join parameters (username, room, language, mode) ride on the
//! connection URL's query string — the client connects to
//! `ws://host/?username=az&roomId=123` and is in the room as soon as the
//! WebSocket handshake completes. The accept path therefore has to grab
//! the request URI during the upgrade.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use wikirace_protocol::Mode;

use crate::ServerError;

/// Counter for generating unique connection ids.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// The server side of one accepted WebSocket connection.
pub type WsStream = WebSocketStream<TcpStream>;

/// Opaque identifier for a connection, for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Join parameters parsed from the handshake query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinQuery {
    pub username: Option<String>,
    pub room_id: Option<String>,
    pub language: Option<String>,
    pub mode: Mode,
}

/// Parses `username=..&roomId=..&lang=..&mode=..`, percent-decoding values.
/// Unknown keys are ignored; an unknown mode falls back to multi.
pub fn parse_join_query(query: &str) -> JoinQuery {
    let mut parsed = JoinQuery::default();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "username" => parsed.username = Some(value.to_string()),
            "roomId" => parsed.room_id = Some(value.to_string()),
            "lang" => parsed.language = Some(value.to_string()),
            "mode" => parsed.mode = value.parse().unwrap_or_default(),
            _ => {}
        }
    }
    parsed
}

/// An accepted, upgraded connection plus its join parameters.
pub struct IncomingConnection {
    pub id: ConnectionId,
    pub ws: WsStream,
    pub query: JoinQuery,
}

/// Listens for incoming WebSocket connections.
pub struct WsListener {
    listener: TcpListener,
}

impl WsListener {
    /// Binds the listener to the given address.
    pub async fn bind(addr: &str) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts and upgrades the next connection, capturing the handshake
    /// query string on the way through.
    pub async fn accept(&mut self) -> Result<IncomingConnection, ServerError> {
        let (stream, addr) = self.listener.accept().await?;

        let mut raw_query: Option<String> = None;
        let ws = tokio_tungstenite::accept_hdr_async(stream, |request: &Request, response: Response| {
            raw_query = request.uri().query().map(str::to_string);
            Ok(response)
        })
        .await?;

        let id = ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        let query = parse_join_query(raw_query.as_deref().unwrap_or(""));
        tracing::debug!(%id, %addr, ?query, "accepted WebSocket connection");

        Ok(IncomingConnection { id, ws, query })
    }
}
