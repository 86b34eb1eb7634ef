//! Transport port and the WebSocket transport
//!
//! The manager does not know how bytes move. It asks a `Transport` to open
//! an `Endpoint` and gets back a `TransportLink`: an outbound frame sender
//! and an inbound event receiver. Each (re)connect produces a fresh link;
//! dropping a link closes that transport and stops its IO tasks.
//!
//! # Close Semantics
//!
//! The inbound side ends with exactly one `TransportEvent::Closed`:
//!
//! - `CloseKind::Normal`: the peer sent a close frame with code 1000 (or
//!   no code). The manager does not retry.
//! - `CloseKind::Abnormal`: any other close code, a read error, or the
//!   stream ending without a close frame. The manager retries with backoff.
//!
//! # Custom Transports
//!
//! `TransportLink::channel()` returns a link plus the `LinkPeer` that a
//! transport implementation (or a test fake) drives from the other side.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use roomlink_core::{codec, Error, Frame, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};

/// Where and how to connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Server base URL, e.g. `ws://localhost:8080`
    pub url: String,
    /// Logical namespace appended to the URL path; `/` for the root
    pub namespace: String,
    /// Deadline for the opening handshake
    pub timeout: Duration,
    /// Bearer token presented during the handshake
    pub auth_token: Option<String>,
}

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            namespace: "/".to_string(),
            timeout: Duration::from_millis(20_000),
            auth_token: None,
        }
    }

    /// Full address the transport connects to
    pub fn address(&self) -> String {
        let base = self.url.trim_end_matches('/');
        if self.namespace == "/" || self.namespace.is_empty() {
            base.to_string()
        } else {
            format!("{}{}", base, self.namespace)
        }
    }
}

/// How a transport ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseKind {
    /// Graceful close by the peer
    Normal,
    /// Network error, abrupt close, or non-normal close code
    Abnormal(String),
}

/// Something the transport delivered
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A decoded frame
    Frame(Frame),
    /// The transport is gone; no further events follow
    Closed(CloseKind),
}

/// Aborts the transport's background tasks when the link is dropped
#[derive(Debug, Default)]
struct TaskGuard {
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// One open transport, as seen by the manager
#[derive(Debug)]
pub struct TransportLink {
    outbound: mpsc::UnboundedSender<Frame>,
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    guard: TaskGuard,
}

/// The transport side of a `TransportLink`
#[derive(Debug)]
pub struct LinkPeer {
    /// Frames the manager sent
    pub outgoing: mpsc::UnboundedReceiver<Frame>,
    /// Events to deliver to the manager
    pub incoming: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportLink {
    /// Create a connected link/peer pair
    pub fn channel() -> (TransportLink, LinkPeer) {
        let (outbound, outgoing) = mpsc::unbounded_channel();
        let (incoming, inbound) = mpsc::unbounded_channel();
        let link = TransportLink {
            outbound,
            inbound,
            guard: TaskGuard::default(),
        };
        (link, LinkPeer { outgoing, incoming })
    }

    /// Tie background tasks to this link; they are aborted when it drops
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.guard.tasks.push(task);
        self
    }

    /// Queue a frame for sending
    pub fn send(&self, frame: Frame) -> Result<()> {
        self.outbound.send(frame).map_err(|_| Error::ConnectionClosed)
    }

    /// Next inbound event; `None` once the transport side is gone
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        self.inbound.recv().await
    }

    /// Whether the transport has stopped accepting frames
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

/// Opens transports to an endpoint
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn open(&self, endpoint: &Endpoint) -> Result<TransportLink>;
}

/// WebSocket transport over tokio-tungstenite
#[derive(Debug, Clone, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        Self
    }
}

fn close_kind(frame: Option<CloseFrame<'_>>) -> CloseKind {
    match frame {
        None => CloseKind::Normal,
        Some(frame) if frame.code == CloseCode::Normal => CloseKind::Normal,
        Some(frame) => CloseKind::Abnormal(format!(
            "close code {}: {}",
            u16::from(frame.code),
            frame.reason
        )),
    }
}

fn connect_error(err: tungstenite::Error) -> Error {
    match err {
        tungstenite::Error::Http(response) => {
            Error::Handshake(format!("HTTP {}", response.status()))
        }
        other => Error::WebSocket(other.to_string()),
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, endpoint: &Endpoint) -> Result<TransportLink> {
        let address = endpoint.address();
        let mut request = address
            .as_str()
            .into_client_request()
            .map_err(|e| Error::WebSocket(e.to_string()))?;

        if let Some(token) = &endpoint.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| Error::InvalidConfig(format!("auth token: {}", e)))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        tracing::debug!(address = %address, "Opening WebSocket");
        let (ws_stream, _response) = tokio::time::timeout(endpoint.timeout, connect_async(request))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(connect_error)?;

        let (mut sink, mut stream) = ws_stream.split();
        let (link, peer) = TransportLink::channel();
        let LinkPeer {
            mut outgoing,
            incoming,
        } = peer;

        // Ends when the link drops its sender, then closes the socket
        tokio::spawn(async move {
            while let Some(frame) = outgoing.recv().await {
                let text = match codec::encode(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(error = %e, event = %frame.event, "Dropping unencodable frame");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    tracing::debug!(error = %e, "WebSocket write failed");
                    break;
                }
            }
            let _ = tokio::time::timeout(Duration::from_secs(1), sink.close()).await;
        });

        let reader = tokio::spawn(async move {
            let close = loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => match codec::decode(&text) {
                        Ok(frame) => {
                            if incoming.send(TransportEvent::Frame(frame)).is_err() {
                                return;
                            }
                        }
                        Err(e) => tracing::debug!(error = %e, "Skipping undecodable message"),
                    },
                    Some(Ok(Message::Close(frame))) => break close_kind(frame),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break CloseKind::Abnormal(e.to_string()),
                    None => break CloseKind::Abnormal("stream ended without close frame".into()),
                }
            };
            let _ = incoming.send(TransportEvent::Closed(close));
        });

        Ok(link.with_task(reader))
    }
}
