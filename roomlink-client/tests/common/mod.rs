//! Common test utilities for roomlink-client integration tests
//!
//! `ScriptedTransport` stands in for the network so state machine tests can
//! run on paused time. `MockWsServer` is a real WebSocket server for tests
//! that exercise `WsTransport` end to end.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use roomlink_client::{CloseKind, Endpoint, LinkPeer, Transport, TransportEvent, TransportLink};
use roomlink_core::{codec, Error, Frame, Result};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

struct ScriptState {
    outcomes: VecDeque<Result<()>>,
    fail_by_default: bool,
    opens: Vec<Instant>,
}

/// Transport whose opens follow a script
///
/// Queued outcomes are consumed first; after that every open succeeds, or
/// fails when the transport was created with `failing()`. Each successful
/// open hands its `LinkPeer` to the test through `next_peer()`.
#[derive(Clone)]
pub struct ScriptedTransport {
    state: Arc<Mutex<ScriptState>>,
    peers_tx: mpsc::UnboundedSender<LinkPeer>,
    peers_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<LinkPeer>>>,
}

impl ScriptedTransport {
    /// Every open succeeds
    pub fn new() -> Self {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                outcomes: VecDeque::new(),
                fail_by_default: false,
                opens: Vec::new(),
            })),
            peers_tx,
            peers_rx: Arc::new(tokio::sync::Mutex::new(peers_rx)),
        }
    }

    /// Every open fails with a connection refused error
    pub fn failing() -> Self {
        let transport = Self::new();
        transport.set_failing(true);
        transport
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().fail_by_default = failing;
    }

    /// Queue the outcome of the next open
    pub fn push_outcome(&self, outcome: Result<()>) {
        self.state.lock().unwrap().outcomes.push_back(outcome);
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().opens.len()
    }

    /// When each open was attempted
    pub fn open_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().opens.clone()
    }

    /// The peer of the next successful open
    pub async fn next_peer(&self) -> LinkPeer {
        let mut peers = self.peers_rx.lock().await;
        tokio::time::timeout(Duration::from_secs(60), peers.recv())
            .await
            .expect("no connection opened in time")
            .expect("transport dropped")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, _endpoint: &Endpoint) -> Result<TransportLink> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.opens.push(Instant::now());
            match state.outcomes.pop_front() {
                Some(outcome) => outcome,
                None if state.fail_by_default => {
                    Err(Error::WebSocket("connection refused".into()))
                }
                None => Ok(()),
            }
        };

        outcome?;
        let (link, peer) = TransportLink::channel();
        let _ = self.peers_tx.send(peer);
        Ok(link)
    }
}

/// Frames the manager has sent so far, without waiting
pub fn drain_frames(peer: &mut LinkPeer) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Ok(frame) = peer.outgoing.try_recv() {
        frames.push(frame);
    }
    frames
}

/// Next frame the manager sends that is not a heartbeat
pub async fn next_app_frame(peer: &mut LinkPeer) -> Frame {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(60), peer.outgoing.recv())
            .await
            .expect("no frame sent in time")
            .expect("link dropped");
        if frame.event != "ping" {
            return frame;
        }
    }
}

/// Deliver an inbound frame to the manager
pub fn deliver(peer: &LinkPeer, frame: Frame) {
    peer.incoming
        .send(TransportEvent::Frame(frame))
        .expect("manager dropped the link");
}

/// End the link from the transport side
pub fn close(peer: &LinkPeer, kind: CloseKind) {
    let _ = peer.incoming.send(TransportEvent::Closed(kind));
}

/// Let the manager task process everything queued so far
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone)]
enum ServerAction {
    Send(Frame),
    Close(u16),
}

/// Mock WebSocket server speaking the roomlink frame format
///
/// Answers every `ping` with a `pong` carrying the same payload (unless
/// created with `silent()`), records every frame it receives, and lets the
/// test push frames or close every connection with a given code.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    frames_rx: mpsc::Receiver<Frame>,
    actions: broadcast::Sender<ServerAction>,
    auth_headers: Arc<Mutex<Vec<Option<String>>>>,
}

impl MockWsServer {
    pub async fn new() -> Self {
        Self::start(true, None).await
    }

    /// A server that never answers heartbeats
    pub async fn silent() -> Self {
        Self::start(false, None).await
    }

    /// A server that refuses every handshake with `status`
    pub async fn rejecting(status: u16) -> Self {
        Self::start(true, Some(status)).await
    }

    async fn start(answer_pings: bool, reject_with: Option<u16>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (frames_tx, frames_rx) = mpsc::channel::<Frame>(100);
        let (actions, _) = broadcast::channel::<ServerAction>(16);
        let auth_headers = Arc::new(Mutex::new(Vec::new()));

        let actions_for_server = actions.clone();
        let headers_for_server = Arc::clone(&auth_headers);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    accept_result = listener.accept() => {
                        let Ok((stream, _)) = accept_result else { continue };
                        let frames_tx = frames_tx.clone();
                        let mut actions = actions_for_server.subscribe();
                        let headers = Arc::clone(&headers_for_server);

                        tokio::spawn(async move {
                            let callback = move |request: &Request, response: Response| {
                                let auth = request
                                    .headers()
                                    .get("authorization")
                                    .and_then(|value| value.to_str().ok())
                                    .map(str::to_string);
                                headers.lock().unwrap().push(auth);

                                match reject_with {
                                    Some(status) => {
                                        let mut rejection = ErrorResponse::new(None);
                                        *rejection.status_mut() =
                                            StatusCode::from_u16(status).unwrap();
                                        Err(rejection)
                                    }
                                    None => Ok(response),
                                }
                            };

                            let Ok(ws_stream) = accept_hdr_async(stream, callback).await else {
                                return;
                            };
                            let (mut write, mut read) = ws_stream.split();

                            loop {
                                tokio::select! {
                                    incoming = read.next() => {
                                        let Some(Ok(message)) = incoming else { break };
                                        let Message::Text(text) = message else { continue };
                                        let Ok(frame) = codec::decode(&text) else { continue };

                                        if answer_pings && frame.event == "ping" {
                                            let pong = Frame::new("pong", frame.data.clone());
                                            let text = codec::encode(&pong).unwrap();
                                            let _ = write.send(Message::Text(text)).await;
                                        }
                                        let _ = frames_tx.send(frame).await;
                                    }
                                    action = actions.recv() => match action {
                                        Ok(ServerAction::Send(frame)) => {
                                            let text = codec::encode(&frame).unwrap();
                                            let _ = write.send(Message::Text(text)).await;
                                        }
                                        Ok(ServerAction::Close(code)) => {
                                            let _ = write
                                                .send(Message::Close(Some(CloseFrame {
                                                    code: CloseCode::from(code),
                                                    reason: "".into(),
                                                })))
                                                .await;
                                            break;
                                        }
                                        Err(_) => break,
                                    },
                                }
                            }
                        });
                    }
                }
            }
        });

        // Wait a bit for server to be ready
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            addr,
            shutdown_tx,
            frames_rx,
            actions,
            auth_headers,
        }
    }

    /// WebSocket URL for connecting to this server
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Next frame received from any client, skipping heartbeats
    pub async fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(5), self.frames_rx.recv())
                .await
                .ok()
                .flatten()?;
            if frame.event != "ping" {
                return Some(frame);
            }
        }
    }

    /// Next heartbeat received from any client
    pub async fn next_ping(&mut self) -> Option<Frame> {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(5), self.frames_rx.recv())
                .await
                .ok()
                .flatten()?;
            if frame.event == "ping" {
                return Some(frame);
            }
        }
    }

    /// Push a frame to every open connection
    pub fn broadcast(&self, frame: Frame) {
        let _ = self.actions.send(ServerAction::Send(frame));
    }

    /// Close every open connection with `code`
    pub fn close_all(&self, code: u16) {
        let _ = self.actions.send(ServerAction::Close(code));
    }

    /// Authorization header of each handshake, in order
    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.auth_headers.lock().unwrap().clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_creation() {
        let server = MockWsServer::new().await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_scripted_transport_follows_script() {
        let transport = ScriptedTransport::new();
        transport.push_outcome(Err(Error::Timeout));

        let endpoint = Endpoint::new("ws://scripted");
        assert!(matches!(transport.open(&endpoint).await, Err(Error::Timeout)));
        assert!(transport.open(&endpoint).await.is_ok());
        assert_eq!(transport.open_count(), 2);
    }
}
