//! The connection manager
//!
//! A `ConnectionManager` is a cheap, cloneable handle to a single Tokio task
//! that owns every piece of connection state: the transport link, the
//! heartbeat monitor, the retry timer, the listener table and the desired
//! subscription set. Handles talk to the task over a command channel and
//! observe it through a `watch` channel carrying `ConnectionStatus`.
//!
//! Because one task owns everything, no state is shared or locked. Timers
//! and the heartbeat live inside the current `Phase`, so replacing the
//! phase (on disconnect, reconnect or dispose) cancels them.
//!
//! # Failure Handling
//!
//! - A failed open, an abnormal close, or a dead heartbeat schedules a retry
//!   with backoff until `max_attempts` retries have been scheduled. The next
//!   failure ends in `Disconnected(RetriesExhausted)`.
//! - A graceful close by the server ends in `Disconnected(RemoteClosed)`.
//! - `disconnect()` ends in `Disconnected(Closed)`.
//!
//! In all three cases `reconnect()` resumes. Nothing is ever returned as an
//! error from `open`/`reconnect`; failures land in `ConnectionStatus::error`.
//!
//! # Disposal
//!
//! `dispose()` ends the task. The desired subscription set and the listener
//! table are cleared, the lifecycle observer is detached, and every timer is
//! dropped. Later calls on any handle are silent no-ops and `emit` returns
//! `false`. Dropping the last handle disposes the same way.
//!
//! # Examples
//!
//! ```rust,no_run
//! use roomlink_client::{listener, ManagerBuilder};
//!
//! # async fn example() -> roomlink_core::Result<()> {
//! let manager = ManagerBuilder::new("ws://localhost:3001")
//!     .namespace("/dns")
//!     .events(["dns-status"])
//!     .build()?;
//!
//! manager.subscribe("dns");
//! manager
//!     .on("dns-status", listener(|frame| println!("{}", frame.data)))
//!     .await?;
//!
//! let mut status = manager.watch();
//! while status.changed().await.is_ok() {
//!     println!("connected: {}", status.borrow().connected);
//! }
//! # Ok(())
//! # }
//! ```

use crate::backoff::BackoffPolicy;
use crate::config::ManagerConfig;
use crate::connection_state::{
    ConnectionState, ConnectionStatus, DisconnectReason, RetryState,
};
use crate::heartbeat::{HeartbeatConfig, HeartbeatEvent, HeartbeatMonitor, Liveness};
use crate::lifecycle::{LifecycleObserver, LifecyclePort, LifecycleSignal};
use crate::listeners::{listener, Listener, ListenerTable};
use crate::metrics::ClientMetrics;
use crate::quality::{classify, LatencyWindow};
use crate::store::{record_connected, KeyValueStore};
use crate::subscription::SubscriptionRegistry;
use crate::transport::{CloseKind, Endpoint, Transport, TransportEvent, TransportLink};
use futures::future::BoxFuture;
use roomlink_core::{codec, is_reserved, Error, Frame, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Sleep;
use tracing::Instrument;

enum Command {
    Open,
    Subscribe(String),
    Unsubscribe(String),
    On {
        event: String,
        listener: Listener,
        reply: oneshot::Sender<Result<()>>,
    },
    Off {
        event: String,
        listener: Listener,
    },
    Emit {
        frame: Frame,
        reply: oneshot::Sender<bool>,
    },
    Reconnect,
    Disconnect,
    Subscriptions(oneshot::Sender<Vec<String>>),
    LatencyHistory(oneshot::Sender<Vec<Duration>>),
    Dispose(oneshot::Sender<()>),
}

/// Everything the builder hands to a new manager
pub(crate) struct ManagerParts {
    pub config: ManagerConfig,
    pub transport: Arc<dyn Transport>,
    pub lifecycle: Option<Arc<dyn LifecyclePort>>,
    pub store: Arc<dyn KeyValueStore>,
    pub metrics: Option<Arc<ClientMetrics>>,
}

/// Handle to a running connection manager
///
/// Clones share the same connection. Create one with `ManagerBuilder`.
#[derive(Clone)]
pub struct ConnectionManager {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ConnectionStatus>,
    namespace: Arc<str>,
}

impl ConnectionManager {
    /// Build a manager from a configuration with the default collaborators
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        crate::ManagerBuilder::from_config(config).build()
    }

    pub(crate) fn spawn(parts: ManagerParts) -> Self {
        let ManagerParts {
            config,
            transport,
            lifecycle,
            store,
            metrics,
        } = parts;

        let (commands, command_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(ConnectionStatus::default());

        let observer = lifecycle.map(|port| {
            LifecycleObserver::attach(port.as_ref(), move |signal| signal_tx.send(signal).is_ok())
        });

        let namespace: Arc<str> = Arc::from(config.namespace.as_str());
        let span = tracing::info_span!("roomlink", namespace = %namespace);

        let actor = Actor {
            namespace: config.namespace.clone(),
            endpoint: config.endpoint(),
            backoff: config.backoff(),
            heartbeat: config.heartbeat(),
            transport,
            store,
            metrics,
            phase: Phase::Idle,
            retry: RetryState::default(),
            listeners: ListenerTable::new(config.events.iter().cloned()),
            subscriptions: SubscriptionRegistry::new(),
            latency: LatencyWindow::new(config.latency_history),
            background: false,
            offline: false,
            status: status_tx,
            observer,
        };

        tokio::spawn(
            actor
                .run(command_rx, signal_rx, config.auto_connect)
                .instrument(span),
        );

        Self {
            commands,
            status,
            namespace,
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!(namespace = %self.namespace, "Manager disposed, ignoring call");
        }
    }

    /// Namespace this manager serves
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Start connecting if the manager has never been opened
    pub fn open(&self) {
        self.send(Command::Open);
    }

    /// Add a room to the desired set, subscribing now if connected
    pub fn subscribe(&self, room: impl Into<String>) {
        self.send(Command::Subscribe(room.into()));
    }

    /// Remove a room from the desired set, unsubscribing now if connected
    pub fn unsubscribe(&self, room: impl Into<String>) {
        self.send(Command::Unsubscribe(room.into()));
    }

    /// Register a listener for an application event
    ///
    /// The listener stays registered across reconnects. Fails for reserved
    /// names and, when a known event set is configured, for names outside it.
    pub async fn on(&self, event: &str, listener: Listener) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::On {
            event: event.to_string(),
            listener,
            reply,
        });
        // A disposed manager drops the reply; registering there is a no-op
        rx.await.unwrap_or(Ok(()))
    }

    /// Register a listener that receives the event payload deserialized as `T`
    ///
    /// Frames whose payload does not deserialize are logged and skipped.
    /// Returns the underlying listener so it can be passed to `off`.
    pub async fn on_typed<T, F>(&self, event: &str, callback: F) -> Result<Listener>
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let typed = listener(move |frame: &Frame| match codec::decode_data::<T>(frame) {
            Ok(payload) => callback(payload),
            Err(e) => tracing::warn!(event = %frame.event, error = %e, "Dropping malformed payload"),
        });
        self.on(event, typed.clone()).await?;
        Ok(typed)
    }

    /// Remove a listener previously given to `on`
    pub fn off(&self, event: &str, listener: &Listener) {
        self.send(Command::Off {
            event: event.to_string(),
            listener: Arc::clone(listener),
        });
    }

    /// Send an application event
    ///
    /// Returns `true` when the frame was handed to the transport. Returns
    /// `false` without queueing when not connected, when `event` is a
    /// reserved name, or after dispose.
    #[tracing::instrument(skip(self, payload), fields(namespace = %self.namespace))]
    pub async fn emit<P: Serialize>(&self, event: &str, payload: P) -> bool {
        if is_reserved(event) {
            tracing::warn!("Refusing to emit reserved event");
            return false;
        }
        let data = match serde_json::to_value(payload) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "Payload does not serialize");
                return false;
            }
        };

        let (reply, rx) = oneshot::channel();
        self.send(Command::Emit {
            frame: Frame::new(event, data),
            reply,
        });
        rx.await.unwrap_or(false)
    }

    /// Reset the retry counter and connect now, replacing any current
    /// connection, pending retry or attempt in flight
    pub fn reconnect(&self) {
        self.send(Command::Reconnect);
    }

    /// Close the connection normally; no retry follows
    pub fn disconnect(&self) {
        self.send(Command::Disconnect);
    }

    /// Shut the manager down for good
    ///
    /// Idempotent. Resolves once the manager has released its transport,
    /// timers and listeners.
    pub async fn dispose(&self) {
        let (ack, done) = oneshot::channel();
        self.send(Command::Dispose(ack));
        let _ = done.await;
    }

    /// Snapshot of the current status
    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// Receiver that is notified on every status change
    pub fn watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status.borrow().connected
    }

    /// Wait until the status satisfies `predicate`
    ///
    /// Returns `None` if the manager is disposed first without satisfying it.
    pub async fn wait_for<F>(&self, predicate: F) -> Option<ConnectionStatus>
    where
        F: FnMut(&ConnectionStatus) -> bool,
    {
        let mut status = self.status.clone();
        let result = status.wait_for(predicate).await;
        result.ok().map(|status| status.clone())
    }

    /// Rooms in the desired set, sorted
    pub async fn subscriptions(&self) -> Vec<String> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Subscriptions(reply));
        rx.await.unwrap_or_default()
    }

    /// Recent heartbeat round trips, oldest first
    pub async fn latency_history(&self) -> Vec<Duration> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::LatencyHistory(reply));
        rx.await.unwrap_or_default()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("namespace", &self.namespace)
            .field("state", &self.status.borrow().state)
            .finish()
    }
}

struct Session {
    link: TransportLink,
    heartbeat: HeartbeatMonitor,
}

enum Phase {
    Idle,
    Connecting(BoxFuture<'static, Result<TransportLink>>),
    Connected(Session),
    /// Waiting to retry; no timer while the network is offline
    Reconnecting(Option<Pin<Box<Sleep>>>),
    Disconnected(DisconnectReason),
}

enum PhaseEvent {
    Opened(Result<TransportLink>),
    Transport(Option<TransportEvent>),
    Heartbeat(HeartbeatEvent),
    RetryDue,
}

impl Phase {
    /// Wait for whatever the current phase is waiting on
    async fn next_event(&mut self) -> PhaseEvent {
        match self {
            Phase::Connecting(attempt) => PhaseEvent::Opened(attempt.await),
            Phase::Connected(Session { link, heartbeat }) => {
                tokio::select! {
                    event = link.recv() => PhaseEvent::Transport(event),
                    tick = heartbeat.next_event() => PhaseEvent::Heartbeat(tick),
                }
            }
            Phase::Reconnecting(Some(timer)) => {
                timer.as_mut().await;
                PhaseEvent::RetryDue
            }
            Phase::Idle | Phase::Reconnecting(None) | Phase::Disconnected(_) => {
                std::future::pending().await
            }
        }
    }
}

fn error_kind(error: &Error) -> &'static str {
    match error {
        Error::WebSocket(_) => "websocket",
        Error::Handshake(_) => "handshake",
        Error::Serialization(_) => "serialization",
        Error::Timeout => "timeout",
        Error::ConnectionClosed => "connection_closed",
        Error::UnknownEvent(_) => "unknown_event",
        Error::ReservedEvent(_) => "reserved_event",
        Error::InvalidConfig(_) => "invalid_config",
        Error::RetriesExhausted { .. } => "retries_exhausted",
        Error::Disposed => "disposed",
    }
}

struct Actor {
    namespace: String,
    endpoint: Endpoint,
    backoff: BackoffPolicy,
    heartbeat: HeartbeatConfig,
    transport: Arc<dyn Transport>,
    store: Arc<dyn KeyValueStore>,
    metrics: Option<Arc<ClientMetrics>>,
    phase: Phase,
    retry: RetryState,
    listeners: ListenerTable,
    subscriptions: SubscriptionRegistry,
    latency: LatencyWindow,
    background: bool,
    offline: bool,
    status: watch::Sender<ConnectionStatus>,
    observer: Option<LifecycleObserver>,
}

impl Actor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut signals: mpsc::UnboundedReceiver<LifecycleSignal>,
        auto_connect: bool,
    ) {
        if auto_connect {
            self.open();
        }

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Dispose(ack)) => {
                        self.dispose();
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        tracing::debug!("All handles dropped");
                        self.dispose();
                        break;
                    }
                },
                Some(signal) = signals.recv() => self.handle_signal(signal),
                event = self.phase.next_event() => self.handle_event(event),
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Open => self.open(),
            Command::Subscribe(room) => {
                if let Some(frame) = self.subscriptions.subscribe(&room) {
                    tracing::debug!(channel = %room, "Subscribed");
                    self.send_if_connected(frame);
                }
            }
            Command::Unsubscribe(room) => {
                if let Some(frame) = self.subscriptions.unsubscribe(&room) {
                    tracing::debug!(channel = %room, "Unsubscribed");
                    self.send_if_connected(frame);
                }
            }
            Command::On {
                event,
                listener,
                reply,
            } => {
                let result = self.listeners.on(&event, listener);
                if let Err(e) = &result {
                    tracing::warn!(event = %event, error = %e, "Listener rejected");
                }
                let _ = reply.send(result);
            }
            Command::Off { event, listener } => {
                self.listeners.off(&event, &listener);
            }
            Command::Emit { frame, reply } => {
                let _ = reply.send(self.emit(frame));
            }
            Command::Reconnect => {
                tracing::info!("Reconnect requested");
                self.reconnect_now();
            }
            Command::Disconnect => self.disconnect(),
            Command::Subscriptions(reply) => {
                let _ = reply.send(self.subscriptions.rooms());
            }
            Command::LatencyHistory(reply) => {
                let _ = reply.send(self.latency.samples());
            }
            // Handled by the run loop
            Command::Dispose(ack) => {
                let _ = ack.send(());
            }
        }
    }

    fn handle_signal(&mut self, signal: LifecycleSignal) {
        match signal {
            LifecycleSignal::Foregrounded => {
                self.background = false;
                if let Phase::Connected(session) = &mut self.phase {
                    session.heartbeat.set_background(false);
                } else if self.can_revive() {
                    tracing::info!("Foregrounded while disconnected, reconnecting now");
                    self.reconnect_now();
                }
            }
            LifecycleSignal::Backgrounded => {
                self.background = true;
                if let Phase::Connected(session) = &mut self.phase {
                    session.heartbeat.set_background(true);
                }
            }
            LifecycleSignal::Online => {
                self.offline = false;
                if self.can_revive() {
                    tracing::info!("Network back online, reconnecting now");
                    self.reconnect_now();
                }
            }
            LifecycleSignal::Offline => {
                self.offline = true;
                if let Phase::Reconnecting(timer @ Some(_)) = &mut self.phase {
                    tracing::info!("Network offline, pausing retries");
                    *timer = None;
                }
            }
            LifecycleSignal::Restored => {
                let stale = match &self.phase {
                    Phase::Connected(session) => session.link.is_closed(),
                    Phase::Reconnecting(_) => true,
                    _ => false,
                };
                if !stale {
                    return;
                }
                if !self.offline {
                    tracing::info!("Restored with a dead transport, reconnecting now");
                    self.reconnect_now();
                } else if matches!(self.phase, Phase::Connected(_)) {
                    // Park until the network returns; the attempt count is kept
                    tracing::info!("Restored offline with a dead transport");
                    self.on_failure(Error::ConnectionClosed);
                }
            }
        }
    }

    fn handle_event(&mut self, event: PhaseEvent) {
        match event {
            PhaseEvent::Opened(Ok(link)) => self.on_open(link),
            PhaseEvent::Opened(Err(e)) => {
                tracing::warn!(error = %e, attempt = self.retry.attempt_count(), "Connect failed");
                self.on_failure(e);
            }
            PhaseEvent::Transport(Some(TransportEvent::Frame(frame))) => self.on_frame(frame),
            PhaseEvent::Transport(Some(TransportEvent::Closed(CloseKind::Normal))) => {
                tracing::info!("Connection closed by server");
                self.retry.reset();
                self.phase = Phase::Disconnected(DisconnectReason::RemoteClosed);
                self.set_state(ConnectionState::Disconnected(DisconnectReason::RemoteClosed));
            }
            PhaseEvent::Transport(Some(TransportEvent::Closed(CloseKind::Abnormal(reason)))) => {
                tracing::warn!(reason = %reason, "Connection dropped");
                self.on_failure(Error::WebSocket(reason));
            }
            PhaseEvent::Transport(None) => {
                tracing::warn!("Transport went away");
                self.on_failure(Error::ConnectionClosed);
            }
            PhaseEvent::Heartbeat(HeartbeatEvent::Tick) => {
                if let Phase::Connected(session) = &mut self.phase {
                    if let Some(ping) = session.heartbeat.on_tick() {
                        if session.link.send(ping).is_err() {
                            tracing::debug!("Heartbeat not sent, transport closed");
                        }
                    }
                }
            }
            PhaseEvent::Heartbeat(HeartbeatEvent::TimedOut) => self.on_heartbeat_timeout(),
            PhaseEvent::RetryDue => {
                let attempt = self.retry.attempt_count();
                tracing::info!(attempt, "Retrying connection");
                self.start_attempt(ConnectionState::Reconnecting { attempt });
            }
        }
    }

    fn open(&mut self) {
        if matches!(self.phase, Phase::Idle) {
            tracing::info!(address = %self.endpoint.address(), "Opening connection");
            self.start_attempt(ConnectionState::Connecting);
        } else {
            tracing::debug!("Already opened, ignoring open");
        }
    }

    fn start_attempt(&mut self, state: ConnectionState) {
        let attempt = self.retry.attempt_count();
        if let Some(metrics) = &self.metrics {
            metrics.record_connect_attempt(attempt);
        }

        let transport = Arc::clone(&self.transport);
        let endpoint = self.endpoint.clone();
        self.phase = Phase::Connecting(Box::pin(async move { transport.open(&endpoint).await }));
        self.set_state(state);
    }

    fn on_open(&mut self, link: TransportLink) {
        let replayed = self.subscriptions.replay_all();
        let rooms = replayed.len();
        for frame in replayed {
            if link.send(frame).is_err() {
                tracing::debug!("Transport closed during subscription replay");
                break;
            }
        }

        let heartbeat = HeartbeatMonitor::start(self.heartbeat, self.background);
        self.phase = Phase::Connected(Session { link, heartbeat });
        self.retry.reset();
        record_connected(self.store.as_ref(), &self.namespace);

        if let Some(metrics) = &self.metrics {
            metrics.record_connect_success();
        }
        tracing::info!(rooms, "Connected");

        self.status.send_modify(|status| status.error = None);
        self.set_state(ConnectionState::Connected);
    }

    fn on_frame(&mut self, frame: Frame) {
        if frame.is_pong() {
            let rtt = match &mut self.phase {
                Phase::Connected(session) => session.heartbeat.on_pong(&frame),
                _ => None,
            };
            if let Some(rtt) = rtt {
                self.on_latency(rtt);
            }
            return;
        }

        if is_reserved(&frame.event) {
            tracing::trace!(event = %frame.event, "Ignoring protocol frame");
            return;
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_event(&frame.event);
        }
        self.listeners.dispatch(&frame);
    }

    fn on_latency(&mut self, rtt: Duration) {
        self.latency.push(rtt);
        if let Some(metrics) = &self.metrics {
            metrics.record_rtt(rtt);
        }

        let latency_ms = rtt.as_millis() as u64;
        let quality = classify(rtt);
        tracing::trace!(latency_ms, ?quality, "Heartbeat answered");
        self.status.send_modify(|status| {
            status.latency_ms = latency_ms;
            status.quality = quality;
        });
    }

    fn on_heartbeat_timeout(&mut self) {
        let Phase::Connected(session) = &mut self.phase else {
            return;
        };
        let liveness = session.heartbeat.on_timeout();

        if let Some(metrics) = &self.metrics {
            metrics.record_missed_heartbeat();
        }

        match liveness {
            Liveness::Alive => tracing::debug!("Heartbeat missed"),
            Liveness::Dead { missed } => {
                tracing::warn!(missed, "Heartbeat lost, dropping connection");
                self.on_failure(Error::Timeout);
            }
        }
    }

    fn on_failure(&mut self, error: Error) {
        // Releases the link, heartbeat or attempt of the failed phase
        self.phase = Phase::Idle;

        if let Some(metrics) = &self.metrics {
            metrics.record_error(error_kind(&error));
        }
        self.status
            .send_modify(|status| status.error = Some(error.to_string()));

        if error.is_retryable() {
            self.schedule_retry();
        } else {
            tracing::error!(error = %error, "Unrecoverable connection failure");
            self.phase = Phase::Disconnected(DisconnectReason::Fatal);
            self.set_state(ConnectionState::Disconnected(DisconnectReason::Fatal));
        }
    }

    fn schedule_retry(&mut self) {
        let attempt = self.retry.attempt_count();

        if self.backoff.is_exhausted(attempt) {
            let exhausted = Error::RetriesExhausted { attempts: attempt };
            tracing::error!(attempts = attempt, "Reconnection abandoned");
            if let Some(metrics) = &self.metrics {
                metrics.record_error(error_kind(&exhausted));
            }
            self.status
                .send_modify(|status| status.error = Some(exhausted.to_string()));
            self.phase = Phase::Disconnected(DisconnectReason::RetriesExhausted);
            self.set_state(ConnectionState::Disconnected(DisconnectReason::RetriesExhausted));
            return;
        }

        if self.offline {
            tracing::info!(attempt, "Offline, retry paused until the network returns");
            self.phase = Phase::Reconnecting(None);
            self.set_state(ConnectionState::Reconnecting { attempt });
            return;
        }

        let delay = self.backoff.next_delay(attempt);
        self.retry.record(delay);
        tracing::info!(
            attempt = self.retry.attempt_count(),
            delay_ms = delay.as_millis() as u64,
            "Retry scheduled"
        );
        self.phase = Phase::Reconnecting(Some(Box::pin(tokio::time::sleep(delay))));
        self.set_state(ConnectionState::Reconnecting {
            attempt: self.retry.attempt_count(),
        });
    }

    /// Whether a lifecycle signal may start a fresh attempt
    fn can_revive(&self) -> bool {
        matches!(
            self.phase,
            Phase::Reconnecting(_)
                | Phase::Disconnected(DisconnectReason::RetriesExhausted)
                | Phase::Disconnected(DisconnectReason::RemoteClosed)
        )
    }

    fn reconnect_now(&mut self) {
        self.retry.reset();
        // Drops any link, pending timer or attempt in flight before starting anew
        self.phase = Phase::Idle;
        self.start_attempt(ConnectionState::Connecting);
    }

    fn disconnect(&mut self) {
        if matches!(self.phase, Phase::Disconnected(_)) {
            return;
        }
        tracing::info!("Disconnecting");
        self.retry.reset();
        self.phase = Phase::Disconnected(DisconnectReason::Closed);
        self.set_state(ConnectionState::Disconnected(DisconnectReason::Closed));
    }

    fn emit(&mut self, frame: Frame) -> bool {
        let outcome = match &self.phase {
            Phase::Connected(session) => match session.link.send(frame.clone()) {
                Ok(()) => "sent",
                Err(_) => "transport_closed",
            },
            _ => "not_connected",
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_emit(&frame.event, outcome);
        }
        if outcome == "sent" {
            true
        } else {
            tracing::info!(event = %frame.event, outcome, "Emit dropped");
            false
        }
    }

    fn send_if_connected(&self, frame: Frame) {
        if let Phase::Connected(session) = &self.phase {
            if session.link.send(frame).is_err() {
                tracing::debug!("Frame not sent, transport closed");
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        if let Some(metrics) = &self.metrics {
            metrics.update_connection_state(state);
        }
        let attempt = self.retry.attempt_count();
        self.status.send_modify(|status| {
            status.set_state(state);
            status.attempt = attempt;
        });
    }

    fn dispose(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.detach();
        }
        self.phase = Phase::Disconnected(DisconnectReason::Disposed);
        self.listeners.clear();
        self.subscriptions.clear();
        self.retry.reset();
        tracing::info!("Disposed");
        self.set_state(ConnectionState::Disconnected(DisconnectReason::Disposed));
    }
}
