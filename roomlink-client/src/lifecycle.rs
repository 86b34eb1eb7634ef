//! Host lifecycle signals
//!
//! Browsers, mobile shells and desktop apps all tell their embedded code
//! when the app goes to the background, when the network comes and goes,
//! and when a frozen page is resumed. The manager reacts to those signals
//! without knowing which host produced them:
//!
//! | signal         | manager response                                          |
//! |----------------|-----------------------------------------------------------|
//! | `Foregrounded` | reconnect now if not connected, else nominal heartbeat    |
//! | `Backgrounded` | widen the heartbeat period, keep the connection           |
//! | `Online`       | reconnect now if not connected                            |
//! | `Offline`      | cancel the pending retry timer                            |
//! | `Restored`     | reconnect now if the held transport has died              |
//!
//! A host implements `LifecyclePort` (or pushes into a `ChannelLifecycle`)
//! and hands it to the builder. The `LifecycleObserver` forwards signals to
//! the manager fire-and-forget and is detached when the manager goes away.

use futures::stream::{BoxStream, StreamExt};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Environment change reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleSignal {
    /// The app or tab became visible
    Foregrounded,
    /// The app or tab was hidden
    Backgrounded,
    /// The network became reachable
    Online,
    /// The network went away
    Offline,
    /// The page or process was resumed from a frozen cache
    Restored,
}

/// Source of host lifecycle signals
pub trait LifecyclePort: Send + Sync + 'static {
    /// A fresh stream of signals; ends when the host stops reporting
    fn signals(&self) -> BoxStream<'static, LifecycleSignal>;
}

/// Broadcast-backed port the host shell pushes signals into
///
/// Cloning shares the same channel, so a host can keep one clone to call
/// `notify` and give another to the builder.
#[derive(Debug, Clone)]
pub struct ChannelLifecycle {
    tx: broadcast::Sender<LifecycleSignal>,
}

impl ChannelLifecycle {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(32);
        Self { tx }
    }

    /// Report a signal; returns how many observers received it
    pub fn notify(&self, signal: LifecycleSignal) -> usize {
        self.tx.send(signal).unwrap_or(0)
    }

    /// Number of attached observers
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChannelLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecyclePort for ChannelLifecycle {
    fn signals(&self) -> BoxStream<'static, LifecycleSignal> {
        let rx = self.tx.subscribe();
        futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(signal) => return Some((signal, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Lifecycle observer lagged, signals dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}

/// Forwards host signals to a manager
///
/// Holds no connection state. Dropping or detaching it stops forwarding.
#[derive(Debug)]
pub struct LifecycleObserver {
    task: JoinHandle<()>,
}

impl LifecycleObserver {
    /// Start forwarding `port`'s signals into `sink`
    ///
    /// `sink` returns `false` once its receiver is gone, which ends the
    /// observer on its own.
    pub fn attach<P, F>(port: &P, sink: F) -> Self
    where
        P: LifecyclePort + ?Sized,
        F: Fn(LifecycleSignal) -> bool + Send + 'static,
    {
        let mut signals = port.signals();
        let task = tokio::spawn(async move {
            while let Some(signal) = signals.next().await {
                tracing::debug!(?signal, "Lifecycle signal");
                if !sink(signal) {
                    break;
                }
            }
        });
        Self { task }
    }

    /// Stop forwarding signals
    pub fn detach(&self) {
        self.task.abort();
    }

    /// Whether the forwarding task has ended
    pub fn is_detached(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for LifecycleObserver {
    fn drop(&mut self) {
        self.task.abort();
    }
}
