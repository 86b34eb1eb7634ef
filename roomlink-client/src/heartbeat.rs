//! Liveness probing for an established connection
//!
//! A TCP connection can stay technically open while the peer is gone. The
//! heartbeat monitor sends a `ping` frame carrying a millisecond timestamp
//! every interval; the server echoes it back as `pong`, which yields both a
//! liveness signal and a round-trip sample.
//!
//! # Probe Rules
//!
//! - At most one probe is outstanding. A tick that finds one outstanding
//!   sends nothing and lets the pending deadline decide.
//! - Each probe has its own deadline (`timeout`). When it fires the missed
//!   counter goes up; reaching `max_missed` declares the connection dead.
//! - A pong echoing the outstanding probe's timestamp resets the missed
//!   counter and yields a round trip. Any other pong is ignored.
//! - Backgrounding widens the tick period without touching the missed
//!   counter; foregrounding restores the nominal period.
//!
//! The monitor owns its interval and deadline. It lives inside the
//! manager's connected state, so dropping it on disconnect, reconnect or
//! dispose cancels both timers with it.

use roomlink_core::Frame;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior, Sleep};

/// Timing parameters for the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Probe period while foregrounded
    pub interval: Duration,
    /// Probe period while the host is backgrounded
    pub background_interval: Duration,
    /// How long a probe may wait for its pong
    pub timeout: Duration,
    /// Consecutive unanswered probes that declare the connection dead
    pub max_missed: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(25_000),
            background_interval: Duration::from_millis(300_000),
            timeout: Duration::from_millis(10_000),
            max_missed: 2,
        }
    }
}

/// Timer that woke the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatEvent {
    /// The probe interval elapsed
    Tick,
    /// The outstanding probe's deadline passed without a pong
    TimedOut,
}

/// Verdict after a missed probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    Dead { missed: u32 },
}

struct Probe {
    sent_at_ms: u64,
    deadline: Pin<Box<Sleep>>,
}

/// Per-connection heartbeat state machine
pub struct HeartbeatMonitor {
    config: HeartbeatConfig,
    epoch: Instant,
    background: bool,
    ticker: Interval,
    probe: Option<Probe>,
    last_ping_sent_at: Option<Instant>,
    missed_count: u32,
}

impl HeartbeatMonitor {
    /// Start monitoring; the first probe goes out one period from now
    pub fn start(config: HeartbeatConfig, background: bool) -> Self {
        let period = Self::period_for(&config, background);
        Self {
            config,
            epoch: Instant::now(),
            background,
            ticker: Self::ticker(period),
            probe: None,
            last_ping_sent_at: None,
            missed_count: 0,
        }
    }

    fn period_for(config: &HeartbeatConfig, background: bool) -> Duration {
        if background {
            config.background_interval
        } else {
            config.interval
        }
    }

    fn ticker(period: Duration) -> Interval {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Wait for the next tick or probe deadline
    ///
    /// Cancel safe; the manager polls it inside `select!`.
    pub async fn next_event(&mut self) -> HeartbeatEvent {
        let ticker = &mut self.ticker;
        let probe = &mut self.probe;
        let deadline = async move {
            match probe {
                Some(probe) => probe.deadline.as_mut().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = ticker.tick() => HeartbeatEvent::Tick,
            _ = deadline => HeartbeatEvent::TimedOut,
        }
    }

    /// Handle a tick; returns the probe to send, if any
    pub fn on_tick(&mut self) -> Option<Frame> {
        if self.probe.is_some() {
            tracing::trace!("Probe still outstanding, skipping tick");
            return None;
        }

        let sent_at_ms = self.now_ms();
        self.last_ping_sent_at = Some(Instant::now());
        self.probe = Some(Probe {
            sent_at_ms,
            deadline: Box::pin(time::sleep(self.config.timeout)),
        });

        Some(Frame::ping(sent_at_ms))
    }

    /// Handle a pong; returns the round trip if it answers the outstanding probe
    pub fn on_pong(&mut self, frame: &Frame) -> Option<Duration> {
        let Some(ts) = frame.pong_timestamp() else {
            tracing::debug!(frame = %frame, "Ignoring pong without timestamp");
            return None;
        };

        if !self.probe.as_ref().is_some_and(|probe| probe.sent_at_ms == ts) {
            tracing::debug!(ts, "Ignoring pong for no outstanding probe");
            return None;
        }
        self.probe = None;
        self.missed_count = 0;

        Some(Duration::from_millis(self.now_ms().saturating_sub(ts)))
    }

    /// Handle an expired probe deadline
    pub fn on_timeout(&mut self) -> Liveness {
        self.probe = None;
        self.missed_count += 1;

        if self.missed_count >= self.config.max_missed {
            Liveness::Dead {
                missed: self.missed_count,
            }
        } else {
            Liveness::Alive
        }
    }

    /// Switch between the nominal and the background probe period
    ///
    /// The missed counter and any outstanding probe are kept.
    pub fn set_background(&mut self, background: bool) {
        if self.background == background {
            return;
        }
        self.background = background;
        let period = Self::period_for(&self.config, background);
        self.ticker = Self::ticker(period);
        tracing::debug!(period_ms = period.as_millis() as u64, background, "Heartbeat period changed");
    }

    /// Current probe period
    pub fn period(&self) -> Duration {
        self.ticker.period()
    }

    /// Consecutive probes without a pong
    pub fn missed_count(&self) -> u32 {
        self.missed_count
    }

    /// When the latest probe was sent
    pub fn last_ping_sent_at(&self) -> Option<Instant> {
        self.last_ping_sent_at
    }

    /// Whether a probe is waiting for its pong
    pub fn is_probe_outstanding(&self) -> bool {
        self.probe.is_some()
    }
}

impl std::fmt::Debug for HeartbeatMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatMonitor")
            .field("period", &self.ticker.period())
            .field("background", &self.background)
            .field("probe_outstanding", &self.probe.is_some())
            .field("missed_count", &self.missed_count)
            .finish()
    }
}
