//! Connection manager metrics
//!
//! OpenTelemetry instruments describing connection health. They are exported
//! through whatever meter provider `roomlink_core::init_observability`
//! installed; without one the global no-op provider swallows them.
//!
//! # Metrics Collected
//!
//! - **connection.state**: current state code (gauge, see below)
//! - **connect.attempts**: transport opens started (counter)
//! - **connect.success**: transport opens that completed (counter)
//! - **errors**: failures by kind (counter)
//! - **heartbeat.missed**: unanswered heartbeats (counter)
//! - **heartbeat.rtt**: heartbeat round-trip time in milliseconds (histogram)
//! - **emits**: outbound application frames by outcome (counter)
//! - **events.received**: inbound application frames by event (counter)
//!
//! State codes: 0 idle, 1 connecting, 2 connected, 3 reconnecting,
//! 4 retries exhausted, 5 disconnected.

use crate::connection_state::ConnectionState;
use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Histogram, Meter},
    KeyValue,
};
use std::time::Duration;

/// Instruments recorded by the manager
pub struct ClientMetrics {
    pub connection_state: Gauge<i64>,
    pub connect_attempts: Counter<u64>,
    pub connect_success: Counter<u64>,
    pub errors_total: Counter<u64>,
    pub missed_heartbeats: Counter<u64>,
    /// Heartbeat round trip in milliseconds
    pub heartbeat_rtt: Histogram<f64>,
    pub emits_total: Counter<u64>,
    pub events_received: Counter<u64>,
}

impl ClientMetrics {
    /// Instruments on the global meter named after the service
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Instruments on a caller-provided meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            connection_state: meter
                .i64_gauge("roomlink.client.connection.state")
                .with_description(
                    "Connection state (0=idle, 1=connecting, 2=connected, 3=reconnecting, 4=exhausted, 5=disconnected)",
                )
                .build(),
            connect_attempts: meter
                .u64_counter("roomlink.client.connect.attempts")
                .with_description("Transport opens started")
                .build(),
            connect_success: meter
                .u64_counter("roomlink.client.connect.success")
                .with_description("Transport opens that completed")
                .build(),
            errors_total: meter
                .u64_counter("roomlink.client.errors.total")
                .with_description("Failures by kind")
                .build(),
            missed_heartbeats: meter
                .u64_counter("roomlink.client.heartbeat.missed")
                .with_description("Heartbeats that went unanswered")
                .build(),
            heartbeat_rtt: meter
                .f64_histogram("roomlink.client.heartbeat.rtt")
                .with_description("Heartbeat round-trip time in milliseconds")
                .with_unit("ms")
                .build(),
            emits_total: meter
                .u64_counter("roomlink.client.emits.total")
                .with_description("Outbound application frames by outcome")
                .build(),
            events_received: meter
                .u64_counter("roomlink.client.events.received")
                .with_description("Inbound application frames by event")
                .build(),
        }
    }

    pub fn update_connection_state(&self, state: ConnectionState) {
        self.connection_state.record(state.metric_code(), &[]);
    }

    pub fn record_connect_attempt(&self, attempt: u32) {
        let retry = if attempt == 0 { "initial" } else { "retry" };
        self.connect_attempts
            .add(1, &[KeyValue::new("kind", retry)]);
    }

    pub fn record_connect_success(&self) {
        self.connect_success.add(1, &[]);
    }

    /// Record a failure of the given kind (`timeout`, `handshake`, ...)
    pub fn record_error(&self, error_type: &str) {
        let attributes = &[KeyValue::new("error_type", error_type.to_string())];
        self.errors_total.add(1, attributes);
    }

    pub fn record_missed_heartbeat(&self) {
        self.missed_heartbeats.add(1, &[]);
    }

    pub fn record_rtt(&self, rtt: Duration) {
        self.heartbeat_rtt.record(rtt.as_secs_f64() * 1000.0, &[]);
    }

    /// Record an emit; `outcome` is `sent` or the reason it was dropped
    pub fn record_emit(&self, event: &str, outcome: &str) {
        let attributes = &[
            KeyValue::new("event", event.to_string()),
            KeyValue::new("outcome", outcome.to_string()),
        ];
        self.emits_total.add(1, attributes);
    }

    pub fn record_event(&self, event: &str) {
        let attributes = &[KeyValue::new("event", event.to_string())];
        self.events_received.add(1, attributes);
    }
}

impl std::fmt::Debug for ClientMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection_state::DisconnectReason;

    #[test]
    fn test_metrics_creation() {
        let metrics = ClientMetrics::new("test-roomlink");

        metrics.update_connection_state(ConnectionState::Connected);
        metrics.record_connect_attempt(0);
        metrics.record_connect_success();
        metrics.record_error("timeout");
        metrics.record_missed_heartbeat();
        metrics.record_rtt(Duration::from_millis(42));
        metrics.record_emit("dns-check", "sent");
        metrics.record_event("dns-status");
    }

    #[test]
    fn test_every_state_recordable() {
        let metrics = ClientMetrics::new("test-roomlink-state");

        for state in [
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Reconnecting { attempt: 3 },
            ConnectionState::Disconnected(DisconnectReason::RetriesExhausted),
            ConnectionState::Disconnected(DisconnectReason::Closed),
        ] {
            metrics.update_connection_state(state);
        }
    }

    #[test]
    fn test_custom_meter() {
        let meter = global::meter("test-roomlink-meter");
        let metrics = ClientMetrics::new_with_meter(&meter);

        metrics.record_connect_attempt(4);
        metrics.record_emit("dns-check", "not_connected");
    }
}
