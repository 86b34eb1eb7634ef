//! Builder for configuring a connection manager
//!
//! The `ManagerBuilder` provides a fluent API over `ManagerConfig` plus the
//! collaborators a host may swap in:
//! - the transport (WebSocket by default)
//! - a lifecycle port for visibility and network signals
//! - a key/value store for the last-connected timestamp
//! - observability (OpenTelemetry)
//!
//! # Examples
//!
//! ```rust,no_run
//! use roomlink_client::{ChannelLifecycle, ManagerBuilder};
//!
//! # async fn example() -> roomlink_core::Result<()> {
//! let host = ChannelLifecycle::new();
//!
//! let manager = ManagerBuilder::new("ws://localhost:3001")
//!     .namespace("/dns")
//!     .max_attempts(5)
//!     .jitter(false)
//!     .with_lifecycle(host.clone())
//!     .with_default_observability()
//!     .service_name("dashboard")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::config::ManagerConfig;
use crate::lifecycle::LifecyclePort;
use crate::manager::{ConnectionManager, ManagerParts};
use crate::metrics::ClientMetrics;
use crate::store::{KeyValueStore, MemoryStore};
use crate::transport::{Transport, WsTransport};
use roomlink_core::{Error, ObservabilityConfig, Result};
use std::sync::Arc;

/// Builder for configuring and creating a `ConnectionManager`
pub struct ManagerBuilder {
    config: ManagerConfig,
    transport: Option<Arc<dyn Transport>>,
    lifecycle: Option<Arc<dyn LifecyclePort>>,
    store: Option<Arc<dyn KeyValueStore>>,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
}

impl ManagerBuilder {
    /// Start from the defaults for `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self::from_config(ManagerConfig::new(url))
    }

    /// Start from an existing configuration
    pub fn from_config(config: ManagerConfig) -> Self {
        Self {
            config,
            transport: None,
            lifecycle: None,
            store: None,
            observability_config: None,
            service_name: None,
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    pub fn transports<I, S>(mut self, transports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.transports = transports.into_iter().map(Into::into).collect();
        self
    }

    /// Connect as soon as the manager is built (default `true`)
    pub fn auto_connect(mut self, enabled: bool) -> Self {
        self.config.auto_connect = enabled;
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    pub fn initial_delay_ms(mut self, ms: u64) -> Self {
        self.config.initial_delay_ms = ms;
        self
    }

    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.config.max_delay_ms = ms;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.config.multiplier = multiplier;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn jitter(mut self, enabled: bool) -> Self {
        self.config.jitter = enabled;
        self
    }

    pub fn heartbeat_interval_ms(mut self, ms: u64) -> Self {
        self.config.heartbeat_interval_ms = ms;
        self
    }

    pub fn heartbeat_timeout_ms(mut self, ms: u64) -> Self {
        self.config.heartbeat_timeout_ms = ms;
        self
    }

    pub fn max_missed_heartbeats(mut self, missed: u32) -> Self {
        self.config.max_missed_heartbeats = missed;
        self
    }

    pub fn background_heartbeat_interval_ms(mut self, ms: u64) -> Self {
        self.config.background_heartbeat_interval_ms = ms;
        self
    }

    pub fn latency_history(mut self, samples: usize) -> Self {
        self.config.latency_history = samples;
        self
    }

    /// Bearer token sent with the handshake
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.config.auth_token = Some(token.into());
        self
    }

    /// Restrict listeners to this closed set of event names
    pub fn events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.events = events.into_iter().map(Into::into).collect();
        self
    }

    /// Use a custom transport instead of WebSocket
    pub fn with_transport<T: Transport>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// React to host lifecycle signals from `port`
    pub fn with_lifecycle<P: LifecyclePort>(mut self, port: P) -> Self {
        self.lifecycle = Some(Arc::new(port));
        self
    }

    /// Persist diagnostics in `store` instead of memory
    pub fn with_store<S: KeyValueStore>(mut self, store: S) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Enable OpenTelemetry observability with custom configuration
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable OpenTelemetry observability with default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Set service name for observability (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// The configuration as built so far
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Validate the configuration and start the manager
    ///
    /// Must be called inside a Tokio runtime. Configuration problems are the
    /// only errors; connection failures surface through the manager's status.
    pub fn build(self) -> Result<ConnectionManager> {
        self.config.validate()?;

        let metrics = if let Some(mut config) = self.observability_config {
            if let Some(name) = self.service_name {
                config.service_name = name;
            }

            roomlink_core::init_observability(config.clone()).map_err(|e| {
                Error::InvalidConfig(format!("Failed to initialize observability: {}", e))
            })?;

            Some(Arc::new(ClientMetrics::new(config.service_name)))
        } else {
            None
        };

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(WsTransport::new()));
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));

        tracing::debug!(
            url = %self.config.url,
            namespace = %self.config.namespace,
            auto_connect = self.config.auto_connect,
            "Starting connection manager"
        );

        Ok(ConnectionManager::spawn(ManagerParts {
            config: self.config,
            transport,
            lifecycle: self.lifecycle,
            store,
            metrics,
        }))
    }
}
