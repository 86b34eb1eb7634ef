//! OpenTelemetry observability configuration and initialization
//!
//! Connection managers log through `tracing`. This module installs the
//! subscriber that turns those events into local JSON logs and, when enabled,
//! exports spans and metrics to an OTLP collector.
//!
//! Initialize at application startup, before building managers. Repeated
//! calls are no-ops, so each builder may also pass a config:
//!
//! ```rust,no_run
//! use roomlink_core::ObservabilityConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ObservabilityConfig::new("dashboard")
//!         .with_endpoint("http://localhost:4317")
//!         .with_log_level("debug");
//!
//!     roomlink_core::init_observability(config).expect("Failed to init observability");
//!
//!     // ... run the application ...
//!
//!     roomlink_core::shutdown_observability();
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: Collector endpoint
//! - `RUST_LOG`: Log level filter (e.g., "info", "roomlink_client=debug")

use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Observability configuration for OpenTelemetry
///
/// # Defaults
///
/// - Service name: "roomlink"
/// - Service version: Current crate version
/// - OTLP endpoint: `OTEL_EXPORTER_OTLP_ENDPOINT`, or "http://localhost:4317"
/// - Traces and metrics export enabled, local JSON logs enabled
/// - Log level: `RUST_LOG`, or "info"
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Service name attached to every span and metric
    pub service_name: String,

    /// Service version attached to every span and metric
    pub service_version: String,

    /// gRPC endpoint of the OTLP collector
    pub otlp_endpoint: String,

    /// Export spans to the collector
    pub enable_traces: bool,

    /// Export metrics to the collector
    pub enable_metrics: bool,

    /// Write structured JSON logs to stdout
    pub enable_logs: bool,

    /// Log level filter, used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "roomlink".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
            enable_traces: true,
            enable_metrics: true,
            enable_logs: true,
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl ObservabilityConfig {
    /// Create a new configuration with a custom service name
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the OTLP collector endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = endpoint.into();
        self
    }

    /// Set the log level filter ("error", "warn", "info", "debug", "trace")
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the service version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    /// Enable or disable span export
    pub fn with_traces(mut self, enable: bool) -> Self {
        self.enable_traces = enable;
        self
    }

    /// Enable or disable metrics export
    pub fn with_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    /// Enable or disable local JSON logs
    pub fn with_logs(mut self, enable: bool) -> Self {
        self.enable_logs = enable;
        self
    }

    fn resource(&self) -> opentelemetry_sdk::Resource {
        opentelemetry_sdk::Resource::builder_empty()
            .with_attributes(vec![
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                    self.service_name.clone(),
                ),
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                    self.service_version.clone(),
                ),
            ])
            .build()
    }
}

static INITIALIZED: Mutex<bool> = Mutex::new(false);

/// Initialize OpenTelemetry and the tracing subscriber
///
/// Installs process-wide state, so only the first successful call does any
/// work. Later calls, and calls made after the host installed its own
/// subscriber, return `Ok` and leave the global providers untouched. Every
/// manager in the process can therefore pass an observability config.
///
/// # Errors
///
/// - the OTLP exporters cannot be built (bad endpoint)
/// - the log filter does not parse
pub fn init_observability(
    config: ObservabilityConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut initialized = INITIALIZED.lock().unwrap_or_else(|e| e.into_inner());
    if *initialized {
        tracing::debug!(service_name = %config.service_name, "Observability already initialized");
        return Ok(());
    }
    if tracing::dispatcher::has_been_set() {
        tracing::debug!(
            service_name = %config.service_name,
            "Host installed a subscriber, skipping observability setup"
        );
        *initialized = true;
        return Ok(());
    }

    // The tracer must exist before the subscriber so the telemetry layer can use it
    let tracer = if config.enable_traces {
        Some(init_tracer(&config)?)
    } else {
        None
    };

    if config.enable_metrics {
        init_metrics(&config)?;
    }

    init_tracing_subscriber(&config, tracer)?;
    *initialized = true;

    tracing::info!(
        service_name = %config.service_name,
        otlp_endpoint = %config.otlp_endpoint,
        traces = config.enable_traces,
        metrics = config.enable_metrics,
        logs = config.enable_logs,
        "OpenTelemetry initialized"
    );

    Ok(())
}

fn init_tracer(
    config: &ObservabilityConfig,
) -> Result<opentelemetry_sdk::trace::Tracer, Box<dyn std::error::Error + Send + Sync>> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler};

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()?;

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(config.resource())
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .build();

    let tracer = provider.tracer(config.service_name.clone());
    global::set_tracer_provider(provider);

    Ok(tracer)
}

fn init_metrics(
    config: &ObservabilityConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()?;

    // Heartbeat RTTs and reconnect counters are low volume; 30s is plenty
    let reader = opentelemetry_sdk::metrics::PeriodicReader::builder(exporter)
        .with_interval(Duration::from_secs(30))
        .build();

    let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(config.resource())
        .build();

    global::set_meter_provider(provider);
    Ok(())
}

fn init_tracing_subscriber(
    config: &ObservabilityConfig,
    tracer: Option<opentelemetry_sdk::trace::Tracer>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let telemetry_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let fmt_layer = config.enable_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .json()
            .boxed()
    });

    tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Flush and shut down OpenTelemetry providers
///
/// Providers flush on drop in OpenTelemetry 0.30, so this mostly marks the
/// shutdown in the logs. Safe to call more than once.
pub fn shutdown_observability() {
    tracing::info!("Shutting down OpenTelemetry");
}
