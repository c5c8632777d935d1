use std::{env, error::Error};

use opentelemetry::{global, logs::LogError, metrics::MetricsError, trace::TraceError, KeyValue};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{logs, runtime, Resource};
use tracing_core::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Where telemetry goes and under which service name it is reported.
///
/// `SERVICE_NAME` defaults to the cargo package name,
/// `OTEL_EXPORTER_OTLP_ENDPOINT` to `http://localhost:4317`.
struct Exporter {
    service: &'static str,
    endpoint: &'static str,
}

impl Exporter {
    fn from_env() -> Self {
        let service = env::var("SERVICE_NAME").unwrap_or(env!("CARGO_PKG_NAME").to_string());
        let endpoint =
            env::var("OTEL_EXPORTER_OTLP_ENDPOINT").unwrap_or("http://localhost:4317".to_string());
        Self {
            // leaked once at startup, both live for the process lifetime
            service: service.leak(),
            endpoint: endpoint.leak(),
        }
    }

    fn resource(&self) -> Resource {
        Resource::new(vec![KeyValue::new(
            opentelemetry_semantic_conventions::resource::SERVICE_NAME,
            self.service,
        )])
    }
}

/// Sets up tracing, metrics and logging via otlp exporter.
///
/// This should be the first statement of the server binary's main function.
/// Requires a running tokio runtime, the exporters batch on it.
pub fn setup() -> Result<(), Box<dyn Error>> {
    let exporter = Exporter::from_env();

    init_metrics(&exporter)?;
    // needs to run before init_tracer
    init_logs(&exporter)?;
    init_tracer(&exporter)?;

    tracing::info!(service = exporter.service, "telemetry initialized");
    Ok(())
}

fn init_tracer(exporter: &Exporter) -> Result<(), TraceError> {
    global::set_text_map_propagator(opentelemetry_jaeger_propagator::Propagator::new());
    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(exporter.endpoint),
        )
        .with_trace_config(opentelemetry_sdk::trace::config().with_resource(exporter.resource()))
        .install_batch(runtime::Tokio)?;

    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);
    let log_bridge = OpenTelemetryTracingBridge::new(&global::logger_provider());
    Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy()
        }))
        .with(telemetry)
        .with(log_bridge)
        .init();

    Ok(())
}

fn init_metrics(exporter: &Exporter) -> Result<(), MetricsError> {
    let _provider = opentelemetry_otlp::new_pipeline()
        .metrics(runtime::Tokio)
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(exporter.endpoint),
        )
        .with_resource(exporter.resource())
        .build()?;

    Ok(())
}

fn init_logs(exporter: &Exporter) -> Result<(), LogError> {
    opentelemetry_otlp::new_pipeline()
        .logging()
        .with_log_config(logs::Config::default().with_resource(exporter.resource()))
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(exporter.endpoint),
        )
        .install_batch(runtime::Tokio)?;

    Ok(())
}

/// Flushes and shuts down the global providers. Call once, after the server
/// has stopped accepting requests.
pub fn teardown() {
    global::shutdown_logger_provider();
    global::shutdown_tracer_provider();
}
