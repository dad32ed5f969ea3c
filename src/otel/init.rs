//! Subscriber setup for the CLI.

use crate::types::{AskError, Result};
use opentelemetry::{trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{trace::SdkTracerProvider, Resource};
use std::env;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log line format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Read `ASKDB_LOG_FORMAT` (`json` or anything else for text).
    pub fn from_env() -> Self {
        match env::var("ASKDB_LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Flushes exported spans when dropped.
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// `true` if spans are being exported over OTLP.
    pub fn exporting(&self) -> bool {
        self.tracer_provider.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            // flush remaining spans on shutdown
            if let Err(e) = provider.shutdown() {
                eprintln!("error shutting down tracer provider: {}", e);
            }
        }
    }
}

fn tracing_enabled() -> bool {
    env::var("ASKDB_ENABLE_TRACING")
        .map(|v| {
            let v = v.to_lowercase();
            v == "1" || v == "true" || v == "yes"
        })
        .unwrap_or(false)
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the default `info` filter. OTLP export is added
/// only when `ASKDB_ENABLE_TRACING` is truthy and
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
///
/// # Errors
///
/// Returns `AskError::InternalError` if the exporter cannot be built or a
/// global subscriber is already installed
pub fn init_telemetry(service_name: &str, format: LogFormat) -> Result<TelemetryGuard> {
    let endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .ok()
        .filter(|_| tracing_enabled());

    let tracer_provider = match &endpoint {
        Some(endpoint) => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()
                .map_err(|e| AskError::InternalError(format!("exporter build failed: {}", e)))?;

            let resource = Resource::builder_empty()
                .with_attribute(KeyValue::new("service.name", service_name.to_string()))
                .build();

            Some(
                SdkTracerProvider::builder()
                    .with_batch_exporter(exporter)
                    .with_resource(resource)
                    .build(),
            )
        }
        None => None,
    };

    // bridge tracing to opentelemetry
    let telemetry = tracer_provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.to_string()))
    });

    let text_layer = (format == LogFormat::Text).then(|| fmt::layer().with_writer(std::io::stderr));
    let json_layer =
        (format == LogFormat::Json).then(|| fmt::layer().json().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(telemetry)
        .with(text_layer)
        .with(json_layer)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .try_init()
        .map_err(|e| AskError::InternalError(format!("subscriber init failed: {}", e)))?;

    match &endpoint {
        Some(endpoint) => tracing::info!(
            "opentelemetry tracing initialized for {} (endpoint: {})",
            service_name,
            endpoint
        ),
        None => tracing::debug!("basic logging initialized (service={})", service_name),
    }

    Ok(TelemetryGuard { tracer_provider })
}
