//! Tracing setup shared by `fhevm-api` and `fhevm-gateway`.
//!
//! Console output is always on. Spans are additionally exported over OTLP/HTTP
//! when `OTEL_ENABLED` is truthy or `OTEL_EXPORTER_OTLP_ENDPOINT` is set.

use std::env;

use once_cell::sync::OnceCell;
use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "fhevm_sdk=info,fhevm_api=info,fhevm_gateway=info,tower_http=debug";

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Export settings resolved from the standard `OTEL_*` variables.
struct ExportConfig {
    endpoint: Option<String>,
    service_name: String,
    service_version: String,
    environment: String,
}

impl ExportConfig {
    /// `None` when export is disabled.
    fn from_env(service: &str) -> Option<Self> {
        let endpoint = env_value("OTEL_EXPORTER_OTLP_ENDPOINT");
        let forced = env_value("OTEL_ENABLED")
            .is_some_and(|value| matches!(value.to_lowercase().as_str(), "true" | "1" | "yes"));
        if !forced && endpoint.is_none() {
            return None;
        }

        Some(Self {
            endpoint,
            service_name: env_value("OTEL_SERVICE_NAME").unwrap_or_else(|| service.to_string()),
            service_version: env_value("APP_VERSION")
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            environment: env_value("APP_ENV")
                .or_else(|| env_value("RUST_ENV"))
                .unwrap_or_else(|| "development".to_string()),
        })
    }

    fn build_provider(self) -> Result<SdkTracerProvider, String> {
        let mut exporter = opentelemetry_otlp::SpanExporter::builder().with_http();
        if let Some(endpoint) = self.endpoint {
            exporter = exporter.with_endpoint(endpoint);
        }
        let exporter = exporter.build().map_err(|err| err.to_string())?;

        let resource = Resource::builder()
            .with_attribute(KeyValue::new(SERVICE_NAME, self.service_name))
            .with_attribute(KeyValue::new(SERVICE_VERSION, self.service_version))
            .with_attribute(KeyValue::new(
                "deployment.environment.name",
                self.environment,
            ))
            .build();

        Ok(SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build())
    }
}

/// Install the global subscriber for `service` (`fhevm-api`, `fhevm-gateway`).
pub fn init_tracing(service: &'static str) {
    let mut export_error = None;
    let provider = ExportConfig::from_env(service).and_then(|config| {
        config
            .build_provider()
            .map_err(|err| export_error = Some(err))
            .ok()
    });

    let otel_layer = provider.map(|provider| {
        global::set_text_map_propagator(TraceContextPropagator::new());
        global::set_tracer_provider(provider.clone());
        let layer = OpenTelemetryLayer::new(provider.tracer(service));
        let _ = TRACER_PROVIDER.set(provider);
        layer
    });

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .init();

    if let Some(err) = export_error {
        tracing::warn!("OTLP exporter unavailable, spans stay local: {err}");
    }
}

/// Flush pending spans before exit.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(err) = provider.shutdown() {
            tracing::warn!("Failed to shutdown tracer provider: {err}");
        }
    }
}
