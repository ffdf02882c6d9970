use crate::error::{Result, SamvadaError};
use opentelemetry::{trace::TracerProvider as _, KeyValue};
use opentelemetry_sdk::Resource;
use std::env;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// flushes pending spans when dropped; hold it for the lifetime of the process
pub struct OtelGuard {
    tracer_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            // flush remaining traces on shutdown
            if let Err(e) = provider.shutdown() {
                eprintln!("error shutting down tracer provider: {}", e);
            }
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug,sqlx=warn".into())
}

/// install the global subscriber; exports spans over otlp when enabled
pub fn init_tracing(service_name: &str) -> Result<OtelGuard> {
    let enabled = env_flag("SAMVADA_ENABLE_TRACING");

    let endpoint = env::var("PHOENIX_COLLECTOR_ENDPOINT")
        .or_else(|_| env::var("OTEL_EXPORTER_OTLP_ENDPOINT"))
        .ok();

    if !enabled || endpoint.is_none() {
        // tracing not enabled, just set up basic logging
        tracing_subscriber::fmt()
            .with_env_filter(default_filter())
            .try_init()
            .map_err(|e| SamvadaError::Tracing(e.to_string()))?;

        tracing::info!("basic logging initialized (service={})", service_name);

        return Ok(OtelGuard {
            tracer_provider: None,
        });
    }

    let endpoint_url = endpoint.unwrap_or_default();

    // initialize otlp exporter with tonic (grpc)
    use opentelemetry_otlp::WithExportConfig;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint_url)
        .build()
        .map_err(|e| SamvadaError::Tracing(format!("exporter build failed: {}", e)))?;

    let resource = Resource::builder_empty()
        .with_attribute(KeyValue::new("service.name", service_name.to_string()))
        .build();

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();

    // bridge tracing to opentelemetry
    let telemetry =
        tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.to_string()));

    // combine telemetry layer with fmt layer for console output
    tracing_subscriber::registry()
        .with(telemetry)
        .with(tracing_subscriber::fmt::layer())
        .with(default_filter())
        .try_init()
        .map_err(|e| SamvadaError::Tracing(e.to_string()))?;

    tracing::info!(
        "opentelemetry tracing initialized for {} (endpoint: {})",
        service_name,
        endpoint_url
    );

    Ok(OtelGuard {
        tracer_provider: Some(provider),
    })
}
