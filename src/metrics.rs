use std::time::Duration;

use prometheus::{exponential_buckets, Encoder, HistogramOpts, HistogramVec, Registry, TextEncoder};

/// Prometheus collectors for the service, registered on a private registry so
/// several instances can live in one process.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    http_duration_histogram: HistogramVec,
    db_duration_histogram: HistogramVec,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("registry", &"<Registry>")
            .finish()
    }
}

impl Metrics {
    pub fn new(namespace: &str) -> prometheus::Result<Self> {
        let namespace = namespace.replace('-', "_");

        let http_duration_histogram = HistogramVec::new(
            HistogramOpts::new("http_server_duration", "HTTP request duration")
                .namespace(namespace.clone())
                .buckets(exponential_buckets(0.005, 2.0, 10)?),
            &["method", "route", "status"],
        )?;

        let db_duration_histogram = HistogramVec::new(
            HistogramOpts::new("db_query_duration", "Database operation duration")
                .namespace(namespace)
                .buckets(exponential_buckets(0.001, 2.0, 10)?),
            &["operation"],
        )?;

        let registry = Registry::new();
        registry.register(Box::new(http_duration_histogram.clone()))?;
        registry.register(Box::new(db_duration_histogram.clone()))?;

        Ok(Self {
            registry,
            http_duration_histogram,
            db_duration_histogram,
        })
    }

    pub fn observe_http(&self, method: &str, route: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        self.http_duration_histogram
            .with_label_values(&[method, route, status.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    pub fn observe_db(&self, operation: &str, elapsed: Duration) {
        self.db_duration_histogram
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());
    }

    /// Text exposition format plus its content type.
    pub fn render(&self) -> (String, String) {
        let encoder = TextEncoder::new();
        let encoded = encoder
            .encode_to_string(&self.registry.gather())
            .unwrap_or_default();
        (encoder.format_type().to_string(), encoded)
    }
}
