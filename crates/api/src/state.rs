use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use tvstream_db::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
}

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub static METRICS: Lazy<Metrics> =
    Lazy::new(|| Metrics::new().expect("http metric names and labels are constant"));

/// HTTP request counters in their own Prometheus registry.
pub struct Metrics {
    registry: Registry,
    http_requests: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests handled."),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests.clone()))?;
        Ok(Self {
            registry,
            http_requests,
        })
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16) {
        self.http_requests
            .with_label_values(&[method, path, &status.to_string()])
            .inc();
    }

    /// Renders every registered metric in the Prometheus text format.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}
