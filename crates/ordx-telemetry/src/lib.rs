//! Metrics and logging for the order execution core.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;

/// Render all registered metrics in the Prometheus text format.
pub fn gather() -> TelemetryResult<String> {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let families = prometheus::gather();
    let mut buf = Vec::new();
    encoder.encode(&families, &mut buf)?;
    String::from_utf8(buf).map_err(|e| TelemetryError::Logging(e.to_string()))
}
