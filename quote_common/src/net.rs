//! Shared networking constants for the exporter's HTTP surface.

/// Default TCP port for the HTTP listener.
pub const DEFAULT_PORT: u16 = 9340;
/// Route serving per-request quote metrics.
pub const PRICE_PATH: &str = "/price";
/// Route serving the exporter's own accounting series.
pub const METRICS_PATH: &str = "/metrics";
/// Query parameter carrying the symbol list.
pub const SYMBOLS_PARAM: &str = "symbols";

/// Helper to format a host with a port like "host:port".
pub fn addr(host: &str, port: u16) -> String {
    format!("{}:{}", host, port)
}
