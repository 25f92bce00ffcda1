//! Command-line arguments for the quotes exporter.
//!
//! This module defines the CLI interface using `clap`. `ExporterConfig::from_args` turns
//! the parsed values into the immutable configuration used by the rest of the binary.
use std::time::Duration;

use clap::Parser;
use quote_common::SymbolFormat;
use quote_common::net::DEFAULT_PORT;

use crate::source::Provider;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about = "Prometheus exporter for stock and mutual fund quotes", long_about = None)]
pub struct Args {
    /// Port to listen for HTTP requests.
    #[clap(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Upstream quote provider.
    #[clap(long, value_enum, default_value_t = Provider::Yahoo)]
    pub provider: Provider,

    /// Format of the `symbols` query parameter: `flat` (AAPL,MSFT) or
    /// `typed` (stock:AAPL,MSFT / fund:VTIAX).
    #[clap(long, value_enum, default_value_t = SymbolFormat::Flat)]
    pub symbols_format: SymbolFormat,

    /// Also export the traded volume of each symbol.
    #[clap(long)]
    pub volume: bool,

    /// How long a quote is served from cache before the upstream is asked again
    /// (e.g. `90s`, `10m`, `3h`).
    #[clap(long, default_value = "10m", value_parser = parse_duration)]
    pub cache_fresh: Duration,

    /// How long a cached quote is kept at all; must not be shorter than `--cache-fresh`.
    #[clap(long, default_value = "20m", value_parser = parse_duration)]
    pub cache_retention: Duration,

    /// How often expired cache entries are swept.
    #[clap(long, default_value = "60s", value_parser = parse_duration)]
    pub cache_sweep_interval: Duration,

    /// Timeout of a single upstream request.
    #[clap(long, default_value = "10s", value_parser = parse_duration)]
    pub upstream_timeout: Duration,

    /// Token for worldtradingdata.com.
    #[clap(long)]
    pub wtd_token: Option<String>,

    /// Read the worldtradingdata.com token from stdin (overrides `--wtd-token`).
    #[clap(long)]
    pub read_wtd_token_from_stdin: bool,
}

/// Parse `<n>` (seconds) or `<n>s`, `<n>m`, `<n>h`.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(i) => raw.split_at(i),
        None => (raw, "s"),
    };
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration: {:?}", raw))?;
    let seconds = match unit {
        "s" => value,
        "m" => value.saturating_mul(60),
        "h" => value.saturating_mul(3600),
        _ => return Err(format!("unknown duration unit in {:?} (use s, m or h)", raw)),
    };
    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_accept_units() {
        assert_eq!(parse_duration("45"), Ok(Duration::from_secs(45)));
        assert_eq!(parse_duration("90s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("10m"), Ok(Duration::from_secs(600)));
        assert_eq!(parse_duration("3h"), Ok(Duration::from_secs(10800)));
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("5d").is_err());
    }

    #[test]
    fn defaults_match_documented_values() {
        let args = Args::parse_from(["quote_exporter"]);
        assert_eq!(args.port, DEFAULT_PORT);
        assert_eq!(args.provider, Provider::Yahoo);
        assert_eq!(args.symbols_format, SymbolFormat::Flat);
        assert!(!args.volume);
        assert_eq!(args.cache_fresh, Duration::from_secs(600));
        assert_eq!(args.cache_retention, Duration::from_secs(1200));
    }

    #[test]
    fn value_enums_parse_lowercase() {
        let args = Args::parse_from([
            "quote_exporter",
            "--provider",
            "wtd",
            "--symbols-format",
            "typed",
            "--volume",
        ]);
        assert_eq!(args.provider, Provider::Wtd);
        assert_eq!(args.symbols_format, SymbolFormat::Typed);
        assert!(args.volume);
    }
}
