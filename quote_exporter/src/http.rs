//! HTTP surface of the exporter.
//!
//! - `GET /`: short HTML help with example URLs.
//! - `GET /price?symbols=...`: resolve the symbols, collect their quotes and answer with
//!   the text exposition. A malformed symbol list is answered with `400` and no metrics.
//! - `GET /metrics`: the exporter's own accounting series.
//!
//! Collection is blocking (the quote sources use a blocking HTTP client) and runs on
//! tokio's blocking pool. If the client goes away the worker still finishes, so the
//! lookups it started end up in the cache for the next scrape.
use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use log::{debug, error, warn};
use prometheus::Registry;
use quote_common::net::{METRICS_PATH, PRICE_PATH, SYMBOLS_PARAM};
use quote_common::{QuoteRequest, SymbolFormat, SymbolResolver};
use tokio::net::TcpListener;
use url::form_urlencoded;

use crate::collector::QuoteCollector;
use crate::config::ExporterConfig;
use crate::error::ExporterError;
use crate::exposition::{self, MetricsPage};
use crate::model::accounting::Accounting;
use crate::model::cache::QuoteCache;
use crate::source::QuoteSource;

/// Everything a request handler needs, shared by all requests.
pub struct AppState {
    /// Process configuration.
    pub config: ExporterConfig,
    /// Cache shared by every collector (and the sweeper).
    pub cache: Arc<QuoteCache>,
    resolver: SymbolResolver,
    source: Arc<dyn QuoteSource>,
    accounting: Arc<Accounting>,
    registry: Registry,
}

impl AppState {
    /// Build the shared state: cache and accounting are created here, once.
    pub fn new(config: ExporterConfig, source: Arc<dyn QuoteSource>) -> Result<Self, ExporterError> {
        let cache = Arc::new(QuoteCache::new(config.cache_fresh, config.cache_retention)?);
        let accounting = Arc::new(Accounting::new()?);
        let registry = Registry::new();
        accounting.register(&registry)?;

        Ok(Self {
            resolver: SymbolResolver::new(config.symbol_format),
            config,
            cache,
            source,
            accounting,
            registry,
        })
    }

    /// Process-wide accounting registers.
    pub fn accounting(&self) -> &Accounting {
        &self.accounting
    }

    /// Collect `request` and render the resulting page.
    fn render_quotes(&self, request: &QuoteRequest) -> prometheus::Result<String> {
        let mut page = MetricsPage::new(&self.accounting, self.config.report_volume)?;
        let collector = QuoteCollector::new(
            Arc::clone(&self.source),
            Arc::clone(&self.cache),
            Arc::clone(&self.accounting),
            self.config.report_volume,
        );
        let report = collector.collect(request, &mut page);
        debug!(
            "Collected {}: {} succeeded, {} failed",
            request, report.succeeded, report.failed
        );
        page.render()
    }
}

/// Routes of the exporter.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(help))
        .route(PRICE_PATH, get(price))
        .route(METRICS_PATH, get(metrics))
        .with_state(state)
}

/// Serve `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn price(State(state): State<Arc<AppState>>, RawQuery(query): RawQuery) -> Response {
    let query = query.unwrap_or_default();
    let request = match state.resolver.resolve(form_urlencoded::parse(query.as_bytes())) {
        Ok(request) => request,
        Err(err) => {
            warn!("Rejected {}?{}: {}", PRICE_PATH, query, err);
            return (StatusCode::BAD_REQUEST, format!("{}\n", err)).into_response();
        }
    };

    let worker = Arc::clone(&state);
    match tokio::task::spawn_blocking(move || worker.render_quotes(&request)).await {
        Ok(Ok(body)) => exposition_response(body),
        Ok(Err(err)) => {
            error!("Unable to render quotes: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
        Err(err) => {
            error!("Quote collection worker failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match exposition::render(&state.registry) {
        Ok(body) => exposition_response(body),
        Err(err) => {
            error!("Unable to render metrics: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

fn exposition_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response()
}

async fn help(State(state): State<Arc<AppState>>) -> Html<String> {
    let port = state.config.port;
    let examples: &[&str] = match state.resolver.format() {
        SymbolFormat::Flat => &["AMZN,GOOG,SNAP", "VTIAX&symbols=AAPL"],
        SymbolFormat::Typed => &["stock:AMZN,GOOG,SNAP", "fund:VTIAX"],
    };

    let mut page = String::from("<h1>Prometheus Quotes Exporter</h1>");
    page.push_str("<p>To fetch quotes, your URL must be formatted as:</p>");
    match state.resolver.format() {
        SymbolFormat::Flat => page.push_str(&format!(
            "http://localhost:{}{}?{}=AAAA,BBBB,CCCC",
            port, PRICE_PATH, SYMBOLS_PARAM
        )),
        SymbolFormat::Typed => {
            page.push_str(&format!(
                "http://localhost:{}{}?{}=type:AAAA,BBBB,CCCC",
                port, PRICE_PATH, SYMBOLS_PARAM
            ));
            page.push_str("<p>The \"type\" designator above could be \"stock\" or \"fund\" to indicate<br>");
            page.push_str("the symbols following refer to stocks or mutual funds, respectively.</p>");
        }
    }
    page.push_str("<p><b>Examples:</b></p><ul>");
    for example in examples {
        let url = format!(
            "http://localhost:{}{}?{}={}",
            port, PRICE_PATH, SYMBOLS_PARAM, example
        );
        let href = url.replace('&', "&amp;");
        page.push_str(&format!("<li><a href=\"{}\">{}</a></li>", href, href));
    }
    page.push_str("</ul>");
    Html(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Args;
    use axum::body::Body;
    use axum::http::Request;
    use clap::Parser;
    use http_body_util::BodyExt;
    use quote_common::{AssetType, Quote, QuoteError, Symbol};
    use tower::ServiceExt;

    struct StaticSource;

    impl QuoteSource for StaticSource {
        fn id(&self) -> &'static str {
            "static"
        }

        fn fetch(&self, _asset_type: AssetType, symbol: &Symbol) -> quote_common::Result<Quote> {
            match symbol.normalized().as_str() {
                "AAPL" => Ok(Quote {
                    symbol: "AAPL".to_string(),
                    name: "Apple Inc.".to_string(),
                    price: 150.25,
                    volume: Some(51234567),
                }),
                "MSFT" => Ok(Quote {
                    symbol: "MSFT".to_string(),
                    name: "Microsoft Corporation".to_string(),
                    price: 300.5,
                    volume: None,
                }),
                other => Err(QuoteError::UpstreamProtocolError(format!("{} not found", other))),
            }
        }
    }

    fn state(extra: &[&str]) -> Arc<AppState> {
        let args = Args::parse_from(std::iter::once("quote_exporter").chain(extra.iter().copied()));
        let config = ExporterConfig::from_args(args, io::empty()).unwrap();
        Arc::new(AppState::new(config, Arc::new(StaticSource)).unwrap())
    }

    async fn get(state: &Arc<AppState>, uri: &str) -> (StatusCode, String) {
        let response = router(Arc::clone(state))
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn price_lines(body: &str) -> Vec<&str> {
        body.lines()
            .filter(|l| l.starts_with("quotes_exporter_price{"))
            .collect()
    }

    #[tokio::test]
    async fn price_skips_failed_symbols() {
        let state = state(&[]);
        let (status, body) = get(&state, "/price?symbols=AAPL,ZZZZ").await;

        assert_eq!(status, StatusCode::OK);
        let prices = price_lines(&body);
        assert_eq!(prices.len(), 1);
        assert!(prices[0].contains(r#"symbol="AAPL""#));
        assert!(prices[0].contains(r#"name="Apple Inc.""#));
        assert!(prices[0].ends_with(" 150.25"));
        assert!(body.contains("quotes_exporter_queries_total 1"));
        assert!(body.contains("quotes_exporter_failed_queries_total 1"));
        assert!(body.contains("quotes_exporter_query_duration_seconds_count 2"));
        assert!(!body.contains("quotes_exporter_volume"));
    }

    #[tokio::test]
    async fn repeated_parameters_are_concatenated() {
        let state = state(&["--volume"]);
        let (status, body) = get(&state, "/price?symbols=AAPL&symbols=msft").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(price_lines(&body).len(), 2);
        let volumes: Vec<&str> = body
            .lines()
            .filter(|l| l.starts_with("quotes_exporter_volume{"))
            .collect();
        assert_eq!(volumes.len(), 2);
        assert!(volumes.iter().any(|l| l.contains(r#"symbol="AAPL""#) && l.ends_with(" 51234567")));
        assert!(volumes.iter().any(|l| l.contains(r#"symbol="MSFT""#) && l.ends_with(" 0")));
    }

    #[tokio::test]
    async fn missing_symbols_is_a_bad_request() {
        let state = state(&[]);
        for uri in ["/price", "/price?symbols=", "/price?other=AAPL"] {
            let (status, body) = get(&state, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(!body.contains("quotes_exporter_"));
        }
        assert_eq!(state.accounting.queries(), 0);
    }

    #[tokio::test]
    async fn typed_format_rejects_unknown_prefix() {
        let state = state(&["--symbols-format", "typed"]);
        let (status, _) = get(&state, "/price?symbols=stock:AAPL&symbols=bond:XYZ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get(&state, "/price?symbols=stock:AAPL&symbols=fund:MSFT").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(price_lines(&body).len(), 2);
    }

    #[tokio::test]
    async fn metrics_exposes_accounting_only() {
        let state = state(&[]);
        get(&state, "/price?symbols=AAPL").await;
        let (status, body) = get(&state, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("quotes_exporter_queries_total 1"));
        assert!(price_lines(&body).is_empty());
    }

    #[tokio::test]
    async fn help_lists_examples() {
        let state = state(&["--port", "9999"]);
        let (status, body) = get(&state, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("http://localhost:9999/price?symbols=AMZN,GOOG,SNAP"));
        assert!(body.contains(r#"href="http://localhost:9999/price?symbols=VTIAX&amp;symbols=AAPL""#));
        assert!(!body.contains("VTIAX&symbols"));
    }
}
