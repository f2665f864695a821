// tests/source_client_http.rs
//
// HttpFetcher against a throwaway local origin (axum on 127.0.0.1:0),
// so status mapping, timeouts and request headers go over a real socket.

use std::sync::Arc;
use std::time::Duration;

use axum::{http::HeaderMap, http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;

use inverstra_data_service::sources::fetch::{FetchError, HttpFetcher, PageFetcher};
use inverstra_data_service::{ScrapeConfig, SourceClient, SourceOutcome};

const YAHOO: &str = include_str!("fixtures/yahoo_aapl.html");

async fn spawn_origin() -> String {
    let app = Router::new()
        .route("/quote/AAPL", get(|| async { YAHOO }))
        .route(
            "/quote/DOWN",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(
            "/quote/SLOW",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                YAHOO
            }),
        )
        .route(
            "/echo",
            get(|headers: HeaderMap| async move {
                let ua = headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let accept = headers
                    .get("accept")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                format!("{ua}\n{accept}")
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

fn config_for(base: &str, timeout_secs: u64) -> ScrapeConfig {
    ScrapeConfig {
        timeout_secs,
        yahoo_base: format!("{base}/quote"),
        ..ScrapeConfig::default()
    }
}

fn client_for(cfg: ScrapeConfig) -> SourceClient {
    let fetcher = HttpFetcher::from_config(&cfg).expect("fetcher");
    SourceClient::new(Arc::new(fetcher), Arc::new(cfg))
}

#[tokio::test]
async fn ok_page_is_extracted() {
    let base = spawn_origin().await;
    let client = client_for(config_for(&base, 5));

    match client.yahoo("AAPL").await {
        SourceOutcome::Ok(snap) => {
            assert_eq!(snap.symbol, "AAPL");
            assert_eq!(snap.current_price, Some(189.84));
        }
        SourceOutcome::Failed(f) => panic!("unexpected failure: {}", f.error),
    }
}

#[tokio::test]
async fn server_error_becomes_failed_outcome() {
    let base = spawn_origin().await;
    let client = client_for(config_for(&base, 5));

    let out = client.yahoo("DOWN").await;
    let failure = out.failure().expect("should fail");
    assert_eq!(failure.source, "Yahoo Finance");
    assert!(failure.error.contains("500"), "{}", failure.error);
}

#[tokio::test]
async fn slow_origin_times_out() {
    let base = spawn_origin().await;
    let client = client_for(config_for(&base, 1));

    let started = std::time::Instant::now();
    let out = client.yahoo("SLOW").await;
    let failure = out.failure().expect("should time out");
    assert!(failure.error.contains("timed out"), "{}", failure.error);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    // bind then drop, so the port is very likely closed
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = HttpFetcher::from_config(&ScrapeConfig::default()).unwrap();
    let err = fetcher
        .get_html(&format!("http://{addr}/quote/AAPL"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn requests_carry_browser_headers() {
    let base = spawn_origin().await;
    let cfg = ScrapeConfig {
        user_agent: "inverstra-test/1.0".to_string(),
        ..ScrapeConfig::default()
    };
    let fetcher = HttpFetcher::from_config(&cfg).unwrap();

    let body = fetcher.get_html(&format!("{base}/echo")).await.unwrap();
    let mut lines = body.lines();
    assert_eq!(lines.next(), Some("inverstra-test/1.0"));
    assert!(lines.next().unwrap_or_default().contains("text/html"));
}
