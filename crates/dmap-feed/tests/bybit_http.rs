//! BybitClient against a local stand-in for the tickers endpoint.

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use dmap_feed::{BybitClient, BybitConfig, FeedError, MarketDataSource};
use tokio::net::TcpListener;

async fn tickers(Query(params): Query<HashMap<String, String>>) -> (StatusCode, String) {
    if params.get("category").map(String::as_str) != Some("linear") {
        return (
            StatusCode::OK,
            r#"{"retCode":10001,"retMsg":"category required"}"#.to_string(),
        );
    }
    (
        StatusCode::OK,
        r#"{"retCode":0,"retMsg":"OK","result":{"category":"linear","list":[
            {"symbol":"BTCUSDT","lastPrice":"64000","prevPrice24h":"63000",
             "highPrice24h":"65000","lowPrice24h":"62000","turnover24h":"5000000000",
             "price24hPcnt":"0.0158"},
            {"symbol":"ETHUSDT","lastPrice":"3200","prevPrice24h":"3300",
             "highPrice24h":"3350","lowPrice24h":"3100","turnover24h":"2000000000",
             "price24hPcnt":"-0.0303"}
        ]}}"#
            .to_string(),
    )
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_fetch_sends_category_and_decodes_list() {
    let base_url = serve(Router::new().route("/v5/market/tickers", get(tickers))).await;
    let client = BybitClient::new(&BybitConfig {
        base_url,
        ..Default::default()
    })
    .unwrap();

    let list = client.fetch_tickers().await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].symbol, "BTCUSDT");
    assert_eq!(list[1].price_24h_pcnt, "-0.0303");
}

#[tokio::test]
async fn test_wrong_category_surfaces_rejection() {
    let base_url = serve(Router::new().route("/v5/market/tickers", get(tickers))).await;
    let client = BybitClient::new(&BybitConfig {
        base_url,
        category: "spot".to_string(),
        ..Default::default()
    })
    .unwrap();

    assert!(matches!(
        client.fetch_tickers().await,
        Err(FeedError::Rejected { code: 10001, .. })
    ));
}

#[tokio::test]
async fn test_non_success_status_is_http_error() {
    let router = Router::new().route(
        "/v5/market/tickers",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
    );
    let base_url = serve(router).await;
    let client = BybitClient::new(&BybitConfig {
        base_url,
        ..Default::default()
    })
    .unwrap();

    match client.fetch_tickers().await {
        Err(FeedError::HttpClient(msg)) => assert!(msg.contains("503")),
        other => panic!("expected HTTP error, got {other:?}"),
    }
}
