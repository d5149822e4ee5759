use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::broadcast;
use tower::ServiceExt;

use api::{app, AppState};
use common::{InstrumentSnapshot, MarketInfo, Signal, SignalStore, SignalSubtype};
use engine::SqliteSignalStore;

const TOKEN: &str = "secret";

async fn test_app() -> (Router, SqliteSignalStore) {
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("../../migrations").run(&db).await.unwrap();
    let store = SqliteSignalStore::new(db);
    let (signal_tx, _) = broadcast::channel(16);
    let state = AppState {
        store: store.clone(),
        dashboard_token: TOKEN.into(),
        signal_tx,
    };
    (app(state), store)
}

fn signal(market: &str, subtype: SignalSubtype) -> Signal {
    let info = MarketInfo {
        market: market.into(),
        korean_name: "비트코인".into(),
        english_name: "Bitcoin".into(),
    };
    let snapshot = InstrumentSnapshot {
        market: market.into(),
        trade_price: 50_000_000.0,
        signed_change_rate: 0.031,
        highest_52_week_price: 60_000_000.0,
        highest_52_week_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
    };
    Signal::new(&info, &snapshot, subtype)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut req = Request::builder().uri(uri);
    if let Some(token) = token {
        req = req.header("Authorization", format!("Bearer {token}"));
    }
    req.body(Body::empty()).unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_needs_no_token_and_counts_signals() {
    let (app, store) = test_app().await;
    store.append(&signal("KRW-BTC", SignalSubtype::NewPumping)).await.unwrap();
    store.append(&signal("KRW-ETH", SignalSubtype::VolatilityBreak)).await.unwrap();

    let resp = app.oneshot(get("/healthz", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["signals_24h"], 2);
}

#[tokio::test]
async fn signals_require_bearer_token() {
    let (app, _) = test_app().await;

    let missing = app.clone().oneshot(get("/api/signals", None)).await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = app.oneshot(get("/api/signals", Some("nope"))).await.unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn lists_signals_of_requested_kind() {
    let (app, store) = test_app().await;
    store.append(&signal("KRW-BTC", SignalSubtype::GoldenCross)).await.unwrap();
    store.append(&signal("KRW-ETH", SignalSubtype::Pumping)).await.unwrap();

    let resp = app
        .oneshot(get("/api/signals?kind=cross", Some(TOKEN)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["kind"], "cross");
    assert_eq!(body["count"], 1);
    assert_eq!(body["signals"][0]["market"], "KRW-BTC");
    assert_eq!(body["signals"][0]["subtype"], "goldencross");
    assert_eq!(body["signals"][0]["korean_name"], "비트코인");
}

#[tokio::test]
async fn defaults_to_pump_and_honours_limit() {
    let (app, store) = test_app().await;
    for market in ["KRW-A", "KRW-B", "KRW-C"] {
        store.append(&signal(market, SignalSubtype::NewPumping)).await.unwrap();
    }

    let resp = app
        .oneshot(get("/api/signals?limit=2", Some(TOKEN)))
        .await
        .unwrap();
    let body = json_body(resp).await;
    assert_eq!(body["kind"], "pump");
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn unknown_kind_is_bad_request() {
    let (app, _) = test_app().await;
    let resp = app
        .oneshot(get("/api/signals?kind=rsi", Some(TOKEN)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().contains("rsi"));
}
