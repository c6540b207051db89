//! HTTP tests for the analysis server.
//!
//! Requests go through the full router (CORS, timing, handlers) with a
//! scripted fake engine run by `/bin/sh`.

#![cfg(unix)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use analysis_server::config::ServerConfig;
use analysis_server::{router, AppState};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chess_analysis::locator::{Strategy, SystemProbe};
use chess_analysis::{
    AnalysisService, AnalysisSettings, EngineLocator, EngineOptions, Platform, UciLauncher,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

const FAKE_ENGINE: &str = r#"
while read -r line; do
  case "$line" in
    uci) echo "id name FakeFish"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go*)
      echo "info depth 3 multipv 1 score cp 34 pv e2e4 e7e5"
      echo "info depth 3 multipv 2 score cp 30 pv d2d4"
      echo "info depth 3 multipv 3 score cp 22 pv c2c4"
      echo "bestmove e2e4" ;;
    quit) exit 0 ;;
  esac
done
"#;

const HANGING_ENGINE: &str = r#"
while read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
  esac
done
"#;

struct TestApp {
    app: Router,
    _dir: TempDir,
}

fn app_with_engine(script: &str, timeout: Duration) -> TestApp {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.sh");
    std::fs::write(&path, script).unwrap();

    let locator = EngineLocator::new(
        vec![Strategy::Override(PathBuf::from("/bin/sh"))],
        Arc::new(SystemProbe),
        Platform::current(),
    );
    let launcher =
        UciLauncher::new(EngineOptions::default()).with_args(vec![path.display().to_string()]);
    let settings = AnalysisSettings {
        timeout,
        ..AnalysisSettings::default()
    };
    let service = AnalysisService::new(locator, Arc::new(launcher), settings);

    TestApp {
        app: router(AppState::new(service), &ServerConfig::default()),
        _dir: dir,
    }
}

fn app_without_engine() -> Router {
    let locator = EngineLocator::new(
        vec![Strategy::Override(PathBuf::from("/nonexistent/stockfish"))],
        Arc::new(SystemProbe),
        Platform::Linux,
    );
    let service = AnalysisService::new(
        locator,
        Arc::new(UciLauncher::default()),
        AnalysisSettings::default(),
    );
    router(AppState::new(service), &ServerConfig::default())
}

fn post_json(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_analyze_fen() {
    let test = app_with_engine(FAKE_ENGINE, Duration::from_secs(10));
    let body = json!({ "fen": STARTING_FEN, "depth": 10 }).to_string();

    let (status, json) = send(test.app, post_json(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["evaluation"], 0.34);
    assert_eq!(json["best_move"], "e2e4");
    assert_eq!(json["principal_variation"], json!(["e2e4", "d2d4", "c2c4"]));
    assert!(json["mate_in"].is_null());
}

#[tokio::test]
async fn test_analyze_pgn() {
    let test = app_with_engine(FAKE_ENGINE, Duration::from_secs(10));
    let body = json!({ "pgn": "[Event \"Casual\"]\n\n1. e4 e5 2. Nf3 *" }).to_string();

    let (status, json) = send(test.app, post_json(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["best_move"], "e2e4");
}

#[tokio::test]
async fn test_analyze_without_position_is_bad_request() {
    let test = app_with_engine(FAKE_ENGINE, Duration::from_secs(10));

    let (status, json) = send(test.app, post_json(r#"{"depth": 12}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "Either PGN or FEN required");
    assert_eq!(json["kind"], "invalid_input");
}

#[tokio::test]
async fn test_analyze_illegal_pgn_is_bad_request() {
    let test = app_with_engine(FAKE_ENGINE, Duration::from_secs(10));

    let (status, json) = send(test.app, post_json(r#"{"pgn": "1. e4 e4"}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "invalid_input");
    assert!(json["detail"].as_str().unwrap().starts_with("Invalid PGN"));
}

#[tokio::test]
async fn test_analyze_malformed_json_is_bad_request() {
    let test = app_with_engine(FAKE_ENGINE, Duration::from_secs(10));

    let (status, json) = send(test.app, post_json("{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "invalid_input");
}

#[tokio::test]
async fn test_analyze_out_of_range_depth_is_bad_request() {
    let test = app_with_engine(FAKE_ENGINE, Duration::from_secs(10));
    let body = json!({ "fen": STARTING_FEN, "depth": 99 }).to_string();

    let (status, json) = send(test.app, post_json(&body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "invalid_input");
}

#[tokio::test]
async fn test_analyze_without_engine() {
    let body = json!({ "fen": STARTING_FEN }).to_string();

    let (status, json) = send(app_without_engine(), post_json(&body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["kind"], "engine_unavailable");
    assert!(json["install_help"]
        .as_str()
        .unwrap()
        .contains("apt install stockfish"));
}

#[tokio::test]
async fn test_analyze_hung_engine_times_out() {
    let test = app_with_engine(HANGING_ENGINE, Duration::from_millis(300));
    let body = json!({ "fen": STARTING_FEN }).to_string();

    let (status, json) = send(test.app, post_json(&body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["kind"], "engine_failure");
}

#[tokio::test]
async fn test_health_with_engine() {
    let test = app_with_engine(FAKE_ENGINE, Duration::from_secs(10));

    let (status, json) = send(test.app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["stockfish_available"], true);
    assert_eq!(json["stockfish_path"], "/bin/sh");
    assert_eq!(json["test_evaluation"]["best_move"], "e2e4");
}

#[tokio::test]
async fn test_health_without_engine_is_still_ok() {
    let (status, json) = send(app_without_engine(), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "error");
    assert_eq!(json["stockfish_available"], false);
    assert!(json.get("stockfish_path").is_none());
}

#[tokio::test]
async fn test_root_descriptor() {
    let test = app_with_engine(FAKE_ENGINE, Duration::from_secs(10));

    let (status, json) = send(test.app, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Chess Analysis API");
    assert_eq!(json["status"], "running");
    assert_eq!(json["stockfish_path"], "/bin/sh");
    assert_eq!(json["stockfish_available"], true);
    assert!(json.get("install_help").is_none());
}

#[tokio::test]
async fn test_root_descriptor_without_engine() {
    let (status, json) = send(app_without_engine(), get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["stockfish_path"].is_null());
    assert_eq!(json["stockfish_available"], false);
    assert!(json["install_help"].is_string());
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/analyze")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app_without_engine().oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/analyze")
        .header(header::ORIGIN, "http://evil.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app_without_engine().oneshot(request).await.unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
