//! Analysis Server Library
//!
//! HTTP surface of the chess analysis service:
//! - `GET /` - service metadata and engine location
//! - `GET /health` - engine self-test
//! - `POST /api/analyze` - evaluate a PGN transcript or FEN position

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use chess_analysis::{AnalysisService, EngineLocator, UciLauncher};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use config::ServerConfig;
use middleware::{timing_layer, SlowRequestThreshold};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AnalysisService>,
}

impl AppState {
    pub fn new(service: AnalysisService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Build the analysis service described by `config`.
///
/// Discovery honors `STOCKFISH_PATH` first, then `engine.path`.
pub fn build_service(config: &ServerConfig) -> AnalysisService {
    AnalysisService::new(
        EngineLocator::from_env(config.engine.path.clone()),
        Arc::new(UciLauncher::new(config.engine_options())),
        config.analysis_settings(),
    )
}

/// CORS layer for the configured origins. Unparseable origins are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// The application router with CORS and request timing applied.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(api::status::root))
        .route("/health", get(api::status::health))
        .route("/api/analyze", post(api::analysis::analyze))
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(
            SlowRequestThreshold(config.slow_request_threshold()),
            timing_layer,
        ))
        .layer(cors_layer(&config.allowed_origins))
}
