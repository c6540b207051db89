//! Analysis API endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chess_analysis::{AnalysisRequest, AnalysisResult};

use crate::error::ApiError;
use crate::AppState;

/// POST /api/analyze
///
/// Analyzes the position described by a PGN transcript or a FEN string.
///
/// # Body
/// * `pgn` - Game transcript; its final position is analyzed (wins over `fen`)
/// * `fen` - Position in FEN notation
/// * `depth` - Search depth (optional, server default otherwise)
///
/// # Errors
/// * 400 Bad Request - Malformed body, no position, bad transcript or depth
/// * 500 Internal Server Error - Stockfish unavailable or analysis failed
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Json(request) = payload?;
    let result = state.service.analyze(&request).await?;
    Ok(Json(result))
}
