//! Chess position analysis with Stockfish integration.
//!
//! This crate turns a game transcript (PGN) or a board state (FEN) into an
//! engine evaluation, a best move and a few candidate moves.
//!
//! # Overview
//!
//! - [`EngineLocator`] - Finds the engine executable once and caches it
//! - [`position::resolve`] - Replays a transcript into a [`BoardState`]
//! - [`UciSession`] - One bounded conversation with a UCI engine process
//! - [`normalize`] - Folds raw engine scores into an [`AnalysisResult`]
//! - [`AnalysisService`] - Runs the steps above per request
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chess_analysis::{AnalysisRequest, AnalysisService, AnalysisSettings, EngineLocator, UciLauncher};
//!
//! let service = AnalysisService::new(
//!     EngineLocator::from_env(None),
//!     Arc::new(UciLauncher::default()),
//!     AnalysisSettings::default(),
//! );
//! let result = service.analyze(&AnalysisRequest::from_pgn("1. e4 e5 2. Nf3")).await?;
//! println!("{} ({})", result.evaluation_score, result.best_move);
//! ```

pub mod engine;
pub mod evaluation;
pub mod locator;
pub mod pgn;
pub mod position;
pub mod service;

pub use engine::{EngineError, EngineLauncher, EngineOptions, EngineSession, UciLauncher, UciSession};
pub use evaluation::{normalize, AnalysisResult, Evaluation, RawEvaluation};
pub use locator::{EngineLocation, EngineLocator, Platform};
pub use position::{BoardState, ResolveError};
pub use service::{
    AnalysisError, AnalysisRequest, AnalysisService, AnalysisSettings, HealthReport, HealthStatus,
    ServiceDescriptor,
};
