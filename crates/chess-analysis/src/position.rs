//! Resolution of an analysis request into a single board state.
//!
//! A PGN transcript is replayed move by move from its starting position and
//! the final position is exported as FEN. An explicit FEN is passed through
//! untouched; the engine is the judge of its validity.

use std::fmt;

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Move, Position};
use thiserror::Error;

use crate::pgn::{self, GameRecord, PgnError};
use crate::service::AnalysisRequest;

/// FEN of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Errors that prevent a request from producing a board state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Neither `pgn` nor `fen` was supplied.
    #[error("Either PGN or FEN required")]
    MissingPosition,
    /// The transcript is not a readable PGN game.
    #[error("Invalid PGN: {0}")]
    Transcript(#[from] PgnError),
    /// The transcript's `FEN` tag does not describe a legal position.
    #[error("Invalid PGN: bad FEN tag '{fen}': {reason}")]
    StartingPosition { fen: String, reason: String },
    /// A move of the transcript cannot be played.
    #[error("Invalid PGN: illegal move '{token}' at ply {ply}: {reason}")]
    IllegalMove {
        ply: usize,
        token: String,
        reason: String,
    },
}

/// Canonical textual snapshot of a position (FEN).
///
/// Produced once per request and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState(String);

impl BoardState {
    /// Wrap a board-state string as supplied by a caller.
    ///
    /// No validation happens here; surrounding whitespace is trimmed.
    pub fn new(fen: &str) -> Self {
        Self(fen.trim().to_string())
    }

    /// The standard starting position.
    pub fn starting() -> Self {
        Self(STARTING_FEN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The side-to-move field (`"w"` or `"b"`), if the string has one.
    pub fn side_to_move(&self) -> Option<&str> {
        self.0.split_whitespace().nth(1)
    }
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolve a request into a board state.
///
/// The transcript wins when both `pgn` and `fen` are present. Blank strings
/// count as absent.
///
/// # Errors
///
/// - [`ResolveError::MissingPosition`] if neither field is usable
/// - any transcript error from [`resolve_transcript`]
pub fn resolve(request: &AnalysisRequest) -> Result<BoardState, ResolveError> {
    if let Some(pgn) = non_blank(request.pgn.as_deref()) {
        return resolve_transcript(pgn);
    }
    if let Some(fen) = non_blank(request.fen.as_deref()) {
        return Ok(BoardState::new(fen));
    }
    Err(ResolveError::MissingPosition)
}

/// Replay the first game of a PGN document and return its final position.
///
/// Either every move is played or the whole call fails.
pub fn resolve_transcript(text: &str) -> Result<BoardState, ResolveError> {
    let game = pgn::read_game(text)?;
    let mut position = starting_position(&game)?;

    for (index, token) in game.moves.iter().enumerate() {
        let m = parse_move(&position, token).map_err(|reason| ResolveError::IllegalMove {
            ply: index + 1,
            token: token.clone(),
            reason,
        })?;
        position.play_unchecked(&m);
    }

    tracing::debug!(plies = game.moves.len(), "Transcript replayed");
    let fen = Fen::from_position(position, EnPassantMode::Legal);
    Ok(BoardState(fen.to_string()))
}

/// Starting position of a game: its `FEN` tag, or the standard setup.
fn starting_position(game: &GameRecord) -> Result<Chess, ResolveError> {
    let Some(fen) = game.tag("FEN") else {
        return Ok(Chess::default());
    };

    let mode = match game.tag("Variant") {
        Some(v) if v.eq_ignore_ascii_case("chess960") => CastlingMode::Chess960,
        _ => CastlingMode::Standard,
    };
    let invalid = |reason: String| ResolveError::StartingPosition {
        fen: fen.to_string(),
        reason,
    };

    let parsed: Fen = fen.parse().map_err(|e: shakmaty::fen::ParseFenError| invalid(e.to_string()))?;
    parsed
        .into_position::<Chess>(mode)
        .map_err(|e| invalid(e.to_string()))
}

/// Null move spellings found in annotated transcripts.
const NULL_MOVES: [&str; 3] = ["--", "Z0", "0000"];

/// True for tokens shaped like a UCI move: `e2e4`, `e7e8q`.
fn looks_like_uci(token: &str) -> bool {
    let b = token.as_bytes();
    let square = |f: u8, r: u8| (b'a'..=b'h').contains(&f) && (b'1'..=b'8').contains(&r);
    match b.len() {
        4 => square(b[0], b[1]) && square(b[2], b[3]),
        5 => square(b[0], b[1]) && square(b[2], b[3]) && b"qrbn".contains(&b[4]),
        _ => false,
    }
}

/// Interpret one movetext token in `position`.
///
/// SAN is the norm; UCI long algebraic tokens are accepted too, since some
/// exporters write those into PGN files. Null moves are refused.
fn parse_move(position: &Chess, token: &str) -> Result<Move, String> {
    if NULL_MOVES.contains(&token) {
        return Err("null moves are not supported".to_string());
    }
    if looks_like_uci(token) {
        if let Ok(m) = token
            .parse::<UciMove>()
            .map_err(|e| e.to_string())
            .and_then(|uci| uci.to_move(position).map_err(|e| e.to_string()))
        {
            return Ok(m);
        }
    }

    // Some exporters write castling with zeros.
    let normalized;
    let token = match token.trim_end_matches(['+', '#']) {
        "0-0" | "0-0-0" => {
            normalized = token.replace('0', "O");
            normalized.as_str()
        }
        _ => token,
    };

    let san: SanPlus = token.parse().map_err(|e: shakmaty::san::ParseSanError| e.to_string())?;
    san.san.to_move(position).map_err(|e| e.to_string())
}
