//! Engine evaluation types and their normalization into API results.
//!
//! Engines report scores in centipawns or as a distance to a forced mate.
//! [`normalize`] folds both (and the case where the engine reported nothing
//! at all) into a single [`AnalysisResult`] whose shape never varies.

use serde::{Deserialize, Serialize};

/// Score reported in place of a pawn value when a forced mate is on the board.
///
/// This is a sentinel, not an evaluation: any result carrying `mate_in`
/// has an `evaluation` of exactly `+MATE_SCORE` or `-MATE_SCORE`.
pub const MATE_SCORE: f64 = 10.0;

/// Maximum number of candidate moves carried in a result.
pub const MAX_CANDIDATES: usize = 3;

/// Represents a chess position evaluation.
///
/// Evaluations can be either centipawn scores (for normal positions)
/// or mate scores (when a forced mate is found). Both are from the point
/// of view of the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Centipawn evaluation (positive = side to move is better).
    Centipawns(i32),
    /// Mate in N moves (positive = side to move mates, negative = gets mated).
    Mate(i32),
}

impl From<uci::Score> for Evaluation {
    fn from(score: uci::Score) -> Self {
        match score {
            uci::Score::Cp(cp) => Evaluation::Centipawns(cp),
            uci::Score::Mate(m) => Evaluation::Mate(m),
        }
    }
}

/// Engine output for one position, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEvaluation {
    /// The engine's verdict; `None` when no score was reported.
    pub evaluation: Option<Evaluation>,
    /// Best move in UCI notation, if the engine found one.
    pub best_move: Option<String>,
    /// First move of each principal variation, best line first.
    pub candidates: Vec<String>,
}

/// Normalized analysis of a position.
///
/// Field names on the wire are `evaluation`, `best_move`,
/// `principal_variation` and `mate_in`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Score in pawns, positive favors the side to move. Saturated to
    /// `±MATE_SCORE` when `mate_in` is set.
    #[serde(rename = "evaluation")]
    pub evaluation_score: f64,
    /// Best move in UCI notation, empty when the engine reported none.
    pub best_move: String,
    /// Up to [`MAX_CANDIDATES`] candidate moves, best first.
    #[serde(rename = "principal_variation")]
    pub principal_candidates: Vec<String>,
    /// Signed distance to a forced mate, if one was found.
    pub mate_in: Option<i32>,
}

/// Convert raw engine output into an [`AnalysisResult`].
///
/// Never fails:
/// - centipawns are divided by 100,
/// - mate in N becomes `mate_in = N` with the score saturated to `+10.0`
///   for N > 0 and `-10.0` otherwise (mate in 0 means the side to move is
///   already mated),
/// - a missing evaluation becomes `0.0` with no mate.
pub fn normalize(raw: RawEvaluation) -> AnalysisResult {
    let (evaluation_score, mate_in) = match raw.evaluation {
        Some(Evaluation::Centipawns(cp)) => (f64::from(cp) / 100.0, None),
        Some(Evaluation::Mate(n)) => {
            let score = if n > 0 { MATE_SCORE } else { -MATE_SCORE };
            (score, Some(n))
        }
        None => (0.0, None),
    };

    let mut principal_candidates = raw.candidates;
    principal_candidates.truncate(MAX_CANDIDATES);

    AnalysisResult {
        evaluation_score,
        best_move: raw.best_move.unwrap_or_default(),
        principal_candidates,
        mate_in,
    }
}
