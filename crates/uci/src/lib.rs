//! Client-side UCI (Universal Chess Interface) codec.
//!
//! This crate formats the commands a GUI sends to a chess engine and parses
//! the messages the engine sends back. It performs no I/O itself; the
//! analysis crate drives an engine process and uses these types on both
//! ends of the pipe.
//!
//! # Commands sent to the engine
//!
//! - `uci` - Initialize engine, get id and options
//! - `setoption name <id> value <x>` - Configure an option
//! - `isready` / `readyok` - Synchronization
//! - `ucinewgame` - Reset engine state for an unrelated position
//! - `position fen <fen>` - Set position
//! - `go depth <d>` - Start a fixed-depth search
//! - `quit` - Exit engine
//!
//! # Messages read from the engine
//!
//! - `id name <name>`
//! - `uciok`, `readyok`
//! - `info ...` - Search progress, see [`EngineInfo`]
//! - `bestmove <move>` (a trailing `ponder <move>` is ignored)

mod command;
mod info;

pub use command::GuiCommand;
pub use info::{Bound, EngineInfo, Score};

use thiserror::Error;

/// Move string engines report when the position has no legal moves.
pub const NULL_MOVE: &str = "(none)";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UciError {
    #[error("Empty message")]
    Empty,
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Messages sent from engine to GUI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Engine name from `id name`.
    Id(String),
    /// UCI initialization complete.
    UciOk,
    /// Engine is ready.
    ReadyOk,
    /// Search information.
    Info(EngineInfo),
    /// Best move found, `None` when the engine answered `(none)`.
    BestMove(Option<String>),
    /// Anything else (option declarations, `id author`, copyright banners).
    Other(String),
}

impl EngineMessage {
    /// Parse one line of engine output.
    pub fn parse(line: &str) -> Result<Self, UciError> {
        let line = line.trim();
        let mut parts = line.split_whitespace();

        match parts.next() {
            None => Err(UciError::Empty),
            Some("uciok") => Ok(EngineMessage::UciOk),
            Some("readyok") => Ok(EngineMessage::ReadyOk),
            Some("id") => Ok(Self::parse_id(line)),
            Some("info") => EngineInfo::parse(line)
                .map(EngineMessage::Info)
                .ok_or_else(|| UciError::ParseError(line.to_string())),
            Some("bestmove") => Self::parse_bestmove(parts),
            Some(_) => Ok(EngineMessage::Other(line.to_string())),
        }
    }

    fn parse_id(line: &str) -> Self {
        let rest = line.strip_prefix("id").unwrap_or(line).trim_start();
        match rest.strip_prefix("name ") {
            Some(name) => EngineMessage::Id(name.trim().to_string()),
            None => EngineMessage::Other(line.to_string()),
        }
    }

    fn parse_bestmove<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        let mv = parts
            .next()
            .ok_or_else(|| UciError::ParseError("bestmove without a move".to_string()))?;
        Ok(EngineMessage::BestMove((mv != NULL_MOVE).then(|| mv.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_handshake_messages() {
        assert_eq!(EngineMessage::parse("uciok").unwrap(), EngineMessage::UciOk);
        assert_eq!(
            EngineMessage::parse("readyok\n").unwrap(),
            EngineMessage::ReadyOk
        );
    }

    #[test]
    fn parse_id_name() {
        let msg = EngineMessage::parse("id name Stockfish 16.1").unwrap();
        assert_eq!(msg, EngineMessage::Id("Stockfish 16.1".to_string()));
    }

    #[test]
    fn parse_id_author_is_other() {
        let msg = EngineMessage::parse("id author the Stockfish developers").unwrap();
        assert!(matches!(msg, EngineMessage::Other(_)));
    }

    #[test]
    fn parse_bestmove_ignores_ponder() {
        let msg = EngineMessage::parse("bestmove e2e4 ponder e7e5").unwrap();
        assert_eq!(msg, EngineMessage::BestMove(Some("e2e4".to_string())));
    }

    #[test]
    fn parse_bestmove_none() {
        let msg = EngineMessage::parse("bestmove (none)").unwrap();
        assert_eq!(msg, EngineMessage::BestMove(None));
    }

    #[test]
    fn parse_bestmove_missing_move_is_error() {
        assert!(matches!(
            EngineMessage::parse("bestmove"),
            Err(UciError::ParseError(_))
        ));
    }

    #[test]
    fn parse_info_message() {
        let msg = EngineMessage::parse("info depth 3 score cp 12 pv e2e4").unwrap();
        match msg {
            EngineMessage::Info(info) => {
                assert_eq!(info.depth, Some(3));
                assert_eq!(info.score, Some(Score::Cp(12)));
            }
            other => panic!("Expected Info, got {:?}", other),
        }
    }

    #[test]
    fn parse_unknown_line_is_other() {
        let msg = EngineMessage::parse("option name Hash type spin default 16 min 1 max 33554432")
            .unwrap();
        assert!(matches!(msg, EngineMessage::Other(_)));
    }

    #[test]
    fn parse_blank_line_is_empty() {
        assert_eq!(EngineMessage::parse("   "), Err(UciError::Empty));
    }
}
