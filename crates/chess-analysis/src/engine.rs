//! UCI engine sessions for position analysis.
//!
//! Every analysis runs in its own engine process. The process is spawned
//! with `kill_on_drop`, so dropping a session (after an error, a timeout or
//! a cancelled request) never leaves an engine running.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use uci::{EngineInfo, EngineMessage, GuiCommand, Score};

use crate::evaluation::{Evaluation, RawEvaluation, MAX_CANDIDATES};
use crate::position::BoardState;

/// Maximum number of lines to read before giving up on a handshake reply.
pub const MAX_UCI_LINES: usize = 1000;

/// Errors that can occur when working with chess engines.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to spawn the engine process.
    #[error("Failed to spawn engine at {path}: {source}")]
    SpawnError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Reading from or writing to the engine failed.
    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Engine failed to initialize properly (UCI handshake failed).
    #[error("Engine initialization failed: {0}")]
    InitFailed(String),
    /// The engine's output ended before the expected reply.
    #[error("Engine closed unexpectedly")]
    Closed,
    /// The engine did not finish within the allotted time.
    #[error("Engine did not respond within {0:?}")]
    Timeout(Duration),
}

/// Engine options applied right after the UCI handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Number of principal variations to search (`MultiPV`).
    pub multipv: u32,
    /// Search threads, engine default when `None`.
    pub threads: Option<u32>,
    /// Hash table size in megabytes, engine default when `None`.
    pub hash_mb: Option<u32>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            multipv: MAX_CANDIDATES as u32,
            threads: None,
            hash_mb: None,
        }
    }
}

impl EngineOptions {
    fn commands(&self) -> Vec<GuiCommand> {
        let mut commands = Vec::new();
        if let Some(threads) = self.threads {
            commands.push(GuiCommand::set_option("Threads", threads));
        }
        if let Some(hash) = self.hash_mb {
            commands.push(GuiCommand::set_option("Hash", hash));
        }
        if self.multipv > 1 {
            commands.push(GuiCommand::set_option("MultiPV", self.multipv));
        }
        commands
    }
}

/// One engine instance, configured and ready to analyze.
#[async_trait]
pub trait EngineSession: Send {
    /// Set the position to analyze.
    async fn set_position(&mut self, state: &BoardState) -> Result<(), EngineError>;

    /// Search the current position to `depth` plies.
    ///
    /// An engine that completes the search without reporting a score yields
    /// an evaluation of `None`, not an error.
    async fn evaluate(&mut self, depth: u32) -> Result<RawEvaluation, EngineError>;

    /// Shut the engine down and release its resources.
    async fn quit(self: Box<Self>) -> Result<(), EngineError>;
}

/// Creates engine sessions from an executable path.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self, path: &Path) -> Result<Box<dyn EngineSession>, EngineError>;
}

/// Launches [`UciSession`]s.
#[derive(Debug, Clone, Default)]
pub struct UciLauncher {
    options: EngineOptions,
    args: Vec<String>,
}

impl UciLauncher {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            args: Vec::new(),
        }
    }

    /// Pass extra command-line arguments to the engine executable.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

#[async_trait]
impl EngineLauncher for UciLauncher {
    async fn launch(&self, path: &Path) -> Result<Box<dyn EngineSession>, EngineError> {
        let session = UciSession::spawn(path, &self.args, &self.options).await?;
        Ok(Box::new(session))
    }
}

/// Best lines of the deepest iteration seen so far.
#[derive(Debug, Default)]
struct SearchLines {
    depth: Option<u32>,
    by_rank: BTreeMap<u32, (Score, Option<String>)>,
}

impl SearchLines {
    fn record(&mut self, info: &EngineInfo) {
        // Bound scores come from aspiration-window fails; skip them.
        if !info.is_exact() {
            return;
        }
        let Some(score) = info.score else {
            return;
        };
        let depth = info.depth.unwrap_or(0);

        match self.depth {
            Some(current) if depth < current => return,
            Some(current) if depth == current => {}
            _ => {
                self.depth = Some(depth);
                self.by_rank.clear();
            }
        }

        self.by_rank
            .insert(info.rank(), (score, info.pv.first().cloned()));
    }

    fn into_raw(self, best_move: Option<String>) -> RawEvaluation {
        let evaluation = self
            .by_rank
            .get(&1)
            .map(|(score, _)| Evaluation::from(*score));
        let candidates = self
            .by_rank
            .into_values()
            .filter_map(|(_, first)| first)
            .take(MAX_CANDIDATES)
            .collect();

        RawEvaluation {
            evaluation,
            best_move,
            candidates,
        }
    }
}

/// A running UCI engine process.
pub struct UciSession {
    /// The engine process handle.
    child: Child,
    /// Writer for sending commands to the engine.
    stdin: ChildStdin,
    /// Line reader over the engine's output.
    lines: Lines<BufReader<ChildStdout>>,
    /// The engine's name (reported via UCI id).
    name: String,
}

impl UciSession {
    /// Spawn an engine and perform the UCI handshake.
    ///
    /// # Errors
    ///
    /// - `EngineError::SpawnError` if the process fails to start
    /// - `EngineError::InitFailed` / `EngineError::Closed` if the handshake fails
    pub async fn spawn(
        path: &Path,
        args: &[String],
        options: &EngineOptions,
    ) -> Result<Self, EngineError> {
        let mut child = Command::new(path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::SpawnError {
                path: path.to_path_buf(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::InitFailed("engine stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::InitFailed("engine stdout unavailable".to_string()))?;

        let mut session = Self {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            name: String::new(),
        };
        session.init_uci(options).await?;

        tracing::debug!(engine = %session.name, path = %path.display(), "Engine session ready");
        Ok(session)
    }

    /// Returns the engine's name as reported via UCI protocol.
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn init_uci(&mut self, options: &EngineOptions) -> Result<(), EngineError> {
        self.send(&GuiCommand::Uci).await?;

        let mut name = None;
        let mut lines_read = 0;
        loop {
            lines_read += 1;
            if lines_read > MAX_UCI_LINES {
                return Err(EngineError::InitFailed("no uciok received".to_string()));
            }
            match self.read_message().await? {
                EngineMessage::Id(n) => name = Some(n),
                EngineMessage::UciOk => break,
                _ => {}
            }
        }
        self.name = name.unwrap_or_else(|| "Unknown Engine".to_string());

        for command in options.commands() {
            self.send(&command).await?;
        }
        self.send(&GuiCommand::UciNewGame).await?;
        self.sync().await
    }

    /// Send `isready` and wait for `readyok`.
    async fn sync(&mut self) -> Result<(), EngineError> {
        self.send(&GuiCommand::IsReady).await?;
        let mut lines_read = 0;
        loop {
            lines_read += 1;
            if lines_read > MAX_UCI_LINES {
                return Err(EngineError::InitFailed("no readyok received".to_string()));
            }
            if self.read_message().await? == EngineMessage::ReadyOk {
                return Ok(());
            }
        }
    }

    async fn send(&mut self, command: &GuiCommand) -> Result<(), EngineError> {
        let line = command.to_uci();
        tracing::trace!(command = %line, "-> engine");
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Next non-blank engine message. Unparseable lines come back as
    /// [`EngineMessage::Other`].
    async fn read_message(&mut self) -> Result<EngineMessage, EngineError> {
        loop {
            let line = self.lines.next_line().await?.ok_or(EngineError::Closed)?;
            tracing::trace!(line = %line, "<- engine");
            match EngineMessage::parse(&line) {
                Ok(message) => return Ok(message),
                Err(uci::UciError::Empty) => continue,
                Err(uci::UciError::ParseError(_)) => return Ok(EngineMessage::Other(line)),
            }
        }
    }
}

#[async_trait]
impl EngineSession for UciSession {
    async fn set_position(&mut self, state: &BoardState) -> Result<(), EngineError> {
        self.send(&GuiCommand::Position {
            fen: state.as_str().to_string(),
        })
        .await
    }

    async fn evaluate(&mut self, depth: u32) -> Result<RawEvaluation, EngineError> {
        self.send(&GuiCommand::Go { depth }).await?;

        let mut lines = SearchLines::default();
        loop {
            match self.read_message().await? {
                EngineMessage::Info(info) => lines.record(&info),
                EngineMessage::BestMove(mv) => return Ok(lines.into_raw(mv)),
                _ => {}
            }
        }
    }

    async fn quit(self: Box<Self>) -> Result<(), EngineError> {
        let UciSession {
            mut child,
            mut stdin,
            ..
        } = *self;
        // A dead engine cannot receive `quit`; reaping it is all that is left.
        let line = format!("{}\n", GuiCommand::Quit.to_uci());
        let _ = stdin.write_all(line.as_bytes()).await;
        let _ = stdin.flush().await;
        // Engines that ignore `quit` still exit on end of input.
        drop(stdin);
        child.wait().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(line: &str) -> EngineInfo {
        EngineInfo::parse(line).unwrap()
    }

    #[test]
    fn test_options_commands() {
        let options = EngineOptions {
            multipv: 3,
            threads: Some(2),
            hash_mb: Some(64),
        };
        let lines: Vec<String> = options.commands().iter().map(|c| c.to_uci()).collect();
        assert_eq!(
            lines,
            vec![
                "setoption name Threads value 2",
                "setoption name Hash value 64",
                "setoption name MultiPV value 3",
            ]
        );
    }

    #[test]
    fn test_default_options_request_three_lines() {
        let options = EngineOptions::default();
        assert_eq!(options.multipv, 3);
        assert_eq!(options.commands().len(), 1);
    }

    #[test]
    fn test_single_pv_skips_multipv_option() {
        let options = EngineOptions {
            multipv: 1,
            ..EngineOptions::default()
        };
        assert!(options.commands().is_empty());
    }

    #[test]
    fn test_search_lines_keep_deepest_iteration() {
        let mut lines = SearchLines::default();
        lines.record(&info("info depth 1 multipv 1 score cp 10 pv d2d4"));
        lines.record(&info("info depth 1 multipv 2 score cp 5 pv e2e4"));
        lines.record(&info("info depth 2 multipv 1 score cp 30 pv e2e4 e7e5"));
        lines.record(&info("info depth 2 multipv 2 score cp 25 pv d2d4 d7d5"));
        lines.record(&info("info depth 2 multipv 3 score cp 20 pv g1f3"));

        let raw = lines.into_raw(Some("e2e4".to_string()));
        assert_eq!(raw.evaluation, Some(Evaluation::Centipawns(30)));
        assert_eq!(raw.best_move.as_deref(), Some("e2e4"));
        assert_eq!(raw.candidates, vec!["e2e4", "d2d4", "g1f3"]);
    }

    #[test]
    fn test_search_lines_ignore_bounds_and_scoreless_info() {
        let mut lines = SearchLines::default();
        lines.record(&info("info depth 5 multipv 1 score cp 40 pv e2e4"));
        lines.record(&info("info depth 6 multipv 1 score cp 90 lowerbound pv e2e4"));
        lines.record(&info("info depth 6 currmove e2e4 currmovenumber 1"));
        lines.record(&info("info string NNUE enabled"));

        let raw = lines.into_raw(None);
        assert_eq!(raw.evaluation, Some(Evaluation::Centipawns(40)));
        assert_eq!(raw.candidates, vec!["e2e4"]);
    }

    #[test]
    fn test_search_lines_mate_without_pv() {
        // A checkmated side to move: Stockfish reports a score and no moves.
        let mut lines = SearchLines::default();
        lines.record(&info("info depth 0 score mate 0"));

        let raw = lines.into_raw(None);
        assert_eq!(raw.evaluation, Some(Evaluation::Mate(0)));
        assert!(raw.candidates.is_empty());
        assert!(raw.best_move.is_none());
    }

    #[test]
    fn test_search_lines_empty() {
        let raw = SearchLines::default().into_raw(None);
        assert_eq!(raw, RawEvaluation::default());
    }

    #[test]
    fn test_search_lines_ignore_stale_depth() {
        let mut lines = SearchLines::default();
        lines.record(&info("info depth 8 multipv 1 score mate 2 pv h5f7"));
        lines.record(&info("info depth 7 multipv 1 score cp 300 pv c4f7"));

        let raw = lines.into_raw(Some("h5f7".to_string()));
        assert_eq!(raw.evaluation, Some(Evaluation::Mate(2)));
    }

    #[test]
    fn test_engine_error_display() {
        let spawn_err = EngineError::SpawnError {
            path: PathBuf::from("/path/to/engine"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        assert!(spawn_err.to_string().contains("Failed to spawn engine"));
        assert!(spawn_err.to_string().contains("/path/to/engine"));

        assert_eq!(EngineError::Closed.to_string(), "Engine closed unexpectedly");

        let timeout = EngineError::Timeout(Duration::from_secs(5));
        assert_eq!(timeout.to_string(), "Engine did not respond within 5s");
    }

    #[tokio::test]
    async fn test_spawn_nonexistent_executable_returns_error() {
        let result = UciSession::spawn(
            Path::new("/nonexistent/path/to/stockfish"),
            &[],
            &EngineOptions::default(),
        )
        .await;
        match result {
            Err(EngineError::SpawnError { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/path/to/stockfish"));
            }
            Err(other) => panic!("Expected SpawnError, got {:?}", other),
            Ok(_) => panic!("Expected SpawnError, got a session"),
        }
    }

    #[test]
    fn test_max_lines_constant() {
        assert!(MAX_UCI_LINES >= 1000);
    }
}
