//! Request-level orchestration: resolve, locate, search, normalize.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{EngineError, EngineLauncher};
use crate::evaluation::{normalize, AnalysisResult, RawEvaluation};
use crate::locator::{EngineLocation, EngineLocator};
use crate::position::{self, BoardState, ResolveError};

/// Name reported by [`AnalysisService::descriptor`].
pub const SERVICE_NAME: &str = "Chess Analysis API";

/// Search depth used when a request does not ask for one.
pub const DEFAULT_DEPTH: u32 = 15;

/// Deepest search a request may ask for.
pub const MAX_DEPTH: u32 = 30;

/// Default bound on one engine session (spawn, handshake and search).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long an engine may take to exit after a finished search.
pub const DEFAULT_QUIT_GRACE: Duration = Duration::from_secs(2);

/// Depth of the search run by [`AnalysisService::check_health`].
const HEALTH_CHECK_DEPTH: u32 = 1;

/// An analysis request as received from a client.
///
/// At least one of `pgn` and `fen` must be non-blank; `pgn` wins when both are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub pgn: Option<String>,
    #[serde(default)]
    pub fen: Option<String>,
    #[serde(default)]
    pub depth: Option<u32>,
}

impl AnalysisRequest {
    pub fn from_fen(fen: impl Into<String>) -> Self {
        Self {
            fen: Some(fen.into()),
            ..Self::default()
        }
    }

    pub fn from_pgn(pgn: impl Into<String>) -> Self {
        Self {
            pgn: Some(pgn.into()),
            ..Self::default()
        }
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }
}

/// Tunables of the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSettings {
    pub default_depth: u32,
    pub max_depth: u32,
    /// Upper bound on spawn, handshake and search.
    pub timeout: Duration,
    /// Bound on engine shutdown once the search has answered. An engine
    /// still running after it is killed.
    pub quit_grace: Duration,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            default_depth: DEFAULT_DEPTH,
            max_depth: MAX_DEPTH,
            timeout: DEFAULT_TIMEOUT,
            quit_grace: DEFAULT_QUIT_GRACE,
        }
    }
}

/// Why an analysis request failed.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The request itself is unusable. Retrying it cannot succeed.
    #[error("{0}")]
    InvalidInput(String),
    /// No engine executable could be found.
    #[error("Stockfish engine not available")]
    EngineUnavailable { install_help: String },
    /// The engine was found but the session failed or timed out.
    #[error("Analysis failed: {0}")]
    EngineFailure(#[from] EngineError),
}

impl From<ResolveError> for AnalysisError {
    fn from(err: ResolveError) -> Self {
        AnalysisError::InvalidInput(err.to_string())
    }
}

impl AnalysisError {
    /// Stable machine-readable tag.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InvalidInput(_) => "invalid_input",
            AnalysisError::EngineUnavailable { .. } => "engine_unavailable",
            AnalysisError::EngineFailure(_) => "engine_failure",
        }
    }

    pub fn install_help(&self) -> Option<&str> {
        match self {
            AnalysisError::EngineUnavailable { install_help } => Some(install_help),
            _ => None,
        }
    }

    /// True when the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::EngineFailure(_))
    }
}

/// Overall verdict of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Error,
}

/// Result of [`AnalysisService::check_health`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(rename = "stockfish_available")]
    pub engine_available: bool,
    pub message: String,
    #[serde(rename = "stockfish_path", skip_serializing_if = "Option::is_none")]
    pub engine_path: Option<String>,
    /// Evaluation of the starting position at depth 1, when the probe ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_evaluation: Option<AnalysisResult>,
}

/// Service metadata served at the root endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub message: String,
    pub status: String,
    pub version: String,
    #[serde(rename = "stockfish_path")]
    pub engine_path: Option<String>,
    #[serde(rename = "stockfish_available")]
    pub engine_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_help: Option<String>,
}

/// Analyzes positions with an external UCI engine.
///
/// Cheap to share behind an `Arc`; each call to [`AnalysisService::analyze`]
/// runs its own engine process.
pub struct AnalysisService {
    locator: Arc<EngineLocator>,
    launcher: Arc<dyn EngineLauncher>,
    settings: AnalysisSettings,
}

impl AnalysisService {
    pub fn new(
        locator: EngineLocator,
        launcher: Arc<dyn EngineLauncher>,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            locator: Arc::new(locator),
            launcher,
            settings,
        }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn locator(&self) -> &EngineLocator {
        &self.locator
    }

    /// Run engine discovery now instead of on the first request.
    pub async fn warm_up(&self) -> &EngineLocation {
        self.engine_location().await
    }

    /// The cached engine location. First-use discovery touches the
    /// filesystem, so it runs on the blocking pool.
    async fn engine_location(&self) -> &EngineLocation {
        if !self.locator.is_initialized() {
            let locator = Arc::clone(&self.locator);
            let discovery = tokio::task::spawn_blocking(move || {
                locator.location();
            });
            if let Err(err) = discovery.await {
                tracing::warn!(error = %err, "Engine discovery task failed");
            }
        }
        self.locator.location()
    }

    /// Depth to search for a request, or why the requested one is refused.
    pub fn effective_depth(&self, requested: Option<u32>) -> Result<u32, AnalysisError> {
        match requested {
            None => Ok(self.settings.default_depth),
            Some(depth) if depth >= 1 && depth <= self.settings.max_depth => Ok(depth),
            Some(depth) => Err(AnalysisError::InvalidInput(format!(
                "Depth must be between 1 and {}, got {}",
                self.settings.max_depth, depth
            ))),
        }
    }

    /// Analyze the position described by `request`.
    ///
    /// Input is validated before the engine is located or started.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::InvalidInput`] for a bad depth, no position, or an unreadable transcript
    /// - [`AnalysisError::EngineUnavailable`] if no engine executable is installed
    /// - [`AnalysisError::EngineFailure`] if the engine session fails or times out
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let depth = self.effective_depth(request.depth)?;
        let state = position::resolve(request)?;

        let path = match self.engine_location().await {
            EngineLocation::Found { path, .. } => path.clone(),
            EngineLocation::Unavailable => {
                return Err(AnalysisError::EngineUnavailable {
                    install_help: self.locator.install_help().to_string(),
                })
            }
        };

        tracing::debug!(fen = %state, depth, "Analyzing position");
        let raw = self.run_session(&path, &state, depth).await?;
        Ok(normalize(raw))
    }

    /// Check the engine subsystem. Never fails; problems are reported in
    /// the returned [`HealthReport`].
    pub async fn check_health(&self) -> HealthReport {
        let locator = Arc::clone(&self.locator);
        let location = match tokio::task::spawn_blocking(move || locator.revalidate()).await {
            Ok(location) => location,
            Err(err) => {
                tracing::warn!(error = %err, "Engine revalidation task failed");
                EngineLocation::Unavailable
            }
        };

        let path = match location {
            EngineLocation::Found { path, .. } => path,
            EngineLocation::Unavailable => {
                return HealthReport {
                    status: HealthStatus::Error,
                    engine_available: false,
                    message: self.locator.install_help().to_string(),
                    engine_path: None,
                    test_evaluation: None,
                }
            }
        };

        let engine_path = Some(path.display().to_string());
        match self
            .run_session(&path, &BoardState::starting(), HEALTH_CHECK_DEPTH)
            .await
        {
            Ok(raw) => HealthReport {
                status: HealthStatus::Healthy,
                engine_available: true,
                message: "Stockfish is working correctly".to_string(),
                engine_path,
                test_evaluation: Some(normalize(raw)),
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Health check session failed");
                HealthReport {
                    status: HealthStatus::Error,
                    engine_available: false,
                    message: format!("Stockfish found but not working: {}", err),
                    engine_path,
                    test_evaluation: None,
                }
            }
        }
    }

    /// Metadata for the root endpoint, from the cached location.
    pub async fn descriptor(&self) -> ServiceDescriptor {
        let location = self.engine_location().await;
        ServiceDescriptor {
            message: SERVICE_NAME.to_string(),
            status: "running".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            engine_path: location.path().map(|p| p.display().to_string()),
            engine_available: location.is_available(),
            install_help: (!location.is_available())
                .then(|| self.locator.install_help().to_string()),
        }
    }

    /// One bounded engine session. Dropping the session future on timeout
    /// kills the engine process.
    ///
    /// Shutdown is bounded by `quit_grace` on its own and never turns a
    /// finished search into an error.
    async fn run_session(
        &self,
        path: &Path,
        state: &BoardState,
        depth: u32,
    ) -> Result<RawEvaluation, EngineError> {
        let session = async {
            let mut engine = self.launcher.launch(path).await?;
            engine.set_position(state).await?;
            let raw = engine.evaluate(depth).await?;
            Ok::<_, EngineError>((engine, raw))
        };

        let timeout = self.settings.timeout;
        let (engine, raw) = match tokio::time::timeout(timeout, session).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(path = %path.display(), ?timeout, "Engine session timed out");
                return Err(EngineError::Timeout(timeout));
            }
        };

        let grace = self.settings.quit_grace;
        match tokio::time::timeout(grace, engine.quit()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::debug!(error = %err, "Engine did not shut down cleanly"),
            Err(_) => tracing::debug!(?grace, "Engine ignored quit and was killed"),
        }
        Ok(raw)
    }
}
