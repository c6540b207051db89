//! Engine executable discovery.
//!
//! The locator walks an ordered chain of [`Strategy`] values and returns the
//! first path that the [`FileProbe`] accepts as an executable file:
//!
//! 1. an explicit override (`STOCKFISH_PATH`, or a configured path),
//! 2. the well-known install locations of the current [`Platform`],
//! 3. every directory on `PATH`.
//!
//! Discovery runs at most once per [`EngineLocator`]; the result is kept in a
//! [`LocationCache`] for the lifetime of the process.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Environment variable naming the engine executable. Wins over everything.
pub const ENGINE_PATH_VAR: &str = "STOCKFISH_PATH";

/// Host family, used to choose install locations and guidance text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
    Windows,
    Other,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Other
        }
    }

    /// Conventional install locations, most likely first.
    pub fn known_paths(self) -> &'static [&'static str] {
        match self {
            Platform::MacOs => &[
                "/opt/homebrew/bin/stockfish",
                "/usr/local/bin/stockfish",
                "/opt/local/bin/stockfish",
            ],
            Platform::Linux => &[
                "/usr/games/stockfish",
                "/usr/bin/stockfish",
                "/usr/local/bin/stockfish",
                "/snap/bin/stockfish",
            ],
            Platform::Windows => &[
                r"C:\Program Files\Stockfish\stockfish.exe",
                r"C:\Program Files (x86)\Stockfish\stockfish.exe",
                r"C:\stockfish\stockfish.exe",
            ],
            Platform::Other => &["/usr/local/bin/stockfish", "/usr/bin/stockfish"],
        }
    }

    /// File name of the engine binary on `PATH`.
    pub fn binary_name(self) -> &'static str {
        match self {
            Platform::Windows => "stockfish.exe",
            _ => "stockfish",
        }
    }

    /// Human-readable instructions for installing the engine.
    pub fn install_help(self) -> &'static str {
        match self {
            Platform::MacOs => {
                "Stockfish was not found. Install it with `brew install stockfish` \
                 or set STOCKFISH_PATH to the engine executable."
            }
            Platform::Linux => {
                "Stockfish was not found. Install it with `sudo apt install stockfish` \
                 (or your distribution's package manager) or set STOCKFISH_PATH to the \
                 engine executable."
            }
            Platform::Windows => {
                "Stockfish was not found. Download it from https://stockfishchess.org/download/, \
                 extract it to C:\\Program Files\\Stockfish\\ or set STOCKFISH_PATH to the \
                 engine executable."
            }
            Platform::Other => {
                "Stockfish was not found. Install it from https://stockfishchess.org/download/ \
                 and set STOCKFISH_PATH to the engine executable."
            }
        }
    }
}

/// Filesystem access used by discovery.
///
/// Tests substitute an in-memory implementation.
pub trait FileProbe: Send + Sync {
    /// True if `path` names an existing file this process could execute.
    fn is_executable(&self, path: &Path) -> bool;
}

/// [`FileProbe`] backed by the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl FileProbe for SystemProbe {
    fn is_executable(&self, path: &Path) -> bool {
        let Ok(metadata) = std::fs::metadata(path) else {
            return false;
        };
        if !metadata.is_file() {
            return false;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            metadata.permissions().mode() & 0o111 != 0
        }
        #[cfg(not(unix))]
        {
            true
        }
    }
}

/// Which strategy produced a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    Override,
    KnownPath,
    SearchPath,
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationSource::Override => write!(f, "override"),
            LocationSource::KnownPath => write!(f, "known install location"),
            LocationSource::SearchPath => write!(f, "PATH"),
        }
    }
}

/// Outcome of engine discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLocation {
    /// A validated executable.
    Found { path: PathBuf, source: LocationSource },
    /// No strategy produced a usable executable.
    Unavailable,
}

impl EngineLocation {
    pub fn path(&self) -> Option<&Path> {
        match self {
            EngineLocation::Found { path, .. } => Some(path),
            EngineLocation::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, EngineLocation::Found { .. })
    }
}

/// One step of the discovery chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// An explicitly configured path.
    Override(PathBuf),
    /// Fixed candidate paths, checked in order.
    KnownPaths(Vec<PathBuf>),
    /// Look for `binary` in each directory, in order.
    SearchPath { dirs: Vec<PathBuf>, binary: String },
}

impl Strategy {
    /// Known install locations for `platform`.
    pub fn known_paths(platform: Platform) -> Self {
        Strategy::KnownPaths(platform.known_paths().iter().map(PathBuf::from).collect())
    }

    /// Directories of a `PATH`-style variable value.
    pub fn search_path(platform: Platform, path_var: Option<&OsString>) -> Self {
        let dirs = path_var
            .map(|value| std::env::split_paths(value).collect())
            .unwrap_or_default();
        Strategy::SearchPath {
            dirs,
            binary: platform.binary_name().to_string(),
        }
    }

    fn source(&self) -> LocationSource {
        match self {
            Strategy::Override(_) => LocationSource::Override,
            Strategy::KnownPaths(_) => LocationSource::KnownPath,
            Strategy::SearchPath { .. } => LocationSource::SearchPath,
        }
    }

    /// Run this step against `probe`.
    pub fn find(&self, probe: &dyn FileProbe) -> Option<PathBuf> {
        match self {
            Strategy::Override(path) => {
                if probe.is_executable(path) {
                    Some(path.clone())
                } else {
                    tracing::warn!(
                        path = %path.display(),
                        "Configured engine path is not an executable file, falling back to discovery"
                    );
                    None
                }
            }
            Strategy::KnownPaths(paths) => paths.iter().find(|p| probe.is_executable(p)).cloned(),
            Strategy::SearchPath { dirs, binary } => dirs
                .iter()
                .map(|dir| dir.join(binary))
                .find(|candidate| probe.is_executable(candidate)),
        }
    }
}

/// Write-once holder for the discovered location.
///
/// Concurrent first calls to [`LocationCache::get_or_init`] run the
/// initializer once; every caller observes the same value afterwards.
#[derive(Debug, Default)]
pub struct LocationCache {
    cell: OnceLock<EngineLocation>,
}

impl LocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_init(&self, init: impl FnOnce() -> EngineLocation) -> &EngineLocation {
        self.cell.get_or_init(init)
    }

    pub fn get(&self) -> Option<&EngineLocation> {
        self.cell.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

/// Discovers and caches the engine executable.
pub struct EngineLocator {
    strategies: Vec<Strategy>,
    probe: Arc<dyn FileProbe>,
    platform: Platform,
    cache: LocationCache,
}

impl EngineLocator {
    /// Create a locator from an explicit strategy chain and probe.
    pub fn new(strategies: Vec<Strategy>, probe: Arc<dyn FileProbe>, platform: Platform) -> Self {
        Self {
            strategies,
            probe,
            platform,
            cache: LocationCache::new(),
        }
    }

    /// The standard chain: overrides in order, known paths, then `PATH`.
    ///
    /// Empty override paths are skipped.
    pub fn standard(
        platform: Platform,
        overrides: Vec<PathBuf>,
        path_var: Option<OsString>,
        probe: Arc<dyn FileProbe>,
    ) -> Self {
        let mut strategies: Vec<Strategy> = overrides
            .into_iter()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Strategy::Override)
            .collect();
        strategies.push(Strategy::known_paths(platform));
        strategies.push(Strategy::search_path(platform, path_var.as_ref()));
        Self::new(strategies, probe, platform)
    }

    /// Standard chain for this process.
    ///
    /// `STOCKFISH_PATH` is tried before `configured`, and both before
    /// automatic discovery. A stale `STOCKFISH_PATH` falls through to the
    /// configured path.
    pub fn from_env(configured: Option<PathBuf>) -> Self {
        let overrides = std::env::var_os(ENGINE_PATH_VAR)
            .map(PathBuf::from)
            .into_iter()
            .chain(configured)
            .collect();
        Self::standard(
            Platform::current(),
            overrides,
            std::env::var_os("PATH"),
            Arc::new(SystemProbe),
        )
    }

    /// Run the discovery chain without touching the cache.
    pub fn locate(&self) -> EngineLocation {
        for strategy in &self.strategies {
            if let Some(path) = strategy.find(self.probe.as_ref()) {
                let source = strategy.source();
                tracing::info!(path = %path.display(), source = %source, "Engine located");
                return EngineLocation::Found { path, source };
            }
        }

        tracing::warn!(
            platform = ?self.platform,
            "No engine executable found; analysis requests will fail until one is installed"
        );
        EngineLocation::Unavailable
    }

    /// The cached location, discovering it on first use.
    pub fn location(&self) -> &EngineLocation {
        self.cache.get_or_init(|| self.locate())
    }

    /// Check that the cached location still holds an executable.
    ///
    /// The cache is not modified; a vanished executable is reported as
    /// [`EngineLocation::Unavailable`] to the caller only.
    pub fn revalidate(&self) -> EngineLocation {
        match self.location() {
            EngineLocation::Found { path, .. } if !self.probe.is_executable(path) => {
                tracing::warn!(path = %path.display(), "Cached engine executable is no longer usable");
                EngineLocation::Unavailable
            }
            location => location.clone(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.cache.is_initialized()
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Installation guidance for the locator's platform.
    pub fn install_help(&self) -> &'static str {
        self.platform.install_help()
    }
}
