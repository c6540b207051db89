//! Analysis Server
//!
//! Serves Stockfish analysis of chess positions over HTTP.

use std::path::PathBuf;

use analysis_server::config::ServerConfig;
use analysis_server::{build_service, router, AppState};
use anyhow::Context;
use chess_analysis::EngineLocation;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

/// Analysis Server - Evaluates chess positions with Stockfish.
#[derive(Parser, Debug)]
#[command(name = "analysis-server")]
#[command(about = "Serves Stockfish analysis of chess positions over HTTP")]
struct Args {
    /// Path to the configuration file (default: analysis.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Stockfish executable (STOCKFISH_PATH still takes precedence)
    #[arg(long)]
    engine: Option<PathBuf>,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                anyhow::ensure!(path.exists(), "Config file {} not found", path.display());
                ServerConfig::load_from(path)?
            }
            None => ServerConfig::load()?,
        };

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(engine) = &self.engine {
            config.engine.path = Some(engine.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl+c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.load_config().context("Failed to load configuration")?;

    let service = build_service(&config);
    match service.warm_up().await {
        EngineLocation::Found { path, source } => {
            tracing::info!(path = %path.display(), source = %source, "Using Stockfish");
        }
        EngineLocation::Unavailable => {
            tracing::warn!(
                help = service.locator().install_help(),
                "Stockfish not found; /api/analyze will fail until it is installed"
            );
        }
    }

    let app = router(AppState::new(service), &config);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_overrides() {
        let args = Args::try_parse_from([
            "analysis-server",
            "--host",
            "0.0.0.0",
            "--port",
            "9001",
            "--engine",
            "/opt/sf",
        ])
        .unwrap();
        assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.port, Some(9001));
        assert_eq!(args.engine, Some(PathBuf::from("/opt/sf")));
        assert!(args.config.is_none());
    }

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "port = 7000\nhost = \"10.0.0.1\"\n").unwrap();

        let args = Args::try_parse_from([
            "analysis-server",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "7001",
        ])
        .unwrap();
        let config = args.load_config().unwrap();
        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.port, 7001);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let args =
            Args::try_parse_from(["analysis-server", "--config", "/nonexistent/analysis.toml"])
                .unwrap();
        assert!(args.load_config().is_err());
    }
}
