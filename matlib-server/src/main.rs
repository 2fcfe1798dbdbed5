//! matlib-server - material repository service
//!
//! Resolves the root folder, prepares its directory tree and serves the
//! repository, staging and preset endpoints over HTTP.

use anyhow::Result;
use clap::Parser;
use matlib_common::config::{RootFolderResolver, ROOT_FOLDER_ENV};
use matlib_server::config::ServerConfig;
use matlib_server::{build_router, AppState};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "matlib-server", version, about = "Material repository service")]
struct Cli {
    /// Root folder holding materials/, staging/ and projects/
    #[arg(long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(long, env = "MATLIB_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind (overrides config)
    #[arg(long, env = "MATLIB_BIND")]
    bind: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(long, env = "MATLIB_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolver = RootFolderResolver::new("matlib-server")
        .with_cli_root(cli.root_folder.clone())
        .with_cli_config(cli.config.clone());
    let toml_config = resolver.load_config();

    let default_directive: Directive = toml_config
        .logging
        .level
        .parse()
        .unwrap_or_else(|_| tracing::Level::INFO.into());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_directive))
        .init();

    // Build identification first, before any filesystem work
    info!(
        "Starting MatLib server (matlib-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolver.resolve_with(&toml_config);
    let mut config = ServerConfig::new(root_folder, &toml_config);
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    config.layout.ensure_directories()?;
    info!("Root folder: {}", config.root().display());
    info!("Material store: {}", config.store_path().display());

    if config.pbr_enabled && !config.pbr_script.exists() {
        warn!(
            script = %config.pbr_script.display(),
            "PBR script not found; uploads will report pbrStatus=error"
        );
    }

    let addr = config.socket_addr();
    let state = AppState::new(config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("matlib-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
