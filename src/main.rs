use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;

use cleaning_audit::audit::{store_keychain_password, AuditorCredential};
use cleaning_audit::config::AppConfig;
use cleaning_audit::server::{router, AppState};
use cleaning_audit::{init_tracing, CleaningAuditError};

#[derive(Debug, Parser)]
#[command(name = "cleaning-audit", version, about = "Room cleaning audit service")]
struct Cli {
    /// TOML config file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where the HTTP API will listen, e.g. 127.0.0.1:8080
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Directory for report files.
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Read a password from stdin and store it in the OS keychain.
    SetAuditorPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Some(Command::SetAuditorPassword) => set_auditor_password(),
        Some(Command::Serve) | None => {
            let mut config = AppConfig::load(cli.config.as_deref())?;
            config.apply_env();
            if let Some(listen) = cli.listen {
                config.listen = listen;
            }
            if let Some(dir) = cli.reports_dir {
                config.reports_dir = dir;
            }
            serve(config).await
        }
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let credential = AuditorCredential::resolve();
    let state = AppState::from_config(&config, credential)?;
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!("Listening on http://{}", config.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

fn set_auditor_password() -> anyhow::Result<()> {
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    store_keychain_password(&line).map_err(CleaningAuditError::Keychain)?;
    info!("Auditor password saved");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
