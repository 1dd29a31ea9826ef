use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use numbercontest_table::{serve, AppState, TableConfig};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Number contest table host")]
struct Args {
    /// YAML config file; environment variables are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => TableConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TableConfig::from_env(),
    };
    config.validate().context("invalid table config")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level()?)
        .init();

    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        %addr,
        min_players = config.min_players,
        decision_window_ms = config.contest.decision_window_ms,
        "contest table listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(?err, "failed to listen for ctrl-c");
            return;
        }
        info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    let state = AppState::new(&config);
    serve(listener, state, config, shutdown_rx).await?;
    Ok(())
}
