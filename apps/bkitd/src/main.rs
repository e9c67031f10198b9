// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use std::sync::Arc;

use anyhow::Context;
use bridgekit_server::cdm::SoftCdm;
use bridgekit_server::cli::Cli;
use bridgekit_server::config::Config;
use bridgekit_server::{logging, server, state::ServerState};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config =
        Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(socket) = cli.socket {
        config.socket_path = socket;
    }

    if cli.dump_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let _log_guard = logging::init_logging(&config.log)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;
    tracing::info!(socket = %config.socket_path.display(), "bkitd starting");

    let listener = server::bind(&config.socket_path)
        .with_context(|| format!("failed to bind {}", config.socket_path.display()))?;
    let state = ServerState::new(config, Arc::new(SoftCdm::new()))
        .context("failed to create server state")?;

    tokio::select! {
        () = server::run(state, listener) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            tracing::info!("shutdown signal received");
        }
    }
    Ok(())
}
