// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use clap::Parser;

/// BridgeKit session server: brokers media playback and DRM for sandboxed
/// client applications over a UNIX-domain socket.
#[derive(Parser, Debug)]
#[command(name = "bkitd", version, about)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    pub config: Option<std::path::PathBuf>,

    /// UNIX socket path to listen on (overrides the config file).
    #[arg(short, long)]
    pub socket: Option<std::path::PathBuf>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub dump_config: bool,
}
