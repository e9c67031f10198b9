// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Library portion of the BridgeKit session-server daemon, exposed for the
//! binary and for integration tests.

pub mod cdm;
pub mod cli;
pub mod config;
pub mod control_service;
pub mod heartbeat;
pub mod logging;
pub mod server;
pub mod services;
pub mod session;
pub mod state;
