// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! BridgeKit client façade.
//!
//! The pieces a sandboxed application links to drive the session server:
//!
//! - [`connection`]: the UNIX-socket RPC channel with call correlation
//! - [`active_requests`]: the per-session need-data ticket table
//! - [`pipeline`]: the media-pipeline session object and its state machine
//! - [`media_keys`]: CDM façade with the Netflix key-id-map bookkeeping
//! - [`control`]: application-state subscription and ping/ack replies
//! - [`web_audio`]: the low-latency PCM write path
//!
//! Control flows over RPC; payload bytes go straight into the shared-memory
//! arena disclosed by the server.

pub mod active_requests;
pub mod connection;
pub mod control;
pub mod media_keys;
pub mod pipeline;
pub mod web_audio;

pub use active_requests::{ActiveRequests, AddSegmentError};
pub use connection::{Connection, RpcChannel};
pub use control::ControlClient;
pub use media_keys::MediaKeys;
pub use pipeline::{ClientNotification, MediaPipeline};
pub use web_audio::WebAudioPlayer;
