// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! BridgeKit Core - data model shared by the client façade and the session server.
//!
//! This crate defines the vocabulary both sides of the broker speak:
//!
//! - [`types`]: media sources, segments, playback/session state projections
//! - [`error`]: error taxonomy and the workspace `Result` alias
//! - [`keyid`]: the CDM key-session ↔ key-id association used to stamp encrypted segments
//! - [`profiler`]: environment-gated bounded record ring for latency triage
//! - [`constants`]: fixed wire-layout numbers and timer defaults

// Module declarations
pub mod constants;
pub mod error;
pub mod keyid;
pub mod profiler;
pub mod types;

// Re-export the most commonly used types at the crate root
pub use error::{BridgeKitError, Result};
pub use types::{
    ApplicationState, MediaSegment, MediaSourceStatus, MediaType, NetworkState, PlaybackState,
    SegmentInfo, SessionId, ShmRegion, SourceId,
};
