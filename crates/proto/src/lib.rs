// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! BridgeKit wire schema.
//!
//! Hand-written `prost` messages for everything that crosses the UNIX-domain
//! socket, plus the segment metadata record embedded in V2 shared-memory
//! partitions:
//!
//! - [`rpc`]: the length-delimited frame envelope (call / reply / event) and codec
//! - [`metadata`]: `MediaSegmentMetadata`, the V2 shared-memory record
//! - [`mediapipeline`], [`webaudio`], [`mediakeys`], [`control`],
//!   [`servermanager`]: per-module request/response/event messages
//!
//! Field numbers are wire contract; renumbering is a protocol break.

pub mod control;
pub mod mediakeys;
pub mod mediapipeline;
pub mod metadata;
pub mod rpc;
pub mod servermanager;
pub mod webaudio;

pub use rpc::{Frame, FrameCodec, IpcError};
