// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! BridgeKit shared-memory data path.
//!
//! One fd-backed region carries every media payload between the client and
//! the server. This crate owns the pieces both sides must agree on:
//!
//! - [`arena`]: creating/opening the region and carving it into
//!   non-overlapping per-(session, source) partitions
//! - [`codec`]: the little-endian primitive byte codec
//! - [`writer`]: the versioned frame-writer contract and factory
//! - [`writer_v1`] / [`writer_v2`]: fixed-layout and protobuf-prefixed
//!   segment encodings
//! - [`reader`]: the matching decoders the server uses to re-materialise
//!   segments
//! - [`version`]: metadata-version negotiation
//!
//! Synchronisation is by protocol, not by locks: a partition has exactly one
//! writer between a need-data ticket and its matching have-data, and the
//! reader only looks after have-data arrives.

pub mod arena;
pub mod codec;
pub mod reader;
pub mod version;
pub mod writer;
pub mod writer_v1;
pub mod writer_v2;

pub use arena::{ArenaConfig, ArenaLayout, SharedMemoryArena};
pub use reader::read_segments;
pub use writer::{FrameWriteError, FrameWriter};
pub use writer_v1::FrameWriterV1;
pub use writer_v2::FrameWriterV2;
