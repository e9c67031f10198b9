// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The frame-writer contract and the version-dispatching wrapper.
//!
//! A writer is created when a need-data ticket opens a partition window and
//! lives until the matching have-data. It is pure cursor state: the caller
//! passes the mapped arena slice into every call, which keeps the writers
//! trivially testable against plain buffers.

use bridgekit_core::types::{MediaSegment, ShmRegion};
use thiserror::Error;

use crate::codec::CodecError;
use crate::version::MetadataVersion;
use crate::writer_v1::FrameWriterV1;
use crate::writer_v2::FrameWriterV2;

/// Why a segment could not be written.
#[derive(Debug, Error)]
pub enum FrameWriteError {
    /// The remaining bytes of the partition window cannot accept this
    /// segment. Nothing was written; the caller should finalise the ticket
    /// and wait for a fresh one.
    #[error("not enough space left in the partition window")]
    NoSpace,

    /// The segment violates the protocol (unknown media type, malformed
    /// fields, serialization failure). The segment is dropped.
    #[error("invalid segment: {0}")]
    Invalid(String),
}

impl From<CodecError> for FrameWriteError {
    fn from(err: CodecError) -> Self {
        // Space is checked before any byte is written, so a codec bounds
        // failure means the published window exceeds the mapped region.
        Self::Invalid(err.to_string())
    }
}

/// Version-dispatching frame writer for one partition window.
#[derive(Debug)]
pub enum FrameWriter {
    V1(FrameWriterV1),
    V2(FrameWriterV2),
}

impl FrameWriter {
    /// Initialises the partition for `version` (zeroes the metadata region
    /// and stamps the version word) and returns the writer.
    pub fn begin(
        buf: &mut [u8],
        region: ShmRegion,
        version: MetadataVersion,
    ) -> Result<Self, FrameWriteError> {
        match version {
            MetadataVersion::V1 => Ok(Self::V1(FrameWriterV1::begin(buf, region)?)),
            MetadataVersion::V2 => Ok(Self::V2(FrameWriterV2::begin(buf, region)?)),
        }
    }

    /// Serialises one segment into the window. On success internal cursors
    /// advance; on failure nothing persists.
    pub fn write_frame(
        &mut self,
        buf: &mut [u8],
        segment: &MediaSegment,
    ) -> Result<(), FrameWriteError> {
        match self {
            Self::V1(writer) => writer.write_frame(buf, segment),
            Self::V2(writer) => writer.write_frame(buf, segment),
        }
    }

    /// Segments successfully written in this writer's lifetime.
    pub const fn frames_written(&self) -> u32 {
        match self {
            Self::V1(writer) => writer.frames_written(),
            Self::V2(writer) => writer.frames_written(),
        }
    }

    pub const fn version(&self) -> MetadataVersion {
        match self {
            Self::V1(_) => MetadataVersion::V1,
            Self::V2(_) => MetadataVersion::V2,
        }
    }
}
