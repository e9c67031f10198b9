// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The need-data ticket table.
//!
//! One entry per server ticket, holding the frame writer for the ticket's
//! partition window and the segments accepted so far. Fitness (space,
//! validity) is the writer's call; this table only enforces the one-ticket-
//! per-source-type rule and the per-ticket segment cap.

use std::collections::HashMap;

use bridgekit_core::constants::MAX_RECORDS;
use bridgekit_core::types::{MediaSegment, MediaType, ShmRegion};
use bridgekit_shm::writer::{FrameWriteError, FrameWriter};
use bridgekit_shm::version::MetadataVersion;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AddSegmentError {
    /// The ticket's window cannot accept this segment; finalise with
    /// no-available-samples and await a fresh ticket.
    #[error("no space left in the ticket window")]
    NoSpace,

    /// Malformed segment or unknown ticket; the segment is dropped.
    #[error("segment rejected: {0}")]
    Error(String),
}

impl From<FrameWriteError> for AddSegmentError {
    fn from(err: FrameWriteError) -> Self {
        match err {
            FrameWriteError::NoSpace => Self::NoSpace,
            FrameWriteError::Invalid(reason) => Self::Error(reason),
        }
    }
}

struct ActiveRequest {
    media_type: MediaType,
    writer: FrameWriter,
    segments: Vec<MediaSegment>,
}

/// Table of outstanding need-data tickets for one session.
#[derive(Default)]
pub struct ActiveRequests {
    entries: HashMap<u32, ActiveRequest>,
}

impl ActiveRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a ticket and initialises its partition window for writing.
    /// A stale ticket of the same source type is superseded.
    pub fn insert(
        &mut self,
        request_id: u32,
        media_type: MediaType,
        region: ShmRegion,
        buf: &mut [u8],
        version: MetadataVersion,
    ) -> Result<(), AddSegmentError> {
        self.erase_type(media_type);
        let writer = FrameWriter::begin(buf, region, version)
            .map_err(|e| AddSegmentError::Error(e.to_string()))?;
        self.entries.insert(
            request_id,
            ActiveRequest { media_type, writer, segments: Vec::new() },
        );
        Ok(())
    }

    /// Writes a segment against a ticket, delegating fitness to the writer.
    pub fn add_segment(
        &mut self,
        request_id: u32,
        segment: MediaSegment,
        buf: &mut [u8],
    ) -> Result<(), AddSegmentError> {
        let Some(entry) = self.entries.get_mut(&request_id) else {
            return Err(AddSegmentError::Error(format!("unknown request {request_id}")));
        };
        if entry.segments.len() >= MAX_RECORDS {
            return Err(AddSegmentError::NoSpace);
        }
        entry.writer.write_frame(buf, &segment)?;
        entry.segments.push(segment);
        Ok(())
    }

    /// Segments accepted so far against a ticket.
    pub fn segments(&self, request_id: u32) -> Option<&[MediaSegment]> {
        self.entries.get(&request_id).map(|e| e.segments.as_slice())
    }

    pub fn frames_written(&self, request_id: u32) -> u32 {
        self.entries.get(&request_id).map_or(0, |e| e.writer.frames_written())
    }

    pub fn media_type(&self, request_id: u32) -> Option<MediaType> {
        self.entries.get(&request_id).map(|e| e.media_type)
    }

    pub fn contains(&self, request_id: u32) -> bool {
        self.entries.contains_key(&request_id)
    }

    pub fn erase(&mut self, request_id: u32) {
        self.entries.remove(&request_id);
    }

    /// Invalidates every outstanding ticket of a source type (flush, seek,
    /// source removal). Idempotent.
    pub fn erase_type(&mut self, media_type: MediaType) {
        self.entries.retain(|_, entry| entry.media_type != media_type);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> ShmRegion {
        ShmRegion {
            metadata_offset: 0,
            max_metadata_bytes: 6,
            media_data_offset: 6,
            max_media_bytes: 250,
        }
    }

    fn audio_segment() -> MediaSegment {
        MediaSegment::new_audio(1, 0, 20_000_000, 48_000, 2, vec![1, 2, 3])
    }

    #[test]
    fn test_segments_accumulate_until_erase() {
        let mut buf = vec![0u8; 256];
        let mut table = ActiveRequests::new();
        table.insert(7, MediaType::Audio, region(), &mut buf, MetadataVersion::V2).unwrap();

        assert_eq!(table.segments(7).map(<[MediaSegment]>::len), Some(0));
        table.add_segment(7, audio_segment(), &mut buf).unwrap();
        table.add_segment(7, audio_segment(), &mut buf).unwrap();
        assert_eq!(table.segments(7).map(<[MediaSegment]>::len), Some(2));
        assert_eq!(table.frames_written(7), 2);

        table.erase(7);
        assert!(matches!(
            table.add_segment(7, audio_segment(), &mut buf),
            Err(AddSegmentError::Error(_))
        ));
    }

    #[test]
    fn test_one_ticket_per_source_type() {
        let mut buf = vec![0u8; 256];
        let mut table = ActiveRequests::new();
        table.insert(1, MediaType::Audio, region(), &mut buf, MetadataVersion::V2).unwrap();
        table.insert(2, MediaType::Audio, region(), &mut buf, MetadataVersion::V2).unwrap();
        // The fresh ticket superseded the stale one.
        assert!(!table.contains(1));
        assert!(table.contains(2));
    }

    #[test]
    fn test_erase_type_is_idempotent() {
        let mut buf = vec![0u8; 256];
        let mut table = ActiveRequests::new();
        table.insert(1, MediaType::Video, region(), &mut buf, MetadataVersion::V2).unwrap();
        table.erase_type(MediaType::Video);
        table.erase_type(MediaType::Video);
        assert!(!table.contains(1));
    }

    #[test]
    fn test_no_space_propagates_from_writer() {
        // Tiny media window: the second segment does not fit.
        let mut buf = vec![0u8; 64];
        let tight = ShmRegion {
            metadata_offset: 0,
            max_metadata_bytes: 6,
            media_data_offset: 6,
            max_media_bytes: 30,
        };
        let mut table = ActiveRequests::new();
        table.insert(3, MediaType::Audio, tight, &mut buf, MetadataVersion::V2).unwrap();
        table.add_segment(3, audio_segment(), &mut buf).unwrap();
        assert!(matches!(
            table.add_segment(3, audio_segment(), &mut buf),
            Err(AddSegmentError::NoSpace)
        ));
        // The refused segment was not recorded.
        assert_eq!(table.segments(3).map(<[MediaSegment]>::len), Some(1));
    }
}
