// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Frame readers for both metadata layouts.
//!
//! The server only reads a partition after the matching have-data arrived, so
//! the writer's cursor discipline guarantees `num_frames` complete records.
//! The version word at the start of the metadata region selects the decoder;
//! a reader never guesses.

use bridgekit_core::constants::{
    ENCRYPTION_METADATA_SIZE_BYTES, MAX_EXTRA_DATA_SIZE, METADATA_V1_SIZE_PER_FRAME_BYTES,
};
use bridgekit_core::types::{
    AudioSegmentInfo, MediaSegment, MediaType, SegmentAlignment, SegmentInfo, ShmRegion,
    VideoSegmentInfo,
};
use bridgekit_proto::metadata::MediaSegmentMetadata;
use bytes::Bytes;
use prost::Message;
use thiserror::Error;

use crate::codec::{self, CodecError};
use crate::version::MetadataVersion;

#[derive(Debug, Error)]
pub enum FrameReadError {
    #[error("partition carries unknown metadata version {0}")]
    UnknownVersion(u32),

    #[error("record {index} is truncated: {source}")]
    Truncated {
        index: u32,
        #[source]
        source: CodecError,
    },

    #[error("record {index} failed to decode: {source}")]
    Decode {
        index: u32,
        #[source]
        source: prost::DecodeError,
    },

    #[error("metadata V1 cannot describe {0} segments")]
    UnsupportedType(MediaType),
}

/// Decodes `num_frames` segments out of a partition, dispatching on the
/// version word the writer stamped.
pub fn read_segments(
    buf: &[u8],
    region: ShmRegion,
    media_type: MediaType,
    num_frames: u32,
) -> Result<Vec<MediaSegment>, FrameReadError> {
    let (version, _) = codec::read_u32(buf, region.metadata_offset as usize)
        .map_err(|source| FrameReadError::Truncated { index: 0, source })?;
    match MetadataVersion::from_u32(version) {
        Some(MetadataVersion::V1) => read_v1(buf, region, media_type, num_frames),
        Some(MetadataVersion::V2) => read_v2(buf, region, media_type, num_frames),
        None => Err(FrameReadError::UnknownVersion(version)),
    }
}

fn read_v1(
    buf: &[u8],
    region: ShmRegion,
    media_type: MediaType,
    num_frames: u32,
) -> Result<Vec<MediaSegment>, FrameReadError> {
    let mut segments = Vec::with_capacity(num_frames as usize);
    let mut off = region.metadata_offset as usize + 4;
    for index in 0..num_frames {
        let truncated = |source| FrameReadError::Truncated { index, source };
        let block_start = off;

        let (media_offset, next) = codec::read_u32(buf, off).map_err(truncated)?;
        let (length, next) = codec::read_u32(buf, next).map_err(truncated)?;
        let (time_position, next) = codec::read_i64(buf, next).map_err(truncated)?;
        let (sample_duration, next) = codec::read_i64(buf, next).map_err(truncated)?;
        let (source_id, next) = codec::read_u32(buf, next).map_err(truncated)?;
        let (extra_len, next) = codec::read_u32(buf, next).map_err(truncated)?;
        let extra_len = (extra_len as usize).min(MAX_EXTRA_DATA_SIZE);
        let (extra, _) = codec::read_bytes(buf, next, extra_len).map_err(truncated)?;
        let extra_data =
            if extra.is_empty() { None } else { Some(Bytes::copy_from_slice(extra)) };

        // Skip the zero pad and the reserved encryption block to the tail.
        let tail = next + (MAX_EXTRA_DATA_SIZE - extra_len) + ENCRYPTION_METADATA_SIZE_BYTES;
        let (word_a, next) = codec::read_u32(buf, tail).map_err(truncated)?;
        let (word_b, _) = codec::read_u32(buf, next).map_err(truncated)?;

        let info = match media_type {
            MediaType::Audio => SegmentInfo::Audio(AudioSegmentInfo {
                sample_rate: word_a,
                channels: word_b,
                clipping_start: None,
                clipping_end: None,
            }),
            MediaType::Video => SegmentInfo::Video(VideoSegmentInfo {
                width: word_a,
                height: word_b,
                frame_rate: None,
            }),
            MediaType::Text | MediaType::Unknown => {
                return Err(FrameReadError::UnsupportedType(media_type))
            }
        };

        let (data, _) =
            codec::read_bytes(buf, media_offset as usize, length as usize).map_err(truncated)?;

        segments.push(MediaSegment {
            source_id: source_id as i32,
            time_position,
            sample_duration,
            data: Bytes::copy_from_slice(data),
            extra_data,
            alignment: SegmentAlignment::Undefined,
            codec_data: None,
            info,
            encryption: None,
        });
        off = block_start + METADATA_V1_SIZE_PER_FRAME_BYTES;
    }
    Ok(segments)
}

fn read_v2(
    buf: &[u8],
    region: ShmRegion,
    media_type: MediaType,
    num_frames: u32,
) -> Result<Vec<MediaSegment>, FrameReadError> {
    let mut segments = Vec::with_capacity(num_frames as usize);
    let mut off = region.media_data_offset as usize;
    for index in 0..num_frames {
        let truncated = |source| FrameReadError::Truncated { index, source };

        let (metadata_size, next) = codec::read_u32(buf, off).map_err(truncated)?;
        let (record, next) =
            codec::read_bytes(buf, next, metadata_size as usize).map_err(truncated)?;
        let metadata = MediaSegmentMetadata::decode(record)
            .map_err(|source| FrameReadError::Decode { index, source })?;
        let length = metadata.length.unwrap_or(0) as usize;
        let (data, next) = codec::read_bytes(buf, next, length).map_err(truncated)?;

        segments.push(metadata.into_segment(media_type, Bytes::copy_from_slice(data)));
        off = next;
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::FrameWriter;
    use bridgekit_core::types::{EncryptionInfo, SubSample};

    fn region(total: u32, max_metadata: u32) -> ShmRegion {
        ShmRegion {
            metadata_offset: 0,
            max_metadata_bytes: max_metadata,
            media_data_offset: max_metadata,
            max_media_bytes: total - max_metadata,
        }
    }

    #[test]
    fn test_v1_roundtrip_of_three_audio_segments() {
        let reg = region(4 + 3 * 104 + 64, 4 + 3 * 104);
        let mut buf = vec![0u8; reg.end() as usize];
        let mut writer = FrameWriter::begin(&mut buf, reg, MetadataVersion::V1).unwrap();

        let timestamps = [0i64, 2_000_000_000, 3_000_000_000];
        let durations = [1_000_000_000i64, 2_000_000_000, 1_000_000_000];
        for (ts, dur) in timestamps.iter().zip(durations.iter()) {
            let mut segment = MediaSegment::new_audio(2, *ts, *dur, 44_100, 2, vec![7, 8, 9]);
            segment.extra_data = Some(Bytes::from_static(&[1, 2]));
            writer.write_frame(&mut buf, &segment).unwrap();
        }

        let segments = read_segments(&buf, reg, MediaType::Audio, 3).unwrap();
        assert_eq!(segments.len(), 3);
        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.time_position, timestamps[i]);
            assert_eq!(segment.sample_duration, durations[i]);
            assert_eq!(segment.source_id, 2);
            assert_eq!(segment.extra_data.as_deref(), Some(&[1, 2][..]));
            assert_eq!(&segment.data[..], &[7, 8, 9]);
            assert!(segment.encryption.is_none());
            let SegmentInfo::Audio(audio) = &segment.info else {
                panic!("expected an audio segment");
            };
            assert_eq!(audio.sample_rate, 44_100);
            assert_eq!(audio.channels, 2);
        }
    }

    #[test]
    fn test_v2_roundtrip_preserves_every_field() {
        let reg = region(256, 6);
        let mut buf = vec![0u8; 256];
        let mut writer = FrameWriter::begin(&mut buf, reg, MetadataVersion::V2).unwrap();

        let mut segment =
            MediaSegment::new_video(1, 1_423_435, 12_324, 1024, 768, vec![0u8; 9]);
        segment.extra_data = Some(Bytes::from_static(&[5, 6, 7]));
        segment.codec_data = Some(Bytes::from_static(&[0xC0]));
        segment.alignment = SegmentAlignment::Au;
        segment.encryption = Some(EncryptionInfo {
            media_key_session_id: 43,
            key_id: Bytes::from_static(&[9, 2, 6, 2, 0, 1]),
            init_vector: Bytes::from_static(&[34, 53, 54, 62, 56]),
            init_with_last_15: 1,
            sub_samples: vec![SubSample { num_clear_bytes: 2, num_encrypted_bytes: 7 }],
        });
        writer.write_frame(&mut buf, &segment).unwrap();

        let segments = read_segments(&buf, reg, MediaType::Video, 1).unwrap();
        assert_eq!(segments, vec![segment]);
    }

    #[test]
    fn test_unknown_version_is_refused() {
        let reg = region(64, 6);
        let mut buf = vec![0u8; 64];
        buf[0] = 9;
        assert!(matches!(
            read_segments(&buf, reg, MediaType::Audio, 1),
            Err(FrameReadError::UnknownVersion(9))
        ));
    }
}
