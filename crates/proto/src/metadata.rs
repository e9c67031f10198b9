// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! `MediaSegmentMetadata`: the structured record prefixed to every segment in
//! a V2 shared-memory partition.
//!
//! All fields are optional on the wire; which ones are present depends on the
//! media type of the segment and on whether it is encrypted. The conversion
//! helpers to and from [`bridgekit_core::types::MediaSegment`] live here so
//! the shm writer and reader agree on exactly one mapping.

use bridgekit_core::types::{
    AudioSegmentInfo, EncryptionInfo, MediaSegment, SegmentInfo, SubSample, VideoSegmentInfo,
};
use bytes::Bytes;

/// Alignment of the payload within the segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SegmentAlignment {
    AlignmentUndefined = 0,
    AlignmentNal = 1,
    AlignmentAu = 2,
}

/// One (clear, encrypted) range pair of an encrypted payload.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SubSampleInfo {
    #[prost(uint32, tag = "1")]
    pub num_clear_bytes: u32,
    #[prost(uint32, tag = "2")]
    pub num_encrypted_bytes: u32,
}

/// The V2 per-segment metadata record.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MediaSegmentMetadata {
    /// Payload length in bytes; the payload follows this record directly.
    #[prost(uint32, optional, tag = "1")]
    pub length: Option<u32>,
    /// Presentation timestamp in nanoseconds.
    #[prost(int64, optional, tag = "2")]
    pub time_position: Option<i64>,
    /// Sample duration in nanoseconds.
    #[prost(int64, optional, tag = "3")]
    pub sample_duration: Option<i64>,
    /// Source id of the track this segment belongs to.
    #[prost(uint32, optional, tag = "4")]
    pub stream_id: Option<u32>,
    #[prost(bytes = "bytes", optional, tag = "5")]
    pub extra_data: Option<Bytes>,
    #[prost(enumeration = "SegmentAlignment", optional, tag = "6")]
    pub segment_alignment: Option<i32>,
    #[prost(bytes = "bytes", optional, tag = "7")]
    pub codec_data: Option<Bytes>,

    // Audio specifics
    #[prost(uint32, optional, tag = "8")]
    pub sample_rate: Option<u32>,
    #[prost(uint32, optional, tag = "9")]
    pub channels_num: Option<u32>,
    #[prost(uint64, optional, tag = "10")]
    pub clipping_start: Option<u64>,
    #[prost(uint64, optional, tag = "11")]
    pub clipping_end: Option<u64>,

    // Video specifics
    #[prost(uint32, optional, tag = "12")]
    pub width: Option<u32>,
    #[prost(uint32, optional, tag = "13")]
    pub height: Option<u32>,
    #[prost(double, optional, tag = "14")]
    pub frame_rate: Option<f64>,

    // Encryption block, present iff the payload is encrypted
    #[prost(int32, optional, tag = "15")]
    pub media_key_session_id: Option<i32>,
    #[prost(bytes = "bytes", optional, tag = "16")]
    pub key_id: Option<Bytes>,
    #[prost(bytes = "bytes", optional, tag = "17")]
    pub init_vector: Option<Bytes>,
    #[prost(uint32, optional, tag = "18")]
    pub init_with_last_15: Option<u32>,
    #[prost(message, repeated, tag = "19")]
    pub sub_sample_info: Vec<SubSampleInfo>,
}

impl MediaSegmentMetadata {
    /// Builds the wire record for a segment. Fails for segments of unknown
    /// media type, which have no V2 representation.
    pub fn from_segment(segment: &MediaSegment) -> Option<Self> {
        let mut metadata = Self {
            length: Some(u32::try_from(segment.data.len()).ok()?),
            time_position: Some(segment.time_position),
            sample_duration: Some(segment.sample_duration),
            stream_id: Some(u32::try_from(segment.source_id).ok()?),
            extra_data: segment.extra_data.clone(),
            segment_alignment: match segment.alignment {
                bridgekit_core::types::SegmentAlignment::Undefined => None,
                bridgekit_core::types::SegmentAlignment::Nal => {
                    Some(SegmentAlignment::AlignmentNal as i32)
                }
                bridgekit_core::types::SegmentAlignment::Au => {
                    Some(SegmentAlignment::AlignmentAu as i32)
                }
            },
            codec_data: segment.codec_data.clone(),
            ..Self::default()
        };
        match &segment.info {
            SegmentInfo::Audio(audio) => {
                metadata.sample_rate = Some(audio.sample_rate);
                metadata.channels_num = Some(audio.channels);
                metadata.clipping_start = audio.clipping_start;
                metadata.clipping_end = audio.clipping_end;
            }
            SegmentInfo::Video(video) => {
                metadata.width = Some(video.width);
                metadata.height = Some(video.height);
                metadata.frame_rate = video.frame_rate;
            }
            SegmentInfo::Text => {}
            SegmentInfo::Unknown => return None,
        }
        if let Some(enc) = &segment.encryption {
            metadata.media_key_session_id = Some(enc.media_key_session_id);
            metadata.key_id = Some(enc.key_id.clone());
            metadata.init_vector = Some(enc.init_vector.clone());
            metadata.init_with_last_15 = Some(enc.init_with_last_15);
            metadata.sub_sample_info = enc
                .sub_samples
                .iter()
                .map(|s| SubSampleInfo {
                    num_clear_bytes: s.num_clear_bytes,
                    num_encrypted_bytes: s.num_encrypted_bytes,
                })
                .collect();
        }
        Some(metadata)
    }

    /// Reconstructs a segment from the wire record and its payload bytes.
    /// `media_type` disambiguates records that carry neither audio nor video
    /// specifics (text segments).
    pub fn into_segment(
        self,
        media_type: bridgekit_core::types::MediaType,
        data: Bytes,
    ) -> MediaSegment {
        let info = if self.sample_rate.is_some() || self.channels_num.is_some() {
            SegmentInfo::Audio(AudioSegmentInfo {
                sample_rate: self.sample_rate.unwrap_or_default(),
                channels: self.channels_num.unwrap_or_default(),
                clipping_start: self.clipping_start,
                clipping_end: self.clipping_end,
            })
        } else if self.width.is_some() || self.height.is_some() {
            SegmentInfo::Video(VideoSegmentInfo {
                width: self.width.unwrap_or_default(),
                height: self.height.unwrap_or_default(),
                frame_rate: self.frame_rate,
            })
        } else if media_type == bridgekit_core::types::MediaType::Text {
            SegmentInfo::Text
        } else {
            SegmentInfo::Unknown
        };

        let encryption = self.media_key_session_id.map(|mks_id| EncryptionInfo {
            media_key_session_id: mks_id,
            key_id: self.key_id.clone().unwrap_or_default(),
            init_vector: self.init_vector.clone().unwrap_or_default(),
            init_with_last_15: self.init_with_last_15.unwrap_or_default(),
            sub_samples: self
                .sub_sample_info
                .iter()
                .map(|s| SubSample {
                    num_clear_bytes: s.num_clear_bytes,
                    num_encrypted_bytes: s.num_encrypted_bytes,
                })
                .collect(),
        });

        MediaSegment {
            source_id: self.stream_id.unwrap_or_default() as i32,
            time_position: self.time_position.unwrap_or_default(),
            sample_duration: self.sample_duration.unwrap_or_default(),
            data,
            extra_data: self.extra_data,
            alignment: match SegmentAlignment::try_from(self.segment_alignment.unwrap_or(0)) {
                Ok(SegmentAlignment::AlignmentNal) => {
                    bridgekit_core::types::SegmentAlignment::Nal
                }
                Ok(SegmentAlignment::AlignmentAu) => bridgekit_core::types::SegmentAlignment::Au,
                _ => bridgekit_core::types::SegmentAlignment::Undefined,
            },
            codec_data: self.codec_data,
            info,
            encryption,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridgekit_core::types::MediaType;

    #[test]
    fn test_unknown_media_type_has_no_record() {
        let segment = MediaSegment {
            info: SegmentInfo::Unknown,
            ..MediaSegment::new_audio(1, 0, 0, 48_000, 2, vec![1, 2])
        };
        assert!(MediaSegmentMetadata::from_segment(&segment).is_none());
    }

    #[test]
    fn test_metadata_roundtrip_preserves_encryption() {
        let mut segment = MediaSegment::new_video(1, 1_423_435, 12_324, 1024, 768, vec![0u8; 9]);
        segment.encryption = Some(EncryptionInfo {
            media_key_session_id: 43,
            key_id: Bytes::from_static(&[9, 2, 6, 2, 0, 1]),
            init_vector: Bytes::from_static(&[34, 53, 54, 62, 56]),
            init_with_last_15: 1,
            sub_samples: vec![SubSample { num_clear_bytes: 2, num_encrypted_bytes: 7 }],
        });

        let metadata = MediaSegmentMetadata::from_segment(&segment).unwrap();
        let rebuilt = metadata.into_segment(MediaType::Video, segment.data.clone());
        assert_eq!(rebuilt, segment);
    }
}
