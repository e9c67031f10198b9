// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Core data types that flow between the client façade and the session server.
//!
//! The central type is [`MediaSegment`]: one decodable unit with common
//! attributes plus a [`SegmentInfo`] tagged union for the audio/video/text
//! specifics. Payload-carrying fields use [`bytes::Bytes`] so segments clone
//! cheaply across actor boundaries.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::constants::MAX_EXTRA_DATA_SIZE;
use crate::error::BridgeKitError;

/// Server-minted handle identifying one playback session.
pub type SessionId = i32;

/// Identifies one track within a session.
pub type SourceId = i32;

/// The kind of track a source or segment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Audio,
    Video,
    Text,
    Unknown,
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
            Self::Text => write!(f, "text"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Alignment of the payload within a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentAlignment {
    #[default]
    Undefined,
    Nal,
    Au,
}

/// Process-wide lifecycle state pushed to every registered control.
///
/// Gates the data plane: client-side need-data events are ignored unless the
/// state is `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationState {
    #[default]
    Unknown,
    Inactive,
    Running,
}

/// Playback state of a session as observed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Unknown,
    Idle,
    Buffering,
    Playing,
    Paused,
    Seeking,
    SeekDone,
    Stopped,
    EndOfStream,
    Failure,
}

/// Network state of a session's transport, forwarded from the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkState {
    #[default]
    Unknown,
    Idle,
    Buffering,
    Buffered,
    FetchError,
    DecodeError,
}

/// Status finalising a need-data ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSourceStatus {
    Ok,
    Eos,
    Error,
    NoAvailableSamples,
}

/// Endianness/signedness description of a raw PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmConfig {
    pub rate: u32,
    pub channels: u32,
    pub sample_size: u32,
    pub is_big_endian: bool,
    pub is_signed: bool,
    pub is_float: bool,
}

impl Default for PcmConfig {
    /// Stereo 16-bit little-endian signed PCM, the conventional web-audio shape.
    fn default() -> Self {
        Self {
            rate: 48_000,
            channels: 2,
            sample_size: 16,
            is_big_endian: false,
            is_signed: true,
            is_float: false,
        }
    }
}

impl PcmConfig {
    /// Bytes occupied by one frame (one sample per channel).
    pub fn bytes_per_frame(&self) -> u32 {
        self.channels * (self.sample_size / 8)
    }
}

/// Track-specific configuration carried by an `attach_source` call.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    Audio {
        sample_rate: u32,
        channels: u32,
        sample_size: Option<u32>,
        is_big_endian: Option<bool>,
        is_signed: Option<bool>,
        is_float: Option<bool>,
    },
    Video {
        width: u32,
        height: u32,
        frame_rate: Option<f64>,
    },
    Text {
        format: TextTrackFormat,
    },
}

impl SourceConfig {
    pub fn media_type(&self) -> MediaType {
        match self {
            Self::Audio { .. } => MediaType::Audio,
            Self::Video { .. } => MediaType::Video,
            Self::Text { .. } => MediaType::Text,
        }
    }
}

/// Caption formats a text-track session can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextTrackFormat {
    WebVtt,
    Ttml,
    ClosedCaptions,
}

/// A media source attached to a session.
#[derive(Debug, Clone)]
pub struct MediaSource {
    pub source_id: SourceId,
    pub mime_type: String,
    pub config: SourceConfig,
    /// Opaque codec initialisation data, forwarded to the pipeline untouched.
    pub codec_data: Option<Bytes>,
    /// Whether segments of this source arrive encrypted.
    pub has_drm: bool,
}

/// One (clear, encrypted) byte-range pair of an encrypted payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubSample {
    pub num_clear_bytes: u32,
    pub num_encrypted_bytes: u32,
}

/// Encryption metadata attached to a segment when its payload is encrypted.
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptionInfo {
    /// CDM key-session that holds the decryption key.
    pub media_key_session_id: i32,
    pub key_id: Bytes,
    pub init_vector: Bytes,
    /// Initialise the cipher with the last 15 bytes of the IV.
    pub init_with_last_15: u32,
    /// Ordered sub-sample ranges; their sum must equal the payload length.
    pub sub_samples: Vec<SubSample>,
}

/// Audio-specific segment attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSegmentInfo {
    pub sample_rate: u32,
    pub channels: u32,
    /// Samples to clip from the start of the decoded output.
    pub clipping_start: Option<u64>,
    /// Samples to clip from the end of the decoded output.
    pub clipping_end: Option<u64>,
}

/// Video-specific segment attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoSegmentInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<f64>,
}

/// Type-specific side of a segment. The writers match on this tag instead of
/// downcasting.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentInfo {
    Audio(AudioSegmentInfo),
    Video(VideoSegmentInfo),
    Text,
    Unknown,
}

impl SegmentInfo {
    pub const fn media_type(&self) -> MediaType {
        match self {
            Self::Audio(_) => MediaType::Audio,
            Self::Video(_) => MediaType::Video,
            Self::Text => MediaType::Text,
            Self::Unknown => MediaType::Unknown,
        }
    }
}

/// One decodable media unit.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSegment {
    pub source_id: SourceId,
    /// Presentation timestamp in nanoseconds.
    pub time_position: i64,
    /// Sample duration in nanoseconds.
    pub sample_duration: i64,
    pub data: Bytes,
    /// Optional out-of-band bytes, at most [`MAX_EXTRA_DATA_SIZE`].
    pub extra_data: Option<Bytes>,
    pub alignment: SegmentAlignment,
    pub codec_data: Option<Bytes>,
    pub info: SegmentInfo,
    /// Present iff the payload is encrypted.
    pub encryption: Option<EncryptionInfo>,
}

impl MediaSegment {
    /// Convenience constructor for a clear audio segment.
    pub fn new_audio(
        source_id: SourceId,
        time_position: i64,
        sample_duration: i64,
        sample_rate: u32,
        channels: u32,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            source_id,
            time_position,
            sample_duration,
            data: data.into(),
            extra_data: None,
            alignment: SegmentAlignment::Undefined,
            codec_data: None,
            info: SegmentInfo::Audio(AudioSegmentInfo {
                sample_rate,
                channels,
                clipping_start: None,
                clipping_end: None,
            }),
            encryption: None,
        }
    }

    /// Convenience constructor for a clear video segment.
    pub fn new_video(
        source_id: SourceId,
        time_position: i64,
        sample_duration: i64,
        width: u32,
        height: u32,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            source_id,
            time_position,
            sample_duration,
            data: data.into(),
            extra_data: None,
            alignment: SegmentAlignment::Undefined,
            codec_data: None,
            info: SegmentInfo::Video(VideoSegmentInfo { width, height, frame_rate: None }),
            encryption: None,
        }
    }

    pub const fn media_type(&self) -> MediaType {
        self.info.media_type()
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_some()
    }

    /// Validates the invariants every segment must satisfy before it is
    /// accepted against a ticket:
    /// extra-data bound, non-empty key id / IV when encrypted, and
    /// sub-sample ranges summing to the payload length.
    pub fn validate(&self) -> Result<(), BridgeKitError> {
        if let Some(extra) = &self.extra_data {
            if extra.len() > MAX_EXTRA_DATA_SIZE {
                return Err(BridgeKitError::Protocol(format!(
                    "extra data of {} bytes exceeds the {MAX_EXTRA_DATA_SIZE} byte limit",
                    extra.len()
                )));
            }
        }
        if let Some(enc) = &self.encryption {
            if enc.key_id.is_empty() {
                return Err(BridgeKitError::Protocol(
                    "encrypted segment without a key id".to_string(),
                ));
            }
            if enc.init_vector.is_empty() {
                return Err(BridgeKitError::Protocol(
                    "encrypted segment without an init vector".to_string(),
                ));
            }
            if !enc.sub_samples.is_empty() {
                let total: u64 = enc
                    .sub_samples
                    .iter()
                    .map(|s| u64::from(s.num_clear_bytes) + u64::from(s.num_encrypted_bytes))
                    .sum();
                if total != self.data.len() as u64 {
                    return Err(BridgeKitError::Protocol(format!(
                        "sub-sample ranges cover {total} bytes, payload is {}",
                        self.data.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Snapshot of one shared-memory sub-range, republished with every
/// need-data ticket so writer and reader agree without locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShmRegion {
    pub metadata_offset: u32,
    pub max_metadata_bytes: u32,
    pub media_data_offset: u32,
    pub max_media_bytes: u32,
}

impl ShmRegion {
    /// End offset (exclusive) of the region within the arena.
    pub const fn end(&self) -> u32 {
        let meta_end = self.metadata_offset + self.max_metadata_bytes;
        let media_end = self.media_data_offset + self.max_media_bytes;
        if meta_end > media_end {
            meta_end
        } else {
            media_end
        }
    }
}

/// Rectangle describing the video window placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Sample-drop counters decoded from a pipeline QoS message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QosInfo {
    pub processed: u64,
    pub dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypted_segment_requires_key_and_iv() {
        let mut segment = MediaSegment::new_video(1, 0, 0, 640, 480, vec![0u8; 9]);
        segment.encryption = Some(EncryptionInfo {
            media_key_session_id: 7,
            key_id: Bytes::new(),
            init_vector: Bytes::from_static(&[1, 2]),
            init_with_last_15: 0,
            sub_samples: vec![],
        });
        assert!(segment.validate().is_err());

        if let Some(enc) = segment.encryption.as_mut() {
            enc.key_id = Bytes::from_static(&[9]);
            enc.init_vector = Bytes::new();
        }
        assert!(segment.validate().is_err());
    }

    #[test]
    fn test_sub_samples_must_cover_payload() {
        let mut segment = MediaSegment::new_video(1, 0, 0, 640, 480, vec![0u8; 9]);
        segment.encryption = Some(EncryptionInfo {
            media_key_session_id: 7,
            key_id: Bytes::from_static(&[1]),
            init_vector: Bytes::from_static(&[2]),
            init_with_last_15: 0,
            sub_samples: vec![SubSample { num_clear_bytes: 2, num_encrypted_bytes: 7 }],
        });
        assert!(segment.validate().is_ok());

        if let Some(enc) = segment.encryption.as_mut() {
            enc.sub_samples = vec![SubSample { num_clear_bytes: 2, num_encrypted_bytes: 6 }];
        }
        assert!(segment.validate().is_err());
    }

    #[test]
    fn test_extra_data_bound() {
        let mut segment = MediaSegment::new_audio(1, 0, 0, 48_000, 2, vec![0u8; 4]);
        segment.extra_data = Some(Bytes::from(vec![0u8; MAX_EXTRA_DATA_SIZE]));
        assert!(segment.validate().is_ok());
        segment.extra_data = Some(Bytes::from(vec![0u8; MAX_EXTRA_DATA_SIZE + 1]));
        assert!(segment.validate().is_err());
    }

    #[test]
    fn test_shm_region_end() {
        let region = ShmRegion {
            metadata_offset: 0,
            max_metadata_bytes: 6,
            media_data_offset: 6,
            max_media_bytes: 250,
        };
        assert_eq!(region.end(), 256);
    }
}
