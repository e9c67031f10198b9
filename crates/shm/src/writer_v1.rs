// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! V1 frame writer: fixed-offset metadata blocks.
//!
//! The metadata region opens with a `u32` version word followed by up to
//! `(max_metadata_bytes - 4) / 104` blocks of exactly
//! [`METADATA_V1_SIZE_PER_FRAME_BYTES`]:
//!
//! ```text
//! u32 media_offset; u32 length; i64 timestamp; i64 duration;
//! u32 source_id; u32 extra_data_len; extra_data zero-padded to 32 bytes;
//! 32 reserved (zeroed) encryption bytes;
//! audio: u32 sample_rate; u32 channels | video: u32 width; u32 height
//! ```
//!
//! Payloads are placed sequentially at the media offset, contiguous and
//! monotonically advancing. V1 carries no encryption metadata beyond the
//! zero-filled placeholder; the tail is defined only for audio and video.

use bridgekit_core::constants::{
    ENCRYPTION_METADATA_SIZE_BYTES, MAX_EXTRA_DATA_SIZE, METADATA_V1_SIZE_PER_FRAME_BYTES,
};
use bridgekit_core::types::{MediaSegment, SegmentInfo, ShmRegion};

use crate::codec;
use crate::version::MetadataVersion;
use crate::writer::FrameWriteError;

#[derive(Debug)]
pub struct FrameWriterV1 {
    region: ShmRegion,
    metadata_offset: usize,
    metadata_bytes_written: usize,
    media_offset: usize,
    media_bytes_written: usize,
    num_frames: u32,
}

impl FrameWriterV1 {
    /// Zeroes the metadata region and stamps the version word.
    pub fn begin(buf: &mut [u8], region: ShmRegion) -> Result<Self, FrameWriteError> {
        let metadata_offset = region.metadata_offset as usize;
        codec::fill_bytes(buf, metadata_offset, 0, region.max_metadata_bytes as usize)?;
        let metadata_offset =
            codec::write_u32(buf, metadata_offset, MetadataVersion::V1.as_u32())?;
        tracing::debug!(
            metadata_offset = region.metadata_offset,
            media_offset = region.media_data_offset,
            "using a metadata V1 frame writer"
        );
        Ok(Self {
            region,
            metadata_offset,
            metadata_bytes_written: 4,
            media_offset: region.media_data_offset as usize,
            media_bytes_written: 0,
            num_frames: 0,
        })
    }

    pub fn write_frame(
        &mut self,
        buf: &mut [u8],
        segment: &MediaSegment,
    ) -> Result<(), FrameWriteError> {
        segment.validate().map_err(|e| FrameWriteError::Invalid(e.to_string()))?;
        let extra_data = segment.extra_data.as_deref().unwrap_or(&[]);

        // The type-specific tail exists only for audio and video.
        let tail: [u32; 2] = match &segment.info {
            SegmentInfo::Audio(audio) => [audio.sample_rate, audio.channels],
            SegmentInfo::Video(video) => [video.width, video.height],
            SegmentInfo::Text | SegmentInfo::Unknown => {
                return Err(FrameWriteError::Invalid(format!(
                    "metadata V1 cannot represent {} segments",
                    segment.media_type()
                )))
            }
        };

        // Check both regions up front so a refusal leaves nothing behind.
        if self.metadata_bytes_written + METADATA_V1_SIZE_PER_FRAME_BYTES
            > self.region.max_metadata_bytes as usize
        {
            tracing::debug!(
                written = self.metadata_bytes_written,
                max = self.region.max_metadata_bytes,
                "no metadata space left for the next frame"
            );
            return Err(FrameWriteError::NoSpace);
        }
        if self.media_bytes_written + segment.data.len() > self.region.max_media_bytes as usize {
            tracing::debug!(
                written = self.media_bytes_written,
                max = self.region.max_media_bytes,
                frame = segment.data.len(),
                "no media space left for the next frame"
            );
            return Err(FrameWriteError::NoSpace);
        }

        let mut off = self.metadata_offset;
        off = codec::write_u32(buf, off, self.media_offset as u32)?;
        off = codec::write_u32(buf, off, segment.data.len() as u32)?;
        off = codec::write_i64(buf, off, segment.time_position)?;
        off = codec::write_i64(buf, off, segment.sample_duration)?;
        off = codec::write_u32(buf, off, segment.source_id as u32)?;
        off = codec::write_u32(buf, off, extra_data.len() as u32)?;
        off = codec::write_bytes(buf, off, extra_data)?;
        off = codec::fill_bytes(buf, off, 0, MAX_EXTRA_DATA_SIZE - extra_data.len())?;
        // Reserved encryption block, zeroed by begin()
        off += ENCRYPTION_METADATA_SIZE_BYTES;
        for word in tail {
            off = codec::write_u32(buf, off, word)?;
        }

        self.media_offset = codec::write_bytes(buf, self.media_offset, &segment.data)?;
        self.media_bytes_written += segment.data.len();
        self.metadata_offset = off;
        self.metadata_bytes_written += METADATA_V1_SIZE_PER_FRAME_BYTES;
        self.num_frames += 1;
        Ok(())
    }

    pub const fn frames_written(&self) -> u32 {
        self.num_frames
    }

    pub const fn metadata_bytes_written(&self) -> usize {
        self.metadata_bytes_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridgekit_core::constants::METADATA_VERSION_V1;
    use bytes::Bytes;

    fn region(max_metadata: u32, max_media: u32) -> ShmRegion {
        ShmRegion {
            metadata_offset: 0,
            max_metadata_bytes: max_metadata,
            media_data_offset: max_metadata,
            max_media_bytes: max_media,
        }
    }

    fn audio_segment(ts: i64, duration: i64) -> MediaSegment {
        let mut segment =
            MediaSegment::new_audio(4, ts, duration, 48_000, 2, vec![0xAB, 0xCD, 0xEF]);
        segment.extra_data = Some(Bytes::from_static(&[1, 2]));
        segment
    }

    #[test]
    fn test_layout_of_one_audio_frame() {
        let reg = region(4 + 104, 64);
        let mut buf = vec![0u8; reg.end() as usize];
        let mut writer = FrameWriterV1::begin(&mut buf, reg).unwrap();
        writer.write_frame(&mut buf, &audio_segment(2_000_000_000, 1_000_000_000)).unwrap();

        assert_eq!(u32::from_le_bytes(buf[0..4].try_into().unwrap()), METADATA_VERSION_V1);
        // media offset and length
        assert_eq!(u32::from_le_bytes(buf[4..8].try_into().unwrap()), 108);
        assert_eq!(u32::from_le_bytes(buf[8..12].try_into().unwrap()), 3);
        assert_eq!(i64::from_le_bytes(buf[12..20].try_into().unwrap()), 2_000_000_000);
        assert_eq!(i64::from_le_bytes(buf[20..28].try_into().unwrap()), 1_000_000_000);
        assert_eq!(u32::from_le_bytes(buf[28..32].try_into().unwrap()), 4);
        // extra data: length, bytes, zero pad
        assert_eq!(u32::from_le_bytes(buf[32..36].try_into().unwrap()), 2);
        assert_eq!(&buf[36..38], &[1, 2]);
        assert!(buf[38..68].iter().all(|&b| b == 0));
        // reserved encryption block stays zeroed
        assert!(buf[68..100].iter().all(|&b| b == 0));
        // audio tail
        assert_eq!(u32::from_le_bytes(buf[100..104].try_into().unwrap()), 48_000);
        assert_eq!(u32::from_le_bytes(buf[104..108].try_into().unwrap()), 2);
        // payload at the media offset
        assert_eq!(&buf[108..111], &[0xAB, 0xCD, 0xEF]);
        assert_eq!(writer.frames_written(), 1);
    }

    #[test]
    fn test_metadata_exhaustion_leaves_counters_unchanged() {
        let reg = region(4 + 104, 64); // room for exactly one frame
        let mut buf = vec![0u8; reg.end() as usize];
        let mut writer = FrameWriterV1::begin(&mut buf, reg).unwrap();
        writer.write_frame(&mut buf, &audio_segment(0, 0)).unwrap();

        let err = writer.write_frame(&mut buf, &audio_segment(1, 1)).unwrap_err();
        assert!(matches!(err, FrameWriteError::NoSpace));
        assert_eq!(writer.frames_written(), 1);
        assert_eq!(writer.metadata_bytes_written(), 108);
    }

    #[test]
    fn test_media_exhaustion_before_any_write() {
        let reg = region(4 + 3 * 104, 4); // metadata for 3 frames, 4 media bytes
        let mut buf = vec![0u8; reg.end() as usize];
        let mut writer = FrameWriterV1::begin(&mut buf, reg).unwrap();
        writer
            .write_frame(&mut buf, &MediaSegment::new_audio(1, 0, 0, 48_000, 2, vec![9, 9]))
            .unwrap();
        let err = writer
            .write_frame(&mut buf, &MediaSegment::new_audio(1, 0, 0, 48_000, 2, vec![8, 8, 8]))
            .unwrap_err();
        assert!(matches!(err, FrameWriteError::NoSpace));
        // The refused frame must not have touched its metadata block either.
        assert!(buf[(4 + 104)..(4 + 2 * 104)].iter().all(|&b| b == 0));
        assert_eq!(writer.frames_written(), 1);
    }

    #[test]
    fn test_text_segments_are_rejected() {
        let reg = region(4 + 104, 64);
        let mut buf = vec![0u8; reg.end() as usize];
        let mut writer = FrameWriterV1::begin(&mut buf, reg).unwrap();
        let segment = MediaSegment {
            info: SegmentInfo::Text,
            ..MediaSegment::new_audio(1, 0, 0, 0, 0, vec![1])
        };
        assert!(matches!(
            writer.write_frame(&mut buf, &segment),
            Err(FrameWriteError::Invalid(_))
        ));
        assert_eq!(writer.frames_written(), 0);
    }
}
