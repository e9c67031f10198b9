// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! V2 frame writer: length-prefixed protobuf metadata in the media region.
//!
//! The metadata region holds only the `u32` version word (rest zeroed). Each
//! segment in the media region is `u32 metadata_size`, the serialized
//! [`MediaSegmentMetadata`] record, then the payload bytes. Unlike V1 this
//! layout carries the full encryption block, so encrypted streams require V2.

use bridgekit_core::types::{MediaSegment, ShmRegion};
use bridgekit_proto::metadata::MediaSegmentMetadata;
use prost::Message;

use crate::codec;
use crate::version::MetadataVersion;
use crate::writer::FrameWriteError;

#[derive(Debug)]
pub struct FrameWriterV2 {
    region: ShmRegion,
    data_offset: usize,
    bytes_written: usize,
    num_frames: u32,
}

impl FrameWriterV2 {
    /// Zeroes both regions and stamps the version word.
    pub fn begin(buf: &mut [u8], region: ShmRegion) -> Result<Self, FrameWriteError> {
        codec::fill_bytes(
            buf,
            region.metadata_offset as usize,
            0,
            region.max_metadata_bytes as usize,
        )?;
        codec::fill_bytes(
            buf,
            region.media_data_offset as usize,
            0,
            region.max_media_bytes as usize,
        )?;
        codec::write_u32(buf, region.metadata_offset as usize, MetadataVersion::V2.as_u32())?;
        tracing::debug!(
            metadata_offset = region.metadata_offset,
            media_offset = region.media_data_offset,
            "using a metadata V2 frame writer"
        );
        Ok(Self {
            region,
            data_offset: region.media_data_offset as usize,
            bytes_written: 0,
            num_frames: 0,
        })
    }

    pub fn write_frame(
        &mut self,
        buf: &mut [u8],
        segment: &MediaSegment,
    ) -> Result<(), FrameWriteError> {
        segment.validate().map_err(|e| FrameWriteError::Invalid(e.to_string()))?;
        let metadata = MediaSegmentMetadata::from_segment(segment).ok_or_else(|| {
            FrameWriteError::Invalid(format!(
                "no metadata V2 representation for a {} segment",
                segment.media_type()
            ))
        })?;
        let metadata_size = metadata.encoded_len();

        if self.bytes_written + 4 + metadata_size + segment.data.len()
            > self.region.max_media_bytes as usize
        {
            tracing::debug!(
                written = self.bytes_written,
                max = self.region.max_media_bytes,
                metadata_size,
                frame = segment.data.len(),
                "no space left to write the segment"
            );
            return Err(FrameWriteError::NoSpace);
        }

        let mut off = codec::write_u32(buf, self.data_offset, metadata_size as u32)?;
        let encoded = metadata.encode_to_vec();
        off = codec::write_bytes(buf, off, &encoded)?;
        off = codec::write_bytes(buf, off, &segment.data)?;

        self.data_offset = off;
        self.bytes_written += 4 + metadata_size + segment.data.len();
        self.num_frames += 1;
        Ok(())
    }

    pub const fn frames_written(&self) -> u32 {
        self.num_frames
    }

    pub const fn bytes_written(&self) -> usize {
        self.bytes_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridgekit_core::constants::METADATA_VERSION_V2;
    use bridgekit_core::types::{EncryptionInfo, SubSample};
    use bytes::Bytes;

    fn region_of(total: u32) -> ShmRegion {
        ShmRegion {
            metadata_offset: 0,
            max_metadata_bytes: 6,
            media_data_offset: 6,
            max_media_bytes: total - 6,
        }
    }

    #[test]
    fn test_version_word_and_prefix_layout() {
        let reg = region_of(256);
        let mut buf = vec![0u8; 256];
        let mut writer = FrameWriterV2::begin(&mut buf, reg).unwrap();

        let segment = MediaSegment::new_audio(
            1,
            1_423_435,
            12_324,
            3536,
            3,
            vec![0xD, 0xE, 0xA, 0xD, 0xB, 0xE, 0xE, 0xF],
        );
        writer.write_frame(&mut buf, &segment).unwrap();

        assert_eq!(&buf[0..4], &[0x02, 0x00, 0x00, 0x00]);
        assert_eq!(u32::from_le_bytes(buf[0..4].try_into().unwrap()), METADATA_VERSION_V2);

        let metadata_size = u32::from_le_bytes(buf[6..10].try_into().unwrap()) as usize;
        let metadata =
            MediaSegmentMetadata::decode(&buf[10..10 + metadata_size]).unwrap();
        assert_eq!(metadata.length, Some(8));
        assert_eq!(metadata.time_position, Some(1_423_435));
        assert_eq!(metadata.sample_duration, Some(12_324));
        assert_eq!(metadata.stream_id, Some(1));
        assert_eq!(metadata.sample_rate, Some(3536));
        assert_eq!(metadata.channels_num, Some(3));
        assert_eq!(metadata.media_key_session_id, None);
        assert_eq!(
            &buf[10 + metadata_size..18 + metadata_size],
            &[0xD, 0xE, 0xA, 0xD, 0xB, 0xE, 0xE, 0xF]
        );
        assert_eq!(writer.frames_written(), 1);
    }

    #[test]
    fn test_encrypted_video_metadata_carries_the_full_block() {
        let reg = region_of(256);
        let mut buf = vec![0u8; 256];
        let mut writer = FrameWriterV2::begin(&mut buf, reg).unwrap();

        let mut segment =
            MediaSegment::new_video(1, 1_423_435, 12_324, 1024, 768, vec![0u8; 9]);
        segment.encryption = Some(EncryptionInfo {
            media_key_session_id: 43,
            key_id: Bytes::from_static(&[9, 2, 6, 2, 0, 1]),
            init_vector: Bytes::from_static(&[34, 53, 54, 62, 56]),
            init_with_last_15: 1,
            sub_samples: vec![SubSample { num_clear_bytes: 2, num_encrypted_bytes: 7 }],
        });
        writer.write_frame(&mut buf, &segment).unwrap();

        let metadata_size = u32::from_le_bytes(buf[6..10].try_into().unwrap()) as usize;
        let metadata =
            MediaSegmentMetadata::decode(&buf[10..10 + metadata_size]).unwrap();
        assert_eq!(metadata.width, Some(1024));
        assert_eq!(metadata.height, Some(768));
        assert_eq!(metadata.media_key_session_id, Some(43));
        assert_eq!(metadata.key_id.as_deref(), Some(&[9, 2, 6, 2, 0, 1][..]));
        assert_eq!(metadata.init_vector.as_deref(), Some(&[34, 53, 54, 62, 56][..]));
        assert_eq!(metadata.init_with_last_15, Some(1));
        assert_eq!(metadata.sub_sample_info.len(), 1);
        assert_eq!(metadata.sub_sample_info[0].num_clear_bytes, 2);
        assert_eq!(metadata.sub_sample_info[0].num_encrypted_bytes, 7);
    }

    #[test]
    fn test_no_space_keeps_cursor_and_counters() {
        // 6 metadata bytes + 10 media bytes: far too small for prefix +
        // record + an 8-byte payload.
        let reg = ShmRegion {
            metadata_offset: 0,
            max_metadata_bytes: 6,
            media_data_offset: 6,
            max_media_bytes: 10,
        };
        let mut buf = vec![0u8; 16];
        let mut writer = FrameWriterV2::begin(&mut buf, reg).unwrap();
        let segment = MediaSegment::new_video(1, 0, 0, 16, 16, vec![0u8; 8]);
        assert!(matches!(
            writer.write_frame(&mut buf, &segment),
            Err(FrameWriteError::NoSpace)
        ));
        assert_eq!(writer.frames_written(), 0);
        assert_eq!(writer.bytes_written(), 0);
    }
}
