// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The fd-backed shared-memory arena and its partition map.
//!
//! The server creates one POSIX shared-memory object per process and carves
//! it into per-(session, source-type) media partitions plus one ring region
//! per web-audio player. The object name and size are disclosed over the
//! control module; the client opens and maps the same object read/write.
//!
//! The carve is computed once at startup and never changes while tickets are
//! live; a resize requires draining every ticket first.

#![allow(unsafe_code)] // mapping a foreign fd is inherently a raw-memory contract

use std::fs::File;
use std::sync::atomic::{AtomicU32, Ordering};

use bridgekit_core::constants::METADATA_V1_SIZE_PER_FRAME_BYTES;
use bridgekit_core::error::{BridgeKitError, Result};
use bridgekit_core::types::{MediaType, ShmRegion};
use memmap2::MmapMut;
use nix::fcntl::OFlag;
use nix::sys::mman::shm_open;
use nix::sys::stat::Mode;

/// Sizing knobs for the arena carve.
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    pub max_sessions: usize,
    pub max_web_audio_players: usize,
    /// Upper bound on frames per need-data ticket; sizes the V1 metadata
    /// region as `4 + max_frames * 104` bytes.
    pub max_frames: u32,
    pub audio_media_bytes: u32,
    pub video_media_bytes: u32,
    pub text_media_bytes: u32,
    pub web_audio_bytes: u32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            max_sessions: 2,
            max_web_audio_players: 1,
            max_frames: 24,
            audio_media_bytes: 1024 * 1024,
            video_media_bytes: 7 * 1024 * 1024,
            text_media_bytes: 256 * 1024,
            web_audio_bytes: 10 * 1024,
        }
    }
}

impl ArenaConfig {
    const fn metadata_bytes(&self) -> u32 {
        4 + self.max_frames * METADATA_V1_SIZE_PER_FRAME_BYTES as u32
    }
}

/// The three media partitions of one session slot.
#[derive(Debug, Clone, Copy)]
pub struct SessionPartitions {
    pub audio: ShmRegion,
    pub video: ShmRegion,
    pub text: ShmRegion,
}

impl SessionPartitions {
    pub const fn for_type(&self, media_type: MediaType) -> Option<ShmRegion> {
        match media_type {
            MediaType::Audio => Some(self.audio),
            MediaType::Video => Some(self.video),
            MediaType::Text => Some(self.text),
            MediaType::Unknown => None,
        }
    }
}

/// The computed carve of the arena.
#[derive(Debug, Clone)]
pub struct ArenaLayout {
    sessions: Vec<SessionPartitions>,
    web_audio: Vec<ShmRegion>,
    total_size: u32,
}

impl ArenaLayout {
    /// Carves partitions sequentially: all session slots first, then the
    /// web-audio rings. Regions never overlap by construction.
    pub fn compute(config: &ArenaConfig) -> Self {
        let metadata_bytes = config.metadata_bytes();
        let mut cursor = 0u32;
        let mut carve = |metadata: u32, media: u32| {
            let region = ShmRegion {
                metadata_offset: cursor,
                max_metadata_bytes: metadata,
                media_data_offset: cursor + metadata,
                max_media_bytes: media,
            };
            cursor += metadata + media;
            region
        };

        let sessions = (0..config.max_sessions)
            .map(|_| SessionPartitions {
                audio: carve(metadata_bytes, config.audio_media_bytes),
                video: carve(metadata_bytes, config.video_media_bytes),
                text: carve(metadata_bytes, config.text_media_bytes),
            })
            .collect();
        // Web-audio rings have no metadata region; the whole range is media.
        let web_audio = (0..config.max_web_audio_players)
            .map(|_| carve(0, config.web_audio_bytes))
            .collect();

        Self { sessions, web_audio, total_size: cursor }
    }

    pub fn session_slots(&self) -> usize {
        self.sessions.len()
    }

    pub fn web_audio_slots(&self) -> usize {
        self.web_audio.len()
    }

    /// Partition of one (session slot, source type).
    pub fn partition(&self, slot: usize, media_type: MediaType) -> Option<ShmRegion> {
        self.sessions.get(slot).and_then(|p| p.for_type(media_type))
    }

    pub fn web_audio_region(&self, slot: usize) -> Option<ShmRegion> {
        self.web_audio.get(slot).copied()
    }

    pub const fn total_size(&self) -> u32 {
        self.total_size
    }
}

static ARENA_SEQ: AtomicU32 = AtomicU32::new(0);

/// A mapped shared-memory arena. The creating side owns the object name and
/// unlinks it on drop; openers only unmap.
#[derive(Debug)]
pub struct SharedMemoryArena {
    name: String,
    map: MmapMut,
    owner: bool,
}

impl SharedMemoryArena {
    /// Creates and maps a fresh shared-memory object of `size` bytes.
    pub fn create(size: u32) -> Result<Self> {
        let name = format!(
            "/bridgekit-{}-{}",
            std::process::id(),
            ARENA_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        let fd = shm_open(
            name.as_str(),
            OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
            Mode::S_IRUSR | Mode::S_IWUSR,
        )
        .map_err(|e| BridgeKitError::Io(e.into()))?;
        let file = File::from(fd);
        file.set_len(u64::from(size))?;
        let map = unsafe { MmapMut::map_mut(&file) }?;
        tracing::info!(name = %name, size, "created shared-memory arena");
        Ok(Self { name, map, owner: true })
    }

    /// Creates an anonymous, process-private arena. Useful for tests and
    /// for in-process clients that never cross a process boundary.
    pub fn anonymous(size: usize) -> Result<Self> {
        let map = MmapMut::map_anon(size)?;
        Ok(Self { name: String::from("<anonymous>"), map, owner: false })
    }

    /// Opens and maps an arena created by the server.
    pub fn open(name: &str, size: u32) -> Result<Self> {
        let fd = shm_open(name, OFlag::O_RDWR, Mode::empty())
            .map_err(|e| BridgeKitError::Io(e.into()))?;
        let file = File::from(fd);
        let map = unsafe { MmapMut::map_mut(&file) }?;
        if map.len() < size as usize {
            return Err(BridgeKitError::Configuration(format!(
                "shared-memory object {name} is {} bytes, expected at least {size}",
                map.len()
            )));
        }
        Ok(Self { name: name.to_string(), map, owner: false })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.map
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.map
    }
}

impl Drop for SharedMemoryArena {
    fn drop(&mut self) {
        if self.owner {
            if let Err(e) = nix::sys::mman::shm_unlink(self.name.as_str()) {
                tracing::warn!(name = %self.name, error = %e, "failed to unlink arena");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_partitions_do_not_overlap() {
        let config = ArenaConfig {
            max_sessions: 2,
            max_web_audio_players: 2,
            max_frames: 4,
            audio_media_bytes: 128,
            video_media_bytes: 256,
            text_media_bytes: 64,
            web_audio_bytes: 32,
        };
        let layout = ArenaLayout::compute(&config);

        let mut regions: Vec<ShmRegion> = Vec::new();
        for slot in 0..2 {
            for media_type in [MediaType::Audio, MediaType::Video, MediaType::Text] {
                regions.push(layout.partition(slot, media_type).unwrap());
            }
        }
        for slot in 0..2 {
            regions.push(layout.web_audio_region(slot).unwrap());
        }

        let mut spans: Vec<(u32, u32)> = regions
            .iter()
            .map(|r| (r.metadata_offset.min(r.media_data_offset), r.end()))
            .collect();
        spans.sort_unstable();
        for pair in spans.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "regions overlap: {pair:?}");
        }
        assert_eq!(spans.last().unwrap().1, layout.total_size());
    }

    #[test]
    fn test_metadata_region_sized_from_max_frames() {
        let config = ArenaConfig { max_frames: 24, ..ArenaConfig::default() };
        let layout = ArenaLayout::compute(&config);
        let audio = layout.partition(0, MediaType::Audio).unwrap();
        assert_eq!(audio.max_metadata_bytes, 4 + 24 * 104);
        assert_eq!(audio.media_data_offset, audio.metadata_offset + audio.max_metadata_bytes);
    }

    #[test]
    fn test_unknown_media_type_has_no_partition() {
        let layout = ArenaLayout::compute(&ArenaConfig::default());
        assert!(layout.partition(0, MediaType::Unknown).is_none());
        assert!(layout.partition(99, MediaType::Audio).is_none());
    }
}
