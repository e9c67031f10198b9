// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Web-audio drain behaviour: backpressured frames become stored, the drain
//! timer retries them, and the free window wraps around the region.

use std::sync::{Arc, Mutex};

use bridgekit_core::types::{PcmConfig, ShmRegion};
use bridgekit_engine::{BoundedSink, WebAudioPlayerActor};
use tokio::sync::mpsc;

const FRAMES: u32 = 64;
const BYTES_PER_FRAME: u32 = 4; // stereo 16-bit

fn spawn_player(accept_bytes_per_write: usize) -> bridgekit_engine::WebAudioHandle {
    let region = ShmRegion {
        metadata_offset: 0,
        max_metadata_bytes: 0,
        media_data_offset: 0,
        max_media_bytes: FRAMES * BYTES_PER_FRAME,
    };
    let arena = Arc::new(Mutex::new(
        bridgekit_shm::SharedMemoryArena::anonymous((FRAMES * BYTES_PER_FRAME) as usize).unwrap(),
    ));
    let sink = Box::new(BoundedSink::new(accept_bytes_per_write));
    let (state_tx, _state_rx) = mpsc::unbounded_channel();
    WebAudioPlayerActor::spawn(1, region, &PcmConfig::default(), sink, arena, state_tx)
}

#[tokio::test(start_paused = true)]
async fn test_backpressure_stores_frames_and_timer_drains_them() {
    // The sink accepts a quarter of the region per write.
    let handle = spawn_player((FRAMES / 4 * BYTES_PER_FRAME) as usize);

    let (available, window) = handle.get_buffer_available().await.unwrap();
    assert_eq!(available, FRAMES);
    assert_eq!(window.length_main, FRAMES * BYTES_PER_FRAME);
    assert_eq!(window.length_wrap, 0);

    // Client writes half the region; the sink takes a quarter immediately.
    handle.write_buffer(FRAMES / 2).await.unwrap();

    let (available, window) = handle.get_buffer_available().await.unwrap();
    assert_eq!(available, FRAMES - FRAMES / 4);
    // Stored frames sit at [16, 32); the free window runs to the region end
    // and wraps back to the stored range's start.
    assert_eq!(window.offset_main, FRAMES / 2 * BYTES_PER_FRAME);
    assert_eq!(window.length_main, FRAMES / 2 * BYTES_PER_FRAME);
    assert_eq!(window.offset_wrap, 0);
    assert_eq!(window.length_wrap, FRAMES / 4 * BYTES_PER_FRAME);
    assert_eq!(handle.get_buffer_delay().await.unwrap(), FRAMES / 4);

    // Two drain ticks flush the remaining stored quarter.
    tokio::time::advance(std::time::Duration::from_millis(250)).await;
    let (available, _) = handle.get_buffer_available().await.unwrap();
    assert_eq!(available, FRAMES);
    assert_eq!(handle.get_buffer_delay().await.unwrap(), 0);

    handle.shutdown_and_wait().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_write_without_reservation_fails() {
    let handle = spawn_player(usize::MAX);
    assert!(handle.write_buffer(1).await.is_err());
    handle.shutdown_and_wait().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_device_info_prefers_640_or_capacity() {
    let handle = spawn_player(usize::MAX);
    let info = handle.get_device_info().await.unwrap();
    // The region holds fewer than 640 frames, so capacity wins.
    assert_eq!(info.preferred_frames, FRAMES);
    assert_eq!(info.maximum_frames, FRAMES);
    assert!(info.support_deferred_play);
    handle.shutdown_and_wait().await.unwrap();
}
