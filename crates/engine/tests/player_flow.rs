// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! End-to-end flow through a player actor: load, attach, the need-data /
//! have-data ticket cycle over shared memory, seek and failure latching.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bridgekit_core::types::{
    MediaSegment, MediaSourceStatus, MediaType, PlaybackState, ShmRegion, SourceConfig,
};
use bridgekit_engine::pipeline::{bus_channel, sim::SimPipeline, BusMessage};
use bridgekit_engine::{PlayerActor, PlayerEvent, PlayerHandle, PlayerTask, SourceSpec, TaskOutcome};
use bridgekit_shm::arena::SessionPartitions;
use bridgekit_shm::version::MetadataVersion;
use bridgekit_shm::writer::FrameWriter;
use tokio::sync::mpsc;

/// A heap-backed stand-in for the mapped arena; the engine only needs the
/// byte slice.
fn test_arena() -> (bridgekit_engine::SharedArena, SessionPartitions) {
    // Hand-carved partitions over a small buffer: one frame of metadata per
    // type is plenty for these tests.
    let audio = ShmRegion {
        metadata_offset: 0,
        max_metadata_bytes: 4 + 2 * 104,
        media_data_offset: 4 + 2 * 104,
        max_media_bytes: 256,
    };
    let video = ShmRegion {
        metadata_offset: audio.end(),
        max_metadata_bytes: 4 + 2 * 104,
        media_data_offset: audio.end() + 4 + 2 * 104,
        max_media_bytes: 256,
    };
    let text = ShmRegion {
        metadata_offset: video.end(),
        max_metadata_bytes: 4 + 2 * 104,
        media_data_offset: video.end() + 4 + 2 * 104,
        max_media_bytes: 128,
    };
    let arena = bridgekit_shm::SharedMemoryArena::anonymous(text.end() as usize).unwrap();
    (Arc::new(Mutex::new(arena)), SessionPartitions { audio, video, text })
}

struct Fixture {
    handle: PlayerHandle,
    events: mpsc::UnboundedReceiver<PlayerEvent>,
    arena: bridgekit_engine::SharedArena,
    partitions: SessionPartitions,
}

fn spawn_player() -> Fixture {
    let (arena, partitions) = test_arena();
    let (bus_tx, bus_rx) = bus_channel();
    let backend = Box::new(SimPipeline::new(bus_tx));
    let (event_tx, events) = mpsc::unbounded_channel();
    let handle = PlayerActor::spawn(1, backend, bus_rx, arena.clone(), partitions, event_tx);
    Fixture { handle, events, arena, partitions }
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<PlayerEvent>) -> PlayerEvent {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for a player event")
        .expect("event channel closed")
}

async fn wait_for_state(
    events: &mut mpsc::UnboundedReceiver<PlayerEvent>,
    wanted: PlaybackState,
) {
    loop {
        if let PlayerEvent::PlaybackState(state) = next_event(events).await {
            if state == wanted {
                return;
            }
        }
    }
}

#[tokio::test]
async fn test_ticket_cycle_attaches_samples() {
    let mut fixture = spawn_player();
    let handle = &fixture.handle;

    handle
        .enqueue_and_wait(PlayerTask::Load {
            mime_type: "video/mp4".to_string(),
            url: "mse://1".to_string(),
        })
        .await
        .unwrap();
    wait_for_state(&mut fixture.events, PlaybackState::Idle).await;

    let outcome = handle
        .enqueue_and_wait(PlayerTask::AttachSource {
            spec: SourceSpec {
                mime_type: "audio/mp4".to_string(),
                config: SourceConfig::Audio {
                    sample_rate: 48_000,
                    channels: 2,
                    sample_size: None,
                    is_big_endian: None,
                    is_signed: None,
                    is_float: None,
                },
                codec_data: None,
                has_drm: false,
            },
        })
        .await
        .unwrap();
    let TaskOutcome::SourceId(source_id) = outcome else {
        panic!("expected a source id, got {outcome:?}");
    };
    handle.enqueue_and_wait(PlayerTask::AllSourcesAttached).await.unwrap();

    // The sim backend asks for data as soon as sources are live.
    let ticket = loop {
        if let PlayerEvent::NeedMediaData(ticket) = next_event(&mut fixture.events).await {
            break ticket;
        }
    };
    assert_eq!(ticket.source_id, source_id);
    assert_eq!(ticket.media_type, MediaType::Audio);
    assert_eq!(ticket.region, fixture.partitions.audio);

    // Write two segments into the ticket window the way the client would.
    {
        let mut arena = fixture.arena.lock().unwrap();
        let buf = arena.as_mut_slice();
        let mut writer = FrameWriter::begin(buf, ticket.region, MetadataVersion::V2).unwrap();
        for ts in [0i64, 20_000_000] {
            let segment =
                MediaSegment::new_audio(source_id, ts, 20_000_000, 48_000, 2, vec![1, 2, 3, 4]);
            writer.write_frame(buf, &segment).unwrap();
        }
        assert_eq!(writer.frames_written(), 2);
    }
    handle
        .enqueue_and_wait(PlayerTask::ReadShmDataAndAttachSamples {
            request_id: ticket.request_id,
            num_frames: 2,
            status: MediaSourceStatus::Ok,
        })
        .await
        .unwrap();

    handle.enqueue_and_wait(PlayerTask::Play).await.unwrap();
    wait_for_state(&mut fixture.events, PlaybackState::Playing).await;

    handle.shutdown_and_wait().await.unwrap();
}

#[tokio::test]
async fn test_have_data_for_cancelled_ticket_is_ignored() {
    let mut fixture = spawn_player();
    let handle = &fixture.handle;

    handle
        .enqueue_and_wait(PlayerTask::Load {
            mime_type: "video/mp4".to_string(),
            url: "mse://1".to_string(),
        })
        .await
        .unwrap();
    let TaskOutcome::SourceId(source_id) = handle
        .enqueue_and_wait(PlayerTask::AttachSource {
            spec: SourceSpec {
                mime_type: "video/h264".to_string(),
                config: SourceConfig::Video { width: 1920, height: 1080, frame_rate: None },
                codec_data: None,
                has_drm: false,
            },
        })
        .await
        .unwrap()
    else {
        panic!("expected a source id");
    };
    handle.enqueue_and_wait(PlayerTask::AllSourcesAttached).await.unwrap();

    let ticket = loop {
        if let PlayerEvent::NeedMediaData(ticket) = next_event(&mut fixture.events).await {
            break ticket;
        }
    };

    // Flush cancels the outstanding ticket; the late have-data is a no-op.
    handle
        .enqueue_and_wait(PlayerTask::Flush { source_id, reset_time: false })
        .await
        .unwrap();
    let outcome = handle
        .enqueue_and_wait(PlayerTask::ReadShmDataAndAttachSamples {
            request_id: ticket.request_id,
            num_frames: 1,
            status: MediaSourceStatus::Ok,
        })
        .await
        .unwrap();
    assert_eq!(outcome, TaskOutcome::Done);

    handle.shutdown_and_wait().await.unwrap();
}

#[tokio::test]
async fn test_seek_walks_through_seeking_and_seek_done() {
    let mut fixture = spawn_player();
    let handle = &fixture.handle;

    handle
        .enqueue_and_wait(PlayerTask::Load {
            mime_type: "video/mp4".to_string(),
            url: "mse://1".to_string(),
        })
        .await
        .unwrap();
    handle
        .enqueue_and_wait(PlayerTask::AttachSource {
            spec: SourceSpec {
                mime_type: "audio/mp4".to_string(),
                config: SourceConfig::Audio {
                    sample_rate: 48_000,
                    channels: 2,
                    sample_size: None,
                    is_big_endian: None,
                    is_signed: None,
                    is_float: None,
                },
                codec_data: None,
                has_drm: false,
            },
        })
        .await
        .unwrap();
    handle.enqueue_and_wait(PlayerTask::AllSourcesAttached).await.unwrap();
    handle.enqueue_and_wait(PlayerTask::Play).await.unwrap();
    wait_for_state(&mut fixture.events, PlaybackState::Playing).await;

    handle.enqueue_and_wait(PlayerTask::SetPosition { position: 5_000_000_000 }).await.unwrap();
    wait_for_state(&mut fixture.events, PlaybackState::Seeking).await;
    wait_for_state(&mut fixture.events, PlaybackState::SeekDone).await;
    // The sim pipeline re-announces its running state after the seek.
    wait_for_state(&mut fixture.events, PlaybackState::Playing).await;
    assert_eq!(handle.position().await.unwrap(), 5_000_000_000);

    handle.shutdown_and_wait().await.unwrap();
}

#[tokio::test]
async fn test_pipeline_error_latches_failure() {
    let (arena, partitions) = test_arena();
    let (bus_tx, bus_rx) = bus_channel();
    let backend = Box::new(SimPipeline::new(bus_tx.clone()));
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let handle = PlayerActor::spawn(9, backend, bus_rx, arena, partitions, event_tx);

    handle
        .enqueue_and_wait(PlayerTask::Load {
            mime_type: "video/mp4".to_string(),
            url: "mse://1".to_string(),
        })
        .await
        .unwrap();

    bus_tx.send(BusMessage::Error("decoder blew up".to_string())).unwrap();
    wait_for_state(&mut events, PlaybackState::Failure).await;

    // Mutations other than stop are rejected now.
    assert!(handle.enqueue_and_wait(PlayerTask::Play).await.is_err());
    assert!(handle.enqueue_and_wait(PlayerTask::Stop).await.is_ok());

    handle.shutdown_and_wait().await.unwrap();
}
