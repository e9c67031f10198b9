// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Data-path behaviour of the media-pipeline façade: ticket gating, key-id
//! stamping of encrypted segments, and the have-data forwarding rules.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bridgekit_client::{ClientNotification, MediaPipeline, RpcChannel};
use bridgekit_core::keyid::KeyIdMap;
use bridgekit_core::types::{
    ApplicationState, EncryptionInfo, MediaSegment, MediaSourceStatus, MediaType, PlaybackState,
    SourceConfig, SubSample,
};
use bridgekit_proto::mediapipeline as pb;
use bridgekit_proto::rpc::IpcError;
use bridgekit_shm::{read_segments, SharedMemoryArena};
use bytes::Bytes;
use prost::Message;
use tokio::sync::watch;

/// Records calls and answers them from a canned response table.
#[derive(Default)]
struct MockChannel {
    calls: Mutex<Vec<String>>,
    responses: Mutex<HashMap<String, Bytes>>,
}

impl MockChannel {
    fn respond_with<M: Message>(&self, method: &str, response: &M) {
        self.responses
            .lock()
            .unwrap()
            .insert(method.to_string(), Bytes::from(response.encode_to_vec()));
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RpcChannel for MockChannel {
    async fn call(&self, method: &str, _body: Bytes) -> Result<Bytes, IpcError> {
        self.calls.lock().unwrap().push(method.to_string());
        Ok(self.responses.lock().unwrap().get(method).cloned().unwrap_or_default())
    }
}

struct Fixture {
    pipeline: MediaPipeline,
    channel: Arc<MockChannel>,
    arena: Arc<Mutex<SharedMemoryArena>>,
    key_id_map: Arc<KeyIdMap>,
    app_state_tx: watch::Sender<ApplicationState>,
}

async fn fixture() -> Fixture {
    let channel = Arc::new(MockChannel::default());
    channel.respond_with(
        pb::methods::CREATE_SESSION,
        &pb::CreateSessionResponse { session_id: 5 },
    );
    channel
        .respond_with(pb::methods::ATTACH_SOURCE, &pb::AttachSourceResponse { source_id: 1 });

    let arena = Arc::new(Mutex::new(SharedMemoryArena::anonymous(512).unwrap()));
    let key_id_map = Arc::new(KeyIdMap::new());
    let (app_state_tx, app_state_rx) = watch::channel(ApplicationState::Running);

    let pipeline = MediaPipeline::create(
        channel.clone(),
        arena.clone(),
        key_id_map.clone(),
        app_state_rx,
        3840,
        2160,
    )
    .await
    .unwrap();
    Fixture { pipeline, channel, arena, key_id_map, app_state_tx }
}

fn need_data_event(request_id: u32) -> (String, Bytes) {
    let event = pb::NeedMediaDataEvent {
        session_id: 5,
        source_id: 1,
        request_id,
        frame_count: 8,
        shm_info: Some(pb::ShmInfo {
            metadata_offset: 0,
            max_metadata_bytes: 6,
            media_data_offset: 6,
            max_media_bytes: 250,
        }),
    };
    (pb::events::NEED_MEDIA_DATA.to_string(), Bytes::from(event.encode_to_vec()))
}

fn playback_state_event(state: pb::PlaybackState) -> (String, Bytes) {
    let event = pb::PlaybackStateChangeEvent { session_id: 5, state: state as i32 };
    (pb::events::PLAYBACK_STATE.to_string(), Bytes::from(event.encode_to_vec()))
}

async fn into_playing(fixture: &mut Fixture) {
    fixture.pipeline.load("video/mp4", "mse://app").await.unwrap();
    fixture
        .pipeline
        .attach_source(
            "video/h264",
            &SourceConfig::Video { width: 1920, height: 1080, frame_rate: None },
            None,
            true,
        )
        .await
        .unwrap();
    let (name, body) = playback_state_event(pb::PlaybackState::Playing);
    fixture.pipeline.handle_event(&name, &body);
    assert_eq!(fixture.pipeline.playback_state(), PlaybackState::Playing);
}

#[tokio::test]
async fn test_need_data_requires_running_application() {
    let mut fixture = fixture().await;
    into_playing(&mut fixture).await;

    fixture.app_state_tx.send(ApplicationState::Inactive).unwrap();
    let (name, body) = need_data_event(1);
    assert!(fixture.pipeline.handle_event(&name, &body).is_none());

    fixture.app_state_tx.send(ApplicationState::Running).unwrap();
    let notification = fixture.pipeline.handle_event(&name, &body);
    assert_eq!(
        notification,
        Some(ClientNotification::NeedMediaData { request_id: 1, frame_count: 8 })
    );
}

#[tokio::test]
async fn test_need_data_ignored_outside_accepting_states() {
    let mut fixture = fixture().await;
    fixture.pipeline.load("video/mp4", "mse://app").await.unwrap();
    fixture
        .pipeline
        .attach_source(
            "video/h264",
            &SourceConfig::Video { width: 1920, height: 1080, frame_rate: None },
            None,
            false,
        )
        .await
        .unwrap();

    // Idle is not a data-accepting state.
    let (name, body) = need_data_event(1);
    assert!(fixture.pipeline.handle_event(&name, &body).is_none());

    let (sname, sbody) = playback_state_event(pb::PlaybackState::Paused);
    fixture.pipeline.handle_event(&sname, &sbody);
    assert!(fixture.pipeline.handle_event(&name, &body).is_some());
}

#[tokio::test]
async fn test_key_id_is_stamped_from_the_map() {
    let mut fixture = fixture().await;
    into_playing(&mut fixture).await;

    fixture.key_id_map.add_session(43);
    fixture.key_id_map.update_key(43, Bytes::from_static(&[1, 2, 3, 4]));

    let (name, body) = need_data_event(7);
    fixture.pipeline.handle_event(&name, &body).unwrap();

    let mut segment = MediaSegment::new_video(1, 0, 0, 1024, 768, vec![0u8; 9]);
    segment.encryption = Some(EncryptionInfo {
        media_key_session_id: 43,
        key_id: Bytes::from_static(&[9]),
        init_vector: Bytes::from_static(&[7, 7]),
        init_with_last_15: 0,
        sub_samples: vec![SubSample { num_clear_bytes: 2, num_encrypted_bytes: 7 }],
    });
    fixture.pipeline.add_segment(7, segment).unwrap();

    // The segment landed in shared memory with the mapped key id.
    let region = bridgekit_core::types::ShmRegion {
        metadata_offset: 0,
        max_metadata_bytes: 6,
        media_data_offset: 6,
        max_media_bytes: 250,
    };
    let arena = fixture.arena.lock().unwrap();
    let segments = read_segments(arena.as_slice(), region, MediaType::Video, 1).unwrap();
    assert_eq!(
        segments[0].encryption.as_ref().unwrap().key_id,
        Bytes::from_static(&[1, 2, 3, 4])
    );
    drop(arena);

    // After erase the original key id stays untouched.
    fixture.key_id_map.erase(43);
    let (name, body) = need_data_event(8);
    fixture.pipeline.handle_event(&name, &body).unwrap();
    let mut segment = MediaSegment::new_video(1, 0, 0, 1024, 768, vec![0u8; 9]);
    segment.encryption = Some(EncryptionInfo {
        media_key_session_id: 43,
        key_id: Bytes::from_static(&[9]),
        init_vector: Bytes::from_static(&[7, 7]),
        init_with_last_15: 0,
        sub_samples: vec![SubSample { num_clear_bytes: 2, num_encrypted_bytes: 7 }],
    });
    fixture.pipeline.add_segment(8, segment).unwrap();
    let arena = fixture.arena.lock().unwrap();
    let segments = read_segments(arena.as_slice(), region, MediaType::Video, 1).unwrap();
    assert_eq!(segments[0].encryption.as_ref().unwrap().key_id, Bytes::from_static(&[9]));
}

#[tokio::test]
async fn test_have_data_is_silent_while_seeking_but_eos_forwards_otherwise() {
    let mut fixture = fixture().await;
    into_playing(&mut fixture).await;

    let (name, body) = need_data_event(3);
    fixture.pipeline.handle_event(&name, &body).unwrap();

    // Seek: the ticket dies and have-data succeeds without a server call.
    fixture.pipeline.set_position(1_000_000_000).await.unwrap();
    let calls_before = fixture.channel.calls().len();
    fixture.pipeline.have_data(MediaSourceStatus::Ok, 3).await.unwrap();
    assert_eq!(fixture.channel.calls().len(), calls_before);

    // Back in a forwarding state, an EOS with zero frames still goes out.
    let (sname, sbody) = playback_state_event(pb::PlaybackState::Playing);
    fixture.pipeline.handle_event(&sname, &sbody);
    let (name, body) = need_data_event(4);
    fixture.pipeline.handle_event(&name, &body).unwrap();
    fixture.pipeline.have_data(MediaSourceStatus::Eos, 4).await.unwrap();
    assert_eq!(
        fixture.channel.calls().last().map(String::as_str),
        Some(pb::methods::HAVE_DATA)
    );
}

#[tokio::test]
async fn test_flush_suppresses_need_data_until_source_flushed() {
    let mut fixture = fixture().await;
    into_playing(&mut fixture).await;

    fixture.pipeline.flush(1, false).await.unwrap();
    let (name, body) = need_data_event(9);
    assert!(fixture.pipeline.handle_event(&name, &body).is_none());

    let flushed = pb::SourceFlushedEvent { session_id: 5, source_id: 1 };
    let notification = fixture
        .pipeline
        .handle_event(pb::events::SOURCE_FLUSHED, &Bytes::from(flushed.encode_to_vec()));
    assert_eq!(notification, Some(ClientNotification::SourceFlushed { source_id: 1 }));
    assert!(fixture.pipeline.handle_event(&name, &body).is_some());
}
