// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! End-to-end daemon behaviour over real socket pairs: control
//! registration, state fan-out, ping/ack, and the full media-session data
//! path from create-session to playing.

use std::sync::Arc;
use std::time::Duration;

use bridgekit_client::{ClientNotification, Connection, ControlClient, MediaPipeline};
use bridgekit_core::keyid::KeyIdMap;
use bridgekit_core::types::{MediaSegment, MediaSourceStatus, PlaybackState, SourceConfig};
use bridgekit_proto::rpc::Event;
use bridgekit_proto::{control as control_pb, servermanager as manager_pb};
use bridgekit_server::cdm::SoftCdm;
use bridgekit_server::config::Config;
use bridgekit_server::server::handle_connection;
use bridgekit_server::state::ServerState;
use prost::Message;
use tokio::net::UnixStream;
use tokio::sync::mpsc;

fn test_state(heartbeat_ms: u64) -> Arc<ServerState> {
    let mut config = Config::default();
    config.heartbeat.timeout_ms = heartbeat_ms;
    // Small arena keeps the tests snappy.
    config.arena.audio_media_bytes = 4096;
    config.arena.video_media_bytes = 4096;
    config.arena.text_media_bytes = 1024;
    config.arena.max_frames = 4;
    ServerState::new_anonymous(config, Arc::new(SoftCdm::new())).unwrap()
}

/// Connects one in-process client to the daemon state.
fn connect(state: &Arc<ServerState>) -> (Connection, mpsc::UnboundedReceiver<Event>) {
    let (client_stream, server_stream) = UnixStream::pair().unwrap();
    let state = state.clone();
    tokio::spawn(async move {
        handle_connection(state, server_stream, 0).await;
    });
    Connection::from_stream(client_stream)
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for a server event")
        .expect("event stream closed")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ping_succeeds_when_all_controls_ack() {
    let state = test_state(2000);

    let (conn_a, mut events_a) = connect(&state);
    let (conn_b, mut events_b) = connect(&state);
    let control_a = ControlClient::register(Arc::new(conn_a)).await.unwrap();
    let control_b = ControlClient::register(Arc::new(conn_b)).await.unwrap();

    let (manager, mut manager_events) = connect(&state);
    let manager = Arc::new(manager);
    let _: bridgekit_proto::rpc::Empty = bridgekit_client::connection::call(
        manager.as_ref(),
        manager_pb::methods::PING,
        &manager_pb::PingRequest { id: 7 },
    )
    .await
    .unwrap();

    // Both controls answer their pings.
    let event = next_event(&mut events_a).await;
    assert_eq!(event.name, control_pb::events::PING);
    control_a.handle_event(&event.name, &event.body).await.unwrap();
    let event = next_event(&mut events_b).await;
    control_b.handle_event(&event.name, &event.body).await.unwrap();

    let ack = loop {
        let event = next_event(&mut manager_events).await;
        if event.name == manager_pb::events::ACK {
            break manager_pb::AckEvent::decode(event.body).unwrap();
        }
    };
    assert_eq!(ack.id, 7);
    assert!(ack.success);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ping_times_out_when_a_control_stays_silent() {
    let state = test_state(100);

    let (conn_a, mut events_a) = connect(&state);
    let (conn_b, _events_b) = connect(&state);
    let control_a = ControlClient::register(Arc::new(conn_a)).await.unwrap();
    let _control_b = ControlClient::register(Arc::new(conn_b)).await.unwrap();

    let (manager, mut manager_events) = connect(&state);
    let manager = Arc::new(manager);
    let _: bridgekit_proto::rpc::Empty = bridgekit_client::connection::call(
        manager.as_ref(),
        manager_pb::methods::PING,
        &manager_pb::PingRequest { id: 9 },
    )
    .await
    .unwrap();

    // Only the first control answers; the second never does.
    let event = next_event(&mut events_a).await;
    control_a.handle_event(&event.name, &event.body).await.unwrap();

    let ack = loop {
        let event = next_event(&mut manager_events).await;
        if event.name == manager_pb::events::ACK {
            break manager_pb::AckEvent::decode(event.body).unwrap();
        }
    };
    assert_eq!(ack.id, 9);
    assert!(!ack.success);

    // The next ping is independent of the failed one.
    let _: bridgekit_proto::rpc::Empty = bridgekit_client::connection::call(
        manager.as_ref(),
        manager_pb::methods::PING,
        &manager_pb::PingRequest { id: 10 },
    )
    .await
    .unwrap();
    let event = next_event(&mut events_a).await;
    assert_eq!(event.name, control_pb::events::PING);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_media_session_data_path_reaches_playing() {
    let state = test_state(2000);

    // The manager switches the application to running.
    let (manager, _manager_events) = connect(&state);
    let manager = Arc::new(manager);
    let _: bridgekit_proto::rpc::Empty = bridgekit_client::connection::call(
        manager.as_ref(),
        manager_pb::methods::SET_STATE,
        &manager_pb::SetStateRequest { state: manager_pb::SessionServerState::Active as i32 },
    )
    .await
    .unwrap();

    let (conn, mut events) = connect(&state);
    let conn = Arc::new(conn);
    let control = ControlClient::register(conn.clone()).await.unwrap();

    // In-process client: share the server's mapping directly instead of
    // opening the shm object a second time.
    let arena = state.arena.clone();
    let key_id_map = Arc::new(KeyIdMap::new());
    let mut pipeline = MediaPipeline::create(
        conn.clone(),
        arena,
        key_id_map,
        control.application_state(),
        1920,
        1080,
    )
    .await
    .unwrap();

    pipeline.load("video/mp4", "mse://app").await.unwrap();
    let source_id = pipeline
        .attach_source(
            "audio/mp4",
            &SourceConfig::Audio {
                sample_rate: 48_000,
                channels: 2,
                sample_size: None,
                is_big_endian: None,
                is_signed: None,
                is_float: None,
            },
            None,
            false,
        )
        .await
        .unwrap();
    pipeline.all_sources_attached().await.unwrap();

    // Drive the event loop until the server asks for data.
    let request_id = loop {
        let event = next_event(&mut events).await;
        if event.name.starts_with("control.") {
            control.handle_event(&event.name, &event.body).await.unwrap();
            continue;
        }
        match pipeline.handle_event(&event.name, &event.body) {
            Some(ClientNotification::NeedMediaData { request_id, .. }) => break request_id,
            _ => continue,
        }
    };

    let segment =
        MediaSegment::new_audio(source_id, 0, 20_000_000, 48_000, 2, vec![0xAA, 0xBB]);
    pipeline.add_segment(request_id, segment).unwrap();
    pipeline.have_data(MediaSourceStatus::Ok, request_id).await.unwrap();

    pipeline.play().await.unwrap();
    loop {
        let event = next_event(&mut events).await;
        if event.name.starts_with("control.") {
            continue;
        }
        if let Some(ClientNotification::PlaybackState(state)) =
            pipeline.handle_event(&event.name, &event.body)
        {
            if state == PlaybackState::Playing {
                break;
            }
        }
    }
    assert_eq!(pipeline.playback_state(), PlaybackState::Playing);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_disconnect_tears_down_owned_sessions() {
    let state = test_state(2000);
    let (conn, _events) = connect(&state);
    let conn = Arc::new(conn);

    let _: bridgekit_proto::mediapipeline::CreateSessionResponse =
        bridgekit_client::connection::call(
            conn.as_ref(),
            bridgekit_proto::mediapipeline::methods::CREATE_SESSION,
            &bridgekit_proto::mediapipeline::CreateSessionRequest {
                max_width: 1920,
                max_height: 1080,
            },
        )
        .await
        .unwrap();
    assert_eq!(
        state.sessions.lock().unwrap().session_count(),
        1
    );

    drop(conn);
    // Teardown runs on the connection task after the socket drops.
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if state.sessions.lock().unwrap().session_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session was not torn down after disconnect");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_shared_memory_discloses_the_arena() {
    let state = test_state(2000);
    let (conn, _events) = connect(&state);
    let response: control_pb::GetSharedMemoryResponse = bridgekit_client::connection::call(
        &conn,
        control_pb::methods::GET_SHARED_MEMORY,
        &control_pb::GetSharedMemoryRequest {},
    )
    .await
    .unwrap();
    assert_eq!(response.size, state.arena_size);
    assert!(!response.name.is_empty());
}
