// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Web-audio player actor: a producer/consumer PCM ring over one shared
//! region.
//!
//! The client reserves a frame-aligned write window (`get_buffer_available`),
//! fills it through shared memory, and commits with `write_buffer`. Frames
//! the sink refuses become "stored" and are retried on the drain timer until
//! accepted; stored bytes stay fenced out of the free window, which is what
//! makes the hand-off safe without locks.

use bridgekit_core::constants::{WEB_AUDIO_DRAIN_INTERVAL, WEB_AUDIO_PREFERRED_FRAMES};
use bridgekit_core::error::{BridgeKitError, Result};
use bridgekit_core::types::{PcmConfig, ShmRegion};
use bridgekit_proto::webaudio::WebAudioShmInfo;
use tokio::sync::{mpsc, oneshot};

use crate::context::SharedArena;

/// Contract to the audio device. `write` returns the bytes accepted; a
/// saturated device accepts less than offered and the ring retries later.
pub trait AudioSink: Send {
    fn write(&mut self, data: &[u8]) -> usize;
    fn play(&mut self);
    fn pause(&mut self);
    fn set_eos(&mut self);
    fn set_volume(&mut self, volume: f64);
    fn volume(&self) -> f64;
    /// Frames queued inside the device itself.
    fn delay_frames(&self) -> u32;
}

/// Device-capability answers for `get_device_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub preferred_frames: u32,
    pub maximum_frames: u32,
    pub support_deferred_play: bool,
}

/// Observable player states pushed to the owning client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebAudioState {
    Idle,
    Playing,
    Paused,
    EndOfStream,
    Failure,
}

enum WebAudioMsg {
    Play,
    Pause,
    SetEos,
    GetBufferAvailable { response_tx: oneshot::Sender<(u32, WebAudioShmInfo)> },
    GetBufferDelay { response_tx: oneshot::Sender<u32> },
    WriteBuffer { frames: u32, response_tx: oneshot::Sender<Result<()>> },
    GetDeviceInfo { response_tx: oneshot::Sender<DeviceInfo> },
    SetVolume { volume: f64 },
    GetVolume { response_tx: oneshot::Sender<f64> },
    Shutdown { done: oneshot::Sender<()> },
}

/// The ring bookkeeping, kept separate from the actor for direct testing.
struct Ring {
    region: ShmRegion,
    bytes_per_frame: u32,
    capacity_frames: u32,
    /// First stored (committed, un-drained) frame, as a ring index.
    read_pos: u32,
    stored_frames: u32,
    /// Frames reserved by the last `get_buffer_available`.
    reserved: Option<u32>,
}

impl Ring {
    fn new(region: ShmRegion, pcm: &PcmConfig) -> Self {
        let bytes_per_frame = pcm.bytes_per_frame().max(1);
        Self {
            region,
            bytes_per_frame,
            capacity_frames: region.max_media_bytes / bytes_per_frame,
            read_pos: 0,
            stored_frames: 0,
            reserved: None,
        }
    }

    const fn available_frames(&self) -> u32 {
        self.capacity_frames - self.stored_frames
    }

    const fn write_head(&self) -> u32 {
        (self.read_pos + self.stored_frames) % self.capacity_frames
    }

    /// Reserves the whole free window. A second reservation supersedes the
    /// first; the window wraps when free space crosses the region end.
    fn reserve(&mut self) -> (u32, WebAudioShmInfo) {
        let available = self.available_frames();
        self.reserved = Some(available);
        let head = self.write_head();
        let until_end = (self.capacity_frames - head).min(available);
        let main_frames = until_end;
        let wrap_frames = available - main_frames;
        let base = self.region.media_data_offset;
        let info = WebAudioShmInfo {
            offset_main: base + head * self.bytes_per_frame,
            length_main: main_frames * self.bytes_per_frame,
            offset_wrap: base,
            length_wrap: wrap_frames * self.bytes_per_frame,
        };
        (available, info)
    }

    /// Commits `frames` of the reserved window into the stored range.
    fn commit(&mut self, frames: u32) -> Result<()> {
        let Some(reserved) = self.reserved.take() else {
            return Err(BridgeKitError::InvalidState(
                "write_buffer without a reserved window".to_string(),
            ));
        };
        if frames > reserved {
            return Err(BridgeKitError::Protocol(format!(
                "write of {frames} frames exceeds the reserved {reserved}"
            )));
        }
        self.stored_frames += frames;
        Ok(())
    }

    /// Byte range of the first `frames` stored frames; at most two spans
    /// when the stored range wraps.
    fn stored_spans(&self, frames: u32) -> [(u32, u32); 2] {
        let base = self.region.media_data_offset;
        let until_end = (self.capacity_frames - self.read_pos).min(frames);
        let first = (
            base + self.read_pos * self.bytes_per_frame,
            until_end * self.bytes_per_frame,
        );
        let second = (base, (frames - until_end) * self.bytes_per_frame);
        [first, second]
    }

    fn consume(&mut self, frames: u32) {
        self.read_pos = (self.read_pos + frames) % self.capacity_frames;
        self.stored_frames -= frames;
    }
}

/// Handle for driving a web-audio player actor.
#[derive(Clone)]
pub struct WebAudioHandle {
    msg_tx: mpsc::Sender<WebAudioMsg>,
}

macro_rules! ask {
    ($self:expr, $variant:ident) => {{
        let (response_tx, response_rx) = oneshot::channel();
        $self
            .msg_tx
            .send(WebAudioMsg::$variant { response_tx })
            .await
            .map_err(|_| BridgeKitError::InvalidState("web-audio actor has shut down".into()))?;
        response_rx
            .await
            .map_err(|_| BridgeKitError::InvalidState("web-audio actor dropped the query".into()))
    }};
}

impl WebAudioHandle {
    pub async fn play(&self) -> Result<()> {
        self.send(WebAudioMsg::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(WebAudioMsg::Pause).await
    }

    pub async fn set_eos(&self) -> Result<()> {
        self.send(WebAudioMsg::SetEos).await
    }

    pub async fn set_volume(&self, volume: f64) -> Result<()> {
        self.send(WebAudioMsg::SetVolume { volume }).await
    }

    pub async fn get_volume(&self) -> Result<f64> {
        ask!(self, GetVolume)
    }

    /// Reserves and returns the free write window.
    pub async fn get_buffer_available(&self) -> Result<(u32, WebAudioShmInfo)> {
        ask!(self, GetBufferAvailable)
    }

    /// Frames queued ahead of the device, stored frames included.
    pub async fn get_buffer_delay(&self) -> Result<u32> {
        ask!(self, GetBufferDelay)
    }

    pub async fn get_device_info(&self) -> Result<DeviceInfo> {
        ask!(self, GetDeviceInfo)
    }

    /// Commits `frames` of the reserved window and drains what the sink
    /// accepts right away.
    pub async fn write_buffer(&self, frames: u32) -> Result<()> {
        let (response_tx, response_rx) = oneshot::channel();
        self.msg_tx
            .send(WebAudioMsg::WriteBuffer { frames, response_tx })
            .await
            .map_err(|_| BridgeKitError::InvalidState("web-audio actor has shut down".into()))?;
        response_rx
            .await
            .map_err(|_| BridgeKitError::InvalidState("web-audio actor dropped the call".into()))?
    }

    pub async fn shutdown_and_wait(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        if self.msg_tx.send(WebAudioMsg::Shutdown { done: done_tx }).await.is_err() {
            return Ok(());
        }
        let _ = done_rx.await;
        Ok(())
    }

    async fn send(&self, msg: WebAudioMsg) -> Result<()> {
        self.msg_tx
            .send(msg)
            .await
            .map_err(|_| BridgeKitError::InvalidState("web-audio actor has shut down".into()))
    }
}

/// The web-audio player actor.
pub struct WebAudioPlayerActor {
    handle_id: i32,
    ring: Ring,
    sink: Box<dyn AudioSink>,
    arena: SharedArena,
    state: WebAudioState,
    eos_pending: bool,
    state_tx: mpsc::UnboundedSender<WebAudioState>,
    msg_rx: mpsc::Receiver<WebAudioMsg>,
}

impl WebAudioPlayerActor {
    /// Spawns the actor for one player over its ring region.
    pub fn spawn(
        handle_id: i32,
        region: ShmRegion,
        pcm: &PcmConfig,
        sink: Box<dyn AudioSink>,
        arena: SharedArena,
        state_tx: mpsc::UnboundedSender<WebAudioState>,
    ) -> WebAudioHandle {
        let (msg_tx, msg_rx) = mpsc::channel(16);
        let actor = Self {
            handle_id,
            ring: Ring::new(region, pcm),
            sink,
            arena,
            state: WebAudioState::Idle,
            eos_pending: false,
            state_tx,
            msg_rx,
        };
        tokio::spawn(actor.run());
        WebAudioHandle { msg_tx }
    }

    async fn run(mut self) {
        tracing::info!(handle = self.handle_id, "web-audio actor started");
        let _ = self.state_tx.send(WebAudioState::Idle);
        let mut drain_timer = tokio::time::interval(WEB_AUDIO_DRAIN_INTERVAL);
        drain_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                Some(msg) = self.msg_rx.recv() => {
                    if self.handle_message(msg) {
                        break;
                    }
                },
                _ = drain_timer.tick() => {
                    if self.ring.stored_frames > 0 {
                        self.drain();
                    }
                    self.check_eos();
                },
                else => break,
            }
        }
        tracing::info!(handle = self.handle_id, "web-audio actor shutting down");
    }

    fn handle_message(&mut self, msg: WebAudioMsg) -> bool {
        match msg {
            WebAudioMsg::Play => {
                self.sink.play();
                self.set_state(WebAudioState::Playing);
            }
            WebAudioMsg::Pause => {
                self.sink.pause();
                self.set_state(WebAudioState::Paused);
            }
            WebAudioMsg::SetEos => {
                self.eos_pending = true;
                self.check_eos();
            }
            WebAudioMsg::GetBufferAvailable { response_tx } => {
                let _ = response_tx.send(self.ring.reserve());
            }
            WebAudioMsg::GetBufferDelay { response_tx } => {
                let _ = response_tx.send(self.ring.stored_frames + self.sink.delay_frames());
            }
            WebAudioMsg::WriteBuffer { frames, response_tx } => {
                let result = self.ring.commit(frames).map(|()| self.drain());
                let _ = response_tx.send(result);
            }
            WebAudioMsg::GetDeviceInfo { response_tx } => {
                let capacity = self.ring.capacity_frames;
                let _ = response_tx.send(DeviceInfo {
                    preferred_frames: WEB_AUDIO_PREFERRED_FRAMES.min(capacity),
                    maximum_frames: capacity,
                    support_deferred_play: true,
                });
            }
            WebAudioMsg::SetVolume { volume } => self.sink.set_volume(volume),
            WebAudioMsg::GetVolume { response_tx } => {
                let _ = response_tx.send(self.sink.volume());
            }
            WebAudioMsg::Shutdown { done } => {
                let _ = done.send(());
                return true;
            }
        }
        false
    }

    /// Offers the stored range to the sink once, consuming what it accepts.
    /// A sink that refused bytes now would refuse them again immediately, so
    /// leftovers wait for the drain timer rather than a busy retry.
    fn drain(&mut self) {
        if self.ring.stored_frames == 0 {
            return;
        }
        let spans = self.ring.stored_spans(self.ring.stored_frames);
        let mut accepted_bytes = 0usize;
        {
            let arena = self.arena.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let buf = arena.as_slice();
            for (offset, len) in spans {
                if len == 0 {
                    break;
                }
                let span = &buf[offset as usize..(offset + len) as usize];
                let n = self.sink.write(span);
                accepted_bytes += n;
                if n < span.len() {
                    break;
                }
            }
        }
        let accepted_frames = accepted_bytes as u32 / self.ring.bytes_per_frame;
        if accepted_frames > 0 {
            self.ring.consume(accepted_frames);
        }
    }

    fn check_eos(&mut self) {
        if self.eos_pending && self.ring.stored_frames == 0 {
            self.sink.set_eos();
            self.set_state(WebAudioState::EndOfStream);
            self.eos_pending = false;
        }
    }

    fn set_state(&mut self, state: WebAudioState) {
        if self.state != state {
            self.state = state;
            let _ = self.state_tx.send(state);
        }
    }
}

/// A sink accepting a bounded number of bytes per write, for tests and for
/// running without audio hardware.
pub struct BoundedSink {
    pub accept_bytes_per_write: usize,
    pub written: Vec<u8>,
    volume: f64,
}

impl BoundedSink {
    pub fn new(accept_bytes_per_write: usize) -> Self {
        Self { accept_bytes_per_write, written: Vec::new(), volume: 1.0 }
    }
}

impl AudioSink for BoundedSink {
    fn write(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.accept_bytes_per_write);
        self.written.extend_from_slice(&data[..n]);
        n
    }

    fn play(&mut self) {}
    fn pause(&mut self) {}
    fn set_eos(&mut self) {}

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn delay_frames(&self) -> u32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_of(capacity_frames: u32) -> Ring {
        let region = ShmRegion {
            metadata_offset: 0,
            max_metadata_bytes: 0,
            media_data_offset: 0,
            max_media_bytes: capacity_frames * 4,
        };
        Ring::new(region, &PcmConfig::default())
    }

    #[test]
    fn test_reserve_commit_and_wrap_arithmetic() {
        let mut ring = ring_of(64);

        let (available, info) = ring.reserve();
        assert_eq!(available, 64);
        assert_eq!((info.offset_main, info.length_main), (0, 64 * 4));
        assert_eq!(info.length_wrap, 0);

        // Commit half the region, drain a quarter.
        ring.commit(32).unwrap();
        ring.consume(16);

        let (available, info) = ring.reserve();
        assert_eq!(available, 64 - 16);
        // Free window runs from frame 32 to the end, wrapping to frame 16.
        assert_eq!((info.offset_main, info.length_main), (32 * 4, 32 * 4));
        assert_eq!((info.offset_wrap, info.length_wrap), (0, 16 * 4));

        // Remaining stored frames drain; the whole ring frees up.
        ring.consume(16);
        let (available, _) = ring.reserve();
        assert_eq!(available, 64);
    }

    #[test]
    fn test_commit_without_reservation_fails() {
        let mut ring = ring_of(8);
        assert!(ring.commit(1).is_err());
        ring.reserve();
        assert!(ring.commit(9).is_err());
        // The failed oversized commit consumed the reservation.
        assert!(ring.commit(1).is_err());
    }

    #[test]
    fn test_second_reservation_supersedes_first() {
        let mut ring = ring_of(8);
        ring.reserve();
        ring.commit(4).unwrap();
        let (first, _) = ring.reserve();
        let (second, _) = ring.reserve();
        assert_eq!(first, 4);
        assert_eq!(second, 4);
        ring.commit(4).unwrap();
        assert_eq!(ring.available_frames(), 0);
    }

    #[test]
    fn test_stored_spans_wrap() {
        let mut ring = ring_of(8);
        ring.reserve();
        ring.commit(6).unwrap();
        ring.consume(6);
        // read_pos = 6; store 4 frames wrapping past the end.
        ring.reserve();
        ring.commit(4).unwrap();
        let spans = ring.stored_spans(4);
        assert_eq!(spans[0], (6 * 4, 2 * 4));
        assert_eq!(spans[1], (0, 2 * 4));
    }
}
