// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The pipeline backend seam.
//!
//! Everything the tasks need from the real media stack is behind
//! [`PipelineBackend`]; the concrete element graph, pad linking and decryptor
//! wiring live outside this workspace. The backend reports asynchronous
//! conditions as [`BusMessage`]s on a channel the player actor owns, so bus
//! handling is serialised with every other mutation.
//!
//! [`sim::SimPipeline`] is a deterministic in-memory backend honouring the
//! same contract, used by the daemon's default wiring and by tests.

use bridgekit_core::error::Result;
use bridgekit_core::types::{
    MediaSegment, MediaSource, MediaType, QosInfo, SourceId, VideoGeometry,
};
use tokio::sync::mpsc;

/// Coarse pipeline element state, mirrored from the backend's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Null,
    Ready,
    Paused,
    Playing,
}

/// Asynchronous notifications from the backend, consumed on the player
/// actor's thread as `HandleBusMessage` tasks.
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    StateChanged(PipelineState),
    Eos,
    Error(String),
    Warning(String),
    Qos { source_id: SourceId, info: QosInfo },
    Buffering { percent: u32 },
    /// The source queue ran low; upstream should request more data.
    NeedData { media_type: MediaType },
    /// The source queue is full; stop issuing tickets until `NeedData`.
    EnoughData { media_type: MediaType },
    Underflow { media_type: MediaType },
    /// The backend finished its own flush of a source.
    FlushCompleted { source_id: SourceId },
}

/// Contract the player tasks drive. Calls are synchronous and cheap; long
/// operations complete via [`BusMessage`]s.
pub trait PipelineBackend: Send {
    fn load(&mut self, mime_type: &str, url: &str) -> Result<()>;
    fn attach_source(&mut self, source: &MediaSource) -> Result<()>;
    fn remove_source(&mut self, source_id: SourceId) -> Result<()>;
    fn all_sources_attached(&mut self) -> Result<()>;

    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn set_playback_rate(&mut self, rate: f64) -> Result<()>;

    /// Seeks the whole pipeline; completion is a `StateChanged` +
    /// per-source `FlushCompleted` sequence.
    fn seek(&mut self, position_ns: i64) -> Result<()>;
    fn set_source_position(
        &mut self,
        source_id: SourceId,
        position_ns: i64,
        reset_time: bool,
    ) -> Result<()>;
    fn flush(&mut self, source_id: SourceId, reset_time: bool) -> Result<()>;

    fn push_sample(&mut self, segment: MediaSegment) -> Result<()>;
    fn signal_eos(&mut self, source_id: SourceId) -> Result<()>;
    fn queued_frames(&self, media_type: MediaType) -> usize;

    fn position(&mut self) -> Result<i64>;
    fn set_volume(&mut self, volume: f64) -> Result<()>;
    fn volume(&self) -> f64;
    fn set_mute(&mut self, source_id: Option<SourceId>, mute: bool) -> Result<()>;
    fn set_video_geometry(&mut self, geometry: VideoGeometry) -> Result<()>;
    fn set_immediate_output(&mut self, source_id: SourceId, enabled: bool) -> Result<()>;
    fn render_frame(&mut self) -> Result<()>;
}

pub mod sim {
    //! Deterministic in-memory pipeline used by default wiring and tests.
    //!
    //! Sources hold plain queues; state changes succeed immediately and are
    //! reported on the bus the way a real backend would. Need-data is
    //! signalled whenever a source queue drops below the low watermark.

    use super::{BusMessage, PipelineBackend, PipelineState};
    use bridgekit_core::error::{BridgeKitError, Result};
    use bridgekit_core::types::{
        MediaSegment, MediaSource, MediaType, SourceId, VideoGeometry,
    };
    use std::collections::HashMap;
    use tokio::sync::mpsc;

    const LOW_WATERMARK: usize = 4;

    #[derive(Debug)]
    struct SimSource {
        media_type: MediaType,
        queue: Vec<MediaSegment>,
        eos: bool,
    }

    /// In-memory stand-in for the media stack.
    pub struct SimPipeline {
        bus_tx: mpsc::UnboundedSender<BusMessage>,
        sources: HashMap<SourceId, SimSource>,
        state: PipelineState,
        position_ns: i64,
        volume: f64,
        rate: f64,
        loaded: bool,
    }

    impl SimPipeline {
        pub fn new(bus_tx: mpsc::UnboundedSender<BusMessage>) -> Self {
            Self {
                bus_tx,
                sources: HashMap::new(),
                state: PipelineState::Null,
                position_ns: 0,
                volume: 1.0,
                rate: 1.0,
                loaded: false,
            }
        }

        fn emit(&self, msg: BusMessage) {
            let _ = self.bus_tx.send(msg);
        }

        fn request_data_if_low(&self, source_id: SourceId) {
            if let Some(source) = self.sources.get(&source_id) {
                if !source.eos && source.queue.len() < LOW_WATERMARK {
                    self.emit(BusMessage::NeedData { media_type: source.media_type });
                }
            }
        }
    }

    impl PipelineBackend for SimPipeline {
        fn load(&mut self, _mime_type: &str, _url: &str) -> Result<()> {
            self.loaded = true;
            self.state = PipelineState::Ready;
            self.emit(BusMessage::StateChanged(PipelineState::Ready));
            Ok(())
        }

        fn attach_source(&mut self, source: &MediaSource) -> Result<()> {
            if !self.loaded {
                return Err(BridgeKitError::InvalidState(
                    "attach_source before load".to_string(),
                ));
            }
            self.sources.insert(
                source.source_id,
                SimSource {
                    media_type: source.config.media_type(),
                    queue: Vec::new(),
                    eos: false,
                },
            );
            Ok(())
        }

        fn remove_source(&mut self, source_id: SourceId) -> Result<()> {
            self.sources
                .remove(&source_id)
                .map(|_| ())
                .ok_or_else(|| BridgeKitError::NotFound(format!("source {source_id}")))
        }

        fn all_sources_attached(&mut self) -> Result<()> {
            // Preroll completes as soon as the source set is final, then the
            // queues ask for their first samples.
            self.state = PipelineState::Paused;
            self.emit(BusMessage::StateChanged(PipelineState::Paused));
            for id in self.sources.keys().copied().collect::<Vec<_>>() {
                self.request_data_if_low(id);
            }
            Ok(())
        }

        fn play(&mut self) -> Result<()> {
            self.state = PipelineState::Playing;
            self.emit(BusMessage::StateChanged(PipelineState::Playing));
            Ok(())
        }

        fn pause(&mut self) -> Result<()> {
            self.state = PipelineState::Paused;
            self.emit(BusMessage::StateChanged(PipelineState::Paused));
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.state = PipelineState::Null;
            self.emit(BusMessage::StateChanged(PipelineState::Null));
            Ok(())
        }

        fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
            self.rate = rate;
            Ok(())
        }

        fn seek(&mut self, position_ns: i64) -> Result<()> {
            self.position_ns = position_ns;
            let ids: Vec<SourceId> = self.sources.keys().copied().collect();
            for source in self.sources.values_mut() {
                source.queue.clear();
            }
            for source_id in ids {
                self.emit(BusMessage::FlushCompleted { source_id });
            }
            self.emit(BusMessage::StateChanged(self.state));
            Ok(())
        }

        fn set_source_position(
            &mut self,
            source_id: SourceId,
            position_ns: i64,
            _reset_time: bool,
        ) -> Result<()> {
            if !self.sources.contains_key(&source_id) {
                return Err(BridgeKitError::NotFound(format!("source {source_id}")));
            }
            self.position_ns = position_ns;
            Ok(())
        }

        fn flush(&mut self, source_id: SourceId, reset_time: bool) -> Result<()> {
            let source = self
                .sources
                .get_mut(&source_id)
                .ok_or_else(|| BridgeKitError::NotFound(format!("source {source_id}")))?;
            source.queue.clear();
            source.eos = false;
            if reset_time {
                self.position_ns = 0;
            }
            self.emit(BusMessage::FlushCompleted { source_id });
            Ok(())
        }

        fn push_sample(&mut self, segment: MediaSegment) -> Result<()> {
            let source = self.sources.get_mut(&segment.source_id).ok_or_else(|| {
                BridgeKitError::NotFound(format!("source {}", segment.source_id))
            })?;
            source.queue.push(segment);
            Ok(())
        }

        fn signal_eos(&mut self, source_id: SourceId) -> Result<()> {
            let source = self
                .sources
                .get_mut(&source_id)
                .ok_or_else(|| BridgeKitError::NotFound(format!("source {source_id}")))?;
            source.eos = true;
            if self.sources.values().all(|s| s.eos) {
                self.emit(BusMessage::Eos);
            }
            Ok(())
        }

        fn queued_frames(&self, media_type: MediaType) -> usize {
            self.sources
                .values()
                .filter(|s| s.media_type == media_type)
                .map(|s| s.queue.len())
                .sum()
        }

        fn position(&mut self) -> Result<i64> {
            Ok(self.position_ns)
        }

        fn set_volume(&mut self, volume: f64) -> Result<()> {
            self.volume = volume;
            Ok(())
        }

        fn volume(&self) -> f64 {
            self.volume
        }

        fn set_mute(&mut self, _source_id: Option<SourceId>, _mute: bool) -> Result<()> {
            Ok(())
        }

        fn set_video_geometry(&mut self, _geometry: VideoGeometry) -> Result<()> {
            Ok(())
        }

        fn set_immediate_output(&mut self, source_id: SourceId, _enabled: bool) -> Result<()> {
            if self.sources.contains_key(&source_id) {
                Ok(())
            } else {
                Err(BridgeKitError::NotFound(format!("source {source_id}")))
            }
        }

        fn render_frame(&mut self) -> Result<()> {
            if self.state == PipelineState::Null {
                return Err(BridgeKitError::InvalidState(
                    "render_frame on a stopped pipeline".to_string(),
                ));
            }
            Ok(())
        }
    }
}

/// Creates a bus channel pair for wiring a backend to a player actor.
pub fn bus_channel() -> (mpsc::UnboundedSender<BusMessage>, mpsc::UnboundedReceiver<BusMessage>) {
    mpsc::unbounded_channel()
}
