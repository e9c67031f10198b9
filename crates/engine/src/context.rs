// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Mutable per-session playback state.
//!
//! Everything here is owned by one [`crate::player::PlayerActor`] and touched
//! only from inside task handlers, which is what makes the session's state
//! transitions totally ordered.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use bridgekit_core::types::{
    MediaSource, MediaType, PlaybackState, SessionId, ShmRegion, SourceId,
};
use bridgekit_shm::arena::{SessionPartitions, SharedMemoryArena};
use indexmap::IndexMap;

use crate::pipeline::PipelineBackend;
use crate::player::PlayerEvent;

/// The arena is mapped once per process and shared by every session actor;
/// partition isolation keeps the cross-actor locking window tiny.
pub type SharedArena = Arc<Mutex<SharedMemoryArena>>;

/// Deferred work a task asks the actor to schedule after it returns; task
/// handlers themselves never touch timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerRequest {
    /// Re-issue need-data for a type after the resend delay (used when a
    /// ticket was finalised with no available samples).
    ResendNeedData(MediaType),
    /// Re-check whether an audio underflow is genuine.
    CheckAudioUnderflow,
}

/// One outstanding need-data ticket issued to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTicket {
    pub request_id: u32,
    pub source_id: SourceId,
    pub media_type: MediaType,
    pub frame_count: u32,
    pub region: ShmRegion,
}

/// Per-session playback state mutated exclusively by tasks.
pub struct PlayerContext {
    pub session_id: SessionId,
    pub backend: Box<dyn PipelineBackend>,
    pub event_tx: tokio::sync::mpsc::UnboundedSender<PlayerEvent>,
    pub arena: SharedArena,
    pub partitions: SessionPartitions,

    /// Attached sources in attach order (audio switch re-appends).
    pub sources: IndexMap<SourceId, MediaSource>,
    pub next_source_id: SourceId,
    pub all_sources_attached: bool,

    pub playback_state: PlaybackState,
    /// Playback state to restore when a seek completes.
    pub state_before_seek: Option<PlaybackState>,
    pub playback_rate: f64,
    /// Seek target queued until the pipeline can accept it.
    pub queued_position: Option<i64>,
    /// Latched on pipeline failure; only stop and destruction remain.
    pub failed: bool,

    /// Outstanding ticket per source type; at most one per (session, type).
    pub active_tickets: HashMap<MediaType, PendingTicket>,
    pub next_request_id: u32,
    /// Source types the backend told us to stop feeding.
    pub suppressed: HashSet<MediaType>,
    /// Sources whose flush has not completed yet; need-data for them is
    /// suppressed until the backend reports `FlushCompleted`.
    pub flushing: HashSet<SourceId>,
    /// Source types with an underflow already signalled, for debouncing.
    pub underflow_active: HashSet<MediaType>,
    /// Sources that reached EOS (drained + signalled).
    pub eos_sources: HashSet<SourceId>,

    /// Timer work requested by the last task, drained by the actor loop.
    pub timer_requests: Vec<TimerRequest>,

    pub shutting_down: bool,
}

impl PlayerContext {
    pub fn emit(&self, event: PlayerEvent) {
        // The receiver disappears on session teardown; late events are fine
        // to drop.
        let _ = self.event_tx.send(event);
    }

    pub fn source(&self, source_id: SourceId) -> Option<&MediaSource> {
        self.sources.get(&source_id)
    }

    /// Source id carrying a given type, if attached.
    pub fn source_of_type(&self, media_type: MediaType) -> Option<SourceId> {
        self.sources
            .iter()
            .find(|(_, s)| s.config.media_type() == media_type)
            .map(|(id, _)| *id)
    }

    pub fn set_playback_state(&mut self, state: PlaybackState) {
        if self.playback_state == state {
            return;
        }
        tracing::debug!(
            session_id = self.session_id,
            from = ?self.playback_state,
            to = ?state,
            "playback state change"
        );
        self.playback_state = state;
        self.emit(PlayerEvent::PlaybackState(state));
    }

    /// Drops the outstanding ticket for a source type, if any. Used by
    /// flush, seek, remove-source and teardown.
    pub fn cancel_ticket(&mut self, media_type: MediaType) {
        if let Some(ticket) = self.active_tickets.remove(&media_type) {
            tracing::debug!(
                session_id = self.session_id,
                request_id = ticket.request_id,
                media_type = %media_type,
                "cancelled outstanding ticket"
            );
        }
    }

    pub fn cancel_all_tickets(&mut self) {
        self.active_tickets.clear();
    }

    /// Whether a fresh need-data may be issued for this type right now.
    pub fn may_request_data(&self, media_type: MediaType) -> bool {
        if self.failed || self.shutting_down {
            return false;
        }
        if self.active_tickets.contains_key(&media_type) {
            return false;
        }
        if self.suppressed.contains(&media_type) {
            return false;
        }
        match self.source_of_type(media_type) {
            Some(source_id) => !self.flushing.contains(&source_id),
            None => false,
        }
    }
}
