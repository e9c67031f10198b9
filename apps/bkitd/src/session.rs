// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Session bookkeeping: handle minting, arena-slot allocation, metrics.

use std::collections::HashMap;
use std::time::SystemTime;

use bridgekit_core::error::{BridgeKitError, Result};
use bridgekit_core::types::SessionId;
use bridgekit_engine::PlayerHandle;
use opentelemetry::global;

/// One live media session.
#[derive(Clone)]
pub struct SessionEntry {
    pub handle: PlayerHandle,
    /// Arena slot whose partitions this session owns.
    pub slot: usize,
    pub created_at: SystemTime,
}

/// Manager for every active media session in the process.
pub struct SessionManager {
    sessions: HashMap<SessionId, SessionEntry>,
    free_slots: Vec<usize>,
    next_session_id: SessionId,
    // Metrics
    sessions_active_gauge: opentelemetry::metrics::Gauge<u64>,
    sessions_created_counter: opentelemetry::metrics::Counter<u64>,
    sessions_destroyed_counter: opentelemetry::metrics::Counter<u64>,
    session_duration_histogram: opentelemetry::metrics::Histogram<f64>,
}

impl SessionManager {
    pub fn new(slot_count: usize) -> Self {
        let meter = global::meter("bkitd_sessions");
        Self {
            sessions: HashMap::new(),
            // Lowest slot first
            free_slots: (0..slot_count).rev().collect(),
            next_session_id: 0,
            sessions_active_gauge: meter
                .u64_gauge("sessions.active")
                .with_description("Number of active sessions")
                .build(),
            sessions_created_counter: meter
                .u64_counter("sessions.created")
                .with_description("Total number of sessions created")
                .build(),
            sessions_destroyed_counter: meter
                .u64_counter("sessions.destroyed")
                .with_description("Total number of sessions destroyed")
                .build(),
            session_duration_histogram: meter
                .f64_histogram("session.duration")
                .with_description("Session lifetime duration in seconds")
                .with_unit("s")
                .build(),
        }
    }

    /// Mints a session handle and reserves an arena slot for it.
    ///
    /// # Errors
    ///
    /// Fails when every slot is in use.
    pub fn allocate(&mut self) -> Result<(SessionId, usize)> {
        let slot = self.free_slots.pop().ok_or_else(|| {
            BridgeKitError::ResourceExhausted("no free session slot".to_string())
        })?;
        let session_id = self.next_session_id;
        self.next_session_id += 1;
        Ok((session_id, slot))
    }

    /// Returns an unused slot (allocation that never became a session).
    pub fn release_slot(&mut self, slot: usize) {
        self.free_slots.push(slot);
    }

    pub fn insert(&mut self, session_id: SessionId, entry: SessionEntry) {
        self.sessions.insert(session_id, entry);
        self.sessions_created_counter.add(1, &[]);
        self.sessions_active_gauge.record(self.sessions.len() as u64, &[]);
    }

    pub fn get(&self, session_id: SessionId) -> Option<&SessionEntry> {
        self.sessions.get(&session_id)
    }

    pub fn handle(&self, session_id: SessionId) -> Result<PlayerHandle> {
        self.sessions
            .get(&session_id)
            .map(|e| e.handle.clone())
            .ok_or_else(|| BridgeKitError::NotFound(format!("session {session_id}")))
    }

    /// Removes a session, freeing its slot and recording metrics. The
    /// caller shuts the actor down.
    pub fn remove(&mut self, session_id: SessionId) -> Option<SessionEntry> {
        let entry = self.sessions.remove(&session_id)?;
        self.free_slots.push(entry.slot);
        let duration =
            SystemTime::now().duration_since(entry.created_at).unwrap_or_default();
        self.sessions_destroyed_counter.add(1, &[]);
        self.sessions_active_gauge.record(self.sessions.len() as u64, &[]);
        self.session_duration_histogram.record(duration.as_secs_f64(), &[]);
        tracing::info!(session_id, "removed session");
        Some(entry)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Snapshot of (session id, handle) pairs, e.g. for heartbeat workers.
    pub fn handles(&self) -> Vec<(SessionId, PlayerHandle)> {
        self.sessions.iter().map(|(id, e)| (*id, e.handle.clone())).collect()
    }
}
