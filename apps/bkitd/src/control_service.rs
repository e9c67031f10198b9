// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Control registry and application-state fan-out.
//!
//! Each registered control is a client subscription to lifecycle state and
//! ping/ack liveness. The service owns the controls outright; clients hold
//! only their integer id. Registration pushes the current state; every later
//! transition is broadcast to all live controls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bridgekit_core::types::ApplicationState;
use bridgekit_proto::control as pb;
use bridgekit_proto::rpc::Frame;
use tokio::sync::mpsc;

use crate::heartbeat::{Handler, HeartbeatProcedure};

struct Control {
    event_tx: mpsc::UnboundedSender<Frame>,
}

struct Inner {
    controls: HashMap<i32, Control>,
    app_state: ApplicationState,
    current_ping: Option<Arc<HeartbeatProcedure>>,
}

/// Registry of controls plus the process-wide application state.
pub struct ControlService {
    inner: Mutex<Inner>,
}

impl Default for ControlService {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlService {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                controls: HashMap::new(),
                app_state: ApplicationState::Unknown,
                current_ping: None,
            }),
        }
    }

    /// Registers a control. A duplicate id is rejected and the existing
    /// registration stays untouched; replacement would orphan a live
    /// client's ack channel mid-heartbeat. Returns the state to seed the
    /// client with.
    pub fn add_control(
        &self,
        control_id: i32,
        event_tx: mpsc::UnboundedSender<Frame>,
    ) -> Option<ApplicationState> {
        let mut inner = self.lock();
        if inner.controls.contains_key(&control_id) {
            tracing::warn!(control_id, "rejecting duplicate control registration");
            return None;
        }
        tracing::info!(control_id, "created control");
        inner.controls.insert(control_id, Control { event_tx });
        Some(inner.app_state)
    }

    pub fn remove_control(&self, control_id: i32) -> bool {
        let mut inner = self.lock();
        let removed = inner.controls.remove(&control_id).is_some();
        if removed {
            tracing::info!(control_id, "removed control");
        }
        removed
    }

    pub fn control_ids(&self) -> Vec<i32> {
        self.lock().controls.keys().copied().collect()
    }

    /// Routes an ack from a control to the in-flight heartbeat.
    pub fn ack(&self, control_id: i32, ping_id: u32) -> bool {
        let inner = self.lock();
        if !inner.controls.contains_key(&control_id) {
            tracing::warn!(control_id, "ack from an unknown control");
            return false;
        }
        match &inner.current_ping {
            Some(procedure) => procedure.ack(Handler::Control(control_id), ping_id),
            None => {
                tracing::debug!(control_id, ping_id, "ack with no ping in flight");
                false
            }
        }
    }

    pub fn application_state(&self) -> ApplicationState {
        self.lock().app_state
    }

    /// Stores the new state and pushes it to every live control.
    pub fn set_application_state(&self, state: ApplicationState) {
        let senders = {
            let mut guard = self.lock();
            guard.app_state = state;
            guard.controls.values().map(|c| c.event_tx.clone()).collect::<Vec<_>>()
        };
        tracing::info!(state = ?state, controls = senders.len(), "application state fan-out");
        let event = pb::ApplicationStateChangeEvent {
            application_state: application_state_to_wire(state) as i32,
        };
        for event_tx in senders {
            let _ = event_tx.send(Frame::event(pb::events::APPLICATION_STATE, &event));
        }
    }

    /// Arms a heartbeat over the given extra workers plus every control and
    /// sends each control its ping. Returns the completion receiver; callers
    /// wait on it with their timeout budget.
    pub fn ping(
        &self,
        ping_id: u32,
        workers: impl IntoIterator<Item = Handler>,
    ) -> (Arc<HeartbeatProcedure>, tokio::sync::oneshot::Receiver<()>) {
        let mut inner = self.lock();
        let handlers = inner
            .controls
            .keys()
            .map(|id| Handler::Control(*id))
            .chain(workers)
            .collect::<Vec<_>>();
        let (procedure, complete_rx) = HeartbeatProcedure::new(ping_id, handlers);
        let procedure = Arc::new(procedure);
        inner.current_ping = Some(procedure.clone());

        for (control_id, control) in &inner.controls {
            let event = pb::PingEvent { control_id: *control_id, id: ping_id };
            let _ = control.event_tx.send(Frame::event(pb::events::PING, &event));
        }
        (procedure, complete_rx)
    }

    /// Drops the in-flight procedure if it is still the given one.
    pub fn finish_ping(&self, ping_id: u32) {
        let mut inner = self.lock();
        if inner.current_ping.as_ref().is_some_and(|p| p.id() == ping_id) {
            inner.current_ping = None;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

pub fn application_state_to_wire(state: ApplicationState) -> pb::ApplicationState {
    match state {
        ApplicationState::Unknown => pb::ApplicationState::UnknownState,
        ApplicationState::Inactive => pb::ApplicationState::Inactive,
        ApplicationState::Running => pb::ApplicationState::Running,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control_channel() -> (mpsc::UnboundedSender<Frame>, mpsc::UnboundedReceiver<Frame>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_duplicate_control_id_is_rejected() {
        let service = ControlService::new();
        let (tx1, _rx1) = control_channel();
        let (tx2, _rx2) = control_channel();
        assert!(service.add_control(4, tx1).is_some());
        assert!(service.add_control(4, tx2).is_none());
        assert_eq!(service.control_ids(), vec![4]);
    }

    #[test]
    fn test_state_fan_out_reaches_every_control() {
        let service = ControlService::new();
        let (tx1, mut rx1) = control_channel();
        let (tx2, mut rx2) = control_channel();
        service.add_control(1, tx1);
        service.add_control(2, tx2);

        service.set_application_state(ApplicationState::Running);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        assert_eq!(service.application_state(), ApplicationState::Running);
    }

    #[tokio::test]
    async fn test_ping_reaches_controls_and_acks_complete() {
        let service = ControlService::new();
        let (tx1, mut rx1) = control_channel();
        let (tx2, mut rx2) = control_channel();
        service.add_control(1, tx1);
        service.add_control(2, tx2);

        let (_procedure, complete_rx) = service.ping(7, []);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());

        assert!(service.ack(1, 7));
        assert!(service.ack(2, 7));
        assert!(crate::heartbeat::wait(complete_rx, std::time::Duration::from_millis(50)).await);
        service.finish_ping(7);

        // The next ping proceeds independently.
        let (_procedure, complete_rx) = service.ping(8, []);
        service.ack(1, 8);
        service.ack(2, 8);
        assert!(crate::heartbeat::wait(complete_rx, std::time::Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn test_missing_control_ack_reports_timeout() {
        let service = ControlService::new();
        let (tx1, _rx1) = control_channel();
        let (tx2, _rx2) = control_channel();
        service.add_control(1, tx1);
        service.add_control(2, tx2);

        let (_procedure, complete_rx) = service.ping(7, []);
        service.ack(1, 7);
        assert!(!crate::heartbeat::wait(complete_rx, std::time::Duration::from_millis(20)).await);
    }
}
