// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Heartbeat procedure: one ping id, one ack set.
//!
//! A procedure is armed with every handler expected to answer — registered
//! controls and the per-session worker actors. Acks are correlated by ping
//! id; stale and duplicate acks are tolerated and discarded. When the set
//! empties the procedure completes; otherwise the caller's timeout reports
//! the failure.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;

/// A party expected to ack one ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handler {
    /// A registered control, keyed by control id.
    Control(i32),
    /// A session worker actor, keyed by session id.
    Worker(i32),
}

#[derive(Debug)]
struct Inner {
    awaiting: HashSet<Handler>,
    complete_tx: Option<oneshot::Sender<()>>,
}

/// Ack collector for a single ping.
#[derive(Debug)]
pub struct HeartbeatProcedure {
    id: u32,
    inner: Mutex<Inner>,
}

impl HeartbeatProcedure {
    /// Arms a procedure. An empty handler set completes immediately.
    pub fn new(id: u32, handlers: impl IntoIterator<Item = Handler>) -> (Self, oneshot::Receiver<()>) {
        let (complete_tx, complete_rx) = oneshot::channel();
        let awaiting: HashSet<Handler> = handlers.into_iter().collect();
        let mut complete_tx = Some(complete_tx);
        if awaiting.is_empty() {
            if let Some(tx) = complete_tx.take() {
                let _ = tx.send(());
            }
        }
        (Self { id, inner: Mutex::new(Inner { awaiting, complete_tx }) }, complete_rx)
    }

    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Records one ack. Returns `false` for acks of a different ping id,
    /// which are discarded. Duplicate acks are tolerated.
    pub fn ack(&self, handler: Handler, ping_id: u32) -> bool {
        if ping_id != self.id {
            tracing::debug!(ping_id, expected = self.id, "discarding stale ack");
            return false;
        }
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.awaiting.remove(&handler);
        if inner.awaiting.is_empty() {
            if let Some(tx) = inner.complete_tx.take() {
                let _ = tx.send(());
            }
        }
        true
    }

    /// Handlers still owing an ack (used by failure reporting).
    pub fn outstanding(&self) -> usize {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).awaiting.len()
    }
}

/// Waits for the ack set to complete within the budget. `true` means every
/// handler answered.
pub async fn wait(complete_rx: oneshot::Receiver<()>, timeout: Duration) -> bool {
    matches!(tokio::time::timeout(timeout, complete_rx).await, Ok(Ok(())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_acks_complete_the_procedure() {
        let (procedure, complete_rx) =
            HeartbeatProcedure::new(7, [Handler::Control(1), Handler::Control(2)]);
        assert!(procedure.ack(Handler::Control(1), 7));
        assert_eq!(procedure.outstanding(), 1);
        assert!(procedure.ack(Handler::Control(2), 7));
        assert!(wait(complete_rx, Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn test_missing_ack_times_out() {
        let (procedure, complete_rx) =
            HeartbeatProcedure::new(7, [Handler::Control(1), Handler::Control(2)]);
        procedure.ack(Handler::Control(1), 7);
        assert!(!wait(complete_rx, Duration::from_millis(20)).await);
        assert_eq!(procedure.outstanding(), 1);
    }

    #[tokio::test]
    async fn test_stale_and_duplicate_acks_are_tolerated() {
        let (procedure, complete_rx) = HeartbeatProcedure::new(8, [Handler::Control(1)]);
        // Ack for the previous ping is discarded.
        assert!(!procedure.ack(Handler::Control(1), 7));
        assert_eq!(procedure.outstanding(), 1);
        assert!(procedure.ack(Handler::Control(1), 8));
        // Duplicate is a no-op.
        assert!(procedure.ack(Handler::Control(1), 8));
        assert!(wait(complete_rx, Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn test_empty_handler_set_completes_immediately() {
        let (_procedure, complete_rx) = HeartbeatProcedure::new(9, []);
        assert!(wait(complete_rx, Duration::from_millis(5)).await);
    }
}
