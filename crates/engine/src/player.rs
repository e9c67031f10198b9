// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The per-session player actor and its handle.
//!
//! The actor's mailbox is the session's serialised executor: IPC services
//! enqueue tasks, the pipeline bus feeds reaction tasks, and two timers
//! drive position reports and deferred work. Nothing outside the actor ever
//! touches session state.

use std::sync::Arc;

use bridgekit_core::constants::{
    AUDIO_UNDERFLOW_RECHECK, NEED_DATA_RESEND_DELAY, POSITION_REPORT_INTERVAL,
};
use bridgekit_core::error::{BridgeKitError, Result};
use bridgekit_core::types::{
    NetworkState, PlaybackState, QosInfo, SessionId, SourceId,
};
use bridgekit_shm::arena::SessionPartitions;
use tokio::sync::{mpsc, oneshot};

use crate::context::{PendingTicket, PlayerContext, SharedArena, TimerRequest};
use crate::pipeline::{BusMessage, PipelineBackend};
use crate::tasks::{self, PlayerTask, TaskOutcome};

const TASK_CHANNEL_CAPACITY: usize = 64;

/// Notifications the session pushes towards the owning client.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    PlaybackState(PlaybackState),
    NetworkState(NetworkState),
    Position(i64),
    Qos { source_id: SourceId, info: QosInfo },
    NeedMediaData(PendingTicket),
    SourceFlushed { source_id: SourceId },
    BufferingProgress { percent: u32 },
    EosNotification { source_id: SourceId },
}

/// Read-only questions answered without mutating session state.
#[derive(Debug)]
pub enum PlayerQuery {
    GetPosition { response_tx: oneshot::Sender<Result<i64>> },
    GetVolume { response_tx: oneshot::Sender<f64> },
    GetState { response_tx: oneshot::Sender<PlaybackState> },
}

struct EnqueuedTask {
    task: PlayerTask,
    done: Option<oneshot::Sender<Result<TaskOutcome>>>,
}

/// The session actor. Owns the [`PlayerContext`] and drains tasks until
/// shutdown.
pub struct PlayerActor {
    ctx: PlayerContext,
    task_rx: mpsc::Receiver<EnqueuedTask>,
    query_rx: mpsc::Receiver<PlayerQuery>,
    bus_rx: mpsc::UnboundedReceiver<BusMessage>,
    /// Self-sender for timer-scheduled tasks.
    self_tx: mpsc::Sender<EnqueuedTask>,
}

impl PlayerActor {
    /// Spawns the actor for one session and returns its handle.
    pub fn spawn(
        session_id: SessionId,
        backend: Box<dyn PipelineBackend>,
        bus_rx: mpsc::UnboundedReceiver<BusMessage>,
        arena: SharedArena,
        partitions: SessionPartitions,
        event_tx: mpsc::UnboundedSender<PlayerEvent>,
    ) -> PlayerHandle {
        let (task_tx, task_rx) = mpsc::channel(TASK_CHANNEL_CAPACITY);
        let (query_tx, query_rx) = mpsc::channel(TASK_CHANNEL_CAPACITY);

        let ctx = PlayerContext {
            session_id,
            backend,
            event_tx,
            arena,
            partitions,
            sources: indexmap::IndexMap::new(),
            next_source_id: 1,
            all_sources_attached: false,
            playback_state: PlaybackState::Unknown,
            state_before_seek: None,
            playback_rate: 1.0,
            queued_position: None,
            failed: false,
            active_tickets: std::collections::HashMap::new(),
            next_request_id: 0,
            suppressed: std::collections::HashSet::new(),
            flushing: std::collections::HashSet::new(),
            underflow_active: std::collections::HashSet::new(),
            eos_sources: std::collections::HashSet::new(),
            timer_requests: Vec::new(),
            shutting_down: false,
        };

        let actor = Self { ctx, task_rx, query_rx, bus_rx, self_tx: task_tx.clone() };
        let join = tokio::spawn(actor.run());
        PlayerHandle {
            task_tx,
            query_tx,
            join: Arc::new(tokio::sync::Mutex::new(Some(join))),
        }
    }

    async fn run(mut self) {
        tracing::info!(session_id = self.ctx.session_id, "player actor started");
        let mut position_timer = tokio::time::interval(POSITION_REPORT_INTERVAL);
        position_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                Some(enqueued) = self.task_rx.recv() => {
                    let shutdown = matches!(enqueued.task, PlayerTask::Shutdown);
                    self.execute(enqueued);
                    if shutdown {
                        break;
                    }
                },
                Some(query) = self.query_rx.recv() => {
                    self.handle_query(query);
                },
                Some(message) = self.bus_rx.recv() => {
                    self.execute(EnqueuedTask {
                        task: PlayerTask::HandleBusMessage { message },
                        done: None,
                    });
                },
                _ = position_timer.tick() => {
                    self.execute(EnqueuedTask { task: PlayerTask::ReportPosition, done: None });
                },
                else => break,
            }
        }
        tracing::info!(session_id = self.ctx.session_id, "player actor shutting down");
    }

    fn execute(&mut self, enqueued: EnqueuedTask) {
        let result = tasks::execute(&mut self.ctx, enqueued.task);
        if let Err(e) = &result {
            tracing::debug!(session_id = self.ctx.session_id, error = %e, "task failed");
        }
        if let Some(done) = enqueued.done {
            let _ = done.send(result);
        }
        self.schedule_timer_requests();
    }

    /// Turns the timer work queued by the last task into delayed
    /// self-enqueues.
    fn schedule_timer_requests(&mut self) {
        for request in std::mem::take(&mut self.ctx.timer_requests) {
            let tx = self.self_tx.clone();
            let (delay, task) = match request {
                TimerRequest::ResendNeedData(media_type) => {
                    (NEED_DATA_RESEND_DELAY, PlayerTask::NeedData { media_type })
                }
                TimerRequest::CheckAudioUnderflow => {
                    (AUDIO_UNDERFLOW_RECHECK, PlayerTask::CheckAudioUnderflow)
                }
            };
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(EnqueuedTask { task, done: None }).await;
            });
        }
    }

    fn handle_query(&mut self, query: PlayerQuery) {
        match query {
            PlayerQuery::GetPosition { response_tx } => {
                let _ = response_tx.send(self.ctx.backend.position());
            }
            PlayerQuery::GetVolume { response_tx } => {
                let _ = response_tx.send(self.ctx.backend.volume());
            }
            PlayerQuery::GetState { response_tx } => {
                let _ = response_tx.send(self.ctx.playback_state);
            }
        }
    }
}

/// Handle for enqueueing work onto a session actor.
#[derive(Clone)]
pub struct PlayerHandle {
    task_tx: mpsc::Sender<EnqueuedTask>,
    query_tx: mpsc::Sender<PlayerQuery>,
    join: Arc<tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl PlayerHandle {
    /// Enqueues a task and returns once it is queued. After shutdown the
    /// enqueue is silently dropped.
    pub async fn enqueue(&self, task: PlayerTask) {
        if self.task_tx.send(EnqueuedTask { task, done: None }).await.is_err() {
            tracing::debug!("task dropped: player actor has shut down");
        }
    }

    /// Enqueues a task and waits for its outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the task itself failed or the actor is gone.
    pub async fn enqueue_and_wait(&self, task: PlayerTask) -> Result<TaskOutcome> {
        let (done_tx, done_rx) = oneshot::channel();
        self.task_tx
            .send(EnqueuedTask { task, done: Some(done_tx) })
            .await
            .map_err(|_| BridgeKitError::InvalidState("player actor has shut down".to_string()))?;
        done_rx
            .await
            .map_err(|_| BridgeKitError::InvalidState("player actor dropped the task".to_string()))?
    }

    /// Current pipeline position in nanoseconds.
    pub async fn position(&self) -> Result<i64> {
        let (response_tx, response_rx) = oneshot::channel();
        self.query_tx
            .send(PlayerQuery::GetPosition { response_tx })
            .await
            .map_err(|_| BridgeKitError::InvalidState("player actor has shut down".to_string()))?;
        response_rx
            .await
            .map_err(|_| BridgeKitError::InvalidState("player actor dropped the query".to_string()))?
    }

    pub async fn volume(&self) -> Result<f64> {
        let (response_tx, response_rx) = oneshot::channel();
        self.query_tx
            .send(PlayerQuery::GetVolume { response_tx })
            .await
            .map_err(|_| BridgeKitError::InvalidState("player actor has shut down".to_string()))?;
        response_rx
            .await
            .map_err(|_| BridgeKitError::InvalidState("player actor dropped the query".to_string()))
    }

    pub async fn playback_state(&self) -> Result<PlaybackState> {
        let (response_tx, response_rx) = oneshot::channel();
        self.query_tx
            .send(PlayerQuery::GetState { response_tx })
            .await
            .map_err(|_| BridgeKitError::InvalidState("player actor has shut down".to_string()))?;
        response_rx
            .await
            .map_err(|_| BridgeKitError::InvalidState("player actor dropped the query".to_string()))
    }

    /// Posts the terminator task and waits for the actor to finish. In-flight
    /// tasks run to completion; enqueues after this silently drop.
    pub async fn shutdown_and_wait(&self) -> Result<()> {
        let _ = self.enqueue_and_wait(PlayerTask::Shutdown).await;
        let join_handle = {
            let mut guard = self.join.lock().await;
            guard.take()
        };
        if let Some(handle) = join_handle {
            match tokio::time::timeout(std::time::Duration::from_secs(10), handle).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(BridgeKitError::Pipeline(format!("player actor panicked: {e}"))),
                Err(_) => Err(BridgeKitError::Pipeline("player shutdown timeout".to_string())),
            }
        } else {
            tracing::warn!("shutdown_and_wait called twice, player already shut down");
            Ok(())
        }
    }
}
