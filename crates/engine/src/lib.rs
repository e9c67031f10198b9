// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! BridgeKit playback engine.
//!
//! One actor per session serialises every mutation of playback state: IPC
//! callbacks and pipeline bus messages are folded into [`tasks::PlayerTask`]s
//! drained by the session's [`player::PlayerActor`] loop, so all observable
//! state transitions happen between tasks, never mid-task.
//!
//! - [`pipeline`]: the backend seam to the real media stack, plus a
//!   deterministic simulator used by default wiring and tests
//! - [`context`]: the mutable per-session state tasks operate on
//! - [`tasks`]: the task catalogue (sum-typed commands)
//! - [`player`]: the actor loop and its handle
//! - [`web_audio`]: the producer/consumer PCM ring with deferred drain
//! - [`text_track`]: per-sink caption sessions over a display accessor

pub mod context;
pub mod pipeline;
pub mod player;
pub mod tasks;
pub mod text_track;
pub mod web_audio;

pub use context::{PendingTicket, SharedArena};
pub use pipeline::{BusMessage, PipelineBackend, PipelineState};
pub use player::{PlayerActor, PlayerEvent, PlayerHandle, PlayerQuery};
pub use tasks::{PlayerTask, SourceSpec, TaskOutcome};
pub use web_audio::{
    AudioSink, BoundedSink, DeviceInfo, WebAudioHandle, WebAudioPlayerActor, WebAudioState,
};
