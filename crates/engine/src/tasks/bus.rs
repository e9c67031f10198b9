// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Pipeline bus-message handling.
//!
//! Bus messages arrive on the backend's own thread and are re-queued as
//! tasks, so by the time they run here they are serialised with every other
//! session mutation.

use bridgekit_core::error::Result;
use bridgekit_core::types::{NetworkState, PlaybackState};

use crate::context::PlayerContext;
use crate::pipeline::{BusMessage, PipelineState};
use crate::player::PlayerEvent;
use crate::tasks::{data, playback, sources, TaskOutcome};

pub fn handle_bus_message(ctx: &mut PlayerContext, message: BusMessage) -> Result<TaskOutcome> {
    match message {
        BusMessage::StateChanged(state) => {
            state_changed(ctx, state);
            Ok(TaskOutcome::Done)
        }
        BusMessage::Eos => {
            ctx.set_playback_state(PlaybackState::EndOfStream);
            Ok(TaskOutcome::Done)
        }
        BusMessage::Error(reason) => {
            tracing::error!(session_id = ctx.session_id, %reason, "pipeline error");
            ctx.failed = true;
            ctx.cancel_all_tickets();
            ctx.emit(PlayerEvent::NetworkState(NetworkState::DecodeError));
            ctx.set_playback_state(PlaybackState::Failure);
            Ok(TaskOutcome::Done)
        }
        BusMessage::Warning(reason) => {
            tracing::warn!(session_id = ctx.session_id, %reason, "pipeline warning");
            Ok(TaskOutcome::Done)
        }
        BusMessage::Qos { source_id, info } => {
            ctx.emit(PlayerEvent::Qos { source_id, info });
            Ok(TaskOutcome::Done)
        }
        BusMessage::Buffering { percent } => {
            ctx.emit(PlayerEvent::BufferingProgress { percent });
            if percent >= 100 {
                ctx.emit(PlayerEvent::NetworkState(NetworkState::Buffered));
                if ctx.playback_state == PlaybackState::Buffering {
                    ctx.set_playback_state(PlaybackState::Playing);
                }
            } else if ctx.playback_state == PlaybackState::Playing {
                ctx.emit(PlayerEvent::NetworkState(NetworkState::Buffering));
                ctx.set_playback_state(PlaybackState::Buffering);
            }
            Ok(TaskOutcome::Done)
        }
        BusMessage::NeedData { media_type } => data::need_data(ctx, media_type),
        BusMessage::EnoughData { media_type } => data::enough_data(ctx, media_type),
        BusMessage::Underflow { media_type } => playback::underflow(ctx, media_type),
        BusMessage::FlushCompleted { source_id } => sources::source_flushed(ctx, source_id),
    }
}

fn state_changed(ctx: &mut PlayerContext, state: PipelineState) {
    match state {
        PipelineState::Playing => {
            if ctx.playback_state != PlaybackState::Seeking {
                ctx.set_playback_state(PlaybackState::Playing);
            }
        }
        PipelineState::Paused => {
            // Preroll completion lands here too; a stopped or seeking
            // session keeps its projected state.
            if matches!(
                ctx.playback_state,
                PlaybackState::Idle
                    | PlaybackState::Playing
                    | PlaybackState::Buffering
                    | PlaybackState::SeekDone
            ) {
                ctx.set_playback_state(PlaybackState::Paused);
            }
        }
        PipelineState::Ready | PipelineState::Null => {}
    }
}
