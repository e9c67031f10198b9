// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Playback-control task handlers.

use bridgekit_core::error::{BridgeKitError, Result};
use bridgekit_core::types::{MediaType, PlaybackState, SourceId, VideoGeometry};

use crate::context::{PlayerContext, TimerRequest};
use crate::player::PlayerEvent;
use crate::tasks::TaskOutcome;

pub fn load(ctx: &mut PlayerContext, mime_type: &str, url: &str) -> Result<TaskOutcome> {
    if ctx.playback_state != PlaybackState::Unknown {
        return Err(BridgeKitError::InvalidState(format!(
            "load in state {:?}",
            ctx.playback_state
        )));
    }
    ctx.backend.load(mime_type, url)?;
    ctx.set_playback_state(PlaybackState::Idle);
    Ok(TaskOutcome::Done)
}

pub fn play(ctx: &mut PlayerContext) -> Result<TaskOutcome> {
    if ctx.playback_state == PlaybackState::Unknown {
        return Err(BridgeKitError::InvalidState("play before load".to_string()));
    }
    ctx.backend.play()?;
    Ok(TaskOutcome::Done)
}

pub fn pause(ctx: &mut PlayerContext) -> Result<TaskOutcome> {
    if ctx.playback_state == PlaybackState::Unknown {
        return Err(BridgeKitError::InvalidState("pause before load".to_string()));
    }
    ctx.backend.pause()?;
    Ok(TaskOutcome::Done)
}

pub fn stop(ctx: &mut PlayerContext) -> Result<TaskOutcome> {
    ctx.cancel_all_tickets();
    ctx.backend.stop()?;
    ctx.set_playback_state(PlaybackState::Stopped);
    Ok(TaskOutcome::Done)
}

pub fn set_playback_rate(ctx: &mut PlayerContext, rate: f64) -> Result<TaskOutcome> {
    if rate == 0.0 {
        return Err(BridgeKitError::Configuration("playback rate of 0".to_string()));
    }
    ctx.backend.set_playback_rate(rate)?;
    ctx.playback_rate = rate;
    Ok(TaskOutcome::Done)
}

/// Seeks the pipeline. Tickets die with the seek; every source flushes and
/// need-data stays suppressed until its `FlushCompleted` arrives.
pub fn set_position(ctx: &mut PlayerContext, position: i64) -> Result<TaskOutcome> {
    match ctx.playback_state {
        PlaybackState::Playing
        | PlaybackState::Paused
        | PlaybackState::Buffering
        | PlaybackState::SeekDone
        | PlaybackState::EndOfStream => {}
        PlaybackState::Idle => {
            // The pipeline cannot seek before preroll; remember the target.
            ctx.queued_position = Some(position);
            return Ok(TaskOutcome::Done);
        }
        other => {
            return Err(BridgeKitError::InvalidState(format!("set_position in state {other:?}")))
        }
    }
    ctx.state_before_seek = Some(ctx.playback_state);
    ctx.cancel_all_tickets();
    for source_id in ctx.sources.keys().copied().collect::<Vec<_>>() {
        ctx.flushing.insert(source_id);
    }
    ctx.eos_sources.clear();
    ctx.set_playback_state(PlaybackState::Seeking);
    ctx.backend.seek(position)?;
    Ok(TaskOutcome::Done)
}

pub fn report_position(ctx: &mut PlayerContext) -> Result<TaskOutcome> {
    if !matches!(ctx.playback_state, PlaybackState::Playing | PlaybackState::Paused) {
        return Ok(TaskOutcome::Done);
    }
    let position = ctx.backend.position()?;
    ctx.emit(PlayerEvent::Position(position));
    Ok(TaskOutcome::Position(position))
}

pub fn render_frame(ctx: &mut PlayerContext) -> Result<TaskOutcome> {
    ctx.backend.render_frame()?;
    Ok(TaskOutcome::Done)
}

pub fn set_video_geometry(ctx: &mut PlayerContext, geometry: VideoGeometry) -> Result<TaskOutcome> {
    ctx.backend.set_video_geometry(geometry)?;
    Ok(TaskOutcome::Done)
}

pub fn set_volume(ctx: &mut PlayerContext, volume: f64) -> Result<TaskOutcome> {
    if !(0.0..=1.0).contains(&volume) {
        return Err(BridgeKitError::Configuration(format!("volume {volume} out of range")));
    }
    ctx.backend.set_volume(volume)?;
    Ok(TaskOutcome::Done)
}

pub fn set_mute(
    ctx: &mut PlayerContext,
    source_id: Option<SourceId>,
    mute: bool,
) -> Result<TaskOutcome> {
    if let Some(id) = source_id {
        if ctx.source(id).is_none() {
            return Err(BridgeKitError::NotFound(format!("source {id}")));
        }
    }
    ctx.backend.set_mute(source_id, mute)?;
    Ok(TaskOutcome::Done)
}

pub fn set_immediate_output(
    ctx: &mut PlayerContext,
    source_id: SourceId,
    enabled: bool,
) -> Result<TaskOutcome> {
    if ctx.source(source_id).is_none() {
        return Err(BridgeKitError::NotFound(format!("source {source_id}")));
    }
    ctx.backend.set_immediate_output(source_id, enabled)?;
    Ok(TaskOutcome::Done)
}

/// First underflow for a source type raises the event; repeats are debounced
/// until samples flow again. Audio gets a re-check to separate a genuine
/// underrun from a transiently empty queue.
pub fn underflow(ctx: &mut PlayerContext, media_type: MediaType) -> Result<TaskOutcome> {
    if ctx.underflow_active.contains(&media_type) {
        return Ok(TaskOutcome::Done);
    }
    ctx.underflow_active.insert(media_type);
    if media_type == MediaType::Audio {
        ctx.timer_requests.push(TimerRequest::CheckAudioUnderflow);
        return Ok(TaskOutcome::Done);
    }
    confirm_underflow(ctx, media_type);
    Ok(TaskOutcome::Done)
}

pub fn check_audio_underflow(ctx: &mut PlayerContext) -> Result<TaskOutcome> {
    if !ctx.underflow_active.contains(&MediaType::Audio) {
        return Ok(TaskOutcome::Done);
    }
    let audio_eos =
        ctx.source_of_type(MediaType::Audio).is_some_and(|id| ctx.eos_sources.contains(&id));
    if ctx.backend.queued_frames(MediaType::Audio) == 0 && !audio_eos {
        confirm_underflow(ctx, MediaType::Audio);
    } else {
        // Queue recovered on its own; the underflow was transient.
        ctx.underflow_active.remove(&MediaType::Audio);
    }
    Ok(TaskOutcome::Done)
}

fn confirm_underflow(ctx: &mut PlayerContext, media_type: MediaType) {
    tracing::warn!(
        session_id = ctx.session_id,
        media_type = %media_type,
        "underflow confirmed"
    );
    ctx.emit(PlayerEvent::NetworkState(bridgekit_core::types::NetworkState::Buffering));
    if ctx.playback_state == PlaybackState::Playing {
        ctx.set_playback_state(PlaybackState::Buffering);
    }
}

pub fn shutdown(ctx: &mut PlayerContext) -> Result<TaskOutcome> {
    ctx.shutting_down = true;
    ctx.cancel_all_tickets();
    if ctx.playback_state != PlaybackState::Stopped {
        // Best-effort teardown; a failed backend must not block destruction.
        if let Err(e) = ctx.backend.stop() {
            tracing::warn!(session_id = ctx.session_id, error = %e, "stop during shutdown failed");
        }
    }
    Ok(TaskOutcome::Done)
}
