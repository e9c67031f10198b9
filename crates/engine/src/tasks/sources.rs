// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Source-management task handlers: attach/remove, flush and per-source
//! positioning. Removing and re-attaching an audio source on a live session
//! is the audio-switch path.

use bridgekit_core::error::{BridgeKitError, Result};
use bridgekit_core::types::{MediaSource, PlaybackState, SourceId};

use crate::context::PlayerContext;
use crate::player::PlayerEvent;
use crate::tasks::{SourceSpec, TaskOutcome};

pub fn attach_source(ctx: &mut PlayerContext, spec: SourceSpec) -> Result<TaskOutcome> {
    if ctx.playback_state == PlaybackState::Unknown {
        return Err(BridgeKitError::InvalidState("attach_source before load".to_string()));
    }
    let media_type = spec.config.media_type();
    if ctx.source_of_type(media_type).is_some() {
        return Err(BridgeKitError::InvalidState(format!(
            "a {media_type} source is already attached"
        )));
    }

    let source_id = ctx.next_source_id;
    ctx.next_source_id += 1;
    let source = MediaSource {
        source_id,
        mime_type: spec.mime_type,
        config: spec.config,
        codec_data: spec.codec_data,
        has_drm: spec.has_drm,
    };
    ctx.backend.attach_source(&source)?;
    tracing::info!(
        session_id = ctx.session_id,
        source_id,
        media_type = %media_type,
        mime_type = %source.mime_type,
        "attached source"
    );
    ctx.sources.insert(source_id, source);

    // Re-attach after removal (audio switch): the playback group changes, so
    // the suppression and underflow bookkeeping of that type restarts clean.
    ctx.suppressed.remove(&media_type);
    ctx.underflow_active.remove(&media_type);
    Ok(TaskOutcome::SourceId(source_id))
}

pub fn remove_source(ctx: &mut PlayerContext, source_id: SourceId) -> Result<TaskOutcome> {
    let Some(source) = ctx.sources.shift_remove(&source_id) else {
        return Err(BridgeKitError::NotFound(format!("source {source_id}")));
    };
    let media_type = source.config.media_type();
    ctx.cancel_ticket(media_type);
    ctx.flushing.remove(&source_id);
    ctx.eos_sources.remove(&source_id);
    ctx.backend.remove_source(source_id)?;
    tracing::info!(
        session_id = ctx.session_id,
        source_id,
        media_type = %media_type,
        "removed source"
    );
    Ok(TaskOutcome::Done)
}

pub fn all_sources_attached(ctx: &mut PlayerContext) -> Result<TaskOutcome> {
    if ctx.sources.is_empty() {
        return Err(BridgeKitError::InvalidState(
            "all_sources_attached with no sources".to_string(),
        ));
    }
    ctx.all_sources_attached = true;
    ctx.backend.all_sources_attached()?;
    // A position requested before preroll applies now.
    if let Some(position) = ctx.queued_position.take() {
        ctx.backend.seek(position)?;
    }
    Ok(TaskOutcome::Done)
}

/// Flushes one source: queued samples die, the outstanding ticket of its
/// type dies, and need-data stays suppressed until the backend reports the
/// flush complete.
pub fn flush(ctx: &mut PlayerContext, source_id: SourceId, reset_time: bool) -> Result<TaskOutcome> {
    let Some(source) = ctx.source(source_id) else {
        return Err(BridgeKitError::NotFound(format!("source {source_id}")));
    };
    let media_type = source.config.media_type();
    ctx.cancel_ticket(media_type);
    ctx.flushing.insert(source_id);
    ctx.eos_sources.remove(&source_id);
    ctx.backend.flush(source_id, reset_time)?;
    tracing::debug!(session_id = ctx.session_id, source_id, reset_time, "flush started");
    Ok(TaskOutcome::Done)
}

pub fn set_source_position(
    ctx: &mut PlayerContext,
    source_id: SourceId,
    position: i64,
    reset_time: bool,
) -> Result<TaskOutcome> {
    if ctx.source(source_id).is_none() {
        return Err(BridgeKitError::NotFound(format!("source {source_id}")));
    }
    ctx.backend.set_source_position(source_id, position, reset_time)?;
    Ok(TaskOutcome::Done)
}

/// Backend finished flushing a source: lift the suppression, tell the
/// client, and leave seek-done when this was the last flushing source of a
/// seek.
pub fn source_flushed(ctx: &mut PlayerContext, source_id: SourceId) -> Result<TaskOutcome> {
    ctx.flushing.remove(&source_id);
    ctx.emit(PlayerEvent::SourceFlushed { source_id });
    if ctx.playback_state == PlaybackState::Seeking && ctx.flushing.is_empty() {
        ctx.set_playback_state(PlaybackState::SeekDone);
        if let Some(previous) = ctx.state_before_seek.take() {
            // The pipeline re-enters its pre-seek state on its own; reflect
            // it if the backend does not re-announce.
            if matches!(previous, PlaybackState::Paused) {
                ctx.set_playback_state(previous);
            }
        }
    }
    Ok(TaskOutcome::Done)
}
