// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Ticketed data-flow task handlers.
//!
//! The server issues one need-data ticket per (session, source type); the
//! client writes segments into the ticket's partition window and finalises
//! with have-data. A ticket dies on flush, seek, source removal or session
//! teardown, and a have-data for a dead ticket is ignored, which is what
//! makes the shared-memory hand-off safe without locks.

use bridgekit_core::constants::MAX_RECORDS;
use bridgekit_core::error::{BridgeKitError, Result};
use bridgekit_core::types::{
    MediaSegment, MediaSourceStatus, MediaType, PlaybackState, SourceId,
};
use bridgekit_shm::read_segments;

use crate::context::{PendingTicket, PlayerContext, TimerRequest};
use crate::player::PlayerEvent;
use crate::tasks::TaskOutcome;

/// Issues a ticket for a source type unless one is outstanding, the type is
/// suppressed, or its source is mid-flush.
pub fn need_data(ctx: &mut PlayerContext, media_type: MediaType) -> Result<TaskOutcome> {
    if !ctx.may_request_data(media_type) {
        return Ok(TaskOutcome::Done);
    }
    let Some(source_id) = ctx.source_of_type(media_type) else {
        return Ok(TaskOutcome::Done);
    };
    let Some(region) = ctx.partitions.for_type(media_type) else {
        return Err(BridgeKitError::Configuration(format!(
            "no partition for {media_type} data"
        )));
    };

    // The ticket cannot authorise more frames than the V1 metadata region
    // could describe, whatever version the client negotiated.
    let v1_capacity = (region.max_metadata_bytes.saturating_sub(4)) as usize
        / bridgekit_core::constants::METADATA_V1_SIZE_PER_FRAME_BYTES;
    let frame_count = v1_capacity.min(MAX_RECORDS) as u32;

    let request_id = ctx.next_request_id;
    ctx.next_request_id = ctx.next_request_id.wrapping_add(1);
    let ticket = PendingTicket { request_id, source_id, media_type, frame_count, region };
    ctx.active_tickets.insert(media_type, ticket);
    tracing::debug!(
        session_id = ctx.session_id,
        source_id,
        request_id,
        frame_count,
        media_type = %media_type,
        "issued need-data ticket"
    );
    ctx.emit(PlayerEvent::NeedMediaData(ticket));
    Ok(TaskOutcome::Done)
}

pub fn enough_data(ctx: &mut PlayerContext, media_type: MediaType) -> Result<TaskOutcome> {
    ctx.suppressed.insert(media_type);
    Ok(TaskOutcome::Done)
}

/// Finalises a ticket: reads the written window out of shared memory and
/// feeds the segments to the pipeline.
pub fn read_shm_data_and_attach_samples(
    ctx: &mut PlayerContext,
    request_id: u32,
    num_frames: u32,
    status: MediaSourceStatus,
) -> Result<TaskOutcome> {
    let Some(media_type) = ctx
        .active_tickets
        .iter()
        .find(|(_, t)| t.request_id == request_id)
        .map(|(media_type, _)| *media_type)
    else {
        // Cancelled by a flush/seek that raced the client's have-data.
        tracing::debug!(session_id = ctx.session_id, request_id, "have-data for a dead ticket");
        return Ok(TaskOutcome::Done);
    };
    let Some(ticket) = ctx.active_tickets.remove(&media_type) else {
        return Ok(TaskOutcome::Done);
    };

    if num_frames > ticket.frame_count {
        return Err(BridgeKitError::Protocol(format!(
            "have-data reports {num_frames} frames, ticket authorised {}",
            ticket.frame_count
        )));
    }

    match status {
        MediaSourceStatus::Ok | MediaSourceStatus::Eos => {
            if num_frames > 0 {
                let segments = {
                    let arena =
                        ctx.arena.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                    read_segments(arena.as_slice(), ticket.region, media_type, num_frames)
                        .map_err(|e| BridgeKitError::Protocol(e.to_string()))?
                };
                attach_samples(ctx, segments)?;
            }
            if status == MediaSourceStatus::Eos {
                eos(ctx, ticket.source_id)?;
            }
        }
        MediaSourceStatus::NoAvailableSamples => {
            // Nothing to read; ask again shortly so playback can resume the
            // moment the client has samples.
            ctx.timer_requests.push(TimerRequest::ResendNeedData(media_type));
        }
        MediaSourceStatus::Error => {
            tracing::warn!(
                session_id = ctx.session_id,
                request_id,
                media_type = %media_type,
                "client finalised ticket with an error"
            );
        }
    }
    Ok(TaskOutcome::Done)
}

/// Pushes segments into the pipeline. Samples for a flushing source are
/// dropped; a successful attach clears the underflow debounce of its type.
pub fn attach_samples(ctx: &mut PlayerContext, segments: Vec<MediaSegment>) -> Result<TaskOutcome> {
    for segment in segments {
        if ctx.flushing.contains(&segment.source_id) {
            continue;
        }
        let media_type = segment.media_type();
        ctx.backend.push_sample(segment)?;
        if ctx.underflow_active.remove(&media_type)
            && ctx.playback_state == PlaybackState::Buffering
        {
            ctx.set_playback_state(PlaybackState::Playing);
        }
    }
    Ok(TaskOutcome::Done)
}

/// Client reported end of stream for a source; the pipeline drains what is
/// queued and then signals EOS downstream.
pub fn eos(ctx: &mut PlayerContext, source_id: SourceId) -> Result<TaskOutcome> {
    if ctx.source(source_id).is_none() {
        return Err(BridgeKitError::NotFound(format!("source {source_id}")));
    }
    if !ctx.eos_sources.insert(source_id) {
        return Ok(TaskOutcome::Done);
    }
    ctx.cancel_ticket(
        ctx.source(source_id).map(|s| s.config.media_type()).unwrap_or(MediaType::Unknown),
    );
    ctx.backend.signal_eos(source_id)?;
    ctx.emit(PlayerEvent::EosNotification { source_id });
    Ok(TaskOutcome::Done)
}
