// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Fixed wire-layout numbers and timer defaults.
//!
//! The V1 metadata numbers are a binary contract with every deployed reader;
//! changing any of them is a wire break, not a refactor.

use std::time::Duration;

/// Maximum number of extra-data bytes a segment may carry. V1 metadata blocks
/// reserve exactly this much space and zero-pad shorter payloads.
pub const MAX_EXTRA_DATA_SIZE: usize = 32;

/// Reserved (zero-filled) encryption block inside each V1 metadata frame.
pub const ENCRYPTION_METADATA_SIZE_BYTES: usize = 32;

/// Size of one V1 per-frame metadata block:
/// 32 generic bytes (media offset, length, timestamp, duration, source id,
/// extra-data length) + 32 extra-data pad + 32 reserved encryption bytes
/// + 8 type-specific tail bytes.
pub const METADATA_V1_SIZE_PER_FRAME_BYTES: usize = 104;

/// Metadata-version words written at the start of a partition.
pub const METADATA_VERSION_V1: u32 = 1;
pub const METADATA_VERSION_V2: u32 = 2;

/// The version advertised when nothing pins an older one.
pub const LATEST_METADATA_VERSION: u32 = METADATA_VERSION_V2;

/// Upper bound on segments accepted against one need-data ticket, and the
/// capacity of the profiler record ring.
pub const MAX_RECORDS: usize = 128;

/// Environment variable pinning the frame-writer metadata version.
/// Invalid or greater-than-latest values fall back to the latest version.
pub const METADATA_VERSION_ENV: &str = "BRIDGEKIT_METADATA_VERSION";

/// Environment variable gating the profiler ("1|true|yes|on" enables).
pub const PROFILER_ENV: &str = "PROFILER_ENABLED";

/// How long a heartbeat waits for the full ack set before reporting failure.
pub const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Cadence of web-audio stored-frame drain retries when the sink refuses bytes.
pub const WEB_AUDIO_DRAIN_INTERVAL: Duration = Duration::from_millis(100);

/// Preferred web-audio write granularity when the ring can hold this much.
pub const WEB_AUDIO_PREFERRED_FRAMES: u32 = 640;

/// Delay before re-issuing need-data after the client reported no
/// available samples.
pub const NEED_DATA_RESEND_DELAY: Duration = Duration::from_millis(100);

/// Cadence of position reports while a pipeline is playing.
pub const POSITION_REPORT_INTERVAL: Duration = Duration::from_millis(250);

/// Delay before re-checking whether an audio underflow is genuine rather
/// than a transiently empty queue.
pub const AUDIO_UNDERFLOW_RECHECK: Duration = Duration::from_millis(50);
