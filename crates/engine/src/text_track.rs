// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Per-sink text-track sessions.
//!
//! A caption sink opens one display session, pushes timed payloads to the
//! display accessor and selects the active format. The display surface itself
//! is an external collaborator behind [`TextTrackAccessor`]; this module owns
//! only the session lifecycle and format bookkeeping.

use bridgekit_core::error::{BridgeKitError, Result};
use bridgekit_core::types::TextTrackFormat;
use std::sync::Arc;

/// Contract to the platform caption display.
pub trait TextTrackAccessor: Send + Sync {
    fn open_session(&self, display_name: &str) -> Result<u32>;
    fn close_session(&self, session_id: u32) -> Result<()>;
    fn reset_session(&self, session_id: u32) -> Result<()>;
    fn pause(&self, session_id: u32) -> Result<()>;
    fn play(&self, session_id: u32) -> Result<()>;
    fn mute(&self, session_id: u32, mute: bool) -> Result<()>;
    fn set_position(&self, session_id: u32, media_timestamp_ms: u64) -> Result<()>;
    fn send_data(
        &self,
        session_id: u32,
        data: &[u8],
        format: TextTrackFormat,
        display_offset_ms: i64,
    ) -> Result<()>;
    fn select_webvtt(&self, session_id: u32) -> Result<()>;
    fn select_ttml(&self, session_id: u32) -> Result<()>;
    fn select_cc(&self, session_id: u32, service: &str) -> Result<()>;
}

/// One caption session, bounded by the sink element's start/stop.
pub struct TextTrackSession {
    accessor: Arc<dyn TextTrackAccessor>,
    session_id: u32,
    format: Option<TextTrackFormat>,
    cc_service: Option<String>,
}

impl TextTrackSession {
    /// Opens a display session. The display name comes from the compositor
    /// environment; without `WAYLAND_DISPLAY` there is no surface to open.
    pub fn open(accessor: Arc<dyn TextTrackAccessor>) -> Result<Self> {
        let display_name = std::env::var("WAYLAND_DISPLAY").map_err(|_| {
            BridgeKitError::Configuration(
                "WAYLAND_DISPLAY is not set; cannot open a text-track session".to_string(),
            )
        })?;
        Self::open_on(accessor, &display_name)
    }

    /// Opens a display session on an explicit display (used by tests).
    pub fn open_on(accessor: Arc<dyn TextTrackAccessor>, display_name: &str) -> Result<Self> {
        let session_id = accessor.open_session(display_name)?;
        tracing::info!(session_id, display = %display_name, "opened text-track session");
        Ok(Self { accessor, session_id, format: None, cc_service: None })
    }

    /// Clears display state after a flush, re-applying the selected format.
    pub fn reset(&self, muted: bool) -> Result<()> {
        self.accessor.reset_session(self.session_id)?;
        match (&self.format, &self.cc_service) {
            (Some(TextTrackFormat::WebVtt), _) => self.accessor.select_webvtt(self.session_id)?,
            (Some(TextTrackFormat::Ttml), _) => self.accessor.select_ttml(self.session_id)?,
            (Some(TextTrackFormat::ClosedCaptions), Some(service)) => {
                self.accessor.select_cc(self.session_id, service)?;
            }
            _ => {}
        }
        self.accessor.mute(self.session_id, muted)
    }

    pub fn play(&self) -> Result<()> {
        self.accessor.play(self.session_id)
    }

    pub fn pause(&self) -> Result<()> {
        self.accessor.pause(self.session_id)
    }

    pub fn mute(&self, mute: bool) -> Result<()> {
        self.accessor.mute(self.session_id, mute)
    }

    pub fn set_position(&self, media_timestamp_ms: u64) -> Result<()> {
        self.accessor.set_position(self.session_id, media_timestamp_ms)
    }

    /// Pushes one caption payload. Fails before a format was selected.
    pub fn send_data(&self, data: &[u8], display_offset_ms: i64) -> Result<()> {
        let format = self.format.ok_or_else(|| {
            BridgeKitError::InvalidState("send_data before a format selection".to_string())
        })?;
        self.accessor.send_data(self.session_id, data, format, display_offset_ms)
    }

    pub fn set_webvtt_selection(&mut self) -> Result<()> {
        self.accessor.select_webvtt(self.session_id)?;
        self.format = Some(TextTrackFormat::WebVtt);
        Ok(())
    }

    pub fn set_ttml_selection(&mut self) -> Result<()> {
        self.accessor.select_ttml(self.session_id)?;
        self.format = Some(TextTrackFormat::Ttml);
        Ok(())
    }

    pub fn set_cc_selection(&mut self, service: &str) -> Result<()> {
        self.accessor.select_cc(self.session_id, service)?;
        self.format = Some(TextTrackFormat::ClosedCaptions);
        self.cc_service = Some(service.to_string());
        Ok(())
    }
}

impl Drop for TextTrackSession {
    fn drop(&mut self) {
        if let Err(e) = self.accessor.close_session(self.session_id) {
            tracing::warn!(session_id = self.session_id, error = %e, "failed to close session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAccessor {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingAccessor {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    impl TextTrackAccessor for RecordingAccessor {
        fn open_session(&self, display_name: &str) -> Result<u32> {
            self.record(format!("open:{display_name}"));
            Ok(7)
        }
        fn close_session(&self, session_id: u32) -> Result<()> {
            self.record(format!("close:{session_id}"));
            Ok(())
        }
        fn reset_session(&self, _session_id: u32) -> Result<()> {
            self.record("reset");
            Ok(())
        }
        fn pause(&self, _session_id: u32) -> Result<()> {
            self.record("pause");
            Ok(())
        }
        fn play(&self, _session_id: u32) -> Result<()> {
            self.record("play");
            Ok(())
        }
        fn mute(&self, _session_id: u32, mute: bool) -> Result<()> {
            self.record(format!("mute:{mute}"));
            Ok(())
        }
        fn set_position(&self, _session_id: u32, ts: u64) -> Result<()> {
            self.record(format!("position:{ts}"));
            Ok(())
        }
        fn send_data(
            &self,
            _session_id: u32,
            data: &[u8],
            format: TextTrackFormat,
            offset: i64,
        ) -> Result<()> {
            self.record(format!("data:{}:{format:?}:{offset}", data.len()));
            Ok(())
        }
        fn select_webvtt(&self, _session_id: u32) -> Result<()> {
            self.record("webvtt");
            Ok(())
        }
        fn select_ttml(&self, _session_id: u32) -> Result<()> {
            self.record("ttml");
            Ok(())
        }
        fn select_cc(&self, _session_id: u32, service: &str) -> Result<()> {
            self.record(format!("cc:{service}"));
            Ok(())
        }
    }

    #[test]
    fn test_send_data_requires_format_selection() {
        let accessor = Arc::new(RecordingAccessor::default());
        let mut session = TextTrackSession::open_on(accessor.clone(), "wayland-0").unwrap();
        assert!(session.send_data(b"cue", 0).is_err());

        session.set_webvtt_selection().unwrap();
        session.send_data(b"cue", 40).unwrap();
        session.set_position(1200).unwrap();
        drop(session);

        let calls = accessor.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &["open:wayland-0", "webvtt", "data:3:WebVtt:40", "position:1200", "close:7"]
        );
    }

    #[test]
    fn test_reset_reapplies_cc_selection() {
        let accessor = Arc::new(RecordingAccessor::default());
        let mut session = TextTrackSession::open_on(accessor.clone(), "wayland-0").unwrap();
        session.set_cc_selection("CC1").unwrap();
        session.reset(true).unwrap();
        let calls = accessor.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &["open:wayland-0", "cc:CC1", "reset", "cc:CC1", "mute:true"]
        );
    }
}
