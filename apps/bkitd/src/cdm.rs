// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The CDM seam.
//!
//! The native decrypt engine lives outside this workspace; everything the
//! media-keys service needs from it goes through [`CdmBackend`]. `SoftCdm`
//! is a deterministic software stand-in for platforms and tests without the
//! vendor library.

use bridgekit_core::error::{BridgeKitError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

/// Operations the media-keys service delegates to the platform CDM.
pub trait CdmBackend: Send + Sync {
    fn supported_key_systems(&self) -> Vec<String>;

    fn supports_key_system(&self, key_system: &str) -> bool {
        self.supported_key_systems().iter().any(|ks| ks == key_system)
    }

    fn key_system_version(&self, key_system: &str) -> Result<String>;
    fn server_certificate_supported(&self, key_system: &str) -> bool;

    /// Opens a CDM key session; returns its id.
    fn open_key_session(&self, key_system: &str) -> Result<i32>;
    fn close_key_session(&self, key_session_id: i32) -> Result<()>;

    /// Produces the opaque license-request blob for the app to post.
    fn generate_request(&self, key_session_id: i32, init_data: &[u8]) -> Result<Vec<u8>>;
    /// Ingests an opaque license response blob.
    fn update_session(&self, key_session_id: i32, response: &[u8]) -> Result<()>;
    fn contains_key(&self, key_session_id: i32, key_id: &[u8]) -> bool;
    fn set_drm_header(&self, key_session_id: i32, header: &[u8]) -> Result<()>;

    fn delete_drm_store(&self) -> Result<()>;
    fn delete_key_store(&self) -> Result<()>;
    fn drm_store_hash(&self) -> Result<Vec<u8>>;
    fn key_store_hash(&self) -> Result<Vec<u8>>;
    fn ldl_sessions_limit(&self) -> u32;
    fn last_drm_error(&self, key_session_id: i32) -> u32;
    fn drm_time(&self) -> u64;
    fn cdm_key_session_id(&self, key_session_id: i32) -> Result<String>;
}

#[derive(Default)]
struct SoftSession {
    keys: Vec<Vec<u8>>,
    drm_header: Option<Vec<u8>>,
}

/// In-memory CDM stand-in with deterministic answers.
pub struct SoftCdm {
    sessions: Mutex<HashMap<i32, SoftSession>>,
    next_session_id: AtomicI32,
}

impl Default for SoftCdm {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftCdm {
    pub fn new() -> Self {
        Self { sessions: Mutex::new(HashMap::new()), next_session_id: AtomicI32::new(1) }
    }

    fn with_session<T>(
        &self,
        key_session_id: i32,
        f: impl FnOnce(&mut SoftSession) -> T,
    ) -> Result<T> {
        let mut sessions =
            self.sessions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions
            .get_mut(&key_session_id)
            .map(f)
            .ok_or_else(|| BridgeKitError::NotFound(format!("key session {key_session_id}")))
    }
}

impl CdmBackend for SoftCdm {
    fn supported_key_systems(&self) -> Vec<String> {
        vec![
            "com.widevine.alpha".to_string(),
            "com.microsoft.playready".to_string(),
            "com.netflix.playready".to_string(),
        ]
    }

    fn key_system_version(&self, key_system: &str) -> Result<String> {
        if self.supports_key_system(key_system) {
            Ok("1.0".to_string())
        } else {
            Err(BridgeKitError::NotFound(format!("key system {key_system}")))
        }
    }

    fn server_certificate_supported(&self, key_system: &str) -> bool {
        key_system.contains("widevine")
    }

    fn open_key_session(&self, _key_system: &str) -> Result<i32> {
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id, SoftSession::default());
        Ok(id)
    }

    fn close_key_session(&self, key_session_id: i32) -> Result<()> {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&key_session_id)
            .map(|_| ())
            .ok_or_else(|| BridgeKitError::NotFound(format!("key session {key_session_id}")))
    }

    fn generate_request(&self, key_session_id: i32, init_data: &[u8]) -> Result<Vec<u8>> {
        self.with_session(key_session_id, |_| {
            // Echo-style challenge: enough for round-trip testing, opaque to
            // everything above this seam.
            let mut blob = b"challenge:".to_vec();
            blob.extend_from_slice(init_data);
            blob
        })
    }

    fn update_session(&self, key_session_id: i32, response: &[u8]) -> Result<()> {
        self.with_session(key_session_id, |session| {
            session.keys.push(response.to_vec());
        })
    }

    fn contains_key(&self, key_session_id: i32, key_id: &[u8]) -> bool {
        self.with_session(key_session_id, |session| {
            session.keys.iter().any(|k| k == key_id)
        })
        .unwrap_or(false)
    }

    fn set_drm_header(&self, key_session_id: i32, header: &[u8]) -> Result<()> {
        self.with_session(key_session_id, |session| {
            session.drm_header = Some(header.to_vec());
        })
    }

    fn delete_drm_store(&self) -> Result<()> {
        Ok(())
    }

    fn delete_key_store(&self) -> Result<()> {
        Ok(())
    }

    fn drm_store_hash(&self) -> Result<Vec<u8>> {
        Ok(vec![0xD5; 32])
    }

    fn key_store_hash(&self) -> Result<Vec<u8>> {
        Ok(vec![0x55; 32])
    }

    fn ldl_sessions_limit(&self) -> u32 {
        10
    }

    fn last_drm_error(&self, _key_session_id: i32) -> u32 {
        0
    }

    fn drm_time(&self) -> u64 {
        0
    }

    fn cdm_key_session_id(&self, key_session_id: i32) -> Result<String> {
        self.with_session(key_session_id, |_| format!("cdm-session-{key_session_id}"))
    }
}
