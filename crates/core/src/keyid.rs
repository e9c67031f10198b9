// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Association from CDM key-session id to key-id bytes.
//!
//! Netflix-style key systems select the active key per session rather than
//! per segment, so the client stamps every outgoing encrypted segment whose
//! `media_key_session_id` has a mapped key. Other key systems never touch
//! this map.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

/// Thread-safe map from CDM key-session id to key-id bytes.
///
/// Owned by the process entry point and shared by reference; one instance
/// per client process.
#[derive(Debug, Default)]
pub struct KeyIdMap {
    entries: Mutex<HashMap<i32, Bytes>>,
}

impl KeyIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a key session with an initially empty key id.
    pub fn add_session(&self, key_session_id: i32) {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.entry(key_session_id).or_insert_with(Bytes::new);
    }

    /// Replaces the key id of an existing session. Returns `false` when the
    /// session was never registered.
    pub fn update_key(&self, key_session_id: i32, key_id: Bytes) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match entries.get_mut(&key_session_id) {
            Some(entry) => {
                *entry = key_id;
                true
            }
            None => false,
        }
    }

    /// Returns the key id for a session, or empty bytes when unknown.
    pub fn get(&self, key_session_id: i32) -> Bytes {
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.get(&key_session_id).cloned().unwrap_or_default()
    }

    pub fn erase(&self, key_session_id: i32) {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.remove(&key_session_id);
    }
}

/// Whether a key system routes key selection through the key-id map.
pub fn uses_key_id_map(key_system: &str) -> bool {
    key_system.to_ascii_lowercase().contains("netflix")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_requires_registration() {
        let map = KeyIdMap::new();
        assert!(!map.update_key(43, Bytes::from_static(&[1, 2, 3, 4])));

        map.add_session(43);
        assert!(map.get(43).is_empty());
        assert!(map.update_key(43, Bytes::from_static(&[1, 2, 3, 4])));
        assert_eq!(map.get(43), Bytes::from_static(&[1, 2, 3, 4]));
    }

    #[test]
    fn test_erase_clears_entry() {
        let map = KeyIdMap::new();
        map.add_session(43);
        map.update_key(43, Bytes::from_static(&[1]));
        map.erase(43);
        assert!(map.get(43).is_empty());
        // Erasing twice is a no-op.
        map.erase(43);
    }

    #[test]
    fn test_add_session_keeps_existing_key() {
        let map = KeyIdMap::new();
        map.add_session(7);
        map.update_key(7, Bytes::from_static(&[9]));
        map.add_session(7);
        assert_eq!(map.get(7), Bytes::from_static(&[9]));
    }

    #[test]
    fn test_key_system_matching() {
        assert!(uses_key_id_map("com.netflix.playready"));
        assert!(uses_key_id_map("com.Netflix.playready"));
        assert!(!uses_key_id_map("com.widevine.alpha"));
    }
}
