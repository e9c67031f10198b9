// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Process-wide server state shared by every connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use bridgekit_core::error::{BridgeKitError, Result};
use bridgekit_core::profiler::Profiler;
use bridgekit_engine::{SharedArena, WebAudioHandle};
use bridgekit_shm::{ArenaConfig, ArenaLayout, SharedMemoryArena};

use crate::cdm::CdmBackend;
use crate::config::Config;
use crate::control_service::ControlService;
use crate::session::SessionManager;

/// One live web-audio player.
pub struct WebAudioEntry {
    pub handle: WebAudioHandle,
    pub slot: usize,
}

/// Registry of web-audio players and their ring slots.
pub struct WebAudioManager {
    players: HashMap<i32, WebAudioEntry>,
    free_slots: Vec<usize>,
    next_handle: i32,
}

impl WebAudioManager {
    pub fn new(slot_count: usize) -> Self {
        Self {
            players: HashMap::new(),
            free_slots: (0..slot_count).rev().collect(),
            next_handle: 0,
        }
    }

    pub fn allocate(&mut self) -> Result<(i32, usize)> {
        let slot = self.free_slots.pop().ok_or_else(|| {
            BridgeKitError::ResourceExhausted("no free web-audio slot".to_string())
        })?;
        let handle = self.next_handle;
        self.next_handle += 1;
        Ok((handle, slot))
    }

    pub fn release_slot(&mut self, slot: usize) {
        self.free_slots.push(slot);
    }

    pub fn insert(&mut self, handle: i32, entry: WebAudioEntry) {
        self.players.insert(handle, entry);
    }

    pub fn get(&self, handle: i32) -> Result<WebAudioHandle> {
        self.players
            .get(&handle)
            .map(|e| e.handle.clone())
            .ok_or_else(|| BridgeKitError::NotFound(format!("web-audio player {handle}")))
    }

    pub fn remove(&mut self, handle: i32) -> Option<WebAudioEntry> {
        let entry = self.players.remove(&handle)?;
        self.free_slots.push(entry.slot);
        Some(entry)
    }
}

/// One client media-keys instance and the key sessions it opened.
pub struct MediaKeysEntry {
    pub key_system: String,
    pub key_sessions: Vec<i32>,
}

/// Registry of media-keys instances.
#[derive(Default)]
pub struct MediaKeysRegistry {
    entries: HashMap<i32, MediaKeysEntry>,
    next_handle: i32,
}

impl MediaKeysRegistry {
    pub fn create(&mut self, key_system: String) -> i32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.entries.insert(handle, MediaKeysEntry { key_system, key_sessions: Vec::new() });
        handle
    }

    pub fn get_mut(&mut self, handle: i32) -> Result<&mut MediaKeysEntry> {
        self.entries
            .get_mut(&handle)
            .ok_or_else(|| BridgeKitError::NotFound(format!("media keys {handle}")))
    }

    pub fn get(&self, handle: i32) -> Result<&MediaKeysEntry> {
        self.entries
            .get(&handle)
            .ok_or_else(|| BridgeKitError::NotFound(format!("media keys {handle}")))
    }

    pub fn remove(&mut self, handle: i32) -> Option<MediaKeysEntry> {
        self.entries.remove(&handle)
    }
}

/// Everything the module services operate on.
pub struct ServerState {
    pub config: Config,
    pub arena: SharedArena,
    pub arena_name: String,
    pub arena_size: u32,
    pub layout: ArenaLayout,
    pub sessions: Mutex<SessionManager>,
    pub web_audio: Mutex<WebAudioManager>,
    pub media_keys: Mutex<MediaKeysRegistry>,
    pub controls: ControlService,
    pub cdm: Arc<dyn CdmBackend>,
    /// Environment-gated latency profiler for session lifecycle stages.
    pub profiler: Profiler,
    next_control_id: AtomicI32,
    next_ping_id: AtomicU32,
}

impl ServerState {
    /// Creates the arena from config and assembles the state.
    pub fn new(config: Config, cdm: Arc<dyn CdmBackend>) -> Result<Arc<Self>> {
        let arena_config = ArenaConfig::from(&config.arena);
        let layout = ArenaLayout::compute(&arena_config);
        let arena = SharedMemoryArena::create(layout.total_size())?;
        let arena_name = arena.name().to_string();
        let arena_size = layout.total_size();
        Ok(Arc::new(Self {
            sessions: Mutex::new(SessionManager::new(layout.session_slots())),
            web_audio: Mutex::new(WebAudioManager::new(layout.web_audio_slots())),
            media_keys: Mutex::new(MediaKeysRegistry::default()),
            controls: ControlService::new(),
            cdm,
            arena: Arc::new(Mutex::new(arena)),
            arena_name,
            arena_size,
            layout,
            config,
            profiler: Profiler::new("sessions"),
            next_control_id: AtomicI32::new(0),
            next_ping_id: AtomicU32::new(0),
        }))
    }

    /// State with an anonymous (process-private) arena, for tests.
    pub fn new_anonymous(config: Config, cdm: Arc<dyn CdmBackend>) -> Result<Arc<Self>> {
        let arena_config = ArenaConfig::from(&config.arena);
        let layout = ArenaLayout::compute(&arena_config);
        let arena = SharedMemoryArena::anonymous(layout.total_size() as usize)?;
        let arena_name = arena.name().to_string();
        let arena_size = layout.total_size();
        Ok(Arc::new(Self {
            sessions: Mutex::new(SessionManager::new(layout.session_slots())),
            web_audio: Mutex::new(WebAudioManager::new(layout.web_audio_slots())),
            media_keys: Mutex::new(MediaKeysRegistry::default()),
            controls: ControlService::new(),
            cdm,
            arena: Arc::new(Mutex::new(arena)),
            arena_name,
            arena_size,
            layout,
            config,
            profiler: Profiler::new("sessions"),
            next_control_id: AtomicI32::new(0),
            next_ping_id: AtomicU32::new(0),
        }))
    }

    pub fn mint_control_id(&self) -> i32 {
        self.next_control_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn mint_ping_id(&self) -> u32 {
        self.next_ping_id.fetch_add(1, Ordering::Relaxed)
    }
}
