// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Layered daemon configuration: defaults, then a TOML file, then
//! `BKITD_`-prefixed environment variables.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub console_enable: bool,
    pub console_level: String,
    pub file_enable: bool,
    pub file_path: PathBuf,
    pub file_level: String,
    pub file_format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enable: true,
            console_level: "info".to_string(),
            file_enable: false,
            file_path: PathBuf::from("/var/log/bkitd/bkitd.log"),
            file_level: "debug".to_string(),
            file_format: LogFormat::Text,
        }
    }
}

/// Shared-memory arena sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaConfigToml {
    pub max_sessions: usize,
    pub max_web_audio_players: usize,
    pub max_frames: u32,
    pub audio_media_bytes: u32,
    pub video_media_bytes: u32,
    pub text_media_bytes: u32,
    pub web_audio_bytes: u32,
}

impl Default for ArenaConfigToml {
    fn default() -> Self {
        let defaults = bridgekit_shm::ArenaConfig::default();
        Self {
            max_sessions: defaults.max_sessions,
            max_web_audio_players: defaults.max_web_audio_players,
            max_frames: defaults.max_frames,
            audio_media_bytes: defaults.audio_media_bytes,
            video_media_bytes: defaults.video_media_bytes,
            text_media_bytes: defaults.text_media_bytes,
            web_audio_bytes: defaults.web_audio_bytes,
        }
    }
}

impl From<&ArenaConfigToml> for bridgekit_shm::ArenaConfig {
    fn from(config: &ArenaConfigToml) -> Self {
        Self {
            max_sessions: config.max_sessions,
            max_web_audio_players: config.max_web_audio_players,
            max_frames: config.max_frames,
            audio_media_bytes: config.audio_media_bytes,
            video_media_bytes: config.video_media_bytes,
            text_media_bytes: config.text_media_bytes,
            web_audio_bytes: config.web_audio_bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Milliseconds a ping waits for its full ack set.
    pub timeout_ms: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// UNIX socket the daemon listens on.
    pub socket_path: PathBuf,
    pub log: LogConfig,
    pub arena: ArenaConfigToml,
    pub heartbeat: HeartbeatConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/tmp/bridgekit-0"),
            log: LogConfig::default(),
            arena: ArenaConfigToml::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

impl Config {
    /// Defaults → optional TOML file → `BKITD_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed("BKITD_").split("__")).extract()
    }

    pub fn heartbeat_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.heartbeat.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load_without_a_file() {
        let config = Config::load(None).unwrap();
        assert!(config.log.console_enable);
        assert_eq!(config.heartbeat.timeout_ms, 5000);
        assert_eq!(config.arena.max_sessions, 2);
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bkitd.toml");
        std::fs::write(
            &path,
            "socket_path = \"/run/bridgekit-9\"\n[heartbeat]\ntimeout_ms = 1200\n",
        )
        .unwrap();
        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.socket_path, PathBuf::from("/run/bridgekit-9"));
        assert_eq!(config.heartbeat.timeout_ms, 1200);
        // Untouched sections keep their defaults.
        assert_eq!(config.arena.max_web_audio_players, 1);
    }
}
