// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Metadata-version negotiation.
//!
//! The server advertises the latest version; a deployment can pin an older
//! one through `BRIDGEKIT_METADATA_VERSION`. Unparseable or too-new values
//! fall back to the latest, so a stale pin never bricks playback.

use bridgekit_core::constants::{
    LATEST_METADATA_VERSION, METADATA_VERSION_ENV, METADATA_VERSION_V1, METADATA_VERSION_V2,
};

/// On-wire metadata layout versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataVersion {
    V1,
    V2,
}

impl MetadataVersion {
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::V1 => METADATA_VERSION_V1,
            Self::V2 => METADATA_VERSION_V2,
        }
    }

    pub const fn latest() -> Self {
        Self::V2
    }

    /// Maps a version word to a known layout.
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            METADATA_VERSION_V1 => Some(Self::V1),
            METADATA_VERSION_V2 => Some(Self::V2),
            _ => None,
        }
    }
}

/// The version this process writes, honouring the environment pin.
pub fn negotiated_version() -> MetadataVersion {
    negotiate(std::env::var(METADATA_VERSION_ENV).ok().as_deref())
}

fn negotiate(pin: Option<&str>) -> MetadataVersion {
    let Some(pin) = pin else {
        return MetadataVersion::latest();
    };
    match pin.trim().parse::<u32>() {
        Ok(value) if value >= 1 && value <= LATEST_METADATA_VERSION => {
            MetadataVersion::from_u32(value).unwrap_or(MetadataVersion::latest())
        }
        _ => MetadataVersion::latest(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpinned_is_latest() {
        assert_eq!(negotiate(None), MetadataVersion::V2);
    }

    #[test]
    fn test_pin_to_v1() {
        assert_eq!(negotiate(Some("1")), MetadataVersion::V1);
        assert_eq!(negotiate(Some(" 1 ")), MetadataVersion::V1);
    }

    #[test]
    fn test_invalid_or_too_new_falls_back() {
        assert_eq!(negotiate(Some("0")), MetadataVersion::V2);
        assert_eq!(negotiate(Some("3")), MetadataVersion::V2);
        assert_eq!(negotiate(Some("two")), MetadataVersion::V2);
        assert_eq!(negotiate(Some("")), MetadataVersion::V2);
    }
}
