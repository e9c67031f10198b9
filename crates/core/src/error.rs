// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Structured error types for BridgeKit.
//!
//! One enum categorises every failure the broker can surface so callers can
//! route on the class of error rather than parse strings. Transient capacity
//! and protocol violations stay local to a segment/ticket; state and pipeline
//! errors surface to the client as state-change events.

use thiserror::Error;

/// Main error type for BridgeKit operations.
#[derive(Debug, Error)]
pub enum BridgeKitError {
    /// Configuration or parameter validation error.
    ///
    /// Examples:
    /// - Invalid PCM config (zero channels, unsupported sample size)
    /// - Shared-memory partition smaller than one metadata block
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation attempted in the wrong session state.
    ///
    /// Examples:
    /// - `play` before `load`
    /// - `write_buffer` without a reserved window
    ///
    /// The operation fails synchronously and leaves state unchanged.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Protocol violation: malformed segment, unknown media type, missing
    /// required field, or a serialization failure. The offending segment is
    /// dropped and the ticket finalised with an error status.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Media pipeline failure (a backend error or failed state change).
    /// Latches the session into FAILURE; only `stop` and destruction remain.
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Network/IPC-related error (socket closed, call timeout, framing).
    #[error("Network error: {0}")]
    Network(String),

    /// The referenced session, source, control or key session is not known.
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O error (shared-memory mapping, socket binding, profiler dump).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource exhaustion or limit exceeded.
    ///
    /// Examples:
    /// - Active-requests table at capacity
    /// - No free shared-memory partition for a new session
    #[error("Resource exhaustion: {0}")]
    ResourceExhausted(String),
}

/// Convenience type alias for Results using `BridgeKitError`.
pub type Result<T> = std::result::Result<T, BridgeKitError>;

impl From<BridgeKitError> for String {
    fn from(err: BridgeKitError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BridgeKitError::InvalidState("play before load".to_string());
        assert_eq!(err.to_string(), "Invalid state: play before load");

        let err = BridgeKitError::Protocol("segment without key id".to_string());
        assert_eq!(err.to_string(), "Protocol error: segment without key id");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such socket");
        let err: BridgeKitError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
        assert!(err.to_string().contains("no such socket"));
    }
}
