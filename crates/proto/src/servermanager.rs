// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Server-manager module messages: the privileged control plane a session
//! manager uses to drive lifecycle state and liveness of the whole server.

/// Method names exported by the server-manager module service.
pub mod methods {
    pub const SET_STATE: &str = "servermanager.set_state";
    pub const PING: &str = "servermanager.ping";
}

/// Event names emitted by the server-manager module service.
pub mod events {
    pub const STATE_CHANGED: &str = "servermanager.state_changed";
    pub const ACK: &str = "servermanager.ack";
}

/// Lifecycle states a session server moves through, as seen by the manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SessionServerState {
    Uninitialized = 0,
    Inactive = 1,
    Active = 2,
    NotRunning = 3,
    Error = 4,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SetStateRequest {
    #[prost(enumeration = "SessionServerState", tag = "1")]
    pub state: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct StateChangedEvent {
    #[prost(enumeration = "SessionServerState", tag = "1")]
    pub state: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct PingRequest {
    #[prost(uint32, tag = "1")]
    pub id: u32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct AckEvent {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    /// False when the ack set did not complete within the timeout.
    #[prost(bool, tag = "2")]
    pub success: bool,
}
