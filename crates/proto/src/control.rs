// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Control module messages: client registration, application-state fan-out,
//! ping/ack liveness and shared-memory disclosure.

/// Method names exported by the control module service.
pub mod methods {
    pub const REGISTER_CLIENT: &str = "control.register_client";
    pub const UNREGISTER_CLIENT: &str = "control.unregister_client";
    pub const GET_SHARED_MEMORY: &str = "control.get_shared_memory";
    pub const ACK: &str = "control.ack";
}

/// Event names emitted by the control module service.
pub mod events {
    pub const APPLICATION_STATE: &str = "control.application_state";
    pub const PING: &str = "control.ping";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ApplicationState {
    UnknownState = 0,
    Inactive = 1,
    Running = 2,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RegisterClientRequest {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RegisterClientResponse {
    #[prost(int32, tag = "1")]
    pub control_id: i32,
    /// State at registration time; later transitions arrive as events.
    #[prost(enumeration = "ApplicationState", tag = "2")]
    pub application_state: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct UnregisterClientRequest {
    #[prost(int32, tag = "1")]
    pub control_id: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetSharedMemoryRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSharedMemoryResponse {
    /// POSIX shared-memory object name the client opens and maps read/write.
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(uint32, tag = "2")]
    pub size: u32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct AckRequest {
    #[prost(int32, tag = "1")]
    pub control_id: i32,
    /// Ping id being acknowledged.
    #[prost(uint32, tag = "2")]
    pub id: u32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ApplicationStateChangeEvent {
    #[prost(enumeration = "ApplicationState", tag = "1")]
    pub application_state: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct PingEvent {
    #[prost(int32, tag = "1")]
    pub control_id: i32,
    #[prost(uint32, tag = "2")]
    pub id: u32,
}
