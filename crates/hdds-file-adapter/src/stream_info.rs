// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery records and per-stream lifecycle.

use std::fmt;

/// Registered data type of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// Registered type name.
    pub type_name: String,
}

impl TypeInfo {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

/// Discovery record describing one stream available for routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// Stream name.
    pub stream_name: String,

    /// Registered data type.
    pub type_info: TypeInfo,

    /// True when the stream has been retired.
    pub disposed: bool,
}

impl StreamInfo {
    /// Create a record announcing a live stream.
    pub fn new(stream_name: impl Into<String>, type_info: TypeInfo) -> Self {
        Self {
            stream_name: stream_name.into(),
            type_info,
            disposed: false,
        }
    }

    /// Copy of this record with `disposed` set.
    pub fn to_disposed(&self) -> Self {
        Self {
            disposed: true,
            ..self.clone()
        }
    }
}

impl fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}){}",
            self.stream_name,
            self.type_info.type_name,
            if self.disposed { " [disposed]" } else { "" }
        )
    }
}

/// Lifecycle of a configured stream.
///
/// ```text
/// Unseen --announce--> Announced --dispose--> Disposed
/// ```
///
/// `Disposed` is terminal: a retired stream is never announced again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Configured, backing file absent at construction.
    Unseen,
    /// Announced to the engine.
    Announced,
    /// Retired.
    Disposed,
}

/// Lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    Announce,
    Dispose,
}

impl StreamState {
    /// Apply an event; `None` if the transition is not allowed.
    pub fn transition(self, event: StreamEvent) -> Option<StreamState> {
        match (self, event) {
            (Self::Unseen, StreamEvent::Announce) => Some(Self::Announced),
            (Self::Announced, StreamEvent::Dispose) => Some(Self::Disposed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Disposed
    }
}
