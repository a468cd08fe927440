use std::fmt;

use serde::Serialize;

/// Close code sent by a normal, locally requested close.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code reported when the peer's close frame carried no status.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Close code reported when the connection ended without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Event delivered to handlers, mirroring the browser event object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SocketEvent {
    Open,
    Message {
        data: String,
    },
    Close {
        code: u16,
        reason: String,
        #[serde(rename = "wasClean")]
        was_clean: bool,
    },
    Error {
        message: String,
    },
}

impl SocketEvent {
    pub fn message(data: impl Into<String>) -> Self {
        SocketEvent::Message { data: data.into() }
    }

    /// Close after the closing handshake completed with the peer.
    pub fn clean_close(code: u16, reason: impl Into<String>) -> Self {
        SocketEvent::Close {
            code,
            reason: reason.into(),
            was_clean: true,
        }
    }

    /// Close of a connection that failed or was dropped without a close frame.
    pub fn close(code: u16, reason: impl Into<String>) -> Self {
        SocketEvent::Close {
            code,
            reason: reason.into(),
            was_clean: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        SocketEvent::Error {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            SocketEvent::Open => EventKind::Open,
            SocketEvent::Message { .. } => EventKind::Message,
            SocketEvent::Close { .. } => EventKind::Close,
            SocketEvent::Error { .. } => EventKind::Error,
        }
    }

    /// Payload of a message event.
    pub fn data(&self) -> Option<&str> {
        match self {
            SocketEvent::Message { data } => Some(data),
            _ => None,
        }
    }

    /// JSON form of the event, as written to logs.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"type\":\"{}\"}}", self.kind()))
    }
}

impl fmt::Display for SocketEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

/// Event type used to register listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Message,
    Close,
    Error,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Open => "open",
            EventKind::Message => "message",
            EventKind::Close => "close",
            EventKind::Error => "error",
        };
        f.write_str(name)
    }
}
