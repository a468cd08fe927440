//! Ping session
//!
//! The client application: open one connection, send a single payload when
//! it opens, log every lifecycle event and optionally close a fixed delay
//! after each reply.

mod config;
mod ping;

pub use config::{DEFAULT_CLOSE_AFTER, DEFAULT_PAYLOAD, DEFAULT_URL, SessionConfig};
pub use ping::{
    CLOSED, CLOSING, ERROR, MESSAGE_PREFIX, OPENED, PingSession, Transcript, TranscriptEntry,
};
