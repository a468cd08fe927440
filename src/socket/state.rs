use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// WebSocket ready states (matching browser API)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ReadyState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ReadyState::Closed
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadyState::Connecting => "connecting",
            ReadyState::Open => "open",
            ReadyState::Closing => "closing",
            ReadyState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Ready state shared between the handle, the transport driver and the loop.
///
/// The state only ever moves forward: `Connecting -> Open -> Closing -> Closed`,
/// with `Open` and `Closing` both skippable.
#[derive(Debug)]
pub struct SharedReadyState(AtomicU8);

impl SharedReadyState {
    pub fn new() -> Self {
        Self(AtomicU8::new(ReadyState::Connecting as u8))
    }

    pub fn load(&self) -> ReadyState {
        ReadyState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Move to `next` if it is strictly later than the current state.
    ///
    /// Returns the previous state on success, or the current state if the
    /// transition would go backwards or stay in place.
    pub fn advance(&self, next: ReadyState) -> Result<ReadyState, ReadyState> {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (next as u8 > current).then_some(next as u8)
            })
            .map(ReadyState::from_u8)
            .map_err(ReadyState::from_u8)
    }
}

impl Default for SharedReadyState {
    fn default() -> Self {
        Self::new()
    }
}
