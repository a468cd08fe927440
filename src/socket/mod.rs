//! WebSocket connection
//!
//! A browser-style WebSocket over tokio-tungstenite: a cloneable
//! [`WebSocket`] handle with `send`/`close`, a forward-only ready state,
//! and a transport driver that reports everything it sees as
//! [`SocketEvent`]s pushed to the event loop.

mod error;
mod event;
mod handle;
mod state;
pub(crate) mod transport;

pub use error::{Result, SocketError};
pub use event::{CLOSE_ABNORMAL, CLOSE_NO_STATUS, CLOSE_NORMAL, EventKind, SocketEvent};
pub use handle::{MAX_CLOSE_REASON, WebSocket};
pub use state::{ReadyState, SharedReadyState};
pub use transport::ConnectOptions;

use url::Url;

/// Parse a WebSocket address, accepting only the `ws` and `wss` schemes.
pub fn parse_url(address: &str) -> Result<Url> {
    let url = Url::parse(address).map_err(|source| SocketError::InvalidUrl {
        url: address.to_string(),
        source,
    })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(SocketError::UnsupportedScheme(other.to_string())),
    }
}
