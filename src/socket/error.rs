use thiserror::Error;

use crate::socket::ReadyState;

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported URL scheme '{0}', expected 'ws' or 'wss'")]
    UnsupportedScheme(String),

    #[error("WebSocket is not open (state: {0})")]
    InvalidState(ReadyState),

    #[error("Invalid close code {0}, expected 1000 or 3000-4999")]
    InvalidCloseCode(u16),

    #[error("Close reason is {0} bytes, at most 123 are allowed")]
    ReasonTooLong(usize),

    #[error("Event loop is no longer running")]
    LoopClosed,
}

pub type Result<T> = std::result::Result<T, SocketError>;
