use std::time::Duration;

use crate::socket::ConnectOptions;

pub const DEFAULT_URL: &str = "ws://127.0.0.1:3000/chat";

pub const DEFAULT_PAYLOAD: &str = "ping";

/// Delay used by the delayed-close variant.
pub const DEFAULT_CLOSE_AFTER: Duration = Duration::from_millis(1000);

/// Settings for one ping session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub url: String,
    pub payload: String,
    /// Close this long after each received message. `None` leaves the
    /// connection open until the peer closes it.
    pub close_after: Option<Duration>,
    pub origin: Option<String>,
    pub protocols: Vec<String>,
}

impl SessionConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn with_close_after(mut self, delay: Duration) -> Self {
        self.close_after = Some(delay);
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocols.push(protocol.into());
        self
    }

    pub(crate) fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            origin: self.origin.clone(),
            protocols: self.protocols.clone(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            payload: DEFAULT_PAYLOAD.to_string(),
            close_after: None,
            origin: None,
            protocols: Vec::new(),
        }
    }
}
