use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::mpsc;

use crate::socket::event::CLOSE_NORMAL;
use crate::socket::{ReadyState, Result, SharedReadyState, SocketError};

/// Longest close reason the protocol allows, in bytes.
pub const MAX_CLOSE_REASON: usize = 123;

/// Frames queued by the handle for the transport driver.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Outbound {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) ready_state: SharedReadyState,
    pub(crate) protocol: OnceLock<String>,
    pub(crate) last_message: Mutex<Option<String>>,
}

/// A handle to one WebSocket connection.
///
/// Cheap to clone; every clone refers to the same connection.
#[derive(Debug, Clone)]
pub struct WebSocket {
    id: u32,
    url: String,
    pub(crate) shared: Arc<Shared>,
    sender: mpsc::UnboundedSender<Outbound>,
}

impl WebSocket {
    pub(crate) fn new(id: u32, url: String) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let socket = Self {
            id,
            url,
            shared: Arc::new(Shared::default()),
            sender,
        };
        (socket, receiver)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn ready_state(&self) -> ReadyState {
        self.shared.ready_state.load()
    }

    /// Sub-protocol selected by the server, empty until the handshake completes.
    pub fn protocol(&self) -> String {
        self.shared.protocol.get().cloned().unwrap_or_default()
    }

    /// Last text payload received on this connection.
    pub fn last_message(&self) -> Option<String> {
        self.shared
            .last_message
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }

    /// Queue a text frame. Only valid while the connection is open.
    pub fn send(&self, data: impl Into<String>) -> Result<()> {
        let state = self.ready_state();
        if state != ReadyState::Open {
            return Err(SocketError::InvalidState(state));
        }
        let data = data.into();
        log::debug!("[WebSocket {}] send({} bytes)", self.id, data.len());
        self.sender
            .send(Outbound::Text(data))
            .map_err(|_| SocketError::InvalidState(self.ready_state()))
    }

    /// Start a normal close (code 1000).
    pub fn close(&self) -> Result<()> {
        self.close_with(CLOSE_NORMAL, "")
    }

    /// Start a close with an explicit code and reason.
    ///
    /// Closing an already closing or closed connection does nothing.
    pub fn close_with(&self, code: u16, reason: impl Into<String>) -> Result<()> {
        let reason = reason.into();
        if code != CLOSE_NORMAL && !(3000..=4999).contains(&code) {
            return Err(SocketError::InvalidCloseCode(code));
        }
        if reason.len() > MAX_CLOSE_REASON {
            return Err(SocketError::ReasonTooLong(reason.len()));
        }

        match self.shared.ready_state.advance(ReadyState::Closing) {
            Ok(previous) => {
                log::info!(
                    "[WebSocket {}] Closing ({} {}) from {}",
                    self.id,
                    code,
                    reason,
                    previous
                );
                // Nothing drains the queue until the handshake is done, so a
                // close requested while connecting is sent right after it.
                if self.sender.send(Outbound::Close { code, reason }).is_err() {
                    log::debug!("[WebSocket {}] Transport already finished", self.id);
                }
                Ok(())
            }
            Err(state) => {
                log::debug!("[WebSocket {}] close() ignored in state {}", self.id, state);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn socket() -> (WebSocket, mpsc::UnboundedReceiver<Outbound>) {
        WebSocket::new(1, "ws://127.0.0.1:3000/chat".to_string())
    }

    #[test]
    fn send_requires_open_state() {
        let (ws, mut rx) = socket();
        assert!(matches!(
            ws.send("ping"),
            Err(SocketError::InvalidState(ReadyState::Connecting))
        ));
        assert!(rx.try_recv().is_err());

        ws.shared.ready_state.advance(ReadyState::Open).unwrap();
        ws.send("ping").unwrap();
        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("ping".to_string()));
    }

    #[test]
    fn close_queues_one_frame_and_is_idempotent() {
        let (ws, mut rx) = socket();
        ws.shared.ready_state.advance(ReadyState::Open).unwrap();

        ws.close().unwrap();
        ws.close().unwrap();

        assert_eq!(ws.ready_state(), ReadyState::Closing);
        assert_eq!(
            rx.try_recv().unwrap(),
            Outbound::Close {
                code: 1000,
                reason: String::new()
            }
        );
        assert!(rx.try_recv().is_err());
        assert!(matches!(
            ws.send("late"),
            Err(SocketError::InvalidState(ReadyState::Closing))
        ));
    }

    #[test]
    fn close_while_connecting_moves_to_closing() {
        let (ws, _rx) = socket();
        ws.close().unwrap();
        assert_eq!(ws.ready_state(), ReadyState::Closing);
    }

    #[test]
    fn close_after_closed_is_a_no_op() {
        let (ws, mut rx) = socket();
        ws.shared.ready_state.advance(ReadyState::Closed).unwrap();
        ws.close().unwrap();
        assert_eq!(ws.ready_state(), ReadyState::Closed);
        assert!(rx.try_recv().is_err());
    }

    #[rstest]
    #[case(999)]
    #[case(1001)]
    #[case(2999)]
    #[case(5000)]
    fn rejects_reserved_close_codes(#[case] code: u16) {
        let (ws, _rx) = socket();
        assert!(matches!(
            ws.close_with(code, ""),
            Err(SocketError::InvalidCloseCode(c)) if c == code
        ));
        assert_eq!(ws.ready_state(), ReadyState::Connecting);
    }

    #[test]
    fn rejects_long_reasons() {
        let (ws, _rx) = socket();
        let reason = "x".repeat(MAX_CLOSE_REASON + 1);
        assert!(matches!(
            ws.close_with(4000, reason),
            Err(SocketError::ReasonTooLong(124))
        ));
        ws.close_with(4000, "x".repeat(MAX_CLOSE_REASON)).unwrap();
    }

    #[test]
    fn protocol_defaults_to_empty() {
        let (ws, _rx) = socket();
        assert_eq!(ws.protocol(), "");
        assert_eq!(ws.last_message(), None);
    }
}
