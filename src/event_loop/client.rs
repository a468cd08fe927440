use tokio::sync::mpsc;

use crate::event_loop::TimerId;
use crate::socket::SocketEvent;

/// Commands that can be sent to the event loop.
#[derive(Debug)]
pub enum LoopCommand {
    /// Deliver an event to the handlers of a connection.
    Dispatch { id: u32, event: SocketEvent },
    /// A timer armed with `set_timeout` has elapsed.
    TimerFired { timer: TimerId },
    /// Stop the event loop.
    Shutdown,
}

/// Client handle for pushing work onto the event loop.
///
/// This is cheap to clone and can be shared across threads and tasks.
#[derive(Debug, Clone)]
pub struct LoopClient {
    sender: mpsc::UnboundedSender<LoopCommand>,
}

impl LoopClient {
    pub(crate) fn new(sender: mpsc::UnboundedSender<LoopCommand>) -> Self {
        Self { sender }
    }

    /// Push an event for connection `id`.
    pub fn dispatch(&self, id: u32, event: SocketEvent) {
        log::debug!("[WebSocket {}] Queueing {} event", id, event.kind());
        if let Err(e) = self.sender.send(LoopCommand::Dispatch { id, event }) {
            log::warn!("[WebSocket {}] Event loop gone, dropping event: {}", id, e);
        }
    }

    pub(crate) fn timer_fired(&self, timer: TimerId) {
        if self.sender.send(LoopCommand::TimerFired { timer }).is_err() {
            log::debug!("Event loop gone, dropping timer {}", timer);
        }
    }

    /// Stop the event loop after the command currently being processed.
    pub fn shutdown(&self) {
        let _ = self.sender.send(LoopCommand::Shutdown);
    }
}
