use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::event_loop::Context;
use crate::socket::{EventKind, SocketEvent};

/// Callback invoked on the event loop for a connection event.
pub type Handler = Box<dyn FnMut(&mut Context<'_>, &SocketEvent)>;

/// Handlers attached to one connection.
///
/// Each event kind has one `on*` slot plus any number of listeners. The slot
/// runs first, then listeners in registration order, like `onmessage` and
/// `addEventListener("message", ..)` in a browser.
#[derive(Default)]
pub struct Listeners {
    slots: HashMap<EventKind, Handler>,
    listeners: HashMap<EventKind, Vec<Handler>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `on*` handler for `kind`, replacing any previous one.
    pub fn set(&mut self, kind: EventKind, handler: Handler) {
        self.slots.insert(kind, handler);
    }

    /// Append a listener for `kind`.
    pub fn add(&mut self, kind: EventKind, handler: Handler) {
        self.listeners.entry(kind).or_default().push(handler);
    }

    /// Drop the slot handler and every listener for `kind`.
    pub fn remove_all(&mut self, kind: EventKind) {
        self.slots.remove(&kind);
        self.listeners.remove(&kind);
    }

    /// Run every handler registered for the event's kind.
    ///
    /// A panicking handler is logged and does not stop the others.
    pub fn dispatch(&mut self, context: &mut Context<'_>, event: &SocketEvent) {
        let kind = event.kind();
        let slot = self.slots.get_mut(&kind).into_iter();
        let listeners = self.listeners.get_mut(&kind).into_iter().flatten();
        for handler in slot.chain(listeners) {
            if catch_unwind(AssertUnwindSafe(|| handler(context, event))).is_err() {
                log::error!(
                    "[WebSocket {}] {} handler panicked",
                    context.socket().id(),
                    kind
                );
            }
        }
    }
}
