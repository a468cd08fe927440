//! Event loop
//!
//! Owns every connection's handlers and runs them one at a time as
//! commands arrive from transport drivers and timers.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::event_loop::{Handler, Listeners, LoopClient, LoopCommand};
use crate::socket::{
    self, ConnectOptions, EventKind, ReadyState, Result, SocketEvent, WebSocket,
};

/// Identifier returned by [`Context::set_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type TimerCallback = Box<dyn FnOnce(&mut Context<'_>)>;

struct Timer {
    socket: WebSocket,
    callback: TimerCallback,
    task: JoinHandle<()>,
}

/// Pending `set_timeout` callbacks.
struct Timers {
    client: LoopClient,
    pending: HashMap<TimerId, Timer>,
    next_id: u64,
}

impl Timers {
    fn new(client: LoopClient) -> Self {
        Self {
            client,
            pending: HashMap::new(),
            next_id: 1,
        }
    }

    fn schedule(&mut self, socket: WebSocket, delay: Duration, callback: TimerCallback) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        let client = self.client.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            client.timer_fired(id);
        });

        log::debug!(
            "[WebSocket {}] Timer {} armed for {:?}",
            socket.id(),
            id,
            delay
        );
        self.pending.insert(
            id,
            Timer {
                socket,
                callback,
                task,
            },
        );
        id
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        match self.pending.remove(&id) {
            Some(timer) => {
                timer.task.abort();
                true
            }
            None => false,
        }
    }

    fn cancel_all(&mut self) {
        for (_, timer) in self.pending.drain() {
            timer.task.abort();
        }
    }
}

/// What a handler can reach while it runs.
pub struct Context<'a> {
    socket: &'a WebSocket,
    timers: &'a mut Timers,
}

impl Context<'_> {
    /// The connection the current event or timer belongs to.
    pub fn socket(&self) -> &WebSocket {
        self.socket
    }

    /// Run `callback` on the loop once `delay` has elapsed.
    pub fn set_timeout(
        &mut self,
        delay: Duration,
        callback: impl FnOnce(&mut Context<'_>) + 'static,
    ) -> TimerId {
        self.timers
            .schedule(self.socket.clone(), delay, Box::new(callback))
    }

    /// Cancel a pending timer. Returns false if it already ran or never existed.
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }
}

struct SocketEntry {
    socket: WebSocket,
    listeners: Listeners,
}

/// Single-threaded event loop hosting WebSocket connections.
///
/// Handlers only ever run from [`EventLoop::run`], strictly one after another.
pub struct EventLoop {
    client: LoopClient,
    receiver: mpsc::UnboundedReceiver<LoopCommand>,
    sockets: HashMap<u32, SocketEntry>,
    timers: Timers,
    next_id: u32,
}

impl EventLoop {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let client = LoopClient::new(sender);
        Self {
            timers: Timers::new(client.clone()),
            client,
            receiver,
            sockets: HashMap::new(),
            next_id: 1,
        }
    }

    /// Get a client handle for pushing commands onto the loop.
    pub fn client(&self) -> LoopClient {
        self.client.clone()
    }

    /// Open a connection to `address`. Returns immediately in `Connecting` state.
    pub fn connect(&mut self, address: &str) -> Result<WebSocket> {
        self.connect_with(address, ConnectOptions::default())
    }

    /// Open a connection with explicit handshake options.
    pub fn connect_with(&mut self, address: &str, options: ConnectOptions) -> Result<WebSocket> {
        let url = socket::parse_url(address)?;
        let id = self.next_id;
        self.next_id += 1;

        let (socket, outbound) = WebSocket::new(id, url.to_string());
        self.sockets.insert(
            id,
            SocketEntry {
                socket: socket.clone(),
                listeners: Listeners::new(),
            },
        );

        log::info!("[WebSocket {}] Created connection to {}", id, url);
        socket::transport::spawn(socket.clone(), url, options, outbound, self.client());
        Ok(socket)
    }

    fn listeners_mut(&mut self, socket: &WebSocket) -> Option<&mut Listeners> {
        let entry = self.sockets.get_mut(&socket.id());
        if entry.is_none() {
            log::warn!(
                "[WebSocket {}] Connection already closed, handler not registered",
                socket.id()
            );
        }
        entry.map(|entry| &mut entry.listeners)
    }

    /// Set the `on*` handler for `kind`, replacing the previous one.
    pub fn set_handler(
        &mut self,
        socket: &WebSocket,
        kind: EventKind,
        handler: impl FnMut(&mut Context<'_>, &SocketEvent) + 'static,
    ) {
        if let Some(listeners) = self.listeners_mut(socket) {
            listeners.set(kind, Box::new(handler) as Handler);
        }
    }

    pub fn on_open(
        &mut self,
        socket: &WebSocket,
        handler: impl FnMut(&mut Context<'_>, &SocketEvent) + 'static,
    ) {
        self.set_handler(socket, EventKind::Open, handler);
    }

    pub fn on_message(
        &mut self,
        socket: &WebSocket,
        handler: impl FnMut(&mut Context<'_>, &SocketEvent) + 'static,
    ) {
        self.set_handler(socket, EventKind::Message, handler);
    }

    pub fn on_close(
        &mut self,
        socket: &WebSocket,
        handler: impl FnMut(&mut Context<'_>, &SocketEvent) + 'static,
    ) {
        self.set_handler(socket, EventKind::Close, handler);
    }

    pub fn on_error(
        &mut self,
        socket: &WebSocket,
        handler: impl FnMut(&mut Context<'_>, &SocketEvent) + 'static,
    ) {
        self.set_handler(socket, EventKind::Error, handler);
    }

    /// Append a listener for `kind`; listeners run after the `on*` handler.
    pub fn add_event_listener(
        &mut self,
        socket: &WebSocket,
        kind: EventKind,
        handler: impl FnMut(&mut Context<'_>, &SocketEvent) + 'static,
    ) {
        if let Some(listeners) = self.listeners_mut(socket) {
            listeners.add(kind, Box::new(handler));
        }
    }

    /// Remove the `on*` handler and all listeners for `kind`.
    pub fn remove_event_listeners(&mut self, socket: &WebSocket, kind: EventKind) {
        if let Some(listeners) = self.listeners_mut(socket) {
            listeners.remove_all(kind);
        }
    }

    /// Number of connections that have not delivered their close event yet.
    pub fn live_sockets(&self) -> usize {
        self.sockets.len()
    }

    /// Number of timers that have not fired or been cleared.
    pub fn pending_timers(&self) -> usize {
        self.timers.pending.len()
    }

    fn is_idle(&self) -> bool {
        self.sockets.is_empty() && self.timers.pending.is_empty()
    }

    /// Process commands until no connection or timer is left, or until shutdown.
    pub async fn run(&mut self) {
        log::info!("Event loop started");

        while !self.is_idle() {
            match self.receiver.recv().await {
                Some(LoopCommand::Dispatch { id, event }) => self.dispatch(id, event),
                Some(LoopCommand::TimerFired { timer }) => self.fire_timer(timer),
                Some(LoopCommand::Shutdown) => {
                    log::info!("Event loop shutting down");
                    self.close_all();
                    break;
                }
                None => break,
            }
        }

        self.timers.cancel_all();
        log::info!("Event loop stopped");
    }

    /// Start the close handshake on every connection still alive.
    ///
    /// Their close events arrive after the loop stopped and are not dispatched.
    fn close_all(&mut self) {
        for entry in self.sockets.values() {
            if let Err(e) = entry.socket.close() {
                log::warn!("[WebSocket {}] Close on shutdown failed: {}", entry.socket.id(), e);
            }
        }
    }

    fn dispatch(&mut self, id: u32, event: SocketEvent) {
        let Some(entry) = self.sockets.get_mut(&id) else {
            log::warn!(
                "[WebSocket {}] No connection found for {} event",
                id,
                event.kind()
            );
            return;
        };

        let shared = &entry.socket.shared;
        match &event {
            SocketEvent::Open => {
                if let Err(state) = shared.ready_state.advance(ReadyState::Open) {
                    log::info!(
                        "[WebSocket {}] Open event skipped, connection is {}",
                        id,
                        state
                    );
                    return;
                }
            }
            SocketEvent::Message { data } => {
                if let Ok(mut last) = shared.last_message.lock() {
                    *last = Some(data.clone());
                }
            }
            SocketEvent::Close { .. } => {
                let _ = shared.ready_state.advance(ReadyState::Closed);
            }
            SocketEvent::Error { .. } => {}
        }

        log::info!("[WebSocket {}] Dispatching {} event", id, event.kind());
        let mut context = Context {
            socket: &entry.socket,
            timers: &mut self.timers,
        };
        entry.listeners.dispatch(&mut context, &event);

        if matches!(event, SocketEvent::Close { .. }) {
            self.sockets.remove(&id);
        }
    }

    fn fire_timer(&mut self, id: TimerId) {
        let Some(timer) = self.timers.pending.remove(&id) else {
            log::debug!("Timer {} was cleared before it fired", id);
            return;
        };

        log::debug!("[WebSocket {}] Timer {} fired", timer.socket.id(), id);
        let mut context = Context {
            socket: &timer.socket,
            timers: &mut self.timers,
        };
        let callback = timer.callback;
        if catch_unwind(AssertUnwindSafe(|| callback(&mut context))).is_err() {
            log::error!("[WebSocket {}] Timer {} callback panicked", timer.socket.id(), id);
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}
