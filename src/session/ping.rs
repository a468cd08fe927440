use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::event_loop::{Context, EventLoop};
use crate::session::SessionConfig;
use crate::socket::{EventKind, Result, SocketEvent};

pub const OPENED: &str = "Connection opened";
pub const MESSAGE_PREFIX: &str = "message from server";
pub const CLOSING: &str = "closing connection...";
pub const CLOSED: &str = "Connection closed";
pub const ERROR: &str = "Connection error";

/// One logged line and when it was written, relative to session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub elapsed: Duration,
    pub line: String,
}

/// Lines a session logged, in order.
#[derive(Debug, Clone)]
pub struct Transcript {
    started: Instant,
    entries: Rc<RefCell<Vec<TranscriptEntry>>>,
}

impl Transcript {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            entries: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn record(&self, line: String, event: Option<&SocketEvent>) {
        match event {
            Some(event) => log::info!("{} {}", line, event),
            None => log::info!("{}", line),
        }
        self.entries.borrow_mut().push(TranscriptEntry {
            elapsed: self.started.elapsed(),
            line,
        });
    }

    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.entries.borrow().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|entry| entry.line.clone())
            .collect()
    }

    /// First entry whose line starts with `prefix`.
    pub fn find(&self, prefix: &str) -> Option<TranscriptEntry> {
        self.entries
            .borrow()
            .iter()
            .find(|entry| entry.line.starts_with(prefix))
            .cloned()
    }
}

/// Connects, sends the payload once the connection opens and logs every
/// lifecycle event.
pub struct PingSession {
    config: SessionConfig,
}

impl PingSession {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run until the connection is closed and no timer is pending.
    ///
    /// Only an invalid address is returned as an error; transport failures
    /// end up in the transcript.
    pub async fn run(self) -> Result<Transcript> {
        let mut event_loop = EventLoop::new();
        let socket = event_loop.connect_with(&self.config.url, self.config.connect_options())?;
        let transcript = Transcript::new();

        let log = transcript.clone();
        let payload = self.config.payload;
        event_loop.add_event_listener(&socket, EventKind::Open, move |ctx, event| {
            log.record(OPENED.to_string(), Some(event));
            match ctx.socket().send(payload.as_str()) {
                Ok(()) => log.record(format!("sent {}", payload), None),
                Err(e) => log::error!("Failed to send {}: {}", payload, e),
            }
        });

        let log = transcript.clone();
        let close_after = self.config.close_after;
        event_loop.add_event_listener(&socket, EventKind::Message, move |ctx, event| {
            let data = event.data().unwrap_or_default();
            log.record(format!("{} {}", MESSAGE_PREFIX, data), None);
            if let Some(delay) = close_after {
                let log = log.clone();
                ctx.set_timeout(delay, move |ctx: &mut Context<'_>| {
                    log.record(CLOSING.to_string(), None);
                    if let Err(e) = ctx.socket().close() {
                        log::error!("Failed to close: {}", e);
                    }
                });
            }
        });

        let log = transcript.clone();
        event_loop.add_event_listener(&socket, EventKind::Close, move |_ctx, event| {
            log.record(CLOSED.to_string(), Some(event));
        });

        let log = transcript.clone();
        event_loop.add_event_listener(&socket, EventKind::Error, move |_ctx, event| {
            log.record(ERROR.to_string(), Some(event));
        });

        event_loop.run().await;
        Ok(transcript)
    }
}
