pub mod event_loop;
pub mod session;
pub mod socket;

pub use event_loop::{Context, EventLoop, LoopClient, TimerId};
pub use session::{PingSession, SessionConfig, Transcript};
pub use socket::{
    ConnectOptions, EventKind, ReadyState, Result, SocketError, SocketEvent, WebSocket,
};

pub mod prelude {
    pub use crate::event_loop::{Context, EventLoop};
    pub use crate::socket::{EventKind, ReadyState, SocketEvent, WebSocket};
}
