//! Shared helpers for the integration tests: a throwaway local WebSocket
//! server and an event recorder.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use ws_ping::{EventKind, EventLoop, SocketEvent, WebSocket};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Bind a listener on an ephemeral port and return it with its `/chat` URL.
pub async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    (listener, format!("ws://127.0.0.1:{port}/chat"))
}

/// URL of a port nothing is listening on.
pub async fn unreachable_url() -> String {
    let (listener, url) = listen().await;
    drop(listener);
    url
}

/// Accept one connection and complete the server side of the handshake.
pub async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.expect("accept");
    tokio_tungstenite::accept_async(stream)
        .await
        .expect("server handshake")
}

/// Read until the peer goes away, returning the text frames and the close
/// code, if a close frame arrived.
pub async fn drain(ws: &mut WebSocketStream<TcpStream>) -> (Vec<String>, Option<u16>) {
    let mut texts = Vec::new();
    let mut close_code = None;
    while let Some(Ok(msg)) = ws.next().await {
        match msg {
            Message::Text(text) => texts.push(text.to_string()),
            Message::Close(frame) => close_code = Some(frame.map_or(1005, |f| f.code.into())),
            _ => {}
        }
    }
    (texts, close_code)
}

/// Record every event delivered for `socket`, in delivery order.
pub fn record_events(event_loop: &mut EventLoop, socket: &WebSocket) -> Rc<RefCell<Vec<SocketEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    for kind in [
        EventKind::Open,
        EventKind::Message,
        EventKind::Close,
        EventKind::Error,
    ] {
        let events = events.clone();
        event_loop.add_event_listener(socket, kind, move |_ctx, event| {
            events.borrow_mut().push(event.clone());
        });
    }
    events
}

/// Run the loop, failing the test if it does not finish in time.
pub async fn run(event_loop: &mut EventLoop) {
    tokio::time::timeout(TIMEOUT, event_loop.run())
        .await
        .expect("event loop did not finish");
}
