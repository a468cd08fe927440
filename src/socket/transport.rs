//! Transport driver for one connection.
//!
//! Performs the TCP connect, the TLS handshake for `wss` addresses and the
//! WebSocket handshake with tokio-tungstenite, then pumps frames in both directions. Every outcome is reported to the
//! event loop as a [`SocketEvent`]; nothing is returned to a caller.

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use url::Url;

use crate::event_loop::LoopClient;
use crate::socket::event::{CLOSE_ABNORMAL, CLOSE_NO_STATUS};
use crate::socket::handle::Outbound;
use crate::socket::{ReadyState, SocketEvent, WebSocket};

/// How long to keep reading after a close frame so the close handshake can finish.
const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Handshake options sent with the upgrade request.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Value of the `Origin` header, if any.
    pub origin: Option<String>,
    /// Sub-protocols offered in `Sec-WebSocket-Protocol`.
    pub protocols: Vec<String>,
}

/// Report a connection that failed before or during the handshake.
fn fail(client: &LoopClient, id: u32, message: String, reason: &str) {
    log::error!("[WebSocket {}] {}", id, message);
    client.dispatch(id, SocketEvent::error(message));
    client.dispatch(id, SocketEvent::close(CLOSE_ABNORMAL, reason));
}

/// Start driving `socket`, on the current tokio runtime when there is one.
pub(crate) fn spawn(
    socket: WebSocket,
    url: Url,
    options: ConnectOptions,
    outbound: mpsc::UnboundedReceiver<Outbound>,
    client: LoopClient,
) {
    let task = drive(socket, url, options, outbound, client);
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(task);
        }
        Err(_) => spawn_on_own_runtime(task),
    }
}

/// Run the driver on a separate thread with its own tokio runtime.
fn spawn_on_own_runtime(task: impl Future<Output = ()> + Send + 'static) {
    std::thread::spawn(move || {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt.block_on(task),
            Err(e) => log::error!("Failed to create WebSocket runtime: {}", e),
        }
    });
}

async fn drive(
    socket: WebSocket,
    url: Url,
    options: ConnectOptions,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    client: LoopClient,
) {
    let id = socket.id();
    log::info!("[WebSocket {}] Connecting to {}", id, url);

    if url.scheme() == "wss" {
        // Err only means a provider is already installed for the process.
        let _ = rustls::crypto::ring::default_provider().install_default();
    }

    let host = url.host_str().unwrap_or("localhost");
    let port = url.port_or_known_default().unwrap_or(80);
    let addr = format!("{}:{}", host, port);

    log::info!("[WebSocket {}] Connecting TCP to {}", id, addr);

    let tcp_stream = match TcpStream::connect(&addr).await {
        Ok(stream) => {
            log::info!("[WebSocket {}] TCP connected", id);
            stream
        }
        Err(e) => {
            fail(
                &client,
                id,
                format!("TCP connection failed: {}", e),
                "Connection failed",
            );
            return;
        }
    };

    let mut request = match url.as_str().into_client_request() {
        Ok(req) => req,
        Err(e) => {
            fail(&client, id, format!("Invalid request: {}", e), "Invalid request");
            return;
        }
    };

    if let Some(origin) = &options.origin {
        match HeaderValue::from_str(origin) {
            Ok(value) => {
                request.headers_mut().insert("Origin", value);
            }
            Err(e) => {
                fail(&client, id, format!("Invalid origin: {}", e), "Invalid request");
                return;
            }
        }
    }

    if !options.protocols.is_empty() {
        match HeaderValue::from_str(&options.protocols.join(", ")) {
            Ok(value) => {
                request.headers_mut().insert("Sec-WebSocket-Protocol", value);
            }
            Err(e) => {
                fail(&client, id, format!("Invalid protocol: {}", e), "Invalid request");
                return;
            }
        }
    }

    log::info!("[WebSocket {}] Performing WebSocket handshake", id);

    let ws_stream = match tokio_tungstenite::client_async_tls(request, tcp_stream).await {
        Ok((stream, response)) => {
            log::info!(
                "[WebSocket {}] Connected successfully (status: {})",
                id,
                response.status()
            );
            if let Some(protocol) = response
                .headers()
                .get("Sec-WebSocket-Protocol")
                .and_then(|v| v.to_str().ok())
            {
                let _ = socket.shared.protocol.set(protocol.to_string());
            }
            stream
        }
        Err(e) => {
            fail(
                &client,
                id,
                format!("Handshake failed: {}", e),
                "Handshake failed",
            );
            return;
        }
    };

    if socket.ready_state() == ReadyState::Closing {
        fail(
            &client,
            id,
            "WebSocket is closed before the connection is established".to_string(),
            "Closed while connecting",
        );
        return;
    }

    client.dispatch(id, SocketEvent::Open);

    let (mut write, mut read) = ws_stream.split();

    let send_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            match frame {
                Outbound::Text(text) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        log::error!("[WebSocket {}] Send error: {}", id, e);
                        break;
                    }
                }
                Outbound::Close { code, reason } => {
                    let frame = CloseFrame {
                        code: code.into(),
                        reason: reason.into(),
                    };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        log::error!("[WebSocket {}] Close error: {}", id, e);
                    }
                    break;
                }
            }
        }
    });

    let mut close_event = None;
    let mut close_received = false;
    while let Some(msg_result) = read.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                log::debug!(
                    "[WebSocket {}] Received: {}",
                    id,
                    text.as_str().chars().take(100).collect::<String>()
                );
                client.dispatch(id, SocketEvent::message(text.as_str()));
            }
            Ok(Message::Binary(data)) => {
                log::debug!(
                    "[WebSocket {}] Received binary ({} bytes), ignored",
                    id,
                    data.len()
                );
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Handled by tungstenite
            }
            Ok(Message::Close(frame)) => {
                let (code, reason) = frame
                    .map(|f| (f.code.into(), f.reason.to_string()))
                    .unwrap_or((CLOSE_NO_STATUS, String::new()));
                log::info!("[WebSocket {}] Received close: {} {}", id, code, reason);
                close_event = Some(SocketEvent::clean_close(code, reason));
                close_received = true;
                break;
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                log::error!("[WebSocket {}] Read error: {}", id, e);
                client.dispatch(id, SocketEvent::error(e.to_string()));
                close_event = Some(SocketEvent::close(CLOSE_ABNORMAL, "Connection error"));
                break;
            }
        }
    }

    client.dispatch(
        id,
        close_event.unwrap_or_else(|| SocketEvent::close(CLOSE_ABNORMAL, "Connection lost")),
    );

    if close_received {
        // Reading flushes the close reply and waits for the peer to hang up.
        let drain = async { while read.next().await.is_some() {} };
        if tokio::time::timeout(CLOSE_DRAIN_TIMEOUT, drain).await.is_err() {
            log::debug!("[WebSocket {}] Peer kept the connection open after close", id);
        }
    }

    send_task.abort();
    log::info!("[WebSocket {}] Connection ended", id);
}
