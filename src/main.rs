use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use ws_ping::session::{DEFAULT_PAYLOAD, DEFAULT_URL};
use ws_ping::{PingSession, SessionConfig};

/// Open a WebSocket, send one payload and log what happens.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address of the WebSocket endpoint
    #[arg(long = "url", short = 'u', default_value = DEFAULT_URL)]
    url: String,

    /// Text frame sent once the connection opens
    #[arg(long = "payload", short = 'p', default_value = DEFAULT_PAYLOAD)]
    payload: String,

    /// Close the connection this many milliseconds after each reply
    #[arg(long = "close-after-ms", short = 'c')]
    close_after_ms: Option<u64>,

    /// Origin header sent with the handshake
    #[arg(long = "origin")]
    origin: Option<String>,

    /// Sub-protocol to request, may be repeated
    #[arg(long = "protocol")]
    protocols: Vec<String>,
}

impl Args {
    fn into_config(self) -> SessionConfig {
        let mut config = SessionConfig::default()
            .with_url(self.url)
            .with_payload(self.payload);
        if let Some(ms) = self.close_after_ms {
            config = config.with_close_after(Duration::from_millis(ms));
        }
        if let Some(origin) = self.origin {
            config = config.with_origin(origin);
        }
        for protocol in self.protocols {
            config = config.with_protocol(protocol);
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // RUST_LOG controls verbosity; lifecycle lines are logged at info.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();
    log::info!("Starting session to {}", config.url);

    match PingSession::new(config).run().await {
        Ok(transcript) => {
            log::debug!("Session finished after {} log lines", transcript.lines().len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
