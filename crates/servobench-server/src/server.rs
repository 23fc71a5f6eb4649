//! WebSocket transport for the servo command channel.
//!
//! Accepts connections, pushes the current configuration report to each
//! new client, and feeds every text frame through the dispatcher. Replies
//! go to the requesting client only. The bank sits behind one RwLock,
//! which serializes all command application.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info};

use servobench_core::{PwmOutput, ServoBank, SettingsStore};
use servobench_protocol::{encode_response, Response};

use crate::dispatch::{config_report, handle_text};

/// Configuration for the command server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server name used in logs.
    pub name: String,
    /// Address to bind to.
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "servobench".to_string(),
            bind_addr: "0.0.0.0:3000".parse().unwrap(),
        }
    }
}

/// Shared handle to the servo bank.
pub type SharedBank<P, S> = Arc<RwLock<ServoBank<P, S>>>;

/// The WebSocket command server.
pub struct ServoServer<P, S> {
    config: ServerConfig,
    bank: SharedBank<P, S>,
}

impl<P, S> ServoServer<P, S>
where
    P: PwmOutput + 'static,
    S: SettingsStore + 'static,
{
    /// Create a server owning a fresh shared handle to the bank.
    pub fn new(config: ServerConfig, bank: ServoBank<P, S>) -> Self {
        Self {
            config,
            bank: Arc::new(RwLock::new(bank)),
        }
    }

    /// Create a server over an existing shared bank (the host also hands
    /// the handle to its HTTP API and command-line front end).
    pub fn with_shared(config: ServerConfig, bank: SharedBank<P, S>) -> Self {
        Self { config, bank }
    }

    /// Get a shared handle to the bank.
    pub fn bank(&self) -> SharedBank<P, S> {
        self.bank.clone()
    }

    /// Run the server, listening for WebSocket connections.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(
            "{} command server listening on {}",
            self.config.name, self.config.bind_addr
        );

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let bank = self.bank.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, bank).await {
                            error!("connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection<P, S>(
    stream: TcpStream,
    addr: SocketAddr,
    bank: SharedBank<P, S>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    P: PwmOutput,
    S: SettingsStore,
{
    info!("new connection from {}", addr);
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // Push the current configuration so the client can render immediately.
    let report = {
        let bank = bank.read().await;
        config_report(&bank)
    };
    ws_tx
        .send(Message::Text(encode_response(&Response::Config(report))?))
        .await?;
    debug!("sent configuration report to {}", addr);

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let reply = {
                    let mut bank = bank.write().await;
                    handle_text(&mut bank, &text)
                };
                if let Some(reply) = reply {
                    ws_tx.send(Message::Text(reply)).await?;
                }
            }
            Ok(Message::Close(_)) => {
                info!("client {} closed connection", addr);
                break;
            }
            Ok(Message::Ping(data)) => {
                ws_tx.send(Message::Pong(data)).await?;
            }
            Ok(_) => {} // Ignore other message types
            Err(e) => {
                error!("websocket error from {}: {}", addr, e);
                break;
            }
        }
    }

    Ok(())
}
