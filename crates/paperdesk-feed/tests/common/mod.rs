//! Mock feed server for integration tests.
//!
//! A minimal WebSocket endpoint that can:
//! - Accept connections and count them
//! - Push text frames to every connected client
//! - Drop all clients on demand (to exercise reconnection)

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// A mock feed server for testing.
pub struct MockFeedServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    frame_tx: broadcast::Sender<String>,
    drop_tx: broadcast::Sender<()>,
    connections: Arc<Mutex<u32>>,
}

impl MockFeedServer {
    /// Start a new mock feed server on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (frame_tx, _) = broadcast::channel::<String>(64);
        let (drop_tx, _) = broadcast::channel::<()>(4);
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));

        let frames = frame_tx.clone();
        let drops = drop_tx.clone();
        let connections_clone = connections.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        // Subscribe at accept time so frames pushed during
                        // the handshake are buffered, not lost.
                        let frames = frames.subscribe();
                        let drops = drops.subscribe();
                        let connections = connections_clone.clone();
                        tokio::spawn(handle_connection(stream, frames, drops, connections));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            frame_tx,
            drop_tx,
            connections,
        }
    }

    /// Get the server's WebSocket origin.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Get the number of connections accepted since start.
    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// Push a text frame to every connected client.
    pub fn push(&self, frame: &str) {
        let _ = self.frame_tx.send(frame.to_string());
    }

    /// Close every active client connection.
    pub fn drop_clients(&self) {
        let _ = self.drop_tx.send(());
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    mut frames: broadcast::Receiver<String>,
    mut drops: broadcast::Receiver<()>,
    connections: Arc<Mutex<u32>>,
) {
    // Increment connection count
    {
        let mut count = connections.lock().await;
        *count += 1;
    }

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            frame = frames.recv() => {
                match frame {
                    Ok(text) => {
                        if write.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
            _ = drops.recv() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}
