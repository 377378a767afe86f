// src/broadcast/server.rs
//! TCP subscriber server
//!
//! Each accepted connection becomes one fan-out subscriber. Frames are
//! written newline-delimited; inbound lines are drained and ignored so
//! a peer's writes never stall the socket. The read side polls with an
//! idle timeout, which is the expected quiet-connection outcome rather
//! than an error.

use crate::broadcast::fanout::FanoutManager;
use crate::utils::errors::{FleetError, Result};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, error, info};

/// Subscriber server over a fan-out manager
pub struct BroadcastServer {
    fanout: Arc<FanoutManager>,
    idle_read_timeout: Duration,
}

impl BroadcastServer {
    pub fn new(fanout: Arc<FanoutManager>, idle_read_timeout: Duration) -> Self {
        Self {
            fanout,
            idle_read_timeout,
        }
    }

    /// Bind and serve forever.
    pub async fn serve(self: Arc<Self>, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| FleetError::Config(format!("failed to bind broadcast listener: {e}")))?;
        info!(%addr, "broadcast server listening");
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve_on(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        debug!(%peer, "subscriber connected");
                        server.handle_connection(stream, peer).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "failed to accept subscriber connection");
                }
            }
        }
    }

    async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let mut subscription = self.fanout.subscribe();
        let (read_half, write_half) = stream.into_split();
        let mut writer = FramedWrite::new(write_half, LinesCodec::new());
        let mut reader = FramedRead::new(read_half, LinesCodec::new());

        loop {
            tokio::select! {
                frame = subscription.receiver.recv() => {
                    let Some(frame) = frame else { break };
                    if let Err(e) = writer.send(frame.as_ref()).await {
                        debug!(%peer, error = %e, "subscriber write failed");
                        break;
                    }
                }
                inbound = tokio::time::timeout(self.idle_read_timeout, reader.next()) => {
                    match inbound {
                        // Idle timeout is the normal poll boundary
                        Err(_) => continue,
                        Ok(None) => {
                            debug!(%peer, "subscriber disconnected");
                            break;
                        }
                        Ok(Some(Ok(line))) => {
                            debug!(%peer, bytes = line.len(), "ignoring inbound line");
                        }
                        Ok(Some(Err(e))) => {
                            debug!(%peer, error = %e, "subscriber read failed");
                            break;
                        }
                    }
                }
            }
        }

        self.fanout.unsubscribe(subscription.id);
    }
}
