use std::net::SocketAddr;

use log::{debug, info};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use super::Marker;
use crate::config::{ChannelConfig, Framing};
use crate::error::{BenchError, Result};

/// Fire-and-forget marker sender on the device under test.
///
/// Owns exactly one connection. The socket is released by `close()` or, on
/// any other exit path, when the sender is dropped.
pub struct Sender {
    stream: Option<TcpStream>,
    peer: SocketAddr,
    framing: Framing,
}

impl Sender {
    pub async fn connect(addr: SocketAddr, framing: Framing) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| BenchError::Connection(format!("connect to {}: {}", addr, e)))?;
        stream
            .set_nodelay(true)
            .map_err(|e| BenchError::Connection(format!("set nodelay on {}: {}", addr, e)))?;

        info!("telemetry connected to {}", addr);
        Ok(Self {
            stream: Some(stream),
            peer: addr,
            framing,
        })
    }

    pub async fn connect_with(config: &ChannelConfig) -> Result<Self> {
        Self::connect(config.socket_addr()?, config.framing).await
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub async fn send(&mut self, marker: &Marker) -> Result<()> {
        self.send_text(marker.token()).await
    }

    /// Write the whole text. A failed write marks the connection broken.
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| BenchError::Connection("sender is closed".to_string()))?;

        let mut payload = text.as_bytes().to_vec();
        if self.framing == Framing::Newline {
            payload.push(b'\n');
        }

        if let Err(e) = stream.write_all(&payload).await {
            self.stream = None;
            return Err(BenchError::Connection(format!(
                "send to {} failed: {}",
                self.peer, e
            )));
        }
        debug!("sent {:?} to {}", text, self.peer);
        Ok(())
    }

    /// Idempotent
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream
                .shutdown()
                .await
                .map_err(|e| BenchError::Connection(format!("close {}: {}", self.peer, e)))?;
            info!("telemetry connection to {} closed", self.peer);
        }
        Ok(())
    }
}
