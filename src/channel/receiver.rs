use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, info};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use super::marker::{self, Marker, Receipt};
use super::RunLog;
use crate::clock;
use crate::config::{ChannelConfig, Framing};
use crate::error::{BenchError, Result};

/// Observer side of the channel: a listener that will accept exactly one
/// sender.
pub struct Receiver {
    listener: TcpListener,
    config: ChannelConfig,
}

impl Receiver {
    /// Bind and listen with a backlog of 1. Must run inside a tokio runtime.
    pub fn bind(config: &ChannelConfig) -> Result<Self> {
        let addr = config.socket_addr()?;
        let bind_err = |e: std::io::Error| BenchError::Connection(format!("bind {}: {}", addr, e));

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_err)?;
        socket.set_reuseaddr(true).map_err(bind_err)?;
        socket.bind(addr).map_err(bind_err)?;
        let listener = socket.listen(1).map_err(bind_err)?;

        info!("receiver listening on {}", addr);
        Ok(Self {
            listener,
            config: config.clone(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| BenchError::Connection(e.to_string()))
    }

    /// Accept the single sender. The listener is dropped afterwards, so any
    /// further connection attempt is refused by the OS.
    pub async fn accept(self) -> Result<Session> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|e| BenchError::Connection(format!("accept: {}", e)))?;
        info!("receiver accepted {}", peer);
        Ok(Session::new(stream, peer, self.config))
    }

    /// Bind, listen and accept in one step
    pub async fn serve(config: &ChannelConfig) -> Result<Session> {
        Self::bind(config)?.accept().await
    }
}

/// One accepted connection
pub struct Session {
    stream: TcpStream,
    peer: SocketAddr,
    config: ChannelConfig,
    buffer: Vec<u8>,
    // Bytes after the last newline, only used with `Framing::Newline`
    pending: Vec<u8>,
}

impl Session {
    fn new(stream: TcpStream, peer: SocketAddr, config: ChannelConfig) -> Self {
        let buffer = vec![0u8; config.buffer_size.max(1)];
        Self {
            stream,
            peer,
            config,
            buffer,
            pending: Vec::new(),
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// One read of at most `buffer_size` bytes, decoded as UTF-8.
    /// `None` once the sender has closed.
    pub async fn receive(&mut self) -> Result<Option<String>> {
        let n = self.read_chunk().await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&self.buffer[..n]).into_owned()))
    }

    async fn read_chunk(&mut self) -> Result<usize> {
        let read = self.stream.read(&mut self.buffer);
        let result = match self.config.read_timeout() {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| BenchError::Timeout(limit))?,
            None => read.await,
        };
        result.map_err(|e| BenchError::Connection(format!("read from {}: {}", self.peer, e)))
    }

    /// Next batch of marker texts under the configured framing; `None` at
    /// end of stream.
    async fn next_texts(&mut self) -> Result<Option<Vec<String>>> {
        match self.config.framing {
            Framing::PerRead => Ok(self.receive().await?.map(|text| vec![text])),
            Framing::Newline => loop {
                let n = self.read_chunk().await?;
                if n == 0 {
                    if self.pending.is_empty() {
                        return Ok(None);
                    }
                    let tail = std::mem::take(&mut self.pending);
                    return Ok(Some(vec![String::from_utf8_lossy(&tail).into_owned()]));
                }
                self.pending.extend_from_slice(&self.buffer[..n]);
                let lines = split_lines(&mut self.pending);
                if !lines.is_empty() {
                    return Ok(Some(lines));
                }
            },
        }
    }

    /// Receive until an end-class marker (when `stop_on_end`), `done_transmit`
    /// or end of stream. Start/end markers are appended to `run_log`.
    pub async fn run(&mut self, mut run_log: Option<&mut RunLog>) -> Result<Vec<Receipt>> {
        let mut receipts = Vec::new();

        while let Some(texts) = self.next_texts().await? {
            let received_at = clock::now();
            for text in texts {
                if text.trim().is_empty() {
                    continue;
                }
                debug!("read {} bytes from {}: {:?}", text.len(), self.peer, text);

                let receipt = Receipt::new(received_at, Marker::parse(&text));
                info!("{}", receipt.to_log_line());

                if marker::mentions_lifecycle(&text) {
                    if let Some(log) = run_log.as_deref_mut() {
                        log.append(&receipt).await?;
                    }
                }

                let done = receipt.marker == Marker::Done || marker::mentions_done(&text);
                let ended =
                    self.config.stop_on_end && (receipt.marker.is_end() || marker::mentions_end(&text));
                receipts.push(receipt);

                if done || ended {
                    info!("receiver finished after {} markers", receipts.len());
                    return Ok(receipts);
                }
            }
        }

        info!("sender {} closed after {} markers", self.peer, receipts.len());
        Ok(receipts)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.config.read_timeout()
    }
}

/// Drain complete `\n`-terminated lines from `pending`
fn split_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let Some(last_newline) = pending.iter().rposition(|b| *b == b'\n') else {
        return Vec::new();
    };
    let rest = pending.split_off(last_newline + 1);
    let complete = std::mem::replace(pending, rest);
    complete
        .split(|b| *b == b'\n')
        .filter(|line| !line.is_empty())
        .map(|line| String::from_utf8_lossy(line).trim_end_matches('\r').to_string())
        .collect()
}
