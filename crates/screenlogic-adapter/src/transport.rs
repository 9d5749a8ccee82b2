//! Byte transport to the controller.
//!
//! A `Transport` is one open connection; a `Connector` dials new ones.
//! Both are traits so sessions can run over a scripted transport in tests.

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::Decoder;

use screenlogic_protocol::{Message, MessageCodec, ProtocolError};

use crate::error::{Error, Result};

#[async_trait]
pub trait Transport: Send {
    /// Write all of `buf`.
    async fn send(&mut self, buf: &[u8]) -> Result<()>;

    /// Read the next complete framed message.
    async fn read_next_message(&mut self) -> Result<Message>;

    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Transport>>;

    /// Human-readable peer, used in logs.
    fn peer(&self) -> String;
}

/// TCP connection with a deadline on every operation.
pub struct TcpTransport {
    stream: TcpStream,
    codec: MessageCodec,
    buf: BytesMut,
    timeout: Duration,
}

impl TcpTransport {
    pub async fn dial(addr: &str, timeout: Duration) -> Result<Self> {
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(Error::Dial {
                    addr: addr.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(Error::Timeout {
                    op: "dial",
                    after: timeout,
                })
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(addr, error = %e, "set_nodelay failed");
        }
        tracing::debug!(addr, "tcp connected");
        Ok(Self {
            stream,
            codec: MessageCodec,
            buf: BytesMut::with_capacity(4096),
            timeout,
        })
    }

    async fn read_frame(&mut self) -> Result<Message> {
        loop {
            if let Some(m) = self.codec.decode(&mut self.buf).map_err(io_or_protocol)? {
                return Ok(m);
            }
            let n = self.stream.read_buf(&mut self.buf).await.map_err(Error::Read)?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
    }
}

fn io_or_protocol(e: ProtocolError) -> Error {
    match e {
        ProtocolError::Io(e) => Error::Read(e),
        other => Error::Protocol(other),
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, buf: &[u8]) -> Result<()> {
        match tokio::time::timeout(self.timeout, self.stream.write_all(buf)).await {
            Ok(res) => res.map_err(Error::Send),
            Err(_) => Err(Error::Timeout {
                op: "send",
                after: self.timeout,
            }),
        }
    }

    async fn read_next_message(&mut self) -> Result<Message> {
        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.read_frame()).await {
            Ok(res) => {
                if let Ok(m) = &res {
                    tracing::debug!(
                        id = m.id(),
                        code = m.code(),
                        size = m.size(),
                        "frame received"
                    );
                }
                res
            }
            Err(_) => Err(Error::Timeout {
                op: "read",
                after: timeout,
            }),
        }
    }

    async fn close(&mut self) -> Result<()> {
        match tokio::time::timeout(self.timeout, self.stream.shutdown()).await {
            Ok(res) => res.map_err(Error::Send),
            Err(_) => Err(Error::Timeout {
                op: "close",
                after: self.timeout,
            }),
        }
    }
}

/// Dials the controller over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
    timeout: Duration,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>> {
        let transport = TcpTransport::dial(&self.addr, self.timeout).await?;
        Ok(Box::new(transport))
    }

    fn peer(&self) -> String {
        self.addr.clone()
    }
}
