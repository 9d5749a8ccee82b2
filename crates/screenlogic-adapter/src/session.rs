//! Session -- one logged-in connection and its request correlator.
//!
//! A session owns the transport and the request-id counter. Requests are
//! strictly sequential: one request is written, then responses are read
//! until one matches or the attempt bound is reached.

use std::future::Future;

use screenlogic_protocol::{is_response, Message, MsgCode, ProtocolError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::AdapterOptions;
use crate::error::{Error, Result};
use crate::transport::Transport;

pub struct Session {
    transport: Box<dyn Transport>,
    last_id: u16,
    max_retries: usize,
    match_response_ids: bool,
    /// Set while an exchange is on the wire. Still set on the next acquire
    /// means the exchange was dropped half-way and the stream is suspect.
    in_exchange: bool,
    broken: bool,
    last_used: Instant,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(
        transport: Box<dyn Transport>,
        opts: &AdapterOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            last_id: 0,
            max_retries: opts.max_retries.max(1),
            match_response_ids: opts.match_response_ids,
            in_exchange: false,
            broken: false,
            last_used: Instant::now(),
            cancel,
        }
    }

    /// Next request id. Starts at 1 and wraps at 65535.
    pub fn next_id(&mut self) -> u16 {
        self.last_id = self.last_id.wrapping_add(1);
        self.last_id
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Whether the stream can carry another request.
    pub fn is_usable(&self) -> bool {
        !self.in_exchange && !self.broken
    }

    pub fn last_used(&self) -> Instant {
        self.last_used
    }

    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    /// Run `fut` unless shutdown cancels it first.
    async fn guarded<T>(
        cancel: &CancellationToken,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            res = fut => res,
        }
    }

    /// Write `buf`, retrying write-level failures up to `max` attempts.
    /// Timeouts and cancellation are not retried.
    pub async fn send_with_retry(&mut self, buf: &[u8], max: usize) -> Result<()> {
        let max = max.max(1);
        let mut attempt = 1;
        loop {
            let res = Self::guarded(&self.cancel, self.transport.send(buf)).await;
            match res {
                Ok(()) => return Ok(()),
                Err(e @ (Error::Cancelled | Error::Timeout { .. })) => {
                    self.broken = true;
                    return Err(e);
                }
                Err(e) if attempt >= max => {
                    tracing::warn!(attempt, error = %e, "send failed, giving up");
                    self.broken = true;
                    return Err(e);
                }
                Err(e) => {
                    tracing::info!(attempt, max, error = %e, "send failed, retrying");
                    attempt += 1;
                }
            }
        }
    }

    /// Read one framed message.
    pub async fn read_message(&mut self) -> Result<Message> {
        let res = Self::guarded(&self.cancel, self.transport.read_next_message()).await;
        if let Err(e) = &res {
            if e.is_transport() {
                self.broken = true;
            }
        }
        res
    }

    /// Send `m` and return the response to (`id`, `code`).
    ///
    /// Non-matching responses are discarded and counted against the attempt
    /// bound; a controller error code ends the exchange immediately.
    pub async fn send_and_validate(
        &mut self,
        m: &Message,
        id: u16,
        code: MsgCode,
    ) -> Result<Message> {
        self.in_exchange = true;
        let res = self.exchange(m, id, code).await;
        self.in_exchange = false;
        self.touch();
        res
    }

    async fn exchange(&mut self, m: &Message, id: u16, code: MsgCode) -> Result<Message> {
        tracing::debug!(id, code = %code, size = m.size(), "sending request");
        self.send_with_retry(m.as_bytes(), self.max_retries).await?;

        for attempt in 1..=self.max_retries {
            let rm = self.read_message().await?;
            match self.accepts(&rm, id, code) {
                Ok(true) => return Ok(rm),
                Ok(false) => {}
                Err(e) => {
                    if e.protocol().is_some_and(ProtocolError::is_controller_error) {
                        tracing::debug!(id, %code, error = %e, "controller rejected request");
                    }
                    return Err(e);
                }
            }
            tracing::info!(
                expected_id = id,
                expected_code = code.response_code(),
                got_id = rm.id(),
                got_code = rm.code(),
                attempt,
                "discarding unexpected response"
            );
        }
        Err(ProtocolError::NoValidResponse.into())
    }

    /// Whether `rm` answers (`id`, `code`). Controller errors surface as `Err`.
    pub fn accepts(&self, rm: &Message, id: u16, code: MsgCode) -> Result<bool> {
        let id = if self.match_response_ids { id } else { rm.id() };
        Ok(is_response(rm, id, code)?)
    }

    pub async fn close(&mut self) -> Result<()> {
        self.broken = true;
        self.transport.close().await
    }
}
