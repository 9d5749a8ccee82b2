//! Scripted transports for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use screenlogic_protocol::{Message, MsgCode, CONNECT_PREAMBLE, HEADER_SIZE};

use crate::error::{Error, Result};
use crate::transport::{Connector, Transport};

/// What a scripted transport has seen.
#[derive(Debug, Default)]
pub struct Log {
    pub sent: Vec<Vec<u8>>,
    pub reads: usize,
    pub closed: bool,
}

impl Log {
    /// (id, code) of every framed message sent, preamble excluded.
    pub fn requests(&self) -> Vec<(u16, u16)> {
        self.sent
            .iter()
            .filter(|b| b.as_slice() != CONNECT_PREAMBLE && b.len() >= HEADER_SIZE)
            .map(|b| {
                (
                    u16::from_le_bytes([b[0], b[1]]),
                    u16::from_le_bytes([b[2], b[3]]),
                )
            })
            .collect()
    }
}

pub enum Step {
    /// Fail the next send.
    FailSend,
    /// Return this message from the next read in place of the echo.
    Reply(Message),
    /// Fail the next read.
    FailRead,
    /// Block the next read until cancelled.
    Hang,
}

/// Transport driven by a queue of steps. Once the queue runs dry every
/// framed request is answered with `code + 1` and the same id.
pub struct ScriptedTransport {
    steps: VecDeque<Step>,
    pending: VecDeque<Message>,
    log: Arc<Mutex<Log>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> (Self, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        let t = Self {
            steps: steps.into(),
            pending: VecDeque::new(),
            log: Arc::clone(&log),
        };
        (t, log)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, buf: &[u8]) -> Result<()> {
        if matches!(self.steps.front(), Some(Step::FailSend)) {
            self.steps.pop_front();
            return Err(Error::Send(std::io::ErrorKind::BrokenPipe.into()));
        }
        self.log.lock().unwrap().sent.push(buf.to_vec());
        if buf != CONNECT_PREAMBLE && buf.len() >= HEADER_SIZE {
            let id = u16::from_le_bytes([buf[0], buf[1]]);
            let code = u16::from_le_bytes([buf[2], buf[3]]);
            self.pending.push_back(Message::new(id, code + 1, &[]));
        }
        Ok(())
    }

    async fn read_next_message(&mut self) -> Result<Message> {
        self.log.lock().unwrap().reads += 1;
        let step = match self.steps.front() {
            Some(Step::FailSend) | None => None,
            Some(_) => self.steps.pop_front(),
        };
        match step {
            Some(Step::Reply(m)) => {
                self.pending.pop_front();
                Ok(m)
            }
            Some(Step::FailRead) => Err(Error::Read(std::io::ErrorKind::ConnectionReset.into())),
            Some(Step::Hang) => std::future::pending().await,
            Some(Step::FailSend) | None => self.pending.pop_front().ok_or(Error::ConnectionClosed),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Hands out scripted transports; each dial pops the next script.
pub struct ScriptedConnector {
    scripts: Mutex<VecDeque<Vec<Step>>>,
    pub dials: Mutex<Vec<Arc<Mutex<Log>>>>,
    pub reject_login: bool,
    /// Simulated dial latency.
    pub connect_delay: Option<std::time::Duration>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            dials: Mutex::new(Vec::new()),
            reject_login: false,
            connect_delay: None,
        }
    }

    pub fn with_scripts(scripts: Vec<Vec<Step>>) -> Self {
        let c = Self::new();
        *c.scripts.lock().unwrap() = scripts.into();
        c
    }

    pub fn dial_count(&self) -> usize {
        self.dials.lock().unwrap().len()
    }

    pub fn log(&self, dial: usize) -> Arc<Mutex<Log>> {
        Arc::clone(&self.dials.lock().unwrap()[dial])
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>> {
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        let mut steps = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        if self.reject_login {
            steps.insert(0, Step::Reply(Message::new(0, MsgCode::BadLogin.as_u16(), &[])));
        }
        let (t, log) = ScriptedTransport::new(steps);
        self.dials.lock().unwrap().push(log);
        Ok(Box::new(t))
    }

    fn peer(&self) -> String {
        "scripted".into()
    }
}
