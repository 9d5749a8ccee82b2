//! Connection manager -- lazy connect, idle disconnect, graceful close.
//!
//! Holds at most one logged-in session. The first acquire dials and logs
//! in; later acquires reuse the session. A watcher task per connection
//! closes it once it has been idle for the keep-alive period, and the next
//! acquire reconnects. Concurrent callers queue on one mutex, so exactly
//! one of them performs a given connect and the others share its outcome.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMappedMutexGuard, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use crate::config::AdapterOptions;
use crate::error::{Error, Result};
use crate::operations;
use crate::session::Session;
use crate::transport::Connector;

struct Slot {
    session: Option<Session>,
    /// Bumped on every successful connect; idle watchers exit when it moves on.
    generation: u64,
    /// Attempt number and error of the most recent failed connect.
    last_failure: Option<(u64, Arc<Error>)>,
}

/// Exclusive access to the live session for one operation.
pub struct SessionGuard {
    inner: OwnedMappedMutexGuard<Slot, Session>,
}

impl Deref for SessionGuard {
    type Target = Session;
    fn deref(&self) -> &Session {
        &self.inner
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.inner
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.inner.touch();
    }
}

#[derive(Clone)]
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    options: AdapterOptions,
    slot: Arc<Mutex<Slot>>,
    /// Number of finished connect attempts.
    attempts: Arc<AtomicU64>,
    closing: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, options: AdapterOptions) -> Self {
        Self {
            connector,
            options,
            slot: Arc::new(Mutex::new(Slot {
                session: None,
                generation: 0,
                last_failure: None,
            })),
            attempts: Arc::new(AtomicU64::new(0)),
            closing: Arc::new(AtomicBool::new(false)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Lock the session, connecting first if there is none.
    ///
    /// A caller that queued behind a failed connect gets that failure
    /// instead of dialing again.
    pub async fn acquire(&self) -> Result<SessionGuard> {
        if self.closing.load(Ordering::SeqCst) {
            return Err(Error::Shutdown);
        }
        let observed = self.attempts.load(Ordering::SeqCst);
        let mut slot = Arc::clone(&self.slot).lock_owned().await;
        if self.closing.load(Ordering::SeqCst) {
            return Err(Error::Shutdown);
        }

        if slot.session.as_ref().is_some_and(|s| !s.is_usable()) {
            if let Some(mut stale) = slot.session.take() {
                tracing::info!(peer = %self.connector.peer(), "discarding interrupted session");
                if let Err(e) = stale.close().await {
                    tracing::debug!(error = %e, "close of stale session failed");
                }
            }
        }

        if slot.session.is_none() {
            if let Some((attempt, err)) = &slot.last_failure {
                if *attempt > observed {
                    return Err(Error::Connect(Arc::clone(err)));
                }
            }
            self.connect(&mut slot).await?;
        }

        OwnedMutexGuard::try_map(slot, |s| s.session.as_mut())
            .map(|inner| SessionGuard { inner })
            .map_err(|_| Error::ConnectionClosed)
    }

    async fn connect(&self, slot: &mut OwnedMutexGuard<Slot>) -> Result<()> {
        let attempt = self.attempts.load(Ordering::SeqCst) + 1;
        let peer = self.connector.peer();
        tracing::info!(%peer, attempt, "connecting to controller");

        let res = self.establish().await;
        // Only the slot holder connects, so a plain store cannot race.
        self.attempts.store(attempt, Ordering::SeqCst);
        match res {
            Ok(session) => {
                slot.session = Some(session);
                slot.generation += 1;
                slot.last_failure = None;
                tracing::info!(%peer, generation = slot.generation, "session established");
                self.spawn_idle_watcher(slot.generation);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%peer, attempt, error = %e, "connect failed");
                let e = Arc::new(e);
                slot.last_failure = Some((attempt, Arc::clone(&e)));
                Err(Error::Connect(e))
            }
        }
    }

    async fn establish(&self) -> Result<Session> {
        let transport = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(Error::Cancelled),
            t = self.connector.connect() => t?,
        };
        let mut session = Session::new(transport, &self.options, self.shutdown.child_token());
        if let Err(e) = operations::login(&mut session).await {
            if let Err(close_err) = session.close().await {
                tracing::debug!(error = %close_err, "close after failed login failed");
            }
            return Err(e);
        }
        Ok(session)
    }

    fn spawn_idle_watcher(&self, generation: u64) {
        let slot = Arc::clone(&self.slot);
        let idle = self.options.keep_alive;
        let shutdown = self.shutdown.clone();
        let peer = self.connector.peer();

        tokio::spawn(async move {
            loop {
                let deadline = {
                    let s = slot.lock().await;
                    match &s.session {
                        Some(session) if s.generation == generation => {
                            idle_deadline(session.last_used(), idle)
                        }
                        _ => return,
                    }
                };
                let Some(deadline) = deadline else {
                    // Keep-alive beyond the clock's range: the session never idles out.
                    tracing::debug!(%peer, generation, "keep-alive out of range, watcher parked");
                    shutdown.cancelled().await;
                    return;
                };
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {}
                    _ = shutdown.cancelled() => return,
                }

                let mut s = slot.lock().await;
                if s.generation != generation {
                    return;
                }
                let expired = match &s.session {
                    Some(session) => idle_deadline(session.last_used(), idle)
                        .is_some_and(|d| d <= tokio::time::Instant::now()),
                    None => return,
                };
                if expired {
                    if let Some(mut session) = s.session.take() {
                        tracing::info!(
                            %peer,
                            generation,
                            idle_secs = idle.as_secs(),
                            "idle timeout, disconnecting"
                        );
                        if let Err(e) = session.close().await {
                            tracing::debug!(error = %e, "close after idle timeout failed");
                        }
                    }
                    return;
                }
            }
        });
    }

    /// Whether a session is currently open.
    pub async fn is_connected(&self) -> bool {
        self.slot.lock().await.session.is_some()
    }

    /// Shut down: refuse new work, wait up to `grace` for the operation in
    /// flight, then cancel it and close the connection. Idempotent.
    pub async fn close(&self, grace: Duration) -> Result<()> {
        self.closing.store(true, Ordering::SeqCst);

        let waited = tokio::time::timeout(grace, Arc::clone(&self.slot).lock_owned()).await;
        let mut slot = match waited {
            Ok(slot) => slot,
            Err(_) => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "operation still running after grace period, cancelling"
                );
                self.shutdown.cancel();
                Arc::clone(&self.slot).lock_owned().await
            }
        };
        self.shutdown.cancel();

        match slot.session.take() {
            Some(mut session) => {
                tracing::info!(peer = %self.connector.peer(), "closing session");
                session.close().await
            }
            None => Ok(()),
        }
    }
}

/// When a session last used at `last_used` expires, or `None` if `idle`
/// reaches past the end of the clock.
fn idle_deadline(last_used: tokio::time::Instant, idle: Duration) -> Option<tokio::time::Instant> {
    last_used.checked_add(idle)
}
