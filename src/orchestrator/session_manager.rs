//! Child session lifecycle: lazy start, idempotent stop, drain on shutdown.
//!
//! Each live child owns one [`Session`] whose client sits behind a
//! single-permit guard; every request to that child holds the guard for its
//! whole duration. Start and stop for the same name are serialized by a
//! per-name lifecycle lock, so a child is never launched twice and never
//! torn down while it is being started. A start runs on its own task, so it
//! settles to `running` or `failed_start` even if the caller goes away.
//!
//! Stop removes the session from the table before waiting on its guard:
//! no new call can pick it up, while a call already in flight finishes
//! before the transport is closed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard, RwLock};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, info_span, Instrument};

use crate::client::{ClientFactory, ProtocolClient};
use crate::config::{ChildDescriptor, ChildRegistry, Timeouts};
use crate::models::status::ChildStatus;
use crate::orchestrator::status_tracker::StatusTracker;
use crate::{AppError, Result};

/// A live, handshaken connection to one child.
pub struct Session {
    child: String,
    client: Mutex<Option<Box<dyn ProtocolClient>>>,
}

impl Session {
    fn new(child: &str, client: Box<dyn ProtocolClient>) -> Self {
        Self {
            child: child.to_owned(),
            client: Mutex::new(Some(client)),
        }
    }

    /// Child this session belongs to.
    #[must_use]
    pub fn child(&self) -> &str {
        &self.child
    }

    /// Wait for exclusive access to the child's transport.
    pub async fn acquire(&self) -> SessionGuard<'_> {
        SessionGuard {
            child: &self.child,
            inner: self.client.lock().await,
        }
    }

    /// Take the client out once every earlier holder has released the guard.
    async fn retire(&self) -> Option<Box<dyn ProtocolClient>> {
        self.client.lock().await.take()
    }
}

/// Exclusive access to one session's client, released on drop.
pub struct SessionGuard<'a> {
    child: &'a str,
    inner: MutexGuard<'a, Option<Box<dyn ProtocolClient>>>,
}

impl SessionGuard<'_> {
    /// The protocol client, unless the session was closed while waiting.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if a stop retired the client first.
    pub fn client(&self) -> Result<&dyn ProtocolClient> {
        self.inner.as_deref().ok_or_else(|| {
            AppError::Transport(format!("session to '{}' was closed", self.child))
        })
    }
}

/// Owns the session table, the status table, and the per-name lifecycle locks.
pub struct SessionManager {
    registry: ChildRegistry,
    factory: Arc<dyn ClientFactory>,
    timeouts: Timeouts,
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
    lifecycle: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    status: Arc<StatusTracker>,
}

impl SessionManager {
    /// Create a manager with no live sessions.
    #[must_use]
    pub fn new(registry: ChildRegistry, factory: Arc<dyn ClientFactory>, timeouts: Timeouts) -> Self {
        Self {
            registry,
            factory,
            timeouts,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            lifecycle: Mutex::new(HashMap::new()),
            status: Arc::new(StatusTracker::new()),
        }
    }

    /// Registered children.
    #[must_use]
    pub fn registry(&self) -> &ChildRegistry {
        &self.registry
    }

    /// Configured handshake and call bounds.
    #[must_use]
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Live session for `name`, if one exists.
    pub async fn session(&self, name: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(name).cloned()
    }

    /// Whether a live session exists for `name`.
    pub async fn is_running(&self, name: &str) -> bool {
        self.sessions.read().await.contains_key(name)
    }

    /// Number of live sessions.
    pub async fn live_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Status snapshot for one child.
    pub async fn status(&self, name: &str) -> ChildStatus {
        self.status.get(name).await
    }

    /// Status snapshots for every registered child, in registry order.
    pub async fn statuses(&self) -> Vec<(String, ChildStatus)> {
        self.status.snapshot(self.registry.names()).await
    }

    /// Children that have been started or stopped at least once.
    pub async fn tracked(&self) -> Vec<String> {
        self.lifecycle.lock().await.keys().cloned().collect()
    }

    /// Start `name` unless it is already running.
    ///
    /// Returns `true` when a session is available afterwards. Unknown names
    /// return `false` without touching the status table; launch and
    /// handshake failures are recorded as `failed_start`.
    ///
    /// The launch runs on its own task and keeps the lifecycle lock until the
    /// status has settled, so dropping this future never leaves the child
    /// stuck in `starting`.
    pub async fn ensure_started(&self, name: &str) -> bool {
        if self.is_running(name).await {
            return true;
        }

        let Some(descriptor) = self.registry.get(name) else {
            debug!(child = name, "start requested for unregistered child");
            return false;
        };

        let held = self.lifecycle_lock(name).await.lock_owned().await;

        // Another caller may have finished starting it while we waited.
        if self.is_running(name).await {
            return true;
        }

        let attempt = StartAttempt {
            descriptor: descriptor.clone(),
            factory: Arc::clone(&self.factory),
            handshake: self.timeouts.handshake,
            sessions: Arc::clone(&self.sessions),
            status: Arc::clone(&self.status),
        };
        let span = info_span!("start_child", child = name);

        match tokio::spawn(attempt.run(held).instrument(span)).await {
            Ok(started) => started,
            Err(err) => {
                error!(child = name, %err, "start task did not complete");
                false
            }
        }
    }

    /// Stop `name` if it is running; leaves a registered child `stopped`.
    ///
    /// Waits for any in-flight call on the session to finish before closing
    /// the transport. Teardown failures are logged and swallowed. Unknown
    /// names are ignored.
    pub async fn ensure_stopped(&self, name: &str) {
        if self.registry.get(name).is_none() {
            debug!(child = name, "stop requested for unregistered child");
            return;
        }

        let lock = self.lifecycle_lock(name).await;
        let _held = lock.lock().await;

        if !self.close_session(name).await {
            self.status.mark_stopped(name).await;
        }
    }

    /// Start every registered child concurrently; returns how many are running.
    pub async fn start_all(&self) -> usize {
        let results = join_all(self.registry.names().map(|name| self.ensure_started(name))).await;
        results.into_iter().filter(|started| *started).count()
    }

    /// Stop every live session concurrently.
    ///
    /// Starts still in progress finish first and are then stopped. Children
    /// that never ran keep their status.
    pub async fn shutdown_all(&self) {
        let names = self.tracked().await;
        let closed = join_all(names.iter().map(|name| self.drain(name))).await;
        let stopped = closed.into_iter().filter(|closed| *closed).count();
        info!(stopped, "all child sessions drained");
    }

    async fn drain(&self, name: &str) -> bool {
        let lock = self.lifecycle_lock(name).await;
        let _held = lock.lock().await;
        self.close_session(name).await
    }

    /// Remove and close the session for `name`. Caller holds its lifecycle
    /// lock. Returns `false` when there was no session.
    async fn close_session(&self, name: &str) -> bool {
        let removed = self.sessions.write().await.remove(name);
        let Some(session) = removed else {
            return false;
        };

        if let Some(client) = session.retire().await {
            match client.close().await {
                Ok(()) => debug!(child = name, "closed child server"),
                Err(err) => error!(child = name, %err, "error while closing child server"),
            }
        }

        self.status.mark_stopped(name).await;
        info!(child = name, "child server stopped");
        true
    }

    async fn lifecycle_lock(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.lifecycle.lock().await;
        Arc::clone(locks.entry(name.to_owned()).or_default())
    }
}

/// Everything one start needs, owned so it can outlive the caller.
struct StartAttempt {
    descriptor: ChildDescriptor,
    factory: Arc<dyn ClientFactory>,
    handshake: Duration,
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
    status: Arc<StatusTracker>,
}

impl StartAttempt {
    async fn run(self, _held: OwnedMutexGuard<()>) -> bool {
        let name = self.descriptor.name.as_str();
        self.status.mark_starting(name).await;

        match self.launch().await {
            Ok(client) => {
                let mut sessions = self.sessions.write().await;
                sessions.insert(name.to_owned(), Arc::new(Session::new(name, client)));
                self.status.mark_running(name).await;
                info!(child = name, "child server started and session initialized");
                true
            }
            Err(err) => {
                error!(child = name, %err, "failed to start child server");
                self.status.mark_failed(name, err.to_string()).await;
                false
            }
        }
    }

    /// Launch and handshake under one deadline, releasing partial resources
    /// on failure.
    async fn launch(&self) -> Result<Box<dyn ProtocolClient>> {
        let descriptor = &self.descriptor;
        let bound = self.handshake;
        let deadline = Instant::now() + bound;
        let timed_out = || {
            AppError::HandshakeTimeout(format!(
                "child '{}' did not complete the handshake within {bound:?}",
                descriptor.name
            ))
        };

        let mut client = timeout_at(deadline, self.factory.launch(descriptor))
            .await
            .map_err(|_| timed_out())??;

        let outcome = match timeout_at(deadline, client.initialize()).await {
            Ok(result) => result,
            Err(_) => Err(timed_out()),
        };

        match outcome {
            Ok(()) => Ok(client),
            Err(err) => {
                if let Err(close_err) = client.close().await {
                    debug!(
                        child = %descriptor.name,
                        %close_err,
                        "cleanup failed after startup error"
                    );
                }
                Err(err)
            }
        }
    }
}
