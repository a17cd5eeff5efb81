//! Bounded per-key connection pool.
//!
//! A [`KeyedPool`] owns every connection for one pool key: the idle queue,
//! the active count and the borrower wait queue. Capacity is enforced with a
//! semaphore sized to `max_total`, so `active + idle` can never exceed the
//! cap and blocked borrowers are released in FIFO order as slots free up.
//!
//! # Borrow protocol
//!
//! ```text
//! borrow ──► permit (≤ borrow_wait_timeout) ──► pop idle ──► validate ──► activate ──► drift? ──► ACTIVE
//!                │                                │             │                        │
//!            Exhausted                      empty → create   destroy+retry         reconnect or fail
//! ```
//!
//! Checked-out connections travel inside a [`BorrowedConnection`] guard and
//! come back through [`release`](KeyedPool::release) or
//! [`invalidate`](KeyedPool::invalidate). Only `borrow` can fail; every
//! check-in path is total.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::pool::config::PoolConfig;
use crate::pool::connection::PooledConnection;
use crate::pool::events::{PoolEvent, PoolEventHandler};
use crate::pool::factory::ClientFactory;
use crate::spec::{ConnectionSpec, PoolKey, TransferMode};
use crate::transport::{ProxyContext, TransportClient, TransportConnector};

// ============================================================================
// PoolStats
// ============================================================================

/// Read-only snapshot of one pool's occupancy and limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Connections currently checked out.
    pub num_active: usize,
    /// Connections currently idle.
    pub num_idle: usize,
    /// Borrowers currently waiting for a slot.
    pub num_waiters: usize,
    /// Configured `active + idle` cap.
    pub max_total: usize,
    /// Configured idle cap.
    pub max_idle: usize,
    /// Configured idle floor.
    pub min_idle: usize,
}

// ============================================================================
// Shared State
// ============================================================================

/// State shared between the pool and its checkout guards.
pub(crate) struct PoolShared {
    /// Pool key, for logs and errors raised from guards.
    key: PoolKey,
    /// Capacity permits; FIFO wait queue for blocked borrowers.
    semaphore: Arc<Semaphore>,
    /// Idle connections. Back = most recently returned, front = oldest.
    state: Mutex<PoolState>,
    /// Connections currently checked out.
    active: AtomicUsize,
    /// Borrowers currently acquiring a slot.
    waiters: AtomicUsize,
    /// Set once by `close`; never cleared.
    closed: AtomicBool,
}

struct PoolState {
    idle: VecDeque<PooledConnection>,
}

// ============================================================================
// BorrowedConnection
// ============================================================================

/// Checkout guard for one pooled connection.
///
/// Holds the connection and its capacity slot for the duration of the
/// checkout. Hand it back with [`KeyedPool::release`] or
/// [`KeyedPool::invalidate`]; dropping it instead frees the slot but tears
/// the transport down non-gracefully.
pub struct BorrowedConnection {
    conn: Option<PooledConnection>,
    permit: Option<OwnedSemaphorePermit>,
    shared: Arc<PoolShared>,
}

impl BorrowedConnection {
    fn new(conn: PooledConnection, permit: OwnedSemaphorePermit, shared: Arc<PoolShared>) -> Self {
        Self {
            conn: Some(conn),
            permit: Some(permit),
            shared,
        }
    }

    /// Shared access to the transport session.
    #[inline]
    #[must_use]
    pub fn client(&self) -> &dyn TransportClient {
        self.connection().client()
    }

    /// Exclusive access to the transport session.
    #[inline]
    #[must_use]
    pub fn client_mut(&mut self) -> &mut dyn TransportClient {
        self.conn
            .as_mut()
            .expect("connection already checked in")
            .client_mut()
    }

    /// The pooled connection and its metadata.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &PooledConnection {
        self.conn.as_ref().expect("connection already checked in")
    }

    /// Key of the pool this connection belongs to.
    #[inline]
    #[must_use]
    pub fn pool_key(&self) -> &PoolKey {
        &self.shared.key
    }

    /// Splits the guard for check-in, disarming its drop path.
    pub(crate) fn into_parts(mut self) -> (PooledConnection, OwnedSemaphorePermit) {
        let conn = self.conn.take().expect("connection already checked in");
        let permit = self.permit.take().expect("permit already taken");
        (conn, permit)
    }

    /// Tears the checkout down against its own pool's accounting.
    ///
    /// Used when the owning pool is gone (removed from the registry) or when
    /// a check-in reaches a different pool instance under the same key.
    pub(crate) async fn discard(self) {
        let shared = Arc::clone(&self.shared);
        let (conn, permit) = self.into_parts();
        shared.active.fetch_sub(1, Ordering::SeqCst);
        conn.shutdown().await;
        drop(permit);
    }

    /// Returns `true` if this checkout came from `pool`'s own state.
    pub(crate) fn belongs_to(&self, pool: &KeyedPool) -> bool {
        Arc::ptr_eq(&self.shared, &pool.shared)
    }
}

impl Drop for BorrowedConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.shared.active.fetch_sub(1, Ordering::SeqCst);
            warn!(
                key = %self.shared.key,
                "borrowed connection dropped without release; tearing down non-gracefully"
            );
            drop(conn);
        }
        // The permit, if still held, is released by its own drop and wakes
        // the next waiter.
    }
}

impl fmt::Debug for BorrowedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BorrowedConnection")
            .field("key", &self.shared.key)
            .field("connection", &self.conn)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// KeyedPool
// ============================================================================

/// Bounded pool of connections to one logical target.
///
/// All occupancy mutations run under one per-pool exclusion domain, so the
/// `num_active + num_idle <= max_total` invariant holds at every observable
/// instant and a connection can never be swept and borrowed simultaneously.
pub struct KeyedPool {
    config: PoolConfig,
    factory: ClientFactory,
    shared: Arc<PoolShared>,
    events: Option<PoolEventHandler>,
}

impl KeyedPool {
    /// Creates a pool for `key` with the given limits.
    #[must_use]
    pub fn new(
        key: PoolKey,
        config: PoolConfig,
        connector: Arc<dyn TransportConnector>,
        proxy: Option<Arc<dyn ProxyContext>>,
        events: Option<PoolEventHandler>,
    ) -> Self {
        let factory = ClientFactory::new(
            key.clone(),
            connector,
            proxy,
            config.max_lifetime,
            events.clone(),
        );

        let shared = Arc::new(PoolShared {
            key,
            semaphore: Arc::new(Semaphore::new(config.max_total)),
            state: Mutex::new(PoolState {
                idle: VecDeque::new(),
            }),
            active: AtomicUsize::new(0),
            waiters: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        });

        Self {
            config,
            factory,
            shared,
            events,
        }
    }

    /// Key of this pool.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &PoolKey {
        &self.shared.key
    }

    /// Effective configuration of this pool.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Returns `true` once the pool has been closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

// ============================================================================
// KeyedPool - Borrow / Check-in
// ============================================================================

impl KeyedPool {
    /// Checks a connection out of the pool.
    ///
    /// Reuses the most recently returned idle connection when one passes
    /// validation; otherwise creates a fresh one within the `max_total` cap.
    /// When the pool is full the caller waits, FIFO, up to
    /// `borrow_wait_timeout`. A transfer-mode mismatch against `spec`
    /// triggers a transparent reconnect before the connection is handed out.
    ///
    /// # Errors
    ///
    /// - [`Error::Exhausted`] when no slot frees up within the wait budget
    /// - [`Error::Connection`] when creation or drift reconnect fails
    /// - [`Error::PoolClosed`] when the pool has been closed
    pub async fn borrow(&self, spec: &ConnectionSpec) -> Result<BorrowedConnection> {
        if self.is_closed() {
            return Err(Error::pool_closed(self.shared.key.clone()));
        }

        let permit = self.acquire_slot().await?;

        // close() may have raced with the slot acquisition.
        if self.is_closed() {
            return Err(Error::pool_closed(self.shared.key.clone()));
        }

        loop {
            let candidate = { self.shared.state.lock().await.idle.pop_back() };

            let Some(mut conn) = candidate else {
                // No idle connection left; the permit covers a fresh slot.
                // A create failure drops the permit with the error, freeing
                // the slot for the next borrower.
                let conn = self.factory.create(spec).await?;
                self.emit(PoolEvent::Created {
                    key: self.shared.key.clone(),
                });
                self.shared.active.fetch_add(1, Ordering::SeqCst);
                debug!(key = %self.shared.key, "borrow satisfied by fresh connection");
                return Ok(BorrowedConnection::new(
                    conn,
                    permit,
                    Arc::clone(&self.shared),
                ));
            };

            if self.config.test_on_borrow && !self.factory.validate(&mut conn).await {
                self.emit(PoolEvent::ValidationFailed {
                    key: self.shared.key.clone(),
                    detail: "borrow".into(),
                });
                self.factory.destroy(conn, "failed borrow validation").await;
                continue;
            }

            if let Err(e) = self.factory.activate(&mut conn, spec).await {
                debug!(key = %self.shared.key, error = %e, "activation failed, discarding connection");
                self.emit(PoolEvent::ValidationFailed {
                    key: self.shared.key.clone(),
                    detail: "activate".into(),
                });
                self.factory.destroy(conn, "activation failure").await;
                continue;
            }

            if spec.transfer_mode != TransferMode::Auto
                && conn.transfer_mode() != spec.transfer_mode
            {
                if let Err(e) = self.factory.reconnect(&mut conn, spec).await {
                    // Not safe to pool; surface the failure. The permit is
                    // dropped with this frame, so a waiter can move in and
                    // trigger a fresh create.
                    self.factory.destroy(conn, "drift reconnect failure").await;
                    return Err(e);
                }
                self.emit(PoolEvent::Reconnected {
                    key: self.shared.key.clone(),
                    mode: spec.transfer_mode,
                });
            }

            self.shared.active.fetch_add(1, Ordering::SeqCst);
            debug!(key = %self.shared.key, "borrow satisfied from idle set");
            return Ok(BorrowedConnection::new(
                conn,
                permit,
                Arc::clone(&self.shared),
            ));
        }
    }

    /// Checks a connection back in.
    ///
    /// Passivates and pools the connection unless the pool is closed, the
    /// session lost its link, `test_on_return` fails, or the idle cap is
    /// reached; those paths destroy it instead. Either way the slot is freed
    /// and one waiting borrower wakes. Never fails.
    pub async fn release(&self, borrowed: BorrowedConnection) {
        if !borrowed.belongs_to(self) {
            warn!(key = %self.shared.key, "connection returned to a different pool instance; discarding");
            borrowed.discard().await;
            return;
        }

        let (mut conn, permit) = borrowed.into_parts();
        self.shared.active.fetch_sub(1, Ordering::SeqCst);

        if self.is_closed() {
            self.factory.destroy(conn, "pool closed").await;
            drop(permit);
            return;
        }

        let usable = conn.client().is_connected()
            && (!self.config.test_on_return || self.factory.validate(&mut conn).await);
        if !usable {
            self.emit(PoolEvent::ValidationFailed {
                key: self.shared.key.clone(),
                detail: "return".into(),
            });
            self.factory.destroy(conn, "unusable on return").await;
            drop(permit);
            return;
        }

        self.factory.passivate(&mut conn);

        let overflow = {
            let mut state = self.shared.state.lock().await;
            if state.idle.len() >= self.config.max_idle {
                Some(conn)
            } else {
                state.idle.push_back(conn);
                None
            }
        };
        if let Some(conn) = overflow {
            self.factory.destroy(conn, "idle capacity reached").await;
        }

        // Frees the slot and wakes the next waiter, who will find the
        // connection already pooled.
        drop(permit);
    }

    /// Destroys a connection the caller no longer trusts.
    ///
    /// Never passivates or pools; the slot is freed and one waiting borrower
    /// wakes. Never fails.
    pub async fn invalidate(&self, borrowed: BorrowedConnection) {
        if !borrowed.belongs_to(self) {
            borrowed.discard().await;
            return;
        }

        let (conn, permit) = borrowed.into_parts();
        self.shared.active.fetch_sub(1, Ordering::SeqCst);
        debug!(key = %self.shared.key, "invalidating connection");
        self.factory.destroy(conn, "invalidated by caller").await;
        drop(permit);
    }

    /// Waits for a capacity permit within the borrow budget.
    async fn acquire_slot(&self) -> Result<OwnedSemaphorePermit> {
        let wait = self.config.borrow_wait_timeout;

        self.shared.waiters.fetch_add(1, Ordering::SeqCst);
        let acquired = timeout(
            wait,
            Arc::clone(&self.shared.semaphore).acquire_owned(),
        )
        .await;
        self.shared.waiters.fetch_sub(1, Ordering::SeqCst);

        match acquired {
            Ok(Ok(permit)) => Ok(permit),
            // The semaphore only closes when the pool does.
            Ok(Err(_)) => Err(Error::pool_closed(self.shared.key.clone())),
            Err(_) => Err(Error::exhausted(
                self.shared.key.clone(),
                wait.as_millis() as u64,
            )),
        }
    }
}

// ============================================================================
// KeyedPool - Eviction & Shutdown
// ============================================================================

impl KeyedPool {
    /// Runs one eviction pass over the idle set.
    ///
    /// Examines up to `num_tests_per_eviction_run` connections oldest-first.
    /// Idle-timeout eviction respects the `min_idle` floor; connections that
    /// fail validation (`test_while_idle`) are evicted regardless of age or
    /// floor. Destruction happens outside the state lock.
    pub async fn sweep(&self) {
        if self.is_closed() {
            return;
        }

        let mut idle_evicted: Vec<(PooledConnection, u64)> = Vec::new();
        let mut invalid_evicted: Vec<PooledConnection> = Vec::new();

        {
            let mut state = self.shared.state.lock().await;
            let quota = self.config.num_tests_per_eviction_run.min(state.idle.len());
            let mut index = 0;

            for _ in 0..quota {
                if index >= state.idle.len() {
                    break;
                }

                let idle_for = state.idle[index].idle_for();
                if idle_for > self.config.idle_timeout && state.idle.len() > self.config.min_idle {
                    if let Some(conn) = state.idle.remove(index) {
                        idle_evicted.push((conn, idle_for.as_millis() as u64));
                    }
                    continue;
                }

                if self.config.test_while_idle {
                    let Some(mut conn) = state.idle.remove(index) else {
                        break;
                    };
                    if self.factory.validate(&mut conn).await {
                        state.idle.insert(index, conn);
                        index += 1;
                    } else {
                        invalid_evicted.push(conn);
                    }
                } else {
                    index += 1;
                }
            }
        }

        for (conn, idle_ms) in idle_evicted {
            self.emit(PoolEvent::Evicted {
                key: self.shared.key.clone(),
                idle_ms,
            });
            self.factory.destroy(conn, "idle timeout").await;
        }
        for conn in invalid_evicted {
            self.emit(PoolEvent::ValidationFailed {
                key: self.shared.key.clone(),
                detail: "sweep".into(),
            });
            self.factory.destroy(conn, "failed idle validation").await;
        }
    }

    /// Closes the pool: fails pending borrowers, destroys idle connections.
    ///
    /// Idempotent and never fails. Connections still checked out are
    /// destroyed when they come back through `release`/`invalidate`.
    pub async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // Pending acquires fail immediately with PoolClosed.
        self.shared.semaphore.close();

        let drained: Vec<PooledConnection> = {
            let mut state = self.shared.state.lock().await;
            state.idle.drain(..).collect()
        };
        let count = drained.len();
        for conn in drained {
            self.factory.destroy(conn, "pool closed").await;
        }

        debug!(key = %self.shared.key, destroyed = count, "pool closed");
    }

    /// Snapshot of the pool's occupancy and limits. Never mutates state.
    pub async fn stats(&self) -> PoolStats {
        let num_idle = self.shared.state.lock().await.idle.len();
        PoolStats {
            num_active: self.shared.active.load(Ordering::SeqCst),
            num_idle,
            num_waiters: self.shared.waiters.load(Ordering::SeqCst),
            max_total: self.config.max_total,
            max_idle: self.config.max_idle,
            min_idle: self.config.min_idle,
        }
    }

    /// Invokes the observability hook.
    fn emit(&self, event: PoolEvent) {
        if let Some(ref handler) = self.events {
            handler(event);
        }
    }
}

impl fmt::Debug for KeyedPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedPool")
            .field("key", &self.shared.key)
            .field("active", &self.shared.active.load(Ordering::SeqCst))
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
