//! Connection lifecycle callbacks.
//!
//! [`ClientFactory`] owns the create/validate/activate/passivate/destroy
//! protocol for one pool key. The pool decides *when* these run; the factory
//! knows *how*: address resolution, variant instantiation through the
//! connector, settings application, the proxy-bracketed connect handshake
//! and graceful teardown.
//!
//! # Lifecycle
//!
//! ```text
//! create ──► ACTIVE ──release──► IDLE ──borrow──► activate ──► ACTIVE
//!               │                  │
//!           invalidate          sweep/validate
//!               ▼                  ▼
//!            destroy            destroy
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::lookup_host;
use tokio::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::pool::connection::PooledConnection;
use crate::pool::events::{PoolEvent, PoolEventHandler};
use crate::spec::{ConnectionSpec, PoolKey, TransferMode};
use crate::transport::{ProxyContext, TransportClient, TransportConnector};

// ============================================================================
// ClientFactory
// ============================================================================

/// Creates, validates and tears down pooled connections for one pool key.
pub struct ClientFactory {
    /// Pool key the factory serves.
    key: PoolKey,

    /// Instantiates the transport variant for a spec.
    connector: Arc<dyn TransportConnector>,

    /// Optional proxy activation bracket around connect handshakes.
    proxy: Option<Arc<dyn ProxyContext>>,

    /// Absolute lifetime after which validation fails. Zero disables.
    max_lifetime: Duration,

    /// Observability hook for swallowed failures.
    events: Option<PoolEventHandler>,
}

impl ClientFactory {
    /// Creates a factory for `key`.
    #[must_use]
    pub(crate) fn new(
        key: PoolKey,
        connector: Arc<dyn TransportConnector>,
        proxy: Option<Arc<dyn ProxyContext>>,
        max_lifetime: Duration,
        events: Option<PoolEventHandler>,
    ) -> Self {
        Self {
            key,
            connector,
            proxy,
            max_lifetime,
            events,
        }
    }

    /// Pool key the factory serves.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &PoolKey {
        &self.key
    }
}

// ============================================================================
// ClientFactory - Lifecycle Callbacks
// ============================================================================

impl ClientFactory {
    /// Creates a fresh, connected [`PooledConnection`] for `spec`.
    ///
    /// Resolution, instantiation, settings and the connect handshake run in
    /// that order; the handshake is bracketed with proxy activation when a
    /// proxy is configured. A client that fails its handshake is disconnected
    /// best-effort so no live socket leaks.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the spec fails validation
    /// - [`Error::Resolve`] if the host does not resolve
    /// - [`Error::Connection`] on instantiation, settings or handshake failure
    pub async fn create(&self, spec: &ConnectionSpec) -> Result<PooledConnection> {
        spec.validate()?;

        let addr = self.resolve(spec).await?;
        let mut client = self
            .connector
            .open(spec, addr)
            .await
            .map_err(|e| self.as_connection_error(e))?;

        let connected = self.configure_and_connect(client.as_mut(), spec).await;
        if let Err(e) = connected {
            // The handshake may have left a half-open socket behind.
            let _ = client.disconnect().await;
            return Err(e);
        }

        debug!(key = %self.key, addr = %addr, "connection established");
        Ok(PooledConnection::new(client, spec.transfer_mode))
    }

    /// Checks whether a connection may be handed out or kept.
    ///
    /// Never fails: any probe error counts as an invalid connection. Used on
    /// borrow (`test_on_borrow`) and during sweeps (`test_while_idle`).
    pub async fn validate(&self, conn: &mut PooledConnection) -> bool {
        if !conn.client().is_connected() {
            return false;
        }

        if self.max_lifetime > Duration::ZERO && conn.age() > self.max_lifetime {
            debug!(key = %self.key, age_ms = conn.age().as_millis() as u64, "connection over max lifetime");
            return false;
        }

        matches!(conn.client_mut().send_noop().await, Ok(true))
    }

    /// Prepares an idle connection for checkout.
    ///
    /// Re-applies the *caller's* spec: the target configuration may have
    /// changed between the connection's creation and this borrow.
    pub async fn activate(&self, conn: &mut PooledConnection, spec: &ConnectionSpec) -> Result<()> {
        conn.touch();
        conn.client_mut()
            .apply_settings(spec)
            .await
            .map_err(|e| self.as_connection_error(e))
    }

    /// Settles a connection back into the idle set.
    pub fn passivate(&self, conn: &mut PooledConnection) {
        conn.touch();
    }

    /// Tears a connection down: graceful quit, then disconnect.
    ///
    /// Runs from cleanup paths (eviction, invalidation, pool shutdown) and
    /// therefore swallows every error, reporting them through the event hook.
    pub async fn destroy(&self, mut conn: PooledConnection, reason: &str) {
        debug!(key = %self.key, reason, "destroying connection");

        if !conn.client().is_connected() {
            return;
        }

        if let Err(e) = conn.client_mut().quit().await {
            self.emit(PoolEvent::DestroyFailed {
                key: self.key.clone(),
                detail: format!("quit: {e}"),
            });
        }
        if let Err(e) = conn.client_mut().disconnect().await {
            self.emit(PoolEvent::DestroyFailed {
                key: self.key.clone(),
                detail: format!("disconnect: {e}"),
            });
        }
    }

    /// Reconnects a borrowed connection after transfer-mode drift.
    ///
    /// Quit and disconnect errors are swallowed; the subsequent handshake,
    /// settings application and mode switch are not.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the reconnect handshake or the
    /// settings reapplication fails. The caller must destroy the connection
    /// in that case; it is not safe to pool.
    pub async fn reconnect(&self, conn: &mut PooledConnection, spec: &ConnectionSpec) -> Result<()> {
        debug!(
            key = %self.key,
            from = %conn.transfer_mode(),
            to = %spec.transfer_mode,
            "transfer mode drift, reconnecting"
        );

        if conn.client().is_connected() {
            let _ = conn.client_mut().quit().await;
            let _ = conn.client_mut().disconnect().await;
        }

        // Unlike create, the session reconnects first and is reconfigured
        // afterwards: settings do not survive the teardown of the old
        // control connection.
        self.connect_bracketed(conn.client_mut(), spec)
            .await
            .map_err(|e| self.as_connection_error(e))?;
        conn.client_mut()
            .apply_settings(spec)
            .await
            .map_err(|e| self.as_connection_error(e))?;
        if spec.transfer_mode != TransferMode::Auto {
            conn.client_mut()
                .set_transfer_mode(spec.transfer_mode)
                .await
                .map_err(|e| self.as_connection_error(e))?;
        }

        conn.set_transfer_mode(spec.transfer_mode);
        conn.touch();
        Ok(())
    }
}

// ============================================================================
// ClientFactory - Internals
// ============================================================================

impl ClientFactory {
    /// Resolves the spec's target address.
    async fn resolve(&self, spec: &ConnectionSpec) -> Result<SocketAddr> {
        let mut addrs = lookup_host((spec.host.as_str(), spec.port))
            .await
            .map_err(|e| Error::resolve(spec.host.clone(), e.to_string()))?;

        addrs
            .next()
            .ok_or_else(|| Error::resolve(spec.host.clone(), "no addresses returned"))
    }

    /// Applies settings and transfer mode, then runs the bracketed handshake.
    async fn configure_and_connect(
        &self,
        client: &mut dyn TransportClient,
        spec: &ConnectionSpec,
    ) -> Result<()> {
        client
            .apply_settings(spec)
            .await
            .map_err(|e| self.as_connection_error(e))?;

        if spec.transfer_mode != TransferMode::Auto {
            client
                .set_transfer_mode(spec.transfer_mode)
                .await
                .map_err(|e| self.as_connection_error(e))?;
        }

        self.connect_bracketed(client, spec)
            .await
            .map_err(|e| self.as_connection_error(e))
    }

    /// Runs the connect handshake inside the proxy activation bracket.
    ///
    /// `end` runs on every exit path, including a failed `begin`.
    async fn connect_bracketed(
        &self,
        client: &mut dyn TransportClient,
        spec: &ConnectionSpec,
    ) -> Result<()> {
        match (spec.proxy.as_ref(), self.proxy.as_ref()) {
            (Some(proxy_cfg), Some(ctx)) => {
                let result = match ctx.begin(proxy_cfg).await {
                    Ok(()) => client.connect().await,
                    Err(e) => Err(e),
                };
                ctx.end().await;
                result
            }
            (Some(_), None) => {
                warn!(key = %self.key, "spec requests a proxy but no proxy context is configured");
                client.connect().await
            }
            _ => client.connect().await,
        }
    }

    /// Rewraps transport-level failures as connection errors for this key.
    fn as_connection_error(&self, e: Error) -> Error {
        match e {
            Error::Connection { .. } | Error::Resolve { .. } | Error::Config { .. } => e,
            other => Error::connection(self.key.clone(), other.to_string()),
        }
    }

    /// Invokes the observability hook.
    pub(crate) fn emit(&self, event: PoolEvent) {
        if let Some(ref handler) = self.events {
            handler(event);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
