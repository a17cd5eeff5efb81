//! Transport capability traits consumed by the pool.
//!
//! [`TransportClient`] is the session the pool manages, [`TransportConnector`]
//! instantiates the client variant matching a spec's
//! [`SecurityMode`](crate::spec::SecurityMode), and [`ProxyContext`] brackets
//! the connect handshake with proxy activation.

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::error::Result;
use crate::spec::{ConnectionSpec, ProxyConfig, TransferMode};

// ============================================================================
// TransportClient
// ============================================================================

/// One stateful transfer session.
///
/// The pool owns the lifecycle: it connects freshly created clients, probes
/// idle ones with [`send_noop`](Self::send_noop), re-applies settings on
/// checkout and tears sessions down with `quit` + `disconnect`. Everything
/// the caller does with a checked-out client beyond that (listing, transfer,
/// rename) is outside pool control.
#[async_trait]
pub trait TransportClient: Send + Sync {
    /// Performs the connect handshake, including authentication.
    async fn connect(&mut self) -> Result<()>;

    /// Closes the underlying socket.
    async fn disconnect(&mut self) -> Result<()>;

    /// Returns `true` if the session currently holds a live connection.
    fn is_connected(&self) -> bool;

    /// Sends a liveness probe (`NOOP` or equivalent).
    ///
    /// Returns `Ok(false)` when the server answered unexpectedly; transport
    /// failures may also surface as errors. Either outcome counts as a
    /// failed probe.
    async fn send_noop(&mut self) -> Result<bool>;

    /// Applies connection settings (timeouts, data-channel mode) from a spec.
    async fn apply_settings(&mut self, spec: &ConnectionSpec) -> Result<()>;

    /// Switches the session's transfer mode.
    async fn set_transfer_mode(&mut self, mode: TransferMode) -> Result<()>;

    /// Sends a graceful goodbye and returns the server reply code.
    async fn quit(&mut self) -> Result<u32>;
}

// ============================================================================
// TransportConnector
// ============================================================================

/// Instantiates the transport variant for a spec.
///
/// `open` dispatches on [`spec.security`](crate::spec::SecurityMode) and
/// applies key material where the mode requires it, but must NOT connect:
/// the pool drives the connect handshake so it can bracket it with proxy
/// activation and account failures correctly.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Creates an unconnected client for `spec`, targeting `addr`.
    async fn open(
        &self,
        spec: &ConnectionSpec,
        addr: SocketAddr,
    ) -> Result<Box<dyn TransportClient>>;
}

// ============================================================================
// ProxyContext
// ============================================================================

/// Scoped proxy activation around the connect handshake.
///
/// The pool guarantees `begin` / `end` bracketing on every exit path of a
/// connect attempt, including failures. `end` is infallible by contract; it
/// runs from cleanup paths where a secondary failure has nowhere to go.
#[async_trait]
pub trait ProxyContext: Send + Sync {
    /// Activates the proxy before a connect attempt.
    async fn begin(&self, proxy: &ProxyConfig) -> Result<()>;

    /// Deactivates the proxy after the attempt, success or not.
    async fn end(&self);
}
