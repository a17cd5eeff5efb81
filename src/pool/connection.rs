//! Pooled connection wrapper.
//!
//! A [`PooledConnection`] pairs one transport session with the metadata the
//! pool needs for staleness decisions: creation time, last-access time and
//! the transfer mode last applied to the session. While idle it is owned by
//! its pool's idle queue; while checked out it is owned by a
//! [`BorrowedConnection`](crate::pool::BorrowedConnection) guard. It is never
//! owned by two parties at once.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::time::{Duration, Instant};

use crate::spec::TransferMode;
use crate::transport::TransportClient;

// ============================================================================
// PooledConnection
// ============================================================================

/// One managed transport session plus pooling metadata.
pub struct PooledConnection {
    /// The owned transport session.
    client: Box<dyn TransportClient>,

    /// When the session was created.
    created_at: Instant,

    /// Last checkout or check-in.
    last_access: Instant,

    /// Transfer mode last applied to the session.
    transfer_mode: TransferMode,
}

impl PooledConnection {
    /// Wraps a freshly connected client.
    #[must_use]
    pub(crate) fn new(client: Box<dyn TransportClient>, transfer_mode: TransferMode) -> Self {
        let now = Instant::now();
        Self {
            client,
            created_at: now,
            last_access: now,
            transfer_mode,
        }
    }

    /// Shared access to the transport session.
    #[inline]
    #[must_use]
    pub fn client(&self) -> &dyn TransportClient {
        self.client.as_ref()
    }

    /// Exclusive access to the transport session.
    #[inline]
    #[must_use]
    pub fn client_mut(&mut self) -> &mut dyn TransportClient {
        self.client.as_mut()
    }

    /// When the session was created.
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Last checkout or check-in.
    #[inline]
    #[must_use]
    pub fn last_access(&self) -> Instant {
        self.last_access
    }

    /// Age since creation.
    #[inline]
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Time since the last checkout or check-in.
    #[inline]
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_access.elapsed()
    }

    /// Transfer mode last applied to the session.
    #[inline]
    #[must_use]
    pub fn transfer_mode(&self) -> TransferMode {
        self.transfer_mode
    }

    /// Records an access.
    #[inline]
    pub(crate) fn touch(&mut self) {
        self.last_access = Instant::now();
    }

    /// Records a transfer mode switch.
    #[inline]
    pub(crate) fn set_transfer_mode(&mut self, mode: TransferMode) {
        self.transfer_mode = mode;
    }

    /// Best-effort teardown: graceful quit, then disconnect, errors swallowed.
    ///
    /// Used when the owning pool is gone and no factory is available to run
    /// the full destroy path.
    pub(crate) async fn shutdown(mut self) {
        if self.client.is_connected() {
            let _ = self.client.quit().await;
            let _ = self.client.disconnect().await;
        }
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("age", &self.age())
            .field("idle_for", &self.idle_for())
            .field("transfer_mode", &self.transfer_mode)
            .field("connected", &self.client.is_connected())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use crate::spec::ConnectionSpec;
    use crate::transport::TransportConnector;
    use crate::transport::mock::MockConnector;

    async fn mock_conn(connector: &MockConnector) -> PooledConnection {
        let spec = ConnectionSpec::new("127.0.0.1");
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 21);
        let mut client = connector.open(&spec, addr).await.unwrap();
        client.connect().await.unwrap();
        PooledConnection::new(client, TransferMode::Auto)
    }

    #[tokio::test(start_paused = true)]
    async fn test_age_and_idle_tracking() {
        let connector = MockConnector::new();
        let mut conn = mock_conn(&connector).await;

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(conn.age(), Duration::from_secs(10));
        assert_eq!(conn.idle_for(), Duration::from_secs(10));

        conn.touch();
        assert_eq!(conn.idle_for(), Duration::ZERO);
        // Age keeps counting from creation.
        assert_eq!(conn.age(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_transfer_mode_tracking() {
        let connector = MockConnector::new();
        let mut conn = mock_conn(&connector).await;

        assert_eq!(conn.transfer_mode(), TransferMode::Auto);
        conn.set_transfer_mode(TransferMode::Binary);
        assert_eq!(conn.transfer_mode(), TransferMode::Binary);
    }

    #[tokio::test]
    async fn test_shutdown_quits_gracefully() {
        let connector = MockConnector::new();
        let conn = mock_conn(&connector).await;

        conn.shutdown().await;

        let control = connector.control(0);
        assert!(!control.is_connected());
        assert_eq!(control.log(), vec!["open", "connect", "quit", "disconnect"]);
    }

    #[tokio::test]
    async fn test_shutdown_swallows_quit_failure() {
        let connector = MockConnector::new();
        let conn = mock_conn(&connector).await;
        connector.control(0).fail_quit(true);

        // Must not panic or surface the error.
        conn.shutdown().await;
        assert!(!connector.control(0).is_connected());
    }

    #[tokio::test]
    async fn test_shutdown_skips_disconnected() {
        let connector = MockConnector::new();
        let conn = mock_conn(&connector).await;
        connector.control(0).drop_connection();

        conn.shutdown().await;
        // No quit/disconnect after the connection was already gone.
        assert_eq!(connector.control(0).log(), vec!["open", "connect"]);
    }
}
