//! Scripted transport for unit tests.
//!
//! [`MockConnector`] hands out [`MockTransport`] clients whose behavior is
//! controlled through a shared [`MockControl`] handle: tests flip failure
//! flags, then assert against the recorded operation log.

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::spec::{ConnectionSpec, ProxyConfig, TransferMode};
use crate::transport::client::{ProxyContext, TransportClient, TransportConnector};

// ============================================================================
// MockState
// ============================================================================

#[derive(Debug, Default)]
struct MockState {
    log: Vec<String>,
    connected: bool,
    fail_connect: bool,
    fail_noop: bool,
    fail_apply: bool,
    fail_quit: bool,
    transfer_mode: Option<TransferMode>,
}

// ============================================================================
// MockControl
// ============================================================================

/// Test-side handle to one mock client's state.
#[derive(Clone)]
pub(crate) struct MockControl {
    id: usize,
    state: Arc<Mutex<MockState>>,
}

impl MockControl {
    /// Sequence number of the client, in creation order.
    pub(crate) fn id(&self) -> usize {
        self.id
    }

    /// Snapshot of the recorded operations.
    pub(crate) fn log(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    pub(crate) fn transfer_mode(&self) -> Option<TransferMode> {
        self.state.lock().transfer_mode
    }

    /// Simulates the server silently dropping the session.
    pub(crate) fn drop_connection(&self) {
        self.state.lock().connected = false;
    }

    /// Makes subsequent NOOP probes fail.
    pub(crate) fn fail_noop(&self, fail: bool) {
        self.state.lock().fail_noop = fail;
    }

    /// Makes subsequent connect attempts fail.
    pub(crate) fn fail_connect(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }

    /// Makes the graceful quit fail (teardown must swallow it).
    pub(crate) fn fail_quit(&self, fail: bool) {
        self.state.lock().fail_quit = fail;
    }
}

// ============================================================================
// MockTransport
// ============================================================================

/// Scripted [`TransportClient`].
pub(crate) struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl TransportClient for MockTransport {
    async fn connect(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.log.push("connect".into());
        if state.fail_connect {
            return Err(Error::transport("mock connect refused"));
        }
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.log.push("disconnect".into());
        state.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    async fn send_noop(&mut self) -> Result<bool> {
        let mut state = self.state.lock();
        state.log.push("noop".into());
        if !state.connected {
            return Err(Error::transport("mock not connected"));
        }
        Ok(!state.fail_noop)
    }

    async fn apply_settings(&mut self, _spec: &ConnectionSpec) -> Result<()> {
        let mut state = self.state.lock();
        state.log.push("apply-settings".into());
        if state.fail_apply {
            return Err(Error::transport("mock apply-settings failed"));
        }
        Ok(())
    }

    async fn set_transfer_mode(&mut self, mode: TransferMode) -> Result<()> {
        let mut state = self.state.lock();
        state.log.push(format!("set-mode:{mode}"));
        state.transfer_mode = Some(mode);
        Ok(())
    }

    async fn quit(&mut self) -> Result<u32> {
        let mut state = self.state.lock();
        state.log.push("quit".into());
        if state.fail_quit {
            return Err(Error::transport("mock quit failed"));
        }
        Ok(221)
    }
}

// ============================================================================
// MockConnector
// ============================================================================

/// Scripted [`TransportConnector`] tracking every client it creates.
#[derive(Default)]
pub(crate) struct MockConnector {
    opened: AtomicUsize,
    fail_open: AtomicBool,
    fail_connect_new: AtomicBool,
    controls: Mutex<Vec<MockControl>>,
}

impl MockConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of clients created so far.
    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Control handle for the `n`-th created client.
    pub(crate) fn control(&self, n: usize) -> MockControl {
        self.controls.lock()[n].clone()
    }

    /// Control handle for the most recently created client.
    pub(crate) fn last_control(&self) -> MockControl {
        self.controls
            .lock()
            .last()
            .expect("no client created yet")
            .clone()
    }

    /// Makes `open` itself fail.
    pub(crate) fn fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Makes clients created from now on refuse their connect handshake.
    pub(crate) fn fail_connect_new(&self, fail: bool) {
        self.fail_connect_new.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransportConnector for MockConnector {
    async fn open(
        &self,
        _spec: &ConnectionSpec,
        _addr: SocketAddr,
    ) -> Result<Box<dyn TransportClient>> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(Error::transport("mock open failed"));
        }

        let id = self.opened.fetch_add(1, Ordering::SeqCst);
        let state = Arc::new(Mutex::new(MockState {
            fail_connect: self.fail_connect_new.load(Ordering::SeqCst),
            ..MockState::default()
        }));
        state.lock().log.push("open".into());

        self.controls.lock().push(MockControl {
            id,
            state: Arc::clone(&state),
        });

        Ok(Box::new(MockTransport { state }))
    }
}

// ============================================================================
// RecordingProxy
// ============================================================================

/// [`ProxyContext`] that records bracket events.
#[derive(Default)]
pub(crate) struct RecordingProxy {
    fail_begin: AtomicBool,
    events: Mutex<Vec<String>>,
}

impl RecordingProxy {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub(crate) fn fail_begin(&self, fail: bool) {
        self.fail_begin.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProxyContext for RecordingProxy {
    async fn begin(&self, proxy: &ProxyConfig) -> Result<()> {
        self.events.lock().push(format!("begin:{}", proxy.host));
        if self.fail_begin.load(Ordering::SeqCst) {
            return Err(Error::transport("mock proxy begin failed"));
        }
        Ok(())
    }

    async fn end(&self) {
        self.events.lock().push("end".into());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};

    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 21)
    }

    #[tokio::test]
    async fn test_mock_connect_and_log() {
        let connector = MockConnector::new();
        let spec = ConnectionSpec::new("h");
        let mut client = connector.open(&spec, addr()).await.unwrap();

        client.connect().await.unwrap();
        assert!(client.is_connected());
        assert!(client.send_noop().await.unwrap());

        let control = connector.control(0);
        assert_eq!(control.log(), vec!["open", "connect", "noop"]);
    }

    #[tokio::test]
    async fn test_mock_failure_flags() {
        let connector = MockConnector::new();
        connector.fail_connect_new(true);
        let spec = ConnectionSpec::new("h");
        let mut client = connector.open(&spec, addr()).await.unwrap();

        assert!(client.connect().await.is_err());
        assert!(!client.is_connected());
    }
}
