//! Pooled transfer sessions demo.
//!
//! Drives the pool with an in-memory loopback transport: concurrent workers
//! share a handful of sessions, a transfer-mode switch triggers a transparent
//! reconnect, and shutdown tears everything down.
//!
//! Run with: cargo run --example pooled_transfers

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::info;

use ftp_pool::{
    ConnectionSpec, PoolConfig, PoolRegistry, Result, TransferMode, TransportClient,
    TransportConnector,
};

// ============================================================================
// Loopback Transport
// ============================================================================

/// Counts handshakes so the demo can show how few were paid.
#[derive(Default)]
struct LoopbackStats {
    connects: AtomicUsize,
}

struct LoopbackClient {
    stats: Arc<LoopbackStats>,
    connected: bool,
}

#[async_trait]
impl TransportClient for LoopbackClient {
    async fn connect(&mut self) -> Result<()> {
        // Stand-in for resolve + TCP + auth + negotiation.
        sleep(Duration::from_millis(50)).await;
        self.stats.connects.fetch_add(1, Ordering::Relaxed);
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn send_noop(&mut self) -> Result<bool> {
        Ok(self.connected)
    }

    async fn apply_settings(&mut self, _spec: &ConnectionSpec) -> Result<()> {
        Ok(())
    }

    async fn set_transfer_mode(&mut self, _mode: TransferMode) -> Result<()> {
        Ok(())
    }

    async fn quit(&mut self) -> Result<u32> {
        Ok(221)
    }
}

struct LoopbackConnector {
    stats: Arc<LoopbackStats>,
}

#[async_trait]
impl TransportConnector for LoopbackConnector {
    async fn open(
        &self,
        _spec: &ConnectionSpec,
        _addr: SocketAddr,
    ) -> Result<Box<dyn TransportClient>> {
        Ok(Box::new(LoopbackClient {
            stats: Arc::clone(&self.stats),
            connected: false,
        }))
    }
}

// ============================================================================
// Demo
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let stats = Arc::new(LoopbackStats::default());
    let registry = PoolRegistry::builder(Arc::new(LoopbackConnector {
        stats: Arc::clone(&stats),
    }))
    .config(
        PoolConfig::new()
            .with_max_total(4)
            .with_max_idle(4)
            .with_idle_timeout(Duration::from_secs(2))
            .with_eviction_interval(Duration::from_secs(1)),
    )
    .event_handler(|event| info!(?event, "pool event"))
    .build();

    let spec = ConnectionSpec::new("127.0.0.1")
        .with_credentials("demo", "demo")
        .with_transfer_mode(TransferMode::Binary);

    // 16 operations across 4 workers share at most 4 sessions.
    let mut workers = Vec::new();
    for worker in 0..4 {
        let registry = registry.clone();
        let spec = spec.clone();
        workers.push(tokio::spawn(async move {
            for op in 0..4 {
                let session = registry.borrow(&spec).await?;
                // Stand-in for a transfer on the checked-out session.
                sleep(Duration::from_millis(10)).await;
                info!(worker, op, "transfer done");
                registry.release(session).await;
            }
            Ok::<(), ftp_pool::Error>(())
        }));
    }
    for worker in workers {
        worker.await??;
    }

    let key = spec.pool_key();
    let snapshot = registry.stats(&key).await;
    info!(
        handshakes = stats.connects.load(Ordering::Relaxed),
        stats = ?snapshot,
        "16 operations completed"
    );

    // A mode switch on the same target reuses the pool but reconnects.
    let ascii = spec.clone().with_transfer_mode(TransferMode::Ascii);
    let session = registry.borrow(&ascii).await?;
    info!(
        mode = %session.connection().transfer_mode(),
        handshakes = stats.connects.load(Ordering::Relaxed),
        "drift reconnect performed"
    );
    registry.release(session).await;

    registry.shutdown().await;
    info!("registry shut down");
    Ok(())
}
