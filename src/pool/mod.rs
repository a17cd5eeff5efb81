//! Keyed connection pooling.
//!
//! The pool subsystem keeps expensive-to-establish transfer sessions alive
//! between operations. Sessions are grouped by
//! [`PoolKey`](crate::spec::PoolKey); each key gets one bounded
//! [`KeyedPool`], and a process-wide [`PoolRegistry`] creates those pools
//! lazily.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │               PoolRegistry                    │
//! │  ┌─────────────────────────────────────────┐  │
//! │  │ host:21:deploy:plain  → KeyedPool       │  │
//! │  │ host:22:ci:ssh        → KeyedPool       │  │
//! │  └─────────────────────────────────────────┘  │
//! │        ▲                        │             │
//! │  EvictionScheduler ──sweep──────┘             │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | Pool limits and eviction thresholds |
//! | `connection` | Pooled connection wrapper |
//! | `events` | Observability hook |
//! | `evictor` | Background sweep task (internal) |
//! | `factory` | Connection lifecycle callbacks |
//! | `keyed` | Per-key bounded pool and checkout guard |
//! | `registry` | Key → pool map |

// ============================================================================
// Submodules
// ============================================================================

/// Pool limits, eviction thresholds and validation flags.
pub mod config;

/// Pooled connection wrapper.
pub mod connection;

/// Pool observability events.
pub mod events;

/// Background eviction scheduler.
pub(crate) mod evictor;

/// Connection lifecycle callbacks.
pub mod factory;

/// Bounded per-key pool, checkout guard and statistics.
pub mod keyed;

/// Process-wide pool registry.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::PoolConfig;
pub use connection::PooledConnection;
pub use events::{PoolEvent, PoolEventHandler};
pub use factory::ClientFactory;
pub use keyed::{BorrowedConnection, KeyedPool, PoolStats};
pub use registry::{PoolRegistry, PoolRegistryBuilder};
