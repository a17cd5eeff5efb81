//! Pool observability events.
//!
//! The pool swallows failures on cleanup paths by design; this hook is how
//! hosts still get to see them. Events fire in addition to `tracing` output,
//! never instead of it.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::spec::{PoolKey, TransferMode};

// ============================================================================
// PoolEvent
// ============================================================================

/// Notification emitted by a pool at lifecycle edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    /// A fresh connection was created for a borrower.
    Created {
        /// Pool the connection belongs to.
        key: PoolKey,
    },

    /// A connection failed validation and was discarded.
    ValidationFailed {
        /// Pool the connection belonged to.
        key: PoolKey,
        /// Where the failure was detected (borrow, return, sweep).
        detail: String,
    },

    /// Graceful teardown of a connection failed; the error was swallowed.
    DestroyFailed {
        /// Pool the connection belonged to.
        key: PoolKey,
        /// The swallowed error.
        detail: String,
    },

    /// An idle connection was evicted by a sweep.
    Evicted {
        /// Pool the connection belonged to.
        key: PoolKey,
        /// How long the connection had been idle.
        idle_ms: u64,
    },

    /// A borrowed connection was reconnected after configuration drift.
    Reconnected {
        /// Pool the connection belongs to.
        key: PoolKey,
        /// Transfer mode the connection was switched to.
        mode: TransferMode,
    },
}

impl PoolEvent {
    /// Returns the pool key the event was raised for.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &PoolKey {
        match self {
            Self::Created { key }
            | Self::ValidationFailed { key, .. }
            | Self::DestroyFailed { key, .. }
            | Self::Evicted { key, .. }
            | Self::Reconnected { key, .. } => key,
        }
    }
}

// ============================================================================
// PoolEventHandler
// ============================================================================

/// Callback invoked for every [`PoolEvent`].
///
/// Handlers run inline on pool code paths and must be cheap and non-blocking;
/// forward to a channel for anything heavier.
pub type PoolEventHandler = Arc<dyn Fn(PoolEvent) + Send + Sync>;

// ============================================================================
// Tests
// ============================================================================
