//! Error types for the session pool.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use ftp_pool::{PoolRegistry, Result};
//!
//! async fn example(registry: &PoolRegistry, spec: &ConnectionSpec) -> Result<()> {
//!     let session = registry.borrow(spec).await?;
//!     // ... use session.client_mut() ...
//!     registry.get_or_create(spec).release(session).await;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Resolve`], [`Error::Connection`] |
//! | Pool | [`Error::Exhausted`], [`Error::PoolClosed`] |
//! | External | [`Error::Transport`], [`Error::Io`] |
//!
//! Only [`borrow`](crate::pool::KeyedPool::borrow) surfaces errors to
//! callers. Return, invalidate and teardown paths are fail-safe and swallow
//! secondary failures.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

use crate::spec::PoolKey;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes enough context for the caller to decide on a retry
/// policy: connection failures carry the pool key of the target they were
/// raised for, exhaustion carries the wait budget that elapsed.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Connection spec is invalid.
    ///
    /// Returned when a [`ConnectionSpec`](crate::spec::ConnectionSpec) fails
    /// validation, e.g. an SSH target without key material or password.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Server address could not be resolved.
    #[error("Failed to resolve {host}: {message}")]
    Resolve {
        /// The host that failed to resolve.
        host: String,
        /// Description of the resolution failure.
        message: String,
    },

    /// Connect, authentication or reconnect failure.
    ///
    /// Surfaced by `borrow` when a fresh connection cannot be established or
    /// a drift-triggered reconnect fails.
    #[error("Connection failed for {key}: {message}")]
    Connection {
        /// Pool key of the target the connection was for.
        key: PoolKey,
        /// Underlying transport error message.
        message: String,
    },

    // ========================================================================
    // Pool Errors
    // ========================================================================
    /// Borrow wait timeout elapsed with no free slot.
    #[error("Pool {key} exhausted after waiting {timeout_ms}ms")]
    Exhausted {
        /// Pool key of the exhausted pool.
        key: PoolKey,
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
    },

    /// Pool has been closed.
    ///
    /// Returned when borrowing from a pool that was removed or shut down.
    #[error("Pool {key} is closed")]
    PoolClosed {
        /// Pool key of the closed pool.
        key: PoolKey,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// Wire-level transport failure.
    ///
    /// Raised by [`TransportClient`](crate::transport::TransportClient)
    /// implementations for protocol-level failures that are not plain IO.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an address resolution error.
    #[inline]
    pub fn resolve(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolve {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Creates a connection error for the given pool key.
    #[inline]
    pub fn connection(key: PoolKey, message: impl Into<String>) -> Self {
        Self::Connection {
            key,
            message: message.into(),
        }
    }

    /// Creates a pool exhausted error.
    #[inline]
    pub fn exhausted(key: PoolKey, timeout_ms: u64) -> Self {
        Self::Exhausted { key, timeout_ms }
    }

    /// Creates a pool closed error.
    #[inline]
    pub fn pool_closed(key: PoolKey) -> Self {
        Self::PoolClosed { key }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection-level failure.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Resolve { .. } | Self::Connection { .. } | Self::Transport { .. } | Self::Io(_)
        )
    }

    /// Returns `true` if the pool had no free slot within the wait budget.
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Returns `true` if this error may succeed on retry.
    ///
    /// Configuration errors and closed pools are permanent; everything else
    /// depends on server/network state and is worth retrying.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Config { .. } | Self::PoolClosed { .. })
    }

    /// Returns the pool key this error was raised for, if any.
    #[inline]
    #[must_use]
    pub fn pool_key(&self) -> Option<&PoolKey> {
        match self {
            Self::Connection { key, .. }
            | Self::Exhausted { key, .. }
            | Self::PoolClosed { key } => Some(key),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
