//! Pool limits, eviction thresholds and validation flags.
//!
//! Defaults are tuned for interactive transfer workloads: a generous total
//! cap, a small idle reserve, aggressive idle eviction (stale control
//! connections are cheap to drop and expensive to trip over) and validation
//! on borrow.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use ftp_pool::PoolConfig;
//!
//! let config = PoolConfig::new()
//!     .with_max_total(8)
//!     .with_max_idle(2)
//!     .with_borrow_wait_timeout(Duration::from_secs(3));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// Defaults
// ============================================================================

/// Default cap on `active + idle` connections per key.
const DEFAULT_MAX_TOTAL: usize = 50;

/// Default cap on idle connections kept per key.
const DEFAULT_MAX_IDLE: usize = 10;

/// Default idle floor eviction will not reduce below.
const DEFAULT_MIN_IDLE: usize = 0;

/// Default period between eviction sweeps.
const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(30);

/// Default idle age beyond which a connection is evicted.
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default absolute connection lifetime. Zero disables the check.
const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(300);

/// Default budget a borrower waits for a free slot.
const DEFAULT_BORROW_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of idle connections examined per sweep.
const DEFAULT_NUM_TESTS_PER_EVICTION_RUN: usize = 3;

// ============================================================================
// PoolConfig
// ============================================================================

/// Configuration of one keyed pool.
///
/// A [`PoolRegistry`](crate::pool::PoolRegistry) carries a default config
/// applied to every new pool; a
/// [`ConnectionSpec`](crate::spec::ConnectionSpec) may override it per key
/// via `with_pool_config`. The registry's `eviction_interval` drives the
/// shared sweep scheduler; a zero interval disables background sweeping
/// (manual [`sweep`](crate::pool::KeyedPool::sweep) calls still work).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Cap on `active + idle` connections.
    pub max_total: usize,

    /// Cap on idle connections; returns beyond it destroy the connection.
    pub max_idle: usize,

    /// Idle floor that idle-timeout eviction will not reduce below.
    pub min_idle: usize,

    /// Period between background eviction sweeps. Zero disables them.
    pub eviction_interval: Duration,

    /// Idle age beyond which a connection is evicted.
    pub idle_timeout: Duration,

    /// Absolute age at which a connection always fails validation.
    /// Zero disables the lifetime check.
    pub max_lifetime: Duration,

    /// How long a borrower waits for a free slot before
    /// [`Error::Exhausted`](crate::error::Error::Exhausted).
    pub borrow_wait_timeout: Duration,

    /// Validate connections on borrow (liveness probe + lifetime).
    pub test_on_borrow: bool,

    /// Validate idle connections during eviction sweeps.
    pub test_while_idle: bool,

    /// Run the full validation probe before pooling a returned connection.
    /// Disconnected returns are always destroyed regardless of this flag.
    pub test_on_return: bool,

    /// Number of idle connections examined per sweep, bounding sweep cost.
    pub num_tests_per_eviction_run: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_total: DEFAULT_MAX_TOTAL,
            max_idle: DEFAULT_MAX_IDLE,
            min_idle: DEFAULT_MIN_IDLE,
            eviction_interval: DEFAULT_EVICTION_INTERVAL,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_lifetime: DEFAULT_MAX_LIFETIME,
            borrow_wait_timeout: DEFAULT_BORROW_WAIT_TIMEOUT,
            test_on_borrow: true,
            test_while_idle: true,
            test_on_return: false,
            num_tests_per_eviction_run: DEFAULT_NUM_TESTS_PER_EVICTION_RUN,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl PoolConfig {
    /// Creates a config with default limits.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cap on `active + idle` connections.
    #[inline]
    #[must_use]
    pub fn with_max_total(mut self, max_total: usize) -> Self {
        self.max_total = max_total;
        self
    }

    /// Sets the idle cap.
    #[inline]
    #[must_use]
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Sets the idle floor.
    #[inline]
    #[must_use]
    pub fn with_min_idle(mut self, min_idle: usize) -> Self {
        self.min_idle = min_idle;
        self
    }

    /// Sets the sweep period. Zero disables background sweeps.
    #[inline]
    #[must_use]
    pub fn with_eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = interval;
        self
    }

    /// Sets the idle age threshold.
    #[inline]
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the absolute lifetime. Zero disables the check.
    #[inline]
    #[must_use]
    pub fn with_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Sets the borrow wait budget.
    #[inline]
    #[must_use]
    pub fn with_borrow_wait_timeout(mut self, timeout: Duration) -> Self {
        self.borrow_wait_timeout = timeout;
        self
    }

    /// Enables or disables validation on borrow.
    #[inline]
    #[must_use]
    pub fn with_test_on_borrow(mut self, test: bool) -> Self {
        self.test_on_borrow = test;
        self
    }

    /// Enables or disables idle validation during sweeps.
    #[inline]
    #[must_use]
    pub fn with_test_while_idle(mut self, test: bool) -> Self {
        self.test_while_idle = test;
        self
    }

    /// Enables or disables the validation probe on return.
    #[inline]
    #[must_use]
    pub fn with_test_on_return(mut self, test: bool) -> Self {
        self.test_on_return = test;
        self
    }

    /// Sets the per-sweep examination quota.
    #[inline]
    #[must_use]
    pub fn with_num_tests_per_eviction_run(mut self, num_tests: usize) -> Self {
        self.num_tests_per_eviction_run = num_tests;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.max_total, 50);
        assert_eq!(config.max_idle, 10);
        assert_eq!(config.min_idle, 0);
        assert_eq!(config.eviction_interval, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert_eq!(config.max_lifetime, Duration::from_secs(300));
        assert_eq!(config.borrow_wait_timeout, Duration::from_secs(10));
        assert!(config.test_on_borrow);
        assert!(config.test_while_idle);
        assert!(!config.test_on_return);
        assert_eq!(config.num_tests_per_eviction_run, 3);
    }

    #[test]
    fn test_builder_chain() {
        let config = PoolConfig::new()
            .with_max_total(4)
            .with_max_idle(2)
            .with_min_idle(1)
            .with_idle_timeout(Duration::from_secs(5))
            .with_max_lifetime(Duration::ZERO)
            .with_borrow_wait_timeout(Duration::from_millis(200))
            .with_test_on_borrow(false)
            .with_test_on_return(true);

        assert_eq!(config.max_total, 4);
        assert_eq!(config.max_idle, 2);
        assert_eq!(config.min_idle, 1);
        assert_eq!(config.idle_timeout, Duration::from_secs(5));
        assert_eq!(config.max_lifetime, Duration::ZERO);
        assert_eq!(config.borrow_wait_timeout, Duration::from_millis(200));
        assert!(!config.test_on_borrow);
        assert!(config.test_on_return);
    }

    #[test]
    fn test_serde_round_trip_with_defaults() {
        // Partial documents fall back to defaults via #[serde(default)].
        let config: PoolConfig = serde_json::from_str(r#"{"max_total": 8}"#).unwrap();
        assert_eq!(config.max_total, 8);
        assert_eq!(config.max_idle, 10);

        let json = serde_json::to_string(&config).unwrap();
        let back: PoolConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
