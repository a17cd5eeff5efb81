//! Transport capability layer.
//!
//! The pool never talks a wire protocol itself. It drives transports through
//! the capability traits in this module, and transport crates (FTP, FTPS,
//! SFTP, or anything session-shaped) plug in underneath.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   borrow/release    ┌───────────────────┐
//! │   KeyedPool  │────────────────────►│  TransportClient  │
//! │              │                     │  (your impl)      │
//! │ ClientFactory│──open(spec, addr)──►│ TransportConnector│
//! └──────────────┘                     └───────────────────┘
//! ```
//!
//! # Contract
//!
//! | Capability | Used for |
//! |------------|----------|
//! | `connect` / `disconnect` / `quit` | lifecycle + graceful teardown |
//! | `is_connected` / `send_noop` | validation (test-on-borrow, test-while-idle) |
//! | `apply_settings` / `set_transfer_mode` | activation + drift reconnect |
//!
//! Implementations must be cancel-safe at `.await` points; the pool may drop
//! a client mid-call only when a borrower abandons its checkout guard.

// ============================================================================
// Submodules
// ============================================================================

/// Transport capability traits.
pub mod client;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::{ProxyContext, TransportClient, TransportConnector};
