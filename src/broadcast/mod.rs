//! Outbound Broadcast Engine
//!
//! Selects the eligible recipients, sends one operator-authored message to
//! each of them sequentially with pacing in between, and records one
//! append-only audit row per run. Partial failure of a recipient never stops
//! delivery to the rest.

pub mod audit;
pub mod engine;
pub mod request;
pub mod selector;

pub use audit::{AuditRecord, BroadcastAudit};
pub use engine::{BroadcastResult, DeliveryFailure, DispatchEngine};
pub use request::{BroadcastRequest, MAX_MESSAGE_CHARS};
pub use selector::{
    estimate_duration, BroadcastPreview, EngagementTier, Recipient, RecipientSelector,
    TierBreakdown,
};

use std::time::Duration;

/// Fixed delay between consecutive sends.
///
/// Rate-shaping demanded by the remote network: sending faster gets the
/// account flagged for abuse. The preview ETA is computed from this same
/// value so the estimate and the real pacing cannot drift apart.
pub const DEFAULT_PACING: Duration = Duration::from_secs(2);

/// Broadcast errors surfaced to the caller.
///
/// Per-recipient delivery failures are not here: they are captured inside
/// the run's [`BroadcastResult`] and never abort the batch.
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("message cannot be empty")]
    EmptyMessage,

    #[error("message is too long ({len} characters, max {max})", max = MAX_MESSAGE_CHARS)]
    MessageTooLong { len: usize },

    #[error("session is not ready, connect and scan the pairing code first")]
    NotReady,

    #[error("another broadcast is already in flight")]
    AlreadyRunning,

    #[error("contact store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl BroadcastError {
    /// Retry-later conditions. The host maps these to a 503-equivalent,
    /// distinct from validation (client) and internal (server) errors.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::NotReady | Self::AlreadyRunning)
    }

    /// Bad input, never retried.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyMessage | Self::MessageTooLong { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(BroadcastError::NotReady.is_unavailable());
        assert!(BroadcastError::AlreadyRunning.is_unavailable());
        assert!(!BroadcastError::EmptyMessage.is_unavailable());

        assert!(BroadcastError::EmptyMessage.is_validation());
        assert!(BroadcastError::MessageTooLong { len: 5000 }.is_validation());
        assert!(!BroadcastError::NotReady.is_validation());
    }

    #[test]
    fn test_too_long_message_names_the_limit() {
        let message = BroadcastError::MessageTooLong { len: 5000 }.to_string();
        assert!(message.contains("5000"));
        assert!(message.contains("4096"));
    }
}
