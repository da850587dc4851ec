//! WhatsApp Transport Trait Abstractions
//!
//! `WaTransport` models the underlying messaging client as an injected
//! capability: open a connection attempt, send a text, tear down. The
//! transport owns its credential material (persisted wherever the operator
//! configured) and reports connection progress through `LinkEvent`s.

use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;

use crate::phone::normalize_digits;

/// WhatsApp chat identifier: digits-only phone number plus the user suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatId(String);

impl ChatId {
    /// Build a chat id from a raw phone number.
    ///
    /// Non-numeric characters are stripped, not validated; a number that was
    /// garbage to begin with produces a chat id the remote side will reject,
    /// which surfaces as a per-recipient delivery failure.
    pub fn from_phone(phone: &str) -> Self {
        Self(format!("{}@c.us", normalize_digits(phone)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection-progress events emitted by the transport during and after an
/// `open()` attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A pairing token is available and must be shown to the operator.
    PairingToken(String),
    /// Credentials were accepted; readiness usually follows.
    Authenticated,
    /// The session is fully established and can send messages.
    Ready,
    /// Authentication failed; the attempt is over.
    AuthFailure(String),
    /// The remote side dropped the connection (network drop, remote logout).
    Disconnected(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("rejected by remote: {0}")]
    Rejected(String),

    #[error("connection error: {0}")]
    Connection(String),
}

/// WhatsApp client abstraction.
///
/// Implemented by the host over a real WhatsApp client library, and by
/// `MockTransport` in tests. The transport persists its own credential
/// material at an operator-configured path; this crate treats it as opaque.
#[async_trait]
pub trait WaTransport: Send + Sync + 'static {
    /// Begin a connection attempt.
    ///
    /// Returns a receiver of `LinkEvent`s for this attempt. The transport
    /// keeps emitting events (readiness, drops) for as long as the
    /// connection lives; dropping the sender ends the stream.
    async fn open(&self) -> TransportResult<mpsc::Receiver<LinkEvent>>;

    /// Send a text message to a single chat.
    async fn send_text(&self, chat: &ChatId, body: &str) -> TransportResult<()>;

    /// Tear down the connection. Must be safe to call when nothing is open.
    async fn close(&self) -> TransportResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_id_strips_formatting() {
        let chat = ChatId::from_phone("+55 (11) 99999-1234");
        assert_eq!(chat.as_str(), "5511999991234@c.us");
    }

    #[test]
    fn test_chat_id_keeps_plain_digits() {
        let chat = ChatId::from_phone("5511999991234");
        assert_eq!(chat.as_str(), "5511999991234@c.us");
    }

    #[test]
    fn test_chat_id_from_garbage_is_not_rejected() {
        // Malformed input still produces a chat id; the remote transport is
        // the one that rejects it, per-recipient.
        let chat = ChatId::from_phone("not-a-number");
        assert_eq!(chat.as_str(), "@c.us");
    }

    #[test]
    fn test_chat_id_display() {
        let chat = ChatId::from_phone("123456789");
        assert_eq!(chat.to_string(), "123456789@c.us");
    }
}
