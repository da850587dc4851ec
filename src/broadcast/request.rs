//! Validated broadcast request.
//!
//! Construction is the validation boundary: a `BroadcastRequest` that exists
//! is non-empty and within the length limit, so the dispatch engine trusts
//! it without re-checking.

use super::BroadcastError;

/// Maximum message length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Length of the truncated preview echoed back to the caller.
const PREVIEW_CHARS: usize = 100;

/// An operator-authored message body, validated and trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastRequest {
    body: String,
}

impl BroadcastRequest {
    /// Validate and build a request from raw input.
    ///
    /// The body is trimmed; an empty or whitespace-only message is rejected,
    /// as is anything over [`MAX_MESSAGE_CHARS`] characters.
    pub fn new(raw: &str) -> Result<Self, BroadcastError> {
        let body = raw.trim();
        if body.is_empty() {
            return Err(BroadcastError::EmptyMessage);
        }
        let len = body.chars().count();
        if len > MAX_MESSAGE_CHARS {
            return Err(BroadcastError::MessageTooLong { len });
        }
        Ok(Self {
            body: body.to_string(),
        })
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Truncated preview for responses: the first 100 characters, with an
    /// ellipsis when anything was cut.
    pub fn preview(&self) -> String {
        if self.body.chars().count() <= PREVIEW_CHARS {
            return self.body.clone();
        }
        let truncated: String = self.body.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", truncated)
    }
}
