//! Dispatch Engine
//!
//! Drives one broadcast run: take the recipient snapshot, send to each
//! recipient in order with pacing in between, tally outcomes, hand the
//! result to the audit log. Sends are strictly sequential on a single task;
//! the pacing is an anti-abuse requirement of the remote network, not a
//! performance knob, so it is never skipped or batched.

use super::audit::BroadcastAudit;
use super::request::BroadcastRequest;
use super::selector::RecipientSelector;
use super::BroadcastError;
use crate::clock::unix_now;
use crate::phone::mask_phone;
use crate::whatsapp::{ChatId, SessionHandle, SessionPhase, WaTransport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{info, warn};

/// One recipient the run could not deliver to. The phone number is masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryFailure {
    pub phone: String,
    pub reason: String,
}

/// Outcome of one broadcast run.
///
/// `success_count + failure_count == total_recipients` always holds.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastResult {
    pub total_recipients: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub failures: Vec<DeliveryFailure>,
    pub started_at: u64,
    pub completed_at: u64,
}

/// Sequential paced dispatcher. At most one run in flight process-wide.
pub struct DispatchEngine<T: WaTransport> {
    transport: Arc<T>,
    session: SessionHandle,
    selector: RecipientSelector,
    audit: BroadcastAudit,
    pacing: Duration,
    run_lock: Mutex<()>,
}

impl<T: WaTransport> DispatchEngine<T> {
    pub fn new(
        transport: Arc<T>,
        session: SessionHandle,
        selector: RecipientSelector,
        audit: BroadcastAudit,
        pacing: Duration,
    ) -> Self {
        Self {
            transport,
            session,
            selector,
            audit,
            pacing,
            run_lock: Mutex::new(()),
        }
    }

    /// Run one broadcast to completion.
    ///
    /// Fails up front with `NotReady` when the session is not ready and with
    /// `AlreadyRunning` when another run holds the lock — interleaving two
    /// sequential send loops would defeat the pacing guarantee. Once the
    /// loop starts it runs to the end: per-recipient failures are recorded
    /// in the result, never raised.
    pub async fn run(&self, request: &BroadcastRequest) -> Result<BroadcastResult, BroadcastError> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| BroadcastError::AlreadyRunning)?;

        if self.session.phase() != SessionPhase::Ready {
            return Err(BroadcastError::NotReady);
        }

        // Snapshot is fixed for the whole run.
        let recipients = self.selector.select().await?;
        let total = recipients.len();
        info!(total, "starting broadcast run");

        let started_at = unix_now();
        let mut success_count = 0usize;
        let mut failures = Vec::new();

        for (index, recipient) in recipients.iter().enumerate() {
            let chat = ChatId::from_phone(&recipient.phone);
            let masked = mask_phone(&recipient.phone);

            match self.transport.send_text(&chat, request.body()).await {
                Ok(()) => {
                    success_count += 1;
                    info!(to = %masked, "message sent");
                }
                Err(e) => {
                    warn!(to = %masked, error = %e, "delivery failed, continuing");
                    failures.push(DeliveryFailure {
                        phone: masked,
                        reason: e.to_string(),
                    });
                }
            }

            if index + 1 < total {
                sleep(self.pacing).await;
            }
        }

        let result = BroadcastResult {
            total_recipients: total,
            success_count,
            failure_count: failures.len(),
            failures,
            started_at,
            completed_at: unix_now(),
        };
        info!(
            total = result.total_recipients,
            sent = result.success_count,
            failed = result.failure_count,
            "broadcast completed"
        );

        self.audit.record(request.body(), &result).await;

        Ok(result)
    }
}
