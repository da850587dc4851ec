//! Broadcast Service Facade
//!
//! The narrow interface the host application talks to: preview, broadcast,
//! status, connect/disconnect, QR display, audit history. Explicitly
//! constructed with an injected transport and database pool; the host owns
//! its process-wide lifecycle. There is no global state.

use crate::broadcast::{
    AuditRecord, BroadcastAudit, BroadcastError, BroadcastPreview, BroadcastRequest,
    BroadcastResult, DispatchEngine, RecipientSelector, DEFAULT_PACING,
};
use crate::whatsapp::{ConnectOutcome, SessionError, SessionHandle, SessionManager, SessionPhase, WaTransport};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Service tuning. `Default` uses the standard anti-abuse pacing.
#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
    /// Delay between consecutive sends; also drives the preview ETA.
    pub pacing: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pacing: DEFAULT_PACING,
        }
    }
}

/// Connection status as reported to operators.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub status_text: &'static str,
    pub is_ready: bool,
    pub is_connecting: bool,
    pub has_pairing_token: bool,
    pub failure_reason: Option<String>,
    pub last_transition_at: u64,
}

/// What to show when the operator asks for the pairing QR code.
#[derive(Debug, Clone)]
pub enum QrView {
    /// A pairing token is waiting to be scanned.
    Pairing { token: String },
    /// Nothing to scan; show the session status instead.
    NotPairing { status: SessionStatus },
}

/// Outcome of a broadcast call: the full result plus the truncated message
/// preview echoed back to the caller.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BroadcastReport {
    pub message_preview: String,
    pub result: BroadcastResult,
}

/// The broadcast engine behind one WhatsApp session.
pub struct BroadcastService<T: WaTransport> {
    session: SessionManager<T>,
    engine: DispatchEngine<T>,
    selector: RecipientSelector,
    audit: BroadcastAudit,
}

impl<T: WaTransport> BroadcastService<T> {
    pub fn new(transport: Arc<T>, pool: SqlitePool, config: ServiceConfig) -> Self {
        let session = SessionManager::new(transport.clone());
        let selector = RecipientSelector::new(pool.clone(), config.pacing);
        let audit = BroadcastAudit::new(pool);
        let engine = DispatchEngine::new(
            transport,
            session.handle(),
            selector.clone(),
            audit.clone(),
            config.pacing,
        );
        Self {
            session,
            engine,
            selector,
            audit,
        }
    }

    /// Create the audit schema. Call once at startup.
    pub async fn init_storage(&self) -> Result<(), sqlx::Error> {
        self.audit.ensure_schema().await
    }

    /// Start a connection attempt (no-op when already connecting/connected).
    pub async fn connect(&self) -> Result<ConnectOutcome, SessionError> {
        self.session.connect().await
    }

    /// Tear the session down. Safe when nothing is connected.
    pub async fn disconnect(&self) {
        self.session.disconnect().await
    }

    /// Eligible-recipient counts, tier breakdown and ETA.
    pub async fn preview(&self) -> Result<BroadcastPreview, sqlx::Error> {
        self.selector.preview().await
    }

    /// Validate and run one broadcast.
    ///
    /// Validation failures never reach the engine; `NotReady` is
    /// distinguishable (`BroadcastError::is_unavailable`) so the host can
    /// answer "scan the QR code again" instead of a generic failure.
    pub async fn broadcast(&self, raw_message: &str) -> Result<BroadcastReport, BroadcastError> {
        let request = BroadcastRequest::new(raw_message)?;
        let result = self.engine.run(&request).await?;
        Ok(BroadcastReport {
            message_preview: request.preview(),
            result,
        })
    }

    /// Current session status.
    pub fn status(&self) -> SessionStatus {
        let session = self.session.handle().snapshot();
        let (status_text, is_connecting) = match session.phase {
            SessionPhase::Ready => ("Connected", false),
            SessionPhase::Initializing | SessionPhase::AwaitingScan => ("Connecting...", true),
            SessionPhase::Disconnected | SessionPhase::Failed => ("Disconnected", false),
        };
        SessionStatus {
            phase: session.phase,
            status_text,
            is_ready: session.phase == SessionPhase::Ready,
            is_connecting,
            has_pairing_token: session.pairing_token.is_some(),
            failure_reason: session.failure_reason,
            last_transition_at: session.last_transition_at,
        }
    }

    /// Pairing view for the QR endpoint.
    pub fn qr_view(&self) -> QrView {
        let session = self.session.handle().snapshot();
        match (session.phase, session.pairing_token) {
            (SessionPhase::AwaitingScan, Some(token)) => QrView::Pairing { token },
            _ => QrView::NotPairing {
                status: self.status(),
            },
        }
    }

    /// Recent audit records, newest first.
    pub async fn history(&self, limit: u32) -> Result<Vec<AuditRecord>, sqlx::Error> {
        self.audit.recent(limit).await
    }

    /// Read-only session handle (phase waits, snapshots).
    pub fn session(&self) -> SessionHandle {
        self.session.handle()
    }
}

/// Render a QR view on the terminal for the operator to scan.
pub fn render_qr(view: &QrView) {
    match view {
        QrView::Pairing { token } => {
            println!("📱 Scan this QR code with WhatsApp on your phone:");
            println!("   WhatsApp → Settings → Linked Devices → Link a Device");
            println!();
            if let Err(e) = qr2term::print_qr(token) {
                eprintln!("⚠️  Failed to render QR code: {}", e);
                println!("Use this pairing code instead: {}", token);
            }
        }
        QrView::NotPairing { status } => {
            println!(
                "No pairing code to display (session is {}).",
                status.status_text
            );
        }
    }
}
