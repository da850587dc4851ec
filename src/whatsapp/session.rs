//! WhatsApp Session State Machine
//!
//! Owns the connection lifecycle: initialization, pairing/QR exchange,
//! readiness, teardown. All mutation funnels through a single locked entry
//! point (`apply`) driven by an explicit input-to-transition table; the pump
//! task that drains transport events is its only asynchronous caller.
//!
//! Phase changes are the only externally visible signal. Readers always get
//! an atomic snapshot of the whole session, never a torn phase/token pair.

use super::traits::{LinkEvent, TransportError, WaTransport};
use crate::clock::unix_now;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Connection phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// Initial state; also re-entered on teardown or network drop.
    Disconnected,
    /// A connection attempt is underway.
    Initializing,
    /// A pairing token is available and must be scanned by the operator.
    AwaitingScan,
    /// Authenticated and able to send messages.
    Ready,
    /// The last connection attempt failed; a fresh `connect()` is required.
    Failed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Disconnected => "disconnected",
            SessionPhase::Initializing => "initializing",
            SessionPhase::AwaitingScan => "awaiting-scan",
            SessionPhase::Ready => "ready",
            SessionPhase::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Atomic snapshot of the session.
#[derive(Debug, Clone)]
pub struct Session {
    pub phase: SessionPhase,
    /// Present only while `AwaitingScan`.
    pub pairing_token: Option<String>,
    /// Present only while `Failed`.
    pub failure_reason: Option<String>,
    pub last_transition_at: u64,
}

impl Session {
    fn new() -> Self {
        Self {
            phase: SessionPhase::Disconnected,
            pairing_token: None,
            failure_reason: None,
            last_transition_at: unix_now(),
        }
    }
}

/// Outcome of a `connect()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new connection attempt was started.
    Started,
    /// The session was already connecting or connected; nothing was done.
    AlreadyActive,
}

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("transport connection failed: {0}")]
    Transport(#[from] TransportError),
}

/// Inputs to the state machine: the two operator operations plus every
/// transport event. `transition` is the whole mapping table.
#[derive(Debug)]
enum Input {
    Connect,
    Teardown,
    Link(LinkEvent),
}

/// Pure transition table. `None` means the input does not change the phase.
fn transition(phase: SessionPhase, input: &Input) -> Option<SessionPhase> {
    use SessionPhase::*;

    match (phase, input) {
        (Disconnected | Failed, Input::Connect) => Some(Initializing),
        (_, Input::Connect) => None,

        (Disconnected, Input::Teardown) => None,
        (_, Input::Teardown) => Some(Disconnected),

        (Initializing | AwaitingScan, Input::Link(LinkEvent::PairingToken(_))) => {
            Some(AwaitingScan)
        }
        (Initializing | AwaitingScan, Input::Link(LinkEvent::Ready)) => Some(Ready),
        // Auth failure ends the attempt from any live state.
        (Initializing | AwaitingScan | Ready, Input::Link(LinkEvent::AuthFailure(_))) => {
            Some(Failed)
        }
        // Network drops only matter while something is live; a Failed attempt
        // stays visible as Failed.
        (Initializing | AwaitingScan | Ready, Input::Link(LinkEvent::Disconnected(_))) => {
            Some(Disconnected)
        }
        (_, Input::Link(_)) => None,
    }
}

struct Shared {
    session: Mutex<Session>,
    phase_tx: watch::Sender<SessionPhase>,
}

/// The single mutation entry point. Applies the transition table under the
/// lock and updates token/reason bookkeeping for the new phase.
///
/// Returns the new phase when a transition happened.
fn apply(shared: &Shared, input: Input) -> Option<SessionPhase> {
    let mut session = shared.session.lock().unwrap();

    let Some(next) = transition(session.phase, &input) else {
        match input {
            Input::Link(LinkEvent::Authenticated) => info!("transport authenticated"),
            Input::Connect => {
                warn!(phase = %session.phase, "connect ignored, session already active")
            }
            _ => debug!(?input, phase = %session.phase, "ignoring input with no transition"),
        }
        return None;
    };

    match &input {
        Input::Connect => {
            session.pairing_token = None;
            session.failure_reason = None;
            info!("opening session");
        }
        Input::Teardown => {
            session.pairing_token = None;
            session.failure_reason = None;
            info!("session disconnected");
        }
        Input::Link(LinkEvent::PairingToken(token)) => {
            session.pairing_token = Some(token.clone());
            info!("pairing token received, awaiting scan");
        }
        Input::Link(LinkEvent::Ready) => {
            session.pairing_token = None;
            session.failure_reason = None;
            info!("session ready");
        }
        Input::Link(LinkEvent::AuthFailure(reason)) => {
            session.pairing_token = None;
            session.failure_reason = Some(reason.clone());
            error!(%reason, "authentication failed");
        }
        Input::Link(LinkEvent::Disconnected(reason)) => {
            session.pairing_token = None;
            warn!(%reason, "transport disconnected");
        }
        Input::Link(LinkEvent::Authenticated) => {}
    }

    session.phase = next;
    session.last_transition_at = unix_now();
    shared.phase_tx.send_replace(next);

    Some(next)
}

/// Read-only view of the session, shared with the dispatch engine and any
/// status consumer. Cheap to clone.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    /// Atomic snapshot of the whole session.
    pub fn snapshot(&self) -> Session {
        self.shared.session.lock().unwrap().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.shared.session.lock().unwrap().phase
    }

    pub fn pairing_token(&self) -> Option<String> {
        self.shared.session.lock().unwrap().pairing_token.clone()
    }

    /// Wait until the session reaches the given phase.
    ///
    /// Returns false if the timeout elapses first.
    pub async fn wait_for(&self, phase: SessionPhase, timeout: Duration) -> bool {
        let mut rx = self.shared.phase_tx.subscribe();
        if *rx.borrow() == phase {
            return true;
        }
        tokio::time::timeout(timeout, async {
            while rx.changed().await.is_ok() {
                if *rx.borrow() == phase {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap_or(false)
    }
}

/// Owns the transport connection lifecycle.
///
/// Exactly one instance exists per service. Concurrent `connect()` calls are
/// rejected as a warning no-op, never queued.
pub struct SessionManager<T: WaTransport> {
    transport: Arc<T>,
    shared: Arc<Shared>,
}

impl<T: WaTransport> SessionManager<T> {
    pub fn new(transport: Arc<T>) -> Self {
        let (phase_tx, _) = watch::channel(SessionPhase::Disconnected);
        Self {
            transport,
            shared: Arc::new(Shared {
                session: Mutex::new(Session::new()),
                phase_tx,
            }),
        }
    }

    /// Read-only handle for status readers and the dispatch engine.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: self.shared.clone(),
        }
    }

    /// Start a connection attempt.
    ///
    /// Legal from `Disconnected` and `Failed`. While already connecting or
    /// connected this is a no-op returning `AlreadyActive`; two rapid calls
    /// produce exactly one underlying `open()`. The phase moves to
    /// `Initializing` synchronously, then asynchronously to `AwaitingScan`
    /// (pairing token to display) or straight to `Ready` if the stored
    /// credential is still valid.
    pub async fn connect(&self) -> Result<ConnectOutcome, SessionError> {
        if apply(&self.shared, Input::Connect).is_none() {
            return Ok(ConnectOutcome::AlreadyActive);
        }

        let mut events = match self.transport.open().await {
            Ok(events) => events,
            Err(e) => {
                apply(&self.shared, Input::Link(LinkEvent::AuthFailure(e.to_string())));
                return Err(SessionError::Transport(e));
            }
        };

        let shared = self.shared.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                apply(&shared, Input::Link(event));
            }
        });

        Ok(ConnectOutcome::Started)
    }

    /// Tear down the connection and return to `Disconnected`.
    ///
    /// Safe to call when nothing is connected: the phase stays
    /// `Disconnected` and nothing else changes.
    pub async fn disconnect(&self) {
        if let Err(e) = self.transport.close().await {
            warn!(error = %e, "transport close failed during teardown");
        }
        apply(&self.shared, Input::Teardown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::whatsapp::mock::MockTransport;

    const WAIT: Duration = Duration::from_secs(2);

    fn manager(mock: &MockTransport) -> SessionManager<MockTransport> {
        SessionManager::new(Arc::new(mock.clone()))
    }

    #[test]
    fn test_transition_table_connect() {
        use SessionPhase::*;

        assert_eq!(transition(Disconnected, &Input::Connect), Some(Initializing));
        assert_eq!(transition(Failed, &Input::Connect), Some(Initializing));
        assert_eq!(transition(Initializing, &Input::Connect), None);
        assert_eq!(transition(AwaitingScan, &Input::Connect), None);
        assert_eq!(transition(Ready, &Input::Connect), None);
    }

    #[test]
    fn test_transition_table_link_events() {
        use SessionPhase::*;

        let token = Input::Link(LinkEvent::PairingToken("tok".into()));
        assert_eq!(transition(Initializing, &token), Some(AwaitingScan));
        assert_eq!(transition(AwaitingScan, &token), Some(AwaitingScan));
        assert_eq!(transition(Ready, &token), None);
        assert_eq!(transition(Disconnected, &token), None);

        let ready = Input::Link(LinkEvent::Ready);
        assert_eq!(transition(Initializing, &ready), Some(Ready));
        assert_eq!(transition(AwaitingScan, &ready), Some(Ready));
        assert_eq!(transition(Disconnected, &ready), None);

        let auth_failure = Input::Link(LinkEvent::AuthFailure("denied".into()));
        assert_eq!(transition(Initializing, &auth_failure), Some(Failed));
        assert_eq!(transition(Ready, &auth_failure), Some(Failed));
        assert_eq!(transition(Failed, &auth_failure), None);

        let dropped = Input::Link(LinkEvent::Disconnected("gone".into()));
        assert_eq!(transition(Ready, &dropped), Some(Disconnected));
        // A failed attempt stays visible as Failed.
        assert_eq!(transition(Failed, &dropped), None);
    }

    #[test]
    fn test_transition_table_teardown() {
        use SessionPhase::*;

        for phase in [Initializing, AwaitingScan, Ready, Failed] {
            assert_eq!(transition(phase, &Input::Teardown), Some(Disconnected));
        }
        assert_eq!(transition(Disconnected, &Input::Teardown), None);
    }

    #[tokio::test]
    async fn test_connect_reaches_ready_with_stored_credential() {
        let mock = MockTransport::ready();
        let mgr = manager(&mock);

        let outcome = mgr.connect().await.unwrap();
        assert_eq!(outcome, ConnectOutcome::Started);
        assert!(mgr.handle().wait_for(SessionPhase::Ready, WAIT).await);

        let session = mgr.handle().snapshot();
        assert_eq!(session.phase, SessionPhase::Ready);
        assert!(session.pairing_token.is_none());
    }

    #[tokio::test]
    async fn test_connect_exposes_pairing_token() {
        let mock = MockTransport::pairing("2@abc123");
        let mgr = manager(&mock);

        mgr.connect().await.unwrap();
        assert!(mgr.handle().wait_for(SessionPhase::AwaitingScan, WAIT).await);
        assert_eq!(mgr.handle().pairing_token().as_deref(), Some("2@abc123"));

        // Operator scans; the transport reports readiness.
        mock.emit(LinkEvent::Authenticated).await;
        mock.emit(LinkEvent::Ready).await;
        assert!(mgr.handle().wait_for(SessionPhase::Ready, WAIT).await);
        assert!(mgr.handle().pairing_token().is_none());
    }

    #[tokio::test]
    async fn test_double_connect_opens_once() {
        let mock = MockTransport::pairing("2@abc123");
        let mgr = manager(&mock);

        let first = mgr.connect().await.unwrap();
        let second = mgr.connect().await.unwrap();

        assert_eq!(first, ConnectOutcome::Started);
        assert_eq!(second, ConnectOutcome::AlreadyActive);
        assert_eq!(mock.open_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_rejected_while_ready() {
        let mock = MockTransport::ready();
        let mgr = manager(&mock);

        mgr.connect().await.unwrap();
        assert!(mgr.handle().wait_for(SessionPhase::Ready, WAIT).await);

        let outcome = mgr.connect().await.unwrap();
        assert_eq!(outcome, ConnectOutcome::AlreadyActive);
        assert_eq!(mock.open_count(), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_is_terminal_until_reconnect() {
        let mock = MockTransport::with_script(vec![LinkEvent::AuthFailure("expired".into())]);
        let mgr = manager(&mock);

        mgr.connect().await.unwrap();
        assert!(mgr.handle().wait_for(SessionPhase::Failed, WAIT).await);
        assert_eq!(
            mgr.handle().snapshot().failure_reason.as_deref(),
            Some("expired")
        );

        // A fresh connect is legal from Failed.
        let outcome = mgr.connect().await.unwrap();
        assert_eq!(outcome, ConnectOutcome::Started);
        assert_eq!(mock.open_count(), 2);
    }

    #[tokio::test]
    async fn test_open_failure_lands_in_failed() {
        let mock = MockTransport::new();
        mock.fail_open("no route to host");
        let mgr = manager(&mock);

        let result = mgr.connect().await;
        assert!(matches!(result, Err(SessionError::Transport(_))));
        assert_eq!(mgr.handle().phase(), SessionPhase::Failed);
    }

    #[tokio::test]
    async fn test_external_drop_returns_to_disconnected() {
        let mock = MockTransport::ready();
        let mgr = manager(&mock);

        mgr.connect().await.unwrap();
        assert!(mgr.handle().wait_for(SessionPhase::Ready, WAIT).await);

        mock.emit(LinkEvent::Disconnected("remote logout".into())).await;
        assert!(mgr.handle().wait_for(SessionPhase::Disconnected, WAIT).await);
    }

    #[tokio::test]
    async fn test_disconnect_is_a_noop_when_already_disconnected() {
        let mock = MockTransport::new();
        let mgr = manager(&mock);

        let before = mgr.handle().snapshot();
        mgr.disconnect().await;
        let after = mgr.handle().snapshot();

        assert_eq!(after.phase, SessionPhase::Disconnected);
        assert_eq!(after.last_transition_at, before.last_transition_at);
    }

    #[tokio::test]
    async fn test_disconnect_tears_down_live_session() {
        let mock = MockTransport::ready();
        let mgr = manager(&mock);

        mgr.connect().await.unwrap();
        assert!(mgr.handle().wait_for(SessionPhase::Ready, WAIT).await);

        mgr.disconnect().await;
        assert_eq!(mgr.handle().phase(), SessionPhase::Disconnected);
        assert_eq!(mock.close_count(), 1);
    }
}
