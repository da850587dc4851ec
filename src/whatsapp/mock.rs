//! Mock WhatsApp Transport for Testing
//!
//! Provides `MockTransport` for full session and dispatch coverage without a
//! real WhatsApp connection. Link events are scripted per `open()` call, and
//! individual recipients can be made to fail delivery.

use super::traits::*;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Mock transport for testing.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    script: Vec<LinkEvent>,
    open_count: u32,
    open_failure: Option<String>,
    sent: Vec<SentText>,
    failing: HashSet<String>,
    live_tx: Option<mpsc::Sender<LinkEvent>>,
    close_count: u32,
}

/// A text message recorded by the mock.
#[derive(Debug, Clone)]
pub struct SentText {
    pub chat: ChatId,
    pub body: String,
}

impl MockTransport {
    /// Create a mock whose `open()` emits no events at all.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Create a mock that authenticates with a stored credential: `open()`
    /// goes straight to `Ready`.
    pub fn ready() -> Self {
        Self::with_script(vec![LinkEvent::Authenticated, LinkEvent::Ready])
    }

    /// Create a mock that requires pairing: `open()` emits a pairing token
    /// and then waits for `emit()`.
    pub fn pairing(token: &str) -> Self {
        Self::with_script(vec![LinkEvent::PairingToken(token.to_string())])
    }

    /// Create a mock that replays the given events on every `open()`.
    pub fn with_script(script: Vec<LinkEvent>) -> Self {
        let mock = Self::new();
        mock.state.lock().unwrap().script = script;
        mock
    }

    /// Make the next `open()` calls fail with a connection error.
    pub fn fail_open(&self, reason: &str) {
        self.state.lock().unwrap().open_failure = Some(reason.to_string());
    }

    /// Make deliveries to the given phone number fail with a network error.
    pub fn fail_delivery_to(&self, phone: &str) {
        let chat = ChatId::from_phone(phone);
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(chat.as_str().to_string());
    }

    /// Emit a link event on the currently open connection.
    ///
    /// Returns false if no connection is open or the receiver is gone.
    pub async fn emit(&self, event: LinkEvent) -> bool {
        let tx = self.state.lock().unwrap().live_tx.clone();
        match tx {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Number of `open()` calls so far.
    pub fn open_count(&self) -> u32 {
        self.state.lock().unwrap().open_count
    }

    /// Number of `close()` calls so far.
    pub fn close_count(&self) -> u32 {
        self.state.lock().unwrap().close_count
    }

    /// Messages recorded so far, for assertions.
    pub fn sent_texts(&self) -> Vec<SentText> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Clear all recorded state.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        *state = MockState::default();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WaTransport for MockTransport {
    async fn open(&self) -> TransportResult<mpsc::Receiver<LinkEvent>> {
        let mut state = self.state.lock().unwrap();
        state.open_count += 1;

        if let Some(reason) = &state.open_failure {
            return Err(TransportError::Connection(reason.clone()));
        }

        let (tx, rx) = mpsc::channel(state.script.len().max(8));
        for event in state.script.clone() {
            // Capacity covers the whole script, so this cannot fail.
            let _ = tx.try_send(event);
        }
        state.live_tx = Some(tx);

        Ok(rx)
    }

    async fn send_text(&self, chat: &ChatId, body: &str) -> TransportResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing.contains(chat.as_str()) {
            return Err(TransportError::Network("simulated send failure".to_string()));
        }
        state.sent.push(SentText {
            chat: chat.clone(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn close(&self) -> TransportResult<()> {
        let mut state = self.state.lock().unwrap();
        state.close_count += 1;
        // Dropping the sender ends the event stream for the open attempt.
        state.live_tx = None;
        Ok(())
    }
}
