//! WhatsApp Transport Integration
//!
//! The wire protocol is an opaque capability supplied by the host: this
//! module defines the `WaTransport` trait, the connection events it emits,
//! and the session state machine that turns those events into an observable
//! phase. `MockTransport` covers the whole surface in tests without a real
//! network.

pub mod mock;
pub mod session;
pub mod traits;

pub use mock::MockTransport;
pub use session::{
    ConnectOutcome, Session, SessionError, SessionHandle, SessionManager, SessionPhase,
};
pub use traits::{ChatId, LinkEvent, TransportError, TransportResult, WaTransport};
