//! Arauto - Outbound WhatsApp Broadcast Engine
//!
//! Maintains a long-lived session to the WhatsApp network and delivers a
//! single operator-authored message to every eligible contact, one at a time,
//! with pacing between sends and a durable audit record per run.
//!
//! Key principles:
//! - The wire transport is an injected capability (`whatsapp::WaTransport`),
//!   never reimplemented here
//! - One session and at most one broadcast run in flight at a time
//! - Per-recipient delivery failures never abort a run

mod clock;

pub mod broadcast;
pub mod phone;
pub mod service;
pub mod whatsapp;
