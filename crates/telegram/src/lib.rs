//! Telegram integration - long-poll bot interface
//!
//! This crate provides the chat surface for haulbot:
//! - **Updates** (`updates`) - Bot API wire types and the inbound turn model
//! - **Keyboards** (`keyboard`) - one-time YES/NO quick replies and removal
//! - **Poller** (`poller`) - the long-poll loop with reconnect/backoff
//!
//! The reqwest-backed Bot API client lives in the server crate; everything
//! here works against the `TelegramTransport` trait so the loop and the
//! parsing are testable without a network.

pub mod keyboard;
pub mod poller;
pub mod updates;
