use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::keyboard::{remove_keyboard, yes_no_keyboard, ReplyMarkup};
use crate::updates::InboundTurn;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport poll failed: {0}")]
    Receive(String),
    #[error("transport send failed: {0}")]
    Send(String),
}

/// What to do with the quick-reply keyboard alongside an outbound text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyboardAction {
    None,
    YesNo,
    Remove,
}

impl KeyboardAction {
    pub fn to_markup(self) -> Option<ReplyMarkup> {
        match self {
            Self::None => None,
            Self::YesNo => Some(yes_no_keyboard()),
            Self::Remove => Some(remove_keyboard()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: KeyboardAction,
}

/// The wire side of the bot. `next_turns` blocks on the long poll;
/// `Ok(None)` means the update stream is closed and the poller should stop.
#[async_trait]
pub trait TelegramTransport: Send + Sync {
    async fn next_turns(&self) -> Result<Option<Vec<InboundTurn>>, TransportError>;
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopTransport;

#[async_trait]
impl TelegramTransport for NoopTransport {
    async fn next_turns(&self) -> Result<Option<Vec<InboundTurn>>, TransportError> {
        Ok(None)
    }

    async fn send(&self, _message: &OutboundMessage) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Turn processing behind the transport loop; implemented by the server's
/// adapter around the dialog runtime.
#[async_trait]
pub trait TurnHandler: Send + Sync {
    async fn handle_turn(&self, turn: &InboundTurn) -> Vec<OutboundMessage>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

pub struct UpdatePoller {
    transport: Arc<dyn TelegramTransport>,
    handler: Arc<dyn TurnHandler>,
    reconnect_policy: ReconnectPolicy,
}

impl UpdatePoller {
    pub fn new(
        transport: Arc<dyn TelegramTransport>,
        handler: Arc<dyn TurnHandler>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, handler, reconnect_policy }
    }

    /// Pumps the long poll until the stream closes. Consecutive transport
    /// failures back off exponentially; exhausting the retry budget degrades
    /// gracefully instead of crashing the process.
    pub async fn start(&self) -> Result<()> {
        let mut consecutive_failures = 0u32;

        loop {
            match self.transport.next_turns().await {
                Ok(None) => {
                    info!("telegram update stream closed");
                    return Ok(());
                }
                Ok(Some(turns)) => {
                    consecutive_failures = 0;
                    for turn in &turns {
                        self.process_turn(turn).await;
                    }
                }
                Err(transport_error) => {
                    warn!(
                        attempt = consecutive_failures,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "telegram long poll failed"
                    );

                    if consecutive_failures >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "long poll retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(consecutive_failures);
                    consecutive_failures += 1;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    async fn process_turn(&self, turn: &InboundTurn) {
        debug!(chat_id = turn.chat_id, "processing inbound turn");

        let replies = self.handler.handle_turn(turn).await;
        for reply in &replies {
            if let Err(error) = self.transport.send(reply).await {
                // A failed send drops this reply only; the user re-sending is
                // the retry mechanism.
                warn!(chat_id = reply.chat_id, error = %error, "failed to send reply");
            }
        }
    }
}
