use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::warn;

use haulbot_agent::runtime::MembershipGate;
use haulbot_core::config::TelegramConfig;
use haulbot_telegram::poller::{OutboundMessage, TelegramTransport, TransportError};
use haulbot_telegram::updates::{ChatMember, InboundTurn, Update};

/// Thin reqwest client for the Telegram Bot API: long-poll `getUpdates`,
/// `sendMessage`, and the `getChatMember` membership probe.
pub struct BotApi {
    client: Client,
    base_url: String,
    token: SecretString,
    poll_timeout_secs: u64,
    /// Next `getUpdates` offset; advancing it acknowledges everything below.
    offset: Mutex<i64>,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

impl BotApi {
    pub fn new(config: &TelegramConfig) -> Result<Self, reqwest::Error> {
        // The HTTP timeout must outlast the long poll itself.
        let client =
            Client::builder().timeout(Duration::from_secs(config.poll_timeout_secs + 10)).build()?;

        Ok(Self {
            client,
            base_url: "https://api.telegram.org".to_string(),
            token: config.bot_token.clone(),
            poll_timeout_secs: config.poll_timeout_secs,
            offset: Mutex::new(0),
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token.expose_secret())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, TransportError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Receive(format!("{method} returned {status}")));
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|error| TransportError::Receive(error.to_string()))?;

        if !envelope.ok {
            let description = envelope.description.unwrap_or_else(|| "no description".to_string());
            return Err(TransportError::Receive(format!("{method} not ok: {description}")));
        }

        envelope
            .result
            .ok_or_else(|| TransportError::Receive(format!("{method} returned no result")))
    }

    pub async fn get_chat_member(
        &self,
        chat_id: &str,
        user_id: i64,
    ) -> Result<ChatMember, TransportError> {
        self.call("getChatMember", json!({ "chat_id": chat_id, "user_id": user_id })).await
    }
}

#[async_trait]
impl TelegramTransport for BotApi {
    async fn next_turns(&self) -> Result<Option<Vec<InboundTurn>>, TransportError> {
        let offset = *self.offset.lock().await;
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                json!({
                    "offset": offset,
                    "timeout": self.poll_timeout_secs,
                    "allowed_updates": ["message"],
                }),
            )
            .await?;

        if let Some(max_id) = updates.iter().map(|update| update.update_id).max() {
            *self.offset.lock().await = max_id + 1;
        }

        Ok(Some(updates.iter().filter_map(InboundTurn::from_update).collect()))
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let mut body = json!({ "chat_id": message.chat_id, "text": message.text });
        if let Some(markup) = message.keyboard.to_markup() {
            body["reply_markup"] = serde_json::to_value(markup)
                .map_err(|error| TransportError::Send(error.to_string()))?;
        }

        let _: serde_json::Value = self
            .call("sendMessage", body)
            .await
            .map_err(|error| TransportError::Send(error.to_string()))?;
        Ok(())
    }
}

/// Membership gate backed by `getChatMember` against the configured private
/// channel. Fails closed: any API trouble reads as "not a member".
pub struct ChannelMembershipGate {
    api: Arc<BotApi>,
    channel_id: String,
}

impl ChannelMembershipGate {
    pub fn new(api: Arc<BotApi>, channel_id: String) -> Self {
        Self { api, channel_id }
    }
}

#[async_trait]
impl MembershipGate for ChannelMembershipGate {
    async fn is_member(&self, user_id: i64) -> bool {
        match self.api.get_chat_member(&self.channel_id, user_id).await {
            Ok(member) => member.counts_as_member(),
            Err(error) => {
                warn!(user_id, %error, "membership check failed; refusing conversation");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use haulbot_core::config::TelegramConfig;

    use super::BotApi;

    fn config() -> TelegramConfig {
        TelegramConfig {
            bot_token: String::from("123456:test-token").into(),
            channel_id: "-1000000000000".to_string(),
            poll_timeout_secs: 30,
        }
    }

    #[test]
    fn method_urls_embed_the_token_and_method() {
        let api = BotApi::new(&config())
            .expect("client should build")
            .with_base_url("http://127.0.0.1:9999");

        assert_eq!(
            api.method_url("sendMessage"),
            "http://127.0.0.1:9999/bot123456:test-token/sendMessage"
        );
    }

    #[tokio::test]
    async fn unreachable_api_surfaces_a_transport_error_not_a_panic() {
        let api = BotApi::new(&config())
            .expect("client should build")
            .with_base_url("http://127.0.0.1:1");

        let error = api.get_chat_member("-100", 42).await.expect_err("connection should fail");
        assert!(matches!(error, super::TransportError::Connect(_)));
    }
}
