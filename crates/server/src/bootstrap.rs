use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use haulbot_agent::extract::CriteriaExtractor;
use haulbot_agent::runtime::{BotReply, DialogRuntime, KeyboardRequest, SessionStore};
use haulbot_core::config::{AppConfig, ConfigError, LoadOptions};
use haulbot_core::{IdentityVerifier, RateEstimator};
use haulbot_db::{connect_with_settings, migrations, DbPool, SqlLoadHistoryRepository};
use haulbot_telegram::poller::{KeyboardAction, OutboundMessage, TelegramTransport, TurnHandler};
use haulbot_telegram::updates::InboundTurn;

use crate::assist::ChatCompletionsAssist;
use crate::registry::FmcsaRegistry;
use crate::transport::{BotApi, ChannelMembershipGate};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub transport: Arc<dyn TelegramTransport>,
    pub turn_handler: Arc<dyn TurnHandler>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let bot_api = Arc::new(BotApi::new(&config.telegram).map_err(BootstrapError::HttpClient)?);
    let gate = Arc::new(ChannelMembershipGate::new(
        bot_api.clone(),
        config.telegram.channel_id.clone(),
    ));
    let registry =
        Arc::new(FmcsaRegistry::new(&config.registry).map_err(BootstrapError::HttpClient)?);
    let assist =
        Arc::new(ChatCompletionsAssist::new(&config.llm).map_err(BootstrapError::HttpClient)?);
    let load_history = Arc::new(SqlLoadHistoryRepository::new(db_pool.clone()));

    let runtime = Arc::new(DialogRuntime::new(
        SessionStore::new(),
        gate,
        IdentityVerifier::new(registry),
        CriteriaExtractor::new(assist),
        RateEstimator::new(load_history),
    ));

    Ok(Application {
        config,
        db_pool,
        transport: bot_api,
        turn_handler: Arc::new(BotService { runtime }),
    })
}

/// Adapts the dialog runtime to the transport loop: one inbound turn in,
/// chat-addressed outbound messages back.
pub struct BotService {
    runtime: Arc<DialogRuntime>,
}

#[async_trait]
impl TurnHandler for BotService {
    async fn handle_turn(&self, turn: &InboundTurn) -> Vec<OutboundMessage> {
        self.runtime
            .handle_message(turn.chat_id, turn.user_id, &turn.text)
            .await
            .into_iter()
            .map(|reply| to_outbound(turn.chat_id, reply))
            .collect()
    }
}

fn to_outbound(chat_id: i64, reply: BotReply) -> OutboundMessage {
    let keyboard = match reply.keyboard {
        KeyboardRequest::None => KeyboardAction::None,
        KeyboardRequest::YesNo => KeyboardAction::YesNo,
        KeyboardRequest::Remove => KeyboardAction::Remove,
    };
    OutboundMessage { chat_id, text: reply.text, keyboard }
}

#[cfg(test)]
mod tests {
    use haulbot_agent::runtime::BotReply;
    use haulbot_core::config::{ConfigError, ConfigOverrides, LoadOptions};
    use haulbot_core::{HistoricalRateStore, RateQuery};
    use haulbot_db::fixtures::seed_load_history;
    use haulbot_db::SqlLoadHistoryRepository;
    use haulbot_telegram::poller::KeyboardAction;

    use crate::bootstrap::{bootstrap, to_outbound, BootstrapError};

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                telegram_bot_token: Some("123456:test-token".to_string()),
                telegram_channel_id: Some("-1000000000000".to_string()),
                registry_web_key: Some("test-web-key".to_string()),
                llm_api_key: Some("sk-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_a_bot_token() {
        let mut options = valid_overrides("sqlite::memory:");
        options.overrides.telegram_bot_token = Some("  ".to_string());

        let result = bootstrap(options).await;

        let Err(BootstrapError::Config(ConfigError::Validation(message))) = result else {
            panic!("expected a config validation failure");
        };
        assert!(message.contains("telegram.bot_token"));
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_wires_the_rate_store() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'load_history'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("sqlite_master should be queryable");
        assert_eq!(table_count, 1, "bootstrap should expose the load-history table");

        // The wired store answers the historical tier once seeded.
        seed_load_history(&app.db_pool).await.expect("seeding should succeed");
        let store = SqlLoadHistoryRepository::new(app.db_pool.clone());
        let average = store
            .average_rate(&RateQuery {
                shipper_city: "CHICAGO".to_string(),
                consignee_city: "DALLAS".to_string(),
                min_distance: 840,
                max_distance: 960,
                min_weight: 36_500,
                max_weight: 43_500,
            })
            .await
            .expect("aggregate should succeed");
        assert!(average.is_some());

        app.db_pool.close().await;
    }

    #[test]
    fn replies_map_onto_chat_addressed_outbound_messages() {
        let outbound = to_outbound(7, BotReply::yes_no("Is ACME your company?"));
        assert_eq!(outbound.chat_id, 7);
        assert_eq!(outbound.text, "Is ACME your company?");
        assert_eq!(outbound.keyboard, KeyboardAction::YesNo);

        let outbound = to_outbound(7, BotReply::plain("help text"));
        assert_eq!(outbound.keyboard, KeyboardAction::None);
    }
}
