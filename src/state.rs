use anyhow::Context;
use std::sync::Arc;

use crate::clients::openai::ChatCompletionClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::sanitize::sanitizer_from_name;
use crate::services::{
    AuthService, ConversationService, DefaultConversationService, SeaOrmAuthService,
    SeaOrmThreadService, ThreadService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub thread_service: Arc<dyn ThreadService>,

    pub conversation_service: Arc<dyn ConversationService>,
}

impl SharedState {
    /// Opens the database, applies migrations and wires the services.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::connect(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;
        store.initialize().await?;

        Self::with_store(config, store)
    }

    /// Wires the services around an already initialized store.
    pub fn with_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let input_sanitizer = sanitizer_from_name(&config.content.input_sanitizer)
            .with_context(|| format!("Unknown sanitizer '{}'", config.content.input_sanitizer))?;
        let public_sanitizer = sanitizer_from_name(&config.content.public_sanitizer)
            .with_context(|| format!("Unknown sanitizer '{}'", config.content.public_sanitizer))?;

        let client = ChatCompletionClient::from_config(&config.generation)?;
        if !client.is_configured() {
            tracing::warn!("OPENAI_API_KEY is not set; AI replies will be unavailable");
        }

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService>;

        let thread_service = Arc::new(SeaOrmThreadService::new(
            store.clone(),
            input_sanitizer.clone(),
            public_sanitizer,
            config.server.public_base_url.clone(),
        )) as Arc<dyn ThreadService>;

        let conversation_service = Arc::new(DefaultConversationService::new(
            store.clone(),
            client,
            input_sanitizer,
            &config.generation,
        )) as Arc<dyn ConversationService>;

        Ok(Self {
            config: Arc::new(config),
            store,
            auth_service,
            thread_service,
            conversation_service,
        })
    }
}
