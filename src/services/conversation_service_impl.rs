//! `SeaORM` + chat-completion implementation of `ConversationService`.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::openai::{ChatCompletionClient, GenerationOptions};
use crate::config::GenerationConfig;
use crate::constants::{generation, threads::DEFAULT_TITLE};
use crate::db::Store;
use crate::services::conversation_service::{
    AnalyzeRequest, AnalyzeResult, ConversationError, ConversationService, ThreadReply,
};
use crate::services::fingerprint::GenerationRequest;
use crate::services::generation_cache::GenerationCache;
use crate::services::prompts;
use crate::services::sanitize::TextSanitizer;

const ROLE_USER: &str = "user";
const ROLE_ASSISTANT: &str = "assistant";
const ROLE_SYSTEM: &str = "system";

pub struct DefaultConversationService {
    store: Store,
    cache: GenerationCache,
    client: ChatCompletionClient,
    input_sanitizer: Arc<dyn TextSanitizer>,
    reply_options: GenerationOptions,
    analyze_options: GenerationOptions,
    recent_window: u64,
}

impl DefaultConversationService {
    #[must_use]
    pub fn new(
        store: Store,
        client: ChatCompletionClient,
        input_sanitizer: Arc<dyn TextSanitizer>,
        config: &GenerationConfig,
    ) -> Self {
        Self {
            cache: GenerationCache::new(Arc::new(store.clone())),
            store,
            client,
            input_sanitizer,
            reply_options: GenerationOptions::conversation().with_config(config),
            analyze_options: GenerationOptions::default().with_config(config),
            recent_window: config.recent_posts_window.max(1),
        }
    }

    async fn ai_author_id(&self) -> Result<i32, ConversationError> {
        let system = self.store.system_user().await?.ok_or_else(|| {
            ConversationError::Database("AI system account is missing; run migrations".to_string())
        })?;
        Ok(system.id)
    }
}

#[async_trait]
impl ConversationService for DefaultConversationService {
    async fn respond(&self, thread_id: i32) -> Result<ThreadReply, ConversationError> {
        if self.store.get_thread(thread_id).await?.is_none() {
            return Err(ConversationError::NotFound(thread_id));
        }

        let article = self
            .store
            .first_post(thread_id)
            .await?
            .ok_or(ConversationError::NoArticle(thread_id))?;

        let recent = self.store.recent_posts(thread_id, self.recent_window).await?;
        let latest_item_id = recent.first().map_or(article.id, |p| p.id);
        let recent_context: Vec<String> = recent.into_iter().map(|p| p.content).collect();

        let last_ai_text = self
            .store
            .latest_summary(thread_id)
            .await?
            .map(|s| s.content);

        let style_hint = prompts::style_hint_for(thread_id, latest_item_id);

        // Resolved before generating so a missing account stores nothing.
        let ai_id = self.ai_author_id().await?;

        let request = GenerationRequest::new(
            thread_id,
            article.content,
            latest_item_id,
            recent_context,
            style_hint,
            self.client.model(),
            generation::MODE_CONVERSATION,
        );

        let prompt = prompts::build_thread_prompt(
            request.seed_text(),
            &request.recent_context_text(),
            style_hint,
            last_ai_text.as_deref(),
        );

        let client = &self.client;
        let options = &self.reply_options;
        let generation = self
            .cache
            .get_or_generate(&request, |_| async move {
                client.generate(&prompt, options).await
            })
            .await?;

        let body = format!("{}{}", generation::AI_POST_PREFIX, generation.content);
        let post_id = self
            .store
            .add_post(thread_id, Some(ai_id), None, &body)
            .await?;

        info!(
            thread_id,
            post_id,
            from_cache = generation.from_cache,
            "AI reply appended"
        );

        Ok(ThreadReply {
            content: generation.content,
            from_cache: generation.from_cache,
            post_id,
        })
    }

    async fn analyze(
        &self,
        user_id: i32,
        request: AnalyzeRequest,
    ) -> Result<AnalyzeResult, ConversationError> {
        let article = self.input_sanitizer.sanitize(&request.article);
        let comment = self.input_sanitizer.sanitize(&request.comment);
        if article.is_empty() && comment.is_empty() {
            return Err(ConversationError::Validation(
                "article or comment is required".to_string(),
            ));
        }

        let existing = match request.thread_id {
            Some(id) => self.store.get_thread(id).await?.map(|t| t.id),
            None => None,
        };

        let thread_id = match existing {
            Some(id) => id,
            None => {
                let title = request
                    .thread_title
                    .as_deref()
                    .map(|t| self.input_sanitizer.sanitize(t))
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| DEFAULT_TITLE.to_string());
                self.store.create_thread(&title, Some(user_id)).await?
            }
        };

        self.store
            .add_message(thread_id, ROLE_USER, &prompts::analysis_blob(&article, &comment))
            .await?;

        let prompt = prompts::build_conversation_prompt(&article, &comment);
        let (role, content) = match self.client.generate(&prompt, &self.analyze_options).await {
            Ok(text) => (ROLE_ASSISTANT, text),
            Err(err) => {
                warn!(thread_id, error = %err, "Analysis generation failed");
                (ROLE_SYSTEM, err.to_string())
            }
        };

        self.store.add_message(thread_id, role, &content).await?;

        Ok(AnalyzeResult {
            thread_id,
            role: role.to_string(),
            content,
        })
    }
}
