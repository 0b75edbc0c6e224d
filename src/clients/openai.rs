//! Chat-completion client with bounded retries.
//!
//! Each [`ChatCompletionClient::generate`] call is independent: it sends the
//! prompt as a two-message conversation, retries transient failures with a
//! linear backoff and only returns non-blank text.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GenerationConfig;
use crate::domain::GenerationError;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_INSTRUCTION: &str = "You are a helpful, concise, reliable assistant.";
const EMPTY_REPLY_CORRECTION: &str =
    "Your previous reply was empty. Answer with plain text this time.";

/// Upstream statuses worth another attempt.
const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Error bodies are cut to this many characters in error details.
const ERROR_BODY_LIMIT: usize = 500;

/// Sampling and retry parameters for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Total attempts, including the first.
    pub retries: u32,
    /// Attempt `n` is followed by a sleep of `backoff_base * n`.
    pub backoff_base: Duration,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            presence_penalty: 0.2,
            frequency_penalty: 0.3,
            max_tokens: 600,
            timeout: Duration::from_secs(30),
            retries: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl GenerationOptions {
    /// Livelier sampling for conversational thread replies.
    #[must_use]
    pub fn conversation() -> Self {
        Self {
            temperature: 0.7,
            presence_penalty: 0.5,
            frequency_penalty: 0.2,
            max_tokens: 700,
            ..Self::default()
        }
    }

    /// Applies the configured timeout and retry policy.
    #[must_use]
    pub fn with_config(mut self, config: &GenerationConfig) -> Self {
        self.timeout = Duration::from_secs(config.timeout_seconds);
        self.retries = config.retries.max(1);
        self.backoff_base = Duration::from_millis(config.backoff_base_ms);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Raw upstream answer: status plus body text.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// The request never produced a status (timeout, DNS, connection reset).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// One HTTP exchange with the chat-completion endpoint.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(
        &self,
        api_key: &str,
        request: &ChatRequest,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError>;
}

pub struct ReqwestTransport {
    client: Client,
    endpoint: String,
}

impl ReqwestTransport {
    pub fn new(endpoint: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent("Agora/1.0")
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ChatTransport for ReqwestTransport {
    async fn send(
        &self,
        api_key: &str,
        request: &ChatRequest,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}

/// What a single attempt concluded.
enum Attempt {
    Done(String),
    Transient { status: Option<u16>, detail: String },
    Empty,
}

#[derive(Clone)]
pub struct ChatCompletionClient {
    transport: Arc<dyn ChatTransport>,
    api_key: Option<String>,
    model: String,
}

impl ChatCompletionClient {
    #[must_use]
    pub fn new(transport: Arc<dyn ChatTransport>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            transport,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
        }
    }

    /// Builds the production client for the configured endpoint.
    pub fn from_config(config: &GenerationConfig) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(config.api_url.clone())?;
        Ok(Self::new(
            Arc::new(transport),
            config.api_key.clone(),
            config.model.clone(),
        ))
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Sends `prompt` and returns the trimmed reply.
    ///
    /// # Errors
    ///
    /// - [`GenerationError::Config`] when no API key is set; nothing is sent.
    /// - [`GenerationError::PermanentUpstream`] on a non-retryable 4xx.
    /// - [`GenerationError::TransientUpstream`] when retryable failures exhaust
    ///   `options.retries`.
    /// - [`GenerationError::EmptyResponse`] when every reply was blank.
    pub async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GenerationError::Config(
                "OPENAI_API_KEY is not set".to_string(),
            ));
        };

        let mut request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::new("system", SYSTEM_INSTRUCTION),
                ChatMessage::new("user", prompt),
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            frequency_penalty: options.frequency_penalty,
            presence_penalty: options.presence_penalty,
        };

        let retries = options.retries.max(1);
        let mut last_status = None;
        let mut last_detail = String::from("no attempt made");

        for attempt in 1..=retries {
            let outcome = self.attempt(api_key, &request, options.timeout).await;

            match outcome {
                Ok(Attempt::Done(text)) => {
                    metrics::counter!("generation_attempts_total", "outcome" => "success")
                        .increment(1);
                    debug!(attempt, model = %self.model, "Generation succeeded");
                    return Ok(text);
                }
                Ok(Attempt::Transient { status, detail }) => {
                    metrics::counter!("generation_attempts_total", "outcome" => "transient")
                        .increment(1);
                    warn!(attempt, retries, detail = %detail, "Transient generation failure");
                    last_status = status;
                    last_detail = detail;
                }
                Ok(Attempt::Empty) => {
                    metrics::counter!("generation_attempts_total", "outcome" => "empty")
                        .increment(1);
                    warn!(attempt, retries, "Empty generation reply");
                    request
                        .messages
                        .push(ChatMessage::new("user", EMPTY_REPLY_CORRECTION));
                    if attempt == retries {
                        return Err(GenerationError::EmptyResponse(format!(
                            "blank reply after {retries} attempt(s)"
                        )));
                    }
                }
                Err(err) => {
                    metrics::counter!("generation_attempts_total", "outcome" => "permanent")
                        .increment(1);
                    return Err(err);
                }
            }

            if attempt < retries {
                tokio::time::sleep(options.backoff_base * attempt).await;
            }
        }

        Err(GenerationError::TransientUpstream {
            status: last_status,
            detail: last_detail,
        })
    }

    async fn attempt(
        &self,
        api_key: &str,
        request: &ChatRequest,
        timeout: Duration,
    ) -> Result<Attempt, GenerationError> {
        let response = match self.transport.send(api_key, request, timeout).await {
            Ok(response) => response,
            Err(err) => {
                return Ok(Attempt::Transient {
                    status: None,
                    detail: err.to_string(),
                });
            }
        };

        if response.status >= 400 {
            let detail = format!(
                "HTTP {}: {}",
                response.status,
                truncate_chars(&response.body, ERROR_BODY_LIMIT)
            );
            if TRANSIENT_STATUSES.contains(&response.status) {
                return Ok(Attempt::Transient {
                    status: Some(response.status),
                    detail,
                });
            }
            return Err(GenerationError::PermanentUpstream {
                status: response.status,
                detail,
            });
        }

        Ok(extract_text(&response.body).map_or(Attempt::Empty, Attempt::Done))
    }
}

/// First choice's content, trimmed; `None` when missing, blank or undecodable.
fn extract_text(body: &str) -> Option<String> {
    let parsed: ChatResponse = serde_json::from_str(body).ok()?;
    let text = parsed
        .choices
        .into_iter()
        .next()?
        .message?
        .content?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted responses and records every request it saw.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<TransportResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send(
            &self,
            _api_key: &str,
            request: &ChatRequest,
            _timeout: Duration,
        ) -> Result<TransportResponse, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError("script exhausted".to_string())))
        }
    }

    fn reply(status: u16, body: &str) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status,
            body: body.to_string(),
        })
    }

    fn content(text: &str) -> Result<TransportResponse, TransportError> {
        reply(
            200,
            &serde_json::json!({"choices": [{"message": {"content": text}}]}).to_string(),
        )
    }

    fn fast_options() -> GenerationOptions {
        GenerationOptions {
            backoff_base: Duration::ZERO,
            ..GenerationOptions::default()
        }
    }

    fn client(transport: Arc<ScriptedTransport>) -> ChatCompletionClient {
        ChatCompletionClient::new(transport, Some("sk-test".to_string()), "m1")
    }

    #[tokio::test]
    async fn recovers_after_two_transient_failures() {
        let transport = ScriptedTransport::new(vec![
            reply(503, "busy"),
            reply(429, "slow down"),
            content("  ok  "),
        ]);

        let text = client(transport.clone())
            .generate("hi", &fast_options())
            .await
            .unwrap();

        assert_eq!(text, "ok");
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn exhausts_exactly_retries_attempts() {
        let transport = ScriptedTransport::new(vec![
            reply(502, "a"),
            reply(502, "b"),
            reply(502, "c"),
            content("never reached"),
        ]);

        let err = client(transport.clone())
            .generate("hi", &fast_options())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GenerationError::TransientUpstream {
                status: Some(502),
                detail: "HTTP 502: c".to_string(),
            }
        );
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn transport_errors_are_transient() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError("connection reset".to_string())),
            Err(TransportError("timed out".to_string())),
        ]);
        let options = GenerationOptions {
            retries: 2,
            ..fast_options()
        };

        let err = client(transport.clone())
            .generate("hi", &options)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GenerationError::TransientUpstream {
                status: None,
                detail: "timed out".to_string(),
            }
        );
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let long_body = "x".repeat(800);
        let transport = ScriptedTransport::new(vec![reply(400, &long_body), content("unused")]);

        let err = client(transport.clone())
            .generate("hi", &fast_options())
            .await
            .unwrap_err();

        match err {
            GenerationError::PermanentUpstream { status, detail } => {
                assert_eq!(status, 400);
                assert_eq!(detail.len(), "HTTP 400: ".len() + 500);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn missing_key_sends_nothing() {
        let transport = ScriptedTransport::new(vec![content("unused")]);
        let client = ChatCompletionClient::new(transport.clone(), Some("  ".to_string()), "m1");

        let err = client.generate("hi", &fast_options()).await.unwrap_err();

        assert!(matches!(err, GenerationError::Config(_)));
        assert!(!client.is_configured());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn empty_reply_appends_correction_and_retries() {
        let transport = ScriptedTransport::new(vec![content("   "), content("second try")]);

        let text = client(transport.clone())
            .generate("hi", &fast_options())
            .await
            .unwrap();

        assert_eq!(text, "second try");
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].messages.len(), 2);
        assert_eq!(seen[0].messages[0].role, "system");
        assert_eq!(seen[0].messages[1].content, "hi");
        assert_eq!(seen[1].messages.len(), 3);
        assert_eq!(seen[1].messages[2].content, EMPTY_REPLY_CORRECTION);
    }

    #[tokio::test]
    async fn blank_on_every_attempt_is_empty_response() {
        let transport = ScriptedTransport::new(vec![
            content(""),
            reply(200, "not json"),
            reply(200, r#"{"choices": []}"#),
        ]);

        let err = client(transport.clone())
            .generate("hi", &fast_options())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::EmptyResponse(_)));
        assert_eq!(transport.calls(), 3);
    }

    #[test]
    fn conversation_preset_overrides_sampling_only() {
        let preset = GenerationOptions::conversation();
        assert!((preset.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(preset.max_tokens, 700);
        assert_eq!(preset.retries, 3);
        assert_eq!(preset.timeout, Duration::from_secs(30));
    }

    #[test]
    fn options_follow_config() {
        let config = GenerationConfig {
            timeout_seconds: 5,
            retries: 4,
            backoff_base_ms: 250,
            ..GenerationConfig::default()
        };

        let options = GenerationOptions::default().with_config(&config);

        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.retries, 4);
        assert_eq!(options.backoff_base, Duration::from_millis(250));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
