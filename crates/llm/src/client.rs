use std::time::Duration;

use ora2pg_assist_core::constants::DEFAULT_AI_TIMEOUT_SECS;
use ora2pg_assist_core::ddl::strip_code_fence;
use ora2pg_assist_core::{AiProvider, ClientConfig, TokenUsage};

use crate::ai_types::{
    ChatRequest, ChatResponse, Content, GenerateRequest, GenerateResponse, GenerationConfig,
    Message, Part,
};
use crate::error::LlmError;

/// Provider, endpoint and sampling parameters for one client.
#[derive(Clone, PartialEq)]
pub struct AiSettings {
    pub provider: AiProvider,
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl std::fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiSettings")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

impl AiSettings {
    /// Reads AI settings from a client configuration.
    ///
    /// # Errors
    /// Returns `NotConfigured` if the endpoint or model is missing, or if
    /// Google is selected without an API key.
    pub fn from_config(config: &ClientConfig) -> Result<Self, LlmError> {
        let endpoint = config
            .ai_endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| LlmError::NotConfigured("ai_endpoint is not set".to_owned()))?;
        let model = config
            .ai_model
            .as_deref()
            .filter(|m| !m.is_empty())
            .ok_or_else(|| LlmError::NotConfigured("ai_model is not set".to_owned()))?;
        let provider = config.resolved_provider();
        let api_key = config.ai_api_key.clone().filter(|k| !k.is_empty());
        if provider == AiProvider::Google && api_key.is_none() {
            return Err(LlmError::NotConfigured("Google AI requires ai_api_key".to_owned()));
        }
        Ok(Self {
            provider,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            model: model.to_owned(),
            api_key,
            temperature: config.ai_temperature,
            max_output_tokens: config.ai_max_output_tokens,
        })
    }
}

/// Text returned by the provider, with its token usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
}

/// Client for AI provider calls.
pub struct LlmClient {
    pub(crate) client: reqwest::Client,
    pub(crate) settings: AiSettings,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("client", &self.client)
            .field("settings", &self.settings)
            .finish()
    }
}

impl LlmClient {
    /// Creates a client with the default per-request timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built (TLS backend failure).
    pub fn new(settings: AiSettings) -> Result<Self, LlmError> {
        Self::with_timeout(settings, Duration::from_secs(DEFAULT_AI_TIMEOUT_SECS))
    }

    /// # Errors
    /// Returns an error if the HTTP client cannot be built (TLS backend failure).
    pub fn with_timeout(settings: AiSettings, timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::ClientInit(e.to_string()))?;
        Ok(Self { client, settings })
    }

    #[must_use]
    pub const fn settings(&self) -> &AiSettings {
        &self.settings
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    #[must_use]
    pub const fn provider(&self) -> AiProvider {
        self.settings.provider
    }

    fn build_request(&self, system: &str, prompt: &str) -> reqwest::RequestBuilder {
        let s = &self.settings;
        match s.provider {
            AiProvider::OpenAi => {
                let body = ChatRequest {
                    model: s.model.clone(),
                    messages: vec![
                        Message { role: "system", content: system.to_owned() },
                        Message { role: "user", content: prompt.to_owned() },
                    ],
                    temperature: s.temperature,
                    max_tokens: s.max_output_tokens,
                };
                let request = self.client.post(format!("{}/chat/completions", s.endpoint)).json(&body);
                match &s.api_key {
                    Some(key) => request.bearer_auth(key),
                    None => request,
                }
            },
            AiProvider::Google => {
                let model = s.model.replace("-latest", "");
                let body = GenerateRequest {
                    contents: vec![Content { parts: vec![Part { text: prompt.to_owned() }] }],
                    system_instruction: Content { parts: vec![Part { text: system.to_owned() }] },
                    generation_config: GenerationConfig {
                        temperature: s.temperature,
                        max_output_tokens: s.max_output_tokens,
                    },
                };
                self.client
                    .post(format!("{}/models/{model}:generateContent", s.endpoint))
                    .query(&[("key", s.api_key.as_deref().unwrap_or_default())])
                    .json(&body)
            },
        }
    }

    fn parse_body(&self, body: &str) -> Result<Completion, LlmError> {
        let json_err = |e| LlmError::JsonParse {
            context: format!("{} response (body: {})", self.settings.provider, truncate(body, 200)),
            source: e,
        };
        let (text, finish_reason, usage) = match self.settings.provider {
            AiProvider::OpenAi => {
                let response: ChatResponse = serde_json::from_str(body).map_err(json_err)?;
                let usage = response.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
                    prompt_tokens: u.prompt_tokens,
                    completion_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                });
                let choice = response.choices.into_iter().next().ok_or(LlmError::EmptyResponse)?;
                let text = choice.message.and_then(|m| m.content).unwrap_or_default();
                (text, choice.finish_reason, usage)
            },
            AiProvider::Google => {
                let response: GenerateResponse = serde_json::from_str(body).map_err(json_err)?;
                let usage = response.usage_metadata.map_or_else(TokenUsage::default, |u| TokenUsage {
                    prompt_tokens: u.prompt_token_count,
                    completion_tokens: u.candidates_token_count,
                    total_tokens: u.total_token_count,
                });
                let candidate =
                    response.candidates.into_iter().next().ok_or(LlmError::EmptyResponse)?;
                let text = candidate
                    .content
                    .and_then(|c| c.parts.into_iter().next())
                    .map(|p| p.text)
                    .unwrap_or_default();
                (text, candidate.finish_reason, usage)
            },
        };

        if let Some(reason) = finish_reason.filter(|r| r == "length" || r == "MAX_TOKENS") {
            return Err(LlmError::Truncated { finish_reason: reason });
        }
        let content = strip_code_fence(&text).to_owned();
        if content.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(Completion { content, usage })
    }

    /// Send one system + user prompt pair and return the fence-stripped text.
    ///
    /// Transient failures (connection errors, 429 and 5xx gateway statuses)
    /// are retried with a short backoff.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails, the API returns a
    /// non-success status, the body cannot be parsed, the output was cut at
    /// the token limit, or the completion is empty.
    pub async fn complete(&self, system: &str, prompt: &str) -> Result<Completion, LlmError> {
        const MAX_RETRIES: usize = 3;
        const RETRY_DELAYS: [u64; 4] = [0, 1, 2, 4];
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay_secs = RETRY_DELAYS.get(attempt).copied().unwrap_or(4);
                let delay = Duration::from_secs(delay_secs);
                tokio::time::sleep(delay).await;
                tracing::warn!("AI retry attempt {attempt}/{MAX_RETRIES} after {delay:?}");
            }

            let response = match self.build_request(system, prompt).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::HttpRequest(e));
                    continue;
                },
            };

            let status = response.status();
            if status.is_success() {
                let body = match response.text().await {
                    Ok(b) => b,
                    Err(e) => {
                        last_error = Some(LlmError::HttpRequest(e));
                        continue;
                    },
                };
                return self.parse_body(&body);
            }

            let body =
                response.text().await.unwrap_or_else(|_| "Could not read error body".to_owned());
            let err = LlmError::HttpStatus { code: status.as_u16(), body: truncate(&body, 500).to_owned() };
            if err.is_transient() {
                last_error = Some(err);
                continue;
            }
            return Err(err);
        }

        Err(LlmError::RetriesExhausted(Box::new(last_error.unwrap_or(LlmError::EmptyResponse))))
    }
}

/// Truncates a string to the given maximum length at a char boundary.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end = end.saturating_sub(1);
        }
        s.get(..end).unwrap_or("")
    }
}
