use crate::config::ResolvedConfig;
use crate::error::{FailureKind, GenerationFailure};
use crate::prompt::GenerationRequest;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Placeholder when a failed response carries no readable message.
pub const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    #[serde(alias = "claude")]
    Anthropic,
    Mistral,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [ProviderId::OpenAi, ProviderId::Anthropic, ProviderId::Mistral];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Anthropic => "anthropic",
            ProviderId::Mistral => "mistral",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ProviderId::OpenAi => "OpenAI",
            ProviderId::Anthropic => "Claude",
            ProviderId::Mistral => "Mistral",
        }
    }

    /// Conventional key prefix, if the vendor has one.
    pub fn key_prefix(self) -> Option<&'static str> {
        match self {
            ProviderId::OpenAi => Some("sk-"),
            ProviderId::Anthropic => Some("sk-ant-"),
            ProviderId::Mistral => None,
        }
    }

    fn min_key_len(self) -> usize {
        match self {
            ProviderId::OpenAi | ProviderId::Anthropic => 20,
            ProviderId::Mistral => 10,
        }
    }

    /// Backend to retry against once when this one fails. Only providers
    /// without a key prefix convention have one.
    pub fn fallback_target(self) -> Option<ProviderId> {
        match self.key_prefix() {
            Some(_) => None,
            None => Some(ProviderId::OpenAi),
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = GenerationFailure;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderId::OpenAi),
            "anthropic" | "claude" => Ok(ProviderId::Anthropic),
            "mistral" => Ok(ProviderId::Mistral),
            _ => Err(GenerationFailure::unsupported_provider(value)),
        }
    }
}

/// Credentials for one call. Supplied per invocation, never cached.
#[derive(Clone)]
pub struct ProviderConfig {
    pub provider: ProviderId,
    pub api_key: String,
    pub fallback_api_key: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("fallback_api_key", &self.fallback_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(provider: ProviderId, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            fallback_api_key: None,
        }
    }

    pub fn with_fallback_key(mut self, key: impl Into<String>) -> Self {
        self.fallback_api_key = Some(key.into());
        self
    }

    pub fn from_config(config: &ResolvedConfig) -> Result<Self, GenerationFailure> {
        Ok(Self {
            provider: config.provider.parse()?,
            api_key: config.api_key.clone().unwrap_or_default(),
            fallback_api_key: config.fallback_api_key.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct LlmOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl LlmOptions {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.llm_timeout_secs),
        }
    }
}

/// One text-generation wire protocol. Transport, timeouts and status
/// classification live in [`ProviderGateway`].
pub trait Backend: Send + Sync {
    fn provider(&self) -> ProviderId;
    fn endpoint(&self) -> String;
    fn authorize(&self, builder: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder;
    fn request_body(&self, request: &GenerationRequest<'_>, options: &LlmOptions) -> Value;
    fn extract_text<'v>(&self, body: &'v Value) -> Option<&'v str>;
    fn error_message(&self, body: &Value) -> Option<String>;
}

pub struct OpenAiBackend {
    base_url: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

impl Backend for OpenAiBackend {
    fn provider(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
        builder.bearer_auth(api_key)
    }

    fn request_body(&self, request: &GenerationRequest<'_>, options: &LlmOptions) -> Value {
        chat_completions_body(&self.model, request, options)
    }

    fn extract_text<'v>(&self, body: &'v Value) -> Option<&'v str> {
        chat_completions_text(body)
    }

    fn error_message(&self, body: &Value) -> Option<String> {
        nested_error_message(body)
    }
}

pub struct AnthropicBackend {
    base_url: String,
    model: String,
}

impl AnthropicBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

impl Backend for AnthropicBackend {
    fn provider(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
        builder
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
    }

    fn request_body(&self, request: &GenerationRequest<'_>, options: &LlmOptions) -> Value {
        json!({
            "model": self.model,
            "max_tokens": options.max_tokens,
            "system": request.system_prompt(),
            "messages": [
                { "role": "user", "content": request.user_prompt() }
            ],
        })
    }

    fn extract_text<'v>(&self, body: &'v Value) -> Option<&'v str> {
        body.pointer("/content/0/text").and_then(Value::as_str)
    }

    fn error_message(&self, body: &Value) -> Option<String> {
        nested_error_message(body)
    }
}

pub struct MistralBackend {
    base_url: String,
    model: String,
}

impl MistralBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

impl Backend for MistralBackend {
    fn provider(&self) -> ProviderId {
        ProviderId::Mistral
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
        builder.bearer_auth(api_key)
    }

    fn request_body(&self, request: &GenerationRequest<'_>, options: &LlmOptions) -> Value {
        chat_completions_body(&self.model, request, options)
    }

    fn extract_text<'v>(&self, body: &'v Value) -> Option<&'v str> {
        chat_completions_text(body)
    }

    // Mistral reports errors as a top-level `message`, sometimes as a bare
    // `error` string.
    fn error_message(&self, body: &Value) -> Option<String> {
        if let Some(message) = body.get("message").and_then(Value::as_str) {
            return Some(message.to_string());
        }
        nested_error_message(body)
    }
}

/// Dispatches requests to the registered backends and normalizes their
/// results. Built once per process and shared by reference.
pub struct ProviderGateway {
    backends: HashMap<ProviderId, Box<dyn Backend>>,
    http: reqwest::Client,
    options: LlmOptions,
}

impl ProviderGateway {
    pub fn new(backends: Vec<Box<dyn Backend>>, options: LlmOptions) -> Self {
        let backends = backends
            .into_iter()
            .map(|backend| (backend.provider(), backend))
            .collect();
        Self {
            backends,
            http: HTTP_CLIENT.clone(),
            options,
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(
            vec![
                Box::new(OpenAiBackend::new(&config.openai_url, &config.openai_model)),
                Box::new(AnthropicBackend::new(&config.anthropic_url, &config.anthropic_model)),
                Box::new(MistralBackend::new(&config.mistral_url, &config.mistral_model)),
            ],
            LlmOptions::from_config(config),
        )
    }

    pub fn supports(&self, provider: ProviderId) -> bool {
        self.backends.contains_key(&provider)
    }

    pub async fn dispatch(
        &self,
        provider: ProviderId,
        api_key: &str,
        request: &GenerationRequest<'_>,
    ) -> Result<String, GenerationFailure> {
        let backend = self.backends.get(&provider).ok_or_else(|| {
            GenerationFailure::for_provider(
                FailureKind::UnsupportedProvider,
                provider,
                format!("Unsupported AI provider: {provider}"),
            )
        })?;

        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(GenerationFailure::for_provider(
                FailureKind::MissingCredential,
                provider,
                format!(
                    "Please configure your {} API key in settings.",
                    provider.display_name()
                ),
            ));
        }

        let endpoint = backend.endpoint();
        debug!(provider = %provider, endpoint = %endpoint, kind = request.kind.as_str(), "dispatching request");
        let body = backend.request_body(request, &self.options);
        let builder = self
            .http
            .post(endpoint)
            .json(&body)
            .timeout(self.options.timeout);

        let response = backend
            .authorize(builder, api_key)
            .send()
            .await
            .map_err(|err| map_reqwest_error(provider, err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| map_reqwest_error(provider, err))?;
        let value: Option<Value> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let message = value
                .as_ref()
                .and_then(|value| backend.error_message(value))
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
            return Err(classify_status(provider, status.as_u16(), message));
        }

        let text = value
            .as_ref()
            .and_then(|value| backend.extract_text(value))
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                GenerationFailure::for_provider(
                    FailureKind::EmptyResponse,
                    provider,
                    format!("{} API returned no message text.", provider.display_name()),
                )
                .with_status(status.as_u16())
            })?;

        debug!(provider = %provider, chars = text.chars().count(), "backend returned message");
        Ok(text.to_string())
    }

    /// Dispatch with the single sequential fallback hop. Returns the provider
    /// that produced the text.
    pub async fn dispatch_with_fallback(
        &self,
        config: &ProviderConfig,
        request: &GenerationRequest<'_>,
    ) -> Result<(ProviderId, String), GenerationFailure> {
        let original = match self.dispatch(config.provider, &config.api_key, request).await {
            Ok(text) => return Ok((config.provider, text)),
            Err(failure) => failure,
        };

        let fallback_key = config
            .fallback_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty());
        let (target, key) = match (config.provider.fallback_target(), fallback_key) {
            (Some(target), Some(key)) => (target, key),
            _ => return Err(original),
        };

        info!(
            provider = %config.provider,
            fallback = %target,
            kind = original.kind.code(),
            "primary provider failed, trying fallback"
        );
        match self.dispatch(target, key, request).await {
            Ok(text) => Ok((target, text)),
            Err(fallback_failure) => {
                warn!(provider = %config.provider, error = %original, "primary provider failed");
                Err(fallback_failure)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCheck {
    Plausible,
    Suspicious(&'static str),
}

/// Advisory only: vendors change key formats, so callers must not block on it.
pub fn check_key_shape(provider: ProviderId, api_key: &str) -> KeyCheck {
    let key = api_key.trim();
    if let Some(prefix) = provider.key_prefix() {
        if !key.starts_with(prefix) {
            return KeyCheck::Suspicious("key does not start with the provider's usual prefix");
        }
    }
    if key.len() <= provider.min_key_len() {
        return KeyCheck::Suspicious("key is shorter than expected");
    }
    KeyCheck::Plausible
}

pub fn classify_status(provider: ProviderId, status: u16, message: String) -> GenerationFailure {
    let name = provider.display_name();
    let backend_says = match message.as_str() {
        UNKNOWN_ERROR => String::new(),
        message => format!(" ({message})"),
    };
    let (kind, detail) = match status {
        401 => (
            FailureKind::InvalidCredentials,
            format!("Invalid {name} API key. Please check your API key in settings.{backend_says}"),
        ),
        429 => (
            FailureKind::RateLimited,
            format!("{name} API rate limit exceeded. Please try again later.{backend_says}"),
        ),
        403 => (
            FailureKind::AccessForbidden,
            format!("{name} API access forbidden. Check your subscription.{backend_says}"),
        ),
        404 => (
            FailureKind::EndpointNotFound,
            format!("{name} API endpoint not found. Please check the model name.{backend_says}"),
        ),
        _ => (
            FailureKind::BackendError,
            format!("{name} API error ({status}): {message}"),
        ),
    };
    GenerationFailure::for_provider(kind, provider, detail).with_status(status)
}

fn map_reqwest_error(provider: ProviderId, error: reqwest::Error) -> GenerationFailure {
    let name = provider.display_name();
    if error.is_timeout() {
        GenerationFailure::for_provider(
            FailureKind::NetworkTimeout,
            provider,
            format!("{name} API request timed out."),
        )
    } else {
        GenerationFailure::for_provider(
            FailureKind::ConnectivityError,
            provider,
            format!("Failed to connect to {name} API. Please check your internet connection. ({error})"),
        )
    }
}

fn chat_completions_body(model: &str, request: &GenerationRequest<'_>, options: &LlmOptions) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": request.system_prompt() },
            { "role": "user", "content": request.user_prompt() },
        ],
        "max_tokens": options.max_tokens,
        "temperature": options.temperature,
    })
}

fn chat_completions_text(body: &Value) -> Option<&str> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
}

fn nested_error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    if error.is_null() {
        return None;
    }
    if let Some(message) = error.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }
    if let Some(message) = error.as_str() {
        return Some(message.to_string());
    }
    Some(error.to_string())
}

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);
