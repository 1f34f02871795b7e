use tracing::{debug, info, info_span, warn, Instrument};
use ulid::Ulid;

use crate::config::ResolvedConfig;
use crate::error::GenerationFailure;
use crate::hash::diff_hash;
use crate::heuristic::{heuristic_message, heuristic_summary};
use crate::prompt::{self, GenerationRequest};
use crate::provider::{check_key_shape, KeyCheck, ProviderConfig, ProviderGateway, ProviderId};
use crate::style::StyleCatalog;
use crate::types::{GenerationResponse, MessageSource, ResponseKind};
use crate::SCHEMA_VERSION;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub request_id: String,
    pub kind: ResponseKind,
    pub message: String,
    pub source: MessageSource,
    pub provider: Option<ProviderId>,
    pub style: Option<String>,
}

impl Generated {
    pub fn into_response(self) -> GenerationResponse {
        GenerationResponse {
            schema_version: SCHEMA_VERSION.to_string(),
            request_id: Some(self.request_id),
            kind: self.kind,
            style: self.style,
            source: self.source,
            provider: self.provider,
            message: self.message,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub custom_instruction: Option<String>,
    /// Zero disables truncation.
    pub max_diff_bytes: usize,
    pub offline: bool,
    pub heuristic_on_failure: bool,
    pub log_diff: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            custom_instruction: config.custom_instruction.clone(),
            max_diff_bytes: usize::try_from(config.max_diff_bytes).unwrap_or(usize::MAX),
            offline: config.offline,
            heuristic_on_failure: config.heuristic_on_failure,
            log_diff: config.log_diff,
        }
    }
}

/// diff + style in, message or typed failure out. Holds no per-call state.
pub struct Pipeline {
    gateway: ProviderGateway,
    catalog: StyleCatalog,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(gateway: ProviderGateway, settings: PipelineSettings) -> Self {
        Self {
            gateway,
            catalog: StyleCatalog::builtin(),
            settings,
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(
            ProviderGateway::from_config(config),
            PipelineSettings::from_config(config),
        )
    }

    pub fn catalog(&self) -> &StyleCatalog {
        &self.catalog
    }

    pub async fn generate(
        &self,
        diff: &str,
        style_id: &str,
        credentials: &ProviderConfig,
    ) -> Result<Generated, GenerationFailure> {
        let request_id = Ulid::new().to_string();
        let span = info_span!(
            "generate",
            request_id = %request_id,
            provider = %credentials.provider,
            style = style_id
        );

        async {
            if diff.trim().is_empty() {
                debug!("empty diff, nothing to generate");
                return Err(GenerationFailure::no_staged_changes());
            }
            self.log_diff(diff);
            let style = self
                .catalog
                .resolve(style_id, self.settings.custom_instruction.as_deref());
            let generated = |message: String, source: MessageSource, provider: Option<ProviderId>| Generated {
                request_id: request_id.clone(),
                kind: ResponseKind::CommitMessage,
                message,
                source,
                provider,
                style: Some(style.id().to_string()),
            };

            if self.settings.offline {
                info!(style = style.id(), "offline mode, using heuristic message");
                return Ok(generated(
                    heuristic_message(diff, &style),
                    MessageSource::Heuristic,
                    None,
                ));
            }

            let request = prompt::build(&style, self.truncate(diff));
            match self.dispatch(credentials, &request).await {
                Ok((provider, message)) => Ok(generated(message, MessageSource::Backend, Some(provider))),
                Err(failure) if self.settings.heuristic_on_failure => {
                    warn!(error = %failure, "generation failed, using heuristic message");
                    Ok(generated(
                        heuristic_message(diff, &style),
                        MessageSource::Heuristic,
                        None,
                    ))
                }
                Err(failure) => Err(failure),
            }
        }
        .instrument(span)
        .await
        .map_err(|failure| failure.with_request_id(&request_id))
    }

    pub async fn summarize(
        &self,
        diff: &str,
        credentials: &ProviderConfig,
    ) -> Result<Generated, GenerationFailure> {
        let request_id = Ulid::new().to_string();
        let span = info_span!(
            "summarize",
            request_id = %request_id,
            provider = %credentials.provider
        );

        async {
            if diff.trim().is_empty() {
                debug!("empty diff, nothing to summarize");
                return Err(GenerationFailure::no_branch_changes());
            }
            self.log_diff(diff);
            let generated = |message: String, source: MessageSource, provider: Option<ProviderId>| Generated {
                request_id: request_id.clone(),
                kind: ResponseKind::PrSummary,
                message,
                source,
                provider,
                style: None,
            };

            if self.settings.offline {
                info!("offline mode, using heuristic summary");
                return Ok(generated(heuristic_summary(diff), MessageSource::Heuristic, None));
            }

            let request = prompt::build_summary(self.truncate(diff));
            match self.dispatch(credentials, &request).await {
                Ok((provider, message)) => Ok(generated(message, MessageSource::Backend, Some(provider))),
                Err(failure) if self.settings.heuristic_on_failure => {
                    warn!(error = %failure, "summary failed, using heuristic summary");
                    Ok(generated(heuristic_summary(diff), MessageSource::Heuristic, None))
                }
                Err(failure) => Err(failure),
            }
        }
        .instrument(span)
        .await
        .map_err(|failure| failure.with_request_id(&request_id))
    }

    async fn dispatch(
        &self,
        credentials: &ProviderConfig,
        request: &GenerationRequest<'_>,
    ) -> Result<(ProviderId, String), GenerationFailure> {
        let has_key = !credentials.api_key.trim().is_empty();
        if let KeyCheck::Suspicious(reason) = check_key_shape(credentials.provider, &credentials.api_key) {
            if has_key {
                warn!(provider = %credentials.provider, reason, "api key looks unusual, sending anyway");
            }
        }
        let result = self.gateway.dispatch_with_fallback(credentials, request).await;
        if let Err(failure) = &result {
            debug!(kind = failure.kind.code(), request_kind = request.kind.as_str(), "dispatch failed");
        }
        result
    }

    fn log_diff(&self, diff: &str) {
        if self.settings.log_diff {
            debug!(diff = %diff, "diff contents");
        } else {
            debug!(diff_hash = %diff_hash(diff), bytes = diff.len(), "diff received");
        }
    }

    /// Cuts the diff to `max_diff_bytes` for the backend prompt only;
    /// heuristics always see the whole diff.
    fn truncate<'a>(&self, diff: &'a str) -> &'a str {
        let limit = self.settings.max_diff_bytes;
        if limit == 0 || diff.len() <= limit {
            return diff;
        }
        let mut end = limit;
        while !diff.is_char_boundary(end) {
            end -= 1;
        }
        warn!(bytes = diff.len(), limit, "diff exceeds limit, truncating prompt");
        &diff[..end]
    }
}
