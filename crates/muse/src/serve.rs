use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use muse_core::config::ResolvedConfig;
use muse_core::git::DiffSource;
use muse_core::provider::ProviderConfig;
use muse_core::types::{ErrorDetail, ErrorResponse, StyleEntry, StylesResponse};
use muse_core::{FailureKind, GenerationFailure, Pipeline, SCHEMA_VERSION};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use ulid::Ulid;

struct AppState {
    pipeline: Pipeline,
    config: ResolvedConfig,
}

#[derive(Debug, Deserialize)]
struct CommitMessageRequest {
    diff: Option<String>,
    repo_path: Option<PathBuf>,
    style: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrSummaryRequest {
    diff: Option<String>,
    repo_path: Option<PathBuf>,
}

pub async fn run(config: ResolvedConfig, host: &str, port: u16) -> std::io::Result<()> {
    let state = Arc::new(AppState {
        pipeline: Pipeline::from_config(&config),
        config,
    });
    let app = Router::new()
        .route("/v1/commit-message", post(commit_message))
        .route("/v1/pr-summary", post(pr_summary))
        .route("/v1/styles", get(styles))
        .with_state(state);

    let listener = TcpListener::bind((host, port)).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}

async fn commit_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CommitMessageRequest>,
) -> Response {
    let diff = match resolve_diff(request.diff, request.repo_path, DiffTarget::Staged).await {
        Ok(diff) => diff,
        Err(failure) => return failure_response(&failure),
    };
    let credentials = match ProviderConfig::from_config(&state.config) {
        Ok(credentials) => credentials,
        Err(failure) => return failure_response(&failure),
    };
    let style = request
        .style
        .unwrap_or_else(|| state.config.default_style.clone());

    match state.pipeline.generate(&diff, &style, &credentials).await {
        Ok(generated) => Json(generated.into_response()).into_response(),
        Err(failure) => failure_response(&failure),
    }
}

async fn pr_summary(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PrSummaryRequest>,
) -> Response {
    let diff = match resolve_diff(request.diff, request.repo_path, DiffTarget::Branch).await {
        Ok(diff) => diff,
        Err(failure) => return failure_response(&failure),
    };
    let credentials = match ProviderConfig::from_config(&state.config) {
        Ok(credentials) => credentials,
        Err(failure) => return failure_response(&failure),
    };

    match state.pipeline.summarize(&diff, &credentials).await {
        Ok(generated) => Json(generated.into_response()).into_response(),
        Err(failure) => failure_response(&failure),
    }
}

async fn styles(State(state): State<Arc<AppState>>) -> Json<StylesResponse> {
    Json(StylesResponse {
        schema_version: SCHEMA_VERSION.to_string(),
        styles: state
            .pipeline
            .catalog()
            .styles()
            .iter()
            .map(StyleEntry::from)
            .collect(),
    })
}

#[derive(Debug, Clone, Copy)]
enum DiffTarget {
    Staged,
    Branch,
}

async fn resolve_diff(
    diff: Option<String>,
    repo_path: Option<PathBuf>,
    target: DiffTarget,
) -> Result<String, GenerationFailure> {
    if let Some(diff) = diff {
        return Ok(diff);
    }
    let repo = repo_path.ok_or_else(|| {
        GenerationFailure::new(FailureKind::VcsUnavailable, "request needs diff or repo_path")
    })?;

    // git runs as a blocking subprocess.
    let result = tokio::task::spawn_blocking(move || {
        let source = DiffSource::open(repo);
        match target {
            DiffTarget::Staged => source
                .staged_diff()?
                .ok_or_else(GenerationFailure::no_staged_changes),
            DiffTarget::Branch => source
                .branch_diff()?
                .ok_or_else(GenerationFailure::no_branch_changes),
        }
    })
    .await;

    match result {
        Ok(diff) => diff,
        Err(err) => Err(GenerationFailure::new(
            FailureKind::VcsUnavailable,
            format!("diff task failed: {err}"),
        )),
    }
}

fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::NoStagedChanges | FailureKind::NoBranchChanges => StatusCode::UNPROCESSABLE_ENTITY,
        FailureKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        FailureKind::NetworkTimeout => StatusCode::GATEWAY_TIMEOUT,
        FailureKind::InvalidCredentials
        | FailureKind::AccessForbidden
        | FailureKind::EndpointNotFound
        | FailureKind::BackendError
        | FailureKind::ConnectivityError
        | FailureKind::EmptyResponse => StatusCode::BAD_GATEWAY,
        FailureKind::MissingCredential
        | FailureKind::UnsupportedProvider
        | FailureKind::VcsUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure_response(failure: &GenerationFailure) -> Response {
    if !failure.kind.is_precondition() {
        warn!(kind = failure.kind.code(), detail = %failure.detail, "request failed");
    }
    let body = ErrorResponse {
        schema_version: SCHEMA_VERSION.to_string(),
        request_id: Some(
            failure
                .request_id
                .clone()
                .unwrap_or_else(|| Ulid::new().to_string()),
        ),
        error: ErrorDetail::from(failure),
    };
    (status_for(failure.kind), Json(body)).into_response()
}
