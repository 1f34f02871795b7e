use crate::git::GitError;
use crate::provider::ProviderId;

/// Classified reason a generation attempt did not produce a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FailureKind {
    #[error("no staged changes")]
    NoStagedChanges,
    #[error("no branch changes")]
    NoBranchChanges,
    #[error("missing credential")]
    MissingCredential,
    #[error("unsupported provider")]
    UnsupportedProvider,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("rate limited")]
    RateLimited,
    #[error("access forbidden")]
    AccessForbidden,
    #[error("endpoint not found")]
    EndpointNotFound,
    #[error("backend error")]
    BackendError,
    #[error("connectivity error")]
    ConnectivityError,
    #[error("network timeout")]
    NetworkTimeout,
    #[error("version control unavailable")]
    VcsUnavailable,
    #[error("empty response")]
    EmptyResponse,
}

impl FailureKind {
    pub fn code(self) -> &'static str {
        match self {
            FailureKind::NoStagedChanges => "no_staged_changes",
            FailureKind::NoBranchChanges => "no_branch_changes",
            FailureKind::MissingCredential => "missing_credential",
            FailureKind::UnsupportedProvider => "unsupported_provider",
            FailureKind::InvalidCredentials => "invalid_credentials",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::AccessForbidden => "access_forbidden",
            FailureKind::EndpointNotFound => "endpoint_not_found",
            FailureKind::BackendError => "backend_error",
            FailureKind::ConnectivityError => "connectivity_error",
            FailureKind::NetworkTimeout => "network_timeout",
            FailureKind::VcsUnavailable => "vcs_unavailable",
            FailureKind::EmptyResponse => "empty_response",
        }
    }

    /// Preconditions mean "nothing to do" rather than a broken call.
    pub fn is_precondition(self) -> bool {
        matches!(
            self,
            FailureKind::NoStagedChanges | FailureKind::NoBranchChanges
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct GenerationFailure {
    pub kind: FailureKind,
    pub provider: Option<ProviderId>,
    pub http_status: Option<u16>,
    pub detail: String,
    /// Id of the pipeline call that failed, matching its tracing span.
    pub request_id: Option<String>,
}

impl GenerationFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            provider: None,
            http_status: None,
            detail: detail.into(),
            request_id: None,
        }
    }

    pub fn for_provider(kind: FailureKind, provider: ProviderId, detail: impl Into<String>) -> Self {
        Self {
            provider: Some(provider),
            ..Self::new(kind, detail)
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn no_staged_changes() -> Self {
        Self::new(
            FailureKind::NoStagedChanges,
            "No staged changes found. Stage your changes first.",
        )
    }

    pub fn no_branch_changes() -> Self {
        Self::new(FailureKind::NoBranchChanges, "No branch changes to summarize.")
    }

    pub fn unsupported_provider(value: &str) -> Self {
        Self::new(
            FailureKind::UnsupportedProvider,
            format!("Unsupported AI provider: {value}"),
        )
    }
}

impl From<GitError> for GenerationFailure {
    fn from(error: GitError) -> Self {
        GenerationFailure::new(FailureKind::VcsUnavailable, error.to_string())
    }
}
