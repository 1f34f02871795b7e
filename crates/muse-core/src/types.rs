//! JSON response types shared by the CLI and the HTTP server.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GenerationFailure;
use crate::git::RepoInfo;
use crate::provider::ProviderId;
use crate::style::StyleDef;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub schema_version: String,
    pub request_id: Option<String>,
    pub kind: ResponseKind,
    pub style: Option<String>,
    pub source: MessageSource,
    pub provider: Option<ProviderId>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    CommitMessage,
    PrSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
    Backend,
    Heuristic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesResponse {
    pub schema_version: String,
    pub styles: Vec<StyleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleEntry {
    pub id: String,
    pub name: String,
    pub example: String,
}

impl From<&StyleDef> for StyleEntry {
    fn from(def: &StyleDef) -> Self {
        Self {
            id: def.id.to_string(),
            name: def.display_name.to_string(),
            example: def.example.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoStatusResponse {
    pub schema_version: String,
    pub branch: Option<String>,
    pub has_changes: bool,
    pub staged: Vec<String>,
    pub unstaged: Vec<String>,
    pub untracked: Vec<String>,
    pub conflicted: Vec<String>,
}

impl From<RepoInfo> for RepoStatusResponse {
    fn from(info: RepoInfo) -> Self {
        Self {
            schema_version: crate::SCHEMA_VERSION.to_string(),
            has_changes: info.has_changes(),
            branch: info.branch,
            staged: info.status.staged,
            unstaged: info.status.unstaged,
            untracked: info.status.untracked,
            conflicted: info.status.conflicted,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub schema_version: String,
    pub request_id: Option<String>,
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

impl From<&GenerationFailure> for ErrorDetail {
    fn from(failure: &GenerationFailure) -> Self {
        let mut details = serde_json::Map::new();
        if let Some(provider) = failure.provider {
            details.insert("provider".to_string(), Value::from(provider.as_str()));
        }
        if let Some(status) = failure.http_status {
            details.insert("http_status".to_string(), Value::from(status));
        }
        Self {
            code: failure.kind.code().to_string(),
            message: failure.detail.clone(),
            details: if details.is_empty() {
                None
            } else {
                Some(Value::Object(details))
            },
        }
    }
}
