use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::style::DEFAULT_STYLE_ID;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialConfig {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub fallback_api_key: Option<String>,
    pub default_style: Option<String>,
    pub custom_instruction: Option<String>,
    pub openai_url: Option<String>,
    pub openai_model: Option<String>,
    pub anthropic_url: Option<String>,
    pub anthropic_model: Option<String>,
    pub mistral_url: Option<String>,
    pub mistral_model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub llm_timeout_secs: Option<u64>,
    pub max_diff_bytes: Option<u64>,
    pub offline: Option<bool>,
    pub heuristic_on_failure: Option<bool>,
    pub log_diff: Option<bool>,
}

#[derive(Clone)]
pub struct ResolvedConfig {
    /// Kept as text so an unknown id surfaces as an `UnsupportedProvider`
    /// failure at call time.
    pub provider: String,
    pub api_key: Option<String>,
    pub fallback_api_key: Option<String>,
    pub default_style: String,
    pub custom_instruction: Option<String>,
    pub openai_url: String,
    pub openai_model: String,
    pub anthropic_url: String,
    pub anthropic_model: String,
    pub mistral_url: String,
    pub mistral_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub llm_timeout_secs: u64,
    pub max_diff_bytes: u64,
    pub offline: bool,
    pub heuristic_on_failure: bool,
    pub log_diff: bool,
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("fallback_api_key", &self.fallback_api_key.as_ref().map(|_| "<redacted>"))
            .field("default_style", &self.default_style)
            .field("custom_instruction", &self.custom_instruction)
            .field("openai_url", &self.openai_url)
            .field("openai_model", &self.openai_model)
            .field("anthropic_url", &self.anthropic_url)
            .field("anthropic_model", &self.anthropic_model)
            .field("mistral_url", &self.mistral_url)
            .field("mistral_model", &self.mistral_model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("max_diff_bytes", &self.max_diff_bytes)
            .field("offline", &self.offline)
            .field("heuristic_on_failure", &self.heuristic_on_failure)
            .field("log_diff", &self.log_diff)
            .finish()
    }
}

impl ResolvedConfig {
    pub fn defaults() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key: None,
            fallback_api_key: None,
            default_style: DEFAULT_STYLE_ID.to_string(),
            custom_instruction: None,
            openai_url: "https://api.openai.com".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
            anthropic_url: "https://api.anthropic.com".to_string(),
            anthropic_model: "claude-3-haiku-20240307".to_string(),
            mistral_url: "https://api.mistral.ai".to_string(),
            mistral_model: "mistral-tiny".to_string(),
            max_tokens: 150,
            temperature: 0.7,
            llm_timeout_secs: 30,
            max_diff_bytes: 60_000,
            offline: false,
            heuristic_on_failure: false,
            log_diff: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    MissingFile { path: PathBuf },
    #[error("config file read error: {path}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("config file parse error: {path}: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("config path error: {0}")]
    Path(String),
    #[error("invalid env var {key}={value}")]
    InvalidEnv { key: String, value: String },
}

pub const ENV_PREFIX: &str = "COMMIT_MUSE_";
pub const CONFIG_PATH_ENV: &str = "COMMIT_MUSE_CONFIG";

pub fn resolve_config(
    cli_path: Option<PathBuf>,
    overrides: PartialConfig,
) -> Result<ResolvedConfig, ConfigError> {
    let env_path = config_path_from_env();
    let required = cli_path.is_some() || env_path.is_some();
    let path = match cli_path.or(env_path) {
        Some(path) => path,
        None => default_config_path()?,
    };

    let file_config = load_config_file(&path, required)?;
    let env_config = load_env_config()?;

    let mut resolved = ResolvedConfig::defaults();
    // Precedence: defaults < config file < env vars < CLI overrides.
    file_config.apply_to(&mut resolved);
    env_config.apply_to(&mut resolved);
    overrides.apply_to(&mut resolved);

    Ok(resolved)
}

fn load_config_file(path: &Path, required: bool) -> Result<PartialConfig, ConfigError> {
    if !path.exists() {
        if required {
            return Err(ConfigError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        return Ok(PartialConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&contents).map_err(|source| ConfigError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

fn load_env_config() -> Result<PartialConfig, ConfigError> {
    let mut config = PartialConfig::default();

    config.provider = env("PROVIDER");
    config.api_key = env("API_KEY");
    config.fallback_api_key = env("FALLBACK_API_KEY");
    config.default_style = env("DEFAULT_STYLE");
    config.custom_instruction = env("CUSTOM_INSTRUCTION");
    config.openai_url = env("OPENAI_URL");
    config.openai_model = env("OPENAI_MODEL");
    config.anthropic_url = env("ANTHROPIC_URL");
    config.anthropic_model = env("ANTHROPIC_MODEL");
    config.mistral_url = env("MISTRAL_URL");
    config.mistral_model = env("MISTRAL_MODEL");

    if let Some(value) = env("MAX_TOKENS") {
        config.max_tokens = Some(parse_value("MAX_TOKENS", &value)?);
    }
    if let Some(value) = env("TEMPERATURE") {
        config.temperature = Some(parse_value("TEMPERATURE", &value)?);
    }
    if let Some(value) = env("LLM_TIMEOUT_SECS") {
        config.llm_timeout_secs = Some(parse_value("LLM_TIMEOUT_SECS", &value)?);
    }
    if let Some(value) = env("MAX_DIFF_BYTES") {
        config.max_diff_bytes = Some(parse_value("MAX_DIFF_BYTES", &value)?);
    }
    if let Some(value) = env("OFFLINE") {
        config.offline = Some(parse_bool("OFFLINE", &value)?);
    }
    if let Some(value) = env("HEURISTIC_ON_FAILURE") {
        config.heuristic_on_failure = Some(parse_bool("HEURISTIC_ON_FAILURE", &value)?);
    }
    if let Some(value) = env("LOG_DIFF") {
        config.log_diff = Some(parse_bool("LOG_DIFF", &value)?);
    }

    Ok(config)
}

fn config_path_from_env() -> Option<PathBuf> {
    env_os(CONFIG_PATH_ENV).map(PathBuf::from)
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    let base_dirs = directories::BaseDirs::new()
        .ok_or_else(|| ConfigError::Path("home directory not available".to_string()))?;

    if cfg!(target_os = "macos") {
        Ok(base_dirs
            .home_dir()
            .join("Library/Application Support/commit-muse/config.toml"))
    } else {
        Ok(base_dirs.home_dir().join(".config/commit-muse/config.toml"))
    }
}

fn env(suffix: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{suffix}"))
        .ok()
        .filter(|value| !value.is_empty())
}

fn env_os(key: &str) -> Option<OsString> {
    std::env::var_os(key)
}

fn invalid_env(suffix: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        key: format!("{ENV_PREFIX}{suffix}"),
        value: value.to_string(),
    }
}

fn parse_bool(suffix: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(invalid_env(suffix, value)),
    }
}

fn parse_value<T: std::str::FromStr>(suffix: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid_env(suffix, value))
}

impl PartialConfig {
    fn apply_to(self, resolved: &mut ResolvedConfig) {
        if let Some(value) = self.provider {
            resolved.provider = value;
        }
        if let Some(value) = self.api_key {
            resolved.api_key = Some(value);
        }
        if let Some(value) = self.fallback_api_key {
            resolved.fallback_api_key = Some(value);
        }
        if let Some(value) = self.default_style {
            resolved.default_style = value;
        }
        if let Some(value) = self.custom_instruction {
            resolved.custom_instruction = Some(value);
        }
        if let Some(value) = self.openai_url {
            resolved.openai_url = value;
        }
        if let Some(value) = self.openai_model {
            resolved.openai_model = value;
        }
        if let Some(value) = self.anthropic_url {
            resolved.anthropic_url = value;
        }
        if let Some(value) = self.anthropic_model {
            resolved.anthropic_model = value;
        }
        if let Some(value) = self.mistral_url {
            resolved.mistral_url = value;
        }
        if let Some(value) = self.mistral_model {
            resolved.mistral_model = value;
        }
        if let Some(value) = self.max_tokens {
            resolved.max_tokens = value;
        }
        if let Some(value) = self.temperature {
            resolved.temperature = value;
        }
        if let Some(value) = self.llm_timeout_secs {
            resolved.llm_timeout_secs = value;
        }
        if let Some(value) = self.max_diff_bytes {
            resolved.max_diff_bytes = value;
        }
        if let Some(value) = self.offline {
            resolved.offline = value;
        }
        if let Some(value) = self.heuristic_on_failure {
            resolved.heuristic_on_failure = value;
        }
        if let Some(value) = self.log_diff {
            resolved.log_diff = value;
        }
    }
}
