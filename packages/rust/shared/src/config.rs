//! Application configuration for TrendChat.
//!
//! User config lives at `~/.trendchat/trendchat.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TrendChatError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "trendchat.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".trendchat";

/// Hard upper bound on terms per search call.
pub const MAX_TERMS_CAP: usize = 3;

// ---------------------------------------------------------------------------
// Config structs (matching trendchat.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Transcript search endpoint settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// OpenRouter (or any OpenAI-compatible provider) settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Conversation loop settings.
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Which tool shape the language model is offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolSignature {
    /// `semantic_multi_search(terms: [string])`, up to `max_terms` phrases.
    #[default]
    Batch,
    /// `semantic_search(term: string)`, one phrase per call.
    Single,
}

impl std::fmt::Display for ToolSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Batch => write!(f, "batch"),
            Self::Single => write!(f, "single"),
        }
    }
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Semantic transcript search endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// `limit` query parameter sent with every term.
    #[serde(default = "default_per_term_limit")]
    pub per_term_limit: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of terms issued per search call.
    #[serde(default = "default_max_terms")]
    pub max_terms: usize,

    /// Tool shape offered to the model.
    #[serde(default)]
    pub tool_signature: ToolSignature,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            per_term_limit: default_per_term_limit(),
            timeout_secs: default_timeout_secs(),
            max_terms: default_max_terms(),
            tool_signature: ToolSignature::default(),
        }
    }
}

fn default_endpoint() -> String {
    "https://app.glystn.com/api/transcript_vector_search".into()
}
fn default_per_term_limit() -> u32 {
    20
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_max_terms() -> usize {
    MAX_TERMS_CAP
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for the conversation.
    #[serde(default = "default_model")]
    pub default_model: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            default_model: default_model(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "openai/o4-mini".into()
}

/// `[chat]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Maximum model round-trips that may end in tool calls before giving up.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

fn default_max_tool_rounds() -> u32 {
    4
}

impl AppConfig {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let endpoint = Url::parse(&self.search.endpoint).map_err(|e| {
            TrendChatError::validation(format!(
                "search.endpoint '{}' is not a valid URL: {e}",
                self.search.endpoint
            ))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(TrendChatError::validation(format!(
                "search.endpoint must be http(s), got '{}'",
                endpoint.scheme()
            )));
        }

        if !(1..=MAX_TERMS_CAP).contains(&self.search.max_terms) {
            return Err(TrendChatError::validation(format!(
                "search.max_terms must be between 1 and {MAX_TERMS_CAP}, got {}",
                self.search.max_terms
            )));
        }
        if self.search.per_term_limit == 0 {
            return Err(TrendChatError::validation("search.per_term_limit cannot be 0"));
        }
        if self.search.timeout_secs == 0 {
            return Err(TrendChatError::validation("search.timeout_secs cannot be 0"));
        }

        Url::parse(&self.openrouter.base_url).map_err(|e| {
            TrendChatError::validation(format!(
                "openrouter.base_url '{}' is not a valid URL: {e}",
                self.openrouter.base_url
            ))
        })?;

        if self.chat.max_tool_rounds == 0 {
            return Err(TrendChatError::validation("chat.max_tool_rounds cannot be 0"));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.trendchat/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TrendChatError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.trendchat/trendchat.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TrendChatError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        TrendChatError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;

    tracing::debug!(?path, "loaded config");
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TrendChatError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TrendChatError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TrendChatError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the provider API key from the env var named in config.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(TrendChatError::config(format!(
            "API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
        ))),
    }
}
