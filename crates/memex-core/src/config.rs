use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::MemexError;

/// Directory holding the journal database, config and logs.
pub const MEMEX_DIR: &str = ".memex";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub image: ImageConfig,
}

impl ProjectConfig {
    /// Database path, resolved against `project_root` when relative.
    #[must_use]
    pub fn store_path(&self, project_root: &Path) -> PathBuf {
        if self.store.path.is_absolute() {
            self.store.path.clone()
        } else {
            project_root.join(&self.store.path)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_chat_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_prompt_prefix")]
    pub prompt_prefix: String,
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Append a link back to the context document in generated documents.
    #[serde(default = "default_true")]
    pub backlink: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_chat_endpoint(),
            model: default_chat_model(),
            system_prompt: default_system_prompt(),
            prompt_prefix: default_prompt_prefix(),
            timeout_secs: default_ai_timeout_secs(),
            api_key: None,
            api_key_env: default_api_key_env(),
            backlink: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_image_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_image_model")]
    pub model: String,
    #[serde(default = "default_image_size")]
    pub size: String,
    #[serde(default = "default_image_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_image_endpoint(),
            model: default_image_model(),
            size: default_image_size(),
            timeout_secs: default_image_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
}

impl EffectiveConfig {
    /// API key from the project config, then the configured environment
    /// variable, then the user config. Blank values count as unset.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        resolve_api_key(&self.project.ai, &self.user, |name| env::var(name).ok())
    }
}

fn resolve_api_key(
    ai: &AiConfig,
    user: &UserConfig,
    lookup_env: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    fn non_blank(raw: Option<String>) -> Option<String> {
        raw.map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    non_blank(ai.api_key.clone())
        .or_else(|| non_blank(lookup_env(&ai.api_key_env)))
        .or_else(|| non_blank(user.api_key.clone()))
}

/// Path of the project config file under `project_root`.
#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(MEMEX_DIR).join("config.toml")
}

/// Path of the user config file, `<config_dir>/memex/config.toml`.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("memex/config.toml"))
}

/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(path) = user_config_path() else {
        return Ok(UserConfig::default());
    };

    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load the project and user config layers.
///
/// # Errors
///
/// [`MemexError::Config`] naming the file that is unreadable or malformed.
pub fn resolve_config(project_root: &Path) -> Result<EffectiveConfig, MemexError> {
    let project = load_project_config(project_root)
        .map_err(|err| config_error(&project_config_path(project_root), &err))?;
    let user = load_user_config().map_err(|err| {
        config_error(&user_config_path().unwrap_or_default(), &err)
    })?;
    Ok(EffectiveConfig { project, user })
}

fn config_error(path: &Path, err: &anyhow::Error) -> MemexError {
    MemexError::Config {
        path: path.display().to_string(),
        message: err.root_cause().to_string(),
    }
}

/// Serialized default project config, written by `mx init`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn default_project_config_toml() -> Result<String> {
    toml::to_string_pretty(&ProjectConfig::default()).context("serialize default config")
}

const fn default_true() -> bool {
    true
}

fn default_store_path() -> PathBuf {
    Path::new(MEMEX_DIR).join("documents.sqlite3")
}

fn default_chat_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful assistant writing concise, self-contained notes.".to_string()
}

fn default_prompt_prefix() -> String {
    "Please expand on this: ".to_string()
}

const fn default_ai_timeout_secs() -> u64 {
    60
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_image_endpoint() -> String {
    "https://api.openai.com/v1/images/generations".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

const fn default_image_timeout_secs() -> u64 {
    120
}
