//! CLI configuration file support
//!
//! Loads configuration from ~/.config/mnemo/config.toml

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mnemo_ai::{ChatConfig, RetrievalBackend};
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "mnemo";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub directories: DirectoriesConfig,
    pub llm: LlmConfig,
    pub chat_history: ChatHistoryConfig,
    pub agent: AgentConfig,
    pub retrieval: RetrievalConfig,
    pub api_keys: ApiKeysConfig,
}

/// Where data and logs live
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoriesConfig {
    /// Data directory (defaults to the platform data dir + `mnemo`)
    pub data_dir: Option<PathBuf>,
    /// Database file (defaults to `<data_dir>/mnemo.db`)
    pub db_path: Option<PathBuf>,
}

/// Model selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub chat_model: String,
    pub summary_model: String,
    pub rag_model: String,
    pub temperature: f32,
    /// OpenAI-compatible endpoint; the public API when unset
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            summary_model: DEFAULT_CHAT_MODEL.to_string(),
            rag_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.0,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatHistoryConfig {
    pub max_history_pairs: usize,
    /// Defaults to `max_history_pairs`
    pub summary_threshold_pairs: Option<usize>,
    pub max_tokens: usize,
}

impl Default for ChatHistoryConfig {
    fn default() -> Self {
        let defaults = ChatConfig::default();
        Self {
            max_history_pairs: defaults.max_history_pairs,
            summary_threshold_pairs: None,
            max_tokens: defaults.max_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_function_calls: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_function_calls: ChatConfig::default().max_function_calls,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub enabled: bool,
    pub embedding_model: String,
    pub k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            embedding_model: "text-embedding-3-small".to_string(),
            k: ChatConfig::default().retrieval_k,
        }
    }
}

/// API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeysConfig {
    /// OpenAI API key
    pub openai: Option<String>,
}

impl CliConfig {
    /// Load the config file.
    ///
    /// An explicit path must exist and parse; a missing default file yields
    /// the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_path(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from_path(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR).join("config.toml"))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.directories.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.directories
            .db_path
            .clone()
            .unwrap_or_else(|| self.data_dir().join("mnemo.db"))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }

    /// Conversation limits, validated.
    pub fn chat_config(&self) -> Result<ChatConfig> {
        let history = &self.chat_history;
        let config = ChatConfig::default()
            .with_max_history_pairs(history.max_history_pairs)
            .with_summary_threshold(
                history
                    .summary_threshold_pairs
                    .unwrap_or(history.max_history_pairs),
            )
            .with_max_tokens(history.max_tokens)
            .with_max_function_calls(self.agent.max_function_calls)
            .with_retrieval_k(self.retrieval.k)
            .with_temperature(self.llm.temperature);
        config.validate()?;
        Ok(config)
    }

    pub fn retrieval_backend(&self, api_key: Option<String>) -> RetrievalBackend {
        if !self.retrieval.enabled {
            return RetrievalBackend::Disabled;
        }
        RetrievalBackend::Vector {
            api_key,
            embedding_model: self.retrieval.embedding_model.clone(),
            base_url: self.llm.base_url.clone(),
        }
    }

    /// Apply API keys to environment variables
    ///
    /// # Safety
    /// This modifies environment variables which can cause issues in multi-threaded contexts.
    /// Should only be called early in main() before spawning threads.
    pub fn apply_api_key_env(&self) {
        if let Some(key) = &self.api_keys.openai
            && std::env::var("OPENAI_API_KEY").is_err()
        {
            // SAFETY: Called early in main() before spawning threads
            unsafe { std::env::set_var("OPENAI_API_KEY", key) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: CliConfig = toml::from_str("").unwrap();
        assert_eq!(config.llm.chat_model, DEFAULT_CHAT_MODEL);
        assert!(config.retrieval.enabled);
        assert!(config.chat_config().is_ok());
    }

    #[test]
    fn test_sections_override_defaults() {
        let config: CliConfig = toml::from_str(
            r#"
            [directories]
            data_dir = "/tmp/mnemo-data"

            [llm]
            chat_model = "gpt-4o"
            temperature = 0.3

            [chat_history]
            max_history_pairs = 4
            max_tokens = 800

            [agent]
            max_function_calls = 2

            [retrieval]
            enabled = false
            k = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path(), PathBuf::from("/tmp/mnemo-data/mnemo.db"));
        assert_eq!(config.llm.summary_model, DEFAULT_CHAT_MODEL);

        let chat = config.chat_config().unwrap();
        assert_eq!(chat.max_history_pairs, 4);
        assert_eq!(chat.summary_threshold_pairs, 4);
        assert_eq!(chat.max_tokens, 800);
        assert_eq!(chat.max_function_calls, 2);
        assert_eq!(chat.retrieval_k, 5);
        assert!(matches!(config.retrieval_backend(None), RetrievalBackend::Disabled));
    }

    #[test]
    fn test_invalid_limits_are_rejected() {
        let config: CliConfig = toml::from_str("[agent]\nmax_function_calls = 0").unwrap();
        assert!(config.chat_config().is_err());
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        assert!(CliConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[api_keys]\nopenai = \"sk-file\"\n").unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.api_keys.openai.as_deref(), Some("sk-file"));
    }
}
