//! Configuration management for Coursemate.
//!
//! Settings are layered, later layers winning:
//! 1. Built-in defaults
//! 2. `.coursemate/config.yaml` inside the workspace (or `COURSEMATE_CONFIG`)
//! 3. `COURSEMATE_*` environment variables
//! 4. Command-line flags ([`CliOverrides`])

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 3] = ["anthropic", "claude", "ollama"];

const DATA_DIR: &str = ".coursemate";

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Resolved application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding `.coursemate/`
    pub workspace: PathBuf,

    /// Explicit config file, when not the workspace default
    pub config_file: Option<PathBuf>,

    /// Generative model provider ("anthropic", "ollama")
    pub provider: String,

    pub model: String,

    pub api_key: Option<String>,

    pub log_level: Option<String>,

    /// "pretty" or "json"
    pub log_format: String,

    pub verbose: bool,

    pub no_color: bool,

    /// Per-provider entries from config.yaml, keyed by provider name
    pub providers: HashMap<String, ProviderEntry>,

    /// Retrieval and answer-loop tuning
    pub rag: RagSettings,
}

/// One provider block of config.yaml.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderEntry {
    pub model: Option<String>,
    pub endpoint: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
}

/// Retrieval, ingestion and answer-loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Character budget per content chunk
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,

    /// Result cap for content searches
    pub max_results: usize,

    /// Exchanges remembered per session
    pub max_history: usize,

    /// Tool rounds before the forced final answer
    pub max_rounds: usize,

    /// Completion token cap per model call
    pub max_tokens: u32,

    pub temperature: f32,

    /// Extra attempts per model call on transport failure
    pub retry_attempts: u32,

    /// Initial retry backoff in milliseconds (doubles per attempt)
    pub retry_backoff_ms: u64,

    /// Embedding provider name ("trigram", "ollama")
    pub embedding_provider: String,

    pub embedding_model: String,

    pub embedding_dim: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
            max_results: 5,
            max_history: 2,
            max_rounds: 2,
            max_tokens: 800,
            temperature: 0.0,
            retry_attempts: 2,
            retry_backoff_ms: 250,
            embedding_provider: "trigram".to_string(),
            embedding_model: "trigram-v1".to_string(),
            embedding_dim: 384,
        }
    }
}

/// On-disk layout of config.yaml. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileLayer {
    llm: Option<LlmSection>,
    rag: Option<RagSettings>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Deserialize)]
struct LlmSection {
    #[serde(rename = "activeProvider")]
    active_provider: Option<String>,
    #[serde(default)]
    providers: HashMap<String, ProviderEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggingSection {
    level: Option<String>,
    format: Option<String>,
    color: Option<bool>,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub workspace: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub log_level: Option<String>,
    pub verbose: bool,
    pub no_color: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key: None,
            log_level: None,
            log_format: "pretty".to_string(),
            verbose: false,
            no_color: false,
            providers: HashMap::new(),
            rag: RagSettings::default(),
        }
    }
}

impl AppConfig {
    /// Build the configuration from defaults, config.yaml and the environment.
    ///
    /// Recognised variables: `COURSEMATE_WORKSPACE`, `COURSEMATE_CONFIG`,
    /// `COURSEMATE_PROVIDER`, `COURSEMATE_MODEL`, `COURSEMATE_API_KEY`,
    /// `RUST_LOG` and `NO_COLOR`.
    pub fn load() -> AppResult<Self> {
        Self::load_with(CliOverrides::default())
    }

    /// Like [`AppConfig::load`], but a workspace or config file given on the
    /// command line decides which config.yaml is read.
    pub fn load_with(cli: CliOverrides) -> AppResult<Self> {
        let mut config = Self::default();
        config.workspace = cli
            .workspace
            .clone()
            .or_else(|| env_var("COURSEMATE_WORKSPACE").map(PathBuf::from))
            .unwrap_or(config.workspace);
        config.config_file = cli
            .config_file
            .clone()
            .or_else(|| env_var("COURSEMATE_CONFIG").map(PathBuf::from));

        if !config.workspace.is_dir() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {}",
                config.workspace.display()
            )));
        }

        let yaml_path = config.config_path();
        if yaml_path.is_file() {
            config.apply_file(&yaml_path)?;
        }

        config.apply_env();
        Ok(config.with_overrides(cli))
    }

    /// Config file in effect: the explicit one, else the workspace default.
    pub fn config_path(&self) -> PathBuf {
        self.config_file
            .clone()
            .unwrap_or_else(|| self.data_dir().join("config.yaml"))
    }

    fn apply_env(&mut self) {
        self.provider = env_var("COURSEMATE_PROVIDER").unwrap_or_else(|| self.provider.clone());
        self.model = env_var("COURSEMATE_MODEL").unwrap_or_else(|| self.model.clone());
        self.api_key = env_var("COURSEMATE_API_KEY");
        self.log_level = self.log_level.take().or_else(|| env_var("RUST_LOG"));
        self.no_color |= std::env::var_os("NO_COLOR").is_some();
    }

    fn apply_file(&mut self, path: &Path) -> AppResult<()> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let layer: FileLayer = serde_yaml::from_str(&raw).map_err(|e| {
            AppError::Config(format!("Invalid YAML in {}: {}", path.display(), e))
        })?;
        self.apply_layer(layer);
        Ok(())
    }

    fn apply_layer(&mut self, layer: FileLayer) {
        if let Some(logging) = layer.logging {
            self.log_level = logging.level.or(self.log_level.take());
            self.log_format = logging.format.unwrap_or_else(|| self.log_format.clone());
            self.no_color = logging.color.map_or(self.no_color, |color| !color);
        }

        self.rag = layer.rag.unwrap_or_else(|| self.rag.clone());

        if let Some(llm) = layer.llm {
            self.providers = llm.providers;
            if let Some(active) = llm.active_provider {
                self.provider = active;
            }
            let model = self.providers.get(&self.provider).and_then(|p| p.model.clone());
            self.model = model.unwrap_or_else(|| self.model.clone());
        }
    }

    /// Apply command-line values on top of everything else.
    pub fn with_overrides(mut self, cli: CliOverrides) -> Self {
        self.workspace = cli.workspace.unwrap_or(self.workspace);
        self.config_file = cli.config_file.or(self.config_file);
        self.provider = cli.provider.unwrap_or(self.provider);
        self.model = cli.model.unwrap_or(self.model);
        self.log_level = cli.log_level.or(self.log_level);
        self.no_color |= cli.no_color;

        if cli.verbose {
            self.verbose = true;
            self.log_level.get_or_insert_with(|| "debug".to_string());
        }

        self
    }

    /// The `.coursemate` directory of the workspace.
    pub fn data_dir(&self) -> PathBuf {
        self.workspace.join(DATA_DIR)
    }

    /// SQLite vector index location.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir().join("index.sqlite")
    }

    /// SQLite file holding conversation history.
    pub fn sessions_path(&self) -> PathBuf {
        self.data_dir().join("sessions.sqlite")
    }

    pub fn ensure_data_dir(&self) -> AppResult<()> {
        let dir = self.data_dir();
        std::fs::create_dir_all(&dir).map_err(|e| {
            AppError::Config(format!("Cannot create {}: {}", dir.display(), e))
        })
    }

    /// Endpoint declared for a provider in config.yaml.
    pub fn provider_endpoint(&self, provider: &str) -> Option<String> {
        self.providers.get(provider)?.endpoint.clone()
    }

    /// API key lookup order: `COURSEMATE_API_KEY`, the provider's `apiKeyEnv`,
    /// then `ANTHROPIC_API_KEY` for Anthropic.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| {
                self.providers
                    .get(provider)
                    .and_then(|entry| entry.api_key_env.as_deref())
                    .and_then(env_var)
            })
            .or_else(|| {
                matches!(provider, "anthropic" | "claude")
                    .then(|| env_var("ANTHROPIC_API_KEY"))
                    .flatten()
            })
    }

    /// Reject settings the answer pipeline cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.to_lowercase();
        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider '{}' (expected one of: {})",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        let rag = &self.rag;
        if rag.max_rounds == 0 {
            return Err(AppError::Config("rag.max_rounds must be at least 1".to_string()));
        }
        if rag.chunk_overlap >= rag.chunk_size {
            return Err(AppError::Config(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                rag.chunk_overlap, rag.chunk_size
            )));
        }

        if provider != "ollama" && self.resolve_api_key(&provider).is_none() {
            return Err(AppError::Config(format!(
                "Provider '{}' needs an API key: set COURSEMATE_API_KEY or ANTHROPIC_API_KEY",
                self.provider
            )));
        }

        Ok(())
    }
}
