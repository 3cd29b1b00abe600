use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use superpowers_knowledge::{EmbeddingConfig, EmbeddingProviderKind};
use superpowers_sandbox::SandboxConfig;
use superpowers_tools::AgentConfig;

/// Default config template created when no config exists
const DEFAULT_CONFIG: &str = r#"
[providers]
default = "openai"  # or "ollama"

[providers.openai]
api_key = ""  # Set via OPENAI_API_KEY env var
model = "gpt-4o-mini"
base_url = ""  # Optional: Set via OPENAI_BASE_URL env var

[providers.ollama]
base_url = "http://localhost:11434"
model = "llama3"

[embeddings]
provider = "openai"  # openai, ollama or hashing (offline)
model = "text-embedding-3-small"
dimension = 256  # hashing provider only

[database]
path = "superpowers.db"  # Set via DATABASE_URL env var

[logging]
level = "info"  # trace, debug, info, warn, error
json = false

[sandbox]
timeout_ms = 50000
memory_limit_mb = 64
max_stack_kb = 1024
allow_network = true
isolation = "process"  # or "thread"; process needs superpowers-isolate next to this binary

[agent]
max_tool_iterations = 10
mode = "text"  # or "voice"
history_limit = 50
"#;

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAIConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    pub default: String,
    pub openai: OpenAIConfig,
    pub ollama: OllamaConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

impl Config {
    /// Get the global config path: ~/.superpowers/superpowers.toml
    fn global_config_path() -> anyhow::Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".superpowers").join("superpowers.toml"))
    }

    /// Ensure global config directory and file exist, creating defaults if needed
    fn ensure_global_config() -> anyhow::Result<PathBuf> {
        let config_path = Self::global_config_path()?;

        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir)?;
                eprintln!("Created config directory: {}", config_dir.display());
            }
        }

        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG.trim())?;
            eprintln!("Created default config: {}", config_path.display());
            eprintln!("Please edit this file or set environment variables.");
        }

        Ok(config_path)
    }

    /// Load configuration with layered approach:
    /// 1. Global config: ~/.superpowers/superpowers.toml (auto-created if missing)
    /// 2. Local override: ./superpowers.toml (workspace, optional)
    /// 3. Explicit file passed with `--config`
    /// 4. Environment variables (highest priority)
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        // Load .env file from current directory
        dotenvy::dotenv().ok();

        let global_config_path = Self::ensure_global_config()?;

        let mut config_builder = config::Config::builder()
            .add_source(config::File::from(global_config_path))
            .add_source(config::File::with_name("superpowers").required(false));

        if let Some(path) = explicit {
            config_builder = config_builder.add_source(config::File::from(path.to_path_buf()));
        }

        config_builder = config_builder
            .add_source(config::Environment::with_prefix("SUPERPOWERS").separator("__"));

        // Convenience env var overrides
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            config_builder = config_builder.set_override("providers.openai.api_key", key)?;
        }

        if let Ok(url) = env::var("OPENAI_BASE_URL") {
            config_builder = config_builder.set_override("providers.openai.base_url", url)?;
        }

        if let Ok(url) = env::var("OLLAMA_BASE_URL") {
            config_builder = config_builder.set_override("providers.ollama.base_url", url)?;
        }

        if let Ok(url) = env::var("DATABASE_URL") {
            config_builder = config_builder.set_override("database.path", database_path(&url))?;
        }

        let config = config_builder.build()?;

        let config: Self = config.try_deserialize()?;
        Ok(config)
    }

    /// Embedding settings, borrowing the chat provider's credentials when the
    /// embeddings table leaves them out
    pub fn embedding_config(&self) -> EmbeddingConfig {
        let mut embeddings = self.embeddings.clone();
        let missing = |v: &Option<String>| v.as_deref().map_or(true, str::is_empty);

        match embeddings.provider {
            EmbeddingProviderKind::OpenAI => {
                if missing(&embeddings.api_key) {
                    embeddings.api_key = self.providers.openai.api_key.clone();
                }
                if missing(&embeddings.base_url) {
                    embeddings.base_url = self.providers.openai.base_url.clone();
                }
            }
            EmbeddingProviderKind::Ollama => {
                if missing(&embeddings.base_url) {
                    embeddings.base_url = Some(self.providers.ollama.base_url.clone());
                }
            }
            EmbeddingProviderKind::Hashing => {}
        }
        embeddings
    }
}

/// Accept both bare paths and `sqlite:` URLs
fn database_path(url: &str) -> String {
    let path = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")).unwrap_or(url);
    path.split('?').next().unwrap_or(path).to_string()
}
