use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use superpowers_provider::{AgentRunner, ChatModel, OpenAiChatModel, ThreadMemory};
use superpowers_store::{seed_defaults, SqliteStore};
use superpowers_tools::{AgentAssembler, AgentConfig, ToolFactory};
use superpowers_types::{Document, Provider};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

const HELP: &str = "Commands:\n  \
    /agents              list agents\n  \
    /tools               list the current agent's tools\n  \
    /upload <path.csv>   add a CSV file to the agent's knowledge base\n  \
    /reset               start the conversation over\n  \
    /quit                exit";

/// Gateway service - main orchestrator
pub struct GatewayService {
    config: Config,
    agent_id: Option<String>,
}

impl GatewayService {
    pub fn new(config: Config, agent_id: Option<String>) -> Self {
        Self { config, agent_id }
    }

    fn provider(&self) -> Provider {
        let providers = &self.config.providers;
        match providers.default.as_str() {
            "openai" => {
                let api_key = providers.openai.api_key.clone().filter(|k| !k.is_empty());
                let base_url = providers.openai.base_url.clone().filter(|u| !u.is_empty());
                Provider::openai_full(&providers.openai.model, api_key, base_url)
            }
            "ollama" => Provider::ollama(&providers.ollama.model, &providers.ollama.base_url),
            other => {
                warn!("Unknown provider '{}', defaulting to OpenAI", other);
                Provider::openai(&providers.openai.model)
            }
        }
    }

    /// Run the gateway service
    pub async fn run(self) -> Result<()> {
        superpowers_logging::init_logging(&self.config.logging.level, self.config.logging.json)?;
        info!("Starting Superpowers Gateway");

        info!(
            "Agent config: max_tool_iterations={}, mode={:?}, history_limit={}",
            self.config.agent.max_tool_iterations,
            self.config.agent.mode,
            self.config.agent.history_limit
        );

        let store = Arc::new(SqliteStore::new(&self.config.database.path).await?);
        seed_defaults(&store).await?;

        let model: Arc<dyn ChatModel> = Arc::new(OpenAiChatModel::new(self.provider())?);
        let embedder = self.config.embedding_config().build()?;
        let factory = ToolFactory::new(self.config.sandbox.clone(), embedder)?
            .with_batch_size(self.config.embeddings.batch_size);
        let assembler =
            AgentAssembler::new(store.clone(), factory).with_mode(self.config.agent.mode);

        let agent_id = match &self.agent_id {
            Some(id) => id.clone(),
            None => store
                .list_agents()
                .await?
                .first()
                .map(|a| a.id.clone())
                .ok_or_else(|| anyhow!("No agents found in {}", self.config.database.path))?,
        };

        let session = ConsoleSession {
            store,
            assembler,
            model,
            memory: Arc::new(ThreadMemory::new(self.config.agent.history_limit)),
            agent_config: self.config.agent.clone(),
            agent_id,
            thread_id: superpowers_types::new_id(),
        };

        let shutdown = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
            }
            info!("Received shutdown signal");
        };

        tokio::select! {
            result = session.run() => {
                if let Err(e) = result {
                    error!("Console session error: {:#}", e);
                }
            }
            _ = shutdown => {
                info!("Shutting down gracefully...");
            }
        }

        info!("Gateway service stopped");
        Ok(())
    }
}

/// One stdin/stdout conversation with a single agent
struct ConsoleSession {
    store: Arc<SqliteStore>,
    assembler: AgentAssembler,
    model: Arc<dyn ChatModel>,
    memory: Arc<ThreadMemory>,
    agent_config: AgentConfig,
    agent_id: String,
    thread_id: String,
}

impl ConsoleSession {
    /// Resolve the agent afresh so new documents and skill edits are picked up
    async fn runner(&self) -> Result<AgentRunner> {
        let assembled = self.assembler.assemble(&self.agent_id).await?;
        println!("Talking to {} (type /help for commands)", assembled.catalog.agent.name);
        Ok(assembled.into_runner(self.model.clone(), self.memory.clone(), &self.agent_config))
    }

    async fn run(&self) -> Result<()> {
        let mut runner = self.runner().await?;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match line.split_once(' ').map_or((line, ""), |(c, rest)| (c, rest.trim())) {
                ("/quit" | "/exit", _) => break,
                ("/help", _) => println!("{}", HELP),
                ("/agents", _) => self.list_agents().await?,
                ("/tools", _) => println!("{}", runner.tools().names().join(", ")),
                ("/reset", _) => {
                    runner.reset(&self.thread_id).await;
                    println!("Conversation cleared.");
                }
                ("/upload", path) => match self.upload(path).await {
                    Ok(message) => {
                        println!("{}", message);
                        runner = self.runner().await?;
                    }
                    Err(e) => println!("Upload failed: {:#}", e),
                },
                _ => match runner.run_turn(&self.thread_id, line).await {
                    Ok(answer) => println!("{}", answer),
                    Err(e) => {
                        error!("Turn failed: {:#}", e);
                        println!("Sorry, something went wrong: {}", e);
                    }
                },
            }
        }

        Ok(())
    }

    async fn list_agents(&self) -> Result<()> {
        for agent in self.store.list_agents().await? {
            let marker = if agent.id == self.agent_id { "*" } else { " " };
            println!("{} {}  {}", marker, agent.id, agent.name);
        }
        Ok(())
    }

    async fn upload(&self, path: &str) -> Result<String> {
        if path.is_empty() {
            return Err(anyhow!("usage: /upload <path.csv>"));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path))?;
        let name = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path)
            .to_string();

        let document = Document::new(&self.agent_id, &name, content);
        self.store.add_document(&document).await?;
        info!("Uploaded document '{}' for agent {}", name, self.agent_id);
        Ok(format!("Uploaded {}", name))
    }
}
