//! Tool identifier to implementation mapping

use crate::builtin::{HttpCallTool, QueryDbTool};
use crate::query_files::QueryFilesTool;
use crate::run_script::RunScriptTool;
use anyhow::Result;
use std::sync::Arc;
use superpowers_knowledge::index::DEFAULT_BATCH_SIZE;
use superpowers_knowledge::EmbeddingProvider;
use superpowers_provider::{ToolFunction, ToolRegistry};
use superpowers_sandbox::{SandboxConfig, ScriptExecutor};
use superpowers_skills::ResolvedCatalog;
use superpowers_types::Document;
use tracing::{debug, info};

/// Builds per-conversation tool registries from resolved catalogs
///
/// Static tools are shared across registries; `run_script` and
/// `query_files` are bound to the agent being assembled.
pub struct ToolFactory {
    http_call: Arc<HttpCallTool>,
    query_db: Arc<QueryDbTool>,
    executor: ScriptExecutor,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl ToolFactory {
    pub fn new(sandbox: SandboxConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        Ok(Self {
            http_call: Arc::new(HttpCallTool::new()?),
            query_db: Arc::new(QueryDbTool),
            executor: ScriptExecutor::new(sandbox),
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn executor(&self) -> &ScriptExecutor {
        &self.executor
    }

    /// Map each of the catalog's tool identifiers to a tool
    ///
    /// `documents` are the agent's knowledge base, indexed only when
    /// `query_files` is declared. Unknown identifiers are skipped.
    pub async fn build(&self, catalog: &ResolvedCatalog, documents: &[Document]) -> ToolRegistry {
        let mut registry = ToolRegistry::new();

        for id in catalog.tool_ids.iter() {
            let tool: Arc<dyn ToolFunction> = match id.as_str() {
                "http_call" => self.http_call.clone(),
                "query_db" => self.query_db.clone(),
                "run_script" => Arc::new(RunScriptTool::new(
                    Arc::clone(&catalog.scripts),
                    self.executor.clone(),
                )),
                "query_files" => Arc::new(
                    QueryFilesTool::build_with_batch_size(
                        Arc::clone(&self.embedder),
                        documents,
                        self.batch_size,
                    )
                    .await,
                ),
                other => {
                    debug!("No tool registered for identifier '{}'", other);
                    continue;
                }
            };
            registry.register(tool);
        }

        info!(
            agent = %catalog.agent.name,
            "Built tool registry: [{}]",
            registry.names().join(", ")
        );
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use superpowers_knowledge::HashingEmbeddings;
    use superpowers_types::{Agent, Superpower};

    fn factory() -> ToolFactory {
        ToolFactory::new(SandboxConfig::default(), Arc::new(HashingEmbeddings::new(64))).unwrap()
    }

    #[tokio::test]
    async fn test_known_ids_map_in_order() {
        let skill = Superpower::new("Kit", "")
            .with_id("k")
            .with_tool("query_db")
            .with_tool("http_call")
            .with_tool("teleport")
            .with_tool("run_script");
        let catalog = ResolvedCatalog::from_parts(Agent::new("Bot", "").with_superpower("k"), vec![skill]);

        let registry = factory().build(&catalog, &[]).await;
        assert_eq!(registry.names(), vec!["query_db", "http_call", "run_script"]);
    }

    #[tokio::test]
    async fn test_empty_catalog_builds_empty_registry() {
        let catalog = ResolvedCatalog::from_parts(Agent::new("Bot", ""), Vec::new());
        assert!(factory().build(&catalog, &[]).await.is_empty());
    }
}
