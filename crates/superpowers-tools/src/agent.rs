//! Agent assembly: catalog, tools, prompt and middleware for one conversation

use crate::registry::ToolFactory;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use superpowers_provider::memory::DEFAULT_HISTORY_LIMIT;
use superpowers_provider::runner::DEFAULT_MAX_ITERATIONS;
use superpowers_provider::{AgentRunner, ChatModel, ThreadMemory, ToolRegistry};
use superpowers_skills::{CatalogResolver, ResolveError, ResolvedCatalog, SkillMiddleware};
use superpowers_store::RecordStore;
use superpowers_types::Document;
use tracing::info;

const TEXT_MODE_DIRECTIVE: &str = "\n\nNEVER MENTION USING TOOLS, MISTAKES, OR THAT YOU WILL CHECK SOMETHING—JUST DO IT. DO NOT PROVIDE COMMENTARY BEFORE USING A TOOL; CALL IT IMMEDIATELY WHEN NEEDED. NEVER MENTION A SKILL OR A SEARCH IN SOME DOCUMENT, NEITHER A SCRIPT EXECUTION OR SKILL LOADING.";

/// How answers are delivered to the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Chat; the model is told to act without narrating its tool use
    #[default]
    Text,
    /// Spoken replies
    Voice,
}

/// Agent settings, deserialized from the `[agent]` config table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_tool_iterations: usize,
    pub mode: Mode,
    /// Messages kept per conversation thread
    pub history_limit: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: DEFAULT_MAX_ITERATIONS,
            mode: Mode::Text,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Base prompt, then the knowledge base listing, then the text-mode directive
pub fn compose_system_prompt(base_prompt: &str, documents: &[Document], mode: Mode) -> String {
    let mut prompt = base_prompt.to_string();
    if !documents.is_empty() {
        let names: Vec<&str> = documents.iter().map(|d| d.name.as_str()).collect();
        prompt.push_str(&format!(
            "\n\n## Knowledge Base\n\nYou have access to the following files in your knowledge base: {}.",
            names.join(", ")
        ));
    }
    if mode == Mode::Text {
        prompt.push_str(TEXT_MODE_DIRECTIVE);
    }
    prompt
}

/// Everything one conversation with an agent needs
pub struct AssembledAgent {
    pub catalog: ResolvedCatalog,
    pub system_prompt: String,
    pub tools: ToolRegistry,
    pub middleware: Arc<SkillMiddleware>,
}

impl AssembledAgent {
    /// Wire the parts into a runner driven by `model`
    pub fn into_runner(
        self,
        model: Arc<dyn ChatModel>,
        memory: Arc<ThreadMemory>,
        config: &AgentConfig,
    ) -> AgentRunner {
        AgentRunner::new(model, self.system_prompt)
            .with_tools(self.tools)
            .with_middleware(self.middleware)
            .with_memory(memory)
            .with_max_iterations(config.max_tool_iterations)
    }
}

/// Resolves an agent and builds its prompt, tools and skill middleware
pub struct AgentAssembler {
    store: Arc<dyn RecordStore>,
    factory: ToolFactory,
    mode: Mode,
}

impl AgentAssembler {
    pub fn new(store: Arc<dyn RecordStore>, factory: ToolFactory) -> Self {
        Self {
            store,
            factory,
            mode: Mode::default(),
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub async fn assemble(&self, agent_id: &str) -> Result<AssembledAgent, ResolveError> {
        let catalog = CatalogResolver::resolve(self.store.as_ref(), agent_id).await?;
        let documents = self.store.get_documents(agent_id).await?;

        let tools = self.factory.build(&catalog, &documents).await;
        let system_prompt = compose_system_prompt(&catalog.agent.base_prompt, &documents, self.mode);
        let middleware = Arc::new(SkillMiddleware::new(Arc::clone(&catalog.skills)));

        info!(
            "Assembled agent '{}' with {} tools and {} documents",
            catalog.agent.name,
            tools.len(),
            documents.len()
        );
        Ok(AssembledAgent {
            catalog,
            system_prompt,
            tools,
            middleware,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_sections() {
        let docs = vec![
            Document::new("a", "menu.csv", "x"),
            Document::new("a", "hours.csv", "y"),
        ];

        let voice = compose_system_prompt("You help.", &docs, Mode::Voice);
        assert_eq!(
            voice,
            "You help.\n\n## Knowledge Base\n\nYou have access to the following files in your knowledge base: menu.csv, hours.csv."
        );

        let text = compose_system_prompt("You help.", &[], Mode::Text);
        assert!(text.starts_with("You help.\n\nNEVER MENTION USING TOOLS"));
        assert!(!text.contains("## Knowledge Base"));

        assert_eq!(compose_system_prompt("Base", &[], Mode::Voice), "Base");
    }

    #[test]
    fn test_agent_config_defaults() {
        let config: AgentConfig = serde_json::from_str(r#"{"mode": "voice"}"#).unwrap();
        assert_eq!(config.mode, Mode::Voice);
        assert_eq!(config.max_tool_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
    }
}
