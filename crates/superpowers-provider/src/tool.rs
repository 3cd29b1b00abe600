//! Tool contract and the per-conversation registry of tool implementations

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use superpowers_types::Tool;
use tracing::{debug, warn};

/// A tool the model can call by name
#[async_trait]
pub trait ToolFunction: Send + Sync {
    /// Name, description and JSON-schema parameters advertised to the model
    fn definition(&self) -> Tool;

    /// Run the tool. Errors are reported back to the model as text.
    async fn execute(&self, args: Value) -> Result<String>;

    fn name(&self) -> String {
        self.definition().function.name
    }
}

/// Ordered set of tools keyed by name
///
/// Registering a tool whose name is already present replaces the earlier one
/// in place, so definition order stays stable.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<(String, Arc<dyn ToolFunction>)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn ToolFunction>) {
        let name = tool.name();
        match self.tools.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => {
                debug!("Replacing tool '{}'", name);
                slot.1 = tool;
            }
            None => self.tools.push((name, tool)),
        }
    }

    /// Register every tool of another registry, later names winning
    pub fn extend(&mut self, other: ToolRegistry) {
        for (_, tool) in other.tools {
            self.register(tool);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolFunction>> {
        self.tools
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| Arc::clone(t))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn definitions(&self) -> Vec<Tool> {
        self.tools.iter().map(|(_, t)| t.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name, flattening failures into the returned text
    pub async fn execute(&self, name: &str, args: Value) -> String {
        let Some(tool) = self.get(name) else {
            warn!("Model called unknown tool '{}'", name);
            return format!("Error: Unknown tool '{}'", name);
        };

        debug!("Executing tool '{}' with args: {}", name, args);
        match tool.execute(args).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Tool '{}' failed: {:#}", name, e);
                format!("Error: {:#}", e)
            }
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct Echo(&'static str);

    #[async_trait]
    impl ToolFunction for Echo {
        fn definition(&self) -> Tool {
            Tool::function("echo", self.0, serde_json::json!({"type": "object"}))
        }

        async fn execute(&self, args: Value) -> Result<String> {
            Ok(args["text"].as_str().unwrap_or_default().to_string())
        }
    }

    struct Broken;

    #[async_trait]
    impl ToolFunction for Broken {
        fn definition(&self) -> Tool {
            Tool::function("broken", "always fails", serde_json::json!({"type": "object"}))
        }

        async fn execute(&self, _args: Value) -> Result<String> {
            Err(anyhow!("disk on fire"))
        }
    }

    #[tokio::test]
    async fn test_registry_executes_and_reports_errors() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo("first")));
        registry.register(Arc::new(Broken));

        assert_eq!(
            registry.execute("echo", serde_json::json!({"text": "hi"})).await,
            "hi"
        );
        assert_eq!(
            registry.execute("broken", serde_json::json!({})).await,
            "Error: disk on fire"
        );
        assert!(registry
            .execute("missing", serde_json::json!({}))
            .await
            .contains("Unknown tool 'missing'"));
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo("first")));
        registry.register(Arc::new(Broken));
        registry.register(Arc::new(Echo("second")));

        assert_eq!(registry.names(), vec!["echo", "broken"]);
        assert_eq!(registry.definitions()[0].function.description, "second");
    }
}
