//! Agentic tool-calling loop

use crate::memory::ThreadMemory;
use crate::middleware::{Middleware, ModelRequest, Next};
use crate::model::ChatModel;
use crate::tool::ToolRegistry;
use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;
use superpowers_types::ChatMessage;
use tracing::{debug, info, warn};

/// Default cap on model calls within one turn
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

const ITERATION_LIMIT_REPLY: &str =
    "I stopped after reaching the maximum number of tool calls for this turn.";

/// Drives one agent: model calls through the middleware pipeline, tool
/// execution, and history checkpointing per thread
pub struct AgentRunner {
    model: Arc<dyn ChatModel>,
    system_prompt: String,
    tools: ToolRegistry,
    middleware: Vec<Arc<dyn Middleware>>,
    memory: Arc<ThreadMemory>,
    max_iterations: usize,
}

impl AgentRunner {
    pub fn new(model: Arc<dyn ChatModel>, system_prompt: impl Into<String>) -> Self {
        Self {
            model,
            system_prompt: system_prompt.into(),
            tools: ToolRegistry::new(),
            middleware: Vec::new(),
            memory: Arc::new(ThreadMemory::default()),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Append a middleware stage and register the tools it contributes
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        for tool in middleware.tools() {
            self.tools.register(tool);
        }
        self.middleware.push(middleware);
        self
    }

    pub fn with_memory(mut self, memory: Arc<ThreadMemory>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn memory(&self) -> &Arc<ThreadMemory> {
        &self.memory
    }

    /// Run one user turn on a thread and return the final answer
    ///
    /// History is only checkpointed when the turn completes; a model error
    /// leaves the thread as it was before the turn.
    pub async fn run_turn(&self, thread_id: &str, user_text: &str) -> Result<String> {
        let mut history = self.memory.load(thread_id).await;
        history.push(ChatMessage::user(user_text));

        let definitions = self.tools.definitions();

        for iteration in 0..self.max_iterations {
            let request = ModelRequest::new(self.system_prompt.clone(), history.clone())
                .with_tools(definitions.clone());

            let response = Next::new(&self.middleware, self.model.as_ref())
                .run(request)
                .await?;

            if !response.has_tool_calls() {
                let answer = response.content.unwrap_or_default();
                history.push(ChatMessage::assistant(&answer));
                self.memory.save(thread_id, history).await;
                return Ok(answer);
            }

            info!(
                "Iteration {}: model requested {} tool call(s)",
                iteration + 1,
                response.tool_calls.len()
            );
            history.push(ChatMessage::assistant_with_tools(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            let outputs = join_all(response.tool_calls.iter().map(|call| async move {
                let output = self
                    .tools
                    .execute(&call.function.name, call.args_value())
                    .await;
                (call.id.clone(), output)
            }))
            .await;

            for (call_id, output) in outputs {
                debug!("Tool result for {}: {} chars", call_id, output.len());
                history.push(ChatMessage::tool_result(call_id, output));
            }
        }

        warn!(
            "Thread '{}' hit the tool iteration limit of {}",
            thread_id, self.max_iterations
        );
        history.push(ChatMessage::assistant(ITERATION_LIMIT_REPLY));
        self.memory.save(thread_id, history).await;
        Ok(ITERATION_LIMIT_REPLY.to_string())
    }

    pub async fn reset(&self, thread_id: &str) -> bool {
        self.memory.clear(thread_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolFunction;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::VecDeque;
    use superpowers_types::{CompletionResponse, Role, Tool, ToolCall};
    use tokio::sync::Mutex;

    /// Replays scripted responses and records each request
    struct Scripted {
        responses: Mutex<VecDeque<CompletionResponse>>,
        requests: Mutex<Vec<ModelRequest>>,
    }

    impl Scripted {
        fn new(responses: Vec<CompletionResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatModel for Scripted {
        async fn complete(&self, request: ModelRequest) -> Result<CompletionResponse> {
            self.requests.lock().await.push(request);
            self.responses
                .lock()
                .await
                .pop_front()
                .ok_or_else(|| anyhow!("no scripted response left"))
        }
    }

    struct Clock;

    #[async_trait]
    impl ToolFunction for Clock {
        fn definition(&self) -> Tool {
            Tool::function("clock", "Current time", serde_json::json!({"type": "object"}))
        }

        async fn execute(&self, _args: Value) -> Result<String> {
            Ok("12:00".to_string())
        }
    }

    fn runner(model: Arc<Scripted>) -> AgentRunner {
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(Clock));
        AgentRunner::new(model, "You are helpful.").with_tools(tools)
    }

    #[tokio::test]
    async fn test_tool_loop_feeds_results_back() {
        let model = Scripted::new(vec![
            CompletionResponse::tool_calls(vec![
                ToolCall::new("c1", "clock", "{}"),
                ToolCall::new("c2", "missing", "{}"),
            ]),
            CompletionResponse::text("It is noon."),
        ]);
        let agent = runner(model.clone());

        let answer = agent.run_turn("t1", "What time is it?").await.unwrap();
        assert_eq!(answer, "It is noon.");

        let requests = model.requests.lock().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools[0].name(), "clock");
        let second = &requests[1].messages;
        assert_eq!(second[2].role, Role::Tool);
        assert_eq!(second[2].content.as_deref(), Some("12:00"));
        assert!(second[3].content.as_deref().unwrap().contains("Unknown tool"));

        assert_eq!(agent.memory().load("t1").await.len(), 5);
    }

    #[tokio::test]
    async fn test_iteration_limit_ends_turn() {
        let looping: Vec<CompletionResponse> = (0..3)
            .map(|i| CompletionResponse::tool_calls(vec![ToolCall::new(format!("c{}", i), "clock", "")]))
            .collect();
        let agent = runner(Scripted::new(looping)).with_max_iterations(3);

        let answer = agent.run_turn("t", "loop").await.unwrap();
        assert_eq!(answer, ITERATION_LIMIT_REPLY);
    }

    #[tokio::test]
    async fn test_model_error_leaves_history_untouched() {
        let agent = runner(Scripted::new(vec![]));
        assert!(agent.run_turn("t", "hello").await.is_err());
        assert!(agent.memory().load("t").await.is_empty());
    }

    #[tokio::test]
    async fn test_history_carries_across_turns() {
        let model = Scripted::new(vec![
            CompletionResponse::text("Hi Ada."),
            CompletionResponse::text("Your name is Ada."),
        ]);
        let agent = runner(model.clone());

        agent.run_turn("t", "I am Ada").await.unwrap();
        agent.run_turn("t", "Who am I?").await.unwrap();

        let requests = model.requests.lock().await;
        assert_eq!(requests[1].messages.len(), 3);
        assert!(agent.reset("t").await);
    }
}
