//! Resolution from a record store through progressive disclosure in the agent loop

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use superpowers_provider::{AgentRunner, ChatModel, ModelRequest};
use superpowers_skills::{CatalogResolver, ResolveError, SkillMiddleware};
use superpowers_store::MemoryStore;
use superpowers_types::{Agent, CompletionResponse, Script, Superpower, ToolCall};
use tokio::sync::Mutex;

struct Scripted {
    responses: Mutex<VecDeque<CompletionResponse>>,
    requests: Mutex<Vec<ModelRequest>>,
}

#[async_trait]
impl ChatModel for Scripted {
    async fn complete(&self, request: ModelRequest) -> Result<CompletionResponse> {
        self.requests.lock().await.push(request);
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| anyhow!("script exhausted"))
    }
}

fn store() -> MemoryStore {
    let scheduler = Superpower::new("Appointment Scheduler", "Books appointments")
        .with_id("sp-sched")
        .with_content("Always call checkAvailability first.")
        .with_tool("run_script")
        .with_script(Script::new("checkAvailability", "function main() { return []; }"));
    let catalogs = Superpower::new("Product Catalogs", "Answers product questions")
        .with_id("sp-cat")
        .with_content("Search the product CSV.")
        .with_tool("query_files");

    MemoryStore::new()
        .with_superpower(scheduler)
        .with_superpower(catalogs)
        .with_agent(
            Agent::new("Front Desk", "You are a receptionist.")
                .with_id("agent-1")
                .with_superpower("sp-sched")
                .with_superpower("sp-cat"),
        )
        .with_agent(Agent::new("Bare", "No skills.").with_id("agent-2"))
}

#[tokio::test]
async fn test_unknown_agent_aborts_resolution() {
    let err = CatalogResolver::resolve(&store(), "ghost").await.unwrap_err();
    assert!(matches!(err, ResolveError::AgentNotFound(ref id) if id == "ghost"));
    assert_eq!(err.to_string(), "Agent not found: ghost");
}

#[tokio::test]
async fn test_resolution_collects_tools_and_scripts() {
    let catalog = CatalogResolver::resolve(&store(), "agent-1").await.unwrap();
    assert_eq!(catalog.skills.len(), 2);
    assert!(catalog.has_tool("run_script"));
    assert!(catalog.has_tool("query_files"));
    assert_eq!(catalog.scripts.names(), vec!["checkAvailability"]);
}

#[tokio::test]
async fn test_skill_content_only_appears_after_load() {
    let catalog = CatalogResolver::resolve(&store(), "agent-1").await.unwrap();
    let model = Arc::new(Scripted {
        responses: Mutex::new(VecDeque::from(vec![
            CompletionResponse::tool_calls(vec![ToolCall::new(
                "c1",
                "load_skill",
                r#"{"skillName":"appointment scheduler"}"#,
            )]),
            CompletionResponse::text("Tuesday at 10 works."),
        ])),
        requests: Mutex::new(Vec::new()),
    });

    let runner = AgentRunner::new(model.clone(), catalog.agent.base_prompt.clone())
        .with_middleware(Arc::new(SkillMiddleware::new(Arc::clone(&catalog.skills))));
    assert!(runner.tools().contains("load_skill"));

    let answer = runner.run_turn("thread", "Book me in").await.unwrap();
    assert_eq!(answer, "Tuesday at 10 works.");

    let requests = model.requests.lock().await;
    let first = &requests[0];
    assert!(first.system_prompt.starts_with("You are a receptionist.\n\n## Available Skills"));
    assert!(first
        .system_prompt
        .contains("- **Appointment Scheduler**: Books appointments"));
    assert!(!first.system_prompt.contains("Always call checkAvailability first."));
    assert!(first.messages.iter().all(|m| !m
        .content
        .as_deref()
        .unwrap_or_default()
        .contains("Always call checkAvailability first.")));

    let loaded = requests[1]
        .messages
        .last()
        .and_then(|m| m.content.clone())
        .unwrap();
    assert!(loaded.starts_with("Loaded skill: Appointment Scheduler"));
    assert!(loaded.contains("Always call checkAvailability first."));
    assert!(!loaded.contains("Search the product CSV."));
}

#[tokio::test]
async fn test_agent_without_skills_gets_placeholder_catalog() {
    let catalog = CatalogResolver::resolve(&store(), "agent-2").await.unwrap();
    let model = Arc::new(Scripted {
        responses: Mutex::new(VecDeque::from(vec![CompletionResponse::text("Hello.")])),
        requests: Mutex::new(Vec::new()),
    });
    let runner = AgentRunner::new(model.clone(), catalog.agent.base_prompt.clone())
        .with_middleware(Arc::new(SkillMiddleware::new(Arc::clone(&catalog.skills))));

    runner.run_turn("t", "hi").await.unwrap();
    assert!(model.requests.lock().await[0]
        .system_prompt
        .contains("No skills available."));
}
