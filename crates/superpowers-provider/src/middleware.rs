//! Model-call middleware pipeline
//!
//! Every model call made by the agent loop passes through the configured
//! middleware in order. Each stage may rewrite the request before handing it
//! to [`Next`], and may contribute tools of its own.

use crate::model::ChatModel;
use crate::tool::ToolFunction;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use superpowers_types::{ChatMessage, CompletionResponse, Tool};

/// Everything the model sees on one call
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    /// System prompt, sent ahead of the messages
    pub system_prompt: String,
    /// Conversation so far
    pub messages: Vec<ChatMessage>,
    /// Tools advertised to the model
    pub tools: Vec<Tool>,
}

impl ModelRequest {
    pub fn new(system_prompt: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }
}

#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    /// Tools this middleware adds to the agent's tool set
    fn tools(&self) -> Vec<Arc<dyn ToolFunction>> {
        Vec::new()
    }

    async fn wrap_model_call(
        &self,
        request: ModelRequest,
        next: Next<'_>,
    ) -> Result<CompletionResponse> {
        next.run(request).await
    }
}

/// The remainder of the pipeline, ending at the model itself
pub struct Next<'a> {
    stack: &'a [Arc<dyn Middleware>],
    model: &'a dyn ChatModel,
}

impl<'a> Next<'a> {
    pub fn new(stack: &'a [Arc<dyn Middleware>], model: &'a dyn ChatModel) -> Self {
        Self { stack, model }
    }

    pub async fn run(self, request: ModelRequest) -> Result<CompletionResponse> {
        match self.stack.split_first() {
            Some((head, rest)) => {
                head.wrap_model_call(
                    request,
                    Next {
                        stack: rest,
                        model: self.model,
                    },
                )
                .await
            }
            None => self.model.complete(request).await,
        }
    }
}
