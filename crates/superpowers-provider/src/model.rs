//! Chat model contract and an OpenAI-compatible client
//!
//! Ollama exposes the same `/v1/chat/completions` surface, so one
//! `async_openai` client serves both provider kinds.

use crate::middleware::ModelRequest;
use anyhow::{Context, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionTool, ChatCompletionTools,
    CreateChatCompletionRequestArgs, CreateChatCompletionResponse, FinishReason, FunctionCall,
    FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use superpowers_types::{ChatMessage, CompletionResponse, Provider, Role, Tool, ToolCall};
use tracing::{debug, info, warn};

/// Default HTTP timeout for a single completion
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ModelRequest) -> Result<CompletionResponse>;
}

/// Chat model speaking the OpenAI chat completions protocol
pub struct OpenAiChatModel {
    provider: Provider,
    client: Client<OpenAIConfig>,
}

impl OpenAiChatModel {
    pub fn new(provider: Provider) -> Result<Self> {
        let mut config =
            OpenAIConfig::new().with_api_base(provider.api_base().trim_end_matches('/'));
        if let Some(key) = provider.api_key() {
            config = config.with_api_key(key);
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        let client = Client::with_config(config).with_http_client(http);

        info!("Chat model initialized with: {:?}", provider.model());
        Ok(Self { provider, client })
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }
}

fn request_message(message: ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let message: ChatCompletionRequestMessage = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.unwrap_or_default())
            .build()?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content.unwrap_or_default())
            .build()?
            .into(),
        Role::Assistant => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if let Some(content) = message.content {
                args.content(content);
            }
            let calls: Vec<ChatCompletionMessageToolCalls> = message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|call| {
                    ChatCompletionMessageToolCalls::Function(ChatCompletionMessageToolCall {
                        id: call.id,
                        function: FunctionCall {
                            name: call.function.name,
                            arguments: call.function.arguments,
                        },
                    })
                })
                .collect();
            if !calls.is_empty() {
                args.tool_calls(calls);
            }
            args.build()?.into()
        }
        Role::Tool => ChatCompletionRequestToolMessageArgs::default()
            .content(message.content.unwrap_or_default())
            .tool_call_id(message.tool_call_id.unwrap_or_default())
            .build()?
            .into(),
    };
    Ok(message)
}

fn request_tool(tool: &Tool) -> ChatCompletionTools {
    ChatCompletionTools::Function(ChatCompletionTool {
        function: FunctionObject {
            name: tool.function.name.clone(),
            description: Some(tool.function.description.clone()),
            parameters: Some(tool.function.parameters.clone()),
            strict: tool.function.strict,
        },
    })
}

fn finish_reason(reason: Option<FinishReason>) -> &'static str {
    match reason {
        Some(FinishReason::Length) => "length",
        Some(FinishReason::ToolCalls) => "tool_calls",
        Some(FinishReason::ContentFilter) => "content_filter",
        Some(FinishReason::FunctionCall) => "function_call",
        Some(FinishReason::Stop) | None => "stop",
    }
}

fn into_completion(response: CreateChatCompletionResponse) -> CompletionResponse {
    let Some(choice) = response.choices.into_iter().next() else {
        warn!("Provider returned no choices");
        return CompletionResponse::text("I couldn't generate a response.");
    };

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .filter_map(|call| match call {
            ChatCompletionMessageToolCalls::Function(call) => Some(ToolCall::new(
                call.id,
                call.function.name,
                call.function.arguments,
            )),
            ChatCompletionMessageToolCalls::Custom(custom) => {
                warn!("Ignoring custom tool call '{}'", custom.custom_tool.name);
                None
            }
        })
        .collect();

    CompletionResponse {
        content: choice.message.content,
        tool_calls,
        finish_reason: finish_reason(choice.finish_reason).to_string(),
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, request: ModelRequest) -> Result<CompletionResponse> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system_prompt.is_empty() {
            messages.push(request_message(ChatMessage::system(&request.system_prompt))?);
        }
        for message in request.messages {
            messages.push(request_message(message)?);
        }

        debug!(
            "Sending {} messages and {} tools to {}",
            messages.len(),
            request.tools.len(),
            self.provider.api_base()
        );

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.provider.model()).messages(messages);
        if !request.tools.is_empty() {
            args.tools(request.tools.iter().map(request_tool).collect::<Vec<_>>());
        }
        let body = args.build()?;

        let response = self
            .client
            .chat()
            .create(body)
            .await
            .context("Chat completion request failed")?;
        Ok(into_completion(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::config::Config;

    #[test]
    fn test_endpoint_for_ollama() {
        let model = OpenAiChatModel::new(Provider::ollama("llama3.2", "http://localhost:11434/")).unwrap();
        assert_eq!(
            model.client.config().url("/chat/completions"),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_completion_parses_tool_calls() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "load_skill", "arguments": "{\"skillName\":\"x\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;
        let parsed: CreateChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let completion = into_completion(parsed);
        assert_eq!(completion.finish_reason, "tool_calls");
        assert_eq!(completion.tool_calls[0].id, "call_1");
        assert_eq!(completion.tool_calls[0].function.name, "load_skill");
        assert_eq!(completion.tool_calls[0].args_value()["skillName"], "x");
    }

    #[test]
    fn test_history_maps_to_request_messages() {
        let assistant = request_message(ChatMessage::assistant_with_tools(
            None,
            vec![ToolCall::new("call_1", "run_script", r#"{"scriptName":"a"}"#)],
        ))
        .unwrap();
        let value = serde_json::to_value(&assistant).unwrap();
        assert_eq!(value["role"], "assistant");
        assert!(value.get("content").is_none());
        assert_eq!(value["tool_calls"][0]["type"], "function");
        assert_eq!(value["tool_calls"][0]["function"]["name"], "run_script");

        let result = request_message(ChatMessage::tool_result("call_1", "ok")).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_call_id"], "call_1");
        assert_eq!(value["content"], "ok");
    }

    #[test]
    fn test_tools_keep_their_schema() {
        let tool = Tool::function("query_db", "Disabled", serde_json::json!({"type": "object"}));
        let value = serde_json::to_value(request_tool(&tool)).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "query_db");
        assert_eq!(value["function"]["parameters"]["type"], "object");
    }
}
