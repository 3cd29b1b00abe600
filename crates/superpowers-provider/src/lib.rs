//! Superpowers Provider - LLM runtime for tool-calling agents
//!
//! Holds the tool contract and registry, the middleware pipeline that wraps
//! every model call, an OpenAI-compatible chat model client, the agentic tool
//! loop, and per-thread conversation memory.

pub mod memory;
pub mod middleware;
pub mod model;
pub mod runner;
pub mod tool;

pub use memory::ThreadMemory;
pub use middleware::{Middleware, ModelRequest, Next};
pub use model::{ChatModel, OpenAiChatModel};
pub use runner::AgentRunner;
pub use tool::{ToolFunction, ToolRegistry};
