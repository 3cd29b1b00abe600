//! Superpowers Tools
//!
//! Maps the tool identifiers declared by an agent's skills onto concrete
//! tool implementations and assembles everything an agent needs for one
//! conversation.
//!
//! | Identifier    | Tool                                         |
//! |---------------|----------------------------------------------|
//! | `http_call`   | [`HttpCallTool`], plain HTTP requests          |
//! | `query_db`    | [`QueryDbTool`], always disabled               |
//! | `run_script`  | [`RunScriptTool`], skill scripts in the sandbox |
//! | `query_files` | [`QueryFilesTool`], semantic row search        |

pub mod agent;
pub mod builtin;
pub mod query_files;
pub mod registry;
pub mod run_script;

pub use agent::{AgentAssembler, AgentConfig, AssembledAgent, Mode};
pub use builtin::{HttpCallTool, QueryDbTool};
pub use query_files::{QueryFilesTool, NO_DOCS_MESSAGE};
pub use registry::ToolFactory;
pub use run_script::RunScriptTool;
