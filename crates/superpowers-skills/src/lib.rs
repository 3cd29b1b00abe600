//! Superpowers Skills
//!
//! Progressive disclosure of agent skills:
//!
//! - Resolution: an agent's attached superpowers are read from the record
//!   store and folded into a [`ResolvedCatalog`] holding the ordered skills,
//!   the distinct tool identifiers they declare, and the scripts they carry.
//! - Discovery: [`SkillMiddleware`] appends a one-line-per-skill catalog to
//!   the system prompt on every model call.
//! - Activation: the `load_skill` tool reveals a skill's full instructions
//!   only when the model asks for it.

#![deny(unsafe_code, unused_imports, unused_variables)]

pub mod middleware;
pub mod resolver;
pub mod tool_id;

pub use middleware::{render_catalog, LoadSkillTool, SkillMiddleware};
pub use resolver::{CatalogResolver, ResolveError, ResolvedCatalog, ScriptMap};
pub use tool_id::{ParsedToolId, ToolId};
