//! Record store for agents, superpowers and documents
//!
//! The orchestration core only ever reads through [`RecordStore`]. The
//! SQLite-backed [`SqliteStore`] additionally carries the write surface used
//! by the gateway (seeding, uploads, edits).

pub mod error;
pub mod memory;
pub mod seed;
pub mod sqlite;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use seed::seed_defaults;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use superpowers_types::{Agent, Document, Superpower};

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, StoreError>;

/// Read contract the orchestration core depends on
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch one agent; `None` when the id does not resolve
    async fn get_agent(&self, id: &str) -> Result<Option<Agent>>;

    /// Fetch the superpowers with the given ids. Unknown ids are skipped.
    async fn get_superpowers(&self, ids: &[String]) -> Result<Vec<Superpower>>;

    /// Fetch every document owned by an agent, oldest first
    async fn get_documents(&self, agent_id: &str) -> Result<Vec<Document>>;
}

/// Parse a stored tool list; anything but a JSON array reads as empty
pub(crate) fn parse_tools(raw: &str) -> Vec<serde_json::Value> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

/// Parse a stored script list, dropping entries without string name/content
pub(crate) fn parse_scripts(raw: &str) -> Vec<superpowers_types::Script> {
    let Ok(serde_json::Value::Array(items)) = serde_json::from_str::<serde_json::Value>(raw) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?;
            let content = item.get("content")?.as_str()?;
            Some(superpowers_types::Script::new(name, content))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tools_tolerates_garbage() {
        assert_eq!(parse_tools("not json").len(), 0);
        assert_eq!(parse_tools(r#"{"a":1}"#).len(), 0);
        assert_eq!(parse_tools(r#"["http_call", 3]"#).len(), 2);
    }

    #[test]
    fn test_parse_scripts_drops_incomplete_entries() {
        let scripts = parse_scripts(
            r#"[{"name":"a","content":"function main(){}"},{"name":"b"},{"name":1,"content":"x"}]"#,
        );
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].name, "a");
        assert!(parse_scripts("[").is_empty());
    }
}
