//! In-process record store, used by tests and embedders that keep their
//! records elsewhere and hand the core a snapshot.

use crate::{RecordStore, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use superpowers_types::{Agent, Document, Superpower};
use tokio::sync::RwLock;

/// Record store held entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    agents: RwLock<HashMap<String, Agent>>,
    superpowers: RwLock<Vec<Superpower>>,
    documents: RwLock<Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent(mut self, agent: Agent) -> Self {
        self.agents.get_mut().insert(agent.id.clone(), agent);
        self
    }

    pub fn with_superpower(mut self, superpower: Superpower) -> Self {
        self.superpowers.get_mut().push(superpower);
        self
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.documents.get_mut().push(document);
        self
    }

    pub async fn insert_document(&self, document: Document) {
        self.documents.write().await.push(document);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_agent(&self, id: &str) -> Result<Option<Agent>> {
        Ok(self.agents.read().await.get(id).cloned())
    }

    async fn get_superpowers(&self, ids: &[String]) -> Result<Vec<Superpower>> {
        let mut found: Vec<Superpower> = self
            .superpowers
            .read()
            .await
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn get_documents(&self, agent_id: &str) -> Result<Vec<Document>> {
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .filter(|d| d.agent_id == agent_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_reads() {
        let skill = Superpower::new("HTTP Fetcher", "Call APIs").with_id("sp-1");
        let agent = Agent::new("Bot", "prompt").with_id("a-1").with_superpower("sp-1");
        let store = MemoryStore::new()
            .with_superpower(skill)
            .with_agent(agent)
            .with_document(Document::new("a-1", "rows.csv", "a,b"))
            .with_document(Document::new("other", "x.csv", "c"));

        assert!(store.get_agent("a-1").await.unwrap().is_some());
        assert!(store.get_agent("missing").await.unwrap().is_none());
        assert_eq!(store.get_superpowers(&["sp-1".into()]).await.unwrap().len(), 1);
        assert_eq!(store.get_superpowers(&["nope".into()]).await.unwrap().len(), 0);
        assert_eq!(store.get_documents("a-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_superpowers_come_back_sorted_by_name() {
        let store = MemoryStore::new()
            .with_superpower(Superpower::new("Zebra", "").with_id("z"))
            .with_superpower(Superpower::new("Apple", "").with_id("a"))
            .with_superpower(Superpower::new("Mango", "").with_id("m"));

        let found = store
            .get_superpowers(&["z".into(), "a".into(), "m".into()])
            .await
            .unwrap();
        let names: Vec<&str> = found.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "Mango", "Zebra"]);
    }
}
