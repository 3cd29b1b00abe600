//! Skill catalog resolution
//!
//! Reads one agent snapshot from the record store and derives everything the
//! tool factory and the skill middleware need for a single conversation.

use crate::tool_id::{ParsedToolId, ToolId};
use std::sync::Arc;
use superpowers_store::{RecordStore, StoreError};
use superpowers_types::{Agent, Superpower};
use thiserror::Error;
use tracing::{debug, info};

/// Resolution failures
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The requested agent does not exist
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// The record store could not be read
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),
}

/// Script name to source, aggregated across an agent's skills
///
/// Names keep the order in which they first appeared; a later skill
/// redefining a name replaces the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptMap {
    entries: Vec<(String, String)>,
}

impl ScriptMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a script, ignoring entries with an empty name or body
    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        let (name, source) = (name.into(), source.into());
        if name.is_empty() || source.is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => {
                debug!("Script '{}' redefined by a later skill", name);
                entry.1 = source;
            }
            None => self.entries.push((name, source)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.as_str())
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything derived from one agent for one conversation
#[derive(Debug, Clone)]
pub struct ResolvedCatalog {
    pub agent: Agent,
    /// Attached skills in store order (by name)
    pub skills: Arc<Vec<Superpower>>,
    /// Distinct tool identifiers in first-declared order
    pub tool_ids: Arc<Vec<ToolId>>,
    pub scripts: Arc<ScriptMap>,
}

impl ResolvedCatalog {
    /// Fold an agent and its skills into a catalog
    ///
    /// `skills` keep the order the store returned them in, which decides
    /// which skill wins a script name collision and the order of tools.
    /// Superpowers the agent does not reference are dropped, as are repeats.
    pub fn from_parts(agent: Agent, skills: Vec<Superpower>) -> Self {
        let mut ordered: Vec<Superpower> = Vec::new();
        for skill in skills {
            if agent.superpower_ids.contains(&skill.id) && !ordered.iter().any(|s| s.id == skill.id) {
                ordered.push(skill);
            }
        }

        let mut scripts = ScriptMap::new();
        for skill in &ordered {
            for script in &skill.scripts {
                scripts.insert(script.name.as_str(), script.content.as_str());
            }
        }

        let mut tool_ids: Vec<ToolId> = Vec::new();
        for declaration in ordered.iter().flat_map(|s| s.tools.iter()) {
            match ToolId::parse(declaration) {
                ParsedToolId::Valid(id) if !tool_ids.contains(&id) => tool_ids.push(id),
                ParsedToolId::Valid(_) => {}
                ParsedToolId::Discard => debug!("Discarding tool declaration {}", declaration),
            }
        }

        Self {
            agent,
            skills: Arc::new(ordered),
            tool_ids: Arc::new(tool_ids),
            scripts: Arc::new(scripts),
        }
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tool_ids.iter().any(|id| id.as_str() == name)
    }
}

/// Resolves agents into catalogs
pub struct CatalogResolver;

impl CatalogResolver {
    pub async fn resolve(
        store: &dyn RecordStore,
        agent_id: &str,
    ) -> Result<ResolvedCatalog, ResolveError> {
        let agent = store
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| ResolveError::AgentNotFound(agent_id.to_string()))?;

        let mut ids: Vec<String> = Vec::with_capacity(agent.superpower_ids.len());
        for id in &agent.superpower_ids {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }

        let skills = store.get_superpowers(&ids).await?;
        let catalog = ResolvedCatalog::from_parts(agent, skills);

        info!(
            agent = %catalog.agent.name,
            skills = catalog.skills.len(),
            tools = catalog.tool_ids.len(),
            scripts = catalog.scripts.len(),
            "Resolved skill catalog"
        );
        Ok(catalog)
    }
}
