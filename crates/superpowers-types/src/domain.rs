use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, user-authored script bundled with a superpower
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Execution key used by `run_script`
    pub name: String,
    /// Source body; must define `main(params)`. Not validated until run.
    pub content: String,
}

impl Script {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// A reusable capability bundle ("skill")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Superpower {
    pub id: String,
    pub name: String,
    /// One-line summary shown in the skill catalog
    pub description: String,
    /// Full instructions, revealed only through `load_skill`
    pub content: String,
    /// Tool declarations as authored; usually strings, not validated
    #[serde(default)]
    pub tools: Vec<serde_json::Value>,
    #[serde(default)]
    pub scripts: Vec<Script>,
}

impl Superpower {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: crate::new_id(),
            name: name.into(),
            description: description.into(),
            content: String::new(),
            tools: Vec::new(),
            scripts: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_tool(mut self, tool: impl Into<serde_json::Value>) -> Self {
        self.tools.push(tool.into());
        self
    }

    pub fn with_script(mut self, script: Script) -> Self {
        self.scripts.push(script);
        self
    }
}

/// An assistant composed of a base prompt and a set of superpowers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub base_prompt: String,
    /// Referenced superpower ids, in the order the operator attached them
    #[serde(default)]
    pub superpower_ids: Vec<String>,
}

impl Agent {
    pub fn new(name: impl Into<String>, base_prompt: impl Into<String>) -> Self {
        Self {
            id: crate::new_id(),
            name: name.into(),
            base_prompt: base_prompt.into(),
            superpower_ids: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_superpower(mut self, superpower_id: impl Into<String>) -> Self {
        self.superpower_ids.push(superpower_id.into());
        self
    }
}

/// An uploaded tabular document owned by one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub agent_id: String,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        agent_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: crate::new_id(),
            agent_id: agent_id.into(),
            name: name.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
