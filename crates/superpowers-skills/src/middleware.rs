//! Skill middleware: catalog injection and the `load_skill` tool

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use superpowers_provider::{Middleware, ModelRequest, Next, ToolFunction};
use superpowers_types::{CompletionResponse, Superpower, Tool};
use tracing::{debug, info};

/// Render the one-line-per-skill catalog shown in the system prompt
pub fn render_catalog(skills: &[Superpower]) -> String {
    if skills.is_empty() {
        return "No skills available.".to_string();
    }
    skills
        .iter()
        .map(|s| format!("- **{}**: {}", s.name, s.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn skills_addendum(skills: &[Superpower]) -> String {
    format!(
        "\n\n## Available Skills\n\n\
         You have access to the following skills. You MUST use the `load_skill` tool to load \
         the full content and instructions for a skill before you try to use it or answer \
         questions related to it.\n\n\
         {}\n\n\
         CRITICAL: Before handling any user request that matches one of your available skills, \
         you MUST first call the `load_skill` tool with the exact name of the relevant skill. \
         Do not assume you know how to perform the task without loading the skill first.",
        render_catalog(skills)
    )
}

/// Middleware exposing an agent's skills through progressive disclosure
pub struct SkillMiddleware {
    skills: Arc<Vec<Superpower>>,
    addendum: String,
}

impl SkillMiddleware {
    pub fn new(skills: Arc<Vec<Superpower>>) -> Self {
        let addendum = skills_addendum(&skills);
        Self { skills, addendum }
    }

    pub fn skills(&self) -> &[Superpower] {
        &self.skills
    }
}

#[async_trait]
impl Middleware for SkillMiddleware {
    fn name(&self) -> &str {
        "skillMiddleware"
    }

    fn tools(&self) -> Vec<Arc<dyn ToolFunction>> {
        vec![Arc::new(LoadSkillTool::new(Arc::clone(&self.skills)))]
    }

    async fn wrap_model_call(
        &self,
        mut request: ModelRequest,
        next: Next<'_>,
    ) -> Result<CompletionResponse> {
        request.system_prompt.push_str(&self.addendum);
        next.run(request).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadSkillArgs {
    #[serde(default)]
    skill_name: String,
}

/// Reveals the full instructions of one skill
pub struct LoadSkillTool {
    skills: Arc<Vec<Superpower>>,
}

impl LoadSkillTool {
    pub fn new(skills: Arc<Vec<Superpower>>) -> Self {
        Self { skills }
    }

    /// Case-insensitive exact-name lookup
    pub fn load(&self, skill_name: &str) -> String {
        info!("Loading skill: \"{}\"", skill_name);

        let wanted = skill_name.to_lowercase();
        match self.skills.iter().find(|s| s.name.to_lowercase() == wanted) {
            Some(skill) => format!(
                "Loaded skill: {}\n\n# {}\n\n{}",
                skill.name, skill.name, skill.content
            ),
            None => {
                let available = self
                    .skills
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                debug!("Skill '{}' not found", skill_name);
                format!(
                    "Skill '{}' not found. Available skills: {}",
                    skill_name,
                    if available.is_empty() { "none" } else { available.as_str() }
                )
            }
        }
    }
}

#[async_trait]
impl ToolFunction for LoadSkillTool {
    fn definition(&self) -> Tool {
        Tool::function(
            "load_skill",
            "Load the full content of a skill into the agent's context. You MUST call this \
             before attempting to perform any task related to an available skill.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "skillName": {
                        "type": "string",
                        "description": "The EXACT name of the skill to load, e.g. \"Product Catalogs\" or \"Appointment Scheduler\""
                    }
                },
                "required": ["skillName"]
            }),
        )
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let args: LoadSkillArgs = serde_json::from_value(args)?;
        Ok(self.load(&args.skill_name))
    }
}
