//! `run_script`: execute a skill script in the sandbox

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use superpowers_provider::ToolFunction;
use superpowers_sandbox::error::SandboxError;
use superpowers_sandbox::executor::ScriptExecutor;
use superpowers_skills::ScriptMap;
use superpowers_types::Tool;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunScriptArgs {
    #[serde(default)]
    script_name: String,
    #[serde(default)]
    params_json: Value,
}

/// Runs scripts from the agent's aggregated script map
pub struct RunScriptTool {
    scripts: Arc<ScriptMap>,
    executor: ScriptExecutor,
}

impl RunScriptTool {
    pub fn new(scripts: Arc<ScriptMap>, executor: ScriptExecutor) -> Self {
        Self { scripts, executor }
    }

    pub fn scripts(&self) -> &ScriptMap {
        &self.scripts
    }

    /// Decode the optional `paramsJson` argument
    ///
    /// Absent, null or blank means `{}`. A string must hold JSON; any other
    /// value is passed through as-is.
    fn params(raw: Value) -> std::result::Result<Value, SandboxError> {
        match raw {
            Value::Null => Ok(Value::Object(Default::default())),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Object(Default::default())),
            Value::String(s) => {
                serde_json::from_str(&s).map_err(|e| SandboxError::InvalidParams(e.to_string()))
            }
            other => Ok(other),
        }
    }

    pub async fn run(&self, script_name: &str, params_json: Value) -> String {
        info!("Calling tool: run_script | script: {}", script_name);

        let Some(source) = self.scripts.get(script_name) else {
            let available = self.scripts.names().join(", ");
            return format!(
                "Script '{}' not found. Available scripts: {}",
                script_name,
                if available.is_empty() { "none" } else { &available }
            );
        };

        let result = match Self::params(params_json) {
            Ok(params) => self.executor.run(script_name, source, &params).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(json) => json,
            Err(e) => format!("Error running script: {}", e),
        }
    }
}

#[async_trait]
impl ToolFunction for RunScriptTool {
    fn definition(&self) -> Tool {
        Tool::function(
            "run_script",
            "Execute a script by name. Scripts are defined in the loaded skills. Pass the script \
             name (e.g. from the skill's ## Scripts section) and optional params. Use when you \
             need to run a predefined script from a skill.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "scriptName": {
                        "type": "string",
                        "description": "Name of the script to run (as defined in a loaded skill)"
                    },
                    "paramsJson": {
                        "type": "string",
                        "description": "Optional JSON string of parameters to pass to main(params)"
                    }
                },
                "required": ["scriptName"]
            }),
        )
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let args: RunScriptArgs = serde_json::from_value(args)?;
        Ok(self.run(&args.script_name, args.params_json).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use superpowers_sandbox::config::{Isolation, SandboxConfig};

    fn tool() -> RunScriptTool {
        let mut scripts = ScriptMap::new();
        scripts.insert("echo", "function main(params) { return params; }");
        scripts.insert("boom", "function main() { throw new Error('kaboom'); }");
        RunScriptTool::new(
            Arc::new(scripts),
            ScriptExecutor::new(SandboxConfig::default().with_isolation(Isolation::Thread)),
        )
    }

    #[test]
    fn test_params_decoding() {
        assert_eq!(RunScriptTool::params(Value::Null).unwrap(), serde_json::json!({}));
        assert_eq!(RunScriptTool::params(Value::String("  ".into())).unwrap(), serde_json::json!({}));
        assert_eq!(
            RunScriptTool::params(Value::String(r#"{"a":1}"#.into())).unwrap(),
            serde_json::json!({"a": 1})
        );
        assert_eq!(
            RunScriptTool::params(serde_json::json!({"b": 2})).unwrap(),
            serde_json::json!({"b": 2})
        );
        assert!(matches!(
            RunScriptTool::params(Value::String("{oops".into())),
            Err(SandboxError::InvalidParams(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_script_lists_available() {
        let out = tool()
            .execute(serde_json::json!({"scriptName": "nope"}))
            .await
            .unwrap();
        assert_eq!(out, "Script 'nope' not found. Available scripts: echo, boom");

        let empty = RunScriptTool::new(Arc::new(ScriptMap::new()), ScriptExecutor::default());
        assert_eq!(
            empty.run("nope", Value::Null).await,
            "Script 'nope' not found. Available scripts: none"
        );
    }

    #[tokio::test]
    async fn test_runs_with_params() {
        let out = tool()
            .execute(serde_json::json!({"scriptName": "echo", "paramsJson": "{\"x\":[1,2]}"}))
            .await
            .unwrap();
        assert_eq!(out, r#"{"x":[1,2]}"#);

        let out = tool().execute(serde_json::json!({"scriptName": "echo"})).await.unwrap();
        assert_eq!(out, "{}");
    }

    #[tokio::test]
    async fn test_failures_become_messages() {
        let out = tool().execute(serde_json::json!({"scriptName": "boom"})).await.unwrap();
        assert_eq!(out, "Error running script: kaboom");

        let out = tool()
            .execute(serde_json::json!({"scriptName": "echo", "paramsJson": "{oops"}))
            .await
            .unwrap();
        assert!(out.starts_with("Error running script: Invalid paramsJson:"));
    }
}
