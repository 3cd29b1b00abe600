//! Tools that need nothing from the agent's catalog

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use superpowers_provider::ToolFunction;
use superpowers_types::Tool;
use tracing::info;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HttpCallArgs {
    url: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    headers_json: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

/// curl-like HTTP requests against external APIs
pub struct HttpCallTool {
    client: reqwest::Client,
}

impl HttpCallTool {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    async fn call(&self, args: HttpCallArgs) -> Result<String> {
        let method = match args.method.as_deref().map(str::to_uppercase).as_deref() {
            None | Some("") | Some("GET") => Method::GET,
            Some("POST") => Method::POST,
            Some("PUT") => Method::PUT,
            Some("PATCH") => Method::PATCH,
            Some("DELETE") => Method::DELETE,
            Some(other) => return Err(anyhow!("unsupported method '{}'", other)),
        };
        let url = reqwest::Url::parse(&args.url).with_context(|| format!("invalid URL '{}'", args.url))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(raw) = args.headers_json.as_deref().filter(|h| !h.trim().is_empty()) {
            let extra: HashMap<String, Value> =
                serde_json::from_str(raw).context("headersJson is not a JSON object")?;
            for (name, value) in extra {
                let value = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                headers.insert(
                    HeaderName::from_bytes(name.as_bytes())
                        .with_context(|| format!("invalid header name '{}'", name))?,
                    HeaderValue::from_str(&value)
                        .with_context(|| format!("invalid value for header '{}'", name))?,
                );
            }
        }

        info!("Calling tool: http_call | method: {} | url: {}", method, url);
        let mut request = self.client.request(method, url).headers(headers);
        if let Some(body) = args.body.filter(|b| !b.is_empty()) {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let response_headers: Map<String, Value> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()),
                )
            })
            .collect();
        let body = response.text().await?;

        Ok(serde_json::json!({
            "status": status.as_u16(),
            "statusText": status.canonical_reason().unwrap_or(""),
            "headers": response_headers,
            "body": body,
        })
        .to_string())
    }
}

#[async_trait]
impl ToolFunction for HttpCallTool {
    fn definition(&self) -> Tool {
        Tool::function(
            "http_call",
            "Make an HTTP request (GET, POST, PUT, PATCH, DELETE) to a URL. Returns status, headers, \
             and body. Supports curl-like requests for external APIs.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "The URL to request"
                    },
                    "method": {
                        "type": "string",
                        "enum": ["GET", "POST", "PUT", "PATCH", "DELETE"],
                        "description": "HTTP method (default: GET)"
                    },
                    "headersJson": {
                        "type": "string",
                        "description": "Optional JSON object of HTTP headers"
                    },
                    "body": {
                        "type": "string",
                        "description": "Optional request body (for POST, PUT, PATCH)"
                    }
                },
                "required": ["url"]
            }),
        )
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let args: HttpCallArgs = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return Ok(format!("HTTP request failed: {}", e)),
        };
        match self.call(args).await {
            Ok(out) => Ok(out),
            Err(e) => Ok(format!("HTTP request failed: {:#}", e)),
        }
    }
}

pub const QUERY_DB_DISABLED: &str = "Database queries are disabled. This tool is not available.";

/// Placeholder for direct database access, which agents never get
pub struct QueryDbTool;

#[async_trait]
impl ToolFunction for QueryDbTool {
    fn definition(&self) -> Tool {
        Tool::function(
            "query_db",
            "Execute a database query. (Disabled - this tool is not available.)",
            serde_json::json!({
                "type": "object",
                "properties": {},
                "description": "No parameters - tool is disabled"
            }),
        )
    }

    async fn execute(&self, _args: Value) -> Result<String> {
        info!("Calling tool: query_db");
        Ok(QUERY_DB_DISABLED.to_string())
    }
}
