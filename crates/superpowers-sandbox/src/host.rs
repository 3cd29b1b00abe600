//! Native functions backing the prelude's `console`, `fetch` and `URL`
//!
//! Every binding takes and returns plain strings. Failures are reported as a
//! JSON `{"error": ...}` record which the prelude turns into a JS exception.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::{Position, Url};

/// Shared deadline for the running phase, readable from the interrupt
/// handler and host calls
#[derive(Clone)]
pub(crate) struct Deadline {
    start: Instant,
    deadline_ms: Arc<AtomicU64>,
}

impl Deadline {
    pub(crate) fn new(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            deadline_ms: Arc::new(AtomicU64::new(budget.as_millis() as u64)),
        }
    }

    /// Start a fresh budget from now
    pub(crate) fn reset(&self, budget: Duration) {
        let now = self.start.elapsed().as_millis() as u64;
        self.deadline_ms
            .store(now + budget.as_millis() as u64, Ordering::SeqCst);
    }

    pub(crate) fn remaining(&self) -> Duration {
        let now = self.start.elapsed().as_millis() as u64;
        Duration::from_millis(self.deadline_ms.load(Ordering::SeqCst).saturating_sub(now))
    }

    pub(crate) fn expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

/// `console.*` sink
pub(crate) fn log(script: &str, level: &str, message: &str) {
    match level {
        "error" => error!(target: "sandbox", script, "{}", message),
        "warn" => warn!(target: "sandbox", script, "{}", message),
        "debug" => debug!(target: "sandbox", script, "{}", message),
        _ => info!(target: "sandbox", script, "{}", message),
    }
}

#[derive(Debug, Deserialize)]
struct FetchInit {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    headers: Map<String, Value>,
    #[serde(default)]
    body: Option<String>,
}

fn error_record(message: impl std::fmt::Display) -> String {
    json!({ "error": message.to_string() }).to_string()
}

/// Blocking HTTP request bounded by the time left in the current phase
pub(crate) fn fetch(url: &str, init: &str, allow_network: bool, deadline: &Deadline) -> String {
    if !allow_network {
        return error_record("network access disabled");
    }

    let init: FetchInit = match serde_json::from_str(init) {
        Ok(init) => init,
        Err(e) => return error_record(format!("invalid request options: {}", e)),
    };

    let remaining = deadline.remaining();
    if remaining.is_zero() {
        return error_record("script deadline reached");
    }

    let method = init.method.as_deref().unwrap_or("GET");
    let method = match reqwest::Method::from_bytes(method.as_bytes()) {
        Ok(m) => m,
        Err(_) => return error_record(format!("invalid method '{}'", method)),
    };

    let client = match reqwest::blocking::Client::builder().timeout(remaining).build() {
        Ok(c) => c,
        Err(e) => return error_record(e),
    };

    debug!("Script fetch {} {}", method, url);
    let mut request = client.request(method, url);
    for (name, value) in &init.headers {
        let value = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
        request = request.header(name.as_str(), value);
    }
    if let Some(body) = init.body {
        request = request.body(body);
    }

    let response = match request.send() {
        Ok(r) => r,
        Err(e) => return error_record(e),
    };

    let status = response.status();
    let final_url = response.url().to_string();
    let headers: Map<String, Value> = response
        .headers()
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()),
            )
        })
        .collect();

    match response.text() {
        Ok(body) => json!({
            "status": status.as_u16(),
            "statusText": status.canonical_reason().unwrap_or(""),
            "url": final_url,
            "headers": headers,
            "body": body,
        })
        .to_string(),
        Err(e) => error_record(e),
    }
}

/// WHATWG-style URL parsing for the prelude's `URL` class
pub(crate) fn url_parse(input: &str, base: &str) -> String {
    let parsed = if base.is_empty() {
        Url::parse(input)
    } else {
        Url::parse(base).and_then(|b| b.join(input))
    };

    match parsed {
        Ok(url) => {
            let hostname = url.host_str().unwrap_or("").to_string();
            let port = url.port().map(|p| p.to_string()).unwrap_or_default();
            let host = if port.is_empty() {
                hostname.clone()
            } else {
                format!("{}:{}", hostname, port)
            };
            json!({
                "prefix": &url[..Position::AfterPath],
                "protocol": format!("{}:", url.scheme()),
                "username": url.username(),
                "password": url.password().unwrap_or(""),
                "host": host,
                "hostname": hostname,
                "port": port,
                "pathname": url.path(),
                "search": url.query().filter(|q| !q.is_empty()).map(|q| format!("?{}", q)).unwrap_or_default(),
                "hash": url.fragment().filter(|f| !f.is_empty()).map(|f| format!("#{}", f)).unwrap_or_default(),
                "origin": url.origin().ascii_serialization(),
            })
            .to_string()
        }
        Err(e) => error_record(e),
    }
}
