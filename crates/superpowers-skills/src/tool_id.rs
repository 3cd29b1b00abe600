//! Normalisation of free-form tool declarations
//!
//! Superpowers declare their tools as arbitrary JSON values. Authors commonly
//! write call-like strings such as `http_call("https://...")`, so only the
//! prefix before the first `(` or `"` names the tool.

use serde_json::Value;
use std::fmt;

/// A normalised tool identifier, matched case-sensitively against factories
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolId(String);

/// Outcome of normalising one declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedToolId {
    Valid(ToolId),
    Discard,
}

impl ToolId {
    pub fn parse(declaration: &Value) -> ParsedToolId {
        let raw = match declaration {
            Value::Null => return ParsedToolId::Discard,
            Value::String(s) => s
                .split(['(', '"'])
                .next()
                .unwrap_or_default()
                .trim()
                .to_string(),
            // Non-strings are taken whole, without the call-syntax split
            other => other.to_string(),
        };

        if raw.is_empty() {
            ParsedToolId::Discard
        } else {
            ParsedToolId::Valid(ToolId(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ParsedToolId {
    pub fn valid(self) -> Option<ToolId> {
        match self {
            Self::Valid(id) => Some(id),
            Self::Discard => None,
        }
    }
}
