use serde::{Deserialize, Serialize};

/// LLM Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Provider {
    OpenAI {
        model: String,
        api_key: Option<String>,
        base_url: Option<String>,
    },
    Ollama {
        model: String,
        base_url: String,
    },
}

impl Provider {
    pub fn openai(model: impl Into<String>) -> Self {
        Self::OpenAI {
            model: model.into(),
            api_key: None,
            base_url: None,
        }
    }

    pub fn openai_full(
        model: impl Into<String>,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Self {
        Self::OpenAI {
            model: model.into(),
            api_key,
            base_url,
        }
    }

    pub fn ollama(model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::Ollama {
            model: model.into(),
            base_url: base_url.into(),
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    /// Base URL of the OpenAI-compatible API (Ollama serves one under `/v1`)
    pub fn api_base(&self) -> String {
        match self {
            Self::OpenAI { base_url, .. } => base_url
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            Self::Ollama { base_url, .. } => format!("{}/v1", base_url.trim_end_matches('/')),
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        match self {
            Self::OpenAI { api_key, .. } => api_key.as_deref().filter(|k| !k.is_empty()),
            Self::Ollama { .. } => None,
        }
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::openai("gpt-4o-mini")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base() {
        assert_eq!(Provider::default().api_base(), "https://api.openai.com/v1");
        assert_eq!(
            Provider::ollama("llama3", "http://localhost:11434/").api_base(),
            "http://localhost:11434/v1"
        );
        let custom = Provider::openai_full("m", None, Some(String::new()));
        assert_eq!(custom.api_base(), "https://api.openai.com/v1");
    }
}
