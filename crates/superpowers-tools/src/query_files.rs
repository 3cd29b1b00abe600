//! `query_files`: semantic search over the agent's CSV documents

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use superpowers_knowledge::index::DEFAULT_BATCH_SIZE;
use superpowers_knowledge::{split_rows, EmbeddingProvider, SemanticIndex};
use superpowers_provider::ToolFunction;
use superpowers_types::{Document, Tool};
use tracing::{info, warn};

pub const NO_DOCS_MESSAGE: &str = "No documents in the knowledge base. Upload CSV files to the agent's knowledge base to enable semantic search.";

/// Rows returned per query
const TOP_K: usize = 8;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryFilesArgs {
    #[serde(default)]
    query: String,
    #[serde(default)]
    file_names: Option<Vec<String>>,
}

enum KnowledgeState {
    /// No non-empty rows to search
    Empty,
    Ready(SemanticIndex),
    /// Building the index failed; holds the reason
    Unavailable(String),
}

/// Search tool bound to one agent's documents, indexed eagerly
pub struct QueryFilesTool {
    state: KnowledgeState,
}

impl QueryFilesTool {
    pub async fn build(embedder: Arc<dyn EmbeddingProvider>, documents: &[Document]) -> Self {
        Self::build_with_batch_size(embedder, documents, DEFAULT_BATCH_SIZE).await
    }

    pub async fn build_with_batch_size(
        embedder: Arc<dyn EmbeddingProvider>,
        documents: &[Document],
        batch_size: usize,
    ) -> Self {
        if split_rows(documents).is_empty() {
            return Self::empty();
        }

        let state = match SemanticIndex::build_with_batch_size(embedder, documents, batch_size).await {
            Ok(index) => KnowledgeState::Ready(index),
            Err(e) => {
                warn!("Knowledge base index build failed: {}", e);
                KnowledgeState::Unavailable(e.to_string())
            }
        };
        Self { state }
    }

    pub fn empty() -> Self {
        Self {
            state: KnowledgeState::Empty,
        }
    }

    /// Mark the knowledge base as unavailable, e.g. when documents could not be read
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: KnowledgeState::Unavailable(reason.into()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, KnowledgeState::Ready(_))
    }

    pub async fn query(&self, query: &str, file_names: Option<&[String]>) -> String {
        info!("Calling tool: query_files | query: {} | files: {:?}", query, file_names);

        let index = match &self.state {
            KnowledgeState::Empty => return NO_DOCS_MESSAGE.to_string(),
            KnowledgeState::Unavailable(reason) => {
                return format!("Knowledge base unavailable: {}", reason)
            }
            KnowledgeState::Ready(index) => index,
        };

        let hits = match index.search(query, file_names, TOP_K).await {
            Ok(hits) => hits,
            Err(e) => return format!("Knowledge base search failed: {}", e),
        };

        if hits.is_empty() {
            let file_list = match file_names {
                Some(names) if !names.is_empty() => format!(" in {}", names.join(", ")),
                _ => String::new(),
            };
            return format!(
                "No relevant content found{}. Try a broader or different query.",
                file_list
            );
        }

        hits.iter()
            .enumerate()
            .map(|(i, hit)| format!("[{}] ({}): {}", i + 1, hit.unit.source, hit.unit.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[async_trait]
impl ToolFunction for QueryFilesTool {
    fn definition(&self) -> Tool {
        Tool::function(
            "query_files",
            "Search documents in the agent knowledge base using semantic similarity. Returns \
             relevant rows from uploaded CSV files. You MUST specify which files to search.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query to find relevant document content"
                    },
                    "fileNames": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "The names of the files to search in (from the knowledge base)"
                    }
                },
                "required": ["query", "fileNames"]
            }),
        )
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let args: QueryFilesArgs = serde_json::from_value(args)?;
        Ok(self.query(&args.query, args.file_names.as_deref()).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use superpowers_knowledge::HashingEmbeddings;

    #[tokio::test]
    async fn test_blank_documents_read_as_empty() {
        let docs = vec![Document::new("a", "blank.csv", "\n  \r\n")];
        let tool = QueryFilesTool::build(Arc::new(HashingEmbeddings::new(64)), &docs).await;
        assert!(!tool.is_ready());
        let out = tool
            .execute(serde_json::json!({"query": "anything", "fileNames": []}))
            .await
            .unwrap();
        assert_eq!(out, NO_DOCS_MESSAGE);
    }

    #[tokio::test]
    async fn test_unavailable_reports_reason() {
        let tool = QueryFilesTool::unavailable("store offline");
        assert_eq!(
            tool.query("x", None).await,
            "Knowledge base unavailable: store offline"
        );
    }

    #[tokio::test]
    async fn test_no_hits_names_files() {
        let docs = vec![Document::new("a", "menu.csv", "dish,price\nSoup,4")];
        let tool = QueryFilesTool::build(Arc::new(HashingEmbeddings::new(64)), &docs).await;
        let names = vec!["other.csv".to_string(), "more.csv".to_string()];
        assert_eq!(
            tool.query("soup", Some(&names)).await,
            "No relevant content found in other.csv, more.csv. Try a broader or different query."
        );
    }
}
