//! In-memory vector index over retrievable units

use crate::chunk::{split_rows, RetrievableUnit};
use crate::embeddings::{EmbeddingError, EmbeddingProvider, Result};
use std::sync::Arc;
use superpowers_types::Document;
use tracing::{debug, info};

/// Default number of rows sent per embedding request
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Cosine similarity; 0 for mismatched, empty or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// A ranked search result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub unit: RetrievableUnit,
    pub score: f32,
}

/// Embedded rows of one agent's documents
pub struct SemanticIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    entries: Vec<(RetrievableUnit, Vec<f32>)>,
}

impl SemanticIndex {
    /// Embed every row of `documents`
    pub async fn build(embedder: Arc<dyn EmbeddingProvider>, documents: &[Document]) -> Result<Self> {
        Self::build_with_batch_size(embedder, documents, DEFAULT_BATCH_SIZE).await
    }

    pub async fn build_with_batch_size(
        embedder: Arc<dyn EmbeddingProvider>,
        documents: &[Document],
        batch_size: usize,
    ) -> Result<Self> {
        let units = split_rows(documents);
        let mut entries = Vec::with_capacity(units.len());

        for batch in units.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|u| u.text.clone()).collect();
            let vectors = embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(EmbeddingError::Malformed(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            entries.extend(batch.iter().cloned().zip(vectors));
        }

        info!(
            "Indexed {} rows from {} documents with {}",
            entries.len(),
            documents.len(),
            embedder.name()
        );
        Ok(Self { embedder, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct source names in indexing order
    pub fn sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = Vec::new();
        for (unit, _) in &self.entries {
            if !sources.contains(&unit.source.as_str()) {
                sources.push(&unit.source);
            }
        }
        sources
    }

    /// Top `k` rows by similarity to `query`
    ///
    /// A non-empty `file_names` restricts results to rows from those sources.
    /// Equal scores keep indexing order.
    pub async fn search(
        &self,
        query: &str,
        file_names: Option<&[String]>,
        k: usize,
    ) -> Result<Vec<SearchHit>> {
        let query_vector = self.embedder.embed(query).await?;
        let filter = file_names.filter(|names| !names.is_empty());

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .filter(|(unit, _)| filter.map_or(true, |names| names.contains(&unit.source)))
            .map(|(unit, vector)| SearchHit {
                unit: unit.clone(),
                score: cosine_similarity(&query_vector, vector),
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);

        debug!("Query matched {} rows", hits.len());
        Ok(hits)
    }
}
