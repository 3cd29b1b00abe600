//! Superpowers Knowledge
//!
//! Semantic search over the CSV documents attached to an agent. Every
//! non-empty row becomes one retrievable unit, rows are embedded once when
//! the index is built, and queries are ranked by cosine similarity.
//! Vectors live only in memory and are rebuilt per conversation.

pub mod chunk;
pub mod embeddings;
pub mod index;

pub use chunk::{split_rows, RetrievableUnit};
pub use embeddings::{
    EmbeddingConfig, EmbeddingError, EmbeddingProvider, EmbeddingProviderKind, HashingEmbeddings,
    OllamaEmbeddings, OpenAiEmbeddings,
};
pub use index::{cosine_similarity, SearchHit, SemanticIndex};
