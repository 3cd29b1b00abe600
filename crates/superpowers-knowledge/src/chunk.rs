use serde::{Deserialize, Serialize};
use superpowers_types::Document;

/// One searchable row of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievableUnit {
    /// Name of the document the row came from
    pub source: String,
    /// 1-based position among the document's kept rows
    pub row: usize,
    pub text: String,
}

/// Split documents into one unit per non-empty line
///
/// Surrounding whitespace of the whole document is trimmed first, then lines
/// are separated by `\n` or `\r\n`. Empty lines are dropped and do not count
/// towards row numbers; every other line is kept as written, including one
/// holding only spaces. A header line is a row like any other.
pub fn split_rows(documents: &[Document]) -> Vec<RetrievableUnit> {
    let mut units = Vec::new();
    for document in documents {
        let rows = document
            .content
            .trim()
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty());
        for (i, text) in rows.enumerate() {
            units.push(RetrievableUnit {
                source: document.name.clone(),
                row: i + 1,
                text: text.to_string(),
            });
        }
    }
    units
}
