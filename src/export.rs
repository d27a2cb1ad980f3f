//! Export of the reading view as a delimited table.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::threading::{Hierarchy, HierarchyNode};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One row of the reading view, in export column order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReadingRow {
    #[serde(rename = "Tier")]
    pub tier: usize,
    #[serde(rename = "PostID")]
    pub post_id: u64,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Comment")]
    pub comment: String,
    #[serde(rename = "Likes")]
    pub likes: u32,
    #[serde(rename = "Shares")]
    pub shares: u32,
    #[serde(rename = "IndentedComment")]
    pub indented_comment: String,
}

impl From<&HierarchyNode> for ReadingRow {
    fn from(node: &HierarchyNode) -> Self {
        Self {
            tier: node.tier,
            post_id: node.post.id(),
            username: node.post.username().to_string(),
            timestamp: node.post.timestamp().to_string(),
            comment: node.post.content().to_string(),
            likes: node.post.likes(),
            shares: node.post.shares(),
            indented_comment: node.indented_comment(),
        }
    }
}

pub fn reading_rows(hierarchy: &Hierarchy) -> Vec<ReadingRow> {
    hierarchy.nodes().iter().map(ReadingRow::from).collect()
}

/// Write the hierarchy as CSV, header included, to any writer.
///
/// # Errors
///
/// Returns an error if serialization or the underlying writer fails.
pub fn write_csv<W: Write>(writer: W, hierarchy: &Hierarchy) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in reading_rows(hierarchy) {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush().map_err(|e| ExportError::Csv(e.into()))?;
    Ok(())
}

/// Write the hierarchy as a CSV file, replacing any existing file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_csv<P: AsRef<Path>>(path: P, hierarchy: &Hierarchy) -> Result<(), ExportError> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    write_csv(file, hierarchy)
}
