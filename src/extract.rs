//! Flattening processed rows into importable entity records
//!
//! After batch processing, each row's `kg_json` holds normalized
//! fragments. The extractor flattens them into two collections — all
//! nodes, all relationships — each record tagged with the provenance of
//! the row it came from and its fragment's position within the row.

use crate::graph::{FragmentNode, FragmentPayload, FragmentRelationship};
use crate::pipeline::ChunkRow;
use serde::Serialize;
use tracing::error;

/// Where an extracted element came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    pub chapter: String,
    pub chunk: String,
    pub chunk_order_number: i64,
    pub author: String,
    pub book: String,
}

impl From<&ChunkRow> for Provenance {
    fn from(row: &ChunkRow) -> Self {
        Self {
            chapter: row.chapter.clone(),
            chunk: row.chunk.clone(),
            chunk_order_number: row.chunk_order_number,
            author: row.author.clone(),
            book: row.book.clone(),
        }
    }
}

/// A node with its provenance, ready for bulk import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    #[serde(flatten)]
    pub provenance: Provenance,
    /// Position of the fragment within its row
    pub chunk_index: usize,
    #[serde(flatten)]
    pub node: FragmentNode,
}

/// A relationship with its provenance, ready for bulk import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipRecord {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub chunk_index: usize,
    #[serde(flatten)]
    pub relationship: FragmentRelationship,
}

/// A record in the combined view, tagged with its entity type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "entity_type", rename_all = "lowercase")]
pub enum EntityRecord {
    Node(NodeRecord),
    Relationship(RelationshipRecord),
}

fn parsed_fragments(rows: &[ChunkRow]) -> impl Iterator<Item = (&ChunkRow, FragmentPayload)> {
    rows.iter().enumerate().filter_map(|(index, row)| {
        match serde_json::from_str::<FragmentPayload>(&row.kg_json) {
            Ok(payload) => Some((row, payload)),
            Err(e) => {
                error!(row = index, "skipping unparseable row during extraction: {}", e);
                None
            }
        }
    })
}

/// Flatten every node of every parseable row, in row order.
///
/// Rows whose `kg_json` cannot be parsed are logged and skipped; this is
/// a separate failure surface from batch-processing statistics.
pub fn extract_nodes(rows: &[ChunkRow]) -> Vec<NodeRecord> {
    let mut records = Vec::new();
    for (row, payload) in parsed_fragments(rows) {
        let provenance = Provenance::from(row);
        for (chunk_index, fragment) in payload.fragments().iter().enumerate() {
            for node in &fragment.nodes {
                records.push(NodeRecord {
                    provenance: provenance.clone(),
                    chunk_index,
                    node: node.clone(),
                });
            }
        }
    }
    records
}

/// Flatten every relationship of every parseable row, in row order.
pub fn extract_relationships(rows: &[ChunkRow]) -> Vec<RelationshipRecord> {
    let mut records = Vec::new();
    for (row, payload) in parsed_fragments(rows) {
        let provenance = Provenance::from(row);
        for (chunk_index, fragment) in payload.fragments().iter().enumerate() {
            for relationship in &fragment.relationships {
                records.push(RelationshipRecord {
                    provenance: provenance.clone(),
                    chunk_index,
                    relationship: relationship.clone(),
                });
            }
        }
    }
    records
}

/// The combined view: all nodes first, then all relationships, each
/// collection in its own extraction order.
pub fn extract_all_entities(rows: &[ChunkRow]) -> Vec<EntityRecord> {
    extract_nodes(rows)
        .into_iter()
        .map(EntityRecord::Node)
        .chain(
            extract_relationships(rows)
                .into_iter()
                .map(EntityRecord::Relationship),
        )
        .collect()
}
