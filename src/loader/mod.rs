//! Bulk loading into Memgraph over Bolt
//!
//! Takes the flat records produced by extraction and writes them in
//! `UNWIND` batches, one transaction per batch. Batches are
//! all-or-nothing: a failed batch rolls back and the error propagates,
//! while previously committed batches stay.

use crate::extract::{NodeRecord, RelationshipRecord};
use crate::graph::{LocalId, PropertyValue};
use neo4rs::{query, BoltType, Graph};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default number of records per transaction batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Entity labels that get an `id` index up front.
const INDEXED_LABELS: &[&str] = &[
    "Author",
    "Book",
    "Chapter",
    "Chunk",
    "Actor",
    "Object",
    "Location",
    "Event",
    "Intangible",
];

/// Errors from loader operations.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("not connected")]
    NotConnected,
    #[error("database error: {0}")]
    Database(#[from] neo4rs::Error),
}

/// Connection settings for the Bolt endpoint.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: String::new(),
            password: String::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Bulk loader for Memgraph.
pub struct MemgraphLoader {
    config: LoaderConfig,
    graph: Option<Graph>,
}

impl MemgraphLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            graph: None,
        }
    }

    /// Open the Bolt connection and verify it with a `RETURN 1`.
    pub async fn connect(&mut self) -> Result<(), LoaderError> {
        let graph = Graph::new(
            &self.config.uri,
            &self.config.user,
            &self.config.password,
        )
        .await?;
        graph.run(query("RETURN 1")).await?;
        info!(uri = %self.config.uri, "connected to Memgraph");
        self.graph = Some(graph);
        Ok(())
    }

    pub fn close(&mut self) {
        self.graph = None;
    }

    fn graph(&self) -> Result<&Graph, LoaderError> {
        self.graph.as_ref().ok_or(LoaderError::NotConnected)
    }

    /// Create per-label `id` indexes. Failures (e.g. index already
    /// exists) are logged at debug level and skipped.
    pub async fn create_indexes(&self) -> Result<(), LoaderError> {
        let graph = self.graph()?;
        for label in INDEXED_LABELS {
            let statement = format!("CREATE INDEX ON :{}(id)", label);
            if let Err(e) = graph.run(query(&statement)).await {
                debug!(label, "index creation skipped: {}", e);
            }
        }
        Ok(())
    }

    /// Import nodes in per-label `UNWIND` batches, merging on `id`.
    ///
    /// Records without a stable id are skipped with a warning. Returns
    /// the number of nodes written.
    pub async fn import_nodes(&self, nodes: &[NodeRecord]) -> Result<usize, LoaderError> {
        let graph = self.graph()?;
        let mut by_label: HashMap<String, Vec<HashMap<String, BoltType>>> = HashMap::new();
        let mut skipped = 0usize;

        for record in nodes {
            let Some(id) = stable_id(record.node.id.as_ref()) else {
                skipped += 1;
                continue;
            };
            by_label
                .entry(sanitize_identifier(&record.node.label))
                .or_default()
                .push(node_row(record, id));
        }
        if skipped > 0 {
            warn!(skipped, "nodes without a stable id were not imported");
        }

        let mut total = 0usize;
        for (label, rows) in by_label {
            let statement = format!(
                "UNWIND $batch AS row MERGE (n:{} {{id: row.id}}) SET n += row.props",
                label
            );
            for chunk in rows.chunks(self.config.batch_size.max(1)) {
                let mut txn = graph.start_txn().await?;
                let q = query(&statement).param("batch", chunk.to_vec());
                match txn.run(q).await {
                    Ok(()) => txn.commit().await?,
                    Err(e) => {
                        txn.rollback().await?;
                        return Err(e.into());
                    }
                }
                total += chunk.len();
            }
            info!(label = %label, "imported node batch");
        }
        Ok(total)
    }

    /// Import relationships in per-type `UNWIND` batches.
    ///
    /// Records missing an endpoint or a type are skipped with a warning.
    /// Returns the number of relationships written.
    pub async fn import_relationships(
        &self,
        relationships: &[RelationshipRecord],
    ) -> Result<usize, LoaderError> {
        let graph = self.graph()?;
        let mut by_type: HashMap<String, Vec<HashMap<String, BoltType>>> = HashMap::new();
        let mut skipped = 0usize;

        for record in relationships {
            let rel = &record.relationship;
            let (Some(start), Some(end), Some(kind)) =
                (rel.start_id.as_ref(), rel.end_id.as_ref(), rel.kind())
            else {
                skipped += 1;
                continue;
            };
            by_type
                .entry(sanitize_identifier(kind))
                .or_default()
                .push(relationship_row(record, start, end));
        }
        if skipped > 0 {
            warn!(skipped, "relationships missing endpoint or type were not imported");
        }

        let mut total = 0usize;
        for (rel_type, rows) in by_type {
            let statement = format!(
                "UNWIND $batch AS row \
                 MATCH (a {{id: row.start_id}}), (b {{id: row.end_id}}) \
                 CREATE (a)-[r:{}]->(b) SET r += row.props",
                rel_type
            );
            for chunk in rows.chunks(self.config.batch_size.max(1)) {
                let mut txn = graph.start_txn().await?;
                let q = query(&statement).param("batch", chunk.to_vec());
                match txn.run(q).await {
                    Ok(()) => txn.commit().await?,
                    Err(e) => {
                        txn.rollback().await?;
                        return Err(e.into());
                    }
                }
                total += chunk.len();
            }
            info!(rel_type = %rel_type, "imported relationship batch");
        }
        Ok(total)
    }
}

fn stable_id(id: Option<&LocalId>) -> Option<String> {
    match id {
        Some(LocalId::Text(s)) => Some(s.clone()),
        Some(LocalId::Int(n)) => Some(n.to_string()),
        None => None,
    }
}

/// Labels and relationship types cannot be query parameters; strip
/// anything that isn't a plain identifier character before splicing.
fn sanitize_identifier(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "Unknown".to_string()
    } else {
        cleaned
    }
}

fn node_row(record: &NodeRecord, id: String) -> HashMap<String, BoltType> {
    let mut props: HashMap<String, BoltType> = HashMap::new();
    props.insert("id".to_string(), id.clone().into());
    props.insert("label".to_string(), record.node.label.clone().into());
    if let Some(name) = &record.node.name {
        props.insert("name".to_string(), name.clone().into());
    }
    insert_provenance(&mut props, record.chunk_index, &record.provenance);
    insert_extras(&mut props, &record.node.extra);

    let mut row: HashMap<String, BoltType> = HashMap::new();
    row.insert("id".to_string(), id.into());
    row.insert("props".to_string(), props.into());
    row
}

fn relationship_row(
    record: &RelationshipRecord,
    start: &LocalId,
    end: &LocalId,
) -> HashMap<String, BoltType> {
    let rel = &record.relationship;
    let mut props: HashMap<String, BoltType> = HashMap::new();
    if let Some(weight) = rel.weight {
        props.insert("weight".to_string(), weight.into());
    }
    insert_provenance(&mut props, record.chunk_index, &record.provenance);
    insert_extras(&mut props, &rel.extra);

    let mut row: HashMap<String, BoltType> = HashMap::new();
    row.insert("start_id".to_string(), start.to_string().into());
    row.insert("end_id".to_string(), end.to_string().into());
    row.insert("props".to_string(), props.into());
    row
}

fn insert_provenance(
    props: &mut HashMap<String, BoltType>,
    chunk_index: usize,
    provenance: &crate::extract::Provenance,
) {
    props.insert("chapter".to_string(), provenance.chapter.clone().into());
    props.insert("chunk".to_string(), provenance.chunk.clone().into());
    props.insert(
        "chunk_order_number".to_string(),
        provenance.chunk_order_number.into(),
    );
    props.insert("author".to_string(), provenance.author.clone().into());
    props.insert("book".to_string(), provenance.book.clone().into());
    props.insert("chunk_index".to_string(), (chunk_index as i64).into());
}

fn insert_extras(props: &mut HashMap<String, BoltType>, extras: &crate::graph::Properties) {
    for (key, value) in extras {
        if let Some(bolt) = property_to_bolt(value) {
            props.insert(key.clone(), bolt);
        }
    }
}

/// Convert a property value to its Bolt representation.
///
/// Nulls are dropped rather than written — absent and null are
/// equivalent for imported properties.
fn property_to_bolt(value: &PropertyValue) -> Option<BoltType> {
    match value {
        PropertyValue::Null => None,
        PropertyValue::Bool(b) => Some((*b).into()),
        PropertyValue::Int(n) => Some((*n).into()),
        PropertyValue::Float(f) => Some((*f).into()),
        PropertyValue::String(s) => Some(s.clone().into()),
        PropertyValue::Array(items) => {
            let list: Vec<BoltType> = items.iter().filter_map(property_to_bolt).collect();
            Some(list.into())
        }
        PropertyValue::Object(map) => {
            let mut bolt: HashMap<String, BoltType> = HashMap::new();
            for (key, value) in map {
                if let Some(converted) = property_to_bolt(value) {
                    bolt.insert(key.clone(), converted);
                }
            }
            Some(bolt.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Provenance;
    use crate::graph::FragmentNode;

    fn provenance() -> Provenance {
        Provenance {
            chapter: "CHAPTER I.".to_string(),
            chunk: "Tom appeared.".to_string(),
            chunk_order_number: 1,
            author: "Mark Twain".to_string(),
            book: "Tom Sawyer".to_string(),
        }
    }

    #[tokio::test]
    async fn import_before_connect_is_rejected() {
        let loader = MemgraphLoader::new(LoaderConfig::default());
        let record = NodeRecord {
            provenance: provenance(),
            chunk_index: 0,
            node: FragmentNode::new("51a17aa9-af7b-5ec4-896c-4ee7ce8eb1c0", "Actor")
                .with_name("Tom"),
        };
        let result = loader.import_nodes(&[record]).await;
        assert!(matches!(result, Err(LoaderError::NotConnected)));

        let result = loader.import_relationships(&[]).await;
        assert!(matches!(result, Err(LoaderError::NotConnected)));

        let result = loader.create_indexes().await;
        assert!(matches!(result, Err(LoaderError::NotConnected)));
    }

    #[test]
    fn sanitize_strips_cypher_metacharacters() {
        assert_eq!(sanitize_identifier("Actor"), "Actor");
        assert_eq!(sanitize_identifier("KNOWS_WELL"), "KNOWS_WELL");
        assert_eq!(sanitize_identifier("Actor`) DETACH DELETE"), "ActorDETACHDELETE");
        assert_eq!(sanitize_identifier("!!"), "Unknown");
    }

    #[test]
    fn node_row_carries_id_and_provenance_props() {
        let record = NodeRecord {
            provenance: provenance(),
            chunk_index: 2,
            node: FragmentNode::new("abc", "Actor").with_name("Tom").with_property(
                "description",
                PropertyValue::String("a boy".to_string()),
            ),
        };
        let row = node_row(&record, "abc".to_string());
        assert!(matches!(row.get("id"), Some(BoltType::String(_))));
        assert!(matches!(row.get("props"), Some(BoltType::Map(_))));
    }

    #[test]
    fn null_properties_are_dropped() {
        assert!(property_to_bolt(&PropertyValue::Null).is_none());
        let nested = PropertyValue::Array(vec![PropertyValue::Null, PropertyValue::Int(1)]);
        assert!(matches!(property_to_bolt(&nested), Some(BoltType::List(_))));
    }
}
