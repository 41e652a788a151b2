//! Batch processing of chunk rows
//!
//! Drives repair → parse → normalize → serialize across an ordered
//! collection of rows, one row per text chunk. Failures are captured as
//! data — counters plus the row index — and never abort the batch.

use crate::graph::FragmentPayload;
use crate::normalize::normalize_fragments;
use crate::repair::repair_json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// One unit of source text plus its raw extraction output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRow {
    pub chapter: String,
    pub chunk: String,
    pub chunk_order_number: i64,
    pub author: String,
    pub book: String,
    /// One serialized fragment or an array of fragments
    #[serde(default)]
    pub kg_json: String,
}

/// Why a row failed.
#[derive(Debug, Clone, PartialEq)]
pub enum RowError {
    /// The text was not valid JSON, even after repair
    Decode(String),
    /// The JSON parsed but did not have a usable fragment shape, or
    /// re-serialization failed
    Structure(String),
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(msg) => write!(f, "JSON decode error: {}", msg),
            Self::Structure(msg) => write!(f, "{}", msg),
        }
    }
}

/// The outcome of processing one row's `kg_json`.
///
/// On failure `kg_json` is the *original* text, untouched — not the
/// repaired variant — so a failed row can be re-run or inspected as it
/// arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct RowOutcome {
    pub kg_json: String,
    pub succeeded: bool,
    pub error: Option<RowError>,
    pub unresolved_endpoints: usize,
}

impl RowOutcome {
    fn success(kg_json: String, unresolved_endpoints: usize) -> Self {
        Self {
            kg_json,
            succeeded: true,
            error: None,
            unresolved_endpoints,
        }
    }

    fn failure(original: &str, error: RowError) -> Self {
        Self {
            kg_json: original.to_string(),
            succeeded: false,
            error: Some(error),
            unresolved_endpoints: 0,
        }
    }
}

/// Statistics accumulated across a batch. Never reset mid-run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingStats {
    pub total_errors: usize,
    /// Indices of failed rows, in processing order
    pub error_rows: Vec<usize>,
    pub json_decode_errors: usize,
    /// Relationship endpoints that referenced no node in their fragment
    pub unresolved_endpoints: usize,
}

impl ProcessingStats {
    fn record_failure(&mut self, index: usize, error: &RowError) {
        self.total_errors += 1;
        self.error_rows.push(index);
        if matches!(error, RowError::Decode(_)) {
            self.json_decode_errors += 1;
        }
    }
}

/// Process a single row's `kg_json` text.
///
/// Repair, parse, normalize, and serialize back under the original
/// arity (object in → object out, array in → array out).
pub fn process_row(kg_json: &str) -> RowOutcome {
    let repaired = repair_json(kg_json);

    let value: serde_json::Value = match serde_json::from_str(&repaired.text) {
        Ok(value) => value,
        Err(e) => return RowOutcome::failure(kg_json, RowError::Decode(e.to_string())),
    };

    let single = value.is_object();
    let payload: FragmentPayload = match serde_json::from_value(value) {
        Ok(payload) => payload,
        Err(e) => return RowOutcome::failure(kg_json, RowError::Structure(e.to_string())),
    };

    let outcome = normalize_fragments(payload.into_fragments());
    let repacked = FragmentPayload::repack(outcome.fragments, single);
    match serde_json::to_string(&repacked) {
        Ok(text) => RowOutcome::success(text, outcome.unresolved_endpoints),
        Err(e) => RowOutcome::failure(kg_json, RowError::Structure(e.to_string())),
    }
}

/// Process every row in order, rewriting `kg_json` in place on success.
///
/// A failed row keeps its original text and is recorded in the returned
/// statistics; processing always continues to the next row. Progress is
/// logged every `batch_size` rows.
pub fn process_rows(rows: Vec<ChunkRow>, batch_size: usize) -> (Vec<ChunkRow>, ProcessingStats) {
    let total = rows.len();
    let mut stats = ProcessingStats::default();

    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(index, mut row)| {
            let outcome = process_row(&row.kg_json);
            stats.unresolved_endpoints += outcome.unresolved_endpoints;
            if let Some(ref err) = outcome.error {
                stats.record_failure(index, err);
                error!(row = index, "{}", err);
            }
            row.kg_json = outcome.kg_json;
            if batch_size > 0 && (index + 1) % batch_size == 0 {
                info!(processed = index + 1, total, "processed rows");
            }
            row
        })
        .collect();

    (rows, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FragmentPayload, LocalId};

    fn row(kg_json: &str) -> ChunkRow {
        ChunkRow {
            chapter: "CHAPTER I.".to_string(),
            chunk: "Tom appeared.".to_string(),
            chunk_order_number: 1,
            author: "Mark Twain".to_string(),
            book: "Tom Sawyer".to_string(),
            kg_json: kg_json.to_string(),
        }
    }

    const VALID: &str = r#"{"nodes":[{"id":1,"label":"Actor","name":"Tom"}],"relationships":[{"start_id":1,"end_id":1,"type":"KNOWS"}]}"#;

    #[test]
    fn valid_row_rewrites_node_and_endpoints_to_same_uuid() {
        let outcome = process_row(VALID);
        assert!(outcome.succeeded);
        let payload: FragmentPayload = serde_json::from_str(&outcome.kg_json).unwrap();
        assert!(payload.is_single());
        let fragment = &payload.fragments()[0];

        let id = match &fragment.nodes[0].id {
            Some(LocalId::Text(s)) => s.clone(),
            other => panic!("expected UUID string id, got {:?}", other),
        };
        uuid::Uuid::parse_str(&id).unwrap();
        assert_eq!(fragment.relationships[0].start_id, Some(LocalId::Text(id.clone())));
        assert_eq!(fragment.relationships[0].end_id, Some(LocalId::Text(id)));
    }

    #[test]
    fn array_input_stays_an_array() {
        let raw = format!("[{},{}]", VALID, VALID);
        let outcome = process_row(&raw);
        assert!(outcome.succeeded);
        let payload: FragmentPayload = serde_json::from_str(&outcome.kg_json).unwrap();
        assert!(!payload.is_single());
        assert_eq!(payload.fragments().len(), 2);
    }

    #[test]
    fn single_object_stays_a_single_object() {
        let outcome = process_row(VALID);
        let value: serde_json::Value = serde_json::from_str(&outcome.kg_json).unwrap();
        assert!(value.is_object());
    }

    #[test]
    fn invalid_json_keeps_original_text() {
        let raw = "{not json at all";
        let outcome = process_row(raw);
        assert!(!outcome.succeeded);
        assert_eq!(outcome.kg_json, raw);
        assert!(matches!(outcome.error, Some(RowError::Decode(_))));
    }

    #[test]
    fn scalar_json_is_a_structure_error_not_a_decode_error() {
        let outcome = process_row("42");
        assert!(!outcome.succeeded);
        assert_eq!(outcome.kg_json, "42");
        assert!(matches!(outcome.error, Some(RowError::Structure(_))));
    }

    #[test]
    fn repairable_row_succeeds() {
        // A stray backslash that the repair pass fixes up.
        let raw = r#"{"nodes":[{"id":1,"label":"Actor","name":"Tom \Sawyer"}],"relationships":[]}"#;
        let outcome = process_row(raw);
        assert!(outcome.succeeded, "repaired row should parse: {:?}", outcome.error);
    }

    #[test]
    fn one_bad_row_does_not_abort_the_batch() {
        let rows = vec![row(VALID), row("{broken"), row(VALID)];
        let (processed, stats) = process_rows(rows, 100);

        assert_eq!(stats.total_errors, 1);
        assert_eq!(stats.json_decode_errors, 1);
        assert_eq!(stats.error_rows, vec![1]);

        assert_eq!(processed.len(), 3);
        assert_eq!(processed[1].kg_json, "{broken");
        for good in [&processed[0], &processed[2]] {
            let payload: FragmentPayload = serde_json::from_str(&good.kg_json).unwrap();
            assert!(payload.is_single());
        }
    }

    #[test]
    fn clean_batch_reports_no_errors() {
        let rows = vec![row(VALID), row(VALID)];
        let (_, stats) = process_rows(rows, 1);
        assert_eq!(stats, ProcessingStats::default());
    }

    #[test]
    fn unresolved_endpoints_accumulate_across_rows() {
        let dangling =
            r#"{"nodes":[{"id":1,"label":"Actor","name":"Tom"}],"relationships":[{"start_id":1,"end_id":99,"type":"KNOWS"}]}"#;
        let rows = vec![row(dangling), row(dangling)];
        let (_, stats) = process_rows(rows, 10);
        assert_eq!(stats.unresolved_endpoints, 2);
        assert_eq!(stats.total_errors, 0);
    }

    #[test]
    fn dedup_holds_across_rows() {
        let (processed, _) = process_rows(vec![row(VALID), row(VALID)], 10);
        let id_of = |r: &ChunkRow| {
            let payload: FragmentPayload = serde_json::from_str(&r.kg_json).unwrap();
            payload.fragments()[0].nodes[0].id.clone()
        };
        assert_eq!(id_of(&processed[0]), id_of(&processed[1]));
    }

    #[test]
    fn row_provenance_is_untouched() {
        let (processed, _) = process_rows(vec![row(VALID)], 10);
        assert_eq!(processed[0].chapter, "CHAPTER I.");
        assert_eq!(processed[0].author, "Mark Twain");
        assert_eq!(processed[0].chunk_order_number, 1);
    }
}
