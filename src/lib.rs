//! Novelgraph: literary knowledge-graph pipeline
//!
//! Ingests plain-text novels, splits them into chunk rows, obtains a
//! graph fragment per chunk from a generative extraction service, and
//! normalizes the fragments into one deduplicated graph ready for bulk
//! import into a property-graph database.
//!
//! # Core Concepts
//!
//! - **Fragments**: one chunk's extracted nodes and relationships, with
//!   fragment-scoped integer ids that collide across chunks
//! - **Stable identity**: deterministic UUIDv5 ids derived from
//!   `(label, name)`, so the same entity merges across chunks
//! - **Rows**: chunk text plus provenance (chapter, order, author, book)
//!   and the raw or normalized fragment JSON
//!
//! # Example
//!
//! ```
//! use novelgraph::{process_rows, ChunkRow};
//!
//! let rows = vec![ChunkRow {
//!     chapter: "CHAPTER I.".into(),
//!     chunk: "Tom appeared.".into(),
//!     chunk_order_number: 1,
//!     author: "Mark Twain".into(),
//!     book: "Tom Sawyer".into(),
//!     kg_json: r#"{"nodes":[{"id":1,"label":"Actor","name":"Tom"}],"relationships":[]}"#.into(),
//! }];
//! let (processed, stats) = process_rows(rows, 100);
//! assert_eq!(stats.total_errors, 0);
//! assert!(processed[0].kg_json.contains("Actor"));
//! ```

mod graph;

pub mod chunker;
pub mod extract;
pub mod llm;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod repair;

pub use chunker::{chunk_novel, chunk_novel_file};
pub use extract::{
    extract_all_entities, extract_nodes, extract_relationships, EntityRecord, NodeRecord,
    Provenance, RelationshipRecord,
};
pub use graph::{
    resolve_stable_id, FragmentNode, FragmentPayload, FragmentRelationship, GraphFragment,
    LocalId, Properties, PropertyValue,
};
pub use llm::{ExtractionClient, ExtractionError, GeminiClient, GeminiConfig, MockClient};
pub use loader::{LoaderConfig, LoaderError, MemgraphLoader};
pub use normalize::{normalize_fragments, NormalizeOutcome};
pub use pipeline::{process_row, process_rows, ChunkRow, ProcessingStats, RowError, RowOutcome};
pub use repair::{repair_json, RepairOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
