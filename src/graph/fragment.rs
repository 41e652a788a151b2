//! Graph fragment wire types
//!
//! A fragment is one chunk's extracted graph: a list of nodes and a list
//! of relationships, with fragment-scoped integer identifiers. Fragments
//! arrive as JSON produced by the extraction service — either a single
//! object or an array of objects — and carry arbitrary extra fields that
//! must survive normalization untouched.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Typed property values for open property bags.
///
/// Extraction output attaches arbitrary extra fields to nodes and
/// relationships. This closed variant keeps flattening type-safe while
/// preserving pass-through semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Object(HashMap<String, PropertyValue>),
}

/// Properties collection
pub type Properties = HashMap<String, PropertyValue>;

/// A fragment-scoped identifier.
///
/// The extraction service usually emits small integers, but string ids
/// appear in the wild. After normalization every id is the stringified
/// stable UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for LocalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for LocalId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for LocalId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

fn default_label() -> String {
    "Unknown".to_string()
}

/// A node as extracted for one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentNode {
    /// Fragment-scoped id on input; stable UUID string after normalization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LocalId>,
    /// Entity category (Actor, Location, Event, ...)
    #[serde(default = "default_label")]
    pub label: String,
    /// Human-readable key; the basis of cross-fragment identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Everything else the extractor attached, carried through verbatim
    #[serde(flatten)]
    pub extra: Properties,
}

impl FragmentNode {
    pub fn new(id: impl Into<LocalId>, label: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            label: label.into(),
            name: None,
            extra: HashMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// A relationship as extracted for one chunk.
///
/// Endpoints reference node ids within the same fragment. The extraction
/// service emits the type under either `type` or `relationship_type`;
/// both spellings are preserved as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentRelationship {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_id: Option<LocalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_id: Option<LocalId>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub rel_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(flatten)]
    pub extra: Properties,
}

impl FragmentRelationship {
    pub fn new(
        start_id: impl Into<LocalId>,
        end_id: impl Into<LocalId>,
        rel_type: impl Into<String>,
    ) -> Self {
        Self {
            start_id: Some(start_id.into()),
            end_id: Some(end_id.into()),
            rel_type: Some(rel_type.into()),
            relationship_type: None,
            weight: None,
            extra: HashMap::new(),
        }
    }

    /// The relationship type under either accepted spelling.
    pub fn kind(&self) -> Option<&str> {
        self.rel_type
            .as_deref()
            .or(self.relationship_type.as_deref())
    }
}

/// One chunk's extracted graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphFragment {
    #[serde(default)]
    pub nodes: Vec<FragmentNode>,
    #[serde(default)]
    pub relationships: Vec<FragmentRelationship>,
    /// Fragment-level fields other than nodes/relationships (e.g. metadata)
    #[serde(flatten)]
    pub extra: Properties,
}

/// The `kg_json` wire shape: a single fragment or an array of fragments.
///
/// Arity is preserved through processing — an object in produces an
/// object out, an array in produces an array out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FragmentPayload {
    Single(GraphFragment),
    Many(Vec<GraphFragment>),
}

impl FragmentPayload {
    pub fn is_single(&self) -> bool {
        matches!(self, Self::Single(_))
    }

    pub fn fragments(&self) -> &[GraphFragment] {
        match self {
            Self::Single(fragment) => std::slice::from_ref(fragment),
            Self::Many(fragments) => fragments,
        }
    }

    pub fn into_fragments(self) -> Vec<GraphFragment> {
        match self {
            Self::Single(fragment) => vec![fragment],
            Self::Many(fragments) => fragments,
        }
    }

    /// Repack fragments under the original arity.
    ///
    /// A single-object input that normalized to exactly one fragment
    /// serializes back as a single object.
    pub fn repack(mut fragments: Vec<GraphFragment>, single: bool) -> Self {
        if single && fragments.len() == 1 {
            Self::Single(fragments.remove(0))
        } else {
            Self::Many(fragments)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_deserializes_with_integer_id_and_extras() {
        let node: FragmentNode = serde_json::from_str(
            r#"{"id": 3, "label": "Actor", "name": "Tom", "description": "a boy", "age": 12}"#,
        )
        .unwrap();
        assert_eq!(node.id, Some(LocalId::Int(3)));
        assert_eq!(node.label, "Actor");
        assert_eq!(node.name.as_deref(), Some("Tom"));
        assert_eq!(
            node.extra.get("description"),
            Some(&PropertyValue::String("a boy".to_string()))
        );
        assert_eq!(node.extra.get("age"), Some(&PropertyValue::Int(12)));
    }

    #[test]
    fn node_without_label_defaults_to_unknown() {
        let node: FragmentNode = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert_eq!(node.label, "Unknown");
    }

    #[test]
    fn relationship_accepts_both_type_spellings() {
        let a: FragmentRelationship =
            serde_json::from_str(r#"{"start_id": 1, "end_id": 2, "type": "KNOWS"}"#).unwrap();
        assert_eq!(a.kind(), Some("KNOWS"));

        let b: FragmentRelationship = serde_json::from_str(
            r#"{"start_id": 1, "end_id": 2, "relationship_type": "LOVES", "weight": 0.9}"#,
        )
        .unwrap();
        assert_eq!(b.kind(), Some("LOVES"));
        assert_eq!(b.weight, Some(0.9));
    }

    #[test]
    fn payload_distinguishes_object_from_array() {
        let single: FragmentPayload =
            serde_json::from_str(r#"{"nodes": [], "relationships": []}"#).unwrap();
        assert!(single.is_single());

        let many: FragmentPayload =
            serde_json::from_str(r#"[{"nodes": []}, {"nodes": []}]"#).unwrap();
        assert!(!many.is_single());
        assert_eq!(many.fragments().len(), 2);
    }

    #[test]
    fn fragment_extra_fields_survive_serialization() {
        let raw = r#"{"nodes": [], "relationships": [], "source": "ch1"}"#;
        let fragment: GraphFragment = serde_json::from_str(raw).unwrap();
        assert_eq!(
            fragment.extra.get("source"),
            Some(&PropertyValue::String("ch1".to_string()))
        );
        let out = serde_json::to_string(&fragment).unwrap();
        let reparsed: GraphFragment = serde_json::from_str(&out).unwrap();
        assert_eq!(reparsed.extra, fragment.extra);
    }
}
