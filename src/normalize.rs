//! Fragment normalization — local ids to stable identity
//!
//! Rewrites every fragment-scoped node id to its deterministic stable id
//! and rewires relationship endpoints to match. Each fragment gets a
//! fresh local→stable mapping; nothing leaks between fragments, even
//! within the same row.

use crate::graph::{resolve_stable_id, GraphFragment, LocalId};
use std::collections::HashMap;

/// The result of normalizing a batch of fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutcome {
    pub fragments: Vec<GraphFragment>,
    /// Relationship endpoints whose local id was not found in the same
    /// fragment's node set. They pass through unchanged, but the count
    /// is surfaced so cross-fragment references don't vanish silently.
    pub unresolved_endpoints: usize,
}

/// Normalize fragments independently, preserving count and order.
///
/// Per fragment:
/// 1. every node's id becomes the stable UUID string for its
///    `(label, name)` — or `(label, local_id)` when unnamed;
/// 2. unnamed nodes get the display name `"{label}_{local_id}"`
///    (bare label when there was no local id either);
/// 3. relationship endpoints found in the fragment's node set are
///    rewritten to the matching stable id, others pass through.
pub fn normalize_fragments(fragments: Vec<GraphFragment>) -> NormalizeOutcome {
    let mut unresolved_endpoints = 0;
    let fragments = fragments
        .into_iter()
        .map(|fragment| normalize_fragment(fragment, &mut unresolved_endpoints))
        .collect();
    NormalizeOutcome {
        fragments,
        unresolved_endpoints,
    }
}

fn normalize_fragment(mut fragment: GraphFragment, unresolved: &mut usize) -> GraphFragment {
    let mut mapping: HashMap<LocalId, LocalId> = HashMap::new();

    for node in &mut fragment.nodes {
        let stable = resolve_stable_id(&node.label, node.name.as_deref(), node.id.as_ref());
        let stable = LocalId::Text(stable.to_string());
        let old = node.id.replace(stable.clone());

        let unnamed = node.name.as_deref().map_or(true, str::is_empty);
        match old {
            Some(old) => {
                if unnamed {
                    node.name = Some(format!("{}_{}", node.label, old));
                }
                mapping.insert(old, stable);
            }
            None => {
                if unnamed {
                    node.name = Some(node.label.clone());
                }
            }
        }
    }

    for rel in &mut fragment.relationships {
        for endpoint in [&mut rel.start_id, &mut rel.end_id] {
            if let Some(id) = endpoint {
                match mapping.get(id) {
                    Some(stable) => *id = stable.clone(),
                    None => *unresolved += 1,
                }
            }
        }
    }

    fragment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FragmentNode, FragmentRelationship};

    fn single(fragment: GraphFragment) -> GraphFragment {
        let outcome = normalize_fragments(vec![fragment]);
        assert_eq!(outcome.fragments.len(), 1);
        outcome.fragments.into_iter().next().unwrap()
    }

    fn uuid_of(id: &Option<LocalId>) -> String {
        match id {
            Some(LocalId::Text(s)) => {
                uuid::Uuid::parse_str(s).expect("id should be a UUID string");
                s.clone()
            }
            other => panic!("expected stable id, got {:?}", other),
        }
    }

    #[test]
    fn node_id_becomes_uuid_string() {
        let fragment = GraphFragment {
            nodes: vec![FragmentNode::new(1, "Actor").with_name("Tom")],
            ..Default::default()
        };
        let out = single(fragment);
        let id = uuid_of(&out.nodes[0].id);
        assert_ne!(id, "1");
    }

    #[test]
    fn same_label_and_name_dedup_across_fragments() {
        let a = GraphFragment {
            nodes: vec![FragmentNode::new(1, "Actor").with_name("Tom")],
            ..Default::default()
        };
        let b = GraphFragment {
            nodes: vec![FragmentNode::new(9, "Actor").with_name("Tom")],
            ..Default::default()
        };
        let outcome = normalize_fragments(vec![a, b]);
        assert_eq!(
            outcome.fragments[0].nodes[0].id,
            outcome.fragments[1].nodes[0].id
        );
    }

    #[test]
    fn relationship_endpoints_are_rewired() {
        let fragment = GraphFragment {
            nodes: vec![
                FragmentNode::new(1, "Actor").with_name("Tom"),
                FragmentNode::new(2, "Actor").with_name("Huck"),
            ],
            relationships: vec![FragmentRelationship::new(1, 2, "KNOWS")],
            ..Default::default()
        };
        let out = single(fragment);
        assert_eq!(out.relationships[0].start_id, out.nodes[0].id);
        assert_eq!(out.relationships[0].end_id, out.nodes[1].id);
    }

    #[test]
    fn self_loop_rewires_both_endpoints_to_same_id() {
        let fragment = GraphFragment {
            nodes: vec![FragmentNode::new(1, "Actor").with_name("Tom")],
            relationships: vec![FragmentRelationship::new(1, 1, "KNOWS")],
            ..Default::default()
        };
        let out = single(fragment);
        let id = out.nodes[0].id.clone();
        assert_eq!(out.relationships[0].start_id, id);
        assert_eq!(out.relationships[0].end_id, id);
    }

    #[test]
    fn unmapped_endpoint_passes_through_and_is_counted() {
        let fragment = GraphFragment {
            nodes: vec![FragmentNode::new(1, "Actor").with_name("Tom")],
            relationships: vec![FragmentRelationship::new(1, 99, "KNOWS")],
            ..Default::default()
        };
        let outcome = normalize_fragments(vec![fragment]);
        assert_eq!(outcome.unresolved_endpoints, 1);
        let rel = &outcome.fragments[0].relationships[0];
        assert_eq!(rel.end_id, Some(LocalId::Int(99)));
        // The mapped endpoint was still rewritten.
        assert_eq!(rel.start_id, outcome.fragments[0].nodes[0].id);
    }

    #[test]
    fn mapping_does_not_leak_between_fragments() {
        // Fragment B's relationship references local id 1, which only
        // fragment A defines. It must stay unresolved.
        let a = GraphFragment {
            nodes: vec![FragmentNode::new(1, "Actor").with_name("Tom")],
            ..Default::default()
        };
        let b = GraphFragment {
            relationships: vec![FragmentRelationship::new(1, 1, "KNOWS")],
            ..Default::default()
        };
        let outcome = normalize_fragments(vec![a, b]);
        assert_eq!(outcome.unresolved_endpoints, 2);
        assert_eq!(
            outcome.fragments[1].relationships[0].start_id,
            Some(LocalId::Int(1))
        );
    }

    #[test]
    fn unnamed_node_gets_synthesized_display_name() {
        let fragment = GraphFragment {
            nodes: vec![FragmentNode::new(5, "Location")],
            ..Default::default()
        };
        let out = single(fragment);
        assert_eq!(out.nodes[0].name.as_deref(), Some("Location_5"));
    }

    #[test]
    fn unnamed_idless_node_gets_label_as_display_name() {
        let fragment = GraphFragment {
            nodes: vec![FragmentNode {
                id: None,
                label: "Intangible".to_string(),
                name: None,
                extra: Default::default(),
            }],
            ..Default::default()
        };
        let out = single(fragment);
        assert_eq!(out.nodes[0].name.as_deref(), Some("Intangible"));
        uuid_of(&out.nodes[0].id);
    }

    #[test]
    fn order_and_count_are_preserved() {
        let fragments: Vec<GraphFragment> = (0..4)
            .map(|i| GraphFragment {
                nodes: vec![FragmentNode::new(i, "Actor").with_name(format!("n{}", i))],
                ..Default::default()
            })
            .collect();
        let outcome = normalize_fragments(fragments);
        assert_eq!(outcome.fragments.len(), 4);
        for (i, fragment) in outcome.fragments.iter().enumerate() {
            assert_eq!(fragment.nodes[0].name.as_deref(), Some(&*format!("n{}", i)));
        }
    }

    #[test]
    fn fragment_extras_carry_through() {
        let mut fragment = GraphFragment::default();
        fragment.extra.insert(
            "metadata".to_string(),
            crate::graph::PropertyValue::String("chapter one".to_string()),
        );
        let out = single(fragment);
        assert_eq!(
            out.extra.get("metadata"),
            Some(&crate::graph::PropertyValue::String(
                "chapter one".to_string()
            ))
        );
    }
}
