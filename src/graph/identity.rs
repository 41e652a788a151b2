//! Deterministic identity for extracted entities
//!
//! Per-chunk extraction assigns small integer ids that collide across
//! chunks. Merging the chunks into one graph needs identity derived from
//! what the entity *is*, not where it was seen: two mentions of
//! `(Actor, "Tom")` in different chunks must resolve to the same id.
//!
//! Identity is a name-based UUID (version 5) over a composite key in the
//! DNS namespace. No state, no randomness — the same input yields the
//! same id across runs and processes.

use super::fragment::LocalId;
use uuid::Uuid;

/// Resolve the stable identifier for an entity.
///
/// Key construction, in priority order:
/// 1. non-empty `name`  → `"{label}:{name}"`
/// 2. `local_id` present → `"{label}:node_{local_id}"`
/// 3. neither            → `"{label}:unnamed"`
///
/// The last case intentionally collapses all unnamed, id-less nodes of a
/// label into one entity.
pub fn resolve_stable_id(label: &str, name: Option<&str>, local_id: Option<&LocalId>) -> Uuid {
    let key = match name {
        Some(name) if !name.is_empty() => format!("{}:{}", label, name),
        _ => match local_id {
            Some(id) => format!("{}:node_{}", label, id),
            None => format!("{}:unnamed", label),
        },
    };
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, key.as_bytes())
}
