//! Core graph data structures

mod fragment;
mod identity;

pub use fragment::{
    FragmentNode, FragmentPayload, FragmentRelationship, GraphFragment, LocalId, Properties,
    PropertyValue,
};
pub use identity::resolve_stable_id;
