//! Ordered tree → flat list
//!
//! The inverse of the builder: a pre-order traversal producing the flat
//! sequence the cache and the remote patch builder consume. The remote
//! system's row order is a single flat sequence, so the emitted order
//! index is global across the whole tree, not per level.

use plansync_domain::{ParentRef, WbsItem};

use super::{Hierarchy, WbsNode};

/// Flatten a tree into cache/patch order.
///
/// Each emitted item carries a fresh global order index and a resolved
/// parent reference. The remote row id is preferred when the parent
/// already has one, so a newly created child links to an already
/// materialized parent; otherwise the parent's local (possibly still
/// temporary) id passes through for later resolution.
pub fn flatten_tree(hierarchy: &Hierarchy) -> Vec<WbsItem> {
    let mut flat = Vec::with_capacity(hierarchy.len());
    let mut sequence = 0i64;
    for root in &hierarchy.roots {
        emit(root, None, &mut flat, &mut sequence);
    }
    flat
}

fn emit(node: &WbsNode, parent: Option<&WbsItem>, flat: &mut Vec<WbsItem>, sequence: &mut i64) {
    let mut item = node.item.clone();
    item.order_index = *sequence;
    *sequence += 1;
    item.parent = parent.map(resolve_parent_ref);
    flat.push(item);

    let parent_item = &node.item;
    for child in &node.children {
        emit(child, Some(parent_item), flat, sequence);
    }
}

fn resolve_parent_ref(parent: &WbsItem) -> ParentRef {
    match parent.remote_row_id {
        Some(row_id) => ParentRef::Remote(row_id),
        None => ParentRef::Permanent(parent.local_key().unwrap_or_default().to_string()),
    }
}
