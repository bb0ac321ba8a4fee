//! Flat rows → ordered tree

use std::collections::{HashMap, HashSet};

use plansync_domain::{ParentRef, PlansyncError, WbsItem, WbsStatus};
use serde::Serialize;
use tracing::warn;

/// One node of the built tree.
#[derive(Debug, Clone, Serialize)]
pub struct WbsNode {
    pub item: WbsItem,
    /// Dotted position code, e.g. "1.2.3". Skip items carry none.
    pub code: Option<String>,
    /// Visual indentation level. Unlike the code, this accumulates
    /// through skip levels.
    pub depth: usize,
    /// Bottom-up completion rollup in percent.
    pub percent_complete: f64,
    pub children: Vec<WbsNode>,
}

/// Result of a build pass.
///
/// Items whose parent chain was malformed are still present (demoted to
/// roots) so data loss is never silent; the per-item errors say why.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Hierarchy {
    pub roots: Vec<WbsNode>,
    pub errors: Vec<PlansyncError>,
}

impl Hierarchy {
    /// Total number of nodes in the tree.
    pub fn len(&self) -> usize {
        fn count(nodes: &[WbsNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.roots)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Build the ordered tree from an unordered collection of cached items.
///
/// The lookup table is keyed by both identity forms: an item's parent may
/// reference either its permanent local id or its remote row id. A parent
/// reference that resolves to nothing demotes the item to a root rather
/// than discarding it. Items participating in a reference cycle are
/// demoted the same way and reported with `CycleDetected`.
pub fn build_tree(items: Vec<WbsItem>) -> Hierarchy {
    let mut by_key: HashMap<String, usize> = HashMap::new();
    let mut by_remote: HashMap<i64, usize> = HashMap::new();

    for (idx, item) in items.iter().enumerate() {
        if let Some(key) = item.local_key() {
            by_key.insert(key.to_string(), idx);
        }
        if let Some(row_id) = item.remote_row_id {
            by_remote.insert(row_id, idx);
        }
    }

    // Resolve every parent reference up front.
    let mut parent_of: Vec<Option<usize>> = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for item in &items {
        let resolved = item.parent.as_ref().and_then(|parent| match parent {
            ParentRef::Permanent(id) => by_key.get(id.as_str()).copied(),
            ParentRef::Remote(row_id) => by_remote.get(row_id).copied(),
        });
        if item.parent.is_some() && resolved.is_none() {
            warn!(
                item = item.name.as_str(),
                "parent reference resolves to nothing, demoting to root"
            );
        }
        parent_of.push(resolved);
    }

    // Cycle guard: walk each parent chain with a visited set; a revisit
    // means the chain never reaches a root. The offending item is cut
    // loose so the rest of the tree still renders.
    for idx in 0..items.len() {
        let mut seen = HashSet::new();
        let mut cursor = Some(idx);
        while let Some(current) = cursor {
            if !seen.insert(current) {
                errors.push(PlansyncError::CycleDetected(
                    items[idx].local_key().unwrap_or(items[idx].name.as_str()).to_string(),
                ));
                parent_of[idx] = None;
                break;
            }
            cursor = parent_of[current];
        }
    }

    // Children lists in sibling order.
    let mut child_indices: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
    let mut root_indices: Vec<usize> = Vec::new();
    for (idx, parent) in parent_of.iter().enumerate() {
        match parent {
            Some(parent_idx) => child_indices[*parent_idx].push(idx),
            None => root_indices.push(idx),
        }
    }
    let order_key = |indices: &mut Vec<usize>, items: &[WbsItem]| {
        indices.sort_by_key(|&i| (items[i].order_index, i));
    };
    order_key(&mut root_indices, &items);
    for indices in &mut child_indices {
        order_key(indices, &items);
    }

    // Materialize nodes out of the arena.
    let mut slots: Vec<Option<WbsItem>> = items.into_iter().map(Some).collect();
    let mut roots: Vec<WbsNode> = root_indices
        .iter()
        .map(|&idx| materialize(idx, &mut slots, &child_indices))
        .collect();

    assign_codes(&mut roots, "", 0);
    for root in &mut roots {
        rollup(root);
    }

    Hierarchy { roots, errors }
}

fn materialize(
    idx: usize,
    slots: &mut Vec<Option<WbsItem>>,
    child_indices: &[Vec<usize>],
) -> WbsNode {
    let children = child_indices[idx]
        .clone()
        .into_iter()
        .map(|child| materialize(child, slots, child_indices))
        .collect();

    // Every index appears exactly once across root and child lists, so
    // the slot is always still occupied here.
    let item = slots[idx].take().unwrap_or_default();

    WbsNode { item, code: None, depth: 0, percent_complete: 0.0, children }
}

/// Pre-order code assignment.
///
/// A counter per level restarts when entering a new parent. Skip items
/// receive no code; their children are numbered under the skip item's
/// prefix, so a header row contributes indentation but never a numbering
/// level.
fn assign_codes(nodes: &mut [WbsNode], prefix: &str, depth: usize) {
    let mut counter = 0u32;
    for node in nodes {
        node.depth = depth;
        if node.item.skip {
            node.code = None;
            assign_codes(&mut node.children, prefix, depth + 1);
        } else {
            counter += 1;
            let code = if prefix.is_empty() {
                counter.to_string()
            } else {
                format!("{prefix}.{counter}")
            };
            assign_codes(&mut node.children, &code, depth + 1);
            node.code = Some(code);
        }
    }
}

/// Bottom-up completion percentage: leaves derive from status, interior
/// nodes average their children.
fn rollup(node: &mut WbsNode) -> f64 {
    let pct = if node.children.is_empty() {
        match node.item.status {
            WbsStatus::Complete => 100.0,
            WbsStatus::InProgress => 50.0,
            _ => 0.0,
        }
    } else {
        let sum: f64 = node.children.iter_mut().map(|child| rollup(child)).sum();
        sum / node.children.len() as f64
    };
    node.percent_complete = pct;
    pct
}

#[cfg(test)]
mod tests {
    use plansync_domain::{ParentRef, WbsStatus};

    use super::*;
    use crate::hierarchy::test_fixtures::item;

    #[test]
    fn builds_nested_tree_in_sibling_order() {
        let items = vec![
            item("b", None, 1, false),
            item("a", None, 0, false),
            item("a2", Some(ParentRef::Permanent("a".into())), 1, false),
            item("a1", Some(ParentRef::Permanent("a".into())), 0, false),
        ];

        let tree = build_tree(items);

        assert!(tree.errors.is_empty());
        assert_eq!(tree.roots.len(), 2);
        assert_eq!(tree.roots[0].item.name, "a");
        assert_eq!(tree.roots[1].item.name, "b");
        let children: Vec<_> =
            tree.roots[0].children.iter().map(|n| n.item.name.as_str()).collect();
        assert_eq!(children, vec!["a1", "a2"]);
    }

    #[test]
    fn codes_follow_preorder_counters() {
        let items = vec![
            item("a", None, 0, false),
            item("a1", Some(ParentRef::Permanent("a".into())), 0, false),
            item("a2", Some(ParentRef::Permanent("a".into())), 1, false),
            item("b", None, 1, false),
        ];

        let tree = build_tree(items);

        assert_eq!(tree.roots[0].code.as_deref(), Some("1"));
        assert_eq!(tree.roots[0].children[0].code.as_deref(), Some("1.1"));
        assert_eq!(tree.roots[0].children[1].code.as_deref(), Some("1.2"));
        assert_eq!(tree.roots[1].code.as_deref(), Some("2"));
    }

    #[test]
    fn skip_items_never_contribute_a_numbering_level() {
        // A(skip) → [B, C]: B gets "1" and C gets "2", not "1.1"/"1.2".
        let items = vec![
            item("A", None, 0, true),
            item("B", Some(ParentRef::Permanent("A".into())), 0, false),
            item("C", Some(ParentRef::Permanent("A".into())), 1, false),
        ];

        let tree = build_tree(items);

        let header = &tree.roots[0];
        assert_eq!(header.code, None);
        assert_eq!(header.depth, 0);
        assert_eq!(header.children[0].code.as_deref(), Some("1"));
        assert_eq!(header.children[1].code.as_deref(), Some("2"));
        // Indentation still accumulates under the header.
        assert_eq!(header.children[0].depth, 1);
    }

    #[test]
    fn nested_skip_accumulates_depth_but_not_code() {
        let items = vec![
            item("H1", None, 0, true),
            item("H2", Some(ParentRef::Permanent("H1".into())), 0, true),
            item("T", Some(ParentRef::Permanent("H2".into())), 0, false),
        ];

        let tree = build_tree(items);

        let t = &tree.roots[0].children[0].children[0];
        assert_eq!(t.code.as_deref(), Some("1"));
        assert_eq!(t.depth, 2);
    }

    #[test]
    fn unresolvable_parent_demotes_to_root() {
        let items =
            vec![item("orphan", Some(ParentRef::Permanent("deleted-parent".into())), 0, false)];

        let tree = build_tree(items);

        // Data loss is never silent: the item survives as a root.
        assert_eq!(tree.roots.len(), 1);
        assert_eq!(tree.roots[0].item.name, "orphan");
        assert!(tree.errors.is_empty());
    }

    #[test]
    fn remote_row_id_is_a_valid_parent_key() {
        let mut parent = item("parent", None, 0, false);
        parent.remote_row_id = Some(900);
        let child = item("child", Some(ParentRef::Remote(900)), 0, false);

        let tree = build_tree(vec![parent, child]);

        assert_eq!(tree.roots.len(), 1);
        assert_eq!(tree.roots[0].children[0].item.name, "child");
    }

    #[test]
    fn cycles_fail_loudly_instead_of_hanging() {
        let items = vec![
            item("x", Some(ParentRef::Permanent("y".into())), 0, false),
            item("y", Some(ParentRef::Permanent("x".into())), 0, false),
        ];

        let tree = build_tree(items);

        assert!(tree
            .errors
            .iter()
            .any(|e| matches!(e, PlansyncError::CycleDetected(_))));
        // Both members are cut loose and still render.
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn completion_rolls_up_from_leaves() {
        let mut done = item("done", Some(ParentRef::Permanent("root".into())), 0, false);
        done.status = WbsStatus::Complete;
        let mut half = item("half", Some(ParentRef::Permanent("root".into())), 1, false);
        half.status = WbsStatus::InProgress;

        let tree = build_tree(vec![item("root", None, 0, false), done, half]);

        assert!((tree.roots[0].percent_complete - 75.0).abs() < f64::EPSILON);
    }
}
