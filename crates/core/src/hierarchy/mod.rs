//! Hierarchy reconciliation engine
//!
//! Converts between the flat row collection the cache (and the remote
//! service) speak and the ordered tree the rest of the system works on.
//! Position codes, depth, and completion rollups are derived here on
//! every read and never persisted.

mod builder;
mod flattener;

pub use builder::{build_tree, Hierarchy, WbsNode};
pub use flattener::flatten_tree;

#[cfg(test)]
pub(crate) mod test_fixtures {
    use plansync_domain::{ParentRef, WbsItem};

    /// Minimal item keyed by a readable permanent id.
    pub fn item(key: &str, parent: Option<ParentRef>, order_index: i64, skip: bool) -> WbsItem {
        WbsItem {
            id: Some(key.to_string()),
            project_id: "p1".to_string(),
            parent,
            name: key.to_string(),
            skip,
            order_index,
            ..WbsItem::default()
        }
    }
}
