//! Shared test helpers for `plansync-core` integration tests.
//!
//! In-memory implementations of the persistence and remote-service ports
//! so the reconciliation, provisioning, and polling tests can focus on
//! behaviour instead of boilerplate.
//!
//! Each integration test binary compiles this module independently and
//! uses a different subset of it.
#![allow(dead_code)]

pub mod repositories;
pub mod sheets;

use plansync_domain::{ParentRef, Project, WbsItem, Workspace};

/// Cached item with a permanent id and optional remote linkage.
pub fn cached_item(
    id: &str,
    remote_row_id: Option<i64>,
    parent: Option<ParentRef>,
    order_index: i64,
    name: &str,
) -> WbsItem {
    WbsItem {
        id: Some(id.to_string()),
        remote_row_id,
        project_id: "p1".to_string(),
        parent,
        name: name.to_string(),
        order_index,
        ..WbsItem::default()
    }
}

/// Freshly edited item that only carries a UI-minted temporary id.
pub fn temp_item(temp_id: &str, parent: Option<ParentRef>, order_index: i64, name: &str) -> WbsItem {
    WbsItem {
        temp_id: Some(temp_id.to_string()),
        project_id: "p1".to_string(),
        parent,
        name: name.to_string(),
        order_index,
        ..WbsItem::default()
    }
}

/// Project fixture; `sheet_id` being set marks it provisioned.
pub fn project(id: &str, approval: &str, sheet_id: Option<i64>) -> Project {
    let now = chrono::Utc::now();
    Project {
        id: id.to_string(),
        business_code: format!("PRJ-{id}"),
        title: format!("Project {id}"),
        approval_status: approval.to_string(),
        portfolio_row_id: Some(500),
        workspace: sheet_id.map(|sheet_id| Workspace {
            folder_id: 70,
            sheet_id,
            remote_url: format!("https://sheets.example.com/s/{sheet_id}"),
            internal_url: format!("http://localhost:8080/projects/{id}"),
        }),
        last_synced_at: None,
        created_at: now,
        updated_at: now,
    }
}
