//! Port interfaces for cache persistence and auditing

use async_trait::async_trait;
use plansync_domain::{AuditEntry, Project, Result, WbsItem};

/// Cache persistence for breakdown-structure items.
#[async_trait]
pub trait WbsRepository: Send + Sync {
    /// All cached items for a project.
    async fn get_items(&self, project_id: &str) -> Result<Vec<WbsItem>>;

    /// Insert a newly persisted item (permanent id already assigned).
    async fn insert_item(&self, item: &WbsItem) -> Result<()>;

    /// Update an existing item by permanent id.
    async fn update_item(&self, item: &WbsItem) -> Result<()>;

    /// Delete an item by permanent id.
    async fn delete_item(&self, id: &str) -> Result<()>;

    /// Find the item linked to a remote row, if any.
    async fn find_by_remote_row(&self, remote_row_id: i64) -> Result<Option<WbsItem>>;

    /// Drop every cached item for a project; returns the count removed.
    async fn clear_project(&self, project_id: &str) -> Result<usize>;
}

/// Persistence for portfolio projects.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn get_project(&self, id: &str) -> Result<Option<Project>>;

    async fn find_by_business_code(&self, business_code: &str) -> Result<Option<Project>>;

    async fn insert_project(&self, project: &Project) -> Result<()>;

    async fn update_project(&self, project: &Project) -> Result<()>;

    async fn list_projects(&self) -> Result<Vec<Project>>;
}

/// Append-only audit sink, written alongside every mutating operation.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<()>;

    /// Most recent entries, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>>;
}
