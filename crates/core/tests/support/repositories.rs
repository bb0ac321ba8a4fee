//! In-memory port implementations for persistence and auditing

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use plansync_core::{AuditLog, ProjectRepository, WbsRepository};
use plansync_domain::{AuditEntry, PlansyncError, Project, Result, WbsItem};

/// In-memory `WbsRepository`.
#[derive(Default, Clone)]
pub struct MemoryWbsRepository {
    items: Arc<Mutex<HashMap<String, WbsItem>>>,
}

impl MemoryWbsRepository {
    pub fn with_items(items: Vec<WbsItem>) -> Self {
        let repo = Self::default();
        {
            let mut store = repo.items.lock();
            for item in items {
                if let Some(id) = item.id.clone() {
                    store.insert(id, item);
                }
            }
        }
        repo
    }

    pub fn snapshot(&self) -> Vec<WbsItem> {
        let mut items: Vec<WbsItem> = self.items.lock().values().cloned().collect();
        items.sort_by_key(|item| item.order_index);
        items
    }

    pub fn get(&self, id: &str) -> Option<WbsItem> {
        self.items.lock().get(id).cloned()
    }
}

#[async_trait]
impl WbsRepository for MemoryWbsRepository {
    async fn get_items(&self, project_id: &str) -> Result<Vec<WbsItem>> {
        let mut items: Vec<WbsItem> = self
            .items
            .lock()
            .values()
            .filter(|item| item.project_id == project_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.order_index);
        Ok(items)
    }

    async fn insert_item(&self, item: &WbsItem) -> Result<()> {
        let id = item
            .id
            .clone()
            .ok_or_else(|| PlansyncError::Validation("insert without permanent id".into()))?;
        let mut store = self.items.lock();
        if store.contains_key(&id) {
            return Err(PlansyncError::Database(format!("duplicate item id {id}")));
        }
        if let Some(row_id) = item.remote_row_id {
            if store.values().any(|existing| existing.remote_row_id == Some(row_id)) {
                return Err(PlansyncError::Database(format!("duplicate remote row id {row_id}")));
            }
        }
        store.insert(id, item.clone());
        Ok(())
    }

    async fn update_item(&self, item: &WbsItem) -> Result<()> {
        let id = item
            .id
            .clone()
            .ok_or_else(|| PlansyncError::Validation("update without permanent id".into()))?;
        let mut store = self.items.lock();
        if !store.contains_key(&id) {
            return Err(PlansyncError::NotFound(format!("item {id}")));
        }
        store.insert(id, item.clone());
        Ok(())
    }

    async fn delete_item(&self, id: &str) -> Result<()> {
        self.items.lock().remove(id);
        Ok(())
    }

    async fn find_by_remote_row(&self, remote_row_id: i64) -> Result<Option<WbsItem>> {
        Ok(self
            .items
            .lock()
            .values()
            .find(|item| item.remote_row_id == Some(remote_row_id))
            .cloned())
    }

    async fn clear_project(&self, project_id: &str) -> Result<usize> {
        let mut store = self.items.lock();
        let before = store.len();
        store.retain(|_, item| item.project_id != project_id);
        Ok(before - store.len())
    }
}

/// In-memory `ProjectRepository`.
#[derive(Default, Clone)]
pub struct MemoryProjectRepository {
    projects: Arc<Mutex<HashMap<String, Project>>>,
}

impl MemoryProjectRepository {
    pub fn with_projects(projects: Vec<Project>) -> Self {
        let repo = Self::default();
        {
            let mut store = repo.projects.lock();
            for project in projects {
                store.insert(project.id.clone(), project);
            }
        }
        repo
    }

    pub fn get(&self, id: &str) -> Option<Project> {
        self.projects.lock().get(id).cloned()
    }

    pub fn all(&self) -> Vec<Project> {
        self.projects.lock().values().cloned().collect()
    }
}

#[async_trait]
impl ProjectRepository for MemoryProjectRepository {
    async fn get_project(&self, id: &str) -> Result<Option<Project>> {
        Ok(self.projects.lock().get(id).cloned())
    }

    async fn find_by_business_code(&self, business_code: &str) -> Result<Option<Project>> {
        Ok(self
            .projects
            .lock()
            .values()
            .find(|project| project.business_code == business_code)
            .cloned())
    }

    async fn insert_project(&self, project: &Project) -> Result<()> {
        let mut store = self.projects.lock();
        if store.values().any(|existing| existing.business_code == project.business_code) {
            return Err(PlansyncError::Database(format!(
                "duplicate business code {}",
                project.business_code
            )));
        }
        store.insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn update_project(&self, project: &Project) -> Result<()> {
        let mut store = self.projects.lock();
        if !store.contains_key(&project.id) {
            return Err(PlansyncError::NotFound(format!("project {}", project.id)));
        }
        store.insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.projects.lock().values().cloned().collect())
    }
}

/// In-memory append-only audit sink.
#[derive(Default, Clone)]
pub struct MemoryAuditLog {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditLog {
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let entries = self.entries.lock();
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }
}
