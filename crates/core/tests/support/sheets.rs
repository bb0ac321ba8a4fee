//! Scriptable in-memory `SheetService`
//!
//! Records every call so tests can assert call counts and creation
//! order, and supports per-operation failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use plansync_core::SheetService;
use plansync_domain::constants::{PORTFOLIO_COLUMNS, WBS_COLUMNS};
use plansync_domain::{
    Cell, Column, Folder, FolderEntry, NewRow, PlansyncError, Result, RowPosition, RowUpdate,
    Sheet, SheetRow, WebhookSubscription,
};

/// Column set with ids assigned in listing order, starting at 1.
pub fn columns_for(titles: &[&str]) -> Vec<Column> {
    titles
        .iter()
        .enumerate()
        .map(|(idx, title)| Column { id: idx as i64 + 1, title: (*title).to_string() })
        .collect()
}

pub fn wbs_columns() -> Vec<Column> {
    columns_for(WBS_COLUMNS)
}

pub fn portfolio_columns() -> Vec<Column> {
    columns_for(PORTFOLIO_COLUMNS)
}

pub fn sheet(id: i64, name: &str, columns: Vec<Column>, rows: Vec<SheetRow>) -> Sheet {
    Sheet {
        id,
        name: name.to_string(),
        permalink: Some(format!("https://sheets.example.com/s/{id}")),
        columns,
        rows,
    }
}

pub fn text_row(id: i64, parent_id: Option<i64>, cells: Vec<Cell>) -> SheetRow {
    SheetRow { id, parent_id, locked: None, cells, modified_at: None }
}

#[derive(Debug, Clone)]
pub struct RecordedAdd {
    pub sheet_id: i64,
    pub position: RowPosition,
    pub cells: Vec<Cell>,
    pub assigned_id: i64,
}

#[derive(Default)]
struct State {
    sheets: HashMap<i64, Sheet>,
    folders: HashMap<i64, Folder>,
    webhooks: Vec<WebhookSubscription>,
    calls: Vec<String>,
    added: Vec<RecordedAdd>,
    updates: Vec<(i64, Vec<RowUpdate>)>,
    deletes: Vec<(i64, Vec<i64>)>,
    fail_ops: HashMap<String, PlansyncError>,
    fail_add_row_named: Option<String>,
}

/// In-memory fake of the remote spreadsheet service.
#[derive(Clone, Default)]
pub struct MockSheetService {
    state: Arc<Mutex<State>>,
    next_id: Arc<AtomicI64>,
}

impl MockSheetService {
    pub fn new() -> Self {
        Self { state: Arc::default(), next_id: Arc::new(AtomicI64::new(1000)) }
    }

    pub fn insert_sheet(&self, sheet: Sheet) {
        self.state.lock().sheets.insert(sheet.id, sheet);
    }

    pub fn insert_folder(&self, folder: Folder) {
        self.state.lock().folders.insert(folder.id, folder);
    }

    pub fn sheet_snapshot(&self, sheet_id: i64) -> Option<Sheet> {
        self.state.lock().sheets.get(&sheet_id).cloned()
    }

    pub fn folder_snapshot(&self, folder_id: i64) -> Option<Folder> {
        self.state.lock().folders.get(&folder_id).cloned()
    }

    /// Fail every call of the named operation with the given error.
    pub fn fail_op(&self, op: &str, error: PlansyncError) {
        self.state.lock().fail_ops.insert(op.to_string(), error);
    }

    /// Fail `add_row` calls whose name cell carries this value.
    pub fn fail_add_row_named(&self, name: &str) {
        self.state.lock().fail_add_row_named = Some(name.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| c.as_str() == op).count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.len()
    }

    pub fn added_rows(&self) -> Vec<RecordedAdd> {
        self.state.lock().added.clone()
    }

    pub fn updates(&self) -> Vec<(i64, Vec<RowUpdate>)> {
        self.state.lock().updates.clone()
    }

    pub fn deletes(&self) -> Vec<(i64, Vec<i64>)> {
        self.state.lock().deletes.clone()
    }

    fn next(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn enter(&self, op: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(op.to_string());
        if let Some(err) = state.fail_ops.get(op) {
            return Err(err.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl SheetService for MockSheetService {
    async fn get_sheet(&self, sheet_id: i64) -> Result<Sheet> {
        self.enter("get_sheet")?;
        self.state
            .lock()
            .sheets
            .get(&sheet_id)
            .cloned()
            .ok_or_else(|| PlansyncError::NotFound(format!("sheet {sheet_id}")))
    }

    async fn add_row(&self, sheet_id: i64, row: NewRow) -> Result<SheetRow> {
        self.enter("add_row")?;
        let mut state = self.state.lock();

        if let Some(name) = state.fail_add_row_named.clone() {
            let hit = row.cells.iter().any(|cell| cell.as_str() == Some(name.as_str()));
            if hit {
                return Err(PlansyncError::Network(format!("injected failure for '{name}'")));
            }
        }

        let assigned_id = self.next();
        let sheet = state
            .sheets
            .get_mut(&sheet_id)
            .ok_or_else(|| PlansyncError::NotFound(format!("sheet {sheet_id}")))?;

        let parent_id = match &row.position {
            RowPosition::Top => None,
            RowPosition::FirstChildOf { parent_row_id } => Some(*parent_row_id),
            RowPosition::After { sibling_row_id } => sheet
                .rows
                .iter()
                .find(|r| r.id == *sibling_row_id)
                .and_then(|sibling| sibling.parent_id),
        };

        let created = SheetRow {
            id: assigned_id,
            parent_id,
            locked: None,
            cells: row.cells.clone(),
            modified_at: Some(chrono::Utc::now()),
        };
        sheet.rows.push(created.clone());
        state.added.push(RecordedAdd {
            sheet_id,
            position: row.position.clone(),
            cells: row.cells,
            assigned_id,
        });
        Ok(created)
    }

    async fn update_rows(&self, sheet_id: i64, updates: Vec<RowUpdate>) -> Result<()> {
        self.enter("update_rows")?;
        let mut state = self.state.lock();
        state.updates.push((sheet_id, updates.clone()));
        let sheet = state
            .sheets
            .get_mut(&sheet_id)
            .ok_or_else(|| PlansyncError::NotFound(format!("sheet {sheet_id}")))?;
        for update in updates {
            let Some(row) = sheet.rows.iter_mut().find(|row| row.id == update.row_id) else {
                return Err(PlansyncError::NotFound(format!("row {}", update.row_id)));
            };
            for cell in update.cells {
                match row.cells.iter_mut().find(|c| c.column_id == cell.column_id) {
                    Some(existing) => *existing = cell,
                    None => row.cells.push(cell),
                }
            }
        }
        Ok(())
    }

    async fn delete_rows(&self, sheet_id: i64, row_ids: Vec<i64>) -> Result<()> {
        self.enter("delete_rows")?;
        let mut state = self.state.lock();
        state.deletes.push((sheet_id, row_ids.clone()));
        let sheet = state
            .sheets
            .get_mut(&sheet_id)
            .ok_or_else(|| PlansyncError::NotFound(format!("sheet {sheet_id}")))?;
        sheet.rows.retain(|row| !row_ids.contains(&row.id));
        Ok(())
    }

    async fn create_folder(&self, parent_folder_id: i64, name: &str) -> Result<FolderEntry> {
        self.enter("create_folder")?;
        let id = self.next();
        let mut state = self.state.lock();
        let entry = FolderEntry { id, name: name.to_string(), permalink: None };
        let parent = state
            .folders
            .get_mut(&parent_folder_id)
            .ok_or_else(|| PlansyncError::NotFound(format!("folder {parent_folder_id}")))?;
        parent.folders.push(entry.clone());
        state.folders.insert(
            id,
            Folder {
                id,
                name: name.to_string(),
                sheets: Vec::new(),
                folders: Vec::new(),
                reports: Vec::new(),
                dashboards: Vec::new(),
            },
        );
        Ok(entry)
    }

    async fn copy_sheet(
        &self,
        sheet_id: i64,
        new_name: &str,
        dest_folder_id: i64,
    ) -> Result<FolderEntry> {
        self.enter("copy_sheet")?;
        let id = self.next();
        let mut state = self.state.lock();
        let source = state
            .sheets
            .get(&sheet_id)
            .cloned()
            .ok_or_else(|| PlansyncError::NotFound(format!("sheet {sheet_id}")))?;
        let permalink = format!("https://sheets.example.com/s/{id}");
        let copy = Sheet {
            id,
            name: new_name.to_string(),
            permalink: Some(permalink.clone()),
            columns: source.columns,
            rows: source.rows,
        };
        state.sheets.insert(id, copy);
        let entry =
            FolderEntry { id, name: new_name.to_string(), permalink: Some(permalink) };
        let dest = state
            .folders
            .get_mut(&dest_folder_id)
            .ok_or_else(|| PlansyncError::NotFound(format!("folder {dest_folder_id}")))?;
        dest.sheets.push(entry.clone());
        Ok(entry)
    }

    async fn copy_report(
        &self,
        _report_id: i64,
        new_name: &str,
        dest_folder_id: i64,
    ) -> Result<FolderEntry> {
        self.enter("copy_report")?;
        let id = self.next();
        let mut state = self.state.lock();
        let entry = FolderEntry { id, name: new_name.to_string(), permalink: None };
        let dest = state
            .folders
            .get_mut(&dest_folder_id)
            .ok_or_else(|| PlansyncError::NotFound(format!("folder {dest_folder_id}")))?;
        dest.reports.push(entry.clone());
        Ok(entry)
    }

    async fn copy_dashboard(
        &self,
        _dashboard_id: i64,
        new_name: &str,
        dest_folder_id: i64,
    ) -> Result<FolderEntry> {
        self.enter("copy_dashboard")?;
        let id = self.next();
        let mut state = self.state.lock();
        let entry = FolderEntry { id, name: new_name.to_string(), permalink: None };
        let dest = state
            .folders
            .get_mut(&dest_folder_id)
            .ok_or_else(|| PlansyncError::NotFound(format!("folder {dest_folder_id}")))?;
        dest.dashboards.push(entry.clone());
        Ok(entry)
    }

    async fn get_folder(&self, folder_id: i64) -> Result<Folder> {
        self.enter("get_folder")?;
        self.state
            .lock()
            .folders
            .get(&folder_id)
            .cloned()
            .ok_or_else(|| PlansyncError::NotFound(format!("folder {folder_id}")))
    }

    async fn create_webhook(
        &self,
        _sheet_id: i64,
        name: &str,
        callback_url: &str,
    ) -> Result<WebhookSubscription> {
        self.enter("create_webhook")?;
        let hook = WebhookSubscription {
            id: self.next(),
            name: name.to_string(),
            callback_url: callback_url.to_string(),
            enabled: true,
        };
        self.state.lock().webhooks.push(hook.clone());
        Ok(hook)
    }

    async fn delete_webhook(&self, webhook_id: i64) -> Result<()> {
        self.enter("delete_webhook")?;
        self.state.lock().webhooks.retain(|hook| hook.id != webhook_id);
        Ok(())
    }

    async fn list_webhooks(&self) -> Result<Vec<WebhookSubscription>> {
        self.enter("list_webhooks")?;
        Ok(self.state.lock().webhooks.clone())
    }
}
