//! Reconciliation service
//!
//! Produces the minimal set of remote operations that make the external
//! sheet match the locally edited tree, and persists the cache to match
//! the merged result. Updates batch; creates are issued one row at a
//! time in tree order, because each created row's identity positions the
//! next one.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use plansync_domain::constants::{
    COL_ACTUAL, COL_APPROVER, COL_BUDGET, COL_DESCRIPTION, COL_END_DATE, COL_NAME, COL_NOTES,
    COL_OWNER, COL_START_DATE, COL_STATUS, COL_VARIANCE, WBS_COLUMNS,
};
use plansync_domain::{
    AuditEntry, ParentRef, PlansyncError, Result, RowPosition, RowUpdate, SheetRow, SyncReport,
    WbsItem, WbsStatus,
};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::ports::{AuditLog, ProjectRepository, WbsRepository};
use crate::hierarchy::{build_tree, Hierarchy};
use crate::sheet::ports::SheetService;
use crate::sheet::{ColumnMap, RowAccessor, RowDraft};

/// Actor recorded on audit entries for service-initiated mutations.
const SYSTEM_ACTOR: &str = "system";

pub struct Reconciler {
    wbs: Arc<dyn WbsRepository>,
    projects: Arc<dyn ProjectRepository>,
    sheets: Arc<dyn SheetService>,
    audit: Arc<dyn AuditLog>,
}

impl Reconciler {
    pub fn new(
        wbs: Arc<dyn WbsRepository>,
        projects: Arc<dyn ProjectRepository>,
        sheets: Arc<dyn SheetService>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self { wbs, projects, sheets, audit }
    }

    /// Rebuild the display tree from the cache.
    pub async fn load_tree(&self, project_id: &str) -> Result<Hierarchy> {
        let items = self.wbs.get_items(project_id).await?;
        Ok(build_tree(items))
    }

    /// Drop the project's cached items.
    pub async fn clear_cache(&self, project_id: &str) -> Result<usize> {
        let removed = self.wbs.clear_project(project_id).await?;
        self.audit_entry("wbs.cache_clear", project_id, serde_json::json!({ "removed": removed }))
            .await;
        Ok(removed)
    }

    /// Persist an edited tree and push the difference to the remote sheet.
    ///
    /// The edited list arrives in tree pre-order (the flattener's output).
    /// Per-row remote failures are collected into the report rather than
    /// aborting the pass; the caller decides whether to retry the failed
    /// items.
    #[instrument(skip(self, edited), fields(project_id = project_id, items = edited.len()))]
    pub async fn save_tree(&self, project_id: &str, edited: Vec<WbsItem>) -> Result<SyncReport> {
        for item in &edited {
            item.validate()?;
        }

        let mut project = self
            .projects
            .get_project(project_id)
            .await?
            .ok_or_else(|| PlansyncError::NotFound(format!("project {project_id}")))?;

        let cached = self.wbs.get_items(project_id).await?;
        let cached_by_id: HashMap<String, WbsItem> = cached
            .into_iter()
            .filter_map(|item| item.id.clone().map(|id| (id, item)))
            .collect();

        // Pass one: allocate permanent ids for every new item, recording
        // the temp→permanent mapping. No parent rewriting happens here.
        let mut temp_to_perm: HashMap<String, String> = HashMap::new();
        let mut items: Vec<WbsItem> = Vec::with_capacity(edited.len());
        for mut item in edited {
            item.project_id = project_id.to_string();
            if item.id.is_none() {
                let permanent = Uuid::new_v4().to_string();
                if let Some(temp) = &item.temp_id {
                    temp_to_perm.insert(temp.clone(), permanent.clone());
                }
                item.id = Some(permanent);
            }
            items.push(item);
        }

        // Pass two: any parent reference recorded against a temp id is
        // rewritten to the permanent id allocated above.
        for item in &mut items {
            if let Some(ParentRef::Permanent(parent_id)) = &item.parent {
                if let Some(permanent) = temp_to_perm.get(parent_id) {
                    item.parent = Some(ParentRef::Permanent(permanent.clone()));
                }
            }
        }

        // Cache rows absent from the edited set are deletions.
        let incoming_ids: HashSet<&str> =
            items.iter().filter_map(|item| item.id.as_deref()).collect();
        let deleted_items: Vec<&WbsItem> = cached_by_id
            .values()
            .filter(|item| item.id.as_deref().is_some_and(|id| !incoming_ids.contains(id)))
            .collect();

        let mut report = SyncReport::default();
        let mut changed_ids: HashSet<String> = HashSet::new();

        // Local persistence: insert the new, update the changed, keep any
        // remote linkage the UI round-trip dropped.
        for item in &mut items {
            let Some(id) = item.id.clone() else { continue };
            match cached_by_id.get(&id) {
                Some(previous) => {
                    item.remote_row_id = item.remote_row_id.or(previous.remote_row_id);
                    if !same_content(previous, item) {
                        self.wbs.update_item(item).await?;
                        changed_ids.insert(id);
                    }
                }
                None => {
                    self.wbs.insert_item(item).await?;
                    changed_ids.insert(id);
                }
            }
        }
        for item in &deleted_items {
            if let Some(id) = item.id.as_deref() {
                self.wbs.delete_item(id).await?;
            }
        }
        report.deleted = deleted_items.len();

        if let Some(workspace) = project.workspace.clone() {
            self.sync_remote(
                workspace.sheet_id,
                &mut items,
                &deleted_items.iter().map(|item| (*item).clone()).collect::<Vec<_>>(),
                &changed_ids,
                &mut report,
            )
            .await?;
        } else {
            // Unprovisioned project: the cache is the only destination.
            report.created = items.iter().filter(|i| changed_ids_contains_new(i, &cached_by_id)).count();
            report.updated = changed_ids.len() - report.created;
        }

        project.last_synced_at = Some(Utc::now());
        project.updated_at = Utc::now();
        self.projects.update_project(&project).await?;

        self.audit_entry(
            "wbs.save",
            project_id,
            serde_json::json!({
                "updated": report.updated,
                "created": report.created,
                "deleted": report.deleted,
                "failed": report.errors.len(),
            }),
        )
        .await;

        Ok(report)
    }

    /// Push local changes to the remote sheet.
    ///
    /// Non-skip items split into update candidates (already materialized
    /// remotely) and create candidates (no remote row yet). Updates go
    /// out as one batch; creates go out strictly one at a time in tree
    /// order, each positioned against the previous sibling's freshly
    /// returned id. Skip rows are locked/formula-bearing remotely and are
    /// never written.
    async fn sync_remote(
        &self,
        sheet_id: i64,
        items: &mut [WbsItem],
        deleted: &[WbsItem],
        changed_ids: &HashSet<String>,
        report: &mut SyncReport,
    ) -> Result<()> {
        let sheet = self.sheets.get_sheet(sheet_id).await?;
        let columns = ColumnMap::from_columns(&sheet.columns, WBS_COLUMNS)?;

        // Remote deletions first: rows removed locally disappear remotely.
        let remote_deletes: Vec<i64> =
            deleted.iter().filter_map(|item| item.remote_row_id).collect();
        if !remote_deletes.is_empty() {
            match self.sheets.delete_rows(sheet_id, remote_deletes).await {
                Ok(()) => {}
                Err(PlansyncError::NotFound(message)) => {
                    // Already gone out-of-band; the cache rows are deleted
                    // either way.
                    debug!(message = %message, "remote rows already deleted");
                }
                Err(err) => {
                    for item in deleted {
                        report.push_error(item.name.clone(), err.to_string());
                    }
                }
            }
        }

        // Batched updates for changed rows that exist remotely.
        let mut updates = Vec::new();
        let mut update_names = Vec::new();
        let mut stale_unlinked: HashSet<String> = HashSet::new();
        for item in items.iter() {
            if item.skip {
                continue;
            }
            let (Some(id), Some(row_id)) = (item.id.as_deref(), item.remote_row_id) else {
                continue;
            };
            if !changed_ids.contains(id) {
                continue;
            }
            let cells = build_patch_cells(&columns, item)?;
            updates.push(RowUpdate { row_id, cells });
            update_names.push(item.name.clone());
        }
        if !updates.is_empty() {
            match self.sheets.update_rows(sheet_id, updates).await {
                Ok(()) => report.updated = update_names.len(),
                Err(PlansyncError::NotFound(message)) => {
                    // A referenced row vanished out-of-band. Invalidate the
                    // stale linkage; the next pass recreates the rows.
                    warn!(message = %message, "stale remote reference during update, unlinking");
                    for item in items.iter_mut().filter(|item| {
                        !item.skip
                            && item.id.as_deref().is_some_and(|id| changed_ids.contains(id))
                            && item.remote_row_id.is_some()
                    }) {
                        item.remote_row_id = None;
                        self.wbs.update_item(item).await?;
                        if let Some(id) = item.id.clone() {
                            stale_unlinked.insert(id);
                        }
                    }
                    for name in &update_names {
                        report.push_error(name.clone(), "remote row no longer exists");
                    }
                }
                Err(err) => {
                    for name in &update_names {
                        report.push_error(name.clone(), err.to_string());
                    }
                }
            }
        }

        // Sequential creates in tree order. `last_sibling` tracks, per
        // parent, the most recent non-skip row id seen at that level so a
        // new row lands after its predecessor.
        let mut remote_id_of: HashMap<String, i64> = items
            .iter()
            .filter_map(|item| {
                item.id.clone().zip(item.remote_row_id)
            })
            .collect();
        let mut last_sibling: HashMap<Option<i64>, i64> = HashMap::new();

        for index in 0..items.len() {
            if items[index].skip {
                continue;
            }
            if items[index].id.as_deref().is_some_and(|id| stale_unlinked.contains(id)) {
                continue;
            }
            let parent_remote = resolve_parent_remote(&items[index], &remote_id_of);

            if let Some(row_id) = items[index].remote_row_id {
                last_sibling.insert(parent_remote, row_id);
                continue;
            }

            if items[index].parent.is_some() && parent_remote.is_none() {
                // The parent never materialized remotely (failed create or
                // a locally new header row); this row cannot be positioned.
                report.push_error(
                    items[index].name.clone(),
                    "parent row is not materialized remotely",
                );
                continue;
            }

            let position = match last_sibling.get(&parent_remote) {
                Some(&sibling_row_id) => RowPosition::After { sibling_row_id },
                None => match parent_remote {
                    Some(parent_row_id) => RowPosition::FirstChildOf { parent_row_id },
                    None => RowPosition::Top,
                },
            };

            let cells = build_patch_cells(&columns, &items[index])?;
            match self
                .sheets
                .add_row(sheet_id, plansync_domain::NewRow { position, cells })
                .await
            {
                Ok(created) => {
                    items[index].remote_row_id = Some(created.id);
                    self.wbs.update_item(&items[index]).await?;
                    if let Some(id) = items[index].id.clone() {
                        remote_id_of.insert(id, created.id);
                    }
                    last_sibling.insert(parent_remote, created.id);
                    report.created += 1;
                }
                Err(err) => {
                    report.push_error(items[index].name.clone(), err.to_string());
                }
            }
        }

        Ok(())
    }

    /// Pull the remote sheet into the cache.
    ///
    /// Formula-bearing columns (variance) are read back here; the remote
    /// system is their source of truth. Cached rows whose remote row
    /// vanished are invalidated; rows never pushed remotely are left
    /// alone.
    #[instrument(skip(self), fields(project_id = project_id))]
    pub async fn refresh_from_remote(&self, project_id: &str) -> Result<usize> {
        let mut project = self
            .projects
            .get_project(project_id)
            .await?
            .ok_or_else(|| PlansyncError::NotFound(format!("project {project_id}")))?;
        let workspace = project.workspace.clone().ok_or_else(|| {
            PlansyncError::Validation(format!("project {project_id} has no workspace"))
        })?;

        let sheet = self.sheets.get_sheet(workspace.sheet_id).await?;
        let columns = ColumnMap::from_columns(&sheet.columns, WBS_COLUMNS)?;

        let cached = self.wbs.get_items(project_id).await?;
        let cached_by_remote: HashMap<i64, WbsItem> = cached
            .iter()
            .filter_map(|item| item.remote_row_id.map(|row_id| (row_id, item.clone())))
            .collect();

        let mut upserted = 0usize;
        let mut seen_rows: HashSet<i64> = HashSet::new();
        for (sequence, row) in sheet.rows.iter().enumerate() {
            seen_rows.insert(row.id);
            let imported =
                import_row(&columns, row, project_id, sequence as i64, cached_by_remote.get(&row.id));
            match cached_by_remote.get(&row.id) {
                Some(previous) => {
                    if !same_content(previous, &imported) || previous.variance != imported.variance
                    {
                        self.wbs.update_item(&imported).await?;
                        upserted += 1;
                    }
                }
                None => {
                    self.wbs.insert_item(&imported).await?;
                    upserted += 1;
                }
            }
        }

        // Rows deleted out-of-band: drop the stale cache entries.
        for (row_id, item) in &cached_by_remote {
            if !seen_rows.contains(row_id) {
                if let Some(id) = item.id.as_deref() {
                    warn!(item = item.name.as_str(), "remote row vanished, dropping cache entry");
                    self.wbs.delete_item(id).await?;
                }
            }
        }

        project.last_synced_at = Some(Utc::now());
        self.projects.update_project(&project).await?;
        self.audit_entry(
            "wbs.refresh",
            project_id,
            serde_json::json!({ "rows": sheet.rows.len(), "upserted": upserted }),
        )
        .await;

        Ok(upserted)
    }

    /// Audit writes are side effects; a failing audit sink logs but never
    /// fails the primary operation.
    async fn audit_entry(&self, action: &str, target: &str, payload: serde_json::Value) {
        let entry = AuditEntry::record(SYSTEM_ACTOR, action, format!("project:{target}"), payload);
        if let Err(err) = self.audit.append(&entry).await {
            warn!(error = %err, action, "failed to append audit entry");
        }
    }
}

/// True when a new row id was allocated for the item in this pass.
fn changed_ids_contains_new(item: &WbsItem, cached: &HashMap<String, WbsItem>) -> bool {
    item.id.as_deref().is_some_and(|id| !cached.contains_key(id))
}

/// Content comparison for change detection. Identity, remote linkage and
/// formula read-backs are excluded: those change without a user edit.
fn same_content(a: &WbsItem, b: &WbsItem) -> bool {
    a.parent == b.parent
        && a.name == b.name
        && a.description == b.description
        && a.owner == b.owner
        && a.approver == b.approver
        && a.status == b.status
        && a.start_date == b.start_date
        && a.end_date == b.end_date
        && a.budget == b.budget
        && a.actual == b.actual
        && a.notes == b.notes
        && a.skip == b.skip
        && a.order_index == b.order_index
}

fn resolve_parent_remote(item: &WbsItem, remote_id_of: &HashMap<String, i64>) -> Option<i64> {
    match &item.parent {
        Some(ParentRef::Remote(row_id)) => Some(*row_id),
        Some(ParentRef::Permanent(id)) => remote_id_of.get(id).copied(),
        None => None,
    }
}

/// Build the writable cell set for one item. Formula columns are absent
/// by construction: the draft refuses them and this function never asks.
fn build_patch_cells(
    columns: &ColumnMap,
    item: &WbsItem,
) -> Result<Vec<plansync_domain::Cell>> {
    let draft = RowDraft::new(columns)
        .set_text(COL_NAME, item.name.clone())?
        .set_opt_text(COL_DESCRIPTION, item.description.as_deref())?
        .set_opt_text(COL_OWNER, item.owner.as_deref())?
        .set_opt_text(COL_APPROVER, item.approver.as_deref())?
        .set_text(COL_STATUS, item.status.remote_value())?
        .set_opt_text(COL_START_DATE, item.start_date.map(|d| d.to_string()).as_deref())?
        .set_opt_text(COL_END_DATE, item.end_date.map(|d| d.to_string()).as_deref())?
        .set_opt_text(COL_BUDGET, item.budget.as_deref())?
        .set_opt_text(COL_ACTUAL, item.actual.as_deref())?
        .set_opt_text(COL_NOTES, item.notes.as_deref())?;
    Ok(draft.into_cells())
}

/// Map one remote row onto a cache item, preserving local identity when
/// the row is already linked.
fn import_row(
    columns: &ColumnMap,
    row: &SheetRow,
    project_id: &str,
    sequence: i64,
    existing: Option<&WbsItem>,
) -> WbsItem {
    let accessor = RowAccessor::new(columns, row);
    let parse_date = |title: &str| -> Option<NaiveDate> {
        accessor.text(title).and_then(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|err| {
                    warn!(raw, error = %err, "unparseable date cell, treating as empty");
                    err
                })
                .ok()
        })
    };
    let text = |title: &str| accessor.text(title).map(str::to_string);

    WbsItem {
        // First import of a remote-origin row mints the permanent id.
        id: existing
            .and_then(|item| item.id.clone())
            .or_else(|| Some(Uuid::new_v4().to_string())),
        temp_id: None,
        remote_row_id: Some(row.id),
        project_id: project_id.to_string(),
        parent: row.parent_id.map(ParentRef::Remote),
        name: text(COL_NAME).unwrap_or_default(),
        description: text(COL_DESCRIPTION),
        owner: text(COL_OWNER),
        approver: text(COL_APPROVER),
        status: accessor
            .text(COL_STATUS)
            .map(|raw| WbsStatus::from(raw.to_string()))
            .unwrap_or_default(),
        start_date: parse_date(COL_START_DATE),
        end_date: parse_date(COL_END_DATE),
        budget: text(COL_BUDGET),
        actual: text(COL_ACTUAL),
        variance: text(COL_VARIANCE),
        notes: text(COL_NOTES),
        skip: row.is_locked(),
        order_index: sequence,
    }
}
