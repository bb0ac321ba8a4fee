//! WBS item repository implementation
//!
//! One row per cached item, keyed by permanent id, with a unique
//! constraint on the remote row id to prevent duplicate linkage.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use plansync_core::WbsRepository;
use plansync_domain::{ParentRef, PlansyncError, Result, WbsItem, WbsStatus};
use rusqlite::types::Type;
use rusqlite::{params, Row};
use tokio::task;

use super::manager::{map_sql_error, DbConnection, DbManager};
use crate::errors::InfraError;

const ITEM_COLUMNS: &str = "id, project_id, remote_row_id, parent_kind, parent_ref, name, \
     description, owner, approver, status, start_date, end_date, budget, actual, variance, \
     notes, skip, order_index";

/// SQLite-backed WBS item repository.
pub struct SqliteWbsRepository {
    db: Arc<DbManager>,
}

impl SqliteWbsRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WbsRepository for SqliteWbsRepository {
    async fn get_items(&self, project_id: &str) -> Result<Vec<WbsItem>> {
        let db = Arc::clone(&self.db);
        let project_id = project_id.to_string();

        task::spawn_blocking(move || -> Result<Vec<WbsItem>> {
            let conn = db.get_connection()?;
            query_items(&conn, &project_id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert_item(&self, item: &WbsItem) -> Result<()> {
        let db = Arc::clone(&self.db);
        let item = item.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            insert_item(&conn, &item)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_item(&self, item: &WbsItem) -> Result<()> {
        let db = Arc::clone(&self.db);
        let item = item.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            update_item(&conn, &item)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_item(&self, id: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute("DELETE FROM wbs_items WHERE id = ?1", params![id])
                .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_remote_row(&self, remote_row_id: i64) -> Result<Option<WbsItem>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Option<WbsItem>> {
            let conn = db.get_connection()?;
            let sql =
                format!("SELECT {ITEM_COLUMNS} FROM wbs_items WHERE remote_row_id = ?1");
            match conn.query_row(&sql, params![remote_row_id], map_item_row) {
                Ok(item) => Ok(Some(item)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(err) => Err(map_sql_error(err)),
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn clear_project(&self, project_id: &str) -> Result<usize> {
        let db = Arc::clone(&self.db);
        let project_id = project_id.to_string();

        task::spawn_blocking(move || -> Result<usize> {
            let conn = db.get_connection()?;
            conn.execute("DELETE FROM wbs_items WHERE project_id = ?1", params![project_id])
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn query_items(conn: &DbConnection, project_id: &str) -> Result<Vec<WbsItem>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM wbs_items WHERE project_id = ?1 ORDER BY order_index ASC"
    );
    let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
    let rows = stmt
        .query_map(params![project_id], map_item_row)
        .map_err(map_sql_error)?
        .collect::<rusqlite::Result<Vec<WbsItem>>>()
        .map_err(map_sql_error)?;
    Ok(rows)
}

fn insert_item(conn: &DbConnection, item: &WbsItem) -> Result<()> {
    let id = require_id(item)?;
    let (parent_kind, parent_ref) = encode_parent(item.parent.as_ref());
    conn.execute(
        "INSERT INTO wbs_items (id, project_id, remote_row_id, parent_kind, parent_ref, name, \
         description, owner, approver, status, start_date, end_date, budget, actual, variance, \
         notes, skip, order_index)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            id,
            item.project_id,
            item.remote_row_id,
            parent_kind,
            parent_ref,
            item.name,
            item.description,
            item.owner,
            item.approver,
            String::from(item.status.clone()),
            item.start_date.map(|d| d.to_string()),
            item.end_date.map(|d| d.to_string()),
            item.budget,
            item.actual,
            item.variance,
            item.notes,
            item.skip,
            item.order_index,
        ],
    )
    .map_err(map_sql_error)?;
    Ok(())
}

fn update_item(conn: &DbConnection, item: &WbsItem) -> Result<()> {
    let id = require_id(item)?;
    let (parent_kind, parent_ref) = encode_parent(item.parent.as_ref());
    let affected = conn
        .execute(
            "UPDATE wbs_items SET remote_row_id = ?2, parent_kind = ?3, parent_ref = ?4, \
             name = ?5, description = ?6, owner = ?7, approver = ?8, status = ?9, \
             start_date = ?10, end_date = ?11, budget = ?12, actual = ?13, variance = ?14, \
             notes = ?15, skip = ?16, order_index = ?17
             WHERE id = ?1",
            params![
                id,
                item.remote_row_id,
                parent_kind,
                parent_ref,
                item.name,
                item.description,
                item.owner,
                item.approver,
                String::from(item.status.clone()),
                item.start_date.map(|d| d.to_string()),
                item.end_date.map(|d| d.to_string()),
                item.budget,
                item.actual,
                item.variance,
                item.notes,
                item.skip,
                item.order_index,
            ],
        )
        .map_err(map_sql_error)?;
    if affected == 0 {
        return Err(PlansyncError::NotFound(format!("item {id}")));
    }
    Ok(())
}

fn require_id(item: &WbsItem) -> Result<&str> {
    item.id
        .as_deref()
        .ok_or_else(|| PlansyncError::Validation("item has no permanent id".into()))
}

fn encode_parent(parent: Option<&ParentRef>) -> (Option<&'static str>, Option<String>) {
    match parent {
        Some(ParentRef::Permanent(id)) => (Some("permanent"), Some(id.clone())),
        Some(ParentRef::Remote(row_id)) => (Some("remote"), Some(row_id.to_string())),
        None => (None, None),
    }
}

fn map_item_row(row: &Row<'_>) -> rusqlite::Result<WbsItem> {
    let parent_kind: Option<String> = row.get(3)?;
    let parent_ref: Option<String> = row.get(4)?;
    let parent = match (parent_kind.as_deref(), parent_ref) {
        (Some("permanent"), Some(reference)) => Some(ParentRef::Permanent(reference)),
        (Some("remote"), Some(reference)) => {
            let row_id = reference.parse::<i64>().map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(err))
            })?;
            Some(ParentRef::Remote(row_id))
        }
        _ => None,
    };

    let status: String = row.get(9)?;
    let parse_date = |value: Option<String>| {
        value.and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok())
    };

    Ok(WbsItem {
        id: Some(row.get(0)?),
        temp_id: None,
        remote_row_id: row.get(2)?,
        project_id: row.get(1)?,
        parent,
        name: row.get(5)?,
        description: row.get(6)?,
        owner: row.get(7)?,
        approver: row.get(8)?,
        status: WbsStatus::from(status),
        start_date: parse_date(row.get(10)?),
        end_date: parse_date(row.get(11)?),
        budget: row.get(12)?,
        actual: row.get(13)?,
        variance: row.get(14)?,
        notes: row.get(15)?,
        skip: row.get(16)?,
        order_index: row.get(17)?,
    })
}

fn map_join_error(err: task::JoinError) -> PlansyncError {
    PlansyncError::from(InfraError::from(err))
}

// ============================================================================
// Tests
// ============================================================================
