//! Audit log repository implementation
//!
//! Append-only by construction: there is no update or delete path.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use plansync_core::AuditLog;
use plansync_domain::{AuditEntry, PlansyncError, Result};
use rusqlite::types::Type;
use rusqlite::{params, Row};
use tokio::task;

use super::manager::{map_sql_error, DbManager};
use crate::errors::InfraError;

/// SQLite-backed audit sink.
pub struct SqliteAuditLog {
    db: Arc<DbManager>,
}

impl SqliteAuditLog {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditLog for SqliteAuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        let db = Arc::clone(&self.db);
        let entry = entry.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO audit_log (id, actor, action, target, payload, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.id,
                    entry.actor,
                    entry.action,
                    entry.target,
                    entry.payload.to_string(),
                    entry.timestamp.to_rfc3339(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Vec<AuditEntry>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, actor, action, target, payload, timestamp FROM audit_log
                     ORDER BY timestamp DESC LIMIT ?1",
                )
                .map_err(map_sql_error)?;
            let entries = stmt
                .query_map(params![limit as i64], map_audit_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<AuditEntry>>>()
                .map_err(map_sql_error);
            entries
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_audit_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    let payload_raw: String = row.get(4)?;
    let payload = serde_json::from_str(&payload_raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(err)))?;
    let timestamp_raw: String = row.get(5)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(err)))?;

    Ok(AuditEntry {
        id: row.get(0)?,
        actor: row.get(1)?,
        action: row.get(2)?,
        target: row.get(3)?,
        payload,
        timestamp,
    })
}

fn map_join_error(err: task::JoinError) -> PlansyncError {
    PlansyncError::from(InfraError::from(err))
}
