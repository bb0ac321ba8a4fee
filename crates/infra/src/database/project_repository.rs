//! Project repository implementation

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use plansync_core::ProjectRepository;
use plansync_domain::{PlansyncError, Project, Result, Workspace};
use rusqlite::types::Type;
use rusqlite::{params, Row};
use tokio::task;

use super::manager::{map_sql_error, DbConnection, DbManager};
use crate::errors::InfraError;

const PROJECT_COLUMNS: &str = "id, business_code, title, approval_status, portfolio_row_id, \
     folder_id, sheet_id, remote_url, internal_url, last_synced_at, created_at, updated_at";

/// SQLite-backed project repository.
pub struct SqliteProjectRepository {
    db: Arc<DbManager>,
}

impl SqliteProjectRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProjectRepository for SqliteProjectRepository {
    async fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> Result<Option<Project>> {
            let conn = db.get_connection()?;
            query_one(&conn, "id = ?1", &id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_business_code(&self, business_code: &str) -> Result<Option<Project>> {
        let db = Arc::clone(&self.db);
        let business_code = business_code.to_string();

        task::spawn_blocking(move || -> Result<Option<Project>> {
            let conn = db.get_connection()?;
            query_one(&conn, "business_code = ?1", &business_code)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert_project(&self, project: &Project) -> Result<()> {
        let db = Arc::clone(&self.db);
        let project = project.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let workspace = project.workspace.as_ref();
            conn.execute(
                "INSERT INTO projects (id, business_code, title, approval_status, \
                 portfolio_row_id, folder_id, sheet_id, remote_url, internal_url, \
                 last_synced_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    project.id,
                    project.business_code,
                    project.title,
                    project.approval_status,
                    project.portfolio_row_id,
                    workspace.map(|ws| ws.folder_id),
                    workspace.map(|ws| ws.sheet_id),
                    workspace.map(|ws| ws.remote_url.clone()),
                    workspace.map(|ws| ws.internal_url.clone()),
                    project.last_synced_at.map(|ts| ts.to_rfc3339()),
                    project.created_at.to_rfc3339(),
                    project.updated_at.to_rfc3339(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_project(&self, project: &Project) -> Result<()> {
        let db = Arc::clone(&self.db);
        let project = project.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let workspace = project.workspace.as_ref();
            let affected = conn
                .execute(
                    "UPDATE projects SET business_code = ?2, title = ?3, approval_status = ?4, \
                     portfolio_row_id = ?5, folder_id = ?6, sheet_id = ?7, remote_url = ?8, \
                     internal_url = ?9, last_synced_at = ?10, updated_at = ?11
                     WHERE id = ?1",
                    params![
                        project.id,
                        project.business_code,
                        project.title,
                        project.approval_status,
                        project.portfolio_row_id,
                        workspace.map(|ws| ws.folder_id),
                        workspace.map(|ws| ws.sheet_id),
                        workspace.map(|ws| ws.remote_url.clone()),
                        workspace.map(|ws| ws.internal_url.clone()),
                        project.last_synced_at.map(|ts| ts.to_rfc3339()),
                        project.updated_at.to_rfc3339(),
                    ],
                )
                .map_err(map_sql_error)?;
            if affected == 0 {
                return Err(PlansyncError::NotFound(format!("project {}", project.id)));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Vec<Project>> {
            let conn = db.get_connection()?;
            let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at ASC");
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let projects = stmt
                .query_map(params![], map_project_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<Project>>>()
                .map_err(map_sql_error);
            projects
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn query_one(conn: &DbConnection, predicate: &str, value: &str) -> Result<Option<Project>> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE {predicate}");
    match conn.query_row(&sql, params![value], map_project_row) {
        Ok(project) => Ok(Some(project)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(err) => Err(map_sql_error(err)),
    }
}

fn map_project_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    let folder_id: Option<i64> = row.get(5)?;
    let sheet_id: Option<i64> = row.get(6)?;
    let remote_url: Option<String> = row.get(7)?;
    let internal_url: Option<String> = row.get(8)?;

    // Workspace links are written and cleared together; a partial set
    // means the row predates provisioning completion.
    let workspace = match (folder_id, sheet_id, remote_url, internal_url) {
        (Some(folder_id), Some(sheet_id), Some(remote_url), Some(internal_url)) => {
            Some(Workspace { folder_id, sheet_id, remote_url, internal_url })
        }
        _ => None,
    };

    let parse_ts = |index: usize, raw: String| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err)))
    };

    let last_synced_at = row
        .get::<_, Option<String>>(9)?
        .map(|raw| parse_ts(9, raw))
        .transpose()?;
    let created_at = parse_ts(10, row.get::<_, String>(10)?)?;
    let updated_at = parse_ts(11, row.get::<_, String>(11)?)?;

    Ok(Project {
        id: row.get(0)?,
        business_code: row.get(1)?,
        title: row.get(2)?,
        approval_status: row.get(3)?,
        portfolio_row_id: row.get(4)?,
        workspace,
        last_synced_at,
        created_at,
        updated_at,
    })
}

fn map_join_error(err: task::JoinError) -> PlansyncError {
    PlansyncError::from(InfraError::from(err))
}

// ============================================================================
// Tests
// ============================================================================
