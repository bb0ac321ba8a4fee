//! SQLite-backed repository implementations

mod audit_repository;
mod manager;
mod project_repository;
mod wbs_repository;

pub use audit_repository::SqliteAuditLog;
pub use manager::{DbConnection, DbManager};
pub use project_repository::SqliteProjectRepository;
pub use wbs_repository::SqliteWbsRepository;
