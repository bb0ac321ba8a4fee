//! Domain types and models

pub mod audit;
pub mod project;
pub mod report;
pub mod sheet;
pub mod wbs;

pub use audit::AuditEntry;
pub use project::{Project, Workspace};
pub use report::{SyncItemError, SyncOutcome, SyncReport};
pub use sheet::{
    Cell, Column, Folder, FolderEntry, Hyperlink, NewRow, RowPosition, RowUpdate, Sheet, SheetRow,
    WebhookCallback, WebhookEvent, WebhookSubscription,
};
pub use wbs::{ParentRef, WbsItem, WbsStatus};
