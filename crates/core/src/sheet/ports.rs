//! Port interface for the remote spreadsheet service

use async_trait::async_trait;
use plansync_domain::{
    Folder, FolderEntry, NewRow, Result, RowUpdate, Sheet, SheetRow, WebhookSubscription,
};

/// Operations consumed from the remote spreadsheet service.
///
/// The infra adapter wraps every call in the retry executor and the
/// idempotency guard; core services program against this trait and stay
/// free of transport concerns.
#[async_trait]
pub trait SheetService: Send + Sync {
    /// Fetch a sheet with its columns and rows.
    async fn get_sheet(&self, sheet_id: i64) -> Result<Sheet>;

    /// Create a single row at an explicit position and return it with
    /// its assigned id. Deliberately single-row: positioning a batch
    /// would leave sibling order undefined.
    async fn add_row(&self, sheet_id: i64, row: NewRow) -> Result<SheetRow>;

    /// Update a batch of rows keyed by row id.
    async fn update_rows(&self, sheet_id: i64, updates: Vec<RowUpdate>) -> Result<()>;

    /// Delete rows by id.
    async fn delete_rows(&self, sheet_id: i64, row_ids: Vec<i64>) -> Result<()>;

    /// Create a folder under a parent container.
    async fn create_folder(&self, parent_folder_id: i64, name: &str) -> Result<FolderEntry>;

    /// Copy a sheet into a destination folder under a new name.
    async fn copy_sheet(
        &self,
        sheet_id: i64,
        new_name: &str,
        dest_folder_id: i64,
    ) -> Result<FolderEntry>;

    /// Copy a report into a destination folder. Best-effort from the
    /// workflow's point of view.
    async fn copy_report(
        &self,
        report_id: i64,
        new_name: &str,
        dest_folder_id: i64,
    ) -> Result<FolderEntry>;

    /// Copy a dashboard into a destination folder. Best-effort.
    async fn copy_dashboard(
        &self,
        dashboard_id: i64,
        new_name: &str,
        dest_folder_id: i64,
    ) -> Result<FolderEntry>;

    /// List a folder's children.
    async fn get_folder(&self, folder_id: i64) -> Result<Folder>;

    /// Register a webhook subscription for a sheet.
    async fn create_webhook(
        &self,
        sheet_id: i64,
        name: &str,
        callback_url: &str,
    ) -> Result<WebhookSubscription>;

    /// Remove a webhook subscription.
    async fn delete_webhook(&self, webhook_id: i64) -> Result<()>;

    /// List this account's webhook subscriptions.
    async fn list_webhooks(&self) -> Result<Vec<WebhookSubscription>>;
}
