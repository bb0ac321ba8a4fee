//! Portfolio polling fallback
//!
//! A degraded, higher-latency substitute for push notifications: scans
//! the portfolio sheet, synthesizes missing projects, and drives the
//! same provisioning and refresh paths the webhook handler uses.
//! Timestamp comparison keeps re-processing down to rows that actually
//! changed.

use std::sync::Arc;

use chrono::Utc;
use plansync_domain::constants::{
    COL_APPROVAL, COL_PROJECT_CODE, COL_PROJECT_TITLE, PORTFOLIO_COLUMNS,
};
use plansync_domain::{
    Project, ProvisioningConfig, Result, SheetRow, SyncItemError, WebhookCallback,
    WebhookSubscription,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::provisioning::ProvisioningWorkflow;
use crate::reconcile::ports::ProjectRepository;
use crate::reconcile::Reconciler;
use crate::sheet::ports::SheetService;
use crate::sheet::{ColumnMap, RowAccessor};

/// Name under which this service registers its webhook subscription.
const WEBHOOK_NAME: &str = "plansync-portfolio";

/// Aggregate result of one polling pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollSummary {
    pub examined: usize,
    pub synthesized: usize,
    pub provisioned: usize,
    pub refreshed: usize,
    pub skipped: usize,
    pub errors: Vec<SyncItemError>,
}

pub struct PollingService {
    projects: Arc<dyn ProjectRepository>,
    sheets: Arc<dyn SheetService>,
    provisioning: Arc<ProvisioningWorkflow>,
    reconciler: Arc<Reconciler>,
    config: ProvisioningConfig,
}

impl PollingService {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        sheets: Arc<dyn SheetService>,
        provisioning: Arc<ProvisioningWorkflow>,
        reconciler: Arc<Reconciler>,
        config: ProvisioningConfig,
    ) -> Self {
        Self { projects, sheets, provisioning, reconciler, config }
    }

    /// Scan every portfolio row once. Per-row failures are collected so
    /// one broken row cannot stall the rest of the portfolio.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<PollSummary> {
        let sheet = self.sheets.get_sheet(self.config.portfolio_sheet_id).await?;
        let columns = ColumnMap::from_columns(&sheet.columns, PORTFOLIO_COLUMNS)?;

        let mut summary = PollSummary::default();
        for row in &sheet.rows {
            summary.examined += 1;
            if let Err(err) = self.process_row(&columns, row, &mut summary).await {
                let name = RowAccessor::new(&columns, row)
                    .text(COL_PROJECT_CODE)
                    .unwrap_or("<no code>")
                    .to_string();
                warn!(row = name.as_str(), error = %err, "portfolio row processing failed");
                summary.errors.push(SyncItemError { item_name: name, message: err.to_string() });
            }
        }
        Ok(summary)
    }

    /// Dispatch webhook row events through the same row-processing path
    /// as polling.
    #[instrument(skip(self, callback), fields(events = callback.events.len()))]
    pub async fn handle_webhook(&self, callback: WebhookCallback) -> Result<PollSummary> {
        let mut summary = PollSummary::default();
        let row_ids: Vec<i64> =
            callback.events.iter().filter(|e| e.is_row_change()).map(|e| e.row_id).collect();
        if row_ids.is_empty() {
            return Ok(summary);
        }

        let sheet = self.sheets.get_sheet(self.config.portfolio_sheet_id).await?;
        let columns = ColumnMap::from_columns(&sheet.columns, PORTFOLIO_COLUMNS)?;

        for row_id in row_ids {
            let Some(row) = sheet.rows.iter().find(|row| row.id == row_id) else {
                debug!(row_id, "webhook referenced a row no longer in the sheet");
                continue;
            };
            summary.examined += 1;
            if let Err(err) = self.process_row(&columns, row, &mut summary).await {
                let name = RowAccessor::new(&columns, row)
                    .text(COL_PROJECT_CODE)
                    .unwrap_or("<no code>")
                    .to_string();
                summary.errors.push(SyncItemError { item_name: name, message: err.to_string() });
            }
        }
        Ok(summary)
    }

    /// Register our webhook subscription if none exists yet.
    ///
    /// Push mode is self-configuring; a failure here degrades to polling
    /// and is the caller's to log, never fatal.
    pub async fn ensure_webhook(&self, callback_url: &str) -> Result<WebhookSubscription> {
        let existing = self.sheets.list_webhooks().await?;
        if let Some(hook) =
            existing.into_iter().find(|hook| hook.enabled && hook.callback_url == callback_url)
        {
            debug!(webhook_id = hook.id, "webhook subscription already registered");
            return Ok(hook);
        }
        self.sheets
            .create_webhook(self.config.portfolio_sheet_id, WEBHOOK_NAME, callback_url)
            .await
    }

    /// One portfolio row through the shared processing path:
    /// synthesize a missing project, provision when triggered, refresh
    /// when the remote copy is newer, otherwise skip.
    async fn process_row(
        &self,
        columns: &ColumnMap,
        row: &SheetRow,
        summary: &mut PollSummary,
    ) -> Result<()> {
        let accessor = RowAccessor::new(columns, row);
        let Some(business_code) = accessor.text(COL_PROJECT_CODE) else {
            // Blank spacer rows are normal in portfolio sheets.
            summary.skipped += 1;
            return Ok(());
        };
        let title = accessor.text(COL_PROJECT_TITLE).unwrap_or(business_code);
        let approval = accessor.text(COL_APPROVAL).unwrap_or_default();

        let mut project = match self.projects.find_by_business_code(business_code).await? {
            Some(project) => project,
            None => {
                let project = Project {
                    id: Uuid::new_v4().to_string(),
                    business_code: business_code.to_string(),
                    title: title.to_string(),
                    approval_status: approval.to_string(),
                    portfolio_row_id: Some(row.id),
                    workspace: None,
                    last_synced_at: None,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                };
                self.projects.insert_project(&project).await?;
                summary.synthesized += 1;
                project
            }
        };

        let remote_newer = match (row.modified_at, project.last_synced_at) {
            (Some(modified), Some(synced)) => modified > synced,
            // Without a remote timestamp (or before the first sync) we
            // cannot rule out a change.
            _ => true,
        };

        // Keep the cached portfolio fields current with the remote row.
        let fields_drifted = project.title != title
            || project.approval_status != approval
            || project.portfolio_row_id != Some(row.id);
        if remote_newer && fields_drifted {
            project.title = title.to_string();
            project.approval_status = approval.to_string();
            project.portfolio_row_id = Some(row.id);
            project.updated_at = Utc::now();
            self.projects.update_project(&project).await?;
        }

        if project.needs_provisioning() {
            if self.provisioning.provision(&project.id).await?.is_some() {
                summary.provisioned += 1;
            }
            return Ok(());
        }

        if !remote_newer {
            summary.skipped += 1;
            return Ok(());
        }

        if project.is_provisioned() {
            self.reconciler.refresh_from_remote(&project.id).await?;
            summary.refreshed += 1;
        } else {
            // Nothing to refresh, but record that this row was seen.
            project.last_synced_at = Some(Utc::now());
            self.projects.update_project(&project).await?;
            summary.skipped += 1;
        }
        Ok(())
    }
}
