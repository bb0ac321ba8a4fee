//! Provisioning state machine
//!
//! Triggered when a portfolio row's approval reads "Approved" and the
//! project has no workspace yet. Steps run strictly in order; a failure
//! aborts the remainder and surfaces the step name, but earlier remote
//! side effects are never rolled back — the duplicate-name check in the
//! first step is what keeps a re-run from creating a second folder.

use std::fmt;
use std::sync::Arc;

use plansync_domain::constants::{workspace_folder_name, COL_APP_LINK, COL_NAME, COL_WBS_LINK};
use plansync_domain::{
    AuditEntry, PlansyncError, Project, ProvisioningConfig, Result, RowUpdate, Workspace,
};
use tracing::{info, instrument, warn};

use crate::reconcile::ports::{AuditLog, ProjectRepository};
use crate::sheet::ports::SheetService;
use crate::sheet::{ColumnMap, RowDraft};

/// Steps of the provisioning workflow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningStep {
    FolderCreated,
    TemplateCopied,
    HeaderPatched,
    LinksWritten,
    Complete,
}

impl fmt::Display for ProvisioningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FolderCreated => "FolderCreated",
            Self::TemplateCopied => "TemplateCopied",
            Self::HeaderPatched => "HeaderPatched",
            Self::LinksWritten => "LinksWritten",
            Self::Complete => "Complete",
        };
        f.write_str(name)
    }
}

pub struct ProvisioningWorkflow {
    sheets: Arc<dyn SheetService>,
    projects: Arc<dyn ProjectRepository>,
    audit: Arc<dyn AuditLog>,
    config: ProvisioningConfig,
}

impl ProvisioningWorkflow {
    pub fn new(
        sheets: Arc<dyn SheetService>,
        projects: Arc<dyn ProjectRepository>,
        audit: Arc<dyn AuditLog>,
        config: ProvisioningConfig,
    ) -> Self {
        Self { sheets, projects, audit, config }
    }

    /// Run the workflow for one project.
    ///
    /// Returns `Ok(None)` without any remote call when the trigger does
    /// not apply: not approved, or a workspace already exists. That
    /// persisted workspace is what makes re-entry idempotent.
    #[instrument(skip(self), fields(project_id = project_id))]
    pub async fn provision(&self, project_id: &str) -> Result<Option<Workspace>> {
        let mut project = self
            .projects
            .get_project(project_id)
            .await?
            .ok_or_else(|| PlansyncError::NotFound(format!("project {project_id}")))?;

        if !project.needs_provisioning() {
            return Ok(None);
        }

        let workspace = self.run_steps(&project).await?;

        project.workspace = Some(workspace.clone());
        project.updated_at = chrono::Utc::now();
        self.projects
            .update_project(&project)
            .await
            .map_err(|err| step_failure(ProvisioningStep::Complete, &err))?;

        let entry = AuditEntry::record(
            "system",
            "project.provisioned",
            format!("project:{project_id}"),
            serde_json::json!({
                "folder_id": workspace.folder_id,
                "sheet_id": workspace.sheet_id,
            }),
        );
        if let Err(err) = self.audit.append(&entry).await {
            warn!(error = %err, "failed to append provisioning audit entry");
        }

        info!(business_code = project.business_code.as_str(), "workspace provisioned");
        Ok(Some(workspace))
    }

    async fn run_steps(&self, project: &Project) -> Result<Workspace> {
        let folder_name = workspace_folder_name(&project.business_code);

        // Step 1: dedicated folder. The deterministic name doubles as a
        // duplicate check: a folder left behind by an earlier failed run
        // is reused, not duplicated.
        let folder_id = {
            let parent = self
                .sheets
                .get_folder(self.config.parent_folder_id)
                .await
                .map_err(|err| step_failure(ProvisioningStep::FolderCreated, &err))?;

            match parent.folders.iter().find(|child| child.name == folder_name) {
                Some(existing) => {
                    info!(folder = folder_name.as_str(), "workspace folder already exists");
                    existing.id
                }
                None => {
                    self.sheets
                        .create_folder(self.config.parent_folder_id, &folder_name)
                        .await
                        .map_err(|err| step_failure(ProvisioningStep::FolderCreated, &err))?
                        .id
                }
            }
        };

        // Step 2: clone the template. Sheets are mandatory; reports and
        // dashboards are best-effort and only logged on failure.
        let template = self
            .sheets
            .get_folder(self.config.template_folder_id)
            .await
            .map_err(|err| step_failure(ProvisioningStep::TemplateCopied, &err))?;

        let Some(main_template) = template.sheets.first() else {
            return Err(PlansyncError::PartialProvisioning {
                step: ProvisioningStep::TemplateCopied.to_string(),
                message: "template folder contains no sheets".to_string(),
            });
        };

        let mut main_copy_id = None;
        for sheet in &template.sheets {
            let copy = self
                .sheets
                .copy_sheet(sheet.id, &sheet.name, folder_id)
                .await
                .map_err(|err| step_failure(ProvisioningStep::TemplateCopied, &err))?;
            if sheet.id == main_template.id {
                main_copy_id = Some(copy.id);
            }
        }
        for report in &template.reports {
            if let Err(err) = self.sheets.copy_report(report.id, &report.name, folder_id).await {
                warn!(report = report.name.as_str(), error = %err, "report copy failed, continuing");
            }
        }
        for dashboard in &template.dashboards {
            if let Err(err) =
                self.sheets.copy_dashboard(dashboard.id, &dashboard.name, folder_id).await
            {
                warn!(dashboard = dashboard.name.as_str(), error = %err, "dashboard copy failed, continuing");
            }
        }

        let main_sheet_id = main_copy_id.ok_or_else(|| PlansyncError::PartialProvisioning {
            step: ProvisioningStep::TemplateCopied.to_string(),
            message: "main template sheet was not copied".to_string(),
        })?;

        // Step 3: the generic template becomes project-specific by
        // overwriting the first row's name cell with the business code.
        let main_sheet = self
            .sheets
            .get_sheet(main_sheet_id)
            .await
            .map_err(|err| step_failure(ProvisioningStep::HeaderPatched, &err))?;
        let columns = ColumnMap::from_columns(&main_sheet.columns, &[COL_NAME])
            .map_err(|err| step_failure(ProvisioningStep::HeaderPatched, &err))?;
        let Some(header_row) = main_sheet.rows.first() else {
            return Err(PlansyncError::PartialProvisioning {
                step: ProvisioningStep::HeaderPatched.to_string(),
                message: "copied main sheet has no header row".to_string(),
            });
        };
        let header_cells = RowDraft::new(&columns)
            .set_text(COL_NAME, project.business_code.clone())
            .map(RowDraft::into_cells)
            .map_err(|err| step_failure(ProvisioningStep::HeaderPatched, &err))?;
        self.sheets
            .update_rows(main_sheet_id, vec![RowUpdate { row_id: header_row.id, cells: header_cells }])
            .await
            .map_err(|err| step_failure(ProvisioningStep::HeaderPatched, &err))?;

        // Step 4: hyperlinks back into the originating portfolio row.
        let remote_url = main_sheet
            .permalink
            .clone()
            .unwrap_or_else(|| format!("sheet:{main_sheet_id}"));
        let internal_url =
            format!("{}/projects/{}", self.config.app_base_url.trim_end_matches('/'), project.id);

        let portfolio_row_id =
            project.portfolio_row_id.ok_or_else(|| PlansyncError::PartialProvisioning {
                step: ProvisioningStep::LinksWritten.to_string(),
                message: format!("project {} has no portfolio row", project.id),
            })?;
        let portfolio = self
            .sheets
            .get_sheet(self.config.portfolio_sheet_id)
            .await
            .map_err(|err| step_failure(ProvisioningStep::LinksWritten, &err))?;
        let portfolio_columns =
            ColumnMap::from_columns(&portfolio.columns, &[COL_WBS_LINK, COL_APP_LINK])
                .map_err(|err| step_failure(ProvisioningStep::LinksWritten, &err))?;
        let link_cells = RowDraft::new(&portfolio_columns)
            .set_link(COL_WBS_LINK, folder_name.clone(), remote_url.clone())
            .and_then(|draft| draft.set_link(COL_APP_LINK, "Open breakdown", internal_url.clone()))
            .map(RowDraft::into_cells)
            .map_err(|err| step_failure(ProvisioningStep::LinksWritten, &err))?;
        self.sheets
            .update_rows(
                self.config.portfolio_sheet_id,
                vec![RowUpdate { row_id: portfolio_row_id, cells: link_cells }],
            )
            .await
            .map_err(|err| step_failure(ProvisioningStep::LinksWritten, &err))?;

        // Step 5 happens in the caller: persisting these ids onto the
        // project is what flips the trigger off for re-entry.
        Ok(Workspace { folder_id, sheet_id: main_sheet_id, remote_url, internal_url })
    }
}

fn step_failure(step: ProvisioningStep, err: &PlansyncError) -> PlansyncError {
    match err {
        // Already step-tagged; keep the original step name.
        PlansyncError::PartialProvisioning { .. } => err.clone(),
        other => PlansyncError::PartialProvisioning {
            step: step.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_names_render_for_operators() {
        assert_eq!(ProvisioningStep::FolderCreated.to_string(), "FolderCreated");
        assert_eq!(ProvisioningStep::LinksWritten.to_string(), "LinksWritten");
    }

    #[test]
    fn step_failure_preserves_existing_step_tag() {
        let inner = PlansyncError::PartialProvisioning {
            step: "HeaderPatched".to_string(),
            message: "first row missing".to_string(),
        };
        let wrapped = step_failure(ProvisioningStep::LinksWritten, &inner);
        match wrapped {
            PlansyncError::PartialProvisioning { step, .. } => assert_eq!(step, "HeaderPatched"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
