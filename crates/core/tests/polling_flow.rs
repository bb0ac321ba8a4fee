//! Polling fallback and webhook dispatch behaviour.

mod support;

use std::sync::Arc;

use chrono::{Duration, Utc};
use plansync_core::{PollingService, ProvisioningWorkflow, Reconciler};
use plansync_domain::constants::{COL_APPROVAL, COL_NAME, COL_PROJECT_CODE, COL_PROJECT_TITLE};
use plansync_domain::{
    Cell, Folder, FolderEntry, ProvisioningConfig, WebhookCallback, WebhookEvent,
};
use support::repositories::{MemoryAuditLog, MemoryProjectRepository, MemoryWbsRepository};
use support::sheets::{portfolio_columns, sheet, text_row, wbs_columns, MockSheetService};
use support::project;

const PARENT_FOLDER: i64 = 40;
const TEMPLATE_FOLDER: i64 = 41;
const PORTFOLIO_SHEET: i64 = 50;
const TEMPLATE_MAIN: i64 = 60;

fn config() -> ProvisioningConfig {
    ProvisioningConfig {
        portfolio_sheet_id: PORTFOLIO_SHEET,
        parent_folder_id: PARENT_FOLDER,
        template_folder_id: TEMPLATE_FOLDER,
        app_base_url: "http://localhost:8080".to_string(),
    }
}

struct Harness {
    polling: PollingService,
    projects: MemoryProjectRepository,
    sheets: MockSheetService,
}

fn harness(projects: Vec<plansync_domain::Project>) -> Harness {
    let wbs = MemoryWbsRepository::default();
    let projects = MemoryProjectRepository::with_projects(projects);
    let sheets = MockSheetService::new();
    let audit = MemoryAuditLog::default();

    // Remote fixtures shared by provisioning: parent container, template
    // folder with one sheet, and the portfolio sheet itself.
    sheets.insert_folder(Folder {
        id: PARENT_FOLDER,
        name: "Workspaces".to_string(),
        sheets: Vec::new(),
        folders: Vec::new(),
        reports: Vec::new(),
        dashboards: Vec::new(),
    });
    sheets.insert_folder(Folder {
        id: TEMPLATE_FOLDER,
        name: "WBS Template".to_string(),
        sheets: vec![FolderEntry { id: TEMPLATE_MAIN, name: "WBS".to_string(), permalink: None }],
        folders: Vec::new(),
        reports: Vec::new(),
        dashboards: Vec::new(),
    });
    let columns = wbs_columns();
    let name_id = columns.iter().find(|c| c.title == COL_NAME).map(|c| c.id).unwrap_or(1);
    sheets.insert_sheet(sheet(
        TEMPLATE_MAIN,
        "WBS",
        columns,
        vec![text_row(1, None, vec![Cell::text(name_id, "<project>")])],
    ));

    let reconciler = Reconciler::new(
        Arc::new(wbs.clone()),
        Arc::new(projects.clone()),
        Arc::new(sheets.clone()),
        Arc::new(audit.clone()),
    );
    let provisioning = ProvisioningWorkflow::new(
        Arc::new(sheets.clone()),
        Arc::new(projects.clone()),
        Arc::new(audit.clone()),
        config(),
    );
    let polling = PollingService::new(
        Arc::new(projects.clone()),
        Arc::new(sheets.clone()),
        Arc::new(provisioning),
        Arc::new(reconciler),
        config(),
    );
    Harness { polling, projects, sheets }
}

fn portfolio_row(row_id: i64, code: &str, approval: &str, modified_minutes_ago: i64) -> plansync_domain::SheetRow {
    let columns = portfolio_columns();
    let id_of = |title: &str| {
        columns.iter().find(|c| c.title == title).map(|c| c.id).unwrap_or(0)
    };
    let mut row = text_row(
        row_id,
        None,
        vec![
            Cell::text(id_of(COL_PROJECT_CODE), code),
            Cell::text(id_of(COL_PROJECT_TITLE), format!("Project {code}")),
            Cell::text(id_of(COL_APPROVAL), approval),
        ],
    );
    row.modified_at = Some(Utc::now() - Duration::minutes(modified_minutes_ago));
    row
}

fn seed_portfolio(sheets: &MockSheetService, rows: Vec<plansync_domain::SheetRow>) {
    sheets.insert_sheet(sheet(PORTFOLIO_SHEET, "Portfolio", portfolio_columns(), rows));
}

#[tokio::test]
async fn unknown_portfolio_rows_synthesize_projects_and_provision() {
    let h = harness(Vec::new());
    seed_portfolio(&h.sheets, vec![portfolio_row(700, "PRJ-900", "Approved", 5)]);

    let summary = h.polling.run_once().await.expect("poll");

    assert_eq!(summary.examined, 1);
    assert_eq!(summary.synthesized, 1);
    assert_eq!(summary.provisioned, 1);
    assert!(summary.errors.is_empty());

    let created = h
        .projects
        .all()
        .into_iter()
        .find(|p| p.business_code == "PRJ-900")
        .expect("project synthesized");
    assert_eq!(created.portfolio_row_id, Some(700));
    assert!(created.workspace.is_some(), "same pass runs provisioning");
}

#[tokio::test]
async fn unapproved_rows_synthesize_without_provisioning() {
    let h = harness(Vec::new());
    seed_portfolio(&h.sheets, vec![portfolio_row(700, "PRJ-901", "Pending", 5)]);

    let summary = h.polling.run_once().await.expect("poll");

    assert_eq!(summary.synthesized, 1);
    assert_eq!(summary.provisioned, 0);
    assert_eq!(h.sheets.call_count("create_folder"), 0);
}

#[tokio::test]
async fn stale_rows_are_skipped_by_timestamp_comparison() {
    // Project already synced after the row's last modification.
    let mut existing = project("p1", "Pending", None);
    existing.business_code = "PRJ-902".to_string();
    existing.last_synced_at = Some(Utc::now());
    let h = harness(vec![existing]);
    seed_portfolio(&h.sheets, vec![portfolio_row(700, "PRJ-902", "Pending", 60)]);

    let summary = h.polling.run_once().await.expect("poll");

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.refreshed, 0);
    assert_eq!(summary.provisioned, 0);
}

#[tokio::test]
async fn blank_rows_are_ignored() {
    let h = harness(Vec::new());
    seed_portfolio(&h.sheets, vec![text_row(701, None, Vec::new())]);

    let summary = h.polling.run_once().await.expect("poll");

    assert_eq!(summary.examined, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.synthesized, 0);
}

#[tokio::test]
async fn webhook_events_drive_the_same_row_processing_path() {
    let h = harness(Vec::new());
    seed_portfolio(
        &h.sheets,
        vec![
            portfolio_row(700, "PRJ-903", "Approved", 5),
            portfolio_row(701, "PRJ-904", "Pending", 5),
        ],
    );

    let callback = WebhookCallback {
        events: vec![
            WebhookEvent {
                object_type: "row".to_string(),
                event_type: "created".to_string(),
                row_id: 700,
            },
            // Non-row events are ignored.
            WebhookEvent {
                object_type: "sheet".to_string(),
                event_type: "updated".to_string(),
                row_id: 0,
            },
        ],
    };

    let summary = h.polling.handle_webhook(callback).await.expect("webhook");

    assert_eq!(summary.examined, 1, "only the referenced row is processed");
    assert_eq!(summary.provisioned, 1);
    // The other portfolio row was untouched.
    assert!(h.projects.all().iter().all(|p| p.business_code != "PRJ-904"));
}

#[tokio::test]
async fn empty_webhook_callback_makes_no_remote_calls() {
    let h = harness(Vec::new());
    seed_portfolio(&h.sheets, Vec::new());
    let calls_before = h.sheets.total_calls();

    let summary =
        h.polling.handle_webhook(WebhookCallback { events: Vec::new() }).await.expect("webhook");

    assert_eq!(summary.examined, 0);
    assert_eq!(h.sheets.total_calls(), calls_before);
}

#[tokio::test]
async fn ensure_webhook_registers_exactly_once() {
    let h = harness(Vec::new());

    let first =
        h.polling.ensure_webhook("https://app.internal/webhook").await.expect("register");
    let second =
        h.polling.ensure_webhook("https://app.internal/webhook").await.expect("reuse");

    assert_eq!(first.id, second.id);
    assert_eq!(h.sheets.call_count("create_webhook"), 1);
}
