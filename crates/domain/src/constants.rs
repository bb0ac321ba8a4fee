//! Remote schema constants
//!
//! The column mapping is fixed to a known set of titles. Titles are stable
//! across environments; numeric column ids are not, so every sheet fetch
//! resolves titles to ids before any cell access.

// Column titles in the WBS sheet
pub const COL_NAME: &str = "Task Name";
pub const COL_DESCRIPTION: &str = "Description";
pub const COL_OWNER: &str = "Owner";
pub const COL_APPROVER: &str = "Approver";
pub const COL_STATUS: &str = "Status";
pub const COL_START_DATE: &str = "Start Date";
pub const COL_END_DATE: &str = "End Date";
pub const COL_BUDGET: &str = "Budget";
pub const COL_ACTUAL: &str = "Actual";
pub const COL_VARIANCE: &str = "Variance";
pub const COL_NOTES: &str = "Notes";

// Column titles in the portfolio sheet
pub const COL_PROJECT_CODE: &str = "Project Code";
pub const COL_PROJECT_TITLE: &str = "Project Title";
pub const COL_APPROVAL: &str = "Approval";
pub const COL_WBS_LINK: &str = "WBS Link";
pub const COL_APP_LINK: &str = "App Link";
pub const COL_MODIFIED_AT: &str = "Last Updated";

/// Columns whose values are remote formulas; never written back.
pub const FORMULA_COLUMNS: &[&str] = &[COL_VARIANCE];

/// Full column set expected on a WBS sheet.
pub const WBS_COLUMNS: &[&str] = &[
    COL_NAME,
    COL_DESCRIPTION,
    COL_OWNER,
    COL_APPROVER,
    COL_STATUS,
    COL_START_DATE,
    COL_END_DATE,
    COL_BUDGET,
    COL_ACTUAL,
    COL_VARIANCE,
    COL_NOTES,
];

/// Column set expected on the portfolio sheet.
pub const PORTFOLIO_COLUMNS: &[&str] =
    &[COL_PROJECT_CODE, COL_PROJECT_TITLE, COL_APPROVAL, COL_WBS_LINK, COL_APP_LINK];

/// Approval value that triggers workspace provisioning.
pub const APPROVAL_APPROVED: &str = "Approved";

/// Status values the remote dropdown accepts.
pub const STATUS_NOT_STARTED: &str = "Not Started";
pub const STATUS_IN_PROGRESS: &str = "In Progress";
pub const STATUS_BLOCKED: &str = "Blocked";
pub const STATUS_COMPLETE: &str = "Complete";

/// Deterministic workspace folder name for a project business code.
pub fn workspace_folder_name(business_code: &str) -> String {
    format!("WBS (#{business_code})")
}

/// Prefix marking ids minted by the UI before first persistence.
pub const TEMP_ID_PREFIX: &str = "tmp-";
