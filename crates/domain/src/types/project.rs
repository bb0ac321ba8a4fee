//! Portfolio project types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants;

/// Links to the remote workspace provisioned for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub folder_id: i64,
    pub sheet_id: i64,
    pub remote_url: String,
    pub internal_url: String,
}

/// One portfolio entry.
///
/// At most one non-deleted project exists per business code, and at most
/// one workspace per project; `workspace` being populated is what makes
/// re-running provisioning a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    /// Unique external business code (e.g. "PRJ-042").
    pub business_code: String,
    pub title: String,
    /// Approval value as read from the portfolio row.
    pub approval_status: String,
    /// Row id of this entry in the portfolio sheet.
    pub portfolio_row_id: Option<i64>,
    pub workspace: Option<Workspace>,
    /// Used by the polling fallback to skip rows that have not changed.
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn is_approved(&self) -> bool {
        self.approval_status == constants::APPROVAL_APPROVED
    }

    pub fn is_provisioned(&self) -> bool {
        self.workspace.is_some()
    }

    /// True exactly when the provisioning workflow should run.
    pub fn needs_provisioning(&self) -> bool {
        self.is_approved() && !self.is_provisioned()
    }
}
