//! Work breakdown structure item types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::errors::{PlansyncError, Result};

/// Reference to a parent item.
///
/// An item may be referenced either by its locally-owned permanent id or
/// by the remote row id it was linked to; both are valid keys into the
/// same lookup table. Keeping the two spaces in one sum type means they
/// can never be silently confused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ParentRef {
    Permanent(String),
    Remote(i64),
}

impl ParentRef {
    /// True when the reference is a UI-minted temporary id that has not
    /// been persisted yet.
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Permanent(id) if id.starts_with(constants::TEMP_ID_PREFIX))
    }
}

/// Item status.
///
/// The remote dropdown accepts only the four named values. Anything else
/// is legal locally and mapped down before a remote write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WbsStatus {
    NotStarted,
    InProgress,
    Blocked,
    Complete,
    Other(String),
}

impl Default for WbsStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl From<String> for WbsStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            constants::STATUS_NOT_STARTED => Self::NotStarted,
            constants::STATUS_IN_PROGRESS => Self::InProgress,
            constants::STATUS_BLOCKED => Self::Blocked,
            constants::STATUS_COMPLETE => Self::Complete,
            _ => Self::Other(raw),
        }
    }
}

impl From<WbsStatus> for String {
    fn from(status: WbsStatus) -> Self {
        match status {
            WbsStatus::NotStarted => constants::STATUS_NOT_STARTED.to_string(),
            WbsStatus::InProgress => constants::STATUS_IN_PROGRESS.to_string(),
            WbsStatus::Blocked => constants::STATUS_BLOCKED.to_string(),
            WbsStatus::Complete => constants::STATUS_COMPLETE.to_string(),
            WbsStatus::Other(raw) => raw,
        }
    }
}

impl WbsStatus {
    /// Map to a value the remote dropdown accepts.
    ///
    /// `Other` statuses collapse deterministically: hold-like values map
    /// to Blocked, closed-like values to Complete, everything else to
    /// In Progress.
    pub fn remote_value(&self) -> &'static str {
        match self {
            Self::NotStarted => constants::STATUS_NOT_STARTED,
            Self::InProgress => constants::STATUS_IN_PROGRESS,
            Self::Blocked => constants::STATUS_BLOCKED,
            Self::Complete => constants::STATUS_COMPLETE,
            Self::Other(raw) => match raw.to_lowercase().as_str() {
                "on hold" | "paused" | "waiting" => constants::STATUS_BLOCKED,
                "done" | "closed" | "cancelled" => constants::STATUS_COMPLETE,
                _ => constants::STATUS_IN_PROGRESS,
            },
        }
    }
}

/// One cached row of the breakdown structure.
///
/// Position code, depth, and completion rollup are derived on every read
/// and never stored here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WbsItem {
    /// Locally-owned permanent id, assigned at persistence time.
    pub id: Option<String>,
    /// UI-minted id carried until the item is first persisted.
    pub temp_id: Option<String>,
    /// Row id in the remote sheet, assigned once the item exists remotely.
    pub remote_row_id: Option<i64>,
    pub project_id: String,
    pub parent: Option<ParentRef>,
    pub name: String,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub approver: Option<String>,
    #[serde(default)]
    pub status: WbsStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Currency amounts are decimal strings, never floats.
    pub budget: Option<String>,
    pub actual: Option<String>,
    /// Formula-derived on the remote side; read back, never written.
    pub variance: Option<String>,
    pub notes: Option<String>,
    /// Header row: excluded from numbering and from remote field sync.
    #[serde(default)]
    pub skip: bool,
    /// Sibling order within the parent.
    #[serde(default)]
    pub order_index: i64,
}

impl WbsItem {
    /// The identity this item is addressable by right now: the permanent
    /// id once assigned, the temporary id before that.
    pub fn local_key(&self) -> Option<&str> {
        self.id.as_deref().or(self.temp_id.as_deref())
    }

    /// True until the item has been persisted locally.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Reject malformed input before any remote call is attempted.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PlansyncError::Validation("item name must not be empty".into()));
        }
        if self.id.is_none() && self.temp_id.is_none() {
            return Err(PlansyncError::Validation(format!(
                "item '{}' carries neither a permanent nor a temporary id",
                self.name
            )));
        }
        for (field, value) in
            [("budget", &self.budget), ("actual", &self.actual), ("variance", &self.variance)]
        {
            if let Some(raw) = value {
                if !is_decimal_string(raw) {
                    return Err(PlansyncError::Validation(format!(
                        "item '{}': {field} '{raw}' is not a decimal string",
                        self.name
                    )));
                }
            }
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(PlansyncError::Validation(format!(
                    "item '{}': end date precedes start date",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Currency-safe decimal check: optional sign, digits, at most one point.
fn is_decimal_string(raw: &str) -> bool {
    let body = raw.strip_prefix('-').unwrap_or(raw);
    if body.is_empty() {
        return false;
    }
    let mut points = 0usize;
    for ch in body.chars() {
        match ch {
            '0'..='9' => {}
            '.' => points += 1,
            _ => return false,
        }
    }
    points <= 1 && body != "."
}
