//! Structured reconciliation results

use serde::{Deserialize, Serialize};

/// One failed item within a bulk operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncItemError {
    pub item_name: String,
    pub message: String,
}

/// Overall verdict of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Succeeded,
    PartialFailure,
    Failed,
}

/// Aggregate result of one reconciliation pass.
///
/// Per-row failures are collected here rather than thrown, so the caller
/// can report "created 8, failed 2" instead of all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub updated: usize,
    pub created: usize,
    pub deleted: usize,
    pub errors: Vec<SyncItemError>,
}

impl SyncReport {
    pub fn push_error(&mut self, item_name: impl Into<String>, message: impl Into<String>) {
        self.errors.push(SyncItemError { item_name: item_name.into(), message: message.into() });
    }

    pub fn outcome(&self) -> SyncOutcome {
        if self.errors.is_empty() {
            SyncOutcome::Succeeded
        } else if self.updated + self.created + self.deleted > 0 {
            SyncOutcome::PartialFailure
        } else {
            SyncOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_reflects_error_mix() {
        let mut report = SyncReport::default();
        assert_eq!(report.outcome(), SyncOutcome::Succeeded);

        report.created = 8;
        report.push_error("Task 9", "rate limited");
        assert_eq!(report.outcome(), SyncOutcome::PartialFailure);

        let mut all_failed = SyncReport::default();
        all_failed.push_error("Task 1", "auth rejected");
        assert_eq!(all_failed.outcome(), SyncOutcome::Failed);
    }
}
