//! Append-only audit records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable record of one mutating operation.
///
/// Written alongside every mutation as a side effect; never updated or
/// deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub actor: String,
    pub action: String,
    pub target: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn record(
        actor: impl Into<String>,
        action: impl Into<String>,
        target: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            actor: actor.into(),
            action: action.into(),
            target: target.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_stamps_identity_and_time() {
        let entry = AuditEntry::record(
            "system",
            "wbs.save",
            "project:p1",
            serde_json::json!({"created": 2}),
        );

        assert!(!entry.id.is_empty());
        assert_eq!(entry.action, "wbs.save");
        assert_eq!(entry.payload["created"], 2);
    }
}
