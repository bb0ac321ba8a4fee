//! Wire types for the remote spreadsheet service
//!
//! Rows are flat lists of `{column_id, value}` cells. Column identity is
//! resolved by title before use; numeric ids are not stable across
//! environments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperlink {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(rename = "columnId")]
    pub column_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<Hyperlink>,
}

impl Cell {
    pub fn text(column_id: i64, value: impl Into<String>) -> Self {
        Self {
            column_id,
            value: Some(serde_json::Value::String(value.into())),
            hyperlink: None,
        }
    }

    pub fn link(column_id: i64, label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            column_id,
            value: Some(serde_json::Value::String(label.into())),
            hyperlink: Some(Hyperlink { url: url.into() }),
        }
    }

    /// Cell value rendered as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(serde_json::Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetRow {
    pub id: i64,
    #[serde(rename = "parentId", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    /// Header rows are locked in the remote sheet; imports map this to
    /// the local skip flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    pub cells: Vec<Cell>,
    #[serde(rename = "modifiedAt", skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl SheetRow {
    pub fn is_locked(&self) -> bool {
        self.locked.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
    pub columns: Vec<Column>,
    pub rows: Vec<SheetRow>,
}

/// Placement of a newly created row.
///
/// The remote API positions a new row either as first child of a parent
/// or directly after a named sibling, which is why creates cannot batch:
/// each one needs the previous sibling's freshly assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowPosition {
    /// Top of the sheet (root item with no predecessor).
    Top,
    FirstChildOf { parent_row_id: i64 },
    After { sibling_row_id: i64 },
}

/// Payload for a single-row create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRow {
    pub position: RowPosition,
    pub cells: Vec<Cell>,
}

/// One entry of a batched update call, keyed by remote row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowUpdate {
    pub row_id: i64,
    pub cells: Vec<Cell>,
}

/// Named child of a folder listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderEntry {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub sheets: Vec<FolderEntry>,
    #[serde(default)]
    pub folders: Vec<FolderEntry>,
    #[serde(default)]
    pub reports: Vec<FolderEntry>,
    #[serde(default)]
    pub dashboards: Vec<FolderEntry>,
}

/// One row-level event in a webhook callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "objectType")]
    pub object_type: String,
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "rowId")]
    pub row_id: i64,
}

impl WebhookEvent {
    /// Only row created/updated events are processed; everything else in
    /// the callback is ignored.
    pub fn is_row_change(&self) -> bool {
        self.object_type == "row" && matches!(self.event_type.as_str(), "created" | "updated")
    }
}

/// Webhook callback payload as delivered by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookCallback {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

/// A webhook subscription registered on the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookSubscription {
    pub id: i64,
    pub name: String,
    #[serde(rename = "callbackUrl")]
    pub callback_url: String,
    pub enabled: bool,
}
