//! Wire DTOs for the remote spreadsheet API

use plansync_domain::{Cell, NewRow, RowPosition, RowUpdate};
use serde::{Deserialize, Serialize};

/// Row payload for create and update calls.
///
/// Creates position the row via exactly one of `to_top`, `parent_id`, or
/// `sibling_id`; updates carry the row `id` instead.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowWritePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_top: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sibling_id: Option<i64>,
    pub cells: Vec<Cell>,
}

impl From<NewRow> for RowWritePayload {
    fn from(row: NewRow) -> Self {
        let (to_top, parent_id, sibling_id) = match row.position {
            RowPosition::Top => (Some(true), None, None),
            RowPosition::FirstChildOf { parent_row_id } => (None, Some(parent_row_id), None),
            RowPosition::After { sibling_row_id } => (None, None, Some(sibling_row_id)),
        };
        Self { id: None, to_top, parent_id, sibling_id, cells: row.cells }
    }
}

impl From<RowUpdate> for RowWritePayload {
    fn from(update: RowUpdate) -> Self {
        Self {
            id: Some(update.row_id),
            to_top: None,
            parent_id: None,
            sibling_id: None,
            cells: update.cells,
        }
    }
}

/// Single-object response envelope (`{"result": ...}`).
#[derive(Debug, Deserialize)]
pub struct ResultEnvelope<T> {
    pub result: T,
}

/// Listing response envelope (`{"data": [...]}`).
#[derive(Debug, Deserialize)]
pub struct ListEnvelope<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct CreateFolderRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyRequest {
    pub new_name: String,
    pub destination_id: i64,
    pub destination_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub name: String,
    pub callback_url: String,
    pub scope: &'static str,
    pub scope_object_id: i64,
    pub version: u32,
}

/// Error body shape returned by the remote service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_payload_carries_exactly_one_position_marker() {
        let top: RowWritePayload =
            NewRow { position: RowPosition::Top, cells: Vec::new() }.into();
        let json = serde_json::to_value(&top).expect("serialize");
        assert_eq!(json["toTop"], true);
        assert!(json.get("parentId").is_none());
        assert!(json.get("siblingId").is_none());

        let child: RowWritePayload =
            NewRow { position: RowPosition::FirstChildOf { parent_row_id: 9 }, cells: Vec::new() }
                .into();
        let json = serde_json::to_value(&child).expect("serialize");
        assert_eq!(json["parentId"], 9);
        assert!(json.get("toTop").is_none());
    }

    #[test]
    fn update_payload_is_keyed_by_row_id() {
        let update: RowWritePayload =
            RowUpdate { row_id: 31, cells: vec![Cell::text(2, "x")] }.into();
        let json = serde_json::to_value(&update).expect("serialize");
        assert_eq!(json["id"], 31);
        assert!(json.get("siblingId").is_none());
    }
}
