//! Column-title based row access
//!
//! Decouples the rest of the system from the remote schema's column
//! ordering: numeric column ids differ between environments, titles do
//! not. A [`ColumnMap`] is built once per sheet fetch; accessors and
//! drafts then address cells by semantic title.

use std::collections::HashMap;

use plansync_domain::constants::FORMULA_COLUMNS;
use plansync_domain::{Cell, Column, PlansyncError, Result, SheetRow};

/// Title → column id mapping for one sheet.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    by_title: HashMap<String, i64>,
}

impl ColumnMap {
    /// Build the map, requiring every listed title to be present.
    ///
    /// A missing required column is a schema drift problem and is
    /// rejected before any cell access happens.
    pub fn from_columns(columns: &[Column], required: &[&str]) -> Result<Self> {
        let by_title: HashMap<String, i64> =
            columns.iter().map(|c| (c.title.clone(), c.id)).collect();

        for title in required {
            if !by_title.contains_key(*title) {
                return Err(PlansyncError::Validation(format!(
                    "sheet is missing required column '{title}'"
                )));
            }
        }

        Ok(Self { by_title })
    }

    pub fn id(&self, title: &str) -> Result<i64> {
        self.by_title
            .get(title)
            .copied()
            .ok_or_else(|| PlansyncError::Validation(format!("unknown column '{title}'")))
    }

    pub fn contains(&self, title: &str) -> bool {
        self.by_title.contains_key(title)
    }
}

/// Read access to one row's cells by column title.
pub struct RowAccessor<'a> {
    columns: &'a ColumnMap,
    row: &'a SheetRow,
}

impl<'a> RowAccessor<'a> {
    pub fn new(columns: &'a ColumnMap, row: &'a SheetRow) -> Self {
        Self { columns, row }
    }

    pub fn cell(&self, title: &str) -> Option<&'a Cell> {
        let column_id = self.columns.id(title).ok()?;
        self.row.cells.iter().find(|cell| cell.column_id == column_id)
    }

    /// String value of the named cell, if present and textual.
    pub fn text(&self, title: &str) -> Option<&'a str> {
        self.cell(title).and_then(Cell::as_str)
    }
}

/// Builds the cell list for a row write, by column title.
///
/// Formula-bearing columns are refused at this level so no patch payload
/// can carry them, whatever the caller does.
#[derive(Debug)]
pub struct RowDraft<'a> {
    columns: &'a ColumnMap,
    cells: Vec<Cell>,
}

impl<'a> RowDraft<'a> {
    pub fn new(columns: &'a ColumnMap) -> Self {
        Self { columns, cells: Vec::new() }
    }

    pub fn set_text(mut self, title: &str, value: impl Into<String>) -> Result<Self> {
        self.guard_formula(title)?;
        let column_id = self.columns.id(title)?;
        self.cells.push(Cell::text(column_id, value));
        Ok(self)
    }

    pub fn set_link(
        mut self,
        title: &str,
        label: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<Self> {
        self.guard_formula(title)?;
        let column_id = self.columns.id(title)?;
        self.cells.push(Cell::link(column_id, label, url));
        Ok(self)
    }

    /// Like `set_text` but a `None` value is simply skipped.
    pub fn set_opt_text(self, title: &str, value: Option<&str>) -> Result<Self> {
        match value {
            Some(value) => self.set_text(title, value),
            None => Ok(self),
        }
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    fn guard_formula(&self, title: &str) -> Result<()> {
        if FORMULA_COLUMNS.contains(&title) {
            return Err(PlansyncError::Validation(format!(
                "column '{title}' is formula-derived and never written"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use plansync_domain::constants::{COL_NAME, COL_STATUS, COL_VARIANCE};

    use super::*;

    fn columns() -> Vec<Column> {
        vec![
            Column { id: 10, title: COL_NAME.to_string() },
            Column { id: 11, title: COL_STATUS.to_string() },
            Column { id: 12, title: COL_VARIANCE.to_string() },
        ]
    }

    #[test]
    fn resolves_titles_regardless_of_ordering() {
        let map = ColumnMap::from_columns(&columns(), &[COL_NAME]).expect("map");
        assert_eq!(map.id(COL_NAME).expect("id"), 10);
        assert_eq!(map.id(COL_STATUS).expect("id"), 11);
        assert!(map.id("No Such Column").is_err());
    }

    #[test]
    fn missing_required_column_is_rejected_up_front() {
        let err = ColumnMap::from_columns(&columns(), &["Owner"]).expect_err("must fail");
        assert_eq!(err.label(), "validation");
    }

    #[test]
    fn accessor_reads_by_title() {
        let map = ColumnMap::from_columns(&columns(), &[]).expect("map");
        let row = SheetRow {
            id: 1,
            parent_id: None,
            locked: None,
            cells: vec![Cell::text(10, "Phase 1"), Cell::text(11, "Blocked")],
            modified_at: None,
        };

        let accessor = RowAccessor::new(&map, &row);
        assert_eq!(accessor.text(COL_NAME), Some("Phase 1"));
        assert_eq!(accessor.text(COL_STATUS), Some("Blocked"));
        assert_eq!(accessor.text(COL_VARIANCE), None);
    }

    #[test]
    fn draft_refuses_formula_columns() {
        let map = ColumnMap::from_columns(&columns(), &[]).expect("map");

        let err = RowDraft::new(&map).set_text(COL_VARIANCE, "12.5").expect_err("must fail");
        assert_eq!(err.label(), "validation");

        let cells = RowDraft::new(&map)
            .set_text(COL_NAME, "Phase 1")
            .and_then(|d| d.set_opt_text(COL_STATUS, None))
            .map(RowDraft::into_cells)
            .expect("draft");
        assert_eq!(cells.len(), 1);
    }
}
