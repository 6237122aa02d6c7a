use crate::domain::CedError;

// One named column holding all of its cell values as strings.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub data: Vec<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, data: Vec<String>) -> Self {
        Column {
            name: name.into(),
            data,
        }
    }
}

// The editable in-memory copy of a csv file. Column order is the order of
// the header row, row order is file order and is never resorted. Every cell
// is a string, missing values are empty strings.
#[derive(Debug, Default)]
pub struct Table {
    columns: Vec<Column>,
    dirty: bool,
}

impl Table {
    pub fn empty() -> Self {
        Table {
            columns: Vec::new(),
            dirty: false,
        }
    }

    // Replaces any prior table wholesale. Taking the columns by value means
    // edits can never reach back into the structures of the loader.
    pub fn load(columns: Vec<Column>) -> Result<Self, CedError> {
        if let Some(first) = columns.first() {
            let rows = first.data.len();
            if let Some(ragged) = columns.iter().find(|c| c.data.len() != rows) {
                return Err(CedError::LoadingFailed(format!(
                    "column \"{}\" has {} rows, expected {}",
                    ragged.name,
                    ragged.data.len(),
                    rows
                )));
            }
        }
        Ok(Table {
            columns,
            dirty: false,
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn cell(&self, row: usize, column: &str) -> Result<&str, CedError> {
        let col = self.find_column(column)?;
        col.data
            .get(row)
            .map(|v| v.as_str())
            .ok_or(CedError::OutOfRange {
                index: row,
                rows: self.row_count(),
            })
    }

    // Replaces a single cell value. Row count and column set are untouched,
    // a failed call leaves the table unmodified.
    pub fn set_cell(&mut self, row: usize, column: &str, value: String) -> Result<(), CedError> {
        let rows = self.row_count();
        if row >= rows {
            return Err(CedError::OutOfRange { index: row, rows });
        }
        let col = self
            .columns
            .iter_mut()
            .find(|c| c.name == column)
            .ok_or_else(|| CedError::UnknownColumn(column.to_string()))?;
        col.data[row] = value;
        self.dirty = true;
        Ok(())
    }

    // Cell values of one row in column order.
    pub fn record(&self, row: usize) -> Result<Vec<&str>, CedError> {
        let rows = self.row_count();
        if row >= rows {
            return Err(CedError::OutOfRange { index: row, rows });
        }
        Ok(self.columns.iter().map(|c| c.data[row].as_str()).collect())
    }

    fn find_column(&self, name: &str) -> Result<&Column, CedError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| CedError::UnknownColumn(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::load(vec![
            Column::new("name", vec!["Al".into(), "Bo".into(), "Cy".into()]),
            Column::new("age", vec!["30".into(), "25".into(), "40".into()]),
        ])
        .unwrap()
    }

    #[test]
    fn set_cell_replaces_value_only() {
        let mut table = sample();
        table.set_cell(1, "age", "26".to_string()).unwrap();
        assert_eq!(table.cell(1, "age").unwrap(), "26");
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_names(), vec!["name", "age"]);
        assert!(table.dirty());
    }

    #[test]
    fn set_cell_out_of_range_leaves_table_unmodified() {
        let mut table = sample();
        let err = table.set_cell(3, "age", "99".to_string()).unwrap_err();
        assert!(matches!(err, CedError::OutOfRange { index: 3, rows: 3 }));
        assert_eq!(table.cell(2, "age").unwrap(), "40");
        assert!(!table.dirty());
    }

    #[test]
    fn set_cell_unknown_column() {
        let mut table = sample();
        let err = table.set_cell(0, "salary", "1".to_string()).unwrap_err();
        assert!(matches!(err, CedError::UnknownColumn(name) if name == "salary"));
        assert!(!table.dirty());
    }

    #[test]
    fn empty_table_has_no_columns() {
        let table = Table::empty();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 0);
        assert!(table.column_names().is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn load_rejects_ragged_columns() {
        let err = Table::load(vec![
            Column::new("a", vec!["1".into(), "2".into()]),
            Column::new("b", vec!["x".into()]),
        ])
        .unwrap_err();
        assert!(matches!(err, CedError::LoadingFailed(_)));
    }

    #[test]
    fn record_returns_values_in_column_order() {
        let table = sample();
        assert_eq!(table.record(0).unwrap(), vec!["Al", "30"]);
        assert!(matches!(
            table.record(5),
            Err(CedError::OutOfRange { index: 5, rows: 3 })
        ));
    }
}
