use crate::types::{RowId, value::Value};

/// A table row as stored: its rowid key and one value per declared column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub row_id: RowId,
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(row_id: RowId, values: Vec<Value>) -> Self {
        Self { row_id, values }
    }

    pub fn get_value(&self, column_index: usize) -> Option<&Value> {
        self.values.get(column_index)
    }

    /// Picks the values at `indices`, in that order. Missing columns (rows
    /// written before an ALTER TABLE ADD COLUMN) read as NULL.
    pub fn project(&self, indices: &[usize]) -> Vec<Value> {
        indices
            .iter()
            .map(|&i| self.values.get(i).cloned().unwrap_or(Value::Null))
            .collect()
    }
}
