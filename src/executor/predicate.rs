use crate::{
    storage::schema::TableSchema,
    types::{error::Result, row::Row, value::Value},
};

/// `column = value`, bound to a column position of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column_name: String,
    pub column_index: usize,
    pub value: Value,
}

impl Predicate {
    pub fn equals(table: &TableSchema, column_name: &str, value: Value) -> Result<Self> {
        let column_index = table.require_column_index(column_name)?;
        Ok(Self {
            column_name: column_name.to_string(),
            column_index,
            value,
        })
    }

    /// Compares textual forms. NULL on either side never matches.
    pub fn matches(&self, row: &Row) -> bool {
        match row.get_value(self.column_index) {
            Some(stored) if !stored.is_null() && !self.value.is_null() => {
                stored.text_eq(&self.value)
            }
            _ => false,
        }
    }
}
