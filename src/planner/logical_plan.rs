use crate::types::value::Value;

/// A parsed command, ready for the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `.dbinfo`: page size and number of schema entries.
    DbInfo,
    /// `.tables`: names of user tables.
    Tables,
    /// `.schema`: defining SQL of every schema entry.
    Schema,
    Select(SelectPlan),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectPlan {
    pub table_name: String,
    pub projection: Projection,
    pub filter: Option<FilterPlan>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `COUNT(*)`
    CountStar,
    /// `*`
    All,
    Columns(Vec<String>),
}

/// `column = value`
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPlan {
    pub column_name: String,
    pub value: Value,
}
