use std::io::{Read, Seek};

use sqlparser::{
    ast::{ColumnOption, CreateIndex, CreateTable, Expr, Statement, TableConstraint},
    dialect::SQLiteDialect,
    parser::Parser,
};
use tracing::debug;

use crate::{
    storage::{btree::BTree, storage_manager::StorageManager},
    types::{
        PageId, SCHEMA_PAGE_ID,
        error::{DatabaseError, Result},
        record::TableLeafCell,
        row::Row,
        value::Value,
    },
};

/// One row of the `sqlite_schema` table.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRecord {
    pub kind: String,
    pub name: String,
    pub table_name: String,
    pub root_page: PageId,
    pub sql: Option<String>,
}

impl SchemaRecord {
    pub fn from_cell(cell: &TableLeafCell) -> Result<Self> {
        let text = |index: usize, field: &str| -> Result<String> {
            match cell.record.get(index) {
                Some(Value::Text(s)) => Ok(s.clone()),
                other => Err(DatabaseError::InvalidRecord {
                    details: format!("schema row {}: {field} is {other:?}", cell.row_id),
                }),
            }
        };

        let root_page = match cell.record.get(3) {
            Some(Value::Integer(page)) if *page >= 0 && *page <= i64::from(u32::MAX) => {
                *page as PageId
            }
            other => {
                return Err(DatabaseError::InvalidRecord {
                    details: format!("schema row {}: root page is {other:?}", cell.row_id),
                });
            }
        };

        let sql = match cell.record.get(4) {
            Some(Value::Text(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => {
                return Err(DatabaseError::InvalidRecord {
                    details: format!("schema row {}: sql is {other:?}", cell.row_id),
                });
            }
        };

        Ok(Self {
            kind: text(0, "type")?,
            name: text(1, "name")?,
            table_name: text(2, "tbl_name")?,
            root_page,
            sql,
        })
    }

    pub fn is_index(&self) -> bool {
        self.kind.eq_ignore_ascii_case("index")
    }

    pub fn is_table(&self) -> bool {
        self.kind.eq_ignore_ascii_case("table")
    }

    pub fn is_view(&self) -> bool {
        self.kind.eq_ignore_ascii_case("view")
    }

    pub fn is_internal(&self) -> bool {
        self.name.to_ascii_lowercase().starts_with("sqlite_")
    }
}

/// Represents a column definition in a table schema
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub declared_type: String,
    pub primary_key: bool,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// An `INTEGER PRIMARY KEY` column stores nothing in the record; the rowid
    /// is its value.
    pub fn is_rowid_alias(&self) -> bool {
        self.primary_key && self.declared_type.eq_ignore_ascii_case("INTEGER")
    }
}

/// Represents a complete table schema with all column definitions
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnSchema>,
    pub root_page_id: PageId,
    pub sql: String,
}

impl TableSchema {
    pub fn new(
        table_name: String,
        columns: Vec<ColumnSchema>,
        root_page_id: PageId,
        sql: String,
    ) -> Self {
        Self {
            table_name,
            columns,
            root_page_id,
            sql,
        }
    }

    pub fn from_record(record: &SchemaRecord) -> Result<Self> {
        let sql = record.sql.clone().ok_or_else(|| DatabaseError::InvalidRecord {
            details: format!("table '{}' has no CREATE statement", record.name),
        })?;
        let columns = parse_table_columns(&sql)?;
        Ok(Self::new(record.name.clone(), columns, record.root_page, sql))
    }

    /// Get column index by name
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn require_column_index(&self, name: &str) -> Result<usize> {
        self.get_column_index(name).ok_or_else(|| DatabaseError::ColumnNotFound {
            name: name.to_string(),
            table: self.table_name.clone(),
        })
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Builds a row from a leaf cell. A rowid alias column whose stored value
    /// has zero length takes the cell's rowid.
    pub fn row_from_cell(&self, cell: TableLeafCell) -> Row {
        let TableLeafCell { row_id, record } = cell;
        let mut values = record.values;
        for (index, column) in self.columns.iter().enumerate() {
            if !column.is_rowid_alias() {
                continue;
            }
            let stored_empty = record
                .serial_types
                .get(index)
                .is_none_or(|serial_type| serial_type.size() == 0);
            if stored_empty {
                if index < values.len() {
                    values[index] = Value::Integer(row_id);
                } else if index == values.len() {
                    values.push(Value::Integer(row_id));
                }
            }
        }
        Row::new(row_id, values)
    }
}

/// A single-column index over a table column.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: String,
    pub table_name: String,
    pub column_name: String,
    pub root_page_id: PageId,
}

impl IndexDefinition {
    pub fn from_record(record: &SchemaRecord) -> Result<Self> {
        let sql = record.sql.as_deref().ok_or_else(|| DatabaseError::UnsupportedIndex {
            details: format!("index '{}' is an automatic index", record.name),
        })?;
        let (table_name, column_name) = parse_index_column(sql)?;
        Ok(Self {
            name: record.name.clone(),
            table_name,
            column_name,
            root_page_id: record.root_page,
        })
    }

    pub fn covers(&self, table_name: &str, column_name: &str) -> bool {
        self.table_name.eq_ignore_ascii_case(table_name)
            && self.column_name.eq_ignore_ascii_case(column_name)
    }
}

/// The decoded contents of the schema table.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    pub records: Vec<SchemaRecord>,
}

impl SchemaCatalog {
    pub fn load<R: Read + Seek>(storage: &mut StorageManager<R>) -> Result<Self> {
        let mut records = Vec::new();
        BTree::new(storage, SCHEMA_PAGE_ID).scan_table(|cell| {
            records.push(SchemaRecord::from_cell(&cell)?);
            Ok(())
        })?;
        debug!(entries = records.len(), "loaded schema");
        Ok(Self { records })
    }

    /// Resolves a table (or view) name; index rows never match.
    pub fn table(&self, name: &str) -> Result<TableSchema> {
        let record = self
            .records
            .iter()
            .find(|r| !r.is_index() && r.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| DatabaseError::TableNotFound { name: name.to_string() })?;
        TableSchema::from_record(record)
    }

    /// Finds an index whose single column is `column_name` on `table_name`.
    ///
    /// Automatic indexes (no CREATE statement) are ignored. Any other index on
    /// the table that is not a plain single-column index is an error.
    pub fn find_index(
        &self,
        table_name: &str,
        column_name: &str,
    ) -> Result<Option<IndexDefinition>> {
        let mut found = None;
        for record in self
            .records
            .iter()
            .filter(|r| r.is_index() && r.table_name.eq_ignore_ascii_case(table_name))
        {
            if record.sql.is_none() {
                debug!(index = %record.name, "ignoring automatic index");
                continue;
            }
            let index = IndexDefinition::from_record(record)?;
            if found.is_none() && index.covers(table_name, column_name) {
                found = Some(index);
            }
        }
        Ok(found)
    }

    /// Names listed by `.tables`: user tables and views.
    pub fn table_names(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| (r.is_table() || r.is_view()) && !r.is_internal())
            .map(|r| r.name.as_str())
            .collect()
    }

    pub fn sql_statements(&self) -> Vec<&str> {
        self.records.iter().filter_map(|r| r.sql.as_deref()).collect()
    }
}

fn parse_statement(sql: &str) -> Result<Statement> {
    let dialect = SQLiteDialect {};
    let mut statements = Parser::parse_sql(&dialect, sql).map_err(|e| DatabaseError::SqlParseError {
        details: e.to_string(),
    })?;
    if statements.len() != 1 {
        return Err(DatabaseError::SqlParseError {
            details: format!("expected one schema statement, found {}", statements.len()),
        });
    }
    Ok(statements.remove(0))
}

/// Extracts the column list of a `CREATE TABLE` statement.
pub fn parse_table_columns(sql: &str) -> Result<Vec<ColumnSchema>> {
    let create = match parse_statement(sql) {
        Ok(Statement::CreateTable(create)) => create,
        Ok(other) => {
            return Err(DatabaseError::SqlParseError {
                details: format!("expected CREATE TABLE, found {other}"),
            });
        }
        Err(e) => {
            debug!(error = %e, "falling back to column list splitting");
            return split_column_definitions(sql);
        }
    };
    Ok(columns_from_create(&create))
}

fn columns_from_create(create: &CreateTable) -> Vec<ColumnSchema> {
    let table_primary_key: Vec<String> = create
        .constraints
        .iter()
        .find_map(|constraint| match constraint {
            TableConstraint::PrimaryKey { columns, .. } => {
                Some(columns.iter().map(|ident| ident.value.clone()).collect())
            }
            _ => None,
        })
        .unwrap_or_default();

    create
        .columns
        .iter()
        .map(|def| {
            let inline_primary_key = def
                .options
                .iter()
                .any(|opt| matches!(opt.option, ColumnOption::Unique { is_primary: true, .. }));
            let constraint_primary_key = table_primary_key.len() == 1
                && table_primary_key[0].eq_ignore_ascii_case(&def.name.value);
            let column = ColumnSchema::new(def.name.value.clone(), def.data_type.to_string());
            if inline_primary_key || constraint_primary_key {
                column.primary_key()
            } else {
                column
            }
        })
        .collect()
}

/// Splits the parenthesised body of a `CREATE TABLE` on commas, taking the
/// first token as the name and the second as the declared type. Used for
/// SQLite syntax the SQL parser rejects.
fn split_column_definitions(sql: &str) -> Result<Vec<ColumnSchema>> {
    let (open, close) = match (sql.find('('), sql.rfind(')')) {
        (Some(open), Some(close)) if open < close => (open, close),
        _ => {
            return Err(DatabaseError::SqlParseError {
                details: format!("no column list in '{sql}'"),
            });
        }
    };

    let mut columns = Vec::new();
    for definition in sql[open + 1..close].split(',') {
        let tokens: Vec<&str> = definition.split_whitespace().collect();
        let Some(first) = tokens.first() else {
            continue;
        };
        let keyword = first.to_ascii_uppercase();
        if matches!(keyword.as_str(), "PRIMARY" | "UNIQUE" | "CHECK" | "FOREIGN" | "CONSTRAINT") {
            continue;
        }
        let name = first.trim_matches(|c| matches!(c, '"' | '`' | '[' | ']'));
        let declared_type = tokens
            .get(1)
            .filter(|t| {
                !matches!(
                    t.to_ascii_uppercase().as_str(),
                    "PRIMARY" | "NOT" | "UNIQUE" | "DEFAULT"
                )
            })
            .copied()
            .unwrap_or("");
        let lowered = definition.to_ascii_lowercase();
        let column = ColumnSchema::new(name, declared_type);
        columns.push(if lowered.contains("primary key") {
            column.primary_key()
        } else {
            column
        });
    }
    Ok(columns)
}

/// Extracts `(table, column)` from a single-column `CREATE INDEX` statement.
pub fn parse_index_column(sql: &str) -> Result<(String, String)> {
    let create = match parse_statement(sql)? {
        Statement::CreateIndex(create) => create,
        other => {
            return Err(DatabaseError::UnsupportedIndex {
                details: format!("expected CREATE INDEX, found {other}"),
            });
        }
    };
    index_column_from_create(&create)
}

fn index_column_from_create(create: &CreateIndex) -> Result<(String, String)> {
    let table_name = create
        .table_name
        .0
        .last()
        .map(|ident| ident.value.clone())
        .ok_or_else(|| DatabaseError::UnsupportedIndex {
            details: "index without a table".to_string(),
        })?;

    let [column] = create.columns.as_slice() else {
        return Err(DatabaseError::UnsupportedIndex {
            details: format!(
                "{} columns on {table_name}; only single-column indexes are supported",
                create.columns.len()
            ),
        });
    };

    match &column.expr {
        Expr::Identifier(ident) => Ok((table_name, ident.value.clone())),
        Expr::CompoundIdentifier(parts) => match parts.last() {
            Some(ident) => Ok((table_name, ident.value.clone())),
            None => Err(DatabaseError::UnsupportedIndex {
                details: "empty column name".to_string(),
            }),
        },
        other => Err(DatabaseError::UnsupportedIndex {
            details: format!("expression index on {other}"),
        }),
    }
}
