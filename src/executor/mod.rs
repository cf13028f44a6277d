pub mod predicate;
pub mod scan;
pub mod select;

use std::{
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
};

use tracing::debug;

use crate::{
    config::Config,
    planner::{logical_plan::Command, parser::SqlParser},
    storage::{btree::BTree, schema::SchemaCatalog, storage_manager::StorageManager},
    types::{SCHEMA_PAGE_ID, error::Result, value::Value},
};

/// The result of one command, before formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    DbInfo { page_size: u32, table_count: u64 },
    Tables(Vec<String>),
    Schema(Vec<String>),
    Count(u64),
    Rows(Vec<Vec<Value>>),
}

impl QueryOutput {
    /// Line-oriented text for standard output, without a trailing newline.
    pub fn render(&self, config: &Config) -> String {
        match self {
            QueryOutput::DbInfo {
                page_size,
                table_count,
            } => format!("database page size: {page_size}\nnumber of tables: {table_count}"),
            QueryOutput::Tables(names) => names.join(&config.table_separator),
            QueryOutput::Schema(statements) => statements
                .iter()
                .map(|sql| format!("{sql};"))
                .collect::<Vec<_>>()
                .join("\n"),
            QueryOutput::Count(count) => count.to_string(),
            QueryOutput::Rows(rows) => rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(Value::to_string)
                        .collect::<Vec<_>>()
                        .join(&config.column_separator)
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Runs commands against one open database file. The schema is re-read for
/// every command.
pub struct Executor<R = BufReader<File>> {
    storage: StorageManager<R>,
    parser: SqlParser,
}

impl Executor<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(StorageManager::open(path)?))
    }
}

impl<R: Read + Seek> Executor<R> {
    pub fn new(storage: StorageManager<R>) -> Self {
        Self {
            storage,
            parser: SqlParser::new(),
        }
    }

    pub fn storage(&mut self) -> &mut StorageManager<R> {
        &mut self.storage
    }

    pub fn run(&mut self, input: &str) -> Result<QueryOutput> {
        let command = self.parser.parse_command(input)?;
        debug!(?command, "parsed command");
        self.execute(&command)
    }

    pub fn execute(&mut self, command: &Command) -> Result<QueryOutput> {
        match command {
            Command::DbInfo => {
                let table_count = BTree::new(&mut self.storage, SCHEMA_PAGE_ID).count_rows()?;
                Ok(QueryOutput::DbInfo {
                    page_size: self.storage.page_size(),
                    table_count,
                })
            }
            Command::Tables => {
                let catalog = SchemaCatalog::load(&mut self.storage)?;
                Ok(QueryOutput::Tables(
                    catalog.table_names().into_iter().map(str::to_string).collect(),
                ))
            }
            Command::Schema => {
                let catalog = SchemaCatalog::load(&mut self.storage)?;
                Ok(QueryOutput::Schema(
                    catalog.sql_statements().into_iter().map(str::to_string).collect(),
                ))
            }
            Command::Select(plan) => {
                let catalog = SchemaCatalog::load(&mut self.storage)?;
                select::execute_select(&mut self.storage, &catalog, plan)
            }
        }
    }
}
