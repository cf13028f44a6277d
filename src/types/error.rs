use thiserror::Error;

use crate::types::PageId;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(std::io::Error),

    #[error("Unexpected end of data while reading {context}")]
    UnexpectedEof { context: String },

    #[error("Invalid database header: {reason}")]
    InvalidHeader { reason: String },

    #[error("Invalid page type: {0:#04x}")]
    InvalidPageType(u8),

    #[error("Corrupted page: page_id={page_id}, reason={reason}")]
    CorruptedPage { page_id: PageId, reason: String },

    #[error("Invalid record: {details}")]
    InvalidRecord { details: String },

    #[error("Index entry has a non-integer rowid: {details}")]
    InvalidIndexRowId { details: String },

    #[error("Unsupported index definition: {details}")]
    UnsupportedIndex { details: String },

    #[error("Table '{name}' not found")]
    TableNotFound { name: String },

    #[error("Column '{name}' not found in table '{table}'")]
    ColumnNotFound { name: String, table: String },

    #[error("SQL parsing error: {details}")]
    SqlParseError { details: String },

    #[error("Unsupported command: {command}")]
    UnsupportedCommand { command: String },

    #[error("Configuration error: {details}")]
    Config { details: String },
}

impl From<std::io::Error> for DatabaseError {
    fn from(value: std::io::Error) -> Self {
        match value.kind() {
            std::io::ErrorKind::UnexpectedEof => DatabaseError::UnexpectedEof {
                context: "database file".to_string(),
            },
            _ => DatabaseError::Io(value),
        }
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
