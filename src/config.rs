//! Runtime configuration, read from an optional TOML file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::error::{DatabaseError, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Joins the columns of a result row.
    #[serde(default = "default_column_separator")]
    pub column_separator: String,

    /// Joins the names printed by `.tables`.
    #[serde(default = "default_table_separator")]
    pub table_separator: String,

    /// Default log filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// REPL history file.
    #[serde(default)]
    pub history_file: Option<PathBuf>,
}

fn default_column_separator() -> String {
    "|".to_string()
}

fn default_table_separator() -> String {
    " ".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            column_separator: default_column_separator(),
            table_separator: default_table_separator(),
            log_level: default_log_level(),
            history_file: None,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DatabaseError::Config {
            details: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DatabaseError::Config {
            details: e.to_string(),
        })
    }
}
