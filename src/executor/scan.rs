use std::io::{Read, Seek};

use tracing::debug;

use crate::{
    executor::predicate::Predicate,
    storage::{btree::BTree, schema::TableSchema, storage_manager::StorageManager},
    types::{RowId, error::Result, row::Row},
};

/// Receives decoded rows as the traversal produces them.
pub trait RowSink {
    fn accept(&mut self, row: Row) -> Result<()>;
}

impl<F> RowSink for F
where
    F: FnMut(Row) -> Result<()>,
{
    fn accept(&mut self, row: Row) -> Result<()> {
        self(row)
    }
}

/// Produces the rows of one table, filtered by an optional predicate.
pub struct TableScanner<'a, R> {
    storage: &'a mut StorageManager<R>,
    table: &'a TableSchema,
    predicate: Option<&'a Predicate>,
}

impl<'a, R: Read + Seek> TableScanner<'a, R> {
    pub fn new(
        storage: &'a mut StorageManager<R>,
        table: &'a TableSchema,
        predicate: Option<&'a Predicate>,
    ) -> Self {
        Self {
            storage,
            table,
            predicate,
        }
    }

    /// Walks the whole table B-tree.
    pub fn full_scan<S: RowSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        debug!(table = %self.table.table_name, root = self.table.root_page_id, "full table scan");
        let table = self.table;
        let predicate = self.predicate;
        BTree::new(self.storage, table.root_page_id)
            .scan_table(|cell| emit(predicate, table.row_from_cell(cell), &mut *sink))
    }

    /// Fetches each rowid with a point descent from the table root. Rowids
    /// with no row are skipped.
    pub fn rowid_lookup<S: RowSink + ?Sized>(
        &mut self,
        row_ids: &[RowId],
        sink: &mut S,
    ) -> Result<()> {
        debug!(table = %self.table.table_name, rows = row_ids.len(), "rowid lookups");
        let table = self.table;
        let predicate = self.predicate;
        let mut tree = BTree::new(self.storage, table.root_page_id);
        for &row_id in row_ids {
            if let Some(cell) = tree.find_by_rowid(row_id)? {
                emit(predicate, table.row_from_cell(cell), &mut *sink)?;
            }
        }
        Ok(())
    }
}

fn emit<S: RowSink + ?Sized>(predicate: Option<&Predicate>, row: Row, sink: &mut S) -> Result<()> {
    if predicate.is_none_or(|p| p.matches(&row)) {
        sink.accept(row)?;
    }
    Ok(())
}
