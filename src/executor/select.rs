use std::io::{Read, Seek};

use tracing::debug;

use crate::{
    executor::{
        QueryOutput,
        predicate::Predicate,
        scan::{RowSink, TableScanner},
    },
    planner::logical_plan::{Projection, SelectPlan},
    storage::{
        btree::BTree,
        schema::{SchemaCatalog, TableSchema},
        storage_manager::StorageManager,
    },
    types::{error::Result, row::Row},
};

pub fn execute_select<R: Read + Seek>(
    storage: &mut StorageManager<R>,
    catalog: &SchemaCatalog,
    plan: &SelectPlan,
) -> Result<QueryOutput> {
    let table = catalog.table(&plan.table_name)?;
    let predicate = plan
        .filter
        .as_ref()
        .map(|filter| Predicate::equals(&table, &filter.column_name, filter.value.clone()))
        .transpose()?;

    let columns = match &plan.projection {
        Projection::CountStar => {
            if predicate.is_none() {
                let count = BTree::new(storage, table.root_page_id).count_rows()?;
                return Ok(QueryOutput::Count(count));
            }
            let mut count = 0u64;
            let mut tally = |_row: Row| -> Result<()> {
                count += 1;
                Ok(())
            };
            visit_rows(storage, catalog, &table, predicate.as_ref(), &mut tally)?;
            return Ok(QueryOutput::Count(count));
        }
        Projection::All => (0..table.columns.len()).collect::<Vec<_>>(),
        Projection::Columns(names) => names
            .iter()
            .map(|name| table.require_column_index(name))
            .collect::<Result<Vec<_>>>()?,
    };

    let mut rows = Vec::new();
    visit_rows(storage, catalog, &table, predicate.as_ref(), &mut |row: Row| -> Result<()> {
        rows.push(row.project(&columns));
        Ok(())
    })?;
    Ok(QueryOutput::Rows(rows))
}

/// Feeds every row of `table` matching `predicate` into `sink`, probing a
/// single-column index on the filtered column when the schema has one.
pub fn visit_rows<R: Read + Seek, S: RowSink + ?Sized>(
    storage: &mut StorageManager<R>,
    catalog: &SchemaCatalog,
    table: &TableSchema,
    predicate: Option<&Predicate>,
    sink: &mut S,
) -> Result<()> {
    let index = match predicate.filter(|p| !p.value.is_null()) {
        Some(p) => catalog
            .find_index(&table.table_name, &p.column_name)?
            .map(|index| (index, p)),
        None => None,
    };

    match index {
        Some((index, predicate)) => {
            debug!(index = %index.name, table = %table.table_name, "using index");
            let row_ids =
                BTree::new(storage, index.root_page_id).collect_index_rowids(&predicate.value)?;
            TableScanner::new(storage, table, Some(predicate)).rowid_lookup(&row_ids, sink)
        }
        None => TableScanner::new(storage, table, predicate).full_scan(sink),
    }
}
