use std::{
    cmp::Ordering,
    io::{Read, Seek},
};

use tracing::{debug, trace};

use crate::{
    storage::storage_manager::StorageManager,
    types::{
        PageId, RowId,
        error::{DatabaseError, Result},
        page::{Page, PageType},
        record::TableLeafCell,
        value::Value,
    },
};

/// Read-only traversal over one table or index B-tree, rooted at
/// `root_page_id`. Pages are re-read on every visit.
pub struct BTree<'a, R> {
    storage: &'a mut StorageManager<R>,
    root_page_id: PageId,
}

impl<'a, R: Read + Seek> BTree<'a, R> {
    pub fn new(storage: &'a mut StorageManager<R>, root_page_id: PageId) -> Self {
        Self {
            storage,
            root_page_id,
        }
    }

    pub fn root_page_id(&self) -> PageId {
        self.root_page_id
    }

    /// Visits every leaf cell of a table B-tree in rowid order: children in
    /// cell pointer order, then the right-most child.
    pub fn scan_table<F>(&mut self, mut visit: F) -> Result<()>
    where
        F: FnMut(TableLeafCell) -> Result<()>,
    {
        self.walk_table(self.root_page_id, &mut visit)
    }

    fn walk_table<F>(&mut self, page_id: PageId, visit: &mut F) -> Result<()>
    where
        F: FnMut(TableLeafCell) -> Result<()>,
    {
        let page = self.storage.read_page(page_id)?;
        match page.page_type() {
            PageType::LeafTable => {
                for &offset in &page.cell_pointers {
                    let cell = self.storage.read_table_leaf_cell(page_id, offset)?;
                    visit(cell)?;
                }
                Ok(())
            }
            PageType::InteriorTable => {
                for &offset in &page.cell_pointers {
                    let child = self.storage.read_child_pointer(page_id, offset)?;
                    self.walk_table(child, visit)?;
                }
                self.walk_table(rightmost_child(&page)?, visit)
            }
            other => Err(unexpected_page(page_id, other, "table")),
        }
    }

    /// Number of rows in a table B-tree. A leaf root answers from its header;
    /// an interior root sums the cell counts of every leaf below it.
    pub fn count_rows(&mut self) -> Result<u64> {
        self.count_page(self.root_page_id)
    }

    fn count_page(&mut self, page_id: PageId) -> Result<u64> {
        let page = self.storage.read_page(page_id)?;
        match page.page_type() {
            PageType::LeafTable => Ok(u64::from(page.header.cell_count)),
            PageType::InteriorTable => {
                let mut total = 0;
                for &offset in &page.cell_pointers {
                    let child = self.storage.read_child_pointer(page_id, offset)?;
                    total += self.count_page(child)?;
                }
                Ok(total + self.count_page(rightmost_child(&page)?)?)
            }
            other => Err(unexpected_page(page_id, other, "table")),
        }
    }

    /// Searches an index B-tree for entries whose key equals `target` and
    /// returns their rowids in index order.
    ///
    /// Interior pages are descended along a single branch: the first child
    /// whose separator key is `>=` the target, or the right-most child when
    /// every separator is smaller. Equal keys spread across several branches
    /// are only found within the branch taken.
    pub fn collect_index_rowids(&mut self, target: &Value) -> Result<Vec<RowId>> {
        let mut row_ids = Vec::new();
        self.descend_index(self.root_page_id, target, &mut row_ids)?;
        debug!(
            root = self.root_page_id,
            matches = row_ids.len(),
            "index search finished"
        );
        Ok(row_ids)
    }

    fn descend_index(
        &mut self,
        page_id: PageId,
        target: &Value,
        row_ids: &mut Vec<RowId>,
    ) -> Result<()> {
        let page = self.storage.read_page(page_id)?;
        match page.page_type() {
            PageType::LeafIndex => {
                for &offset in &page.cell_pointers {
                    let cell = self.storage.read_index_cell(page_id, PageType::LeafIndex, offset)?;
                    if cell.key()?.text_eq(target) {
                        row_ids.push(cell.row_id()?);
                    }
                }
                Ok(())
            }
            PageType::InteriorIndex => {
                for &offset in &page.cell_pointers {
                    let cell =
                        self.storage.read_index_cell(page_id, PageType::InteriorIndex, offset)?;
                    let key = cell.key()?;
                    if key.compare_key(target) == Ordering::Less {
                        continue;
                    }
                    let child = cell.left_child.ok_or_else(|| DatabaseError::CorruptedPage {
                        page_id,
                        reason: "interior index cell without child pointer".to_string(),
                    })?;
                    trace!(page_id, child, separator = %key, "descending index");
                    self.descend_index(child, target, row_ids)?;
                    // Interior index cells are entries too.
                    if key.text_eq(target) {
                        row_ids.push(cell.row_id()?);
                    }
                    return Ok(());
                }
                let child = rightmost_child(&page)?;
                trace!(page_id, child, "descending index right-most child");
                self.descend_index(child, target, row_ids)
            }
            other => Err(unexpected_page(page_id, other, "index")),
        }
    }

    /// Finds the leaf cell holding `row_id`, descending into the first child
    /// whose key is `>=` the rowid at each interior page.
    pub fn find_by_rowid(&mut self, row_id: RowId) -> Result<Option<TableLeafCell>> {
        self.descend_rowid(self.root_page_id, row_id)
    }

    fn descend_rowid(&mut self, page_id: PageId, row_id: RowId) -> Result<Option<TableLeafCell>> {
        let page = self.storage.read_page(page_id)?;
        match page.page_type() {
            PageType::LeafTable => {
                for &offset in &page.cell_pointers {
                    if self.storage.read_table_leaf_row_id(page_id, offset)? == row_id {
                        return self.storage.read_table_leaf_cell(page_id, offset).map(Some);
                    }
                }
                Ok(None)
            }
            PageType::InteriorTable => {
                for &offset in &page.cell_pointers {
                    let (child, key) = self.storage.read_table_interior_cell(page_id, offset)?;
                    if key >= row_id {
                        return self.descend_rowid(child, row_id);
                    }
                }
                self.descend_rowid(rightmost_child(&page)?, row_id)
            }
            other => Err(unexpected_page(page_id, other, "table")),
        }
    }
}

fn rightmost_child(page: &Page) -> Result<PageId> {
    page.header.rightmost_pointer.ok_or_else(|| DatabaseError::CorruptedPage {
        page_id: page.page_id,
        reason: "interior page without right-most pointer".to_string(),
    })
}

fn unexpected_page(page_id: PageId, found: PageType, tree: &str) -> DatabaseError {
    DatabaseError::CorruptedPage {
        page_id,
        reason: format!("{found:?} page inside a {tree} B-tree"),
    }
}
