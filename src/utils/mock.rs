//! Builds small but valid SQLite database files for tests and benchmarks.

use std::io::Write;

use tempfile::NamedTempFile;

use crate::{
    storage::header::FileHeader,
    types::{
        HEADER_SIZE, INTERIOR_PAGE_HEADER_SIZE, OVERFLOW_POINTER_SIZE, PageId, RowId,
        error::Result,
        page::{PageType, header_offset},
        record::local_payload_size,
        value::Value,
        varint::encode_varint,
    },
};

/// Serial type code and body bytes for one value, using the narrowest
/// integer width.
pub fn encode_value(value: &Value) -> (u64, Vec<u8>) {
    match value {
        Value::Null => (0, Vec::new()),
        Value::Integer(0) => (8, Vec::new()),
        Value::Integer(1) => (9, Vec::new()),
        Value::Integer(i) => {
            let (code, width) = match *i {
                -128..=127 => (1, 1),
                -32_768..=32_767 => (2, 2),
                -8_388_608..=8_388_607 => (3, 3),
                -2_147_483_648..=2_147_483_647 => (4, 4),
                -140_737_488_355_328..=140_737_488_355_327 => (5, 6),
                _ => (6, 8),
            };
            (code, i.to_be_bytes()[8 - width..].to_vec())
        }
        Value::Real(r) => (7, r.to_be_bytes().to_vec()),
        Value::Text(s) => (13 + 2 * s.len() as u64, s.as_bytes().to_vec()),
        Value::Blob(b) => (12 + 2 * b.len() as u64, b.clone()),
    }
}

/// Encodes a record: header size varint, serial types, then the body.
pub fn encode_record(values: &[Value]) -> Vec<u8> {
    let mut types = Vec::new();
    let mut body = Vec::new();
    for value in values {
        let (code, bytes) = encode_value(value);
        types.extend(encode_varint(code));
        body.extend(bytes);
    }

    // The header size counts its own varint.
    let mut header_size = types.len() + 1;
    while encode_varint(header_size as u64).len() + types.len() != header_size {
        header_size = encode_varint(header_size as u64).len() + types.len();
    }

    let mut record = encode_varint(header_size as u64);
    record.extend(types);
    record.extend(body);
    record
}

struct SchemaEntry {
    kind: &'static str,
    name: String,
    table_name: String,
    root_page: PageId,
    sql: Option<String>,
}

/// Lays out table and index B-trees page by page. Page 1 holds the schema
/// table and is written last, once every root page is known.
pub struct SqliteFixture {
    header: FileHeader,
    pages: Vec<Vec<u8>>,
    schema: Vec<SchemaEntry>,
    max_cells_per_page: usize,
}

impl SqliteFixture {
    pub fn new(page_size: u32) -> Self {
        let header = FileHeader {
            raw_page_size: if page_size == 65536 { 1 } else { page_size as u16 },
            ..FileHeader::default()
        };
        Self {
            header,
            pages: vec![vec![0; page_size as usize]],
            schema: Vec::new(),
            max_cells_per_page: usize::MAX,
        }
    }

    /// Caps the number of cells per page so small data sets still produce
    /// multi-level trees.
    pub fn with_max_cells_per_page(mut self, max_cells: usize) -> Self {
        self.max_cells_per_page = max_cells.max(1);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.header.page_size()
    }

    fn usable_size(&self) -> usize {
        self.header.usable_size() as usize
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Adds a table, its rows keyed by rowid, and its schema entry. Returns
    /// the root page.
    pub fn add_table(
        &mut self,
        name: &str,
        sql: &str,
        mut rows: Vec<(RowId, Vec<Value>)>,
    ) -> PageId {
        rows.sort_by_key(|(row_id, _)| *row_id);
        let root = self.build_table_tree(&rows, None);
        self.add_schema_entry("table", name, name, root, Some(sql));
        root
    }

    /// Adds an index over `(key, rowid)` entries and its schema entry.
    pub fn add_index(
        &mut self,
        name: &str,
        table_name: &str,
        sql: &str,
        mut entries: Vec<(Value, RowId)>,
    ) -> PageId {
        entries.sort_by(|(a, a_id), (b, b_id)| a.compare_key(b).then(a_id.cmp(b_id)));
        let records = entries
            .into_iter()
            .map(|(key, row_id)| encode_record(&[key, Value::Integer(row_id)]))
            .collect::<Vec<_>>();
        let root = self.build_index_tree(records);
        self.add_schema_entry("index", name, table_name, root, Some(sql));
        root
    }

    pub fn add_schema_entry(
        &mut self,
        kind: &'static str,
        name: &str,
        table_name: &str,
        root_page: PageId,
        sql: Option<&str>,
    ) {
        self.schema.push(SchemaEntry {
            kind,
            name: name.to_string(),
            table_name: table_name.to_string(),
            root_page,
            sql: sql.map(str::to_string),
        });
    }

    /// Writes a raw page and returns its number.
    pub fn add_raw_page(&mut self, bytes: Vec<u8>) -> PageId {
        let page_id = self.allocate_page();
        self.set_page(page_id, bytes);
        page_id
    }

    fn allocate_page(&mut self) -> PageId {
        self.pages.push(vec![0; self.page_size() as usize]);
        self.pages.len() as PageId
    }

    fn set_page(&mut self, page_id: PageId, mut bytes: Vec<u8>) {
        bytes.resize(self.page_size() as usize, 0);
        self.pages[page_id as usize - 1] = bytes;
    }

    /// Room for cells and pointers on any page, assuming the page 1 header
    /// offset and an interior header.
    fn cell_capacity(&self) -> usize {
        self.usable_size() - HEADER_SIZE - INTERIOR_PAGE_HEADER_SIZE
    }

    /// Greedily splits cells into pages by size and cell cap.
    fn pack(&self, cells: &[Vec<u8>]) -> Vec<std::ops::Range<usize>> {
        let mut groups = Vec::new();
        let mut start = 0;
        let mut used = 0;
        for (i, cell) in cells.iter().enumerate() {
            let needed = cell.len() + 2;
            let full = used + needed > self.cell_capacity() || i - start >= self.max_cells_per_page;
            if i > start && full {
                groups.push(start..i);
                start = i;
                used = 0;
            }
            used += needed;
        }
        if start < cells.len() || groups.is_empty() {
            groups.push(start..cells.len());
        }
        groups
    }

    /// Local part of a payload followed by the first overflow page number,
    /// writing the overflow chain as needed.
    fn spill(&mut self, page_type: PageType, payload: &[u8]) -> Vec<u8> {
        let usable = self.usable_size();
        let local = local_payload_size(page_type, payload.len(), usable);
        let mut cell = payload[..local].to_vec();
        if local == payload.len() {
            return cell;
        }

        let chunks: Vec<&[u8]> = payload[local..].chunks(usable - OVERFLOW_POINTER_SIZE).collect();
        let ids: Vec<PageId> = chunks.iter().map(|_| self.allocate_page()).collect();
        for (i, chunk) in chunks.iter().enumerate() {
            let next = ids.get(i + 1).copied().unwrap_or(0);
            let mut page = next.to_be_bytes().to_vec();
            page.extend_from_slice(chunk);
            self.set_page(ids[i], page);
        }
        cell.extend(ids[0].to_be_bytes());
        cell
    }

    fn table_leaf_cell(&mut self, row_id: RowId, values: &[Value]) -> Vec<u8> {
        let payload = encode_record(values);
        let mut cell = encode_varint(payload.len() as u64);
        cell.extend(encode_varint(row_id as u64));
        cell.extend(self.spill(PageType::LeafTable, &payload));
        cell
    }

    fn index_cell(
        &mut self,
        page_type: PageType,
        left_child: Option<PageId>,
        payload: &[u8],
    ) -> Vec<u8> {
        let mut cell = left_child.map(|c| c.to_be_bytes().to_vec()).unwrap_or_default();
        cell.extend(encode_varint(payload.len() as u64));
        cell.extend(self.spill(page_type, payload));
        cell
    }

    fn build_table_tree(&mut self, rows: &[(RowId, Vec<Value>)], root: Option<PageId>) -> PageId {
        let cells: Vec<Vec<u8>> = rows
            .iter()
            .map(|(row_id, values)| self.table_leaf_cell(*row_id, values))
            .collect();
        let groups = self.pack(&cells);

        // (page, largest rowid below it)
        let mut level: Vec<(PageId, RowId)> = Vec::new();
        let single = groups.len() == 1;
        for group in groups {
            let page_id = match root {
                Some(root) if single => root,
                _ => self.allocate_page(),
            };
            let max_key = rows[..group.end].last().map(|(id, _)| *id).unwrap_or(0);
            let page = write_btree_page(
                page_id,
                PageType::LeafTable,
                &cells[group],
                None,
                self.page_size(),
            );
            self.set_page(page_id, page);
            level.push((page_id, max_key));
        }

        while level.len() > 1 {
            let cells: Vec<Vec<u8>> = level
                .iter()
                .map(|(child, key)| {
                    let mut cell = child.to_be_bytes().to_vec();
                    cell.extend(encode_varint(*key as u64));
                    cell
                })
                .collect();
            // Every group keeps one more child as its right-most pointer.
            let groups = self.pack_interior(&cells);
            let single = groups.len() == 1;
            let mut next = Vec::new();
            for group in groups {
                let page_id = match root {
                    Some(root) if single => root,
                    _ => self.allocate_page(),
                };
                let (rightmost, max_key) = level[group.end - 1];
                let page = write_btree_page(
                    page_id,
                    PageType::InteriorTable,
                    &cells[group.start..group.end - 1],
                    Some(rightmost),
                    self.page_size(),
                );
                self.set_page(page_id, page);
                next.push((page_id, max_key));
            }
            level = next;
        }
        level[0].0
    }

    /// Packs interior cells so that each group has at least two children.
    fn pack_interior(&self, cells: &[Vec<u8>]) -> Vec<std::ops::Range<usize>> {
        let mut groups = Vec::new();
        let mut start = 0;
        while start < cells.len() {
            let mut end = start + 1;
            let mut used = 0;
            while end < cells.len()
                && end - start <= self.max_cells_per_page
                && used + cells[end - 1].len() + 2 <= self.cell_capacity()
            {
                used += cells[end - 1].len() + 2;
                end += 1;
            }
            // A lone trailing child joins the previous group's cells instead.
            if end == start + 1 && end < cells.len() {
                end += 1;
            }
            groups.push(start..end);
            start = end;
        }
        groups
    }

    fn build_index_tree(&mut self, records: Vec<Vec<u8>>) -> PageId {
        // Leaves hold runs of entries; the entry between two leaves moves up
        // into the parent as a separator.
        let leaf_cells: Vec<Vec<u8>> = records
            .iter()
            .map(|payload| self.index_cell(PageType::LeafIndex, None, payload))
            .collect();
        let mut children = Vec::new();
        let mut separators: Vec<Vec<u8>> = Vec::new();
        let mut start = 0;
        loop {
            let end = self.fill(&leaf_cells[start..]) + start;
            let page_id = self.allocate_page();
            let page = write_btree_page(
                page_id,
                PageType::LeafIndex,
                &leaf_cells[start..end],
                None,
                self.page_size(),
            );
            self.set_page(page_id, page);
            children.push(page_id);
            if end >= records.len() {
                break;
            }
            separators.push(records[end].clone());
            start = end + 1;
            if start >= records.len() {
                let empty = write_btree_page(0, PageType::LeafIndex, &[], None, self.page_size());
                let page_id = self.add_raw_page(empty);
                children.push(page_id);
                break;
            }
        }

        while children.len() > 1 {
            let mut next_children = Vec::new();
            let mut next_separators = Vec::new();
            let mut i = 0;
            while i < children.len() {
                let mut cells = Vec::new();
                let mut used = 0;
                let rightmost;
                loop {
                    if i == children.len() - 1 {
                        rightmost = children[i];
                        i += 1;
                        break;
                    }
                    let cell =
                        self.index_cell(PageType::InteriorIndex, Some(children[i]), &separators[i]);
                    let full = used + cell.len() + 2 > self.cell_capacity()
                        || cells.len() >= self.max_cells_per_page;
                    if !cells.is_empty() && full {
                        rightmost = children[i];
                        next_separators.push(separators[i].clone());
                        i += 1;
                        break;
                    }
                    used += cell.len() + 2;
                    cells.push(cell);
                    i += 1;
                }
                let page_id = self.allocate_page();
                let page = write_btree_page(
                    page_id,
                    PageType::InteriorIndex,
                    &cells,
                    Some(rightmost),
                    self.page_size(),
                );
                self.set_page(page_id, page);
                next_children.push(page_id);
            }
            children = next_children;
            separators = next_separators;
        }
        children[0]
    }

    /// How many of `cells` fit on one page.
    fn fill(&self, cells: &[Vec<u8>]) -> usize {
        let mut used = 0;
        for (i, cell) in cells.iter().enumerate() {
            let full = used + cell.len() + 2 > self.cell_capacity() || i >= self.max_cells_per_page;
            if i > 0 && full {
                return i;
            }
            used += cell.len() + 2;
        }
        cells.len()
    }

    /// The complete database image.
    pub fn build(mut self) -> Vec<u8> {
        let rows: Vec<(RowId, Vec<Value>)> = self
            .schema
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                (
                    i as RowId + 1,
                    vec![
                        Value::Text(entry.kind.to_string()),
                        Value::Text(entry.name.clone()),
                        Value::Text(entry.table_name.clone()),
                        Value::Integer(i64::from(entry.root_page)),
                        entry.sql.clone().map(Value::Text).unwrap_or(Value::Null),
                    ],
                )
            })
            .collect();
        self.build_table_tree(&rows, Some(1));

        self.header.database_size_pages = self.pages.len() as u32;
        let header = self.header.to_bytes();
        self.pages[0][..HEADER_SIZE].copy_from_slice(&header);
        self.pages.concat()
    }

    pub fn write(self) -> Result<NamedTempFile> {
        let bytes = self.build();
        let mut file = NamedTempFile::new()?;
        file.write_all(&bytes)?;
        file.flush()?;
        Ok(file)
    }
}

/// Serialises one B-tree page: header, cell pointer array, and cells packed
/// against the end of the page in pointer order.
pub fn write_btree_page(
    page_id: PageId,
    page_type: PageType,
    cells: &[Vec<u8>],
    rightmost: Option<PageId>,
    page_size: u32,
) -> Vec<u8> {
    let mut page = vec![0u8; page_size as usize];
    let header_start = header_offset(page_id);
    let mut content_start = page_size as usize;
    let mut pointers = Vec::with_capacity(cells.len());
    for cell in cells {
        content_start -= cell.len();
        page[content_start..content_start + cell.len()].copy_from_slice(cell);
        pointers.push(content_start as u16);
    }

    page[header_start] = page_type.as_u8();
    page[header_start + 3..header_start + 5].copy_from_slice(&(cells.len() as u16).to_be_bytes());
    let raw_content_start = if content_start == 65536 { 0 } else { content_start as u16 };
    page[header_start + 5..header_start + 7].copy_from_slice(&raw_content_start.to_be_bytes());
    if let Some(rightmost) = rightmost {
        page[header_start + 8..header_start + 12].copy_from_slice(&rightmost.to_be_bytes());
    }

    let mut pointer_offset = header_start + page_type.header_size();
    for pointer in pointers {
        page[pointer_offset..pointer_offset + 2].copy_from_slice(&pointer.to_be_bytes());
        pointer_offset += 2;
    }
    page
}

/// `users(id INTEGER PRIMARY KEY, name TEXT)` with Alice and Bob, plus an
/// index on `name`.
pub fn users_fixture() -> SqliteFixture {
    let mut fixture = SqliteFixture::new(4096);
    fixture.add_table(
        "users",
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)",
        vec![
            (1, vec![Value::Null, Value::Text("Alice".to_string())]),
            (2, vec![Value::Null, Value::Text("Bob".to_string())]),
        ],
    );
    fixture.add_index(
        "idx_name",
        "users",
        "CREATE INDEX idx_name ON users (name)",
        vec![
            (Value::Text("Alice".to_string()), 1),
            (Value::Text("Bob".to_string()), 2),
        ],
    );
    fixture
}
