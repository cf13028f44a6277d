use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use tracing::{debug, trace};

use crate::{
    storage::header::FileHeader,
    types::{
        CELL_POINTER_SIZE, CHILD_POINTER_SIZE, HEADER_SIZE, INTERIOR_PAGE_HEADER_SIZE,
        OVERFLOW_POINTER_SIZE, PageId, RowId,
        error::{DatabaseError, Result},
        page::{
            Page, PageHeader, PageType, cell_pointer_array_start, header_offset, page_start,
            parse_cell_pointers,
        },
        record::{IndexCell, Record, TableLeafCell, local_payload_size},
        varint::read_varint,
    },
};

pub struct DatabaseInfo {
    pub path: Option<PathBuf>,
    pub header: FileHeader,
    pub file_size: u64,
}

/// Owns the single read handle on a database file. Every read seeks to an
/// absolute offset first, so no caller depends on where a previous read left
/// the cursor.
pub struct StorageManager<R = BufReader<File>> {
    pub db_info: DatabaseInfo,
    file: R,
}

impl StorageManager<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening database");
        let file = File::open(path)?;
        let mut storage = Self::from_reader(BufReader::new(file))?;
        storage.db_info.path = Some(path.to_path_buf());
        Ok(storage)
    }
}

impl<R: Read + Seek> StorageManager<R> {
    pub fn from_reader(mut file: R) -> Result<Self> {
        let file_size = file.seek(SeekFrom::End(0))?;
        let mut header_buffer = vec![0u8; HEADER_SIZE];
        file.seek(SeekFrom::Start(0))?;
        read_exact_or_eof(&mut file, &mut header_buffer, "database header")?;
        let header = FileHeader::from_bytes(&header_buffer)?;
        debug!(
            page_size = header.page_size(),
            pages = header.database_size_pages,
            "read database header"
        );
        Ok(Self {
            db_info: DatabaseInfo {
                path: None,
                header,
                file_size,
            },
            file,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.db_info.header
    }

    pub fn page_size(&self) -> u32 {
        self.db_info.header.page_size()
    }

    fn usable_size(&self) -> usize {
        self.db_info.header.usable_size() as usize
    }

    fn page_offset(&self, page_id: PageId) -> u64 {
        page_start(page_id, self.page_size())
    }

    fn read_at(&mut self, offset: u64, buffer: &mut [u8], context: &str) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        read_exact_or_eof(&mut self.file, buffer, context)
    }

    fn seek_to_cell(&mut self, page_id: PageId, cell_offset: u16) -> Result<()> {
        if page_id == 0 {
            return Err(DatabaseError::CorruptedPage {
                page_id,
                reason: "page numbers start at 1".to_string(),
            });
        }
        let offset = self.page_offset(page_id) + u64::from(cell_offset);
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Reads the B-tree header of `page_id`. Twelve bytes are read regardless
    /// of page kind; the type byte decides how many of them matter.
    pub fn read_page_header(&mut self, page_id: PageId) -> Result<PageHeader> {
        if page_id == 0 {
            return Err(DatabaseError::CorruptedPage {
                page_id,
                reason: "page numbers start at 1".to_string(),
            });
        }
        let offset = self.page_offset(page_id) + header_offset(page_id) as u64;
        let mut buffer = [0u8; INTERIOR_PAGE_HEADER_SIZE];
        self.read_at(offset, &mut buffer, "page header")?;
        PageHeader::from_bytes(&buffer)
    }

    pub fn read_cell_pointers(&mut self, page_id: PageId, header: &PageHeader) -> Result<Vec<u16>> {
        let start = cell_pointer_array_start(page_id, self.page_size(), header.page_type);
        let mut buffer = vec![0u8; header.cell_count as usize * CELL_POINTER_SIZE];
        self.read_at(start, &mut buffer, "cell pointer array")?;
        parse_cell_pointers(&buffer, header.cell_count)
    }

    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        let header = self.read_page_header(page_id)?;
        let cell_pointers = self.read_cell_pointers(page_id, &header)?;
        debug!(
            page_id,
            page_type = ?header.page_type,
            cells = header.cell_count,
            "read page"
        );
        Ok(Page {
            page_id,
            header,
            cell_pointers,
        })
    }

    /// Reads the 4-byte left child pointer that opens every interior cell.
    pub fn read_child_pointer(&mut self, page_id: PageId, cell_offset: u16) -> Result<PageId> {
        self.seek_to_cell(page_id, cell_offset)?;
        let mut buffer = [0u8; CHILD_POINTER_SIZE];
        read_exact_or_eof(&mut self.file, &mut buffer, "child pointer")?;
        Ok(u32::from_be_bytes(buffer))
    }

    /// Reads an interior table cell: the left child pointer and the rowid key
    /// varint that follows it.
    pub fn read_table_interior_cell(
        &mut self,
        page_id: PageId,
        cell_offset: u16,
    ) -> Result<(PageId, RowId)> {
        let child = self.read_child_pointer(page_id, cell_offset)?;
        let (key, _) = read_varint(&mut self.file)?;
        trace!(page_id, cell_offset, child, key, "interior table cell");
        Ok((child, key as RowId))
    }

    /// Reads the payload size and rowid varints of a table leaf cell without
    /// touching the payload.
    pub fn read_table_leaf_row_id(&mut self, page_id: PageId, cell_offset: u16) -> Result<RowId> {
        self.seek_to_cell(page_id, cell_offset)?;
        read_varint(&mut self.file)?;
        let (row_id, _) = read_varint(&mut self.file)?;
        Ok(row_id as RowId)
    }

    pub fn read_table_leaf_cell(
        &mut self,
        page_id: PageId,
        cell_offset: u16,
    ) -> Result<TableLeafCell> {
        self.seek_to_cell(page_id, cell_offset)?;
        let (payload_size, _) = read_varint(&mut self.file)?;
        let (row_id, _) = read_varint(&mut self.file)?;
        let payload = self.read_payload(page_id, PageType::LeafTable, payload_size)?;
        trace!(page_id, cell_offset, row_id, payload_size, "table leaf cell");
        Ok(TableLeafCell {
            row_id: row_id as RowId,
            record: Record::decode(&payload)?,
        })
    }

    /// Reads an index cell from a leaf or interior index page.
    pub fn read_index_cell(
        &mut self,
        page_id: PageId,
        page_type: PageType,
        cell_offset: u16,
    ) -> Result<IndexCell> {
        let left_child = match page_type {
            PageType::InteriorIndex => Some(self.read_child_pointer(page_id, cell_offset)?),
            PageType::LeafIndex => {
                self.seek_to_cell(page_id, cell_offset)?;
                None
            }
            other => {
                return Err(DatabaseError::CorruptedPage {
                    page_id,
                    reason: format!("expected an index page, found {other:?}"),
                });
            }
        };
        let (payload_size, _) = read_varint(&mut self.file)?;
        let payload = self.read_payload(page_id, page_type, payload_size)?;
        trace!(page_id, cell_offset, ?left_child, payload_size, "index cell");
        Ok(IndexCell {
            left_child,
            record: Record::decode(&payload)?,
        })
    }

    /// Reads a payload whose first byte is at the current cursor, following
    /// the overflow chain when the payload does not fit on the page.
    ///
    /// A declared size larger than the whole file is rejected before any
    /// buffer is allocated.
    fn read_payload(
        &mut self,
        page_id: PageId,
        page_type: PageType,
        declared_size: u64,
    ) -> Result<Vec<u8>> {
        if declared_size > self.db_info.file_size {
            return Err(DatabaseError::CorruptedPage {
                page_id,
                reason: format!(
                    "cell payload of {declared_size} bytes exceeds the {} byte file",
                    self.db_info.file_size
                ),
            });
        }
        let payload_size = declared_size as usize;
        let usable_size = self.usable_size();
        let local_size = local_payload_size(page_type, payload_size, usable_size);
        let mut payload = vec![0u8; local_size];
        read_exact_or_eof(&mut self.file, &mut payload, "cell payload")?;
        if local_size == payload_size {
            return Ok(payload);
        }

        let mut pointer = [0u8; OVERFLOW_POINTER_SIZE];
        read_exact_or_eof(&mut self.file, &mut pointer, "overflow pointer")?;
        let mut next_page = u32::from_be_bytes(pointer);
        payload.reserve(payload_size - local_size);

        while payload.len() < payload_size {
            if next_page == 0 {
                return Err(DatabaseError::CorruptedPage {
                    page_id,
                    reason: format!(
                        "overflow chain ended after {} of {payload_size} payload bytes",
                        payload.len()
                    ),
                });
            }
            trace!(page_id, overflow_page = next_page, "following overflow page");
            let offset = self.page_offset(next_page);
            self.read_at(offset, &mut pointer, "overflow page")?;
            let chunk_len =
                (payload_size - payload.len()).min(usable_size - OVERFLOW_POINTER_SIZE);
            let start = payload.len();
            payload.resize(start + chunk_len, 0);
            read_exact_or_eof(&mut self.file, &mut payload[start..], "overflow page")?;
            next_page = u32::from_be_bytes(pointer);
        }

        Ok(payload)
    }
}

fn read_exact_or_eof<R: Read>(reader: &mut R, buffer: &mut [u8], context: &str) -> Result<()> {
    reader.read_exact(buffer).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => DatabaseError::UnexpectedEof {
            context: context.to_string(),
        },
        _ => DatabaseError::Io(e),
    })
}
