use crate::types::{
    CELL_POINTER_SIZE, HEADER_SIZE, INTERIOR_PAGE_HEADER_SIZE, LEAF_PAGE_HEADER_SIZE, PageId,
    error::{DatabaseError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    InteriorIndex = 2,
    InteriorTable = 5,
    LeafIndex = 10,
    LeafTable = 13,
}

impl PageType {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            2 => Ok(PageType::InteriorIndex),
            5 => Ok(PageType::InteriorTable),
            10 => Ok(PageType::LeafIndex),
            13 => Ok(PageType::LeafTable),
            _ => Err(DatabaseError::InvalidPageType(value)),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn is_interior(&self) -> bool {
        matches!(self, PageType::InteriorIndex | PageType::InteriorTable)
    }

    pub fn is_table(&self) -> bool {
        matches!(self, PageType::InteriorTable | PageType::LeafTable)
    }

    pub fn header_size(&self) -> usize {
        if self.is_interior() {
            INTERIOR_PAGE_HEADER_SIZE
        } else {
            LEAF_PAGE_HEADER_SIZE
        }
    }
}

/*
 * B-tree page header (8 bytes on leaf pages, 12 on interior pages)
 * ┌──────┬─────────────────┬────────────┬───────────────┬────────┬──────────────────┐
 * │ type │ first freeblock │ cell count │ content start │ frag.  │ right-most child │
 * │  1   │        2        │     2      │       2       │   1    │ 4 (interior only)│
 * └──────┴─────────────────┴────────────┴───────────────┴────────┴──────────────────┘
 * Page 1 carries the 100-byte file header first, so its B-tree header starts
 * at offset 100; every other page starts its header at offset 0.
 */

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub first_freeblock: u16,
    pub cell_count: u16,
    /// Start of the cell content area; a raw 0 on disk means 65536.
    pub cell_content_start: u32,
    pub fragmented_free_bytes: u8,
    pub rightmost_pointer: Option<PageId>,
}

impl PageHeader {
    /// Parses a header from bytes starting at the page-header offset. Twelve
    /// bytes are always enough; eight suffice for leaf pages.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < LEAF_PAGE_HEADER_SIZE {
            return Err(DatabaseError::UnexpectedEof {
                context: "page header".to_string(),
            });
        }

        let page_type = PageType::from_u8(bytes[0])?;
        let first_freeblock = u16::from_be_bytes([bytes[1], bytes[2]]);
        let cell_count = u16::from_be_bytes([bytes[3], bytes[4]]);
        let cell_content_start = match u16::from_be_bytes([bytes[5], bytes[6]]) {
            0 => 65536,
            n => u32::from(n),
        };
        let fragmented_free_bytes = bytes[7];

        let rightmost_pointer = if page_type.is_interior() {
            if bytes.len() < INTERIOR_PAGE_HEADER_SIZE {
                return Err(DatabaseError::UnexpectedEof {
                    context: "interior page header".to_string(),
                });
            }
            Some(u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]))
        } else {
            None
        };

        Ok(Self {
            page_type,
            first_freeblock,
            cell_count,
            cell_content_start,
            fragmented_free_bytes,
            rightmost_pointer,
        })
    }

    pub fn size(&self) -> usize {
        self.page_type.header_size()
    }
}

/// A page's header together with its cell pointer array. Pointers are offsets
/// relative to the start of the page, in on-disk order.
#[derive(Debug, Clone)]
pub struct Page {
    pub page_id: PageId,
    pub header: PageHeader,
    pub cell_pointers: Vec<u16>,
}

impl Page {
    pub fn page_type(&self) -> PageType {
        self.header.page_type
    }

    pub fn cell_count(&self) -> usize {
        self.cell_pointers.len()
    }
}

/// Absolute file offset of the first byte of `page_id` (1-based).
pub fn page_start(page_id: PageId, page_size: u32) -> u64 {
    u64::from(page_id.saturating_sub(1)) * u64::from(page_size)
}

/// Offset of the B-tree header inside the page.
pub fn header_offset(page_id: PageId) -> usize {
    if page_id == 1 { HEADER_SIZE } else { 0 }
}

/// Absolute file offset of the first cell pointer of a page.
pub fn cell_pointer_array_start(page_id: PageId, page_size: u32, page_type: PageType) -> u64 {
    page_start(page_id, page_size) + (header_offset(page_id) + page_type.header_size()) as u64
}

pub fn parse_cell_pointers(bytes: &[u8], cell_count: u16) -> Result<Vec<u16>> {
    let needed = cell_count as usize * CELL_POINTER_SIZE;
    if bytes.len() < needed {
        return Err(DatabaseError::UnexpectedEof {
            context: "cell pointer array".to_string(),
        });
    }
    Ok(bytes[..needed]
        .chunks_exact(CELL_POINTER_SIZE)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}
