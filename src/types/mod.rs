pub mod error;
pub mod page;
pub mod record;
pub mod row;
pub mod value;
pub mod varint;

// Common type aliases
pub type PageId = u32;
pub type RowId = i64;

// Constants following SQLite specifications
pub const HEADER_SIZE: usize = 100; // Database header size
pub const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";
pub const MAX_PAGE_SIZE: u32 = 65536;
pub const SCHEMA_PAGE_ID: PageId = 1;

pub const LEAF_PAGE_HEADER_SIZE: usize = 8;
pub const INTERIOR_PAGE_HEADER_SIZE: usize = 12;
pub const CELL_POINTER_SIZE: usize = 2;
pub const CHILD_POINTER_SIZE: usize = 4;
pub const OVERFLOW_POINTER_SIZE: usize = 4;
