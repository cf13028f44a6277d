pub mod btree;
pub mod header;
pub mod schema;
pub mod storage_manager;
