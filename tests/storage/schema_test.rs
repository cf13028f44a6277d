use std::io::Cursor;

use litewalk::{
    storage::{
        btree::BTree,
        schema::{SchemaCatalog, SchemaRecord},
        storage_manager::StorageManager,
    },
    types::{error::DatabaseError, record::Record, record::TableLeafCell, value::Value},
    utils::mock::{SqliteFixture, encode_record, users_fixture},
};

fn storage_for(fixture: SqliteFixture) -> StorageManager<Cursor<Vec<u8>>> {
    StorageManager::from_reader(Cursor::new(fixture.build())).unwrap()
}

#[test]
fn test_catalog_lists_tables_and_indexes() -> Result<(), DatabaseError> {
    let mut storage = storage_for(users_fixture());
    let catalog = SchemaCatalog::load(&mut storage)?;
    assert_eq!(catalog.records.len(), 2);
    assert_eq!(catalog.records[0].kind, "table");
    assert_eq!(catalog.records[1].kind, "index");
    assert_eq!(catalog.records[1].table_name, "users");
    assert_eq!(catalog.table_names(), vec!["users"]);
    Ok(())
}

#[test]
fn test_table_lookup_is_case_insensitive() -> Result<(), DatabaseError> {
    let mut storage = storage_for(users_fixture());
    let catalog = SchemaCatalog::load(&mut storage)?;
    let table = catalog.table("USERS")?;
    assert_eq!(table.column_names(), vec!["id", "name"]);
    assert_eq!(table.get_column_index("Name"), Some(1));
    assert!(table.columns[0].is_rowid_alias());
    Ok(())
}

#[test]
fn test_index_names_never_resolve_as_tables() -> Result<(), DatabaseError> {
    let mut storage = storage_for(users_fixture());
    let catalog = SchemaCatalog::load(&mut storage)?;
    assert!(matches!(
        catalog.table("idx_name"),
        Err(DatabaseError::TableNotFound { .. })
    ));
    Ok(())
}

#[test]
fn test_find_index_matches_table_and_column() -> Result<(), DatabaseError> {
    let mut storage = storage_for(users_fixture());
    let catalog = SchemaCatalog::load(&mut storage)?;
    let index = catalog.find_index("users", "NAME")?.unwrap();
    assert_eq!(index.name, "idx_name");
    assert!(catalog.find_index("users", "id")?.is_none());
    assert!(catalog.find_index("other", "name")?.is_none());
    Ok(())
}

#[test]
fn test_automatic_index_is_ignored() -> Result<(), DatabaseError> {
    let mut fixture = users_fixture();
    fixture.add_schema_entry("index", "sqlite_autoindex_users_1", "users", 9, None);
    let mut storage = storage_for(fixture);
    let catalog = SchemaCatalog::load(&mut storage)?;
    assert_eq!(catalog.records.len(), 3);
    assert_eq!(catalog.find_index("users", "name")?.unwrap().name, "idx_name");
    Ok(())
}

#[test]
fn test_multi_column_index_is_rejected() -> Result<(), DatabaseError> {
    let mut fixture = users_fixture();
    fixture.add_index(
        "idx_pair",
        "users",
        "CREATE INDEX idx_pair ON users (name, id)",
        vec![],
    );
    let mut storage = storage_for(fixture);
    let catalog = SchemaCatalog::load(&mut storage)?;
    assert!(matches!(
        catalog.find_index("users", "name"),
        Err(DatabaseError::UnsupportedIndex { .. })
    ));
    assert!(matches!(
        catalog.find_index("users", "id"),
        Err(DatabaseError::UnsupportedIndex { .. })
    ));
    // Indexes on other tables play no part.
    assert!(catalog.find_index("orders", "id")?.is_none());
    Ok(())
}

#[test]
fn test_expression_index_is_rejected() -> Result<(), DatabaseError> {
    let mut fixture = users_fixture();
    fixture.add_index(
        "idx_lower_name",
        "users",
        "CREATE INDEX idx_lower_name ON users (lower(name))",
        vec![],
    );
    let mut storage = storage_for(fixture);
    let catalog = SchemaCatalog::load(&mut storage)?;
    assert!(matches!(
        catalog.find_index("users", "name"),
        Err(DatabaseError::UnsupportedIndex { .. })
    ));
    Ok(())
}

#[test]
fn test_rowid_alias_takes_row_key() -> Result<(), DatabaseError> {
    let mut storage = storage_for(users_fixture());
    let catalog = SchemaCatalog::load(&mut storage)?;
    let table = catalog.table("users")?;

    let mut rows = Vec::new();
    BTree::new(&mut storage, table.root_page_id).scan_table(|cell| {
        rows.push(table.row_from_cell(cell));
        Ok(())
    })?;
    assert_eq!(rows[0].values, vec![Value::Integer(1), Value::Text("Alice".to_string())]);
    assert_eq!(rows[1].values, vec![Value::Integer(2), Value::Text("Bob".to_string())]);
    Ok(())
}

#[test]
fn test_stored_alias_value_is_kept() -> Result<(), DatabaseError> {
    let mut storage = storage_for(users_fixture());
    let table = SchemaCatalog::load(&mut storage)?.table("users")?;
    let cell = TableLeafCell {
        row_id: 7,
        record: Record::decode(&encode_record(&[
            Value::Integer(42),
            Value::Text("x".to_string()),
        ]))?,
    };
    assert_eq!(table.row_from_cell(cell).values[0], Value::Integer(42));
    Ok(())
}

#[test]
fn test_internal_tables_hidden_from_listing() -> Result<(), DatabaseError> {
    let mut fixture = users_fixture();
    fixture.add_table("sqlite_sequence", "CREATE TABLE sqlite_sequence(name,seq)", vec![]);
    let mut storage = storage_for(fixture);
    let catalog = SchemaCatalog::load(&mut storage)?;
    assert_eq!(catalog.table_names(), vec!["users"]);
    assert_eq!(catalog.table("sqlite_sequence")?.column_names(), vec!["name", "seq"]);
    Ok(())
}

#[test]
fn test_listing_ignores_kind_case_and_triggers() -> Result<(), DatabaseError> {
    let mut fixture = users_fixture();
    fixture.add_schema_entry(
        "VIEW",
        "user_names",
        "user_names",
        0,
        Some("CREATE VIEW user_names AS SELECT name FROM users"),
    );
    fixture.add_schema_entry(
        "TRIGGER",
        "users_audit",
        "users",
        0,
        Some("CREATE TRIGGER users_audit AFTER INSERT ON users BEGIN SELECT 1; END"),
    );
    let mut storage = storage_for(fixture);
    let catalog = SchemaCatalog::load(&mut storage)?;
    assert_eq!(catalog.records.len(), 4);
    assert_eq!(catalog.table_names(), vec!["users", "user_names"]);
    Ok(())
}

#[test]
fn test_schema_spanning_several_pages() -> Result<(), DatabaseError> {
    let mut fixture = SqliteFixture::new(512).with_max_cells_per_page(2);
    for i in 0..9 {
        let name = format!("t{i}");
        fixture.add_table(&name, &format!("CREATE TABLE {name} (a TEXT)"), vec![]);
    }
    let mut storage = storage_for(fixture);
    let catalog = SchemaCatalog::load(&mut storage)?;
    assert_eq!(catalog.table_names().len(), 9);
    assert_eq!(catalog.table("t8")?.table_name, "t8");
    Ok(())
}

#[test]
fn test_negative_root_page_is_invalid() {
    let cell = TableLeafCell {
        row_id: 1,
        record: Record::decode(&encode_record(&[
            Value::Text("table".to_string()),
            Value::Text("t".to_string()),
            Value::Text("t".to_string()),
            Value::Integer(-2),
            Value::Text("CREATE TABLE t (a)".to_string()),
        ]))
        .unwrap(),
    };
    assert!(matches!(
        SchemaRecord::from_cell(&cell),
        Err(DatabaseError::InvalidRecord { .. })
    ));
}
