use std::io::Cursor;

use litewalk::{
    config::Config,
    executor::{Executor, QueryOutput},
    storage::storage_manager::StorageManager,
    types::{error::DatabaseError, value::Value},
    utils::mock::{SqliteFixture, users_fixture},
};

fn executor_for(fixture: SqliteFixture) -> Executor<Cursor<Vec<u8>>> {
    Executor::new(StorageManager::from_reader(Cursor::new(fixture.build())).unwrap())
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn render(executor: &mut Executor<Cursor<Vec<u8>>>, command: &str) -> String {
    executor.run(command).unwrap().render(&Config::default())
}

/// `companies(id INTEGER PRIMARY KEY, name TEXT, country TEXT)` spread over
/// many small pages, optionally indexed on `name`.
fn companies_fixture(with_index: bool) -> SqliteFixture {
    let countries = ["chad", "eritrea", "fiji", "micronesia", "tonga"];
    let mut fixture = SqliteFixture::new(512).with_max_cells_per_page(4);
    let rows: Vec<(i64, Vec<Value>)> = (1..=100)
        .map(|id| {
            let country = countries[(id as usize * 7) % countries.len()];
            (id, vec![Value::Null, text(&format!("company {id}")), text(country)])
        })
        .collect();
    let entries = rows
        .iter()
        .map(|(id, values)| (values[1].clone(), *id))
        .collect();
    fixture.add_table(
        "companies",
        "CREATE TABLE companies (id integer primary key autoincrement, name text, country text)",
        rows,
    );
    if with_index {
        fixture.add_index(
            "idx_companies_name",
            "companies",
            "CREATE INDEX idx_companies_name on companies (name)",
            entries,
        );
    }
    fixture
}

#[test]
fn test_select_single_column() {
    let mut executor = executor_for(users_fixture());
    assert_eq!(render(&mut executor, "SELECT name FROM users"), "Alice\nBob");
}

#[test]
fn test_count_single_page_table() {
    let mut executor = executor_for(users_fixture());
    assert_eq!(executor.run("SELECT COUNT(*) FROM users").unwrap(), QueryOutput::Count(2));
}

#[test]
fn test_dot_commands() {
    let mut executor = executor_for(users_fixture());
    assert_eq!(
        render(&mut executor, ".dbinfo"),
        "database page size: 4096\nnumber of tables: 2"
    );
    assert_eq!(render(&mut executor, ".tables"), "users");
    assert_eq!(
        render(&mut executor, ".schema"),
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);\n\
         CREATE INDEX idx_name ON users (name);"
    );
}

#[test]
fn test_where_through_index() {
    let mut executor = executor_for(users_fixture());
    assert_eq!(render(&mut executor, "SELECT id FROM users WHERE name = 'Bob'"), "2");
    assert_eq!(render(&mut executor, "SELECT id, name FROM users WHERE name = 'Carol'"), "");
}

#[test]
fn test_index_path_is_preferred_over_scan() {
    // The index deliberately leaves Bob out; a full scan would find him.
    let mut fixture = SqliteFixture::new(4096);
    fixture.add_table(
        "users",
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)",
        vec![(1, vec![Value::Null, text("Alice")]), (2, vec![Value::Null, text("Bob")])],
    );
    fixture.add_index(
        "idx_name",
        "users",
        "CREATE INDEX idx_name ON users (name)",
        vec![(text("Alice"), 1)],
    );
    let mut executor = executor_for(fixture);
    assert_eq!(render(&mut executor, "SELECT id FROM users WHERE name = 'Bob'"), "");
    assert_eq!(render(&mut executor, "SELECT name FROM users WHERE id = 2"), "Bob");
}

#[test]
fn test_filter_refuses_multi_column_index() {
    let mut fixture = users_fixture();
    fixture.add_index(
        "idx_pair",
        "users",
        "CREATE INDEX idx_pair ON users (name, id)",
        vec![],
    );
    let mut executor = executor_for(fixture);
    assert!(matches!(
        executor.run("SELECT id FROM users WHERE id = 2"),
        Err(DatabaseError::UnsupportedIndex { .. })
    ));
    assert!(matches!(
        executor.run("SELECT COUNT(*) FROM users WHERE name = 'Bob'"),
        Err(DatabaseError::UnsupportedIndex { .. })
    ));
    assert_eq!(render(&mut executor, "SELECT name FROM users"), "Alice\nBob");
}

#[test]
fn test_projection_order_and_wildcard() {
    let mut executor = executor_for(users_fixture());
    assert_eq!(render(&mut executor, "SELECT name, id FROM users"), "Alice|1\nBob|2");
    assert_eq!(render(&mut executor, "SELECT * FROM users"), "1|Alice\n2|Bob");
}

#[test]
fn test_indexed_and_scanned_results_agree() {
    for id in [1, 2, 57, 99, 100] {
        let query = format!("SELECT id, country FROM companies WHERE name = 'company {id}'");
        let indexed = executor_for(companies_fixture(true)).run(&query).unwrap();
        let scanned = executor_for(companies_fixture(false)).run(&query).unwrap();
        let QueryOutput::Rows(rows) = &indexed else {
            panic!("expected rows, got {indexed:?}");
        };
        assert_eq!(rows.len(), 1, "{query}");
        assert_eq!(rows[0][0], Value::Integer(id));
        assert_eq!(indexed, scanned);
    }
}

#[test]
fn test_filter_on_unindexed_column_scans_every_page() {
    let mut executor = executor_for(companies_fixture(true));
    let QueryOutput::Rows(rows) = executor
        .run("SELECT id FROM companies WHERE country = 'eritrea'")
        .unwrap()
    else {
        panic!("expected rows");
    };
    assert_eq!(rows.len(), 20);
}

#[test]
fn test_count_on_interior_root() {
    let mut executor = executor_for(companies_fixture(false));
    assert_eq!(executor.run("SELECT COUNT(*) FROM companies").unwrap(), QueryOutput::Count(100));
    assert_eq!(
        executor.run("SELECT COUNT(*) FROM companies WHERE country = 'fiji'").unwrap(),
        QueryOutput::Count(20)
    );
}

#[test]
fn test_value_formatting() {
    let mut fixture = SqliteFixture::new(4096);
    fixture.add_table(
        "readings",
        "CREATE TABLE readings (id INTEGER PRIMARY KEY, reading REAL, note TEXT, payload BLOB)",
        vec![
            (1, vec![Value::Null, Value::Real(1.0), Value::Null, Value::Blob(b"ab".to_vec())]),
            (2, vec![Value::Null, Value::Real(-2.5), text("ok"), Value::Null]),
        ],
    );
    let mut executor = executor_for(fixture);
    assert_eq!(render(&mut executor, "SELECT * FROM readings"), "1|1||ab\n2|-2.5|ok|");
    assert_eq!(render(&mut executor, "SELECT id FROM readings WHERE reading = -2.5"), "2");
    assert_eq!(render(&mut executor, "SELECT id FROM readings WHERE note = NULL"), "");
}

#[test]
fn test_lookup_misses() {
    let mut executor = executor_for(users_fixture());
    assert!(matches!(
        executor.run("SELECT name FROM nobody"),
        Err(DatabaseError::TableNotFound { .. })
    ));
    assert!(matches!(
        executor.run("SELECT email FROM users"),
        Err(DatabaseError::ColumnNotFound { .. })
    ));
    assert!(matches!(
        executor.run("SELECT id FROM users WHERE email = 'x'"),
        Err(DatabaseError::ColumnNotFound { .. })
    ));
    assert!(matches!(
        executor.run(".indexes"),
        Err(DatabaseError::UnsupportedCommand { .. })
    ));
}

#[test]
fn test_open_from_file() -> Result<(), DatabaseError> {
    let file = users_fixture().write()?;
    let mut executor = Executor::open(file.path())?;
    let config = Config {
        column_separator: ", ".to_string(),
        ..Config::default()
    };
    assert_eq!(executor.run("SELECT id, name FROM users")?.render(&config), "1, Alice\n2, Bob");
    Ok(())
}
