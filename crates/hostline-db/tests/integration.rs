use hostline_db::{create_pool, run_migrations, DbRuntimeSettings};

#[test]
fn db_initialization_works() {
    let pool =
        create_pool(":memory:", DbRuntimeSettings::default()).expect("failed to create pool");
    let conn = pool.get().expect("failed to get connection");
    let applied = run_migrations(&conn).expect("failed to run migrations");
    assert_eq!(applied, 6);

    // Verify table set (excluding sqlite_sequence and internal tables)
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
        .expect("failed to prepare table query");
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .expect("failed to execute table query")
        .map(|r| r.expect("failed to read table name"))
        .collect();

    for expected in [
        "_hostline_migrations",
        "call_events",
        "calls",
        "menu_items",
        "orders",
        "reservations",
        "transcript_turns",
    ] {
        assert!(
            tables.iter().any(|t| t == expected),
            "missing table {expected}, got {tables:?}"
        );
    }
}

#[test]
fn file_backed_db_persists_across_pools() {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let path = dir.path().join("hostline.db");
    let path_str = path.to_str().expect("utf-8 path");

    {
        let pool = create_pool(path_str, DbRuntimeSettings::default())
            .expect("failed to create first pool");
        let conn = pool.get().expect("failed to get connection");
        run_migrations(&conn).expect("failed to run migrations");
        conn.execute(
            "INSERT INTO calls (call_sid, from_number) VALUES ('CA-persist', '+15550001111')",
            [],
        )
        .expect("failed to insert call");
    }

    let pool = create_pool(path_str, DbRuntimeSettings::default())
        .expect("failed to create second pool");
    let conn = pool.get().expect("failed to get connection");
    let sid: String = conn
        .query_row("SELECT call_sid FROM calls WHERE id = 1", [], |row| {
            row.get(0)
        })
        .expect("call row should persist");
    assert_eq!(sid, "CA-persist");
}
