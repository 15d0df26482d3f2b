//! End-to-end scenarios driven against the offline mock client.

use querystorm::ast::*;
use querystorm::{
    update_generator, GeneratorOptions, MockClient, QueryOracle, SqlClient, StatementGenerator,
};
use querystorm_catalog::{
    Catalog, ColumnSpecial, DatabaseEngine, DetachStatus, SqlColumn, SqlDatabase, SqlTable,
    SqlView, TableEngine,
};
use querystorm_types::{RandomGenerator, SqlType};

fn int32_string_table(catalog: &mut Catalog) {
    let db = catalog.next_database_id();
    catalog.databases.insert(
        db,
        SqlDatabase {
            id: db,
            attached: DetachStatus::Attached,
            engine: DatabaseEngine::Atomic,
            zoo_path: None,
        },
    );
    let id = catalog.next_table_id();
    let mut t = SqlTable::new(id, Some(db), TableEngine::MergeTree);
    for (cid, ctype) in [
        (
            0,
            SqlType::Int {
                bits: 32,
                signed: true,
            },
        ),
        (1, SqlType::String { fixed_len: None }),
    ] {
        t.cols.insert(
            cid,
            SqlColumn {
                id: cid,
                ctype,
                special: ColumnSpecial::None,
                nullable: None,
                dmod: None,
            },
        );
        t.col_counter += 1;
    }
    catalog.tables.insert(id, t);
}

#[test]
fn test_catalog_warmup() {
    let mut catalog = Catalog::new();

    let db = catalog.next_database_id();
    catalog.staged_databases.insert(
        db,
        SqlDatabase {
            id: db,
            attached: DetachStatus::Attached,
            engine: DatabaseEngine::Atomic,
            zoo_path: None,
        },
    );
    let create_db = Statement::CreateDatabase(CreateDatabase {
        db,
        engine: DatabaseEngine::Atomic,
        zoo_path: None,
    });
    assert_eq!(create_db.to_string(), "CREATE DATABASE d0 ENGINE = Atomic");
    update_generator(&mut catalog, &create_db, true);

    let id = catalog.next_table_id();
    let mut staged = SqlTable::new(id, Some(db), TableEngine::MergeTree);
    let mut items = Vec::new();
    for (cid, ctype) in [
        (
            staged.col_counter,
            SqlType::Int {
                bits: 32,
                signed: true,
            },
        ),
        (staged.col_counter + 1, SqlType::String { fixed_len: None }),
    ] {
        staged.cols.insert(
            cid,
            SqlColumn {
                id: cid,
                ctype: ctype.clone(),
                special: ColumnSpecial::None,
                nullable: None,
                dmod: None,
            },
        );
        items.push(TableDefItem::Column(ColumnDef {
            path: ColumnPath::new(cid),
            ctype,
            nullable: None,
            default: None,
            codecs: Vec::new(),
            statistics: Vec::new(),
            settings: Vec::new(),
        }));
    }
    staged.col_counter += 2;
    catalog.staged_tables.insert(id, staged);
    let create_table = Statement::CreateTable(CreateTable {
        replace: false,
        is_temp: false,
        table: TableRef::table(Some(db), id),
        body: CreateTableBody::Defined(items),
        engine: EngineClause::bare(TableEngine::MergeTree),
        settings: Vec::new(),
        as_select: None,
    });
    assert!(create_table
        .to_string()
        .starts_with("CREATE TABLE d0.t0 (c0 Int32, c1 String)"));
    update_generator(&mut catalog, &create_table, true);

    assert_eq!(catalog.databases.len(), 1);
    assert_eq!(catalog.attached_tables(), vec![0]);
    let t = &catalog.tables[&0];
    assert_eq!(t.db, Some(0));
    assert_eq!(t.cols.len(), 2);
    assert!(catalog.no_staged_state());
    // Counters advanced past the created objects.
    assert_eq!(catalog.next_database_id(), 1);
    assert_eq!(catalog.next_table_id(), 1);
}

#[test]
fn test_insert_then_count_oracle() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = Catalog::new();
    int32_string_table(&mut catalog);
    let mut client = MockClient::new();

    let insert = Statement::Insert(Insert {
        target: InsertTarget::Table {
            table: TableRef::table(Some(0), 0),
            cols: vec![ColumnPath::new(0), ColumnPath::new(1)],
        },
        source: InsertSource::Values("(1, 'a'), (2, 'b')".to_string()),
    });
    assert_eq!(
        insert.to_string(),
        "INSERT INTO d0.t0 (c0, c1) VALUES (1, 'a'), (2, 'b')"
    );
    assert!(client.execute(&insert.to_string()).unwrap());
    update_generator(&mut catalog, &insert, true);

    let mut oracle = QueryOracle::new(dir.path());
    let predicate = Expr::binary(
        BinaryOp::Eq,
        Expr::binary(BinaryOp::Gt, Expr::col("c0"), Expr::lit("0")),
        Expr::lit("TRUE"),
    );
    let first = TopSelect {
        select: Select::from_core(SelectCore {
            columns: vec![ResultCol {
                expr: Expr::func("COUNT", vec![Expr::lit("*")]),
                alias: None,
            }],
            from: Some(FromClause {
                first: FromItem::Table {
                    table: TableRef::table(Some(0), 0),
                    alias: None,
                    final_: false,
                },
                joins: Vec::new(),
            }),
            where_: Some(predicate),
            ..SelectCore::default()
        }),
        into_file: Some(IntoFile {
            path: dir.path().join("query.data"),
            truncate: true,
        }),
        format: Some(WireFormat::CSV),
    };
    assert_eq!(
        first.select.to_string(),
        "SELECT COUNT(*) FROM d0.t0 WHERE (c0 > 0) = TRUE"
    );
    let second = oracle.correctness_second_from_first(&first);
    assert_eq!(
        second.select.to_string(),
        "SELECT ifNull(SUM((c0 > 0) = TRUE), 0) FROM d0.t0"
    );

    let ok = client.execute(&Statement::Select(first).to_string()).unwrap();
    oracle.process_oracle_result(true, ok, "correctness").unwrap();
    let ok = client
        .execute(&Statement::Select(second).to_string())
        .unwrap();
    oracle
        .process_oracle_result(false, ok, "correctness")
        .unwrap();
}

#[test]
fn test_dump_reload_idempotence() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = Catalog::new();
    int32_string_table(&mut catalog);
    let mut client = MockClient::new();
    let mut rg = RandomGenerator::new(42);
    let mut oracle = QueryOracle::new(dir.path());

    let t = catalog.tables[&0].clone();
    oracle.dump_reload_oracle(&mut rg, &t, &mut client).unwrap();

    // The dump ran twice around export/truncate/import.
    let dumps: Vec<&String> = client
        .executed
        .iter()
        .filter(|s| s.starts_with("SELECT c0, c1 FROM d0.t0"))
        .collect();
    assert_eq!(dumps.len(), 2);
    assert_eq!(dumps[0], dumps[1]);
    assert!(client.executed.iter().any(|s| s == "TRUNCATE TABLE d0.t0"));
    assert!(client
        .executed
        .iter()
        .any(|s| s.contains("FROM INFILE") && s.contains("table.data")));
}

#[test]
fn test_exchange_involution() {
    let mut catalog = Catalog::new();
    int32_string_table(&mut catalog);
    let id = catalog.next_table_id();
    let mut t1 = SqlTable::new(id, Some(0), TableEngine::Log);
    t1.cols.insert(
        0,
        SqlColumn {
            id: 0,
            ctype: SqlType::Uuid,
            special: ColumnSpecial::None,
            nullable: None,
            dmod: None,
        },
    );
    catalog.tables.insert(id, t1);

    let snapshot: Vec<(u32, Vec<SqlType>)> = catalog
        .tables
        .values()
        .map(|t| (t.id, t.cols.values().map(|c| c.ctype.clone()).collect()))
        .collect();

    let exchange = Statement::Exchange(ExchangeTables {
        lhs: TableRef::table(Some(0), 0),
        rhs: TableRef::table(Some(0), 1),
    });
    assert_eq!(exchange.to_string(), "EXCHANGE TABLES d0.t0 AND d0.t1");
    update_generator(&mut catalog, &exchange, true);
    let swapped: Vec<SqlType> = catalog.tables[&0]
        .cols
        .values()
        .map(|c| c.ctype.clone())
        .collect();
    assert_eq!(swapped, vec![SqlType::Uuid]);

    update_generator(&mut catalog, &exchange, true);
    let restored: Vec<(u32, Vec<SqlType>)> = catalog
        .tables
        .values()
        .map(|t| (t.id, t.cols.values().map(|c| c.ctype.clone()).collect()))
        .collect();
    assert_eq!(snapshot, restored);
}

#[test]
fn test_drop_database_cascade() {
    let mut catalog = Catalog::new();
    int32_string_table(&mut catalog);
    let id = catalog.next_table_id();
    catalog
        .tables
        .insert(id, SqlTable::new(id, Some(0), TableEngine::Log));
    let vid = catalog.next_view_id();
    catalog.views.insert(vid, SqlView::new(vid, Some(0)));

    let drop = Statement::Drop(Drop {
        object: ObjectRef::Database(0),
        is_temp: false,
        if_empty: false,
        sync: false,
    });
    update_generator(&mut catalog, &drop, true);
    assert!(catalog.tables.is_empty());
    assert!(catalog.views.is_empty());
    assert!(catalog.databases.is_empty());
}

#[test]
fn test_settings_oracle_round() {
    let dir = tempfile::tempdir().unwrap();
    let mut gen = StatementGenerator::new(
        GeneratorOptions::new().with_db_file_path(dir.path().to_path_buf()),
    );
    let mut rg = RandomGenerator::new(9);
    let mut client = MockClient::new();
    let mut oracle = QueryOracle::new(dir.path());

    for _ in 0..10 {
        oracle.settings_oracle(&mut rg, &mut gen, &mut client).unwrap();
    }
    // Two SETs and two identical SELECTs per round.
    let sets = client.executed.iter().filter(|s| s.starts_with("SET ")).count();
    assert_eq!(sets, 20);
    let selects: Vec<&String> = client
        .executed
        .iter()
        .filter(|s| s.starts_with("SELECT * FROM ("))
        .collect();
    assert_eq!(selects.len(), 20);
    for pair in selects.chunks(2) {
        assert_eq!(pair[0], pair[1]);
        assert!(pair[0].ends_with("FORMAT CSV"));
        assert!(pair[0].contains("ORDER BY ALL"));
    }
}

#[test]
fn test_fuzz_loop_smoke() {
    let dir = tempfile::tempdir().unwrap();
    let mut gen = StatementGenerator::new(
        GeneratorOptions::new().with_db_file_path(dir.path().to_path_buf()),
    );
    let mut rg = RandomGenerator::new(1234);
    let mut client = MockClient::new();
    let mut oracle = QueryOracle::new(dir.path());

    for iteration in 0..600u32 {
        let stmt = gen.generate_next_statement(&mut rg);
        let success = client.execute(&stmt.to_string()).unwrap();
        update_generator(&mut gen.catalog, &stmt, success);
        assert!(gen.catalog.no_staged_state());

        if iteration % 100 == 99 {
            if !gen.catalog.attached_tables().is_empty() {
                oracle
                    .correctness_oracle(&mut rg, &mut gen, &mut client)
                    .unwrap();
            }
            let candidates = gen.catalog.attached_tables_for_oracle();
            if !candidates.is_empty() {
                let id = *rg.pick(&candidates);
                let t = gen.catalog.tables[&id].clone();
                oracle.dump_reload_oracle(&mut rg, &t, &mut client).unwrap();
            }
            oracle
                .settings_oracle(&mut rg, &mut gen, &mut client)
                .unwrap();
        }
    }
}
