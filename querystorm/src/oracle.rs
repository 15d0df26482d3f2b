//! Metamorphic oracles: correlated statement pairs whose result digests must
//! coincide.
//!
//! Each oracle builds its statements through the statement generator, runs
//! them through the external client, and compares SHA-256 digests of the
//! server's output file. A one-sided failure skips the comparison entirely:
//! invalid queries are expected and carry no signal.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::warn;
use querystorm_catalog::SqlTable;
use querystorm_types::RandomGenerator;
use sha2::{Digest, Sha256};

use crate::ast::{
    BinaryOp, Expr, FileCompression, FileFunc, FromClause, FromItem, Insert, InsertSource,
    InsertTarget, IntoFile, OrderBy, OrderDirection, OrderTerm, ResultCol, Select, SelectBody,
    SelectCore, SetValue, Statement, TableRef, TopSelect, Truncate, WireFormat,
};
use crate::client::SqlClient;
use crate::generator::query::ALLOW_ALL;
use crate::generator::StatementGenerator;
use crate::{Error, Result};

const QUERY_FILE: &str = "query.data";
const TABLE_FILE: &str = "table.data";

/// Builds oracle statement pairs and tracks the per-pair execution state
/// machine (`first_ok`, `first_digest`, `second_ok`, `second_digest`).
pub struct QueryOracle {
    db_file_path: PathBuf,
    first_success: bool,
    second_success: bool,
    first_digest: Option<[u8; 32]>,
    second_digest: Option<[u8; 32]>,
    flipped_settings: Vec<SetValue>,
}

impl QueryOracle {
    pub fn new(db_file_path: impl Into<PathBuf>) -> QueryOracle {
        QueryOracle {
            db_file_path: db_file_path.into(),
            first_success: false,
            second_success: false,
            first_digest: None,
            second_digest: None,
            flipped_settings: Vec::new(),
        }
    }

    pub fn query_outfile(&self) -> PathBuf {
        self.db_file_path.join(QUERY_FILE)
    }

    pub fn table_outfile(&self) -> PathBuf {
        self.db_file_path.join(TABLE_FILE)
    }

    fn reset(&mut self) {
        self.first_success = false;
        self.second_success = false;
        self.first_digest = None;
        self.second_digest = None;
    }

    fn into_query_file(&self) -> Option<IntoFile> {
        Some(IntoFile {
            path: self.query_outfile(),
            truncate: true,
        })
    }

    // -- correctness oracle -------------------------------------------------
    //
    // SELECT COUNT(*) FROM F WHERE P                 (or GROUP BY/HAVING forms)
    // SELECT ifNull(SUM(P), 0) FROM F
    //
    // Counting the rows satisfying a boolean equals summing that boolean.

    /// The counting side of the pair. The derived side is produced from the
    /// returned statement by [`correctness_second_from_first`](Self::correctness_second_from_first).
    pub fn generate_correctness_first(
        &mut self,
        rg: &mut RandomGenerator,
        gen: &mut StatementGenerator,
    ) -> TopSelect {
        self.reset();
        gen.set_allow_not_deterministic(false);
        gen.set_enforce_final(true);
        gen.push_level();
        let from = gen.generate_from_statement(rg);
        {
            let level = gen.level_mut();
            level.allow_aggregates = false;
            level.allow_window_funcs = false;
        }
        // 0: WHERE only, 1: GROUP BY + HAVING, 2: WHERE + GROUP BY + HAVING.
        let combination = rg.next_large_number() % 3;
        let mut core = SelectCore {
            from,
            ..SelectCore::default()
        };
        if combination != 1 {
            core.where_ = Some(Expr::binary(
                BinaryOp::Eq,
                gen.generate_where_predicate(rg),
                Expr::lit("TRUE"),
            ));
        }
        if combination != 0 {
            let (group_by, having) = gen.generate_group_by(rg, 1, true);
            core.group_by = Some(group_by);
            core.having = having.map(|h| Expr::binary(BinaryOp::Eq, h, Expr::lit("TRUE")));
        }
        core.columns = vec![ResultCol {
            expr: Expr::func("COUNT", vec![Expr::lit("*")]),
            alias: None,
        }];
        gen.pop_level();
        gen.set_allow_not_deterministic(true);
        gen.set_enforce_final(false);

        TopSelect {
            select: Select::from_core(core),
            into_file: self.into_query_file(),
            format: Some(WireFormat::CSV),
        }
    }

    /// Derives the summing side by moving the counted predicate into
    /// `ifNull(SUM(..), 0)`.
    pub fn correctness_second_from_first(&self, first: &TopSelect) -> TopSelect {
        let SelectBody::Core(first_core) = &first.select.body else {
            unreachable!("correctness oracle emits a plain select core")
        };
        let sum_of = |pred: Expr| {
            Expr::func(
                "ifNull",
                vec![Expr::func("SUM", vec![pred]), Expr::lit("0")],
            )
        };
        let core = match (&first_core.group_by, &first_core.having) {
            (Some(group_by), Some(having)) => SelectCore {
                columns: vec![ResultCol {
                    expr: sum_of(having.clone()),
                    alias: None,
                }],
                from: first_core.from.clone(),
                where_: first_core.where_.clone(),
                group_by: Some(group_by.clone()),
                ..SelectCore::default()
            },
            _ => SelectCore {
                columns: vec![ResultCol {
                    expr: sum_of(
                        first_core
                            .where_
                            .clone()
                            .expect("counting side carries a predicate"),
                    ),
                    alias: None,
                }],
                from: first_core.from.clone(),
                ..SelectCore::default()
            },
        };
        TopSelect {
            select: Select::from_core(core),
            into_file: self.into_query_file(),
            format: Some(WireFormat::CSV),
        }
    }

    /// Runs the full correctness pair against `client`.
    pub fn correctness_oracle(
        &mut self,
        rg: &mut RandomGenerator,
        gen: &mut StatementGenerator,
        client: &mut dyn SqlClient,
    ) -> Result<()> {
        let first = self.generate_correctness_first(rg, gen);
        let second = self.correctness_second_from_first(&first);
        let ok = client.execute(&Statement::Select(first).to_string())?;
        self.process_oracle_result(true, ok, "correctness")?;
        let ok = client.execute(&Statement::Select(second).to_string())?;
        self.process_oracle_result(false, ok, "correctness")
    }

    // -- dump/reload oracle -------------------------------------------------

    fn table_from_item(t: &SqlTable) -> FromItem {
        FromItem::Table {
            table: TableRef::table(t.db, t.id),
            alias: None,
            final_: t.supports_final(),
        }
    }

    /// Ordered dump of the table's insertable columns into the query file.
    /// Nested columns travel whole, not expanded into subcolumns.
    pub fn dump_table_content(&mut self, rg: &mut RandomGenerator, t: &SqlTable) -> TopSelect {
        let mut columns = Vec::new();
        let mut order_terms = Vec::new();
        for col in t.cols.values().filter(|c| c.can_be_inserted()) {
            let name = format!("c{}", col.id);
            columns.push(ResultCol {
                expr: Expr::col(name.clone()),
                alias: None,
            });
            order_terms.push(OrderTerm {
                expr: Expr::col(name),
                direction: rg.next_bool().then(|| {
                    if rg.next_bool() {
                        OrderDirection::Asc
                    } else {
                        OrderDirection::Desc
                    }
                }),
            });
        }
        // A table whose columns all carry non-insertable modifiers still
        // dumps deterministically via ORDER BY ALL.
        let order_by = if order_terms.is_empty() {
            OrderBy::All
        } else {
            OrderBy::Terms(order_terms)
        };
        let core = SelectCore {
            columns,
            from: Some(FromClause {
                first: Self::table_from_item(t),
                joins: Vec::new(),
            }),
            order_by: Some(order_by),
            ..SelectCore::default()
        };
        TopSelect {
            select: Select::from_core(core),
            into_file: self.into_query_file(),
            format: Some(WireFormat::CSV),
        }
    }

    /// Exports the table into `table.data` through a randomly chosen wire
    /// format (ArrowStream falls back to CSV when a UUID column is present).
    pub fn generate_export(&mut self, rg: &mut RandomGenerator, t: &SqlTable) -> Result<Insert> {
        let path = self.table_outfile();
        if path.exists() {
            fs::remove_file(&path)?;
        }
        let mut format = *rg.pick(&WireFormat::DUMP_RELOAD_POOL);
        let mut structure = String::new();
        let mut columns = Vec::new();
        for (i, col) in t.cols.values().filter(|c| c.can_be_inserted()).enumerate() {
            if i != 0 {
                structure.push_str(", ");
            }
            let name = format!("c{}", col.id);
            structure.push_str(&name);
            structure.push(' ');
            col.ctype.render(true, &mut structure);
            if let Some(nullable) = col.nullable {
                structure.push_str(if nullable { " NULL" } else { " NOT NULL" });
            }
            if format == WireFormat::ArrowStream && col.ctype.contains_uuid() {
                format = WireFormat::CSV;
            }
            columns.push(ResultCol {
                expr: Expr::col(name),
                alias: None,
            });
        }
        let compression = (rg.next_small_number() < 4)
            .then(|| *rg.pick(&FileCompression::ALL));
        let select = Select::from_core(SelectCore {
            columns,
            from: Some(FromClause {
                first: Self::table_from_item(t),
                joins: Vec::new(),
            }),
            ..SelectCore::default()
        });
        Ok(Insert {
            target: InsertTarget::FileFunc(FileFunc {
                path,
                format,
                structure,
                compression,
            }),
            source: InsertSource::Select(select),
        })
    }

    pub fn generate_clear(&self, t: &SqlTable) -> Truncate {
        Truncate {
            table: TableRef::table(t.db, t.id),
        }
    }

    /// Re-imports the exported file through the IN mate of the export
    /// format.
    pub fn generate_import(&self, t: &SqlTable, export: &Insert) -> Insert {
        let InsertTarget::FileFunc(file) = &export.target else {
            unreachable!("import derives from a file export")
        };
        let cols = t
            .cols
            .values()
            .filter(|c| c.can_be_inserted())
            .map(|c| crate::ast::ColumnPath::new(c.id))
            .collect();
        let format = file.format.in_mate();
        let settings = if format == WireFormat::CSV {
            vec![SetValue {
                name: "input_format_csv_detect_header".to_string(),
                value: "0".to_string(),
            }]
        } else {
            Vec::new()
        };
        Insert {
            target: InsertTarget::Table {
                table: TableRef::table(t.db, t.id),
                cols,
            },
            source: InsertSource::InFile {
                path: file.path.clone(),
                format,
                compression: file.compression,
                settings,
            },
        }
    }

    /// Runs the dump → export → truncate → import → dump sequence. The two
    /// dumps must digest identically.
    pub fn dump_reload_oracle(
        &mut self,
        rg: &mut RandomGenerator,
        t: &SqlTable,
        client: &mut dyn SqlClient,
    ) -> Result<()> {
        self.reset();
        let dump = self.dump_table_content(rg, t);
        let ok = client.execute(&Statement::Select(dump.clone()).to_string())?;
        self.process_oracle_result(true, ok, "dump/reload")?;

        let export = self.generate_export(rg, t)?;
        let clear = self.generate_clear(t);
        let import = self.generate_import(t, &export);
        client.execute(&Statement::Insert(export).to_string())?;
        client.execute(&Statement::Truncate(clear).to_string())?;
        client.execute(&Statement::Insert(import).to_string())?;

        let ok = client.execute(&Statement::Select(dump).to_string())?;
        self.process_oracle_result(false, ok, "dump/reload")
    }

    // -- settings oracle ----------------------------------------------------

    /// SET statement with 1–3 settings; the values to flip to are remembered
    /// for the second side.
    pub fn generate_first_setting(&mut self, rg: &mut RandomGenerator) -> Vec<SetValue> {
        let nsets = if rg.next_bool() {
            1
        } else {
            rg.next_small_number() % 3 + 1
        };
        self.flipped_settings.clear();
        let mut values = Vec::new();
        for _ in 0..nsets {
            let setting = rg.pick(querystorm_catalog::server_settings());
            let first_idx = rg.uniform(0, setting.values.len() as u32 - 1) as usize;
            let mut second_idx = rg.uniform(0, setting.values.len() as u32 - 1) as usize;
            if second_idx == first_idx {
                second_idx = (second_idx + 1) % setting.values.len();
            }
            values.push(SetValue {
                name: setting.name.to_string(),
                value: setting.values[first_idx].clone(),
            });
            self.flipped_settings.push(SetValue {
                name: setting.name.to_string(),
                value: setting.values[second_idx].clone(),
            });
        }
        values
    }

    pub fn generate_second_setting(&self) -> Vec<SetValue> {
        self.flipped_settings.clone()
    }

    /// The invariant query: a random top select wrapped in
    /// `SELECT * FROM (..) ORDER BY ALL` so row order cannot differ.
    pub fn generate_setting_query(
        &mut self,
        rg: &mut RandomGenerator,
        gen: &mut StatementGenerator,
    ) -> TopSelect {
        gen.set_allow_not_deterministic(false);
        let inner = gen.generate_top_select(rg, ALLOW_ALL, None);
        gen.set_allow_not_deterministic(true);
        let core = SelectCore {
            from: Some(FromClause {
                first: FromItem::Derived {
                    select: Box::new(inner.select),
                    alias: "s0".to_string(),
                },
                joins: Vec::new(),
            }),
            order_by: Some(OrderBy::All),
            ..SelectCore::default()
        };
        TopSelect {
            select: Select::from_core(core),
            into_file: self.into_query_file(),
            format: Some(WireFormat::CSV),
        }
    }

    /// Runs the settings pair: the same query under flipped settings must
    /// digest identically.
    pub fn settings_oracle(
        &mut self,
        rg: &mut RandomGenerator,
        gen: &mut StatementGenerator,
        client: &mut dyn SqlClient,
    ) -> Result<()> {
        self.reset();
        let first_set = self.generate_first_setting(rg);
        let query = self.generate_setting_query(rg, gen);
        let query_text = Statement::Select(query).to_string();

        client.execute(&Statement::Set(first_set).to_string())?;
        let ok = client.execute(&query_text)?;
        self.process_oracle_result(true, ok, "settings")?;

        client.execute(&Statement::Set(self.generate_second_setting()).to_string())?;
        let ok = client.execute(&query_text)?;
        self.process_oracle_result(false, ok, "settings")
    }

    // -- execution state machine --------------------------------------------

    /// Records one side's outcome; after the second side, compares digests.
    /// An unreadable output file demotes the side to a failure so no
    /// comparison happens.
    pub fn process_oracle_result(
        &mut self,
        first: bool,
        success: bool,
        oracle_name: &str,
    ) -> Result<()> {
        let mut success = success;
        let digest = if success {
            match hash_file(&self.query_outfile()) {
                Ok(digest) => Some(digest),
                Err(err) => {
                    warn!("could not digest oracle output: {err}");
                    success = false;
                    None
                }
            }
        } else {
            None
        };
        if first {
            self.first_success = success;
            self.first_digest = digest;
        } else {
            self.second_success = success;
            self.second_digest = digest;
            if self.first_success && self.second_success && self.first_digest != self.second_digest
            {
                warn!("{oracle_name} oracle mismatch");
                return Err(Error::OracleMismatch {
                    oracle: oracle_name.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn hash_file(path: &Path) -> io::Result<[u8; 32]> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use querystorm_catalog::{ColumnSpecial, SqlColumn, TableEngine};
    use querystorm_types::SqlType;

    fn table_with_cols() -> SqlTable {
        let mut t = SqlTable::new(0, Some(0), TableEngine::MergeTree);
        for (id, ctype) in [
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
                id,
                SqlColumn {
                    id,
                    ctype,
                    special: ColumnSpecial::None,
                    nullable: None,
                    dmod: None,
                },
            );
        }
        t
    }

    #[test]
    fn test_correctness_transform_where_only() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = QueryOracle::new(dir.path());
        let pred = Expr::binary(
            BinaryOp::Eq,
            Expr::binary(BinaryOp::Gt, Expr::col("c0"), Expr::lit("0")),
            Expr::lit("TRUE"),
        );
        let core = SelectCore {
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
            where_: Some(pred),
            ..SelectCore::default()
        };
        let first = TopSelect {
            select: Select::from_core(core),
            into_file: None,
            format: None,
        };
        let second = oracle.correctness_second_from_first(&first);
        assert_eq!(
            second.select.to_string(),
            "SELECT ifNull(SUM((c0 > 0) = TRUE), 0) FROM d0.t0"
        );
    }

    #[test]
    fn test_matching_digests_pass_and_differing_fail() {
        let dir = tempfile::tempdir().unwrap();
        let mut oracle = QueryOracle::new(dir.path());
        fs::write(oracle.query_outfile(), b"same").unwrap();
        oracle.process_oracle_result(true, true, "correctness").unwrap();
        oracle
            .process_oracle_result(false, true, "correctness")
            .unwrap();

        oracle.reset();
        fs::write(oracle.query_outfile(), b"one").unwrap();
        oracle.process_oracle_result(true, true, "correctness").unwrap();
        fs::write(oracle.query_outfile(), b"two").unwrap();
        let err = oracle
            .process_oracle_result(false, true, "correctness")
            .unwrap_err();
        assert!(matches!(err, Error::OracleMismatch { .. }));
    }

    #[test]
    fn test_failed_side_skips_comparison() {
        let dir = tempfile::tempdir().unwrap();
        let mut oracle = QueryOracle::new(dir.path());
        fs::write(oracle.query_outfile(), b"one").unwrap();
        oracle.process_oracle_result(true, true, "settings").unwrap();
        // Second side failed server-side, digests must not be compared.
        oracle.process_oracle_result(false, false, "settings").unwrap();
    }

    #[test]
    fn test_missing_output_file_is_treated_as_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let mut oracle = QueryOracle::new(dir.path());
        // No file written at all: success demotes to failure, no panic.
        oracle.process_oracle_result(true, true, "dump/reload").unwrap();
        fs::write(oracle.query_outfile(), b"data").unwrap();
        oracle
            .process_oracle_result(false, true, "dump/reload")
            .unwrap();
    }

    #[test]
    fn test_import_mirrors_export_format_and_compression() {
        let dir = tempfile::tempdir().unwrap();
        let mut oracle = QueryOracle::new(dir.path());
        let mut rg = RandomGenerator::new(77);
        let t = table_with_cols();
        for _ in 0..100 {
            let export = oracle.generate_export(&mut rg, &t).unwrap();
            let import = oracle.generate_import(&t, &export);
            let InsertTarget::FileFunc(file) = &export.target else {
                panic!("export must target a file function")
            };
            let InsertSource::InFile {
                format,
                compression,
                ..
            } = &import.source
            else {
                panic!("import must read from a file")
            };
            assert_eq!(*format, file.format.in_mate());
            assert_eq!(*compression, file.compression);
        }
    }

    #[test]
    fn test_export_structure_lists_all_insertable_columns() {
        let dir = tempfile::tempdir().unwrap();
        let mut oracle = QueryOracle::new(dir.path());
        let mut rg = RandomGenerator::new(5);
        let t = table_with_cols();
        let export = oracle.generate_export(&mut rg, &t).unwrap();
        let InsertTarget::FileFunc(file) = &export.target else {
            panic!("export must target a file function")
        };
        assert_eq!(file.structure, "c0 Int32, c1 String");
    }

    #[test]
    fn test_uuid_forces_csv_for_arrow_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut oracle = QueryOracle::new(dir.path());
        let mut rg = RandomGenerator::new(6);
        let mut t = table_with_cols();
        t.cols.insert(
            2,
            SqlColumn {
                id: 2,
                ctype: SqlType::Uuid,
                special: ColumnSpecial::None,
                nullable: None,
                dmod: None,
            },
        );
        for _ in 0..500 {
            let export = oracle.generate_export(&mut rg, &t).unwrap();
            let InsertTarget::FileFunc(file) = &export.target else {
                panic!("export must target a file function")
            };
            assert_ne!(file.format, WireFormat::ArrowStream);
        }
    }
}
