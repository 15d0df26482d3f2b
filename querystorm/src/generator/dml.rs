//! DML synthesis: INSERT, lightweight DELETE, TRUNCATE, OPTIMIZE, CHECK and
//! DESCRIBE.

use querystorm_catalog::{ColumnSpecial, InsertEntry, SqlTable};
use querystorm_types::RandomGenerator;

use super::StatementGenerator;
use crate::ast::{
    CheckTable, ColumnPath, Deduplicate, DescTable, Expr, Insert, InsertSource, InsertTarget,
    LightDelete, OptimizeTable, TableRef, Truncate,
};
use crate::generator::query::ALLOW_ALL;

impl StatementGenerator {
    fn pick_attached_table(&mut self, rg: &mut RandomGenerator) -> (u32, SqlTable) {
        let tables = self.catalog.attached_tables();
        let id = *rg.pick(&tables);
        (id, self.catalog.tables[&id].clone())
    }

    /// Table or view reference for statements accepting either.
    fn pick_table_or_view(&mut self, rg: &mut RandomGenerator) -> TableRef {
        let tables = self.catalog.attached_tables();
        let views = self.catalog.attached_views();
        if !views.is_empty() && (tables.is_empty() || rg.next_bool()) {
            let id = *rg.pick(&views);
            TableRef::view(self.catalog.views[&id].db, id)
        } else {
            let id = *rg.pick(&tables);
            TableRef::table(self.catalog.tables[&id].db, id)
        }
    }

    pub(crate) fn generate_next_insert(&mut self, rg: &mut RandomGenerator) -> Insert {
        let (id, t) = self.pick_attached_table(rg);
        let mut entries = t.insertable_columns();
        rg.shuffle(&mut entries);
        let cols: Vec<ColumnPath> = entries
            .iter()
            .map(|e| ColumnPath {
                col: e.cname1,
                sub: e.cname2,
            })
            .collect();
        let target = InsertTarget::Table {
            table: TableRef::table(t.db, id),
            cols,
        };

        let noption = rg.next_medium_number();
        let source = if noption < 91 {
            InsertSource::Values(self.generate_values_rows(rg, &entries))
        } else if noption < 96 {
            InsertSource::Select(self.generate_select(
                rg,
                true,
                entries.len().max(1) as u32,
                ALLOW_ALL,
            ))
        } else {
            self.generate_expr_values(rg, &t, &entries)
        };
        Insert { target, source }
    }

    fn generate_values_rows(
        &mut self,
        rg: &mut RandomGenerator,
        entries: &[InsertEntry],
    ) -> String {
        let nrows = rg.uniform(1, *self.opts.max_insert_rows());
        let mut vg = self.value_generator();
        let mut buf = String::new();
        for i in 0..nrows {
            if i != 0 {
                buf.push_str(", ");
            }
            buf.push('(');
            for (j, entry) in entries.iter().enumerate() {
                if j != 0 {
                    buf.push_str(", ");
                }
                if entry.special == ColumnSpecial::Sign {
                    buf.push_str(if rg.next_bool() { "1" } else { "-1" });
                } else {
                    buf.push_str(&vg.any_value(rg, &entry.ctype));
                }
            }
            buf.push(')');
        }
        buf
    }

    fn generate_expr_values(
        &mut self,
        rg: &mut RandomGenerator,
        t: &SqlTable,
        entries: &[InsertEntry],
    ) -> InsertSource {
        let nrows = rg.next_small_number() % 3 + 1;
        let rel = self.build_table_relation(rg, false, "", t);
        self.pending_rels.push(rel);
        self.push_level();
        self.level_mut().allow_aggregates = false;
        self.level_mut().allow_window_funcs = false;
        let mut rows = Vec::new();
        for _ in 0..nrows {
            let row = entries
                .iter()
                .map(|entry| {
                    if entry.special == ColumnSpecial::Sign {
                        Expr::lit(if rg.next_bool() { "1" } else { "-1" })
                    } else {
                        self.generate_expression(rg)
                    }
                })
                .collect();
            rows.push(row);
        }
        self.pop_level();
        InsertSource::ValueExprs(rows)
    }

    pub(crate) fn generate_next_delete(&mut self, rg: &mut RandomGenerator) -> LightDelete {
        let (id, t) = self.pick_attached_table(rg);
        LightDelete {
            table: TableRef::table(t.db, id),
            where_: self.generate_upt_del_where(rg, &t),
        }
    }

    pub(crate) fn generate_next_truncate(&mut self, rg: &mut RandomGenerator) -> Truncate {
        let (id, t) = self.pick_attached_table(rg);
        Truncate {
            table: TableRef::table(t.db, id),
        }
    }

    pub(crate) fn generate_next_optimize(&mut self, rg: &mut RandomGenerator) -> OptimizeTable {
        let (id, t) = self.pick_attached_table(rg);
        let dedup = (rg.next_small_number() < 4).then(|| {
            let mut entries = t.flat_columns();
            if !entries.is_empty() && rg.next_small_number() < 6 {
                rg.shuffle(&mut entries);
                let ncols =
                    (rg.next_medium_number() as usize % entries.len().min(4)) + 1;
                Deduplicate::By(
                    entries
                        .into_iter()
                        .take(ncols)
                        .map(|e| ColumnPath {
                            col: e.cname1,
                            sub: e.cname2,
                        })
                        .collect(),
                )
            } else {
                Deduplicate::Plain
            }
        });
        OptimizeTable {
            table: TableRef::table(t.db, id),
            final_: t.supports_final() && rg.next_small_number() < 3,
            dedup,
        }
    }

    pub(crate) fn generate_next_check(&mut self, rg: &mut RandomGenerator) -> CheckTable {
        let (id, t) = self.pick_attached_table(rg);
        CheckTable {
            table: TableRef::table(t.db, id),
            single_result: rg.next_small_number() < 4,
        }
    }

    pub(crate) fn generate_next_desc(&mut self, rg: &mut RandomGenerator) -> DescTable {
        DescTable {
            table: self.pick_table_or_view(rg),
            sub_cols: rg.next_small_number() < 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querystorm_catalog::{DefaultModifier, SqlColumn, TableEngine};
    use querystorm_types::SqlType;
    use crate::GeneratorOptions;

    fn seeded_generator() -> StatementGenerator {
        let mut gen = StatementGenerator::new(GeneratorOptions::default());
        let mut t = SqlTable::new(0, Some(0), TableEngine::MergeTree);
        for (id, dmod) in [(0, None), (1, None), (2, Some(DefaultModifier::Alias))] {
            t.cols.insert(
                id,
                SqlColumn {
                    id,
                    ctype: SqlType::Int {
                        bits: 32,
                        signed: true,
                    },
                    special: ColumnSpecial::None,
                    nullable: None,
                    dmod,
                },
            );
        }
        gen.catalog.databases.insert(
            0,
            querystorm_catalog::SqlDatabase {
                id: 0,
                attached: querystorm_catalog::DetachStatus::Attached,
                engine: querystorm_catalog::DatabaseEngine::Atomic,
                zoo_path: None,
            },
        );
        gen.catalog.tables.insert(0, t);
        gen
    }

    #[test]
    fn test_insert_lists_only_insertable_columns() {
        let mut gen = seeded_generator();
        let mut rg = RandomGenerator::new(31);
        for _ in 0..50 {
            let insert = gen.generate_next_insert(&mut rg);
            let InsertTarget::Table { cols, .. } = &insert.target else {
                panic!("expected table target");
            };
            let mut ids: Vec<u32> = cols.iter().map(|c| c.col).collect();
            ids.sort();
            assert_eq!(ids, vec![0, 1], "alias column must not be insertable");
        }
    }

    #[test]
    fn test_insert_values_row_arity() {
        let mut gen = seeded_generator();
        let mut rg = RandomGenerator::new(8);
        for _ in 0..100 {
            let insert = gen.generate_next_insert(&mut rg);
            if let InsertSource::ValueExprs(rows) = &insert.source {
                for row in rows {
                    assert_eq!(row.len(), 2);
                }
            }
        }
    }

    #[test]
    fn test_optimize_targets_table_columns() {
        let mut gen = seeded_generator();
        let mut rg = RandomGenerator::new(12);
        for _ in 0..100 {
            let opt = gen.generate_next_optimize(&mut rg);
            assert_eq!(opt.table.to_string(), "d0.t0");
            if let Some(Deduplicate::By(cols)) = &opt.dedup {
                assert!(!cols.is_empty() && cols.len() <= 3);
            }
        }
    }
}
