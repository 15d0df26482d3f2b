//! DDL synthesis: CREATE TABLE/VIEW/DATABASE/FUNCTION, ALTER, DROP,
//! ATTACH/DETACH and EXCHANGE, staging every new object in the catalog.

use querystorm_catalog::{
    merge_tree_column_settings, merge_tree_table_settings, ColumnSpecial, DatabaseEngine,
    DefaultModifier, DetachStatus, EngineOption, InsertEntry, SqlColumn, SqlDatabase, SqlFunction,
    SqlIndex, SqlTable, SqlView, TableEngine,
};
use querystorm_types::{mask, RandomGenerator, SqlType, TypeGenerator};

use super::{SqlRelation, SqlRelationCol, StatementGenerator};
use crate::ast::{
    AddPosition, AlterItem, AlterTable, Attach, ColumnDef, ColumnPath, ColumnProperty,
    ConstraintDef, ConstraintKind, CreateDatabase, CreateFunction, CreateTable, CreateTableBody,
    CreateView, Detach, Drop, EngineClause, ExchangeTables, Expr, IndexDef, IndexKind, IndexParam,
    ObjectRef, ProjectionDef, RefreshPolicy, RefreshPolicyKind, SetValue, StatType, TableDefItem,
    TableRef,
};
use crate::generator::query::{ALLOW_ALL, ALLOW_GROUPBY, ALLOW_ORDERBY, ALLOW_PREWHERE};

#[derive(Clone, Copy)]
enum TableDefKind {
    Column,
    Index,
    Projection,
    Constraint,
    Sign,
    Version,
}

#[derive(Clone, Copy)]
enum AlterKind {
    OrderBy,
    HeavyDelete,
    HeavyUpdate,
    AddColumn,
    MaterializeColumn,
    DropColumn,
    RenameColumn,
    ModifyColumn,
    DeleteMask,
    AddStats,
    ModStats,
    DropStats,
    ClearStats,
    MatStats,
    AddIndex,
    MaterializeIndex,
    ClearIndex,
    DropIndex,
    ColumnRemoveProperty,
    ColumnModifySetting,
    ColumnRemoveSetting,
    TableModifySetting,
    TableRemoveSetting,
    AddProjection,
    RemoveProjection,
    MaterializeProjection,
    ClearProjection,
    AddConstraint,
    RemoveConstraint,
}

#[derive(Clone, Copy)]
enum TargetKind {
    Table,
    View,
    Database,
}

impl StatementGenerator {
    pub(crate) fn generate_next_create_database(
        &mut self,
        rg: &mut RandomGenerator,
    ) -> CreateDatabase {
        let id = self.catalog.next_database_id();
        let engine = if rg.next_bool() {
            DatabaseEngine::Atomic
        } else {
            DatabaseEngine::Replicated
        };
        let zoo_path =
            (engine == DatabaseEngine::Replicated).then(|| self.catalog.next_zoo_path());
        self.catalog.staged_databases.insert(
            id,
            SqlDatabase {
                id,
                attached: DetachStatus::Attached,
                engine,
                zoo_path,
            },
        );
        CreateDatabase {
            db: id,
            engine,
            zoo_path,
        }
    }

    pub(crate) fn generate_next_create_function(
        &mut self,
        rg: &mut RandomGenerator,
    ) -> CreateFunction {
        let id = self.catalog.next_function_id();
        let nargs = rg.uniform(0, 3);
        let params: Vec<String> = (0..nargs).map(|i| format!("x{i}")).collect();

        let mut rel = SqlRelation::new("");
        for param in &params {
            rel.cols.push(SqlRelationCol::new("", param.clone()));
        }
        self.pending_rels.push(rel);
        self.push_level();
        self.level_mut().allow_aggregates = false;
        self.level_mut().allow_window_funcs = false;
        let prev_nondet = self.allow_not_deterministic;
        let is_deterministic = rg.next_small_number() < 8;
        self.allow_not_deterministic = !is_deterministic;
        let prev_subqueries = self.allow_subqueries;
        self.allow_subqueries = false;
        let body = self.generate_expression(rg);
        self.allow_subqueries = prev_subqueries;
        self.allow_not_deterministic = prev_nondet;
        self.pop_level();

        self.catalog.staged_functions.insert(
            id,
            SqlFunction {
                id,
                nargs,
                is_deterministic,
            },
        );
        CreateFunction { id, params, body }
    }

    fn generate_column_codecs(&mut self, rg: &mut RandomGenerator) -> Vec<String> {
        let ncodecs = rg.next_medium_number() % 3 + 1;
        (0..ncodecs)
            .map(|_| {
                match *rg.pick(&[
                    "LZ4", "LZ4HC", "ZSTD", "Delta", "DoubleDelta", "Gorilla", "FPC", "T64",
                    "NONE",
                ]) {
                    "LZ4HC" if rg.next_bool() => format!("LZ4HC({})", rg.uniform(1, 12)),
                    "ZSTD" if rg.next_bool() => format!("ZSTD({})", rg.uniform(1, 22)),
                    codec @ ("Delta" | "DoubleDelta" | "Gorilla") if rg.next_bool() => {
                        format!("{codec}({})", 1u32 << rg.uniform(0, 3))
                    }
                    "FPC" if rg.next_bool() => {
                        format!("FPC({}, {})", rg.uniform(1, 28), if rg.next_bool() { 4 } else { 9 })
                    }
                    codec => codec.to_string(),
                }
            })
            .collect()
    }

    fn generate_statistics(&mut self, rg: &mut RandomGenerator) -> Vec<StatType> {
        let nstats = rg.next_medium_number() as usize % StatType::ALL.len() + 1;
        let mut stats = StatType::ALL.to_vec();
        rg.shuffle(&mut stats);
        stats.truncate(nstats);
        stats
    }

    /// Adds a column to `t` (committed or staged) and returns its DDL form.
    pub(crate) fn add_table_column(
        &mut self,
        rg: &mut RandomGenerator,
        t: &mut SqlTable,
        cname: u32,
        staged: bool,
        modify: bool,
        special: ColumnSpecial,
    ) -> ColumnDef {
        let ctype = match special {
            ColumnSpecial::Sign => SqlType::Int {
                bits: 8,
                signed: true,
            },
            ColumnSpecial::IsDeleted | ColumnSpecial::Version => SqlType::Int {
                bits: 8,
                signed: false,
            },
            ColumnSpecial::None => {
                // Column types get a tighter depth budget than expressions.
                let mut tg = TypeGenerator::new(
                    (*self.opts.max_depth()).min(4),
                    *self.opts.max_width(),
                    *self.opts.fuzz_floating_points(),
                );
                tg.random_type(rg, mask::ALL, &mut t.col_counter)
            }
        };

        let nullable = if !modify
            && special == ColumnSpecial::None
            && nullable_qualifies(&ctype)
            && rg.next_small_number() < 4
        {
            Some(rg.next_bool())
        } else {
            None
        };

        let default = if special == ColumnSpecial::None && rg.next_small_number() < 4 {
            let dmod = rg.weighted(&[
                (6, DefaultModifier::Default),
                (3, DefaultModifier::Materialized),
                (3, DefaultModifier::Alias),
                (1, DefaultModifier::Ephemeral),
            ]);
            let expr = (dmod != DefaultModifier::Ephemeral).then(|| {
                let mut vg = self.value_generator();
                Expr::lit(vg.plain_value(rg, &ctype))
            });
            Some((dmod, expr))
        } else {
            None
        };

        let codecs = if t.is_merge_tree_family() && rg.next_small_number() < 4 {
            self.generate_column_codecs(rg)
        } else {
            Vec::new()
        };
        let statistics = if t.is_merge_tree_family() && rg.next_small_number() < 4 {
            self.generate_statistics(rg)
        } else {
            Vec::new()
        };
        let settings = if t.is_merge_tree_family() && rg.next_small_number() < 4 {
            self.generate_setting_values(rg, merge_tree_column_settings())
        } else {
            Vec::new()
        };

        let col = SqlColumn {
            id: cname,
            ctype: ctype.clone(),
            special,
            nullable,
            dmod: default.as_ref().map(|(dmod, _)| *dmod),
        };
        if staged {
            t.staged_cols.insert(cname, col);
        } else {
            t.cols.insert(cname, col);
        }
        ColumnDef {
            path: ColumnPath::new(cname),
            ctype,
            nullable,
            default,
            codecs,
            statistics,
            settings,
        }
    }

    pub(crate) fn add_table_index(
        &mut self,
        rg: &mut RandomGenerator,
        t: &mut SqlTable,
        staged: bool,
    ) -> IndexDef {
        let iname = t.idx_counter;
        t.idx_counter += 1;
        let kind = *rg.pick(&IndexKind::ALL);

        let mut entries: Vec<InsertEntry> = t
            .flat_columns()
            .into_iter()
            .filter(|e| !kind.requires_text() || is_text_shaped(&e.ctype))
            .collect();
        let expr = if !entries.is_empty() && rg.next_small_number() < 9 {
            rg.shuffle(&mut entries);
            if kind == IndexKind::Hypothesis && entries.len() > 1 && rg.next_small_number() < 9 {
                let op = if rg.next_small_number() < 8 {
                    crate::ast::BinaryOp::Eq
                } else {
                    *rg.pick(&[
                        crate::ast::BinaryOp::NotEq,
                        crate::ast::BinaryOp::Lt,
                        crate::ast::BinaryOp::LtEq,
                        crate::ast::BinaryOp::Gt,
                        crate::ast::BinaryOp::GtEq,
                    ])
                };
                Expr::binary(op, entry_expr(&entries[0]), entry_expr(&entries[1]))
            } else {
                entry_expr(&entries[0])
            }
        } else {
            let rel = self.build_table_relation(rg, false, "", t);
            self.pending_rels.push(rel);
            self.push_level();
            self.level_mut().allow_aggregates = false;
            self.level_mut().allow_window_funcs = false;
            let expr = self.generate_expression(rg);
            self.pop_level();
            expr
        };

        let params = match kind {
            IndexKind::Set => {
                if rg.next_small_number() < 7 {
                    vec![IndexParam::Int(0)]
                } else {
                    vec![IndexParam::Int(rg.uniform(1, 1000) as u64)]
                }
            }
            IndexKind::BloomFilter => {
                vec![IndexParam::Float(f64::from(rg.uniform(1, 1000)) / 1000.0)]
            }
            IndexKind::NgramBfV1 => vec![
                IndexParam::Int(rg.uniform(1, 1000) as u64),
                IndexParam::Int(rg.uniform(1, 1000) as u64),
                IndexParam::Int(rg.uniform(1, 5) as u64),
                IndexParam::Int(rg.uniform(1, 1000) as u64),
            ],
            IndexKind::TokenBfV1 => vec![
                IndexParam::Int(rg.uniform(1, 1000) as u64),
                IndexParam::Int(rg.uniform(1, 5) as u64),
                IndexParam::Int(rg.uniform(1, 1000) as u64),
            ],
            IndexKind::FullText | IndexKind::Inverted => {
                vec![IndexParam::Int(rg.uniform(0, 10) as u64)]
            }
            IndexKind::MinMax | IndexKind::Hypothesis => Vec::new(),
        };
        let granularity = (rg.next_small_number() < 7).then(|| rg.uniform(1, 1000));

        let to_add = if staged { &mut t.staged_idxs } else { &mut t.idxs };
        to_add.insert(iname, SqlIndex { id: iname });
        IndexDef {
            id: iname,
            kind,
            expr,
            params,
            granularity,
        }
    }

    pub(crate) fn add_table_projection(
        &mut self,
        rg: &mut RandomGenerator,
        t: &mut SqlTable,
        staged: bool,
    ) -> ProjectionDef {
        let pname = t.proj_counter;
        t.proj_counter += 1;
        let ncols = (rg.next_medium_number() % 3 + 1).min(*self.opts.max_width()).max(1);

        let prev_subqueries = self.allow_subqueries;
        self.allow_subqueries = false;
        let rel = self.build_table_relation(rg, false, "", t);
        self.pending_rels.push(rel);
        let select = self.generate_select(rg, true, ncols, ALLOW_GROUPBY | ALLOW_ORDERBY);
        self.allow_subqueries = prev_subqueries;

        if staged {
            t.staged_projs.insert(pname);
        } else {
            t.projs.insert(pname);
        }
        ProjectionDef { id: pname, select }
    }

    pub(crate) fn add_table_constraint(
        &mut self,
        rg: &mut RandomGenerator,
        t: &mut SqlTable,
        staged: bool,
    ) -> ConstraintDef {
        let cid = t.constr_counter;
        t.constr_counter += 1;
        let kind = if rg.next_bool() {
            ConstraintKind::Check
        } else {
            ConstraintKind::Assume
        };
        let rel = self.build_table_relation(rg, false, "", t);
        self.pending_rels.push(rel);
        self.push_level();
        self.level_mut().allow_aggregates = false;
        self.level_mut().allow_window_funcs = false;
        let expr = self.generate_where_predicate(rg);
        self.pop_level();

        if staged {
            t.staged_constrs.insert(cid);
        } else {
            t.constrs.insert(cid);
        }
        ConstraintDef {
            id: cid,
            kind,
            expr,
        }
    }

    fn generate_table_key(
        &mut self,
        rg: &mut RandomGenerator,
        entries: &[InsertEntry],
    ) -> Vec<ColumnPath> {
        if entries.is_empty() || rg.next_small_number() >= 7 {
            return Vec::new();
        }
        let ncols = (rg.next_medium_number() as usize % entries.len().min(3)) + 1;
        let mut shuffled: Vec<&InsertEntry> = entries.iter().collect();
        rg.shuffle(&mut shuffled);
        shuffled
            .into_iter()
            .take(ncols)
            .map(|e| ColumnPath {
                col: e.cname1,
                sub: e.cname2,
            })
            .collect()
    }

    /// ORDER BY / PRIMARY KEY / PARTITION BY for a MergeTree-family engine.
    fn generate_engine_details(
        &mut self,
        rg: &mut RandomGenerator,
        entries: &[InsertEntry],
        engine: &mut EngineClause,
    ) {
        engine.order_by = self.generate_table_key(rg, entries);
        if !engine.order_by.is_empty() && rg.next_small_number() < 5 {
            // The primary key is a prefix of the sorting key.
            let len = rg.uniform(1, engine.order_by.len() as u32) as usize;
            engine.primary_key = engine.order_by[..len].to_vec();
        }
        if rg.next_small_number() < 5 {
            engine.partition_by = self.generate_table_key(rg, entries);
        }
    }

    /// Columns usable in table keys: everything except JSON-typed columns.
    fn key_entries(t: &SqlTable) -> Vec<InsertEntry> {
        t.flat_columns()
            .into_iter()
            .filter(|e| !matches!(e.ctype.unwrapped(), SqlType::Json { .. }))
            .collect()
    }

    pub(crate) fn generate_next_create_table(&mut self, rg: &mut RandomGenerator) -> CreateTable {
        let attached = self.catalog.attached_tables();
        let replace = attached.len() > 3 && rg.next_medium_number() < 16;

        let (id, db, is_temp) = if replace {
            let old_id = *rg.pick(&attached);
            let old = &self.catalog.tables[&old_id];
            (old_id, old.db, old.is_temp)
        } else {
            let id = self.catalog.next_table_id();
            let is_temp = rg.next_medium_number() < 22;
            let db = if is_temp {
                None
            } else {
                Some(*rg.pick(&self.catalog.attached_databases()))
            };
            (id, db, is_temp)
        };

        let mut next = SqlTable::new(id, db, TableEngine::MergeTree);
        next.is_temp = is_temp;
        let mut as_select = None;

        let body;
        let mut engine;
        if attached.is_empty() || rg.next_small_number() < 9 {
            next.engine = *rg.pick(&TableEngine::ALL);
            let mut items = Vec::new();
            let mut engine_params = Vec::new();

            let to_addcols = rg.next_medium_number() % 5 + 1;
            let to_addidxs = (rg.next_medium_number() % 4)
                * u32::from(next.is_merge_tree_family() && rg.next_small_number() < 4);
            let to_addprojs = (rg.next_medium_number() % 3)
                * u32::from(next.is_merge_tree_family() && rg.next_small_number() < 5);
            let to_addconsts = (rg.next_medium_number() % 3) * u32::from(rg.next_small_number() < 3);
            let to_add_sign = u32::from(next.has_sign_column());
            let to_add_version = u32::from(next.has_version_column());
            let total = to_addcols + to_addidxs + to_addprojs + to_addconsts + to_add_sign
                + to_add_version;

            let (mut cols, mut idxs, mut projs, mut consts, mut signs, mut versions) =
                (0, 0, 0, 0, 0, 0);
            for _ in 0..total {
                let kind = rg.weighted(&[
                    (8 * u32::from(cols < to_addcols), TableDefKind::Column),
                    (
                        4 * u32::from(!next.cols.is_empty() && idxs < to_addidxs),
                        TableDefKind::Index,
                    ),
                    (
                        4 * u32::from(!next.cols.is_empty() && projs < to_addprojs),
                        TableDefKind::Projection,
                    ),
                    (
                        4 * u32::from(!next.cols.is_empty() && consts < to_addconsts),
                        TableDefKind::Constraint,
                    ),
                    (2 * u32::from(signs < to_add_sign), TableDefKind::Sign),
                    (
                        2 * u32::from(versions < to_add_version && signs == to_add_sign),
                        TableDefKind::Version,
                    ),
                ]);
                match kind {
                    TableDefKind::Column => {
                        let cname = next.col_counter;
                        next.col_counter += 1;
                        let def = self.add_table_column(
                            rg,
                            &mut next,
                            cname,
                            false,
                            false,
                            ColumnSpecial::None,
                        );
                        items.push(TableDefItem::Column(def));
                        cols += 1;
                    }
                    TableDefKind::Index => {
                        items.push(TableDefItem::Index(self.add_table_index(
                            rg,
                            &mut next,
                            false,
                        )));
                        idxs += 1;
                    }
                    TableDefKind::Projection => {
                        items.push(TableDefItem::Projection(self.add_table_projection(
                            rg,
                            &mut next,
                            false,
                        )));
                        projs += 1;
                    }
                    TableDefKind::Constraint => {
                        items.push(TableDefItem::Constraint(self.add_table_constraint(
                            rg,
                            &mut next,
                            false,
                        )));
                        consts += 1;
                    }
                    TableDefKind::Sign | TableDefKind::Version => {
                        let is_version = matches!(kind, TableDefKind::Version);
                        let cname = next.col_counter;
                        next.col_counter += 1;
                        let special = if is_version {
                            ColumnSpecial::Version
                        } else {
                            ColumnSpecial::Sign
                        };
                        let def =
                            self.add_table_column(rg, &mut next, cname, false, false, special);
                        items.push(TableDefItem::Column(def));
                        engine_params.push(ColumnPath::new(cname));
                        if is_version {
                            versions += 1;
                        } else {
                            signs += 1;
                        }
                    }
                }
            }
            if rg.next_small_number() < 3 {
                let ncols = next.real_number_of_columns().max(1) as u32;
                as_select = Some(self.generate_select(rg, true, ncols, ALLOW_ALL));
            }
            engine = EngineClause::bare(next.engine);
            engine.params = engine_params;
            body = CreateTableBody::Defined(items);
        } else {
            let src_id = *rg.pick(&attached);
            let src = self.catalog.tables[&src_id].clone();
            next.engine = *rg.pick(&TableEngine::LIKE_ENGINES);
            next.cols = src.cols.clone();
            next.idxs = src.idxs.clone();
            next.projs = src.projs.clone();
            next.constrs = src.constrs.clone();
            next.col_counter = src.col_counter;
            next.idx_counter = src.idx_counter;
            next.proj_counter = src.proj_counter;
            next.constr_counter = src.constr_counter;
            engine = EngineClause::bare(next.engine);
            body = CreateTableBody::AsTable {
                src: TableRef::table(src.db, src_id),
                clone: rg.next_bool(),
            };
        }

        let mut settings = Vec::new();
        if next.is_merge_tree_family() {
            if rg.next_small_number() < 4 {
                next.engine_option = Some(if *self.opts.supports_cloud_features() && rg.next_bool()
                {
                    EngineOption::Shared
                } else {
                    EngineOption::Replicated
                });
                engine.option = next.engine_option;
            }
            let entries = Self::key_entries(&next);
            self.generate_engine_details(rg, &entries, &mut engine);

            if rg.next_small_number() < 5 {
                settings = self.generate_setting_values(rg, merge_tree_table_settings());
            }
            settings.push(SetValue {
                name: "allow_nullable_key".to_string(),
                value: "1".to_string(),
            });
            if next.engine_option == Some(EngineOption::Shared) {
                settings.push(SetValue {
                    name: "storage_policy".to_string(),
                    value: "'s3_with_keeper'".to_string(),
                });
            }
        }

        let table_ref = TableRef::table(next.db, id);
        self.catalog.staged_tables.insert(id, next);
        CreateTable {
            replace,
            is_temp,
            table: table_ref,
            body,
            engine,
            settings,
            as_select,
        }
    }

    fn generate_refreshable_view(&mut self, rg: &mut RandomGenerator) -> RefreshPolicy {
        let kind = if rg.next_bool() {
            RefreshPolicyKind::Every
        } else {
            RefreshPolicyKind::After
        };
        RefreshPolicy {
            kind,
            interval_seconds: rg.next_small_number() - 1,
            offset_seconds: (kind == RefreshPolicyKind::Every && rg.next_bool())
                .then(|| rg.next_small_number() - 1),
            randomize_seconds: Some(rg.next_small_number() - 1),
            append: rg.next_bool(),
        }
    }

    pub(crate) fn generate_next_create_view(&mut self, rg: &mut RandomGenerator) -> CreateView {
        let attached = self.catalog.attached_views();
        let replace = attached.len() > 3 && rg.next_medium_number() < 16;
        let (id, db) = if replace {
            let old_id = *rg.pick(&attached);
            (old_id, self.catalog.views[&old_id].db)
        } else {
            let id = self.catalog.next_view_id();
            let db = Some(*rg.pick(&self.catalog.attached_databases()));
            (id, db)
        };

        let mut next = SqlView::new(id, db);
        next.is_materialized = rg.next_bool();
        next.ncols = rg.next_medium_number() % 5 + 1;
        next.staged_ncols = next.ncols;

        let mut engine = None;
        let mut to_table = None;
        let mut refresh = None;
        let mut empty = false;
        let mut populate = false;
        if next.is_materialized {
            let teng = *rg.pick(&TableEngine::ALL);
            next.engine = Some(teng);
            let mut clause = EngineClause::bare(teng);
            if teng.is_merge_tree_family() {
                if rg.next_small_number() < 4 {
                    next.engine_option =
                        Some(if *self.opts.supports_cloud_features() && rg.next_bool() {
                            EngineOption::Shared
                        } else {
                            EngineOption::Replicated
                        });
                    clause.option = next.engine_option;
                }
                let entries: Vec<InsertEntry> = (0..next.ncols)
                    .map(|i| InsertEntry {
                        special: ColumnSpecial::None,
                        nullable: None,
                        cname1: i,
                        cname2: None,
                        ctype: SqlType::Int {
                            bits: 32,
                            signed: true,
                        },
                        dmod: None,
                    })
                    .collect();
                self.generate_engine_details(rg, &entries, &mut clause);
            }
            engine = Some(clause);

            let tables = self.catalog.attached_tables();
            if !tables.is_empty() && rg.next_small_number() < 5 {
                let tid = *rg.pick(&tables);
                to_table = Some(TableRef::table(self.catalog.tables[&tid].db, tid));
            }
            next.is_refreshable = rg.next_bool();
            if next.is_refreshable {
                refresh = Some(self.generate_refreshable_view(rg));
                empty = rg.next_bool();
            } else {
                populate = rg.next_small_number() < 4;
            }
        }

        let allowed = if next.is_materialized {
            ALLOW_ALL & !ALLOW_PREWHERE
        } else {
            ALLOW_ALL
        };
        let select = self.generate_select(rg, false, next.ncols, allowed);

        let view_ref = TableRef::view(next.db, id);
        let is_materialized = next.is_materialized;
        self.catalog.staged_views.insert(id, next);
        CreateView {
            replace,
            view: view_ref,
            is_materialized,
            engine,
            to_table,
            refresh,
            empty,
            populate,
            select,
        }
    }

    pub(crate) fn generate_next_drop(&mut self, rg: &mut RandomGenerator) -> Drop {
        let tables = self.catalog.attached_tables();
        let views = self.catalog.attached_views();
        let databases = self.catalog.attached_databases();

        match rg.weighted(&[
            (10 * u32::from(!tables.is_empty()), TargetKind::Table),
            (10 * u32::from(!views.is_empty()), TargetKind::View),
            (2 * u32::from(!databases.is_empty()), TargetKind::Database),
        ]) {
            TargetKind::Table => {
                let id = *rg.pick(&tables);
                let t = &self.catalog.tables[&id];
                Drop {
                    object: ObjectRef::Table(TableRef::table(t.db, id)),
                    is_temp: t.is_temp,
                    if_empty: rg.next_small_number() < 4,
                    sync: rg.next_small_number() < 3,
                }
            }
            TargetKind::View => {
                let id = *rg.pick(&views);
                let v = &self.catalog.views[&id];
                Drop {
                    object: ObjectRef::View(TableRef::view(v.db, id)),
                    is_temp: false,
                    if_empty: false,
                    sync: rg.next_small_number() < 3,
                }
            }
            TargetKind::Database => Drop {
                object: ObjectRef::Database(*rg.pick(&databases)),
                is_temp: false,
                if_empty: false,
                sync: rg.next_small_number() < 3,
            },
        }
    }

    pub(crate) fn generate_attach(&mut self, rg: &mut RandomGenerator) -> Attach {
        let tables = self.catalog.detached_tables();
        let views = self.catalog.detached_views();
        let databases = self.catalog.detached_databases();
        let object = match rg.weighted(&[
            (10 * u32::from(!tables.is_empty()), TargetKind::Table),
            (10 * u32::from(!views.is_empty()), TargetKind::View),
            (2 * u32::from(!databases.is_empty()), TargetKind::Database),
        ]) {
            TargetKind::Table => {
                let id = *rg.pick(&tables);
                ObjectRef::Table(TableRef::table(self.catalog.tables[&id].db, id))
            }
            TargetKind::View => {
                let id = *rg.pick(&views);
                ObjectRef::View(TableRef::view(self.catalog.views[&id].db, id))
            }
            TargetKind::Database => ObjectRef::Database(*rg.pick(&databases)),
        };
        Attach { object }
    }

    pub(crate) fn generate_detach(&mut self, rg: &mut RandomGenerator) -> Detach {
        let tables = self.catalog.attached_tables();
        let views = self.catalog.attached_views();
        let databases = self.catalog.attached_databases();
        let object = match rg.weighted(&[
            (10 * u32::from(!tables.is_empty()), TargetKind::Table),
            (10 * u32::from(!views.is_empty()), TargetKind::View),
            (2 * u32::from(!databases.is_empty()), TargetKind::Database),
        ]) {
            TargetKind::Table => {
                let id = *rg.pick(&tables);
                ObjectRef::Table(TableRef::table(self.catalog.tables[&id].db, id))
            }
            TargetKind::View => {
                let id = *rg.pick(&views);
                ObjectRef::View(TableRef::view(self.catalog.views[&id].db, id))
            }
            TargetKind::Database => ObjectRef::Database(*rg.pick(&databases)),
        };
        Detach {
            object,
            permanently: rg.next_bool(),
            sync: rg.next_bool(),
        }
    }

    pub(crate) fn generate_next_exchange(&mut self, rg: &mut RandomGenerator) -> ExchangeTables {
        let mut ids = self.catalog.attached_tables();
        assert!(ids.len() > 1, "exchange requires two attached tables");
        rg.shuffle(&mut ids);
        let (a, b) = (ids[0], ids[1]);
        ExchangeTables {
            lhs: TableRef::table(self.catalog.tables[&a].db, a),
            rhs: TableRef::table(self.catalog.tables[&b].db, b),
        }
    }

    /// WHERE for heavy/light DELETE and UPDATE: a predicate over the table
    /// most of the time, a bare TRUE otherwise.
    pub(crate) fn generate_upt_del_where(
        &mut self,
        rg: &mut RandomGenerator,
        t: &SqlTable,
    ) -> Expr {
        if rg.next_small_number() < 10 {
            let rel = self.build_table_relation(rg, true, "", t);
            self.pending_rels.push(rel);
            self.push_level();
            self.level_mut().allow_aggregates = false;
            self.level_mut().allow_window_funcs = false;
            let pred = self.generate_where_predicate(rg);
            self.pop_level();
            pred
        } else {
            Expr::lit("TRUE")
        }
    }

    /// Flattened column ids for statistics targets (nested subcolumns count
    /// under their own id).
    fn pick_up_next_cols(&mut self, rg: &mut RandomGenerator, t: &SqlTable) -> Vec<u32> {
        let mut ids: Vec<u32> = t
            .flat_columns()
            .iter()
            .map(|e| e.cname2.unwrap_or(e.cname1))
            .collect();
        if ids.is_empty() {
            return vec![0];
        }
        let ncols = (rg.next_medium_number() as usize % ids.len().min(3)) + 1;
        rg.shuffle(&mut ids);
        ids.truncate(ncols);
        ids
    }

    pub(crate) fn generate_alter_table(&mut self, rg: &mut RandomGenerator) -> AlterTable {
        let tables = self.catalog.attached_tables();
        let views = self.catalog.attached_views();
        let nalters = if rg.next_bool() {
            1
        } else {
            rg.next_medium_number() % 4 + 1
        };

        if !views.is_empty() && (tables.is_empty() || rg.next_bool()) {
            let id = *rg.pick(&views);
            let (db, is_refreshable, is_materialized) = {
                let v = &self.catalog.views[&id];
                (v.db, v.is_refreshable, v.is_materialized)
            };
            let mut items = Vec::new();
            for _ in 0..nalters {
                if is_refreshable && rg.uniform(1, 4) == 1 {
                    items.push(AlterItem::RefreshView(self.generate_refreshable_view(rg)));
                } else {
                    let ncols = rg.next_medium_number() % 5 + 1;
                    self.catalog.views.get_mut(&id).unwrap().staged_ncols = ncols;
                    let allowed = if is_materialized {
                        ALLOW_ALL & !ALLOW_PREWHERE
                    } else {
                        ALLOW_ALL
                    };
                    let select = self.generate_select(rg, false, ncols, allowed);
                    items.push(AlterItem::ModifyQuery { ncols, select });
                }
            }
            return AlterTable {
                target: TableRef::view(db, id),
                items,
            };
        }

        let id = *rg.pick(&tables);
        let mut t = self.catalog.tables[&id].clone();
        let target = TableRef::table(t.db, id);
        let mut items = Vec::new();
        for _ in 0..nalters {
            items.push(self.generate_alter_item(rg, &mut t));
        }
        self.catalog.tables.insert(id, t);
        AlterTable { target, items }
    }

    fn generate_alter_item(&mut self, rg: &mut RandomGenerator, t: &mut SqlTable) -> AlterItem {
        let mt = t.is_merge_tree_family();
        let kind = rg.weighted(&[
            (3 * u32::from(mt), AlterKind::OrderBy),
            (30, AlterKind::HeavyDelete),
            (30, AlterKind::HeavyUpdate),
            (2 * u32::from(t.cols.len() < 10), AlterKind::AddColumn),
            (2, AlterKind::MaterializeColumn),
            (2 * u32::from(t.cols.len() > 1), AlterKind::DropColumn),
            (2, AlterKind::RenameColumn),
            (2, AlterKind::ModifyColumn),
            (8 * u32::from(mt), AlterKind::DeleteMask),
            (3 * u32::from(mt), AlterKind::AddStats),
            (3 * u32::from(mt), AlterKind::ModStats),
            (3 * u32::from(mt), AlterKind::DropStats),
            (3 * u32::from(mt), AlterKind::ClearStats),
            (3 * u32::from(mt), AlterKind::MatStats),
            (2 * u32::from(t.idxs.len() < 3), AlterKind::AddIndex),
            (2 * u32::from(!t.idxs.is_empty()), AlterKind::MaterializeIndex),
            (2 * u32::from(!t.idxs.is_empty()), AlterKind::ClearIndex),
            (2 * u32::from(!t.idxs.is_empty()), AlterKind::DropIndex),
            (2, AlterKind::ColumnRemoveProperty),
            (2 * u32::from(mt), AlterKind::ColumnModifySetting),
            (2 * u32::from(mt), AlterKind::ColumnRemoveSetting),
            (2 * u32::from(mt), AlterKind::TableModifySetting),
            (2 * u32::from(mt), AlterKind::TableRemoveSetting),
            (2 * u32::from(mt), AlterKind::AddProjection),
            (
                2 * u32::from(mt && !t.projs.is_empty()),
                AlterKind::RemoveProjection,
            ),
            (
                2 * u32::from(mt && !t.projs.is_empty()),
                AlterKind::MaterializeProjection,
            ),
            (
                2 * u32::from(mt && !t.projs.is_empty()),
                AlterKind::ClearProjection,
            ),
            (2 * u32::from(t.constrs.len() < 4), AlterKind::AddConstraint),
            (
                2 * u32::from(!t.constrs.is_empty()),
                AlterKind::RemoveConstraint,
            ),
        ]);

        match kind {
            AlterKind::OrderBy => {
                let entries = Self::key_entries(t);
                AlterItem::OrderBy(self.generate_table_key(rg, &entries))
            }
            AlterKind::HeavyDelete => AlterItem::HeavyDelete(self.generate_upt_del_where(rg, t)),
            AlterKind::HeavyUpdate => self.generate_heavy_update(rg, t),
            AlterKind::AddColumn => {
                let cname = t.col_counter;
                t.col_counter += 1;
                let def = self.add_table_column(rg, t, cname, true, false, ColumnSpecial::None);
                AlterItem::AddColumn {
                    def,
                    position: self.generate_add_position(rg, t),
                }
            }
            AlterKind::MaterializeColumn => {
                AlterItem::MaterializeColumn(rg.pick_value(&t.cols).id)
            }
            AlterKind::DropColumn => AlterItem::DropColumn(rg.pick_value(&t.cols).id),
            AlterKind::RenameColumn => {
                let old = rg.pick_value(&t.cols).id;
                let new = t.col_counter;
                t.col_counter += 1;
                AlterItem::RenameColumn { old, new }
            }
            AlterKind::ModifyColumn => {
                let old = rg.pick_value(&t.cols).id;
                let def = self.add_table_column(rg, t, old, true, true, ColumnSpecial::None);
                AlterItem::ModifyColumn {
                    def,
                    position: self.generate_add_position(rg, t),
                }
            }
            AlterKind::DeleteMask => AlterItem::DeleteMask,
            AlterKind::AddStats => AlterItem::AddStatistics {
                cols: self.pick_up_next_cols(rg, t),
                stats: self.generate_statistics(rg),
            },
            AlterKind::ModStats => AlterItem::ModifyStatistics {
                cols: self.pick_up_next_cols(rg, t),
                stats: self.generate_statistics(rg),
            },
            AlterKind::DropStats => AlterItem::DropStatistics(self.pick_up_next_cols(rg, t)),
            AlterKind::ClearStats => AlterItem::ClearStatistics(self.pick_up_next_cols(rg, t)),
            AlterKind::MatStats => {
                AlterItem::MaterializeStatistics(self.pick_up_next_cols(rg, t))
            }
            AlterKind::AddIndex => {
                let def = self.add_table_index(rg, t, true);
                let position = if !t.idxs.is_empty() {
                    match rg.next_small_number() {
                        1..=3 => Some(AddPosition::After(rg.pick_value(&t.idxs).id)),
                        4..=7 => Some(AddPosition::First),
                        _ => None,
                    }
                } else {
                    None
                };
                AlterItem::AddIndex { def, position }
            }
            AlterKind::MaterializeIndex => {
                AlterItem::MaterializeIndex(rg.pick_value(&t.idxs).id)
            }
            AlterKind::ClearIndex => AlterItem::ClearIndex(rg.pick_value(&t.idxs).id),
            AlterKind::DropIndex => AlterItem::DropIndex(rg.pick_value(&t.idxs).id),
            AlterKind::ColumnRemoveProperty => AlterItem::RemoveColumnProperty {
                col: rg.pick_value(&t.cols).id,
                property: *rg.pick(&ColumnProperty::ALL),
            },
            AlterKind::ColumnModifySetting => AlterItem::ModifyColumnSetting {
                col: rg.pick_value(&t.cols).id,
                settings: self.generate_setting_values(rg, merge_tree_column_settings()),
            },
            AlterKind::ColumnRemoveSetting => AlterItem::RemoveColumnSetting {
                col: rg.pick_value(&t.cols).id,
                names: self.generate_setting_list(rg, merge_tree_column_settings()),
            },
            AlterKind::TableModifySetting => AlterItem::ModifyTableSetting(
                self.generate_setting_values(rg, merge_tree_table_settings()),
            ),
            AlterKind::TableRemoveSetting => AlterItem::RemoveTableSetting(
                self.generate_setting_list(rg, merge_tree_table_settings()),
            ),
            AlterKind::AddProjection => {
                AlterItem::AddProjection(self.add_table_projection(rg, t, true))
            }
            AlterKind::RemoveProjection => {
                AlterItem::RemoveProjection(*rg.pick_from_set(&t.projs))
            }
            AlterKind::MaterializeProjection => {
                AlterItem::MaterializeProjection(*rg.pick_from_set(&t.projs))
            }
            AlterKind::ClearProjection => AlterItem::ClearProjection(*rg.pick_from_set(&t.projs)),
            AlterKind::AddConstraint => {
                AlterItem::AddConstraint(self.add_table_constraint(rg, t, true))
            }
            AlterKind::RemoveConstraint => {
                AlterItem::RemoveConstraint(*rg.pick_from_set(&t.constrs))
            }
        }
    }

    fn generate_add_position(
        &mut self,
        rg: &mut RandomGenerator,
        t: &SqlTable,
    ) -> Option<AddPosition> {
        if t.cols.is_empty() {
            return None;
        }
        match rg.next_small_number() {
            1..=3 => Some(AddPosition::After(rg.pick_value(&t.cols).id)),
            4..=7 => Some(AddPosition::First),
            _ => None,
        }
    }

    fn generate_heavy_update(&mut self, rg: &mut RandomGenerator, t: &SqlTable) -> AlterItem {
        let entries: Vec<InsertEntry> = t
            .flat_columns()
            .into_iter()
            .filter(|e| e.cname2.is_none())
            .collect();
        if entries.is_empty() {
            return AlterItem::HeavyUpdate {
                updates: vec![(ColumnPath::new(0), Expr::lit("0"))],
                where_: self.generate_upt_del_where(rg, t),
            };
        }
        let nupdates = (rg.next_medium_number() as usize % entries.len().min(4)) + 1;
        let mut shuffled: Vec<&InsertEntry> = entries.iter().collect();
        rg.shuffle(&mut shuffled);

        let rel = self.build_table_relation(rg, true, "", t);
        self.pending_rels.push(rel);
        self.push_level();
        self.level_mut().allow_aggregates = false;
        self.level_mut().allow_window_funcs = false;
        let mut updates = Vec::new();
        for entry in shuffled.into_iter().take(nupdates) {
            let expr = if rg.next_small_number() < 9 {
                if entry.special == ColumnSpecial::Sign {
                    Expr::lit(if rg.next_bool() { "1" } else { "-1" })
                } else {
                    let mut vg = self.value_generator();
                    Expr::lit(vg.plain_value(rg, &entry.ctype))
                }
            } else {
                self.generate_expression(rg)
            };
            updates.push((ColumnPath::new(entry.cname1), expr));
        }
        self.pop_level();

        AlterItem::HeavyUpdate {
            updates,
            where_: self.generate_upt_del_where(rg, t),
        }
    }
}

fn nullable_qualifies(t: &SqlType) -> bool {
    match t {
        SqlType::Int { .. }
        | SqlType::Float { .. }
        | SqlType::Date { .. }
        | SqlType::Decimal { .. }
        | SqlType::String { .. }
        | SqlType::Bool
        | SqlType::Uuid => true,
        SqlType::LowCardinality(inner) => !matches!(**inner, SqlType::Nullable(_)),
        _ => false,
    }
}

fn is_text_shaped(t: &SqlType) -> bool {
    match t.unwrapped() {
        SqlType::String { .. } => true,
        SqlType::Array(inner) => matches!(inner.unwrapped(), SqlType::String { .. }),
        _ => false,
    }
}

fn entry_expr(entry: &InsertEntry) -> Expr {
    let name = match entry.cname2 {
        Some(sub) => format!("c{}.c{sub}", entry.cname1),
        None => format!("c{}", entry.cname1),
    };
    Expr::col(name)
}

