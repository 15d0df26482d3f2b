mod ddl;
mod dml;
pub mod expr;
pub mod query;

use std::collections::BTreeMap;

use log::debug;
use querystorm_catalog::{Catalog, SqlTable, TestSetting};
use querystorm_types::{RandomGenerator, SqlType, TypeGenerator, ValueGenerator};

use crate::ast::{Explain, ExplainKind, SetValue, Statement};
use crate::GeneratorOptions;

/// One visible column of a relation in scope.
#[derive(Clone, Debug)]
pub struct SqlRelationCol {
    pub rel_name: String,
    pub name: String,
    pub sub: Option<String>,
}

impl SqlRelationCol {
    pub fn new(rel_name: impl Into<String>, name: impl Into<String>) -> SqlRelationCol {
        SqlRelationCol {
            rel_name: rel_name.into(),
            name: name.into(),
            sub: None,
        }
    }

    /// The reference as it appears in an expression.
    pub fn to_expr(&self) -> crate::ast::Expr {
        let name = match &self.sub {
            Some(sub) => format!("{}.{sub}", self.name),
            None => self.name.clone(),
        };
        crate::ast::Expr::Col {
            rel: if self.rel_name.is_empty() {
                None
            } else {
                Some(self.rel_name.clone())
            },
            name,
        }
    }
}

/// A named relation visible at some query level.
#[derive(Clone, Debug)]
pub struct SqlRelation {
    pub name: String,
    pub cols: Vec<SqlRelationCol>,
}

impl SqlRelation {
    pub fn new(name: impl Into<String>) -> SqlRelation {
        SqlRelation {
            name: name.into(),
            cols: Vec::new(),
        }
    }
}

/// A grouping column: the source column plus the grouped expression, reused
/// verbatim by projections and HAVING.
#[derive(Clone, Debug)]
pub struct GroupCol {
    pub col: SqlRelationCol,
    pub expr: crate::ast::Expr,
}

/// Scope of one SELECT nesting level.
#[derive(Debug)]
pub struct QueryLevel {
    pub level: u32,
    pub aliases_counter: u32,
    pub rels: Vec<SqlRelation>,
    pub gcols: Vec<GroupCol>,
    pub global_aggregate: bool,
    pub inside_aggregate: bool,
    pub allow_aggregates: bool,
    pub allow_window_funcs: bool,
    pub group_by_all: bool,
}

impl QueryLevel {
    pub fn new(level: u32) -> QueryLevel {
        QueryLevel {
            level,
            aliases_counter: 0,
            rels: Vec::new(),
            gcols: Vec::new(),
            global_aggregate: false,
            inside_aggregate: false,
            allow_aggregates: true,
            allow_window_funcs: true,
            group_by_all: false,
        }
    }

    pub fn visible_cols(&self) -> Vec<SqlRelationCol> {
        self.rels.iter().flat_map(|r| r.cols.clone()).collect()
    }
}

#[derive(Clone, Copy)]
enum StatementKind {
    CreateTable,
    CreateView,
    CreateDatabase,
    CreateFunction,
    Drop,
    Insert,
    LightDelete,
    Truncate,
    Optimize,
    Check,
    Desc,
    Exchange,
    Alter,
    Set,
    Attach,
    Detach,
    Select,
}

/// Synthesizes the next statement from the catalog state and the PRNG.
///
/// Strictly single-threaded: one generator owns one catalog and one scope
/// stack, and every call returns synchronously.
pub struct StatementGenerator {
    pub opts: GeneratorOptions,
    pub catalog: Catalog,
    pub(crate) depth: u32,
    pub(crate) current_level: u32,
    pub(crate) levels: BTreeMap<u32, QueryLevel>,
    pub(crate) ctes: BTreeMap<u32, BTreeMap<String, SqlRelation>>,
    pub(crate) allow_not_deterministic: bool,
    pub(crate) enforce_final: bool,
    pub(crate) allow_subqueries: bool,
    pub(crate) cte_counter: u32,
    /// Relations to seed into the next pushed level, for SELECTs that run
    /// over an implicit table (projections, constraint checks).
    pub(crate) pending_rels: Vec<SqlRelation>,
}

impl StatementGenerator {
    pub fn new(opts: GeneratorOptions) -> StatementGenerator {
        StatementGenerator {
            opts,
            catalog: Catalog::new(),
            depth: 0,
            current_level: 0,
            levels: BTreeMap::new(),
            ctes: BTreeMap::new(),
            allow_not_deterministic: true,
            enforce_final: false,
            allow_subqueries: true,
            cte_counter: 0,
            pending_rels: Vec::new(),
        }
    }

    /// Oracles disable non-deterministic functions around pair construction.
    pub fn set_allow_not_deterministic(&mut self, value: bool) {
        self.allow_not_deterministic = value;
    }

    /// Oracles force FINAL on every relation that supports it.
    pub fn set_enforce_final(&mut self, value: bool) {
        self.enforce_final = value;
    }

    pub(crate) fn type_generator(&self) -> TypeGenerator {
        TypeGenerator::new(
            *self.opts.max_depth(),
            *self.opts.max_width(),
            *self.opts.fuzz_floating_points(),
        )
    }

    pub(crate) fn value_generator(&self) -> ValueGenerator {
        ValueGenerator::new(
            *self.opts.max_depth(),
            *self.opts.max_width(),
            *self.opts.fuzz_floating_points(),
        )
        .with_max_string_length(*self.opts.max_string_length())
    }

    // -- scope stack --------------------------------------------------------

    pub(crate) fn push_level(&mut self) {
        self.current_level += 1;
        let mut level = QueryLevel::new(self.current_level);
        level.rels = std::mem::take(&mut self.pending_rels);
        self.levels.insert(self.current_level, level);
    }

    pub(crate) fn pop_level(&mut self) {
        self.levels.remove(&self.current_level);
        self.ctes.remove(&self.current_level);
        self.current_level -= 1;
    }

    pub(crate) fn level(&self) -> &QueryLevel {
        self.levels
            .get(&self.current_level)
            .expect("no active query level")
    }

    pub(crate) fn level_mut(&mut self) -> &mut QueryLevel {
        self.levels
            .get_mut(&self.current_level)
            .expect("no active query level")
    }

    /// Columns of the enclosing level, for correlated references.
    pub(crate) fn parent_cols(&self) -> Vec<SqlRelationCol> {
        match self.levels.get(&(self.current_level.wrapping_sub(1))) {
            Some(level) => level.visible_cols(),
            None => Vec::new(),
        }
    }

    /// CTE bindings visible at the current level (declared here or in any
    /// enclosing level).
    pub(crate) fn visible_ctes(&self) -> Vec<SqlRelation> {
        self.ctes
            .range(..=self.current_level)
            .flat_map(|(_, bindings)| bindings.values().cloned())
            .collect()
    }

    /// Builds the relation exposing the columns of `t` under `rel_name`.
    /// MergeTree tables occasionally expose their virtual part columns too.
    pub(crate) fn build_table_relation(
        &mut self,
        rg: &mut RandomGenerator,
        allow_internal_cols: bool,
        rel_name: &str,
        t: &SqlTable,
    ) -> SqlRelation {
        let mut rel = SqlRelation::new(rel_name);
        for col in t.cols.values() {
            match &col.ctype {
                SqlType::Nested(fields) => {
                    for field in fields {
                        rel.cols.push(SqlRelationCol {
                            rel_name: rel_name.to_string(),
                            name: format!("c{}", col.id),
                            sub: Some(format!("c{}", field.name)),
                        });
                    }
                }
                _ => rel
                    .cols
                    .push(SqlRelationCol::new(rel_name, format!("c{}", col.id))),
            }
        }
        if allow_internal_cols && t.is_merge_tree_family() && rg.next_small_number() < 4 {
            for internal in [
                "_block_number",
                "_part",
                "_part_data_version",
                "_part_index",
                "_part_offset",
                "_partition_id",
            ] {
                rel.cols.push(SqlRelationCol::new(rel_name, internal));
            }
        }
        rel
    }

    /// Registers the columns of `t` at the current level.
    pub(crate) fn add_table_relation(
        &mut self,
        rg: &mut RandomGenerator,
        allow_internal_cols: bool,
        rel_name: &str,
        t: &SqlTable,
    ) {
        let rel = self.build_table_relation(rg, allow_internal_cols, rel_name, t);
        self.level_mut().rels.push(rel);
    }

    /// Registers a relation exposing `c0..c<ncols>`.
    pub(crate) fn add_numbered_relation(&mut self, rel_name: &str, ncols: u32) {
        let mut rel = SqlRelation::new(rel_name);
        for i in 0..ncols {
            rel.cols
                .push(SqlRelationCol::new(rel_name, format!("c{i}")));
        }
        self.level_mut().rels.push(rel);
    }

    // -- settings -----------------------------------------------------------

    pub(crate) fn generate_setting_values(
        &mut self,
        rg: &mut RandomGenerator,
        settings: &[TestSetting],
    ) -> Vec<SetValue> {
        let nvalues = (rg.next_u32() % 4 + 1).min(settings.len() as u32);
        self.generate_n_setting_values(rg, settings, nvalues as usize)
    }

    pub(crate) fn generate_n_setting_values(
        &mut self,
        rg: &mut RandomGenerator,
        settings: &[TestSetting],
        nvalues: usize,
    ) -> Vec<SetValue> {
        (0..nvalues)
            .map(|_| {
                let setting = rg.pick(settings);
                SetValue {
                    name: setting.name.to_string(),
                    value: rg.pick(&setting.values).clone(),
                }
            })
            .collect()
    }

    pub(crate) fn generate_setting_list(
        &mut self,
        rg: &mut RandomGenerator,
        settings: &[TestSetting],
    ) -> Vec<String> {
        let nvalues = (rg.next_u32() % 4 + 1).min(settings.len() as u32);
        (0..nvalues)
            .map(|_| rg.pick(settings).name.to_string())
            .collect()
    }

    // -- top-level dispatch -------------------------------------------------

    /// The next statement to run. EXPLAIN-wrapped about 10% of the time.
    pub fn generate_next_statement(&mut self, rg: &mut RandomGenerator) -> Statement {
        let stmt = if rg.next_medium_number() < 11 {
            let kind = (rg.next_small_number() < 10).then(|| *rg.pick(&ExplainKind::ALL));
            let inner = self.generate_next_query(rg);
            Statement::Explain(Explain {
                kind,
                inner: Box::new(inner),
            })
        } else {
            self.generate_next_query(rg)
        };
        debug_assert!(self.levels.is_empty(), "leaked query level");
        debug!("generated: {stmt}");
        stmt
    }

    fn generate_next_query(&mut self, rg: &mut RandomGenerator) -> Statement {
        let has_attached_tables = !self.catalog.attached_tables().is_empty();
        let has_attached_views = !self.catalog.attached_views().is_empty();
        let has_attached_databases = !self.catalog.attached_databases().is_empty();
        let has_detached = !self.catalog.detached_tables().is_empty()
            || !self.catalog.detached_views().is_empty()
            || !self.catalog.detached_databases().is_empty();

        let create_table = 6 * u32::from(
            has_attached_databases && self.catalog.tables.len() < *self.opts.max_tables(),
        );
        let create_view = 10 * u32::from(
            has_attached_databases && self.catalog.views.len() < *self.opts.max_views(),
        );
        let create_database =
            2 * u32::from(self.catalog.databases.len() < *self.opts.max_databases());
        let create_function =
            2 * u32::from(self.catalog.functions.len() < *self.opts.max_functions());
        let drop =
            u32::from(has_attached_tables || has_attached_views || has_attached_databases);
        let insert = 100 * u32::from(has_attached_tables);
        let light_delete = 6 * u32::from(has_attached_tables);
        let truncate = 2 * u32::from(has_attached_tables);
        let optimize = 2 * u32::from(has_attached_tables);
        let check = 2 * u32::from(has_attached_tables);
        let desc = 2 * u32::from(has_attached_tables || has_attached_views);
        let exchange = u32::from(self.catalog.attached_tables().len() > 1);
        let alter = 6 * u32::from(has_attached_tables || has_attached_views);
        let set_values = 5;
        let attach = 2 * u32::from(has_detached);
        let detach =
            2 * u32::from(has_attached_tables || has_attached_views || has_attached_databases);
        let select = 300;

        match rg.weighted(&[
            (create_table, StatementKind::CreateTable),
            (create_view, StatementKind::CreateView),
            (drop, StatementKind::Drop),
            (insert, StatementKind::Insert),
            (light_delete, StatementKind::LightDelete),
            (truncate, StatementKind::Truncate),
            (optimize, StatementKind::Optimize),
            (check, StatementKind::Check),
            (desc, StatementKind::Desc),
            (exchange, StatementKind::Exchange),
            (alter, StatementKind::Alter),
            (set_values, StatementKind::Set),
            (attach, StatementKind::Attach),
            (detach, StatementKind::Detach),
            (create_database, StatementKind::CreateDatabase),
            (create_function, StatementKind::CreateFunction),
            (select, StatementKind::Select),
        ]) {
            StatementKind::CreateTable => {
                Statement::CreateTable(self.generate_next_create_table(rg))
            }
            StatementKind::CreateView => Statement::CreateView(self.generate_next_create_view(rg)),
            StatementKind::CreateDatabase => {
                Statement::CreateDatabase(self.generate_next_create_database(rg))
            }
            StatementKind::CreateFunction => {
                Statement::CreateFunction(self.generate_next_create_function(rg))
            }
            StatementKind::Drop => Statement::Drop(self.generate_next_drop(rg)),
            StatementKind::Insert => Statement::Insert(self.generate_next_insert(rg)),
            StatementKind::LightDelete => Statement::Delete(self.generate_next_delete(rg)),
            StatementKind::Truncate => Statement::Truncate(self.generate_next_truncate(rg)),
            StatementKind::Optimize => Statement::Optimize(self.generate_next_optimize(rg)),
            StatementKind::Check => Statement::Check(self.generate_next_check(rg)),
            StatementKind::Desc => Statement::Desc(self.generate_next_desc(rg)),
            StatementKind::Exchange => Statement::Exchange(self.generate_next_exchange(rg)),
            StatementKind::Alter => Statement::Alter(self.generate_alter_table(rg)),
            StatementKind::Set => {
                let values =
                    self.generate_setting_values(rg, querystorm_catalog::server_settings());
                Statement::Set(values)
            }
            StatementKind::Attach => Statement::Attach(self.generate_attach(rg)),
            StatementKind::Detach => Statement::Detach(self.generate_detach(rg)),
            StatementKind::Select => {
                Statement::Select(self.generate_top_select(rg, query::ALLOW_ALL, None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warmed_generator(seed: u64) -> (StatementGenerator, RandomGenerator) {
        let mut gen = StatementGenerator::new(GeneratorOptions::default());
        let mut rg = RandomGenerator::new(seed);
        // Warm the catalog so every statement kind has candidates.
        let db = gen.generate_next_create_database(&mut rg);
        crate::update::update_generator(
            &mut gen.catalog,
            &Statement::CreateDatabase(db),
            true,
        );
        for _ in 0..4 {
            let ct = gen.generate_next_create_table(&mut rg);
            crate::update::update_generator(&mut gen.catalog, &Statement::CreateTable(ct), true);
        }
        let cv = gen.generate_next_create_view(&mut rg);
        crate::update::update_generator(&mut gen.catalog, &Statement::CreateView(cv), true);
        (gen, rg)
    }

    #[test]
    fn test_statement_stream_is_deterministic() {
        let (mut gen_a, mut rg_a) = warmed_generator(99);
        let (mut gen_b, mut rg_b) = warmed_generator(99);
        for _ in 0..200 {
            let a = gen_a.generate_next_statement(&mut rg_a);
            let b = gen_b.generate_next_statement(&mut rg_b);
            assert_eq!(a.to_string(), b.to_string());
            crate::update::update_generator(&mut gen_a.catalog, &a, true);
            crate::update::update_generator(&mut gen_b.catalog, &b, true);
        }
    }

    #[test]
    fn test_no_leaked_scope_or_staged_state() {
        let (mut gen, mut rg) = warmed_generator(7);
        for _ in 0..300 {
            let stmt = gen.generate_next_statement(&mut rg);
            assert!(gen.levels.is_empty());
            assert!(gen.ctes.is_empty());
            crate::update::update_generator(&mut gen.catalog, &stmt, true);
            assert!(gen.catalog.no_staged_state());
        }
    }

    #[test]
    fn test_rejected_statements_only_discard_staged() {
        let (mut gen, mut rg) = warmed_generator(13);
        let committed_tables = gen.catalog.tables.len();
        let committed_views = gen.catalog.views.len();
        let committed_dbs = gen.catalog.databases.len();
        for _ in 0..200 {
            let stmt = gen.generate_next_statement(&mut rg);
            crate::update::update_generator(&mut gen.catalog, &stmt, false);
            assert!(gen.catalog.no_staged_state());
        }
        assert_eq!(gen.catalog.tables.len(), committed_tables);
        assert_eq!(gen.catalog.views.len(), committed_views);
        assert_eq!(gen.catalog.databases.len(), committed_dbs);
    }

    #[test]
    fn test_first_statements_respect_empty_catalog() {
        let mut gen = StatementGenerator::new(GeneratorOptions::default());
        let mut rg = RandomGenerator::new(1);
        for _ in 0..50 {
            let stmt = gen.generate_next_statement(&mut rg);
            match stmt.unwrap_explain() {
                Statement::Select(_)
                | Statement::Set(_)
                | Statement::CreateDatabase(_)
                | Statement::CreateFunction(_) => {}
                other => panic!("statement needs catalog objects: {other}"),
            }
        }
    }
}
