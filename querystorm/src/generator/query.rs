//! Recursive SELECT synthesis: FROM trees, CTEs, grouping, ordering and set
//! operations, with per-level scope tracking.

use querystorm_types::RandomGenerator;

use super::{GroupCol, SqlRelation, StatementGenerator};
use crate::ast::{
    Cte, Expr, FromClause, FromItem, GroupBy, GroupByModifier, JoinConstraint, JoinElement,
    JoinKind, OrderBy, OrderDirection, OrderTerm, ResultCol, Select, SelectBody, SelectCore,
    SetOp, TableRef, TopSelect,
};

pub const ALLOW_SET: u32 = 1 << 0;
pub const ALLOW_CTE: u32 = 1 << 1;
pub const ALLOW_DISTINCT: u32 = 1 << 2;
pub const ALLOW_FROM: u32 = 1 << 3;
pub const ALLOW_PREWHERE: u32 = 1 << 4;
pub const ALLOW_WHERE: u32 = 1 << 5;
pub const ALLOW_GROUPBY: u32 = 1 << 6;
pub const ALLOW_ORDERBY: u32 = 1 << 7;
pub const ALLOW_LIMIT: u32 = 1 << 8;
pub const ALLOW_ALL: u32 = u32::MAX;

#[derive(Clone, Copy)]
enum FromKind {
    Table,
    View,
    Cte,
    Derived,
}

impl StatementGenerator {
    /// A complete top-level SELECT with `ncols` output columns (random 1..=5
    /// when unspecified).
    pub fn generate_top_select(
        &mut self,
        rg: &mut RandomGenerator,
        allowed: u32,
        ncols: Option<u32>,
    ) -> TopSelect {
        let ncols = ncols.unwrap_or_else(|| rg.uniform(1, 5));
        TopSelect {
            select: self.generate_select(rg, true, ncols, allowed),
            into_file: None,
            format: None,
        }
    }

    pub(crate) fn generate_select(
        &mut self,
        rg: &mut RandomGenerator,
        top: bool,
        ncols: u32,
        allowed: u32,
    ) -> Select {
        self.push_level();

        let mut ctes = Vec::new();
        if allowed & ALLOW_CTE != 0 && rg.next_small_number() < 3 {
            let nctes = rg.uniform(1, 2);
            for _ in 0..nctes {
                let name = format!("cte{}", self.cte_counter);
                self.cte_counter += 1;
                let cte_ncols = rg.uniform(1, 5);
                let select =
                    self.generate_select(rg, false, cte_ncols, allowed & !ALLOW_SET);
                let mut rel = SqlRelation::new(name.clone());
                for i in 0..cte_ncols {
                    rel.cols.push(super::SqlRelationCol::new(
                        name.clone(),
                        format!("c{i}"),
                    ));
                }
                self.ctes
                    .entry(self.current_level)
                    .or_default()
                    .insert(name.clone(), rel);
                ctes.push(Cte { name, select });
            }
        }

        let from = if allowed & ALLOW_FROM != 0 {
            self.generate_from_statement(rg)
        } else {
            None
        };

        let mut core = SelectCore {
            distinct: allowed & ALLOW_DISTINCT != 0 && rg.next_small_number() < 2,
            from,
            ..SelectCore::default()
        };
        // Projections and constraint checks run over an implicit relation
        // seeded onto the level without a FROM clause.
        let has_rels = core.from.is_some() || !self.level().rels.is_empty();

        if has_rels && allowed & ALLOW_PREWHERE != 0 && rg.next_medium_number() < 10 {
            core.prewhere = Some(self.restricted_predicate(rg));
        }
        if has_rels && allowed & ALLOW_WHERE != 0 && rg.next_medium_number() < 45 {
            core.where_ = Some(self.restricted_predicate(rg));
        }

        if has_rels && allowed & ALLOW_GROUPBY != 0 && rg.next_medium_number() < 30 {
            let nkeys = rg.uniform(1, 3);
            let (group_by, having) = self.generate_group_by(rg, nkeys, false);
            core.group_by = Some(group_by);
            core.having = having;
        } else if rg.next_medium_number() < 15 {
            // Aggregation without grouping collapses the result to one row.
            self.level_mut().global_aggregate = true;
        }

        for i in 0..ncols {
            let expr = self.generate_result_expr(rg);
            core.columns.push(ResultCol {
                expr,
                alias: Some(format!("c{i}")),
            });
        }

        if allowed & ALLOW_ORDERBY != 0 && rg.next_medium_number() < 25 {
            core.order_by = Some(self.generate_order_by(rg, ncols));
        }
        if allowed & ALLOW_LIMIT != 0 && rg.next_medium_number() < 20 {
            core.limit = Some(Expr::lit(rg.next_small_number().to_string()));
            if rg.next_small_number() < 3 {
                core.offset = Some(Expr::lit(rg.next_small_number().to_string()));
            }
        }

        let mut body = SelectBody::Core(core);
        if top && allowed & ALLOW_SET != 0 && rg.next_small_number() < 2 {
            let rhs = self.generate_select(rg, false, ncols, allowed & !(ALLOW_SET | ALLOW_CTE));
            let op = rg.weighted(&[
                (40, SetOp::UnionAll),
                (25, SetOp::UnionDistinct),
                (20, SetOp::Intersect),
                (15, SetOp::Except),
            ]);
            body = SelectBody::SetOp {
                op,
                left: Box::new(body),
                right: Box::new(rhs.body),
            };
        }

        self.pop_level();
        Select { ctes, body }
    }

    /// Predicate with aggregates and window functions blocked, for
    /// WHERE/PREWHERE/ON positions.
    pub(crate) fn restricted_predicate(&mut self, rg: &mut RandomGenerator) -> Expr {
        let (prev_aggr, prev_win) = {
            let level = self.level();
            (level.allow_aggregates, level.allow_window_funcs)
        };
        {
            let level = self.level_mut();
            level.allow_aggregates = false;
            level.allow_window_funcs = false;
        }
        let pred = self.generate_where_predicate(rg);
        {
            let level = self.level_mut();
            level.allow_aggregates = prev_aggr;
            level.allow_window_funcs = prev_win;
        }
        pred
    }

    /// The FROM tree, registering one relation per element at the current
    /// level. Returns `None` when nothing can be referenced and derived
    /// tables are out of budget.
    pub(crate) fn generate_from_statement(
        &mut self,
        rg: &mut RandomGenerator,
    ) -> Option<FromClause> {
        let first = self.generate_from_element(rg)?;
        let mut joins = Vec::new();
        let njoins = rg.weighted(&[(60, 0u32), (30, 1), (10, 2)]);
        for _ in 0..njoins {
            if rg.next_small_number() < 2 {
                joins.push(self.generate_array_join(rg));
                continue;
            }
            let Some(item) = self.generate_from_element(rg) else {
                break;
            };
            let kind = rg.weighted(&[
                (40, JoinKind::Inner),
                (20, JoinKind::Left),
                (8, JoinKind::Right),
                (5, JoinKind::Full),
                (12, JoinKind::Cross),
                (4, JoinKind::LeftSemi),
                (3, JoinKind::RightSemi),
                (4, JoinKind::LeftAnti),
                (3, JoinKind::RightAnti),
            ]);
            let constraint = if kind == JoinKind::Cross {
                None
            } else {
                Some(self.generate_join_constraint(rg))
            };
            joins.push(JoinElement::Join {
                kind,
                item,
                constraint,
            });
        }
        Some(FromClause { first, joins })
    }

    fn generate_from_element(&mut self, rg: &mut RandomGenerator) -> Option<FromItem> {
        let tables = self.catalog.attached_tables();
        let views = self.catalog.attached_views();
        let bindings = self.visible_ctes();
        let derived_ok = self.depth < *self.opts.max_depth() && self.allow_subqueries;

        let weights = [
            (30 * u32::from(!tables.is_empty()), FromKind::Table),
            (15 * u32::from(!views.is_empty()), FromKind::View),
            (10 * u32::from(!bindings.is_empty()), FromKind::Cte),
            (10 * u32::from(derived_ok), FromKind::Derived),
        ];
        if weights.iter().all(|(w, _)| *w == 0) {
            return None;
        }
        match rg.weighted(&weights) {
            FromKind::Table => {
                let id = *rg.pick(&tables);
                let t = self.catalog.tables[&id].clone();
                let final_ = t.supports_final() && (self.enforce_final || rg.next_small_number() < 3);
                let rel_name = format!("t{id}");
                self.add_table_relation(rg, true, &rel_name, &t);
                Some(FromItem::Table {
                    table: TableRef::table(t.db, id),
                    alias: None,
                    final_,
                })
            }
            FromKind::View => {
                let id = *rg.pick(&views);
                let v = &self.catalog.views[&id];
                let (db, ncols) = (v.db, v.ncols);
                self.add_numbered_relation(&format!("v{id}"), ncols);
                Some(FromItem::Table {
                    table: TableRef::view(db, id),
                    alias: None,
                    final_: false,
                })
            }
            FromKind::Cte => {
                let rel = rg.pick(&bindings).clone();
                let name = rel.name.clone();
                self.level_mut().rels.push(rel);
                Some(FromItem::Cte { name })
            }
            FromKind::Derived => {
                let alias = {
                    let level = self.level_mut();
                    let alias = format!("s{}", level.aliases_counter);
                    level.aliases_counter += 1;
                    alias
                };
                let ncols = rg.uniform(1, 4);
                self.depth += 1;
                let select = self.generate_select(rg, false, ncols, ALLOW_ALL & !ALLOW_SET);
                self.depth -= 1;
                self.add_numbered_relation(&alias, ncols);
                Some(FromItem::Derived {
                    select: Box::new(select),
                    alias,
                })
            }
        }
    }

    fn generate_array_join(&mut self, rg: &mut RandomGenerator) -> JoinElement {
        let nexprs = rg.uniform(1, 2);
        let mut exprs = Vec::new();
        for _ in 0..nexprs {
            let alias = {
                let level = self.level_mut();
                let alias = format!("aj{}", level.aliases_counter);
                level.aliases_counter += 1;
                alias
            };
            let expr = if self.level().rels.is_empty() || rg.next_small_number() < 3 {
                // A literal array keeps the join well-formed with any source.
                Expr::lit(format!("[{}]", rg.uniform(1, 3)))
            } else {
                self.generate_col_ref(rg)
            };
            exprs.push((expr, alias.clone()));
            let mut rel = SqlRelation::new("");
            rel.cols.push(super::SqlRelationCol::new("", alias));
            self.level_mut().rels.push(rel);
        }
        JoinElement::ArrayJoin {
            left: rg.next_bool(),
            exprs,
        }
    }

    /// ON or USING over the two most recently registered relations.
    fn generate_join_constraint(&mut self, rg: &mut RandomGenerator) -> JoinConstraint {
        let rels = &self.level().rels;
        if rels.len() >= 2 && rg.next_small_number() < 4 {
            let left = &rels[rels.len() - 2];
            let right = &rels[rels.len() - 1];
            let common: Vec<String> = left
                .cols
                .iter()
                .filter(|lc| lc.sub.is_none())
                .filter(|lc| right.cols.iter().any(|rc| rc.name == lc.name))
                .map(|lc| lc.name.clone())
                .collect();
            if !common.is_empty() {
                let ncols = rg.uniform(1, common.len() as u32) as usize;
                return JoinConstraint::Using(common.into_iter().take(ncols).collect());
            }
        }
        let pair = {
            let rels = &self.level().rels;
            if rels.len() >= 2 {
                let left = &rels[rels.len() - 2];
                let right = &rels[rels.len() - 1];
                match (left.cols.is_empty(), right.cols.is_empty()) {
                    (false, false) => {
                        Some((rg.pick(&left.cols).clone(), rg.pick(&right.cols).clone()))
                    }
                    _ => None,
                }
            } else {
                None
            }
        };
        match pair {
            Some((lcol, rcol)) => {
                let mut on = Expr::binary(
                    *rg.pick(&[
                        crate::ast::BinaryOp::Eq,
                        crate::ast::BinaryOp::Eq,
                        crate::ast::BinaryOp::Lt,
                        crate::ast::BinaryOp::GtEq,
                    ]),
                    lcol.to_expr(),
                    rcol.to_expr(),
                );
                if rg.next_small_number() < 3 {
                    on = Expr::binary(
                        crate::ast::BinaryOp::And,
                        on,
                        self.restricted_predicate(rg),
                    );
                }
                JoinConstraint::On(on)
            }
            None => JoinConstraint::On(self.restricted_predicate(rg)),
        }
    }

    /// Grouping clause. Grouping columns are recorded on the level before a
    /// HAVING is produced so later references obey grouping discipline. The
    /// HAVING honors the level's current aggregate gate, which oracles turn
    /// off around pair construction.
    pub(crate) fn generate_group_by(
        &mut self,
        rg: &mut RandomGenerator,
        nkeys: u32,
        enforce_having: bool,
    ) -> (GroupBy, Option<Expr>) {
        if !enforce_having && rg.next_small_number() < 2 {
            self.level_mut().group_by_all = true;
            return (GroupBy::All, None);
        }
        let mut available = self.level().visible_cols();
        rg.shuffle(&mut available);
        let mut exprs = Vec::new();
        for col in available.iter().take(nkeys as usize) {
            let expr = col.to_expr();
            self.level_mut().gcols.push(GroupCol {
                col: col.clone(),
                expr: expr.clone(),
            });
            exprs.push(expr);
        }
        if exprs.is_empty() {
            exprs.push(Expr::lit("1"));
        }

        let group_by = if exprs.len() > 1 && rg.next_small_number() < 2 {
            let mut sets = vec![exprs.clone()];
            sets.push(exprs[..1].to_vec());
            GroupBy::GroupingSets(sets)
        } else {
            let modifier = match rg.next_small_number() {
                1 => Some(GroupByModifier::Rollup),
                2 => Some(GroupByModifier::Cube),
                _ => None,
            };
            GroupBy::Exprs { exprs, modifier }
        };

        let having = (enforce_having || rg.next_small_number() < 4)
            .then(|| self.generate_where_predicate(rg));
        (group_by, having)
    }

    /// One output column, honoring grouping discipline.
    fn generate_result_expr(&mut self, rg: &mut RandomGenerator) -> Expr {
        let (grouped, global_aggregate) = {
            let level = self.level();
            (!level.gcols.is_empty(), level.global_aggregate)
        };
        if global_aggregate || (grouped && rg.next_small_number() < 6) {
            let allow_window = self.level().allow_window_funcs;
            self.generate_aggregate_call(rg, allow_window && !global_aggregate)
        } else {
            self.generate_expression(rg)
        }
    }

    fn generate_order_by(&mut self, rg: &mut RandomGenerator, ncols: u32) -> OrderBy {
        if rg.next_small_number() < 2 {
            return OrderBy::All;
        }
        let nterms = rg.uniform(1, ncols.max(1));
        let terms = (0..nterms)
            .map(|i| OrderTerm {
                expr: if rg.next_small_number() < 8 {
                    Expr::col(format!("c{i}"))
                } else {
                    self.generate_expression(rg)
                },
                direction: match rg.next_small_number() {
                    1..=3 => Some(OrderDirection::Asc),
                    4..=6 => Some(OrderDirection::Desc),
                    _ => None,
                },
            })
            .collect();
        OrderBy::Terms(terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeneratorOptions;

    #[test]
    fn test_select_without_catalog_has_no_table_refs() {
        let mut gen = StatementGenerator::new(GeneratorOptions::default());
        let mut rg = RandomGenerator::new(3);
        for _ in 0..100 {
            let top = gen.generate_top_select(&mut rg, ALLOW_ALL, None);
            let text = top.select.to_string();
            assert!(!text.contains(" FROM d"), "phantom table in {text}");
            assert!(gen.levels.is_empty());
        }
    }

    #[test]
    fn test_requested_column_count_is_respected() {
        let mut gen = StatementGenerator::new(GeneratorOptions::default());
        let mut rg = RandomGenerator::new(5);
        for ncols in 1..=5u32 {
            let select = gen.generate_select(&mut rg, false, ncols, ALLOW_ALL & !ALLOW_SET);
            let mut body = &select.body;
            while let SelectBody::SetOp { left, .. } = body {
                body = left;
            }
            let SelectBody::Core(core) = body else {
                unreachable!()
            };
            assert_eq!(core.columns.len(), ncols as usize);
            for (i, col) in core.columns.iter().enumerate() {
                assert_eq!(col.alias.as_deref(), Some(format!("c{i}").as_str()));
            }
        }
    }

    #[test]
    fn test_scope_levels_balance_across_many_queries() {
        let mut gen = StatementGenerator::new(GeneratorOptions::default());
        let mut rg = RandomGenerator::new(17);
        for _ in 0..200 {
            let _ = gen.generate_top_select(&mut rg, ALLOW_ALL, None);
            assert!(gen.levels.is_empty());
            assert!(gen.ctes.is_empty());
            assert_eq!(gen.current_level, 0);
            assert_eq!(gen.depth, 0);
        }
    }
}
