//! Expression and predicate synthesis.
//!
//! Recursion is bounded by the shared depth budget; scope discipline
//! (aggregates and window functions) is enforced through the current
//! [`QueryLevel`](super::QueryLevel) gates.

use querystorm_types::{mask, RandomGenerator};

use super::StatementGenerator;
use crate::ast::{
    BinaryOp, Expr, FrameBound, FrameUnits, OrderDirection, OrderTerm, UnaryOp, WindowSpec,
};
use crate::generator::query;

pub struct FuncSpec {
    pub name: &'static str,
    pub min_args: u32,
    pub max_args: u32,
}

const fn f(name: &'static str, min_args: u32, max_args: u32) -> FuncSpec {
    FuncSpec {
        name,
        min_args,
        max_args,
    }
}

pub const AGGREGATE_FUNCS: &[FuncSpec] = &[
    f("count", 0, 1),
    f("min", 1, 1),
    f("max", 1, 1),
    f("sum", 1, 1),
    f("avg", 1, 1),
    f("any", 1, 1),
    f("anyLast", 1, 1),
    f("stddevPop", 1, 1),
    f("stddevSamp", 1, 1),
    f("varPop", 1, 1),
    f("varSamp", 1, 1),
    f("median", 1, 1),
    f("uniq", 1, 3),
    f("uniqExact", 1, 3),
    f("argMin", 2, 2),
    f("argMax", 2, 2),
    f("topK", 1, 1),
    f("groupArray", 1, 1),
    f("groupUniqArray", 1, 1),
    f("corr", 2, 2),
    f("covarPop", 2, 2),
    f("countIf", 1, 1),
    f("sumIf", 2, 2),
    f("avgIf", 2, 2),
    f("minIf", 2, 2),
    f("maxIf", 2, 2),
];

pub const WINDOW_FUNCS: &[FuncSpec] = &[
    f("row_number", 0, 0),
    f("rank", 0, 0),
    f("dense_rank", 0, 0),
    f("percent_rank", 0, 0),
    f("cume_dist", 0, 0),
    f("ntile", 1, 1),
    f("lagInFrame", 1, 3),
    f("leadInFrame", 1, 3),
    f("first_value", 1, 1),
    f("last_value", 1, 1),
    f("nth_value", 2, 2),
];

pub const SCALAR_FUNCS: &[FuncSpec] = &[
    f("abs", 1, 1),
    f("negate", 1, 1),
    f("plus", 2, 2),
    f("minus", 2, 2),
    f("multiply", 2, 2),
    f("divide", 2, 2),
    f("intDiv", 2, 2),
    f("intDivOrZero", 2, 2),
    f("modulo", 2, 2),
    f("moduloOrZero", 2, 2),
    f("gcd", 2, 2),
    f("lcm", 2, 2),
    f("round", 1, 2),
    f("floor", 1, 2),
    f("ceil", 1, 2),
    f("trunc", 1, 2),
    f("exp", 1, 1),
    f("log", 1, 1),
    f("sqrt", 1, 1),
    f("cbrt", 1, 1),
    f("sin", 1, 1),
    f("cos", 1, 1),
    f("tan", 1, 1),
    f("pow", 2, 2),
    f("e", 0, 0),
    f("pi", 0, 0),
    f("concat", 2, 4),
    f("substring", 2, 3),
    f("lower", 1, 1),
    f("upper", 1, 1),
    f("reverse", 1, 1),
    f("length", 1, 1),
    f("lengthUTF8", 1, 1),
    f("trimBoth", 1, 1),
    f("repeat", 2, 2),
    f("position", 2, 2),
    f("startsWith", 2, 2),
    f("endsWith", 2, 2),
    f("empty", 1, 1),
    f("notEmpty", 1, 1),
    f("toString", 1, 1),
    f("toInt32OrZero", 1, 1),
    f("toInt64OrZero", 1, 1),
    f("toFloat64OrZero", 1, 1),
    f("toDateOrZero", 1, 1),
    f("toDateTimeOrZero", 1, 1),
    f("ifNull", 2, 2),
    f("nullIf", 2, 2),
    f("coalesce", 1, 4),
    f("isNull", 1, 1),
    f("isNotNull", 1, 1),
    f("assumeNotNull", 1, 1),
    f("toNullable", 1, 1),
    f("greatest", 2, 4),
    f("least", 2, 4),
    f("if", 3, 3),
    f("multiIf", 3, 5),
    f("bitAnd", 2, 2),
    f("bitOr", 2, 2),
    f("bitXor", 2, 2),
    f("bitNot", 1, 1),
];

/// Only usable when the generator permits non-deterministic results.
pub const NONDETERMINISTIC_FUNCS: &[FuncSpec] = &[
    f("now", 0, 0),
    f("today", 0, 0),
    f("yesterday", 0, 0),
    f("rand", 0, 0),
    f("rand64", 0, 0),
    f("randCanonical", 0, 0),
    f("generateUUIDv4", 0, 0),
];

/// Array combinators taking a lambda as their first argument.
pub const HIGHER_ORDER_FUNCS: &[&str] = &[
    "arrayMap",
    "arrayFilter",
    "arrayExists",
    "arrayAll",
    "arrayCount",
    "arrayFirst",
];

#[derive(Clone, Copy)]
enum ExprKind {
    Literal,
    ColRef,
    Unary,
    Binary,
    Func,
    Predicate,
    Subquery,
}

#[derive(Clone, Copy)]
enum PredKind {
    Comparison,
    And,
    Or,
    Not,
    Between,
    InList,
    InSubquery,
    Like,
    IsNull,
    Exists,
    Expr,
}

#[derive(Clone, Copy)]
enum CallKind {
    Scalar,
    Aggregate,
    Window,
    HigherOrder,
    Udf,
}

impl StatementGenerator {
    pub(crate) fn generate_expression(&mut self, rg: &mut RandomGenerator) -> Expr {
        let has_cols = self.has_visible_cols();
        let depth_ok = self.depth < *self.opts.max_depth();

        let kind = rg.weighted(&[
            (30, ExprKind::Literal),
            (35 * u32::from(has_cols), ExprKind::ColRef),
            (4 * u32::from(depth_ok), ExprKind::Unary),
            (12 * u32::from(depth_ok), ExprKind::Binary),
            (14 * u32::from(depth_ok), ExprKind::Func),
            (5 * u32::from(depth_ok), ExprKind::Predicate),
            (
                3 * u32::from(depth_ok && self.allow_subqueries),
                ExprKind::Subquery,
            ),
        ]);
        match kind {
            ExprKind::Literal => self.generate_literal(rg),
            ExprKind::ColRef => self.generate_col_ref(rg),
            ExprKind::Unary => {
                self.depth += 1;
                let operand = self.generate_expression(rg);
                self.depth -= 1;
                Expr::Unary {
                    op: if rg.next_bool() {
                        UnaryOp::Negate
                    } else {
                        UnaryOp::Not
                    },
                    operand: Box::new(operand),
                }
            }
            ExprKind::Binary => {
                self.depth += 1;
                let op = *rg.pick(&[
                    BinaryOp::Plus,
                    BinaryOp::Minus,
                    BinaryOp::Multiply,
                    BinaryOp::Divide,
                    BinaryOp::Modulo,
                    BinaryOp::Concat,
                ]);
                let lhs = self.generate_expression(rg);
                let rhs = self.generate_expression(rg);
                self.depth -= 1;
                Expr::binary(op, lhs, rhs)
            }
            ExprKind::Func => self.generate_func_call(rg),
            ExprKind::Predicate => {
                self.depth += 1;
                let pred = self.generate_predicate(rg);
                self.depth -= 1;
                pred
            }
            ExprKind::Subquery => Expr::Subquery(self.generate_scalar_subquery(rg)),
        }
    }

    /// Boolean-shaped expression for WHERE/HAVING/ON/CHECK positions.
    pub(crate) fn generate_predicate(&mut self, rg: &mut RandomGenerator) -> Expr {
        let depth_ok = self.depth < *self.opts.max_depth();
        if !depth_ok {
            let lhs = self.generate_simple_operand(rg);
            let rhs = self.generate_literal(rg);
            return Expr::binary(comparison_op(rg), lhs, rhs);
        }

        let kind = rg.weighted(&[
            (40, PredKind::Comparison),
            (8, PredKind::And),
            (8, PredKind::Or),
            (4, PredKind::Not),
            (6, PredKind::Between),
            (8, PredKind::InList),
            (
                3 * u32::from(self.allow_subqueries),
                PredKind::InSubquery,
            ),
            (6, PredKind::Like),
            (6, PredKind::IsNull),
            (2 * u32::from(self.allow_subqueries), PredKind::Exists),
            (8, PredKind::Expr),
        ]);
        self.depth += 1;
        let pred = match kind {
            PredKind::Comparison => {
                let lhs = self.generate_expression(rg);
                let rhs = self.generate_expression(rg);
                Expr::binary(comparison_op(rg), lhs, rhs)
            }
            PredKind::And => {
                let lhs = self.generate_predicate(rg);
                let rhs = self.generate_predicate(rg);
                Expr::binary(BinaryOp::And, lhs, rhs)
            }
            PredKind::Or => {
                let lhs = self.generate_predicate(rg);
                let rhs = self.generate_predicate(rg);
                Expr::binary(BinaryOp::Or, lhs, rhs)
            }
            PredKind::Not => Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(self.generate_predicate(rg)),
            },
            PredKind::Between => Expr::Between {
                negated: rg.next_small_number() < 4,
                expr: Box::new(self.generate_expression(rg)),
                low: Box::new(self.generate_expression(rg)),
                high: Box::new(self.generate_expression(rg)),
            },
            PredKind::InList => {
                let expr = self.generate_expression(rg);
                let nitems = rg.uniform(1, 4);
                let list = (0..nitems).map(|_| self.generate_expression(rg)).collect();
                Expr::InList {
                    negated: rg.next_small_number() < 4,
                    expr: Box::new(expr),
                    list,
                }
            }
            PredKind::InSubquery => Expr::InSubquery {
                negated: rg.next_small_number() < 4,
                expr: Box::new(self.generate_expression(rg)),
                subquery: self.generate_scalar_subquery(rg),
            },
            PredKind::Like => Expr::Like {
                negated: rg.next_small_number() < 4,
                expr: Box::new(self.generate_expression(rg)),
                pattern: Box::new(self.generate_like_pattern(rg)),
            },
            PredKind::IsNull => Expr::IsNull {
                negated: rg.next_bool(),
                expr: Box::new(self.generate_expression(rg)),
            },
            PredKind::Exists => Expr::Exists(self.generate_scalar_subquery(rg)),
            PredKind::Expr => self.generate_expression(rg),
        };
        self.depth -= 1;
        pred
    }

    pub(crate) fn generate_where_predicate(&mut self, rg: &mut RandomGenerator) -> Expr {
        self.generate_predicate(rg)
    }

    fn generate_like_pattern(&mut self, rg: &mut RandomGenerator) -> Expr {
        let quoted = rg.next_string('\'', false, 6);
        let fragment = quoted
            .trim_matches('\'')
            .replace(['%', '_', '\''], "");
        let pattern = match rg.next_small_number() {
            1..=4 => format!("'%{fragment}%'"),
            5 | 6 => format!("'{fragment}%'"),
            7 | 8 => format!("'%{fragment}'"),
            _ => format!("'{fragment}_'"),
        };
        Expr::lit(pattern)
    }

    fn has_visible_cols(&self) -> bool {
        self.levels
            .get(&self.current_level)
            .map(|l| !l.rels.is_empty() || !l.gcols.is_empty())
            .unwrap_or(false)
            || !self.parent_cols().is_empty()
    }

    /// A literal expression; either a plain small constant or a fully random
    /// typed value from the value generator.
    pub(crate) fn generate_literal(&mut self, rg: &mut RandomGenerator) -> Expr {
        let n = rg.next_medium_number();
        if n < 30 {
            let v = rg.next_large_number() as i64 - 500;
            return Expr::lit(v.to_string());
        }
        if n < 45 {
            return Expr::lit(*rg.pick(&["TRUE", "FALSE", "NULL", "0", "1", "-1", "''"]));
        }
        let mut tg = self.type_generator();
        let tp = tg.simple_type(rg, mask::ALL & !(mask::NESTED | mask::GEO));
        let mut vg = self.value_generator();
        Expr::lit(vg.any_value(rg, &tp))
    }

    /// A column reference honoring grouping discipline: under GROUP BY,
    /// references outside aggregates must resolve to grouping columns.
    pub(crate) fn generate_col_ref(&mut self, rg: &mut RandomGenerator) -> Expr {
        let (grouped, inside_aggregate, group_by_all) = {
            let level = self.level();
            (
                !level.gcols.is_empty(),
                level.inside_aggregate,
                level.group_by_all,
            )
        };
        if grouped && !inside_aggregate && !group_by_all {
            let gexprs: Vec<Expr> = self.level().gcols.iter().map(|g| g.expr.clone()).collect();
            return rg.pick(&gexprs).clone();
        }
        let mut cols = self.level().visible_cols();
        let parent = self.parent_cols();
        if cols.is_empty() || (!parent.is_empty() && rg.next_small_number() < 3) {
            cols.extend(parent);
        }
        if cols.is_empty() {
            return self.generate_literal(rg);
        }
        rg.pick(&cols).to_expr()
    }

    /// An operand that terminates immediately (column or literal).
    fn generate_simple_operand(&mut self, rg: &mut RandomGenerator) -> Expr {
        if self.has_visible_cols() && rg.next_small_number() < 8 {
            self.generate_col_ref(rg)
        } else {
            self.generate_literal(rg)
        }
    }

    pub(crate) fn generate_func_call(&mut self, rg: &mut RandomGenerator) -> Expr {
        let (allow_aggr, allow_window, inside_aggregate) = {
            let level = self.level();
            (
                level.allow_aggregates,
                level.allow_window_funcs,
                level.inside_aggregate,
            )
        };
        let udfs = if self.allow_not_deterministic {
            self.catalog.functions.keys().copied().collect::<Vec<_>>()
        } else {
            self.catalog.deterministic_functions()
        };

        let kind = rg.weighted(&[
            (40, CallKind::Scalar),
            (
                15 * u32::from(allow_aggr && !inside_aggregate),
                CallKind::Aggregate,
            ),
            (
                8 * u32::from(allow_window && !inside_aggregate),
                CallKind::Window,
            ),
            (6, CallKind::HigherOrder),
            (5 * u32::from(!udfs.is_empty()), CallKind::Udf),
        ]);
        match kind {
            CallKind::Scalar => {
                let spec = if self.allow_not_deterministic && rg.next_small_number() < 2 {
                    rg.pick(NONDETERMINISTIC_FUNCS)
                } else {
                    rg.pick(SCALAR_FUNCS)
                };
                let nargs = rg.uniform(spec.min_args, spec.max_args);
                let name = spec.name;
                self.depth += 1;
                let args = (0..nargs).map(|_| self.generate_expression(rg)).collect();
                self.depth -= 1;
                Expr::func(name, args)
            }
            CallKind::Aggregate => self.generate_aggregate_call(rg, allow_window),
            CallKind::Window => self.generate_window_call(rg),
            CallKind::HigherOrder => self.generate_higher_order_call(rg),
            CallKind::Udf => {
                let id = *rg.pick(&udfs);
                let nargs = self.catalog.functions[&id].nargs;
                self.depth += 1;
                let args = (0..nargs).map(|_| self.generate_expression(rg)).collect();
                self.depth -= 1;
                Expr::func(format!("f{id}"), args)
            }
        }
    }

    /// Aggregate call; nested aggregates are blocked while the argument is
    /// generated.
    pub(crate) fn generate_aggregate_call(
        &mut self,
        rg: &mut RandomGenerator,
        allow_window: bool,
    ) -> Expr {
        let spec = rg.pick(AGGREGATE_FUNCS);
        let name = spec.name;
        let args = if name == "count" && rg.next_bool() {
            vec![Expr::lit("*")]
        } else {
            let nargs = rg.uniform(spec.min_args, spec.max_args);
            self.level_mut().inside_aggregate = true;
            self.depth += 1;
            let args: Vec<Expr> = (0..nargs).map(|_| self.generate_expression(rg)).collect();
            self.depth -= 1;
            self.level_mut().inside_aggregate = false;
            args
        };
        // An aggregate may itself run over a window.
        let window = (allow_window && rg.next_small_number() < 3)
            .then(|| self.generate_window_spec(rg));
        Expr::Func {
            name: name.to_string(),
            args,
            window,
        }
    }

    fn generate_window_call(&mut self, rg: &mut RandomGenerator) -> Expr {
        let spec = rg.pick(WINDOW_FUNCS);
        let name = spec.name;
        let nargs = rg.uniform(spec.min_args, spec.max_args);
        let prev = self.level().allow_window_funcs;
        self.level_mut().allow_window_funcs = false;
        self.depth += 1;
        let args: Vec<Expr> = (0..nargs).map(|_| self.generate_expression(rg)).collect();
        self.depth -= 1;
        let window = self.generate_window_spec(rg);
        self.level_mut().allow_window_funcs = prev;
        Expr::Func {
            name: name.to_string(),
            args,
            window: Some(window),
        }
    }

    pub(crate) fn generate_window_spec(&mut self, rg: &mut RandomGenerator) -> WindowSpec {
        let prev = self.level().allow_window_funcs;
        self.level_mut().allow_window_funcs = false;
        let npartition = rg.uniform(0, 2);
        let partition_by = (0..npartition)
            .map(|_| self.generate_simple_operand(rg))
            .collect();
        let norder = rg.uniform(0, 2);
        let order_by = (0..norder)
            .map(|_| OrderTerm {
                expr: self.generate_simple_operand(rg),
                direction: match rg.next_small_number() {
                    1..=4 => Some(OrderDirection::Asc),
                    5..=7 => Some(OrderDirection::Desc),
                    _ => None,
                },
            })
            .collect();
        let frame = (rg.next_small_number() < 4).then(|| {
            let units = if rg.next_bool() {
                FrameUnits::Rows
            } else {
                FrameUnits::Range
            };
            let start = self.generate_frame_bound(rg, true);
            let end = rg.next_bool().then(|| self.generate_frame_bound(rg, false));
            (units, start, end)
        });
        self.level_mut().allow_window_funcs = prev;
        WindowSpec {
            partition_by,
            order_by,
            frame,
        }
    }

    pub(crate) fn generate_frame_bound(
        &mut self,
        rg: &mut RandomGenerator,
        leading: bool,
    ) -> FrameBound {
        match rg.next_small_number() {
            1..=3 => FrameBound::CurrentRow,
            4 | 5 => {
                if leading {
                    FrameBound::UnboundedPreceding
                } else {
                    FrameBound::UnboundedFollowing
                }
            }
            6 | 7 => FrameBound::Preceding(Box::new(Expr::lit(
                rg.next_small_number().to_string(),
            ))),
            _ => FrameBound::Following(Box::new(Expr::lit(
                rg.next_small_number().to_string(),
            ))),
        }
    }

    fn generate_higher_order_call(&mut self, rg: &mut RandomGenerator) -> Expr {
        let name = *rg.pick(HIGHER_ORDER_FUNCS);
        let nparams = rg.uniform(1, 2);
        let lambda = self.generate_lambda(rg, nparams);
        self.depth += 1;
        let arrays = (0..nparams)
            .map(|_| self.generate_expression(rg))
            .collect::<Vec<_>>();
        self.depth -= 1;
        let mut args = vec![lambda];
        args.extend(arrays);
        Expr::func(name, args)
    }

    /// A lambda whose body only references its own parameters.
    pub(crate) fn generate_lambda(&mut self, rg: &mut RandomGenerator, nparams: u32) -> Expr {
        let params: Vec<String> = (0..nparams).map(|i| format!("x{i}")).collect();
        let lhs = Expr::col(params[0].clone());
        let rhs = if nparams > 1 && rg.next_bool() {
            Expr::col(params[1].clone())
        } else {
            self.generate_literal(rg)
        };
        let op = *rg.pick(&[
            BinaryOp::Plus,
            BinaryOp::Multiply,
            BinaryOp::Eq,
            BinaryOp::NotEq,
            BinaryOp::Lt,
            BinaryOp::Gt,
        ]);
        Expr::Lambda {
            params,
            body: Box::new(Expr::binary(op, lhs, rhs)),
        }
    }

    fn generate_scalar_subquery(&mut self, rg: &mut RandomGenerator) -> Box<crate::ast::Select> {
        let select = self.generate_select(rg, false, 1, query::ALLOW_ALL & !query::ALLOW_SET);
        Box::new(select)
    }
}

fn comparison_op(rg: &mut RandomGenerator) -> BinaryOp {
    *rg.pick(&[
        BinaryOp::Eq,
        BinaryOp::NotEq,
        BinaryOp::Lt,
        BinaryOp::LtEq,
        BinaryOp::Gt,
        BinaryOp::GtEq,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeneratorOptions;

    fn generator_with_relation() -> (StatementGenerator, RandomGenerator) {
        let mut gen = StatementGenerator::new(GeneratorOptions::default());
        let rg = RandomGenerator::new(21);
        gen.push_level();
        gen.add_numbered_relation("t0", 4);
        (gen, rg)
    }

    fn count_aggregate_nesting(e: &Expr, inside: bool) -> bool {
        // Returns true if a nested aggregate is found.
        match e {
            Expr::Func { name, args, window } => {
                let is_agg =
                    AGGREGATE_FUNCS.iter().any(|s| s.name == *name) && window.is_none();
                if is_agg && inside {
                    return true;
                }
                args.iter()
                    .any(|a| count_aggregate_nesting(a, inside || is_agg))
            }
            Expr::Binary { lhs, rhs, .. } => {
                count_aggregate_nesting(lhs, inside) || count_aggregate_nesting(rhs, inside)
            }
            Expr::Unary { operand, .. } => count_aggregate_nesting(operand, inside),
            Expr::Between {
                expr, low, high, ..
            } => {
                count_aggregate_nesting(expr, inside)
                    || count_aggregate_nesting(low, inside)
                    || count_aggregate_nesting(high, inside)
            }
            Expr::InList { expr, list, .. } => {
                count_aggregate_nesting(expr, inside)
                    || list.iter().any(|e| count_aggregate_nesting(e, inside))
            }
            Expr::Like { expr, pattern, .. } => {
                count_aggregate_nesting(expr, inside)
                    || count_aggregate_nesting(pattern, inside)
            }
            Expr::IsNull { expr, .. } => count_aggregate_nesting(expr, inside),
            Expr::Lambda { body, .. } => count_aggregate_nesting(body, inside),
            _ => false,
        }
    }

    #[test]
    fn test_no_nested_aggregates() {
        let (mut gen, mut rg) = generator_with_relation();
        for _ in 0..500 {
            let e = gen.generate_aggregate_call(&mut rg, false);
            assert!(
                !count_aggregate_nesting(&e, false),
                "nested aggregate in {e}"
            );
        }
        gen.pop_level();
    }

    #[test]
    fn test_where_predicates_have_no_aggregates_when_blocked() {
        let (mut gen, mut rg) = generator_with_relation();
        gen.level_mut().allow_aggregates = false;
        gen.level_mut().allow_window_funcs = false;
        for _ in 0..300 {
            let e = gen.generate_where_predicate(&mut rg);
            let text = e.to_string();
            assert!(!text.contains(" OVER ("), "window call in WHERE: {text}");
        }
        gen.pop_level();
    }

    #[test]
    fn test_grouped_refs_use_group_columns() {
        let (mut gen, mut rg) = generator_with_relation();
        let gcol = crate::generator::GroupCol {
            col: crate::generator::SqlRelationCol::new("t0", "c2"),
            expr: Expr::Col {
                rel: Some("t0".to_string()),
                name: "c2".to_string(),
            },
        };
        gen.level_mut().gcols.push(gcol);
        for _ in 0..100 {
            let e = gen.generate_col_ref(&mut rg);
            assert_eq!(e.to_string(), "t0.c2");
        }
        gen.pop_level();
    }

    #[test]
    fn test_expression_depth_is_bounded() {
        let (mut gen, mut rg) = generator_with_relation();
        for _ in 0..300 {
            let e = gen.generate_expression(&mut rg);
            // A crude but effective bound: rendering a budgeted expression
            // never runs away.
            assert!(e.to_string().len() < 2_000_000);
            assert_eq!(gen.depth, 0);
        }
        gen.pop_level();
    }
}
