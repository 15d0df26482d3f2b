//! SQL rendering for the statement AST.
//!
//! The renderer is the single owner of quoting and keyword casing. Generated
//! identifiers never need quoting (single-letter prefix plus counter), so no
//! identifier quoting is performed.

use std::fmt;

use itertools::Itertools;

use crate::ast::*;

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectName::Table(id) => write!(f, "t{id}"),
            ObjectName::View(id) => write!(f, "v{id}"),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(db) = self.db {
            write!(f, "d{db}.")?;
        }
        write!(f, "{}", self.name)
    }
}

impl fmt::Display for ColumnPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.col)?;
        if let Some(sub) = self.sub {
            write!(f, ".c{sub}")?;
        }
        Ok(())
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Concat => "||",
        })
    }
}

fn is_compound(e: &Expr) -> bool {
    matches!(
        e,
        Expr::Binary { .. }
            | Expr::Unary { .. }
            | Expr::Between { .. }
            | Expr::InList { .. }
            | Expr::InSubquery { .. }
            | Expr::Like { .. }
            | Expr::IsNull { .. }
    )
}

struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_compound(self.0) {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Lit(text) => f.write_str(text),
            Expr::Col { rel, name } => {
                if let Some(rel) = rel {
                    write!(f, "{rel}.")?;
                }
                f.write_str(name)
            }
            Expr::Binary { op, lhs, rhs } => {
                write!(f, "{} {op} {}", Operand(lhs), Operand(rhs))
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "NOT {}", Operand(operand)),
                UnaryOp::Negate => write!(f, "-{}", Operand(operand)),
            },
            Expr::Func { name, args, window } => {
                write!(f, "{name}({})", args.iter().join(", "))?;
                if let Some(window) = window {
                    write!(f, " OVER ({window})")?;
                }
                Ok(())
            }
            Expr::Between {
                negated,
                expr,
                low,
                high,
            } => write!(
                f,
                "{}{} BETWEEN {} AND {}",
                Operand(expr),
                if *negated { " NOT" } else { "" },
                Operand(low),
                Operand(high)
            ),
            Expr::InList {
                negated,
                expr,
                list,
            } => write!(
                f,
                "{}{} IN ({})",
                Operand(expr),
                if *negated { " NOT" } else { "" },
                list.iter().join(", ")
            ),
            Expr::InSubquery {
                negated,
                expr,
                subquery,
            } => write!(
                f,
                "{}{} IN ({subquery})",
                Operand(expr),
                if *negated { " NOT" } else { "" }
            ),
            Expr::Like {
                negated,
                expr,
                pattern,
            } => write!(
                f,
                "{}{} LIKE {}",
                Operand(expr),
                if *negated { " NOT" } else { "" },
                Operand(pattern)
            ),
            Expr::IsNull { negated, expr } => write!(
                f,
                "{} IS{} NULL",
                Operand(expr),
                if *negated { " NOT" } else { "" }
            ),
            Expr::Subquery(select) => write!(f, "({select})"),
            Expr::Exists(select) => write!(f, "EXISTS ({select})"),
            Expr::Lambda { params, body } => {
                write!(f, "({}) -> {body}", params.iter().join(", "))
            }
        }
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        if !self.partition_by.is_empty() {
            write!(f, "PARTITION BY {}", self.partition_by.iter().join(", "))?;
            first = false;
        }
        if !self.order_by.is_empty() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "ORDER BY {}", self.order_by.iter().join(", "))?;
            first = false;
        }
        if let Some((units, start, end)) = &self.frame {
            if !first {
                f.write_str(" ")?;
            }
            let units = match units {
                FrameUnits::Rows => "ROWS",
                FrameUnits::Range => "RANGE",
            };
            match end {
                Some(end) => write!(f, "{units} BETWEEN {start} AND {end}")?,
                None => write!(f, "{units} {start}")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for FrameBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameBound::CurrentRow => f.write_str("CURRENT ROW"),
            FrameBound::UnboundedPreceding => f.write_str("UNBOUNDED PRECEDING"),
            FrameBound::UnboundedFollowing => f.write_str("UNBOUNDED FOLLOWING"),
            FrameBound::Preceding(e) => write!(f, "{} PRECEDING", Operand(e)),
            FrameBound::Following(e) => write!(f, "{} FOLLOWING", Operand(e)),
        }
    }
}

impl fmt::Display for OrderTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        match self.direction {
            Some(OrderDirection::Asc) => f.write_str(" ASC"),
            Some(OrderDirection::Desc) => f.write_str(" DESC"),
            None => Ok(()),
        }
    }
}

impl fmt::Display for ResultCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {alias}")?;
        }
        Ok(())
    }
}

impl fmt::Display for FromItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FromItem::Table {
                table,
                alias,
                final_,
            } => {
                write!(f, "{table}")?;
                if let Some(alias) = alias {
                    write!(f, " AS {alias}")?;
                }
                if *final_ {
                    f.write_str(" FINAL")?;
                }
                Ok(())
            }
            FromItem::Cte { name } => f.write_str(name),
            FromItem::Derived { select, alias } => write!(f, "({select}) AS {alias}"),
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
            JoinKind::Cross => "CROSS JOIN",
            JoinKind::LeftSemi => "LEFT SEMI JOIN",
            JoinKind::RightSemi => "RIGHT SEMI JOIN",
            JoinKind::LeftAnti => "LEFT ANTI JOIN",
            JoinKind::RightAnti => "RIGHT ANTI JOIN",
        })
    }
}

impl fmt::Display for FromClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first)?;
        for join in &self.joins {
            match join {
                JoinElement::Join {
                    kind,
                    item,
                    constraint,
                } => {
                    write!(f, " {kind} {item}")?;
                    match constraint {
                        Some(JoinConstraint::On(expr)) => write!(f, " ON {expr}")?,
                        Some(JoinConstraint::Using(cols)) => {
                            write!(f, " USING ({})", cols.iter().join(", "))?
                        }
                        None => {}
                    }
                }
                JoinElement::ArrayJoin { left, exprs } => {
                    write!(
                        f,
                        " {}ARRAY JOIN {}",
                        if *left { "LEFT " } else { "" },
                        exprs
                            .iter()
                            .map(|(e, alias)| format!("{e} AS {alias}"))
                            .join(", ")
                    )?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for SelectCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        if self.columns.is_empty() {
            f.write_str("*")?;
        } else {
            write!(f, "{}", self.columns.iter().join(", "))?;
        }
        if let Some(from) = &self.from {
            write!(f, " FROM {from}")?;
        }
        if let Some(prewhere) = &self.prewhere {
            write!(f, " PREWHERE {prewhere}")?;
        }
        if let Some(where_) = &self.where_ {
            write!(f, " WHERE {where_}")?;
        }
        match &self.group_by {
            Some(GroupBy::All) => f.write_str(" GROUP BY ALL")?,
            Some(GroupBy::Exprs { exprs, modifier }) => {
                write!(f, " GROUP BY {}", exprs.iter().join(", "))?;
                match modifier {
                    Some(GroupByModifier::Rollup) => f.write_str(" WITH ROLLUP")?,
                    Some(GroupByModifier::Cube) => f.write_str(" WITH CUBE")?,
                    None => {}
                }
            }
            Some(GroupBy::GroupingSets(sets)) => {
                write!(
                    f,
                    " GROUP BY GROUPING SETS ({})",
                    sets.iter()
                        .map(|set| format!("({})", set.iter().join(", ")))
                        .join(", ")
                )?;
            }
            None => {}
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {having}")?;
        }
        match &self.order_by {
            Some(OrderBy::All) => f.write_str(" ORDER BY ALL")?,
            Some(OrderBy::Terms(terms)) => {
                write!(f, " ORDER BY {}", terms.iter().join(", "))?
            }
            None => {}
        }
        if let Some(limit) = &self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(offset) = &self.offset {
            write!(f, " OFFSET {offset}")?;
        }
        Ok(())
    }
}

impl fmt::Display for SetOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SetOp::UnionAll => "UNION ALL",
            SetOp::UnionDistinct => "UNION DISTINCT",
            SetOp::Intersect => "INTERSECT",
            SetOp::Except => "EXCEPT",
        })
    }
}

impl fmt::Display for SelectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectBody::Core(core) => write!(f, "{core}"),
            SelectBody::SetOp { op, left, right } => write!(f, "{left} {op} {right}"),
        }
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.ctes.is_empty() {
            write!(
                f,
                "WITH {} ",
                self.ctes
                    .iter()
                    .map(|cte| format!("{} AS ({})", cte.name, cte.select))
                    .join(", ")
            )?;
        }
        write!(f, "{}", self.body)
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl fmt::Display for TopSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.select)?;
        if let Some(into) = &self.into_file {
            write!(f, " INTO OUTFILE '{}'", into.path.display())?;
            if into.truncate {
                f.write_str(" TRUNCATE")?;
            }
        }
        if let Some(format) = &self.format {
            write!(f, " FORMAT {format}")?;
        }
        Ok(())
    }
}

impl fmt::Display for SetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.ctype)?;
        if let Some(nullable) = self.nullable {
            f.write_str(if nullable { " NULL" } else { " NOT NULL" })?;
        }
        if let Some((dmod, expr)) = &self.default {
            write!(f, " {dmod}")?;
            if let Some(expr) = expr {
                write!(f, " {expr}")?;
            }
        }
        if !self.codecs.is_empty() {
            write!(f, " CODEC({})", self.codecs.iter().join(", "))?;
        }
        if !self.statistics.is_empty() {
            write!(
                f,
                " STATISTICS({})",
                self.statistics.iter().map(|s| s.name()).join(", ")
            )?;
        }
        if !self.settings.is_empty() {
            write!(f, " SETTINGS ({})", self.settings.iter().join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Display for IndexDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INDEX i{} {} TYPE {}", self.id, self.expr, self.kind.name())?;
        if !self.params.is_empty() {
            write!(
                f,
                "({})",
                self.params
                    .iter()
                    .map(|p| match p {
                        IndexParam::Int(v) => v.to_string(),
                        IndexParam::Float(v) => v.to_string(),
                    })
                    .join(", ")
            )?;
        }
        if let Some(granularity) = self.granularity {
            write!(f, " GRANULARITY {granularity}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ProjectionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PROJECTION p{} ({})", self.id, self.select)
    }
}

impl fmt::Display for ConstraintDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CONSTRAINT c{} {} {}",
            self.id,
            match self.kind {
                ConstraintKind::Check => "CHECK",
                ConstraintKind::Assume => "ASSUME",
            },
            self.expr
        )
    }
}

impl fmt::Display for EngineClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ENGINE = ")?;
        if let Some(option) = &self.option {
            f.write_str(option.prefix())?;
        }
        f.write_str(self.engine.name())?;
        if !self.params.is_empty() {
            write!(f, "({})", self.params.iter().join(", "))?;
        }
        if self.engine.is_merge_tree_family() {
            if self.order_by.is_empty() {
                f.write_str(" ORDER BY tuple()")?;
            } else {
                write!(f, " ORDER BY ({})", self.order_by.iter().join(", "))?;
            }
        }
        if !self.primary_key.is_empty() {
            write!(f, " PRIMARY KEY ({})", self.primary_key.iter().join(", "))?;
        }
        if !self.partition_by.is_empty() {
            write!(f, " PARTITION BY ({})", self.partition_by.iter().join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Display for CreateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE ")?;
        if self.replace {
            f.write_str("OR REPLACE ")?;
        }
        if self.is_temp {
            f.write_str("TEMPORARY ")?;
        }
        write!(f, "TABLE {}", self.table)?;
        match &self.body {
            CreateTableBody::Defined(items) => {
                write!(
                    f,
                    " ({})",
                    items
                        .iter()
                        .map(|item| match item {
                            TableDefItem::Column(c) => c.to_string(),
                            TableDefItem::Index(i) => i.to_string(),
                            TableDefItem::Projection(p) => p.to_string(),
                            TableDefItem::Constraint(c) => c.to_string(),
                        })
                        .join(", ")
                )?;
            }
            CreateTableBody::AsTable { src, clone } => {
                write!(f, " {}AS {src}", if *clone { "CLONE " } else { "" })?;
            }
        }
        write!(f, " {}", self.engine)?;
        if !self.settings.is_empty() {
            write!(f, " SETTINGS {}", self.settings.iter().join(", "))?;
        }
        if let Some(select) = &self.as_select {
            write!(f, " AS {select}")?;
        }
        Ok(())
    }
}

impl fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RefreshPolicyKind::Every => write!(f, "REFRESH EVERY {} SECOND", self.interval_seconds)?,
            RefreshPolicyKind::After => write!(f, "REFRESH AFTER {} SECOND", self.interval_seconds)?,
        }
        if let Some(offset) = self.offset_seconds {
            write!(f, " OFFSET {offset} SECOND")?;
        }
        if let Some(randomize) = self.randomize_seconds {
            write!(f, " RANDOMIZE FOR {randomize} SECOND")?;
        }
        if self.append {
            f.write_str(" APPEND")?;
        }
        Ok(())
    }
}

impl fmt::Display for CreateView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE ")?;
        if self.replace {
            f.write_str("OR REPLACE ")?;
        }
        if self.is_materialized {
            f.write_str("MATERIALIZED ")?;
        }
        write!(f, "VIEW {}", self.view)?;
        if let Some(refresh) = &self.refresh {
            write!(f, " {refresh}")?;
        }
        if let Some(to_table) = &self.to_table {
            write!(f, " TO {to_table}")?;
        }
        if let Some(engine) = &self.engine {
            write!(f, " {engine}")?;
        }
        if self.empty {
            f.write_str(" EMPTY")?;
        }
        if self.populate {
            f.write_str(" POPULATE")?;
        }
        write!(f, " AS {}", self.select)
    }
}

impl fmt::Display for CreateDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE DATABASE d{} ENGINE = {}", self.db, self.engine)?;
        if let Some(zoo_path) = self.zoo_path {
            write!(f, "('/clickhouse/databases/z{zoo_path}', 'shard1', 'replica1')")?;
        }
        Ok(())
    }
}

impl fmt::Display for CreateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CREATE FUNCTION f{} AS ({}) -> {}",
            self.id,
            self.params.iter().join(", "),
            self.body
        )
    }
}

impl fmt::Display for Drop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DROP ")?;
        match &self.object {
            ObjectRef::Table(t) => {
                if self.is_temp {
                    f.write_str("TEMPORARY ")?;
                }
                f.write_str("TABLE ")?;
                if self.if_empty {
                    f.write_str("IF EMPTY ")?;
                }
                write!(f, "{t}")?;
            }
            ObjectRef::View(v) => write!(f, "VIEW {v}")?,
            ObjectRef::Database(db) => write!(f, "DATABASE d{db}")?,
        }
        if self.sync {
            f.write_str(" SYNC")?;
        }
        Ok(())
    }
}

impl fmt::Display for Attach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object {
            ObjectRef::Table(t) | ObjectRef::View(t) => write!(f, "ATTACH TABLE {t}"),
            ObjectRef::Database(db) => write!(f, "ATTACH DATABASE d{db}"),
        }
    }
}

impl fmt::Display for Detach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object {
            ObjectRef::Table(t) | ObjectRef::View(t) => write!(f, "DETACH TABLE {t}")?,
            ObjectRef::Database(db) => write!(f, "DETACH DATABASE d{db}")?,
        }
        if self.permanently {
            f.write_str(" PERMANENTLY")?;
        }
        if self.sync {
            f.write_str(" SYNC")?;
        }
        Ok(())
    }
}

impl fmt::Display for ExchangeTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EXCHANGE TABLES {} AND {}", self.lhs, self.rhs)
    }
}

struct AddPositionSuffix<'a>(&'a Option<AddPosition>, char);

impl fmt::Display for AddPositionSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(AddPosition::First) => f.write_str(" FIRST"),
            Some(AddPosition::After(id)) => write!(f, " AFTER {}{id}", self.1),
            None => Ok(()),
        }
    }
}

impl fmt::Display for AlterItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlterItem::OrderBy(cols) => {
                if cols.is_empty() {
                    f.write_str("MODIFY ORDER BY tuple()")
                } else {
                    write!(f, "MODIFY ORDER BY ({})", cols.iter().join(", "))
                }
            }
            AlterItem::HeavyDelete(where_) => write!(f, "DELETE WHERE {where_}"),
            AlterItem::HeavyUpdate { updates, where_ } => write!(
                f,
                "UPDATE {} WHERE {where_}",
                updates
                    .iter()
                    .map(|(col, expr)| format!("{col} = {expr}"))
                    .join(", ")
            ),
            AlterItem::AddColumn { def, position } => {
                write!(f, "ADD COLUMN {def}{}", AddPositionSuffix(position, 'c'))
            }
            AlterItem::MaterializeColumn(col) => write!(f, "MATERIALIZE COLUMN c{col}"),
            AlterItem::DropColumn(col) => write!(f, "DROP COLUMN c{col}"),
            AlterItem::RenameColumn { old, new } => {
                write!(f, "RENAME COLUMN c{old} TO c{new}")
            }
            AlterItem::ModifyColumn { def, position } => {
                write!(f, "MODIFY COLUMN {def}{}", AddPositionSuffix(position, 'c'))
            }
            AlterItem::DeleteMask => f.write_str("APPLY DELETED MASK"),
            AlterItem::AddStatistics { cols, stats } => write!(
                f,
                "ADD STATISTICS {} TYPE {}",
                cols.iter().map(|c| format!("c{c}")).join(", "),
                stats.iter().map(|s| s.name()).join(", ")
            ),
            AlterItem::ModifyStatistics { cols, stats } => write!(
                f,
                "MODIFY STATISTICS {} TYPE {}",
                cols.iter().map(|c| format!("c{c}")).join(", "),
                stats.iter().map(|s| s.name()).join(", ")
            ),
            AlterItem::DropStatistics(cols) => write!(
                f,
                "DROP STATISTICS {}",
                cols.iter().map(|c| format!("c{c}")).join(", ")
            ),
            AlterItem::ClearStatistics(cols) => write!(
                f,
                "CLEAR STATISTICS {}",
                cols.iter().map(|c| format!("c{c}")).join(", ")
            ),
            AlterItem::MaterializeStatistics(cols) => write!(
                f,
                "MATERIALIZE STATISTICS {}",
                cols.iter().map(|c| format!("c{c}")).join(", ")
            ),
            AlterItem::AddIndex { def, position } => {
                write!(f, "ADD {def}{}", AddPositionSuffix(position, 'i'))
            }
            AlterItem::MaterializeIndex(idx) => write!(f, "MATERIALIZE INDEX i{idx}"),
            AlterItem::ClearIndex(idx) => write!(f, "CLEAR INDEX i{idx}"),
            AlterItem::DropIndex(idx) => write!(f, "DROP INDEX i{idx}"),
            AlterItem::RemoveColumnProperty { col, property } => {
                write!(f, "MODIFY COLUMN c{col} REMOVE {}", property.name())
            }
            AlterItem::ModifyColumnSetting { col, settings } => write!(
                f,
                "MODIFY COLUMN c{col} MODIFY SETTING {}",
                settings.iter().join(", ")
            ),
            AlterItem::RemoveColumnSetting { col, names } => write!(
                f,
                "MODIFY COLUMN c{col} RESET SETTING {}",
                names.iter().join(", ")
            ),
            AlterItem::ModifyTableSetting(settings) => {
                write!(f, "MODIFY SETTING {}", settings.iter().join(", "))
            }
            AlterItem::RemoveTableSetting(names) => {
                write!(f, "RESET SETTING {}", names.iter().join(", "))
            }
            AlterItem::AddProjection(def) => write!(f, "ADD {def}"),
            AlterItem::RemoveProjection(p) => write!(f, "DROP PROJECTION p{p}"),
            AlterItem::MaterializeProjection(p) => write!(f, "MATERIALIZE PROJECTION p{p}"),
            AlterItem::ClearProjection(p) => write!(f, "CLEAR PROJECTION p{p}"),
            AlterItem::AddConstraint(def) => write!(f, "ADD {def}"),
            AlterItem::RemoveConstraint(c) => write!(f, "DROP CONSTRAINT c{c}"),
            AlterItem::RefreshView(policy) => write!(f, "MODIFY {policy}"),
            AlterItem::ModifyQuery { select, .. } => write!(f, "MODIFY QUERY {select}"),
        }
    }
}

impl fmt::Display for AlterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ALTER TABLE {} {}",
            self.target,
            self.items.iter().join(", ")
        )
    }
}

impl fmt::Display for FileFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "file('{}', '{}', '{}'",
            self.path.display(),
            self.format,
            self.structure
        )?;
        if let Some(compression) = &self.compression {
            write!(f, ", '{}'", compression.name())?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for Insert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("INSERT INTO ")?;
        match &self.target {
            InsertTarget::Table { table, cols } => {
                write!(f, "{table}")?;
                if !cols.is_empty() {
                    write!(f, " ({})", cols.iter().join(", "))?;
                }
            }
            InsertTarget::FileFunc(func) => write!(f, "FUNCTION {func}")?,
        }
        match &self.source {
            InsertSource::Values(rows) => write!(f, " VALUES {rows}"),
            InsertSource::Select(select) => write!(f, " {select}"),
            InsertSource::ValueExprs(rows) => write!(
                f,
                " VALUES {}",
                rows.iter()
                    .map(|row| format!("({})", row.iter().join(", ")))
                    .join(", ")
            ),
            InsertSource::InFile {
                path,
                format,
                compression,
                settings,
            } => {
                write!(f, " FROM INFILE '{}'", path.display())?;
                if let Some(compression) = compression {
                    write!(f, " COMPRESSION '{}'", compression.name())?;
                }
                if !settings.is_empty() {
                    write!(f, " SETTINGS {}", settings.iter().join(", "))?;
                }
                write!(f, " FORMAT {format}")
            }
        }
    }
}

impl fmt::Display for LightDelete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DELETE FROM {} WHERE {}", self.table, self.where_)
    }
}

impl fmt::Display for Truncate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TRUNCATE TABLE {}", self.table)
    }
}

impl fmt::Display for OptimizeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OPTIMIZE TABLE {}", self.table)?;
        if self.final_ {
            f.write_str(" FINAL")?;
        }
        match &self.dedup {
            Some(Deduplicate::Plain) => f.write_str(" DEDUPLICATE")?,
            Some(Deduplicate::By(cols)) => {
                write!(f, " DEDUPLICATE BY {}", cols.iter().join(", "))?
            }
            None => {}
        }
        Ok(())
    }
}

impl fmt::Display for CheckTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CHECK TABLE {}", self.table)?;
        if self.single_result {
            f.write_str(" SETTINGS check_query_single_value_result = 1")?;
        }
        Ok(())
    }
}

impl fmt::Display for DescTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DESCRIBE TABLE {}", self.table)?;
        if self.sub_cols {
            f.write_str(" SETTINGS describe_include_subcolumns = 1")?;
        }
        Ok(())
    }
}

impl fmt::Display for Explain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EXPLAIN")?;
        if let Some(kind) = &self.kind {
            write!(f, " {}", kind.name())?;
        }
        write!(f, " {}", self.inner)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Select(s) => write!(f, "{s}"),
            Statement::Insert(s) => write!(f, "{s}"),
            Statement::Delete(s) => write!(f, "{s}"),
            Statement::CreateTable(s) => write!(f, "{s}"),
            Statement::CreateView(s) => write!(f, "{s}"),
            Statement::CreateDatabase(s) => write!(f, "{s}"),
            Statement::CreateFunction(s) => write!(f, "{s}"),
            Statement::Drop(s) => write!(f, "{s}"),
            Statement::Truncate(s) => write!(f, "{s}"),
            Statement::Optimize(s) => write!(f, "{s}"),
            Statement::Check(s) => write!(f, "{s}"),
            Statement::Desc(s) => write!(f, "{s}"),
            Statement::Alter(s) => write!(f, "{s}"),
            Statement::Exchange(s) => write!(f, "{s}"),
            Statement::Attach(s) => write!(f, "{s}"),
            Statement::Detach(s) => write!(f, "{s}"),
            Statement::Set(values) => write!(f, "SET {}", values.iter().join(", ")),
            Statement::Explain(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_parenthesization() {
        let pred = Expr::binary(
            BinaryOp::Eq,
            Expr::binary(BinaryOp::Gt, Expr::col("c0"), Expr::lit("0")),
            Expr::lit("TRUE"),
        );
        assert_eq!(pred.to_string(), "(c0 > 0) = TRUE");
    }

    #[test]
    fn test_table_refs() {
        assert_eq!(TableRef::table(Some(0), 3).to_string(), "d0.t3");
        assert_eq!(TableRef::view(None, 1).to_string(), "v1");
        assert_eq!(ColumnPath::with_sub(1, 4).to_string(), "c1.c4");
    }

    #[test]
    fn test_select_rendering() {
        let core = SelectCore {
            columns: vec![ResultCol {
                expr: Expr::func("count", vec![Expr::lit("*")]),
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
            where_: Some(Expr::binary(
                BinaryOp::Eq,
                Expr::binary(BinaryOp::Gt, Expr::col("c0"), Expr::lit("0")),
                Expr::lit("TRUE"),
            )),
            ..SelectCore::default()
        };
        assert_eq!(
            Select::from_core(core).to_string(),
            "SELECT count(*) FROM d0.t0 WHERE (c0 > 0) = TRUE"
        );
    }

    #[test]
    fn test_set_statement() {
        let stmt = Statement::Set(vec![
            SetValue {
                name: "max_threads".to_string(),
                value: "1".to_string(),
            },
            SetValue {
                name: "join_use_nulls".to_string(),
                value: "1".to_string(),
            },
        ]);
        assert_eq!(stmt.to_string(), "SET max_threads = 1, join_use_nulls = 1");
    }

    #[test]
    fn test_window_rendering() {
        let e = Expr::Func {
            name: "row_number".to_string(),
            args: Vec::new(),
            window: Some(WindowSpec {
                partition_by: vec![Expr::col("c0")],
                order_by: vec![OrderTerm {
                    expr: Expr::col("c1"),
                    direction: Some(OrderDirection::Desc),
                }],
                frame: Some((
                    FrameUnits::Rows,
                    FrameBound::UnboundedPreceding,
                    Some(FrameBound::CurrentRow),
                )),
            }),
        };
        assert_eq!(
            e.to_string(),
            "row_number() OVER (PARTITION BY c0 ORDER BY c1 DESC ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW)"
        );
    }

    #[test]
    fn test_exchange_and_truncate() {
        let ex = ExchangeTables {
            lhs: TableRef::table(Some(0), 0),
            rhs: TableRef::table(Some(0), 1),
        };
        assert_eq!(ex.to_string(), "EXCHANGE TABLES d0.t0 AND d0.t1");
        let tr = Truncate {
            table: TableRef::table(Some(0), 0),
        };
        assert_eq!(tr.to_string(), "TRUNCATE TABLE d0.t0");
    }

    #[test]
    fn test_explain_wrapping() {
        let inner = Statement::Desc(DescTable {
            table: TableRef::table(Some(0), 0),
            sub_cols: false,
        });
        let stmt = Statement::Explain(Explain {
            kind: Some(ExplainKind::Pipeline),
            inner: Box::new(inner),
        });
        assert_eq!(stmt.to_string(), "EXPLAIN PIPELINE DESCRIBE TABLE d0.t0");
    }
}
