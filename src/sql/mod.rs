//! SQL emission.
//!
//! A tree walker over the operation tree that renders fragments into a
//! buffer in canonical clause order (SELECT, FROM, JOINs, WHERE, GROUP BY,
//! ORDER BY, LIMIT/OFFSET), skipping missing clauses. Dialect differences go
//! through the [`dialect::SqlDialect`] strategy; everything else is shared.
//!
//! The emitter receives the merged parameter map so membership tests can be
//! expanded into indexed placeholders on dialects without array binding.

pub mod dialect;

use std::collections::HashMap;

use log::trace;

use crate::ir::{
    AggregateFn, ArithOp, BoolExpr, BoolOp, CiFunction, CompareOp, ConstValue, DeleteOp, FromOp,
    InsertOp, JoinKind, OpTree, Projection, QueryOp, StringCase, StringPredicate, TerminalKind,
    UpdateOp, ValueExpr, WindowFn,
};
use crate::params::{ParamValue, Params};

use dialect::{Dialect, SqlDialect};

/// Emission failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmitError {
    #[error("array parameter '{name}' must be supplied so membership can be expanded")]
    MissingArrayParameter { name: String },

    #[error("invalid query chain: {message}")]
    InvalidChain { message: String },
}

impl EmitError {
    fn chain(message: impl Into<String>) -> Self {
        EmitError::InvalidChain {
            message: message.into(),
        }
    }
}

/// Emit SQL for an operation tree against a dialect. `params` is the merged
/// parameter map (auto plus caller, already expanded).
pub fn emit(tree: &OpTree, dialect: Dialect, params: &Params) -> Result<String, EmitError> {
    let emitter = Emitter { dialect, params };
    let sql = match tree {
        OpTree::Query(query) => emitter.emit_query(query)?,
        OpTree::Insert(insert) => emitter.emit_insert(insert)?,
        OpTree::Update(update) => emitter.emit_update(update)?,
        OpTree::Delete(delete) => emitter.emit_delete(delete)?,
    };
    trace!("emitted {} SQL: {}", dialect.name(), sql);
    Ok(sql)
}

// =============================================================================
// Clause collection
// =============================================================================

enum JoinStyle {
    Inner,
    LeftOuter,
    Cross,
}

struct JoinClause<'a> {
    style: JoinStyle,
    from: &'a FromOp,
    on: Option<(&'a ValueExpr, &'a ValueExpr)>,
}

#[derive(Default)]
struct SelectParts<'a> {
    from: Option<&'a FromOp>,
    union: Option<(&'a QueryOp, &'a QueryOp, bool)>,
    joins: Vec<JoinClause<'a>>,
    wheres: Vec<&'a BoolExpr>,
    group_by: Option<&'a ValueExpr>,
    order_by: Vec<(&'a ValueExpr, bool)>,
    take: Option<&'a ValueExpr>,
    skip: Option<&'a ValueExpr>,
    distinct: bool,
    projection: Option<&'a Projection>,
    terminal: Option<&'a TerminalKind>,
}

struct Emitter<'a> {
    dialect: Dialect,
    params: &'a Params,
}

impl<'a> Emitter<'a> {
    fn collect<'t>(&self, op: &'t QueryOp, parts: &mut SelectParts<'t>) -> Result<(), EmitError> {
        match op {
            QueryOp::From(from) => {
                parts.from = Some(from);
            }
            QueryOp::Union { first, second, all } => {
                parts.union = Some((first, second, *all));
            }
            QueryOp::Where { source, predicate } => {
                self.collect(source, parts)?;
                parts.wheres.push(predicate);
            }
            QueryOp::Select { source, projection } => {
                self.collect(source, parts)?;
                // The emitter only looks at the last projection.
                parts.projection = Some(projection);
            }
            QueryOp::OrderBy {
                source,
                key,
                descending,
            } => {
                self.collect(source, parts)?;
                parts.order_by = vec![(key, *descending)];
            }
            QueryOp::ThenBy {
                source,
                key,
                descending,
            } => {
                self.collect(source, parts)?;
                parts.order_by.push((key, *descending));
            }
            QueryOp::Take { source, count } => {
                self.collect(source, parts)?;
                parts.take = Some(count);
            }
            QueryOp::Skip { source, count } => {
                self.collect(source, parts)?;
                parts.skip = Some(count);
            }
            QueryOp::Distinct { source } => {
                self.collect(source, parts)?;
                parts.distinct = true;
            }
            QueryOp::Reverse { source } => {
                self.collect(source, parts)?;
                for item in &mut parts.order_by {
                    item.1 = !item.1;
                }
            }
            QueryOp::GroupBy { source, key } => {
                self.collect(source, parts)?;
                parts.group_by = Some(key);
            }
            QueryOp::Join(join) => {
                self.collect(&join.outer, parts)?;
                let QueryOp::From(from) = join.inner.as_ref() else {
                    return Err(EmitError::chain("join inner source must be a plain table"));
                };
                parts.joins.push(JoinClause {
                    style: match join.kind {
                        JoinKind::Inner => JoinStyle::Inner,
                        JoinKind::LeftOuter => JoinStyle::LeftOuter,
                    },
                    from,
                    on: Some((&join.outer_key, &join.inner_key)),
                });
            }
            QueryOp::GroupJoin(_) => {
                return Err(EmitError::chain(
                    "groupJoin must be flattened by selectMany(defaultIfEmpty)",
                ));
            }
            QueryOp::SelectMany { source, inner } => {
                self.collect(source, parts)?;
                let QueryOp::From(from) = inner.as_ref() else {
                    return Err(EmitError::chain(
                        "selectMany inner source must be a plain table",
                    ));
                };
                parts.joins.push(JoinClause {
                    style: JoinStyle::Cross,
                    from,
                    on: None,
                });
            }
            QueryOp::Terminal { source, kind } => {
                self.collect(source, parts)?;
                parts.terminal = Some(kind);
            }
        }
        Ok(())
    }

    // =========================================================================
    // SELECT rendering
    // =========================================================================

    fn emit_query(&self, op: &QueryOp) -> Result<String, EmitError> {
        let mut parts = SelectParts::default();
        self.collect(op, &mut parts)?;

        if let Some(kind) = parts.terminal {
            if kind.is_existence() {
                return self.render_existence(&parts, kind);
            }
        }
        self.render_select(&parts, None)
    }

    /// Render one SELECT statement. `extra_where` is appended to the WHERE
    /// conjunction (used by existence probes).
    fn render_select(
        &self,
        parts: &SelectParts<'_>,
        extra_where: Option<String>,
    ) -> Result<String, EmitError> {
        // CASE-lifting map for left-outer joins: inner alias to the rendered
        // join key that decides row presence.
        let mut lift: HashMap<String, String> = HashMap::new();
        for join in &parts.joins {
            if matches!(join.style, JoinStyle::LeftOuter) {
                if let (Some(alias), Some((_, inner_key))) = (&join.from.alias, &join.on) {
                    lift.insert(alias.clone(), self.value_sql(inner_key, None)?);
                }
            }
        }
        let lift = if lift.is_empty() { None } else { Some(&lift) };

        // Set operations replace the FROM shape entirely.
        if let Some((first, second, all)) = parts.union {
            let mut sql = format!(
                "({}) UNION{} ({})",
                self.emit_query(first)?,
                if all { " ALL" } else { "" },
                self.emit_query(second)?
            );
            self.append_order_and_limit(&mut sql, parts)?;
            return Ok(sql);
        }

        let mut sql = String::from("SELECT ");
        if parts.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&self.projection_sql(parts, lift)?);

        let from = parts
            .from
            .ok_or_else(|| EmitError::chain("query has no source"))?;
        sql.push_str(" FROM ");
        sql.push_str(&self.from_sql(from)?);

        for join in &parts.joins {
            match join.style {
                JoinStyle::Inner => sql.push_str(" INNER JOIN "),
                JoinStyle::LeftOuter => sql.push_str(" LEFT OUTER JOIN "),
                JoinStyle::Cross => sql.push_str(" CROSS JOIN "),
            }
            sql.push_str(&self.from_sql(join.from)?);
            if let Some((outer_key, inner_key)) = &join.on {
                sql.push_str(" ON ");
                sql.push_str(&self.value_sql(outer_key, None)?);
                sql.push_str(" = ");
                sql.push_str(&self.value_sql(inner_key, None)?);
            }
        }

        let mut predicates = Vec::with_capacity(parts.wheres.len() + 1);
        for predicate in &parts.wheres {
            predicates.push(self.bool_sql(predicate, None)?);
        }
        if let Some(extra) = extra_where {
            predicates.push(extra);
        }
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }

        if let Some(key) = parts.group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by_sql(key)?);
        }

        self.append_order_and_limit(&mut sql, parts)?;
        Ok(sql)
    }

    fn append_order_and_limit(
        &self,
        sql: &mut String,
        parts: &SelectParts<'_>,
    ) -> Result<(), EmitError> {
        let invert = matches!(
            parts.terminal,
            Some(TerminalKind::Last | TerminalKind::LastOrDefault)
        );

        if parts.order_by.is_empty() {
            if invert {
                sql.push_str(" ORDER BY 1 DESC");
            }
        } else {
            let mut items = Vec::with_capacity(parts.order_by.len());
            for (key, descending) in &parts.order_by {
                let direction = if *descending != invert { "DESC" } else { "ASC" };
                items.push(format!("{} {}", self.value_sql(key, None)?, direction));
            }
            sql.push_str(" ORDER BY ");
            sql.push_str(&items.join(", "));
        }

        let limit = match parts.terminal {
            Some(TerminalKind::First | TerminalKind::FirstOrDefault) => Some("1".to_string()),
            Some(TerminalKind::Last | TerminalKind::LastOrDefault) => Some("1".to_string()),
            Some(TerminalKind::Single | TerminalKind::SingleOrDefault) => Some("2".to_string()),
            _ => match parts.take {
                Some(count) => Some(self.value_sql(count, None)?),
                None => None,
            },
        };
        let offset = match parts.skip {
            Some(count) => Some(self.value_sql(count, None)?),
            None => None,
        };

        let clause = self
            .dialect
            .emit_limit_offset(limit.as_deref(), offset.as_deref());
        if !clause.is_empty() {
            sql.push(' ');
            sql.push_str(&clause);
        }
        Ok(())
    }

    fn projection_sql(
        &self,
        parts: &SelectParts<'_>,
        lift: Option<&HashMap<String, String>>,
    ) -> Result<String, EmitError> {
        // Aggregate terminals replace the projection entirely.
        if let Some(kind) = parts.terminal {
            match kind {
                TerminalKind::Count => return Ok("COUNT(*)".to_string()),
                TerminalKind::Sum(e) => {
                    return Ok(format!("SUM({})", self.value_sql(e, None)?));
                }
                TerminalKind::Average(e) => {
                    return Ok(format!("AVG({})", self.value_sql(e, None)?));
                }
                TerminalKind::Min(e) => {
                    return Ok(format!("MIN({})", self.value_sql(e, None)?));
                }
                TerminalKind::Max(e) => {
                    return Ok(format!("MAX({})", self.value_sql(e, None)?));
                }
                _ => {}
            }
        }

        if let Some(projection) = parts.projection {
            return self.render_projection(projection, lift);
        }

        // GroupBy without select projects the grouped key columns, named by
        // their object keys when composite.
        if let Some(key) = parts.group_by {
            return match key {
                ValueExpr::Object(props) => {
                    let mut items = Vec::with_capacity(props.len());
                    for (name, expr) in props {
                        items.push(format!(
                            "{} AS {}",
                            self.value_sql(expr, None)?,
                            self.dialect.quote_identifier(name)
                        ));
                    }
                    Ok(items.join(", "))
                }
                other => self.value_sql(other, None),
            };
        }

        if !parts.joins.is_empty() {
            return Err(EmitError::chain(
                "joined query requires an explicit projection",
            ));
        }
        Ok("*".to_string())
    }

    fn render_projection(
        &self,
        projection: &Projection,
        lift: Option<&HashMap<String, String>>,
    ) -> Result<String, EmitError> {
        match projection {
            Projection::AllColumns => Ok("*".to_string()),
            Projection::Expr(ValueExpr::Object(props)) => {
                let mut items = Vec::with_capacity(props.len());
                for (name, expr) in props {
                    items.push(format!(
                        "{} AS {}",
                        self.value_sql(expr, lift)?,
                        self.dialect.quote_identifier(name)
                    ));
                }
                Ok(items.join(", "))
            }
            Projection::Expr(expr) => self.value_sql(expr, lift),
        }
    }

    fn group_by_sql(&self, key: &ValueExpr) -> Result<String, EmitError> {
        match key {
            ValueExpr::Object(props) => {
                let mut items = Vec::with_capacity(props.len());
                for (_, expr) in props {
                    items.push(self.value_sql(expr, None)?);
                }
                Ok(items.join(", "))
            }
            other => self.value_sql(other, None),
        }
    }

    fn from_sql(&self, from: &FromOp) -> Result<String, EmitError> {
        if let Some(sub) = &from.subquery {
            let alias = from.alias_hint.as_deref().unwrap_or(&from.table);
            return Ok(format!(
                "({}) AS {}",
                self.emit_query(sub)?,
                self.dialect.quote_identifier(alias)
            ));
        }
        let mut sql = match &from.schema {
            Some(schema) => format!(
                "{}.{}",
                self.dialect.quote_identifier(schema),
                self.dialect.quote_identifier(&from.table)
            ),
            None => self.dialect.quote_identifier(&from.table),
        };
        if let Some(alias) = &from.alias {
            sql.push_str(" AS ");
            sql.push_str(&self.dialect.quote_identifier(alias));
        }
        Ok(sql)
    }

    // =========================================================================
    // Existence probes
    // =========================================================================

    fn render_existence(
        &self,
        parts: &SelectParts<'_>,
        kind: &TerminalKind,
    ) -> Result<String, EmitError> {
        let (negate, extra_where) = match kind {
            TerminalKind::Any => (false, None),
            // all(p) holds when no row violates p.
            TerminalKind::All(predicate) => {
                let rendered = self.bool_sql(predicate, None)?;
                (true, Some(format!("NOT ({})", rendered)))
            }
            TerminalKind::Contains(value) => {
                let projected = match parts.projection {
                    Some(Projection::Expr(expr)) if !matches!(expr, ValueExpr::Object(_)) => {
                        self.value_sql(expr, None)?
                    }
                    _ => {
                        return Err(EmitError::chain(
                            "contains() requires a single-column projection",
                        ))
                    }
                };
                (
                    false,
                    Some(format!("{} = {}", projected, self.value_sql(value, None)?)),
                )
            }
            _ => unreachable!("non-existence terminal"),
        };

        let inner = self.render_select(parts, extra_where)?;
        Ok(format!(
            "SELECT CASE WHEN {}EXISTS ({}) THEN 1 ELSE 0 END",
            if negate { "NOT " } else { "" },
            inner
        ))
    }

    // =========================================================================
    // DML rendering
    // =========================================================================

    fn table_sql(&self, table: &str, schema: &Option<String>) -> String {
        match schema {
            Some(schema) => format!(
                "{}.{}",
                self.dialect.quote_identifier(schema),
                self.dialect.quote_identifier(table)
            ),
            None => self.dialect.quote_identifier(table),
        }
    }

    fn emit_insert(&self, insert: &InsertOp) -> Result<String, EmitError> {
        let columns: Vec<String> = insert
            .values
            .iter()
            .map(|(column, _)| self.dialect.quote_identifier(column))
            .collect();
        let mut values = Vec::with_capacity(insert.values.len());
        for (_, expr) in &insert.values {
            values.push(self.value_sql(expr, None)?);
        }

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table_sql(&insert.table, &insert.schema),
            columns.join(","),
            values.join(",")
        );
        if let Some(returning) = &insert.returning {
            sql.push_str(" RETURNING ");
            sql.push_str(&self.render_projection(returning, None)?);
        }
        Ok(sql)
    }

    fn emit_update(&self, update: &UpdateOp) -> Result<String, EmitError> {
        if update.predicate.is_none() && !update.allow_full_table {
            return Err(EmitError::chain("full-table UPDATE was not allowed"));
        }

        let mut assignments = Vec::with_capacity(update.assignments.len());
        for (column, expr) in &update.assignments {
            assignments.push(format!(
                "{} = {}",
                self.dialect.quote_identifier(column),
                self.value_sql(expr, None)?
            ));
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            self.table_sql(&update.table, &update.schema),
            assignments.join(", ")
        );
        if let Some(predicate) = &update.predicate {
            sql.push_str(" WHERE ");
            sql.push_str(&self.bool_sql(predicate, None)?);
        }
        if let Some(returning) = &update.returning {
            sql.push_str(" RETURNING ");
            sql.push_str(&self.render_projection(returning, None)?);
        }
        Ok(sql)
    }

    fn emit_delete(&self, delete: &DeleteOp) -> Result<String, EmitError> {
        if delete.predicate.is_none() && !delete.allow_full_table {
            return Err(EmitError::chain("full-table DELETE was not allowed"));
        }

        let mut sql = format!("DELETE FROM {}", self.table_sql(&delete.table, &delete.schema));
        if let Some(predicate) = &delete.predicate {
            sql.push_str(" WHERE ");
            sql.push_str(&self.bool_sql(predicate, None)?);
        }
        Ok(sql)
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn column_sql(&self, name: &str, table: &Option<String>) -> String {
        match table {
            Some(table) => format!(
                "{}.{}",
                self.dialect.quote_identifier(table),
                self.dialect.quote_identifier(name)
            ),
            None => self.dialect.quote_identifier(name),
        }
    }

    fn param_sql(&self, name: &str, property: &Option<String>) -> String {
        match property {
            Some(property) => self.dialect.param_path_placeholder(name, property),
            None => self.dialect.param_placeholder(name),
        }
    }

    fn value_sql(
        &self,
        expr: &ValueExpr,
        lift: Option<&HashMap<String, String>>,
    ) -> Result<String, EmitError> {
        match expr {
            ValueExpr::Column { name, table } => {
                let base = self.column_sql(name, table);
                // Projections over the defaulted side of a left-outer join
                // yield NULL when no row matched.
                if let (Some(map), Some(table)) = (lift, table) {
                    if let Some(presence) = map.get(table) {
                        return Ok(format!(
                            "CASE WHEN {} IS NOT NULL THEN {} ELSE NULL END",
                            presence, base
                        ));
                    }
                }
                Ok(base)
            }
            ValueExpr::Constant(ConstValue::Null) => Ok("NULL".to_string()),
            ValueExpr::Constant(ConstValue::Int(n)) => Ok(n.to_string()),
            ValueExpr::Param { name, property } => Ok(self.param_sql(name, property)),
            ValueExpr::Arithmetic { op, left, right } => {
                let op = match op {
                    ArithOp::Add => "+",
                    ArithOp::Sub => "-",
                    ArithOp::Mul => "*",
                    ArithOp::Div => "/",
                    ArithOp::Mod => "%",
                };
                Ok(format!(
                    "({} {} {})",
                    self.value_sql(left, lift)?,
                    op,
                    self.value_sql(right, lift)?
                ))
            }
            ValueExpr::Concat { left, right } => Ok(format!(
                "({} || {})",
                self.value_sql(left, lift)?,
                self.value_sql(right, lift)?
            )),
            ValueExpr::StringMethod { object, method } => {
                let function = match method {
                    StringCase::Lower => "LOWER",
                    StringCase::Upper => "UPPER",
                };
                Ok(format!("{}({})", function, self.value_sql(object, lift)?))
            }
            ValueExpr::Coalesce(items) => {
                let mut rendered = Vec::with_capacity(items.len());
                for item in items {
                    rendered.push(self.value_sql(item, lift)?);
                }
                Ok(format!("COALESCE({})", rendered.join(", ")))
            }
            ValueExpr::Case {
                branches,
                otherwise,
            } => {
                let mut sql = String::from("CASE");
                for branch in branches {
                    sql.push_str(" WHEN ");
                    sql.push_str(&self.bool_sql(&branch.when, lift)?);
                    sql.push_str(" THEN ");
                    sql.push_str(&self.value_sql(&branch.then, lift)?);
                }
                if let Some(otherwise) = otherwise {
                    sql.push_str(" ELSE ");
                    sql.push_str(&self.value_sql(otherwise, lift)?);
                }
                sql.push_str(" END");
                Ok(sql)
            }
            ValueExpr::Aggregate {
                function,
                expression,
            } => {
                let name = match function {
                    AggregateFn::Count => return Ok("COUNT(*)".to_string()),
                    AggregateFn::Sum => "SUM",
                    AggregateFn::Avg => "AVG",
                    AggregateFn::Min => "MIN",
                    AggregateFn::Max => "MAX",
                };
                let inner = match expression {
                    Some(expr) => self.value_sql(expr, lift)?,
                    None => "*".to_string(),
                };
                Ok(format!("{}({})", name, inner))
            }
            ValueExpr::Window(spec) => {
                let function = match spec.function {
                    WindowFn::RowNumber => "ROW_NUMBER",
                    WindowFn::Rank => "RANK",
                    WindowFn::DenseRank => "DENSE_RANK",
                };
                let mut over = Vec::new();
                if !spec.partition_by.is_empty() {
                    let mut cols = Vec::with_capacity(spec.partition_by.len());
                    for expr in &spec.partition_by {
                        cols.push(self.value_sql(expr, None)?);
                    }
                    over.push(format!("PARTITION BY {}", cols.join(", ")));
                }
                if !spec.order_by.is_empty() {
                    let mut keys = Vec::with_capacity(spec.order_by.len());
                    for order in &spec.order_by {
                        let mut key = self.value_sql(&order.expr, None)?;
                        if order.descending {
                            key.push_str(" DESC");
                        }
                        keys.push(key);
                    }
                    over.push(format!("ORDER BY {}", keys.join(", ")));
                }
                Ok(format!("{}() OVER ({})", function, over.join(" ")))
            }
            ValueExpr::Object(_) => Err(EmitError::chain(
                "object projection outside a SELECT clause",
            )),
            ValueExpr::Boolean(inner) => self.bool_sql(inner, lift),
            ValueExpr::AllColumns => Ok("*".to_string()),
        }
    }

    fn bool_sql(
        &self,
        expr: &BoolExpr,
        lift: Option<&HashMap<String, String>>,
    ) -> Result<String, EmitError> {
        match expr {
            BoolExpr::Comparison { op, left, right } => {
                let rendered = format!(
                    "{} {} {}",
                    self.value_sql(left, lift)?,
                    compare_op_sql(*op),
                    self.value_sql(right, lift)?
                );
                if left.is_compound() || right.is_compound() {
                    Ok(format!("({})", rendered))
                } else {
                    Ok(rendered)
                }
            }
            BoolExpr::Logical { op, left, right } => Ok(format!(
                "({} {} {})",
                self.bool_sql(left, lift)?,
                match op {
                    BoolOp::And => "AND",
                    BoolOp::Or => "OR",
                },
                self.bool_sql(right, lift)?
            )),
            BoolExpr::Not(inner) => match inner.as_ref() {
                BoolExpr::In { value, list } => self.membership_sql(value, list, true, lift),
                BoolExpr::Column { name, table } => {
                    Ok(format!("NOT {}", self.column_sql(name, table)))
                }
                BoolExpr::Param { name, property } => {
                    Ok(format!("NOT {}", self.param_sql(name, property)))
                }
                other => Ok(format!("NOT ({})", self.bool_sql(other, lift)?)),
            },
            BoolExpr::In { value, list } => self.membership_sql(value, list, false, lift),
            BoolExpr::IsNull { expr, negated } => Ok(format!(
                "{} IS {}NULL",
                self.value_sql(expr, lift)?,
                if *negated { "NOT " } else { "" }
            )),
            BoolExpr::Column { name, table } => Ok(self.column_sql(name, table)),
            BoolExpr::Constant(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
            BoolExpr::Param { name, property } => Ok(self.param_sql(name, property)),
            BoolExpr::Method {
                object,
                method,
                pattern,
            } => {
                let object = self.value_sql(object, lift)?;
                let pattern = self.value_sql(pattern, lift)?;
                // The '%' anchors are literal SQL; wildcard characters inside
                // the parameter value pass through to the database.
                Ok(match method {
                    StringPredicate::StartsWith => {
                        format!("{} LIKE {} || '%'", object, pattern)
                    }
                    StringPredicate::EndsWith => {
                        format!("{} LIKE '%' || {}", object, pattern)
                    }
                    StringPredicate::Includes => {
                        format!("{} LIKE '%' || {} || '%'", object, pattern)
                    }
                })
            }
            BoolExpr::CaseInsensitive { function, args } => {
                let mut rendered = Vec::with_capacity(args.len());
                for arg in args {
                    rendered.push(format!("LOWER({})", self.value_sql(arg, lift)?));
                }
                let [a, b] = rendered.as_slice() else {
                    return Err(EmitError::chain(
                        "case-insensitive helpers take two arguments",
                    ));
                };
                Ok(match function {
                    CiFunction::Equals => format!("{} = {}", a, b),
                    CiFunction::StartsWith => format!("{} LIKE {} || '%'", a, b),
                    CiFunction::EndsWith => format!("{} LIKE '%' || {}", a, b),
                    CiFunction::Contains => format!("{} LIKE '%' || {} || '%'", a, b),
                })
            }
        }
    }

    fn membership_sql(
        &self,
        value: &ValueExpr,
        list: &ValueExpr,
        negated: bool,
        lift: Option<&HashMap<String, String>>,
    ) -> Result<String, EmitError> {
        let value_sql = self.value_sql(value, lift)?;
        let ValueExpr::Param { name, property } = list else {
            return Err(EmitError::chain("membership list must be a parameter"));
        };

        if self.dialect.uses_native_arrays() {
            let placeholder = self.param_sql(name, property);
            return Ok(if negated {
                format!("{} <> ALL({})", value_sql, placeholder)
            } else {
                format!("{} = ANY({})", value_sql, placeholder)
            });
        }

        // Expanded membership needs the array value to know its length.
        if property.is_some() {
            return Err(EmitError::MissingArrayParameter { name: name.clone() });
        }
        let Some(ParamValue::Array(items)) = self.params.get(name) else {
            return Err(EmitError::MissingArrayParameter { name: name.clone() });
        };
        let placeholders: Vec<String> = (0..items.len())
            .map(|i| self.dialect.param_placeholder(&format!("{}_{}", name, i)))
            .collect();
        Ok(format!(
            "{} {}IN ({})",
            value_sql,
            if negated { "NOT " } else { "" },
            placeholders.join(", ")
        ))
    }
}

fn compare_op_sql(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::Ne => "<>",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    }
}
