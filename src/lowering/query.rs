//! Operation visitors for the SELECT chain.
//!
//! One visitor per DSL method. Each recognises its call in the chain,
//! descends into the source first, lowers its lambda arguments through the
//! expression visitor, and returns a new operation with the context's
//! accumulated auto-parameters.

use log::debug;

use crate::ast::{ArrowFunction, Expr, ExprKind, LitValue, Span};
use crate::ir::{
    BoolExpr, FromOp, JoinKind, JoinOp, OpTree, Projection, QueryOp, TerminalKind, ValueExpr,
};

use super::expr::{lower_bool, lower_selector, lower_value, member_path};
use super::{dml, LowerError, ResultShape, ShapeEntry, VisitorContext};

/// Lower the root builder lambda into an operation tree.
pub fn lower_root(ctx: &mut VisitorContext, arrow: &ArrowFunction) -> Result<OpTree, LowerError> {
    ctx.bind_root_params(&arrow.params);
    let body = arrow.body.unparenthesised();
    match root_function(body) {
        Some("from") => {
            let query = lower_query(ctx, body)?;
            debug!("lowered query chain rooted at from()");
            Ok(OpTree::Query(query))
        }
        Some("insertInto") => dml::lower_insert(ctx, body).map(OpTree::Insert),
        Some("update") => dml::lower_update(ctx, body).map(OpTree::Update),
        Some("deleteFrom") => dml::lower_delete(ctx, body).map(OpTree::Delete),
        Some(other) => Err(LowerError::unsupported(
            format!("unknown root function '{}'", other),
            body.span.clone(),
        )),
        None => Err(LowerError::unsupported(
            "builder body must be a query chain",
            body.span.clone(),
        )),
    }
}

/// The innermost callee identifier of a call chain.
pub fn root_function(expr: &Expr) -> Option<&str> {
    match &expr.unparenthesised().kind {
        ExprKind::Call { callee, .. } => match &callee.unparenthesised().kind {
            ExprKind::Ident(name) => Some(name),
            ExprKind::Member { object, .. } => root_function(object),
            _ => None,
        },
        _ => None,
    }
}

/// Lower a query chain expression into an operation chain.
pub fn lower_query(ctx: &mut VisitorContext, expr: &Expr) -> Result<QueryOp, LowerError> {
    let expr = expr.unparenthesised();
    let ExprKind::Call { callee, args } = &expr.kind else {
        return Err(LowerError::unsupported(
            "expected a query operation call",
            expr.span.clone(),
        ));
    };

    match &callee.unparenthesised().kind {
        ExprKind::Ident(name) if name == "from" => visit_from(ctx, args, expr.span.clone()),
        ExprKind::Ident(name) => Err(LowerError::unsupported(
            format!("unknown function '{}'", name),
            expr.span.clone(),
        )),
        ExprKind::Member {
            object, property, ..
        } => {
            let source = lower_query(ctx, object)?;
            visit_method(ctx, source, property, args, expr.span.clone())
        }
        _ => Err(LowerError::unsupported(
            "unsupported callee in query chain",
            expr.span.clone(),
        )),
    }
}

/// Append one operation to an already-lowered chain. Plan handles restore a
/// context snapshot and feed synthesised argument nodes through the same
/// visitors a parse would.
pub(crate) fn apply_method(
    ctx: &mut VisitorContext,
    source: QueryOp,
    method: &str,
    args: &[Expr],
) -> Result<QueryOp, LowerError> {
    visit_method(ctx, source, method, args, 0..0)
}

// =============================================================================
// Sources
// =============================================================================

fn visit_from(ctx: &mut VisitorContext, args: &[Expr], span: Span) -> Result<QueryOp, LowerError> {
    let [table] = args else {
        return Err(LowerError::chain("from() takes exactly one table name"));
    };
    let ExprKind::Lit(LitValue::Str(table)) = &table.unparenthesised().kind else {
        return Err(LowerError::unsupported(
            "from() requires a string table name",
            span,
        ));
    };
    ctx.current_table = Some(table.clone());
    ctx.current_alias = None;
    ctx.result_shape = None;
    Ok(QueryOp::From(FromOp::table(
        table,
        ctx.schema_namespace.clone(),
    )))
}

// =============================================================================
// Method dispatch
// =============================================================================

fn visit_method(
    ctx: &mut VisitorContext,
    source: QueryOp,
    method: &str,
    args: &[Expr],
    span: Span,
) -> Result<QueryOp, LowerError> {
    match method {
        "where" => {
            let predicate = lower_predicate_arg(ctx, args, "where")?;
            Ok(QueryOp::Where {
                source: Box::new(source),
                predicate,
            })
        }

        "select" => visit_select(ctx, source, args),

        "orderBy" | "orderByDescending" => {
            let key = lower_selector_arg(ctx, args, method)?;
            Ok(QueryOp::OrderBy {
                source: Box::new(source),
                key,
                descending: method == "orderByDescending",
            })
        }

        "thenBy" | "thenByDescending" => {
            if !matches!(source, QueryOp::OrderBy { .. } | QueryOp::ThenBy { .. }) {
                return Err(LowerError::chain("thenBy requires a preceding orderBy"));
            }
            let key = lower_selector_arg(ctx, args, method)?;
            Ok(QueryOp::ThenBy {
                source: Box::new(source),
                key,
                descending: method == "thenByDescending",
            })
        }

        "take" | "skip" => {
            let [count] = args else {
                return Err(LowerError::chain(format!("{}() takes one count", method)));
            };
            let count = lower_value(ctx, count)?;
            Ok(if method == "take" {
                QueryOp::Take {
                    source: Box::new(source),
                    count,
                }
            } else {
                QueryOp::Skip {
                    source: Box::new(source),
                    count,
                }
            })
        }

        "distinct" => Ok(QueryOp::Distinct {
            source: Box::new(source),
        }),

        "reverse" => Ok(QueryOp::Reverse {
            source: Box::new(source),
        }),

        "groupBy" => {
            let key = lower_selector_arg(ctx, args, "groupBy")?;
            ctx.group_by_key = Some(key.clone());
            Ok(QueryOp::GroupBy {
                source: Box::new(source),
                key,
            })
        }

        "join" => visit_join(ctx, source, args, span),
        "groupJoin" => visit_group_join(ctx, source, args, span),
        "selectMany" => visit_select_many(ctx, source, args, span),

        "defaultIfEmpty" => Err(LowerError::chain(
            "defaultIfEmpty is only valid inside selectMany after groupJoin",
        )),

        "union" | "concat" => {
            let [other] = args else {
                return Err(LowerError::chain(format!(
                    "{}() takes exactly one query",
                    method
                )));
            };
            let saved = chain_state(ctx);
            let second = lower_query(ctx, other)?;
            restore_chain_state(ctx, saved);
            Ok(QueryOp::Union {
                first: Box::new(source),
                second: Box::new(second),
                all: method == "concat",
            })
        }

        // ---------------------------------------------------------------------
        // Terminals
        // ---------------------------------------------------------------------
        "count" => visit_terminal(ctx, source, args, TerminalKind::Count),

        "sum" | "average" | "min" | "max" => {
            let selector = match args {
                [] => derived_selector(&source, method)?,
                [selector] => {
                    let arrow = expect_arrow(selector)?;
                    lower_selector(ctx, arrow)?
                }
                _ => {
                    return Err(LowerError::chain(format!(
                        "{}() takes at most one selector",
                        method
                    )))
                }
            };
            let kind = match method {
                "sum" => TerminalKind::Sum(selector),
                "average" => TerminalKind::Average(selector),
                "min" => TerminalKind::Min(selector),
                "max" => TerminalKind::Max(selector),
                _ => unreachable!(),
            };
            Ok(QueryOp::Terminal {
                source: Box::new(source),
                kind,
            })
        }

        "first" => visit_terminal(ctx, source, args, TerminalKind::First),
        "firstOrDefault" => visit_terminal(ctx, source, args, TerminalKind::FirstOrDefault),
        "single" => visit_terminal(ctx, source, args, TerminalKind::Single),
        "singleOrDefault" => visit_terminal(ctx, source, args, TerminalKind::SingleOrDefault),
        "last" => visit_terminal(ctx, source, args, TerminalKind::Last),
        "lastOrDefault" => visit_terminal(ctx, source, args, TerminalKind::LastOrDefault),
        "any" => visit_terminal(ctx, source, args, TerminalKind::Any),

        "all" => {
            let predicate = lower_predicate_arg(ctx, args, "all")?;
            Ok(QueryOp::Terminal {
                source: Box::new(source),
                kind: TerminalKind::All(predicate),
            })
        }

        "contains" => {
            let [value] = args else {
                return Err(LowerError::chain("contains() takes exactly one value"));
            };
            match source.last_projection() {
                Some(Projection::Expr(expr)) if !matches!(expr, ValueExpr::Object(_)) => {}
                _ => {
                    return Err(LowerError::chain(
                        "contains() requires a preceding single-column select",
                    ))
                }
            }
            let value = lower_value(ctx, value)?;
            Ok(QueryOp::Terminal {
                source: Box::new(source),
                kind: TerminalKind::Contains(value),
            })
        }

        other => Err(LowerError::unsupported(
            format!("unknown operation '{}'", other),
            span,
        )),
    }
}

/// Terminals with an optional predicate lower it as an implicit `where`.
fn visit_terminal(
    ctx: &mut VisitorContext,
    source: QueryOp,
    args: &[Expr],
    kind: TerminalKind,
) -> Result<QueryOp, LowerError> {
    let source = match args {
        [] => source,
        [predicate] => {
            let arrow = expect_arrow(predicate)?;
            let predicate = lower_predicate(ctx, arrow)?;
            QueryOp::Where {
                source: Box::new(source),
                predicate,
            }
        }
        _ => return Err(LowerError::chain("terminal takes at most one predicate")),
    };
    Ok(QueryOp::Terminal {
        source: Box::new(source),
        kind,
    })
}

/// A missing aggregate selector falls back to the projected column.
fn derived_selector(source: &QueryOp, method: &str) -> Result<ValueExpr, LowerError> {
    match source.last_projection() {
        Some(Projection::Expr(expr)) if !matches!(expr, ValueExpr::Object(_)) => Ok(expr.clone()),
        _ => Err(LowerError::chain(format!(
            "{}() needs a selector or a preceding single-column select",
            method
        ))),
    }
}

// =============================================================================
// select
// =============================================================================

fn visit_select(
    ctx: &mut VisitorContext,
    source: QueryOp,
    args: &[Expr],
) -> Result<QueryOp, LowerError> {
    let [selector] = args else {
        return Err(LowerError::chain("select() takes exactly one selector"));
    };
    let arrow = expect_arrow(selector)?;
    let param = arrow
        .params
        .first()
        .ok_or_else(|| LowerError::chain("select() selector needs a parameter"))?;

    // `select(u => u)` keeps the whole row.
    if matches!(&arrow.body.unparenthesised().kind, ExprKind::Ident(name) if name == param) {
        return Ok(QueryOp::Select {
            source: Box::new(source),
            projection: Projection::AllColumns,
        });
    }

    let grouped = matches!(source, QueryOp::GroupBy { .. }) && ctx.group_by_key.is_some();
    let binding = if grouped {
        ctx.bind_grouping_param(param)
    } else {
        ctx.bind_row_param(param)
    };
    let projection = lower_value(ctx, &arrow.body);
    ctx.unbind(binding);

    Ok(QueryOp::Select {
        source: Box::new(source),
        projection: Projection::Expr(projection?),
    })
}

// =============================================================================
// join / groupJoin / selectMany
// =============================================================================

/// The outer side of a join as seen by key and result selectors.
enum OuterSide {
    Shape(ResultShape),
    Row {
        table: Option<String>,
        alias: Option<String>,
    },
}

fn visit_join(
    ctx: &mut VisitorContext,
    source: QueryOp,
    args: &[Expr],
    _span: Span,
) -> Result<QueryOp, LowerError> {
    let [inner_expr, outer_key_fn, inner_key_fn, result_fn] = args else {
        return Err(LowerError::chain(
            "join() takes inner, outerKey, innerKey, and result selectors",
        ));
    };

    let (source, outer, inner, inner_table, inner_alias) =
        prepare_join_sides(ctx, source, inner_expr)?;

    let outer_key = lower_key_selector(ctx, outer_key_fn, &outer)?;
    let inner_key =
        lower_inner_key_selector(ctx, inner_key_fn, inner_table.clone(), &inner_alias)?;

    let join = QueryOp::Join(JoinOp {
        outer: Box::new(source),
        inner: Box::new(inner),
        outer_key,
        inner_key,
        kind: JoinKind::Inner,
    });

    let arrow = expect_arrow(result_fn)?;
    apply_result_selector(ctx, join, arrow, outer, inner_table, inner_alias)
}

fn visit_group_join(
    ctx: &mut VisitorContext,
    source: QueryOp,
    args: &[Expr],
    _span: Span,
) -> Result<QueryOp, LowerError> {
    let [inner_expr, outer_key_fn, inner_key_fn, result_fn] = args else {
        return Err(LowerError::chain(
            "groupJoin() takes inner, outerKey, innerKey, and result selectors",
        ));
    };

    let (source, outer, inner, inner_table, inner_alias) =
        prepare_join_sides(ctx, source, inner_expr)?;

    let outer_key = lower_key_selector(ctx, outer_key_fn, &outer)?;
    let inner_key =
        lower_inner_key_selector(ctx, inner_key_fn, inner_table.clone(), &inner_alias)?;

    // The result selector of a groupJoin must be shape-style: the grouped
    // side has no per-row columns until selectMany flattens it.
    let arrow = expect_arrow(result_fn)?;
    let outer_name = arrow
        .params
        .first()
        .ok_or_else(|| LowerError::chain("groupJoin result selector needs two parameters"))?;
    let group_name = arrow
        .params
        .get(1)
        .ok_or_else(|| LowerError::chain("groupJoin result selector needs two parameters"))?;

    let Some(entries) = shape_style_entries(&arrow.body, outer_name, group_name) else {
        return Err(LowerError::chain(
            "groupJoin result selector must pair the outer row with the group",
        ));
    };

    let mut shape = ResultShape::default();
    for (key, is_outer) in entries {
        let entry = if is_outer {
            outer_entry(&outer)
        } else {
            ShapeEntry::Group {
                table: inner_table.clone().unwrap_or_default(),
                alias: inner_alias.clone(),
            }
        };
        shape.entries.insert(key, entry);
    }
    ctx.result_shape = Some(shape);
    ctx.current_alias = None;

    Ok(QueryOp::GroupJoin(JoinOp {
        outer: Box::new(source),
        inner: Box::new(inner),
        outer_key,
        inner_key,
        kind: JoinKind::Inner,
    }))
}

fn visit_select_many(
    ctx: &mut VisitorContext,
    source: QueryOp,
    args: &[Expr],
    span: Span,
) -> Result<QueryOp, LowerError> {
    let collection_fn = args
        .first()
        .ok_or_else(|| LowerError::chain("selectMany() needs a collection selector"))?;
    let collection = expect_arrow(collection_fn)?;
    let body = collection.body.unparenthesised();

    // Pattern: `x => x.g.defaultIfEmpty()` flattens a groupJoin into a
    // left-outer join.
    if let ExprKind::Call {
        callee,
        args: call_args,
    } = &body.kind
    {
        if let ExprKind::Member {
            object, property, ..
        } = &callee.unparenthesised().kind
        {
            if property == "defaultIfEmpty" && call_args.is_empty() {
                return flatten_group_join(ctx, source, collection, object, args, span);
            }
        }
    }

    // Pattern: `x => from("other")` is a cross join.
    if root_function(body) == Some("from") {
        let (source, outer, inner, inner_table, inner_alias) =
            prepare_join_sides(ctx, source, body)?;
        let cross = QueryOp::SelectMany {
            source: Box::new(source),
            inner: Box::new(inner),
        };
        return match args.get(1) {
            Some(result_fn) => {
                let arrow = expect_arrow(result_fn)?;
                apply_result_selector(ctx, cross, arrow, outer, inner_table, inner_alias)
            }
            None => {
                // Rows are the inner collection's rows.
                ctx.result_shape = None;
                ctx.current_table = inner_table;
                ctx.current_alias = Some(inner_alias);
                Ok(cross)
            }
        };
    }

    Err(LowerError::unsupported(
        "selectMany supports defaultIfEmpty flattening and from() cross joins",
        span,
    ))
}

fn flatten_group_join(
    ctx: &mut VisitorContext,
    source: QueryOp,
    collection: &ArrowFunction,
    group_ref: &Expr,
    args: &[Expr],
    _span: Span,
) -> Result<QueryOp, LowerError> {
    let QueryOp::GroupJoin(join) = source else {
        return Err(LowerError::chain(
            "defaultIfEmpty requires a preceding groupJoin",
        ));
    };

    let coll_param = collection
        .params
        .first()
        .ok_or_else(|| LowerError::chain("selectMany collection selector needs a parameter"))?;
    let path = member_path(group_ref).ok_or_else(|| {
        LowerError::chain("selectMany collection selector must reference the group")
    })?;
    if path.len() != 2 || path[0] != coll_param {
        return Err(LowerError::chain(
            "selectMany collection selector must reference the group",
        ));
    }

    let shape = ctx
        .result_shape
        .clone()
        .ok_or_else(|| LowerError::chain("groupJoin shape missing"))?;
    let Some(ShapeEntry::Group { table, alias }) = shape.entry(path[1]).cloned() else {
        return Err(LowerError::chain(format!(
            "'{}' is not the grouped side of the join",
            path[1]
        )));
    };

    let flattened = QueryOp::Join(JoinOp {
        kind: JoinKind::LeftOuter,
        ..join
    });

    let result_fn = args
        .get(1)
        .ok_or_else(|| LowerError::chain("selectMany over a group needs a result selector"))?;
    let arrow = expect_arrow(result_fn)?;
    apply_result_selector(
        ctx,
        flattened,
        arrow,
        OuterSide::Shape(shape),
        Some(table),
        alias,
    )
}

// =============================================================================
// Join plumbing
// =============================================================================

/// Alias the outer chain (when it is a plain table chain), lower the inner
/// chain, and alias its root. Returns the updated sides and the inner
/// table/alias pair.
fn prepare_join_sides(
    ctx: &mut VisitorContext,
    mut source: QueryOp,
    inner_expr: &Expr,
) -> Result<(QueryOp, OuterSide, QueryOp, Option<String>, String), LowerError> {
    let outer = if let Some(shape) = ctx.result_shape.clone() {
        OuterSide::Shape(shape)
    } else {
        let alias = match source.root_from().and_then(|f| f.alias.clone()) {
            Some(alias) => alias,
            None => {
                let alias = ctx.next_alias();
                set_root_alias(&mut source, &alias);
                alias
            }
        };
        OuterSide::Row {
            table: ctx.current_table.clone(),
            alias: Some(alias),
        }
    };

    let saved = chain_state(ctx);
    let mut inner = lower_query(ctx, inner_expr)?;
    let inner_table = ctx.current_table.clone();
    restore_chain_state(ctx, saved);

    let inner_alias = ctx.next_alias();
    set_root_alias(&mut inner, &inner_alias);

    Ok((source, outer, inner, inner_table, inner_alias))
}

fn lower_key_selector(
    ctx: &mut VisitorContext,
    selector: &Expr,
    outer: &OuterSide,
) -> Result<ValueExpr, LowerError> {
    let arrow = expect_arrow(selector)?;
    let param = arrow
        .params
        .first()
        .ok_or_else(|| LowerError::chain("join key selector needs a parameter"))?;
    let binding = match outer {
        OuterSide::Shape(shape) => ctx.bind_shape_param(param, shape.clone()),
        OuterSide::Row { table, alias } => {
            ctx.bind_table_param(param, table.clone(), alias.clone())
        }
    };
    let key = lower_value(ctx, &arrow.body);
    ctx.unbind(binding);
    key
}

fn lower_inner_key_selector(
    ctx: &mut VisitorContext,
    selector: &Expr,
    inner_table: Option<String>,
    inner_alias: &str,
) -> Result<ValueExpr, LowerError> {
    let arrow = expect_arrow(selector)?;
    let param = arrow
        .params
        .first()
        .ok_or_else(|| LowerError::chain("join key selector needs a parameter"))?;
    let binding = ctx.bind_table_param(param, inner_table, Some(inner_alias.to_string()));
    let key = lower_value(ctx, &arrow.body);
    ctx.unbind(binding);
    key
}

fn outer_entry(outer: &OuterSide) -> ShapeEntry {
    match outer {
        OuterSide::Shape(shape) => ShapeEntry::Nested(shape.clone()),
        OuterSide::Row { table, alias } => ShapeEntry::Row {
            table: table.clone().unwrap_or_default(),
            alias: alias.clone().unwrap_or_default(),
        },
    }
}

/// Apply a join/selectMany result selector: a shape-style object records the
/// result shape for later operations; anything else is an explicit
/// projection and becomes a `Select` on top of the join.
fn apply_result_selector(
    ctx: &mut VisitorContext,
    base: QueryOp,
    arrow: &ArrowFunction,
    outer: OuterSide,
    inner_table: Option<String>,
    inner_alias: String,
) -> Result<QueryOp, LowerError> {
    let outer_name = arrow
        .params
        .first()
        .ok_or_else(|| LowerError::chain("join result selector needs two parameters"))?;
    let inner_name = arrow
        .params
        .get(1)
        .ok_or_else(|| LowerError::chain("join result selector needs two parameters"))?;

    if let Some(entries) = shape_style_entries(&arrow.body, outer_name, inner_name) {
        let mut shape = ResultShape::default();
        for (key, is_outer) in entries {
            let entry = if is_outer {
                outer_entry(&outer)
            } else {
                ShapeEntry::Row {
                    table: inner_table.clone().unwrap_or_default(),
                    alias: inner_alias.clone(),
                }
            };
            shape.entries.insert(key, entry);
        }
        ctx.result_shape = Some(shape);
        ctx.current_alias = None;
        return Ok(base);
    }

    // Explicit projection.
    let outer_binding = match &outer {
        OuterSide::Shape(shape) => ctx.bind_shape_param(outer_name, shape.clone()),
        OuterSide::Row { table, alias } => {
            ctx.bind_table_param(outer_name, table.clone(), alias.clone())
        }
    };
    let inner_binding =
        ctx.bind_table_param(inner_name, inner_table, Some(inner_alias));
    let projection = lower_value(ctx, &arrow.body);
    ctx.unbind(inner_binding);
    ctx.unbind(outer_binding);

    ctx.result_shape = None;
    Ok(QueryOp::Select {
        source: Box::new(base),
        projection: Projection::Expr(projection?),
    })
}

/// A result selector body of the form `({ a, b })` / `({ x: a, y: b })`
/// where every property is a bare reference to one of the two parameters.
/// Returns property name and whether it references the outer parameter.
fn shape_style_entries(
    body: &Expr,
    outer_name: &str,
    inner_name: &str,
) -> Option<Vec<(String, bool)>> {
    let ExprKind::Object { properties } = &body.unparenthesised().kind else {
        return None;
    };
    let mut entries = Vec::with_capacity(properties.len());
    for (key, value) in properties {
        match &value.unparenthesised().kind {
            ExprKind::Ident(name) if name == outer_name => entries.push((key.clone(), true)),
            ExprKind::Ident(name) if name == inner_name => entries.push((key.clone(), false)),
            _ => return None,
        }
    }
    Some(entries)
}

// =============================================================================
// Shared helpers
// =============================================================================

struct ChainState {
    table: Option<String>,
    alias: Option<String>,
    shape: Option<ResultShape>,
}

fn chain_state(ctx: &mut VisitorContext) -> ChainState {
    let state = ChainState {
        table: ctx.current_table.clone(),
        alias: ctx.current_alias.clone(),
        shape: ctx.result_shape.clone(),
    };
    ctx.current_alias = None;
    ctx.result_shape = None;
    state
}

fn restore_chain_state(ctx: &mut VisitorContext, state: ChainState) {
    ctx.current_table = state.table;
    ctx.current_alias = state.alias;
    ctx.result_shape = state.shape;
}

fn lower_predicate_arg(
    ctx: &mut VisitorContext,
    args: &[Expr],
    method: &str,
) -> Result<BoolExpr, LowerError> {
    let [predicate] = args else {
        return Err(LowerError::chain(format!(
            "{}() takes exactly one predicate",
            method
        )));
    };
    let arrow = expect_arrow(predicate)?;
    lower_predicate(ctx, arrow)
}

fn lower_predicate(
    ctx: &mut VisitorContext,
    arrow: &ArrowFunction,
) -> Result<BoolExpr, LowerError> {
    let binding = arrow.params.first().map(|name| ctx.bind_row_param(name));
    let predicate = lower_bool(ctx, &arrow.body);
    if let Some(binding) = binding {
        ctx.unbind(binding);
    }
    predicate
}

fn lower_selector_arg(
    ctx: &mut VisitorContext,
    args: &[Expr],
    method: &str,
) -> Result<ValueExpr, LowerError> {
    let [selector] = args else {
        return Err(LowerError::chain(format!(
            "{}() takes exactly one selector",
            method
        )));
    };
    let arrow = expect_arrow(selector)?;
    lower_selector(ctx, arrow)
}

fn expect_arrow(expr: &Expr) -> Result<&ArrowFunction, LowerError> {
    match &expr.unparenthesised().kind {
        ExprKind::Arrow(arrow) => Ok(arrow),
        _ => Err(LowerError::unsupported(
            "expected a lambda argument",
            expr.span.clone(),
        )),
    }
}

/// Set the alias of the chain's root `From` when it has none.
fn set_root_alias(op: &mut QueryOp, alias: &str) {
    match op {
        QueryOp::From(from) => {
            if from.alias.is_none() {
                from.alias = Some(alias.to_string());
            }
        }
        QueryOp::Where { source, .. }
        | QueryOp::Select { source, .. }
        | QueryOp::OrderBy { source, .. }
        | QueryOp::ThenBy { source, .. }
        | QueryOp::Take { source, .. }
        | QueryOp::Skip { source, .. }
        | QueryOp::Distinct { source }
        | QueryOp::Reverse { source }
        | QueryOp::GroupBy { source, .. }
        | QueryOp::SelectMany { source, .. }
        | QueryOp::Terminal { source, .. } => set_root_alias(source, alias),
        QueryOp::Join(join) | QueryOp::GroupJoin(join) => set_root_alias(&mut join.outer, alias),
        QueryOp::Union { first, .. } => set_root_alias(first, alias),
    }
}
