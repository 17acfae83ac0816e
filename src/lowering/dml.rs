//! Operation visitors for DML chains.
//!
//! `insertInto` / `update` / `deleteFrom` chains are flat method lists over a
//! single table. Update and delete refuse to build without a WHERE clause
//! unless the caller opted into a full-table statement; the error fires
//! here, before any SQL exists.

use crate::ast::{ArrowFunction, Expr, ExprKind, LitValue, Span};
use crate::ir::{BoolExpr, DeleteOp, InsertOp, Projection, UpdateOp, ValueExpr};

use super::expr::{lower_bool, lower_field_value, lower_value};
use super::{LowerError, VisitorContext};

// =============================================================================
// Chain flattening
// =============================================================================

type ChainCall<'a> = (&'a str, &'a [Expr], Span);

/// Flatten `root("t").m1(a).m2(b)` into the root call plus the method list
/// in source order.
fn flatten(expr: &Expr) -> Result<(&str, &[Expr], Vec<ChainCall<'_>>), LowerError> {
    let expr = expr.unparenthesised();
    let ExprKind::Call { callee, args } = &expr.kind else {
        return Err(LowerError::unsupported(
            "expected a statement chain",
            expr.span.clone(),
        ));
    };
    match &callee.unparenthesised().kind {
        ExprKind::Ident(name) => Ok((name, args, Vec::new())),
        ExprKind::Member {
            object, property, ..
        } => {
            let (root, root_args, mut calls) = flatten(object)?;
            calls.push((property, args, expr.span.clone()));
            Ok((root, root_args, calls))
        }
        _ => Err(LowerError::unsupported(
            "unsupported callee in statement chain",
            expr.span.clone(),
        )),
    }
}

fn table_name(root: &str, args: &[Expr]) -> Result<String, LowerError> {
    let [table] = args else {
        return Err(LowerError::chain(format!(
            "{}() takes exactly one table name",
            root
        )));
    };
    match &table.unparenthesised().kind {
        ExprKind::Lit(LitValue::Str(name)) => Ok(name.clone()),
        _ => Err(LowerError::unsupported(
            format!("{}() requires a string table name", root),
            table.span.clone(),
        )),
    }
}

// =============================================================================
// INSERT
// =============================================================================

pub fn lower_insert(ctx: &mut VisitorContext, expr: &Expr) -> Result<InsertOp, LowerError> {
    let (root, root_args, calls) = flatten(expr)?;
    debug_assert_eq!(root, "insertInto");
    let table = table_name(root, root_args)?;
    ctx.current_table = Some(table.clone());

    let mut values: Option<Vec<(String, ValueExpr)>> = None;
    let mut returning = None;

    for (method, args, span) in calls {
        match method {
            "values" => {
                if values.is_some() {
                    return Err(LowerError::chain("values() already set on this insert"));
                }
                let [row] = args else {
                    return Err(LowerError::chain("values() takes one object literal"));
                };
                values = Some(lower_assignments(ctx, row)?);
            }
            "returning" => {
                returning = Some(lower_returning(ctx, args)?);
            }
            other => {
                return Err(LowerError::unsupported(
                    format!("'{}' is not an insert operation", other),
                    span,
                ))
            }
        }
    }

    let values = values.ok_or_else(|| LowerError::chain("insert requires values()"))?;
    if values.is_empty() {
        return Err(LowerError::chain("insert values() must set at least one column"));
    }

    Ok(InsertOp {
        table,
        schema: ctx.schema_namespace.clone(),
        values,
        returning,
    })
}

// =============================================================================
// UPDATE
// =============================================================================

pub fn lower_update(ctx: &mut VisitorContext, expr: &Expr) -> Result<UpdateOp, LowerError> {
    let (root, root_args, calls) = flatten(expr)?;
    debug_assert_eq!(root, "update");
    let table = table_name(root, root_args)?;
    ctx.current_table = Some(table.clone());

    let mut assignments: Option<Vec<(String, ValueExpr)>> = None;
    let mut predicate: Option<BoolExpr> = None;
    let mut allow_full_table = false;
    let mut returning = None;

    for (method, args, span) in calls {
        match method {
            "set" => {
                if assignments.is_some() {
                    return Err(LowerError::chain("set() already set on this update"));
                }
                let [arg] = args else {
                    return Err(LowerError::chain("set() takes one object or lambda"));
                };
                assignments = Some(lower_set_argument(ctx, arg)?);
            }
            "where" => {
                let pred = lower_where_arg(ctx, args)?;
                predicate = Some(match predicate {
                    Some(existing) => existing.and(pred),
                    None => pred,
                });
            }
            "allowFullTableUpdate" => allow_full_table = true,
            "returning" => returning = Some(lower_returning(ctx, args)?),
            other => {
                return Err(LowerError::unsupported(
                    format!("'{}' is not an update operation", other),
                    span,
                ))
            }
        }
    }

    let assignments = assignments.ok_or_else(|| LowerError::chain("update requires set()"))?;
    if assignments.is_empty() {
        return Err(LowerError::chain("update set() must assign at least one column"));
    }
    if predicate.is_none() && !allow_full_table {
        return Err(LowerError::UnsafeMutation {
            statement: "UPDATE",
            table,
            flag: "allowFullTableUpdate",
        });
    }

    Ok(UpdateOp {
        table,
        schema: ctx.schema_namespace.clone(),
        assignments,
        predicate,
        allow_full_table,
        returning,
    })
}

// =============================================================================
// DELETE
// =============================================================================

pub fn lower_delete(ctx: &mut VisitorContext, expr: &Expr) -> Result<DeleteOp, LowerError> {
    let (root, root_args, calls) = flatten(expr)?;
    debug_assert_eq!(root, "deleteFrom");
    let table = table_name(root, root_args)?;
    ctx.current_table = Some(table.clone());

    let mut predicate: Option<BoolExpr> = None;
    let mut allow_full_table = false;

    for (method, args, span) in calls {
        match method {
            "where" => {
                let pred = lower_where_arg(ctx, args)?;
                predicate = Some(match predicate {
                    Some(existing) => existing.and(pred),
                    None => pred,
                });
            }
            "allowFullTableDelete" => allow_full_table = true,
            other => {
                return Err(LowerError::unsupported(
                    format!("'{}' is not a delete operation", other),
                    span,
                ))
            }
        }
    }

    if predicate.is_none() && !allow_full_table {
        return Err(LowerError::UnsafeMutation {
            statement: "DELETE",
            table,
            flag: "allowFullTableDelete",
        });
    }

    Ok(DeleteOp {
        table,
        schema: ctx.schema_namespace.clone(),
        predicate,
        allow_full_table,
    })
}

// =============================================================================
// Shared pieces
// =============================================================================

/// `set()` accepts an object literal or a row lambda returning one.
fn lower_set_argument(
    ctx: &mut VisitorContext,
    arg: &Expr,
) -> Result<Vec<(String, ValueExpr)>, LowerError> {
    match &arg.unparenthesised().kind {
        ExprKind::Arrow(arrow) => {
            let binding = arrow.params.first().map(|name| ctx.bind_row_param(name));
            let result = lower_assignments(ctx, &arrow.body);
            if let Some(binding) = binding {
                ctx.unbind(binding);
            }
            result
        }
        _ => lower_assignments(ctx, arg),
    }
}

fn lower_assignments(
    ctx: &mut VisitorContext,
    row: &Expr,
) -> Result<Vec<(String, ValueExpr)>, LowerError> {
    let row = row.unparenthesised();
    let ExprKind::Object { properties } = &row.kind else {
        return Err(LowerError::unsupported(
            "column assignments must be an object literal",
            row.span.clone(),
        ));
    };
    let mut assignments = Vec::with_capacity(properties.len());
    for (column, value) in properties {
        assignments.push((column.clone(), lower_field_value(ctx, column, value)?));
    }
    Ok(assignments)
}

fn lower_where_arg(ctx: &mut VisitorContext, args: &[Expr]) -> Result<BoolExpr, LowerError> {
    let [predicate] = args else {
        return Err(LowerError::chain("where() takes exactly one predicate"));
    };
    let arrow = expect_arrow(predicate)?;
    let binding = arrow.params.first().map(|name| ctx.bind_row_param(name));
    let result = lower_bool(ctx, &arrow.body);
    if let Some(binding) = binding {
        ctx.unbind(binding);
    }
    result
}

fn lower_returning(ctx: &mut VisitorContext, args: &[Expr]) -> Result<Projection, LowerError> {
    let [selector] = args else {
        return Err(LowerError::chain("returning() takes exactly one selector"));
    };
    let arrow = expect_arrow(selector)?;
    let param = arrow
        .params
        .first()
        .ok_or_else(|| LowerError::chain("returning() selector needs a parameter"))?;

    if matches!(&arrow.body.unparenthesised().kind, ExprKind::Ident(name) if name == param) {
        return Ok(Projection::AllColumns);
    }

    let binding = ctx.bind_row_param(param);
    let projection = lower_value(ctx, &arrow.body);
    ctx.unbind(binding);
    Ok(Projection::Expr(projection?))
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
