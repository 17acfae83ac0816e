//! Expression visitor.
//!
//! Lowers lambda bodies into the expression algebra. Two entry points:
//! [`lower_bool`] for predicate positions and [`lower_value`] for scalar
//! positions. Every literal is auto-parameterised except `null`, which stays
//! a constant and turns comparisons into `IS [NOT] NULL`. When a literal is
//! compared against a column, the auto-parameter records the column as field
//! context so dialects can coerce the value.

use crate::ast::{ArrowFunction, BinaryOp, Expr, ExprKind, LitValue, LogicalOp, Span, UnaryOp};
use crate::ir::{
    ArithOp, BoolExpr, BoolOp, CaseBranch, CiFunction, CompareOp, ConstValue, StringCase,
    StringPredicate, ValueExpr, WindowFn, WindowOrder, WindowSpec,
};
use crate::params::{AutoParamInfo, ParamValue};

use super::{LowerError, ShapeEntry, VisitorContext};

// =============================================================================
// Entry points
// =============================================================================

/// Lower an expression expected to be boolean.
pub fn lower_bool(ctx: &mut VisitorContext, expr: &Expr) -> Result<BoolExpr, LowerError> {
    let expr = expr.unparenthesised();
    match &expr.kind {
        ExprKind::Lit(LitValue::Bool(b)) => Ok(BoolExpr::Constant(*b)),
        ExprKind::Lit(_) => Err(LowerError::unsupported(
            "non-boolean literal in predicate position",
            expr.span.clone(),
        )),

        ExprKind::Ident(name) => Err(ident_error(ctx, name, expr.span.clone())),

        ExprKind::Member { .. } => match resolve_member(ctx, expr)? {
            ValueExpr::Column { name, table } => Ok(BoolExpr::Column { name, table }),
            ValueExpr::Param { name, property } => Ok(BoolExpr::Param { name, property }),
            _ => Err(LowerError::unsupported(
                "member access is not boolean",
                expr.span.clone(),
            )),
        },

        ExprKind::Unary {
            op: UnaryOp::Not,
            operand,
        } => Ok(BoolExpr::Not(Box::new(lower_bool(ctx, operand)?))),
        ExprKind::Unary { .. } => Err(LowerError::unsupported(
            "arithmetic unary operator in predicate position",
            expr.span.clone(),
        )),

        ExprKind::Binary { op, left, right } => match compare_op(*op) {
            Some(cmp) => lower_comparison(ctx, cmp, left, right, expr.span.clone()),
            None => Err(LowerError::unsupported(
                "arithmetic result in predicate position",
                expr.span.clone(),
            )),
        },

        ExprKind::Logical { op, left, right } => match op {
            LogicalOp::And => Ok(BoolExpr::Logical {
                op: BoolOp::And,
                left: Box::new(lower_bool(ctx, left)?),
                right: Box::new(lower_bool(ctx, right)?),
            }),
            LogicalOp::Or => Ok(BoolExpr::Logical {
                op: BoolOp::Or,
                left: Box::new(lower_bool(ctx, left)?),
                right: Box::new(lower_bool(ctx, right)?),
            }),
            LogicalOp::Nullish => Err(LowerError::unsupported(
                "'??' in predicate position",
                expr.span.clone(),
            )),
        },

        ExprKind::Call { callee, args } => lower_bool_call(ctx, expr, callee, args),

        ExprKind::Conditional { .. } => Err(LowerError::unsupported(
            "conditional in predicate position",
            expr.span.clone(),
        )),
        ExprKind::Object { .. } | ExprKind::Array { .. } | ExprKind::Arrow(_) => Err(
            LowerError::unsupported("literal shape in predicate position", expr.span.clone()),
        ),
        ExprKind::Paren(_) => unreachable!("unparenthesised above"),
    }
}

/// Lower an expression expected to produce a scalar value.
pub fn lower_value(ctx: &mut VisitorContext, expr: &Expr) -> Result<ValueExpr, LowerError> {
    let expr = expr.unparenthesised();
    match &expr.kind {
        ExprKind::Lit(LitValue::Null) => Ok(ValueExpr::Constant(ConstValue::Null)),
        ExprKind::Lit(lit) => Ok(auto_param(ctx, lit, None)),

        ExprKind::Ident(name) => Err(ident_error(ctx, name, expr.span.clone())),

        ExprKind::Member { .. } => resolve_member(ctx, expr),

        ExprKind::Call { callee, args } => lower_value_call(ctx, expr, callee, args),

        ExprKind::Binary { op, left, right } => {
            if compare_op(*op).is_some() {
                return Ok(ValueExpr::Boolean(Box::new(lower_bool(ctx, expr)?)));
            }
            let arith = match op {
                BinaryOp::Add => {
                    if is_stringish(left) || is_stringish(right) {
                        let left = lower_value(ctx, left)?;
                        let right = lower_value(ctx, right)?;
                        return Ok(ValueExpr::Concat {
                            left: Box::new(left),
                            right: Box::new(right),
                        });
                    }
                    ArithOp::Add
                }
                BinaryOp::Sub => ArithOp::Sub,
                BinaryOp::Mul => ArithOp::Mul,
                BinaryOp::Div => ArithOp::Div,
                BinaryOp::Mod => ArithOp::Mod,
                _ => unreachable!("comparison handled above"),
            };
            Ok(ValueExpr::Arithmetic {
                op: arith,
                left: Box::new(lower_value(ctx, left)?),
                right: Box::new(lower_value(ctx, right)?),
            })
        }

        ExprKind::Logical { op, left, right } => match op {
            LogicalOp::Nullish => {
                // Flatten chained `??` into one COALESCE.
                let mut exprs = Vec::new();
                collect_coalesce(ctx, left, &mut exprs)?;
                collect_coalesce(ctx, right, &mut exprs)?;
                Ok(ValueExpr::Coalesce(exprs))
            }
            _ => Ok(ValueExpr::Boolean(Box::new(lower_bool(ctx, expr)?))),
        },

        ExprKind::Unary { op, operand } => match op {
            UnaryOp::Not => Ok(ValueExpr::Boolean(Box::new(lower_bool(ctx, expr)?))),
            UnaryOp::Neg | UnaryOp::Plus => match literal_value(expr) {
                Some(lit) => Ok(auto_param(ctx, &lit, None)),
                None => Err(LowerError::unsupported(
                    "unary sign on a non-literal",
                    expr.span.clone(),
                )),
            },
        },

        ExprKind::Conditional { .. } => lower_case(ctx, expr),

        ExprKind::Object { properties } => {
            let mut lowered = Vec::with_capacity(properties.len());
            for (key, value) in properties {
                lowered.push((key.clone(), lower_value(ctx, value)?));
            }
            Ok(ValueExpr::Object(lowered))
        }

        ExprKind::Array { .. } => match array_literal_value(expr) {
            Some(value) => {
                let name = ctx.auto_params.add(value.clone(), plain_info(value));
                Ok(ValueExpr::Param {
                    name,
                    property: None,
                })
            }
            None => Err(LowerError::unsupported(
                "array literal with non-literal elements",
                expr.span.clone(),
            )),
        },

        ExprKind::Arrow(_) => Err(LowerError::unsupported(
            "nested lambda outside an operation argument",
            expr.span.clone(),
        )),
        ExprKind::Paren(_) => unreachable!("unparenthesised above"),
    }
}

// =============================================================================
// Comparisons and field-context capture
// =============================================================================

fn compare_op(op: BinaryOp) -> Option<CompareOp> {
    match op {
        BinaryOp::Eq | BinaryOp::EqStrict => Some(CompareOp::Eq),
        BinaryOp::Ne | BinaryOp::NeStrict => Some(CompareOp::Ne),
        BinaryOp::Lt => Some(CompareOp::Lt),
        BinaryOp::Le => Some(CompareOp::Le),
        BinaryOp::Gt => Some(CompareOp::Gt),
        BinaryOp::Ge => Some(CompareOp::Ge),
        _ => None,
    }
}

fn lower_comparison(
    ctx: &mut VisitorContext,
    op: CompareOp,
    left: &Expr,
    right: &Expr,
    span: Span,
) -> Result<BoolExpr, LowerError> {
    // `x == null` / `x != null` rewrite to IS [NOT] NULL; no parameter is
    // generated for the null.
    let left_null = is_null_lit(left);
    let right_null = is_null_lit(right);
    if left_null || right_null {
        let negated = match op {
            CompareOp::Eq => false,
            CompareOp::Ne => true,
            _ => {
                return Err(LowerError::unsupported(
                    "ordering comparison against null",
                    span,
                ))
            }
        };
        if left_null && right_null {
            // `null == null` has no column to test.
            return Err(LowerError::unsupported("null compared to null", span));
        }
        let other = if left_null { right } else { left };
        return Ok(BoolExpr::IsNull {
            expr: lower_value(ctx, other)?,
            negated,
        });
    }

    // Lower operands in source order so auto-parameter names stay stable,
    // then attach field context once the column side is known.
    let left_lit = literal_value(left);
    let right_lit = literal_value(right);

    let (left_ir, right_ir) = match (left_lit, right_lit) {
        (Some(lit), None) => {
            let (value_param, name) = auto_param_named(ctx, &lit);
            let right_ir = lower_value(ctx, right)?;
            capture_field_context(ctx, &name, &right_ir);
            (value_param, right_ir)
        }
        (None, Some(lit)) => {
            let left_ir = lower_value(ctx, left)?;
            let (value_param, name) = auto_param_named(ctx, &lit);
            capture_field_context(ctx, &name, &left_ir);
            (left_ir, value_param)
        }
        _ => (lower_value(ctx, left)?, lower_value(ctx, right)?),
    };

    Ok(BoolExpr::Comparison {
        op,
        left: left_ir,
        right: right_ir,
    })
}

fn capture_field_context(ctx: &mut VisitorContext, param_name: &str, column_side: &ValueExpr) {
    if let ValueExpr::Column { name, table } = column_side {
        ctx.auto_params.set_field_context(
            param_name,
            Some(name.clone()),
            table.clone(),
            ctx.current_table.clone(),
        );
    }
}

// =============================================================================
// Method calls
// =============================================================================

fn lower_bool_call(
    ctx: &mut VisitorContext,
    call: &Expr,
    callee: &Expr,
    args: &[Expr],
) -> Result<BoolExpr, LowerError> {
    let callee = callee.unparenthesised();
    let (object, method) = match &callee.kind {
        ExprKind::Member {
            object, property, ..
        } => (object.as_ref(), property.as_str()),
        _ => {
            return Err(LowerError::unsupported(
                "free function call in predicate position",
                call.span.clone(),
            ))
        }
    };

    // Case-insensitive helper functions: h.functions.iequals(a, b).
    if let Some(path) = member_path(callee) {
        if path.len() == 3 && ctx.is_helpers_param(path[0]) && path[1] == "functions" {
            let function = match path[2] {
                "iequals" => CiFunction::Equals,
                "istartsWith" => CiFunction::StartsWith,
                "iendsWith" => CiFunction::EndsWith,
                "icontains" => CiFunction::Contains,
                other => {
                    return Err(LowerError::unsupported(
                        format!("helper function '{}'", other),
                        call.span.clone(),
                    ))
                }
            };
            let mut lowered = Vec::with_capacity(args.len());
            for arg in args {
                lowered.push(lower_value(ctx, arg)?);
            }
            return Ok(BoolExpr::CaseInsensitive {
                function,
                args: lowered,
            });
        }
    }

    let predicate = match method {
        "startsWith" => Some(StringPredicate::StartsWith),
        "endsWith" => Some(StringPredicate::EndsWith),
        "includes" => Some(StringPredicate::Includes),
        _ => None,
    };

    let Some(predicate) = predicate else {
        return Err(LowerError::unsupported(
            format!("method '{}' in predicate position", method),
            call.span.clone(),
        ));
    };
    let [arg] = args else {
        return Err(LowerError::unsupported(
            format!("'{}' takes exactly one argument", method),
            call.span.clone(),
        ));
    };

    // `includes` on an array-valued receiver is membership; any string
    // receiver is a LIKE predicate.
    if predicate == StringPredicate::Includes {
        if let Some(list) = array_receiver(ctx, object)? {
            let value = lower_value(ctx, arg)?;
            return Ok(BoolExpr::In { value, list });
        }
    }

    let object_ir = lower_value(ctx, object)?;
    let pattern = match literal_value(arg) {
        Some(lit) => {
            let (pattern, name) = auto_param_named(ctx, &lit);
            capture_field_context(ctx, &name, &object_ir);
            pattern
        }
        None => lower_value(ctx, arg)?,
    };

    Ok(BoolExpr::Method {
        object: object_ir,
        method: predicate,
        pattern,
    })
}

/// An `includes` receiver that denotes an array: a caller parameter member or
/// an array literal. Returns the `Param` standing for the list.
fn array_receiver(
    ctx: &mut VisitorContext,
    object: &Expr,
) -> Result<Option<ValueExpr>, LowerError> {
    let object = object.unparenthesised();
    if let Some(path) = member_path(object) {
        if path.len() >= 2 && ctx.is_query_param(path[0]) {
            return Ok(Some(resolve_member(ctx, object)?));
        }
    }
    if matches!(object.kind, ExprKind::Array { .. }) {
        if let Some(value) = array_literal_value(object) {
            let name = ctx.auto_params.add(value.clone(), plain_info(value));
            return Ok(Some(ValueExpr::Param {
                name,
                property: None,
            }));
        }
    }
    Ok(None)
}

fn lower_value_call(
    ctx: &mut VisitorContext,
    call: &Expr,
    callee: &Expr,
    args: &[Expr],
) -> Result<ValueExpr, LowerError> {
    let callee = callee.unparenthesised();
    let (object, method) = match &callee.kind {
        ExprKind::Member {
            object, property, ..
        } => (object.as_ref(), property.as_str()),
        _ => {
            return Err(LowerError::unsupported(
                "free function call in value position",
                call.span.clone(),
            ))
        }
    };

    // Window builders: h.window.rowNumber({ partitionBy: …, orderBy: … }).
    if let Some(path) = member_path(callee) {
        if path.len() == 3 && ctx.is_helpers_param(path[0]) && path[1] == "window" {
            return lower_window(ctx, path[2], args, call.span.clone());
        }
    }

    match method {
        "toLowerCase" | "toUpperCase" if args.is_empty() => {
            let case = if method == "toLowerCase" {
                StringCase::Lower
            } else {
                StringCase::Upper
            };
            Ok(ValueExpr::StringMethod {
                object: Box::new(lower_value(ctx, object)?),
                method: case,
            })
        }

        "count" | "sum" | "average" | "min" | "max" => {
            lower_grouping_aggregate(ctx, object, method, args, call.span.clone())
        }

        "startsWith" | "endsWith" | "includes" => {
            Ok(ValueExpr::Boolean(Box::new(lower_bool(ctx, call)?)))
        }

        other => Err(LowerError::unsupported(
            format!("method '{}' in value position", other),
            call.span.clone(),
        )),
    }
}

fn lower_grouping_aggregate(
    ctx: &mut VisitorContext,
    object: &Expr,
    method: &str,
    args: &[Expr],
    span: Span,
) -> Result<ValueExpr, LowerError> {
    use crate::ir::AggregateFn;

    let receiver_ok = matches!(
        &object.unparenthesised().kind,
        ExprKind::Ident(name) if ctx.is_grouping_param(name)
    );
    if !receiver_ok {
        return Err(LowerError::InvalidAggregateReceiver {
            method: method.to_string(),
            span,
        });
    }

    if method == "count" {
        if !args.is_empty() {
            return Err(LowerError::unsupported("count() takes no selector", span));
        }
        return Ok(ValueExpr::Aggregate {
            function: AggregateFn::Count,
            expression: None,
        });
    }

    let function = match method {
        "sum" => AggregateFn::Sum,
        "average" => AggregateFn::Avg,
        "min" => AggregateFn::Min,
        "max" => AggregateFn::Max,
        _ => unreachable!(),
    };

    let [selector] = args else {
        return Err(LowerError::unsupported(
            format!("{}() requires a selector lambda", method),
            span,
        ));
    };
    let arrow = expect_arrow(selector)?;
    let body = lower_selector(ctx, arrow)?;
    Ok(ValueExpr::Aggregate {
        function,
        expression: Some(Box::new(body)),
    })
}

/// Lower a one-parameter row selector, binding its parameter for the body.
pub fn lower_selector(
    ctx: &mut VisitorContext,
    arrow: &ArrowFunction,
) -> Result<ValueExpr, LowerError> {
    let binding = arrow.params.first().map(|name| ctx.bind_row_param(name));
    let result = lower_value(ctx, &arrow.body);
    if let Some(binding) = binding {
        ctx.unbind(binding);
    }
    result
}

// =============================================================================
// Window builders
// =============================================================================

fn lower_window(
    ctx: &mut VisitorContext,
    name: &str,
    args: &[Expr],
    span: Span,
) -> Result<ValueExpr, LowerError> {
    let function = match name {
        "rowNumber" => WindowFn::RowNumber,
        "rank" => WindowFn::Rank,
        "denseRank" => WindowFn::DenseRank,
        other => {
            return Err(LowerError::unsupported(
                format!("window function '{}'", other),
                span,
            ))
        }
    };

    let mut spec = WindowSpec {
        function,
        partition_by: Vec::new(),
        order_by: Vec::new(),
    };

    if let Some(opts) = args.first() {
        let opts = opts.unparenthesised();
        let ExprKind::Object { properties } = &opts.kind else {
            return Err(LowerError::unsupported(
                "window options must be an object literal",
                opts.span.clone(),
            ));
        };
        for (key, value) in properties {
            match key.as_str() {
                "partitionBy" => {
                    for item in option_list(value) {
                        spec.partition_by.push(lower_value(ctx, item)?);
                    }
                }
                "orderBy" => {
                    for item in option_list(value) {
                        spec.order_by.push(WindowOrder {
                            expr: lower_value(ctx, item)?,
                            descending: false,
                        });
                    }
                }
                "orderByDescending" => {
                    for item in option_list(value) {
                        spec.order_by.push(WindowOrder {
                            expr: lower_value(ctx, item)?,
                            descending: true,
                        });
                    }
                }
                other => {
                    return Err(LowerError::unsupported(
                        format!("window option '{}'", other),
                        value.span.clone(),
                    ))
                }
            }
        }
    }

    Ok(ValueExpr::Window(spec))
}

/// A window option value is a single expression or an array of them.
fn option_list(value: &Expr) -> Vec<&Expr> {
    match &value.unparenthesised().kind {
        ExprKind::Array { elements } => elements.iter().collect(),
        _ => vec![value],
    }
}

// =============================================================================
// Identifier and member resolution
// =============================================================================

fn ident_error(ctx: &VisitorContext, name: &str, span: Span) -> LowerError {
    let bound = ctx.table_params.contains_key(name)
        || ctx.shape_params.contains_key(name)
        || ctx.is_query_param(name)
        || ctx.is_grouping_param(name)
        || ctx.is_helpers_param(name);
    if bound {
        LowerError::unsupported(format!("parameter '{}' used as a bare value", name), span)
    } else {
        LowerError::UnknownIdentifier {
            name: name.to_string(),
            span,
        }
    }
}

/// The identifier path of a pure member chain: `x.u.col` → `["x","u","col"]`.
pub fn member_path(expr: &Expr) -> Option<Vec<&str>> {
    match &expr.unparenthesised().kind {
        ExprKind::Ident(name) => Some(vec![name.as_str()]),
        ExprKind::Member {
            object, property, ..
        } => {
            let mut path = member_path(object)?;
            path.push(property.as_str());
            Some(path)
        }
        _ => None,
    }
}

/// Resolve a member access against the parameter-origin model.
pub fn resolve_member(ctx: &mut VisitorContext, expr: &Expr) -> Result<ValueExpr, LowerError> {
    let span = expr.span.clone();
    let Some(path) = member_path(expr) else {
        return Err(LowerError::unsupported(
            "member access on a computed object",
            span,
        ));
    };
    let head = path[0];

    if let Some(binding) = ctx.table_params.get(head) {
        if path.len() == 2 {
            return Ok(ValueExpr::Column {
                name: path[1].to_string(),
                table: binding.alias.clone(),
            });
        }
        return Err(LowerError::unsupported(
            "nested member access on a table row",
            span,
        ));
    }

    if ctx.is_query_param(head) {
        return match path.len() {
            2 => Ok(ValueExpr::Param {
                name: path[1].to_string(),
                property: None,
            }),
            3 => Ok(ValueExpr::Param {
                name: path[1].to_string(),
                property: Some(path[2].to_string()),
            }),
            _ => Err(LowerError::unsupported(
                "parameters nest at most one property deep",
                span,
            )),
        };
    }

    if ctx.is_grouping_param(head) {
        if path.len() >= 2 && path[1] == "key" {
            let key = ctx
                .group_by_key
                .clone()
                .ok_or_else(|| LowerError::chain("'key' outside a grouped query"))?;
            return match path.len() {
                2 => Ok(key),
                3 => match key {
                    ValueExpr::Object(props) => props
                        .into_iter()
                        .find(|(name, _)| name == path[2])
                        .map(|(_, expr)| expr)
                        .ok_or_else(|| LowerError::UnknownIdentifier {
                            name: path[2].to_string(),
                            span,
                        }),
                    _ => Err(LowerError::unsupported(
                        "property access on a scalar grouping key",
                        span,
                    )),
                },
                _ => Err(LowerError::unsupported("grouping key nesting", span)),
            };
        }
        return Err(LowerError::unsupported(
            "grouping parameter members other than 'key'",
            span,
        ));
    }

    if let Some(shape) = ctx.shape_params.get(head).cloned() {
        return resolve_shape_path(&shape, &path[1..], span);
    }

    if ctx.is_helpers_param(head) {
        return Err(LowerError::unsupported(
            "helpers must be invoked, not read",
            span,
        ));
    }

    Err(LowerError::UnknownIdentifier {
        name: head.to_string(),
        span,
    })
}

fn resolve_shape_path(
    shape: &super::ResultShape,
    path: &[&str],
    span: Span,
) -> Result<ValueExpr, LowerError> {
    let [segment, rest @ ..] = path else {
        return Err(LowerError::unsupported(
            "join result used without a member access",
            span,
        ));
    };
    let entry = shape.entry(segment).ok_or_else(|| LowerError::UnknownIdentifier {
        name: segment.to_string(),
        span: span.clone(),
    })?;
    match entry {
        ShapeEntry::Row { alias, .. } => match rest {
            [column] => Ok(ValueExpr::Column {
                name: column.to_string(),
                table: Some(alias.clone()),
            }),
            [] => Err(LowerError::unsupported(
                "whole-row projection of a joined table; project columns explicitly",
                span,
            )),
            _ => Err(LowerError::unsupported(
                "nested member access on a joined row",
                span,
            )),
        },
        ShapeEntry::Group { .. } => Err(LowerError::chain(
            "grouped join results must be flattened with selectMany(defaultIfEmpty)",
        )),
        ShapeEntry::Nested(inner) => resolve_shape_path(inner, rest, span),
    }
}

// =============================================================================
// Literals and auto-parameters
// =============================================================================

/// Literal value of an expression, folding unary sign onto numbers.
pub fn literal_value(expr: &Expr) -> Option<LitValue> {
    match &expr.unparenthesised().kind {
        ExprKind::Lit(lit) => Some(lit.clone()),
        ExprKind::Unary { op, operand } => {
            let lit = literal_value(operand)?;
            match (op, lit) {
                (UnaryOp::Neg, LitValue::Int(n)) => Some(LitValue::Int(-n)),
                (UnaryOp::Neg, LitValue::Float(f)) => Some(LitValue::Float(-f)),
                (UnaryOp::Plus, lit @ (LitValue::Int(_) | LitValue::Float(_))) => Some(lit),
                _ => None,
            }
        }
        _ => None,
    }
}

fn is_null_lit(expr: &Expr) -> bool {
    matches!(literal_value(expr), Some(LitValue::Null))
}

fn lit_to_param_value(lit: &LitValue) -> ParamValue {
    match lit {
        LitValue::Str(s) => ParamValue::String(s.clone()),
        LitValue::Int(n) => ParamValue::Int(*n),
        LitValue::Float(f) => ParamValue::Float(*f),
        LitValue::Bool(b) => ParamValue::Bool(*b),
        LitValue::Null => ParamValue::Null,
    }
}

fn plain_info(value: ParamValue) -> AutoParamInfo {
    AutoParamInfo {
        value,
        field_name: None,
        table_name: None,
        source_table: None,
    }
}

fn auto_param(
    ctx: &mut VisitorContext,
    lit: &LitValue,
    field: Option<(&str, Option<&str>)>,
) -> ValueExpr {
    let value = lit_to_param_value(lit);
    let info = AutoParamInfo {
        value: value.clone(),
        field_name: field.map(|(name, _)| name.to_string()),
        table_name: field.and_then(|(_, table)| table.map(str::to_string)),
        source_table: ctx.current_table.clone(),
    };
    let name = ctx.auto_params.add(value, info);
    ValueExpr::Param {
        name,
        property: None,
    }
}

fn auto_param_named(ctx: &mut VisitorContext, lit: &LitValue) -> (ValueExpr, String) {
    let param = auto_param(ctx, lit, None);
    let name = match &param {
        ValueExpr::Param { name, .. } => name.clone(),
        _ => unreachable!(),
    };
    (param, name)
}

/// Lower a DML assignment value for a named column. Literals pick up the
/// column as field context; anything else lowers normally.
pub(crate) fn lower_field_value(
    ctx: &mut VisitorContext,
    column: &str,
    expr: &Expr,
) -> Result<ValueExpr, LowerError> {
    match literal_value(expr) {
        Some(LitValue::Null) => Ok(ValueExpr::Constant(ConstValue::Null)),
        Some(lit) => Ok(auto_param(ctx, &lit, Some((column, None)))),
        None => lower_value(ctx, expr),
    }
}

/// The array's `ParamValue` when every element is a literal.
fn array_literal_value(expr: &Expr) -> Option<ParamValue> {
    match &expr.unparenthesised().kind {
        ExprKind::Array { elements } => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(lit_to_param_value(&literal_value(element)?));
            }
            Some(ParamValue::Array(values))
        }
        _ => None,
    }
}

/// Whether `+` on this operand means string concatenation.
fn is_stringish(expr: &Expr) -> bool {
    match &expr.unparenthesised().kind {
        ExprKind::Lit(LitValue::Str(_)) => true,
        ExprKind::Call { callee, .. } => matches!(
            &callee.unparenthesised().kind,
            ExprKind::Member { property, .. }
                if property == "toLowerCase" || property == "toUpperCase"
        ),
        ExprKind::Binary {
            op: BinaryOp::Add,
            left,
            right,
        } => is_stringish(left) || is_stringish(right),
        _ => false,
    }
}

fn collect_coalesce(
    ctx: &mut VisitorContext,
    expr: &Expr,
    out: &mut Vec<ValueExpr>,
) -> Result<(), LowerError> {
    match &expr.unparenthesised().kind {
        ExprKind::Logical {
            op: LogicalOp::Nullish,
            left,
            right,
        } => {
            collect_coalesce(ctx, left, out)?;
            collect_coalesce(ctx, right, out)
        }
        _ => {
            out.push(lower_value(ctx, expr)?);
            Ok(())
        }
    }
}

fn lower_case(ctx: &mut VisitorContext, expr: &Expr) -> Result<ValueExpr, LowerError> {
    let mut branches = Vec::new();
    let mut current = expr.unparenthesised();
    loop {
        match &current.kind {
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                branches.push(CaseBranch {
                    when: lower_bool(ctx, test)?,
                    then: lower_value(ctx, consequent)?,
                });
                current = alternate.unparenthesised();
            }
            _ => {
                let otherwise = lower_value(ctx, current)?;
                return Ok(ValueExpr::Case {
                    branches,
                    otherwise: Some(Box::new(otherwise)),
                });
            }
        }
    }
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
