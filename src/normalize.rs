//! Normalisation passes.
//!
//! Two pure rewrites run between lowering and emission:
//!
//! 1. **Join qualification**: every table source participating in a join
//!    chain carries a stable `tN` alias (assigned in encounter order during
//!    lowering); this pass binds the remaining unqualified column references
//!    of each join side to that side's alias.
//! 2. **Window-filter wrapping**: a `where` that references a window-function
//!    alias defined by an enclosing `select` cannot run in the same SELECT;
//!    its source is wrapped in a synthetic subquery `From` aliased back to
//!    the original table name.

use std::collections::HashSet;

use crate::ir::{
    BoolExpr, CaseBranch, FromOp, OpTree, Projection, QueryOp, ValueExpr, WindowOrder, WindowSpec,
};

/// Run all normalisation passes.
pub fn normalize(tree: OpTree) -> OpTree {
    match tree {
        OpTree::Query(query) => {
            let window_aliases = collect_window_aliases(&query);
            let query = qualify_query(query, &window_aliases);
            let (query, _) = wrap_window_filters(query);
            OpTree::Query(query)
        }
        other => other,
    }
}

// =============================================================================
// Pass 1: join qualification
// =============================================================================

fn qualify_query(op: QueryOp, skip: &HashSet<String>) -> QueryOp {
    if !op.has_join() {
        return op;
    }
    let root_alias = op.root_from().and_then(|f| f.alias.clone());
    qualify_ops(op, root_alias.as_deref(), skip)
}

fn qualify_ops(op: QueryOp, alias: Option<&str>, skip: &HashSet<String>) -> QueryOp {
    let Some(alias) = alias else {
        return op;
    };

    match op {
        QueryOp::From(mut from) => {
            if let Some(sub) = from.subquery.take() {
                from.subquery = Some(Box::new(qualify_query(*sub, skip)));
            }
            QueryOp::From(from)
        }

        QueryOp::Join(mut join) => {
            let outer_alias = join.outer.root_from().and_then(|f| f.alias.clone());
            let inner_alias = join.inner.root_from().and_then(|f| f.alias.clone());
            join.outer = Box::new(qualify_ops(*join.outer, outer_alias.as_deref(), skip));
            join.inner = Box::new(qualify_ops(*join.inner, inner_alias.as_deref(), skip));
            if let Some(a) = outer_alias.as_deref() {
                join.outer_key = qualify_value(join.outer_key, a, skip);
            }
            if let Some(a) = inner_alias.as_deref() {
                join.inner_key = qualify_value(join.inner_key, a, skip);
            }
            QueryOp::Join(join)
        }

        QueryOp::GroupJoin(mut join) => {
            let outer_alias = join.outer.root_from().and_then(|f| f.alias.clone());
            let inner_alias = join.inner.root_from().and_then(|f| f.alias.clone());
            join.outer = Box::new(qualify_ops(*join.outer, outer_alias.as_deref(), skip));
            join.inner = Box::new(qualify_ops(*join.inner, inner_alias.as_deref(), skip));
            QueryOp::GroupJoin(join)
        }

        QueryOp::SelectMany { source, inner } => {
            let source_alias = source.root_from().and_then(|f| f.alias.clone());
            let inner_alias = inner.root_from().and_then(|f| f.alias.clone());
            QueryOp::SelectMany {
                source: Box::new(qualify_ops(*source, source_alias.as_deref(), skip)),
                inner: Box::new(qualify_ops(*inner, inner_alias.as_deref(), skip)),
            }
        }

        QueryOp::Union {
            first,
            second,
            all,
        } => QueryOp::Union {
            first: Box::new(qualify_query(*first, skip)),
            second: Box::new(qualify_query(*second, skip)),
            all,
        },

        QueryOp::Where { source, predicate } => QueryOp::Where {
            source: Box::new(qualify_ops(*source, Some(alias), skip)),
            predicate: qualify_bool(predicate, alias, skip),
        },
        QueryOp::Select { source, projection } => QueryOp::Select {
            source: Box::new(qualify_ops(*source, Some(alias), skip)),
            projection: match projection {
                Projection::AllColumns => Projection::AllColumns,
                Projection::Expr(expr) => Projection::Expr(qualify_value(expr, alias, skip)),
            },
        },
        QueryOp::OrderBy {
            source,
            key,
            descending,
        } => QueryOp::OrderBy {
            source: Box::new(qualify_ops(*source, Some(alias), skip)),
            key: qualify_value(key, alias, skip),
            descending,
        },
        QueryOp::ThenBy {
            source,
            key,
            descending,
        } => QueryOp::ThenBy {
            source: Box::new(qualify_ops(*source, Some(alias), skip)),
            key: qualify_value(key, alias, skip),
            descending,
        },
        QueryOp::GroupBy { source, key } => QueryOp::GroupBy {
            source: Box::new(qualify_ops(*source, Some(alias), skip)),
            key: qualify_value(key, alias, skip),
        },
        QueryOp::Take { source, count } => QueryOp::Take {
            source: Box::new(qualify_ops(*source, Some(alias), skip)),
            count,
        },
        QueryOp::Skip { source, count } => QueryOp::Skip {
            source: Box::new(qualify_ops(*source, Some(alias), skip)),
            count,
        },
        QueryOp::Distinct { source } => QueryOp::Distinct {
            source: Box::new(qualify_ops(*source, Some(alias), skip)),
        },
        QueryOp::Reverse { source } => QueryOp::Reverse {
            source: Box::new(qualify_ops(*source, Some(alias), skip)),
        },
        QueryOp::Terminal { source, kind } => {
            use crate::ir::TerminalKind;
            let kind = match kind {
                TerminalKind::Sum(e) => TerminalKind::Sum(qualify_value(e, alias, skip)),
                TerminalKind::Average(e) => TerminalKind::Average(qualify_value(e, alias, skip)),
                TerminalKind::Min(e) => TerminalKind::Min(qualify_value(e, alias, skip)),
                TerminalKind::Max(e) => TerminalKind::Max(qualify_value(e, alias, skip)),
                TerminalKind::All(p) => TerminalKind::All(qualify_bool(p, alias, skip)),
                TerminalKind::Contains(e) => TerminalKind::Contains(qualify_value(e, alias, skip)),
                other => other,
            };
            QueryOp::Terminal {
                source: Box::new(qualify_ops(*source, Some(alias), skip)),
                kind,
            }
        }
    }
}

fn qualify_value(expr: ValueExpr, alias: &str, skip: &HashSet<String>) -> ValueExpr {
    match expr {
        ValueExpr::Column { name, table: None } if !skip.contains(&name) => ValueExpr::Column {
            name,
            table: Some(alias.to_string()),
        },
        ValueExpr::Column { .. } | ValueExpr::Constant(_) | ValueExpr::Param { .. } => expr,
        ValueExpr::Arithmetic { op, left, right } => ValueExpr::Arithmetic {
            op,
            left: Box::new(qualify_value(*left, alias, skip)),
            right: Box::new(qualify_value(*right, alias, skip)),
        },
        ValueExpr::Concat { left, right } => ValueExpr::Concat {
            left: Box::new(qualify_value(*left, alias, skip)),
            right: Box::new(qualify_value(*right, alias, skip)),
        },
        ValueExpr::StringMethod { object, method } => ValueExpr::StringMethod {
            object: Box::new(qualify_value(*object, alias, skip)),
            method,
        },
        ValueExpr::Coalesce(items) => ValueExpr::Coalesce(
            items
                .into_iter()
                .map(|e| qualify_value(e, alias, skip))
                .collect(),
        ),
        ValueExpr::Case {
            branches,
            otherwise,
        } => ValueExpr::Case {
            branches: branches
                .into_iter()
                .map(|b| CaseBranch {
                    when: qualify_bool(b.when, alias, skip),
                    then: qualify_value(b.then, alias, skip),
                })
                .collect(),
            otherwise: otherwise.map(|e| Box::new(qualify_value(*e, alias, skip))),
        },
        ValueExpr::Aggregate {
            function,
            expression,
        } => ValueExpr::Aggregate {
            function,
            expression: expression.map(|e| Box::new(qualify_value(*e, alias, skip))),
        },
        ValueExpr::Window(spec) => ValueExpr::Window(WindowSpec {
            function: spec.function,
            partition_by: spec
                .partition_by
                .into_iter()
                .map(|e| qualify_value(e, alias, skip))
                .collect(),
            order_by: spec
                .order_by
                .into_iter()
                .map(|o| WindowOrder {
                    expr: qualify_value(o.expr, alias, skip),
                    descending: o.descending,
                })
                .collect(),
        }),
        ValueExpr::Object(props) => ValueExpr::Object(
            props
                .into_iter()
                .map(|(name, e)| (name, qualify_value(e, alias, skip)))
                .collect(),
        ),
        ValueExpr::Boolean(inner) => {
            ValueExpr::Boolean(Box::new(qualify_bool(*inner, alias, skip)))
        }
        ValueExpr::AllColumns => ValueExpr::AllColumns,
    }
}

fn qualify_bool(expr: BoolExpr, alias: &str, skip: &HashSet<String>) -> BoolExpr {
    match expr {
        BoolExpr::Comparison { op, left, right } => BoolExpr::Comparison {
            op,
            left: qualify_value(left, alias, skip),
            right: qualify_value(right, alias, skip),
        },
        BoolExpr::Logical { op, left, right } => BoolExpr::Logical {
            op,
            left: Box::new(qualify_bool(*left, alias, skip)),
            right: Box::new(qualify_bool(*right, alias, skip)),
        },
        BoolExpr::Not(inner) => BoolExpr::Not(Box::new(qualify_bool(*inner, alias, skip))),
        BoolExpr::In { value, list } => BoolExpr::In {
            value: qualify_value(value, alias, skip),
            list,
        },
        BoolExpr::IsNull { expr, negated } => BoolExpr::IsNull {
            expr: qualify_value(expr, alias, skip),
            negated,
        },
        BoolExpr::Column { name, table: None } if !skip.contains(&name) => BoolExpr::Column {
            name,
            table: Some(alias.to_string()),
        },
        BoolExpr::Column { .. } | BoolExpr::Constant(_) | BoolExpr::Param { .. } => expr,
        BoolExpr::Method {
            object,
            method,
            pattern,
        } => BoolExpr::Method {
            object: qualify_value(object, alias, skip),
            method,
            pattern: qualify_value(pattern, alias, skip),
        },
        BoolExpr::CaseInsensitive { function, args } => BoolExpr::CaseInsensitive {
            function,
            args: args
                .into_iter()
                .map(|e| qualify_value(e, alias, skip))
                .collect(),
        },
    }
}

// =============================================================================
// Pass 2: window-filter wrapping
// =============================================================================

/// All projection property names bound to window functions anywhere in the
/// tree, including names forwarding a window alias from an inner select.
fn collect_window_aliases(op: &QueryOp) -> HashSet<String> {
    let mut aliases = HashSet::new();
    collect_aliases_rec(op, &mut aliases);
    aliases
}

fn collect_aliases_rec(op: &QueryOp, aliases: &mut HashSet<String>) {
    if let QueryOp::Select {
        projection: Projection::Expr(ValueExpr::Object(props)),
        ..
    } = op
    {
        for (name, value) in props {
            match value {
                ValueExpr::Window(_) => {
                    aliases.insert(name.clone());
                }
                ValueExpr::Column { name: col, .. } if aliases.contains(col) => {
                    aliases.insert(name.clone());
                }
                _ => {}
            }
        }
    }
    match op {
        QueryOp::Join(join) | QueryOp::GroupJoin(join) => {
            collect_aliases_rec(&join.outer, aliases);
            collect_aliases_rec(&join.inner, aliases);
        }
        QueryOp::SelectMany { source, inner } => {
            collect_aliases_rec(source, aliases);
            collect_aliases_rec(inner, aliases);
        }
        QueryOp::Union { first, second, .. } => {
            collect_aliases_rec(first, aliases);
            collect_aliases_rec(second, aliases);
        }
        QueryOp::From(from) => {
            if let Some(sub) = &from.subquery {
                collect_aliases_rec(sub, aliases);
            }
        }
        other => {
            if let Some(source) = other.source() {
                collect_aliases_rec(source, aliases);
            }
        }
    }
}

/// Wrap `where` sources whose predicates reference window aliases from an
/// enclosing select. Returns the rewritten op and the set of window aliases
/// visible in its output.
fn wrap_window_filters(op: QueryOp) -> (QueryOp, HashSet<String>) {
    match op {
        QueryOp::From(mut from) => {
            // A subquery boundary turns window aliases into plain columns of
            // the outer scope; they do not propagate further.
            if let Some(sub) = from.subquery.take() {
                let (sub, _) = wrap_window_filters(*sub);
                from.subquery = Some(Box::new(sub));
            }
            (QueryOp::From(from), HashSet::new())
        }

        QueryOp::Select { source, projection } => {
            let (source, inner_aliases) = wrap_window_filters(*source);
            let mut aliases = HashSet::new();
            if let Projection::Expr(ValueExpr::Object(props)) = &projection {
                for (name, value) in props {
                    match value {
                        ValueExpr::Window(_) => {
                            aliases.insert(name.clone());
                        }
                        ValueExpr::Column { name: col, .. } if inner_aliases.contains(col) => {
                            aliases.insert(name.clone());
                        }
                        _ => {}
                    }
                }
            }
            (
                QueryOp::Select {
                    source: Box::new(source),
                    projection,
                },
                aliases,
            )
        }

        QueryOp::Where { source, predicate } => {
            let (source, aliases) = wrap_window_filters(*source);
            let needs_wrap = !aliases.is_empty()
                && bool_references_any(&predicate, &aliases)
                && !is_subquery_from(&source);
            if needs_wrap {
                let hint = source
                    .root_from()
                    .map(|f| f.alias_hint.clone().unwrap_or_else(|| f.table.clone()))
                    .unwrap_or_else(|| "sub".to_string());
                let wrapped = QueryOp::From(FromOp {
                    table: hint.clone(),
                    schema: None,
                    subquery: Some(Box::new(source)),
                    alias_hint: Some(hint),
                    alias: None,
                });
                // The wrapped aliases are now plain columns of this scope.
                return (
                    QueryOp::Where {
                        source: Box::new(wrapped),
                        predicate,
                    },
                    HashSet::new(),
                );
            }
            (
                QueryOp::Where {
                    source: Box::new(source),
                    predicate,
                },
                aliases,
            )
        }

        QueryOp::Join(mut join) => {
            let (outer, outer_aliases) = wrap_window_filters(*join.outer);
            let (inner, inner_aliases) = wrap_window_filters(*join.inner);
            join.outer = Box::new(outer);
            join.inner = Box::new(inner);
            let aliases = outer_aliases.union(&inner_aliases).cloned().collect();
            (QueryOp::Join(join), aliases)
        }
        QueryOp::GroupJoin(mut join) => {
            let (outer, outer_aliases) = wrap_window_filters(*join.outer);
            let (inner, inner_aliases) = wrap_window_filters(*join.inner);
            join.outer = Box::new(outer);
            join.inner = Box::new(inner);
            let aliases = outer_aliases.union(&inner_aliases).cloned().collect();
            (QueryOp::GroupJoin(join), aliases)
        }
        QueryOp::SelectMany { source, inner } => {
            let (source, a) = wrap_window_filters(*source);
            let (inner, b) = wrap_window_filters(*inner);
            (
                QueryOp::SelectMany {
                    source: Box::new(source),
                    inner: Box::new(inner),
                },
                a.union(&b).cloned().collect(),
            )
        }
        QueryOp::Union {
            first,
            second,
            all,
        } => {
            let (first, aliases) = wrap_window_filters(*first);
            let (second, _) = wrap_window_filters(*second);
            (
                QueryOp::Union {
                    first: Box::new(first),
                    second: Box::new(second),
                    all,
                },
                aliases,
            )
        }

        QueryOp::OrderBy {
            source,
            key,
            descending,
        } => {
            let (source, aliases) = wrap_window_filters(*source);
            (
                QueryOp::OrderBy {
                    source: Box::new(source),
                    key,
                    descending,
                },
                aliases,
            )
        }
        QueryOp::ThenBy {
            source,
            key,
            descending,
        } => {
            let (source, aliases) = wrap_window_filters(*source);
            (
                QueryOp::ThenBy {
                    source: Box::new(source),
                    key,
                    descending,
                },
                aliases,
            )
        }
        QueryOp::Take { source, count } => {
            let (source, aliases) = wrap_window_filters(*source);
            (
                QueryOp::Take {
                    source: Box::new(source),
                    count,
                },
                aliases,
            )
        }
        QueryOp::Skip { source, count } => {
            let (source, aliases) = wrap_window_filters(*source);
            (
                QueryOp::Skip {
                    source: Box::new(source),
                    count,
                },
                aliases,
            )
        }
        QueryOp::Distinct { source } => {
            let (source, aliases) = wrap_window_filters(*source);
            (
                QueryOp::Distinct {
                    source: Box::new(source),
                },
                aliases,
            )
        }
        QueryOp::Reverse { source } => {
            let (source, aliases) = wrap_window_filters(*source);
            (
                QueryOp::Reverse {
                    source: Box::new(source),
                },
                aliases,
            )
        }
        QueryOp::GroupBy { source, key } => {
            let (source, aliases) = wrap_window_filters(*source);
            (
                QueryOp::GroupBy {
                    source: Box::new(source),
                    key,
                },
                aliases,
            )
        }
        QueryOp::Terminal { source, kind } => {
            let (source, aliases) = wrap_window_filters(*source);
            (
                QueryOp::Terminal {
                    source: Box::new(source),
                    kind,
                },
                aliases,
            )
        }
    }
}

fn is_subquery_from(op: &QueryOp) -> bool {
    matches!(op, QueryOp::From(from) if from.subquery.is_some())
}

fn bool_references_any(expr: &BoolExpr, names: &HashSet<String>) -> bool {
    match expr {
        BoolExpr::Comparison { left, right, .. } => {
            value_references_any(left, names) || value_references_any(right, names)
        }
        BoolExpr::Logical { left, right, .. } => {
            bool_references_any(left, names) || bool_references_any(right, names)
        }
        BoolExpr::Not(inner) => bool_references_any(inner, names),
        BoolExpr::In { value, .. } => value_references_any(value, names),
        BoolExpr::IsNull { expr, .. } => value_references_any(expr, names),
        BoolExpr::Column { name, .. } => names.contains(name),
        BoolExpr::Constant(_) | BoolExpr::Param { .. } => false,
        BoolExpr::Method {
            object, pattern, ..
        } => value_references_any(object, names) || value_references_any(pattern, names),
        BoolExpr::CaseInsensitive { args, .. } => {
            args.iter().any(|a| value_references_any(a, names))
        }
    }
}

fn value_references_any(expr: &ValueExpr, names: &HashSet<String>) -> bool {
    match expr {
        ValueExpr::Column { name, .. } => names.contains(name),
        ValueExpr::Constant(_) | ValueExpr::Param { .. } | ValueExpr::AllColumns => false,
        ValueExpr::Arithmetic { left, right, .. } | ValueExpr::Concat { left, right } => {
            value_references_any(left, names) || value_references_any(right, names)
        }
        ValueExpr::StringMethod { object, .. } => value_references_any(object, names),
        ValueExpr::Coalesce(items) => items.iter().any(|e| value_references_any(e, names)),
        ValueExpr::Case {
            branches,
            otherwise,
        } => {
            branches.iter().any(|b| {
                bool_references_any(&b.when, names) || value_references_any(&b.then, names)
            }) || otherwise
                .as_ref()
                .is_some_and(|e| value_references_any(e, names))
        }
        ValueExpr::Aggregate { expression, .. } => expression
            .as_ref()
            .is_some_and(|e| value_references_any(e, names)),
        ValueExpr::Window(spec) => {
            spec.partition_by
                .iter()
                .any(|e| value_references_any(e, names))
                || spec
                    .order_by
                    .iter()
                    .any(|o| value_references_any(&o.expr, names))
        }
        ValueExpr::Object(props) => props.iter().any(|(_, e)| value_references_any(e, names)),
        ValueExpr::Boolean(inner) => bool_references_any(inner, names),
    }
}
