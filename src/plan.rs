//! Plan handles.
//!
//! A [`SelectPlan`] wraps a parsed plan (the operation chain plus a
//! restorable visitor-context snapshot) and lets callers append operations
//! programmatically without re-parsing the original lambda. Each append
//! parses only the new lambda fragment, synthesises the argument node, and
//! feeds it through the same operation visitor a full parse would use.
//!
//! Plans are values: appending consumes and returns the handle, and cloning
//! forks the whole plan, so extensions never mutate the cached baseline.
//! Terminal operations narrow the handle to [`TerminalPlan`], which only
//! renders.

use crate::ast::{self, ExprKind, LitValue};
use crate::cache::CachedPlan;
use crate::compile::{self, CompileResult, Schema, Statement, StatementOptions};
use crate::ir::{OpTree, QueryOp};
use crate::lowering::{query, LowerError, VisitorContext};
use crate::normalize::normalize;
use crate::params::Params;
use crate::sql::dialect::Dialect;

/// A parsed, extensible query plan.
#[derive(Debug, Clone)]
#[must_use = "plan handles have no effect until to_statement() is called"]
pub struct SelectPlan {
    tree: QueryOp,
    ctx: VisitorContext,
}

impl SelectPlan {
    /// Parse a builder lambda into an extensible plan. The chain must not be
    /// ended by a terminal operation.
    pub fn parse(schema: &Schema, source: &str) -> CompileResult<Self> {
        let plan = compile::build_plan(schema, source, true)?;
        let OpTree::Query(tree) = &plan.tree else {
            return Err(LowerError::chain("plan handles wrap query chains").into());
        };
        if tree.terminal_kind().is_some() {
            return Err(
                LowerError::chain("chain is already ended by a terminal operation").into(),
            );
        }
        Ok(Self {
            tree: tree.clone(),
            ctx: plan.snapshot.clone(),
        })
    }

    fn append(mut self, method: &str, args: Vec<ast::Expr>) -> CompileResult<Self> {
        self.tree = query::apply_method(&mut self.ctx, self.tree, method, &args)?;
        Ok(self)
    }

    fn append_lambda(self, method: &str, lambda_source: &str) -> CompileResult<Self> {
        let fragment = parse_fragment(lambda_source)?;
        self.append(method, vec![fragment])
    }

    /// Append a WHERE predicate (`"u => u.age >= 18"`).
    pub fn filter(self, predicate_source: &str) -> CompileResult<Self> {
        self.append_lambda("where", predicate_source)
    }

    /// Append or replace the projection.
    pub fn select(self, selector_source: &str) -> CompileResult<Self> {
        self.append_lambda("select", selector_source)
    }

    pub fn order_by(self, selector_source: &str) -> CompileResult<Self> {
        self.append_lambda("orderBy", selector_source)
    }

    pub fn order_by_descending(self, selector_source: &str) -> CompileResult<Self> {
        self.append_lambda("orderByDescending", selector_source)
    }

    pub fn then_by(self, selector_source: &str) -> CompileResult<Self> {
        self.append_lambda("thenBy", selector_source)
    }

    pub fn then_by_descending(self, selector_source: &str) -> CompileResult<Self> {
        self.append_lambda("thenByDescending", selector_source)
    }

    pub fn group_by(self, selector_source: &str) -> CompileResult<Self> {
        self.append_lambda("groupBy", selector_source)
    }

    pub fn distinct(self) -> CompileResult<Self> {
        self.append("distinct", Vec::new())
    }

    pub fn reverse(self) -> CompileResult<Self> {
        self.append("reverse", Vec::new())
    }

    /// Append a LIMIT; the count becomes an auto-parameter like any literal.
    pub fn take(self, count: i64) -> CompileResult<Self> {
        self.append("take", vec![int_literal(count)])
    }

    /// Append an OFFSET.
    pub fn skip(self, count: i64) -> CompileResult<Self> {
        self.append("skip", vec![int_literal(count)])
    }

    // -------------------------------------------------------------------------
    // Terminals
    // -------------------------------------------------------------------------

    fn terminal(mut self, method: &str, args: Vec<ast::Expr>) -> CompileResult<TerminalPlan> {
        self.tree = query::apply_method(&mut self.ctx, self.tree, method, &args)?;
        Ok(TerminalPlan {
            tree: self.tree,
            ctx: self.ctx,
        })
    }

    pub fn count(self) -> CompileResult<TerminalPlan> {
        self.terminal("count", Vec::new())
    }

    pub fn first(self) -> CompileResult<TerminalPlan> {
        self.terminal("first", Vec::new())
    }

    pub fn first_or_default(self) -> CompileResult<TerminalPlan> {
        self.terminal("firstOrDefault", Vec::new())
    }

    pub fn single(self) -> CompileResult<TerminalPlan> {
        self.terminal("single", Vec::new())
    }

    pub fn any(self) -> CompileResult<TerminalPlan> {
        self.terminal("any", Vec::new())
    }

    /// `all` requires its predicate.
    pub fn all(self, predicate_source: &str) -> CompileResult<TerminalPlan> {
        let fragment = parse_fragment(predicate_source)?;
        self.terminal("all", vec![fragment])
    }

    /// Render the plan against a dialect.
    pub fn to_statement(
        &self,
        params: &Params,
        options: &StatementOptions,
        dialect: Dialect,
    ) -> CompileResult<Statement> {
        render(&self.tree, &self.ctx, params, options, dialect)
    }
}

/// A plan ended by a terminal operation; it can only render.
#[derive(Debug, Clone)]
#[must_use = "plan handles have no effect until to_statement() is called"]
pub struct TerminalPlan {
    tree: QueryOp,
    ctx: VisitorContext,
}

impl TerminalPlan {
    pub fn to_statement(
        &self,
        params: &Params,
        options: &StatementOptions,
        dialect: Dialect,
    ) -> CompileResult<Statement> {
        render(&self.tree, &self.ctx, params, options, dialect)
    }
}

fn render(
    tree: &QueryOp,
    ctx: &VisitorContext,
    params: &Params,
    options: &StatementOptions,
    dialect: Dialect,
) -> CompileResult<Statement> {
    let tree = OpTree::Query(tree.clone());
    compile::validate(&tree)?;
    let plan = CachedPlan {
        tree: normalize(tree),
        auto_params: ctx.auto_params.values().clone(),
        auto_param_infos: ctx.auto_params.infos().clone(),
        snapshot: ctx.clone(),
    };
    compile::finish_statement(&plan, params, options, dialect)
}

fn parse_fragment(source: &str) -> CompileResult<ast::Expr> {
    let arrow = ast::parse_lambda(source)?;
    Ok(ast::Expr::new(
        ExprKind::Arrow(Box::new(arrow)),
        0..source.len(),
    ))
}

fn int_literal(value: i64) -> ast::Expr {
    ast::Expr::new(ExprKind::Lit(LitValue::Int(value)), 0..0)
}
