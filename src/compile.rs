//! One-shot compilation entry points.
//!
//! ```text
//! lambda source → parse → lower (visitors) → validate → normalise
//!                    │                                     │
//!                    └──────── parse cache ◄───────────────┘
//!                                                          ▼
//!                               merge params → emit → { sql, params }
//! ```
//!
//! `select_statement` and the DML siblings compile a builder lambda to a
//! parameterised statement for an explicit dialect; the `postgres` and
//! `sqlite` modules fix the dialect. Repeated calls with the same lambda
//! source skip parsing via the process-wide cache.

use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::ast;
use crate::cache::{self, CachedPlan};
use crate::ir::OpTree;
use crate::lowering::{query, LowerError, VisitorContext};
use crate::normalize::normalize;
use crate::params::{merge_params, Params};
use crate::sql::{self, dialect::Dialect, EmitError};

// =============================================================================
// Schema witness
// =============================================================================

/// Opaque schema witness. The compiler never validates tables or columns
/// against it; it only carries an optional database schema namespace that
/// prefixes table names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    namespace: Option<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(namespace: &str) -> Self {
        Self {
            namespace: Some(namespace.into()),
        }
    }

    pub(crate) fn namespace(&self) -> Option<String> {
        self.namespace.clone()
    }
}

// =============================================================================
// Statements and options
// =============================================================================

/// A compiled statement: SQL text plus the full parameter map (auto-params
/// merged with caller params, expanded per dialect).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub sql: String,
    pub params: Params,
}

/// Callback observing the final statement before driver dispatch.
pub type OnSql = Arc<dyn Fn(&Statement) + Send + Sync>;

/// Per-call options.
#[derive(Clone)]
pub struct StatementOptions {
    /// Bypass the parse cache for this call when false.
    pub cache: bool,
    /// Invoked synchronously with the final `{sql, params}`; observation
    /// only, it never changes behaviour.
    pub on_sql: Option<OnSql>,
}

impl Default for StatementOptions {
    fn default() -> Self {
        Self {
            cache: true,
            on_sql: None,
        }
    }
}

impl StatementOptions {
    pub fn uses_cache(&self) -> bool {
        self.cache
    }
}

impl std::fmt::Debug for StatementOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementOptions")
            .field("cache", &self.cache)
            .field("on_sql", &self.on_sql.as_ref().map(|_| "…"))
            .finish()
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Compilation failure. Every variant is fatal: no partial plan is returned
/// or cached.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ast::ParseError),

    #[error(transparent)]
    Lower(#[from] LowerError),

    #[error(transparent)]
    Emit(#[from] EmitError),
}

pub type CompileResult<T> = Result<T, CompileError>;

// =============================================================================
// Pipeline
// =============================================================================

/// Parse, lower, validate, and normalise a builder lambda, consulting the
/// process-wide parse cache.
pub(crate) fn build_plan(
    schema: &Schema,
    source: &str,
    use_cache: bool,
) -> CompileResult<Arc<CachedPlan>> {
    if use_cache {
        if let Some(plan) = cache::global().get(source) {
            debug!("parse cache hit ({} bytes of source)", source.len());
            return Ok(plan);
        }
    }
    debug!("parse cache miss; compiling {} bytes of source", source.len());

    let arrow = ast::parse_lambda(source)?;
    let mut ctx = VisitorContext::new(schema.namespace());
    let tree = query::lower_root(&mut ctx, &arrow)?;
    validate(&tree)?;
    let tree = normalize(tree);

    let plan = Arc::new(CachedPlan {
        tree,
        auto_params: ctx.auto_params.values().clone(),
        auto_param_infos: ctx.auto_params.infos().clone(),
        snapshot: ctx,
    });
    if use_cache {
        cache::global().insert(source.to_string(), (*plan).clone());
    }
    Ok(plan)
}

/// Build-time validation that needs the whole tree.
pub(crate) fn validate(tree: &OpTree) -> Result<(), LowerError> {
    if let OpTree::Query(query) = tree {
        let exempt = matches!(
            query.terminal_kind(),
            Some(kind) if kind.is_aggregate() || kind.is_existence()
        );
        if query.has_join() && query.last_projection().is_none() && !exempt {
            return Err(LowerError::chain(
                "joined query requires an explicit select projection",
            ));
        }
    }
    Ok(())
}

/// Merge parameters, emit SQL, and fire the `on_sql` observer.
pub(crate) fn finish_statement(
    plan: &CachedPlan,
    caller: &Params,
    options: &StatementOptions,
    dialect: Dialect,
) -> CompileResult<Statement> {
    let params = merge_params(&plan.auto_params, &plan.auto_param_infos, caller, dialect);
    let sql = sql::emit(&plan.tree, dialect, &params)?;
    let statement = Statement { sql, params };
    if let Some(on_sql) = &options.on_sql {
        on_sql(&statement);
    }
    Ok(statement)
}

fn expect_variant(plan: &CachedPlan, entry: &str) -> CompileResult<()> {
    let matches = matches!(
        (&plan.tree, entry),
        (OpTree::Query(_), "select")
            | (OpTree::Insert(_), "insert")
            | (OpTree::Update(_), "update")
            | (OpTree::Delete(_), "delete")
    );
    if matches {
        Ok(())
    } else {
        Err(LowerError::chain(format!(
            "{}_statement requires a matching {} chain",
            entry, entry
        ))
        .into())
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Compile a SELECT-family builder lambda.
pub fn select_statement(
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
    dialect: Dialect,
) -> CompileResult<Statement> {
    let plan = build_plan(schema, source, options.uses_cache())?;
    expect_variant(&plan, "select")?;
    finish_statement(&plan, params, options, dialect)
}

/// Compile an `insertInto` builder lambda.
pub fn insert_statement(
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
    dialect: Dialect,
) -> CompileResult<Statement> {
    let plan = build_plan(schema, source, options.uses_cache())?;
    expect_variant(&plan, "insert")?;
    finish_statement(&plan, params, options, dialect)
}

/// Compile an `update` builder lambda.
pub fn update_statement(
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
    dialect: Dialect,
) -> CompileResult<Statement> {
    let plan = build_plan(schema, source, options.uses_cache())?;
    expect_variant(&plan, "update")?;
    finish_statement(&plan, params, options, dialect)
}

/// Compile a `deleteFrom` builder lambda.
pub fn delete_statement(
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
    dialect: Dialect,
) -> CompileResult<Statement> {
    let plan = build_plan(schema, source, options.uses_cache())?;
    expect_variant(&plan, "delete")?;
    finish_statement(&plan, params, options, dialect)
}
