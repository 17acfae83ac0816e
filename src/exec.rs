//! Execute wrappers and the driver boundary.
//!
//! The compiler is synchronous; the only suspension point is the driver
//! round-trip. A driver consumes `{sql, params}` and returns rows as JSON
//! maps. The wrappers compile, dispatch once, and map the terminal
//! operation's result shape: row arrays, single rows, scalars, and booleans
//! encoded as `0`/`1` by the EXISTS probes.

use async_trait::async_trait;

use crate::compile::{self, CompileError, Schema, StatementOptions};
use crate::ir::{OpTree, TerminalKind};
use crate::lowering::LowerError;
use crate::params::Params;
use crate::sql::dialect::Dialect;

/// A result row as returned by drivers.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Failure at the driver boundary, re-raised unchanged.
#[derive(Debug, Clone, thiserror::Error)]
#[error("driver error: {message}")]
pub struct DriverError {
    pub message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The database driver boundary.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Run a row-returning statement.
    async fn query(&self, sql: &str, params: &Params) -> Result<Vec<Row>, DriverError>;

    /// Run a statement and report the number of affected rows.
    async fn execute(&self, sql: &str, params: &Params) -> Result<u64, DriverError>;
}

/// Execution failure.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("query returned no rows")]
    EmptyResult,

    #[error("query returned more than one row")]
    MultipleResults,

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Result of `execute_select`, shaped by the terminal operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    /// No terminal: all rows.
    Rows(Vec<Row>),
    /// `first` / `single` / `last` families.
    Row(Option<Row>),
    /// Aggregate terminals; `None` when the database returned SQL NULL.
    Scalar(Option<serde_json::Value>),
    /// `any` / `all` / `contains`.
    Bool(bool),
}

/// Result of the DML wrappers.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// Affected-row count, without a RETURNING clause.
    Affected(u64),
    /// Rows produced by RETURNING.
    Rows(Vec<Row>),
}

// =============================================================================
// SELECT execution
// =============================================================================

/// Compile and run a SELECT-family lambda, mapping the terminal shape.
pub async fn execute_select(
    driver: &dyn Driver,
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
    dialect: Dialect,
) -> Result<SelectOutcome, ExecuteError> {
    let plan = compile::build_plan(schema, source, options.uses_cache())?;
    let OpTree::Query(query) = &plan.tree else {
        return Err(CompileError::from(LowerError::chain(
            "execute_select requires a query chain",
        ))
        .into());
    };
    let terminal = query.terminal_kind().cloned();
    let statement = compile::finish_statement(&plan, params, options, dialect)?;
    let rows = driver.query(&statement.sql, &statement.params).await?;
    map_outcome(terminal, rows)
}

/// `execute_select` without caller parameters or options.
pub async fn execute_select_simple(
    driver: &dyn Driver,
    schema: &Schema,
    source: &str,
    dialect: Dialect,
) -> Result<SelectOutcome, ExecuteError> {
    execute_select(
        driver,
        schema,
        source,
        &Params::new(),
        &StatementOptions::default(),
        dialect,
    )
    .await
}

fn map_outcome(
    terminal: Option<TerminalKind>,
    mut rows: Vec<Row>,
) -> Result<SelectOutcome, ExecuteError> {
    let Some(terminal) = terminal else {
        return Ok(SelectOutcome::Rows(rows));
    };

    if terminal.is_aggregate() {
        let scalar = rows
            .first()
            .and_then(first_value)
            .filter(|value| !value.is_null());
        return Ok(SelectOutcome::Scalar(scalar));
    }
    if terminal.is_existence() {
        let truthy = rows.first().and_then(first_value).is_some_and(|value| {
            value.as_i64() == Some(1) || value.as_bool() == Some(true)
        });
        return Ok(SelectOutcome::Bool(truthy));
    }

    match terminal {
        TerminalKind::First | TerminalKind::Last => {
            if rows.is_empty() {
                return Err(ExecuteError::EmptyResult);
            }
            Ok(SelectOutcome::Row(Some(rows.remove(0))))
        }
        TerminalKind::FirstOrDefault | TerminalKind::LastOrDefault => {
            Ok(SelectOutcome::Row(rows.into_iter().next()))
        }
        TerminalKind::Single => match rows.len() {
            0 => Err(ExecuteError::EmptyResult),
            1 => Ok(SelectOutcome::Row(Some(rows.remove(0)))),
            _ => Err(ExecuteError::MultipleResults),
        },
        TerminalKind::SingleOrDefault => match rows.len() {
            0 => Ok(SelectOutcome::Row(None)),
            1 => Ok(SelectOutcome::Row(Some(rows.remove(0)))),
            _ => Err(ExecuteError::MultipleResults),
        },
        _ => Ok(SelectOutcome::Rows(rows)),
    }
}

fn first_value(row: &Row) -> Option<serde_json::Value> {
    row.values().next().cloned()
}

// =============================================================================
// DML execution
// =============================================================================

/// Compile and run an `insertInto` lambda.
pub async fn execute_insert(
    driver: &dyn Driver,
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
    dialect: Dialect,
) -> Result<MutationOutcome, ExecuteError> {
    let plan = compile::build_plan(schema, source, options.uses_cache())?;
    let OpTree::Insert(insert) = &plan.tree else {
        return Err(CompileError::from(LowerError::chain(
            "execute_insert requires an insertInto chain",
        ))
        .into());
    };
    let has_returning = insert.returning.is_some();
    let statement = compile::finish_statement(&plan, params, options, dialect)?;
    run_mutation(driver, &statement, has_returning).await
}

/// Compile and run an `update` lambda.
pub async fn execute_update(
    driver: &dyn Driver,
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
    dialect: Dialect,
) -> Result<MutationOutcome, ExecuteError> {
    let plan = compile::build_plan(schema, source, options.uses_cache())?;
    let OpTree::Update(update) = &plan.tree else {
        return Err(CompileError::from(LowerError::chain(
            "execute_update requires an update chain",
        ))
        .into());
    };
    let has_returning = update.returning.is_some();
    let statement = compile::finish_statement(&plan, params, options, dialect)?;
    run_mutation(driver, &statement, has_returning).await
}

/// Compile and run a `deleteFrom` lambda.
pub async fn execute_delete(
    driver: &dyn Driver,
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
    dialect: Dialect,
) -> Result<MutationOutcome, ExecuteError> {
    let plan = compile::build_plan(schema, source, options.uses_cache())?;
    if !matches!(&plan.tree, OpTree::Delete(_)) {
        return Err(CompileError::from(LowerError::chain(
            "execute_delete requires a deleteFrom chain",
        ))
        .into());
    }
    let statement = compile::finish_statement(&plan, params, options, dialect)?;
    run_mutation(driver, &statement, false).await
}

async fn run_mutation(
    driver: &dyn Driver,
    statement: &crate::compile::Statement,
    has_returning: bool,
) -> Result<MutationOutcome, ExecuteError> {
    if has_returning {
        let rows = driver.query(&statement.sql, &statement.params).await?;
        Ok(MutationOutcome::Rows(rows))
    } else {
        let affected = driver.execute(&statement.sql, &statement.params).await?;
        Ok(MutationOutcome::Affected(affected))
    }
}
