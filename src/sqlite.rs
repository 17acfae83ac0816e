//! SQLite entry points.
//!
//! The core entry points with the dialect fixed to [`Dialect::Sqlite`]:
//! `@name` placeholders, array parameters expanded into indexed companions,
//! and boolean auto-parameters coerced to `1`/`0` when compared against
//! columns.

use crate::compile::{self, CompileResult, Schema, Statement, StatementOptions};
use crate::exec::{self, Driver, ExecuteError, MutationOutcome, SelectOutcome};
use crate::params::Params;
use crate::sql::dialect::Dialect;

pub fn select_statement(
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
) -> CompileResult<Statement> {
    compile::select_statement(schema, source, params, options, Dialect::Sqlite)
}

pub fn insert_statement(
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
) -> CompileResult<Statement> {
    compile::insert_statement(schema, source, params, options, Dialect::Sqlite)
}

pub fn update_statement(
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
) -> CompileResult<Statement> {
    compile::update_statement(schema, source, params, options, Dialect::Sqlite)
}

pub fn delete_statement(
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
) -> CompileResult<Statement> {
    compile::delete_statement(schema, source, params, options, Dialect::Sqlite)
}

pub async fn execute_select(
    driver: &dyn Driver,
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
) -> Result<SelectOutcome, ExecuteError> {
    exec::execute_select(driver, schema, source, params, options, Dialect::Sqlite).await
}

pub async fn execute_select_simple(
    driver: &dyn Driver,
    schema: &Schema,
    source: &str,
) -> Result<SelectOutcome, ExecuteError> {
    exec::execute_select_simple(driver, schema, source, Dialect::Sqlite).await
}

pub async fn execute_insert(
    driver: &dyn Driver,
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
) -> Result<MutationOutcome, ExecuteError> {
    exec::execute_insert(driver, schema, source, params, options, Dialect::Sqlite).await
}

pub async fn execute_update(
    driver: &dyn Driver,
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
) -> Result<MutationOutcome, ExecuteError> {
    exec::execute_update(driver, schema, source, params, options, Dialect::Sqlite).await
}

pub async fn execute_delete(
    driver: &dyn Driver,
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
) -> Result<MutationOutcome, ExecuteError> {
    exec::execute_delete(driver, schema, source, params, options, Dialect::Sqlite).await
}
