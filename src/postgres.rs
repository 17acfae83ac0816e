//! PostgreSQL entry points.
//!
//! The core entry points with the dialect fixed to [`Dialect::Postgres`]:
//! pg-promise style `$(name)` placeholders and native array parameters.

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
    compile::select_statement(schema, source, params, options, Dialect::Postgres)
}

pub fn insert_statement(
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
) -> CompileResult<Statement> {
    compile::insert_statement(schema, source, params, options, Dialect::Postgres)
}

pub fn update_statement(
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
) -> CompileResult<Statement> {
    compile::update_statement(schema, source, params, options, Dialect::Postgres)
}

pub fn delete_statement(
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
) -> CompileResult<Statement> {
    compile::delete_statement(schema, source, params, options, Dialect::Postgres)
}

pub async fn execute_select(
    driver: &dyn Driver,
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
) -> Result<SelectOutcome, ExecuteError> {
    exec::execute_select(driver, schema, source, params, options, Dialect::Postgres).await
}

pub async fn execute_select_simple(
    driver: &dyn Driver,
    schema: &Schema,
    source: &str,
) -> Result<SelectOutcome, ExecuteError> {
    exec::execute_select_simple(driver, schema, source, Dialect::Postgres).await
}

pub async fn execute_insert(
    driver: &dyn Driver,
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
) -> Result<MutationOutcome, ExecuteError> {
    exec::execute_insert(driver, schema, source, params, options, Dialect::Postgres).await
}

pub async fn execute_update(
    driver: &dyn Driver,
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
) -> Result<MutationOutcome, ExecuteError> {
    exec::execute_update(driver, schema, source, params, options, Dialect::Postgres).await
}

pub async fn execute_delete(
    driver: &dyn Driver,
    schema: &Schema,
    source: &str,
    params: &Params,
    options: &StatementOptions,
) -> Result<MutationOutcome, ExecuteError> {
    exec::execute_delete(driver, schema, source, params, options, Dialect::Postgres).await
}
