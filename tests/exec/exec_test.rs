use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use tinqer::{
    params_from, Driver, DriverError, ExecuteError, MutationOutcome, Params, Row, Schema,
    SelectOutcome, StatementOptions,
};

/// In-memory fake driver: records every dispatched statement and replays
/// canned rows.
struct FakeDriver {
    rows: Vec<Row>,
    affected: u64,
    log: Mutex<Vec<(String, Params)>>,
}

impl FakeDriver {
    fn returning(rows: Vec<Row>) -> Self {
        Self {
            rows,
            affected: 0,
            log: Mutex::new(Vec::new()),
        }
    }

    fn affecting(affected: u64) -> Self {
        Self {
            rows: Vec::new(),
            affected,
            log: Mutex::new(Vec::new()),
        }
    }

    fn last_sql(&self) -> String {
        self.log
            .lock()
            .unwrap()
            .last()
            .map(|(sql, _)| sql.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn query(&self, sql: &str, params: &Params) -> Result<Vec<Row>, DriverError> {
        self.log
            .lock()
            .unwrap()
            .push((sql.to_string(), params.clone()));
        Ok(self.rows.clone())
    }

    async fn execute(&self, sql: &str, params: &Params) -> Result<u64, DriverError> {
        self.log
            .lock()
            .unwrap()
            .push((sql.to_string(), params.clone()));
        Ok(self.affected)
    }
}

fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
    let mut row = Row::new();
    for (key, value) in pairs {
        row.insert(key.to_string(), value.clone());
    }
    row
}

fn opts() -> StatementOptions {
    StatementOptions {
        cache: false,
        on_sql: None,
    }
}

#[tokio::test]
async fn test_execute_select_returns_rows() {
    let driver = FakeDriver::returning(vec![row(&[("id", json!(1))]), row(&[("id", json!(2))])]);
    let outcome = tinqer::postgres::execute_select(
        &driver,
        &Schema::new(),
        "p => from(\"users\")",
        &Params::new(),
        &opts(),
    )
    .await
    .expect("should execute");
    match outcome {
        SelectOutcome::Rows(rows) => assert_eq!(rows.len(), 2),
        other => panic!("expected rows, got {:?}", other),
    }
    assert_eq!(driver.last_sql(), "SELECT * FROM \"users\"");
}

#[tokio::test]
async fn test_execute_count_returns_scalar() {
    let driver = FakeDriver::returning(vec![row(&[("count", json!(42))])]);
    let outcome = tinqer::postgres::execute_select(
        &driver,
        &Schema::new(),
        "p => from(\"users\").count()",
        &Params::new(),
        &opts(),
    )
    .await
    .expect("should execute");
    assert_eq!(outcome, SelectOutcome::Scalar(Some(json!(42))));
}

#[tokio::test]
async fn test_execute_any_decodes_bool() {
    let driver = FakeDriver::returning(vec![row(&[("case", json!(1))])]);
    let outcome = tinqer::postgres::execute_select(
        &driver,
        &Schema::new(),
        "p => from(\"users\").any()",
        &Params::new(),
        &opts(),
    )
    .await
    .expect("should execute");
    assert_eq!(outcome, SelectOutcome::Bool(true));
}

#[tokio::test]
async fn test_execute_first_empty_is_error() {
    let driver = FakeDriver::returning(Vec::new());
    let err = tinqer::postgres::execute_select(
        &driver,
        &Schema::new(),
        "p => from(\"users\").first()",
        &Params::new(),
        &opts(),
    )
    .await
    .expect_err("should fail");
    assert!(matches!(err, ExecuteError::EmptyResult));
}

#[tokio::test]
async fn test_execute_first_or_default_empty_is_none() {
    let driver = FakeDriver::returning(Vec::new());
    let outcome = tinqer::postgres::execute_select(
        &driver,
        &Schema::new(),
        "p => from(\"users\").firstOrDefault()",
        &Params::new(),
        &opts(),
    )
    .await
    .expect("should execute");
    assert_eq!(outcome, SelectOutcome::Row(None));
}

#[tokio::test]
async fn test_execute_single_with_two_rows_is_error() {
    let driver = FakeDriver::returning(vec![row(&[("id", json!(1))]), row(&[("id", json!(2))])]);
    let err = tinqer::postgres::execute_select(
        &driver,
        &Schema::new(),
        "p => from(\"users\").single()",
        &Params::new(),
        &opts(),
    )
    .await
    .expect_err("should fail");
    assert!(matches!(err, ExecuteError::MultipleResults));
}

#[tokio::test]
async fn test_execute_select_simple_passes_no_params() {
    let driver = FakeDriver::returning(Vec::new());
    let outcome = tinqer::sqlite::execute_select_simple(
        &driver,
        &Schema::new(),
        "p => from(\"exec_simple_users\")",
    )
    .await
    .expect("should execute");
    assert_eq!(outcome, SelectOutcome::Rows(Vec::new()));
    assert_eq!(driver.last_sql(), "SELECT * FROM \"exec_simple_users\"");
}

#[tokio::test]
async fn test_execute_update_reports_affected_rows() {
    let driver = FakeDriver::affecting(3);
    let outcome = tinqer::postgres::execute_update(
        &driver,
        &Schema::new(),
        "p => update(\"users\").set({ active: false }).where(u => u.age > p.cutoff)",
        &params_from([("cutoff", 90i64)]),
        &opts(),
    )
    .await
    .expect("should execute");
    assert_eq!(outcome, MutationOutcome::Affected(3));
    assert!(driver.last_sql().starts_with("UPDATE \"users\" SET"));
}

#[tokio::test]
async fn test_execute_insert_with_returning_queries_rows() {
    let driver = FakeDriver::returning(vec![row(&[("id", json!(7))])]);
    let outcome = tinqer::postgres::execute_insert(
        &driver,
        &Schema::new(),
        "p => insertInto(\"users\").values({ name: p.name }).returning(u => u.id)",
        &params_from([("name", "Ann")]),
        &opts(),
    )
    .await
    .expect("should execute");
    match outcome {
        MutationOutcome::Rows(rows) => assert_eq!(rows[0].get("id"), Some(&json!(7))),
        other => panic!("expected rows, got {:?}", other),
    }
}

#[tokio::test]
async fn test_execute_delete_affected() {
    let driver = FakeDriver::affecting(1);
    let outcome = tinqer::sqlite::execute_delete(
        &driver,
        &Schema::new(),
        "p => deleteFrom(\"users\").where(u => u.id === p.id)",
        &params_from([("id", 9i64)]),
        &opts(),
    )
    .await
    .expect("should execute");
    assert_eq!(outcome, MutationOutcome::Affected(1));
    assert_eq!(
        driver.last_sql(),
        "DELETE FROM \"users\" WHERE \"id\" = @id"
    );
}

#[tokio::test]
async fn test_on_sql_observes_before_dispatch() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    let seen = Arc::new(AtomicBool::new(false));
    let flag = seen.clone();
    let options = StatementOptions {
        cache: false,
        on_sql: Some(Arc::new(move |stmt: &tinqer::Statement| {
            assert!(stmt.sql.starts_with("SELECT"));
            flag.store(true, Ordering::SeqCst);
        })),
    };
    let driver = FakeDriver::returning(Vec::new());
    tinqer::postgres::execute_select(
        &driver,
        &Schema::new(),
        "p => from(\"users\")",
        &Params::new(),
        &options,
    )
    .await
    .expect("should execute");
    assert!(seen.load(Ordering::SeqCst));
}
