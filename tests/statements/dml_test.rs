use tinqer::{params_from, CompileError, Dialect, ParamValue, Params, Schema, StatementOptions};

fn opts() -> StatementOptions {
    StatementOptions {
        cache: false,
        on_sql: None,
    }
}

#[test]
fn test_insert_parameterises_values() {
    let stmt = tinqer::insert_statement(
        &Schema::new(),
        "p => insertInto(\"users\").values({ name: 'Alice', age: 30 })",
        &Params::new(),
        &opts(),
        Dialect::Sqlite,
    )
    .expect("should compile");
    insta::assert_snapshot!(
        stmt.sql,
        @r#"INSERT INTO "users" ("name","age") VALUES (@__p1,@__p2)"#
    );
    assert_eq!(
        stmt.params.get("__p1"),
        Some(&ParamValue::String("Alice".into()))
    );
    assert_eq!(stmt.params.get("__p2"), Some(&ParamValue::Int(30)));
}

#[test]
fn test_insert_with_caller_params_and_returning() {
    let stmt = tinqer::insert_statement(
        &Schema::new(),
        "p => insertInto(\"users\").values({ name: p.name }).returning(u => u.id)",
        &params_from([("name", "Bob")]),
        &opts(),
        Dialect::Postgres,
    )
    .expect("should compile");
    assert_eq!(
        stmt.sql,
        "INSERT INTO \"users\" (\"name\") VALUES ($(name)) RETURNING \"id\""
    );
}

#[test]
fn test_update_with_where() {
    let stmt = tinqer::update_statement(
        &Schema::new(),
        "p => update(\"users\").set({ age: 26 }).where(u => u.id === 5)",
        &Params::new(),
        &opts(),
        Dialect::Postgres,
    )
    .expect("should compile");
    insta::assert_snapshot!(
        stmt.sql,
        @r#"UPDATE "users" SET "age" = $(__p1) WHERE "id" = $(__p2)"#
    );
    assert_eq!(stmt.params.get("__p1"), Some(&ParamValue::Int(26)));
    assert_eq!(stmt.params.get("__p2"), Some(&ParamValue::Int(5)));
}

#[test]
fn test_update_without_where_throws_before_sql() {
    let err = tinqer::update_statement(
        &Schema::new(),
        "p => update(\"users\").set({ age: 26 })",
        &Params::new(),
        &opts(),
        Dialect::Postgres,
    )
    .expect_err("should fail");
    match err {
        CompileError::Lower(lower) => {
            assert!(lower.to_string().contains("allowFullTableUpdate"));
        }
        other => panic!("expected a lowering error, got {:?}", other),
    }
}

#[test]
fn test_update_allow_full_table() {
    let stmt = tinqer::update_statement(
        &Schema::new(),
        "p => update(\"users\").set({ active: false }).allowFullTableUpdate()",
        &Params::new(),
        &opts(),
        Dialect::Postgres,
    )
    .expect("should compile");
    assert_eq!(stmt.sql, "UPDATE \"users\" SET \"active\" = $(__p1)");
}

#[test]
fn test_update_returning_projection() {
    let stmt = tinqer::update_statement(
        &Schema::new(),
        "p => update(\"users\").set({ age: p.age }).where(u => u.id === p.id)\
         .returning(u => ({ id: u.id, age: u.age }))",
        &params_from([("age", 30i64), ("id", 7i64)]),
        &opts(),
        Dialect::Postgres,
    )
    .expect("should compile");
    assert_eq!(
        stmt.sql,
        "UPDATE \"users\" SET \"age\" = $(age) WHERE \"id\" = $(id) \
         RETURNING \"id\" AS \"id\", \"age\" AS \"age\""
    );
}

#[test]
fn test_update_expression_assignment() {
    let stmt = tinqer::update_statement(
        &Schema::new(),
        "p => update(\"counters\").set(c => ({ value: c.value + 1 })).where(c => c.name === p.name)",
        &params_from([("name", "hits")]),
        &opts(),
        Dialect::Sqlite,
    )
    .expect("should compile");
    assert_eq!(
        stmt.sql,
        "UPDATE \"counters\" SET \"value\" = (\"value\" + @__p1) WHERE \"name\" = @name"
    );
}

#[test]
fn test_delete_with_where() {
    let stmt = tinqer::delete_statement(
        &Schema::new(),
        "p => deleteFrom(\"users\").where(u => u.active === false)",
        &Params::new(),
        &opts(),
        Dialect::Postgres,
    )
    .expect("should compile");
    assert_eq!(stmt.sql, "DELETE FROM \"users\" WHERE \"active\" = $(__p1)");
}

#[test]
fn test_delete_without_where_throws() {
    let err = tinqer::delete_statement(
        &Schema::new(),
        "p => deleteFrom(\"users\")",
        &Params::new(),
        &opts(),
        Dialect::Postgres,
    )
    .expect_err("should fail");
    assert!(matches!(err, CompileError::Lower(_)));
}

#[test]
fn test_delete_allow_full_table() {
    let stmt = tinqer::delete_statement(
        &Schema::new(),
        "p => deleteFrom(\"sessions\").allowFullTableDelete()",
        &Params::new(),
        &opts(),
        Dialect::Sqlite,
    )
    .expect("should compile");
    assert_eq!(stmt.sql, "DELETE FROM \"sessions\"");
}

#[test]
fn test_sqlite_coerces_boolean_against_column() {
    let stmt = tinqer::update_statement(
        &Schema::new(),
        "p => update(\"users\").set({ is_active: true }).where(u => u.id === 1)",
        &Params::new(),
        &opts(),
        Dialect::Sqlite,
    )
    .expect("should compile");
    // SQLite stores booleans as INTEGER; the provenance record drives the
    // coercion.
    assert_eq!(stmt.params.get("__p1"), Some(&ParamValue::Int(1)));
}

#[test]
fn test_postgres_keeps_boolean_params() {
    let stmt = tinqer::update_statement(
        &Schema::new(),
        "p => update(\"users\").set({ is_active: true }).where(u => u.id === 1)",
        &Params::new(),
        &opts(),
        Dialect::Postgres,
    )
    .expect("should compile");
    assert_eq!(stmt.params.get("__p1"), Some(&ParamValue::Bool(true)));
}

#[test]
fn test_schema_namespace_on_dml() {
    let stmt = tinqer::delete_statement(
        &Schema::with_namespace("app"),
        "p => deleteFrom(\"users\").allowFullTableDelete()",
        &Params::new(),
        &opts(),
        Dialect::Postgres,
    )
    .expect("should compile");
    assert_eq!(stmt.sql, "DELETE FROM \"app\".\"users\"");
}
