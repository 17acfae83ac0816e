//! The compiler's cross-cutting laws: auto-parameter round-trips,
//! determinism, caller precedence, WHERE-chain equivalence, NULL rewriting,
//! and array-parameter handling per dialect.

use tinqer::{params_from, Dialect, ParamValue, Params, Schema, StatementOptions};

fn opts() -> StatementOptions {
    StatementOptions {
        cache: false,
        on_sql: None,
    }
}

fn compile(source: &str, params: Params, dialect: Dialect) -> tinqer::Statement {
    tinqer::select_statement(&Schema::new(), source, &params, &opts(), dialect)
        .expect("should compile")
}

#[test]
fn test_constants_round_trip_into_params() {
    let stmt = compile(
        "p => from(\"users\").where(u => u.age >= 30 && u.name === 'Ann' && u.active === true)",
        Params::new(),
        Dialect::Postgres,
    );
    assert_eq!(stmt.params.get("__p1"), Some(&ParamValue::Int(30)));
    assert_eq!(
        stmt.params.get("__p2"),
        Some(&ParamValue::String("Ann".into()))
    );
    assert_eq!(stmt.params.get("__p3"), Some(&ParamValue::Bool(true)));
    // No literal of those kinds survives in the SQL text.
    assert!(!stmt.sql.contains("30"));
    assert!(!stmt.sql.contains("Ann"));
    assert!(!stmt.sql.contains("true"));
}

#[test]
fn test_byte_identical_output_across_runs() {
    let source = "p => from(\"users\").where(u => u.age >= 30).orderBy(u => u.name).take(5)";
    let first = compile(source, Params::new(), Dialect::Postgres);
    let second = compile(source, Params::new(), Dialect::Postgres);
    assert_eq!(first.sql, second.sql);
    assert_eq!(first.params, second.params);
}

#[test]
fn test_caller_param_precedence() {
    let stmt = compile(
        "p => from(\"users\").where(u => u.age >= 30)",
        params_from([("__p1", 65i64)]),
        Dialect::Postgres,
    );
    assert_eq!(stmt.params.get("__p1"), Some(&ParamValue::Int(65)));
    assert_eq!(stmt.params.len(), 1);
}

#[test]
fn test_chained_wheres_match_conjunction() {
    let chained = compile(
        "p => from(\"users\").where(u => u.age >= 18).where(u => u.age <= 65)",
        Params::new(),
        Dialect::Postgres,
    );
    let conjoined = compile(
        "p => from(\"users\").where(u => u.age >= 18 && u.age <= 65)",
        Params::new(),
        Dialect::Postgres,
    );
    // Identical parameter sets; the SQL differs only in the top-level AND
    // joiner versus nested parentheses.
    assert_eq!(chained.params, conjoined.params);
    assert_eq!(
        chained.sql,
        "SELECT * FROM \"users\" WHERE \"age\" >= $(__p1) AND \"age\" <= $(__p2)"
    );
    assert_eq!(
        conjoined.sql,
        "SELECT * FROM \"users\" WHERE (\"age\" >= $(__p1) AND \"age\" <= $(__p2))"
    );
}

#[test]
fn test_null_rewriting_generates_no_param() {
    let eq = compile(
        "p => from(\"users\").where(u => u.deleted_at === null)",
        Params::new(),
        Dialect::Postgres,
    );
    assert_eq!(
        eq.sql,
        "SELECT * FROM \"users\" WHERE \"deleted_at\" IS NULL"
    );
    assert!(eq.params.is_empty());

    let ne = compile(
        "p => from(\"users\").where(u => u.deleted_at !== null)",
        Params::new(),
        Dialect::Postgres,
    );
    assert_eq!(
        ne.sql,
        "SELECT * FROM \"users\" WHERE \"deleted_at\" IS NOT NULL"
    );
    assert!(ne.params.is_empty());
}

#[test]
fn test_array_membership_postgres() {
    let stmt = compile(
        "p => from(\"users\").where(u => p.ids.includes(u.id))",
        params_from([("ids", vec![1i64, 3, 5])]),
        Dialect::Postgres,
    );
    assert_eq!(stmt.sql, "SELECT * FROM \"users\" WHERE \"id\" = ANY($(ids))");
    assert_eq!(
        stmt.params.get("ids"),
        Some(&ParamValue::Array(vec![
            ParamValue::Int(1),
            ParamValue::Int(3),
            ParamValue::Int(5),
        ]))
    );
}

#[test]
fn test_array_membership_sqlite_expands() {
    let stmt = compile(
        "p => from(\"users\").where(u => p.ids.includes(u.id))",
        params_from([("ids", vec![1i64, 3, 5])]),
        Dialect::Sqlite,
    );
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE \"id\" IN (@ids_0, @ids_1, @ids_2)"
    );
    assert_eq!(stmt.params.get("ids_0"), Some(&ParamValue::Int(1)));
    assert_eq!(stmt.params.get("ids_1"), Some(&ParamValue::Int(3)));
    assert_eq!(stmt.params.get("ids_2"), Some(&ParamValue::Int(5)));
    // The original array remains in the map.
    assert!(matches!(stmt.params.get("ids"), Some(ParamValue::Array(_))));
}

#[test]
fn test_negated_membership() {
    let stmt = compile(
        "p => from(\"users\").where(u => !p.ids.includes(u.id))",
        params_from([("ids", vec![2i64, 4])]),
        Dialect::Postgres,
    );
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE \"id\" <> ALL($(ids))"
    );

    let stmt = compile(
        "p => from(\"users\").where(u => !p.ids.includes(u.id))",
        params_from([("ids", vec![2i64, 4])]),
        Dialect::Sqlite,
    );
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE \"id\" NOT IN (@ids_0, @ids_1)"
    );
}

#[test]
fn test_array_literal_membership() {
    let stmt = compile(
        "p => from(\"users\").where(u => [1, 3].includes(u.id))",
        Params::new(),
        Dialect::Postgres,
    );
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE \"id\" = ANY($(__p1))"
    );
    assert_eq!(
        stmt.params.get("__p1"),
        Some(&ParamValue::Array(vec![
            ParamValue::Int(1),
            ParamValue::Int(3),
        ]))
    );
}

#[test]
fn test_negative_literal_folds_into_param() {
    let stmt = compile(
        "p => from(\"ledger\").where(l => l.balance < -100)",
        Params::new(),
        Dialect::Postgres,
    );
    assert_eq!(stmt.params.get("__p1"), Some(&ParamValue::Int(-100)));
    assert!(!stmt.sql.contains("-100"));
}

#[test]
fn test_unknown_identifier_is_fatal() {
    let err = tinqer::select_statement(
        &Schema::new(),
        "p => from(\"users\").where(u => missing.age > 3)",
        &Params::new(),
        &opts(),
        Dialect::Postgres,
    )
    .expect_err("should fail");
    assert!(err.to_string().contains("missing"));
}

#[test]
fn test_unsupported_syntax_is_fatal() {
    let err = tinqer::select_statement(
        &Schema::new(),
        "p => from(\"users\").where(u => u.name.trim() === 'x')",
        &Params::new(),
        &opts(),
        Dialect::Postgres,
    )
    .expect_err("should fail");
    assert!(err.to_string().contains("trim"));
}
