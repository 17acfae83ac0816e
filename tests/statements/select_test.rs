use tinqer::{params_from, Dialect, ParamValue, Params, Schema, StatementOptions};

fn opts() -> StatementOptions {
    StatementOptions {
        cache: false,
        on_sql: None,
    }
}

fn pg(source: &str) -> tinqer::Statement {
    tinqer::select_statement(&Schema::new(), source, &Params::new(), &opts(), Dialect::Postgres)
        .expect("should compile")
}

fn sqlite(source: &str, params: Params) -> tinqer::Statement {
    tinqer::select_statement(&Schema::new(), source, &params, &opts(), Dialect::Sqlite)
        .expect("should compile")
}

#[test]
fn test_bare_from_selects_star() {
    let stmt = pg("p => from(\"users\")");
    assert_eq!(stmt.sql, "SELECT * FROM \"users\"");
    assert!(stmt.params.is_empty());
}

#[test]
fn test_null_guard_and_comparison() {
    let stmt = pg("p => from(\"users\").where(u => u.age !== null && u.age >= 30).count()");
    insta::assert_snapshot!(
        stmt.sql,
        @r#"SELECT COUNT(*) FROM "users" WHERE ("age" IS NOT NULL AND "age" >= $(__p1))"#
    );
    assert_eq!(stmt.params.get("__p1"), Some(&ParamValue::Int(30)));
    assert_eq!(stmt.params.len(), 1);
}

#[test]
fn test_starts_with_and_literal_comparison_sqlite() {
    let stmt = sqlite(
        "p => from(\"users\").where(u => u.name.startsWith('J') && u.is_active === 1)",
        Params::new(),
    );
    insta::assert_snapshot!(
        stmt.sql,
        @r#"SELECT * FROM "users" WHERE ("name" LIKE @__p1 || '%' AND "is_active" = @__p2)"#
    );
    assert_eq!(
        stmt.params.get("__p1"),
        Some(&ParamValue::String("J".into()))
    );
    assert_eq!(stmt.params.get("__p2"), Some(&ParamValue::Int(1)));
}

#[test]
fn test_ends_with_and_includes() {
    let stmt = pg("p => from(\"users\").where(u => u.email.endsWith('.org'))");
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE \"email\" LIKE '%' || $(__p1)"
    );

    let stmt = pg("p => from(\"users\").where(u => u.name.includes('an'))");
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE \"name\" LIKE '%' || $(__p1) || '%'"
    );
}

#[test]
fn test_projection_aliases_every_property() {
    let stmt = pg("p => from(\"users\").select(u => ({ id: u.id, fullName: u.name }))");
    assert_eq!(
        stmt.sql,
        "SELECT \"id\" AS \"id\", \"name\" AS \"fullName\" FROM \"users\""
    );
}

#[test]
fn test_second_select_replaces_projection() {
    let stmt =
        pg("p => from(\"users\").select(u => ({ a: u.a })).select(u => ({ b: u.b }))");
    assert_eq!(stmt.sql, "SELECT \"b\" AS \"b\" FROM \"users\"");
}

#[test]
fn test_order_take_skip_with_param_counts() {
    let stmt = pg("p => from(\"users\").orderBy(u => u.age).thenByDescending(u => u.name).take(p.limit).skip(10)");
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" ORDER BY \"age\" ASC, \"name\" DESC LIMIT $(limit) OFFSET $(__p1)"
    );
    assert_eq!(stmt.params.get("__p1"), Some(&ParamValue::Int(10)));
}

#[test]
fn test_distinct() {
    let stmt = pg("p => from(\"users\").select(u => u.department_id).distinct()");
    assert_eq!(stmt.sql, "SELECT DISTINCT \"department_id\" FROM \"users\"");
}

#[test]
fn test_reverse_flips_order() {
    let stmt = pg("p => from(\"users\").orderBy(u => u.age).reverse()");
    assert_eq!(stmt.sql, "SELECT * FROM \"users\" ORDER BY \"age\" DESC");
}

#[test]
fn test_first_emits_limit_one() {
    let stmt = pg("p => from(\"users\").first(u => u.id === 5)");
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE \"id\" = $(__p1) LIMIT 1"
    );
}

#[test]
fn test_single_fetches_two_rows() {
    let stmt = pg("p => from(\"users\").single(u => u.id === 5)");
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE \"id\" = $(__p1) LIMIT 2"
    );
}

#[test]
fn test_last_without_order_uses_sentinel() {
    let stmt = pg("p => from(\"users\").last()");
    assert_eq!(stmt.sql, "SELECT * FROM \"users\" ORDER BY 1 DESC LIMIT 1");
}

#[test]
fn test_any_and_all_probes() {
    let stmt = pg("p => from(\"users\").any(u => u.age > 100)");
    assert_eq!(
        stmt.sql,
        "SELECT CASE WHEN EXISTS (SELECT * FROM \"users\" WHERE \"age\" > $(__p1)) THEN 1 ELSE 0 END"
    );

    let stmt = pg("p => from(\"users\").all(u => u.age >= 18)");
    assert_eq!(
        stmt.sql,
        "SELECT CASE WHEN NOT EXISTS (SELECT * FROM \"users\" WHERE NOT (\"age\" >= $(__p1))) THEN 1 ELSE 0 END"
    );
}

#[test]
fn test_contains_over_projection() {
    let stmt = pg("p => from(\"users\").select(u => u.id).contains(5)");
    assert_eq!(
        stmt.sql,
        "SELECT CASE WHEN EXISTS (SELECT \"id\" FROM \"users\" WHERE \"id\" = $(__p1)) THEN 1 ELSE 0 END"
    );
}

#[test]
fn test_sum_and_average_terminals() {
    let stmt = pg("p => from(\"orders\").sum(o => o.amount)");
    assert_eq!(stmt.sql, "SELECT SUM(\"amount\") FROM \"orders\"");

    let stmt = pg("p => from(\"orders\").average(o => o.amount)");
    assert_eq!(stmt.sql, "SELECT AVG(\"amount\") FROM \"orders\"");
}

#[test]
fn test_conditional_projection_becomes_case() {
    let stmt =
        pg("p => from(\"users\").select(u => ({ band: u.age >= 18 ? 'adult' : 'minor' }))");
    assert_eq!(
        stmt.sql,
        "SELECT CASE WHEN \"age\" >= $(__p1) THEN $(__p2) ELSE $(__p3) END AS \"band\" FROM \"users\""
    );
}

#[test]
fn test_nullish_projection_becomes_coalesce() {
    let stmt = pg("p => from(\"users\").select(u => ({ name: u.nickname ?? u.name }))");
    assert_eq!(
        stmt.sql,
        "SELECT COALESCE(\"nickname\", \"name\") AS \"name\" FROM \"users\""
    );
}

#[test]
fn test_string_concat_projection() {
    let stmt = pg("p => from(\"users\").select(u => ({ full: u.first + ' ' + u.last }))");
    assert_eq!(
        stmt.sql,
        "SELECT ((\"first\" || $(__p1)) || \"last\") AS \"full\" FROM \"users\""
    );
}

#[test]
fn test_lower_upper_methods() {
    let stmt = pg("p => from(\"users\").where(u => u.email.toLowerCase() === p.email)");
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE LOWER(\"email\") = $(email)"
    );
}

#[test]
fn test_case_insensitive_helper() {
    let stmt = pg("(p, _, h) => from(\"users\").where(u => h.functions.iequals(u.name, p.name))");
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE LOWER(\"name\") = LOWER($(name))"
    );
}

#[test]
fn test_union_and_concat() {
    let stmt = pg("p => from(\"users\").union(from(\"admins\"))");
    assert_eq!(
        stmt.sql,
        "(SELECT * FROM \"users\") UNION (SELECT * FROM \"admins\")"
    );

    let stmt = pg("p => from(\"users\").concat(from(\"admins\"))");
    assert_eq!(
        stmt.sql,
        "(SELECT * FROM \"users\") UNION ALL (SELECT * FROM \"admins\")"
    );
}

#[test]
fn test_boolean_column_predicate() {
    let stmt = pg("p => from(\"users\").where(u => !u.deleted)");
    assert_eq!(stmt.sql, "SELECT * FROM \"users\" WHERE NOT \"deleted\"");
}

#[test]
fn test_query_param_predicate() {
    let stmt = pg("p => from(\"users\").where(u => p.includeAll || u.active === true)");
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE ($(includeAll) OR \"active\" = $(__p1))"
    );
}

#[test]
fn test_nested_param_placeholder_forms() {
    let stmt = pg("p => from(\"users\").where(u => u.age >= p.filter.age)");
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE \"age\" >= $(filter.age)"
    );

    let mut filter = std::collections::BTreeMap::new();
    filter.insert("age".to_string(), ParamValue::Int(21));
    let stmt = sqlite(
        "p => from(\"users\").where(u => u.age >= p.filter.age)",
        params_from([("filter", ParamValue::Object(filter))]),
    );
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE \"age\" >= @filter_age"
    );
    assert_eq!(stmt.params.get("filter_age"), Some(&ParamValue::Int(21)));
}
