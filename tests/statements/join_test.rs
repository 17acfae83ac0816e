use tinqer::{CompileError, Dialect, Params, Schema, StatementOptions};

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

fn pg_err(source: &str) -> CompileError {
    tinqer::select_statement(&Schema::new(), source, &Params::new(), &opts(), Dialect::Postgres)
        .expect_err("should fail")
}

#[test]
fn test_inner_join_with_projection() {
    let stmt = pg(
        "p => from(\"users\")\
         .join(from(\"departments\"), u => u.department_id, d => d.id, (u, d) => ({ u, d }))\
         .select(j => ({ userName: j.u.name, deptName: j.d.name }))",
    );
    insta::assert_snapshot!(
        stmt.sql,
        @r#"SELECT "t0"."name" AS "userName", "t1"."name" AS "deptName" FROM "users" AS "t0" INNER JOIN "departments" AS "t1" ON "t0"."department_id" = "t1"."id""#
    );
}

#[test]
fn test_join_result_selector_as_projection() {
    let stmt = pg(
        "p => from(\"users\")\
         .join(from(\"departments\"), u => u.department_id, d => d.id, \
         (u, d) => ({ name: u.name, dept: d.name }))",
    );
    assert_eq!(
        stmt.sql,
        "SELECT \"t0\".\"name\" AS \"name\", \"t1\".\"name\" AS \"dept\" \
         FROM \"users\" AS \"t0\" INNER JOIN \"departments\" AS \"t1\" \
         ON \"t0\".\"department_id\" = \"t1\".\"id\""
    );
}

#[test]
fn test_join_without_select_is_rejected() {
    let err = pg_err(
        "p => from(\"users\")\
         .join(from(\"departments\"), u => u.department_id, d => d.id, (u, d) => ({ u, d }))",
    );
    assert!(matches!(err, CompileError::Lower(_)));
}

#[test]
fn test_join_with_aggregate_terminal_needs_no_projection() {
    let stmt = pg(
        "p => from(\"users\")\
         .join(from(\"departments\"), u => u.department_id, d => d.id, (u, d) => ({ u, d }))\
         .count()",
    );
    assert_eq!(
        stmt.sql,
        "SELECT COUNT(*) FROM \"users\" AS \"t0\" INNER JOIN \"departments\" AS \"t1\" \
         ON \"t0\".\"department_id\" = \"t1\".\"id\""
    );
}

#[test]
fn test_where_before_join_binds_outer_alias() {
    let stmt = pg(
        "p => from(\"users\").where(u => u.age >= 21)\
         .join(from(\"departments\"), u => u.department_id, d => d.id, (u, d) => ({ u, d }))\
         .select(j => ({ name: j.u.name }))",
    );
    assert_eq!(
        stmt.sql,
        "SELECT \"t0\".\"name\" AS \"name\" FROM \"users\" AS \"t0\" \
         INNER JOIN \"departments\" AS \"t1\" ON \"t0\".\"department_id\" = \"t1\".\"id\" \
         WHERE \"t0\".\"age\" >= $(__p1)"
    );
}

#[test]
fn test_where_after_join_through_shape() {
    let stmt = pg(
        "p => from(\"users\")\
         .join(from(\"departments\"), u => u.department_id, d => d.id, (u, d) => ({ u, d }))\
         .where(j => j.d.name === p.dept)\
         .select(j => ({ name: j.u.name }))",
    );
    assert_eq!(
        stmt.sql,
        "SELECT \"t0\".\"name\" AS \"name\" FROM \"users\" AS \"t0\" \
         INNER JOIN \"departments\" AS \"t1\" ON \"t0\".\"department_id\" = \"t1\".\"id\" \
         WHERE \"t1\".\"name\" = $(dept)"
    );
}

#[test]
fn test_group_join_default_if_empty_renders_left_outer() {
    let stmt = pg(
        "p => from(\"users\")\
         .groupJoin(from(\"departments\"), u => u.department_id, d => d.id, (u, ds) => ({ u, ds }))\
         .selectMany(x => x.ds.defaultIfEmpty(), (x, d) => ({ name: x.u.name, dept: d.name }))",
    );
    insta::assert_snapshot!(
        stmt.sql,
        @r#"SELECT "t0"."name" AS "name", CASE WHEN "t1"."id" IS NOT NULL THEN "t1"."name" ELSE NULL END AS "dept" FROM "users" AS "t0" LEFT OUTER JOIN "departments" AS "t1" ON "t0"."department_id" = "t1"."id""#
    );
}

#[test]
fn test_select_many_cross_join() {
    let stmt = pg(
        "p => from(\"sizes\").selectMany(s => from(\"colors\"), \
         (s, c) => ({ size: s.name, color: c.name }))",
    );
    assert_eq!(
        stmt.sql,
        "SELECT \"t0\".\"name\" AS \"size\", \"t1\".\"name\" AS \"color\" \
         FROM \"sizes\" AS \"t0\" CROSS JOIN \"colors\" AS \"t1\""
    );
}

#[test]
fn test_three_table_join_aliases() {
    let stmt = pg(
        "p => from(\"users\")\
         .join(from(\"departments\"), u => u.department_id, d => d.id, (u, d) => ({ u, d }))\
         .join(from(\"companies\"), j => j.d.company_id, c => c.id, (j, c) => ({ j, c }))\
         .select(r => ({ name: r.j.u.name, company: r.c.name }))",
    );
    assert_eq!(
        stmt.sql,
        "SELECT \"t0\".\"name\" AS \"name\", \"t2\".\"name\" AS \"company\" \
         FROM \"users\" AS \"t0\" \
         INNER JOIN \"departments\" AS \"t1\" ON \"t0\".\"department_id\" = \"t1\".\"id\" \
         INNER JOIN \"companies\" AS \"t2\" ON \"t1\".\"company_id\" = \"t2\".\"id\""
    );
}
