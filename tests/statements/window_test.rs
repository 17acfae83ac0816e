use tinqer::{Dialect, Params, Schema, StatementOptions};

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

#[test]
fn test_row_number_projection() {
    let stmt = pg(
        "(p, _, h) => from(\"employees\").select(e => ({ name: e.name, \
         rn: h.window.rowNumber({ partitionBy: e.department_id, orderByDescending: e.salary }) }))",
    );
    insta::assert_snapshot!(
        stmt.sql,
        @r#"SELECT "name" AS "name", ROW_NUMBER() OVER (PARTITION BY "department_id" ORDER BY "salary" DESC) AS "rn" FROM "employees""#
    );
}

#[test]
fn test_rank_and_dense_rank() {
    let stmt = pg(
        "(p, _, h) => from(\"scores\").select(s => ({ r: h.window.rank({ orderBy: s.points }), \
         dr: h.window.denseRank({ orderBy: s.points }) }))",
    );
    assert_eq!(
        stmt.sql,
        "SELECT RANK() OVER (ORDER BY \"points\") AS \"r\", \
         DENSE_RANK() OVER (ORDER BY \"points\") AS \"dr\" FROM \"scores\""
    );
}

#[test]
fn test_multiple_partition_columns() {
    let stmt = pg(
        "(p, _, h) => from(\"sales\").select(s => ({ rn: h.window.rowNumber({ \
         partitionBy: [s.region, s.year], orderBy: s.amount }) }))",
    );
    assert_eq!(
        stmt.sql,
        "SELECT ROW_NUMBER() OVER (PARTITION BY \"region\", \"year\" ORDER BY \"amount\") AS \"rn\" \
         FROM \"sales\""
    );
}

#[test]
fn test_filter_on_window_alias_wraps_in_subquery() {
    let stmt = pg(
        "(p, _, h) => from(\"employees\")\
         .select(e => ({ name: e.name, rn: h.window.rowNumber({ \
         partitionBy: e.department_id, orderByDescending: e.salary }) }))\
         .where(r => r.rn === 1)",
    );
    insta::assert_snapshot!(
        stmt.sql,
        @r#"SELECT * FROM (SELECT "name" AS "name", ROW_NUMBER() OVER (PARTITION BY "department_id" ORDER BY "salary" DESC) AS "rn" FROM "employees") AS "employees" WHERE "rn" = $(__p1)"#
    );
}

#[test]
fn test_filter_on_plain_column_not_wrapped() {
    let stmt = pg(
        "(p, _, h) => from(\"employees\")\
         .select(e => ({ dept: e.department_id, rn: h.window.rowNumber({ orderBy: e.salary }) }))\
         .where(e => e.salary > 1000)",
    );
    assert!(!stmt.sql.contains("FROM (SELECT"));
}

#[test]
fn test_second_window_filter_stays_outside_subquery() {
    let stmt = pg(
        "(p, _, h) => from(\"employees\")\
         .select(e => ({ name: e.name, rn: h.window.rowNumber({ orderBy: e.salary }) }))\
         .where(r => r.rn >= 2).where(r => r.rn <= 5)",
    );
    assert_eq!(stmt.sql.matches("FROM (SELECT").count(), 1);
    assert!(stmt.sql.ends_with("WHERE \"rn\" >= $(__p1) AND \"rn\" <= $(__p2)"));
}
