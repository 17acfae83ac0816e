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
fn test_group_by_with_key_and_count() {
    let stmt = pg(
        "p => from(\"users\").groupBy(u => u.department_id)\
         .select(g => ({ department: g.key, count: g.count() }))",
    );
    insta::assert_snapshot!(
        stmt.sql,
        @r#"SELECT "department_id" AS "department", COUNT(*) AS "count" FROM "users" GROUP BY "department_id""#
    );
}

#[test]
fn test_group_by_without_select_projects_key() {
    let stmt = pg("p => from(\"users\").groupBy(u => u.department_id)");
    assert_eq!(
        stmt.sql,
        "SELECT \"department_id\" FROM \"users\" GROUP BY \"department_id\""
    );
}

#[test]
fn test_composite_key_projects_named_columns() {
    let stmt = pg("p => from(\"orders\").groupBy(o => ({ y: o.year, r: o.region }))");
    assert_eq!(
        stmt.sql,
        "SELECT \"year\" AS \"y\", \"region\" AS \"r\" FROM \"orders\" GROUP BY \"year\", \"region\""
    );
}

#[test]
fn test_composite_key_property_access() {
    let stmt = pg(
        "p => from(\"orders\").groupBy(o => ({ y: o.year, r: o.region }))\
         .select(g => ({ year: g.key.y, total: g.sum(o => o.amount) }))",
    );
    assert_eq!(
        stmt.sql,
        "SELECT \"year\" AS \"year\", SUM(\"amount\") AS \"total\" \
         FROM \"orders\" GROUP BY \"year\", \"region\""
    );
}

#[test]
fn test_group_aggregates() {
    let stmt = pg(
        "p => from(\"orders\").groupBy(o => o.region)\
         .select(g => ({ region: g.key, total: g.sum(o => o.amount), avg: g.average(o => o.amount), \
         lo: g.min(o => o.amount), hi: g.max(o => o.amount) }))",
    );
    assert_eq!(
        stmt.sql,
        "SELECT \"region\" AS \"region\", SUM(\"amount\") AS \"total\", AVG(\"amount\") AS \"avg\", \
         MIN(\"amount\") AS \"lo\", MAX(\"amount\") AS \"hi\" FROM \"orders\" GROUP BY \"region\""
    );
}

#[test]
fn test_where_then_group() {
    let stmt = pg(
        "p => from(\"orders\").where(o => o.amount > 0).groupBy(o => o.region)\
         .select(g => ({ region: g.key, n: g.count() }))",
    );
    assert_eq!(
        stmt.sql,
        "SELECT \"region\" AS \"region\", COUNT(*) AS \"n\" FROM \"orders\" \
         WHERE \"amount\" > $(__p1) GROUP BY \"region\""
    );
}
