use tinqer::{Dialect, ParamValue, Params, Schema, SelectPlan, StatementOptions};

fn opts() -> StatementOptions {
    StatementOptions {
        cache: false,
        on_sql: None,
    }
}

fn render(plan: &SelectPlan, dialect: Dialect) -> tinqer::Statement {
    plan.to_statement(&Params::new(), &opts(), dialect)
        .expect("should render")
}

#[test]
fn test_parse_then_extend() {
    let plan = SelectPlan::parse(&Schema::new(), "p => from(\"users\")").expect("parses");
    let plan = plan
        .filter("u => u.age >= 18")
        .and_then(|p| p.order_by("u => u.name"))
        .expect("appends");
    let stmt = render(&plan, Dialect::Postgres);
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE \"age\" >= $(__p1) ORDER BY \"name\" ASC"
    );
}

#[test]
fn test_extension_preserves_parsed_predicates() {
    let plan = SelectPlan::parse(
        &Schema::new(),
        "p => from(\"users\").where(u => u.active === true)",
    )
    .expect("parses");
    let plan = plan.filter("u => u.age >= 21").expect("appends");
    let stmt = render(&plan, Dialect::Postgres);
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE \"active\" = $(__p1) AND \"age\" >= $(__p2)"
    );
    assert_eq!(stmt.params.get("__p1"), Some(&ParamValue::Bool(true)));
    assert_eq!(stmt.params.get("__p2"), Some(&ParamValue::Int(21)));
}

#[test]
fn test_select_append_replaces_projection() {
    let plan = SelectPlan::parse(&Schema::new(), "p => from(\"users\")").expect("parses");
    let plan = plan
        .select("u => ({ id: u.id, name: u.name })")
        .expect("appends");
    let stmt = render(&plan, Dialect::Postgres);
    assert_eq!(
        stmt.sql,
        "SELECT \"id\" AS \"id\", \"name\" AS \"name\" FROM \"users\""
    );
}

#[test]
fn test_group_by_append() {
    let plan = SelectPlan::parse(&Schema::new(), "p => from(\"orders\")").expect("parses");
    let plan = plan
        .group_by("o => o.region")
        .and_then(|p| p.select("g => ({ region: g.key, n: g.count() })"))
        .expect("appends");
    let stmt = render(&plan, Dialect::Postgres);
    assert_eq!(
        stmt.sql,
        "SELECT \"region\" AS \"region\", COUNT(*) AS \"n\" FROM \"orders\" GROUP BY \"region\""
    );
}

#[test]
fn test_terminal_handle_forbids_chaining_by_type() {
    let plan = SelectPlan::parse(&Schema::new(), "p => from(\"users\")").expect("parses");
    let terminal = plan.any().expect("appends terminal");
    // TerminalPlan only renders; further chaining is not expressible.
    let stmt = terminal
        .to_statement(&Params::new(), &opts(), Dialect::Postgres)
        .expect("renders");
    assert!(stmt.sql.starts_with("SELECT CASE WHEN EXISTS"));
}

#[test]
fn test_all_terminal_with_predicate() {
    let plan = SelectPlan::parse(&Schema::new(), "p => from(\"users\")").expect("parses");
    let terminal = plan.all("u => u.age >= 18").expect("appends terminal");
    let stmt = terminal
        .to_statement(&Params::new(), &opts(), Dialect::Postgres)
        .expect("renders");
    assert_eq!(
        stmt.sql,
        "SELECT CASE WHEN NOT EXISTS (SELECT * FROM \"users\" WHERE NOT (\"age\" >= $(__p1))) THEN 1 ELSE 0 END"
    );
}

#[test]
fn test_then_by_validity_checked_on_append() {
    let plan = SelectPlan::parse(&Schema::new(), "p => from(\"users\")").expect("parses");
    assert!(plan.then_by("u => u.name").is_err());
}

#[test]
fn test_distinct_and_reverse_appends() {
    let plan = SelectPlan::parse(
        &Schema::new(),
        "p => from(\"users\").orderBy(u => u.age)",
    )
    .expect("parses");
    let plan = plan
        .distinct()
        .and_then(|p| p.reverse())
        .expect("appends");
    let stmt = render(&plan, Dialect::Postgres);
    assert_eq!(
        stmt.sql,
        "SELECT DISTINCT * FROM \"users\" ORDER BY \"age\" DESC"
    );
}
