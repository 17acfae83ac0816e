use tinqer::cache::{CachedPlan, ParseCache, ParseCacheConfig};
use tinqer::{Dialect, Params, Schema, StatementOptions};

fn compile_cached(source: &str) -> tinqer::Statement {
    tinqer::select_statement(
        &Schema::new(),
        source,
        &Params::new(),
        &StatementOptions::default(),
        Dialect::Postgres,
    )
    .expect("should compile")
}

fn sample_plan() -> CachedPlan {
    use tinqer::ir::{FromOp, OpTree, QueryOp};
    CachedPlan {
        tree: OpTree::Query(QueryOp::From(FromOp::table("users", None))),
        auto_params: Default::default(),
        auto_param_infos: Default::default(),
        snapshot: Default::default(),
    }
}

#[test]
fn test_size_matches_distinct_queries_under_capacity() {
    let cache = ParseCache::new(ParseCacheConfig {
        enabled: true,
        capacity: 16,
    });
    for i in 0..5 {
        cache.insert(format!("query-{}", i), sample_plan());
    }
    assert_eq!(cache.len(), 5);
}

#[test]
fn test_size_clamped_to_capacity() {
    let cache = ParseCache::new(ParseCacheConfig {
        enabled: true,
        capacity: 3,
    });
    for i in 0..10 {
        cache.insert(format!("query-{}", i), sample_plan());
    }
    assert_eq!(cache.len(), 3);
}

#[test]
fn test_repeated_insert_of_same_source_keeps_one_entry() {
    let cache = ParseCache::new(ParseCacheConfig {
        enabled: true,
        capacity: 8,
    });
    for _ in 0..4 {
        cache.insert("same".to_string(), sample_plan());
    }
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_clear_empties_cache() {
    let cache = ParseCache::new(ParseCacheConfig::default());
    cache.insert("q".to_string(), sample_plan());
    cache.clear();
    assert!(cache.is_empty());
    assert!(cache.get("q").is_none());
}

#[test]
fn test_default_config() {
    let config = ParseCacheConfig::default();
    assert!(config.enabled);
    assert_eq!(config.capacity, 1024);
}

#[test]
fn test_cached_compile_is_identical_to_fresh() {
    // Distinct source text per test keeps the process-wide cache isolated.
    let source = "p => from(\"cache_identity_users\").where(u => u.age >= 42)";
    let fresh = compile_cached(source);
    let cached = compile_cached(source);
    assert_eq!(fresh, cached);
}

#[test]
fn test_cache_bypass_option_still_compiles() {
    let source = "p => from(\"cache_bypass_users\").where(u => u.age >= 1)";
    let bypass = StatementOptions {
        cache: false,
        on_sql: None,
    };
    let a = tinqer::select_statement(
        &Schema::new(),
        source,
        &Params::new(),
        &bypass,
        Dialect::Postgres,
    )
    .expect("should compile");
    let b = compile_cached(source);
    assert_eq!(a, b);
}
