//! PostgreSQL dialect.
//!
//! - pg-promise style named placeholders: `$(name)`, `$(name.property)`
//! - native array parameters with `= ANY(...)` membership
//! - native booleans, no auto-parameter coercion

use super::SqlDialect;

/// PostgreSQL dialect strategy.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn param_placeholder(&self, name: &str) -> String {
        format!("$({})", name)
    }

    fn param_path_placeholder(&self, name: &str, property: &str) -> String {
        format!("$({}.{})", name, property)
    }

    fn uses_native_arrays(&self) -> bool {
        true
    }
}
