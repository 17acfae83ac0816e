//! SQL dialect strategies.
//!
//! A dialect decides parameter placeholder syntax, identifier quoting, array
//! membership handling, pagination syntax, and auto-parameter coercion. The
//! strategies are stateless and shared freely.
//!
//! | Concern | PostgreSQL | SQLite |
//! |---|---|---|
//! | Placeholder | `$(name)` | `@name` |
//! | Nested placeholder | `$(name.prop)` | `@name_prop` |
//! | Identifier quoting | `"ident"` | `"ident"` |
//! | Array membership | `x = ANY($(ids))` | `x IN (@ids_0, …)` |
//! | Array expansion | native arrays | indexed companions |
//! | Boolean auto-params | kept boolean | coerced to `1`/`0` |

mod postgres;
mod sqlite;

pub use postgres::Postgres;
pub use sqlite::Sqlite;

use crate::params::{AutoParamInfo, ParamValue};

/// SQL dialect trait: the hooks the emitter and parameter merger call.
pub trait SqlDialect: std::fmt::Debug + Send + Sync {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifiers and placeholders
    // =========================================================================

    /// Quote an identifier (table, column, alias). Both supported dialects
    /// use ANSI double quotes.
    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Render a named parameter placeholder.
    fn param_placeholder(&self, name: &str) -> String;

    /// Render a placeholder for one property of an object-valued parameter.
    fn param_path_placeholder(&self, name: &str, property: &str) -> String;

    // =========================================================================
    // Arrays
    // =========================================================================

    /// Whether array-valued parameters pass to the driver natively. When
    /// false, membership tests enumerate indexed companion parameters.
    fn uses_native_arrays(&self) -> bool;

    /// Whether the parameter merger adds companion entries for arrays and
    /// nested objects.
    fn expands_parameters(&self) -> bool {
        !self.uses_native_arrays()
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit the LIMIT/OFFSET clause from already-rendered operand fragments.
    fn emit_limit_offset(&self, limit: Option<&str>, offset: Option<&str>) -> String {
        match (limit, offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }

    // =========================================================================
    // Parameter coercion
    // =========================================================================

    /// Adjust an auto-parameter value before it reaches the driver. The
    /// provenance record carries the column the literal was compared
    /// against.
    fn coerce_auto_param(&self, value: ParamValue, info: Option<&AutoParamInfo>) -> ParamValue {
        let _ = info;
        value
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn strategy(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &Postgres,
            Dialect::Sqlite => &Sqlite,
        }
    }
}

impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.strategy().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.strategy().quote_identifier(ident)
    }

    fn param_placeholder(&self, name: &str) -> String {
        self.strategy().param_placeholder(name)
    }

    fn param_path_placeholder(&self, name: &str, property: &str) -> String {
        self.strategy().param_path_placeholder(name, property)
    }

    fn uses_native_arrays(&self) -> bool {
        self.strategy().uses_native_arrays()
    }

    fn expands_parameters(&self) -> bool {
        self.strategy().expands_parameters()
    }

    fn emit_limit_offset(&self, limit: Option<&str>, offset: Option<&str>) -> String {
        self.strategy().emit_limit_offset(limit, offset)
    }

    fn coerce_auto_param(&self, value: ParamValue, info: Option<&AutoParamInfo>) -> ParamValue {
        self.strategy().coerce_auto_param(value, info)
    }
}
