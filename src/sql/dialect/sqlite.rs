//! SQLite dialect.
//!
//! - `@name` placeholders; nested properties flatten to `@name_property`
//! - no array binding: membership tests enumerate indexed companions
//!   (`@ids_0, @ids_1, …`) added by the parameter merger
//! - booleans compared against columns are stored as INTEGER, so boolean
//!   auto-parameters with column provenance become `1`/`0`
//! - `OFFSET` requires a `LIMIT`; `LIMIT -1` means unbounded

use super::SqlDialect;
use crate::params::{AutoParamInfo, ParamValue};

/// SQLite dialect strategy.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn param_placeholder(&self, name: &str) -> String {
        format!("@{}", name)
    }

    fn param_path_placeholder(&self, name: &str, property: &str) -> String {
        format!("@{}_{}", name, property)
    }

    fn uses_native_arrays(&self) -> bool {
        false
    }

    fn emit_limit_offset(&self, limit: Option<&str>, offset: Option<&str>) -> String {
        match (limit, offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("LIMIT -1 OFFSET {}", o),
            (None, None) => String::new(),
        }
    }

    fn coerce_auto_param(&self, value: ParamValue, info: Option<&AutoParamInfo>) -> ParamValue {
        match (&value, info) {
            (ParamValue::Bool(b), Some(info)) if info.field_name.is_some() => {
                ParamValue::Int(if *b { 1 } else { 0 })
            }
            _ => value,
        }
    }
}
