//! # Tinqer
//!
//! A query compiler: builder lambdas written in a small fluent DSL arrive as
//! source text and come out as parameterised SQL for PostgreSQL or SQLite.
//! The lambda is parsed as data and never executed; every literal it
//! contains becomes a named parameter.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Builder lambda (source text)                │
//! │   "(p) => from('users').where(u => u.age >= p.min)"      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [ast: lexer + parser]
//! ┌─────────────────────────────────────────────────────────┐
//! │             Reduced arrow-function AST                   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [lowering: operation + expression visitors]
//! ┌─────────────────────────────────────────────────────────┐
//! │     Operation tree + auto-params + context snapshot      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [normalize]          ┌──────────────┐
//! ┌──────────────────────────────────────────┐    │ parse cache  │
//! │  Join aliases bound, window filters      │◄──►│ (bounded LRU)│
//! │  wrapped in subqueries                   │    └──────────────┘
//! └──────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql: emitter + dialect strategy]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  { sql, params }                         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use tinqer::{postgres, Params, Schema, StatementOptions};
//!
//! let stmt = postgres::select_statement(
//!     &Schema::new(),
//!     r#"p => from("users").where(u => u.age >= p.min).orderBy(u => u.name)"#,
//!     &tinqer::params_from([("min", 18i64)]),
//!     &StatementOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(
//!     stmt.sql,
//!     "SELECT * FROM \"users\" WHERE \"age\" >= $(min) ORDER BY \"name\" ASC"
//! );
//! ```

pub mod ast;
pub mod cache;
pub mod compile;
pub mod exec;
pub mod ir;
pub mod lowering;
pub mod normalize;
pub mod params;
pub mod plan;
pub mod sql;

pub mod postgres;
pub mod sqlite;

pub use cache::{
    clear_parse_cache, get_parse_cache_config, set_parse_cache_config, ParseCache,
    ParseCacheConfig,
};
pub use compile::{
    delete_statement, insert_statement, select_statement, update_statement, CompileError,
    CompileResult, Schema, Statement, StatementOptions,
};
pub use exec::{Driver, DriverError, ExecuteError, MutationOutcome, Row, SelectOutcome};
pub use params::{params_from, ParamValue, Params};
pub use plan::{SelectPlan, TerminalPlan};
pub use sql::dialect::{Dialect, SqlDialect};

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::cache::{clear_parse_cache, ParseCacheConfig};
    pub use crate::compile::{
        delete_statement, insert_statement, select_statement, update_statement, Schema, Statement,
        StatementOptions,
    };
    pub use crate::exec::{Driver, MutationOutcome, SelectOutcome};
    pub use crate::params::{params_from, ParamValue, Params};
    pub use crate::plan::SelectPlan;
    pub use crate::sql::dialect::Dialect;
}
