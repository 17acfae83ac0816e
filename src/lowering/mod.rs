//! AST-to-IR lowering.
//!
//! The visitors walk a parsed builder lambda top-down and construct the
//! operation tree, while the expression visitor lowers lambda bodies into the
//! expression algebra. A mutable [`VisitorContext`] travels with the walk; it
//! classifies every identifier against the parameter-origin model:
//!
//! - **query parameter**: param 0 of the root arrow; member accesses become
//!   named placeholders
//! - **helpers parameter**: param 2 of the root arrow; member accesses
//!   invoke helper functions and window builders
//! - **table parameter**: the row lambda of `where`/`select`/`orderBy`/…;
//!   member accesses become columns
//! - **grouping parameter**: the lambda of a `select` after `groupBy`
//! - **join-result parameter**: after a join; accesses resolve through the
//!   recorded result shape to alias-qualified columns
//!
//! The context is a plain value: a snapshot is a clone, which is what the
//! parse cache stores and plan handles restore.

pub mod dml;
pub mod expr;
pub mod query;

use std::collections::{BTreeMap, HashMap};

use crate::ast::Span;
use crate::ir::ValueExpr;
use crate::params::AutoParamRegistry;

/// Lowering failure. All variants are fatal: no partial plan is produced.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LowerError {
    #[error("unsupported syntax at {span:?}: {construct}")]
    UnsupportedSyntax { construct: String, span: Span },

    #[error("unknown identifier '{name}' at {span:?}")]
    UnknownIdentifier { name: String, span: Span },

    #[error("aggregate method '{method}' requires a grouping receiver")]
    InvalidAggregateReceiver { method: String, span: Span },

    #[error("invalid query chain: {message}")]
    InvalidChain { message: String },

    #[error(
        "{statement} on \"{table}\" has no WHERE clause; call {flag}() to run a full-table statement"
    )]
    UnsafeMutation {
        statement: &'static str,
        table: String,
        flag: &'static str,
    },
}

impl LowerError {
    pub fn unsupported(construct: impl Into<String>, span: Span) -> Self {
        LowerError::UnsupportedSyntax {
            construct: construct.into(),
            span,
        }
    }

    pub fn chain(message: impl Into<String>) -> Self {
        LowerError::InvalidChain {
            message: message.into(),
        }
    }
}

// =============================================================================
// Result shapes
// =============================================================================

/// What one property of a join-result shape stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeEntry {
    /// A row of a concrete table, reachable under a join alias.
    Row { table: String, alias: String },
    /// The grouped side of a `groupJoin`, waiting for
    /// `selectMany(defaultIfEmpty)`.
    Group { table: String, alias: String },
    /// A nested result shape from an earlier join.
    Nested(ResultShape),
}

/// The shape a join result selector produced: property name to entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultShape {
    pub entries: BTreeMap<String, ShapeEntry>,
}

impl ResultShape {
    pub fn entry(&self, name: &str) -> Option<&ShapeEntry> {
        self.entries.get(name)
    }
}

/// A row-lambda parameter binding.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBinding {
    pub table: Option<String>,
    pub alias: Option<String>,
}

// =============================================================================
// Visitor context
// =============================================================================

/// Mutable state for one lowering pass; cloneable so the parse cache can
/// snapshot it and plan handles can restore it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitorContext {
    /// Database schema namespace from the schema witness.
    pub schema_namespace: Option<String>,
    /// Name of the caller-parameter bag (param 0 of the root arrow).
    pub query_params: Vec<String>,
    /// Name of the helpers object (param 2 of the root arrow).
    pub helpers_param: Option<String>,
    /// Row-lambda parameters currently in scope.
    pub table_params: HashMap<String, RowBinding>,
    /// Shape parameters currently in scope (join results).
    pub shape_params: HashMap<String, ResultShape>,
    /// Grouping parameters currently in scope.
    pub grouping_params: Vec<String>,
    /// The key selector of the nearest `groupBy`, for resolving `g.key`.
    pub group_by_key: Option<ValueExpr>,
    /// Shape of the current chain after a join, if any.
    pub result_shape: Option<ResultShape>,
    /// Table of the current chain for provenance capture.
    pub current_table: Option<String>,
    /// Alias of the current chain's root once it joined.
    pub current_alias: Option<String>,
    pub auto_params: AutoParamRegistry,
    alias_counter: u32,
}

impl VisitorContext {
    pub fn new(schema_namespace: Option<String>) -> Self {
        Self {
            schema_namespace,
            ..Default::default()
        }
    }

    /// Bind the root arrow's parameters: param 0 is the caller-parameter
    /// bag, param 2 the helpers object. Param 1 is accepted and left
    /// unbound.
    pub fn bind_root_params(&mut self, params: &[String]) {
        if let Some(first) = params.first() {
            self.query_params.push(first.clone());
        }
        if let Some(third) = params.get(2) {
            self.helpers_param = Some(third.clone());
        }
    }

    pub fn is_query_param(&self, name: &str) -> bool {
        self.query_params.iter().any(|p| p == name)
    }

    pub fn is_helpers_param(&self, name: &str) -> bool {
        self.helpers_param.as_deref() == Some(name)
    }

    pub fn is_grouping_param(&self, name: &str) -> bool {
        self.grouping_params.iter().any(|p| p == name)
    }

    /// Allocate the next stable join alias (`t0`, `t1`, …).
    pub fn next_alias(&mut self) -> String {
        let alias = format!("t{}", self.alias_counter);
        self.alias_counter += 1;
        alias
    }

    /// Bind a row lambda parameter for the current chain: a shape parameter
    /// after a join, a table parameter otherwise. Returns the previous
    /// binding so callers can restore scope.
    pub fn bind_row_param(&mut self, name: &str) -> ScopedBinding {
        if let Some(shape) = self.result_shape.clone() {
            let prev = self.shape_params.insert(name.to_string(), shape);
            ScopedBinding::Shape {
                name: name.to_string(),
                prev,
            }
        } else {
            let binding = RowBinding {
                table: self.current_table.clone(),
                alias: self.current_alias.clone(),
            };
            let prev = self.table_params.insert(name.to_string(), binding);
            ScopedBinding::Row {
                name: name.to_string(),
                prev,
            }
        }
    }

    /// Bind a row parameter against an explicit table/alias (join key
    /// selectors).
    pub fn bind_table_param(
        &mut self,
        name: &str,
        table: Option<String>,
        alias: Option<String>,
    ) -> ScopedBinding {
        let prev = self
            .table_params
            .insert(name.to_string(), RowBinding { table, alias });
        ScopedBinding::Row {
            name: name.to_string(),
            prev,
        }
    }

    /// Bind a shape parameter explicitly.
    pub fn bind_shape_param(&mut self, name: &str, shape: ResultShape) -> ScopedBinding {
        let prev = self.shape_params.insert(name.to_string(), shape);
        ScopedBinding::Shape {
            name: name.to_string(),
            prev,
        }
    }

    /// Bind a grouping parameter.
    pub fn bind_grouping_param(&mut self, name: &str) -> ScopedBinding {
        self.grouping_params.push(name.to_string());
        ScopedBinding::Grouping {
            name: name.to_string(),
        }
    }

    /// Restore the scope a binding replaced.
    pub fn unbind(&mut self, binding: ScopedBinding) {
        match binding {
            ScopedBinding::Row { name, prev } => {
                match prev {
                    Some(b) => self.table_params.insert(name, b),
                    None => self.table_params.remove(&name),
                };
            }
            ScopedBinding::Shape { name, prev } => {
                match prev {
                    Some(s) => self.shape_params.insert(name, s),
                    None => self.shape_params.remove(&name),
                };
            }
            ScopedBinding::Grouping { name } => {
                if let Some(pos) = self.grouping_params.iter().rposition(|p| *p == name) {
                    self.grouping_params.remove(pos);
                }
            }
        }
    }
}

/// Token returned by the bind helpers, handed back to [`VisitorContext::unbind`].
#[derive(Debug)]
pub enum ScopedBinding {
    Row {
        name: String,
        prev: Option<RowBinding>,
    },
    Shape {
        name: String,
        prev: Option<ResultShape>,
    },
    Grouping {
        name: String,
    },
}
