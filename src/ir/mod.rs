//! Intermediate representation.
//!
//! Two closed algebras: scalar/boolean expressions (`expr`) and query
//! operations (`ops`). Every variant is handled exhaustively by the
//! normalisation passes and the SQL emitter, so adding a variant is a
//! compile-time event everywhere it matters.

pub mod expr;
pub mod ops;

pub use expr::{
    AggregateFn, ArithOp, BoolExpr, BoolOp, CaseBranch, CiFunction, CompareOp, ConstValue,
    StringCase, StringPredicate, ValueExpr, WindowFn, WindowOrder, WindowSpec,
};
pub use ops::{
    DeleteOp, FromOp, InsertOp, JoinKind, JoinOp, OpTree, Projection, QueryOp, TerminalKind,
    UpdateOp,
};
