//! Operation tree.
//!
//! A query is a single-linked chain rooted at a `From` (or a source-shaped
//! variant such as `Union`), built bottom-up by the operation visitors and
//! immutable after normalisation. DML statements are flat records with the
//! same expression algebra in their slots.

use super::expr::{BoolExpr, ValueExpr};

// =============================================================================
// SELECT chain
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

/// What a query projects.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `SELECT *`
    AllColumns,
    /// An expression, usually an `Object` of aliased properties.
    Expr(ValueExpr),
}

/// A table or subquery source.
#[derive(Debug, Clone, PartialEq)]
pub struct FromOp {
    pub table: String,
    pub schema: Option<String>,
    /// Present when this source wraps an inner query (window-filter
    /// normalisation produces these).
    pub subquery: Option<Box<QueryOp>>,
    /// Preferred alias when wrapping a subquery (the original table name).
    pub alias_hint: Option<String>,
    /// Stable `tN` alias; assigned only to sources participating in a join
    /// chain.
    pub alias: Option<String>,
}

impl FromOp {
    pub fn table(table: &str, schema: Option<String>) -> Self {
        Self {
            table: table.into(),
            schema,
            subquery: None,
            alias_hint: None,
            alias: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinOp {
    pub outer: Box<QueryOp>,
    pub inner: Box<QueryOp>,
    pub outer_key: ValueExpr,
    pub inner_key: ValueExpr,
    pub kind: JoinKind,
}

/// Terminal operations end a chain and pick the result shape.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalKind {
    Count,
    Sum(ValueExpr),
    Average(ValueExpr),
    Min(ValueExpr),
    Max(ValueExpr),
    First,
    FirstOrDefault,
    Single,
    SingleOrDefault,
    Last,
    LastOrDefault,
    Any,
    /// `all(p)` keeps its predicate: it emits as NOT EXISTS of the negation.
    All(BoolExpr),
    /// Membership of a value in the projected column.
    Contains(ValueExpr),
}

impl TerminalKind {
    /// Terminals that reduce the query to a single aggregate column.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            TerminalKind::Count
                | TerminalKind::Sum(_)
                | TerminalKind::Average(_)
                | TerminalKind::Min(_)
                | TerminalKind::Max(_)
        )
    }

    /// Terminals encoded as an EXISTS probe returning 0/1.
    pub fn is_existence(&self) -> bool {
        matches!(
            self,
            TerminalKind::Any | TerminalKind::All(_) | TerminalKind::Contains(_)
        )
    }
}

/// One link in the query chain.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOp {
    From(FromOp),
    Where {
        source: Box<QueryOp>,
        predicate: BoolExpr,
    },
    Select {
        source: Box<QueryOp>,
        projection: Projection,
    },
    OrderBy {
        source: Box<QueryOp>,
        key: ValueExpr,
        descending: bool,
    },
    /// Must chain after `OrderBy` or `ThenBy`; the visitors enforce this.
    ThenBy {
        source: Box<QueryOp>,
        key: ValueExpr,
        descending: bool,
    },
    Take {
        source: Box<QueryOp>,
        count: ValueExpr,
    },
    Skip {
        source: Box<QueryOp>,
        count: ValueExpr,
    },
    Distinct {
        source: Box<QueryOp>,
    },
    Reverse {
        source: Box<QueryOp>,
    },
    GroupBy {
        source: Box<QueryOp>,
        key: ValueExpr,
    },
    Join(JoinOp),
    /// An unresolved `groupJoin`; the `selectMany(defaultIfEmpty)` visitor
    /// rewrites it into a left-outer `Join`. One that survives to emission is
    /// an invalid chain.
    GroupJoin(JoinOp),
    /// Cross join: `selectMany` over an independent source.
    SelectMany {
        source: Box<QueryOp>,
        inner: Box<QueryOp>,
    },
    Union {
        first: Box<QueryOp>,
        second: Box<QueryOp>,
        all: bool,
    },
    Terminal {
        source: Box<QueryOp>,
        kind: TerminalKind,
    },
}

impl QueryOp {
    /// The upstream link for linear variants (`Join`/`Union` expose their
    /// outer/first side).
    pub fn source(&self) -> Option<&QueryOp> {
        match self {
            QueryOp::From(_) => None,
            QueryOp::Where { source, .. }
            | QueryOp::Select { source, .. }
            | QueryOp::OrderBy { source, .. }
            | QueryOp::ThenBy { source, .. }
            | QueryOp::Take { source, .. }
            | QueryOp::Skip { source, .. }
            | QueryOp::Distinct { source }
            | QueryOp::Reverse { source }
            | QueryOp::GroupBy { source, .. }
            | QueryOp::SelectMany { source, .. }
            | QueryOp::Terminal { source, .. } => Some(source),
            QueryOp::Join(join) | QueryOp::GroupJoin(join) => Some(&join.outer),
            QueryOp::Union { first, .. } => Some(first),
        }
    }

    /// The terminal kind if this chain ends in one.
    pub fn terminal_kind(&self) -> Option<&TerminalKind> {
        match self {
            QueryOp::Terminal { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// The root `From` of the chain, walking outer sides of joins.
    pub fn root_from(&self) -> Option<&FromOp> {
        match self {
            QueryOp::From(from) => Some(from),
            other => other.source().and_then(|s| s.root_from()),
        }
    }

    /// Whether any link in the chain is a `Join`, `GroupJoin`, or
    /// `SelectMany` (the scopes where columns must be alias-qualified).
    pub fn has_join(&self) -> bool {
        match self {
            QueryOp::Join(_) | QueryOp::GroupJoin(_) | QueryOp::SelectMany { .. } => true,
            QueryOp::From(_) => false,
            other => other.source().is_some_and(|s| s.has_join()),
        }
    }

    /// The projection of the last `Select` in the chain, if any.
    pub fn last_projection(&self) -> Option<&Projection> {
        match self {
            QueryOp::Select { projection, .. } => Some(projection),
            QueryOp::From(_) => None,
            other => other.source().and_then(|s| s.last_projection()),
        }
    }
}

// =============================================================================
// DML
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct InsertOp {
    pub table: String,
    pub schema: Option<String>,
    /// Column / value pairs in authored order.
    pub values: Vec<(String, ValueExpr)>,
    pub returning: Option<Projection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOp {
    pub table: String,
    pub schema: Option<String>,
    pub assignments: Vec<(String, ValueExpr)>,
    pub predicate: Option<BoolExpr>,
    pub allow_full_table: bool,
    pub returning: Option<Projection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOp {
    pub table: String,
    pub schema: Option<String>,
    pub predicate: Option<BoolExpr>,
    pub allow_full_table: bool,
}

/// The root of a compiled plan.
#[derive(Debug, Clone, PartialEq)]
pub enum OpTree {
    Query(QueryOp),
    Insert(InsertOp),
    Update(UpdateOp),
    Delete(DeleteOp),
}
