//! Lambda source parsing for the query DSL.
//!
//! Builder lambdas arrive as source text (the host's function-source form of
//! an arrow function). This module tokenises and parses that text into a
//! reduced, ESTree-shaped node set:
//!
//! - `ArrowFunction { params, body }`
//! - calls, member accesses, identifiers
//! - literals with their original value type preserved
//! - binary / logical / unary operators, conditionals
//! - object and array literals, parenthesised expressions
//!
//! The lambda is data, never code: nothing here is ever evaluated. Any
//! construct outside this node set is rejected with its source location.

pub mod lexer;
pub mod parser;

/// Byte range into the original lambda source.
pub type Span = std::ops::Range<usize>;

/// An arrow function: `(a, b) => body` or `a => body`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunction {
    pub params: Vec<String>,
    pub body: Expr,
}

/// An expression node with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Strip any number of parenthesis wrappers.
    pub fn unparenthesised(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) => inner.unparenthesised(),
            _ => self,
        }
    }
}

/// The reduced expression node set.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Ident(String),
    Lit(LitValue),
    /// `object.property` or `object["property"]` (computed).
    Member {
        object: Box<Expr>,
        property: String,
        computed: bool,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Object {
        properties: Vec<(String, Expr)>,
    },
    Array {
        elements: Vec<Expr>,
    },
    Arrow(Box<ArrowFunction>),
    Paren(Box<Expr>),
}

/// A literal with its original value type preserved, so booleans and
/// numerics stay distinguishable downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum LitValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

/// Binary operators of the supported subset. Loose and strict equality are
/// kept apart in the tree even though they lower identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    EqStrict,
    Ne,
    NeStrict,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    /// `??`
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

/// Lambda source failed to tokenise or parse.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at {span:?}: {message}")]
pub struct ParseError {
    pub span: Span,
    pub message: String,
}

/// Parse the source text of a builder lambda into an `ArrowFunction`.
///
/// The entire input must be a single arrow function; trailing content is an
/// error.
pub fn parse_lambda(source: &str) -> Result<ArrowFunction, ParseError> {
    use chumsky::input::Input;
    use chumsky::span::SimpleSpan;
    use chumsky::Parser as _;

    let (tokens, lex_errs) = lexer::lexer().parse(source).into_output_errors();

    if let Some(err) = lex_errs.into_iter().next() {
        let span = *err.span();
        return Err(ParseError {
            span: span.start..span.end,
            message: err.to_string(),
        });
    }

    let tokens: Vec<(lexer::Token<'_>, SimpleSpan)> = tokens.unwrap_or_default();
    let len = source.len();
    let eoi: SimpleSpan = (len..len).into();
    let token_stream = tokens
        .as_slice()
        .map(eoi, |(tok, span): &(lexer::Token<'_>, SimpleSpan)| {
            (tok, span)
        });

    let (arrow, parse_errs) = parser::parser().parse(token_stream).into_output_errors();

    if let Some(err) = parse_errs.into_iter().next() {
        let span = *err.span();
        return Err(ParseError {
            span: span.start..span.end,
            message: err.to_string(),
        });
    }

    arrow.ok_or_else(|| ParseError {
        span: 0..len,
        message: "expected an arrow function".into(),
    })
}
