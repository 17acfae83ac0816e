//! Parser for builder lambda token streams.
//!
//! Transforms the lexer's token stream into the reduced arrow-function AST.
//! Precedence follows the host language: member/call postfix, unary, then
//! multiplicative, additive, relational, equality, `&&`, `||`, `??`, and
//! finally the conditional operator.

use chumsky::input::ValueInput;
use chumsky::prelude::*;

use super::lexer::Token;
use super::{ArrowFunction, BinaryOp, Expr, ExprKind, LitValue, LogicalOp, Span, UnaryOp};

fn to_span(span: SimpleSpan) -> Span {
    span.start..span.end
}

fn bin(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    let span = left.span.start..right.span.end;
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

fn logic(left: Expr, op: LogicalOp, right: Expr) -> Expr {
    let span = left.span.start..right.span.end;
    Expr::new(
        ExprKind::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

/// A single postfix step: `.name`, `["name"]`, or `(args)`.
enum Postfix {
    Member(String, usize),
    Computed(String, usize),
    Call(Vec<Expr>, usize),
}

/// Create the expression parser.
fn expr_parser<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, Expr, extra::Err<Rich<'tokens, Token<'src>, SimpleSpan>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    recursive(|expr| {
        let ident = select! {
            Token::Ident(s) => s.to_string(),
        }
        .labelled("identifier");

        // --------------------------------------------------------------------
        // Arrow functions: `x => body` / `(a, b) => body`
        // --------------------------------------------------------------------

        let param_list = choice((
            ident.clone().map(|p| vec![p]),
            ident
                .clone()
                .separated_by(just(Token::Comma))
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        ));

        let arrow = param_list
            .then_ignore(just(Token::FatArrow))
            .then(expr.clone())
            .map_with(|(params, body), e| {
                Expr::new(
                    ExprKind::Arrow(Box::new(ArrowFunction { params, body })),
                    to_span(e.span()),
                )
            });

        // --------------------------------------------------------------------
        // Literals
        // --------------------------------------------------------------------

        let number = select! { Token::Num(s) => s }.try_map(|s: &str, span| {
            if !s.contains('.') {
                if let Ok(n) = s.parse::<i64>() {
                    return Ok(LitValue::Int(n));
                }
            }
            s.parse::<f64>()
                .map(LitValue::Float)
                .map_err(|_| Rich::custom(span, format!("invalid number literal: {}", s)))
        });

        let literal = choice((
            select! {
                Token::Str(s) => LitValue::Str(s),
                Token::True => LitValue::Bool(true),
                Token::False => LitValue::Bool(false),
                Token::Null => LitValue::Null,
            },
            number,
        ))
        .map_with(|lit, e| Expr::new(ExprKind::Lit(lit), to_span(e.span())))
        .labelled("literal");

        // --------------------------------------------------------------------
        // Object and array literals
        // --------------------------------------------------------------------

        let prop_key = select! {
            Token::Ident(s) => s.to_string(),
            Token::Str(s) => s,
        }
        .labelled("property name");

        // `key: value` or shorthand `key` (equivalent to `key: key`)
        let property = prop_key
            .then(just(Token::Colon).ignore_then(expr.clone()).or_not())
            .map_with(|(key, value), e| {
                let value = value
                    .unwrap_or_else(|| Expr::new(ExprKind::Ident(key.clone()), to_span(e.span())));
                (key, value)
            });

        let object = property
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBrace), just(Token::RBrace))
            .map_with(|properties, e| {
                Expr::new(ExprKind::Object { properties }, to_span(e.span()))
            });

        let array = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map_with(|elements, e| Expr::new(ExprKind::Array { elements }, to_span(e.span())));

        let paren = expr
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .map_with(|inner, e| Expr::new(ExprKind::Paren(Box::new(inner)), to_span(e.span())));

        let ident_expr =
            ident.map_with(|name, e| Expr::new(ExprKind::Ident(name), to_span(e.span())));

        // Arrow must win over paren (`(a, b) =>`) and bare identifiers.
        let primary = choice((arrow, literal, object, array, paren, ident_expr));

        // --------------------------------------------------------------------
        // Postfix: member access and calls
        // --------------------------------------------------------------------

        let member = just(Token::Dot)
            .ignore_then(select! { Token::Ident(s) => s.to_string() })
            .map_with(|name, e| Postfix::Member(name, to_span(e.span()).end));

        // Computed access is restricted to string-literal keys.
        let computed = select! { Token::Str(s) => s }
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map_with(|name, e| Postfix::Computed(name, to_span(e.span()).end));

        let call = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .map_with(|args, e| Postfix::Call(args, to_span(e.span()).end));

        let postfix = primary
            .foldl(
                choice((member, computed, call)).repeated(),
                |object: Expr, step| {
                    let start = object.span.start;
                    match step {
                        Postfix::Member(property, end) => Expr::new(
                            ExprKind::Member {
                                object: Box::new(object),
                                property,
                                computed: false,
                            },
                            start..end,
                        ),
                        Postfix::Computed(property, end) => Expr::new(
                            ExprKind::Member {
                                object: Box::new(object),
                                property,
                                computed: true,
                            },
                            start..end,
                        ),
                        Postfix::Call(args, end) => Expr::new(
                            ExprKind::Call {
                                callee: Box::new(object),
                                args,
                            },
                            start..end,
                        ),
                    }
                },
            )
            .boxed();

        // --------------------------------------------------------------------
        // Unary and binary layers
        // --------------------------------------------------------------------

        let unary_op = choice((
            just(Token::Bang).to(UnaryOp::Not),
            just(Token::Minus).to(UnaryOp::Neg),
            just(Token::Plus).to(UnaryOp::Plus),
        ))
        .map_with(|op, e| (op, to_span(e.span()).start));

        let unary = unary_op
            .repeated()
            .foldr(postfix, |(op, start), operand: Expr| {
                let end = operand.span.end;
                Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    start..end,
                )
            })
            .boxed();

        let product_op = select! {
            Token::Star => BinaryOp::Mul,
            Token::Slash => BinaryOp::Div,
            Token::Percent => BinaryOp::Mod,
        };
        let product = unary
            .clone()
            .foldl(product_op.then(unary).repeated(), |l, (op, r)| bin(l, op, r))
            .boxed();

        let sum_op = select! {
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
        };
        let sum = product
            .clone()
            .foldl(sum_op.then(product).repeated(), |l, (op, r)| bin(l, op, r))
            .boxed();

        let rel_op = select! {
            Token::Lt => BinaryOp::Lt,
            Token::Le => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::Ge => BinaryOp::Ge,
        };
        let relational = sum
            .clone()
            .foldl(rel_op.then(sum).repeated(), |l, (op, r)| bin(l, op, r))
            .boxed();

        let eq_op = select! {
            Token::EqStrict => BinaryOp::EqStrict,
            Token::Eq => BinaryOp::Eq,
            Token::NeStrict => BinaryOp::NeStrict,
            Token::Ne => BinaryOp::Ne,
        };
        let equality = relational
            .clone()
            .foldl(eq_op.then(relational).repeated(), |l, (op, r)| {
                bin(l, op, r)
            })
            .boxed();

        let and = equality
            .clone()
            .foldl(
                just(Token::AndAnd).ignore_then(equality).repeated(),
                |l, r| logic(l, LogicalOp::And, r),
            )
            .boxed();

        let or = and
            .clone()
            .foldl(just(Token::OrOr).ignore_then(and).repeated(), |l, r| {
                logic(l, LogicalOp::Or, r)
            })
            .boxed();

        let nullish = or
            .clone()
            .foldl(just(Token::Nullish).ignore_then(or).repeated(), |l, r| {
                logic(l, LogicalOp::Nullish, r)
            })
            .boxed();

        // --------------------------------------------------------------------
        // Conditional: `test ? consequent : alternate` (right-associative)
        // --------------------------------------------------------------------

        nullish
            .then(
                just(Token::Question)
                    .ignore_then(expr.clone())
                    .then_ignore(just(Token::Colon))
                    .then(expr)
                    .or_not(),
            )
            .map(|(test, arms)| match arms {
                None => test,
                Some((consequent, alternate)) => {
                    let span = test.span.start..alternate.span.end;
                    Expr::new(
                        ExprKind::Conditional {
                            test: Box::new(test),
                            consequent: Box::new(consequent),
                            alternate: Box::new(alternate),
                        },
                        span,
                    )
                }
            })
    })
}

/// Create the lambda parser: a single arrow function covering all input.
pub fn parser<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, ArrowFunction, extra::Err<Rich<'tokens, Token<'src>, SimpleSpan>>>
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    expr_parser()
        .then_ignore(end())
        .try_map(|e: Expr, span| match e.kind {
            ExprKind::Arrow(arrow) => Ok(*arrow),
            _ => Err(Rich::custom(span, "expected an arrow function")),
        })
}
