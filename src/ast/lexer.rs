//! Lexer for builder lambda source text.
//!
//! Tokenises the supported arrow-function subset: identifiers, string and
//! number literals, the operator set, and punctuation, with span information
//! for diagnostics.

use chumsky::prelude::*;

/// A token in lambda source.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    // ========================================================================
    // Literals
    // ========================================================================
    /// An identifier (not a literal keyword).
    Ident(&'src str),
    /// String literal contents with escapes resolved.
    Str(String),
    /// Unparsed number text; the parser decides integer vs float.
    Num(&'src str),
    True,
    False,
    Null,

    // ========================================================================
    // Punctuation
    // ========================================================================
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Question,

    // ========================================================================
    // Operators
    // ========================================================================
    /// `=>`
    FatArrow,
    /// `===`
    EqStrict,
    /// `==`
    Eq,
    /// `!==`
    NeStrict,
    /// `!=`
    Ne,
    /// `<=`
    Le,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `>`
    Gt,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `??`
    Nullish,
    /// `!`
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
}

impl<'src> std::fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{}", s),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::Num(s) => write!(f, "{}", s),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Colon => write!(f, ":"),
            Token::Question => write!(f, "?"),
            Token::FatArrow => write!(f, "=>"),
            Token::EqStrict => write!(f, "==="),
            Token::Eq => write!(f, "=="),
            Token::NeStrict => write!(f, "!=="),
            Token::Ne => write!(f, "!="),
            Token::Le => write!(f, "<="),
            Token::Lt => write!(f, "<"),
            Token::Ge => write!(f, ">="),
            Token::Gt => write!(f, ">"),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Nullish => write!(f, "??"),
            Token::Bang => write!(f, "!"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
        }
    }
}

/// Map an identifier string to a literal keyword token or return `Ident`.
fn keyword_or_ident(s: &str) -> Token<'_> {
    match s {
        "true" => Token::True,
        "false" => Token::False,
        "null" => Token::Null,
        _ => Token::Ident(s),
    }
}

/// Create the lexer for lambda source.
///
/// Returns a parser producing tokens with spans, skipping whitespace and
/// comments. Unterminated strings and stray characters (including `=`, which
/// would be assignment) are lexical errors.
pub fn lexer<'src>(
) -> impl Parser<'src, &'src str, Vec<(Token<'src>, SimpleSpan)>, extra::Err<Rich<'src, char>>> {
    let ident = text::ident().map(keyword_or_ident);

    // Escape sequences accepted inside string literals.
    let escape = just('\\').ignore_then(choice((
        just('\\').to('\\'),
        just('/').to('/'),
        just('"').to('"'),
        just('\'').to('\''),
        just('`').to('`'),
        just('n').to('\n'),
        just('r').to('\r'),
        just('t').to('\t'),
        just('0').to('\0'),
    )));

    let double_quoted = just('"')
        .ignore_then(
            choice((escape.clone(), none_of("\\\"")))
                .repeated()
                .collect::<String>(),
        )
        .then_ignore(just('"'));

    let single_quoted = just('\'')
        .ignore_then(
            choice((escape, none_of("\\'")))
                .repeated()
                .collect::<String>(),
        )
        .then_ignore(just('\''));

    let string_lit = double_quoted.or(single_quoted).map(Token::Str);

    // Numbers: digits with an optional fraction. Sign is a unary operator,
    // not part of the token.
    let number = text::digits(10)
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .map(Token::Num);

    // Multi-character operators first so prefixes never win.
    let symbol = choice((
        choice((
            just("===").to(Token::EqStrict),
            just("!==").to(Token::NeStrict),
            just("=>").to(Token::FatArrow),
            just("==").to(Token::Eq),
            just("!=").to(Token::Ne),
            just("<=").to(Token::Le),
            just(">=").to(Token::Ge),
            just("&&").to(Token::AndAnd),
            just("||").to(Token::OrOr),
            just("??").to(Token::Nullish),
        )),
        choice((
            just('(').to(Token::LParen),
            just(')').to(Token::RParen),
            just('{').to(Token::LBrace),
            just('}').to(Token::RBrace),
            just('[').to(Token::LBracket),
            just(']').to(Token::RBracket),
            just(',').to(Token::Comma),
            just('.').to(Token::Dot),
            just(':').to(Token::Colon),
            just('?').to(Token::Question),
            just('!').to(Token::Bang),
            just('<').to(Token::Lt),
            just('>').to(Token::Gt),
            just('+').to(Token::Plus),
            just('-').to(Token::Minus),
            just('*').to(Token::Star),
            just('/').to(Token::Slash),
            just('%').to(Token::Percent),
        )),
    ));

    let single_line_comment = just("//")
        .then(any().and_is(just('\n').not()).repeated())
        .ignored();

    let multi_line_comment = just("/*")
        .then(any().and_is(just("*/").not()).repeated())
        .then(just("*/"))
        .ignored();

    let comment = single_line_comment.or(multi_line_comment);

    let token = choice((ident, string_lit, number, symbol)).map_with(|tok, e| (tok, e.span()));

    token
        .padded_by(comment.padded().repeated())
        .padded()
        .repeated()
        .collect()
        .padded_by(comment.padded().repeated())
        .padded()
        .then_ignore(end())
}

/// Lex a source string into tokens.
pub fn lex(source: &str) -> Result<Vec<(Token<'_>, SimpleSpan)>, Vec<Rich<'_, char>>> {
    let (tokens, errs) = lexer().parse(source).into_output_errors();
    if errs.is_empty() {
        Ok(tokens.unwrap_or_default())
    } else {
        Err(errs)
    }
}
