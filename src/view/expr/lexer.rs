//! Lexer for template expressions.
//!
//! Expressions are the PHP-flavoured snippets inside `{{ }}`, `{!! !!}`,
//! directive arguments and `@php` blocks.

use chumsky::prelude::*;

/// A token in a template expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    // ========================================================================
    // Atoms
    // ========================================================================
    /// `$name`, without the sigil.
    Var(&'src str),
    Ident(&'src str),
    Number(&'src str),
    Str(String),

    // ========================================================================
    // Keywords
    // ========================================================================
    True,
    False,
    Null,
    As,
    And,
    Or,

    // ========================================================================
    // Operators
    // ========================================================================
    StrictEq,
    StrictNotEq,
    EqEq,
    NotEq,
    LtEq,
    GtEq,
    Lt,
    Gt,
    AndAnd,
    OrOr,
    Coalesce,
    Arrow,
    FatArrow,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    DotEq,
    CoalesceEq,
    Eq,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Dot,
    Question,
    Colon,

    // ========================================================================
    // Punctuation
    // ========================================================================
    Comma,
    Semicolon,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Var(name) => write!(f, "${}", name),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Number(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "'{}'", s),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::As => write!(f, "as"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::StrictEq => write!(f, "==="),
            Token::StrictNotEq => write!(f, "!=="),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Coalesce => write!(f, "??"),
            Token::Arrow => write!(f, "->"),
            Token::FatArrow => write!(f, "=>"),
            Token::PlusPlus => write!(f, "++"),
            Token::MinusMinus => write!(f, "--"),
            Token::PlusEq => write!(f, "+="),
            Token::MinusEq => write!(f, "-="),
            Token::StarEq => write!(f, "*="),
            Token::SlashEq => write!(f, "/="),
            Token::DotEq => write!(f, ".="),
            Token::CoalesceEq => write!(f, "??="),
            Token::Eq => write!(f, "="),
            Token::Bang => write!(f, "!"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Dot => write!(f, "."),
            Token::Question => write!(f, "?"),
            Token::Colon => write!(f, ":"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
        }
    }
}

fn keyword_or_ident(s: &str) -> Token<'_> {
    match s.to_ascii_lowercase().as_str() {
        "true" => Token::True,
        "false" => Token::False,
        "null" => Token::Null,
        "as" => Token::As,
        "and" => Token::And,
        "or" => Token::Or,
        _ => Token::Ident(s),
    }
}

/// Create a lexer for template expressions.
pub fn lexer<'src>(
) -> impl Parser<'src, &'src str, Vec<(Token<'src>, SimpleSpan)>, extra::Err<Rich<'src, char>>> {
    let var = just('$').ignore_then(text::ident()).map(Token::Var);

    let ident = text::ident().map(keyword_or_ident);

    let number = text::digits(10)
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .map(Token::Number);

    // 'single quoted': only \' and \\ are escapes
    let single_quoted = just('\'')
        .ignore_then(
            just('\\')
                .ignore_then(one_of("\\'"))
                .or(none_of('\''))
                .repeated()
                .collect::<String>(),
        )
        .then_ignore(just('\''))
        .map(Token::Str);

    let double_escape = just('\\').ignore_then(choice((
        just('n').to('\n'),
        just('t').to('\t'),
        just('r').to('\r'),
        just('"'),
        just('\\'),
        just('$'),
    )));
    let double_quoted = just('"')
        .ignore_then(
            double_escape
                .or(none_of('"'))
                .repeated()
                .collect::<String>(),
        )
        .then_ignore(just('"'))
        .map(Token::Str);

    // Longest operators first
    let operator = choice((
        just("===").to(Token::StrictEq),
        just("!==").to(Token::StrictNotEq),
        just("??=").to(Token::CoalesceEq),
        just("==").to(Token::EqEq),
        just("!=").to(Token::NotEq),
        just("<>").to(Token::NotEq),
        just("<=").to(Token::LtEq),
        just(">=").to(Token::GtEq),
        just("&&").to(Token::AndAnd),
        just("||").to(Token::OrOr),
        just("??").to(Token::Coalesce),
        just("->").to(Token::Arrow),
        just("=>").to(Token::FatArrow),
        just("++").to(Token::PlusPlus),
        just("--").to(Token::MinusMinus),
        just("+=").to(Token::PlusEq),
        just("-=").to(Token::MinusEq),
        just("*=").to(Token::StarEq),
        just("/=").to(Token::SlashEq),
        just(".=").to(Token::DotEq),
    ));

    let symbol = choice((
        just('<').to(Token::Lt),
        just('>').to(Token::Gt),
        just('=').to(Token::Eq),
        just('!').to(Token::Bang),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
        just('%').to(Token::Percent),
        just('.').to(Token::Dot),
        just('?').to(Token::Question),
        just(':').to(Token::Colon),
        just(',').to(Token::Comma),
        just(';').to(Token::Semicolon),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just('[').to(Token::LBracket),
        just(']').to(Token::RBracket),
    ));

    let token = choice((
        var,
        ident,
        number,
        single_quoted,
        double_quoted,
        operator,
        symbol,
    ))
    .map_with(|tok, e| (tok, e.span()));

    token
        .padded()
        .repeated()
        .collect()
        .padded()
        .then_ignore(end())
}

/// Lex an expression source into tokens.
pub fn lex(source: &str) -> Result<Vec<(Token<'_>, SimpleSpan)>, Vec<Rich<'_, char>>> {
    let (tokens, errs) = lexer().parse(source).into_output_errors();
    if errs.is_empty() {
        Ok(tokens.unwrap_or_default())
    } else {
        Err(errs)
    }
}
