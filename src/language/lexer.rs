use crate::language::{
    errors::SyntaxError,
    span::Span,
    token::{Token, TokenKind},
};
use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while, take_while1},
    character::complete::{char, digit1, hex_digit1, multispace1, not_line_ending},
    combinator::{map, map_res, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult,
};

pub fn lex(source: &str) -> Result<Vec<Token>, Vec<SyntaxError>> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut rest = source;
    loop {
        rest = match trivia(rest) {
            Ok((next, ())) => next,
            Err(_) => rest,
        };
        let Some(current) = rest.chars().next() else {
            break;
        };
        let start = source.len() - rest.len();
        match token(rest) {
            Ok((next, kind)) => {
                let end = source.len() - next.len();
                tokens.push(Token {
                    kind,
                    span: Span::new(start, end),
                });
                rest = next;
            }
            Err(_) => {
                let end = start + current.len_utf8();
                errors.push(
                    SyntaxError::new(
                        format!("Unexpected character `{current}`"),
                        Span::new(start, end),
                    )
                    .with_label("not a valid token"),
                );
                rest = &rest[current.len_utf8()..];
            }
        }
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(source.len(), source.len()),
    });

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

fn trivia(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((multispace1, preceded(tag("//"), not_line_ending)))),
    )(input)
}

fn token(input: &str) -> IResult<&str, TokenKind> {
    alt((byte_string, integer, word, punctuation))(input)
}

fn word(input: &str) -> IResult<&str, TokenKind> {
    map(
        recognize(pair(
            take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        )),
        |text: &str| {
            TokenKind::keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()))
        },
    )(input)
}

fn integer(input: &str) -> IResult<&str, TokenKind> {
    alt((
        map_res(preceded(tag("0x"), hex_digit1), |digits: &str| {
            i64::from_str_radix(digits, 16).map(TokenKind::Integer)
        }),
        map_res(digit1, |digits: &str| {
            digits.parse::<i64>().map(TokenKind::Integer)
        }),
    ))(input)
}

fn byte_string(input: &str) -> IResult<&str, TokenKind> {
    map(
        delimited(
            tag("b\""),
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((
                    value("\n", char('n')),
                    value("\t", char('t')),
                    value("\0", char('0')),
                    value("\\", char('\\')),
                    value("\"", char('"')),
                )),
            )),
            char('"'),
        ),
        |text: Option<String>| TokenKind::ByteString(text.unwrap_or_default().into_bytes()),
    )(input)
}

fn punctuation(input: &str) -> IResult<&str, TokenKind> {
    alt((
        alt((
            value(TokenKind::Arrow, tag("->")),
            value(TokenKind::EqEq, tag("==")),
            value(TokenKind::BangEq, tag("!=")),
            value(TokenKind::LtEq, tag("<=")),
            value(TokenKind::GtEq, tag(">=")),
        )),
        alt((
            value(TokenKind::Ampersand, char('&')),
            value(TokenKind::Bang, char('!')),
            value(TokenKind::Eq, char('=')),
            value(TokenKind::Lt, char('<')),
            value(TokenKind::Gt, char('>')),
            value(TokenKind::Plus, char('+')),
            value(TokenKind::Minus, char('-')),
            value(TokenKind::Star, char('*')),
            value(TokenKind::Pipe, char('|')),
            value(TokenKind::Dot, char('.')),
            value(TokenKind::Comma, char(',')),
            value(TokenKind::Colon, char(':')),
            value(TokenKind::Semi, char(';')),
            value(TokenKind::LParen, char('(')),
            value(TokenKind::RParen, char(')')),
            value(TokenKind::LBrace, char('{')),
            value(TokenKind::RBrace, char('}')),
            value(TokenKind::LBracket, char('[')),
            value(TokenKind::RBracket, char(']')),
        )),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .expect("lex")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn keywords_and_identifiers_are_distinguished() {
        assert_eq!(
            kinds("def value_1 val mut"),
            vec![
                TokenKind::Def,
                TokenKind::Identifier("value_1".into()),
                TokenKind::Val,
                TokenKind::Mut,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped_and_spans_are_byte_offsets() {
        let tokens = lex("// header\nx -> 0x1f").expect("lex");
        assert_eq!(tokens[0].kind, TokenKind::Identifier("x".into()));
        assert_eq!(tokens[0].span, Span::new(10, 11));
        assert_eq!(tokens[1].kind, TokenKind::Arrow);
        assert_eq!(tokens[2].kind, TokenKind::Integer(31));
    }

    #[test]
    fn byte_strings_decode_escapes() {
        assert_eq!(
            kinds(r#"b"a\n""#)[0],
            TokenKind::ByteString(vec![b'a', b'\n'])
        );
        assert_eq!(kinds(r#"b"""#)[0], TokenKind::ByteString(Vec::new()));
    }

    #[test]
    fn unknown_characters_are_reported_and_skipped() {
        let errors = lex("val x = 1 @ 2;").expect_err("should fail");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].span, Span::new(10, 11));
    }
}
