use crate::language::span::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Identifier(String),
    Integer(i64),
    ByteString(Vec<u8>),

    Def,
    Extern,
    Struct,
    Enum,
    Interface,
    Implementation,
    For,
    Const,
    Import,
    As,
    Val,
    Mut,
    Return,
    While,
    If,
    Then,
    Else,
    Match,
    New,
    This,
    True,
    False,
    NullPtr,
    PointerCast,
    SizeOf,
    Defer,
    And,
    Or,

    Ampersand,
    Bang,
    BangEq,
    Eq,
    EqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Pipe,
    Dot,
    Comma,
    Colon,
    Semi,
    Underscore,

    Arrow, // ->

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Eof,
}

impl TokenKind {
    pub fn keyword(text: &str) -> Option<TokenKind> {
        let kind = match text {
            "def" => TokenKind::Def,
            "extern" => TokenKind::Extern,
            "struct" => TokenKind::Struct,
            "enum" => TokenKind::Enum,
            "interface" => TokenKind::Interface,
            "implementation" => TokenKind::Implementation,
            "for" => TokenKind::For,
            "const" => TokenKind::Const,
            "import" => TokenKind::Import,
            "as" => TokenKind::As,
            "val" => TokenKind::Val,
            "mut" => TokenKind::Mut,
            "return" => TokenKind::Return,
            "while" => TokenKind::While,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "match" => TokenKind::Match,
            "new" => TokenKind::New,
            "this" => TokenKind::This,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "nullptr" => TokenKind::NullPtr,
            "pointer_cast" => TokenKind::PointerCast,
            "size_of" => TokenKind::SizeOf,
            "defer" => TokenKind::Defer,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "_" => TokenKind::Underscore,
            _ => return None,
        };
        Some(kind)
    }

    pub fn describe(&self) -> String {
        match self {
            TokenKind::Identifier(name) => format!("identifier `{name}`"),
            TokenKind::Integer(value) => format!("integer `{value}`"),
            TokenKind::ByteString(_) => "byte string".into(),
            TokenKind::Eof => "end of file".into(),
            other => format!("`{other:?}`").to_lowercase(),
        }
    }
}
