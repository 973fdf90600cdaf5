use std::fmt;
use strum_macros::Display;

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TokenKind {
    Number, String, Identifier, Keyword,
    Operator, Symbol,

    // Literal words.
    Boolean, Nil,

    EndOfInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    /// Tokens after which a `+`/`-` is a binary operator rather than a sign.
    pub fn ends_operand(&self) -> bool {
        match self.kind {
            TokenKind::Number
            | TokenKind::String
            | TokenKind::Identifier
            | TokenKind::Boolean
            | TokenKind::Nil => true,
            TokenKind::Symbol => self.text == ")" || self.text == "]",
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::EndOfInput => write!(f, "end of input"),
            TokenKind::String => write!(f, "\"{}\"", self.text),
            _ => write!(f, "'{}'", self.text),
        }
    }
}
