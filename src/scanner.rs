use crate::error::LexError;
use crate::token::{Position, Token, TokenKind};
use log::debug;
use phf::phf_map;
use std::iter::Peekable;
use std::str::CharIndices;

// Note: the character under consideration is always self.iter.peek()
struct Scanner<'a> {
    iter: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut scanner = Scanner {
        iter: source.char_indices().peekable(),
        line: 1,
        column: 1,
        tokens: Vec::new(),
    };

    loop {
        scanner.skip_whitespace_and_comments();
        if scanner.peek().is_none() {
            break;
        }
        let token = scanner.scan_token()?;
        scanner.tokens.push(token);
    }
    let position = scanner.position();
    scanner.tokens.push(Token {
        kind: TokenKind::EndOfInput,
        text: String::new(),
        position,
    });
    debug!("scanned {} tokens", scanner.tokens.len());
    Ok(scanner.tokens)
}

impl<'a> Scanner<'a> {
    fn scan_token(&mut self) -> Result<Token, LexError> {
        let start = self.position();
        // skip_whitespace_and_comments guarantees a character is available.
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(self.token(TokenKind::EndOfInput, String::new(), start)),
        };
        match c {
            '0'..='9' => self.number(start),
            '.' if self.peek_next().map_or(false, |n| n.is_ascii_digit()) => self.number(start),
            '+' | '-' if self.starts_signed_number() => self.number(start),
            'a'..='z' | 'A'..='Z' => Ok(self.identifier(start)),
            '"' => self.string(start),
            ';' | ',' | '(' | ')' | '[' | ']' => {
                self.advance();
                Ok(self.token(TokenKind::Symbol, c.to_string(), start))
            }
            '=' | '<' | '>' | '!' | '+' | '-' | '*' | '/' | '&' | '|' | '^' | ':' | '%' => {
                Ok(self.operator(c, start))
            }
            _ => Err(LexError::UnexpectedCharacter {
                character: c,
                position: start,
            }),
        }
    }
    fn token(&self, kind: TokenKind, text: String, position: Position) -> Token {
        Token {
            kind,
            text,
            position,
        }
    }
    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }
    fn peek(&mut self) -> Option<char> {
        self.iter.peek().map(|(_, c)| *c)
    }
    fn peek_next(&self) -> Option<char> {
        let mut x = self.iter.clone();
        x.next();
        x.next().map(|(_, c)| c)
    }
    fn peek_second(&self) -> Option<char> {
        let mut x = self.iter.clone();
        x.next();
        x.next();
        x.next().map(|(_, c)| c)
    }
    fn advance(&mut self) -> Option<char> {
        let (_, c) = self.iter.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }
    fn next_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            return true;
        }
        false
    }
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_next() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_next() == Some('*') => {
                    self.advance();
                    self.advance();
                    // An unterminated block comment runs to the end of input.
                    while let Some(c) = self.advance() {
                        if c == '*' && self.next_if('/') {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }
    /// A sign starts a number only where an operand is expected, so that
    /// `a-1` stays a subtraction.
    fn starts_signed_number(&self) -> bool {
        if self.tokens.last().map_or(false, Token::ends_operand) {
            return false;
        }
        match self.peek_next() {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => self.peek_second().map_or(false, |c| c.is_ascii_digit()),
            _ => false,
        }
    }
    fn number(&mut self, start: Position) -> Result<Token, LexError> {
        let mut text = String::new();
        if let Some(sign @ '+') | Some(sign @ '-') = self.peek() {
            text.push(sign);
            self.advance();
        }

        let mut dot_seen = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {
                    text.push(c);
                    self.advance();
                }
                '.' => {
                    if dot_seen {
                        return Err(LexError::InvalidNumber {
                            reason: "multiple dots",
                            position: start,
                        });
                    }
                    dot_seen = true;
                    text.push(c);
                    self.advance();
                }
                'e' | 'E' => {
                    text.push(c);
                    self.advance();
                    self.exponent(&mut text, start)?;
                    break;
                }
                _ => break,
            }
        }
        Ok(self.token(TokenKind::Number, text, start))
    }
    fn exponent(&mut self, text: &mut String, start: Position) -> Result<(), LexError> {
        if let Some(sign @ '+') | Some(sign @ '-') = self.peek() {
            text.push(sign);
            self.advance();
        }
        if !self.peek().map_or(false, |c| c.is_ascii_digit()) {
            return Err(LexError::InvalidNumber {
                reason: "exponent without digits",
                position: start,
            });
        }
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.advance();
        }
        if self.peek() == Some('.') {
            return Err(LexError::InvalidNumber {
                reason: "dot after exponent",
                position: start,
            });
        }
        Ok(())
    }
    fn identifier(&mut self, start: Position) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | 'a'..='z' | 'A'..='Z' | '_' => {
                    text.push(c);
                    self.advance();
                }
                _ => {
                    break;
                }
            }
        }
        let kind = KEYWORDS
            .get(text.as_str())
            .copied()
            .unwrap_or(TokenKind::Identifier);
        self.token(kind, text, start)
    }
    fn string(&mut self, start: Position) -> Result<Token, LexError> {
        // Opening quote.
        self.advance();
        let mut text = String::new();
        loop {
            match self.advance() {
                None => return Err(LexError::UnterminatedString { position: start }),
                Some('"') => break,
                Some('\\') => match self.advance() {
                    None => return Err(LexError::UnterminatedString { position: start }),
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(other) => text.push(other),
                },
                Some(c) => text.push(c),
            }
        }
        Ok(self.token(TokenKind::String, text, start))
    }
    fn operator(&mut self, first: char, start: Position) -> Token {
        self.advance();
        let second = match (first, self.peek()) {
            ('=', Some('=')) | ('!', Some('=')) | ('<', Some('=')) | ('>', Some('=')) => '=',
            ('%', Some('=')) => '=',
            ('&', Some('&')) => '&',
            ('|', Some('|')) => '|',
            _ => return self.token(TokenKind::Operator, first.to_string(), start),
        };
        self.advance();
        let mut text = first.to_string();
        text.push(second);
        self.token(TokenKind::Operator, text, start)
    }
}

static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "if" => TokenKind::Keyword,
    "else" => TokenKind::Keyword,
    "then" => TokenKind::Keyword,
    "end" => TokenKind::Keyword,
    "function" => TokenKind::Keyword,
    "while" => TokenKind::Keyword,
    "for" => TokenKind::Keyword,
    "in" => TokenKind::Keyword,
    "return" => TokenKind::Keyword,
    "and" => TokenKind::Keyword,
    "or" => TokenKind::Keyword,
    "not" => TokenKind::Keyword,
    "true" => TokenKind::Boolean,
    "false" => TokenKind::Boolean,
    "break" => TokenKind::Keyword,
    "continue" => TokenKind::Keyword,
    "nil" => TokenKind::Nil,
};
