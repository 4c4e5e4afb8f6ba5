use std::iter::Peekable;
use std::str::CharIndices;

use crate::diagnostics::{Diagnostic, SourceSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Fn,
    If,
    Else,
    While,
    For,
    In,
    Break,
    Continue,
    Return,
    True,
    False,
    Nil,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Int,
    Float,
    Str,
    Keyword(Keyword),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    BangEqual,
    EqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AndAnd,
    OrOr,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// For `Str` tokens this is the unescaped contents; otherwise the raw slice.
    pub lexeme: String,
    pub span: SourceSpan,
}

/// A lexing failure. `truncated` marks tokens cut off by the end of the
/// input (unterminated string or block comment) so interactive callers can
/// ask for more lines instead of reporting an error.
#[derive(Debug)]
pub struct LexError {
    pub diagnostic: Diagnostic,
    pub truncated: bool,
}

impl LexError {
    fn new(message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            diagnostic: Diagnostic::lexer(message).with_span(span),
            truncated: false,
        }
    }

    fn truncated(message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            diagnostic: Diagnostic::lexer(message).with_span(span),
            truncated: true,
        }
    }
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let Some((start, ch)) = self.chars.next() else {
                let end = self.source.len();
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    lexeme: String::new(),
                    span: SourceSpan::new(end, end),
                });
                return Ok(tokens);
            };
            let token = match ch {
                'a'..='z' | 'A'..='Z' | '_' => self.word(start),
                '0'..='9' => self.number(start),
                '"' => self.string(start)?,
                '(' => self.punct(start, 1, TokenKind::LParen),
                ')' => self.punct(start, 1, TokenKind::RParen),
                '{' => self.punct(start, 1, TokenKind::LBrace),
                '}' => self.punct(start, 1, TokenKind::RBrace),
                '[' => self.punct(start, 1, TokenKind::LBracket),
                ']' => self.punct(start, 1, TokenKind::RBracket),
                ',' => self.punct(start, 1, TokenKind::Comma),
                '.' => self.punct(start, 1, TokenKind::Dot),
                ':' => self.punct(start, 1, TokenKind::Colon),
                ';' => self.punct(start, 1, TokenKind::Semicolon),
                '+' => self.punct(start, 1, TokenKind::Plus),
                '-' => self.punct(start, 1, TokenKind::Minus),
                '*' => self.punct(start, 1, TokenKind::Star),
                '/' => self.punct(start, 1, TokenKind::Slash),
                '%' => self.punct(start, 1, TokenKind::Percent),
                '=' => self.either(start, '=', TokenKind::EqualEqual, TokenKind::Assign),
                '!' => self.either(start, '=', TokenKind::BangEqual, TokenKind::Bang),
                '<' => self.either(start, '=', TokenKind::LessEqual, TokenKind::Less),
                '>' => self.either(start, '=', TokenKind::GreaterEqual, TokenKind::Greater),
                '&' => {
                    if self.eat('&') {
                        self.punct(start, 2, TokenKind::AndAnd)
                    } else {
                        return Err(LexError::new(
                            "unexpected character `&` (did you mean `&&`?)",
                            SourceSpan::new(start, start + 1),
                        ));
                    }
                }
                '|' => {
                    if self.eat('|') {
                        self.punct(start, 2, TokenKind::OrOr)
                    } else {
                        return Err(LexError::new(
                            "unexpected character `|` (did you mean `||`?)",
                            SourceSpan::new(start, start + 1),
                        ));
                    }
                }
                other => {
                    return Err(LexError::new(
                        format!("unexpected character `{other}`"),
                        SourceSpan::new(start, start + other.len_utf8()),
                    ));
                }
            };
            tokens.push(token);
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if matches!(self.chars.peek(), Some((_, ch)) if *ch == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            while matches!(self.chars.peek(), Some((_, ch)) if ch.is_whitespace()) {
                self.chars.next();
            }
            let Some(&(start, '/')) = self.chars.peek() else {
                return Ok(());
            };
            let mut lookahead = self.chars.clone();
            lookahead.next();
            match lookahead.peek() {
                Some((_, '/')) => {
                    while matches!(self.chars.peek(), Some((_, ch)) if *ch != '\n') {
                        self.chars.next();
                    }
                }
                Some((_, '*')) => {
                    self.chars.next();
                    self.chars.next();
                    let mut depth = 1usize;
                    loop {
                        match self.chars.next() {
                            Some((_, '*')) if self.eat('/') => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            Some((_, '/')) if self.eat('*') => depth += 1,
                            Some(_) => {}
                            None => {
                                return Err(LexError::truncated(
                                    "unterminated block comment",
                                    SourceSpan::new(start, self.source.len()),
                                ));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn current_pos(&mut self) -> usize {
        match self.chars.peek() {
            Some((idx, _)) => *idx,
            None => self.source.len(),
        }
    }

    fn punct(&mut self, start: usize, len: usize, kind: TokenKind) -> Token {
        Token {
            kind,
            lexeme: self.source[start..start + len].to_string(),
            span: SourceSpan::new(start, start + len),
        }
    }

    fn either(&mut self, start: usize, next: char, long: TokenKind, short: TokenKind) -> Token {
        if self.eat(next) {
            self.punct(start, 2, long)
        } else {
            self.punct(start, 1, short)
        }
    }

    fn word(&mut self, start: usize) -> Token {
        while matches!(self.chars.peek(), Some((_, ch)) if ch.is_alphanumeric() || *ch == '_') {
            self.chars.next();
        }
        let end = self.current_pos();
        let lexeme = self.source[start..end].to_string();
        let kind = keyword_for(&lexeme).unwrap_or(TokenKind::Identifier);
        Token {
            kind,
            lexeme,
            span: SourceSpan::new(start, end),
        }
    }

    fn number(&mut self, start: usize) -> Token {
        while matches!(self.chars.peek(), Some((_, ch)) if ch.is_ascii_digit() || *ch == '_') {
            self.chars.next();
        }
        let mut kind = TokenKind::Int;
        // A dot only belongs to the number when a digit follows, so that
        // `1.abs` still lexes as int-dot-identifier.
        let mut lookahead = self.chars.clone();
        if let (Some((_, '.')), Some((_, '0'..='9'))) = {
            let dot = lookahead.next();
            (dot, lookahead.peek().copied())
        } {
            kind = TokenKind::Float;
            self.chars.next();
            while matches!(self.chars.peek(), Some((_, ch)) if ch.is_ascii_digit() || *ch == '_') {
                self.chars.next();
            }
        }
        let end = self.current_pos();
        Token {
            kind,
            lexeme: self.source[start..end].to_string(),
            span: SourceSpan::new(start, end),
        }
    }

    fn string(&mut self, start: usize) -> Result<Token, LexError> {
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some((idx, '"')) => {
                    return Ok(Token {
                        kind: TokenKind::Str,
                        lexeme: value,
                        span: SourceSpan::new(start, idx + 1),
                    });
                }
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, '"')) => value.push('"'),
                    Some((_, '\\')) => value.push('\\'),
                    Some((_, other)) => value.push(other),
                    None => {
                        return Err(LexError::truncated(
                            "unterminated string literal",
                            SourceSpan::new(start, self.source.len()),
                        ));
                    }
                },
                Some((_, ch)) => value.push(ch),
                None => {
                    return Err(LexError::truncated(
                        "unterminated string literal",
                        SourceSpan::new(start, self.source.len()),
                    ));
                }
            }
        }
    }
}

fn keyword_for(ident: &str) -> Option<TokenKind> {
    use self::Keyword as Kw;
    let keyword = match ident {
        "fn" => Kw::Fn,
        "if" => Kw::If,
        "else" => Kw::Else,
        "while" => Kw::While,
        "for" => Kw::For,
        "in" => Kw::In,
        "break" => Kw::Break,
        "continue" => Kw::Continue,
        "return" => Kw::Return,
        "true" => Kw::True,
        "false" => Kw::False,
        "nil" => Kw::Nil,
        _ => return None,
    };
    Some(TokenKind::Keyword(keyword))
}
