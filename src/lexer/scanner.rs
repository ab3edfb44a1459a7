//! Scanner for Tern source code.

use crate::error::LexerError;
use crate::lexer::token::{Token, TokenKind};
use crate::span::Span;

/// The lexer transforms source code into a stream of tokens.
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    line: usize,
    column: usize,
    start_pos: usize,
    start_line: usize,
    start_column: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            line: 1,
            column: 1,
            start_pos: 0,
            start_line: 1,
            start_column: 1,
        }
    }

    /// Scan all tokens from the source, ending with `Eof`.
    pub fn scan_tokens(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.scan_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    /// Scan the next token.
    pub fn scan_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace_and_comments();
        self.mark_start();

        let Some((_, c)) = self.advance() else {
            return Ok(Token::eof(self.current_pos, self.line, self.column));
        };

        match c {
            '(' => Ok(self.make_token(TokenKind::LeftParen)),
            ')' => Ok(self.make_token(TokenKind::RightParen)),
            '{' => Ok(self.make_token(TokenKind::LeftBrace)),
            '}' => Ok(self.make_token(TokenKind::RightBrace)),
            '[' => Ok(self.make_token(TokenKind::LeftBracket)),
            ']' => Ok(self.make_token(TokenKind::RightBracket)),
            ',' => Ok(self.make_token(TokenKind::Comma)),
            ':' => Ok(self.make_token(TokenKind::Colon)),
            ';' => Ok(self.make_token(TokenKind::Semicolon)),
            '?' => Ok(self.make_token(TokenKind::Question)),
            '+' => Ok(self.make_token(TokenKind::Plus)),
            '/' => Ok(self.make_token(TokenKind::Slash)),
            '%' => Ok(self.make_token(TokenKind::Percent)),
            '.' => {
                if self.match_char('.') {
                    Ok(self.make_token(TokenKind::DotDot))
                } else {
                    Ok(self.make_token(TokenKind::Dot))
                }
            }
            '*' => {
                if self.match_char('*') {
                    Ok(self.make_token(TokenKind::StarStar))
                } else {
                    Ok(self.make_token(TokenKind::Star))
                }
            }
            '-' => {
                if self.match_char('>') {
                    Ok(self.make_token(TokenKind::Arrow))
                } else {
                    Ok(self.make_token(TokenKind::Minus))
                }
            }
            '=' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::EqualEqual))
                } else if self.match_char('>') {
                    Ok(self.make_token(TokenKind::FatArrow))
                } else {
                    Ok(self.make_token(TokenKind::Equal))
                }
            }
            '!' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::BangEqual))
                } else {
                    Ok(self.make_token(TokenKind::Not))
                }
            }
            '<' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::LessEqual))
                } else {
                    Ok(self.make_token(TokenKind::Less))
                }
            }
            '>' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::GreaterEqual))
                } else {
                    Ok(self.make_token(TokenKind::Greater))
                }
            }
            '&' => {
                if self.match_char('&') {
                    Ok(self.make_token(TokenKind::And))
                } else {
                    Err(LexerError::unexpected_char(c, self.current_span()))
                }
            }
            '|' => {
                if self.match_char('|') {
                    Ok(self.make_token(TokenKind::Or))
                } else {
                    Err(LexerError::unexpected_char(c, self.current_span()))
                }
            }

            '"' | '\'' => self.scan_string(c),

            c if c.is_ascii_digit() => self.scan_number(c),

            c if c.is_alphabetic() || c == '_' => self.scan_identifier(c),

            _ => Err(LexerError::unexpected_char(c, self.current_span())),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r') => {
                    self.advance();
                }
                Some('\n') => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                }
                Some('#') => self.skip_line(),
                Some('/') if self.peek_next() == Some('/') => self.skip_line(),
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        while self.peek().is_some() && self.peek() != Some('\n') {
            self.advance();
        }
    }

    fn scan_string(&mut self, quote: char) -> Result<Token, LexerError> {
        let mut value = String::new();

        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(LexerError::unterminated_string(self.current_span()));
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some(c) => return Err(LexerError::invalid_escape(c, self.current_span())),
                        None => return Err(LexerError::unterminated_string(self.current_span())),
                    };
                    self.advance();
                    value.push(escaped);
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }

        Ok(self.make_token(TokenKind::StringLiteral(value)))
    }

    fn scan_number(&mut self, first: char) -> Result<Token, LexerError> {
        let mut value = String::from(first);
        let mut is_float = false;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                value.push(c);
                self.advance();
            } else if c == '.' && !is_float {
                // `1..5` is a range and `1.abs()` a method call, not a float
                match self.peek_next() {
                    Some(next) if next.is_ascii_digit() => {
                        is_float = true;
                        value.push(c);
                        self.advance();
                    }
                    _ => break,
                }
            } else if c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        if is_float {
            let n: f64 = value
                .parse()
                .map_err(|_| LexerError::invalid_number(value.clone(), self.current_span()))?;
            Ok(self.make_token(TokenKind::FloatLiteral(n)))
        } else {
            let n: i64 = value
                .parse()
                .map_err(|_| LexerError::invalid_number(value.clone(), self.current_span()))?;
            Ok(self.make_token(TokenKind::IntLiteral(n)))
        }
    }

    fn scan_identifier(&mut self, first: char) -> Result<Token, LexerError> {
        let mut value = String::from(first);

        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                value.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let kind = TokenKind::keyword(&value).unwrap_or(TokenKind::Identifier(value));
        Ok(self.make_token(kind))
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let (pos, c) = self.chars.next()?;
        self.current_pos = pos + c.len_utf8();
        self.column += 1;
        Some((pos, c))
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.source[self.current_pos..].chars();
        iter.next();
        iter.next()
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn mark_start(&mut self) {
        self.start_pos = self.current_pos;
        self.start_line = self.line;
        self.start_column = self.column;
    }

    fn current_span(&self) -> Span {
        Span::new(
            self.start_pos,
            self.current_pos,
            self.start_line,
            self.start_column,
        )
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.current_span())
    }
}
