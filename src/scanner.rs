//! Streaming lexer.
//!
//! [`Scanner`] walks the source bytes once and yields `Result<Token>` items:
//! lexical errors are reported in-line and scanning resumes at the next
//! character.  The final item is always a single `EOF` token, after which the
//! iterator is exhausted for good.
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! for item in Scanner::new("print 123; // trailing comment") {
//!     match item {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("{}", err),
//!     }
//! }
//! ```

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

/// Reserved words, looked up after an identifier has been consumed.
static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and"    => TokenType::AND,
    "class"  => TokenType::CLASS,
    "else"   => TokenType::ELSE,
    "false"  => TokenType::FALSE,
    "fun"    => TokenType::FUN,
    "for"    => TokenType::FOR,
    "if"     => TokenType::IF,
    "nil"    => TokenType::NIL,
    "or"     => TokenType::OR,
    "print"  => TokenType::PRINT,
    "return" => TokenType::RETURN,
    "super"  => TokenType::SUPER,
    "this"   => TokenType::THIS,
    "true"   => TokenType::TRUE,
    "var"    => TokenType::VAR,
    "while"  => TokenType::WHILE,
};

/// Scan `source` to completion, collecting tokens and error records
/// separately.  The token list always ends with `EOF`.
pub fn scan(source: &str) -> (Vec<Token>, Vec<LoxError>) {
    let (ok, err): (Vec<_>, Vec<_>) = Scanner::new(source).partition(|item| item.is_ok());

    let tokens: Vec<Token> = ok.into_iter().flatten().collect();
    let errors: Vec<LoxError> = err.into_iter().filter_map(|item| item.err()).collect();

    info!(
        "Scanned {} token(s) with {} error(s)",
        tokens.len(),
        errors.len()
    );

    (tokens, errors)
}

/// Lexer state over one source string.
pub struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    /// First byte of the lexeme being built.
    start: usize,
    /// Next byte to look at.
    pos: usize,
    line: usize,
    done: bool,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            bytes: src.as_bytes(),
            start: 0,
            pos: 0,
            line: 1,
            done: false,
        }
    }

    #[inline(always)]
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Byte `offset` positions ahead, or `0` past the end.
    #[inline(always)]
    fn look(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn bump(&mut self) -> u8 {
        let b = self.look(0);
        self.pos += 1;
        b
    }

    /// One- or two-byte operator: `long` when the next byte is `second`.
    #[inline(always)]
    fn either(&mut self, second: u8, long: TokenType, short: TokenType) -> TokenType {
        if self.look(0) == second {
            self.pos += 1;
            long
        } else {
            short
        }
    }

    #[inline(always)]
    fn lexeme(&self) -> &'a str {
        &self.src[self.start..self.pos]
    }

    /// Consume one lexeme.  `Ok(None)` means it was trivia (whitespace,
    /// newline or comment).
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let tt: TokenType = match self.bump() {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            b'!' => self.either(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.either(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.either(b'=', TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.either(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'/' if self.look(0) == b'/' => {
                // Stop on the newline so the line count still sees it.
                self.pos = match memchr(b'\n', &self.bytes[self.pos..]) {
                    Some(offset) => self.pos + offset,
                    None => self.bytes.len(),
                };
                return Ok(None);
            }
            b'/' => TokenType::SLASH,

            b' ' | b'\r' | b'\t' => return Ok(None),
            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'"' => self.string()?,
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                // Report and skip the whole code point, not only its lead byte.
                let c: char = self.src[self.start..].chars().next().unwrap_or('\u{FFFD}');
                self.pos = self.start + c.len_utf8();

                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character {}", c),
                ));
            }
        };

        Ok(Some(tt))
    }

    /// Body of a string literal; the opening quote is already consumed.
    /// Strings may span lines.
    fn string(&mut self) -> Result<TokenType> {
        while !self.at_end() && self.look(0) != b'"' {
            if self.bump() == b'\n' {
                self.line += 1;
            }
        }

        if self.at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }
        self.pos += 1;

        let body: &str = &self.src[self.start + 1..self.pos - 1];
        Ok(TokenType::STRING(body.to_owned()))
    }

    /// Digits with an optional fraction.  A trailing `.` is left for the
    /// next token.
    fn number(&mut self) -> TokenType {
        let skip_digits = |s: &mut Self| {
            while s.look(0).is_ascii_digit() {
                s.pos += 1;
            }
        };

        skip_digits(self);
        if self.look(0) == b'.' && self.look(1).is_ascii_digit() {
            self.pos += 1;
            skip_digits(self);
        }

        // The lexeme is digits with at most one interior '.', which always parses.
        TokenType::NUMBER(self.lexeme().parse::<f64>().unwrap_or(0.0))
    }

    fn identifier(&mut self) -> TokenType {
        while matches!(self.look(0), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.pos += 1;
        }

        KEYWORDS
            .get(self.lexeme())
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while !self.at_end() {
            self.start = self.pos;

            match self.scan_token() {
                Ok(Some(tt)) => {
                    debug!("Scanned token ({:?}) on line {}", tt, self.line);
                    return Some(Ok(Token::new(tt, self.lexeme(), self.line)));
                }
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }

        self.done = true;
        Some(Ok(Token::new(TokenType::EOF, "", self.line)))
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
