//! C tokenizer for witness source annotations.
//!
//! Only what a witness needs: token texts and the line each one starts on.
//! Comments, whitespace and preprocessor lines produce no tokens.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::str::Chars;

/// Tokens of one file, keyed by line. Each entry carries the token's global
/// 1-based index in file order.
pub type TokenMap = BTreeMap<u32, Vec<(usize, String)>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CToken {
    pub text: String,
    /// Line the token starts on (1-indexed).
    pub line: u32,
}

const PUNCTUATORS_3: &[&str] = &["<<=", ">>=", "..."];
const PUNCTUATORS_2: &[&str] = &[
    "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "*=", "/=", "%=", "+=",
    "-=", "&=", "^=", "|=", "##",
];

/// Tokenizer for C source text.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Chars<'a>,
    /// Current byte position.
    pos: usize,
    line: u32,
    /// No token has been seen on the current line yet.
    at_line_start: bool,
    token_start: usize,
    token_start_line: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars(),
            pos: 0,
            line: 1,
            at_line_start: true,
            token_start: 0,
            token_start_line: 1,
        }
    }

    pub fn tokenize(mut self) -> Vec<CToken> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }

    /// Next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Option<CToken> {
        loop {
            self.skip_whitespace();
            let c = self.peek()?;

            if c == '/' && self.peek_next() == Some('/') {
                self.skip_line_comment();
                continue;
            }
            if c == '/' && self.peek_next() == Some('*') {
                self.skip_block_comment();
                continue;
            }
            if c == '#' && self.at_line_start {
                self.skip_directive();
                continue;
            }
            break;
        }

        self.mark_token_start();
        self.at_line_start = false;
        let c = self.advance()?;

        if c == '"' || c == '\'' {
            self.lex_quoted(c);
        } else if c.is_ascii_digit() || (c == '.' && self.peek().is_some_and(|n| n.is_ascii_digit())) {
            self.lex_number();
        } else if c.is_alphabetic() || c == '_' {
            self.lex_identifier();
        } else {
            self.lex_punctuator(c);
        }
        Some(self.make_token())
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\\' && matches!(self.peek_next(), Some('\n')) {
                self.advance();
                self.advance();
            } else if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) {
        self.advance();
        self.advance();
        while let Some(c) = self.advance() {
            if c == '*' && self.peek() == Some('/') {
                self.advance();
                return;
            }
        }
    }

    /// Skip a preprocessor directive, following backslash continuations.
    fn skip_directive(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                '\n' => break,
                '\\' if self.peek_next() == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                '/' if self.peek_next() == Some('*') => self.skip_block_comment(),
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn mark_token_start(&mut self) {
        self.token_start = self.pos;
        self.token_start_line = self.line;
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.chars.clone();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.at_line_start = true;
        }
        Some(c)
    }

    fn make_token(&self) -> CToken {
        CToken {
            text: self.source[self.token_start..self.pos].to_string(),
            line: self.token_start_line,
        }
    }

    fn token_text(&self) -> &'a str {
        &self.source[self.token_start..self.pos]
    }

    /// String or character literal. An unterminated literal ends at the
    /// end of its line.
    fn lex_quoted(&mut self, quote: char) {
        while let Some(c) = self.peek() {
            match c {
                '\n' => return,
                '\\' => {
                    self.advance();
                    if self.peek().is_some_and(|n| n != '\n') {
                        self.advance();
                    }
                }
                _ => {
                    self.advance();
                    if c == quote {
                        return;
                    }
                }
            }
        }
    }

    /// Preprocessing number: digits, letters, `_`, `.` and signed exponents.
    fn lex_number(&mut self) {
        while let Some(c) = self.peek() {
            if matches!(c, 'e' | 'E' | 'p' | 'P') && matches!(self.peek_next(), Some('+' | '-')) {
                self.advance();
                self.advance();
            } else if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn lex_identifier(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        // encoding prefixes: L"..", u8"..", u'.', U".."
        if matches!(self.token_text(), "L" | "u" | "U" | "u8") {
            if let Some(quote @ ('"' | '\'')) = self.peek() {
                self.advance();
                self.lex_quoted(quote);
            }
        }
    }

    fn lex_punctuator(&mut self, first: char) {
        let rest = &self.source[self.pos..];
        let candidates = PUNCTUATORS_3.iter().chain(PUNCTUATORS_2.iter());
        for punct in candidates {
            let mut expected = punct.chars();
            if expected.next() == Some(first) && rest.starts_with(expected.as_str()) {
                for _ in 1..punct.len() {
                    self.advance();
                }
                return;
            }
        }
    }
}

/// Tokenize C source text.
pub fn tokenize(source: &str) -> Vec<CToken> {
    Lexer::new(source).tokenize()
}

/// Group tokens by line, numbering them 1, 2, ... in file order.
pub fn map_tokens_by_line(tokens: &[CToken]) -> TokenMap {
    let mut map = TokenMap::new();
    for (i, token) in tokens.iter().enumerate() {
        map.entry(token.line)
            .or_default()
            .push((i + 1, token.text.clone()));
    }
    map
}

/// Read and tokenize a source file. Invalid UTF-8 is replaced, not rejected.
pub fn tokenize_file(path: &Path) -> io::Result<TokenMap> {
    let bytes = std::fs::read(path)?;
    let source = String::from_utf8_lossy(&bytes);
    Ok(map_tokens_by_line(&tokenize(&source)))
}
