use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Eof,
    Def,
    Extern,
    Ident(String),
    Number(f64),
    /// Any other single character, punctuation and operators alike.
    Char(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Eof => write!(f, "end of input"),
            Token::Def => write!(f, "'def'"),
            Token::Extern => write!(f, "'extern'"),
            Token::Ident(ident) => write!(f, "identifier '{}'", ident),
            Token::Number(num) => write!(f, "number {}", num),
            Token::Char(c) => write!(f, "'{}'", c),
        }
    }
}

lazy_static! {
    static ref FLOAT_PREFIX_RE: Regex = Regex::new(r"^(\d+\.?\d*|\.\d+)").unwrap();
}

/// Parse a run of digits and dots, keeping the longest leading prefix that is a
/// valid float. A run with no such prefix (".", "..") is 0.
fn parse_number(literal: &str) -> f64 {
    FLOAT_PREFIX_RE
        .find(literal)
        .and_then(|prefix| prefix.as_str().parse().ok())
        .unwrap_or(0.0)
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

/// Turns a character stream into tokens, one per call to [`Lexer::next_token`].
///
/// The lexer holds exactly one pending character between calls: the one that
/// ended the previous token. `None` stands for end of input.
pub struct Lexer<I> {
    input: I,
    last_char: Option<char>,
}

impl<I: Iterator<Item = char>> Lexer<I> {
    pub fn new(input: I) -> Self {
        Self {
            input,
            last_char: Some(' '),
        }
    }

    fn bump(&mut self) {
        self.last_char = self.input.next();
    }

    fn accumulate(&mut self, buf: &mut String, pred: fn(char) -> bool) {
        while let Some(c) = self.last_char.filter(|&c| pred(c)) {
            buf.push(c);
            self.bump();
        }
    }

    pub fn next_token(&mut self) -> Token {
        let token = self.scan();
        log::trace!("token {:?}", token);
        token
    }

    fn scan(&mut self) -> Token {
        loop {
            while self.last_char.map_or(false, char::is_whitespace) {
                self.bump();
            }

            let c = match self.last_char {
                Some(c) => c,
                None => return Token::Eof,
            };

            if c.is_alphabetic() {
                let mut ident = String::new();
                self.accumulate(&mut ident, char::is_alphanumeric);
                return match ident.as_str() {
                    "def" => Token::Def,
                    "extern" => Token::Extern,
                    _ => Token::Ident(ident),
                };
            }

            if is_number_char(c) {
                let mut literal = String::new();
                self.accumulate(&mut literal, is_number_char);
                return Token::Number(parse_number(&literal));
            }

            if c == '#' {
                while self.last_char.map_or(false, |c| c != '\n' && c != '\r') {
                    self.bump();
                }
                // end of input is picked up at the top of the loop
                continue;
            }

            self.bump();
            return Token::Char(c);
        }
    }
}

impl<I: Iterator<Item = char>> Iterator for Lexer<I> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        match self.next_token() {
            Token::Eof => None,
            tok => Some(tok),
        }
    }
}
