use std::collections::HashMap;

use crate::lexer::Token;

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum OperatorError {
    #[error("'{0}' cannot be used as a binary operator")]
    InvalidSymbol(char),
    #[error("precedence of '{0}' must be positive, found {1}")]
    InvalidPrecedence(char, i32),
}

/// Characters the grammar already claims for itself.
const RESERVED: &[char] = &['(', ')', ',', ';', '#', '.'];

/// Binary operator precedences; higher binds tighter.
///
/// The table is filled in before parsing starts and handed to the parser by
/// value, so nothing can change it mid-parse.
#[derive(Debug, Clone)]
pub struct OperatorTable {
    precedence: HashMap<char, i32>,
}

impl Default for OperatorTable {
    fn default() -> Self {
        let mut precedence = HashMap::new();
        precedence.insert('<', 10);
        precedence.insert('+', 20);
        precedence.insert('-', 20);
        precedence.insert('*', 40);
        Self { precedence }
    }
}

impl OperatorTable {
    pub fn empty() -> Self {
        Self {
            precedence: HashMap::new(),
        }
    }

    /// Add an operator or override the precedence of an existing one.
    pub fn insert(&mut self, op: char, precedence: i32) -> Result<(), OperatorError> {
        if !op.is_ascii_graphic() || op.is_ascii_alphanumeric() || RESERVED.contains(&op) {
            return Err(OperatorError::InvalidSymbol(op));
        }
        if precedence <= 0 {
            return Err(OperatorError::InvalidPrecedence(op, precedence));
        }
        self.precedence.insert(op, precedence);
        Ok(())
    }

    pub fn get(&self, op: char) -> Option<i32> {
        self.precedence.get(&op).copied()
    }

    /// Precedence of `token` as a binary operator, or -1 when it is not one.
    pub fn precedence(&self, token: &Token) -> i32 {
        match token {
            Token::Char(c) if c.is_ascii() => self.get(*c).unwrap_or(-1),
            _ => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_precedences() {
        let table = OperatorTable::default();
        assert_eq!(table.precedence(&Token::Char('<')), 10);
        assert_eq!(table.precedence(&Token::Char('+')), 20);
        assert_eq!(table.precedence(&Token::Char('-')), 20);
        assert_eq!(table.precedence(&Token::Char('*')), 40);
    }

    #[test]
    fn non_operators_are_negative() {
        let table = OperatorTable::default();
        assert_eq!(table.precedence(&Token::Char('/')), -1);
        assert_eq!(table.precedence(&Token::Char(')')), -1);
        assert_eq!(table.precedence(&Token::Char('é')), -1);
        assert_eq!(table.precedence(&Token::Number(1.0)), -1);
        assert_eq!(table.precedence(&Token::Eof), -1);
    }

    #[test]
    fn insert_validates() {
        let mut table = OperatorTable::empty();
        assert_eq!(table.insert('/', 40), Ok(()));
        assert_eq!(table.precedence(&Token::Char('/')), 40);
        assert_eq!(table.insert('(', 5), Err(OperatorError::InvalidSymbol('(')));
        assert_eq!(table.insert('a', 5), Err(OperatorError::InvalidSymbol('a')));
        assert_eq!(table.insert(' ', 5), Err(OperatorError::InvalidSymbol(' ')));
        assert_eq!(
            table.insert('%', 0),
            Err(OperatorError::InvalidPrecedence('%', 0))
        );
    }

    #[test]
    fn insert_overrides() {
        let mut table = OperatorTable::default();
        table.insert('+', 50).unwrap();
        assert_eq!(table.get('+'), Some(50));
    }
}
