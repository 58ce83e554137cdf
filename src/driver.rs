use crate::ast::{Expression, Function, Prototype};
use crate::backend::{Backend, BackendError};
use crate::lexer::Token;
use crate::operators::OperatorTable;
use crate::parser::{Parser, ParserError};

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// The result of handling one top-level form.
#[derive(Debug, PartialEq, Clone)]
pub enum Outcome {
    /// A `;` separator was consumed.
    Separator,
    Declared(Prototype),
    Defined(Function),
    Evaluated { expr: Expression, value: f64 },
    /// The form was dropped and one token skipped.
    Failed(DriverError),
}

enum Form {
    Eof,
    Separator,
    Definition,
    Extern,
    Expression,
}

impl Form {
    fn of(token: &Token) -> Self {
        match token {
            Token::Eof => Form::Eof,
            Token::Char(';') => Form::Separator,
            Token::Def => Form::Definition,
            Token::Extern => Form::Extern,
            _ => Form::Expression,
        }
    }
}

/// Feeds top-level forms from the parser to a backend one at a time.
///
/// Any failure, parse or backend, is confined to the form that caused it: the
/// partial AST is dropped, exactly one token is skipped and the loop carries on.
pub struct Driver<I, B> {
    parser: Parser<I>,
    backend: B,
}

impl<I: Iterator<Item = char>, B: Backend> Driver<I, B> {
    pub fn new(input: I, operators: OperatorTable, backend: B) -> Self {
        Self {
            parser: Parser::new(input, operators),
            backend,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    fn handle_definition(&mut self) -> Result<Outcome, DriverError> {
        let func = self.parser.parse_definition()?;
        log::debug!("lowering def {} {}", func.prototype, func.body);
        self.backend.lower_function(&func)?;
        Ok(Outcome::Defined(func))
    }

    fn handle_extern(&mut self) -> Result<Outcome, DriverError> {
        let proto = self.parser.parse_extern()?;
        log::debug!("lowering extern {}", proto);
        self.backend.lower_prototype(&proto)?;
        Ok(Outcome::Declared(proto))
    }

    fn handle_top_level_expression(&mut self) -> Result<Outcome, DriverError> {
        let func = self.parser.parse_top_level_expr()?;
        log::debug!("evaluating {}", func.body);
        let handle = self.backend.lower_function(&func)?;
        let value = self.backend.execute(&handle)?;
        Ok(Outcome::Evaluated {
            expr: func.body,
            value,
        })
    }

    /// Handle the next top-level form; `None` once the input is exhausted.
    pub fn handle_next(&mut self) -> Option<Outcome> {
        let result = match Form::of(self.parser.current()) {
            Form::Eof => return None,
            Form::Separator => {
                self.parser.advance();
                return Some(Outcome::Separator);
            }
            Form::Definition => self.handle_definition(),
            Form::Extern => self.handle_extern(),
            Form::Expression => self.handle_top_level_expression(),
        };

        Some(result.unwrap_or_else(|e| {
            log::warn!("skipping token {} after error: {}", self.parser.current(), e);
            self.parser.advance();
            Outcome::Failed(e)
        }))
    }

    /// Run to end of input, passing every outcome to `sink`.
    pub fn run<F: FnMut(Outcome)>(&mut self, mut sink: F) {
        while let Some(outcome) = self.handle_next() {
            sink(outcome);
        }
    }
}
