use crate::ast::{Expression, Function, Prototype};
use crate::lexer::{Lexer, Token};
use crate::operators::OperatorTable;

/// Deepest expression nesting accepted before giving up on a form. Bounds both
/// parser recursion and the height of every tree the parser hands out.
pub const MAX_NESTING: usize = 128;

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum ParserError {
    #[error("unknown token {0}, expected an expression")]
    UnknownToken(Token),
    #[error("expected ')', found {0}")]
    ExpectedCloseParen(Token),
    #[error("expected ')' or ',' in argument list, found {0}")]
    ExpectedCloseParenOrComma(Token),
    #[error("expected function name in prototype, found {0}")]
    ExpectedFunctionName(Token),
    #[error("expected '(' in prototype, found {0}")]
    ExpectedOpenParen(Token),
    #[error("duplicate parameter '{0}' in prototype")]
    DuplicateParameter(String),
    #[error("expression nested deeper than {0} levels")]
    NestingTooDeep(usize),
}

pub type PartialParseResult = Result<Expression, ParserError>;

/// An expression together with the height of its tree.
type Node = (Expression, usize);
type PartialNode = Result<Node, ParserError>;

fn checked_height(height: usize) -> Result<usize, ParserError> {
    if height > MAX_NESTING {
        Err(ParserError::NestingTooDeep(MAX_NESTING))
    } else {
        Ok(height)
    }
}

/// Recursive-descent parser with precedence climbing for binary expressions.
///
/// The only state carried between productions is the current token. Every
/// production returns with the current token already past whatever it consumed.
pub struct Parser<I> {
    lexer: Lexer<I>,
    current: Token,
    operators: OperatorTable,
    depth: usize,
}

impl<I: Iterator<Item = char>> Parser<I> {
    pub fn new(input: I, operators: OperatorTable) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            operators,
            depth: 0,
        }
    }

    pub fn current(&self) -> &Token {
        &self.current
    }

    pub fn advance(&mut self) -> &Token {
        self.current = self.lexer.next_token();
        &self.current
    }

    pub fn operators(&self) -> &OperatorTable {
        &self.operators
    }

    fn parse_number(&mut self, value: f64) -> PartialNode {
        self.advance();
        Ok((Expression::Number(value), 1))
    }

    fn parse_nested(&mut self) -> PartialNode {
        self.advance();
        let res = self.parse_node()?;
        if self.current != Token::Char(')') {
            return Err(ParserError::ExpectedCloseParen(self.current.clone()));
        }
        self.advance();
        Ok(res)
    }

    fn parse_identifier(&mut self, ident: String) -> PartialNode {
        self.advance();
        if self.current != Token::Char('(') {
            return Ok((Expression::Variable(ident), 1));
        }
        self.advance();

        let mut args = Vec::new();
        let mut height = 0;
        if self.current != Token::Char(')') {
            loop {
                let (arg, arg_height) = self.parse_node()?;
                args.push(arg);
                height = height.max(arg_height);
                match self.current {
                    Token::Char(')') => break,
                    Token::Char(',') => {
                        self.advance();
                    }
                    _ => {
                        return Err(ParserError::ExpectedCloseParenOrComma(
                            self.current.clone(),
                        ))
                    }
                }
            }
        }
        self.advance();

        Ok((Expression::Call(ident, args), checked_height(height + 1)?))
    }

    fn parse_primary(&mut self) -> PartialNode {
        match self.current {
            Token::Number(value) => self.parse_number(value),
            Token::Ident(ref ident) => {
                let ident = ident.clone();
                self.parse_identifier(ident)
            }
            Token::Char('(') => self.parse_nested(),
            _ => Err(ParserError::UnknownToken(self.current.clone())),
        }
    }

    fn parse_rhs(&mut self, expr_precedence: i32, lhs: Node) -> PartialNode {
        let (mut result, mut height) = lhs;

        loop {
            let precedence = self.operators.precedence(&self.current);
            if precedence < expr_precedence {
                return Ok((result, height));
            }
            let operator = match self.current {
                Token::Char(op) => op,
                _ => return Ok((result, height)),
            };
            self.advance();

            let mut rhs = self.parse_primary()?;

            let next_precedence = self.operators.precedence(&self.current);
            if precedence < next_precedence {
                rhs = self.parse_rhs(precedence + 1, rhs)?;
            }

            height = checked_height(height.max(rhs.1) + 1)?;
            result = Expression::binary(operator, result, rhs.0);
        }
    }

    fn parse_node(&mut self) -> PartialNode {
        if self.depth >= MAX_NESTING {
            return Err(ParserError::NestingTooDeep(MAX_NESTING));
        }
        self.depth += 1;
        let node = self.parse_primary().and_then(|lhs| self.parse_rhs(0, lhs));
        self.depth -= 1;
        node
    }

    pub fn parse_expression(&mut self) -> PartialParseResult {
        self.parse_node().map(|(expr, _)| expr)
    }

    pub fn parse_prototype(&mut self) -> Result<Prototype, ParserError> {
        let name = match self.current {
            Token::Ident(ref name) => name.clone(),
            _ => return Err(ParserError::ExpectedFunctionName(self.current.clone())),
        };
        self.advance();

        if self.current != Token::Char('(') {
            return Err(ParserError::ExpectedOpenParen(self.current.clone()));
        }

        let mut params: Vec<String> = Vec::new();
        while let Token::Ident(param) = self.advance() {
            if params.contains(param) {
                return Err(ParserError::DuplicateParameter(param.clone()));
            }
            params.push(param.clone());
        }

        if self.current != Token::Char(')') {
            return Err(ParserError::ExpectedCloseParen(self.current.clone()));
        }
        self.advance();

        Ok(Prototype::new(name, params))
    }

    /// `'def' prototype expression`
    pub fn parse_definition(&mut self) -> Result<Function, ParserError> {
        self.advance();
        let prototype = self.parse_prototype()?;
        let body = self.parse_expression()?;
        Ok(Function { prototype, body })
    }

    /// `'extern' prototype`
    pub fn parse_extern(&mut self) -> Result<Prototype, ParserError> {
        self.advance();
        self.parse_prototype()
    }

    /// Wraps a bare expression in an anonymous zero-parameter function.
    pub fn parse_top_level_expr(&mut self) -> Result<Function, ParserError> {
        let body = self.parse_expression()?;
        Ok(Function {
            prototype: Prototype::anonymous(),
            body,
        })
    }
}
