use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use crate::ast::{Expression, Function, Prototype};
use crate::backend::{Backend, BackendError};
use crate::builtins;

/// Evaluation frames allowed at once. Every binary node and every call below
/// the entry point takes one.
pub const MAX_EVAL_DEPTH: usize = 1024;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Less,
}

impl BinOp {
    fn from_char(op: char) -> Option<Self> {
        match op {
            '+' => Some(BinOp::Add),
            '-' => Some(BinOp::Sub),
            '*' => Some(BinOp::Mul),
            '/' => Some(BinOp::Div),
            '<' => Some(BinOp::Less),
            _ => None,
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinOp::Add => lhs + rhs,
            BinOp::Sub => lhs - rhs,
            BinOp::Mul => lhs * rhs,
            BinOp::Div => lhs / rhs,
            BinOp::Less => {
                if lhs < rhs {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// A function body after name resolution: variables become argument slots.
#[derive(Debug, PartialEq, Clone)]
pub enum Code {
    Const(f64),
    Param(usize),
    Binary(BinOp, Box<Code>, Box<Code>),
    Call(String, Vec<Code>),
}

#[derive(Debug, Clone)]
pub struct FunctionHandle {
    pub name: String,
    pub arity: usize,
    body: Option<Rc<Code>>,
}

struct Symbol {
    prototype: Prototype,
    body: Option<Rc<Code>>,
}

/// Lowers functions to [`Code`] and evaluates them directly.
pub struct Interpreter<W = io::Stdout> {
    symbols: HashMap<String, Symbol>,
    named_values: HashMap<String, usize>,
    output: W,
    max_depth: usize,
}

impl Interpreter<io::Stdout> {
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    /// An interpreter whose `putchard`/`printd` write to `output`.
    pub fn with_output(output: W) -> Self {
        Self {
            symbols: HashMap::new(),
            named_values: HashMap::new(),
            output,
            max_depth: MAX_EVAL_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.symbols
            .get(name)
            .map_or(false, |symbol| symbol.body.is_some())
    }

    fn handle(name: &str, symbol: &Symbol) -> FunctionHandle {
        FunctionHandle {
            name: name.to_string(),
            arity: symbol.prototype.params.len(),
            body: symbol.body.clone(),
        }
    }

    fn eval(&mut self, code: &Code, frame: &[f64], depth: usize) -> Result<f64, BackendError> {
        if depth > self.max_depth {
            return Err(BackendError::DepthExceeded(self.max_depth));
        }
        match code {
            Code::Const(value) => Ok(*value),
            Code::Param(slot) => frame
                .get(*slot)
                .copied()
                .ok_or_else(|| BackendError::UnknownVariable(format!("#{}", slot))),
            Code::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs, frame, depth + 1)?;
                let rhs = self.eval(rhs, frame, depth + 1)?;
                Ok(op.apply(lhs, rhs))
            }
            Code::Call(callee, args) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, frame, depth + 1)?);
                }
                self.call(callee, &values, depth + 1)
            }
        }
    }

    fn call(&mut self, callee: &str, args: &[f64], depth: usize) -> Result<f64, BackendError> {
        let body = match self.symbols.get(callee) {
            Some(symbol) => symbol.body.clone(),
            None => return Err(BackendError::UnknownFunction(callee.to_string())),
        };

        match body {
            Some(body) => self.eval(&body, args, depth),
            None => {
                let builtin = builtins::lookup(callee, args.len())
                    .ok_or_else(|| BackendError::UnresolvedSymbol(callee.to_string()))?;
                (builtin.call)(args, &mut self.output)
                    .map_err(|e| BackendError::Output(e.to_string()))
            }
        }
    }
}

impl<W: Write> Backend for Interpreter<W> {
    type Handle = FunctionHandle;
    type Value = Code;

    fn lower_prototype(&mut self, proto: &Prototype) -> Result<FunctionHandle, BackendError> {
        if proto.is_anonymous() {
            return Ok(FunctionHandle {
                name: String::new(),
                arity: proto.params.len(),
                body: None,
            });
        }

        if let Some(symbol) = self.symbols.get(&proto.name) {
            let declared = symbol.prototype.params.len();
            if declared != proto.params.len() {
                return Err(BackendError::ConflictingDeclaration(
                    proto.name.clone(),
                    declared,
                    proto.params.len(),
                ));
            }
            return Ok(Self::handle(&proto.name, symbol));
        }

        log::debug!("declared {}/{}", proto.name, proto.params.len());
        let symbol = Symbol {
            prototype: proto.clone(),
            body: None,
        };
        let handle = Self::handle(&proto.name, &symbol);
        self.symbols.insert(proto.name.clone(), symbol);
        Ok(handle)
    }

    fn lower_function(&mut self, function: &Function) -> Result<FunctionHandle, BackendError> {
        let Function {
            prototype: proto,
            body,
        } = function;

        if self.is_defined(&proto.name) {
            return Err(BackendError::Redefinition(proto.name.clone()));
        }
        let declared_before = self.symbols.contains_key(&proto.name);
        let mut handle = self.lower_prototype(proto)?;

        self.named_values.clear();
        for (i, param) in proto.params.iter().enumerate() {
            self.named_values.insert(param.clone(), i);
        }
        let lowered = self.lower_expr(body);
        self.named_values.clear();

        let code = match lowered {
            Ok(code) => Rc::new(code),
            Err(e) => {
                if !declared_before {
                    self.symbols.remove(&proto.name);
                }
                return Err(e);
            }
        };

        if let Some(symbol) = self.symbols.get_mut(&proto.name) {
            symbol.prototype = proto.clone();
            symbol.body = Some(Rc::clone(&code));
            log::debug!("defined {}/{}", proto.name, proto.params.len());
        }
        handle.body = Some(code);
        Ok(handle)
    }

    fn lower_expr(&mut self, expr: &Expression) -> Result<Code, BackendError> {
        match expr {
            Expression::Number(value) => Ok(Code::Const(*value)),
            Expression::Variable(name) => match self.named_values.get(name) {
                Some(slot) => Ok(Code::Param(*slot)),
                None => Err(BackendError::UnknownVariable(name.clone())),
            },
            Expression::Binary(op, left, right) => {
                let op = BinOp::from_char(*op).ok_or(BackendError::InvalidOperator(*op))?;
                let lhs = self.lower_expr(left)?;
                let rhs = self.lower_expr(right)?;
                Ok(Code::Binary(op, Box::new(lhs), Box::new(rhs)))
            }
            Expression::Call(callee, args) => {
                let declared = match self.symbols.get(callee) {
                    Some(symbol) => symbol.prototype.params.len(),
                    None => return Err(BackendError::UnknownFunction(callee.clone())),
                };
                if declared != args.len() {
                    return Err(BackendError::IncorrectArgumentCount(
                        callee.clone(),
                        declared,
                        args.len(),
                    ));
                }

                let mut lowered = Vec::with_capacity(args.len());
                for arg in args {
                    lowered.push(self.lower_expr(arg)?);
                }
                Ok(Code::Call(callee.clone(), lowered))
            }
        }
    }

    fn execute(&mut self, handle: &FunctionHandle) -> Result<f64, BackendError> {
        if handle.arity != 0 {
            return Err(BackendError::NotExecutable(handle.name.clone(), handle.arity));
        }
        match handle.body {
            Some(ref body) => {
                let body = Rc::clone(body);
                self.eval(&body, &[], 0)
            }
            None => self.call(&handle.name, &[], 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::OperatorTable;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn interpreter() -> Interpreter<Vec<u8>> {
        Interpreter::with_output(Vec::new())
    }

    fn define(interp: &mut Interpreter<Vec<u8>>, src: &str) -> Result<FunctionHandle, BackendError> {
        let func = Parser::new(src.chars(), OperatorTable::default())
            .parse_definition()
            .unwrap();
        interp.lower_function(&func)
    }

    fn declare(interp: &mut Interpreter<Vec<u8>>, src: &str) -> Result<FunctionHandle, BackendError> {
        let proto = Parser::new(src.chars(), OperatorTable::default())
            .parse_extern()
            .unwrap();
        interp.lower_prototype(&proto)
    }

    fn eval(interp: &mut Interpreter<Vec<u8>>, src: &str) -> Result<f64, BackendError> {
        let mut operators = OperatorTable::default();
        operators.insert('/', 40).unwrap();
        let func = Parser::new(src.chars(), operators)
            .parse_top_level_expr()
            .unwrap();
        let handle = interp.lower_function(&func)?;
        interp.execute(&handle)
    }

    #[test]
    fn arithmetic() {
        let mut interp = interpreter();
        assert_eq!(eval(&mut interp, "1+2*3"), Ok(7.0));
        assert_eq!(eval(&mut interp, "(1+2)*3"), Ok(9.0));
        assert_eq!(eval(&mut interp, "10-4-3"), Ok(3.0));
        assert_eq!(eval(&mut interp, "9/3"), Ok(3.0));
        assert_eq!(eval(&mut interp, "1<2"), Ok(1.0));
        assert_eq!(eval(&mut interp, "2<1"), Ok(0.0));
    }

    #[test]
    fn lowering_resolves_params_to_slots() {
        let mut interp = interpreter();
        interp.named_values.insert("b".to_string(), 1);
        let expr = Expression::binary('*', Expression::Variable("b".to_string()), Expression::Number(2.0));
        assert_eq!(
            interp.lower_expr(&expr),
            Ok(Code::Binary(
                BinOp::Mul,
                Box::new(Code::Param(1)),
                Box::new(Code::Const(2.0))
            ))
        );
    }

    #[test]
    fn functions_and_calls() {
        let mut interp = interpreter();
        define(&mut interp, "def foo(a b) a+b").unwrap();
        assert_eq!(eval(&mut interp, "foo(1, 2) * 2"), Ok(6.0));
        define(&mut interp, "def twice(x) foo(x, x)").unwrap();
        assert_eq!(eval(&mut interp, "twice(4)"), Ok(8.0));
    }

    #[test]
    fn redefinition_fails() {
        let mut interp = interpreter();
        define(&mut interp, "def foo(a) a").unwrap();
        assert_eq!(
            define(&mut interp, "def foo(a) a").unwrap_err(),
            BackendError::Redefinition("foo".to_string())
        );
    }

    #[test]
    fn extern_redeclaration_is_idempotent() {
        let mut interp = interpreter();
        declare(&mut interp, "extern foo(a)").unwrap();
        declare(&mut interp, "extern foo(a)").unwrap();
        assert_eq!(
            declare(&mut interp, "extern foo(a b)").unwrap_err(),
            BackendError::ConflictingDeclaration("foo".to_string(), 1, 2)
        );
    }

    #[test]
    fn extern_then_definition() {
        let mut interp = interpreter();
        declare(&mut interp, "extern foo(a)").unwrap();
        define(&mut interp, "def foo(x) x*10").unwrap();
        declare(&mut interp, "extern foo(y)").unwrap();
        assert_eq!(eval(&mut interp, "foo(2)"), Ok(20.0));
    }

    #[test]
    fn scope_does_not_leak_between_functions() {
        let mut interp = interpreter();
        define(&mut interp, "def foo(a) a").unwrap();
        assert_eq!(
            define(&mut interp, "def bar(b) a").unwrap_err(),
            BackendError::UnknownVariable("a".to_string())
        );
        assert_eq!(
            eval(&mut interp, "a"),
            Err(BackendError::UnknownVariable("a".to_string()))
        );
    }

    #[test]
    fn failed_body_leaves_nothing_behind() {
        let mut interp = interpreter();
        assert!(define(&mut interp, "def bad(a) nope(a)").is_err());
        assert_eq!(
            eval(&mut interp, "bad(1)"),
            Err(BackendError::UnknownFunction("bad".to_string()))
        );
        // and a good definition can follow
        define(&mut interp, "def bad(a) a").unwrap();
        assert_eq!(eval(&mut interp, "bad(5)"), Ok(5.0));
    }

    #[test]
    fn call_errors() {
        let mut interp = interpreter();
        define(&mut interp, "def foo(a b) a+b").unwrap();
        assert_eq!(
            eval(&mut interp, "foo(1, 2, 3)"),
            Err(BackendError::IncorrectArgumentCount("foo".to_string(), 2, 3))
        );
        assert_eq!(
            eval(&mut interp, "bar(1)"),
            Err(BackendError::UnknownFunction("bar".to_string()))
        );
    }

    #[test]
    fn invalid_operator() {
        let mut interp = interpreter();
        let func = Function {
            prototype: Prototype::anonymous(),
            body: Expression::binary('%', Expression::Number(1.0), Expression::Number(2.0)),
        };
        assert_eq!(
            interp.lower_function(&func).unwrap_err(),
            BackendError::InvalidOperator('%')
        );
    }

    #[test]
    fn externs_bind_to_host_functions() {
        let mut interp = interpreter();
        declare(&mut interp, "extern sqrt(x)").unwrap();
        declare(&mut interp, "extern putchard(c)").unwrap();
        assert_eq!(eval(&mut interp, "sqrt(16)"), Ok(4.0));
        assert_eq!(eval(&mut interp, "putchard(79) + putchard(75)"), Ok(0.0));
        assert_eq!(interp.output(), b"OK");
    }

    #[test]
    fn unresolved_extern_fails_at_execution() {
        let mut interp = interpreter();
        declare(&mut interp, "extern mystery(x)").unwrap();
        assert_eq!(
            eval(&mut interp, "mystery(1)"),
            Err(BackendError::UnresolvedSymbol("mystery".to_string()))
        );
    }

    #[test]
    fn recursion_is_bounded() {
        let mut interp = interpreter().with_max_depth(64);
        define(&mut interp, "def forever(x) forever(x + 1)").unwrap();
        assert_eq!(
            eval(&mut interp, "forever(0)"),
            Err(BackendError::DepthExceeded(64))
        );
        // the interpreter is still usable
        assert_eq!(eval(&mut interp, "1 + 1"), Ok(2.0));
    }

    #[test]
    fn deep_recursive_body_is_bounded() {
        let mut interp = interpreter();
        let body = format!("{}f(n + 1){}", "0 + (".repeat(120), ")".repeat(120));
        define(&mut interp, &format!("def f(n) {}", body)).unwrap();
        assert_eq!(
            eval(&mut interp, "f(0)"),
            Err(BackendError::DepthExceeded(MAX_EVAL_DEPTH))
        );
        assert_eq!(eval(&mut interp, "2 * 3"), Ok(6.0));
    }

    #[test]
    fn binary_nodes_count_towards_depth() {
        let mut interp = interpreter().with_max_depth(3);
        assert_eq!(eval(&mut interp, "1+1+1"), Ok(3.0));
        assert_eq!(
            eval(&mut interp, "1+1+1+1+1"),
            Err(BackendError::DepthExceeded(3))
        );
    }

    #[test]
    fn anonymous_functions_are_not_registered() {
        let mut interp = interpreter();
        assert_eq!(eval(&mut interp, "1"), Ok(1.0));
        assert_eq!(eval(&mut interp, "2"), Ok(2.0));
        assert!(!interp.is_defined(""));
    }

    #[test]
    fn named_zero_arity_functions_execute() {
        let mut interp = interpreter();
        let handle = define(&mut interp, "def three() 1 + 2").unwrap();
        assert_eq!(interp.execute(&handle), Ok(3.0));
        let handle = define(&mut interp, "def id(x) x").unwrap();
        assert_eq!(
            interp.execute(&handle),
            Err(BackendError::NotExecutable("id".to_string(), 1))
        );
    }
}
