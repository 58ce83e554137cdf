use crate::ast::{Expression, Function, Prototype};

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("unknown variable referenced {0}")]
    UnknownVariable(String),
    #[error("unknown function referenced {0}")]
    UnknownFunction(String),
    #[error("incorrect argument count in call to {0}: expected {1}, found {2}")]
    IncorrectArgumentCount(String, usize, usize),
    #[error("function {0} cannot be redefined")]
    Redefinition(String),
    #[error("{0} was declared with {1} parameters, redeclared with {2}")]
    ConflictingDeclaration(String, usize, usize),
    #[error("invalid binary operator {0}")]
    InvalidOperator(char),
    #[error("no body or host function for extern {0}")]
    UnresolvedSymbol(String),
    #[error("only zero-argument functions can be executed, {0} takes {1}")]
    NotExecutable(String, usize),
    #[error("evaluation depth exceeded {0}")]
    DepthExceeded(usize),
    #[error("failed to write output: {0}")]
    Output(String),
}

/// What a code generator or evaluator has to provide to consume parsed forms.
///
/// Every call concerns exactly one top-level form; an error leaves the backend
/// usable for the next one.
pub trait Backend {
    type Handle;
    type Value;

    /// Declare `name/arity`. Redeclaring an identical signature returns the
    /// existing symbol.
    fn lower_prototype(&mut self, proto: &Prototype) -> Result<Self::Handle, BackendError>;

    /// Give a function its body. Parameters are visible only inside that body.
    fn lower_function(&mut self, function: &Function) -> Result<Self::Handle, BackendError>;

    /// Lower one expression against the scope of the function being lowered.
    fn lower_expr(&mut self, expr: &Expression) -> Result<Self::Value, BackendError>;

    /// Run a zero-argument function, such as an anonymous top-level expression.
    fn execute(&mut self, handle: &Self::Handle) -> Result<f64, BackendError>;
}
