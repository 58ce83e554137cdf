pub mod ast;
pub mod backend;
pub mod builtins;
pub mod driver;
pub mod interpreter;
pub mod lexer;
pub mod operators;
pub mod parser;
pub mod source;

pub use backend::{Backend, BackendError};
pub use driver::{Driver, DriverError, Outcome};
pub use interpreter::Interpreter;
pub use operators::OperatorTable;
pub use parser::{Parser, ParserError};
