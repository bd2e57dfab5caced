//! Tree‑walking interpreter for Lox.
//!
//! The pipeline is scanner → parser → resolver → interpreter; each stage
//! stops the run if it reports errors.

pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use ast::Stmt;
use error::LoxError;
use interpreter::Interpreter;

pub use parser::parse;
pub use scanner::scan;

/// Resolve and run `statements` in a fresh interpreter writing to stdout.
pub fn resolve_and_interpret(statements: &[Stmt]) -> Vec<LoxError> {
    Interpreter::new().resolve_and_interpret(statements)
}

/// Run `source` through every stage in `interpreter`, stopping at the first
/// stage that reports errors.
pub fn run(interpreter: &mut Interpreter, source: &str) -> Vec<LoxError> {
    let (tokens, errors) = scan(source);
    if !errors.is_empty() {
        return errors;
    }

    let (statements, errors) = parse(&tokens);
    if !errors.is_empty() {
        return errors;
    }

    interpreter.resolve_and_interpret(&statements)
}
