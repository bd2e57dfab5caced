#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rox::ast::Stmt;
use rox::error::LoxError;
use rox::interpreter::Interpreter;

/// In-memory `print` sink that stays readable after the interpreter takes
/// ownership of its clone.
#[derive(Clone, Default)]
pub struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("output is UTF-8")
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Interpreter wired to a fresh capture buffer.
pub fn interpreter() -> (Interpreter, SharedBuf) {
    let buf = SharedBuf::default();
    let interpreter = Interpreter::with_output(Box::new(buf.clone()));
    (interpreter, buf)
}

/// Run a whole program; returns printed output and any error records.
pub fn run(source: &str) -> (String, Vec<LoxError>) {
    let (mut interpreter, buf) = interpreter();
    let errors = rox::run(&mut interpreter, source);
    (buf.contents(), errors)
}

/// Run a program that must succeed; returns its output.
pub fn run_ok(source: &str) -> String {
    let (out, errors) = run(source);
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    out
}

/// Scan and parse a program that must be free of syntax errors.
pub fn parse_ok(source: &str) -> Vec<Stmt> {
    let (tokens, errors) = rox::scan(source);
    assert!(errors.is_empty(), "scan errors: {:?}", errors);

    let (statements, errors) = rox::parse(&tokens);
    assert!(errors.is_empty(), "parse errors: {:?}", errors);

    statements
}
