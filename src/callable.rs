//! Callable runtime objects: native functions, user functions (closures) and
//! classes, plus the instances classes produce.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// Anything that can appear in callee position.
///
/// The interpreter checks `arity` against the argument count before `call`
/// runs, so implementations may assume the counts match.
pub trait LoxCallable: fmt::Debug + fmt::Display {
    fn arity(&self) -> usize;

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>, paren: &Token)
        -> Result<Value>;
}

type NativeFn = Box<dyn Fn(&[Value]) -> std::result::Result<Value, String>>;

/// A function implemented by the host.
pub struct NativeFunction {
    name: &'static str,
    arity: usize,
    func: NativeFn,
}

impl NativeFunction {
    pub fn new(name: &'static str, arity: usize, func: NativeFn) -> Self {
        Self { name, arity, func }
    }

    /// `clock()`: seconds elapsed since this native was created.
    pub fn clock() -> Self {
        let started: Instant = Instant::now();

        Self::new(
            "clock",
            0,
            Box::new(move |_args: &[Value]| Ok(Value::Number(started.elapsed().as_secs_f64()))),
        )
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn>")
    }
}

impl LoxCallable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, _interpreter: &mut Interpreter, arguments: Vec<Value>, paren: &Token) -> Result<Value> {
        debug!("Calling native function '{}'", self.name);

        (self.func)(&arguments).map_err(|msg| LoxError::runtime(paren.line, msg))
    }
}

/// A user function paired with the environment it was declared in.
#[derive(Debug)]
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef) -> Self {
        Self {
            declaration,
            closure,
        }
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.declaration.name.lexeme)
    }
}

impl LoxCallable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>, _paren: &Token) -> Result<Value> {
        debug!("Calling user-defined function '{}'", self.declaration.name.lexeme);

        let mut frame = Environment::with_enclosing(self.closure.clone());
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            frame.define(&param.lexeme, argument);
        }

        match interpreter.execute_block(&self.declaration.body, frame.into_ref())? {
            Flow::Return { value, .. } => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

/// A class: a zero-arity constructor for field-bag instances.
#[derive(Debug, Clone)]
pub struct LoxClass {
    name: Rc<str>,
}

impl LoxClass {
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl LoxCallable for LoxClass {
    fn arity(&self) -> usize {
        0
    }

    fn call(&self, _interpreter: &mut Interpreter, _arguments: Vec<Value>, _paren: &Token) -> Result<Value> {
        debug!("Instantiating class '{}'", self.name);

        Ok(Value::Instance(Rc::new(RefCell::new(LoxInstance::new(
            self.clone(),
        )))))
    }
}

/// An object with freeform fields.
#[derive(Debug)]
pub struct LoxInstance {
    class: LoxClass,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: LoxClass) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    /// Read a field; unset fields are a runtime error.
    pub fn get(&self, name: &Token) -> Result<Value> {
        self.fields.get(&name.lexeme).cloned().ok_or_else(|| {
            LoxError::runtime(name.line, format!("Undefined property '{}'.", name.lexeme))
        })
    }

    /// Create or overwrite a field.
    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name())
    }
}
