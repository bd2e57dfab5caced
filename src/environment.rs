//! Scope chain: one `Environment` per block, loop body and call, linked to
//! its parent.  Closures keep their defining environment alive through the
//! shared `Rc`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

use crate::error::{LoxError, Result};
use crate::value::Value;

/// Shared handle to a scope.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Bind `name` in this scope, replacing any existing binding.
    pub fn define(&mut self, name: &str, value: Value) {
        trace!("define '{}' = {}", name, value);
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up here, then along the enclosing chain.
    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(undefined(name, line))
        }
    }

    /// Overwrite the nearest existing binding of `name`.  Never creates one.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(undefined(name, line))
        }
    }

    /// Read `name` from the scope exactly `distance` links up the chain.
    pub fn get_at(&self, distance: usize, name: &str, line: usize) -> Result<Value> {
        if distance == 0 {
            return self
                .values
                .get(name)
                .cloned()
                .ok_or_else(|| undefined(name, line));
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get_at(distance - 1, name, line),
            None => Err(undefined(name, line)),
        }
    }

    /// Write `name` in the scope exactly `distance` links up the chain.
    pub fn assign_at(&mut self, distance: usize, name: &str, value: Value, line: usize) -> Result<()> {
        if distance == 0 {
            return match self.values.get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(undefined(name, line)),
            };
        }

        match &self.enclosing {
            Some(enclosing) => enclosing
                .borrow_mut()
                .assign_at(distance - 1, name, value, line),
            None => Err(undefined(name, line)),
        }
    }
}

fn undefined(name: &str, line: usize) -> LoxError {
    LoxError::runtime(line, format!("Undefined variable '{}'.", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_walks_the_chain_and_define_shadows() {
        let global: EnvRef = Environment::new().into_ref();
        global.borrow_mut().define("a", Value::Number(1.0));

        let mut inner = Environment::with_enclosing(global.clone());
        assert_eq!(inner.get("a", 1).unwrap(), Value::Number(1.0));

        inner.define("a", Value::Number(2.0));
        assert_eq!(inner.get("a", 1).unwrap(), Value::Number(2.0));
        assert_eq!(global.borrow().get("a", 1).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn assign_requires_an_existing_binding() {
        let mut env = Environment::new();
        let err = env.assign("missing", Value::Nil, 7).unwrap_err();

        assert_eq!(err.line(), 7);
        assert_eq!(err.message(), "Undefined variable 'missing'.");
    }

    #[test]
    fn distance_lookups_skip_intermediate_scopes() {
        let global: EnvRef = Environment::new().into_ref();
        global.borrow_mut().define("x", Value::Number(1.0));
        let middle: EnvRef = Environment::with_enclosing(global.clone()).into_ref();
        middle.borrow_mut().define("x", Value::Number(2.0));
        let mut inner = Environment::with_enclosing(middle.clone());

        assert_eq!(inner.get_at(2, "x", 1).unwrap(), Value::Number(1.0));

        inner.assign_at(2, "x", Value::Number(3.0), 1).unwrap();
        assert_eq!(global.borrow().get("x", 1).unwrap(), Value::Number(3.0));
        assert_eq!(middle.borrow().get("x", 1).unwrap(), Value::Number(2.0));
        assert!(inner.get_at(0, "x", 1).is_err());
    }
}
