//! Static pass between parsing and execution.
//!
//! Walks the tree once with a stack of block scopes and produces the
//! binding-distance table the interpreter uses for local variables.  Names
//! that no enclosing scope declares are globals and get no entry.  The walk
//! stops at the first static error.

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::{LoxError, Result};
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;

/// Binding distances keyed by node identity (0 = innermost scope).
pub type Locals = HashMap<ExprId, usize>;

/// Resolve a whole program with a fresh resolver.
pub fn resolve(statements: &[Stmt]) -> Result<Locals> {
    Resolver::new().resolve(statements)
}

#[derive(Debug, Default)]
struct Scope {
    bindings: HashMap<String, bool>, // false=declared, true=defined
    is_function: bool,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances.
#[derive(Debug, Default)]
pub struct Resolver {
    scopes: Vec<Scope>,
    locals: Locals,
    /// Global whose initializer is being resolved.  Globals have no scope
    /// entry, so self-reference at top level is tracked here.
    initializing_global: Option<String>,
}

impl Resolver {
    pub fn new() -> Self {
        debug!("New resolver");

        Self::default()
    }

    /// Walk all top‑level statements and hand back the distance table.
    /// The first static error aborts the pass.
    pub fn resolve(mut self, statements: &[Stmt]) -> Result<Locals> {
        info!("Resolving {} top-level statement(s)", statements.len());

        self.resolve_stmts(statements)?;

        info!("Resolved {} local reference(s)", self.locals.len());

        Ok(self.locals)
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) -> Result<()> {
        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }

        Ok(())
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Class { name } => {
                self.declare(name)?;
                self.define(name);
            }

            Stmt::Block(statements) => {
                self.begin_scope(false);
                self.resolve_stmts(statements)?;
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name)?;
                if let Some(expr) = initializer {
                    if self.scopes.is_empty() {
                        self.initializing_global = Some(name.lexeme.clone());
                    }
                    self.resolve_expr(expr)?;
                    self.initializing_global = None;
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // name is visible inside its own body, so recursion resolves
                self.declare(&decl.name)?;
                self.define(&decl.name);
                self.resolve_function(decl)?;
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
            }

            Stmt::Return { keyword, value } => {
                if !self.in_function() {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "Cannot return from top-level code.",
                    ));
                }
                if let Some(expr) = value {
                    self.resolve_expr(expr)?;
                }
            }
        }

        Ok(())
    }

    fn resolve_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner)?;
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right)?;
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            Expr::Variable { id, name } => {
                let uninitialized: bool = match self.scopes.last() {
                    Some(scope) => scope.bindings.get(&name.lexeme) == Some(&false),
                    None => self.initializing_global.as_deref() == Some(name.lexeme.as_str()),
                };

                if uninitialized {
                    return Err(LoxError::resolve(
                        name.line,
                        "Cannot read local variable in its own initializer.",
                    ));
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value)?;
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;
                for arg in arguments {
                    self.resolve_expr(arg)?;
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object)?,

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value)?;
                self.resolve_expr(object)?;
            }
        }

        Ok(())
    }

    /// Parameters and body share one function-flagged scope.
    fn resolve_function(&mut self, decl: &FunctionDecl) -> Result<()> {
        self.begin_scope(true);

        for param in &decl.params {
            self.declare(param)?;
            self.define(param);
        }
        self.resolve_stmts(&decl.body)?;

        self.end_scope();

        Ok(())
    }

    /// Push a scope.  Nested scopes inherit the function flag of their parent.
    #[inline]
    fn begin_scope(&mut self, is_function: bool) {
        let is_function: bool = is_function || self.in_function();

        self.scopes.push(Scope {
            bindings: HashMap::new(),
            is_function,
        });
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    #[inline]
    fn in_function(&self) -> bool {
        self.scopes.last().is_some_and(|scope| scope.is_function)
    }

    /// Top-level names are not tracked; the environment allows redefinition
    /// there.
    fn declare(&mut self, name: &Token) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.bindings.contains_key(&name.lexeme) {
                return Err(LoxError::resolve(
                    name.line,
                    "Variable with this name already declared in this scope.",
                ));
            }
            scope.bindings.insert(name.lexeme.clone(), false);
        }

        Ok(())
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.bindings.insert(name.lexeme.clone(), true);
        }
    }

    /// Record this occurrence as a local at depth `d`, or leave it out of the
    /// table (global) if no scope declares it.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.bindings.contains_key(&name.lexeme) {
                debug!("Resolved '{}' {} at depth {}", name.lexeme, id, depth);
                self.locals.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' {} as global", name.lexeme, id);
    }
}
