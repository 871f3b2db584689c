//! Compile-time syntax errors the parser accepts
//!
//! `parse_module` only rejects code that does not fit the grammar. CPython and
//! Skulpt also refuse, when compiling, statements that parse fine but are
//! misplaced: `return` at module level, `break` outside a loop, duplicate
//! parameter names and the like. This visitor finds those.

use ruff_python_ast::{
    Expr, ModModule, Parameters, Stmt,
    visitor::{Visitor, walk_expr, walk_stmt},
};
use ruff_text_size::{Ranged, TextRange};
use rustc_hash::FxHashSet;

/// First misplaced construct found in a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct MisplacedSyntax {
    pub(super) message: String,
    pub(super) range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Module,
    Class,
    Function { is_async: bool },
}

#[derive(Debug)]
struct CompileTimeChecker {
    scopes: Vec<Scope>,
    /// Loops enclosing the current statement within the current scope
    loop_depth: usize,
    error: Option<MisplacedSyntax>,
}

/// Check `module`, returning the first error in source order
pub(super) fn check_module(module: &ModModule) -> Option<MisplacedSyntax> {
    let mut checker = CompileTimeChecker {
        scopes: vec![Scope::Module],
        loop_depth: 0,
        error: None,
    };
    checker.visit_body(&module.body);
    checker.error
}

impl CompileTimeChecker {
    fn report(&mut self, message: impl Into<String>, range: TextRange) {
        if self.error.is_none() {
            self.error = Some(MisplacedSyntax {
                message: message.into(),
                range,
            });
        }
    }

    fn scope(&self) -> Scope {
        self.scopes.last().copied().unwrap_or(Scope::Module)
    }

    fn in_function(&self) -> bool {
        matches!(self.scope(), Scope::Function { .. })
    }

    fn in_async_function(&self) -> bool {
        matches!(self.scope(), Scope::Function { is_async: true })
    }

    /// Run `f` inside a new scope. Loops of the enclosing scope do not count.
    fn in_scope(&mut self, scope: Scope, f: impl FnOnce(&mut Self)) {
        let loop_depth = std::mem::take(&mut self.loop_depth);
        self.scopes.push(scope);
        f(self);
        self.scopes.pop();
        self.loop_depth = loop_depth;
    }

    fn in_loop(&mut self, f: impl FnOnce(&mut Self)) {
        self.loop_depth += 1;
        f(self);
        self.loop_depth -= 1;
    }

    fn check_async(&mut self, is_async: bool, keyword: &str, range: TextRange) {
        if is_async && !self.in_async_function() {
            self.report(format!("'{keyword}' outside async function"), range);
        }
    }

    fn check_parameters(&mut self, parameters: &Parameters) {
        let mut names = FxHashSet::default();
        let all = parameters
            .posonlyargs
            .iter()
            .chain(&parameters.args)
            .chain(&parameters.kwonlyargs)
            .map(|with_default| &with_default.parameter)
            .chain(parameters.vararg.as_deref())
            .chain(parameters.kwarg.as_deref());

        for parameter in all {
            if !names.insert(parameter.name.as_str()) {
                self.report(
                    format!(
                        "duplicate argument '{}' in function definition",
                        parameter.name
                    ),
                    parameter.name.range(),
                );
            }
        }
    }

    /// Defaults are evaluated in the enclosing scope
    fn visit_defaults<'a>(&mut self, parameters: &'a Parameters) {
        let defaults = parameters
            .posonlyargs
            .iter()
            .chain(&parameters.args)
            .chain(&parameters.kwonlyargs)
            .filter_map(|with_default| with_default.default.as_deref());
        for default in defaults {
            self.visit_expr(default);
        }
    }
}

impl<'a> Visitor<'a> for CompileTimeChecker {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::FunctionDef(function) => {
                for decorator in &function.decorator_list {
                    self.visit_decorator(decorator);
                }
                self.check_parameters(&function.parameters);
                self.visit_defaults(&function.parameters);
                let scope = Scope::Function {
                    is_async: function.is_async,
                };
                self.in_scope(scope, |checker| checker.visit_body(&function.body));
            }
            Stmt::ClassDef(class) => {
                for decorator in &class.decorator_list {
                    self.visit_decorator(decorator);
                }
                if let Some(arguments) = &class.arguments {
                    self.visit_arguments(arguments);
                }
                self.in_scope(Scope::Class, |checker| checker.visit_body(&class.body));
            }
            Stmt::For(for_stmt) => {
                self.check_async(for_stmt.is_async, "async for", stmt.range());
                self.visit_expr(&for_stmt.target);
                self.visit_expr(&for_stmt.iter);
                self.in_loop(|checker| checker.visit_body(&for_stmt.body));
                self.visit_body(&for_stmt.orelse);
            }
            Stmt::While(while_stmt) => {
                self.visit_expr(&while_stmt.test);
                self.in_loop(|checker| checker.visit_body(&while_stmt.body));
                self.visit_body(&while_stmt.orelse);
            }
            Stmt::With(with_stmt) => {
                self.check_async(with_stmt.is_async, "async with", stmt.range());
                walk_stmt(self, stmt);
            }
            Stmt::Return(_) => {
                if !self.in_function() {
                    self.report("'return' outside function", stmt.range());
                }
                walk_stmt(self, stmt);
            }
            Stmt::Break(_) if self.loop_depth == 0 => {
                self.report("'break' outside loop", stmt.range());
            }
            Stmt::Continue(_) if self.loop_depth == 0 => {
                self.report("'continue' not properly in loop", stmt.range());
            }
            Stmt::Nonlocal(_) if self.scope() == Scope::Module => {
                self.report(
                    "nonlocal declaration not allowed at module level",
                    stmt.range(),
                );
            }
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Lambda(lambda) => {
                if let Some(parameters) = &lambda.parameters {
                    self.check_parameters(parameters);
                    self.visit_defaults(parameters);
                }
                self.in_scope(Scope::Function { is_async: false }, |checker| {
                    checker.visit_expr(&lambda.body);
                });
            }
            Expr::Yield(_) | Expr::YieldFrom(_) => {
                if !self.in_function() {
                    self.report("'yield' outside function", expr.range());
                }
                walk_expr(self, expr);
            }
            Expr::Await(_) => {
                if !self.in_function() {
                    self.report("'await' outside function", expr.range());
                } else if !self.in_async_function() {
                    self.report("'await' outside async function", expr.range());
                }
                walk_expr(self, expr);
            }
            _ => walk_expr(self, expr),
        }
    }
}
