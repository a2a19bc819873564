//! The rewrite engine: a bottom-up tree transformer.
//!
//! Every statement and expression is rewritten children-first; a rule only
//! ever sees children that are already in canonical form. Rules return a
//! [`Rewritten`] value — one statement or an ordered run of siblings — and
//! exactly two coercion paths exist for it: list-valued slots flatten it in
//! place, and single-node slots force it into a block.
//!
//! The rewriter is pure: it consumes its input tree by value, holds no state
//! between calls, and never fails on a well-formed tree.

mod expressions;
mod statements;

use crate::ast::{CatchClause, Declarator, ForInit, ForTarget, Function, Program, Stmt, VarDecl};

/// One node, or an ordered run of sibling statements produced by a splitting
/// rule. Source order is always left-to-right.
#[derive(Debug, Clone, PartialEq)]
pub enum Rewritten {
    One(Stmt),
    Many(Vec<Stmt>),
}

impl Rewritten {
    /// Coerces into a single statement, block-wrapping a run of siblings.
    /// Wrapping is idempotent: a lone block stays itself.
    pub fn into_stmt(self) -> Stmt {
        match self {
            Rewritten::One(stmt) => stmt,
            Rewritten::Many(mut stmts) => {
                if stmts.len() == 1 {
                    let only = stmts.pop().unwrap();
                    if only.is_block() {
                        only
                    } else {
                        Stmt::Block(vec![only])
                    }
                } else {
                    Stmt::Block(stmts)
                }
            }
        }
    }

    pub fn into_vec(self) -> Vec<Stmt> {
        match self {
            Rewritten::One(stmt) => vec![stmt],
            Rewritten::Many(stmts) => stmts,
        }
    }

    /// Splices the result into a statement list, preserving order.
    pub fn append_to(self, out: &mut Vec<Stmt>) {
        match self {
            Rewritten::One(stmt) => out.push(stmt),
            Rewritten::Many(stmts) => out.extend(stmts),
        }
    }
}

impl From<Stmt> for Rewritten {
    fn from(stmt: Stmt) -> Self {
        Rewritten::One(stmt)
    }
}

/// Wraps a statement in a block unless it already is one.
pub(crate) fn block_wrap(stmt: Stmt) -> Stmt {
    if stmt.is_block() {
        stmt
    } else {
        Stmt::Block(vec![stmt])
    }
}

/// The tree rewriter. Construct once and reuse freely; it carries no state
/// across calls.
#[derive(Debug, Default)]
pub struct Rewriter;

impl Rewriter {
    pub fn new() -> Rewriter {
        Rewriter
    }

    /// Rewrites a whole program, flattening split results into the top-level
    /// statement list.
    pub fn rewrite_program(&self, program: Program) -> Program {
        Program {
            body: self.rewrite_body(program.body),
        }
    }

    /// Rewrites a statement list in order, splicing any one-to-many result
    /// into the list in place.
    pub fn rewrite_body(&self, body: Vec<Stmt>) -> Vec<Stmt> {
        let mut out = Vec::with_capacity(body.len());
        for stmt in body {
            self.rewrite_statement(stmt).append_to(&mut out);
        }
        out
    }

    /// Rewrites one statement: children first, then the rule for its variant.
    pub fn rewrite_statement(&self, stmt: Stmt) -> Rewritten {
        match stmt {
            Stmt::Expr(expr) => {
                let expr = self.rewrite_expression(expr);
                self.loose_statement(expr)
            }
            Stmt::Block(body) => Rewritten::One(Stmt::Block(self.rewrite_body(body))),
            Stmt::Empty => Rewritten::One(Stmt::Empty),
            Stmt::VarDecl(decl) => Rewritten::One(Stmt::VarDecl(self.rewrite_var_decl(decl))),
            Stmt::FunctionDecl(function) => {
                Rewritten::One(Stmt::FunctionDecl(self.rewrite_function(function)))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                let test = self.rewrite_expression(test);
                let consequent = Box::new(self.rewrite_statement(*consequent).into_stmt());
                let alternate = match alternate {
                    Some(stmt) => Some(Box::new(self.rewrite_statement(*stmt).into_stmt())),
                    None => None,
                };
                self.rule_if(test, consequent, alternate)
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                let discriminant = self.rewrite_expression(discriminant);
                let cases = cases
                    .into_iter()
                    .map(|case| crate::ast::SwitchCase {
                        test: case.test.map(|t| self.rewrite_expression(t)),
                        body: self.rewrite_body(case.body),
                    })
                    .collect();
                self.rule_switch(discriminant, cases)
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let init = init.map(|init| match init {
                    ForInit::Decl(decl) => ForInit::Decl(self.rewrite_var_decl(decl)),
                    ForInit::Expr(expr) => ForInit::Expr(self.rewrite_expression(expr)),
                });
                let test = test.map(|e| self.rewrite_expression(e));
                let update = update.map(|e| self.rewrite_expression(e));
                let body = Box::new(self.rewrite_statement(*body).into_stmt());
                self.rule_for(init, test, update, body)
            }
            Stmt::ForIn { left, right, body } => Rewritten::One(Stmt::ForIn {
                left: self.rewrite_for_target(left),
                right: self.rewrite_expression(right),
                body: Box::new(self.rewrite_statement(*body).into_stmt()),
            }),
            Stmt::ForOf { left, right, body } => Rewritten::One(Stmt::ForOf {
                left: self.rewrite_for_target(left),
                right: self.rewrite_expression(right),
                body: Box::new(self.rewrite_statement(*body).into_stmt()),
            }),
            Stmt::While { test, body } => Rewritten::One(Stmt::While {
                test: self.rewrite_expression(test),
                body: Box::new(self.rewrite_statement(*body).into_stmt()),
            }),
            Stmt::DoWhile { body, test } => Rewritten::One(Stmt::DoWhile {
                body: Box::new(self.rewrite_statement(*body).into_stmt()),
                test: self.rewrite_expression(test),
            }),
            Stmt::Return(argument) => {
                let argument = argument.map(|e| self.rewrite_expression(e));
                self.rule_return(argument)
            }
            Stmt::Break(label) => Rewritten::One(Stmt::Break(label)),
            Stmt::Continue(label) => Rewritten::One(Stmt::Continue(label)),
            Stmt::Labeled { label, body } => Rewritten::One(Stmt::Labeled {
                label,
                body: Box::new(self.rewrite_statement(*body).into_stmt()),
            }),
            Stmt::Throw(expr) => Rewritten::One(Stmt::Throw(self.rewrite_expression(expr))),
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => Rewritten::One(Stmt::Try {
                block: self.rewrite_body(block),
                handler: handler.map(|h| CatchClause {
                    param: h.param,
                    body: self.rewrite_body(h.body),
                }),
                finalizer: finalizer.map(|f| self.rewrite_body(f)),
            }),
            Stmt::Debugger => Rewritten::One(Stmt::Debugger),
        }
    }

    fn rewrite_var_decl(&self, decl: VarDecl) -> VarDecl {
        VarDecl {
            kind: decl.kind,
            declarators: decl
                .declarators
                .into_iter()
                .map(|d| Declarator {
                    name: d.name,
                    init: d.init.map(|e| self.rewrite_expression(e)),
                })
                .collect(),
        }
    }

    fn rewrite_function(&self, function: Function) -> Function {
        Function {
            name: function.name,
            params: function.params,
            body: self.rewrite_body(function.body),
        }
    }

    fn rewrite_for_target(&self, target: ForTarget) -> ForTarget {
        match target {
            ForTarget::Decl(decl) => ForTarget::Decl(self.rewrite_var_decl(decl)),
            ForTarget::Pattern(expr) => ForTarget::Pattern(self.rewrite_expression(expr)),
        }
    }
}
