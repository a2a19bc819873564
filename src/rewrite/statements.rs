//! Statement-level rules: comma-expression hoisting out of control-flow
//! headers, loop-header declaration minimization, and return splitting.
//!
//! Every rule receives children that are already rewritten and returns a
//! [`Rewritten`] for the caller to splice or coerce.

use crate::ast::{DeclKind, Expr, ForInit, ForTarget, Stmt, SwitchCase, VarDecl};

use super::{block_wrap, Rewriter, Rewritten};

impl Rewriter {
    /// A comma-shaped test hoists every leading sub-expression out of the
    /// header, keeps the last as the real test, and re-runs on the reduced
    /// statement (the last element may itself be comma-shaped).
    pub(crate) fn rule_if(
        &self,
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    ) -> Rewritten {
        match test {
            Expr::Sequence(mut exprs) => {
                let last = exprs.pop().unwrap(); // a sequence holds at least two expressions
                let mut out: Vec<Stmt> = exprs.into_iter().map(Stmt::Expr).collect();
                out.push(self.rule_if(last, consequent, alternate).into_stmt());
                Rewritten::Many(out)
            }
            test => Rewritten::One(Stmt::If {
                test,
                consequent,
                alternate,
            }),
        }
    }

    /// Same hoist-and-keep-last policy for a comma-shaped discriminant.
    pub(crate) fn rule_switch(&self, discriminant: Expr, cases: Vec<SwitchCase>) -> Rewritten {
        match discriminant {
            Expr::Sequence(mut exprs) => {
                let last = exprs.pop().unwrap();
                let mut out: Vec<Stmt> = exprs.into_iter().map(Stmt::Expr).collect();
                out.push(Stmt::Switch {
                    discriminant: last,
                    cases,
                });
                Rewritten::Many(out)
            }
            discriminant => Rewritten::One(Stmt::Switch {
                discriminant,
                cases,
            }),
        }
    }

    /// Minimizes the loop header. A `var` init keeps only the declarators the
    /// test or update actually mention and hoists the rest above the loop in
    /// declaration order; a comma init hoists everything but its last
    /// expression.
    pub(crate) fn rule_for(
        &self,
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    ) -> Rewritten {
        match init {
            Some(ForInit::Decl(decl)) if decl.kind == DeclKind::Var => {
                let referenced = |name: &str| {
                    test.as_ref().is_some_and(|t| expr_mentions(t, name))
                        || update.as_ref().is_some_and(|u| expr_mentions(u, name))
                };
                let (kept, hoisted): (Vec<_>, Vec<_>) = decl
                    .declarators
                    .into_iter()
                    .partition(|d| referenced(&d.name));

                if hoisted.is_empty() {
                    return Rewritten::One(Stmt::For {
                        init: Some(ForInit::Decl(VarDecl {
                            kind: decl.kind,
                            declarators: kept,
                        })),
                        test,
                        update,
                        body,
                    });
                }

                let hoisted = Stmt::VarDecl(VarDecl {
                    kind: decl.kind,
                    declarators: hoisted,
                });
                let init = if kept.is_empty() {
                    None
                } else {
                    Some(ForInit::Decl(VarDecl {
                        kind: decl.kind,
                        declarators: kept,
                    }))
                };
                Rewritten::Many(vec![
                    hoisted,
                    Stmt::For {
                        init,
                        test,
                        update,
                        body,
                    },
                ])
            }
            Some(ForInit::Expr(Expr::Sequence(mut exprs))) => {
                let last = exprs.pop().unwrap();
                let mut out: Vec<Stmt> = exprs.into_iter().map(Stmt::Expr).collect();
                out.push(Stmt::For {
                    init: Some(ForInit::Expr(last)),
                    test,
                    update,
                    body,
                });
                Rewritten::Many(out)
            }
            init => Rewritten::One(Stmt::For {
                init,
                test,
                update,
                body,
            }),
        }
    }

    /// A comma argument hoists its leading expressions and re-runs on the
    /// reduced return; a conditional argument becomes an if statement whose
    /// branches are themselves return statements, each re-run through this
    /// rule and forced into a block.
    pub(crate) fn rule_return(&self, argument: Option<Expr>) -> Rewritten {
        match argument {
            Some(Expr::Sequence(mut exprs)) => {
                let last = exprs.pop().unwrap();
                let mut out: Vec<Stmt> = exprs.into_iter().map(Stmt::Expr).collect();
                self.rule_return(Some(last)).append_to(&mut out);
                Rewritten::Many(out)
            }
            Some(Expr::Conditional {
                test,
                consequent,
                alternate,
            }) => {
                let consequent = block_wrap(self.rule_return(Some(*consequent)).into_stmt());
                let alternate = block_wrap(self.rule_return(Some(*alternate)).into_stmt());
                self.rule_if(*test, Box::new(consequent), Some(Box::new(alternate)))
            }
            argument => Rewritten::One(Stmt::Return(argument)),
        }
    }
}

// ============================================================================
// IDENTIFIER SEARCH
// ============================================================================

/// Whether `name` occurs as an identifier anywhere in the expression.
/// Non-computed member property names count as occurrences; matching there
/// can only keep a declarator in the loop head, never hoist more.
pub(crate) fn expr_mentions(expr: &Expr, name: &str) -> bool {
    match expr {
        Expr::Ident(n) => n == name,
        Expr::Literal(_) | Expr::This => false,
        Expr::Template { exprs, .. } => exprs.iter().any(|e| expr_mentions(e, name)),
        Expr::Array(elements) => elements
            .iter()
            .flatten()
            .any(|e| expr_mentions(e, name)),
        Expr::Object(properties) => properties.iter().any(|p| {
            let in_key = match &p.key {
                crate::ast::PropertyKey::Computed(e) => expr_mentions(e, name),
                crate::ast::PropertyKey::Ident(n) => n == name,
                _ => false,
            };
            in_key || expr_mentions(&p.value, name)
        }),
        Expr::Function(f) => f.body.iter().any(|s| stmt_mentions(s, name)),
        Expr::Arrow { body, .. } => match body {
            crate::ast::ArrowBody::Expr(e) => expr_mentions(e, name),
            crate::ast::ArrowBody::Block(b) => b.iter().any(|s| stmt_mentions(s, name)),
        },
        Expr::Sequence(exprs) => exprs.iter().any(|e| expr_mentions(e, name)),
        Expr::Unary { argument, .. } | Expr::Update { argument, .. } | Expr::Spread(argument) => {
            expr_mentions(argument, name)
        }
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            expr_mentions(left, name) || expr_mentions(right, name)
        }
        Expr::Assign { target, value, .. } => {
            expr_mentions(target, name) || expr_mentions(value, name)
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            expr_mentions(test, name)
                || expr_mentions(consequent, name)
                || expr_mentions(alternate, name)
        }
        Expr::Call { callee, arguments } | Expr::New { callee, arguments } => {
            expr_mentions(callee, name) || arguments.iter().any(|a| expr_mentions(a, name))
        }
        Expr::Member { object, property } => {
            expr_mentions(object, name)
                || match property {
                    crate::ast::MemberKey::Computed(e) => expr_mentions(e, name),
                    crate::ast::MemberKey::Static(n) => n == name,
                }
        }
    }
}

fn stmt_mentions(stmt: &Stmt, name: &str) -> bool {
    let opt = |e: &Option<Expr>| e.as_ref().is_some_and(|e| expr_mentions(e, name));
    let body_mentions = |body: &[Stmt]| body.iter().any(|s| stmt_mentions(s, name));
    match stmt {
        Stmt::Expr(e) | Stmt::Throw(e) => expr_mentions(e, name),
        Stmt::Block(body) => body_mentions(body),
        Stmt::Empty | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Debugger => false,
        Stmt::VarDecl(decl) => decl_mentions(decl, name),
        Stmt::FunctionDecl(f) => body_mentions(&f.body),
        Stmt::If {
            test,
            consequent,
            alternate,
        } => {
            expr_mentions(test, name)
                || stmt_mentions(consequent, name)
                || alternate.as_deref().is_some_and(|s| stmt_mentions(s, name))
        }
        Stmt::Switch {
            discriminant,
            cases,
        } => {
            expr_mentions(discriminant, name)
                || cases.iter().any(|c| {
                    c.test.as_ref().is_some_and(|t| expr_mentions(t, name))
                        || body_mentions(&c.body)
                })
        }
        Stmt::For {
            init,
            test,
            update,
            body,
        } => {
            init.as_ref().is_some_and(|i| match i {
                ForInit::Decl(d) => decl_mentions(d, name),
                ForInit::Expr(e) => expr_mentions(e, name),
            }) || opt(test)
                || opt(update)
                || stmt_mentions(body, name)
        }
        Stmt::ForIn { left, right, body } | Stmt::ForOf { left, right, body } => {
            let left_mentions = match left {
                ForTarget::Decl(d) => decl_mentions(d, name),
                ForTarget::Pattern(e) => expr_mentions(e, name),
            };
            left_mentions || expr_mentions(right, name) || stmt_mentions(body, name)
        }
        Stmt::While { test, body } | Stmt::DoWhile { body, test } => {
            expr_mentions(test, name) || stmt_mentions(body, name)
        }
        Stmt::Return(arg) => opt(arg),
        Stmt::Labeled { body, .. } => stmt_mentions(body, name),
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            body_mentions(block)
                || handler.as_ref().is_some_and(|h| body_mentions(&h.body))
                || finalizer.as_ref().is_some_and(|f| body_mentions(f))
        }
    }
}

fn decl_mentions(decl: &VarDecl, name: &str) -> bool {
    decl.declarators.iter().any(|d| {
        d.name == name || d.init.as_ref().is_some_and(|e| expr_mentions(e, name))
    })
}
