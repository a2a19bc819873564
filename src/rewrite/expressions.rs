//! Expression-level rewriting: the generic expression traversal, the folds
//! and canonicalizations that keep an expression an expression, and the
//! loose-expression rules that turn statement-shaped expressions into real
//! control flow.

use crate::ast::{
    ArrowBody, BinaryOp, Expr, Lit, LogicalOp, MemberKey, Property, PropertyKey, Stmt, UnaryOp,
};

use super::{block_wrap, Rewriter, Rewritten};

impl Rewriter {
    /// Rewrites one expression: children first, then the rule for its
    /// variant. Expressions never split; splitting only happens where an
    /// expression stands in statement position.
    pub fn rewrite_expression(&self, expr: Expr) -> Expr {
        let expr = match expr {
            Expr::Ident(_) | Expr::Literal(_) | Expr::This => expr,
            Expr::Template { quasis, exprs } => Expr::Template {
                quasis,
                exprs: exprs
                    .into_iter()
                    .map(|e| self.rewrite_expression(e))
                    .collect(),
            },
            Expr::Array(elements) => Expr::Array(
                elements
                    .into_iter()
                    .map(|slot| slot.map(|e| self.rewrite_expression(e)))
                    .collect(),
            ),
            Expr::Object(properties) => Expr::Object(
                properties
                    .into_iter()
                    .map(|p| Property {
                        key: match p.key {
                            PropertyKey::Computed(e) => {
                                PropertyKey::Computed(self.rewrite_expression(e))
                            }
                            key => key,
                        },
                        value: self.rewrite_expression(p.value),
                        shorthand: p.shorthand,
                    })
                    .collect(),
            ),
            Expr::Function(function) => Expr::Function(self.rewrite_function(function)),
            Expr::Arrow { params, body } => Expr::Arrow {
                params,
                body: match body {
                    ArrowBody::Expr(e) => ArrowBody::Expr(Box::new(self.rewrite_expression(*e))),
                    ArrowBody::Block(b) => ArrowBody::Block(self.rewrite_body(b)),
                },
            },
            Expr::Sequence(exprs) => Expr::Sequence(
                exprs
                    .into_iter()
                    .map(|e| self.rewrite_expression(e))
                    .collect(),
            ),
            Expr::Unary { op, argument } => Expr::Unary {
                op,
                argument: Box::new(self.rewrite_expression(*argument)),
            },
            Expr::Update {
                op,
                prefix,
                argument,
            } => Expr::Update {
                op,
                prefix,
                argument: Box::new(self.rewrite_expression(*argument)),
            },
            Expr::Binary { op, left, right } => Expr::Binary {
                op,
                left: Box::new(self.rewrite_expression(*left)),
                right: Box::new(self.rewrite_expression(*right)),
            },
            Expr::Logical { op, left, right } => Expr::Logical {
                op,
                left: Box::new(self.rewrite_expression(*left)),
                right: Box::new(self.rewrite_expression(*right)),
            },
            Expr::Assign { op, target, value } => Expr::Assign {
                op,
                target: Box::new(self.rewrite_expression(*target)),
                value: Box::new(self.rewrite_expression(*value)),
            },
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => Expr::Conditional {
                test: Box::new(self.rewrite_expression(*test)),
                consequent: Box::new(self.rewrite_expression(*consequent)),
                alternate: Box::new(self.rewrite_expression(*alternate)),
            },
            Expr::Call { callee, arguments } => Expr::Call {
                callee: Box::new(self.rewrite_expression(*callee)),
                arguments: arguments
                    .into_iter()
                    .map(|a| self.rewrite_expression(a))
                    .collect(),
            },
            Expr::New { callee, arguments } => Expr::New {
                callee: Box::new(self.rewrite_expression(*callee)),
                arguments: arguments
                    .into_iter()
                    .map(|a| self.rewrite_expression(a))
                    .collect(),
            },
            Expr::Member { object, property } => Expr::Member {
                object: Box::new(self.rewrite_expression(*object)),
                property: match property {
                    MemberKey::Computed(e) => {
                        MemberKey::Computed(Box::new(self.rewrite_expression(*e)))
                    }
                    key => key,
                },
            },
            Expr::Spread(inner) => Expr::Spread(Box::new(self.rewrite_expression(*inner))),
        };
        self.apply_expr_rule(expr)
    }

    /// Expression rules: applied to a node whose children are already
    /// rewritten, and also to nodes the loose rules construct.
    pub(crate) fn apply_expr_rule(&self, expr: Expr) -> Expr {
        match expr {
            // !1 and !0 are obfuscated boolean literals.
            Expr::Unary {
                op: UnaryOp::Not,
                argument,
            } => match *argument {
                Expr::Literal(Lit::Number(n)) if n == 0.0 || n == 1.0 => {
                    Expr::Literal(Lit::Bool(n == 0.0))
                }
                argument => Expr::Unary {
                    op: UnaryOp::Not,
                    argument: Box::new(argument),
                },
            },
            // `void <literal>` is spelled-out undefined.
            Expr::Unary {
                op: UnaryOp::Void,
                argument,
            } => match *argument {
                Expr::Literal(_) => Expr::undefined(),
                argument => Expr::Unary {
                    op: UnaryOp::Void,
                    argument: Box::new(argument),
                },
            },
            Expr::Binary { op, left, right } if op.is_comparison() => {
                self.canonicalize_comparison(op, left, right)
            }
            expr => expr,
        }
    }

    /// Puts the "interesting" operand on the left: `5 > x` reads better as
    /// `x < 5`, `undefined == x` as `x == undefined`. The first matching
    /// trigger swaps; at most one swap happens.
    fn canonicalize_comparison(&self, op: BinaryOp, left: Box<Expr>, right: Box<Expr>) -> Expr {
        let undefined_on_left = matches!(&*left, Expr::Ident(name) if name == "undefined");
        let ident_only_on_right =
            !matches!(&*left, Expr::Ident(_)) && matches!(&*right, Expr::Ident(_));
        let literal_only_on_left = is_kinda_literal(&left) && !is_kinda_literal(&right);

        if undefined_on_left || ident_only_on_right || literal_only_on_left {
            Expr::Binary {
                op: op.mirrored(),
                left: right,
                right: left,
            }
        } else {
            Expr::Binary { op, left, right }
        }
    }

    // ------------------------------------------------------------------------
    // Loose-expression rules
    // ------------------------------------------------------------------------

    /// Dispatch for an expression standing in statement position. A comma
    /// sequence splits into siblings, and each element gets one further
    /// loose dispatch of its own (so a conditional element still becomes an
    /// if statement); everything else goes through [`Rewriter::loose_once`].
    pub(crate) fn loose_statement(&self, expr: Expr) -> Rewritten {
        match expr {
            Expr::Sequence(exprs) => {
                let mut out = Vec::with_capacity(exprs.len());
                for expr in exprs {
                    self.loose_once(expr).append_to(&mut out);
                }
                Rewritten::Many(out)
            }
            expr => self.loose_once(expr),
        }
    }

    /// A single application of the loose rules. A nested comma sequence
    /// expands raw, without re-dispatching its elements.
    fn loose_once(&self, expr: Expr) -> Rewritten {
        match expr {
            Expr::Sequence(exprs) => {
                Rewritten::Many(exprs.into_iter().map(Stmt::Expr).collect())
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => self.loose_conditional(*test, *consequent, *alternate),
            Expr::Logical { op, left, right } => self.loose_logical(op, *left, *right),
            // Assignments, calls, and everything else stand as plain
            // expression statements.
            expr => Rewritten::One(Stmt::Expr(expr)),
        }
    }

    /// Loose dispatch forced into a single statement, for branch slots.
    fn loose_forced(&self, expr: Expr) -> Stmt {
        self.loose_statement(expr).into_stmt()
    }

    /// `test ? a : b` in statement position becomes an if/else. The alternate
    /// is block-coerced unless it is an else-bearing if (keeping `else if`
    /// chains flat); the consequent is block-coerced if it became an if
    /// (avoiding the dangling-else ambiguity).
    fn loose_conditional(&self, test: Expr, consequent: Expr, alternate: Expr) -> Rewritten {
        let mut consequent = self.loose_forced(consequent);
        let mut alternate = self.loose_forced(alternate);

        if consequent.is_if() {
            consequent = block_wrap(consequent);
        }
        let chains_else = matches!(
            alternate,
            Stmt::If {
                alternate: Some(_),
                ..
            }
        );
        if !chains_else {
            alternate = block_wrap(alternate);
        }

        self.rule_if(test, Box::new(consequent), Some(Box::new(alternate)))
    }

    /// `a && b` in statement position is `if (a) b`; `a || b` is `if (!a) b`.
    /// Neither form ever grows an else branch. The constructed negation goes
    /// back through the expression rules so `!1`-style operands still fold.
    fn loose_logical(&self, op: LogicalOp, left: Expr, right: Expr) -> Rewritten {
        let consequent = Box::new(self.loose_forced(right));
        let test = match op {
            LogicalOp::And => left,
            LogicalOp::Or => self.apply_expr_rule(Expr::Unary {
                op: UnaryOp::Not,
                argument: Box::new(left),
            }),
        };
        self.rule_if(test, consequent, None)
    }
}

/// A literal, or a literal under any chain of non-mutating unary operators
/// (negation, plus, logical not, bitwise not, typeof).
fn is_kinda_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(_) => true,
        Expr::Unary { op, argument } => op.is_non_mutating() && is_kinda_literal(argument),
        _ => false,
    }
}
