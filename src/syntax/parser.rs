//! Lowers pest parse pairs into the syntax tree.
//!
//! Purely syntactic: no binding or type analysis happens here. The lowering
//! enforces the selected grammar revision (`let`, arrows, templates, spread
//! and friends are ES6; `**` is ES7) and validates the few shapes the PEG
//! cannot express directly, such as assignment targets.

use std::collections::HashMap;

use miette::SourceSpan;
use once_cell::sync::Lazy;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::ast::{
    ArrowBody, AssignOp, BinaryOp, CatchClause, DeclKind, Declarator, Expr, ForInit, ForTarget,
    Function, Lit, LogicalOp, MemberKey, Program, Property, PropertyKey, Stmt, SwitchCase,
    UnaryOp, UpdateOp, VarDecl,
};
use crate::errors::{ErrorKind, LucidError};
use crate::syntax::EcmaVersion;

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct EcmaParser;

static BINARY_OPS: Lazy<HashMap<&'static str, BinaryOp>> = Lazy::new(|| {
    use BinaryOp::*;
    HashMap::from([
        ("==", Eq),
        ("!=", NotEq),
        ("===", StrictEq),
        ("!==", StrictNotEq),
        ("<", Lt),
        ("<=", LtEq),
        (">", Gt),
        (">=", GtEq),
        ("<<", Shl),
        (">>", Shr),
        (">>>", UShr),
        ("+", Add),
        ("-", Sub),
        ("*", Mul),
        ("/", Div),
        ("%", Mod),
        ("**", Exp),
        ("|", BitOr),
        ("^", BitXor),
        ("&", BitAnd),
        ("in", In),
        ("instanceof", Instanceof),
    ])
});

static ASSIGN_OPS: Lazy<HashMap<&'static str, AssignOp>> = Lazy::new(|| {
    use AssignOp::*;
    HashMap::from([
        ("=", Assign),
        ("+=", AddAssign),
        ("-=", SubAssign),
        ("*=", MulAssign),
        ("/=", DivAssign),
        ("%=", ModAssign),
        ("**=", ExpAssign),
        ("<<=", ShlAssign),
        (">>=", ShrAssign),
        (">>>=", UShrAssign),
        ("|=", BitOrAssign),
        ("^=", BitXorAssign),
        ("&=", BitAndAssign),
    ])
});

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse source text into a [`Program`] against the given grammar revision.
pub fn parse_program(source: &str, version: EcmaVersion) -> Result<Program, LucidError> {
    parse_named(source, "<input>", version)
}

/// Like [`parse_program`], with a source name for diagnostics.
pub fn parse_named(source: &str, name: &str, version: EcmaVersion) -> Result<Program, LucidError> {
    let lowering = Lowering {
        source,
        name,
        version,
    };

    let mut pairs = EcmaParser::parse(Rule::program, source)
        .map_err(|e| lowering.convert_pest_error(e))?;
    let program = pairs.next().unwrap(); // pest guarantees the program rule exists

    let mut body = Vec::new();
    for pair in program.into_inner() {
        if pair.as_rule() == Rule::EOI {
            continue;
        }
        body.push(lowering.lower_stmt(pair)?);
    }
    Ok(Program { body })
}

// ============================================================================
// LOWERING
// ============================================================================

struct Lowering<'a> {
    source: &'a str,
    name: &'a str,
    version: EcmaVersion,
}

/// Keyword tokens exist only to anchor the grammar; lowering works on the
/// remaining structural pairs.
fn is_marker(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_if
            | Rule::kw_else
            | Rule::kw_for
            | Rule::kw_in
            | Rule::kw_of
            | Rule::kw_while
            | Rule::kw_do
            | Rule::kw_switch
            | Rule::kw_case
            | Rule::kw_default
            | Rule::kw_return
            | Rule::kw_break
            | Rule::kw_continue
            | Rule::kw_throw
            | Rule::kw_try
            | Rule::kw_catch
            | Rule::kw_finally
            | Rule::kw_debugger
            | Rule::kw_function
            | Rule::kw_new
            | Rule::kw_this
            | Rule::EOI
    )
}

fn significant(pair: Pair<Rule>) -> Vec<Pair<Rule>> {
    pair.into_inner()
        .filter(|p| !is_marker(p.as_rule()))
        .collect()
}

fn only_child(pair: Pair<Rule>) -> Pair<Rule> {
    pair.into_inner().next().unwrap() // grammar: rule wraps exactly one alternative
}

impl<'a> Lowering<'a> {
    fn err(&self, kind: ErrorKind, span: pest::Span<'_>) -> LucidError {
        LucidError::new(
            kind,
            self.name,
            self.source,
            SourceSpan::from(span.start()..span.end()),
        )
    }

    fn require(
        &self,
        min: EcmaVersion,
        feature: &str,
        span: pest::Span<'_>,
    ) -> Result<(), LucidError> {
        if self.version < min {
            return Err(self.err(
                ErrorKind::UnsupportedFeature {
                    feature: feature.to_string(),
                    version: self.version,
                },
                span,
            ));
        }
        Ok(())
    }

    fn convert_pest_error(&self, error: pest::error::Error<Rule>) -> LucidError {
        let detail = error.variant.message().to_string();
        let (start, len) = match error.location {
            pest::error::InputLocation::Pos(p) => (p, usize::from(p < self.source.len())),
            pest::error::InputLocation::Span((s, e)) => (s, e.saturating_sub(s)),
        };
        LucidError::new(
            ErrorKind::UnexpectedSyntax { detail },
            self.name,
            self.source,
            SourceSpan::from(start..start + len),
        )
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn lower_stmt(&self, pair: Pair<Rule>) -> Result<Stmt, LucidError> {
        let inner = only_child(pair);
        match inner.as_rule() {
            Rule::block => Ok(Stmt::Block(self.lower_block(inner)?)),
            Rule::empty_stmt => Ok(Stmt::Empty),
            Rule::var_stmt => Ok(Stmt::VarDecl(self.lower_var_decl(significant(inner))?)),
            Rule::if_stmt => self.lower_if(inner),
            Rule::for_stmt => self.lower_for(inner),
            Rule::for_in_stmt => self.lower_for_in(inner, false),
            Rule::for_of_stmt => self.lower_for_in(inner, true),
            Rule::while_stmt => self.lower_while(inner),
            Rule::do_while_stmt => self.lower_do_while(inner),
            Rule::switch_stmt => self.lower_switch(inner),
            Rule::return_stmt => {
                let arg = significant(inner)
                    .into_iter()
                    .next()
                    .map(|p| self.lower_expr(p))
                    .transpose()?;
                Ok(Stmt::Return(arg))
            }
            Rule::break_stmt => Ok(Stmt::Break(self.lower_label(inner))),
            Rule::continue_stmt => Ok(Stmt::Continue(self.lower_label(inner))),
            Rule::throw_stmt => {
                let arg = significant(inner).into_iter().next().unwrap(); // grammar: throw takes an expression
                Ok(Stmt::Throw(self.lower_expr(arg)?))
            }
            Rule::try_stmt => self.lower_try(inner),
            Rule::debugger_stmt => Ok(Stmt::Debugger),
            Rule::function_decl => Ok(Stmt::FunctionDecl(self.lower_function(inner)?)),
            Rule::labeled_stmt => {
                let mut parts = inner.into_inner();
                let label = parts.next().unwrap().as_str().to_string();
                let body = Box::new(self.lower_stmt(parts.next().unwrap())?);
                Ok(Stmt::Labeled { label, body })
            }
            Rule::expr_stmt => Ok(Stmt::Expr(self.lower_expr(only_child(inner))?)),
            other => unreachable!("statement rule {:?}", other),
        }
    }

    fn lower_block(&self, pair: Pair<Rule>) -> Result<Vec<Stmt>, LucidError> {
        pair.into_inner().map(|p| self.lower_stmt(p)).collect()
    }

    fn lower_label(&self, pair: Pair<Rule>) -> Option<String> {
        significant(pair)
            .into_iter()
            .next()
            .map(|p| p.as_str().to_string())
    }

    fn lower_var_decl(&self, parts: Vec<Pair<Rule>>) -> Result<VarDecl, LucidError> {
        let mut iter = parts.into_iter();
        let kind = self.lower_decl_kind(iter.next().unwrap())?; // grammar: kind comes first
        let declarators = iter
            .map(|p| self.lower_declarator(p))
            .collect::<Result<_, _>>()?;
        Ok(VarDecl { kind, declarators })
    }

    fn lower_decl_kind(&self, pair: Pair<Rule>) -> Result<DeclKind, LucidError> {
        let span = pair.as_span();
        match pair.as_str() {
            "var" => Ok(DeclKind::Var),
            "let" => {
                self.require(EcmaVersion::Es6, "a `let` declaration", span)?;
                Ok(DeclKind::Let)
            }
            "const" => {
                self.require(EcmaVersion::Es6, "a `const` declaration", span)?;
                Ok(DeclKind::Const)
            }
            other => unreachable!("declaration kind {:?}", other),
        }
    }

    fn lower_declarator(&self, pair: Pair<Rule>) -> Result<Declarator, LucidError> {
        let mut inner = pair.into_inner();
        let name = inner.next().unwrap().as_str().to_string(); // grammar: ident comes first
        let init = inner.next().map(|p| self.lower_expr(p)).transpose()?;
        Ok(Declarator { name, init })
    }

    fn lower_if(&self, pair: Pair<Rule>) -> Result<Stmt, LucidError> {
        let mut parts = significant(pair).into_iter();
        let test = self.lower_expr(parts.next().unwrap())?;
        let consequent = Box::new(self.lower_stmt(parts.next().unwrap())?);
        let alternate = parts
            .next()
            .map(|p| self.lower_stmt(p))
            .transpose()?
            .map(Box::new);
        Ok(Stmt::If {
            test,
            consequent,
            alternate,
        })
    }

    fn lower_for(&self, pair: Pair<Rule>) -> Result<Stmt, LucidError> {
        let mut init = None;
        let mut test = None;
        let mut update = None;
        let mut body = None;
        for part in significant(pair) {
            match part.as_rule() {
                Rule::for_init => init = Some(self.lower_for_init(part)?),
                Rule::for_test => test = Some(self.lower_expr(only_child(part))?),
                Rule::for_update => update = Some(self.lower_expr(only_child(part))?),
                Rule::stmt => body = Some(self.lower_stmt(part)?),
                other => unreachable!("for clause {:?}", other),
            }
        }
        Ok(Stmt::For {
            init,
            test,
            update,
            body: Box::new(body.unwrap()), // grammar: loop body is mandatory
        })
    }

    fn lower_for_init(&self, pair: Pair<Rule>) -> Result<ForInit, LucidError> {
        let parts = significant(pair);
        if parts[0].as_rule() == Rule::var_kind {
            Ok(ForInit::Decl(self.lower_var_decl(parts)?))
        } else {
            let expr = parts.into_iter().next().unwrap();
            Ok(ForInit::Expr(self.lower_expr(expr)?))
        }
    }

    fn lower_for_in(&self, pair: Pair<Rule>, is_of: bool) -> Result<Stmt, LucidError> {
        if is_of {
            self.require(EcmaVersion::Es6, "a `for..of` loop", pair.as_span())?;
        }
        let mut parts = significant(pair).into_iter();
        let left = self.lower_for_target(parts.next().unwrap())?;
        let right = self.lower_expr(parts.next().unwrap())?;
        let body = Box::new(self.lower_stmt(parts.next().unwrap())?);
        if is_of {
            Ok(Stmt::ForOf { left, right, body })
        } else {
            Ok(Stmt::ForIn { left, right, body })
        }
    }

    fn lower_for_target(&self, pair: Pair<Rule>) -> Result<ForTarget, LucidError> {
        let span = pair.as_span();
        let parts = significant(pair);
        if parts[0].as_rule() == Rule::var_kind {
            return Ok(ForTarget::Decl(self.lower_var_decl(parts)?));
        }
        let expr = self.lower_expr(parts.into_iter().next().unwrap())?;
        match expr {
            Expr::Ident(_) | Expr::Member { .. } => Ok(ForTarget::Pattern(expr)),
            _ => Err(self.err(ErrorKind::InvalidAssignmentTarget, span)),
        }
    }

    fn lower_while(&self, pair: Pair<Rule>) -> Result<Stmt, LucidError> {
        let mut parts = significant(pair).into_iter();
        let test = self.lower_expr(parts.next().unwrap())?;
        let body = Box::new(self.lower_stmt(parts.next().unwrap())?);
        Ok(Stmt::While { test, body })
    }

    fn lower_do_while(&self, pair: Pair<Rule>) -> Result<Stmt, LucidError> {
        let mut parts = significant(pair).into_iter();
        let body = Box::new(self.lower_stmt(parts.next().unwrap())?);
        let test = self.lower_expr(parts.next().unwrap())?;
        Ok(Stmt::DoWhile { body, test })
    }

    fn lower_switch(&self, pair: Pair<Rule>) -> Result<Stmt, LucidError> {
        let mut parts = significant(pair).into_iter();
        let discriminant = self.lower_expr(parts.next().unwrap())?;
        let cases = parts
            .map(|p| self.lower_switch_case(p))
            .collect::<Result<_, _>>()?;
        Ok(Stmt::Switch {
            discriminant,
            cases,
        })
    }

    fn lower_switch_case(&self, pair: Pair<Rule>) -> Result<SwitchCase, LucidError> {
        let mut test = None;
        let mut body = Vec::new();
        for part in significant(pair) {
            match part.as_rule() {
                Rule::expression => test = Some(self.lower_expr(part)?),
                Rule::stmt => body.push(self.lower_stmt(part)?),
                other => unreachable!("switch case part {:?}", other),
            }
        }
        Ok(SwitchCase { test, body })
    }

    fn lower_try(&self, pair: Pair<Rule>) -> Result<Stmt, LucidError> {
        let mut block = Vec::new();
        let mut handler = None;
        let mut finalizer = None;
        for part in significant(pair) {
            match part.as_rule() {
                Rule::block => block = self.lower_block(part)?,
                Rule::catch_clause => {
                    let mut param = None;
                    let mut body = Vec::new();
                    for sub in significant(part) {
                        match sub.as_rule() {
                            Rule::ident => param = Some(sub.as_str().to_string()),
                            Rule::block => body = self.lower_block(sub)?,
                            other => unreachable!("catch part {:?}", other),
                        }
                    }
                    handler = Some(CatchClause { param, body });
                }
                Rule::finally_clause => {
                    let inner = significant(part).into_iter().next().unwrap(); // grammar: finally wraps a block
                    finalizer = Some(self.lower_block(inner)?);
                }
                other => unreachable!("try part {:?}", other),
            }
        }
        Ok(Stmt::Try {
            block,
            handler,
            finalizer,
        })
    }

    fn lower_function(&self, pair: Pair<Rule>) -> Result<Function, LucidError> {
        let mut name = None;
        let mut params = Vec::new();
        let mut body = Vec::new();
        for part in significant(pair) {
            match part.as_rule() {
                Rule::ident => name = Some(part.as_str().to_string()),
                Rule::param_list => params = lower_params(part),
                Rule::block => body = self.lower_block(part)?,
                other => unreachable!("function part {:?}", other),
            }
        }
        Ok(Function { name, params, body })
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn lower_expr(&self, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        match pair.as_rule() {
            Rule::expression => {
                let mut exprs = pair
                    .into_inner()
                    .map(|p| self.lower_expr(p))
                    .collect::<Result<Vec<_>, _>>()?;
                if exprs.len() == 1 {
                    Ok(exprs.pop().unwrap())
                } else {
                    Ok(Expr::Sequence(exprs))
                }
            }
            Rule::assign_expr => self.lower_assign(pair),
            Rule::conditional_expr => self.lower_conditional(pair),
            Rule::logical_or | Rule::logical_and => self.lower_logical(pair),
            Rule::bit_or
            | Rule::bit_xor
            | Rule::bit_and
            | Rule::equality
            | Rule::relational
            | Rule::shift
            | Rule::additive
            | Rule::multiplicative => self.lower_binary(pair),
            Rule::exponent => self.lower_exponent(pair),
            Rule::unary_expr => self.lower_unary(pair),
            Rule::member_expr => self.lower_member(pair),
            Rule::primary => self.lower_primary(pair),
            other => unreachable!("expression rule {:?}", other),
        }
    }

    fn lower_assign(&self, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        let mut inner: Vec<_> = pair.into_inner().collect();
        if inner.len() == 1 {
            let only = inner.pop().unwrap();
            return if only.as_rule() == Rule::arrow_function {
                self.lower_arrow(only)
            } else {
                self.lower_expr(only)
            };
        }

        let mut iter = inner.into_iter();
        let target_pair = iter.next().unwrap();
        let target_span = target_pair.as_span();
        let op_pair = iter.next().unwrap();
        let value_pair = iter.next().unwrap();

        if op_pair.as_str() == "**=" {
            self.require(EcmaVersion::Es7, "the `**=` operator", op_pair.as_span())?;
        }
        let op = *ASSIGN_OPS.get(op_pair.as_str()).unwrap(); // token set fixed by the grammar

        let target = self.lower_expr(target_pair)?;
        if !matches!(target, Expr::Ident(_) | Expr::Member { .. }) {
            return Err(self.err(ErrorKind::InvalidAssignmentTarget, target_span));
        }
        let value = self.lower_expr(value_pair)?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn lower_conditional(&self, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        let mut iter = pair.into_inner();
        let test = self.lower_expr(iter.next().unwrap())?;
        match (iter.next(), iter.next()) {
            (Some(consequent), Some(alternate)) => Ok(Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(self.lower_expr(consequent)?),
                alternate: Box::new(self.lower_expr(alternate)?),
            }),
            _ => Ok(test),
        }
    }

    fn lower_logical(&self, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        let mut iter = pair.into_inner();
        let mut expr = self.lower_expr(iter.next().unwrap())?;
        while let Some(op_pair) = iter.next() {
            let op = match op_pair.as_rule() {
                Rule::or_op => LogicalOp::Or,
                Rule::and_op => LogicalOp::And,
                other => unreachable!("logical operator {:?}", other),
            };
            let right = self.lower_expr(iter.next().unwrap())?; // grammar: operand follows operator
            expr = Expr::Logical {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn lower_binary(&self, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        let mut iter = pair.into_inner();
        let mut expr = self.lower_expr(iter.next().unwrap())?;
        while let Some(op_pair) = iter.next() {
            let op = *BINARY_OPS.get(op_pair.as_str()).unwrap(); // token set fixed by the grammar
            let right = self.lower_expr(iter.next().unwrap())?;
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn lower_exponent(&self, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        let mut iter = pair.into_inner();
        let base = self.lower_expr(iter.next().unwrap())?;
        match iter.next() {
            Some(op_pair) => {
                self.require(
                    EcmaVersion::Es7,
                    "the exponentiation operator",
                    op_pair.as_span(),
                )?;
                let exponent = self.lower_expr(iter.next().unwrap())?;
                Ok(Expr::Binary {
                    op: BinaryOp::Exp,
                    left: Box::new(base),
                    right: Box::new(exponent),
                })
            }
            None => Ok(base),
        }
    }

    fn lower_unary(&self, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        let mut inner: Vec<_> = pair.into_inner().collect();
        if inner.len() == 2 {
            let argument = self.lower_expr(inner.pop().unwrap())?;
            let op = match inner.pop().unwrap().as_str() {
                "!" => UnaryOp::Not,
                "~" => UnaryOp::BitNot,
                "+" => UnaryOp::Plus,
                "-" => UnaryOp::Minus,
                "typeof" => UnaryOp::Typeof,
                "void" => UnaryOp::Void,
                "delete" => UnaryOp::Delete,
                other => unreachable!("unary operator {:?}", other),
            };
            return Ok(Expr::Unary {
                op,
                argument: Box::new(argument),
            });
        }

        let only = inner.pop().unwrap();
        match only.as_rule() {
            Rule::update_prefix => {
                let mut iter = only.into_inner();
                let op = lower_update_op(&iter.next().unwrap());
                let argument = self.lower_expr(iter.next().unwrap())?;
                Ok(Expr::Update {
                    op,
                    prefix: true,
                    argument: Box::new(argument),
                })
            }
            Rule::postfix_expr => {
                let mut iter = only.into_inner();
                let expr = self.lower_expr(iter.next().unwrap())?;
                match iter.next() {
                    Some(op_pair) => Ok(Expr::Update {
                        op: lower_update_op(&op_pair),
                        prefix: false,
                        argument: Box::new(expr),
                    }),
                    None => Ok(expr),
                }
            }
            other => unreachable!("unary alternative {:?}", other),
        }
    }

    fn lower_member(&self, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        let mut iter = pair.into_inner();
        let mut expr = self.lower_primary(iter.next().unwrap())?;
        for op in iter {
            expr = self.apply_postfix(expr, op)?;
        }
        Ok(expr)
    }

    fn apply_postfix(&self, expr: Expr, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        let inner = only_child(pair);
        match inner.as_rule() {
            Rule::call_args => Ok(Expr::Call {
                callee: Box::new(expr),
                arguments: self.lower_args(inner)?,
            }),
            Rule::computed_prop => Ok(Expr::Member {
                object: Box::new(expr),
                property: MemberKey::Computed(Box::new(self.lower_expr(only_child(inner))?)),
            }),
            Rule::static_prop => Ok(Expr::Member {
                object: Box::new(expr),
                property: MemberKey::Static(only_child(inner).as_str().to_string()),
            }),
            other => unreachable!("postfix operation {:?}", other),
        }
    }

    fn lower_args(&self, pair: Pair<Rule>) -> Result<Vec<Expr>, LucidError> {
        pair.into_inner()
            .map(|arg| self.lower_spread_or_expr(only_child(arg)))
            .collect()
    }

    fn lower_spread_or_expr(&self, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        match pair.as_rule() {
            Rule::spread_arg => {
                self.require(EcmaVersion::Es6, "a spread argument", pair.as_span())?;
                let inner = only_child(pair);
                Ok(Expr::Spread(Box::new(self.lower_expr(inner)?)))
            }
            _ => self.lower_expr(pair),
        }
    }

    fn lower_primary(&self, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        let inner = only_child(pair);
        match inner.as_rule() {
            Rule::literal => self.lower_literal(inner),
            Rule::template => self.lower_template(inner),
            Rule::array_lit => self.lower_array(inner),
            Rule::object_lit => self.lower_object(inner),
            Rule::function_expr => Ok(Expr::Function(self.lower_function(inner)?)),
            Rule::new_expr => self.lower_new(inner),
            Rule::paren_expr => self.lower_expr(only_child(inner)),
            Rule::this_expr => Ok(Expr::This),
            Rule::ident => Ok(Expr::Ident(inner.as_str().to_string())),
            other => unreachable!("primary {:?}", other),
        }
    }

    /// `new` binds to the member chain up to its first argument list; any
    /// remaining postfix operations apply to the constructed object.
    fn lower_new(&self, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        let member = significant(pair).into_iter().next().unwrap(); // grammar: new wraps a member chain
        let mut parts = member.into_inner();
        let mut callee = self.lower_primary(parts.next().unwrap())?;

        let mut arguments = Vec::new();
        let mut trailing = Vec::new();
        let mut saw_call = false;
        for op in parts {
            if saw_call {
                trailing.push(op);
                continue;
            }
            let inner = only_child(op);
            if inner.as_rule() == Rule::call_args {
                arguments = self.lower_args(inner)?;
                saw_call = true;
            } else {
                callee = match inner.as_rule() {
                    Rule::computed_prop => Expr::Member {
                        object: Box::new(callee),
                        property: MemberKey::Computed(Box::new(
                            self.lower_expr(only_child(inner))?,
                        )),
                    },
                    Rule::static_prop => Expr::Member {
                        object: Box::new(callee),
                        property: MemberKey::Static(only_child(inner).as_str().to_string()),
                    },
                    other => unreachable!("postfix operation {:?}", other),
                };
            }
        }

        let mut expr = Expr::New {
            callee: Box::new(callee),
            arguments,
        };
        for op in trailing {
            expr = self.apply_postfix(expr, op)?;
        }
        Ok(expr)
    }

    fn lower_arrow(&self, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        self.require(EcmaVersion::Es6, "an arrow function", pair.as_span())?;
        let mut iter = pair.into_inner();

        let params_pair = iter.next().unwrap();
        let mut params = Vec::new();
        for part in params_pair.into_inner() {
            match part.as_rule() {
                Rule::ident => params.push(part.as_str().to_string()),
                Rule::param_list => params = lower_params(part),
                other => unreachable!("arrow parameter {:?}", other),
            }
        }

        let body_pair = only_child(iter.next().unwrap());
        let body = match body_pair.as_rule() {
            Rule::block => ArrowBody::Block(self.lower_block(body_pair)?),
            _ => ArrowBody::Expr(Box::new(self.lower_expr(body_pair)?)),
        };
        Ok(Expr::Arrow { params, body })
    }

    // ------------------------------------------------------------------------
    // Literals
    // ------------------------------------------------------------------------

    fn lower_literal(&self, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        let inner = only_child(pair);
        let span = inner.as_span();
        let text = inner.as_str();
        let lit = match inner.as_rule() {
            Rule::number => Lit::Number(self.lower_number(text, span)?),
            Rule::string => Lit::String(self.unquote(text, span)?),
            Rule::regex => {
                let close = text.rfind('/').unwrap(); // grammar: regex ends with /flags
                Lit::Regex {
                    pattern: text[1..close].to_string(),
                    flags: text[close + 1..].to_string(),
                }
            }
            Rule::boolean_lit => Lit::Bool(text == "true"),
            Rule::null_lit => Lit::Null,
            other => unreachable!("literal {:?}", other),
        };
        Ok(Expr::Literal(lit))
    }

    fn lower_number(&self, text: &str, span: pest::Span<'_>) -> Result<f64, LucidError> {
        let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
        {
            u64::from_str_radix(hex, 16).ok().map(|v| v as f64)
        } else {
            text.parse::<f64>().ok()
        };
        value.ok_or_else(|| {
            self.err(
                ErrorKind::InvalidLiteral {
                    literal_type: "number".into(),
                    value: text.into(),
                },
                span,
            )
        })
    }

    fn unquote(&self, text: &str, span: pest::Span<'_>) -> Result<String, LucidError> {
        let raw = &text[1..text.len() - 1];
        unescape(raw).map_err(|_| {
            self.err(
                ErrorKind::InvalidLiteral {
                    literal_type: "string".into(),
                    value: text.into(),
                },
                span,
            )
        })
    }

    fn lower_template(&self, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        self.require(EcmaVersion::Es6, "a template literal", pair.as_span())?;
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::tpl_chunk => {
                    let span = part.as_span();
                    let text = part.as_str();
                    let cooked = unescape(text).map_err(|_| {
                        self.err(
                            ErrorKind::InvalidLiteral {
                                literal_type: "template chunk".into(),
                                value: text.into(),
                            },
                            span,
                        )
                    })?;
                    quasis.push(cooked);
                }
                Rule::tpl_subst => exprs.push(self.lower_expr(only_child(part))?),
                other => unreachable!("template part {:?}", other),
            }
        }
        Ok(Expr::Template { quasis, exprs })
    }

    fn lower_array(&self, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        let mut elements = Vec::new();
        for slot in pair.into_inner() {
            let inner = only_child(slot);
            if inner.as_rule() == Rule::elision {
                elements.push(None);
            } else {
                elements.push(Some(self.lower_spread_or_expr(inner)?));
            }
        }
        // A trailing comma is not an elision: [1,] has one element.
        if matches!(elements.last(), Some(None)) {
            elements.pop();
        }
        Ok(Expr::Array(elements))
    }

    fn lower_object(&self, pair: Pair<Rule>) -> Result<Expr, LucidError> {
        let properties = pair
            .into_inner()
            .map(|p| self.lower_property(only_child(p)))
            .collect::<Result<_, _>>()?;
        Ok(Expr::Object(properties))
    }

    fn lower_property(&self, pair: Pair<Rule>) -> Result<Property, LucidError> {
        let span = pair.as_span();
        match pair.as_rule() {
            Rule::prop_computed => {
                self.require(EcmaVersion::Es6, "a computed property key", span)?;
                let mut iter = pair.into_inner();
                let key = PropertyKey::Computed(self.lower_expr(iter.next().unwrap())?);
                let value = self.lower_expr(iter.next().unwrap())?;
                Ok(Property {
                    key,
                    value,
                    shorthand: false,
                })
            }
            Rule::prop_method => {
                self.require(EcmaVersion::Es6, "a shorthand method", span)?;
                let mut name = String::new();
                let mut params = Vec::new();
                let mut body = Vec::new();
                for part in pair.into_inner() {
                    match part.as_rule() {
                        Rule::prop_name => name = part.as_str().to_string(),
                        Rule::param_list => params = lower_params(part),
                        Rule::block => body = self.lower_block(part)?,
                        other => unreachable!("method part {:?}", other),
                    }
                }
                Ok(Property {
                    key: PropertyKey::Ident(name),
                    value: Expr::Function(Function {
                        name: None,
                        params,
                        body,
                    }),
                    shorthand: false,
                })
            }
            Rule::prop_keyed => {
                let mut iter = pair.into_inner();
                let key = self.lower_property_key(only_child(iter.next().unwrap()))?;
                let value = self.lower_expr(iter.next().unwrap())?;
                Ok(Property {
                    key,
                    value,
                    shorthand: false,
                })
            }
            Rule::prop_shorthand => {
                self.require(EcmaVersion::Es6, "a shorthand property", span)?;
                let name = only_child(pair).as_str().to_string();
                Ok(Property {
                    key: PropertyKey::Ident(name.clone()),
                    value: Expr::Ident(name),
                    shorthand: true,
                })
            }
            other => unreachable!("property {:?}", other),
        }
    }

    fn lower_property_key(&self, pair: Pair<Rule>) -> Result<PropertyKey, LucidError> {
        let span = pair.as_span();
        let text = pair.as_str();
        match pair.as_rule() {
            Rule::string => Ok(PropertyKey::String(self.unquote(text, span)?)),
            Rule::number => Ok(PropertyKey::Number(self.lower_number(text, span)?)),
            Rule::prop_name => Ok(PropertyKey::Ident(text.to_string())),
            other => unreachable!("property key {:?}", other),
        }
    }
}

fn lower_params(pair: Pair<Rule>) -> Vec<String> {
    pair.into_inner().map(|p| p.as_str().to_string()).collect()
}

fn lower_update_op(pair: &Pair<Rule>) -> UpdateOp {
    match pair.as_str() {
        "++" => UpdateOp::Increment,
        _ => UpdateOp::Decrement,
    }
}

/// Resolves escape sequences. Unknown single-character escapes pass the
/// character through, the way an ECMAScript lexer treats them.
fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            None => return Err("trailing backslash".into()),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('v') => out.push('\u{000B}'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let hex: String = (0..2).filter_map(|_| chars.next()).collect();
                let code =
                    u32::from_str_radix(&hex, 16).map_err(|_| format!("bad \\x escape: {hex}"))?;
                out.push(char::from_u32(code).ok_or("bad \\x escape")?);
            }
            Some('u') => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    let mut digits = String::new();
                    for c in chars.by_ref() {
                        if c == '}' {
                            break;
                        }
                        digits.push(c);
                    }
                    digits
                } else {
                    (0..4).filter_map(|_| chars.next()).collect()
                };
                let code =
                    u32::from_str_radix(&hex, 16).map_err(|_| format!("bad \\u escape: {hex}"))?;
                out.push(char::from_u32(code).ok_or("bad \\u escape")?);
            }
            // Line continuations disappear.
            Some('\n') => {}
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some(other) => out.push(other),
        }
    }
    Ok(out)
}
