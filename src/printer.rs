//! Source emission: turns a syntax tree back into ECMAScript text.
//!
//! Printing is precedence-driven: a child expression is parenthesized only
//! when its precedence falls below what its slot requires, plus the two
//! statement-position special cases (a leading `{` would read as a block, a
//! leading `function` as a declaration). The indent width is configurable.

use std::fmt::Write;

use crate::ast::{
    ArrowBody, BinaryOp, CatchClause, Declarator, Expr, ForInit, ForTarget, Function, Lit,
    LogicalOp, MemberKey, Program, Property, PropertyKey, Stmt, SwitchCase, UnaryOp, VarDecl,
};

// Precedence levels, loosest first.
const SEQUENCE: u8 = 0;
const ASSIGN: u8 = 1;
const CONDITIONAL: u8 = 2;
const LOGICAL_OR: u8 = 3;
const LOGICAL_AND: u8 = 4;
const BIT_OR: u8 = 5;
const BIT_XOR: u8 = 6;
const BIT_AND: u8 = 7;
const EQUALITY: u8 = 8;
const RELATIONAL: u8 = 9;
const SHIFT: u8 = 10;
const ADDITIVE: u8 = 11;
const MULTIPLICATIVE: u8 = 12;
const EXPONENT: u8 = 13;
const UNARY: u8 = 14;
const POSTFIX: u8 = 15;
const CALL: u8 = 16;
const PRIMARY: u8 = 17;

/// Prints a program with the given indent width (spaces per level).
pub fn print_program(program: &Program, indent_width: usize) -> String {
    let mut printer = Printer {
        out: String::new(),
        indent_width,
        depth: 0,
    };
    for stmt in &program.body {
        printer.print_stmt(stmt);
    }
    printer.out
}

struct Printer {
    out: String,
    indent_width: usize,
    depth: usize,
}

impl Printer {
    fn indent(&mut self) {
        for _ in 0..self.depth * self.indent_width {
            self.out.push(' ');
        }
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn print_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => {
                self.indent();
                if needs_stmt_parens(expr) {
                    self.out.push('(');
                    self.print_expr(expr, SEQUENCE);
                    self.out.push(')');
                } else {
                    self.print_expr(expr, SEQUENCE);
                }
                self.out.push_str(";\n");
            }
            Stmt::Block(body) => {
                self.indent();
                self.out.push_str("{\n");
                self.depth += 1;
                for stmt in body {
                    self.print_stmt(stmt);
                }
                self.depth -= 1;
                self.indent();
                self.out.push_str("}\n");
            }
            Stmt::Empty => {
                self.indent();
                self.out.push_str(";\n");
            }
            Stmt::VarDecl(decl) => {
                self.indent();
                self.print_var_decl(decl);
                self.out.push_str(";\n");
            }
            Stmt::FunctionDecl(function) => {
                self.indent();
                self.print_function(function);
                self.out.push('\n');
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                self.indent();
                self.print_if(test, consequent, alternate.as_deref());
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => self.print_switch(discriminant, cases),
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                self.indent();
                self.out.push_str("for (");
                if let Some(init) = init {
                    match init {
                        ForInit::Decl(decl) => self.print_var_decl(decl),
                        ForInit::Expr(expr) => self.print_expr(expr, SEQUENCE),
                    }
                }
                self.out.push(';');
                if let Some(test) = test {
                    self.out.push(' ');
                    self.print_expr(test, SEQUENCE);
                }
                self.out.push(';');
                if let Some(update) = update {
                    self.out.push(' ');
                    self.print_expr(update, SEQUENCE);
                }
                self.out.push(')');
                if self.print_clause(body) {
                    self.out.push('\n');
                }
            }
            Stmt::ForIn { left, right, body } => self.print_for_each(left, right, body, "in"),
            Stmt::ForOf { left, right, body } => self.print_for_each(left, right, body, "of"),
            Stmt::While { test, body } => {
                self.indent();
                self.out.push_str("while (");
                self.print_expr(test, SEQUENCE);
                self.out.push(')');
                if self.print_clause(body) {
                    self.out.push('\n');
                }
            }
            Stmt::DoWhile { body, test } => {
                self.indent();
                self.out.push_str("do");
                if self.print_clause(body) {
                    self.out.push(' ');
                } else {
                    self.indent();
                }
                self.out.push_str("while (");
                self.print_expr(test, SEQUENCE);
                self.out.push_str(");\n");
            }
            Stmt::Return(argument) => {
                self.indent();
                self.out.push_str("return");
                if let Some(argument) = argument {
                    self.out.push(' ');
                    self.print_expr(argument, SEQUENCE);
                }
                self.out.push_str(";\n");
            }
            Stmt::Break(label) => self.print_jump("break", label),
            Stmt::Continue(label) => self.print_jump("continue", label),
            Stmt::Labeled { label, body } => {
                self.indent();
                self.out.push_str(label);
                self.out.push(':');
                if self.print_clause(body) {
                    self.out.push('\n');
                }
            }
            Stmt::Throw(expr) => {
                self.indent();
                self.out.push_str("throw ");
                self.print_expr(expr, SEQUENCE);
                self.out.push_str(";\n");
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => self.print_try(block, handler.as_ref(), finalizer.as_deref()),
            Stmt::Debugger => {
                self.indent();
                self.out.push_str("debugger;\n");
            }
        }
    }

    /// Prints a single-statement slot (loop body, if branch). A block prints
    /// inline as ` {...}` without a trailing newline and `true` is returned
    /// so the caller can close the line; anything else goes on its own
    /// indented line.
    fn print_clause(&mut self, stmt: &Stmt) -> bool {
        match stmt {
            Stmt::Block(body) => {
                self.out.push_str(" {\n");
                self.depth += 1;
                for stmt in body {
                    self.print_stmt(stmt);
                }
                self.depth -= 1;
                self.indent();
                self.out.push('}');
                true
            }
            Stmt::Empty => {
                self.out.push_str(";\n");
                false
            }
            stmt => {
                self.out.push('\n');
                self.depth += 1;
                self.print_stmt(stmt);
                self.depth -= 1;
                false
            }
        }
    }

    fn print_if(&mut self, test: &Expr, consequent: &Stmt, alternate: Option<&Stmt>) {
        self.out.push_str("if (");
        self.print_expr(test, SEQUENCE);
        self.out.push(')');
        let consequent_block = self.print_clause(consequent);

        let Some(alternate) = alternate else {
            if consequent_block {
                self.out.push('\n');
            }
            return;
        };

        if consequent_block {
            self.out.push_str(" else");
        } else {
            self.indent();
            self.out.push_str("else");
        }
        if let Stmt::If {
            test,
            consequent,
            alternate,
        } = alternate
        {
            // Chain flat: `else if (...)`.
            self.out.push(' ');
            self.print_if(test, consequent, alternate.as_deref());
        } else if self.print_clause(alternate) {
            self.out.push('\n');
        }
    }

    fn print_switch(&mut self, discriminant: &Expr, cases: &[SwitchCase]) {
        self.indent();
        self.out.push_str("switch (");
        self.print_expr(discriminant, SEQUENCE);
        self.out.push_str(") {\n");
        for case in cases {
            self.indent();
            match &case.test {
                Some(test) => {
                    self.out.push_str("case ");
                    self.print_expr(test, SEQUENCE);
                    self.out.push_str(":\n");
                }
                None => self.out.push_str("default:\n"),
            }
            self.depth += 1;
            for stmt in &case.body {
                self.print_stmt(stmt);
            }
            self.depth -= 1;
        }
        self.indent();
        self.out.push_str("}\n");
    }

    fn print_for_each(&mut self, left: &ForTarget, right: &Expr, body: &Stmt, keyword: &str) {
        self.indent();
        self.out.push_str("for (");
        match left {
            ForTarget::Decl(decl) => self.print_var_decl(decl),
            ForTarget::Pattern(expr) => self.print_expr(expr, CALL),
        }
        let _ = write!(self.out, " {keyword} ");
        self.print_expr(right, ASSIGN);
        self.out.push(')');
        if self.print_clause(body) {
            self.out.push('\n');
        }
    }

    fn print_jump(&mut self, keyword: &str, label: &Option<String>) {
        self.indent();
        self.out.push_str(keyword);
        if let Some(label) = label {
            self.out.push(' ');
            self.out.push_str(label);
        }
        self.out.push_str(";\n");
    }

    fn print_try(
        &mut self,
        block: &[Stmt],
        handler: Option<&CatchClause>,
        finalizer: Option<&[Stmt]>,
    ) {
        self.indent();
        self.out.push_str("try");
        self.print_body_inline(block);
        if let Some(handler) = handler {
            match &handler.param {
                Some(param) => {
                    let _ = write!(self.out, " catch ({param})");
                }
                None => self.out.push_str(" catch"),
            }
            self.print_body_inline(&handler.body);
        }
        if let Some(finalizer) = finalizer {
            self.out.push_str(" finally");
            self.print_body_inline(finalizer);
        }
        self.out.push('\n');
    }

    fn print_body_inline(&mut self, body: &[Stmt]) {
        self.out.push_str(" {\n");
        self.depth += 1;
        for stmt in body {
            self.print_stmt(stmt);
        }
        self.depth -= 1;
        self.indent();
        self.out.push('}');
    }

    fn print_var_decl(&mut self, decl: &VarDecl) {
        self.out.push_str(decl.kind.as_str());
        self.out.push(' ');
        for (i, declarator) in decl.declarators.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.print_declarator(declarator);
        }
    }

    fn print_declarator(&mut self, declarator: &Declarator) {
        self.out.push_str(&declarator.name);
        if let Some(init) = &declarator.init {
            self.out.push_str(" = ");
            self.print_expr(init, ASSIGN);
        }
    }

    fn print_function(&mut self, function: &Function) {
        match &function.name {
            Some(name) => {
                let _ = write!(self.out, "function {name}(");
            }
            None => self.out.push_str("function ("),
        }
        self.print_params(&function.params);
        self.out.push(')');
        self.print_body_inline(&function.body);
    }

    fn print_params(&mut self, params: &[String]) {
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(param);
        }
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn print_expr(&mut self, expr: &Expr, min: u8) {
        if precedence(expr) < min {
            self.out.push('(');
            self.print_expr_inner(expr);
            self.out.push(')');
        } else {
            self.print_expr_inner(expr);
        }
    }

    fn print_expr_inner(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(name) => self.out.push_str(name),
            Expr::Literal(lit) => self.print_literal(lit),
            Expr::This => self.out.push_str("this"),
            Expr::Template { quasis, exprs } => self.print_template(quasis, exprs),
            Expr::Array(elements) => self.print_array(elements),
            Expr::Object(properties) => self.print_object(properties),
            Expr::Function(function) => self.print_function(function),
            Expr::Arrow { params, body } => self.print_arrow(params, body),
            Expr::Sequence(exprs) => {
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.print_expr(expr, ASSIGN);
                }
            }
            Expr::Unary { op, argument } => {
                self.out.push_str(op.as_str());
                if op.is_keyword() {
                    self.out.push(' ');
                }
                let sign = match op {
                    UnaryOp::Minus => Some('-'),
                    UnaryOp::Plus => Some('+'),
                    _ => None,
                };
                let at = self.out.len();
                self.print_expr(argument, UNARY);
                // `- -a` must not fuse into `--a`.
                if let Some(sign) = sign {
                    if self.out[at..].starts_with(sign) {
                        self.out.insert(at, ' ');
                    }
                }
            }
            Expr::Update {
                op,
                prefix,
                argument,
            } => {
                if *prefix {
                    self.out.push_str(op.as_str());
                    self.print_expr(argument, UNARY);
                } else {
                    self.print_expr(argument, POSTFIX);
                    self.out.push_str(op.as_str());
                }
            }
            Expr::Binary { op, left, right } => {
                let prec = binary_precedence(*op);
                let (left_min, right_min) = if *op == BinaryOp::Exp {
                    // Right-associative.
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                self.print_expr(left, left_min);
                let _ = write!(self.out, " {} ", op.as_str());
                self.print_expr(right, right_min);
            }
            Expr::Logical { op, left, right } => {
                let prec = match op {
                    LogicalOp::Or => LOGICAL_OR,
                    LogicalOp::And => LOGICAL_AND,
                };
                self.print_expr(left, prec);
                let _ = write!(self.out, " {} ", op.as_str());
                self.print_expr(right, prec + 1);
            }
            Expr::Assign { op, target, value } => {
                self.print_expr(target, CALL);
                let _ = write!(self.out, " {} ", op.as_str());
                self.print_expr(value, ASSIGN);
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.print_expr(test, LOGICAL_OR);
                self.out.push_str(" ? ");
                self.print_expr(consequent, ASSIGN);
                self.out.push_str(" : ");
                self.print_expr(alternate, ASSIGN);
            }
            Expr::Call { callee, arguments } => {
                self.print_expr(callee, CALL);
                self.print_arguments(arguments);
            }
            Expr::New { callee, arguments } => {
                self.out.push_str("new ");
                if callee_contains_call(callee) {
                    self.out.push('(');
                    self.print_expr(callee, SEQUENCE);
                    self.out.push(')');
                } else {
                    self.print_expr(callee, CALL);
                }
                self.print_arguments(arguments);
            }
            Expr::Member { object, property } => {
                // `5.toString()` is a syntax error; the literal needs parens.
                let literal_object = matches!(&**object, Expr::Literal(Lit::Number(_)));
                if literal_object {
                    self.out.push('(');
                    self.print_expr(object, SEQUENCE);
                    self.out.push(')');
                } else {
                    self.print_expr(object, CALL);
                }
                match property {
                    MemberKey::Static(name) => {
                        self.out.push('.');
                        self.out.push_str(name);
                    }
                    MemberKey::Computed(expr) => {
                        self.out.push('[');
                        self.print_expr(expr, SEQUENCE);
                        self.out.push(']');
                    }
                }
            }
            Expr::Spread(inner) => {
                self.out.push_str("...");
                self.print_expr(inner, ASSIGN);
            }
        }
    }

    fn print_arguments(&mut self, arguments: &[Expr]) {
        self.out.push('(');
        for (i, argument) in arguments.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.print_expr(argument, ASSIGN);
        }
        self.out.push(')');
    }

    fn print_arrow(&mut self, params: &[String], body: &ArrowBody) {
        if params.len() == 1 {
            self.out.push_str(&params[0]);
        } else {
            self.out.push('(');
            self.print_params(params);
            self.out.push(')');
        }
        self.out.push_str(" => ");
        match body {
            ArrowBody::Expr(expr) => {
                // `() => ({})`: an object body would read as a block.
                if needs_stmt_parens(expr) {
                    self.out.push('(');
                    self.print_expr(expr, ASSIGN);
                    self.out.push(')');
                } else {
                    self.print_expr(expr, ASSIGN);
                }
            }
            ArrowBody::Block(body) => {
                self.out.push('{');
                self.out.push('\n');
                self.depth += 1;
                for stmt in body {
                    self.print_stmt(stmt);
                }
                self.depth -= 1;
                self.indent();
                self.out.push('}');
            }
        }
    }

    fn print_array(&mut self, elements: &[Option<Expr>]) {
        self.out.push('[');
        for (i, element) in elements.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            if let Some(expr) = element {
                self.print_expr(expr, ASSIGN);
            }
        }
        // A trailing elision needs its comma kept: [1, ,].
        if matches!(elements.last(), Some(None)) {
            self.out.push(',');
        }
        self.out.push(']');
    }

    fn print_object(&mut self, properties: &[Property]) {
        if properties.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{ ");
        for (i, property) in properties.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            if property.shorthand {
                if let PropertyKey::Ident(name) = &property.key {
                    self.out.push_str(name);
                    continue;
                }
            }
            match &property.key {
                PropertyKey::Ident(name) => self.out.push_str(name),
                PropertyKey::String(value) => self.print_string(value),
                PropertyKey::Number(value) => self.out.push_str(&format_number(*value)),
                PropertyKey::Computed(expr) => {
                    self.out.push('[');
                    self.print_expr(expr, ASSIGN);
                    self.out.push(']');
                }
            }
            self.out.push_str(": ");
            self.print_expr(&property.value, ASSIGN);
        }
        self.out.push_str(" }");
    }

    fn print_template(&mut self, quasis: &[String], exprs: &[Expr]) {
        self.out.push('`');
        for (i, chunk) in quasis.iter().enumerate() {
            let escaped = chunk
                .replace('\\', "\\\\")
                .replace('`', "\\`")
                .replace("${", "\\${");
            self.out.push_str(&escaped);
            if let Some(expr) = exprs.get(i) {
                self.out.push_str("${");
                self.print_expr(expr, SEQUENCE);
                self.out.push('}');
            }
        }
        self.out.push('`');
    }

    fn print_literal(&mut self, lit: &Lit) {
        match lit {
            Lit::Number(value) => self.out.push_str(&format_number(*value)),
            Lit::String(value) => self.print_string(value),
            Lit::Bool(value) => self.out.push_str(if *value { "true" } else { "false" }),
            Lit::Null => self.out.push_str("null"),
            Lit::Regex { pattern, flags } => {
                let _ = write!(self.out, "/{pattern}/{flags}");
            }
        }
    }

    fn print_string(&mut self, value: &str) {
        self.out.push('\'');
        for c in value.chars() {
            match c {
                '\\' => self.out.push_str("\\\\"),
                '\'' => self.out.push_str("\\'"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                '\0' => self.out.push_str("\\0"),
                c if (c as u32) < 0x20 => {
                    let _ = write!(self.out, "\\x{:02x}", c as u32);
                }
                c => self.out.push(c),
            }
        }
        self.out.push('\'');
    }
}

// ============================================================================
// PRECEDENCE AND SHAPE QUERIES
// ============================================================================

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Sequence(_) => SEQUENCE,
        Expr::Assign { .. } | Expr::Arrow { .. } => ASSIGN,
        Expr::Conditional { .. } => CONDITIONAL,
        Expr::Logical {
            op: LogicalOp::Or, ..
        } => LOGICAL_OR,
        Expr::Logical {
            op: LogicalOp::And, ..
        } => LOGICAL_AND,
        Expr::Binary { op, .. } => binary_precedence(*op),
        Expr::Unary { .. } => UNARY,
        Expr::Update { prefix: true, .. } => UNARY,
        Expr::Update { prefix: false, .. } => POSTFIX,
        Expr::Call { .. } | Expr::New { .. } | Expr::Member { .. } => CALL,
        Expr::Spread(_) => ASSIGN,
        _ => PRIMARY,
    }
}

fn binary_precedence(op: BinaryOp) -> u8 {
    use BinaryOp::*;
    match op {
        BitOr => BIT_OR,
        BitXor => BIT_XOR,
        BitAnd => BIT_AND,
        Eq | NotEq | StrictEq | StrictNotEq => EQUALITY,
        Lt | LtEq | Gt | GtEq | In | Instanceof => RELATIONAL,
        Shl | Shr | UShr => SHIFT,
        Add | Sub => ADDITIVE,
        Mul | Div | Mod => MULTIPLICATIVE,
        Exp => EXPONENT,
    }
}

/// Whether an expression in statement position would be misread from its
/// first token (`{` as a block, `function` as a declaration).
fn needs_stmt_parens(expr: &Expr) -> bool {
    match expr {
        Expr::Object(_) | Expr::Function(_) => true,
        Expr::Sequence(exprs) => exprs.first().is_some_and(needs_stmt_parens),
        Expr::Binary { left, .. } | Expr::Logical { left, .. } => needs_stmt_parens(left),
        Expr::Assign { target, .. } => needs_stmt_parens(target),
        Expr::Conditional { test, .. } => needs_stmt_parens(test),
        Expr::Call { callee, .. } => needs_stmt_parens(callee),
        Expr::Member { object, .. } => needs_stmt_parens(object),
        Expr::Update {
            prefix: false,
            argument,
            ..
        } => needs_stmt_parens(argument),
        _ => false,
    }
}

/// `new` must not capture an argument list belonging to its callee: the
/// callee parenthesizes whenever its member chain contains a call.
fn callee_contains_call(expr: &Expr) -> bool {
    match expr {
        Expr::Call { .. } => true,
        Expr::Member { object, .. } => callee_contains_call(object),
        _ => false,
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}
