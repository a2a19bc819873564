// Tree-level tests for the rewrite rules: each scenario builds a small
// syntax tree by hand, runs the rewriter, and checks the exact shape that
// comes back.

use lucid::ast::{
    AssignOp, BinaryOp, DeclKind, Declarator, Expr, ForInit, LogicalOp, Program, Stmt, UnaryOp,
    VarDecl,
};
use lucid::rewrite::{Rewriter, Rewritten};

// ---
// Helpers
// ---

fn ident(name: &str) -> Expr {
    Expr::ident(name)
}

fn num(value: f64) -> Expr {
    Expr::number(value)
}

fn assign(name: &str, value: f64) -> Expr {
    Expr::Assign {
        op: AssignOp::Assign,
        target: Box::new(ident(name)),
        value: Box::new(num(value)),
    }
}

fn seq(exprs: Vec<Expr>) -> Expr {
    Expr::Sequence(exprs)
}

fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr(expr)
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn declarator(name: &str) -> Declarator {
    Declarator {
        name: name.to_string(),
        init: None,
    }
}

fn var_decl(names: &[&str]) -> VarDecl {
    VarDecl {
        kind: DeclKind::Var,
        declarators: names.iter().map(|n| declarator(n)).collect(),
    }
}

fn rewrite(stmt: Stmt) -> Vec<Stmt> {
    Rewriter::new().rewrite_statement(stmt).into_vec()
}

// ---
// Conditional and logical expressions in statement position
// ---

#[test]
fn conditional_statement_becomes_if_else_with_blocks() {
    let stmt = expr_stmt(Expr::Conditional {
        test: Box::new(ident("test")),
        consequent: Box::new(seq(vec![assign("a", 10.0), assign("a", 20.0)])),
        alternate: Box::new(seq(vec![assign("a", 20.0), assign("a", 10.0)])),
    });

    let expected = Stmt::If {
        test: ident("test"),
        consequent: Box::new(Stmt::Block(vec![
            expr_stmt(assign("a", 10.0)),
            expr_stmt(assign("a", 20.0)),
        ])),
        alternate: Some(Box::new(Stmt::Block(vec![
            expr_stmt(assign("a", 20.0)),
            expr_stmt(assign("a", 10.0)),
        ]))),
    };

    assert_eq!(rewrite(stmt), vec![expected]);
}

#[test]
fn logical_and_statement_becomes_if_without_else() {
    let stmt = expr_stmt(Expr::Logical {
        op: LogicalOp::And,
        left: Box::new(ident("test")),
        right: Box::new(seq(vec![assign("a", 10.0), assign("a", 10.0)])),
    });

    let expected = Stmt::If {
        test: ident("test"),
        consequent: Box::new(Stmt::Block(vec![
            expr_stmt(assign("a", 10.0)),
            expr_stmt(assign("a", 10.0)),
        ])),
        alternate: None,
    };

    assert_eq!(rewrite(stmt), vec![expected]);
}

#[test]
fn logical_or_statement_negates_its_test() {
    let stmt = expr_stmt(Expr::Logical {
        op: LogicalOp::Or,
        left: Box::new(ident("test")),
        right: Box::new(assign("a", 1.0)),
    });

    let result = rewrite(stmt);
    assert_eq!(result.len(), 1);
    let Stmt::If {
        test, alternate, ..
    } = &result[0]
    else {
        panic!("expected an if statement, got {:?}", result[0]);
    };
    assert_eq!(
        *test,
        Expr::Unary {
            op: UnaryOp::Not,
            argument: Box::new(ident("test")),
        }
    );
    assert!(alternate.is_none(), "logical rewrites never grow an else");
}

#[test]
fn logical_rewrites_always_have_null_alternate() {
    for op in [LogicalOp::And, LogicalOp::Or] {
        let stmt = expr_stmt(Expr::Logical {
            op,
            left: Box::new(ident("cond")),
            right: Box::new(seq(vec![assign("x", 1.0), assign("y", 2.0)])),
        });
        let result = rewrite(stmt);
        assert!(
            matches!(&result[0], Stmt::If { alternate: None, .. }),
            "expected if without else for {:?}, got {:?}",
            op,
            result[0]
        );
    }
}

#[test]
fn nested_conditionals_convert_at_both_levels() {
    // Children are rewritten before their parent, so the inner conditional
    // must come out as an if statement inside the outer one.
    let inner = Expr::Conditional {
        test: Box::new(ident("u")),
        consequent: Box::new(assign("a", 1.0)),
        alternate: Box::new(assign("b", 2.0)),
    };
    let stmt = expr_stmt(Expr::Conditional {
        test: Box::new(ident("t")),
        consequent: Box::new(inner),
        alternate: Box::new(assign("c", 3.0)),
    });

    let expected = Stmt::If {
        test: ident("t"),
        // The consequent became an if, so it is block-wrapped to avoid the
        // dangling-else ambiguity.
        consequent: Box::new(Stmt::Block(vec![Stmt::If {
            test: ident("u"),
            consequent: Box::new(expr_stmt(assign("a", 1.0))),
            alternate: Some(Box::new(Stmt::Block(vec![expr_stmt(assign("b", 2.0))]))),
        }])),
        alternate: Some(Box::new(Stmt::Block(vec![expr_stmt(assign("c", 3.0))]))),
    };

    assert_eq!(rewrite(stmt), vec![expected]);
}

#[test]
fn else_bearing_if_alternate_stays_unblocked() {
    // `t ? a = 1 : u ? b = 2 : c = 3` keeps its else-if chain flat.
    let chain = Expr::Conditional {
        test: Box::new(ident("t")),
        consequent: Box::new(assign("a", 1.0)),
        alternate: Box::new(Expr::Conditional {
            test: Box::new(ident("u")),
            consequent: Box::new(assign("b", 2.0)),
            alternate: Box::new(assign("c", 3.0)),
        }),
    };

    let result = rewrite(expr_stmt(chain));
    let Stmt::If {
        alternate: Some(alternate),
        ..
    } = &result[0]
    else {
        panic!("expected if with else, got {:?}", result[0]);
    };
    assert!(
        alternate.is_if(),
        "else-bearing if must not be block-wrapped: {alternate:?}"
    );
}

// ---
// Comma sequences in statement position
// ---

#[test]
fn sequence_statement_splits_in_source_order() {
    let stmt = expr_stmt(seq(vec![
        assign("a", 1.0),
        assign("b", 2.0),
        assign("c", 3.0),
    ]));

    assert_eq!(
        rewrite(stmt),
        vec![
            expr_stmt(assign("a", 1.0)),
            expr_stmt(assign("b", 2.0)),
            expr_stmt(assign("c", 3.0)),
        ]
    );
}

#[test]
fn conditional_element_of_a_sequence_still_converts() {
    let stmt = expr_stmt(seq(vec![
        assign("a", 1.0),
        Expr::Conditional {
            test: Box::new(ident("t")),
            consequent: Box::new(assign("b", 2.0)),
            alternate: Box::new(assign("c", 3.0)),
        },
    ]));

    let result = rewrite(stmt);
    assert_eq!(result.len(), 2);
    assert_eq!(result[0], expr_stmt(assign("a", 1.0)));
    assert!(result[1].is_if(), "expected if statement, got {:?}", result[1]);
}

// ---
// Header hoisting: if, switch, return
// ---

#[test]
fn if_statement_hoists_comma_test() {
    let stmt = Stmt::If {
        test: seq(vec![assign("a", 1.0), ident("b")]),
        consequent: Box::new(expr_stmt(assign("c", 2.0))),
        alternate: None,
    };

    assert_eq!(
        rewrite(stmt),
        vec![
            expr_stmt(assign("a", 1.0)),
            Stmt::If {
                test: ident("b"),
                consequent: Box::new(expr_stmt(assign("c", 2.0))),
                alternate: None,
            },
        ]
    );
}

#[test]
fn switch_statement_hoists_comma_discriminant() {
    let stmt = Stmt::Switch {
        discriminant: seq(vec![assign("a", 1.0), ident("b")]),
        cases: vec![],
    };

    assert_eq!(
        rewrite(stmt),
        vec![
            expr_stmt(assign("a", 1.0)),
            Stmt::Switch {
                discriminant: ident("b"),
                cases: vec![],
            },
        ]
    );
}

#[test]
fn return_hoists_comma_argument_and_branches_conditional() {
    // return a, b, cond ? x : y;
    let stmt = Stmt::Return(Some(seq(vec![
        ident("a"),
        ident("b"),
        Expr::Conditional {
            test: Box::new(ident("cond")),
            consequent: Box::new(ident("x")),
            alternate: Box::new(ident("y")),
        },
    ])));

    assert_eq!(
        rewrite(stmt),
        vec![
            expr_stmt(ident("a")),
            expr_stmt(ident("b")),
            Stmt::If {
                test: ident("cond"),
                consequent: Box::new(Stmt::Block(vec![Stmt::Return(Some(ident("x")))])),
                alternate: Some(Box::new(Stmt::Block(vec![Stmt::Return(Some(ident("y")))]))),
            },
        ]
    );
}

#[test]
fn plain_return_is_left_alone() {
    let stmt = Stmt::Return(Some(ident("a")));
    assert_eq!(rewrite(stmt.clone()), vec![stmt]);
}

// ---
// For-loop declaration hoisting
// ---

fn for_loop(decl_names: &[&str], test_ident: &str) -> Stmt {
    Stmt::For {
        init: Some(ForInit::Decl(var_decl(decl_names))),
        test: Some(binary(BinaryOp::Lt, ident(test_ident), num(10.0))),
        update: None,
        body: Box::new(Stmt::Empty),
    }
}

#[test]
fn referenced_declarator_stays_in_the_loop_head() {
    let stmt = for_loop(&["i"], "i");
    assert_eq!(rewrite(stmt.clone()), vec![stmt]);
}

#[test]
fn unreferenced_declarator_is_hoisted_above_the_loop() {
    let stmt = for_loop(&["j"], "i");

    assert_eq!(
        rewrite(stmt),
        vec![
            Stmt::VarDecl(var_decl(&["j"])),
            Stmt::For {
                init: None,
                test: Some(binary(BinaryOp::Lt, ident("i"), num(10.0))),
                update: None,
                body: Box::new(Stmt::Empty),
            },
        ]
    );
}

#[test]
fn declarators_are_partitioned_preserving_order() {
    let stmt = for_loop(&["i", "j", "k"], "i");

    assert_eq!(
        rewrite(stmt),
        vec![
            Stmt::VarDecl(var_decl(&["j", "k"])),
            Stmt::For {
                init: Some(ForInit::Decl(var_decl(&["i"]))),
                test: Some(binary(BinaryOp::Lt, ident("i"), num(10.0))),
                update: None,
                body: Box::new(Stmt::Empty),
            },
        ]
    );
}

#[test]
fn update_clause_references_keep_declarators_too() {
    // for (var i, j; ; j++) ;  -- only i is unreferenced.
    let j_increment = Expr::Update {
        op: lucid::ast::UpdateOp::Increment,
        prefix: false,
        argument: Box::new(ident("j")),
    };
    let stmt = Stmt::For {
        init: Some(ForInit::Decl(var_decl(&["i", "j"]))),
        test: None,
        update: Some(j_increment.clone()),
        body: Box::new(Stmt::Empty),
    };

    assert_eq!(
        rewrite(stmt),
        vec![
            Stmt::VarDecl(var_decl(&["i"])),
            Stmt::For {
                init: Some(ForInit::Decl(var_decl(&["j"]))),
                test: None,
                update: Some(j_increment),
                body: Box::new(Stmt::Empty),
            },
        ]
    );
}

#[test]
fn comma_init_hoists_leading_expressions() {
    let stmt = Stmt::For {
        init: Some(ForInit::Expr(seq(vec![assign("a", 1.0), assign("i", 0.0)]))),
        test: None,
        update: None,
        body: Box::new(Stmt::Empty),
    };

    assert_eq!(
        rewrite(stmt),
        vec![
            expr_stmt(assign("a", 1.0)),
            Stmt::For {
                init: Some(ForInit::Expr(assign("i", 0.0))),
                test: None,
                update: None,
                body: Box::new(Stmt::Empty),
            },
        ]
    );
}

// ---
// Unary folds and comparison canonicalization
// ---

#[test]
fn not_of_numeric_one_and_zero_fold_to_booleans() {
    let rewriter = Rewriter::new();
    let not = |n: f64| Expr::Unary {
        op: UnaryOp::Not,
        argument: Box::new(num(n)),
    };
    assert_eq!(rewriter.rewrite_expression(not(1.0)), Expr::boolean(false));
    assert_eq!(rewriter.rewrite_expression(not(0.0)), Expr::boolean(true));
    // Other operands are left alone.
    assert_eq!(
        rewriter.rewrite_expression(not(2.0)),
        Expr::Unary {
            op: UnaryOp::Not,
            argument: Box::new(num(2.0)),
        }
    );
}

#[test]
fn void_of_a_literal_folds_to_undefined() {
    let rewriter = Rewriter::new();
    let void5 = Expr::Unary {
        op: UnaryOp::Void,
        argument: Box::new(num(5.0)),
    };
    assert_eq!(rewriter.rewrite_expression(void5), Expr::undefined());

    // void of a non-literal stays.
    let void_call = Expr::Unary {
        op: UnaryOp::Void,
        argument: Box::new(Expr::Call {
            callee: Box::new(ident("f")),
            arguments: vec![],
        }),
    };
    assert_eq!(rewriter.rewrite_expression(void_call.clone()), void_call);
}

#[test]
fn literal_on_the_left_swaps_and_mirrors_the_operator() {
    let rewriter = Rewriter::new();
    let result = rewriter.rewrite_expression(binary(BinaryOp::Gt, num(5.0), ident("x")));
    assert_eq!(result, binary(BinaryOp::Lt, ident("x"), num(5.0)));
}

#[test]
fn undefined_on_the_left_swaps_without_mirroring_equality() {
    let rewriter = Rewriter::new();
    let result =
        rewriter.rewrite_expression(binary(BinaryOp::Eq, Expr::undefined(), ident("x")));
    assert_eq!(result, binary(BinaryOp::Eq, ident("x"), Expr::undefined()));
}

#[test]
fn identifier_comparisons_do_not_swap() {
    let rewriter = Rewriter::new();
    let expr = binary(BinaryOp::Gt, ident("y"), ident("x"));
    assert_eq!(rewriter.rewrite_expression(expr.clone()), expr);
}

#[test]
fn wrapped_literals_count_as_literals_for_swapping() {
    // -5 > x is a literal under a non-mutating unary.
    let rewriter = Rewriter::new();
    let minus_five = Expr::Unary {
        op: UnaryOp::Minus,
        argument: Box::new(num(5.0)),
    };
    let result = rewriter.rewrite_expression(binary(
        BinaryOp::GtEq,
        minus_five.clone(),
        Expr::Call {
            callee: Box::new(ident("f")),
            arguments: vec![],
        },
    ));
    assert_eq!(
        result,
        binary(
            BinaryOp::LtEq,
            Expr::Call {
                callee: Box::new(ident("f")),
                arguments: vec![],
            },
            minus_five,
        )
    );
}

// ---
// Sequence-of-nodes plumbing
// ---

#[test]
fn block_wrapping_is_idempotent_on_blocks() {
    let block = Stmt::Block(vec![expr_stmt(ident("a"))]);
    assert_eq!(Rewritten::One(block.clone()).into_stmt(), block.clone());
    assert_eq!(Rewritten::Many(vec![block.clone()]).into_stmt(), block);
}

#[test]
fn multi_statement_results_wrap_into_a_block() {
    let stmts = vec![expr_stmt(ident("a")), expr_stmt(ident("b"))];
    assert_eq!(
        Rewritten::Many(stmts.clone()).into_stmt(),
        Stmt::Block(stmts)
    );
}

#[test]
fn program_body_flattens_split_results() {
    let program = Program {
        body: vec![
            expr_stmt(seq(vec![assign("a", 1.0), assign("b", 2.0)])),
            expr_stmt(ident("c")),
        ],
    };
    let result = lucid::transform(program);
    assert_eq!(
        result.body,
        vec![
            expr_stmt(assign("a", 1.0)),
            expr_stmt(assign("b", 2.0)),
            expr_stmt(ident("c")),
        ]
    );
}

#[test]
fn single_slot_sequences_are_block_coerced() {
    // while (t) a = 1, b = 2;  -- the body is a single-statement slot.
    let stmt = Stmt::While {
        test: ident("t"),
        body: Box::new(expr_stmt(seq(vec![assign("a", 1.0), assign("b", 2.0)]))),
    };

    let result = rewrite(stmt);
    let Stmt::While { body, .. } = &result[0] else {
        panic!("expected while, got {:?}", result[0]);
    };
    assert_eq!(
        **body,
        Stmt::Block(vec![expr_stmt(assign("a", 1.0)), expr_stmt(assign("b", 2.0))])
    );
}
