//! End-to-end checks against a real Horn solver. They run only where one is
//! available: the in-process backend behind the `z3` feature, or a `z3`
//! binary on `PATH`.

mod common;

use chc_ast::build::AstBuilder;
use chc_ast::{BinaryOp, CallKind, NodeId, SourceUnit, TypeName, UnaryOp, Visibility};
use chc_smt::{ChcSolver, SmtLib2Chc, SolverProcess};
use chc_verify::{ChcEncoder, ChcWarning};

use common::{assert_id, counter};

/// A unit with one assertion and whether a sound encoding proves it.
struct Scenario {
    name: &'static str,
    unit: SourceUnit,
    assertion: NodeId,
    safe: bool,
}

/// `function f() public { assert(false); }`
fn assert_false() -> Scenario {
    let mut b = AstBuilder::new();
    let no = b.bool_lit(false);
    let check = b.assert_(no);
    let assertion = assert_id(&check);
    let body = b.block(vec![check]);
    let f = b.function("f", Visibility::Public, vec![], vec![], body);
    let c = b.contract("C", vec![], vec![f]);
    Scenario {
        name: "assert(false)",
        unit: b.unit(vec![c]),
        assertion,
        safe: false,
    }
}

/// `function h() internal { assert(x == 1); } function g() public { h(); }`
fn failing_callee() -> Scenario {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let read = b.ident(&x);
    let one = b.number(1);
    let eq = b.binary(BinaryOp::Eq, read, one);
    let check = b.assert_(eq);
    let assertion = assert_id(&check);
    let h_body = b.block(vec![check]);
    let h = b.function("h", Visibility::Internal, vec![], vec![], h_body);
    let call = b.call_internal(h.id, vec![], None);
    let call = b.expr_stmt(call);
    let g_body = b.block(vec![call]);
    let g = b.function("g", Visibility::Public, vec![], vec![], g_body);
    let c = b.contract("C", vec![x], vec![h, g]);
    Scenario {
        name: "failing callee",
        unit: b.unit(vec![c]),
        assertion,
        safe: false,
    }
}

/// `while (true) { break; assert(false); }`
fn code_after_break() -> Scenario {
    let mut b = AstBuilder::new();
    let yes = b.bool_lit(true);
    let brk = b.break_();
    let no = b.bool_lit(false);
    let check = b.assert_(no);
    let assertion = assert_id(&check);
    let loop_body = b.block(vec![brk, check]);
    let w = b.while_(yes, loop_body);
    let body = b.block(vec![w]);
    let f = b.function("f", Visibility::Public, vec![], vec![], body);
    let c = b.contract("C", vec![], vec![f]);
    Scenario {
        name: "code after break",
        unit: b.unit(vec![c]),
        assertion,
        safe: true,
    }
}

/// `x = 1; if (c) { <external call or nothing> } assert(x == 1);`
fn branch_with_call(external_call: bool) -> Scenario {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let flag = b.var("c", TypeName::Bool);
    let lhs = b.ident(&x);
    let one = b.number(1);
    let set = b.assign(lhs, one);
    let set = b.expr_stmt(set);
    let cond = b.ident(&flag);
    let inner = if external_call {
        let call = b.call(CallKind::External, vec![], None);
        vec![b.expr_stmt(call)]
    } else {
        Vec::new()
    };
    let inner = b.block(inner);
    let s = b.if_(cond, inner, None);
    let read = b.ident(&x);
    let one = b.number(1);
    let eq = b.binary(BinaryOp::Eq, read, one);
    let check = b.assert_(eq);
    let assertion = assert_id(&check);
    let body = b.block(vec![set, s, check]);
    let f = b.function("f", Visibility::Public, vec![flag], vec![], body);
    let c = b.contract("C", vec![x], vec![f]);
    Scenario {
        name: if external_call { "external call in branch" } else { "empty branch" },
        unit: b.unit(vec![c]),
        assertion,
        safe: !external_call,
    }
}

/// `function f() public {} function f(uint a) public { x = 1; }
/// function g() public { assert(x == 0); }`
fn overload_writes_state() -> Scenario {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let empty = b.block(vec![]);
    let f0 = b.function("f", Visibility::Public, vec![], vec![], empty);
    let a = b.var("a", TypeName::uint256());
    let lhs = b.ident(&x);
    let one = b.number(1);
    let set = b.assign(lhs, one);
    let set = b.expr_stmt(set);
    let f1_body = b.block(vec![set]);
    let f1 = b.function("f", Visibility::Public, vec![a], vec![], f1_body);
    let read = b.ident(&x);
    let zero = b.number(0);
    let eq = b.binary(BinaryOp::Eq, read, zero);
    let check = b.assert_(eq);
    let assertion = assert_id(&check);
    let g_body = b.block(vec![check]);
    let g = b.function("g", Visibility::Public, vec![], vec![], g_body);
    let c = b.contract("C", vec![x], vec![f0, f1, g]);
    Scenario {
        name: "overload writes state",
        unit: b.unit(vec![c]),
        assertion,
        safe: false,
    }
}

/// `function f(bool c) public { x = 0; c ? x++ : x--; assert(x != 0); }`
fn conditional_updates() -> Scenario {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let flag = b.var("c", TypeName::Bool);
    let lhs = b.ident(&x);
    let zero = b.number(0);
    let set = b.assign(lhs, zero);
    let set = b.expr_stmt(set);
    let cond = b.ident(&flag);
    let up = b.ident(&x);
    let up = b.unary(UnaryOp::PostInc, up);
    let down = b.ident(&x);
    let down = b.unary(UnaryOp::PostDec, down);
    let pick = b.conditional(cond, up, down);
    let pick = b.expr_stmt(pick);
    let read = b.ident(&x);
    let zero = b.number(0);
    let ne = b.binary(BinaryOp::Ne, read, zero);
    let check = b.assert_(ne);
    let assertion = assert_id(&check);
    let body = b.block(vec![set, pick, check]);
    let f = b.function("f", Visibility::Public, vec![flag], vec![], body);
    let c = b.contract("C", vec![x], vec![f]);
    Scenario {
        name: "conditional updates",
        unit: b.unit(vec![c]),
        assertion,
        safe: true,
    }
}

/// `function h() internal returns (bool) { assert(false); }
/// function g() public { x == 5 && h(); }` with `x` never written.
fn short_circuited_call() -> Scenario {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let no = b.bool_lit(false);
    let check = b.assert_(no);
    let assertion = assert_id(&check);
    let h_body = b.block(vec![check]);
    let r = b.var("r", TypeName::Bool);
    let h = b.function("h", Visibility::Internal, vec![], vec![r], h_body);
    let read = b.ident(&x);
    let five = b.number(5);
    let eq = b.binary(BinaryOp::Eq, read, five);
    let call = b.call_internal(h.id, vec![], Some(TypeName::Bool));
    let both = b.binary(BinaryOp::And, eq, call);
    let both = b.expr_stmt(both);
    let g_body = b.block(vec![both]);
    let g = b.function("g", Visibility::Public, vec![], vec![], g_body);
    let c = b.contract("C", vec![x], vec![h, g]);
    Scenario {
        name: "short-circuited call",
        unit: b.unit(vec![c]),
        assertion,
        safe: true,
    }
}

/// `constructor(bool c) { if (c) { return; } x = 5; }
/// function g() public { assert(x == 5); }`
fn constructor_early_return() -> Scenario {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let flag = b.var("c", TypeName::Bool);
    let cond = b.ident(&flag);
    let ret = b.return_(None);
    let early = b.block(vec![ret]);
    let s = b.if_(cond, early, None);
    let lhs = b.ident(&x);
    let five = b.number(5);
    let set = b.assign(lhs, five);
    let set = b.expr_stmt(set);
    let body = b.block(vec![s, set]);
    let ctor = b.constructor(vec![flag], body);
    let read = b.ident(&x);
    let five = b.number(5);
    let eq = b.binary(BinaryOp::Eq, read, five);
    let check = b.assert_(eq);
    let assertion = assert_id(&check);
    let g_body = b.block(vec![check]);
    let g = b.function("g", Visibility::Public, vec![], vec![], g_body);
    let c = b.contract("C", vec![x], vec![ctor, g]);
    Scenario {
        name: "constructor early return",
        unit: b.unit(vec![c]),
        assertion,
        safe: false,
    }
}

fn scenarios() -> Vec<Scenario> {
    vec![
        assert_false(),
        failing_callee(),
        code_after_break(),
        branch_with_call(true),
        branch_with_call(false),
        overload_writes_state(),
        conditional_updates(),
        short_circuited_call(),
        constructor_early_return(),
    ]
}

/// Run every scenario on a fresh solver and compare the verdicts.
fn check_scenarios(mut solver: impl FnMut() -> Box<dyn ChcSolver>) {
    for s in scenarios() {
        let mut encoder = ChcEncoder::new(solver());
        let report = encoder.analyze(&s.unit, &mut Vec::<ChcWarning>::new()).unwrap();
        assert_eq!(report.is_safe(s.assertion), s.safe, "{}", s.name);
    }
}

#[test]
fn external_z3_proves_and_refutes() {
    let Ok(process) = SolverProcess::z3() else {
        eprintln!("z3 not on PATH; skipping");
        return;
    };
    let process = process.with_timeout(10_000);

    let safe = counter(1);
    let mut encoder = ChcEncoder::new(SmtLib2Chc::new().with_process(process.clone()));
    let report = encoder.analyze(&safe.unit, &mut Vec::<ChcWarning>::new()).unwrap();
    assert!(report.is_safe(safe.assertion));

    let unsafe_ = counter(2);
    let mut encoder = ChcEncoder::new(SmtLib2Chc::new().with_process(process));
    let report = encoder.analyze(&unsafe_.unit, &mut Vec::<ChcWarning>::new()).unwrap();
    assert!(!report.is_safe(unsafe_.assertion));
}

#[test]
fn external_z3_verdicts() {
    let Ok(process) = SolverProcess::z3() else {
        eprintln!("z3 not on PATH; skipping");
        return;
    };
    let process = process.with_timeout(10_000);
    check_scenarios(|| Box::new(SmtLib2Chc::new().with_process(process.clone())) as Box<dyn ChcSolver>);
}

#[test]
fn one_encoder_reanalyzes_with_the_external_solver() {
    let Ok(process) = SolverProcess::z3() else {
        eprintln!("z3 not on PATH; skipping");
        return;
    };
    let mut encoder = ChcEncoder::new(SmtLib2Chc::new().with_process(process.with_timeout(10_000)));
    let unsafe_ = counter(2);
    let report = encoder.analyze(&unsafe_.unit, &mut Vec::<ChcWarning>::new()).unwrap();
    assert!(!report.is_safe(unsafe_.assertion));
    // The refuted unit's clauses must not leak into the next one.
    let safe = counter(1);
    let report = encoder.analyze(&safe.unit, &mut Vec::<ChcWarning>::new()).unwrap();
    assert!(report.is_safe(safe.assertion));
}

#[cfg(feature = "z3")]
mod in_process {
    use chc_smt::{CheckResult, Z3Chc};
    use chc_verify::{ChcEncoder, ChcWarning};

    use crate::check_scenarios;
    use crate::common::counter;

    #[test]
    fn z3_proves_and_refutes() {
        let safe = counter(1);
        let mut encoder = ChcEncoder::new(Z3Chc::new(10_000));
        let report = encoder.analyze(&safe.unit, &mut Vec::<ChcWarning>::new()).unwrap();
        assert!(report.is_safe(safe.assertion));

        let unsafe_ = counter(2);
        let mut encoder = ChcEncoder::new(Z3Chc::new(10_000));
        let report = encoder.analyze(&unsafe_.unit, &mut Vec::<ChcWarning>::new()).unwrap();
        assert_eq!(
            report.outcome(unsafe_.assertion).unwrap().results,
            vec![CheckResult::Satisfiable]
        );
    }

    #[test]
    fn z3_verdicts() {
        check_scenarios(|| Box::new(Z3Chc::new(10_000)) as Box<dyn chc_smt::ChcSolver>);
    }

    #[test]
    fn one_encoder_reanalyzes_in_process() {
        let mut encoder = ChcEncoder::new(Z3Chc::new(10_000));
        let unsafe_ = counter(2);
        let report = encoder.analyze(&unsafe_.unit, &mut Vec::<ChcWarning>::new()).unwrap();
        assert!(!report.is_safe(unsafe_.assertion));
        let safe = counter(1);
        let report = encoder.analyze(&safe.unit, &mut Vec::<ChcWarning>::new()).unwrap();
        assert!(report.is_safe(safe.assertion));
    }
}
