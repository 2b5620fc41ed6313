mod common;

use chc_ast::build::AstBuilder;
use chc_ast::{BinaryOp, CallKind, TypeName, UnaryOp, Visibility, span};
use chc_smt::{CheckResult, SmtLib2Chc, Term};
use chc_verify::{CONFLICTING_MESSAGE, ChcEncoder, ChcWarning, SOLVER_ERROR_MESSAGE};

use common::*;

#[test]
fn contract_without_assertions_issues_no_queries() {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let lhs = b.ident(&x);
    let one = b.number(1);
    let set = b.assign(lhs, one);
    let set = b.expr_stmt(set);
    let body = b.block(vec![set]);
    let f = b.function("f", Visibility::Public, vec![], vec![], body);
    let c = b.contract("C", vec![x], vec![f]);
    let cid = c.id;
    let unit = b.unit(vec![c]);

    let (report, warnings, encoder) = analyze(&unit, ScriptedSolver::answering(CheckResult::Satisfiable));
    assert_eq!(report.queries, 0);
    assert!(report.assertions.is_empty());
    assert!(report.error_predicates.is_empty());
    assert!(warnings.is_empty());

    let rules = encoder.rules();
    assert_eq!(rules[0].name, "genesis");
    assert!(has_edge(rules, "genesis", &format!("implicit_constructor_C_{cid}")));
    assert!(has_edge(rules, &format!("summary_constructor_C_{cid}"), &format!("interface_C_{cid}")));
    assert!(encoder.solver().queries.is_empty());
}

#[test]
fn proven_assertion_is_reported_safe() {
    let c = counter(1);
    let (report, warnings, encoder) = analyze(&c.unit, ScriptedSolver::answering(CheckResult::Unsatisfiable));

    assert_eq!(report.queries, 1);
    assert!(report.is_safe(c.assertion));
    assert!(warnings.is_empty());
    assert_eq!(report.error_predicates, vec![format!("error_C_{}_1", c.contract)]);
    assert_eq!(encoder.solver().queries, report.error_predicates);

    let outcome = report.outcome(c.assertion).unwrap();
    assert_eq!(outcome.error_code, 1);
    assert_eq!(outcome.contract, "C");
    assert_eq!(outcome.function, "f");
    assert_eq!(outcome.results, vec![CheckResult::Unsatisfiable]);
}

#[test]
fn reachable_assertion_is_not_safe() {
    let c = counter(2);
    let (report, _, _) = analyze(&c.unit, ScriptedSolver::answering(CheckResult::Satisfiable));
    assert!(!report.is_safe(c.assertion));
    assert_eq!(report.outcome(c.assertion).unwrap().results, vec![CheckResult::Satisfiable]);
    assert_eq!(report.proven(), 0);
}

#[test]
fn assertion_sets_its_error_code_on_failure() {
    let c = counter(2);
    let (_, _, encoder) = analyze(&c.unit, ScriptedSolver::default());
    let failing = encoder
        .rules()
        .iter()
        .find(|r| r.to.starts_with("summary_") && r.term.to_string().contains("(= error_1 1)"))
        .expect("rule for the failing assertion");
    assert!(failing.term.to_string().contains("(not (= x_1_2 2))"));
}

#[test]
fn conflicting_answers_warn_at_the_assertion() {
    let c = counter(1);
    let (report, warnings, _) = analyze(&c.unit, ScriptedSolver::answering(CheckResult::Conflicting));
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, CONFLICTING_MESSAGE);
    assert_eq!(warnings[0].assertion, c.assertion);
    assert_eq!(report.warnings.len(), 1);
    assert!(!report.is_safe(c.assertion));
}

#[test]
fn warnings_point_at_their_own_assertion() {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let mut checks = Vec::new();
    for (value, at) in [(0, span(10, 5)), (1, span(40, 7)), (2, span(90, 3))] {
        let read = b.ident(&x);
        let value = b.number(value);
        let eq = b.binary(BinaryOp::Eq, read, value);
        let check = b.assert_(eq);
        checks.push(at_span(check, at));
    }
    let ids = checks.iter().map(assert_id).collect::<Vec<_>>();
    let body = b.block(checks);
    let f = b.function("f", Visibility::Public, vec![], vec![], body);
    let c = b.contract("C", vec![x], vec![f]);
    let unit = b.unit(vec![c]);

    let (report, warnings, _) = analyze(&unit, ScriptedSolver::answering(CheckResult::Conflicting));
    assert_eq!(warnings.len(), 3);
    let expected = [span(10, 5), span(40, 7), span(90, 3)];
    for (id, at) in ids.iter().zip(expected) {
        let warning = report.warnings.iter().find(|w| w.assertion == *id).unwrap();
        assert_eq!(warning.span, at);
        assert_eq!(report.outcome(*id).unwrap().span, at);
    }
}

#[test]
fn solver_errors_warn_and_unknown_stays_silent() {
    let c = counter(1);
    let (_, warnings, _) = analyze(&c.unit, ScriptedSolver::answering(CheckResult::Error));
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, SOLVER_ERROR_MESSAGE);

    let (report, warnings, _) = analyze(&c.unit, ScriptedSolver::answering(CheckResult::Unknown));
    assert!(warnings.is_empty());
    assert!(!report.is_safe(c.assertion));
}

#[test]
fn encode_only_emits_error_rules_without_querying() {
    let c = counter(1);
    let mut encoder = ChcEncoder::new(ScriptedSolver::default());
    let report = encoder.encode(&c.unit).unwrap();
    assert_eq!(report.queries, 0);
    assert_eq!(report.error_predicates.len(), 1);
    assert!(encoder.solver().queries.is_empty());
    assert!(encoder.rules().iter().any(|r| r.to == report.error_predicates[0]));
    assert!(report.outcome(c.assertion).unwrap().results.is_empty());
}

#[test]
fn encoding_is_deterministic() {
    let render = || {
        let (_, _, encoder) = analyze(&counter(1).unit, ScriptedSolver::default());
        encoder
            .rules()
            .iter()
            .map(|r| format!("{}: {}", r.name, r.term))
            .collect::<Vec<_>>()
    };
    assert_eq!(render(), render());
}

#[test]
fn block_numbers_continue_across_units() {
    let c = counter(1);
    let mut encoder = ChcEncoder::new(ScriptedSolver::default());
    let mut warnings: Vec<ChcWarning> = Vec::new();
    encoder.analyze(&c.unit, &mut warnings).unwrap();
    assert!(encoder.rules().iter().any(|r| r.to.starts_with("block_1_function_f_")));
    encoder.analyze(&c.unit, &mut warnings).unwrap();
    assert!(encoder.rules().iter().any(|r| r.to.starts_with("block_4_function_f_")));
    assert!(!encoder.rules().iter().any(|r| r.to.starts_with("block_1_")));
}

#[test]
fn each_analysis_starts_from_an_empty_solver() {
    let first = counter(2);
    let second = counter(1);
    let mut encoder = ChcEncoder::new(ScriptedSolver::answering(CheckResult::Unsatisfiable));
    let mut warnings: Vec<ChcWarning> = Vec::new();
    encoder.analyze(&first.unit, &mut warnings).unwrap();
    let report = encoder.analyze(&second.unit, &mut warnings).unwrap();

    let solver = encoder.solver();
    assert_eq!(solver.queries, report.error_predicates);
    assert_eq!(solver.rules.len(), encoder.rules().len());
    assert!(!solver.rules.iter().any(|(_, r)| r.to_string().contains("(not (= x_1_2 2))")));
    let error = format!("error_C_{}_1", second.contract);
    let into_error = solver
        .rules
        .iter()
        .filter(|(_, r)| matches!(r, Term::Implies(_, head) if head.relation_name() == Some(error.as_str())))
        .count();
    assert_eq!(into_error, 1);
}

#[test]
fn textual_script_holds_only_the_last_unit() {
    let first = counter(2);
    let second = counter(1);
    let mut encoder = ChcEncoder::new(SmtLib2Chc::new());
    encoder.encode(&first.unit).unwrap();
    encoder.encode(&second.unit).unwrap();
    let script = encoder.solver().script().render();
    assert!(!script.contains("(not (= x_1_2 2))"));
    assert!(script.contains("(not (= x_1_2 1))"));
    // One unit: genesis starts the constructor and the one transaction.
    assert_eq!(script.matches("; genesis_to_").count(), 2);
}

#[test]
fn while_loop_has_a_back_edge() {
    let mut b = AstBuilder::new();
    let i = b.var("i", TypeName::uint256());
    let zero = b.number(0);
    let decl = b.declare(i.clone(), Some(zero));
    let read = b.ident(&i);
    let ten = b.number(10);
    let cond = b.binary(BinaryOp::Lt, read, ten);
    let target = b.ident(&i);
    let inc = b.unary(UnaryOp::PreInc, target);
    let inc = b.expr_stmt(inc);
    let loop_body = b.block(vec![inc]);
    let w = b.while_(cond, loop_body);
    let body = b.block(vec![decl, w]);
    let f = b.function("f", Visibility::Public, vec![], vec![], body);
    let c = b.contract("C", vec![], vec![f]);
    let unit = b.unit(vec![c]);

    let (_, _, encoder) = analyze(&unit, ScriptedSolver::default());
    let rules = encoder.rules();
    assert!(has_edge(rules, "while_header_", "while_body_"));
    assert!(has_edge(rules, "while_body_", "while_header_"));
    let entry = rules_from(rules, "while_header_");
    assert_eq!(entry.len(), 2);
}

#[test]
fn break_continues_in_a_ghost_block() {
    // function f() public { while (true) { break; x = 7; } }
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let yes = b.bool_lit(true);
    let brk = b.break_();
    let lhs = b.ident(&x);
    let seven = b.number(7);
    let set = b.assign(lhs, seven);
    let set = b.expr_stmt(set);
    let loop_body = b.block(vec![brk, set]);
    let w = b.while_(yes, loop_body);
    let body = b.block(vec![w]);
    let body_id = body.id();
    let f = b.function("f", Visibility::Public, vec![], vec![], body);
    let c = b.contract("C", vec![x], vec![f]);
    let cid = c.id;
    let unit = b.unit(vec![c]);

    let (_, _, encoder) = analyze(&unit, ScriptedSolver::default());
    let rules = encoder.rules();
    let after = format!("_f_{body_id}_{cid}");
    let out_of_body = rules_from(rules, "while_body_");
    assert_eq!(out_of_body.len(), 1);
    assert!(out_of_body[0].to.starts_with("block_") && out_of_body[0].to.ends_with(&after));

    // The statement after break lives only in the ghost block.
    let writes = rules
        .iter()
        .filter(|r| r.term.to_string().contains(" 7)"))
        .collect::<Vec<_>>();
    assert!(!writes.is_empty());
    assert!(
        writes
            .iter()
            .all(|r| r.from.as_deref().is_some_and(|f| f.contains("break_ghost_")))
    );
    assert!(has_edge(rules, "break_ghost_", "while_header_"));
}

#[test]
fn for_loop_continue_goes_through_the_post_block() {
    let mut b = AstBuilder::new();
    let i = b.var("i", TypeName::uint256());
    let zero = b.number(0);
    let init = b.declare(i.clone(), Some(zero));
    let read = b.ident(&i);
    let three = b.number(3);
    let cond = b.binary(BinaryOp::Lt, read, three);
    let target = b.ident(&i);
    let post = b.unary(UnaryOp::PostInc, target);
    let cont = b.continue_();
    let loop_body = b.block(vec![cont]);
    let l = b.for_(Some(init), Some(cond), Some(post), loop_body);
    let body = b.block(vec![l]);
    let f = b.function("f", Visibility::Public, vec![], vec![], body);
    let c = b.contract("C", vec![], vec![f]);
    let unit = b.unit(vec![c]);

    let (_, _, encoder) = analyze(&unit, ScriptedSolver::default());
    let rules = encoder.rules();
    assert!(has_edge(rules, "for_body_", "for_post_"));
    assert!(has_edge(rules, "continue_ghost_", "for_post_"));
    assert!(has_edge(rules, "for_post_", "for_header_"));
}

#[test]
fn break_outside_of_a_loop_is_an_error() {
    let mut b = AstBuilder::new();
    let brk = b.break_();
    let body = b.block(vec![brk]);
    let f = b.function("f", Visibility::Public, vec![], vec![], body);
    let c = b.contract("C", vec![], vec![f]);
    let unit = b.unit(vec![c]);

    let mut encoder = ChcEncoder::new(ScriptedSolver::default());
    let err = encoder.analyze(&unit, &mut Vec::<ChcWarning>::new()).unwrap_err();
    assert!(err.message.contains("break outside of a loop"));
}

fn erasure_unit(external_call: bool) -> (chc_ast::SourceUnit, chc_ast::NodeId) {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let flag = b.var("c", TypeName::Bool);
    let lhs = b.ident(&x);
    let one = b.number(1);
    let set = b.assign(lhs, one);
    let set = b.expr_stmt(set);
    let cond = b.ident(&flag);
    let branch = if external_call {
        let call = b.call(CallKind::External, vec![], None);
        b.expr_stmt(call)
    } else {
        b.block(vec![])
    };
    let branch = b.block(vec![branch]);
    let s = b.if_(cond, branch, None);
    let read = b.ident(&x);
    let one = b.number(1);
    let eq = b.binary(BinaryOp::Eq, read, one);
    let check = b.assert_(eq);
    let body = b.block(vec![set, s, check]);
    let f = b.function("f", Visibility::Public, vec![flag], vec![], body);
    let x_id = x.id;
    let c = b.contract("C", vec![x], vec![f]);
    (b.unit(vec![c]), x_id)
}

#[test]
fn unknown_call_erases_state_at_the_merge() {
    let (unit, x) = erasure_unit(true);
    let (_, _, encoder) = analyze(&unit, ScriptedSolver::default());
    let text = encoder
        .rules()
        .iter()
        .map(|r| r.term.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    assert!(text.contains(&format!("(not (= x_{x}_2 1))")));

    let (unit, x) = erasure_unit(false);
    let (_, _, encoder) = analyze(&unit, ScriptedSolver::default());
    let text = encoder
        .rules()
        .iter()
        .map(|r| r.term.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    assert!(text.contains(&format!("(not (= x_{x}_1 1))")));
}

#[test]
fn internal_call_propagates_callee_errors() {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let read = b.ident(&x);
    let zero = b.number(0);
    let eq = b.binary(BinaryOp::Eq, read, zero);
    let check = b.assert_(eq);
    let assertion = assert_id(&check);
    let f_body = b.block(vec![check]);
    let f = b.function("f", Visibility::Internal, vec![], vec![], f_body);
    let call = b.call_internal(f.id, vec![], None);
    let call = b.expr_stmt(call);
    let g_body = b.block(vec![call]);
    let g = b.function("g", Visibility::Public, vec![], vec![], g_body);
    let c = b.contract("C", vec![x], vec![f, g]);
    let unit = b.unit(vec![c]);

    let (report, _, encoder) = analyze(&unit, ScriptedSolver::answering(CheckResult::Satisfiable));
    // Only g starts a transaction; it reaches f's assertion through the call.
    assert_eq!(report.queries, 1);
    assert_eq!(report.outcome(assertion).unwrap().function, "f");
    assert!(
        encoder
            .rules()
            .iter()
            .any(|r| r.to.contains("function_g_") && r.term.to_string().contains("(> error_"))
    );
}

#[test]
fn library_calls_assume_the_library_interface() {
    let mut b = AstBuilder::new();
    let r = b.var("r", TypeName::uint256());
    let lhs = b.ident(&r);
    let one = b.number(1);
    let set = b.assign(lhs, one);
    let set = b.expr_stmt(set);
    let lf_body = b.block(vec![set]);
    let lf = b.function("lf", Visibility::Internal, vec![], vec![r], lf_body);
    let lf_id = lf.id;
    let lib = b.library("L", vec![], vec![lf]);
    let lib_id = lib.id;

    let v = b.var("v", TypeName::uint256());
    let call = b.call_internal(lf_id, vec![], Some(TypeName::uint256()));
    let decl = b.declare(v, Some(call));
    let g_body = b.block(vec![decl]);
    let g = b.function("g", Visibility::Public, vec![], vec![], g_body);
    let c = b.contract("C", vec![], vec![g]);
    let unit = b.unit(vec![lib, c]);

    let (_, _, encoder) = analyze(&unit, ScriptedSolver::default());
    let text = encoder
        .rules()
        .iter()
        .map(|r| r.term.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    assert!(text.contains(&format!("interface_L_{lib_id}")));
    assert!(text.contains(&format!("function_lf__{lf_id}_{lib_id}")));
    assert!(text.contains(&format!("ret_{lf_id}_fresh_")));
}

#[test]
fn constructor_is_wired_through_its_summary() {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let a = b.var("a", TypeName::uint256());
    let lhs = b.ident(&x);
    let rhs = b.ident(&a);
    let set = b.assign(lhs, rhs);
    let set = b.expr_stmt(set);
    let read_x = b.ident(&x);
    let read_a = b.ident(&a);
    let eq = b.binary(BinaryOp::Eq, read_x, read_a);
    let check = b.assert_(eq);
    let assertion = assert_id(&check);
    let body = b.block(vec![set, check]);
    let ctor = b.constructor(vec![a], body);
    let d = b.contract("D", vec![x], vec![ctor]);
    let did = d.id;
    let unit = b.unit(vec![d]);

    let (report, _, encoder) = analyze(&unit, ScriptedSolver::answering(CheckResult::Unsatisfiable));
    let rules = encoder.rules();
    assert!(has_edge(rules, &format!("implicit_constructor_D_{did}"), "block_"));
    assert!(has_edge(rules, "block_", &format!("constructor_exit_D_{did}")));
    assert!(has_edge(
        rules,
        &format!("constructor_exit_D_{did}"),
        &format!("summary_constructor_D_{did}")
    ));
    assert!(has_edge(rules, &format!("summary_constructor_D_{did}"), &format!("interface_D_{did}")));
    assert_eq!(report.error_predicates, vec![format!("error_D_{did}_1")]);
    assert!(report.is_safe(assertion));
    assert_eq!(report.outcome(assertion).unwrap().function, "");
}

#[test]
fn overridden_functions_are_not_separate_transactions() {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let read = b.ident(&x);
    let zero = b.number(0);
    let eq = b.binary(BinaryOp::Eq, read, zero);
    let check = b.assert_(eq);
    let base_assertion = assert_id(&check);
    let base_body = b.block(vec![check]);
    let base_f = b.function("f", Visibility::Public, vec![], vec![], base_body);
    let a = b.contract("A", vec![x], vec![base_f]);

    let derived_body = b.block(vec![]);
    let derived_f = b.function("f", Visibility::Public, vec![], vec![], derived_body);
    let d = b.derived("B", &[&a], vec![], vec![derived_f]);
    let unit = b.unit(vec![a, d]);

    let (report, _, _) = analyze(&unit, ScriptedSolver::answering(CheckResult::Unsatisfiable));
    // Reachable from A.f only; in B the definition is shadowed.
    assert_eq!(report.outcome(base_assertion).unwrap().results.len(), 1);
    assert_eq!(report.queries, 1);
}

#[test]
fn conditional_arms_only_update_under_their_guard() {
    // function f(bool c) public { c ? x++ : x--; assert(x == 0); }
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let flag = b.var("c", TypeName::Bool);
    let cond = b.ident(&flag);
    let up = b.ident(&x);
    let up = b.unary(UnaryOp::PostInc, up);
    let down = b.ident(&x);
    let down = b.unary(UnaryOp::PostDec, down);
    let pick = b.conditional(cond, up, down);
    let pick = b.expr_stmt(pick);
    let read = b.ident(&x);
    let zero = b.number(0);
    let eq = b.binary(BinaryOp::Eq, read, zero);
    let check = b.assert_(eq);
    let body = b.block(vec![pick, check]);
    let (x_id, c_id) = (x.id, flag.id);
    let f = b.function("f", Visibility::Public, vec![flag], vec![], body);
    let c = b.contract("C", vec![x], vec![f]);
    let unit = b.unit(vec![c]);

    let (_, _, encoder) = analyze(&unit, ScriptedSolver::default());
    let failing = encoder
        .rules()
        .iter()
        .find(|r| r.to.starts_with("summary_") && r.term.to_string().contains("(= error_1 1)"))
        .expect("rule for the failing assertion")
        .term
        .to_string();
    // Each update holds only under its arm; the merge picks one of them.
    assert!(failing.contains(&format!("(=> c_{c_id}_")));
    assert!(failing.contains(&format!("(=> (not c_{c_id}_")));
    assert!(failing.contains(&format!("(ite c_{c_id}_")));
    assert!(!failing.contains(&format!("(= x_{x_id}_2 (+ x_{x_id}_1 1)) (= x_{x_id}_3 (- x_{x_id}_2 1))")));
}

#[test]
fn short_circuit_call_fails_only_when_reached() {
    // function g(bool c) public { c && h(); }  with h asserting x == 0
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let read = b.ident(&x);
    let zero = b.number(0);
    let eq = b.binary(BinaryOp::Eq, read, zero);
    let check = b.assert_(eq);
    let h_body = b.block(vec![check]);
    let r = b.var("r", TypeName::Bool);
    let h = b.function("h", Visibility::Internal, vec![], vec![r], h_body);
    let flag = b.var("c", TypeName::Bool);
    let c_id = flag.id;
    let cond = b.ident(&flag);
    let call = b.call_internal(h.id, vec![], Some(TypeName::Bool));
    let both = b.binary(BinaryOp::And, cond, call);
    let both = b.expr_stmt(both);
    let g_body = b.block(vec![both]);
    let g = b.function("g", Visibility::Public, vec![flag], vec![], g_body);
    let c = b.contract("C", vec![x], vec![h, g]);
    let unit = b.unit(vec![c]);

    let (_, _, encoder) = analyze(&unit, ScriptedSolver::default());
    let propagated = encoder
        .rules()
        .iter()
        .find(|r| r.to.contains("function_g_") && r.term.to_string().contains("(> error_"))
        .expect("rule propagating the callee's failure")
        .term
        .to_string();
    // The failure edge is guarded by the left operand.
    let at = propagated.find("(> error_").unwrap();
    let guard = propagated[..at].trim_end().rsplit(' ').next().unwrap();
    assert!(guard.starts_with(&format!("c_{c_id}_")), "{propagated}");
}

#[test]
fn overloads_are_separate_transactions() {
    // contract C { uint x; function f() public {} function f(uint a) public { x = 1; } }
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let empty = b.block(vec![]);
    let f0 = b.function("f", Visibility::Public, vec![], vec![], empty);
    let a = b.var("a", TypeName::uint256());
    let lhs = b.ident(&x);
    let one = b.number(1);
    let set = b.assign(lhs, one);
    let set = b.expr_stmt(set);
    let body = b.block(vec![set]);
    let f1 = b.function("f", Visibility::Public, vec![a], vec![], body);
    let f1_id = f1.id;
    let c = b.contract("C", vec![x], vec![f0, f1]);
    let cid = c.id;
    let unit = b.unit(vec![c]);

    let (_, _, encoder) = analyze(&unit, ScriptedSolver::default());
    let interface = format!("interface_C_{cid}");
    let into_interface = encoder
        .rules()
        .iter()
        .filter(|r| r.to == interface)
        .collect::<Vec<_>>();
    // Both overloads and the constructor.
    assert_eq!(into_interface.len(), 3);
    assert!(
        into_interface
            .iter()
            .any(|r| r.term.to_string().contains(&format!("function_f__{f1_id}_{cid}")))
    );
}

#[test]
fn constructor_return_skips_only_the_rest_of_its_body() {
    // contract D { uint x; constructor(bool c) { if (c) { return; } x = 5; } }
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
    let d = b.contract("D", vec![x], vec![ctor]);
    let did = d.id;
    let unit = b.unit(vec![d]);

    let (_, _, encoder) = analyze(&unit, ScriptedSolver::default());
    let rules = encoder.rules();
    let exit = format!("constructor_exit_D_{did}");
    assert!(has_edge(rules, "if_true_", "constructor_return_"));
    assert!(!has_edge(rules, "if_true_", &exit));
    assert!(!has_edge(rules, "return_ghost_", &exit));
    let joined = rules
        .iter()
        .filter(|r| r.to.contains("constructor_return_"))
        .collect::<Vec<_>>();
    assert_eq!(joined.len(), 2);
    assert!(joined.iter().any(|r| r.term.to_string().contains(" 5)")));
    assert!(has_edge(rules, "constructor_return_", &exit));
}
