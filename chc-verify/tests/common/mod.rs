#![allow(dead_code)]

use std::collections::HashMap;

use chc_ast::build::AstBuilder;
use chc_ast::{BinaryOp, NodeId, SourceUnit, Span, Statement, TypeName, Visibility};
use chc_smt::{ChcSolver, CheckResult, QueryOutcome, Relation, Term};
use chc_verify::{ChcEncoder, ChcReport, ChcWarning, HornRule};

/// Solver double: records what the encoder sends and answers queries from a
/// table keyed by predicate name prefix.
#[derive(Default)]
pub struct ScriptedSolver {
    pub relations: Vec<Relation>,
    pub rules: Vec<(String, Term)>,
    pub queries: Vec<String>,
    answers: HashMap<String, CheckResult>,
    default: Option<CheckResult>,
}

impl ScriptedSolver {
    pub fn answering(result: CheckResult) -> Self {
        Self {
            default: Some(result),
            ..Self::default()
        }
    }

    pub fn with_answer(mut self, predicate: &str, result: CheckResult) -> Self {
        self.answers.insert(predicate.to_string(), result);
        self
    }
}

impl ChcSolver for ScriptedSolver {
    fn reset(&mut self) {
        self.relations.clear();
        self.rules.clear();
        self.queries.clear();
    }

    fn register_relation(&mut self, relation: &Relation) {
        self.relations.push(relation.clone());
    }

    fn add_rule(&mut self, rule: &Term, name: &str) {
        self.rules.push((name.to_string(), rule.clone()));
    }

    fn query(&mut self, query: &Term) -> QueryOutcome {
        let name = query.relation_name().unwrap_or_default().to_string();
        self.queries.push(name.clone());
        let result = self
            .answers
            .get(&name)
            .copied()
            .or(self.default)
            .unwrap_or(CheckResult::Unknown);
        QueryOutcome::new(result)
    }
}

pub fn analyze(unit: &SourceUnit, solver: ScriptedSolver) -> (ChcReport, Vec<ChcWarning>, ChcEncoder<ScriptedSolver>) {
    let mut encoder = ChcEncoder::new(solver);
    let mut warnings: Vec<ChcWarning> = Vec::new();
    let report = encoder.analyze(unit, &mut warnings).expect("encoding succeeds");
    (report, warnings, encoder)
}

/// Id of the `assert` call inside an assertion statement.
pub fn assert_id(statement: &Statement) -> NodeId {
    match statement {
        Statement::Expression(s) => s.expression.id,
        other => panic!("not an assertion statement: {other:?}"),
    }
}

/// Place the `assert` call of an assertion statement at `span`.
pub fn at_span(mut statement: Statement, span: Span) -> Statement {
    match &mut statement {
        Statement::Expression(s) => s.expression.span = span,
        other => panic!("not an assertion statement: {other:?}"),
    }
    statement
}

pub fn rules_from<'a>(rules: &'a [HornRule], from: &str) -> Vec<&'a HornRule> {
    rules
        .iter()
        .filter(|r| r.from.as_deref().is_some_and(|f| f.contains(from)))
        .collect()
}

pub fn has_edge(rules: &[HornRule], from: &str, to: &str) -> bool {
    rules_from(rules, from).iter().any(|r| r.to.contains(to))
}

/// `contract C { uint x; function f() public { x = 1; assert(x == 1); } }`
pub struct Counter {
    pub unit: SourceUnit,
    pub assertion: NodeId,
    pub contract: NodeId,
}

pub fn counter(expected: i128) -> Counter {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeName::uint256());
    let lhs = b.ident(&x);
    let one = b.number(1);
    let set = b.assign(lhs, one);
    let set = b.expr_stmt(set);
    let read = b.ident(&x);
    let value = b.number(expected);
    let cond = b.binary(BinaryOp::Eq, read, value);
    let check = b.assert_(cond);
    let assertion = assert_id(&check);
    let body = b.block(vec![set, check]);
    let f = b.function("f", Visibility::Public, vec![], vec![], body);
    let c = b.contract("C", vec![x], vec![f]);
    let contract = c.id;
    Counter {
        unit: b.unit(vec![c]),
        assertion,
        contract,
    }
}
