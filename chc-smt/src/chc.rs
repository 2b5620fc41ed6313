#![forbid(unsafe_code)]

use serde::Serialize;

use crate::{Relation, Term};

/// Answer to a reachability query.
///
/// `Satisfiable` means the queried predicate is reachable (the error can
/// happen); `Unsatisfiable` means it is proven unreachable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckResult {
    Satisfiable,
    Unsatisfiable,
    Unknown,
    Conflicting,
    Error,
}

impl CheckResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckResult::Satisfiable => "satisfiable",
            CheckResult::Unsatisfiable => "unsatisfiable",
            CheckResult::Unknown => "unknown",
            CheckResult::Conflicting => "conflicting",
            CheckResult::Error => "error",
        }
    }
}

impl std::fmt::Display for CheckResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryOutcome {
    pub result: CheckResult,
    /// Model or witness text, when the backend produced one.
    pub values: Vec<String>,
}

impl QueryOutcome {
    pub fn new(result: CheckResult) -> Self {
        Self {
            result,
            values: Vec::new(),
        }
    }
}

/// Horn-clause solving capability.
///
/// Relations are declared once, rules are write-once facts, queries ask
/// whether a predicate application is derivable from the rules. `reset`
/// drops every relation, rule and recorded query so that the next problem
/// starts empty.
pub trait ChcSolver {
    fn reset(&mut self);

    fn register_relation(&mut self, relation: &Relation);

    fn add_rule(&mut self, rule: &Term, name: &str);

    fn query(&mut self, query: &Term) -> QueryOutcome;

    /// Query scripts the backend could not answer.
    fn unhandled_queries(&self) -> Vec<String> {
        Vec::new()
    }
}

impl<S: ChcSolver + ?Sized> ChcSolver for Box<S> {
    fn reset(&mut self) {
        (**self).reset()
    }

    fn register_relation(&mut self, relation: &Relation) {
        (**self).register_relation(relation)
    }

    fn add_rule(&mut self, rule: &Term, name: &str) {
        (**self).add_rule(rule, name)
    }

    fn query(&mut self, query: &Term) -> QueryOutcome {
        (**self).query(query)
    }

    fn unhandled_queries(&self) -> Vec<String> {
        (**self).unhandled_queries()
    }
}
