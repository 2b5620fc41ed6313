#![forbid(unsafe_code)]

use tracing::warn;

use crate::{ChcSolver, CheckResult, QueryOutcome, Relation, Term};

/// Fans every call out to several backends and merges their answers.
#[derive(Default)]
pub struct PortfolioChc {
    backends: Vec<Box<dyn ChcSolver>>,
}

impl PortfolioChc {
    pub fn new(backends: Vec<Box<dyn ChcSolver>>) -> Self {
        Self { backends }
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

/// Decisive answers win; SAT against UNSAT is a conflict.
pub fn merge(outcomes: Vec<QueryOutcome>) -> QueryOutcome {
    let sat = outcomes.iter().position(|o| o.result == CheckResult::Satisfiable);
    let unsat = outcomes.iter().position(|o| o.result == CheckResult::Unsatisfiable);
    let mut outcomes = outcomes;
    match (sat, unsat) {
        (Some(_), Some(_)) => {
            warn!("backends disagree on a query");
            QueryOutcome::new(CheckResult::Conflicting)
        }
        (Some(i), None) | (None, Some(i)) => outcomes.swap_remove(i),
        (None, None) => {
            let all_failed = !outcomes.is_empty() && outcomes.iter().all(|o| o.result == CheckResult::Error);
            if all_failed {
                QueryOutcome::new(CheckResult::Error)
            } else {
                QueryOutcome::new(CheckResult::Unknown)
            }
        }
    }
}

impl ChcSolver for PortfolioChc {
    fn reset(&mut self) {
        for b in &mut self.backends {
            b.reset();
        }
    }

    fn register_relation(&mut self, relation: &Relation) {
        for b in &mut self.backends {
            b.register_relation(relation);
        }
    }

    fn add_rule(&mut self, rule: &Term, name: &str) {
        for b in &mut self.backends {
            b.add_rule(rule, name);
        }
    }

    fn query(&mut self, query: &Term) -> QueryOutcome {
        let outcomes = self.backends.iter_mut().map(|b| b.query(query)).collect();
        merge(outcomes)
    }

    fn unhandled_queries(&self) -> Vec<String> {
        self.backends.iter().flat_map(|b| b.unhandled_queries()).collect()
    }
}
