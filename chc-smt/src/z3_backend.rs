#![forbid(unsafe_code)]

use tracing::{debug, warn};
use z3::{Config, Context, Params, SatResult, Solver};

use crate::{ChcSolver, CheckResult, HornScript, QueryOutcome, Relation, Term};

/// In-process Z3 answering each query with a fresh HORN solver.
pub struct Z3Chc {
    ctx: &'static Context,
    script: HornScript,
    timeout_ms: u32,
}

impl Z3Chc {
    pub fn new(timeout_ms: u32) -> Self {
        let mut cfg = Config::new();
        cfg.set_model_generation(true);
        // Leaked so solvers borrowing it can be created per query without
        // self-referential structs.
        let ctx: &'static Context = Box::leak(Box::new(Context::new(&cfg)));
        Self {
            ctx,
            script: HornScript::new(),
            timeout_ms,
        }
    }
}

impl ChcSolver for Z3Chc {
    fn reset(&mut self) {
        self.script = HornScript::new();
    }

    fn register_relation(&mut self, relation: &Relation) {
        self.script.declare(relation);
    }

    fn add_rule(&mut self, rule: &Term, name: &str) {
        self.script.add_rule(rule, name);
    }

    fn query(&mut self, query: &Term) -> QueryOutcome {
        let solver = Solver::new_for_logic(self.ctx, "HORN").unwrap_or_else(|| {
            warn!("HORN logic unavailable, using default solver");
            Solver::new(self.ctx)
        });
        let mut params = Params::new(self.ctx);
        if self.timeout_ms > 0 {
            params.set_u32("timeout", self.timeout_ms);
        }
        solver.set_params(&params);

        let text = format!("{}{}\n", self.script.assertions(), HornScript::query_assertion(query));
        solver.from_string(text);

        let outcome = match solver.check() {
            // A model of the clauses is an inductive invariant excluding the query.
            SatResult::Sat => QueryOutcome {
                result: CheckResult::Unsatisfiable,
                values: solver.get_model().map(|m| vec![m.to_string()]).unwrap_or_default(),
            },
            SatResult::Unsat => QueryOutcome::new(CheckResult::Satisfiable),
            SatResult::Unknown => QueryOutcome::new(CheckResult::Unknown),
        };
        debug!(result = %outcome.result, "z3 answered");
        outcome
    }
}
