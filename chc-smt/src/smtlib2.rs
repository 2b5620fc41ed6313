#![forbid(unsafe_code)]

use std::collections::{BTreeMap, HashSet};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::format::forall;
use crate::{ChcSolver, CheckResult, QueryOutcome, Relation, SolverProcess, Term};

/// Accumulated declarations and rules of one Horn problem, as SMT-LIB2 text.
#[derive(Clone, Debug, Default)]
pub struct HornScript {
    declared: HashSet<String>,
    declarations: Vec<String>,
    rules: Vec<String>,
}

impl HornScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, relation: &Relation) {
        if self.declared.insert(relation.name.clone()) {
            self.declarations.push(relation.to_string());
        }
    }

    pub fn add_rule(&mut self, rule: &Term, name: &str) {
        self.rules.push(format!("; {name}\n(assert {})", forall(rule)));
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Declarations and rules, without logic selection or commands.
    pub fn assertions(&self) -> String {
        let mut out = String::new();
        for d in &self.declarations {
            out.push_str(d);
            out.push('\n');
        }
        for r in &self.rules {
            out.push_str(r);
            out.push('\n');
        }
        out
    }

    pub fn render(&self) -> String {
        format!("(set-logic HORN)\n{}", self.assertions())
    }

    /// `query ⇒ false`, closed over its variables.
    pub fn query_assertion(query: &Term) -> String {
        format!("(assert {})", forall(&Term::implies(query.clone(), Term::bool(false))))
    }

    pub fn query_script(&self, query: &Term) -> String {
        format!("{}{}\n(check-sat)\n", self.render(), Self::query_assertion(query))
    }
}

/// SHA-256 of a query script, hex encoded; the key of the response map.
pub fn query_hash(script: &str) -> String {
    hex::encode(Sha256::digest(script.as_bytes()))
}

/// Interpret a solver answer to a HORN query script.
///
/// `sat` means the clauses have a model, i.e. the queried predicate is
/// unreachable.
pub fn parse_answer(text: &str) -> QueryOutcome {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let result = match lines.next() {
        Some("sat") => CheckResult::Unsatisfiable,
        Some("unsat") => CheckResult::Satisfiable,
        Some("unknown") | Some("timeout") => CheckResult::Unknown,
        _ => CheckResult::Error,
    };
    QueryOutcome {
        result,
        values: lines.map(str::to_string).collect(),
    }
}

/// Textual backend: renders every query as a script and answers it from a
/// replay map, an external process, or not at all.
#[derive(Debug, Default)]
pub struct SmtLib2Chc {
    script: HornScript,
    responses: BTreeMap<String, String>,
    process: Option<SolverProcess>,
    unhandled: Vec<String>,
}

impl SmtLib2Chc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(mut self, responses: BTreeMap<String, String>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_process(mut self, process: SolverProcess) -> Self {
        self.process = Some(process);
        self
    }

    pub fn script(&self) -> &HornScript {
        &self.script
    }
}

impl ChcSolver for SmtLib2Chc {
    /// Recorded answers and the solver process are configuration and stay.
    fn reset(&mut self) {
        self.script = HornScript::new();
        self.unhandled.clear();
    }

    fn register_relation(&mut self, relation: &Relation) {
        debug!(relation = %relation.name, arity = relation.arity(), "declare relation");
        self.script.declare(relation);
    }

    fn add_rule(&mut self, rule: &Term, name: &str) {
        self.script.add_rule(rule, name);
    }

    fn query(&mut self, query: &Term) -> QueryOutcome {
        let script = self.script.query_script(query);
        let hash = query_hash(&script);

        if let Some(answer) = self.responses.get(&hash) {
            debug!(%hash, "replaying recorded answer");
            return parse_answer(answer);
        }

        match &self.process {
            Some(process) => match process.run(&script) {
                Ok(answer) => parse_answer(&answer),
                Err(e) => {
                    warn!(error = %e, "solver invocation failed");
                    QueryOutcome::new(CheckResult::Error)
                }
            },
            None => {
                debug!(%hash, "no answer for query");
                self.unhandled.push(script);
                QueryOutcome::new(CheckResult::Unknown)
            }
        }
    }

    fn unhandled_queries(&self) -> Vec<String> {
        self.unhandled.clone()
    }
}
