#![forbid(unsafe_code)]

//! Error predicates and reachability queries for every (transaction,
//! assertion) pair.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chc_ast::NodeId;
use chc_smt::{CheckResult, Term};
use tracing::{info, warn};

use crate::encoder::{Scope, Translator};
use crate::registry::PredicateRole;
use crate::report::{AssertionOutcome, ChcReport, ReportWarning};
use crate::{ChcWarning, DiagnosticSink, EncodeError};

impl<'u, 's> Translator<'u, 's> {
    /// Assertions that a transaction starting in `scope` can reach,
    /// including through internal calls.
    pub fn transaction_assertions(&self, scope: Scope) -> BTreeSet<NodeId> {
        let mut out = BTreeSet::new();
        let mut visited = BTreeSet::from([scope]);
        let mut queue = VecDeque::from([scope]);
        while let Some(s) = queue.pop_front() {
            if let Some(asserts) = self.function_assertions.get(&s) {
                out.extend(asserts.iter().copied());
            }
            for callee in self.call_graph.get(&s).into_iter().flatten() {
                if visited.insert(*callee) {
                    queue.push_back(*callee);
                }
            }
        }
        out
    }

    /// Emit one error rule per reachable assertion of every target and,
    /// with a sink, query each of them.
    pub fn resolve_targets(
        &mut self,
        mut sink: Option<&mut dyn DiagnosticSink>,
    ) -> Result<ChcReport, EncodeError> {
        self.ctx.clear_assumptions();
        let targets = std::mem::take(&mut self.targets);
        let mut results: BTreeMap<NodeId, Vec<CheckResult>> = BTreeMap::new();
        let mut report = ChcReport::default();

        for target in &targets {
            let contract = self.contracts.get(&target.scope.contract).copied().ok_or_else(|| {
                EncodeError::new(format!("target in unknown contract {}", target.scope.contract))
            })?;
            for assertion in self.transaction_assertions(target.scope) {
                let (code, span) = self
                    .assertion_codes
                    .get(&assertion)
                    .and_then(|code| self.assertion(*code))
                    .map(|info| (info.code, info.span))
                    .ok_or_else(|| EncodeError::new(format!("assertion {assertion} has no error code")))?;

                let k = self.error_predicates.entry(contract.id).or_insert(0);
                *k += 1;
                let name = format!("error_{}_{}_{}", contract.name, contract.id, *k);
                let error = self.registry.create(
                    &mut *self.solver,
                    name.clone(),
                    Vec::new(),
                    PredicateRole::Error { contract: contract.id },
                );
                let error_pred = self.registry.apply(error, Vec::new())?;
                self.connect_blocks(
                    &target.from,
                    &error_pred,
                    Term::and([
                        target.constraints.clone(),
                        Term::eq(target.error.clone(), Term::int(i128::from(code))),
                    ]),
                );
                report.error_predicates.push(name.clone());

                let Some(sink) = sink.as_deref_mut() else {
                    continue;
                };
                let outcome = self.solver.query(&error_pred);
                report.queries += 1;
                info!(predicate = %name, assertion = %assertion, result = %outcome.result, "query");

                if let Some(warning) = ChcWarning::for_result(outcome.result, assertion, span) {
                    warn!(assertion = %assertion, "{}", warning.message);
                    report.warnings.push(ReportWarning::new(&warning, span));
                    sink.warning(warning);
                }
                results.entry(assertion).or_default().push(outcome.result);
            }
        }

        for info in &self.assertions {
            let results = results.remove(&info.id).unwrap_or_default();
            let proven = !results.is_empty() && results.iter().all(|r| *r == CheckResult::Unsatisfiable);
            if proven {
                report.safe.insert(info.id);
            }
            report.assertions.push(AssertionOutcome {
                assertion: info.id,
                error_code: info.code,
                span: info.span,
                contract: info.contract.clone(),
                function: info.function.clone(),
                results,
                proven,
            });
        }
        report.unhandled_queries = self.solver.unhandled_queries();
        Ok(report)
    }
}
