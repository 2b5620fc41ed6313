#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use chc_ast::{NodeId, Span};
use chc_smt::CheckResult;
use serde::Serialize;

use crate::ChcWarning;

/// Outcome of analysing one source unit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChcReport {
    pub assertions: Vec<AssertionOutcome>,
    /// Assertions proven unreachable in every transaction that can hit them.
    pub safe: BTreeSet<NodeId>,
    pub queries: usize,
    pub warnings: Vec<ReportWarning>,
    pub unhandled_queries: Vec<String>,
    /// Error predicates in creation order.
    pub error_predicates: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssertionOutcome {
    pub assertion: NodeId,
    pub error_code: u32,
    pub span: Span,
    pub contract: String,
    pub function: String,
    /// One result per transaction that can reach the assertion.
    pub results: Vec<CheckResult>,
    pub proven: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportWarning {
    pub message: String,
    pub assertion: NodeId,
    pub span: Span,
}

impl ReportWarning {
    pub fn new(warning: &ChcWarning, span: Span) -> Self {
        Self {
            message: warning.message.clone(),
            assertion: warning.assertion,
            span,
        }
    }
}

impl ChcReport {
    pub fn is_safe(&self, assertion: NodeId) -> bool {
        self.safe.contains(&assertion)
    }

    pub fn outcome(&self, assertion: NodeId) -> Option<&AssertionOutcome> {
        self.assertions.iter().find(|a| a.assertion == assertion)
    }

    /// Number of assertions proven safe.
    pub fn proven(&self) -> usize {
        self.safe.len()
    }
}
