#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use chc_ast::{NodeId, Span};
use chc_smt::CheckResult;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Internal inconsistency of the encoder; aborts the current source unit.
#[derive(Debug, Error, Diagnostic)]
#[error("CHC encoding error: {message}")]
#[diagnostic(code(chc::encode))]
#[allow(unused_assignments)]
pub struct EncodeError {
    pub message: String,
    #[label]
    pub span: SourceSpan,
}

impl EncodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: Span::default().into(),
        }
    }

    pub fn at(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span: span.into(),
        }
    }
}

pub const CONFLICTING_MESSAGE: &str =
    "At least two SMT solvers provided conflicting answers. Results might not be sound.";
pub const SOLVER_ERROR_MESSAGE: &str = "Error trying to invoke SMT solver.";

/// Reduced trust in a query answer, reported at the queried assertion.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(chc::solver), severity(Warning))]
#[allow(unused_assignments)]
pub struct ChcWarning {
    pub message: String,
    #[label("assertion")]
    pub span: SourceSpan,
    pub assertion: NodeId,
}

impl ChcWarning {
    /// Warning for results that undermine confidence; `None` for the rest.
    pub fn for_result(result: CheckResult, assertion: NodeId, span: Span) -> Option<Self> {
        let message = match result {
            CheckResult::Conflicting => CONFLICTING_MESSAGE,
            CheckResult::Error => SOLVER_ERROR_MESSAGE,
            CheckResult::Satisfiable | CheckResult::Unsatisfiable | CheckResult::Unknown => return None,
        };
        Some(Self {
            message: message.to_string(),
            span: span.into(),
            assertion,
        })
    }
}
