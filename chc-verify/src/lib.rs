#![forbid(unsafe_code)]

//! Constrained Horn clause encoding of contract programs.
//!
//! [`ChcEncoder`] turns every contract of a [`chc_ast::SourceUnit`] into a
//! system of Horn rules over uninterpreted predicates (one per basic block,
//! function summary and contract interface) and asks a
//! [`chc_smt::ChcSolver`] whether the error predicate of each assertion is
//! reachable from the contract's initial states.

mod calls;
mod cfg;
mod context;
mod diagnostics;
mod encoder;
mod error;
mod expr;
mod registry;
mod report;
mod symbolic;
mod targets;

pub use diagnostics::DiagnosticSink;
pub use encoder::{ChcEncoder, HornRule};
pub use error::{CONFLICTING_MESSAGE, ChcWarning, EncodeError, SOLVER_ERROR_MESSAGE};
pub use report::{AssertionOutcome, ChcReport, ReportWarning};
pub use symbolic::{pow2_decimal, sort_of, type_constraints};
