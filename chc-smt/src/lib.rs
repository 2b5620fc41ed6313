#![forbid(unsafe_code)]

//! Solver-facing layer of the CHC encoder: sorts, terms, SMT-LIB2 text, and
//! the backends that answer Horn reachability queries.

mod backend;
mod chc;
mod error;
pub mod format;
mod portfolio;
mod process;
mod smtlib2;
mod sort;
mod term;

#[cfg(feature = "z3")]
mod z3_backend;

pub use backend::{BackendConfig, BackendKind, create_backend};
pub use chc::{ChcSolver, CheckResult, QueryOutcome};
pub use error::SolverError;
pub use portfolio::{PortfolioChc, merge};
pub use process::{SolverProcess, find_executable};
pub use smtlib2::{HornScript, SmtLib2Chc, parse_answer, query_hash};
pub use sort::{Relation, Sort};
pub use term::Term;

#[cfg(feature = "z3")]
pub use z3_backend::Z3Chc;
