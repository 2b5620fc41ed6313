#![forbid(unsafe_code)]

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SolverError {
    #[error("solver executable `{0}` not found")]
    #[diagnostic(
        code(chc::solver),
        help("install z3 and put it on PATH, or pass --solver-cmd")
    )]
    NotFound(String),

    #[error("failed to run solver `{program}`: {message}")]
    #[diagnostic(code(chc::solver))]
    Process { program: String, message: String },

    #[error("the portfolio backend needs at least one solver")]
    #[diagnostic(code(chc::solver), help("list solver executables under `[solver] portfolio`"))]
    EmptyPortfolio,

    #[error("backend `{0}` is not available in this build")]
    #[diagnostic(code(chc::solver), help("rebuild with `--features z3`"))]
    Unavailable(String),
}
