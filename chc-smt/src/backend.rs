#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ChcSolver, PortfolioChc, SmtLib2Chc, SolverError, SolverProcess};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Smtlib2,
    Z3,
    /// Every solver of [`BackendConfig::portfolio`] answers each query.
    Portfolio,
}

#[derive(Clone, Debug, Default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// External solver for the textual backend.
    pub command: Option<PathBuf>,
    pub args: Vec<String>,
    /// External solvers combined by the portfolio backend.
    pub portfolio: Vec<PathBuf>,
    pub timeout_ms: u64,
    /// Recorded answers keyed by query hash.
    pub responses: BTreeMap<String, String>,
}

pub fn create_backend(config: &BackendConfig) -> Result<Box<dyn ChcSolver>, SolverError> {
    match config.kind {
        BackendKind::Smtlib2 => {
            let mut backend = SmtLib2Chc::new().with_responses(config.responses.clone());
            if let Some(command) = &config.command {
                let process = SolverProcess::new(command, config.args.clone()).with_timeout(config.timeout_ms);
                info!(program = %process.program().display(), "forwarding queries to external solver");
                backend = backend.with_process(process);
            }
            Ok(Box::new(backend))
        }
        BackendKind::Z3 => z3_backend(config),
        BackendKind::Portfolio => {
            if config.portfolio.is_empty() {
                return Err(SolverError::EmptyPortfolio);
            }
            let backends = config
                .portfolio
                .iter()
                .map(|command| {
                    let process = SolverProcess::new(command, Vec::new()).with_timeout(config.timeout_ms);
                    info!(program = %process.program().display(), "portfolio member");
                    Box::new(
                        SmtLib2Chc::new()
                            .with_responses(config.responses.clone())
                            .with_process(process),
                    ) as Box<dyn ChcSolver>
                })
                .collect();
            let portfolio = PortfolioChc::new(backends);
            info!(members = portfolio.len(), "querying a solver portfolio");
            Ok(Box::new(portfolio))
        }
    }
}

#[cfg(feature = "z3")]
fn z3_backend(config: &BackendConfig) -> Result<Box<dyn ChcSolver>, SolverError> {
    let timeout = u32::try_from(config.timeout_ms).unwrap_or(u32::MAX);
    Ok(Box::new(crate::Z3Chc::new(timeout)))
}

#[cfg(not(feature = "z3"))]
fn z3_backend(_config: &BackendConfig) -> Result<Box<dyn ChcSolver>, SolverError> {
    Err(SolverError::Unavailable("z3".to_string()))
}
