#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{Diagnostic, IntoDiagnostic};
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use chc_ast::SourceUnit;
use chc_smt::{BackendKind, SmtLib2Chc, create_backend};
use chc_verify::{ChcEncoder, ChcWarning};

mod config;
mod report;

use config::{OutputFormat, Overrides};

#[derive(Parser, Debug)]
#[command(name = "chc", version, about = "Horn-clause safety checker for contract programs")]
struct Cli {
    /// Configuration file. Defaults to `chc.toml` next to the input, then in the working directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum BackendArg {
    /// SMT-LIB2 scripts, answered by replay or an external solver
    Smtlib2,
    /// In-process Z3 (needs the `z3` feature)
    Z3,
    /// Several external solvers; decisive answers win, disagreement is reported
    Portfolio,
}

impl From<BackendArg> for BackendKind {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Smtlib2 => BackendKind::Smtlib2,
            BackendArg::Z3 => BackendKind::Z3,
            BackendArg::Portfolio => BackendKind::Portfolio,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Encode a source unit and check every assertion
    Verify {
        /// Source unit as JSON
        path: PathBuf,

        #[arg(long, value_enum)]
        backend: Option<BackendArg>,

        /// External solver for the smtlib2 backend (e.g. `z3`)
        #[arg(long = "solver-cmd")]
        solver_cmd: Option<PathBuf>,

        /// Member of the portfolio backend; repeat for each solver
        #[arg(long = "portfolio", value_name = "CMD")]
        portfolio: Vec<PathBuf>,

        /// JSON map from query hash to recorded solver answer
        #[arg(long)]
        responses: Option<PathBuf>,

        #[arg(long = "timeout-ms")]
        timeout_ms: Option<u64>,

        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Write the Horn clauses of a source unit as an SMT-LIB2 script
    Emit {
        /// Source unit as JSON
        path: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Error, Diagnostic)]
#[error("invalid source unit {path}: {message}")]
#[diagnostic(code(chc::input), help("the input is the JSON form of a type-checked source unit"))]
struct InputError {
    path: String,
    message: String,
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Verify {
            path,
            backend,
            solver_cmd,
            portfolio,
            responses,
            timeout_ms,
            json,
        } => {
            let mut cfg = config::load_config(&path, cli.config.as_deref())?;
            if let Some(p) = &cfg.config_path {
                debug!(config = %p.display(), "loaded configuration");
            }
            cfg.apply(&Overrides {
                backend: backend.map(Into::into),
                command: solver_cmd,
                portfolio,
                responses,
                timeout_ms,
                json,
            });
            verify(&path, &cfg)
        }
        Cmd::Emit { path, output } => emit(&path, output.as_deref()),
    }
}

fn load_unit(path: &Path) -> miette::Result<SourceUnit> {
    let raw = fs::read_to_string(path).into_diagnostic()?;
    let mut unit: SourceUnit = serde_json::from_str(&raw).map_err(|e| InputError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    if unit.path.is_empty() {
        unit.path = path.display().to_string();
    }
    Ok(unit)
}

fn verify(path: &Path, cfg: &config::ResolvedConfig) -> miette::Result<()> {
    let unit = load_unit(path)?;
    let responses = match &cfg.responses {
        Some(p) => config::load_responses(p)?,
        None => BTreeMap::new(),
    };
    let backend = create_backend(&cfg.backend_config(responses))?;

    let mut encoder = ChcEncoder::new(backend);
    let mut warnings: Vec<ChcWarning> = Vec::new();
    let report = encoder.analyze(&unit, &mut warnings)?;
    info!(
        assertions = report.assertions.len(),
        proven = report.proven(),
        queries = report.queries,
        "analysis finished"
    );

    for w in warnings {
        eprintln!("{:?}", miette::Report::new(w));
    }
    match cfg.format {
        OutputFormat::Json => println!("{}", report::VerifyOutput::new(path, &report).to_json()?),
        OutputFormat::Human => print!("{}", report::render_human(path, &report)),
    }
    Ok(())
}

fn emit(path: &Path, output: Option<&Path>) -> miette::Result<()> {
    let unit = load_unit(path)?;
    let mut encoder = ChcEncoder::new(SmtLib2Chc::new());
    let report = encoder.encode(&unit)?;
    let script = encoder.solver().script().render();
    info!(
        rules = encoder.rules().len(),
        error_predicates = report.error_predicates.len(),
        "encoded"
    );
    match output {
        Some(out) => fs::write(out, script).into_diagnostic()?,
        None => print!("{script}"),
    }
    Ok(())
}
