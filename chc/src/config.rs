#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chc_smt::{BackendConfig, BackendKind};
use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "chc.toml";

#[derive(Debug, Error, Diagnostic)]
#[error("config error: {message}")]
#[diagnostic(code(chc::config))]
pub struct ConfigError {
    pub message: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedConfig {
    pub config_path: Option<PathBuf>,
    pub backend: BackendKind,
    pub command: Option<PathBuf>,
    pub args: Vec<String>,
    /// Solvers of the portfolio backend.
    pub portfolio: Vec<PathBuf>,
    pub timeout_ms: u64,
    /// JSON file mapping query hashes to recorded solver answers.
    pub responses: Option<PathBuf>,
    pub format: OutputFormat,
}

/// Command-line values that take precedence over the file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub backend: Option<BackendKind>,
    pub command: Option<PathBuf>,
    /// Replaces the file's portfolio when nonempty.
    pub portfolio: Vec<PathBuf>,
    pub responses: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub json: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    solver: SolverSection,

    #[serde(default)]
    output: OutputSection,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct SolverSection {
    #[serde(default)]
    backend: Option<BackendKind>,

    #[serde(default)]
    command: Option<String>,

    #[serde(default)]
    args: Vec<String>,

    #[serde(default)]
    portfolio: Vec<String>,

    #[serde(default)]
    timeout_ms: Option<u64>,

    #[serde(default)]
    responses: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct OutputSection {
    #[serde(default)]
    format: Option<OutputFormat>,
}

impl ResolvedConfig {
    pub fn apply(&mut self, o: &Overrides) {
        if let Some(b) = o.backend {
            self.backend = b;
        }
        if let Some(c) = &o.command {
            self.command = Some(c.clone());
        }
        if !o.portfolio.is_empty() {
            self.portfolio = o.portfolio.clone();
        }
        if let Some(r) = &o.responses {
            self.responses = Some(r.clone());
        }
        if let Some(t) = o.timeout_ms {
            self.timeout_ms = t;
        }
        if o.json {
            self.format = OutputFormat::Json;
        }
    }

    pub fn backend_config(&self, responses: BTreeMap<String, String>) -> BackendConfig {
        BackendConfig {
            kind: self.backend,
            command: self.command.clone(),
            args: self.args.clone(),
            portfolio: self.portfolio.clone(),
            timeout_ms: self.timeout_ms,
            responses,
        }
    }
}

/// `chc.toml` next to the input, then in the working directory.
pub fn find_config(input: &Path) -> Option<PathBuf> {
    let input_dir = input.parent().filter(|p| !p.as_os_str().is_empty());
    let candidates = input_dir
        .map(|d| d.join(CONFIG_FILE))
        .into_iter()
        .chain(std::env::current_dir().ok().map(|d| d.join(CONFIG_FILE)));
    candidates.into_iter().find(|c| c.is_file())
}

pub fn load_config(input: &Path, explicit: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match find_config(input) {
            Some(p) => p,
            None => return Ok(ResolvedConfig::default()),
        },
    };

    let raw = fs::read_to_string(&path).map_err(|e| ConfigError {
        message: format!("failed to read {}: {e}", path.display()),
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    let mut out = parse_config(&raw, &base).map_err(|e| ConfigError {
        message: format!("failed to parse {}: {}", path.display(), e.message),
    })?;
    out.config_path = Some(path);
    Ok(out)
}

/// Parse file contents; relative paths are taken relative to `base`.
pub fn parse_config(raw: &str, base: &Path) -> Result<ResolvedConfig, ConfigError> {
    let parsed: ConfigFile = toml::from_str(raw).map_err(|e| ConfigError { message: e.to_string() })?;
    let solver = parsed.solver;
    Ok(ResolvedConfig {
        config_path: None,
        backend: solver.backend.unwrap_or_default(),
        command: solver.command.map(|c| solver_path(base, &c)),
        args: solver.args,
        portfolio: solver.portfolio.iter().map(|c| solver_path(base, c)).collect(),
        timeout_ms: solver.timeout_ms.unwrap_or(0),
        responses: solver.responses.map(|r| resolve_path(base, &r)),
        format: parsed.output.format.unwrap_or_default(),
    })
}

/// Recorded solver answers keyed by query hash.
pub fn load_responses(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|e| ConfigError {
        message: format!("failed to read responses {}: {e}", path.display()),
    })?;
    serde_json::from_str(&raw).map_err(|e| ConfigError {
        message: format!("failed to parse responses {}: {e}", path.display()),
    })
}

/// Bare program names are looked up on PATH by the process layer.
fn solver_path(base: &Path, c: &str) -> PathBuf {
    if c.contains('/') || c.contains('\\') {
        resolve_path(base, c)
    } else {
        PathBuf::from(c)
    }
}

fn resolve_path(base: &Path, p: &str) -> PathBuf {
    let pb = PathBuf::from(p);
    if pb.is_absolute() { pb } else { base.join(pb) }
}
