#![forbid(unsafe_code)]

use std::fmt::Write as _;
use std::path::Path;

use chc_smt::query_hash;
use chc_verify::ChcReport;
use miette::IntoDiagnostic;
use serde::Serialize;

pub const SCHEMA: &str = "chc.verify.v1";

#[derive(Debug, Clone, Serialize)]
pub struct VerifyOutput<'a> {
    pub schema: &'static str,
    pub input: String,
    pub ok: bool,
    pub report: &'a ChcReport,
    /// Hashes of the unhandled queries, for filling in a responses file.
    pub unhandled_hashes: Vec<String>,
}

impl<'a> VerifyOutput<'a> {
    pub fn new(input: &Path, report: &'a ChcReport) -> Self {
        Self {
            schema: SCHEMA,
            input: input.display().to_string(),
            ok: report.assertions.iter().all(|a| a.proven),
            report,
            unhandled_hashes: report.unhandled_queries.iter().map(|q| query_hash(q)).collect(),
        }
    }

    pub fn to_json(&self) -> miette::Result<String> {
        serde_json::to_string_pretty(self).into_diagnostic()
    }
}

pub fn render_human(input: &Path, report: &ChcReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", input.display());
    for a in &report.assertions {
        let scope = if a.function.is_empty() {
            format!("{}.constructor", a.contract)
        } else {
            format!("{}.{}", a.contract, a.function)
        };
        if a.proven {
            let _ = writeln!(out, "  proven    assertion {} in {scope} (code {})", a.assertion, a.error_code);
        } else {
            let results = if a.results.is_empty() {
                "not queried".to_string()
            } else {
                a.results.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(", ")
            };
            let _ = writeln!(
                out,
                "  unproven  assertion {} in {scope} (code {}): {results}",
                a.assertion, a.error_code
            );
        }
    }
    let _ = writeln!(
        out,
        "{} of {} assertions proven, {} queries",
        report.proven(),
        report.assertions.len(),
        report.queries
    );
    if !report.unhandled_queries.is_empty() {
        let _ = writeln!(
            out,
            "{} queries had no answer; record them in a responses file:",
            report.unhandled_queries.len()
        );
        for q in &report.unhandled_queries {
            let _ = writeln!(out, "  {}", query_hash(q));
        }
    }
    out
}
