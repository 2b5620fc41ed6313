#![forbid(unsafe_code)]

use crate::ChcWarning;

/// Receiver of non-fatal findings.
pub trait DiagnosticSink {
    fn warning(&mut self, warning: ChcWarning);
}

impl DiagnosticSink for Vec<ChcWarning> {
    fn warning(&mut self, warning: ChcWarning) {
        self.push(warning);
    }
}
