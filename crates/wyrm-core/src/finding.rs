//! Analysis findings: pure data consumed by the protocol layer.

use serde::Serialize;

use crate::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// One diagnostic finding. Findings never carry error objects; a failed
/// analysis pass produces no findings rather than an error value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub message: String,
    pub range: Range,
    pub severity: Severity,
    pub source: &'static str,
}

impl Finding {
    pub const SOURCE: &'static str = "wyrm";

    pub fn new(message: impl Into<String>, range: Range, severity: Severity) -> Self {
        Self {
            message: message.into(),
            range,
            severity,
            source: Self::SOURCE,
        }
    }

    pub fn error(message: impl Into<String>, range: Range) -> Self {
        Self::new(message, range, Severity::Error)
    }

    pub fn warning(message: impl Into<String>, range: Range) -> Self {
        Self::new(message, range, Severity::Warning)
    }

    /// Re-anchor this finding from snippet-relative to document coordinates.
    pub fn shifted(mut self, line_offset: i32, char_offset: u32) -> Self {
        self.range = self.range.shifted(line_offset, char_offset);
        self
    }
}
