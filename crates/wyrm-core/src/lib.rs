//! Core shared types for Wyrm.
//!
//! This crate is intentionally small: the text model (positions, ranges,
//! line indexing) and the plain-data shapes the protocol layer consumes
//! (findings, completion items, hover contents).

mod finding;
mod text;

pub use finding::{Finding, Severity};
pub use text::{LineCol, LineIndex, Position, Range};
pub use text_size::{TextRange, TextSize};

/// A completion suggestion produced by the analysis layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    pub detail: Option<String>,
    pub documentation: Option<String>,
}

impl CompletionItem {
    pub fn new(label: impl Into<String>, kind: CompletionKind) -> Self {
        Self {
            label: label.into(),
            kind,
            detail: None,
            documentation: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        let doc = documentation.into();
        if !doc.is_empty() {
            self.documentation = Some(doc);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionKind {
    Field,
    Method,
    Function,
    Variable,
}

/// Hover contents, rendered as markdown by the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hover {
    pub markdown: String,
}

impl Hover {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
        }
    }
}
