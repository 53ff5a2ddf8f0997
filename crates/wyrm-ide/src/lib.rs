//! Editor analysis over alias snippets.
//!
//! Everything here consumes a parsed snippet and the immutable host-object
//! registry: type inference, receiver resolution, completions, hover,
//! diagnostics, signature help, and document symbols. No state is shared
//! between analyses; each call builds its own environment and findings.

pub mod builtins;
pub mod completions;
pub mod context;
pub mod diagnostics;
mod eval;
pub mod hover;
mod infer;
mod resolve;
pub mod signature_help;
pub mod symbols;
mod text;

use wyrm_syntax::ast::Module;
use wyrm_syntax::{parse_module, wrap_in_function};

pub use infer::{expr_type, infer_types, TypeEnv};
pub use resolve::{resolve_receiver, resolves_to_known_type};

/// One DSL code span extracted from surrounding free text.
///
/// Snippet extraction itself is a collaborator's job; analysis receives the
/// code plus the span's position inside the host document, and shifts its
/// findings by that offset. A document with no embedded spans is analyzed
/// as a single snippet at offset `(0, 0)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub code: String,
    pub line_offset: u32,
    pub char_offset: u32,
}

impl Snippet {
    pub fn new(code: impl Into<String>, line_offset: u32, char_offset: u32) -> Self {
        Self {
            code: code.into(),
            line_offset,
            char_offset,
        }
    }

    pub fn whole_document(text: impl Into<String>) -> Self {
        Self::new(text, 0, 0)
    }
}

/// Parse a snippet, tolerating top-level control-flow returns by retrying
/// inside a synthetic function body. Used by the features that only need
/// name-keyed results (inference, constant bindings) and can ignore the
/// wrap's line shift.
pub(crate) fn parse_lenient(code: &str) -> Option<Module> {
    parse_module(code)
        .ok()
        .or_else(|| parse_module(&wrap_in_function(code)).ok())
}
