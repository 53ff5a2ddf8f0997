//! Lexer, parser, and typed syntax tree for the alias scripting DSL.
//!
//! The language is a small Python-like scripting dialect: indentation-based
//! blocks, dynamic typing, literals, comprehensions, and function
//! definitions, with no imports and no exception handling.

pub mod ast;
mod lexer;
mod parser;
pub mod token;

use thiserror::Error;
use wyrm_core::TextRange;

pub use parser::parse_module;

/// A lex or parse failure, anchored to the offending byte range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub range: TextRange,
}

/// Number of lines the [`wrap_in_function`] preamble adds before the
/// original snippet.
pub const WRAP_LINE_OVERHEAD: u32 = 1;

/// Wrap a snippet in a synthetic function body.
///
/// Snippets may use `return` at the top level; the parser (like the runtime)
/// only accepts `return` inside a function, so failed parses are retried in
/// this wrapped form. Line numbers in the wrapped text are off by
/// [`WRAP_LINE_OVERHEAD`]; callers shift their findings back.
pub fn wrap_in_function(code: &str) -> String {
    let mut wrapped = String::with_capacity(code.len() + 64);
    wrapped.push_str("def __alias_main__():\n");
    for line in code.split('\n') {
        wrapped.push_str("    ");
        wrapped.push_str(line);
        wrapped.push('\n');
    }
    wrapped.push_str("__alias_main__()\n");
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, StmtKind};

    #[test]
    fn parses_simple_assignment() {
        let module = parse_module("x = character()\n").unwrap();
        assert_eq!(module.body.len(), 1);
        let StmtKind::Assign { targets, value } = &module.body[0].kind else {
            panic!("expected assignment");
        };
        assert_eq!(targets[0].as_name(), Some("x"));
        assert!(matches!(value.kind, ExprKind::Call { .. }));
    }

    #[test]
    fn top_level_return_requires_wrapping() {
        let err = parse_module("return 3\n").unwrap_err();
        assert!(err.message.contains("outside function"));

        let wrapped = wrap_in_function("return 3");
        parse_module(&wrapped).unwrap();
    }

    #[test]
    fn wrap_overhead_is_one_line() {
        let wrapped = wrap_in_function("a = 1\nreturn a");
        let body_line = wrapped
            .lines()
            .position(|line| line.trim_start().starts_with("a = 1"))
            .unwrap();
        assert_eq!(body_line as u32, WRAP_LINE_OVERHEAD);
    }
}
