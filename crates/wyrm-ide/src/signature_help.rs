//! Signature help: the innermost call around the cursor, with the active
//! parameter highlighted.

use wyrm_core::{LineCol, LineIndex, TextRange, TextSize};
use wyrm_syntax::ast::{Expr, ExprKind, Stmt};
use wyrm_syntax::parse_module;

use crate::builtins::{signatures, FunctionSig};
use crate::text::{byte_col, line_str};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHelp {
    pub label: String,
    pub documentation: String,
    pub parameters: Vec<String>,
    pub active_parameter: usize,
}

pub fn signature_help_for_position(code: &str, line: u32, character: u32) -> Option<SignatureHelp> {
    let module = parse_module(code).ok()?;
    let index = LineIndex::new(code);
    let line_text = line_str(code, line)?;
    let col = byte_col(line_text, character) as u32;
    let offset = index.offset(LineCol { line, col })?;

    let call = innermost_call(&module.body, offset)?;
    let ExprKind::Call {
        func,
        args,
        keywords,
    } = &call.kind
    else {
        return None;
    };
    let sig = func.as_name().and_then(|name| signatures().get(name))?;

    Some(SignatureHelp {
        label: sig.label(),
        documentation: sig.doc.to_string(),
        parameters: sig.params.iter().map(|p| p.to_string()).collect(),
        active_parameter: active_parameter(sig, args, keywords, offset),
    })
}

fn contains(range: TextRange, offset: TextSize) -> bool {
    range.start() <= offset && offset <= range.end()
}

/// The deepest call expression whose range covers `offset`.
fn innermost_call(stmts: &[Stmt], offset: TextSize) -> Option<&Expr> {
    let mut found: Option<&Expr> = None;
    crate::diagnostics::for_each_expr(stmts, &mut |expr| {
        if matches!(expr.kind, ExprKind::Call { .. }) && contains(expr.range, offset) {
            match found {
                // Expression visitation is parents-first, so a later hit is
                // always at least as deep.
                Some(current) if current.range.len() < expr.range.len() => {}
                _ => found = Some(expr),
            }
        }
    });
    found
}

/// Pick the active parameter: the positional slot under the cursor, a
/// keyword's declared parameter when the cursor sits in one, or the next
/// open slot, clamped to the last declared parameter.
fn active_parameter(
    sig: &FunctionSig,
    args: &[Expr],
    keywords: &[wyrm_syntax::ast::Keyword],
    offset: TextSize,
) -> usize {
    let last = sig.params.len().saturating_sub(1);
    let clamp = |index: usize| index.min(last);

    for (index, arg) in args.iter().enumerate() {
        if contains(arg.range, offset) {
            return clamp(index);
        }
    }
    for (position, keyword) in keywords.iter().enumerate() {
        if !contains(keyword.range, offset) {
            continue;
        }
        if let Some(name) = &keyword.arg {
            let declared = sig
                .params
                .iter()
                .position(|p| p.trim_start_matches('*').split('=').next() == Some(name.as_str()));
            if let Some(index) = declared {
                return clamp(index);
            }
        }
        return clamp(args.len() + position);
    }
    clamp(args.len() + keywords.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn help_at(code: &str, needle: &str) -> SignatureHelp {
        let character = code.find(needle).unwrap() as u32;
        signature_help_for_position(code, 0, character).unwrap()
    }

    #[test]
    fn prefers_the_innermost_call() {
        let code = "sum(vroll('1d20', 2), 3)";
        let help = help_at(code, "'1d20'");
        assert!(help.label.starts_with("vroll("));
        assert_eq!(help.active_parameter, 0);
    }

    #[test]
    fn tracks_position_after_a_comma() {
        let code = "argparse(vroll('1d4'), None)";
        let help = help_at(code, "None");
        assert!(help.label.starts_with("argparse("));
        assert_eq!(help.active_parameter, 1);
    }

    #[test]
    fn keyword_arguments_map_to_their_declared_slot() {
        let code = "vroll('1d4', add=3)";
        let help = help_at(code, "3)");
        assert_eq!(help.active_parameter, 2);
    }

    #[test]
    fn unknown_keywords_fall_back_to_position_order() {
        let code = "get_cvar(misc=1, other=2)";
        let help = help_at(code, "2)");
        assert_eq!(help.active_parameter, 1);
    }

    #[test]
    fn open_slot_after_trailing_comma_is_next_parameter() {
        let code = "get_cvar('hp', )";
        let character = code.find(')').unwrap() as u32;
        let help = signature_help_for_position(code, 0, character).unwrap();
        assert_eq!(help.active_parameter, 1);
    }

    #[test]
    fn extra_arguments_clamp_to_the_last_parameter() {
        let code = "randint(1, 2, 3, 4)";
        let help = help_at(code, "4");
        assert_eq!(help.active_parameter, 2);
    }

    #[test]
    fn zero_parameter_callables_stay_at_slot_zero() {
        let code = "time()";
        let character = code.find(')').unwrap() as u32;
        let help = signature_help_for_position(code, 0, character).unwrap();
        assert_eq!(help.active_parameter, 0);
    }

    #[test]
    fn unknown_callees_have_no_signature_help() {
        assert_eq!(signature_help_for_position("mystery(1)", 0, 8), None);
    }
}
