//! Completion suggestions: attribute completions from the registry, and
//! top-level name suggestions from the signature table and session state.

use once_cell::sync::Lazy;
use regex::Regex;
use wyrm_core::{CompletionItem, CompletionKind};
use wyrm_gvar::GvarStore;
use wyrm_types::TypeRegistry;

use crate::builtins::FunctionSig;
use crate::context::ContextData;
use crate::infer::{infer_types, TypeEnv};
use crate::parse_lenient;
use crate::resolve::{resolve_receiver, resolves_to_known_type};
use crate::text::{byte_col, line_str};

static PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_]\w*$").expect("prefix regex"));
static TAIL_IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z_]\w*)?").expect("tail identifier regex"));
static IDENT_AFTER_DOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[A-Za-z_]").expect("dot tail regex"));

/// A top-level completion candidate gathered once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub name: String,
    pub kind: CompletionKind,
    pub detail: String,
    pub documentation: String,
}

/// Gather the session-wide completion candidates: callable signatures,
/// seeded variables, known gvars, and the context object.
pub fn gather_suggestions(
    ctx_data: &ContextData,
    store: &GvarStore,
    sigs: &std::collections::BTreeMap<&'static str, FunctionSig>,
) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    for sig in sigs.values() {
        suggestions.push(Suggestion {
            name: sig.name.to_string(),
            kind: CompletionKind::Function,
            detail: sig.label(),
            documentation: sig.doc.to_string(),
        });
    }

    for name in ctx_data.vars.initial_names().keys() {
        suggestions.push(Suggestion {
            name: name.clone(),
            kind: CompletionKind::Variable,
            detail: "var".to_string(),
            documentation: String::new(),
        });
    }

    for name in store.snapshot().keys() {
        suggestions.push(Suggestion {
            name: name.clone(),
            kind: CompletionKind::Variable,
            detail: "gvar".to_string(),
            documentation: String::new(),
        });
    }

    suggestions.push(Suggestion {
        name: "ctx".to_string(),
        kind: CompletionKind::Variable,
        detail: "Alias context".to_string(),
        documentation: String::new(),
    });

    suggestions
}

/// Completion items for a cursor position inside one snippet.
pub fn completion_items_for_position(
    code: &str,
    line: u32,
    character: u32,
    suggestions: &[Suggestion],
    registry: &TypeRegistry,
) -> Vec<CompletionItem> {
    if let Some((receiver, prefix)) = attribute_receiver_and_prefix(code, line, character, false) {
        let sanitized = sanitize_incomplete_line(code, line, character);
        let env = parse_lenient(&sanitized)
            .map(|module| infer_types(&module, registry))
            .unwrap_or_default();
        return attribute_completions(&receiver, &prefix, &env, registry);
    }

    let line_text = line_str(code, line).unwrap_or("");
    let prefix = current_prefix(&line_text[..byte_col(line_text, character)]);
    suggestions
        .iter()
        .filter(|s| prefix.is_empty() || s.name.starts_with(&prefix))
        .map(|s| {
            CompletionItem::new(s.name.clone(), s.kind)
                .with_detail(s.detail.clone())
                .with_documentation(s.documentation.clone())
        })
        .collect()
}

/// Field and method completions for a resolved receiver type.
pub fn attribute_completions(
    receiver: &str,
    prefix: &str,
    env: &TypeEnv,
    registry: &TypeRegistry,
) -> Vec<CompletionItem> {
    let resolved = resolve_receiver(receiver, env, registry);
    if !resolves_to_known_type(receiver, &resolved, env, registry) {
        return Vec::new();
    }
    let Some(spec) = registry.lookup(resolved.as_str()) else {
        return Vec::new();
    };
    let detail = format!("{resolved}()");

    let mut items = Vec::new();
    for (name, field) in &spec.fields {
        if !prefix.is_empty() && !name.starts_with(prefix) {
            continue;
        }
        items.push(
            CompletionItem::new(name.to_string(), CompletionKind::Field)
                .with_detail(detail.clone())
                .with_documentation(field.doc),
        );
    }
    for (name, method) in &spec.methods {
        if !prefix.is_empty() && !name.starts_with(prefix) {
            continue;
        }
        let method_detail = if method.signature.is_empty() {
            format!("{name}()")
        } else {
            method.signature.to_string()
        };
        items.push(
            CompletionItem::new(name.to_string(), CompletionKind::Method)
                .with_detail(method_detail)
                .with_documentation(method.doc),
        );
    }
    items
}

fn current_prefix(line_text: &str) -> String {
    PREFIX_RE
        .find(line_text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Find the receiver expression and typed-so-far attribute prefix for a
/// cursor sitting after a `.`. Scans backwards over balanced brackets so
/// chained receivers like `combat().combatants[0]` survive intact.
pub(crate) fn attribute_receiver_and_prefix(
    code: &str,
    line: u32,
    character: u32,
    capture_full_token: bool,
) -> Option<(String, String)> {
    let line_text = line_str(code, line)?;
    let mut end = byte_col(line_text, character);
    if capture_full_token {
        end += line_text[end..]
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(line_text.len() - end);
    }
    let line_text = &line_text[..end];

    let dot = line_text.rfind('.')?;
    let tail = &line_text[dot + 1..];
    let prefix = TAIL_IDENT_RE
        .captures(tail)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let receiver_fragment = line_text[..dot].trim_end();
    let mut start = receiver_fragment.len();
    let (mut paren, mut bracket, mut brace) = (0u32, 0u32, 0u32);

    for (idx, ch) in receiver_fragment.char_indices().rev() {
        match ch {
            ')' => {
                paren += 1;
                start = idx;
            }
            ']' => {
                bracket += 1;
                start = idx;
            }
            '}' => {
                brace += 1;
                start = idx;
            }
            '(' | '[' | '{' => {
                let depth = match ch {
                    '(' => &mut paren,
                    '[' => &mut bracket,
                    _ => &mut brace,
                };
                if *depth > 0 {
                    *depth -= 1;
                    start = idx;
                } else {
                    break;
                }
            }
            _ => {
                if paren + bracket + brace > 0 {
                    start = idx;
                    continue;
                }
                if ch.is_whitespace() {
                    break;
                }
                if !(ch.is_alphanumeric() || matches!(ch, '_' | '.' | '\'' | '"')) {
                    break;
                }
                start = idx;
            }
        }
    }

    let receiver = receiver_fragment[start..].trim();
    if receiver.is_empty() {
        return None;
    }
    Some((receiver.to_string(), prefix))
}

/// Rewrite an in-progress line so the snippet parses: drop the trailing
/// dot (or dangling attribute fragment), and if the line still will not
/// parse, replace it with `pass` at the same indentation.
pub(crate) fn sanitize_incomplete_line(code: &str, line: u32, character: u32) -> String {
    let mut lines: Vec<String> = code.split('\n').map(str::to_string).collect();
    let idx = line as usize;
    if idx < lines.len() {
        let cursor = byte_col(&lines[idx], character);
        let prefix = &lines[idx][..cursor];
        let trimmed = prefix.trim_end();
        let new_line = if let Some(stripped) = trimmed.strip_suffix('.') {
            stripped.to_string()
        } else if let Some(dot) = prefix.rfind('.') {
            let after = &prefix[dot + 1..];
            if IDENT_AFTER_DOT_RE.is_match(after) {
                prefix.to_string()
            } else {
                format!("{}{}", &prefix[..dot], after)
            }
        } else {
            prefix.to_string()
        };
        lines[idx] = new_line;

        let candidate = lines.join("\n");
        if parse_lenient(&candidate).is_none() {
            let indent: String = lines[idx]
                .chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect();
            lines[idx] = format!("{indent}pass");
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receiver_scan_handles_chained_calls_and_subscripts() {
        let code = "x = combat().combatants[0].";
        let (receiver, prefix) =
            attribute_receiver_and_prefix(code, 0, code.len() as u32, false).unwrap();
        assert_eq!(receiver, "combat().combatants[0]");
        assert_eq!(prefix, "");
    }

    #[test]
    fn receiver_scan_splits_off_typed_prefix() {
        let code = "y = character().na";
        let (receiver, prefix) =
            attribute_receiver_and_prefix(code, 0, code.len() as u32, false).unwrap();
        assert_eq!(receiver, "character()");
        assert_eq!(prefix, "na");
    }

    #[test]
    fn receiver_scan_stops_at_operators() {
        let code = "z = 1 + foo.";
        let (receiver, _) =
            attribute_receiver_and_prefix(code, 0, code.len() as u32, false).unwrap();
        assert_eq!(receiver, "foo");
    }

    #[test]
    fn sanitize_strips_trailing_dot() {
        let sanitized = sanitize_incomplete_line("x = character()\ny = x.", 1, 7);
        assert_eq!(sanitized, "x = character()\ny = x");
    }

    #[test]
    fn sanitize_falls_back_to_pass() {
        let sanitized = sanitize_incomplete_line("if x:\n    y = (", 1, 11);
        assert_eq!(sanitized, "if x:\n    pass");
    }
}
