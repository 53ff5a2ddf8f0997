//! Hover contents for a cursor position inside one snippet.
//!
//! Attribute positions resolve the receiver and show the field doc or
//! method signature; bare words fall back, in order, to an evaluated local
//! binding, an inferred type, a callable signature, a seeded variable, and
//! a cached gvar.

use serde_json::Value;
use wyrm_core::Hover;
use wyrm_gvar::GvarStore;
use wyrm_syntax::{parse_module, wrap_in_function, WRAP_LINE_OVERHEAD};
use wyrm_types::{TypeKey, TypeRegistry};

use crate::builtins::signatures;
use crate::completions::attribute_receiver_and_prefix;
use crate::context::ContextData;
use crate::eval::{constant_bindings, describe_type, preview_value};
use crate::infer::infer_types;
use crate::resolve::{resolve_receiver, resolves_to_known_type};
use crate::text::{line_str, word_at};

pub fn hover_for_position(
    code: &str,
    line: u32,
    character: u32,
    ctx_data: &ContextData,
    store: &GvarStore,
    registry: &TypeRegistry,
) -> Option<Hover> {
    // Snippets may use `return` at the top level; hover carries no ranges,
    // so the wrapped retry only has to translate the cursor into the
    // wrapped text (one preamble line, four columns of indentation).
    if parse_module(code).is_err() {
        let wrapped = wrap_in_function(code);
        if parse_module(&wrapped).is_ok() {
            return hover_impl(
                &wrapped,
                line + WRAP_LINE_OVERHEAD,
                character + 4,
                ctx_data,
                store,
                registry,
            );
        }
    }
    hover_impl(code, line, character, ctx_data, store, registry)
}

fn hover_impl(
    code: &str,
    line: u32,
    character: u32,
    ctx_data: &ContextData,
    store: &GvarStore,
    registry: &TypeRegistry,
) -> Option<Hover> {
    let line_text = line_str(code, line)?;
    let env = parse_module(code)
        .map(|module| infer_types(&module, registry))
        .unwrap_or_default();

    if let Some((receiver, attr)) = attribute_receiver_and_prefix(code, line, character, true) {
        if !attr.is_empty() {
            let resolved = resolve_receiver(&receiver, &env, registry);
            if resolves_to_known_type(&receiver, &resolved, &env, registry) {
                if let Some(hover) = attribute_hover(&resolved, &attr, registry) {
                    return Some(hover);
                }
            }
        }
    }

    let (word, _, _) = word_at(line_text, character);
    if word.is_empty() {
        return None;
    }

    let bindings = constant_bindings(code, Some(line), ctx_data, registry);
    if let Some(value) = bindings.get(&word) {
        return Some(binding_hover(&word, value, "local"));
    }
    if let Some(key) = env.get(&word) {
        let label = display_label(key, env.element_of(&word));
        return Some(Hover::new(format!("`{word}` type: `{label}`")));
    }
    if let Some(sig) = signatures().get(word.as_str()) {
        let mut markdown = format!("```alias\n{}\n```", sig.label());
        if !sig.doc.is_empty() {
            markdown.push_str("\n\n");
            markdown.push_str(sig.doc);
        }
        return Some(Hover::new(markdown));
    }
    let vars = ctx_data.vars.initial_names();
    if let Some(value) = vars.get(&word) {
        return Some(binding_hover(&word, value, "var"));
    }
    if let Some(value) = store.get_local(&word) {
        return Some(binding_hover(&word, &value, "gvar"));
    }
    None
}

fn attribute_hover(resolved: &TypeKey, attr: &str, registry: &TypeRegistry) -> Option<Hover> {
    let spec = registry.lookup(resolved.as_str())?;
    if let Some(field) = spec.field(attr) {
        let mut markdown = format!("```alias\n{resolved}().{attr}\n```");
        if !field.doc.is_empty() {
            markdown.push_str("\n\n");
            markdown.push_str(field.doc);
        }
        return Some(Hover::new(markdown));
    }
    if let Some(method) = spec.method(attr) {
        let signature = if method.signature.is_empty() {
            format!("{attr}()")
        } else {
            method.signature.to_string()
        };
        let mut markdown = format!("```alias\n{signature}\n```");
        if !method.doc.is_empty() {
            markdown.push_str("\n\n");
            markdown.push_str(method.doc);
        }
        return Some(Hover::new(markdown));
    }
    None
}

fn binding_hover(name: &str, value: &Value, label: &str) -> Hover {
    Hover::new(format!(
        "**{label}** `{name}`\n\nType: `{}`\nValue: `{}`",
        describe_type(value),
        preview_value(value)
    ))
}

fn display_label(key: &TypeKey, element: Option<&TypeKey>) -> String {
    match element {
        Some(element) => format!("{key}[{element}]"),
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wyrm_gvar::{GvarStore, ServiceConfig};

    fn store() -> GvarStore {
        GvarStore::new(ServiceConfig::default()).unwrap()
    }

    fn hover(code: &str, line: u32, character: u32, ctx_data: &ContextData) -> Option<String> {
        let registry = TypeRegistry::builtin();
        hover_for_position(code, line, character, ctx_data, &store(), &registry)
            .map(|hover| hover.markdown)
    }

    fn ctx_with_character() -> ContextData {
        let character = json!({ "name": "Aelar" });
        ContextData {
            character: character.as_object().unwrap().clone(),
            ..ContextData::default()
        }
    }

    #[test]
    fn shows_local_constant_value_and_type() {
        let text = hover("x = 3\n", 0, 0, &ContextData::default()).unwrap();
        assert!(text.contains("`x`"));
        assert!(text.contains("int"));
        assert!(text.contains('3'));
    }

    #[test]
    fn shows_attribute_doc_inside_call_chain() {
        let code = "res = character().attacks\n";
        let text = hover(code, 0, code.find("attacks").unwrap() as u32 + 2, &ctx_with_character())
            .unwrap();
        assert!(text.contains("character().attacks"));
    }

    #[test]
    fn shows_field_doc_for_nested_receivers() {
        let code = "character().coinpurse.pp";
        let text = hover(code, 0, code.find("pp").unwrap() as u32 + 1, &ctx_with_character())
            .unwrap();
        assert!(text.contains("Platinum"));
    }

    #[test]
    fn binding_value_resolves_through_mock_context() {
        let code = "x = character()\ny = x.name\n";
        let text = hover(code, 1, 0, &ctx_with_character()).unwrap();
        assert!(text.contains("`y`"));
        assert!(text.contains("str"));
        assert!(text.contains("Aelar"));
    }

    #[test]
    fn inferred_bindings_show_element_typed_labels() {
        let code = "x = character().actions\n";
        let text = hover(code, 0, 0, &ctx_with_character()).unwrap();
        assert!(text.contains("list[action]"));
    }

    #[test]
    fn shows_function_signature_and_doc() {
        let code = "get('foo')\n";
        let text = hover(code, 0, 1, &ContextData::default()).unwrap();
        assert!(text.contains("get(name, default=None)"));
        assert!(text.contains("Resolves locals"));
    }

    #[test]
    fn shows_var_and_gvar_values() {
        let mut ctx_data = ContextData::default();
        ctx_data
            .vars
            .cvars
            .insert("foo".to_string(), json!(123));
        let text = hover("foo\n", 0, 1, &ctx_data).unwrap();
        assert!(text.contains("var"));
        assert!(text.contains("123"));

        let registry = TypeRegistry::builtin();
        let gvar_store = store();
        gvar_store.seed([("g1".to_string(), json!("hello"))]);
        let text = hover_for_position("g1\n", 0, 1, &ContextData::default(), &gvar_store, &registry)
            .unwrap()
            .markdown;
        assert!(text.contains("gvar"));
        assert!(text.contains("hello"));
    }

    #[test]
    fn loop_targets_hover_with_their_first_value() {
        let code = "for i in range(3):\n    return i\n";
        let text = hover(code, 1, 11, &ContextData::default()).unwrap();
        assert!(text.contains("`i`"));
        assert!(text.contains("int"));
    }

    #[test]
    fn unknown_words_have_no_hover() {
        assert_eq!(hover("mystery\n", 0, 2, &ContextData::default()), None);
    }
}
