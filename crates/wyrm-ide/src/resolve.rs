//! Receiver resolution for completion and hover.
//!
//! Given the textual receiver of a `.` access (anything from `x` to
//! `combat().combatants[0]`), classify its type against an inference
//! environment. This never fails: an unknown receiver resolves to itself,
//! and callers treat an identity result on a bare identifier as "nothing
//! known" (see [`resolves_to_known_type`]).

use once_cell::sync::Lazy;
use regex::Regex;
use wyrm_types::{TypeKey, TypeRegistry};

use crate::infer::TypeEnv;

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_]\w*$").expect("identifier regex"));
static DICT_GET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^([A-Za-z_]\w*)\.get\(\s*(['"])(.+?)\2"#).expect("dict get regex")
});

/// Resolve a receiver expression's type classification.
pub fn resolve_receiver(receiver: &str, env: &TypeEnv, registry: &TypeRegistry) -> TypeKey {
    // `base.get("key")` resolves through the recorded literal-key binding.
    if let Some(caps) = DICT_GET_RE.captures(receiver) {
        let dict_key = format!("{}.{}", &caps[1], &caps[3]);
        if let Some(known) = env.get(&dict_key) {
            return known.clone();
        }
    }

    // Trailing subscript: prefer a recorded element hint for the base text,
    // else resolve the base and take its declared element type.
    if receiver.ends_with(']') {
        if let Some(bracket) = receiver.rfind('[') {
            let base_expr = &receiver[..bracket];
            if let Some(hint) = env.element_of(base_expr) {
                return hint.clone();
            }
            let base_type = resolve_receiver(base_expr, env, registry);
            if let Some(element) = registry.element_of(base_type.as_str()) {
                return element.clone();
            }
            return base_type;
        }
    }

    let receiver = receiver.trim_end_matches(['(', ')']);

    // Dotted access: resolve the left part and look the field up in its
    // spec, preferring an element hint over a plain result type.
    if let Some((base_expr, attr_name)) = receiver.rsplit_once('.') {
        let base_type = resolve_receiver(base_expr, env, registry);
        if !base_type.as_str().is_empty() {
            let attr_key = attr_name.split('[').next().unwrap_or(attr_name);
            if let Some(field) = registry
                .lookup(base_type.as_str())
                .and_then(|spec| spec.field(attr_key))
            {
                if let Some(element) = &field.element {
                    return element.clone();
                }
                if let Some(result) = &field.result {
                    return result.clone();
                }
            }
        }
    }

    if let Some(known) = env.get(receiver) {
        return known.clone();
    }
    if let Some(element) = env.element_of(receiver) {
        return element.clone();
    }
    if let Some(resolved) = registry.resolve_ambiguous(receiver, None) {
        return resolved;
    }
    let tail = receiver
        .rsplit('.')
        .next()
        .and_then(|t| t.split('[').next())
        .unwrap_or(receiver);
    if let Some(resolved) = registry.resolve_ambiguous(tail, None) {
        return resolved;
    }
    TypeKey::new(receiver)
}

/// Whether resolution produced a real classification.
///
/// A bare identifier that merely happens to share a type's name must not
/// resolve to that type unless it was actually inferred as such; this is
/// the guard that keeps a user variable named `category` from completing
/// like the host `category` object.
pub fn resolves_to_known_type(
    receiver: &str,
    resolved: &TypeKey,
    env: &TypeEnv,
    registry: &TypeRegistry,
) -> bool {
    if IDENT_RE.is_match(receiver) && !env.contains(receiver) && resolved.as_str() == receiver {
        return false;
    }
    registry.lookup(resolved.as_str()).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::infer_types;
    use wyrm_syntax::parse_module;

    fn setup(code: &str) -> (TypeEnv, TypeRegistry) {
        let registry = TypeRegistry::builtin();
        let env = infer_types(&parse_module(code).unwrap(), &registry);
        (env, registry)
    }

    #[test]
    fn resolves_variables_and_chains() {
        let (env, registry) = setup("x = character()\n");
        assert_eq!(resolve_receiver("x", &env, &registry), "character");
        assert_eq!(resolve_receiver("x.stats", &env, &registry), "stats");
        assert_eq!(resolve_receiver("x.attacks", &env, &registry), "attack");
        assert_eq!(resolve_receiver("x.attacks[0]", &env, &registry), "attack");
    }

    #[test]
    fn resolves_call_chains_without_bindings() {
        let (env, registry) = setup("");
        assert_eq!(
            resolve_receiver("character().skills", &env, &registry),
            "skill"
        );
        assert_eq!(
            resolve_receiver("combat().combatants[0]", &env, &registry),
            "combatant"
        );
    }

    #[test]
    fn dict_get_uses_recorded_literal_keys() {
        let (env, registry) = setup("d = {'a': character()}\n");
        assert_eq!(resolve_receiver("d.get('a')", &env, &registry), "character");
    }

    #[test]
    fn bare_names_do_not_leak_type_identities() {
        let (env, registry) = setup("category = 1\n");
        // `category` is a host type name, but this variable was never
        // inferred as one.
        let resolved = resolve_receiver("category", &env, &registry);
        assert!(!resolves_to_known_type("category", &resolved, &env, &registry));
    }

    #[test]
    fn unresolved_receivers_return_identity() {
        let (env, registry) = setup("");
        assert_eq!(resolve_receiver("mystery", &env, &registry), "mystery");
    }
}
