//! Forward type inference over one parsed snippet.
//!
//! A single walk of the statement list builds a [`TypeEnv`]: identifier →
//! host type key, plus two synthetic key families. `name.__element__` holds
//! the element type of a collection-valued binding, and `name.<key>` holds
//! the type of a literal key inside a dictionary literal assigned to `name`
//! (so a later `name.get("key")` can resolve).
//!
//! The pass is deliberately permissive: bindings leak forward out of loop
//! and function bodies, and anything ambiguous infers to nothing rather
//! than to a guess.

use std::collections::HashMap;

use wyrm_syntax::ast::{Expr, ExprKind, Module, Param, Params, Stmt, StmtKind};
use wyrm_types::{TypeKey, TypeRegistry};

/// Per-snippet mapping from identifier (and synthetic sub-keys) to type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeEnv {
    map: HashMap<String, TypeKey>,
}

impl TypeEnv {
    pub fn get(&self, name: &str) -> Option<&TypeKey> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Recorded element type for `name`, if any.
    pub fn element_of(&self, name: &str) -> Option<&TypeKey> {
        self.map.get(&format!("{name}.__element__"))
    }

    pub fn bind(&mut self, name: impl Into<String>, key: TypeKey) {
        self.map.insert(name.into(), key);
    }

    fn keys(&self) -> impl Iterator<Item = &String> {
        self.map.keys()
    }
}

/// Infer types for every binding in `module`.
pub fn infer_types(module: &Module, registry: &TypeRegistry) -> TypeEnv {
    let mut inferencer = Inferencer {
        registry,
        env: TypeEnv::default(),
    };
    inferencer.walk(&module.body);
    inferencer.env
}

/// Infer the (type, element type) of one expression against an existing
/// environment. Used by diagnostics heuristics.
pub fn expr_type(
    expr: &Expr,
    env: &TypeEnv,
    registry: &TypeRegistry,
) -> (Option<TypeKey>, Option<TypeKey>) {
    let inferencer = Inferencer {
        registry,
        env: env.clone(),
    };
    inferencer.value_type(expr)
}

struct Inferencer<'a> {
    registry: &'a TypeRegistry,
    env: TypeEnv,
}

impl<'a> Inferencer<'a> {
    fn walk(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Assign { targets, value } => {
                let (val_type, elem_type) = self.value_type(value);
                for target in targets {
                    self.bind_target(target, val_type.clone(), elem_type.clone(), Some(value));
                }
            }
            StmtKind::AnnAssign {
                target,
                annotation,
                value,
            } => {
                let (val_type, elem_type) = match value {
                    Some(value) => self.value_type(value),
                    None => (None, None),
                };
                let (ann_type, ann_elem) = annotation_types(annotation);
                self.bind_target(
                    target,
                    val_type.or(ann_type),
                    elem_type.or(ann_elem),
                    value.as_ref(),
                );
            }
            StmtKind::AugAssign { target, value, .. } => {
                let (val_type, elem_type) = self.value_type(value);
                let val_type = val_type.or_else(|| self.existing_type(target));
                let elem_type = elem_type.or_else(|| self.existing_element(target));
                self.bind_target(target, val_type, elem_type, None);
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                let (_, mut elem_type) = self.value_type(iter);
                if elem_type.is_none() {
                    if let Some(name) = iter.as_name() {
                        elem_type = self.env.element_of(name).cloned();
                    }
                }
                self.bind_target(target, elem_type, None, None);
                self.walk(body);
                self.walk(orelse);
            }
            StmtKind::While { body, orelse, .. } => {
                self.walk(body);
                self.walk(orelse);
            }
            StmtKind::FunctionDef(def) => {
                self.bind_params(&def.params);
                self.walk(&def.body);
            }
            StmtKind::ClassDef { body, .. } => self.walk(body),
            StmtKind::If { body, orelse, .. } => {
                let base = self.env.clone();
                let body_env = self.infer_block(body, base.clone());
                let orelse_env = if orelse.is_empty() {
                    base.clone()
                } else {
                    self.infer_block(orelse, base.clone())
                };
                self.env = merge_branches(&base, &body_env, &orelse_env);
            }
            StmtKind::Expr(_)
            | StmtKind::Return { .. }
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Pass
            | StmtKind::Import { .. }
            | StmtKind::ImportFrom { .. } => {}
        }
    }

    fn infer_block(&self, stmts: &[Stmt], seed: TypeEnv) -> TypeEnv {
        let mut walker = Inferencer {
            registry: self.registry,
            env: seed,
        };
        walker.walk(stmts);
        walker.env
    }

    fn bind_target(
        &mut self,
        target: &Expr,
        val_type: Option<TypeKey>,
        elem_type: Option<TypeKey>,
        source: Option<&Expr>,
    ) {
        match &target.kind {
            ExprKind::Name(name) => {
                if let Some(val_type) = val_type {
                    self.env.bind(name.clone(), val_type);
                }
                if let Some(elem_type) = elem_type {
                    self.env.bind(format!("{name}.__element__"), elem_type);
                }
                if let Some(source) = source {
                    self.record_dict_key_types(name, source);
                }
            }
            ExprKind::Tuple(elts) | ExprKind::List(elts) => {
                for elt in elts {
                    self.bind_target(elt, val_type.clone(), elem_type.clone(), source);
                }
            }
            _ => {}
        }
    }

    fn bind_params(&mut self, params: &Params) {
        for param in params.iter() {
            self.bind_param(param);
        }
    }

    fn bind_param(&mut self, param: &Param) {
        let Some(annotation) = &param.annotation else {
            return;
        };
        let (ann_type, elem_type) = annotation_types(annotation);
        if let Some(ann_type) = ann_type {
            self.env.bind(param.name.clone(), ann_type);
        }
        if let Some(elem_type) = elem_type {
            self.env.bind(format!("{}.__element__", param.name), elem_type);
        }
    }

    fn existing_type(&self, target: &Expr) -> Option<TypeKey> {
        self.env.get(target.as_name()?).cloned()
    }

    fn existing_element(&self, target: &Expr) -> Option<TypeKey> {
        self.env.element_of(target.as_name()?).cloned()
    }

    /// Record `target.<key>` bindings for a dictionary literal with literal
    /// string/int keys.
    fn record_dict_key_types(&mut self, var_name: &str, value: &Expr) {
        let ExprKind::Dict { keys, values } = &value.kind else {
            return;
        };
        let bindings: Vec<_> = keys
            .iter()
            .zip(values)
            .filter_map(|(key, val)| {
                let key = literal_key(key.as_ref()?)?;
                Some((key, self.value_type(val)))
            })
            .collect();
        for (key, (val_type, elem_type)) in bindings {
            if let Some(val_type) = val_type {
                self.env.bind(format!("{var_name}.{key}"), val_type);
            }
            if let Some(elem_type) = elem_type {
                self.env
                    .bind(format!("{var_name}.{key}.__element__"), elem_type);
            }
        }
    }

    /// Infer one expression's (type, element type) pair.
    fn value_type(&self, value: &Expr) -> (Option<TypeKey>, Option<TypeKey>) {
        match &value.kind {
            ExprKind::Call { func, args, .. } => {
                if let Some(name) = func.as_name() {
                    return match name {
                        "character" | "combat" => (Some(TypeKey::new(name)), None),
                        "vroll" => (Some(TypeKey::new("SimpleRollResult")), None),
                        "argparse" => (Some(TypeKey::new("ParsedArguments")), None),
                        "range" => (Some(TypeKey::new("range")), Some(TypeKey::new("int"))),
                        "list" | "dict" | "str" => (Some(TypeKey::new(name)), None),
                        _ => (None, None),
                    };
                }
                if let ExprKind::Attribute {
                    value: base, attr, ..
                } = &func.kind
                {
                    let (base_type, base_elem) = self.value_type(base);
                    if attr == "get" && !args.is_empty() {
                        let key = literal_key(&args[0]);
                        let (val_type, elem_type) = self.subscript_type(
                            base,
                            key.as_deref(),
                            base_type.as_ref(),
                            base_elem.as_ref(),
                        );
                        if val_type.is_some() {
                            return (val_type, elem_type);
                        }
                        if base_elem.is_some() {
                            return (base_elem, None);
                        }
                    }
                }
                (None, None)
            }
            ExprKind::List(elts) => {
                let (elem_type, _) = self.iterable_element(elts);
                (Some(TypeKey::new("list")), elem_type)
            }
            ExprKind::Tuple(elts) => {
                let (elem_type, _) = self.iterable_element(elts);
                (Some(TypeKey::new("tuple")), elem_type)
            }
            ExprKind::Set(elts) => {
                let (elem_type, _) = self.iterable_element(elts);
                (Some(TypeKey::new("set")), elem_type)
            }
            ExprKind::ListComp { elt, .. } => {
                let (comp_type, comp_elem) = self.value_type(elt);
                (Some(TypeKey::new("list")), comp_type.or(comp_elem))
            }
            ExprKind::Dict { values, .. } => {
                let (elem_type, _) = self.iterable_element(values);
                (Some(TypeKey::new("dict")), elem_type)
            }
            ExprKind::Subscript {
                value: base, index, ..
            } => {
                let (base_type, base_elem) = self.value_type(base);
                let key = literal_key(index);
                self.subscript_type(base, key.as_deref(), base_type.as_ref(), base_elem.as_ref())
            }
            ExprKind::Str { .. } => (Some(TypeKey::new("str")), None),
            ExprKind::Name(name) => {
                if let Some(known) = self.env.get(name) {
                    return (Some(known.clone()), self.env.element_of(name).cloned());
                }
                if matches!(name.as_str(), "character" | "combat" | "ctx") {
                    return (Some(TypeKey::new(name)), None);
                }
                (None, None)
            }
            ExprKind::Attribute {
                value: base, attr, ..
            } => {
                let (mut base_type, mut base_elem) = (None, None);
                if let Some(base_name) = base.as_name() {
                    base_type = self.env.get(base_name).cloned();
                    base_elem = self.env.element_of(base_name).cloned();
                }
                if base_type.is_none() {
                    (base_type, base_elem) = self.value_type(base);
                }
                let Some(base_type) = base_type else {
                    return (None, None);
                };
                if let Some(spec) = self.registry.lookup(base_type.as_str()) {
                    if let Some(field) = spec.field(attr) {
                        if let Some(result) = &field.result {
                            return (Some(result.clone()), field.element.clone());
                        }
                        if let Some(element) = &field.element {
                            return (Some(base_type), Some(element.clone()));
                        }
                    }
                }
                if base_elem.is_some() {
                    return (base_elem, None);
                }
                if let Some(resolved) = self
                    .registry
                    .resolve_ambiguous(attr, Some(base_type.as_str()))
                {
                    return (Some(resolved), None);
                }
                (None, None)
            }
            ExprKind::IfExp { body, orelse, .. } => {
                // Same rule as the statement-level branch merge: agreement
                // keeps the type, a one-sided inference keeps the known arm,
                // and disagreement resolves to nothing.
                let (then_type, then_elem) = self.value_type(body);
                let (else_type, else_elem) = self.value_type(orelse);
                let merged = match (then_type, else_type) {
                    (Some(t), Some(e)) if t == e => Some(t),
                    (Some(_), Some(_)) => return (None, None),
                    (one, other) => one.or(other),
                };
                let merged_elem = match (then_elem, else_elem) {
                    (Some(a), Some(b)) if a != b => None,
                    (a, b) => a.or(b),
                };
                (merged, merged_elem)
            }
            _ => (None, None),
        }
    }

    /// Common element type of a literal collection. Any disagreement, or
    /// any element that fails to infer, yields nothing.
    fn iterable_element(&self, values: &[Expr]) -> (Option<TypeKey>, Option<TypeKey>) {
        let mut elem_type: Option<TypeKey> = None;
        let mut nested_elem: Option<TypeKey> = None;
        for value in values {
            let (val_type, inner_elem) = self.value_type(value);
            let Some(val_type) = val_type else {
                return (None, None);
            };
            match &elem_type {
                None => {
                    elem_type = Some(val_type);
                    nested_elem = inner_elem.clone();
                }
                Some(existing) if *existing != val_type => return (None, None),
                Some(_) => {}
            }
            if let Some(inner) = inner_elem {
                match &nested_elem {
                    None => nested_elem = Some(inner),
                    Some(existing) if *existing != inner => nested_elem = None,
                    Some(_) => {}
                }
            }
        }
        (elem_type, nested_elem)
    }

    /// Subscript resolution: literal-key bindings first, then recorded
    /// element hints, then the registry's declared element type.
    fn subscript_type(
        &self,
        base_expr: &Expr,
        key: Option<&str>,
        base_type: Option<&TypeKey>,
        base_elem: Option<&TypeKey>,
    ) -> (Option<TypeKey>, Option<TypeKey>) {
        let base_name = base_expr.as_name();
        if let (Some(base_name), Some(key)) = (base_name, key) {
            let dict_key = format!("{base_name}.{key}");
            if let Some(known) = self.env.get(&dict_key) {
                return (Some(known.clone()), self.env.element_of(&dict_key).cloned());
            }
        }
        let mut elem_hint = base_elem.cloned();
        if let Some(base_name) = base_name {
            if elem_hint.is_none() {
                elem_hint = self.env.element_of(base_name).cloned();
            }
        }
        if let Some(base_type) = base_type {
            if let Some(spec) = self.registry.lookup(base_type.as_str()) {
                if let Some(field) = key.and_then(|key| spec.field(key)) {
                    if let Some(result) = &field.result {
                        return (Some(result.clone()), field.element.clone());
                    }
                    if let Some(element) = &field.element {
                        return (Some(base_type.clone()), Some(element.clone()));
                    }
                }
                elem_hint = elem_hint.or_else(|| spec.element.clone());
            }
        }
        if elem_hint.is_some() {
            return (elem_hint, None);
        }
        (base_type.cloned(), None)
    }
}

/// Merge the environments of the two arms of a conditional.
///
/// Agreement keeps the binding; disagreement restores the pre-branch value
/// when one existed, keeps a one-sided new binding, and drops a binding
/// that is new to both arms with different values.
fn merge_branches(base: &TypeEnv, left: &TypeEnv, right: &TypeEnv) -> TypeEnv {
    let mut merged = base.clone();
    let mut keys: Vec<&String> = left.keys().chain(right.keys()).collect();
    keys.sort();
    keys.dedup();
    for key in keys {
        let l_val = left.get(key);
        let r_val = right.get(key);
        match (l_val, r_val) {
            (Some(l), Some(r)) if l == r => merged.bind(key.clone(), l.clone()),
            _ if base.contains(key) => {
                if let Some(original) = base.get(key) {
                    merged.bind(key.clone(), original.clone());
                }
            }
            (Some(l), None) => merged.bind(key.clone(), l.clone()),
            (None, Some(r)) => merged.bind(key.clone(), r.clone()),
            _ => {
                merged.map.remove(key);
            }
        }
    }
    merged
}

/// A parameter annotation or annotation-string as a declared type.
///
/// Accepts bare names (`"combat"`), dotted names (last segment wins), and
/// the container spellings `list[T]` / `dict[K, V]` / `set[T]` /
/// `tuple[T]` in either identifier or string form.
fn annotation_types(annotation: &Expr) -> (Option<TypeKey>, Option<TypeKey>) {
    match &annotation.kind {
        ExprKind::Str {
            value,
            formatted: false,
        } => split_annotation_string(value),
        ExprKind::Name(name) => (Some(TypeKey::new(name)), None),
        ExprKind::Attribute { attr, .. } => (Some(TypeKey::new(attr)), None),
        ExprKind::Subscript { value, index } => {
            let Some(base) = value.as_name() else {
                return (None, None);
            };
            let elem = match &index.kind {
                ExprKind::Name(name) => Some(name.as_str()),
                ExprKind::Tuple(items) => items.last().and_then(|item| item.as_name()),
                _ => None,
            };
            (
                Some(TypeKey::new(normalize_container(base))),
                elem.map(TypeKey::new),
            )
        }
        _ => (None, None),
    }
}

fn split_annotation_string(text: &str) -> (Option<TypeKey>, Option<TypeKey>) {
    let trimmed = text.trim().trim_matches(|c| c == '\'' || c == '"');
    if trimmed.is_empty() {
        return (None, None);
    }
    let (base, elem) = match trimmed.split_once('[') {
        Some((base, rest)) => {
            let Some(inner) = rest.strip_suffix(']') else {
                return (Some(TypeKey::new(trimmed)), None);
            };
            let elem = inner.rsplit(',').next().map(str::trim).filter(|e| {
                !e.is_empty() && e.chars().all(|c| c.is_alphanumeric() || c == '_')
            });
            (base.trim(), elem)
        }
        None => (trimmed, None),
    };
    if !base
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_')
    {
        return (Some(TypeKey::new(trimmed)), None);
    }
    (
        Some(TypeKey::new(normalize_container(base))),
        elem.map(TypeKey::new),
    )
}

fn normalize_container(base: &str) -> String {
    let lower = base.to_ascii_lowercase();
    if matches!(lower.as_str(), "list" | "dict" | "set" | "tuple") {
        lower
    } else {
        base.to_string()
    }
}

/// A literal string or integer subscript/`get` key, rendered as the text
/// used in synthetic environment keys.
pub(crate) fn literal_key(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Str {
            value,
            formatted: false,
        } => Some(value.clone()),
        ExprKind::Int(value) => Some(value.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wyrm_syntax::parse_module;

    fn env_for(code: &str) -> TypeEnv {
        let registry = TypeRegistry::builtin();
        infer_types(&parse_module(code).unwrap(), &registry)
    }

    fn ty(env: &TypeEnv, name: &str) -> Option<String> {
        env.get(name).map(|k| k.as_str().to_string())
    }

    #[test]
    fn constructor_calls_bind_their_types() {
        let env = env_for("c = character()\nk = combat()\nr = vroll('1d20')\na = argparse('x')\n");
        assert_eq!(ty(&env, "c").as_deref(), Some("character"));
        assert_eq!(ty(&env, "k").as_deref(), Some("combat"));
        assert_eq!(ty(&env, "r").as_deref(), Some("SimpleRollResult"));
        assert_eq!(ty(&env, "a").as_deref(), Some("ParsedArguments"));
    }

    #[test]
    fn attribute_chains_propagate_registry_types() {
        let env = env_for("c = character()\ns = c.stats\nb = c.spellbook.spells\n");
        assert_eq!(ty(&env, "s").as_deref(), Some("stats"));
        assert_eq!(ty(&env, "b").as_deref(), Some("list"));
        assert_eq!(env.element_of("b").unwrap().as_str(), "spell");
    }

    #[test]
    fn homogeneous_literals_infer_elements_and_mixed_do_not() {
        let env = env_for("xs = [character(), character()]\nys = [character(), combat()]\n");
        assert_eq!(env.element_of("xs").unwrap().as_str(), "character");
        assert!(env.element_of("ys").is_none());
    }

    #[test]
    fn loops_bind_the_element_type() {
        let env = env_for("c = character()\nfor atk in c.attacks:\n    pass\n");
        assert_eq!(ty(&env, "atk").as_deref(), Some("attack"));
    }

    #[test]
    fn loop_over_bare_name_uses_recorded_element() {
        let env = env_for("xs = [vroll('1d4')]\nfor r in xs:\n    pass\n");
        assert_eq!(ty(&env, "r").as_deref(), Some("SimpleRollResult"));
    }

    #[test]
    fn dict_literal_keys_resolve_through_get() {
        let env = env_for("d = {'me': character()}\nwho = d.get('me')\n");
        assert_eq!(ty(&env, "d.me").as_deref(), Some("character"));
        assert_eq!(ty(&env, "who").as_deref(), Some("character"));
    }

    #[test]
    fn annotations_declare_types() {
        let env = env_for("def f(c: \"character\", rolls: \"list[SimpleRollResult]\"):\n    pass\n");
        assert_eq!(ty(&env, "c").as_deref(), Some("character"));
        assert_eq!(ty(&env, "rolls").as_deref(), Some("list"));
        assert_eq!(env.element_of("rolls").unwrap().as_str(), "SimpleRollResult");
    }

    #[test]
    fn branch_merge_agrees_restores_and_drops() {
        let env = env_for(
            "x = character()\n\
             cond = 1\n\
             if cond:\n    x = combat()\n    y = character()\n    z = character()\n\
             else:\n    y = character()\n    z = combat()\n",
        );
        // Disagreement with a pre-branch binding restores it.
        assert_eq!(ty(&env, "x").as_deref(), Some("character"));
        // Agreement keeps the binding.
        assert_eq!(ty(&env, "y").as_deref(), Some("character"));
        // New to both arms with different values: dropped.
        assert_eq!(ty(&env, "z"), None);
    }

    #[test]
    fn one_sided_branch_bindings_leak() {
        let env = env_for("cond = 1\nif cond:\n    c = character()\n");
        assert_eq!(ty(&env, "c").as_deref(), Some("character"));
    }

    #[test]
    fn ternary_merges_operand_types() {
        let env = env_for("cond = 1\na = character() if cond else character()\nb = character() if cond else combat()\n");
        assert_eq!(ty(&env, "a").as_deref(), Some("character"));
        // Disagreeing operand types resolve to nothing, same as the
        // statement-level merge.
        assert_eq!(ty(&env, "b"), None);
    }

    #[test]
    fn subscript_prefers_literal_key_then_element() {
        let env = env_for(
            "d = {'hit': vroll('1d20')}\nr = d['hit']\nc = character()\nfirst = c.attacks[0]\n",
        );
        assert_eq!(ty(&env, "r").as_deref(), Some("SimpleRollResult"));
        assert_eq!(ty(&env, "first").as_deref(), Some("attack"));
    }

    #[test]
    fn tuple_destructuring_binds_every_target() {
        let env = env_for("a, b = character(), character()\n");
        // Both targets receive the common inferred type of the tuple value.
        assert_eq!(ty(&env, "a"), ty(&env, "b"));
    }

    #[test]
    fn augmented_assignment_keeps_existing_types() {
        let env = env_for("n = 'x'\nn += 'y'\n");
        assert_eq!(ty(&env, "n").as_deref(), Some("str"));
    }

    #[test]
    fn comprehension_infers_list_of_element() {
        let env = env_for("c = combat()\nnames = [x for x in c.combatants]\n");
        assert_eq!(ty(&env, "names").as_deref(), Some("list"));
        // The comprehension element is the loop variable, unknown here
        // because comprehension targets are not bound by this pass.
    }
}
