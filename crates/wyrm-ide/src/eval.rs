//! Best-effort constant evaluation for hover previews.
//!
//! Only literals, attribute reads on already-concrete values, and a short
//! allow-list of read-only methods are evaluated. The allow-list is keyed by
//! the concrete value at hand (the host object a call produced, or the JSON
//! kind of a plain value), never by a statically inferred type. Anything
//! outside it, and any lookup that misses, degrades to `None`.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};
use wyrm_core::LineIndex;
use wyrm_syntax::ast::{Expr, ExprKind, Stmt, StmtKind, UnaryOp};
use wyrm_syntax::parse_module;
use wyrm_types::{TypeKey, TypeRegistry};

use crate::context::ContextData;

/// Longest `range(...)` the evaluator will materialise.
const MAX_RANGE_LEN: i64 = 1024;

/// A concrete value, tagged with the host type it came from when one of the
/// context factories produced it. The tag is what gates host-object method
/// calls.
#[derive(Debug, Clone)]
struct Evaluated {
    value: Value,
    type_key: Option<TypeKey>,
}

impl Evaluated {
    fn plain(value: Value) -> Self {
        Self {
            value,
            type_key: None,
        }
    }

    fn host(value: Value, key: &str) -> Self {
        Self {
            value,
            type_key: Some(TypeKey::new(key)),
        }
    }
}

/// Evaluate the constant bindings visible at `upto_line` (inclusive).
///
/// Bindings come from assignments and loop targets whose right-hand side
/// resolves to a concrete value. Statements starting after `upto_line` are
/// ignored so hover only shows values established before the cursor.
pub(crate) fn constant_bindings(
    code: &str,
    upto_line: Option<u32>,
    ctx: &ContextData,
    registry: &TypeRegistry,
) -> BTreeMap<String, Value> {
    let Ok(module) = parse_module(code) else {
        return BTreeMap::new();
    };
    let index = LineIndex::new(code);
    let mut evaluator = Evaluator {
        ctx,
        registry,
        bindings: BTreeMap::new(),
    };
    evaluator.walk(&module.body, &index, upto_line);
    evaluator
        .bindings
        .into_iter()
        .map(|(name, evaluated)| (name, evaluated.value))
        .collect()
}

struct Evaluator<'a> {
    ctx: &'a ContextData,
    registry: &'a TypeRegistry,
    bindings: BTreeMap<String, Evaluated>,
}

impl<'a> Evaluator<'a> {
    fn walk(&mut self, stmts: &[Stmt], index: &LineIndex, upto_line: Option<u32>) {
        for stmt in stmts {
            if let Some(limit) = upto_line {
                if index.line_col(stmt.range.start()).line > limit {
                    continue;
                }
            }
            match &stmt.kind {
                StmtKind::Assign { targets, value } => {
                    if let Some(evaluated) = self.eval(value) {
                        for target in targets {
                            self.bind_target(target, &evaluated);
                        }
                    }
                }
                StmtKind::AnnAssign {
                    target,
                    value: Some(value),
                    ..
                } => {
                    if let Some(evaluated) = self.eval(value) {
                        self.bind_target(target, &evaluated);
                    }
                }
                StmtKind::For {
                    target,
                    iter,
                    body,
                    orelse,
                } => {
                    if let Some(first) = self.first_element(iter) {
                        self.bind_target(target, &first);
                    }
                    self.walk(body, index, upto_line);
                    self.walk(orelse, index, upto_line);
                }
                StmtKind::If { body, orelse, .. } | StmtKind::While { body, orelse, .. } => {
                    self.walk(body, index, upto_line);
                    self.walk(orelse, index, upto_line);
                }
                StmtKind::FunctionDef(def) => self.walk(&def.body, index, upto_line),
                StmtKind::ClassDef { body, .. } => self.walk(body, index, upto_line),
                _ => {}
            }
        }
    }

    fn bind_target(&mut self, target: &Expr, evaluated: &Evaluated) {
        match &target.kind {
            ExprKind::Name(name) => {
                self.bindings.insert(name.clone(), evaluated.clone());
            }
            ExprKind::Tuple(elts) | ExprKind::List(elts) => {
                for elt in elts {
                    self.bind_target(elt, evaluated);
                }
            }
            _ => {}
        }
    }

    fn first_element(&self, iter: &Expr) -> Option<Evaluated> {
        let evaluated = self.eval(iter)?;
        match &evaluated.value {
            Value::Array(items) => {
                let first = items.first()?.clone();
                let elem_key = evaluated
                    .type_key
                    .as_ref()
                    .and_then(|key| self.registry.element_of(key.as_str()).cloned());
                Some(Evaluated {
                    value: first,
                    type_key: elem_key,
                })
            }
            _ => None,
        }
    }

    fn eval(&self, expr: &Expr) -> Option<Evaluated> {
        if let Some(value) = literal_value(expr) {
            return Some(Evaluated::plain(value));
        }
        match &expr.kind {
            ExprKind::Name(name) => {
                if let Some(bound) = self.bindings.get(name) {
                    return Some(bound.clone());
                }
                if name == "ctx" {
                    return Some(Evaluated::host(Value::Object(self.ctx.ctx.clone()), "ctx"));
                }
                None
            }
            ExprKind::Attribute { value, attr, .. } => {
                let base = self.eval(value)?;
                let object = base.value.as_object()?;
                let field_value = object.get(attr)?.clone();
                let field_key = base.type_key.as_ref().and_then(|key| {
                    self.registry
                        .lookup(key.as_str())?
                        .field(attr)?
                        .result
                        .clone()
                });
                Some(Evaluated {
                    value: field_value,
                    type_key: field_key,
                })
            }
            ExprKind::Call {
                func,
                args,
                keywords,
            } => {
                if !keywords.is_empty() {
                    return None;
                }
                match &func.kind {
                    ExprKind::Name(name) => self.eval_factory(name, args),
                    ExprKind::Attribute { value, attr, .. } => {
                        let base = self.eval(value)?;
                        self.eval_method(&base, attr, args)
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn eval_factory(&self, name: &str, args: &[Expr]) -> Option<Evaluated> {
        match name {
            "character" => Some(Evaluated::host(
                Value::Object(self.ctx.character.clone()),
                "character",
            )),
            "combat" => Some(Evaluated::host(
                Value::Object(self.ctx.combat.clone()),
                "combat",
            )),
            "range" => {
                let bounds: Vec<i64> = args
                    .iter()
                    .map(|arg| literal_value(arg)?.as_i64())
                    .collect::<Option<_>>()?;
                let (start, stop, step) = match bounds.as_slice() {
                    [stop] => (0, *stop, 1),
                    [start, stop] => (*start, *stop, 1),
                    [start, stop, step] if *step != 0 => (*start, *stop, *step),
                    _ => return None,
                };
                let mut items = Vec::new();
                let mut current = start;
                while (step > 0 && current < stop) || (step < 0 && current > stop) {
                    items.push(Value::Number(Number::from(current)));
                    if items.len() as i64 >= MAX_RANGE_LEN {
                        break;
                    }
                    current += step;
                }
                Some(Evaluated::plain(Value::Array(items)))
            }
            _ => None,
        }
    }

    /// Call a method from the allow-list. A host-tagged base consults the
    /// registry's safe-method list for that host type; untagged values get
    /// the plain dict/str read-only set.
    fn eval_method(&self, base: &Evaluated, method: &str, args: &[Expr]) -> Option<Evaluated> {
        let allowed = match &base.type_key {
            Some(key) => self
                .registry
                .lookup(key.as_str())
                .is_some_and(|spec| spec.is_safe_method(method)),
            None => match &base.value {
                Value::Object(_) => method == "get",
                Value::String(_) => matches!(method, "lower" | "upper" | "title" | "strip"),
                _ => false,
            },
        };
        if !allowed {
            return None;
        }

        match (&base.value, method) {
            (Value::Object(object), "get" | "get_cvar" | "get_metadata") => {
                let key = self.eval_str_arg(args.first()?)?;
                let default = match args.get(1) {
                    Some(arg) => self.eval(arg)?.value,
                    None => Value::Null,
                };
                let source = match method {
                    "get" => Some(object),
                    "get_cvar" => object.get("cvars").and_then(Value::as_object),
                    _ => object.get("metadata").and_then(Value::as_object),
                };
                let value = source
                    .and_then(|map| map.get(&key).cloned())
                    .unwrap_or(default);
                Some(Evaluated::plain(value))
            }
            (Value::Object(object), "get_combatant" | "get_group") => {
                let name = self.eval_str_arg(args.first()?)?;
                let (field, elem) = if method == "get_combatant" {
                    ("combatants", "combatant")
                } else {
                    ("groups", "group")
                };
                let found = object
                    .get(field)?
                    .as_array()?
                    .iter()
                    .find(|item| {
                        item.get("name").and_then(Value::as_str) == Some(name.as_str())
                    })?
                    .clone();
                Some(Evaluated::host(found, elem))
            }
            (Value::String(text), _) => {
                let result = match method {
                    "lower" => text.to_lowercase(),
                    "upper" => text.to_uppercase(),
                    "strip" => text.trim().to_string(),
                    "title" => title_case(text),
                    _ => return None,
                };
                Some(Evaluated::plain(Value::String(result)))
            }
            _ => None,
        }
    }

    fn eval_str_arg(&self, arg: &Expr) -> Option<String> {
        match self.eval(arg)?.value {
            Value::String(text) => Some(text),
            _ => None,
        }
    }
}

fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if at_word_start {
                result.extend(ch.to_uppercase());
            } else {
                result.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            result.push(ch);
            at_word_start = true;
        }
    }
    result
}

/// A literal expression as a concrete value, or `None` if any part of it is
/// not a literal. Tuples and sets collapse to arrays; dict keys must be
/// string or int literals.
pub(crate) fn literal_value(expr: &Expr) -> Option<Value> {
    match &expr.kind {
        ExprKind::Int(value) => Some(Value::Number(Number::from(*value))),
        ExprKind::Float(value) => Number::from_f64(*value).map(Value::Number),
        ExprKind::Str {
            value,
            formatted: false,
        } => Some(Value::String(value.clone())),
        ExprKind::Bool(value) => Some(Value::Bool(*value)),
        ExprKind::NoneLit => Some(Value::Null),
        ExprKind::UnaryOp { op, operand } => {
            let value = literal_value(operand)?;
            match op {
                UnaryOp::Pos if value.is_number() => Some(value),
                UnaryOp::Neg => match value.as_i64() {
                    Some(int) => Some(Value::Number(Number::from(-int))),
                    None => Number::from_f64(-value.as_f64()?).map(Value::Number),
                },
                _ => None,
            }
        }
        ExprKind::List(elts) | ExprKind::Tuple(elts) | ExprKind::Set(elts) => {
            let items: Vec<Value> = elts.iter().map(literal_value).collect::<Option<_>>()?;
            Some(Value::Array(items))
        }
        ExprKind::Dict { keys, values } => {
            let mut object = Map::new();
            for (key, value) in keys.iter().zip(values) {
                let key = match &key.as_ref()?.kind {
                    ExprKind::Str {
                        value,
                        formatted: false,
                    } => value.clone(),
                    ExprKind::Int(int) => int.to_string(),
                    _ => return None,
                };
                object.insert(key, literal_value(value)?);
            }
            Some(Value::Object(object))
        }
        _ => None,
    }
}

/// Script-level type name of a concrete value, with an element hint for
/// homogeneous arrays (`list[str]`).
pub(crate) fn describe_type(value: &Value) -> String {
    match value {
        Value::Null => "NoneType".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Number(number) => {
            if number.is_f64() {
                "float".to_string()
            } else {
                "int".to_string()
            }
        }
        Value::String(_) => "str".to_string(),
        Value::Array(items) => {
            let mut kinds: Vec<String> = items
                .iter()
                .filter(|item| !item.is_null())
                .map(describe_type)
                .collect();
            kinds.dedup();
            match kinds.as_slice() {
                [single] => format!("list[{single}]"),
                _ => "list".to_string(),
            }
        }
        Value::Object(_) => "dict".to_string(),
    }
}

/// A short single-line preview of a value for hover text.
pub(crate) fn preview_value(value: &Value) -> String {
    match value {
        Value::Object(object) => {
            let parts: Vec<String> = object
                .iter()
                .take(3)
                .map(|(key, value)| format!("{}: {}", short(&Value::String(key.clone()), 30), short(value, 30)))
                .collect();
            let suffix = if object.len() > 3 { ", …" } else { "" };
            format!("{{{}{suffix}}} ({} items)", parts.join(", "), object.len())
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().take(3).map(|item| short(item, 30)).collect();
            let suffix = if items.len() > 3 { ", …" } else { "" };
            format!("[{}{suffix}] ({} items)", parts.join(", "), items.len())
        }
        _ => short(value, 120),
    }
}

fn short(value: &Value, max_len: usize) -> String {
    let text = script_repr(value);
    if text.chars().count() <= max_len {
        return text;
    }
    let truncated: String = text.chars().take(max_len.saturating_sub(3)).collect();
    format!("{truncated}...")
}

/// Render a value the way the scripting language would `repr` it.
fn script_repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'")),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(script_repr).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(object) => {
            let parts: Vec<String> = object
                .iter()
                .map(|(key, value)| format!("'{key}': {}", script_repr(value)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ctx_with_character() -> ContextData {
        let character = json!({
            "name": "Aelar",
            "cvars": { "color": "blue" },
            "levels": { "Fighter": 3, "total_level": 3 }
        });
        ContextData {
            character: character.as_object().unwrap().clone(),
            ..ContextData::default()
        }
    }

    fn bindings(code: &str, ctx: &ContextData) -> BTreeMap<String, Value> {
        constant_bindings(code, None, ctx, &TypeRegistry::builtin())
    }

    #[test]
    fn literal_assignments_bind_values() {
        let env = bindings("x = 3\nname = 'dm'\nxs = [1, 2, 3]\n", &ContextData::default());
        assert_eq!(env["x"], json!(3));
        assert_eq!(env["name"], json!("dm"));
        assert_eq!(env["xs"], json!([1, 2, 3]));
    }

    #[test]
    fn attribute_chains_resolve_against_mock_context() {
        let env = bindings("y = character().name\n", &ctx_with_character());
        assert_eq!(env["y"], json!("Aelar"));
    }

    #[test]
    fn attributes_resolve_through_bound_variables() {
        let env = bindings("x = character()\ny = x.name\n", &ctx_with_character());
        assert_eq!(env["y"], json!("Aelar"));
    }

    #[test]
    fn safe_methods_evaluate_and_unsafe_ones_do_not() {
        let ctx = ctx_with_character();
        let env = bindings(
            "x = character()\nz = x.levels.get('Fighter')\nc = x.get_cvar('color')\n",
            &ctx,
        );
        assert_eq!(env["z"], json!(3));
        assert_eq!(env["c"], json!("blue"));

        let env = bindings("x = character()\ny = x.set_cvar('a', 'b')\n", &ctx);
        assert!(!env.contains_key("y"));
    }

    #[test]
    fn loop_targets_bind_the_first_element() {
        let env = bindings("for i in range(3):\n    pass\n", &ContextData::default());
        assert_eq!(env["i"], json!(0));
    }

    #[test]
    fn statements_after_the_cursor_line_are_ignored() {
        let ctx = ContextData::default();
        let env = constant_bindings("x = 1\nx = 2\n", Some(0), &ctx, &TypeRegistry::builtin());
        assert_eq!(env["x"], json!(1));
    }

    #[test]
    fn type_descriptions_and_previews() {
        assert_eq!(describe_type(&json!([1, 2])), "list[int]");
        assert_eq!(describe_type(&json!([1, "a"])), "list");
        assert_eq!(describe_type(&json!({"a": 1})), "dict");
        assert_eq!(preview_value(&json!([1, 2, 3, 4])), "[1, 2, 3, …] (4 items)");
        assert_eq!(preview_value(&json!("hi")), "'hi'");
        assert_eq!(
            preview_value(&json!({"a": 1})),
            "{'a': 1} (1 items)"
        );
    }
}
