//! The host-object type registry.
//!
//! Alias scripts run against a closed set of host objects: the character
//! sheet, the combat state, the chat context, and their nested pieces. This
//! crate describes that catalog statically — field and method names, result
//! type hints, element types for collection-valued fields, and the parent
//! constraints that keep ambiguous bare names (several types expose a
//! "name", only `skills` owns a "skill") from leaking into unrelated scopes.
//!
//! The registry is built once and never mutated; construction is
//! deterministic so two registries built from the same catalog compare equal.

mod catalog;

use std::collections::BTreeMap;
use std::fmt;

use smol_str::SmolStr;

/// An interned name identifying one host object type.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(SmolStr);

impl TypeKey {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(SmolStr::new(name.as_ref()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.0)
    }
}

impl From<&str> for TypeKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for TypeKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TypeKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// One field on a host object type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldSpec {
    pub doc: &'static str,
    /// Declared result type, when the field's value is itself catalogued.
    pub result: Option<TypeKey>,
    /// Declared element type for collection-valued fields.
    pub element: Option<TypeKey>,
}

/// One method on a host object type. Methods carry display metadata only;
/// their return types are not tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpec {
    pub signature: &'static str,
    pub doc: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub name: TypeKey,
    pub fields: BTreeMap<SmolStr, FieldSpec>,
    pub methods: BTreeMap<SmolStr, MethodSpec>,
    /// Element type produced by iterating or indexing a value of this type.
    pub element: Option<TypeKey>,
    /// Receiver types a bare ambiguous use of this name may resolve under.
    /// Empty means the name is unambiguous.
    pub parents: Vec<TypeKey>,
    /// Methods safe for the constant evaluator to call on concrete values.
    pub safe_methods: Vec<&'static str>,
}

impl TypeSpec {
    fn new(name: &str) -> Self {
        Self {
            name: TypeKey::new(name),
            fields: BTreeMap::new(),
            methods: BTreeMap::new(),
            element: None,
            parents: Vec::new(),
            safe_methods: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.get(name)
    }

    pub fn is_safe_method(&self, name: &str) -> bool {
        self.safe_methods.contains(&name)
    }
}

/// Immutable catalog of host object types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRegistry {
    specs: BTreeMap<TypeKey, TypeSpec>,
}

impl TypeRegistry {
    /// Build the registry for the standard host object model.
    pub fn builtin() -> Self {
        let mut specs = BTreeMap::new();
        for spec in catalog::catalog() {
            specs.insert(spec.name.clone(), spec);
        }
        let mut registry = Self { specs };
        registry.derive_field_elements();
        registry
    }

    /// For fields with a declared result type but no explicit element type,
    /// inherit the result type's own element type. This is what makes
    /// `character().attacks` carry `attack` as its element without spelling
    /// it out on every field.
    fn derive_field_elements(&mut self) {
        let elements: BTreeMap<TypeKey, TypeKey> = self
            .specs
            .iter()
            .filter_map(|(key, spec)| spec.element.clone().map(|e| (key.clone(), e)))
            .collect();
        for spec in self.specs.values_mut() {
            for field in spec.fields.values_mut() {
                if field.element.is_none() {
                    if let Some(result) = &field.result {
                        field.element = elements.get(result).cloned();
                    }
                }
            }
        }
    }

    pub fn lookup(&self, key: &str) -> Option<&TypeSpec> {
        self.specs.get(&TypeKey::new(key))
    }

    /// Resolve a possibly ambiguous bare type name.
    ///
    /// Returns the key unchanged when its spec declares no parent
    /// constraint. With parents, resolution succeeds only when the
    /// receiver's own type is one of them.
    pub fn resolve_ambiguous(&self, key: &str, receiver: Option<&str>) -> Option<TypeKey> {
        let spec = self.lookup(key)?;
        if spec.parents.is_empty() {
            return Some(spec.name.clone());
        }
        let receiver = receiver?;
        spec.parents
            .iter()
            .any(|p| p == receiver)
            .then(|| spec.name.clone())
    }

    /// Element type for iterating or indexing a value of type `key`.
    pub fn element_of(&self, key: &str) -> Option<&TypeKey> {
        self.lookup(key)?.element.as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeSpec> {
        self.specs.values()
    }
}

/// Internal builder used by the catalog module.
struct SpecBuilder {
    spec: TypeSpec,
}

fn ty(name: &'static str) -> SpecBuilder {
    SpecBuilder {
        spec: TypeSpec::new(name),
    }
}

impl SpecBuilder {
    fn parents(mut self, parents: &[&str]) -> Self {
        self.spec.parents = parents.iter().map(|p| TypeKey::new(p)).collect();
        self
    }

    fn element(mut self, element: &str) -> Self {
        self.spec.element = Some(TypeKey::new(element));
        self
    }

    fn field(mut self, name: &'static str, doc: &'static str) -> Self {
        self.spec.fields.insert(
            SmolStr::new(name),
            FieldSpec {
                doc,
                ..FieldSpec::default()
            },
        );
        self
    }

    fn field_of(mut self, name: &'static str, result: &str, doc: &'static str) -> Self {
        self.spec.fields.insert(
            SmolStr::new(name),
            FieldSpec {
                doc,
                result: Some(TypeKey::new(result)),
                element: None,
            },
        );
        self
    }

    fn field_list(mut self, name: &'static str, element: &str, doc: &'static str) -> Self {
        self.spec.fields.insert(
            SmolStr::new(name),
            FieldSpec {
                doc,
                result: Some(TypeKey::new("list")),
                element: Some(TypeKey::new(element)),
            },
        );
        self
    }

    fn method(mut self, name: &'static str, signature: &'static str, doc: &'static str) -> Self {
        self.spec
            .methods
            .insert(SmolStr::new(name), MethodSpec { signature, doc });
        self
    }

    fn safe(mut self, methods: &[&'static str]) -> Self {
        self.spec.safe_methods = methods.to_vec();
        self
    }

    fn build(self) -> TypeSpec {
        self.spec
    }

    /// Clone this spec under another catalog name with its own parent set.
    /// Used for the class-style aliases that annotations may spell
    /// (`"SimpleCombat"`, `"AliasSkill"`, ...).
    fn alias(&self, name: &'static str, parents: &[&str]) -> TypeSpec {
        let mut spec = self.spec.clone();
        spec.name = TypeKey::new(name);
        spec.parents = parents.iter().map(|p| TypeKey::new(p)).collect();
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn construction_is_deterministic() {
        assert_eq!(TypeRegistry::builtin(), TypeRegistry::builtin());
    }

    #[test]
    fn ambiguous_names_resolve_only_under_parents() {
        let registry = TypeRegistry::builtin();
        assert_eq!(
            registry.resolve_ambiguous("skill", Some("skills")),
            Some(TypeKey::new("skill"))
        );
        assert_eq!(registry.resolve_ambiguous("skill", Some("character")), None);
        assert_eq!(registry.resolve_ambiguous("skill", None), None);
        // Unconstrained names pass through.
        assert_eq!(
            registry.resolve_ambiguous("character", None),
            Some(TypeKey::new("character"))
        );
    }

    #[test]
    fn collection_fields_inherit_element_types() {
        let registry = TypeRegistry::builtin();
        let character = registry.lookup("character").unwrap();
        let attacks = character.field("attacks").unwrap();
        assert_eq!(attacks.result.as_ref().unwrap().as_str(), "attacks");
        assert_eq!(attacks.element.as_ref().unwrap().as_str(), "attack");

        let spellbook = registry.lookup("spellbook").unwrap();
        let spells = spellbook.field("spells").unwrap();
        assert_eq!(spells.result.as_ref().unwrap().as_str(), "list");
        assert_eq!(spells.element.as_ref().unwrap().as_str(), "spell");
    }

    #[test]
    fn class_style_aliases_share_their_primary_shape() {
        let registry = TypeRegistry::builtin();
        let combat = registry.lookup("combat").unwrap();
        let alias = registry.lookup("SimpleCombat").unwrap();
        assert_eq!(combat.fields, alias.fields);
        assert_eq!(combat.methods, alias.methods);
    }
}
