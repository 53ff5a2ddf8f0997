//! Mock execution context for one analysis session.
//!
//! The protocol layer builds this from the active profile; analysis only
//! reads it. The three object maps mirror what the runtime would hand the
//! script's `ctx`, `combat()`, and `character()` accessors.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Named variable seeds available to scripts before any statement runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarSources {
    pub cvars: BTreeMap<String, Value>,
    pub uvars: BTreeMap<String, Value>,
    pub svars: BTreeMap<String, Value>,
    pub gvars: BTreeMap<String, Value>,
}

impl VarSources {
    /// Names bound in a script's namespace at startup. Character variables
    /// shadow user variables, matching the runtime's injection order.
    pub fn initial_names(&self) -> BTreeMap<String, Value> {
        let mut names = self.uvars.clone();
        for (key, value) in &self.cvars {
            names.insert(key.clone(), value.clone());
        }
        names
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextData {
    pub ctx: Map<String, Value>,
    pub combat: Map<String, Value>,
    pub character: Map<String, Value>,
    pub vars: VarSources,
}

impl ContextData {
    pub fn has_character(&self) -> bool {
        !self.character.is_empty()
    }

    pub fn has_combat(&self) -> bool {
        !self.combat.is_empty()
    }
}
