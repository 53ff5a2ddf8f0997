//! Static signature table for script builtins and runtime helpers.
//!
//! The runtime exposes these as globals to every script. The table is the
//! single source for completion labels, hover signatures, signature help,
//! and the call-arity pass; it is built once and held immutably.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSig {
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub doc: &'static str,
}

impl FunctionSig {
    /// Display label, e.g. `get_cvar(name, default=None)`.
    pub fn label(&self) -> String {
        format!("{}({})", self.name, self.params.join(", "))
    }

    /// Number of positional arguments a call must supply.
    pub fn required_positional(&self) -> usize {
        self.params
            .iter()
            .filter(|p| !p.contains('=') && !p.starts_with('*'))
            .count()
    }

    /// Maximum positional argument count, or `None` for variadics.
    pub fn max_positional(&self) -> Option<usize> {
        if self.params.iter().any(|p| p.starts_with('*') && !p.starts_with("**")) {
            return None;
        }
        Some(self.params.iter().filter(|p| !p.starts_with('*')).count())
    }
}

/// Names the runtime injects that are not functions.
pub const CONTEXT_NAMES: &[&str] = &["ctx"];

/// The full signature table, keyed by callable name.
pub fn signatures() -> &'static BTreeMap<&'static str, FunctionSig> {
    static TABLE: Lazy<BTreeMap<&'static str, FunctionSig>> = Lazy::new(build_table);
    &TABLE
}

fn build_table() -> BTreeMap<&'static str, FunctionSig> {
    let mut table = BTreeMap::new();
    let mut add = |name: &'static str, params: &'static [&'static str], doc: &'static str| {
        table.insert(name, FunctionSig { name, params, doc });
    };

    // Value and math builtins.
    add("len", &["obj"], "");
    add("min", &["*args"], "");
    add("max", &["*args"], "");
    add("sum", &["iterable", "start=0"], "");
    add("any", &["iterable"], "");
    add("all", &["iterable"], "");
    add("abs", &["x"], "");
    add("range", &["start", "stop=None", "step=None"], "");
    add("enumerate", &["iterable", "start=0"], "");
    add("sorted", &["iterable", "key=None", "reverse=False"], "");
    add("reversed", &["sequence"], "");
    add("int", &["x=0", "base=None"], "");
    add("float", &["x=0"], "");
    add("str", &["object=''"], "");
    add("bool", &["x=False"], "");
    add("round", &["number", "ndigits=None"], "");
    add("ceil", &["x"], "");
    add("floor", &["x"], "");
    add("sqrt", &["x"], "");
    add("time", &[], "Returns the current epoch time in seconds.");

    // Dice and randomness.
    add("roll", &["dice"], "Rolls dice and returns the numeric total.");
    add(
        "vroll",
        &["dice", "multiply=1", "add=0"],
        "Rolls dice and returns a detailed roll result object.",
    );
    add("rand", &[], "");
    add("randint", &["start", "stop=None", "step=1"], "");
    add("randchoice", &["seq"], "");
    add(
        "randchoices",
        &["population", "weights=None", "cum_weights=None", "k=1"],
        "",
    );

    // Conversion helpers.
    add("typeof", &["inst"], "Returns the name of the argument's runtime type.");
    add("parse_coins", &["args"], "Parses a coin string into a currency mapping.");
    add("load_json", &["s"], "");
    add("dump_json", &["obj"], "");
    add("load_yaml", &["s"], "");
    add("dump_yaml", &["obj", "indent=2"], "");

    // Variable stores.
    add(
        "get_gvar",
        &["address"],
        "Retrieves and returns the value of a gvar (global variable).",
    );
    add("get_svar", &["name", "default=None"], "");
    add("get_cvar", &["name", "default=None"], "");
    add("get_uvar", &["name", "default=None"], "");
    add("get_uvars", &[], "");
    add("set_uvar", &["name", "value"], "");
    add("set_uvar_nx", &["name", "value"], "");
    add("delete_uvar", &["name"], "");
    add("uvar_exists", &["name"], "");
    add("exists", &["name"], "Returns whether a name is bound.");
    add(
        "get",
        &["name", "default=None"],
        "Gets the value of a name, returning default if unset. Resolves locals, then cvars, then uvars.",
    );
    add(
        "using",
        &["**imports"],
        "Imports gvar-hosted modules under the given names.",
    );
    add("signature", &["data=0"], "");
    add("verify_signature", &["sig"], "");

    // Context and I/O.
    add("print", &["*values"], "");
    add("character", &[], "Returns the active character.");
    add("combat", &[], "Returns the active combat, or None outside combat.");
    add(
        "argparse",
        &["args", "character=None", "splitter=argsplit", "parse_ephem=True"],
        "Parses an argument string into a ParsedArguments object.",
    );
    add("err", &["reason", "pm_user=False"], "Raises an alias error with the given message.");

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_bounds_follow_param_spellings() {
        let len = &signatures()["len"];
        assert_eq!(len.required_positional(), 1);
        assert_eq!(len.max_positional(), Some(1));

        let minimum = &signatures()["min"];
        assert_eq!(minimum.required_positional(), 0);
        assert_eq!(minimum.max_positional(), None);

        let using = &signatures()["using"];
        assert_eq!(using.required_positional(), 0);
        assert_eq!(using.max_positional(), Some(0));

        let argparse = &signatures()["argparse"];
        assert_eq!(argparse.required_positional(), 1);
        assert_eq!(argparse.max_positional(), Some(4));
    }

    #[test]
    fn labels_render_full_parameter_lists() {
        assert_eq!(signatures()["get"].label(), "get(name, default=None)");
        assert_eq!(signatures()["time"].label(), "time()");
    }
}
