//! End-to-end analysis behavior over whole snippets.

use serde_json::json;
use wyrm_core::Severity;
use wyrm_gvar::{GvarStore, ServiceConfig};
use wyrm_ide::builtins::signatures;
use wyrm_ide::completions::completion_items_for_position;
use wyrm_ide::context::ContextData;
use wyrm_ide::diagnostics::{analyze_code, analyze_snippets, DiagnosticSettings};
use wyrm_ide::Snippet;
use wyrm_types::TypeRegistry;

fn offline_store() -> GvarStore {
    GvarStore::new(ServiceConfig::default()).unwrap()
}

fn ctx_with_character() -> ContextData {
    ContextData {
        character: json!({ "name": "Aelar" }).as_object().unwrap().clone(),
        ..ContextData::default()
    }
}

fn ctx_with_combat() -> ContextData {
    ContextData {
        combat: json!({ "combatants": [] }).as_object().unwrap().clone(),
        ..ContextData::default()
    }
}

async fn diagnose(code: &str, ctx_data: &ContextData) -> Vec<String> {
    let registry = TypeRegistry::builtin();
    let findings = analyze_code(
        code,
        ctx_data,
        &offline_store(),
        &registry,
        &DiagnosticSettings::default(),
    )
    .await;
    findings.into_iter().map(|finding| finding.message).collect()
}

#[tokio::test(flavor = "current_thread")]
async fn clean_snippets_produce_no_findings() {
    for code in [
        "x = roll('1d1')\ny = vroll('1d1')\nz = x + y.total\n",
        "for x in range(3):\n    y = x\nz = [n for n in range(3)]\n",
        "names = [c.name for c in combat().combatants]\n",
    ] {
        let messages = diagnose(code, &ctx_with_combat()).await;
        assert_eq!(messages, Vec::<String>::new(), "for {code:?}");
    }
}

#[tokio::test(flavor = "current_thread")]
async fn unknown_names_warn_and_assignments_leak_forward() {
    let messages = diagnose("x + 1\nx = 2\nx + 1\n", &ContextData::default()).await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("'x' may be undefined"));
}

#[tokio::test(flavor = "current_thread")]
async fn unknown_gvars_are_flagged_once_per_id() {
    let code = "a = get_gvar('missing-key')\nb = get_gvar('missing-key')\n";
    let messages = diagnose(code, &ContextData::default()).await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("gvar"));
    assert!(messages[0].contains("missing-key"));
}

#[tokio::test(flavor = "current_thread")]
async fn seeded_gvars_are_known() {
    let registry = TypeRegistry::builtin();
    let store = offline_store();
    store.seed([("abc123".to_string(), json!("ok"))]);
    let findings = analyze_code(
        "get_gvar('abc123')",
        &ContextData::default(),
        &store,
        &registry,
        &DiagnosticSettings::default(),
    )
    .await;
    assert!(findings.iter().all(|f| !f.message.contains("gvar")));
}

#[tokio::test(flavor = "current_thread")]
async fn using_imports_check_their_gvar_ids() {
    let messages = diagnose("using(mod='some-module-id')\n", &ContextData::default()).await;
    assert!(messages.iter().any(|m| m.contains("Unknown gvar 'some-module-id'")));
}

#[tokio::test(flavor = "current_thread")]
async fn imports_always_error() {
    let registry = TypeRegistry::builtin();
    let findings = analyze_code(
        "import os\nx = 1\n",
        &ContextData::default(),
        &offline_store(),
        &registry,
        &DiagnosticSettings::default(),
    )
    .await;
    assert_eq!(findings.len(), 1);
    assert!(findings[0].message.contains("Imports are not supported"));
    assert_eq!(findings[0].severity, Severity::Error);
}

#[tokio::test(flavor = "current_thread")]
async fn call_arity_bounds_are_checked() {
    let messages = diagnose("len(1, 2)\n", &ContextData::default()).await;
    assert!(messages.iter().any(|m| m.contains("invalid arguments")));

    let messages = diagnose("n = len([1])\n", &ContextData::default()).await;
    assert_eq!(messages, Vec::<String>::new());
}

#[tokio::test(flavor = "current_thread")]
async fn private_method_calls_error_without_type_knowledge() {
    let messages = diagnose("vroll('1d4')._hidden()\n", &ContextData::default()).await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("private methods"));
}

#[tokio::test(flavor = "current_thread")]
async fn factory_calls_without_mock_data_flag_once() {
    let code = "a = character()\nb = character()\n";
    let messages = diagnose(code, &ContextData::default()).await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("character context"));

    let messages = diagnose("r = combat().round_num\n", &ContextData::default()).await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("combat context"));
}

#[tokio::test(flavor = "current_thread")]
async fn uncalled_factories_are_flagged() {
    let messages = diagnose("h = character.hp\n", &ctx_with_character()).await;
    assert!(messages.iter().any(|m| m.contains("Call character()")));
}

#[tokio::test(flavor = "current_thread")]
async fn properties_called_as_methods_are_flagged() {
    let messages = diagnose("a = ctx.author()\n", &ContextData::default()).await;
    assert!(messages.iter().any(|m| m.contains("property")));
}

#[tokio::test(flavor = "current_thread")]
async fn methods_read_as_properties_are_flagged() {
    let messages = diagnose("g = combat().get_combatant\n", &ctx_with_combat()).await;
    assert!(messages.iter().any(|m| m.contains("method")));
}

#[tokio::test(flavor = "current_thread")]
async fn collection_attributes_need_an_index_or_iteration() {
    let messages = diagnose("n = combat().combatants.hp\n", &ctx_with_combat()).await;
    assert!(messages.iter().any(|m| m.contains("index or iterate")));

    let messages = diagnose(
        "n = character().attacks.name\n",
        &ctx_with_character(),
    )
    .await;
    assert!(messages.iter().any(|m| m.contains("index or iterate")));

    let messages = diagnose(
        "n = character().attacks[0].name\n",
        &ctx_with_character(),
    )
    .await;
    assert_eq!(messages, Vec::<String>::new());
}

#[tokio::test(flavor = "current_thread")]
async fn syntax_errors_stop_all_other_passes() {
    let registry = TypeRegistry::builtin();
    let findings = analyze_code(
        "if True print(missing)\nimport os\n",
        &ContextData::default(),
        &offline_store(),
        &registry,
        &DiagnosticSettings::default(),
    )
    .await;
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Error);
}

#[tokio::test(flavor = "current_thread")]
async fn top_level_returns_parse_wrapped_with_lines_shifted_back() {
    let code = "x = 3\nreturn missing_name\n";
    let registry = TypeRegistry::builtin();
    let findings = analyze_code(
        code,
        &ContextData::default(),
        &offline_store(),
        &registry,
        &DiagnosticSettings::default(),
    )
    .await;
    assert_eq!(findings.len(), 1);
    assert!(findings[0].message.contains("missing_name"));
    assert_eq!(findings[0].range.start.line, 1);
}

#[tokio::test(flavor = "current_thread")]
async fn snippet_offsets_shift_findings_into_document_coordinates() {
    let registry = TypeRegistry::builtin();
    let snippets = vec![Snippet::new("bad_var", 3, 10)];
    let findings = analyze_snippets(
        &snippets,
        &ContextData::default(),
        &offline_store(),
        &registry,
        &DiagnosticSettings::default(),
    )
    .await;
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].range.start.line, 3);
    assert_eq!(findings[0].range.start.character, 10);
}

#[test]
fn attribute_completions_follow_the_inferred_chain() {
    let registry = TypeRegistry::builtin();
    let code = "x = character()\nx.attacks[0].";
    let items = completion_items_for_position(code, 1, 13, &[], &registry);
    let labels: Vec<&str> = items.iter().map(|item| item.label.as_str()).collect();
    for expected in ["name", "verb", "raw"] {
        assert!(labels.contains(&expected), "missing {expected}");
    }
    assert!(!labels.contains(&"abs"));
}

#[test]
fn branch_divergent_bindings_offer_no_completions() {
    let registry = TypeRegistry::builtin();
    let code = "if c:\n    x = character()\nelse:\n    x = combat()\nx.";
    let items = completion_items_for_position(code, 4, 2, &[], &registry);
    assert!(items.is_empty());
}

#[test]
fn top_level_suggestions_respect_the_typed_prefix() {
    let registry = TypeRegistry::builtin();
    let store = offline_store();
    let suggestions = wyrm_ide::completions::gather_suggestions(
        &ContextData::default(),
        &store,
        signatures(),
    );
    let items = completion_items_for_position("get_g", 0, 5, &suggestions, &registry);
    let labels: Vec<&str> = items.iter().map(|item| item.label.as_str()).collect();
    assert!(labels.contains(&"get_gvar"));
    assert!(!labels.contains(&"len"));
}
