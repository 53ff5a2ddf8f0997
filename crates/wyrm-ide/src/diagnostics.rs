//! The diagnostics passes.
//!
//! One analysis runs a fixed, ordered list of independent passes over each
//! parsed snippet: unknown names, unknown gvars, forbidden imports, call
//! arity, private method calls, and the API-misuse heuristics. Every pass
//! produces plain findings; only the gvar pass suspends, awaiting at most
//! one fetch per distinct gvar id. A snippet that fails to parse yields a
//! single syntax finding and skips every other pass for that snippet only.

use std::collections::HashSet;

use tracing::debug;
use wyrm_core::{Finding, LineIndex, Range, Severity, TextRange};
use wyrm_gvar::GvarStore;
use wyrm_syntax::ast::{Expr, ExprKind, Module, Stmt, StmtKind};
use wyrm_syntax::{parse_module, wrap_in_function, ParseError, WRAP_LINE_OVERHEAD};
use wyrm_types::TypeRegistry;

use crate::builtins::{signatures, CONTEXT_NAMES};
use crate::context::ContextData;
use crate::infer::{expr_type, infer_types, TypeEnv};
use crate::Snippet;

/// Per-session knobs for the semantic passes. Syntax errors, forbidden
/// imports, and private-method calls are always errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticSettings {
    pub semantic_severity: Severity,
}

impl Default for DiagnosticSettings {
    fn default() -> Self {
        Self {
            semantic_severity: Severity::Warning,
        }
    }
}

/// Analyze every snippet of one document, shifting findings back into
/// document coordinates.
pub async fn analyze_snippets(
    snippets: &[Snippet],
    ctx_data: &ContextData,
    store: &GvarStore,
    registry: &TypeRegistry,
    settings: &DiagnosticSettings,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    for snippet in snippets {
        let snippet_findings =
            analyze_code(&snippet.code, ctx_data, store, registry, settings).await;
        findings.extend(
            snippet_findings
                .into_iter()
                .map(|finding| finding.shifted(snippet.line_offset as i32, snippet.char_offset)),
        );
    }
    findings
}

/// Analyze one snippet's code, in snippet-relative coordinates.
pub async fn analyze_code(
    code: &str,
    ctx_data: &ContextData,
    store: &GvarStore,
    registry: &TypeRegistry,
    settings: &DiagnosticSettings,
) -> Vec<Finding> {
    let (module, text, line_shift) = match parse_module(code) {
        Ok(module) => (module, code.to_string(), 0i32),
        Err(err) => {
            let wrapped = wrap_in_function(code);
            match parse_module(&wrapped) {
                Ok(module) => {
                    debug!("snippet parsed after function wrap");
                    (module, wrapped, -(WRAP_LINE_OVERHEAD as i32))
                }
                Err(_) => return vec![syntax_finding(code, &err)],
            }
        }
    };

    let spans = Spans::new(&text);
    let mut findings = Vec::new();
    findings.extend(check_unknown_names(&module, ctx_data, settings, &spans));
    findings.extend(check_gvars(&module, store, settings, &spans).await);
    findings.extend(check_imports(&module, &spans));
    findings.extend(check_call_arity(&module, settings, &spans));
    findings.extend(check_private_calls(&module, &spans));
    findings.extend(check_api_misuse(&module, ctx_data, registry, settings, &spans));

    if line_shift != 0 {
        findings = findings
            .into_iter()
            .map(|finding| finding.shifted(line_shift, 0))
            .collect();
    }
    findings
}

fn syntax_finding(code: &str, err: &ParseError) -> Finding {
    let spans = Spans::new(code);
    Finding::error(err.message.clone(), spans.range(err.range))
}

/// Byte-range to editor-range conversion for the text a module was parsed
/// from (the wrapped text when the wrap retry succeeded).
struct Spans<'a> {
    text: &'a str,
    index: LineIndex,
}

impl<'a> Spans<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            index: LineIndex::new(text),
        }
    }

    fn range(&self, range: TextRange) -> Range {
        self.index.range(self.text, range)
    }
}

// ── Pass 1: unknown names ───────────────────────────────────────────

/// Names bound in a script's namespace before the first statement runs:
/// every callable in the signature table, the injected context objects, and
/// the seeded variables.
pub fn initial_known_names(ctx_data: &ContextData) -> HashSet<String> {
    let mut known: HashSet<String> = signatures().keys().map(|name| name.to_string()).collect();
    known.extend(CONTEXT_NAMES.iter().map(|name| name.to_string()));
    known.extend(ctx_data.vars.initial_names().keys().cloned());
    known
}

fn check_unknown_names(
    module: &Module,
    ctx_data: &ContextData,
    settings: &DiagnosticSettings,
    spans: &Spans<'_>,
) -> Vec<Finding> {
    let mut walker = NameWalker {
        known: initial_known_names(ctx_data),
        severity: settings.semantic_severity,
        findings: Vec::new(),
        spans,
    };
    walker.stmts(&module.body);
    walker.findings
}

/// Flow-insensitive known-name tracker. Assignments, loop targets,
/// definitions, and parameters become known as soon as they are seen and
/// leak forward for the rest of the walk.
struct NameWalker<'a> {
    known: HashSet<String>,
    severity: Severity,
    findings: Vec<Finding>,
    spans: &'a Spans<'a>,
}

impl NameWalker<'_> {
    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Assign { targets, value } => {
                self.expr(value);
                for target in targets {
                    self.learn_target(target);
                }
            }
            StmtKind::AnnAssign { target, value, .. } => {
                if let Some(value) = value {
                    self.expr(value);
                }
                self.learn_target(target);
            }
            StmtKind::AugAssign { target, value, .. } => {
                self.expr(value);
                self.learn_target(target);
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                // Loop targets are defined for the body and after the loop.
                self.learn_target(target);
                self.expr(iter);
                self.stmts(body);
                self.stmts(orelse);
            }
            StmtKind::While { test, body, orelse } => {
                self.expr(test);
                self.stmts(body);
                self.stmts(orelse);
            }
            StmtKind::If { test, body, orelse } => {
                self.expr(test);
                self.stmts(body);
                self.stmts(orelse);
            }
            StmtKind::FunctionDef(def) => {
                self.known.insert(def.name.clone());
                for param in def.params.iter() {
                    self.known.insert(param.name.clone());
                }
                self.stmts(&def.body);
            }
            StmtKind::ClassDef { name, body, .. } => {
                self.known.insert(name.clone());
                self.stmts(body);
            }
            StmtKind::Expr(expr) => self.expr(expr),
            StmtKind::Return { value: Some(value) } => self.expr(value),
            StmtKind::Return { value: None }
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Pass
            | StmtKind::Import { .. }
            | StmtKind::ImportFrom { .. } => {}
        }
    }

    fn learn_target(&mut self, target: &Expr) {
        match &target.kind {
            ExprKind::Name(name) => {
                self.known.insert(name.clone());
            }
            ExprKind::Tuple(elts) | ExprKind::List(elts) => {
                for elt in elts {
                    self.learn_target(elt);
                }
            }
            ExprKind::Starred(inner) => self.learn_target(inner),
            _ => {}
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Name(name) => {
                if !self.known.contains(name) {
                    self.findings.push(Finding::new(
                        format!("'{name}' may be undefined in this scope"),
                        self.spans.range(expr.range),
                        self.severity,
                    ));
                }
            }
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Str { .. }
            | ExprKind::Bool(_)
            | ExprKind::NoneLit => {}
            ExprKind::Tuple(elts) | ExprKind::List(elts) | ExprKind::Set(elts) => {
                for elt in elts {
                    self.expr(elt);
                }
            }
            ExprKind::Dict { keys, values } => {
                for key in keys.iter().flatten() {
                    self.expr(key);
                }
                for value in values {
                    self.expr(value);
                }
            }
            ExprKind::Call {
                func,
                args,
                keywords,
            } => {
                self.expr(func);
                for arg in args {
                    self.expr(arg);
                }
                for keyword in keywords {
                    self.expr(&keyword.value);
                }
            }
            ExprKind::Attribute { value, .. } => self.expr(value),
            ExprKind::Subscript { value, index } => {
                self.expr(value);
                self.expr(index);
            }
            ExprKind::Slice { lower, upper, step } => {
                for part in [lower, upper, step].into_iter().flatten() {
                    self.expr(part);
                }
            }
            ExprKind::BinOp { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            ExprKind::UnaryOp { operand, .. } => self.expr(operand),
            ExprKind::BoolOp { values, .. } => {
                for value in values {
                    self.expr(value);
                }
            }
            ExprKind::Compare {
                left, comparators, ..
            } => {
                self.expr(left);
                for comparator in comparators {
                    self.expr(comparator);
                }
            }
            ExprKind::IfExp { test, body, orelse } => {
                self.expr(test);
                self.expr(body);
                self.expr(orelse);
            }
            ExprKind::ListComp { elt, generators }
            | ExprKind::SetComp { elt, generators }
            | ExprKind::Generator { elt, generators } => {
                // Comprehension targets scope over the element expression.
                for generator in generators {
                    self.expr(&generator.iter);
                    self.learn_target(&generator.target);
                    for cond in &generator.ifs {
                        self.expr(cond);
                    }
                }
                self.expr(elt);
            }
            ExprKind::DictComp {
                key,
                value,
                generators,
            } => {
                for generator in generators {
                    self.expr(&generator.iter);
                    self.learn_target(&generator.target);
                    for cond in &generator.ifs {
                        self.expr(cond);
                    }
                }
                self.expr(key);
                self.expr(value);
            }
            ExprKind::Lambda { params, body } => {
                for param in params.iter() {
                    self.known.insert(param.name.clone());
                }
                self.expr(body);
            }
            ExprKind::Starred(inner) => self.expr(inner),
        }
    }
}

// ── Pass 2: unknown gvars ───────────────────────────────────────────

async fn check_gvars(
    module: &Module,
    store: &GvarStore,
    settings: &DiagnosticSettings,
    spans: &Spans<'_>,
) -> Vec<Finding> {
    let mut refs: Vec<(String, TextRange)> = Vec::new();
    for_each_expr(&module.body, &mut |expr| {
        let ExprKind::Call {
            func,
            args,
            keywords,
        } = &expr.kind
        else {
            return;
        };
        match func.as_name() {
            Some("get_gvar") => {
                if let Some(id) = args.first().and_then(Expr::as_str_literal) {
                    refs.push((id.to_string(), args[0].range));
                }
            }
            Some("using") => {
                for keyword in keywords {
                    if let Some(id) = keyword.value.as_str_literal() {
                        refs.push((id.to_string(), keyword.value.range));
                    }
                }
            }
            _ => {}
        }
    });

    let mut findings = Vec::new();
    let mut checked: HashSet<String> = HashSet::new();
    for (id, range) in refs {
        if !checked.insert(id.clone()) {
            continue;
        }
        if store.ensure(&id).await {
            continue;
        }
        findings.push(Finding::new(
            format!("Unknown gvar '{id}'"),
            spans.range(range),
            settings.semantic_severity,
        ));
    }
    findings
}

// ── Pass 3: forbidden imports ───────────────────────────────────────

fn check_imports(module: &Module, spans: &Spans<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for_each_stmt(&module.body, &mut |stmt| {
        if matches!(
            stmt.kind,
            StmtKind::Import { .. } | StmtKind::ImportFrom { .. }
        ) {
            findings.push(Finding::error(
                "Imports are not supported in alias scripts",
                spans.range(stmt.range),
            ));
        }
    });
    findings
}

// ── Pass 4: call arity ──────────────────────────────────────────────

fn check_call_arity(
    module: &Module,
    settings: &DiagnosticSettings,
    spans: &Spans<'_>,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    for_each_expr(&module.body, &mut |expr| {
        let ExprKind::Call { func, args, .. } = &expr.kind else {
            return;
        };
        let Some(sig) = func.as_name().and_then(|name| signatures().get(name)) else {
            return;
        };
        let count = args.len();
        let too_few = count < sig.required_positional();
        let too_many = sig.max_positional().is_some_and(|max| count > max);
        if too_few || too_many {
            findings.push(Finding::new(
                format!("Call to '{}' may have invalid arguments", sig.name),
                spans.range(func.range),
                settings.semantic_severity,
            ));
        }
    });
    findings
}

// ── Pass 5: private method calls ────────────────────────────────────

fn check_private_calls(module: &Module, spans: &Spans<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for_each_expr(&module.body, &mut |expr| {
        let ExprKind::Call { func, .. } = &expr.kind else {
            return;
        };
        if let ExprKind::Attribute { attr, .. } = &func.kind {
            if attr.starts_with('_') {
                findings.push(Finding::error(
                    "Calling private methods (starting with '_') is not allowed",
                    spans.range(func.range),
                ));
            }
        }
    });
    findings
}

// ── Pass 6: API-misuse heuristics ───────────────────────────────────

fn check_api_misuse(
    module: &Module,
    ctx_data: &ContextData,
    registry: &TypeRegistry,
    settings: &DiagnosticSettings,
    spans: &Spans<'_>,
) -> Vec<Finding> {
    let env = infer_types(module, registry);
    let mut walker = MisuseWalker {
        ctx_data,
        registry,
        env,
        severity: settings.semantic_severity,
        flagged_factories: HashSet::new(),
        findings: Vec::new(),
        spans,
    };
    for stmt in &module.body {
        walker.stmt(stmt);
    }
    walker.findings
}

struct MisuseWalker<'a> {
    ctx_data: &'a ContextData,
    registry: &'a TypeRegistry,
    env: TypeEnv,
    severity: Severity,
    flagged_factories: HashSet<&'static str>,
    findings: Vec<Finding>,
    spans: &'a Spans<'a>,
}

impl MisuseWalker<'_> {
    fn push(&mut self, message: String, range: TextRange) {
        self.findings
            .push(Finding::new(message, self.spans.range(range), self.severity));
    }

    fn stmt(&mut self, stmt: &Stmt) {
        each_child_expr(stmt, &mut |expr| self.expr(expr, false));
        each_child_stmt(stmt, &mut |child| self.stmt(child));
    }

    fn expr(&mut self, expr: &Expr, as_callee: bool) {
        match &expr.kind {
            ExprKind::Call {
                func,
                args,
                keywords,
            } => {
                self.check_factory_context(expr, func);
                if let Some(name) = func.as_name() {
                    // Calling a list-typed variable is almost always a
                    // missing index.
                    if self.env.element_of(name).is_some() {
                        self.push(
                            format!("'{name}' is a collection; index or iterate it before calling"),
                            expr.range,
                        );
                    }
                } else {
                    self.expr(func, true);
                }
                for arg in args {
                    self.expr(arg, false);
                }
                for keyword in keywords {
                    self.expr(&keyword.value, false);
                }
            }
            ExprKind::Attribute { value: base, attr, attr_range } => {
                self.check_uncalled_factory(expr, base);
                self.check_member_use(base, attr, *attr_range, as_callee);
                self.expr(base, false);
            }
            _ => each_subexpr(expr, &mut |child| self.expr(child, false)),
        }
    }

    /// `character()`/`combat()` against a mock context with no matching
    /// data, flagged once per callee.
    fn check_factory_context(&mut self, call: &Expr, func: &Expr) {
        let missing = match func.as_name() {
            Some("character") if !self.ctx_data.has_character() => Some("character"),
            Some("combat") if !self.ctx_data.has_combat() => Some("combat"),
            _ => None,
        };
        let Some(name) = missing else { return };
        if self.flagged_factories.insert(name) {
            self.push(
                format!("{name}() requires {name} context data, but none is configured"),
                call.range,
            );
        }
    }

    /// `character.hp` instead of `character().hp`.
    fn check_uncalled_factory(&mut self, attribute: &Expr, base: &Expr) {
        let Some(name) = base.as_name() else { return };
        if !matches!(name, "character" | "combat") {
            return;
        }
        // A variable shadowing the factory name is fine.
        if self.env.contains(name) {
            return;
        }
        self.push(
            format!("Call {name}() to access {name} data ('{name}' itself is a function)"),
            attribute.range,
        );
    }

    /// Member access against the registry: collection receivers need an
    /// index or iteration first, properties are not callable, and methods
    /// need their parentheses.
    fn check_member_use(&mut self, base: &Expr, attr: &str, attr_range: TextRange, as_callee: bool) {
        let (base_type, base_elem) = expr_type(base, &self.env, self.registry);
        let Some(base_type) = base_type else { return };
        let spec = self.registry.lookup(base_type.as_str());
        let field = spec.and_then(|spec| spec.field(attr));
        let method = spec.and_then(|spec| spec.method(attr));

        if base_elem.is_some() && field.is_none() && method.is_none() {
            self.push(
                format!(
                    "'{base_type}' is a collection; index or iterate it before accessing '{attr}'"
                ),
                attr_range,
            );
            return;
        }
        if as_callee {
            if let Some(field) = field {
                if method.is_none() {
                    if field.element.is_some() {
                        self.push(
                            format!(
                                "'{attr}' is a collection; index or iterate it before calling"
                            ),
                            attr_range,
                        );
                    } else {
                        self.push(
                            format!("'{attr}' is a property, not a method; remove the parentheses"),
                            attr_range,
                        );
                    }
                }
            }
        } else if method.is_some() && field.is_none() {
            self.push(
                format!("'{attr}' is a method; call it with parentheses"),
                attr_range,
            );
        }
    }
}

// ── Tree-walk helpers ───────────────────────────────────────────────

/// Visit every statement in the tree, parents before children.
fn for_each_stmt<'a>(stmts: &'a [Stmt], f: &mut impl FnMut(&'a Stmt)) {
    for stmt in stmts {
        f(stmt);
        match &stmt.kind {
            StmtKind::If { body, orelse, .. }
            | StmtKind::For { body, orelse, .. }
            | StmtKind::While { body, orelse, .. } => {
                for_each_stmt(body, f);
                for_each_stmt(orelse, f);
            }
            StmtKind::FunctionDef(def) => for_each_stmt(&def.body, f),
            StmtKind::ClassDef { body, .. } => for_each_stmt(body, f),
            _ => {}
        }
    }
}

/// Visit the statements nested directly inside `stmt` (one level).
fn each_child_stmt<'a>(stmt: &'a Stmt, f: &mut impl FnMut(&'a Stmt)) {
    let bodies: Vec<&[Stmt]> = match &stmt.kind {
        StmtKind::If { body, orelse, .. }
        | StmtKind::For { body, orelse, .. }
        | StmtKind::While { body, orelse, .. } => vec![body, orelse],
        StmtKind::FunctionDef(def) => vec![&def.body],
        StmtKind::ClassDef { body, .. } => vec![body],
        _ => Vec::new(),
    };
    for body in bodies {
        for child in body {
            f(child);
        }
    }
}

/// Visit every expression in the tree, parents before children.
pub(crate) fn for_each_expr<'a>(stmts: &'a [Stmt], f: &mut impl FnMut(&'a Expr)) {
    fn visit<'a>(expr: &'a Expr, f: &mut impl FnMut(&'a Expr)) {
        f(expr);
        each_subexpr(expr, &mut |child| visit(child, f));
    }
    for_each_stmt(stmts, &mut |stmt| {
        each_child_expr(stmt, &mut |expr| visit(expr, f));
    });
}

/// Visit the expressions held directly by `stmt` (not those of nested
/// statements).
fn each_child_expr<'a>(stmt: &'a Stmt, f: &mut impl FnMut(&'a Expr)) {
    match &stmt.kind {
        StmtKind::Expr(expr) => f(expr),
        StmtKind::Assign { targets, value } => {
            for target in targets {
                f(target);
            }
            f(value);
        }
        StmtKind::AugAssign { target, value, .. } => {
            f(target);
            f(value);
        }
        StmtKind::AnnAssign {
            target,
            annotation,
            value,
        } => {
            f(target);
            f(annotation);
            if let Some(value) = value {
                f(value);
            }
        }
        StmtKind::If { test, .. } | StmtKind::While { test, .. } => f(test),
        StmtKind::For { target, iter, .. } => {
            f(target);
            f(iter);
        }
        StmtKind::Return { value: Some(value) } => f(value),
        StmtKind::FunctionDef(def) => {
            for param in def.params.iter() {
                if let Some(default) = &param.default {
                    f(default);
                }
            }
        }
        StmtKind::ClassDef { bases, .. } => {
            for base in bases {
                f(base);
            }
        }
        _ => {}
    }
}

/// Visit the direct sub-expressions of `expr`.
fn each_subexpr<'a>(expr: &'a Expr, f: &mut impl FnMut(&'a Expr)) {
    match &expr.kind {
        ExprKind::Name(_)
        | ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::Str { .. }
        | ExprKind::Bool(_)
        | ExprKind::NoneLit => {}
        ExprKind::Tuple(elts) | ExprKind::List(elts) | ExprKind::Set(elts) => {
            for elt in elts {
                f(elt);
            }
        }
        ExprKind::Dict { keys, values } => {
            for key in keys.iter().flatten() {
                f(key);
            }
            for value in values {
                f(value);
            }
        }
        ExprKind::Call {
            func,
            args,
            keywords,
        } => {
            f(func);
            for arg in args {
                f(arg);
            }
            for keyword in keywords {
                f(&keyword.value);
            }
        }
        ExprKind::Attribute { value, .. } => f(value),
        ExprKind::Subscript { value, index } => {
            f(value);
            f(index);
        }
        ExprKind::Slice { lower, upper, step } => {
            for part in [lower, upper, step].into_iter().flatten() {
                f(part);
            }
        }
        ExprKind::BinOp { left, right, .. } => {
            f(left);
            f(right);
        }
        ExprKind::UnaryOp { operand, .. } => f(operand),
        ExprKind::BoolOp { values, .. } => {
            for value in values {
                f(value);
            }
        }
        ExprKind::Compare {
            left, comparators, ..
        } => {
            f(left);
            for comparator in comparators {
                f(comparator);
            }
        }
        ExprKind::IfExp { test, body, orelse } => {
            f(test);
            f(body);
            f(orelse);
        }
        ExprKind::ListComp { elt, generators }
        | ExprKind::SetComp { elt, generators }
        | ExprKind::Generator { elt, generators } => {
            for generator in generators {
                f(&generator.target);
                f(&generator.iter);
                for cond in &generator.ifs {
                    f(cond);
                }
            }
            f(elt);
        }
        ExprKind::DictComp {
            key,
            value,
            generators,
        } => {
            for generator in generators {
                f(&generator.target);
                f(&generator.iter);
                for cond in &generator.ifs {
                    f(cond);
                }
            }
            f(key);
            f(value);
        }
        ExprKind::Lambda { body, .. } => f(body),
        ExprKind::Starred(inner) => f(inner),
    }
}
