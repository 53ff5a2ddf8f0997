//! Flat document symbols: assignments, functions, and classes.

use std::collections::HashMap;

use wyrm_core::{LineIndex, Range};
use wyrm_syntax::ast::{Stmt, StmtKind};
use wyrm_syntax::{parse_module, wrap_in_function, WRAP_LINE_OVERHEAD};

use crate::Snippet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Class,
    Variable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolEntry {
    pub name: String,
    pub kind: SymbolKind,
    pub range: Range,
    pub selection_range: Range,
}

/// Symbols of one document, with a by-name index for definition lookup.
/// Rebinding a name keeps the last entry, matching a forward read of the
/// script.
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
    index: HashMap<String, usize>,
}

impl SymbolTable {
    fn new(entries: Vec<SymbolEntry>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.name.clone(), position))
            .collect();
        Self { entries, index }
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        self.index.get(name).map(|position| &self.entries[*position])
    }
}

pub fn build_symbol_table(snippets: &[Snippet]) -> SymbolTable {
    let mut entries = Vec::new();
    for snippet in snippets {
        entries.extend(symbols_from_code(
            &snippet.code,
            snippet.line_offset as i32,
            snippet.char_offset,
        ));
    }
    SymbolTable::new(entries)
}

pub fn document_symbols(snippets: &[Snippet]) -> Vec<SymbolEntry> {
    build_symbol_table(snippets).entries.clone()
}

pub fn find_definition_range(table: &SymbolTable, name: &str) -> Option<Range> {
    table.lookup(name).map(|entry| entry.selection_range)
}

fn symbols_from_code(code: &str, line_offset: i32, char_offset: u32) -> Vec<SymbolEntry> {
    let (body, text, line_offset) = match parse_module(code) {
        Ok(module) => (module.body, code.to_string(), line_offset),
        Err(_) => {
            let wrapped = wrap_in_function(code);
            match parse_module(&wrapped) {
                // Unwrap back to the snippet's own statements.
                Ok(module) => match module.body.into_iter().next() {
                    Some(Stmt {
                        kind: StmtKind::FunctionDef(def),
                        ..
                    }) => (
                        def.body,
                        wrapped,
                        line_offset - WRAP_LINE_OVERHEAD as i32,
                    ),
                    _ => return Vec::new(),
                },
                Err(_) => return Vec::new(),
            }
        }
    };

    let index = LineIndex::new(&text);
    body.iter()
        .filter_map(|stmt| {
            let (name, kind) = match &stmt.kind {
                StmtKind::FunctionDef(def) => (def.name.clone(), SymbolKind::Function),
                StmtKind::ClassDef { name, .. } => (name.clone(), SymbolKind::Class),
                StmtKind::Assign { targets, .. } => {
                    (targets.first()?.as_name()?.to_string(), SymbolKind::Variable)
                }
                _ => return None,
            };
            let range = index
                .range(&text, stmt.range)
                .shifted(line_offset, char_offset);
            Some(SymbolEntry {
                name,
                kind,
                range,
                selection_range: range,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn whole(code: &str) -> Vec<Snippet> {
        vec![Snippet::whole_document(code)]
    }

    #[test]
    fn collects_assignments_and_functions() {
        let snippets = whole("x = 1\n\ndef foo():\n    return x\n");
        let table = build_symbol_table(&snippets);
        assert!(table.entries().iter().any(|entry| entry.name == "x"));
        assert!(table.entries().iter().any(|entry| entry.name == "foo"));

        let symbols = document_symbols(&snippets);
        let names: Vec<&str> = symbols.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, vec!["x", "foo"]);
    }

    #[test]
    fn definition_ranges_point_at_the_assignment() {
        let snippets = whole("x = 1\ny = x + 2\n");
        let table = build_symbol_table(&snippets);
        let range = find_definition_range(&table, "x").unwrap();
        assert_eq!(range.start.line, 0);
        assert_eq!(range.start.character, 0);
    }

    #[test]
    fn snippet_offsets_shift_symbol_ranges() {
        let snippets = vec![Snippet::new("total = 3\n", 2, 0)];
        let table = build_symbol_table(&snippets);
        assert_eq!(find_definition_range(&table, "total").unwrap().start.line, 2);
    }

    #[test]
    fn wrapped_snippets_report_their_own_statements() {
        let snippets = whole("x = 1\nreturn x\n");
        let table = build_symbol_table(&snippets);
        let range = find_definition_range(&table, "x").unwrap();
        assert_eq!(range.start.line, 0);
        assert!(table.lookup("__alias_main__").is_none());
    }

    #[test]
    fn rebinding_keeps_the_last_definition() {
        let snippets = whole("x = 1\nx = 2\n");
        let table = build_symbol_table(&snippets);
        assert_eq!(find_definition_range(&table, "x").unwrap().start.line, 1);
    }
}
