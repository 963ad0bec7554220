//! Loop variable naming
//!
//! Picks the name of the range variable that replaces `container[i]`. The
//! candidates are tried in a fixed order and the first one that collides with
//! nothing wins:
//!
//! 1. the container name without a trailing `s` (`items` -> `item`), or `elem`
//! 2. `<container>_<index>`
//! 3. `<container>_elem`
//! 4. `<container>_elem_elem`
//! 5. `_elem_`, `_elem_i`, `_elem_ii`, ...

use ahash::{AHashMap, AHashSet};

use crate::ast::{ScopeId, SymbolTable};
use crate::frontend::TranslationUnit;
use crate::matcher::{LoopCandidate, LoopKey};

/// Names generated for converted loops during one file pass
#[derive(Debug, Clone, Default)]
pub struct GeneratedNames {
    names: AHashMap<LoopKey, String>,
}

impl GeneratedNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: LoopKey) -> Option<&str> {
        self.names.get(&key).map(String::as_str)
    }

    pub fn record(&mut self, key: LoopKey, name: impl Into<String>) {
        self.names.insert(key, name.into());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Everything a new name must not collide with, for one candidate
#[derive(Debug)]
pub struct NameScope<'a> {
    key: LoopKey,
    symbols: &'a SymbolTable,
    scope: ScopeId,
    enclosing: &'a [LoopKey],
    nested: &'a [LoopKey],
    /// Identifier tokens spelled anywhere in the loop body
    body_identifiers: AHashSet<&'a str>,
}

impl<'a> NameScope<'a> {
    pub fn for_candidate(candidate: &'a LoopCandidate<'_>, tu: &'a TranslationUnit) -> Self {
        Self {
            key: candidate.key,
            symbols: &tu.symbols,
            scope: candidate.scope,
            enclosing: &candidate.enclosing,
            nested: &candidate.nested,
            body_identifiers: identifiers(tu.text(candidate.body.span)),
        }
    }

    fn collides(&self, name: &str, ledger: &GeneratedNames) -> bool {
        self.symbols.is_visible(self.scope, name)
            || self
                .enclosing
                .iter()
                .chain(self.nested)
                .any(|key| ledger.get(*key) == Some(name))
            || self.body_identifiers.contains(name)
    }
}

/// Identifier-shaped tokens of `text`
fn identifiers(text: &str) -> AHashSet<&str> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|word| word.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_'))
        .collect()
}

/// Choose a fresh name and record it in `ledger` under the candidate's key
pub fn resolve_name(
    container: &str,
    index: &str,
    scope: &NameScope<'_>,
    ledger: &mut GeneratedNames,
) -> String {
    let singular = match container.strip_suffix('s') {
        Some(stem) if container.len() > 1 => stem.to_string(),
        _ => "elem".to_string(),
    };
    let fixed = [
        singular,
        format!("{}_{}", container, index),
        format!("{}_elem", container),
        format!("{}_elem_elem", container),
    ];

    let mut rejected: AHashSet<String> = AHashSet::new();
    let mut chosen = None;
    for name in fixed {
        if rejected.contains(&name) {
            continue;
        }
        if scope.collides(&name, ledger) {
            rejected.insert(name);
        } else {
            chosen = Some(name);
            break;
        }
    }

    let name = chosen.unwrap_or_else(|| {
        let mut name = "_elem_".to_string();
        while scope.collides(&name, ledger) {
            name.push('i');
        }
        name
    });
    ledger.record(scope.key, name.clone());
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{parse_translation_unit, FrontendOptions};
    use crate::matcher::find_candidates;
    use std::path::Path;

    fn parse(source: &str) -> TranslationUnit {
        parse_translation_unit(Path::new("test.cpp"), source, &FrontendOptions::default())
            .unwrap()
    }

    /// Resolve names for every candidate in order, as the driver does
    fn names_for(source: &str, containers: &[&str]) -> Vec<String> {
        let tu = parse(source);
        let candidates = find_candidates(&tu);
        let mut ledger = GeneratedNames::new();
        candidates
            .iter()
            .zip(containers)
            .map(|(candidate, container)| {
                let scope = NameScope::for_candidate(candidate, &tu);
                resolve_name(container, &candidate.index_name, &scope, &mut ledger)
            })
            .collect()
    }

    #[test]
    fn test_singular_or_elem() {
        let source = "int arr[6]; int teas[6]; int s[6]; int sum;\nvoid f() {\n  for (int i = 0; i < 6; ++i) sum += arr[i];\n  for (int i = 0; i < 6; ++i) sum += teas[i];\n  for (int i = 0; i < 6; ++i) sum += s[i];\n}\n";
        assert_eq!(names_for(source, &["arr", "teas", "s"]), vec!["elem", "tea", "elem"]);
    }

    #[test]
    fn test_visible_declaration_forces_fallback() {
        let source = "int arr[6]; int sum;\nvoid f() {\n  int elem = 0;\n  for (int i = 0; i < 6; ++i) sum += arr[i];\n}\n";
        assert_eq!(names_for(source, &["arr"]), vec!["arr_i"]);
    }

    #[test]
    fn test_declaration_later_in_scope_still_collides() {
        let source = "int arr[6]; int sum;\nvoid f() {\n  for (int i = 0; i < 6; ++i) sum += arr[i];\n  int elem = 0;\n}\n";
        assert_eq!(names_for(source, &["arr"]), vec!["arr_i"]);
    }

    #[test]
    fn test_name_used_in_body_collides() {
        let source = "int arr[6]; int sum;\nint elem(int);\nvoid f() {\n  int arr_i = 0;\n  for (int i = 0; i < 6; ++i) { int arr_elem = 1; sum += arr[i]; }\n}\n";
        assert_eq!(names_for(source, &["arr"]), vec!["arr_elem_elem"]);
    }

    #[test]
    fn test_final_fallback() {
        let source = "int arr[6]; int sum;\nint elem, arr_i, arr_elem, arr_elem_elem, _elem_;\nvoid f() {\n  for (int i = 0; i < 6; ++i) sum += arr[i];\n}\n";
        assert_eq!(names_for(source, &["arr"]), vec!["_elem_i"]);
    }

    #[test]
    fn test_nested_loop_skips_enclosing_generated_name() {
        let source = "int outer[6]; int elems[6]; int sum;\nvoid f() {\n  for (int i = 0; i < 6; ++i) {\n    sum += outer[i];\n    for (int i = 0; i < 6; ++i) sum += elems[i];\n  }\n}\n";
        assert_eq!(names_for(source, &["outer", "elems"]), vec!["elem", "elems_i"]);
    }

    #[test]
    fn test_siblings_reuse_names_and_ledger_records() {
        let source = "int arr[6]; int sum;\nvoid f() {\n  for (int i = 0; i < 6; ++i) sum += arr[i];\n  for (int i = 0; i < 6; ++i) sum += arr[i];\n}\n";
        let tu = parse(source);
        let candidates = find_candidates(&tu);
        let mut ledger = GeneratedNames::new();
        for candidate in &candidates {
            let scope = NameScope::for_candidate(candidate, &tu);
            assert_eq!(resolve_name("arr", "i", &scope, &mut ledger), "elem");
        }
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get(candidates[1].key), Some("elem"));
    }

    #[test]
    fn test_deterministic() {
        let source = "int items[6]; int sum;\nvoid f() {\n  for (int i = 0; i < 6; ++i) sum += items[i];\n}\n";
        assert_eq!(names_for(source, &["items"]), names_for(source, &["items"]));
        assert_eq!(names_for(source, &["items"]), vec!["item"]);
    }
}
