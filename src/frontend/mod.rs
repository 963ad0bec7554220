//! C++ front end: tree-sitter parsing and lowering into [`crate::ast`]
//!
//! A translation unit is the primary file plus every quoted `#include` that
//! could be found. All of them share one [`SourceMap`] and one
//! [`SymbolTable`]; declarations from headers join the scope the directive
//! appears in.

mod lower;
pub mod types;

use std::path::{Path, PathBuf};

use tree_sitter::{Parser, Tree};

use crate::ast::{FileId, SourceMap, Span, Stmt, SymbolTable};
use crate::error::{LoopConvertError, Result};
use crate::lang::Lang;

/// Options controlling how much of the program the front end sees
#[derive(Debug, Clone)]
pub struct FrontendOptions {
    /// Follow quoted `#include` directives
    pub follow_includes: bool,
    /// Searched after the including file's own directory
    pub include_dirs: Vec<PathBuf>,
}

impl Default for FrontendOptions {
    fn default() -> Self {
        Self {
            follow_includes: true,
            include_dirs: Vec::new(),
        }
    }
}

/// A parsed and name-resolved translation unit
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub sources: SourceMap,
    pub main_file: FileId,
    pub symbols: SymbolTable,
    /// Function bodies and global declarations, in source order per file
    pub items: Vec<Stmt>,
}

impl TranslationUnit {
    /// Verbatim source text covered by `span`
    pub fn text(&self, span: Span) -> &str {
        self.sources.text(span)
    }

    pub fn is_main_file(&self, span: Span) -> bool {
        span.file == self.main_file
    }
}

/// Parse `source` (the contents of `path`) and lower it, following includes
/// as configured.
///
/// # Errors
///
/// Returns `LoopConvertError::ParseFailure` if the grammar cannot be loaded or
/// tree-sitter gives up on the primary file. Problems with included headers
/// are logged and the header is skipped.
pub fn parse_translation_unit(
    path: &Path,
    source: &str,
    options: &FrontendOptions,
) -> Result<TranslationUnit> {
    let tree = parse_tree(path, source)?;
    if tree.root_node().has_error() {
        tracing::debug!("{} contains syntax errors; lowering what parsed", path.display());
    }
    Ok(lower::lower(path, source, &tree, options))
}

/// Run tree-sitter over one file
pub(crate) fn parse_tree(path: &Path, source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&Lang::Cpp.tree_sitter_language())
        .map_err(|e| LoopConvertError::ParseFailure {
            message: format!(
                "Failed to set language for {}: {:?}",
                path.display(),
                e
            ),
        })?;

    parser
        .parse(source, None)
        .ok_or_else(|| LoopConvertError::ParseFailure {
            message: format!("Failed to parse file: {}", path.display()),
        })
}
