//! Language detection and tree-sitter grammar loading

use std::path::Path;
use tree_sitter::Language;

use crate::error::{LoopConvertError, Result};

/// Languages whose loops can be converted.
///
/// Range-based for loops only exist in C++, so plain C sources are rejected
/// up front instead of being parsed with a grammar that cannot express the
/// rewritten loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    Cpp,
}

impl Lang {
    /// Detect language from file path extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| LoopConvertError::UnsupportedLanguage {
                extension: "none".to_string(),
            })?;

        Self::from_extension(ext)
    }

    /// Detect language from file extension string
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_lowercase().as_str() {
            "cpp" | "cc" | "cxx" | "c++" | "h" | "hpp" | "hxx" | "hh" | "inl" => Ok(Self::Cpp),
            _ => Err(LoopConvertError::UnsupportedLanguage {
                extension: ext.to_string(),
            }),
        }
    }

    /// Get the canonical name of the language
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cpp => "cpp",
        }
    }

    /// Get the tree-sitter Language for parsing
    pub fn tree_sitter_language(&self) -> Language {
        match self {
            Self::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        }
    }

    /// Get common file extensions for this language
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Cpp => &["cpp", "cc", "cxx", "c++", "h", "hpp", "hxx", "hh", "inl"],
        }
    }
}
