//! loop-convert: counting loops to range-based for loops
//!
//! Finds C++ loops of the shape
//!
//! ```cpp
//! for (int i = 0; i < N; ++i) sum += arr[i];
//! ```
//!
//! where `arr` is an array of statically known length `N` and `i` is used
//! only to index `arr`, and rewrites them as
//!
//! ```cpp
//! for (auto & elem : arr) sum += elem;
//! ```
//!
//! Sources are parsed with tree-sitter and lowered into a small resolved AST
//! ([`ast`]) by the [`frontend`]. The [`matcher`] finds candidate loops, the
//! [`analysis`] pipeline decides, names and emits edits, and the [`driver`]
//! runs it per file and applies the [`edits`].
//!
//! # Example
//!
//! ```ignore
//! use loop_convert::LoopConverter;
//! use std::path::Path;
//!
//! let source = "int arr[6];\nint sum;\nvoid f() { for (int i = 0; i < 6; ++i) sum += arr[i]; }\n";
//! let report = LoopConverter::default().convert_source(Path::new("a.cpp"), source)?;
//! assert_eq!(report.stats.converted, 1);
//! ```

pub mod analysis;
pub mod ast;
pub mod cli;
pub mod config;
pub mod consteval;
pub mod driver;
pub mod edits;
pub mod error;
pub mod frontend;
pub mod lang;
pub mod matcher;
pub mod report;

// Re-export commonly used types
pub use analysis::RejectReason;
pub use cli::{Cli, OutputFormat};
pub use config::ConvertConfig;
pub use driver::{
    run_pass, ConversionOptions, ConversionStats, FileReport, LoopConverter, LoopOutcome,
    LoopReport,
};
pub use edits::{Edit, EditSet};
pub use error::{LoopConvertError, Result};
pub use frontend::{parse_translation_unit, FrontendOptions, TranslationUnit};
pub use lang::Lang;
pub use matcher::{find_candidates, LoopCandidate, LoopKey};
pub use report::RunSummary;
