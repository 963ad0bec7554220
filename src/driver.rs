//! Per-file conversion pass and multi-file driver
//!
//! A pass walks the candidates of one translation unit in pre-order,
//! threading the generated-name ledger and the edit set through every
//! decision. Files are independent and run on the rayon pool.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::Serialize;

use crate::analysis::{
    check, emit, resolve_name, GeneratedNames, NameScope, RejectReason, DEFAULT_ELEMENT_TYPE,
};
use crate::edits::EditSet;
use crate::error::{LoopConvertError, Result};
use crate::frontend::{parse_translation_unit, FrontendOptions, TranslationUnit};
use crate::lang::Lang;
use crate::matcher::find_candidates;
use crate::report::{FileError, RunSummary};

/// Loop counters for one file or a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    pub converted: usize,
    /// Accepted loops whose edits overlapped an earlier conversion
    pub conflicting: usize,
    pub rejected: usize,
    /// Loops located outside the file being converted
    pub skipped: usize,
    pub reasons: BTreeMap<RejectReason, usize>,
}

impl ConversionStats {
    pub fn record(&mut self, outcome: &LoopOutcome) {
        match outcome {
            LoopOutcome::Converted { .. } => self.converted += 1,
            LoopOutcome::Conflicting { .. } => {
                self.conflicting += 1;
                *self.reasons.entry(RejectReason::EditConflict).or_default() += 1;
            }
            LoopOutcome::Rejected { reason } => {
                if reason.is_skip() {
                    self.skipped += 1;
                } else if reason.is_conflict() {
                    self.conflicting += 1;
                } else {
                    self.rejected += 1;
                }
                *self.reasons.entry(*reason).or_default() += 1;
            }
        }
    }

    pub fn merge(&mut self, other: &ConversionStats) {
        self.converted += other.converted;
        self.conflicting += other.conflicting;
        self.rejected += other.rejected;
        self.skipped += other.skipped;
        for (reason, count) in &other.reasons {
            *self.reasons.entry(*reason).or_default() += count;
        }
    }

    /// Total number of candidate loops seen
    pub fn total(&self) -> usize {
        self.converted + self.conflicting + self.rejected + self.skipped
    }
}

/// What happened to one candidate loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoopOutcome {
    Converted { name: String, container: String },
    Conflicting { name: String },
    Rejected { reason: RejectReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopReport {
    /// 1-based line of the `for` keyword in its file
    pub line: usize,
    /// Set when the loop lives in an included header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<PathBuf>,
    #[serde(flatten)]
    pub outcome: LoopOutcome,
}

/// Result of converting one file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub stats: ConversionStats,
    pub loops: Vec<LoopReport>,
    /// Rewritten source when at least one loop converted
    #[serde(skip)]
    pub output: Option<String>,
}

/// Edits and per-loop decisions from one pass over a translation unit
#[derive(Debug, Clone, Default)]
pub struct PassResult {
    pub edits: EditSet,
    pub loops: Vec<LoopReport>,
    pub stats: ConversionStats,
}

/// Run the analysis pipeline over every candidate of `tu`
pub fn run_pass(tu: &TranslationUnit, element_type: &str) -> PassResult {
    let mut ledger = GeneratedNames::new();
    let mut result = PassResult::default();

    for candidate in find_candidates(tu) {
        let line = tu.sources.line(candidate.span);
        let outcome = match check(&candidate, tu) {
            Err(reason) => {
                tracing::debug!("[LOOP] line {}: rejected ({})", line, reason);
                LoopOutcome::Rejected { reason }
            }
            Ok(conversion) => {
                let container = conversion.container.name(&tu.symbols);
                let scope = NameScope::for_candidate(&candidate, tu);
                let name = resolve_name(&container, &candidate.index_name, &scope, &mut ledger);
                let batch = emit(&candidate, &conversion, &name, element_type, tu);

                match result.edits.try_merge(batch) {
                    Ok(()) => {
                        tracing::debug!(
                            "[LOOP] line {}: converted over {} as {}",
                            line,
                            tu.text(conversion.container.expr.span),
                            name
                        );
                        LoopOutcome::Converted {
                            name,
                            container: tu.text(conversion.container.expr.span).to_string(),
                        }
                    }
                    Err(conflict) => {
                        tracing::debug!("[LOOP] line {}: potentially conflicting ({})", line, conflict);
                        LoopOutcome::Conflicting { name }
                    }
                }
            }
        };

        result.stats.record(&outcome);
        let header = (!tu.is_main_file(candidate.span))
            .then(|| tu.sources.path(candidate.span.file).map(Path::to_path_buf))
            .flatten();
        result.loops.push(LoopReport {
            line,
            header,
            outcome,
        });
    }

    result
}

/// Options shared by every file of a run
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    /// Written before the loop variable in the rewritten header
    pub element_type: String,
    pub frontend: FrontendOptions,
    /// Report what would change without touching any file
    pub count_only: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            element_type: DEFAULT_ELEMENT_TYPE.to_string(),
            frontend: FrontendOptions::default(),
            count_only: false,
        }
    }
}

/// Converts loops in C++ files
#[derive(Debug, Clone, Default)]
pub struct LoopConverter {
    options: ConversionOptions,
}

impl LoopConverter {
    pub fn new(options: ConversionOptions) -> Self {
        Self { options }
    }

    /// Convert `source` as the contents of `path` without touching the disk
    pub fn convert_source(&self, path: &Path, source: &str) -> Result<FileReport> {
        let tu = parse_translation_unit(path, source, &self.options.frontend)?;
        let pass = run_pass(&tu, &self.options.element_type);

        let output = if pass.edits.is_empty() {
            None
        } else {
            Some(pass.edits.apply(tu.main_file, source))
        };

        Ok(FileReport {
            path: path.to_path_buf(),
            stats: pass.stats,
            loops: pass.loops,
            output,
        })
    }

    /// Convert one file, writing the result back unless counting only
    pub fn convert_file(&self, path: &Path) -> Result<FileReport> {
        if !path.exists() {
            return Err(LoopConvertError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let lang = Lang::from_path(path)?;

        let source = fs::read_to_string(path)?;
        tracing::debug!("[PARSE] {} as {}", path.display(), lang.name());
        let report = self.convert_source(path, &source)?;

        if !self.options.count_only {
            if let Some(output) = report.output.as_deref().filter(|o| *o != source) {
                fs::write(path, output)?;
                tracing::debug!("[WRITE] {}", path.display());
            }
        }
        Ok(report)
    }

    /// Convert many files in parallel; failures are collected, not fatal
    pub fn convert_files(&self, files: &[PathBuf]) -> RunSummary {
        let results: Vec<std::result::Result<FileReport, FileError>> = files
            .par_iter()
            .map(|path| match self.convert_file(path) {
                Ok(report) => {
                    tracing::info!(
                        "[FILE] {}: {} converted, {} conflicting, {} rejected",
                        path.display(),
                        report.stats.converted,
                        report.stats.conflicting,
                        report.stats.rejected
                    );
                    Ok(report)
                }
                Err(e) => {
                    tracing::warn!("[FILE] Skipping {}: {}", path.display(), e);
                    Err(FileError {
                        path: path.clone(),
                        message: e.to_string(),
                    })
                }
            })
            .collect();

        let mut summary = RunSummary::default();
        for result in results {
            match result {
                Ok(report) => summary.add_file(report),
                Err(error) => summary.errors.push(error),
            }
        }
        summary
    }
}

/// Expand `paths` into the C++ files to convert.
///
/// Files named explicitly must have a C++ extension. Directories are walked
/// (respecting `.gitignore`) for files with one; the rest are ignored.
pub fn collect_sources(paths: &[PathBuf], max_depth: Option<usize>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if !path.exists() {
            return Err(LoopConvertError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        if path.is_file() {
            Lang::from_path(path)?;
            files.push(path.clone());
            continue;
        }

        let mut builder = WalkBuilder::new(path);
        builder.max_depth(max_depth);
        builder.follow_links(false);
        builder.git_ignore(true);

        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("[WALK] {}", e);
                    continue;
                }
            };
            let entry_path = entry.path();
            if entry_path.is_file() && Lang::from_path(entry_path).is_ok() {
                files.push(entry_path.to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}
