//! Text edits and the per-file edit set

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::ast::{FileId, Span};

/// Replace the bytes of `span` with `replacement`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edit {
    pub span: Span,
    pub replacement: String,
}

impl Edit {
    pub fn new(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }
}

/// An incoming edit overlaps one already in the set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("edit at {span} overlaps existing edit at {existing}")]
pub struct EditConflict {
    pub span: Span,
    pub existing: Span,
}

/// Non-overlapping edits ordered by position
#[derive(Debug, Clone, Default)]
pub struct EditSet {
    edits: BTreeMap<Span, Edit>,
}

impl EditSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add all of `batch` or none of it.
    ///
    /// An edit identical to one already present is absorbed. Any other
    /// overlap, within the batch or against the set, fails the whole batch.
    pub fn try_merge(&mut self, batch: Vec<Edit>) -> Result<(), EditConflict> {
        let mut fresh: Vec<Edit> = Vec::with_capacity(batch.len());
        for edit in batch {
            if self.edits.get(&edit.span) == Some(&edit) || fresh.contains(&edit) {
                continue;
            }
            if let Some(existing) = self.overlapping(&edit.span) {
                return Err(EditConflict {
                    span: edit.span,
                    existing,
                });
            }
            if let Some(other) = fresh.iter().find(|e| e.span.overlaps(&edit.span)) {
                return Err(EditConflict {
                    span: edit.span,
                    existing: other.span,
                });
            }
            fresh.push(edit);
        }

        for edit in fresh {
            self.edits.insert(edit.span, edit);
        }
        Ok(())
    }

    fn overlapping(&self, span: &Span) -> Option<Span> {
        // Only the nearest edit starting before `span` can reach into it
        let before = self
            .edits
            .range(..*span)
            .next_back()
            .filter(|(existing, _)| existing.overlaps(span));
        let after = self
            .edits
            .range(*span..)
            .next()
            .filter(|(existing, _)| existing.overlaps(span));
        before.or(after).map(|(existing, _)| *existing)
    }

    /// Files touched by at least one edit
    pub fn files(&self) -> Vec<FileId> {
        let mut files: Vec<FileId> = self.edits.keys().map(|span| span.file).collect();
        files.dedup();
        files
    }

    /// Apply the edits for `file` to its text
    pub fn apply(&self, file: FileId, text: &str) -> String {
        let mut output = text.to_string();
        for edit in self.edits.values().rev().filter(|e| e.span.file == file) {
            if edit.span.end <= output.len() {
                output.replace_range(edit.span.start..edit.span.end, &edit.replacement);
            }
        }
        output
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}
