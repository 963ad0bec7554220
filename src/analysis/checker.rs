//! Convertibility gates for a matched candidate

use serde::Serialize;
use thiserror::Error;

use super::usage::{classify, ContainerReference, UsageSite};
use crate::consteval::evaluate_integer;
use crate::frontend::TranslationUnit;
use crate::matcher::LoopCandidate;

/// Why a candidate loop was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    #[error("index variable is used outside of a subscript")]
    UsageEscape,

    #[error("index variable subscripts other than exactly one stable container")]
    AmbiguousContainer,

    #[error("loop bound does not equal the array length")]
    BoundMismatch,

    #[error("loop is not in the main file")]
    OutOfScope,

    #[error("edits overlap an earlier conversion")]
    EditConflict,
}

impl RejectReason {
    /// Reasons counted under "potentially conflicting" instead of
    /// "change(s) rejected"
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::EditConflict)
    }

    /// Loops that were never eligible for rewriting in this pass
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::OutOfScope)
    }
}

/// An accepted candidate: its only container and every place it is indexed
#[derive(Debug, Clone)]
pub struct Conversion<'a> {
    pub container: ContainerReference<'a>,
    pub usages: Vec<UsageSite>,
}

/// Run the gates in order; the first failing gate decides the reason
pub fn check<'a>(
    candidate: &LoopCandidate<'a>,
    tu: &TranslationUnit,
) -> Result<Conversion<'a>, RejectReason> {
    let classification = classify(candidate.body, candidate.index, &tu.symbols);
    if !classification.only_used_as_index {
        return Err(RejectReason::UsageEscape);
    }

    let mut containers = classification.containers.into_iter();
    let (Some(container), None) = (containers.next(), containers.next()) else {
        return Err(RejectReason::AmbiguousContainer);
    };
    // `m[k++][i]` names a different row on every evaluation
    if !container.profile.is_stable() {
        return Err(RejectReason::AmbiguousContainer);
    }

    let length = tu.symbols.type_of(container.expr).array_len();
    let bound = evaluate_integer(candidate.bound, &tu.symbols);
    match (length, bound) {
        (Some(length), Some(bound)) if i128::from(length) == bound => {}
        _ => return Err(RejectReason::BoundMismatch),
    }

    if !tu.is_main_file(candidate.span) {
        return Err(RejectReason::OutOfScope);
    }

    Ok(Conversion {
        container,
        usages: classification.usages,
    })
}
