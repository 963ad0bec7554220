//! Rewrite emission for an accepted loop

use super::checker::Conversion;
use crate::edits::Edit;
use crate::frontend::TranslationUnit;
use crate::matcher::LoopCandidate;

/// Element type written into the range-for header unless configured otherwise
pub const DEFAULT_ELEMENT_TYPE: &str = "auto &";

/// Edits turning `candidate` into a range-based loop over the converted
/// container: every `container[i]` becomes `name` and the header becomes
/// `(<element_type> <name> : <container>)`.
pub fn emit(
    candidate: &LoopCandidate<'_>,
    conversion: &Conversion<'_>,
    name: &str,
    element_type: &str,
    tu: &TranslationUnit,
) -> Vec<Edit> {
    let mut edits: Vec<Edit> = conversion
        .usages
        .iter()
        .map(|usage| Edit::new(usage.span, name))
        .collect();

    let container = tu.text(conversion.container.expr.span);
    edits.push(Edit::new(
        candidate.header,
        format!("({} {} : {})", element_type.trim(), name, container),
    ));
    edits
}
