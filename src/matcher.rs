//! Counting-loop shape matcher
//!
//! Finds `for (int i = 0; i < bound; ++i)` loops: a single integer index
//! declared in the init statement with literal `0`, a `<` comparison of that
//! same variable against an integer-typed bound, and a prefix increment of it.
//! Anything else (non-zero start, `<=`, decrement, postfix increment, several
//! declarators) is not a candidate at all.

use serde::Serialize;

use crate::ast::{
    walk, BinaryOp, DeclId, Expr, ExprKind, ForStmt, NodeRef, ScopeId, Span, Stmt, StmtKind,
    UnaryOp, Walk,
};
use crate::consteval::parse_int_literal;
use crate::frontend::TranslationUnit;

/// Identity of a loop within a file pass: its source span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LoopKey(pub Span);

/// A loop with the counting shape, ready for the convertibility check
#[derive(Debug, Clone)]
pub struct LoopCandidate<'a> {
    pub key: LoopKey,
    /// Whole `for` statement
    pub span: Span,
    /// `(` through `)` of the header
    pub header: Span,
    pub index: DeclId,
    pub index_name: String,
    pub bound: &'a Expr,
    pub body: &'a Stmt,
    /// Lexical scope the loop statement appears in
    pub scope: ScopeId,
    /// Candidate loops containing this one, innermost first
    pub enclosing: Vec<LoopKey>,
    /// Candidate loops inside this one's body
    pub nested: Vec<LoopKey>,
}

/// Find every candidate loop of the translation unit in source pre-order
/// (an outer loop precedes the loops nested inside it).
pub fn find_candidates(tu: &TranslationUnit) -> Vec<LoopCandidate<'_>> {
    let mut candidates = Vec::new();
    for item in &tu.items {
        walk(NodeRef::Stmt(item), |node| {
            if let NodeRef::Stmt(stmt) = node {
                if let StmtKind::For(for_stmt) = &stmt.kind {
                    if let Some(candidate) = match_loop(stmt.span, for_stmt, tu) {
                        candidates.push(candidate);
                    }
                }
            }
            Walk::Continue
        });
    }
    link_nesting(&mut candidates);
    candidates
}

fn match_loop<'a>(
    span: Span,
    for_stmt: &'a ForStmt,
    tu: &'a TranslationUnit,
) -> Option<LoopCandidate<'a>> {
    let symbols = &tu.symbols;

    // for (int i = 0; ...)
    let StmtKind::Decl(locals) = &for_stmt.init.as_ref()?.kind else {
        return None;
    };
    let [local] = locals.as_slice() else {
        return None;
    };
    let index = local.decl;
    let index_decl = symbols.decl(index);
    if !index_decl.ty.is_integer() {
        return None;
    }
    match &local.init.as_ref()?.kind {
        ExprKind::IntLiteral(text) if parse_int_literal(text) == Some(0) => {}
        _ => return None,
    }

    // ...; i < bound; ...
    let ExprKind::Binary {
        op: BinaryOp::Lt,
        lhs,
        rhs,
    } = &for_stmt.condition.as_ref()?.kind
    else {
        return None;
    };
    if lhs.referenced_decl() != Some(index) || !symbols.type_of(rhs).is_integer() {
        return None;
    }

    // ...; ++i)
    let ExprKind::Unary {
        op: UnaryOp::PreInc,
        operand,
    } = &for_stmt.increment.as_ref()?.kind
    else {
        return None;
    };
    if operand.referenced_decl() != Some(index) {
        return None;
    }

    let scope = symbols
        .scope(for_stmt.scope)
        .parent
        .unwrap_or_else(|| symbols.root());

    Some(LoopCandidate {
        key: LoopKey(span),
        span,
        header: for_stmt.header,
        index,
        index_name: index_decl.name.clone(),
        bound: rhs,
        body: &for_stmt.body,
        scope,
        enclosing: Vec::new(),
        nested: Vec::new(),
    })
}

/// Fill in `enclosing` and `nested` from span containment
fn link_nesting(candidates: &mut [LoopCandidate<'_>]) {
    let spans: Vec<Span> = candidates.iter().map(|c| c.span).collect();
    for candidate in candidates.iter_mut() {
        // Pre-order puts outer loops first; reverse for innermost first
        candidate.enclosing = spans
            .iter()
            .rev()
            .filter(|outer| outer.strictly_contains(&candidate.span))
            .map(|outer| LoopKey(*outer))
            .collect();
        candidate.nested = spans
            .iter()
            .filter(|inner| candidate.span.strictly_contains(inner))
            .map(|inner| LoopKey(*inner))
            .collect();
    }
}
