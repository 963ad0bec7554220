//! Index variable usage classification
//!
//! Walks a loop body and sorts every occurrence of the index variable into
//! "index operand of a subscript" (a [`UsageSite`]) or "anything else", which
//! makes the loop unconvertible.

use ahash::AHashMap;

use super::profile::ExprProfile;
use crate::ast::{walk, DeclId, DeclKind, Expr, ExprKind, NodeRef, Span, Stmt, SymbolTable, Walk};

/// The expression a loop subscripts, compared structurally
#[derive(Debug, Clone)]
pub struct ContainerReference<'a> {
    /// First occurrence, parentheses stripped
    pub expr: &'a Expr,
    pub profile: ExprProfile,
}

impl ContainerReference<'_> {
    /// Name of the variable or member the container denotes, or `""` when
    /// it has no single name (`m[i]`, `get()`)
    pub fn name(&self, symbols: &SymbolTable) -> String {
        match &self.expr.ignore_parens().kind {
            ExprKind::DeclRef { decl: Some(id), .. } => {
                let decl = symbols.decl(*id);
                match decl.kind {
                    DeclKind::Variable | DeclKind::Parameter | DeclKind::Field => decl.name.clone(),
                    _ => String::new(),
                }
            }
            ExprKind::DeclRef { name, decl: None } => name.clone(),
            ExprKind::Member { field, .. } => field.clone(),
            _ => String::new(),
        }
    }
}

/// `container[index]` inside the loop body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageSite {
    /// The whole subscript expression
    pub span: Span,
    /// Position of the subscripted container in
    /// [`ClassificationResult::containers`]
    pub container: usize,
}

#[derive(Debug, Clone)]
pub struct ClassificationResult<'a> {
    pub only_used_as_index: bool,
    /// In source order
    pub usages: Vec<UsageSite>,
    /// Distinct containers, in order of first use
    pub containers: Vec<ContainerReference<'a>>,
}

/// Classify every reference to `index` inside `body`
///
/// A macro whose replacement text spells the index name counts as a use
/// outside a subscript.
pub fn classify<'a>(
    body: &'a Stmt,
    index: DeclId,
    symbols: &SymbolTable,
) -> ClassificationResult<'a> {
    let index_name = symbols.decl(index).name.as_str();
    let mut result = ClassificationResult {
        only_used_as_index: true,
        usages: Vec::new(),
        containers: Vec::new(),
    };
    let mut slots: AHashMap<ExprProfile, usize> = AHashMap::new();
    // Index operands already accounted for by a usage site
    let mut pruned: Vec<&Expr> = Vec::new();

    walk(NodeRef::Stmt(body), |node| {
        let NodeRef::Expr(expr) = node else {
            return Walk::Continue;
        };
        if pruned.iter().any(|p| std::ptr::eq(*p, expr)) {
            return Walk::SkipChildren;
        }

        match &expr.kind {
            ExprKind::Subscript { base, index: operand } if operand.referenced_decl() == Some(index) => {
                let container = base.ignore_parens();
                let profile = ExprProfile::of(container);
                let slot = match slots.get(&profile) {
                    Some(slot) => *slot,
                    None => {
                        let slot = result.containers.len();
                        slots.insert(profile.clone(), slot);
                        result.containers.push(ContainerReference {
                            expr: container,
                            profile,
                        });
                        slot
                    }
                };
                result.usages.push(UsageSite {
                    span: expr.span,
                    container: slot,
                });
                // The base is still visited: `m[i][i]` indexes `m[i]` and `m`
                pruned.push(operand);
            }
            ExprKind::DeclRef { decl: Some(id), .. } if *id == index => {
                result.only_used_as_index = false;
            }
            ExprKind::DeclRef { decl: Some(id), .. } => {
                let decl = symbols.decl(*id);
                if decl.kind == DeclKind::Macro
                    && decl.expansion_names.iter().any(|n| n == index_name)
                {
                    result.only_used_as_index = false;
                }
            }
            _ => {}
        }
        Walk::Continue
    });

    result
}
