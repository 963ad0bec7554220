//! Structural expression profiles
//!
//! Two container expressions are the same container when their profiles are
//! equal: same declarations, same member and subscript path, same literal
//! values. Parentheses are transparent and an implicit member access (`f`
//! inside a method) profiles the same as the explicit `this->f`.

use std::hash::{Hash, Hasher};

use ahash::RandomState;

use crate::ast::{BinaryOp, DeclId, Expr, ExprKind, Span, UnaryOp};
use crate::consteval::{parse_char_literal, parse_int_literal};

/// Fixed seeds so fingerprints are stable across runs and threads
const PROFILE_SEEDS: (u64, u64, u64, u64) = (
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Token {
    Decl(DeclId),
    /// Unresolved name
    Name(String),
    This,
    Member { field: String, arrow: bool },
    Subscript,
    Int(i128),
    Literal(String),
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// Expression whose value may differ between evaluations; never equal
    /// to anything but itself
    Opaque(Span),
}

/// Normalized structural profile of an expression
#[derive(Debug, Clone)]
pub struct ExprProfile {
    tokens: Vec<Token>,
    fingerprint: u64,
}

impl ExprProfile {
    pub fn of(expr: &Expr) -> Self {
        let mut tokens = Vec::new();
        push_tokens(expr, &mut tokens);
        let (k0, k1, k2, k3) = PROFILE_SEEDS;
        let fingerprint = RandomState::with_seeds(k0, k1, k2, k3).hash_one(&tokens);
        Self {
            tokens,
            fingerprint,
        }
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// No calls, increments, assignments or unmodelled syntax: evaluating
    /// the expression once denotes the same object as evaluating it on every
    /// iteration
    pub fn is_stable(&self) -> bool {
        !self.tokens.iter().any(|t| matches!(t, Token::Opaque(_)))
    }
}

impl PartialEq for ExprProfile {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint && self.tokens == other.tokens
    }
}

impl Eq for ExprProfile {}

impl Hash for ExprProfile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fingerprint.hash(state);
    }
}

fn push_tokens(expr: &Expr, tokens: &mut Vec<Token>) {
    match &expr.kind {
        ExprKind::Paren(inner) => push_tokens(inner, tokens),
        ExprKind::DeclRef { decl: Some(id), .. } => tokens.push(Token::Decl(*id)),
        ExprKind::DeclRef { name, decl: None } => tokens.push(Token::Name(name.clone())),
        ExprKind::This { .. } => tokens.push(Token::This),
        ExprKind::Member {
            base,
            decl: Some(id),
            ..
        } if matches!(base.ignore_parens().kind, ExprKind::This { .. }) => {
            tokens.push(Token::Decl(*id))
        }
        ExprKind::Member {
            base, field, arrow, ..
        } => {
            tokens.push(Token::Member {
                field: field.clone(),
                arrow: *arrow,
            });
            push_tokens(base, tokens);
        }
        ExprKind::Subscript { base, index } => {
            tokens.push(Token::Subscript);
            push_tokens(base, tokens);
            push_tokens(index, tokens);
        }
        ExprKind::IntLiteral(text) => match parse_int_literal(text) {
            Some(value) => tokens.push(Token::Int(value)),
            None => tokens.push(Token::Literal(text.clone())),
        },
        ExprKind::CharLiteral(text) => match parse_char_literal(text) {
            Some(value) => tokens.push(Token::Int(value)),
            None => tokens.push(Token::Literal(text.clone())),
        },
        ExprKind::BoolLiteral(value) => tokens.push(Token::Int(i128::from(*value))),
        ExprKind::FloatLiteral(text) | ExprKind::StringLiteral(text) => {
            tokens.push(Token::Literal(text.clone()))
        }
        ExprKind::Unary { op, operand }
            if !matches!(
                op,
                UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
            ) =>
        {
            tokens.push(Token::Unary(*op));
            push_tokens(operand, tokens);
        }
        ExprKind::Binary { op, lhs, rhs } => {
            tokens.push(Token::Binary(*op));
            push_tokens(lhs, tokens);
            push_tokens(rhs, tokens);
        }
        // Calls, side effects and unmodelled syntax
        _ => tokens.push(Token::Opaque(expr.span)),
    }
}
