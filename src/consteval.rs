//! Integer constant expression evaluation
//!
//! Decides whether a loop bound is a compile-time constant and what it
//! evaluates to. Anything the evaluator does not understand is "not a
//! constant", which makes the bound check reject the loop.

use crate::ast::{BinaryOp, DeclId, DeclKind, Expr, ExprKind, SymbolTable, UnaryOp};

/// Evaluate `expr` as an integer constant expression
pub fn evaluate_integer(expr: &Expr, symbols: &SymbolTable) -> Option<i128> {
    Evaluator {
        symbols,
        in_progress: Vec::new(),
    }
    .eval(expr)
}

/// Parse a C++ integer literal (`42`, `0x2A`, `052`, `0b101010`, `1'000u`)
pub fn parse_int_literal(text: &str) -> Option<i128> {
    let cleaned: String = text.chars().filter(|c| *c != '\'').collect();
    let lower = cleaned.to_ascii_lowercase();

    let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (bin, 2)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (&lower[1..], 8)
    } else {
        (lower.as_str(), 10)
    };

    let digits = digits.trim_end_matches(['u', 'l', 'z']);
    if digits.is_empty() {
        return if radix == 8 { Some(0) } else { None };
    }
    i128::from_str_radix(digits, radix).ok()
}

/// Parse a character literal (`'a'`, `'\n'`, `'\x41'`)
pub fn parse_char_literal(text: &str) -> Option<i128> {
    let body = text
        .trim_start_matches(['u', 'U', 'L'])
        .trim_start_matches('8')
        .strip_prefix('\'')?
        .strip_suffix('\'')?;

    let mut chars = body.chars();
    let value = match chars.next()? {
        '\\' => match chars.next()? {
            'n' => '\n' as i128,
            't' => '\t' as i128,
            'r' => '\r' as i128,
            '0' if chars.as_str().is_empty() => 0,
            '\\' => '\\' as i128,
            '\'' => '\'' as i128,
            '"' => '"' as i128,
            'a' => 7,
            'b' => 8,
            'f' => 12,
            'v' => 11,
            'x' => return i128::from_str_radix(chars.as_str(), 16).ok(),
            digit @ '0'..='7' => {
                let octal = format!("{}{}", digit, chars.as_str());
                return i128::from_str_radix(&octal, 8).ok();
            }
            _ => return None,
        },
        c => c as i128,
    };

    if chars.next().is_some() {
        return None;
    }
    Some(value)
}

struct Evaluator<'s> {
    symbols: &'s SymbolTable,
    /// Declarations whose initializers are being evaluated, to stop cycles
    in_progress: Vec<DeclId>,
}

impl Evaluator<'_> {
    fn eval(&mut self, expr: &Expr) -> Option<i128> {
        match &expr.kind {
            ExprKind::IntLiteral(text) => parse_int_literal(text),
            ExprKind::CharLiteral(text) => parse_char_literal(text),
            ExprKind::BoolLiteral(value) => Some(i128::from(*value)),
            ExprKind::Paren(inner) => self.eval(inner),
            ExprKind::DeclRef { decl: Some(id), .. } => self.eval_decl(*id),
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Plus => Some(value),
                    UnaryOp::Minus => value.checked_neg(),
                    UnaryOp::Not => Some(i128::from(value == 0)),
                    UnaryOp::BitNot => Some(!value),
                    _ => None,
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                if *op == BinaryOp::Div {
                    if let Some(count) = self.element_count_ratio(lhs, rhs) {
                        return Some(count);
                    }
                }
                self.eval_binary(*op, lhs, rhs)
            }
            ExprKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)? != 0 {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            ExprKind::Cast { ty, operand } if ty.is_integer() => self.eval(operand),
            _ => None,
        }
    }

    fn eval_decl(&mut self, id: DeclId) -> Option<i128> {
        let decl = self.symbols.decl(id);
        if let Some(value) = decl.value {
            return Some(value);
        }

        // A non-static member's default initializer can be overridden by any
        // constructor
        let evaluable = match decl.kind {
            DeclKind::Variable => true,
            DeclKind::Field => decl.is_static,
            _ => false,
        } && decl.is_const
            && decl.ty.is_integer();
        if !evaluable || self.in_progress.contains(&id) {
            return None;
        }

        let init = decl.init.as_ref()?;
        self.in_progress.push(id);
        let value = self.eval(init);
        self.in_progress.pop();
        value
    }

    fn eval_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Option<i128> {
        // Short-circuit operators only need the right operand when it matters
        match op {
            BinaryOp::And => {
                return if self.eval(lhs)? == 0 {
                    Some(0)
                } else {
                    Some(i128::from(self.eval(rhs)? != 0))
                };
            }
            BinaryOp::Or => {
                return if self.eval(lhs)? != 0 {
                    Some(1)
                } else {
                    Some(i128::from(self.eval(rhs)? != 0))
                };
            }
            _ => {}
        }

        let l = self.eval(lhs)?;
        let r = self.eval(rhs)?;
        match op {
            BinaryOp::Add => l.checked_add(r),
            BinaryOp::Sub => l.checked_sub(r),
            BinaryOp::Mul => l.checked_mul(r),
            BinaryOp::Div => l.checked_div(r),
            BinaryOp::Rem => l.checked_rem(r),
            BinaryOp::Shl => u32::try_from(r).ok().and_then(|s| l.checked_shl(s)),
            BinaryOp::Shr => u32::try_from(r).ok().and_then(|s| l.checked_shr(s)),
            BinaryOp::BitAnd => Some(l & r),
            BinaryOp::BitOr => Some(l | r),
            BinaryOp::BitXor => Some(l ^ r),
            BinaryOp::Eq => Some(i128::from(l == r)),
            BinaryOp::Ne => Some(i128::from(l != r)),
            BinaryOp::Lt => Some(i128::from(l < r)),
            BinaryOp::Le => Some(i128::from(l <= r)),
            BinaryOp::Gt => Some(i128::from(l > r)),
            BinaryOp::Ge => Some(i128::from(l >= r)),
            BinaryOp::Comma => Some(r),
            BinaryOp::And | BinaryOp::Or => None,
        }
    }

    /// `sizeof(a) / sizeof(a[0])` and `sizeof(a) / sizeof(*a)` for arrays of
    /// known length
    fn element_count_ratio(&self, lhs: &Expr, rhs: &Expr) -> Option<i128> {
        let ExprKind::SizeOf(Some(whole)) = &lhs.ignore_parens().kind else {
            return None;
        };
        let ExprKind::SizeOf(Some(one)) = &rhs.ignore_parens().kind else {
            return None;
        };

        let array = whole.ignore_parens();
        let element_base = match &one.ignore_parens().kind {
            ExprKind::Subscript { base, index } if parse_index_zero(index) => base,
            ExprKind::Unary {
                op: UnaryOp::Deref,
                operand,
            } => operand,
            _ => return None,
        };

        let same_array = match (array.referenced_decl(), element_base.referenced_decl()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        if !same_array {
            return None;
        }
        self.symbols
            .type_of(array)
            .array_len()
            .map(i128::from)
    }
}

fn parse_index_zero(index: &Expr) -> bool {
    matches!(&index.ignore_parens().kind, ExprKind::IntLiteral(text) if parse_int_literal(text) == Some(0))
}
